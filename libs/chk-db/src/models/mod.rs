pub mod bank;
pub mod earnings;
pub mod order;
pub mod user;
