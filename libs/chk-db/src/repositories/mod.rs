pub mod bank_repo;
pub mod earnings_repo;
pub mod order_repo;
pub mod user_repo;
