pub mod commission;
pub mod plans;
