pub mod auth_service;
pub mod confirmation_service;
pub mod earnings_service;
pub mod fraud;
pub mod notify_service;
pub mod order_service;
pub mod storage_service;
pub mod throttle;
