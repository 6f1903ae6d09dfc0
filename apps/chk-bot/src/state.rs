use std::sync::Arc;

use crate::config::BotConfig;
use crate::services::auth_service::AuthService;
use crate::services::order_service::OrderService;
use crate::services::throttle::Throttle;
use chk_db::repositories::bank_repo::BankRepository;
use chk_db::repositories::earnings_repo::EarningsRepository;
use chk_db::repositories::order_repo::OrderRepository;
use chk_db::repositories::user_repo::UserRepository;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<BotConfig>,
    pub users: UserRepository,
    pub orders: OrderRepository,
    pub earnings: EarningsRepository,
    pub bank: BankRepository,
    pub auth: AuthService,
    pub throttle: Throttle,
    pub order_service: OrderService,
}
