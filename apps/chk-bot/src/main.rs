use dotenvy::dotenv;
use std::env;
use std::sync::Arc;
use teloxide::prelude::*;

mod bot;
mod config;
mod services;
mod state;

use crate::config::BotConfig;
use crate::services::auth_service::AuthService;
use crate::services::confirmation_service::ConfirmationScheduler;
use crate::services::earnings_service::EarningsService;
use crate::services::notify_service::Notifier;
use crate::services::order_service::OrderService;
use crate::services::storage_service::ProofStorage;
use crate::services::throttle::Throttle;
pub use crate::state::AppState;
use chk_db::repositories::bank_repo::BankRepository;
use chk_db::repositories::earnings_repo::EarningsRepository;
use chk_db::repositories::order_repo::OrderRepository;
use chk_db::repositories::user_repo::UserRepository;

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    log::info!("Starting Chk Bot...");

    let token = env::var("BOT_TOKEN").expect("BOT_TOKEN is not set");
    let cfg = Arc::new(BotConfig::from_env().expect("Invalid bot configuration"));

    let pool = match chk_db::db::init_db().await {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("CRITICAL: database init failed: {e:#}");
            std::process::exit(1);
        }
    };

    let users = UserRepository::new(pool.clone());
    let orders = OrderRepository::new(pool.clone());
    let earnings = EarningsRepository::new(pool.clone());
    let bank = BankRepository::new(pool.clone());

    let bot = Bot::new(token);

    let notifier = Notifier::new(bot.clone(), cfg.clone());
    let storage = ProofStorage::new(cfg.clone());
    let earnings_service = EarningsService::new(earnings.clone(), cfg.clone());
    let order_service = OrderService::new(
        cfg.clone(),
        orders.clone(),
        users.clone(),
        bank.clone(),
        earnings_service,
        notifier.clone(),
        storage,
    );
    let auth = AuthService::new(users.clone());
    let throttle = Throttle::new();

    let state = AppState {
        cfg,
        users,
        orders: orders.clone(),
        earnings,
        bank,
        auth,
        throttle,
        order_service,
    };

    // Hourly confirmation sweep runs alongside the dispatcher.
    tokio::spawn(async move {
        let scheduler = ConfirmationScheduler::new(orders, notifier);
        scheduler.start().await;
    });

    let (_tx, rx) = tokio::sync::broadcast::channel(1);
    bot::run_bot(bot, rx, state).await;
}
