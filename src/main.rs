//! KinoBot Telegram Bot
//!
//! Main application entry point

use std::sync::Arc;
use anyhow::Context;
use teloxide::prelude::*;
use tracing::{info, warn};

use KinoBot::{
    config::Settings,
    database::{create_pool, run_migrations, DatabaseService, MemoryStorage, PoolConfig, Storage},
    handlers::schema,
    scheduler::Scheduler,
    services::{ServiceFactory, SystemClock, TelegramMembership},
    utils::logging,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new().context("Failed to load configuration")?;
    settings.validate()?;

    // Initialize logging; the guard flushes the log file on exit
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", KinoBot::info());

    let storage = if settings.database.is_memory() {
        warn!("Using in-memory storage, data will not survive a restart");
        Storage::from_backend(Arc::new(MemoryStorage::new()))
    } else {
        info!("Connecting to database...");
        let pool = create_pool(&PoolConfig::from(&settings.database)).await?;
        run_migrations(&pool).await?;
        DatabaseService::new(pool).storage()
    };

    // Initialize bot
    let bot = Bot::new(&settings.bot.token);

    info!("Initializing services...");
    let services = ServiceFactory::new(
        storage,
        Arc::new(SystemClock),
        Arc::new(TelegramMembership::new(bot.clone())),
        &settings,
    );
    services.seed(&settings.bot.admin_ids).await?;
    info!(code_strategy = ?services.catalog.strategy(), "Movie catalog ready");

    let services = Arc::new(services);
    let settings = Arc::new(settings);

    let scheduler = Scheduler::spawn_jobs(bot.clone(), services.clone(), &settings);
    info!(jobs = scheduler.job_count(), "Periodic jobs running");

    if let Some(webhook_url) = &settings.bot.webhook_url {
        info!("Webhook URL configured: {}", webhook_url);
        info!("Webhook mode is not supported, falling back to polling");
    }

    let mut dispatcher = Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![services, settings])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd);
        })
        .enable_ctrlc_handler()
        .build();

    info!("KinoBot is ready, starting polling...");
    dispatcher.dispatch().await;

    info!("KinoBot has been shut down.");
    Ok(())
}
