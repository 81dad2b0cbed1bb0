//! `OrderDesk` binary: wires configuration, storage, and the Telegram bot.

use dotenvy::dotenv;
use orderdesk::{bot, config, errors::Result, store::Store};
use std::env;
use teloxide::Bot;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the application configuration (ADMIN_ID, data dir, pacing)
    let app_config = config::load_configuration()?;

    // 4. Load or initialize the data files, applying the one-time migration
    let store = Store::open(&app_config.data_dir)?;

    // 5. Run the bot. TELOXIDE_TOKEN is read here, directly before use,
    //    never stored in the configuration.
    let token = env::var("TELOXIDE_TOKEN")
        .inspect_err(|e| error!("TELOXIDE_TOKEN not found: {}", e))?;

    let bot = Bot::new(token);
    let state = bot::AppState::new(app_config, store);
    bot::run_bot(bot, state).await;

    Ok(())
}
