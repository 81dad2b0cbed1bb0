//! Bot layer - Telegram-specific wiring and handlers.
//!
//! Everything here is presentation glue over the core state machine: inbound
//! updates become [`crate::core::flow::FlowEvent`]s, typed replies become
//! messages and keyboards. Handler errors are isolated per update by the
//! dispatcher's error handler, so one bad event never halts the run loop.

/// Command handlers: /start plus the admin command set
pub mod commands;
/// Callback-query and free-text/photo handlers
pub mod handlers;
/// Message texts and inline keyboards
pub mod render;

use crate::{
    config::Config,
    core::session::Sessions,
    errors::{Error, Result},
    store::Store,
};
use std::sync::Arc;
use teloxide::{
    Bot,
    dispatching::{Dispatcher, HandlerExt, UpdateFilterExt},
    dptree,
    error_handlers::LoggingErrorHandler,
    types::{Update, UserId},
};
use tracing::{debug, info};

/// Shared state available to all handlers: configuration plus the two
/// mutex-guarded mutable collaborators. Locks are held only across
/// in-memory mutation, never across outbound sends.
pub struct AppState {
    /// Resolved application configuration
    pub config: Config,
    /// Users, catalog, and ledger with their backing files
    pub store: tokio::sync::Mutex<Store>,
    /// Per-user conversation state
    pub sessions: tokio::sync::Mutex<Sessions>,
}

impl AppState {
    /// Wraps the loaded store and configuration for sharing across handlers.
    #[must_use]
    pub fn new(config: Config, store: Store) -> Arc<Self> {
        Arc::new(Self {
            config,
            store: tokio::sync::Mutex::new(store),
            sessions: tokio::sync::Mutex::new(Sessions::default()),
        })
    }

    /// Whether this sender is the single privileged identity.
    #[must_use]
    pub fn is_admin(&self, user: i64) -> bool {
        user == self.config.admin_id
    }

    /// Admin gate for privileged operations. Callers decide how to handle
    /// the denial; the bot's convention is a silent no-op toward the sender.
    pub fn ensure_admin(&self, user: i64) -> Result<()> {
        if self.is_admin(user) {
            Ok(())
        } else {
            Err(Error::Unauthorized)
        }
    }
}

/// Maps a Telegram user id onto the i64 key used by the store and sessions.
/// Telegram ids fit in i64; private-chat ids equal the user id, which is how
/// outbound notifications address the buyer.
#[must_use]
pub(crate) fn user_key(id: UserId) -> i64 {
    i64::try_from(id.0).unwrap_or(i64::MAX)
}

/// The error texts we show to the sender instead of failing the update.
/// Everything else propagates to the dispatcher's error handler.
pub(crate) fn recoverable_text(error: &Error) -> Option<String> {
    match error {
        Error::Validation { .. }
        | Error::ProductNotFound { .. }
        | Error::VariantNotFound { .. }
        | Error::OrderNotFound { .. }
        | Error::NoPendingOrder { .. }
        | Error::AlreadyProcessed { .. } => Some(error.to_string()),
        _ => None,
    }
}

/// Builds the dispatcher and runs the long-polling loop until shutdown.
pub async fn run_bot(bot: Bot, state: Arc<AppState>) {
    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<commands::Command>()
                .endpoint(commands::handle_command),
        )
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    info!("Bot running...");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|update| async move {
            debug!(update_id = update.id, "unhandled update");
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "error while handling update",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn admin_gate_passes_only_the_configured_identity() {
        let config = Config {
            admin_id: 7,
            data_dir: PathBuf::from("data"),
            broadcast_delay_ms: 50,
            welcome_photo_url: None,
        };
        let state = AppState::new(config, Store::in_memory());
        assert!(state.ensure_admin(7).is_ok());
        assert!(matches!(state.ensure_admin(8), Err(Error::Unauthorized)));
    }
}
