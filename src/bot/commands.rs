//! Command handlers - /start for everyone, the rest admin-only.
//!
//! Admin commands cover catalog maintenance, order review, and broadcast.
//! A non-admin invoking any of them is silently ignored. Multi-argument
//! commands take one free-form string and are parsed here so product and
//! variant names may contain spaces.

use crate::{
    bot::{AppState, recoverable_text, render, user_key},
    core::review::{self, Verdict},
    errors::{Error, Result},
};
use std::{sync::Arc, time::Duration};
use teloxide::{
    prelude::*,
    types::{ChatId, InputFile, Message, MessageId},
    utils::command::BotCommands,
};
use tracing::{debug, info, warn};

/// The command set understood by the bot.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "register and open the menu.")]
    Start,
    #[command(description = "admin: list the catalog with ids.")]
    Products,
    #[command(description = "admin: add a product, e.g. /addproduct Aged-IG.")]
    AddProduct(String),
    #[command(description = "admin: add variants, e.g. /addvariants 1 Gold+5/Silver+3.")]
    AddVariants(String),
    #[command(description = "admin: toggle a variant, e.g. /togglevariant 1 2.")]
    ToggleVariant(String),
    #[command(description = "admin: remove a variant, e.g. /delvariant 1 2.")]
    DelVariant(String),
    #[command(description = "admin: rename a product, e.g. /renameproduct 1 New Name.")]
    RenameProduct(String),
    #[command(description = "admin: delete a product, e.g. /delproduct 1.")]
    DelProduct(String),
    #[command(description = "admin: confirm an order, e.g. /confirm 7.")]
    Confirm(String),
    #[command(description = "admin: reject an order, e.g. /reject 7.")]
    Reject(String),
    #[command(description = "admin: message every known user.")]
    Broadcast(String),
}

/// Entry point for all commands.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<AppState>,
) -> Result<()> {
    let Some(sender) = msg.from() else {
        return Ok(());
    };
    let user = user_key(sender.id);

    if let Command::Start = cmd {
        return handle_start(&bot, &msg, user, &state).await;
    }

    // Everything below is admin-only; deny silently.
    if let Err(e) = state.ensure_admin(user) {
        debug!(user, error = %e, "non-admin command ignored");
        return Ok(());
    }

    match cmd {
        Command::Start => Ok(()),
        Command::Products => {
            let text = {
                let store = state.store.lock().await;
                render::admin_catalog(store.catalog.products())
            };
            bot.send_message(msg.chat.id, text).await?;
            Ok(())
        }
        Command::AddProduct(name) => {
            mutate_catalog(&bot, &msg, &state, |store| {
                let product = store.catalog.add_product(&name)?;
                Ok(format!("Product #{} '{}' added.", product.id, product.name))
            })
            .await
        }
        Command::AddVariants(args) => {
            mutate_catalog(&bot, &msg, &state, |store| {
                let (id, spec) = split_id_and_rest(&args, "/addvariants <product_id> <spec>")?;
                let count = store.catalog.add_variants(id, spec)?;
                Ok(format!("{count} variant(s) added to product #{id}."))
            })
            .await
        }
        Command::ToggleVariant(args) => {
            mutate_catalog(&bot, &msg, &state, |store| {
                let (pid, vid) = parse_two_ids(&args, "/togglevariant <product_id> <variant_id>")?;
                let variant = store.catalog.toggle_variant(pid, vid)?;
                let now = if variant.enabled { "enabled" } else { "disabled" };
                Ok(format!("Variant '{}' is now {now}.", variant.name))
            })
            .await
        }
        Command::DelVariant(args) => {
            mutate_catalog(&bot, &msg, &state, |store| {
                let (pid, vid) = parse_two_ids(&args, "/delvariant <product_id> <variant_id>")?;
                let removed = store.catalog.remove_variant(pid, vid)?;
                Ok(format!("Variant '{}' removed.", removed.name))
            })
            .await
        }
        Command::RenameProduct(args) => {
            mutate_catalog(&bot, &msg, &state, |store| {
                let (id, name) = split_id_and_rest(&args, "/renameproduct <product_id> <name>")?;
                store.catalog.rename_product(id, name)?;
                Ok(format!("Product #{id} renamed to '{}'.", name.trim()))
            })
            .await
        }
        Command::DelProduct(args) => {
            mutate_catalog(&bot, &msg, &state, |store| {
                let id = parse_id(&args, "/delproduct <product_id>")?;
                let removed = store.catalog.delete_product(id)?;
                Ok(format!(
                    "Product #{id} '{}' deleted. Existing orders keep their snapshot.",
                    removed.name
                ))
            })
            .await
        }
        Command::Confirm(args) => handle_review(&bot, &msg, &state, &args, Verdict::Confirm).await,
        Command::Reject(args) => handle_review(&bot, &msg, &state, &args, Verdict::Reject).await,
        Command::Broadcast(text) => handle_broadcast(&bot, &msg, &state, text.trim()).await,
    }
}

async fn handle_start(bot: &Bot, msg: &Message, user: i64, state: &AppState) -> Result<()> {
    let newly_registered = {
        let mut store = state.store.lock().await;
        let new = store.register_user(user);
        if new {
            store.save()?;
        }
        new
    };
    if newly_registered {
        info!(user, "user registered");
    }

    if let Some(url) = &state.config.welcome_photo_url {
        bot.send_photo(msg.chat.id, InputFile::url(url.clone()))
            .caption(render::welcome_text())
            .reply_markup(render::continue_kb())
            .await?;
    } else {
        bot.send_message(msg.chat.id, render::welcome_text())
            .reply_markup(render::continue_kb())
            .await?;
    }
    Ok(())
}

/// Runs one catalog mutation under the store lock, persists on success, and
/// replies with either the success line or the recoverable error text.
async fn mutate_catalog(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    op: impl FnOnce(&mut crate::store::Store) -> Result<String>,
) -> Result<()> {
    let outcome = {
        let mut store = state.store.lock().await;
        match op(&mut store) {
            Ok(text) => {
                store.save()?;
                Ok(text)
            }
            Err(e) => Err(e),
        }
    };
    match outcome {
        Ok(text) => {
            bot.send_message(msg.chat.id, text).await?;
        }
        Err(e) => match recoverable_text(&e) {
            Some(text) => {
                bot.send_message(msg.chat.id, text).await?;
            }
            None => return Err(e),
        },
    }
    Ok(())
}

/// Confirms or rejects an order, then notifies the buyer and rewrites the
/// admin notification in place (controls removed). Both notifications are
/// best-effort: a delivery failure is logged and the decision stands.
pub(crate) async fn handle_review(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    args: &str,
    verdict: Verdict,
) -> Result<()> {
    let usage = match verdict {
        Verdict::Confirm => "/confirm <order_id>",
        Verdict::Reject => "/reject <order_id>",
    };
    let outcome = match parse_id(args, usage) {
        Ok(id) => {
            let mut store = state.store.lock().await;
            match review::process_order(&mut store.ledger, id, verdict) {
                Ok(order) => {
                    store.save()?;
                    Ok(order)
                }
                Err(e) => Err(e),
            }
        }
        Err(e) => Err(e),
    };

    let order = match outcome {
        Ok(order) => order,
        Err(e) => {
            return match recoverable_text(&e) {
                Some(text) => {
                    bot.send_message(msg.chat.id, text).await?;
                    Ok(())
                }
                None => Err(e),
            };
        }
    };

    if let Err(e) = bot
        .send_message(ChatId(order.user), render::user_decision_text(&order))
        .await
    {
        warn!(order_id = order.id, error = %e, "buyer notification failed");
    }
    if let Some(message_id) = order.channel_message_id {
        if let Err(e) = bot
            .edit_message_caption(ChatId(state.config.admin_id), MessageId(message_id))
            .caption(render::processed_admin_caption(&order))
            .await
        {
            warn!(order_id = order.id, error = %e, "admin notification edit failed");
        }
    }
    bot.send_message(
        msg.chat.id,
        format!("Order {} is now {}. User notified.", order.id, order.status),
    )
    .await?;
    Ok(())
}

/// Sequential broadcast with fixed pacing and per-recipient failure
/// isolation: one unreachable user never aborts the rest.
async fn handle_broadcast(bot: &Bot, msg: &Message, state: &AppState, text: &str) -> Result<()> {
    if text.is_empty() {
        bot.send_message(msg.chat.id, "Usage: /broadcast your message text")
            .await?;
        return Ok(());
    }

    let users: Vec<i64> = {
        let store = state.store.lock().await;
        store.users.iter().copied().collect()
    };
    bot.send_message(msg.chat.id, format!("Broadcasting to {} users...", users.len()))
        .await?;

    let mut sent = 0usize;
    for user in &users {
        match bot.send_message(ChatId(*user), text).await {
            Ok(_) => sent += 1,
            Err(e) => warn!(user, error = %e, "broadcast delivery failed"),
        }
        tokio::time::sleep(Duration::from_millis(state.config.broadcast_delay_ms)).await;
    }
    info!(sent, total = users.len(), "broadcast finished");
    bot.send_message(
        msg.chat.id,
        format!("Broadcast sent to {sent}/{} users.", users.len()),
    )
    .await?;
    Ok(())
}

/// Parses a single numeric id argument, mapping failure to a usage hint.
fn parse_id(args: &str, usage: &str) -> Result<u64> {
    args.trim().parse().map_err(|_| Error::Validation {
        message: format!("Invalid format. Use: {usage}"),
    })
}

/// Splits `"<id> rest..."`, keeping the rest verbatim (names and specs may
/// contain spaces).
fn split_id_and_rest<'a>(args: &'a str, usage: &str) -> Result<(u64, &'a str)> {
    let args = args.trim();
    let (id_part, rest) = args.split_once(char::is_whitespace).ok_or_else(|| {
        Error::Validation {
            message: format!("Invalid format. Use: {usage}"),
        }
    })?;
    let id = parse_id(id_part, usage)?;
    let rest = rest.trim();
    if rest.is_empty() {
        return Err(Error::Validation {
            message: format!("Invalid format. Use: {usage}"),
        });
    }
    Ok((id, rest))
}

/// Parses `"<product_id> <variant_id>"`.
fn parse_two_ids(args: &str, usage: &str) -> Result<(u64, u32)> {
    let (pid, rest) = split_id_and_rest(args, usage)?;
    let vid = rest.trim().parse().map_err(|_| Error::Validation {
        message: format!("Invalid format. Use: {usage}"),
    })?;
    Ok((pid, vid))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn id_parsing_rejects_garbage() {
        assert!(matches!(
            parse_id("seven", "/confirm <order_id>"),
            Err(Error::Validation { .. })
        ));
        assert_eq!(parse_id(" 7 ", "/confirm <order_id>").unwrap(), 7);
    }

    #[test]
    fn rest_parsing_keeps_spaces() {
        let (id, rest) = split_id_and_rest("3 Fresh USA Accounts", "usage").unwrap();
        assert_eq!(id, 3);
        assert_eq!(rest, "Fresh USA Accounts");
        assert!(split_id_and_rest("3", "usage").is_err());
        assert!(split_id_and_rest("3   ", "usage").is_err());
    }

    #[test]
    fn two_id_parsing() {
        assert_eq!(parse_two_ids("1 2", "usage").unwrap(), (1, 2));
        assert!(parse_two_ids("1 two", "usage").is_err());
        assert!(parse_two_ids("1", "usage").is_err());
    }
}
