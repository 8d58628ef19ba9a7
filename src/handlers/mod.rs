//! Bot handlers module
//!
//! Thin transport layer over the services:
//! - Command handlers for bot commands
//! - Callback handlers for payment decision and subscription check buttons
//! - Message handlers for code lookups and captioned uploads
//! - Paced broadcast of text and scheduled ads to all active users

pub mod broadcast;
pub mod callbacks;
pub mod commands;
pub mod messages;

use std::sync::Arc;
use teloxide::dispatching::{HandlerExt, UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, Me};
use tracing::{error, warn};
use crate::config::Settings;
use crate::services::{DenyReason, ServiceFactory};
use crate::utils::errors::{KinoBotError, Result};

pub use commands::Command;

pub type HandlerResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Build the update handler tree
pub fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_command),
                )
                .branch(dptree::endpoint(handle_message)),
        )
        .branch(Update::filter_callback_query().endpoint(handle_callback))
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    services: Arc<ServiceFactory>,
    settings: Arc<Settings>,
) -> HandlerResult {
    if let Err(e) = commands::dispatch(bot, msg, cmd, &services, &settings).await {
        log_handler_error("command", &e);
        return Err(e.into());
    }
    Ok(())
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    me: Me,
    services: Arc<ServiceFactory>,
) -> HandlerResult {
    if let Err(e) = messages::handle_message(bot, msg, &me, &services).await {
        log_handler_error("message", &e);
        return Err(e.into());
    }
    Ok(())
}

async fn handle_callback(bot: Bot, query: CallbackQuery, services: Arc<ServiceFactory>) -> HandlerResult {
    if let Err(e) = callbacks::handle_callback_query(bot, query, &services).await {
        log_handler_error("callback query", &e);
        return Err(e.into());
    }
    Ok(())
}

/// A stale reference to a missing row is the sender's mistake, not ours
fn log_handler_error(context: &str, e: &KinoBotError) {
    if e.is_not_found() {
        warn!(error = %e, "Unknown record referenced in {}", context);
    } else {
        error!(error = %e, severity = ?e.severity(), recoverable = e.is_recoverable(), "Error handling {}", context);
    }
}

/// Id of the message author
pub(crate) fn sender_id(msg: &Message) -> Result<i64> {
    msg.from
        .as_ref()
        .map(|u| u.id.0 as i64)
        .ok_or_else(|| KinoBotError::InvalidInput("No user in message".to_string()))
}

/// Register the author on contact. The main admin hears about first contacts.
pub(crate) async fn register_sender(bot: &Bot, msg: &Message, services: &ServiceFactory) -> Result<i64> {
    let user = msg
        .from
        .as_ref()
        .ok_or_else(|| KinoBotError::InvalidInput("No user in message".to_string()))?;

    let user_id = user.id.0 as i64;
    let display_name = Some(user.full_name()).filter(|n| !n.trim().is_empty());
    let outcome = services
        .user_registry
        .register_user(user_id, display_name, user.username.clone())
        .await?;

    if outcome.created {
        let super_admin = services.admins.super_admin_id();
        let notice = new_user_notice(&outcome.user);
        if let Err(e) = bot.send_message(ChatId(super_admin), notice).await {
            warn!(user_id = user_id, error = %e, "Failed to notify admin about new user");
        }
    }
    Ok(user_id)
}

/// Text sent to the main admin when someone starts the bot for the first time
pub fn new_user_notice(user: &crate::models::User) -> String {
    let name = user.display_name.as_deref().unwrap_or("(no name)");
    let handle = user
        .handle
        .as_deref()
        .map(|h| format!("@{}", h))
        .unwrap_or_else(|| "no username".to_string());
    format!("🆕 New user\nID: {}\nName: {}\nUsername: {}", user.id, name, handle)
}

/// User-facing text for a denial
pub fn deny_text(reason: &DenyReason) -> String {
    match reason {
        DenyReason::NotAuthorized => "⛔ This command is only available to admins.".to_string(),
        DenyReason::Blocked => "🚫 Your access has been blocked. Contact an admin.".to_string(),
        DenyReason::NotSubscribedToChannels(channels) => format!(
            "📢 Please join the following channels first:\n{}\n\nThen send the code again.",
            channels.join("\n")
        ),
        DenyReason::SubscriptionExpired => {
            "💳 You need an active subscription to watch movies. Use /subscribe to see prices.".to_string()
        }
    }
}

/// Callback data of the button that re-runs the channel check
pub const CHECK_SUBSCRIPTIONS: &str = "check_subs";

/// Join buttons for channels with a public link, then a re-check button
pub fn join_keyboard(channels: &[String]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = channels
        .iter()
        .filter_map(|channel| {
            let name = channel.trim().trim_start_matches('@');
            if name.is_empty() || name.starts_with('-') || name.parse::<i64>().is_ok() {
                return None;
            }
            let link = if name.starts_with("https://") {
                name.to_string()
            } else {
                format!("https://t.me/{}", name)
            };
            let url = url::Url::parse(&link).ok()?;
            Some(vec![InlineKeyboardButton::url(format!("➕ {}", channel), url)])
        })
        .collect();

    rows.push(vec![InlineKeyboardButton::callback("✅ Check", CHECK_SUBSCRIPTIONS)]);
    InlineKeyboardMarkup::new(rows)
}

/// Send the denial text, with join buttons when channels are missing
pub(crate) async fn send_denial(bot: &Bot, chat_id: ChatId, reason: &DenyReason) -> Result<()> {
    let request = bot.send_message(chat_id, deny_text(reason));
    match reason {
        DenyReason::NotSubscribedToChannels(channels) => request.reply_markup(join_keyboard(channels)).await?,
        _ => request.await?,
    };
    Ok(())
}
