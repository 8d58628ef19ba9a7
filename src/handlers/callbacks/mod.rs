//! Callback query handlers module
//!
//! Handles the approve/reject buttons attached to forwarded receipts and the
//! button that re-checks channel subscriptions.

use teloxide::{Bot, types::{CallbackQuery, ChatId}, prelude::*};
use tracing::{debug, warn};
use crate::handlers::commands::admin::apply_decision;
use crate::handlers::{deny_text, join_keyboard, CHECK_SUBSCRIPTIONS};
use crate::models::Decision;
use crate::services::{ActionKind, DenyReason, ServiceFactory, Verdict};
use crate::utils::errors::Result;

/// Main callback query dispatcher
pub async fn handle_callback_query(bot: Bot, query: CallbackQuery, services: &ServiceFactory) -> Result<()> {
    let user_id = query.from.id.0 as i64;
    let chat_id = query
        .message
        .as_ref()
        .map(|m| m.chat().id)
        .unwrap_or(ChatId(user_id));

    debug!(user_id = user_id, callback_data = ?query.data, "Processing callback query");

    if query.data.as_deref() == Some(CHECK_SUBSCRIPTIONS) {
        return handle_check_subscriptions(&bot, &query, user_id, services).await;
    }

    let Some((decision, payment_id)) = query.data.as_deref().and_then(parse_payment_callback) else {
        warn!(user_id = user_id, callback_data = ?query.data, "Unknown callback data");
        bot.answer_callback_query(query.id.clone()).await?;
        return Ok(());
    };

    let verdict = services
        .access_gate
        .evaluate_access(user_id, ActionKind::AdminCommand)
        .await?;
    if let Verdict::Deny(reason) = verdict {
        bot.answer_callback_query(query.id.clone())
            .text(deny_text(&reason))
            .show_alert(true)
            .await?;
        return Ok(());
    }

    let reply = apply_decision(&bot, payment_id, decision, user_id, services).await?;
    bot.answer_callback_query(query.id.clone()).text(reply.clone()).await?;
    bot.send_message(chat_id, reply).await?;
    Ok(())
}

/// Re-run the channel check and update the join prompt in place
async fn handle_check_subscriptions(
    bot: &Bot,
    query: &CallbackQuery,
    user_id: i64,
    services: &ServiceFactory,
) -> Result<()> {
    let missing = services.access_gate.check_channels(user_id).await?;
    debug!(user_id = user_id, missing = ?missing, "Subscription re-check");

    if missing.is_empty() {
        bot.answer_callback_query(query.id.clone())
            .text("✅ Thank you for subscribing!")
            .await?;
        if let Some(message) = &query.message {
            let edited = bot
                .edit_message_text(message.chat().id, message.id(), SUBSCRIBED_TEXT)
                .await;
            if let Err(e) = edited {
                debug!(user_id = user_id, error = %e, "Could not edit join prompt");
            }
        }
        return Ok(());
    }

    bot.answer_callback_query(query.id.clone())
        .text("❗ You have not joined every channel yet.")
        .show_alert(true)
        .await?;
    if let Some(message) = &query.message {
        let reason = DenyReason::NotSubscribedToChannels(missing.clone());
        // Telegram refuses edits that change nothing; that is expected here
        let edited = bot
            .edit_message_text(message.chat().id, message.id(), deny_text(&reason))
            .reply_markup(join_keyboard(&missing))
            .await;
        if let Err(e) = edited {
            debug!(user_id = user_id, error = %e, "Join prompt left unchanged");
        }
    }
    Ok(())
}

const SUBSCRIBED_TEXT: &str = "✅ Thank you! You are subscribed to every channel. Send a movie code to continue.";

/// Parse `pay:approve:<id>` / `pay:reject:<id>`
pub fn parse_payment_callback(data: &str) -> Option<(Decision, i64)> {
    let mut parts = data.split(':');
    if parts.next()? != "pay" {
        return None;
    }
    let decision = match parts.next()? {
        "approve" => Decision::Approve,
        "reject" => Decision::Reject,
        _ => return None,
    };
    let payment_id = parts.next()?.parse::<i64>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((decision, payment_id))
}
