//! Admin command handlers
//!
//! Every handler here runs only after the access gate allowed an admin command.

use teloxide::{Bot, types::ChatId, prelude::*};
use tracing::{debug, warn};
use crate::config::Settings;
use crate::handlers::broadcast::broadcast_text;
use crate::models::{Decision, Movie, PendingPayment, UsageStats};
use crate::services::ServiceFactory;
use crate::utils::errors::{KinoBotError, Result};
use crate::utils::helpers::{format_timestamp, parse_user_id, truncate_text};
use crate::utils::logging::log_admin_action;

/// Handle /stats
pub async fn handle_stats(bot: Bot, chat_id: ChatId, services: &ServiceFactory) -> Result<()> {
    let stats = services.usage_stats().await?;
    bot.send_message(chat_id, format_stats(&stats)).await?;
    Ok(())
}

pub fn format_stats(stats: &UsageStats) -> String {
    format!(
        "📊 Statistics\n\n\
         👥 Users: {}\n\
         🚫 Blocked: {}\n\
         💳 Active subscriptions: {}\n\
         🎬 Movies: {}\n\
         👁 Total views: {}\n\
         ⏳ Pending payments: {}",
        stats.total_users,
        stats.blocked_users,
        stats.active_subscriptions,
        stats.movies,
        stats.total_views,
        stats.pending_payments
    )
}

/// Handle /pending
pub async fn handle_pending(bot: Bot, chat_id: ChatId, services: &ServiceFactory) -> Result<()> {
    let pending = services.payments.list_pending().await?;
    if pending.is_empty() {
        bot.send_message(chat_id, "✅ No pending payments.").await?;
        return Ok(());
    }

    let mut text = format!("⏳ Pending payments ({}):\n", pending.len());
    for payment in pending.iter().take(30) {
        text.push_str(&format!("\n{}", format_payment_line(payment)));
    }
    text.push_str("\n\nUse /approve <id> or /reject <id>.");
    bot.send_message(chat_id, text).await?;
    Ok(())
}

pub fn format_payment_line(payment: &PendingPayment) -> String {
    format!(
        "#{} user {} - {} UZS for {} days ({})",
        payment.id,
        payment.user_id,
        payment.amount,
        payment.period_days,
        format_timestamp(payment.created_at)
    )
}

/// Handle /approve <id> and /reject <id>
pub async fn handle_decision(
    bot: Bot,
    chat_id: ChatId,
    admin_id: i64,
    args: &str,
    decision: Decision,
    services: &ServiceFactory,
) -> Result<()> {
    let Some(payment_id) = args.trim().parse::<i64>().ok() else {
        bot.send_message(chat_id, "Usage: /approve <payment id> or /reject <payment id>").await?;
        return Ok(());
    };

    let reply = apply_decision(&bot, payment_id, decision, admin_id, services).await?;
    bot.send_message(chat_id, reply).await?;
    Ok(())
}

/// Decide a payment and notify its owner. Returns the admin-facing reply;
/// unknown and already decided payments become replies, not errors.
pub async fn apply_decision(
    bot: &Bot,
    payment_id: i64,
    decision: Decision,
    admin_id: i64,
    services: &ServiceFactory,
) -> Result<String> {
    let decided = match services.payments.decide(payment_id, decision, admin_id).await {
        Ok(decided) => decided,
        Err(KinoBotError::PaymentNotFound { .. }) => return Ok(format!("❓ Payment #{} not found.", payment_id)),
        Err(KinoBotError::AlreadyDecided { status, .. }) => {
            return Ok(format!("ℹ️ Payment #{} is already {}.", payment_id, status))
        }
        Err(e) => return Err(e),
    };

    let user_id = decided.payment.user_id;
    let user_text = match &decided.user {
        Some(user) => format!(
            "✅ Your payment was approved. Subscription active until {}.",
            user.subscription_until.map(format_timestamp).unwrap_or_default()
        ),
        None => "❌ Your payment was rejected. Contact an admin if you think this is a mistake.".to_string(),
    };

    if let Err(e) = bot.send_message(ChatId(user_id), user_text).await {
        warn!(user_id = user_id, payment_id = payment_id, error = %e, "Could not notify user about payment decision");
    }

    Ok(match decision {
        Decision::Approve => format!("✅ Payment #{} approved for user {}.", payment_id, user_id),
        Decision::Reject => format!("❌ Payment #{} rejected.", payment_id),
    })
}

/// Handle /delmovie <code> [hard]
pub async fn handle_delete_movie(
    bot: Bot,
    chat_id: ChatId,
    admin_id: i64,
    args: &str,
    services: &ServiceFactory,
) -> Result<()> {
    let mut parts = args.split_whitespace();
    let Some(code) = parts.next() else {
        bot.send_message(chat_id, "Usage: /delmovie <code> [hard]").await?;
        return Ok(());
    };
    let hard = matches!(parts.next(), Some("hard"));

    let found = services.catalog.delete_movie(code, hard).await?;
    if found {
        log_admin_action(admin_id, "delete_movie", Some(code), Some(if hard { "hard" } else { "soft" }));
        bot.send_message(chat_id, format!("🗑 Movie {} deleted.", code)).await?;
    } else {
        bot.send_message(chat_id, format!("❓ Movie {} not found.", code)).await?;
    }
    Ok(())
}

/// Handle /movies [all]
pub async fn handle_list_movies(bot: Bot, chat_id: ChatId, args: &str, services: &ServiceFactory) -> Result<()> {
    let include_deleted = args.trim() == "all";
    let movies = services.catalog.list_movies(include_deleted).await?;
    bot.send_message(chat_id, format_movie_list(&movies)).await?;
    Ok(())
}

pub fn format_movie_list(movies: &[Movie]) -> String {
    if movies.is_empty() {
        return "🎬 The catalog is empty.".to_string();
    }

    let mut text = format!("🎬 Movies ({}):\n", movies.len());
    for movie in movies.iter().take(50) {
        let deleted = if movie.is_deleted { " [deleted]" } else { "" };
        text.push_str(&format!(
            "\n{} - {} 👁 {}{}",
            movie.code,
            truncate_text(&movie.title, 40),
            movie.view_count,
            deleted
        ));
    }
    if movies.len() > 50 {
        text.push_str(&format!("\n... and {} more", movies.len() - 50));
    }
    text
}

/// Handle /addadmin <id>
pub async fn handle_add_admin(
    bot: Bot,
    chat_id: ChatId,
    admin_id: i64,
    args: &str,
    services: &ServiceFactory,
) -> Result<()> {
    let Some(target) = parse_user_id(args) else {
        bot.send_message(chat_id, "Usage: /addadmin <user id>").await?;
        return Ok(());
    };

    let text = if services.admins.add_admin(target).await? {
        log_admin_action(admin_id, "add_admin", Some(&target.to_string()), None);
        format!("✅ {} is now an admin.", target)
    } else {
        format!("ℹ️ {} is already an admin.", target)
    };
    bot.send_message(chat_id, text).await?;
    Ok(())
}

/// Handle /removeadmin <id>
pub async fn handle_remove_admin(
    bot: Bot,
    chat_id: ChatId,
    admin_id: i64,
    args: &str,
    services: &ServiceFactory,
) -> Result<()> {
    let Some(target) = parse_user_id(args) else {
        bot.send_message(chat_id, "Usage: /removeadmin <user id>").await?;
        return Ok(());
    };

    let text = if services.admins.is_super_admin(target) {
        "⛔ The super admin cannot be removed.".to_string()
    } else if services.admins.remove_admin(target).await? {
        log_admin_action(admin_id, "remove_admin", Some(&target.to_string()), None);
        format!("✅ {} is no longer an admin.", target)
    } else {
        format!("ℹ️ {} is not an admin.", target)
    };
    bot.send_message(chat_id, text).await?;
    Ok(())
}

/// Handle /admins
pub async fn handle_list_admins(bot: Bot, chat_id: ChatId, services: &ServiceFactory) -> Result<()> {
    let admins = services.admins.list_admins().await?;
    let lines: Vec<String> = admins
        .iter()
        .map(|id| {
            if services.admins.is_super_admin(*id) {
                format!("👑 {}", id)
            } else {
                format!("👤 {}", id)
            }
        })
        .collect();

    bot.send_message(chat_id, format!("Admins:\n{}", lines.join("\n"))).await?;
    Ok(())
}

/// Handle /channels, /channels add <ch>, /channels remove <ch>
pub async fn handle_channels(
    bot: Bot,
    chat_id: ChatId,
    admin_id: i64,
    args: &str,
    services: &ServiceFactory,
) -> Result<()> {
    let mut parts = args.split_whitespace();
    let text = match (parts.next(), parts.next()) {
        (None, _) => {
            let channels = services.settings.list_channels().await?;
            let enabled = services.settings.force_subscribe_enabled().await?;
            if channels.is_empty() {
                "📢 No force-subscribe channels configured.".to_string()
            } else {
                format!(
                    "📢 Force-subscribe is {}.\n{}",
                    if enabled { "on" } else { "off" },
                    channels.join("\n")
                )
            }
        }
        (Some("add"), Some(channel)) => {
            if services.settings.add_channel(channel).await? {
                log_admin_action(admin_id, "add_channel", Some(channel), None);
                format!("✅ Channel {} added.", channel)
            } else {
                format!("ℹ️ Channel {} is already configured.", channel)
            }
        }
        (Some("remove"), Some(channel)) => {
            if services.settings.remove_channel(channel).await? {
                log_admin_action(admin_id, "remove_channel", Some(channel), None);
                format!("✅ Channel {} removed.", channel)
            } else {
                format!("❓ Channel {} is not configured.", channel)
            }
        }
        _ => "Usage: /channels [add|remove <channel>]".to_string(),
    };

    bot.send_message(chat_id, text).await?;
    Ok(())
}

/// Handle /forcesub on|off
pub async fn handle_force_subscribe(
    bot: Bot,
    chat_id: ChatId,
    admin_id: i64,
    args: &str,
    services: &ServiceFactory,
) -> Result<()> {
    let enabled = match args.trim() {
        "on" => true,
        "off" => false,
        _ => {
            bot.send_message(chat_id, "Usage: /forcesub on|off").await?;
            return Ok(());
        }
    };

    services.settings.set_force_subscribe(enabled).await?;
    log_admin_action(admin_id, "force_subscribe", None, Some(args.trim()));
    bot.send_message(chat_id, format!("📢 Force-subscribe is now {}.", args.trim())).await?;
    Ok(())
}

/// Handle /setting <key> <value>; without a value the current one is shown
pub async fn handle_setting(
    bot: Bot,
    chat_id: ChatId,
    admin_id: i64,
    args: &str,
    services: &ServiceFactory,
) -> Result<()> {
    let args = args.trim();
    let (key, value) = match args.split_once(char::is_whitespace) {
        Some((key, value)) => (key, Some(value.trim())),
        None => (args, None),
    };

    if key.is_empty() {
        let settings = services.settings.list_settings().await?;
        let lines: Vec<String> = settings
            .iter()
            .map(|s| format!("{} = {}", s.key, truncate_text(&s.value, 60)))
            .collect();
        bot.send_message(chat_id, format!("⚙️ Settings:\n{}", lines.join("\n"))).await?;
        return Ok(());
    }

    let text = match value {
        Some(value) if !value.is_empty() => {
            services.settings.set_setting(key, value).await?;
            log_admin_action(admin_id, "set_setting", Some(key), None);
            format!("✅ {} updated.", key)
        }
        _ => match services.settings.get_setting(key).await? {
            Some(value) => format!("{} = {}", key, value),
            None => format!("{} is not set.", key),
        },
    };
    bot.send_message(chat_id, text).await?;
    Ok(())
}

/// Handle /broadcast <text>
pub async fn handle_broadcast(
    bot: Bot,
    chat_id: ChatId,
    admin_id: i64,
    text: &str,
    services: &ServiceFactory,
    settings: &Settings,
) -> Result<()> {
    let text = text.trim();
    if text.is_empty() {
        bot.send_message(chat_id, "Usage: /broadcast <text>").await?;
        return Ok(());
    }

    log_admin_action(admin_id, "broadcast", None, Some(&truncate_text(text, 50)));
    bot.send_message(chat_id, "📤 Broadcast started.").await?;

    let report = broadcast_text(&bot, services, text, settings.broadcast.messages_per_second).await?;
    debug!(delivered = report.delivered, failed = report.failed, "Broadcast finished");

    bot.send_message(
        chat_id,
        format!("📬 Broadcast finished: {} delivered, {} failed.", report.delivered, report.failed),
    )
    .await?;
    Ok(())
}

/// Handle /msguser <id> <text>: a direct message from the bot to one user
pub async fn handle_message_user(
    bot: Bot,
    chat_id: ChatId,
    admin_id: i64,
    args: &str,
) -> Result<()> {
    let Some((target, text)) = parse_direct_message(args) else {
        bot.send_message(chat_id, "Usage: /msguser <user id> <text>").await?;
        return Ok(());
    };

    let reply = match bot.send_message(ChatId(target), text).await {
        Ok(_) => {
            log_admin_action(admin_id, "message_user", Some(&target.to_string()), Some(&truncate_text(text, 50)));
            format!("✅ Message sent to {}.", target)
        }
        Err(e) => {
            warn!(admin_id = admin_id, target = target, error = %e, "Direct message failed");
            format!("⚠️ Could not message {}: {}", target, e)
        }
    };
    bot.send_message(chat_id, reply).await?;
    Ok(())
}

/// Split `<user id> <text>`; both parts are required
pub fn parse_direct_message(args: &str) -> Option<(i64, &str)> {
    let (id, text) = args.trim().split_once(char::is_whitespace)?;
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some((parse_user_id(id)?, text))
}

/// Handle /block <id> and /unblock <id>
pub async fn handle_block(
    bot: Bot,
    chat_id: ChatId,
    admin_id: i64,
    args: &str,
    block: bool,
    services: &ServiceFactory,
) -> Result<()> {
    let Some(target) = parse_user_id(args) else {
        bot.send_message(chat_id, "Usage: /block <user id> or /unblock <user id>").await?;
        return Ok(());
    };

    let result = if block {
        services.user_registry.block(target).await
    } else {
        services.user_registry.unblock(target).await
    };

    let text = match result {
        Ok(_) => {
            log_admin_action(admin_id, if block { "block" } else { "unblock" }, Some(&target.to_string()), None);
            format!("✅ User {} {}.", target, if block { "blocked" } else { "unblocked" })
        }
        Err(KinoBotError::UserNotFound { .. }) => format!("❓ User {} not found.", target),
        Err(e) => return Err(e),
    };
    bot.send_message(chat_id, text).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use crate::models::{MovieMetadata, PaymentStatus};

    #[test]
    fn test_format_movie_list_marks_deleted() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut movie = Movie::new("3".to_string(), MovieMetadata::titled("Dune"), "f".to_string(), now);
        movie.view_count = 4;
        movie.is_deleted = true;

        let text = format_movie_list(&[movie]);
        assert!(text.contains("3 - Dune 👁 4 [deleted]"));
        assert!(format_movie_list(&[]).contains("empty"));
    }

    #[test]
    fn test_format_payment_line() {
        let payment = PendingPayment {
            id: 9,
            user_id: 42,
            amount: 35000,
            period_days: 30,
            proof_handle: "p".to_string(),
            status: PaymentStatus::Pending,
            decided_by: None,
            decided_at: None,
            created_at: Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
        };
        assert_eq!(
            format_payment_line(&payment),
            "#9 user 42 - 35000 UZS for 30 days (2025-01-02 03:04:05 UTC)"
        );
    }

    #[test]
    fn test_parse_direct_message() {
        assert_eq!(parse_direct_message("42 Hello there"), Some((42, "Hello there")));
        assert_eq!(parse_direct_message("  42   Hi "), Some((42, "Hi")));
        assert_eq!(parse_direct_message("42"), None);
        assert_eq!(parse_direct_message("abc Hi"), None);
    }

    #[test]
    fn test_format_stats() {
        let stats = UsageStats {
            total_users: 10,
            pending_payments: 2,
            ..Default::default()
        };
        let text = format_stats(&stats);
        assert!(text.contains("Users: 10"));
        assert!(text.contains("Pending payments: 2"));
    }
}
