//! Scheduled ad commands

use teloxide::{Bot, types::ChatId, prelude::*};
use crate::models::{Ad, NewAd};
use crate::services::{Clock, ServiceFactory};
use crate::utils::errors::{KinoBotError, Result};
use crate::utils::helpers::{format_timestamp, truncate_text};
use crate::utils::logging::log_admin_action;

const ADD_AD_USAGE: &str = "Usage: /addad <YYYY-MM-DD HH:MM | now> | <repeats> | <button text> | <button url> | <text>\n\
    Leave both button fields empty for no button. Send it as a photo caption to attach an image.";

/// Handle /addad, as text or as the caption of a photo (`image`)
pub async fn handle_add_ad(
    bot: Bot,
    chat_id: ChatId,
    admin_id: i64,
    args: &str,
    image: Option<String>,
    services: &ServiceFactory,
) -> Result<()> {
    let Some(new_ad) = NewAd::parse_pipe_separated(args, image, services.clock.now()) else {
        bot.send_message(chat_id, ADD_AD_USAGE).await?;
        return Ok(());
    };

    let text = match services.ads.add_ad(new_ad).await {
        Ok(ad) => {
            log_admin_action(admin_id, "add_ad", Some(&ad.id.to_string()), None);
            format!(
                "✅ Ad #{} scheduled for {}, {} time(s).",
                ad.id,
                format_timestamp(ad.scheduled_at),
                ad.repeat_count
            )
        }
        Err(KinoBotError::InvalidInput(reason)) => format!("⚠️ {}", reason),
        Err(e) => return Err(e),
    };
    bot.send_message(chat_id, text).await?;
    Ok(())
}

/// Handle /listads
pub async fn handle_list_ads(bot: Bot, chat_id: ChatId, services: &ServiceFactory) -> Result<()> {
    let ads = services.ads.list_ads().await?;
    bot.send_message(chat_id, format_ad_list(&ads)).await?;
    Ok(())
}

pub fn format_ad_list(ads: &[Ad]) -> String {
    if ads.is_empty() {
        return "📭 No ads scheduled.".to_string();
    }

    let mut text = format!("📢 Ads ({}):\n", ads.len());
    for ad in ads {
        text.push_str(&format!(
            "\n#{} | Sent {}/{} | {} | {}",
            ad.id,
            ad.times_sent,
            ad.repeat_count,
            format_timestamp(ad.scheduled_at),
            truncate_text(&ad.text, 40)
        ));
    }
    text
}

/// Handle /deletead <id>
pub async fn handle_delete_ad(
    bot: Bot,
    chat_id: ChatId,
    admin_id: i64,
    args: &str,
    services: &ServiceFactory,
) -> Result<()> {
    let Some(ad_id) = args.trim().parse::<i64>().ok() else {
        bot.send_message(chat_id, "Usage: /deletead <ad id>").await?;
        return Ok(());
    };

    let text = if services.ads.delete_ad(ad_id).await? {
        log_admin_action(admin_id, "delete_ad", Some(&ad_id.to_string()), None);
        format!("🗑 Ad #{} deleted.", ad_id)
    } else {
        format!("❓ Ad #{} not found.", ad_id)
    };
    bot.send_message(chat_id, text).await?;
    Ok(())
}
