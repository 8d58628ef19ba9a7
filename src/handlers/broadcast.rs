//! Paced broadcast to every non-blocked user

use std::future::Future;
use std::num::NonZeroU32;
use governor::{Quota, RateLimiter};
use teloxide::{
    Bot, RequestError,
    types::{ChatId, FileId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile},
    prelude::*,
};
use tracing::{debug, info};
use crate::models::Ad;
use crate::services::ServiceFactory;
use crate::utils::errors::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Send `text` to all active users, at most `messages_per_second` per second.
/// Delivery failures (user blocked the bot, deleted account) are counted, not raised.
pub async fn broadcast_text(
    bot: &Bot,
    services: &ServiceFactory,
    text: &str,
    messages_per_second: u32,
) -> Result<BroadcastReport> {
    let report = deliver_to_active_users(services, messages_per_second, |chat_id| async move {
        bot.send_message(chat_id, text).await.map(|_| ())
    })
    .await?;

    info!(delivered = report.delivered, failed = report.failed, "Broadcast completed");
    Ok(report)
}

/// One delivery round of a scheduled ad, paced like [`broadcast_text`]
pub async fn broadcast_ad(
    bot: &Bot,
    services: &ServiceFactory,
    ad: &Ad,
    messages_per_second: u32,
) -> Result<BroadcastReport> {
    let report = deliver_to_active_users(services, messages_per_second, |chat_id| send_ad(bot, chat_id, ad)).await?;

    info!(
        ad_id = ad.id,
        round = ad.times_sent,
        delivered = report.delivered,
        failed = report.failed,
        "Ad delivered"
    );
    Ok(report)
}

async fn deliver_to_active_users<F, Fut>(
    services: &ServiceFactory,
    messages_per_second: u32,
    mut send: F,
) -> Result<BroadcastReport>
where
    F: FnMut(ChatId) -> Fut,
    Fut: Future<Output = std::result::Result<(), RequestError>>,
{
    let recipients = services.user_registry.list_active_user_ids().await?;
    let rate = NonZeroU32::new(messages_per_second).unwrap_or(NonZeroU32::MIN);
    let limiter = RateLimiter::direct(Quota::per_second(rate));

    let mut report = BroadcastReport::default();
    for user_id in recipients {
        limiter.until_ready().await;
        match send(ChatId(user_id)).await {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                debug!(user_id = user_id, error = %e, "Broadcast delivery failed");
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

/// Photo with caption when the ad has an image, plain text otherwise
async fn send_ad(bot: &Bot, chat_id: ChatId, ad: &Ad) -> std::result::Result<(), RequestError> {
    let keyboard = ad_keyboard(ad);

    match &ad.image_handle {
        Some(image) => {
            let mut request = bot.send_photo(chat_id, InputFile::file_id(FileId(image.clone())));
            if !ad.text.is_empty() {
                request = request.caption(ad.text.clone());
            }
            if let Some(keyboard) = keyboard {
                request = request.reply_markup(keyboard);
            }
            request.await?;
        }
        None => {
            let mut request = bot.send_message(chat_id, ad.text.clone());
            if let Some(keyboard) = keyboard {
                request = request.reply_markup(keyboard);
            }
            request.await?;
        }
    }
    Ok(())
}

pub fn ad_keyboard(ad: &Ad) -> Option<InlineKeyboardMarkup> {
    let (text, link) = ad.button()?;
    let url = url::Url::parse(link).ok()?;
    Some(InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::url(text, url)]]))
}
