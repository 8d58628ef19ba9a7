//! Message handlers module
//!
//! Plain text is treated as a movie code. Captioned uploads carry the
//! commands that need a file: `/addmovie` (admin video upload), `/addad`
//! (admin ad with an image) and `/pay` (receipt submission).

use teloxide::{Bot, types::{ChatId, FileId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, Me, Message}, prelude::*};
use tracing::{debug, info, warn};
use crate::handlers::commands::ads;
use crate::handlers::{register_sender, send_denial};
use crate::models::{Movie, MovieMetadata, PendingPayment};
use crate::services::{ActionKind, ServiceFactory, Verdict};
use crate::utils::errors::{KinoBotError, Result};
use crate::utils::helpers::truncate_text;
use crate::utils::logging::log_user_action;

/// Handle incoming messages that are not text commands
pub async fn handle_message(bot: Bot, msg: Message, me: &Me, services: &ServiceFactory) -> Result<()> {
    if !msg.chat.id.is_user() {
        return Ok(());
    }

    if let Some(caption) = msg.caption() {
        if let Some(args) = caption_command(caption, "addmovie", me.username()) {
            return handle_add_movie(bot, &msg, args, services).await;
        }
        if let Some(args) = caption_command(caption, "addad", me.username()) {
            return handle_add_ad_with_image(bot, &msg, args, services).await;
        }
        if let Some(args) = caption_command(caption, "pay", me.username()) {
            return handle_payment_submission(bot, &msg, args, services).await;
        }
    }

    match msg.text() {
        Some(text) if !text.trim_start().starts_with('/') => handle_code_lookup(bot, &msg, text.trim(), services).await,
        Some(_) => {
            bot.send_message(msg.chat.id, "Unknown command. See /help.").await?;
            Ok(())
        }
        None => {
            debug!(chat_id = ?msg.chat.id, "Ignoring non-text message");
            Ok(())
        }
    }
}

/// Gate, fetch, send and count a movie requested by code
async fn handle_code_lookup(bot: Bot, msg: &Message, code: &str, services: &ServiceFactory) -> Result<()> {
    let user_id = register_sender(&bot, msg, services).await?;
    let chat_id = msg.chat.id;

    let verdict = services
        .access_gate
        .evaluate_access(user_id, ActionKind::MovieLookup)
        .await?;
    if let Verdict::Deny(reason) = verdict {
        return send_denial(&bot, chat_id, &reason).await;
    }

    let movie = match services.catalog.get_movie(code).await {
        Ok(movie) => movie,
        Err(KinoBotError::MovieNotFound { .. }) => {
            bot.send_message(chat_id, format!("❓ No movie with code {}.", truncate_text(code, 32)))
                .await?;
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    send_movie(&bot, chat_id, &movie).await?;
    services.catalog.increment_view(&movie.code).await?;

    log_user_action(user_id, "movie_lookup", Some(&movie.code));
    Ok(())
}

/// Send by stored handle; documents uploaded as files are resent as documents
async fn send_movie(bot: &Bot, chat_id: ChatId, movie: &Movie) -> Result<()> {
    let caption = format_movie_caption(movie);
    let file = || InputFile::file_id(FileId(movie.file_handle.clone()));

    if let Err(e) = bot.send_video(chat_id, file()).caption(caption.clone()).await {
        debug!(code = %movie.code, error = %e, "Sending as video failed, retrying as document");
        bot.send_document(chat_id, file()).caption(caption).await?;
    }
    Ok(())
}

pub fn format_movie_caption(movie: &Movie) -> String {
    let mut caption = format!("🎬 {}", movie.title);
    let details = [
        ("📅", &movie.year),
        ("📺", &movie.quality),
        ("🌐", &movie.language),
        ("⭐", &movie.rating),
    ];
    for (icon, value) in details {
        if let Some(value) = value {
            caption.push_str(&format!("\n{} {}", icon, value));
        }
    }
    if let Some(description) = &movie.description {
        caption.push_str(&format!("\n\n{}", truncate_text(description, 700)));
    }
    caption.push_str(&format!("\n\n🔢 Code: {}", movie.code));
    caption
}

/// Admin upload: video or document captioned `/addmovie Title | quality | ...`
async fn handle_add_movie(bot: Bot, msg: &Message, args: &str, services: &ServiceFactory) -> Result<()> {
    let admin_id = register_sender(&bot, msg, services).await?;
    let chat_id = msg.chat.id;

    let verdict = services
        .access_gate
        .evaluate_access(admin_id, ActionKind::AdminCommand)
        .await?;
    if let Verdict::Deny(reason) = verdict {
        return send_denial(&bot, chat_id, &reason).await;
    }

    let handle = msg
        .video()
        .map(|v| v.file.id.to_string())
        .or_else(|| msg.document().map(|d| d.file.id.to_string()));
    let (Some(handle), Some(metadata)) = (handle, MovieMetadata::parse_pipe_separated(args)) else {
        bot.send_message(
            chat_id,
            "Send a video with the caption:\n/addmovie Title | quality | year | language | rating | description",
        )
        .await?;
        return Ok(());
    };

    let movie = services.catalog.add_movie(metadata, &handle).await?;
    info!(admin_id = admin_id, code = %movie.code, "Movie uploaded");
    bot.send_message(chat_id, format!("✅ \"{}\" added with code {}.", movie.title, movie.code))
        .await?;
    Ok(())
}

/// Admin photo captioned `/addad <time> | <repeats> | <button> | <url> | <text>`
async fn handle_add_ad_with_image(bot: Bot, msg: &Message, args: &str, services: &ServiceFactory) -> Result<()> {
    let admin_id = register_sender(&bot, msg, services).await?;
    let chat_id = msg.chat.id;

    let verdict = services
        .access_gate
        .evaluate_access(admin_id, ActionKind::AdminCommand)
        .await?;
    if let Verdict::Deny(reason) = verdict {
        return send_denial(&bot, chat_id, &reason).await;
    }

    let image = msg
        .photo()
        .and_then(|sizes| sizes.last())
        .map(|p| p.file.id.to_string());
    ads::handle_add_ad(bot, chat_id, admin_id, args, image, services).await
}

/// Receipt photo or document captioned `/pay <months>`
async fn handle_payment_submission(bot: Bot, msg: &Message, args: &str, services: &ServiceFactory) -> Result<()> {
    let user_id = register_sender(&bot, msg, services).await?;
    let chat_id = msg.chat.id;

    let verdict = services
        .access_gate
        .evaluate_access(user_id, ActionKind::PaymentSubmission)
        .await?;
    if let Verdict::Deny(reason) = verdict {
        return send_denial(&bot, chat_id, &reason).await;
    }

    let proof = msg
        .photo()
        .and_then(|sizes| sizes.last())
        .map(|p| p.file.id.to_string())
        .or_else(|| msg.document().map(|d| d.file.id.to_string()));
    let Some(proof) = proof else {
        bot.send_message(chat_id, "Please attach a photo of the receipt with the caption /pay <months>.")
            .await?;
        return Ok(());
    };

    let months = match args.trim() {
        "" => 1,
        value => value.parse::<u32>().unwrap_or(0),
    };
    let Some(tier) = services.settings.tier_for_months(months).await? else {
        bot.send_message(chat_id, "Unknown subscription period. See /subscribe for the options.")
            .await?;
        return Ok(());
    };

    let payment = services
        .payments
        .submit_payment(user_id, tier.amount, tier.days, &proof)
        .await?;
    log_user_action(user_id, "payment_submitted", Some(&payment.id.to_string()));

    bot.send_message(
        chat_id,
        format!("🧾 Receipt #{} received. An admin will review it shortly.", payment.id),
    )
    .await?;

    notify_admins(&bot, msg, &payment, services).await
}

/// Forward the receipt to every admin with decision buttons
async fn notify_admins(bot: &Bot, msg: &Message, payment: &PendingPayment, services: &ServiceFactory) -> Result<()> {
    let keyboard = decision_keyboard(payment.id);
    let caption = format!(
        "🧾 Payment #{}\nUser: {}\nAmount: {} UZS\nPeriod: {} days",
        payment.id, payment.user_id, payment.amount, payment.period_days
    );

    for admin_id in services.admins.list_admins().await? {
        let sent = bot
            .copy_message(ChatId(admin_id), msg.chat.id, msg.id)
            .caption(caption.clone())
            .reply_markup(keyboard.clone())
            .await;
        if let Err(e) = sent {
            warn!(admin_id = admin_id, payment_id = payment.id, error = %e, "Could not notify admin");
        }
    }
    Ok(())
}

pub fn decision_keyboard(payment_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("✅ Approve", format!("pay:approve:{}", payment_id)),
        InlineKeyboardButton::callback("❌ Reject", format!("pay:reject:{}", payment_id)),
    ]])
}

/// Arguments of `/name` or `/name@bot` at the start of a caption
pub fn caption_command<'a>(caption: &'a str, name: &str, bot_username: &str) -> Option<&'a str> {
    let rest = caption.trim_start().strip_prefix('/')?;
    let (head, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let (command, mention) = head.split_once('@').unwrap_or((head, ""));

    if !command.eq_ignore_ascii_case(name) {
        return None;
    }
    if !mention.is_empty() && !mention.eq_ignore_ascii_case(bot_username) {
        return None;
    }
    Some(args.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_caption_command() {
        assert_eq!(caption_command("/pay 3", "pay", "kinobot"), Some("3"));
        assert_eq!(caption_command("/pay@KinoBot 3", "pay", "kinobot"), Some("3"));
        assert_eq!(caption_command("/pay", "pay", "kinobot"), Some(""));
        assert_eq!(caption_command("/pay@other 3", "pay", "kinobot"), None);
        assert_eq!(caption_command("/payment 3", "pay", "kinobot"), None);
        assert_eq!(
            caption_command("/addmovie Dune | 4K", "addmovie", "kinobot"),
            Some("Dune | 4K")
        );
        assert_eq!(caption_command("pay 3", "pay", "kinobot"), None);
        assert_eq!(caption_command("/addad now | 1 | | | Hi", "addad", "kinobot"), Some("now | 1 | | | Hi"));
    }

    #[test]
    fn test_movie_caption_skips_missing_fields() {
        let mut meta = MovieMetadata::titled("Dune");
        meta.year = Some("2021".to_string());
        let movie = Movie::new("5".to_string(), meta, "f".to_string(), Utc::now());

        assert_eq!(format_movie_caption(&movie), "🎬 Dune\n📅 2021\n\n🔢 Code: 5");
    }

    #[test]
    fn test_decision_keyboard_payloads() {
        let keyboard = decision_keyboard(17);
        let row = &keyboard.inline_keyboard[0];
        assert_eq!(row.len(), 2);
    }
}
