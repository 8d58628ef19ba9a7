//! Start command handler

use teloxide::{Bot, types::Message, prelude::*};
use tracing::debug;
use crate::handlers::{join_keyboard, sender_id};
use crate::services::ServiceFactory;
use crate::utils::errors::Result;

/// Handle /start: greet the user and show the join prompt when channels are enforced
pub async fn handle_start(bot: Bot, msg: Message, services: &ServiceFactory) -> Result<()> {
    let user_id = sender_id(&msg)?;
    let chat_id = msg.chat.id;

    debug!(user_id = user_id, chat_id = ?chat_id, "Processing /start command");

    let name = msg
        .from
        .as_ref()
        .map(|u| u.first_name.clone())
        .unwrap_or_else(|| "there".to_string());

    let channels = services.settings.enforced_channels().await?;
    let mut text = format!(
        "🎬 Hello, {}!\n\nSend me a movie code and I will send you the movie.\nUse /search to find a code by title.",
        name
    );

    if channels.is_empty() {
        bot.send_message(chat_id, text).await?;
        return Ok(());
    }

    text.push_str("\n\n📢 To use the bot, join our channels:\n");
    text.push_str(&channels.join("\n"));

    bot.send_message(chat_id, text)
        .reply_markup(join_keyboard(&channels))
        .await?;
    Ok(())
}
