//! Help command handler

use teloxide::{Bot, types::Message, prelude::*};
use crate::utils::errors::Result;

/// Handle /help command
pub async fn handle_help(bot: Bot, msg: Message) -> Result<()> {
    let help_text = "🎬 KinoBot Help\n\n\
        Send a movie code to receive the movie.\n\n\
        /start - Start the bot\n\
        /help - Show this help message\n\
        /search <title> - Find movies and their codes\n\
        /subscribe - Subscription prices and payment details\n\n\
        To pay, send a photo of your receipt with the caption /pay <months>.";

    bot.send_message(msg.chat.id, help_text).await?;
    Ok(())
}
