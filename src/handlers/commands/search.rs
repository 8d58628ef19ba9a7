//! Movie search command

use teloxide::{Bot, types::ChatId, prelude::*};
use crate::models::Movie;
use crate::services::ServiceFactory;
use crate::utils::errors::Result;
use crate::utils::helpers::truncate_text;

/// Handle /search <query>
pub async fn handle_search(bot: Bot, chat_id: ChatId, query: &str, services: &ServiceFactory) -> Result<()> {
    if query.trim().is_empty() {
        bot.send_message(chat_id, "Usage: /search <title or code>").await?;
        return Ok(());
    }

    let movies = services.catalog.search(query).await?;
    bot.send_message(chat_id, format_search_results(query.trim(), &movies)).await?;
    Ok(())
}

pub fn format_search_results(query: &str, movies: &[Movie]) -> String {
    if movies.is_empty() {
        return format!("🔍 Nothing found for \"{}\".", query);
    }

    let mut text = format!("🔍 Results for \"{}\":\n", query);
    for movie in movies {
        let year = movie.year.as_deref().map(|y| format!(" ({})", y)).unwrap_or_default();
        text.push_str(&format!("\n🎬 {}{} - code: {}", truncate_text(&movie.title, 60), year, movie.code));
    }
    text
}
