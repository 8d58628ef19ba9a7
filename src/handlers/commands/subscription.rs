//! Subscription prices and payment details

use teloxide::{Bot, types::ChatId, prelude::*};
use crate::models::SubscriptionTier;
use crate::services::settings::{CARD_HOLDER, CARD_NUMBER};
use crate::services::ServiceFactory;
use crate::utils::errors::Result;

/// Handle /subscribe
pub async fn handle_subscribe(bot: Bot, chat_id: ChatId, services: &ServiceFactory) -> Result<()> {
    let tiers = services.settings.subscription_tiers().await?;
    let card_number = services.settings.get_setting(CARD_NUMBER).await?.unwrap_or_default();
    let card_holder = services.settings.get_setting(CARD_HOLDER).await?.unwrap_or_default();

    bot.send_message(chat_id, format_prices(&tiers, &card_number, &card_holder))
        .await?;
    Ok(())
}

pub fn format_prices(tiers: &[SubscriptionTier], card_number: &str, card_holder: &str) -> String {
    if tiers.is_empty() {
        return "💳 Subscriptions are not available right now.".to_string();
    }

    let mut text = String::from("💳 Subscription prices:\n");
    for tier in tiers {
        text.push_str(&format!("\n• {} month(s) ({} days): {} UZS", tier.months, tier.days, tier.amount));
    }
    text.push_str(&format!(
        "\n\nCard: {}\nHolder: {}\n\nAfter paying, send a photo of the receipt with the caption /pay <months>, e.g. /pay 1",
        card_number, card_holder
    ));
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_prices() {
        let tiers = vec![SubscriptionTier { months: 3, days: 90, amount: 90000 }];
        let text = format_prices(&tiers, "8600 1234", "Ali");
        assert!(text.contains("3 month(s) (90 days): 90000 UZS"));
        assert!(text.contains("Card: 8600 1234"));
        assert!(format_prices(&[], "", "").contains("not available"));
    }
}
