//! Channel membership checks
//!
//! The access gate only knows the `MembershipChecker` capability; the
//! Telegram implementation asks the Bot API for the member's status.

use async_trait::async_trait;
use teloxide::types::{ChatId, ChatMemberKind, Recipient, UserId};
use teloxide::{prelude::Request, requests::Requester, Bot};
use tracing::debug;
use crate::utils::errors::Result;

#[async_trait]
pub trait MembershipChecker: Send + Sync {
    /// Whether `user_id` is currently a member of `channel`
    async fn is_member(&self, channel: &str, user_id: i64) -> Result<bool>;
}

/// Membership via `getChatMember`
#[derive(Clone)]
pub struct TelegramMembership {
    bot: Bot,
}

impl TelegramMembership {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

/// Numeric ids address the chat directly, anything else is a public username
pub fn channel_recipient(channel: &str) -> Recipient {
    let channel = channel.trim();
    match channel.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) => {
            let name = channel
                .trim_start_matches("https://t.me/")
                .trim_start_matches('@');
            Recipient::ChannelUsername(format!("@{}", name))
        }
    }
}

/// Restricted users are listed in the chat even after leaving it, so only
/// their `is_member` flag tells
pub fn counts_as_member(kind: &ChatMemberKind) -> bool {
    match kind {
        ChatMemberKind::Left | ChatMemberKind::Banned(_) => false,
        ChatMemberKind::Restricted(restricted) => restricted.is_member,
        _ => true,
    }
}

#[async_trait]
impl MembershipChecker for TelegramMembership {
    async fn is_member(&self, channel: &str, user_id: i64) -> Result<bool> {
        let member = self
            .bot
            .get_chat_member(channel_recipient(channel), UserId(user_id as u64))
            .send()
            .await?;

        let is_member = counts_as_member(&member.kind);
        debug!(
            user_id = user_id,
            channel = channel,
            is_member = is_member,
            member_kind = ?member.kind,
            "Chat member status retrieved"
        );

        Ok(is_member)
    }
}
