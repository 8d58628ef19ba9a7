//! Command handlers module
//!
//! This module contains handlers for all bot commands like /start, /help, etc.

pub mod admin;
pub mod ads;
pub mod help;
pub mod search;
pub mod start;
pub mod subscription;

use teloxide::{Bot, types::Message, utils::command::BotCommands};
use crate::config::Settings;
use crate::handlers::{register_sender, send_denial};
use crate::services::{ActionKind, ServiceFactory, Verdict};
use crate::models::Decision;
use crate::utils::errors::Result;

/// All available bot commands
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "KinoBot commands")]
pub enum Command {
    #[command(description = "Start the bot")]
    Start,
    #[command(description = "Show help information")]
    Help,
    #[command(description = "Search movies by title or code")]
    Search(String),
    #[command(description = "Show subscription prices and payment details")]
    Subscribe,
    #[command(description = "Show bot statistics (admin only)")]
    Stats,
    #[command(description = "List pending payments (admin only)")]
    Pending,
    #[command(description = "Approve a payment (admin only)")]
    Approve(String),
    #[command(description = "Reject a payment (admin only)")]
    Reject(String),
    #[command(description = "Delete a movie: <code> [hard] (admin only)")]
    DelMovie(String),
    #[command(description = "List movies, `all` includes deleted (admin only)")]
    Movies(String),
    #[command(description = "Add an admin (admin only)")]
    AddAdmin(String),
    #[command(description = "Remove an admin (admin only)")]
    RemoveAdmin(String),
    #[command(description = "List admins (admin only)")]
    Admins,
    #[command(description = "Force-subscribe channels: [add|remove <channel>] (admin only)")]
    Channels(String),
    #[command(description = "Toggle force-subscribe: on|off (admin only)")]
    ForceSub(String),
    #[command(description = "Set a setting: <key> <value> (admin only)")]
    Setting(String),
    #[command(description = "Send a message to every active user (admin only)")]
    Broadcast(String),
    #[command(description = "Block a user (admin only)")]
    Block(String),
    #[command(description = "Unblock a user (admin only)")]
    Unblock(String),
    #[command(description = "Message one user: <id> <text> (admin only)")]
    MsgUser(String),
    #[command(description = "Schedule an ad: <time> | <repeats> | <button> | <url> | <text> (admin only)")]
    AddAd(String),
    #[command(description = "List scheduled ads (admin only)")]
    ListAds,
    #[command(description = "Delete an ad (admin only)")]
    DeleteAd(String),
}

impl Command {
    pub fn is_admin_command(&self) -> bool {
        !matches!(
            self,
            Command::Start | Command::Help | Command::Search(_) | Command::Subscribe
        )
    }
}

/// Main command dispatcher. Admin commands pass the access gate first.
pub async fn dispatch(
    bot: Bot,
    msg: Message,
    cmd: Command,
    services: &ServiceFactory,
    settings: &Settings,
) -> Result<()> {
    let user_id = register_sender(&bot, &msg, services).await?;
    let chat_id = msg.chat.id;

    if cmd.is_admin_command() {
        let verdict = services
            .access_gate
            .evaluate_access(user_id, ActionKind::AdminCommand)
            .await?;
        if let Verdict::Deny(reason) = verdict {
            return send_denial(&bot, chat_id, &reason).await;
        }
    }

    match cmd {
        Command::Start => start::handle_start(bot, msg, services).await,
        Command::Help => help::handle_help(bot, msg).await,
        Command::Search(query) => search::handle_search(bot, chat_id, &query, services).await,
        Command::Subscribe => subscription::handle_subscribe(bot, chat_id, services).await,
        Command::Stats => admin::handle_stats(bot, chat_id, services).await,
        Command::Pending => admin::handle_pending(bot, chat_id, services).await,
        Command::Approve(args) => admin::handle_decision(bot, chat_id, user_id, &args, Decision::Approve, services).await,
        Command::Reject(args) => admin::handle_decision(bot, chat_id, user_id, &args, Decision::Reject, services).await,
        Command::DelMovie(args) => admin::handle_delete_movie(bot, chat_id, user_id, &args, services).await,
        Command::Movies(args) => admin::handle_list_movies(bot, chat_id, &args, services).await,
        Command::AddAdmin(args) => admin::handle_add_admin(bot, chat_id, user_id, &args, services).await,
        Command::RemoveAdmin(args) => admin::handle_remove_admin(bot, chat_id, user_id, &args, services).await,
        Command::Admins => admin::handle_list_admins(bot, chat_id, services).await,
        Command::Channels(args) => admin::handle_channels(bot, chat_id, user_id, &args, services).await,
        Command::ForceSub(args) => admin::handle_force_subscribe(bot, chat_id, user_id, &args, services).await,
        Command::Setting(args) => admin::handle_setting(bot, chat_id, user_id, &args, services).await,
        Command::Broadcast(text) => admin::handle_broadcast(bot, chat_id, user_id, &text, services, settings).await,
        Command::Block(args) => admin::handle_block(bot, chat_id, user_id, &args, true, services).await,
        Command::Unblock(args) => admin::handle_block(bot, chat_id, user_id, &args, false, services).await,
        Command::MsgUser(args) => admin::handle_message_user(bot, chat_id, user_id, &args).await,
        Command::AddAd(args) => ads::handle_add_ad(bot, chat_id, user_id, &args, None, services).await,
        Command::ListAds => ads::handle_list_ads(bot, chat_id, services).await,
        Command::DeleteAd(args) => ads::handle_delete_ad(bot, chat_id, user_id, &args, services).await,
    }
}
