use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::info;

use crate::{
    alert::{ChatId, TargetRegistry},
    bot::Command,
    reading::Reading,
    store::LatestReadingStore,
    telegram::{ChatKind, escape_markdown},
};

pub const DENIED_REPLY: &str = "You are not allowed to use this bot 🚫";
pub const NO_READING_REPLY: &str = "No reading received from the station yet, try again in a moment ⏳";

/// Turns incoming chat messages into replies. Only the administrator may read
/// the station; any user may manage their own temperature target.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    admin: ChatId,
    bot_username: String,
    timezone: Tz,
    store: Arc<LatestReadingStore>,
    targets: Arc<TargetRegistry>,
}

impl CommandHandler {
    pub fn new(
        admin: ChatId,
        bot_username: impl Into<String>,
        timezone: Tz,
        store: Arc<LatestReadingStore>,
        targets: Arc<TargetRegistry>,
    ) -> Self {
        Self {
            admin,
            bot_username: bot_username.into(),
            timezone,
            store,
            targets,
        }
    }

    /// Returns the reply for `text` sent from `chat`, or `None` when the
    /// message is not addressed to the bot.
    pub fn handle(&self, chat: ChatId, kind: ChatKind, text: &str) -> Option<String> {
        let text = if kind.is_group() {
            if self.bot_username.is_empty() || !text.contains(&self.bot_username) {
                return None;
            }
            text.replace(&self.bot_username, "")
        } else {
            text.to_string()
        };

        let command = match Command::parse(&text) {
            Ok(command) => command,
            Err(err) => return Some(err.to_string()),
        };

        if command.requires_admin() && chat != self.admin {
            info!(%chat, "rejected unauthorized user");
            return Some(DENIED_REPLY.to_string());
        }

        Some(self.execute(chat, command))
    }

    fn execute(&self, chat: ChatId, command: Command) -> String {
        match command {
            Command::Start => "I'm ready to tell you everything about the room ☺️\n\
                 Check the command menu to see what I can do! 🤭"
                .to_string(),
            Command::Reading => match self.store.peek() {
                Some(reading) => reading_reply(&reading, Utc::now().with_timezone(&self.timezone)),
                None => NO_READING_REPLY.to_string(),
            },
            Command::Alert { target_celsius } => {
                match self.targets.insert(chat, target_celsius) {
                    Some(previous) => format!(
                        "Target updated from {previous} °C to {target_celsius} °C, I'll let you know when it's reached 🎯"
                    ),
                    None => format!(
                        "I'll let you know when the temperature reaches {target_celsius} °C 🎯"
                    ),
                }
            }
            Command::Cancel => match self.targets.remove(chat) {
                Some(previous) => format!("Your {previous} °C target has been removed"),
                None => "You have no target set".to_string(),
            },
            Command::Targets => {
                let targets = self.targets.snapshot();
                if targets.is_empty() {
                    return "No targets registered".to_string();
                }
                targets
                    .iter()
                    .map(|(user, target)| format!("{user}: {target} °C"))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            Command::Clear { user } => match self.targets.remove(user) {
                Some(previous) => format!("Removed the {previous} °C target of {user}"),
                None => format!("{user} has no target set"),
            },
            Command::Unknown(name) => {
                format!("Unknown command: /{} 😕", escape_markdown(&name))
            }
            Command::Text(text) => text_reply(&text).to_string(),
        }
    }
}

pub fn reading_reply(reading: &Reading, now: DateTime<Tz>) -> String {
    format!(
        "*Current readings 🌡️:*\nTime: {}\nDate: {}\n\n{}",
        now.format("%H:%M:%S"),
        now.format("%d/%m/%Y"),
        reading.report()
    )
}

pub fn text_reply(text: &str) -> &'static str {
    let text = text.to_lowercase();

    if text.contains("reading") || text.contains("measure") {
        return "If you want the measurements, use the /reading command";
    }

    "I didn't understand what you mean, or the command doesn't exist 😕"
}
