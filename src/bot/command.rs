use thiserror::Error;

use crate::alert::ChatId;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Reading,
    Alert { target_celsius: f32 },
    Cancel,
    Targets,
    Clear { user: ChatId },
    Unknown(String),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("usage: {usage}")]
pub struct CommandError {
    pub usage: &'static str,
}

impl Command {
    /// Parses a message body. Bot-qualified commands (`/reading@my_bot`) are
    /// accepted; anything not starting with `/` is free text.
    pub fn parse(text: &str) -> Result<Self, CommandError> {
        let text = text.trim();
        let Some(body) = text.strip_prefix('/') else {
            return Ok(Command::Text(text.to_string()));
        };

        let mut words = body.split_whitespace();
        let name = words.next().unwrap_or_default();
        let name = name.split_once('@').map_or(name, |(name, _)| name);
        let arg = words.next();

        match name {
            "start" => Ok(Command::Start),
            "reading" => Ok(Command::Reading),
            "alert" => {
                const USAGE: &str = "/alert <temperature in °C>";
                let target_celsius = arg
                    .and_then(|a| a.replace(',', ".").parse::<f32>().ok())
                    .filter(|t| t.is_finite())
                    .ok_or(CommandError { usage: USAGE })?;
                Ok(Command::Alert { target_celsius })
            }
            "cancel" => Ok(Command::Cancel),
            "targets" => Ok(Command::Targets),
            "clear" => {
                const USAGE: &str = "/clear <chat id>";
                let user = arg
                    .and_then(|a| a.parse::<ChatId>().ok())
                    .ok_or(CommandError { usage: USAGE })?;
                Ok(Command::Clear { user })
            }
            other => Ok(Command::Unknown(other.to_string())),
        }
    }

    pub fn requires_admin(&self) -> bool {
        match self {
            Command::Start
            | Command::Reading
            | Command::Targets
            | Command::Clear { .. }
            | Command::Text(_) => true,
            Command::Alert { .. } | Command::Cancel | Command::Unknown(_) => false,
        }
    }
}
