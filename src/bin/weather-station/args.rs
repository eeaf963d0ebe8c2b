use chrono_tz::Tz;
use clap::Parser;
use tokio::time::Duration;
use weather_station::{
    alert::{ChatId, WatcherConfig},
    reading::Arity,
    serial::DEFAULT_BAUD_RATE,
};

#[derive(Debug, Parser)]
#[command(about = "Serial weather station monitor with chat alerts")]
pub struct Args {
    #[arg(long, env = "SERIAL_DEVICE", default_value = "/dev/ttyUSB0")]
    pub serial_device: String,

    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud_rate: u32,

    #[arg(long, value_enum, default_value_t = Arity::Co2)]
    pub arity: Arity,

    #[arg(long, default_value_t = 5)]
    pub read_timeout_secs: u64,

    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, default_value = "ESP32")]
    pub source_tag: String,

    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    pub bot_token: String,

    #[arg(long, env = "BOT_USERNAME", default_value = "")]
    pub bot_username: String,

    #[arg(long, env = "AUTH_USER_ID", allow_negative_numbers = true)]
    pub admin_chat_id: ChatId,

    #[arg(long, env = "TIMEZONE", default_value = "UTC")]
    pub timezone: Tz,

    #[arg(long, default_value_t = 30)]
    pub check_interval_secs: u64,

    #[arg(long, default_value_t = 15.0, allow_negative_numbers = true)]
    pub low_temperature_celsius: f32,

    #[arg(long, default_value_t = 15)]
    pub dwell_minutes: u64,

    #[arg(long, default_value_t = 5)]
    pub cooldown_minutes: u64,

    #[arg(long, default_value_t = 3)]
    pub poll_interval_secs: u64,
}

impl Args {
    pub fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig {
            check_interval: Duration::from_secs(self.check_interval_secs),
            low_temperature_celsius: self.low_temperature_celsius,
            dwell: Duration::from_secs(self.dwell_minutes * 60),
            cooldown: Duration::from_secs(self.cooldown_minutes * 60),
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
