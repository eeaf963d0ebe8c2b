use tokio::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatcherConfig {
    /// Time between two evaluations of the latest reading.
    pub check_interval: Duration,

    /// Internal temperature below which the dwell timer runs.
    pub low_temperature_celsius: f32,

    /// How long the temperature must stay low before the first alert.
    pub dwell: Duration,

    /// Minimum gap between two low-temperature alerts.
    pub cooldown: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(30),
            low_temperature_celsius: 15.0,
            dwell: Duration::from_secs(15 * 60),
            cooldown: Duration::from_secs(5 * 60),
        }
    }
}
