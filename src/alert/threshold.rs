use std::sync::Arc;

use tokio::time::{Duration, Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    alert::{ChatId, Notifier, WatcherConfig},
    store::LatestReadingStore,
};

/// Progress of the current low-temperature episode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DwellState {
    pub below_since: Option<Instant>,
    pub last_alert_at: Option<Instant>,
}

/// Reminds the administrator while the internal temperature stays below the
/// configured threshold: first after `dwell`, then at most once per `cooldown`.
#[derive(Debug)]
pub struct ThresholdWatcher {
    config: WatcherConfig,
    recipient: ChatId,
    state: DwellState,
}

impl ThresholdWatcher {
    pub fn new(config: WatcherConfig, recipient: ChatId) -> Self {
        Self {
            config,
            recipient,
            state: DwellState::default(),
        }
    }

    pub fn state(&self) -> DwellState {
        self.state
    }

    /// Advances the dwell state with a temperature observed at `now`. Returns
    /// the time spent below the threshold when an alert is due.
    pub fn observe(&mut self, temperature_celsius: f32, now: Instant) -> Option<Duration> {
        if temperature_celsius >= self.config.low_temperature_celsius {
            self.state = DwellState::default();
            return None;
        }

        let Some(below_since) = self.state.below_since else {
            self.state.below_since = Some(now);
            return None;
        };

        let elapsed = now.saturating_duration_since(below_since);
        debug!(
            temperature_celsius,
            elapsed_minutes = elapsed.as_secs() / 60,
            "internal temperature below threshold"
        );

        if elapsed < self.config.dwell {
            return None;
        }

        // A reminder is due only once the cooldown has strictly passed.
        if let Some(last_alert_at) = self.state.last_alert_at
            && now.saturating_duration_since(last_alert_at) <= self.config.cooldown
        {
            return None;
        }

        self.state.last_alert_at = Some(now);
        Some(elapsed)
    }

    /// Runs one evaluation against the store. Returns whether an alert was
    /// delivered.
    pub async fn check<N>(&mut self, store: &LatestReadingStore, notifier: &N, now: Instant) -> bool
    where
        N: Notifier + ?Sized,
    {
        let Some(reading) = store.peek() else {
            return false;
        };

        let Some(elapsed) = self.observe(reading.internal_temperature_celsius, now) else {
            return false;
        };

        let text = format!(
            "*Warning:* the internal temperature has been below {}°C for {} minutes! 🥶",
            self.config.low_temperature_celsius,
            elapsed.as_secs() / 60
        );

        match notifier.notify(self.recipient, &text).await {
            Ok(()) => {
                info!(recipient = %self.recipient, "low temperature alert sent");
                true
            }
            Err(err) => {
                warn!(recipient = %self.recipient, "failed to send low temperature alert: {err:#}");
                false
            }
        }
    }

    pub async fn run<N>(
        mut self,
        store: Arc<LatestReadingStore>,
        notifier: Arc<N>,
        shutdown: CancellationToken,
    ) where
        N: Notifier + ?Sized,
    {
        let mut ticker = interval(self.config.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            self.check(&store, notifier.as_ref(), Instant::now()).await;
        }

        info!("threshold watcher stopped");
    }
}
