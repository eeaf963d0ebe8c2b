use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    alert::{ChatId, Notifier},
    store::LatestReadingStore,
};

#[derive(Debug, Clone, Copy)]
struct Entry {
    target_celsius: f32,
    version: u64,
    in_flight: bool,
}

#[derive(Debug, Default)]
struct Targets {
    entries: IndexMap<ChatId, Entry>,
    next_version: u64,
}

/// A reached target whose notification is being delivered. The entry stays
/// registered until [`TargetRegistry::complete`] or [`TargetRegistry::release`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClaimedTarget {
    pub user: ChatId,
    pub target_celsius: f32,
    version: u64,
}

/// One-shot temperature targets, at most one per user, iterated in
/// registration order.
#[derive(Debug, Default)]
pub struct TargetRegistry {
    targets: Mutex<Targets>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `user`'s target, returning the one it replaces.
    pub fn insert(&self, user: ChatId, target_celsius: f32) -> Option<f32> {
        let mut targets = self.targets.lock();
        targets.next_version += 1;
        let entry = Entry {
            target_celsius,
            version: targets.next_version,
            in_flight: false,
        };
        targets
            .entries
            .insert(user, entry)
            .map(|previous| previous.target_celsius)
    }

    pub fn remove(&self, user: ChatId) -> Option<f32> {
        self.targets
            .lock()
            .entries
            .shift_remove(&user)
            .map(|entry| entry.target_celsius)
    }

    pub fn get(&self, user: ChatId) -> Option<f32> {
        self.targets
            .lock()
            .entries
            .get(&user)
            .map(|entry| entry.target_celsius)
    }

    pub fn snapshot(&self) -> Vec<(ChatId, f32)> {
        self.targets
            .lock()
            .entries
            .iter()
            .map(|(user, entry)| (*user, entry.target_celsius))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.targets.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.lock().entries.is_empty()
    }

    /// Claims every target at or below `temperature_celsius` that is not
    /// already being delivered.
    pub fn claim_reached(&self, temperature_celsius: f32) -> Vec<ClaimedTarget> {
        let mut targets = self.targets.lock();
        targets
            .entries
            .iter_mut()
            .filter(|(_, entry)| !entry.in_flight && entry.target_celsius <= temperature_celsius)
            .map(|(user, entry)| {
                entry.in_flight = true;
                ClaimedTarget {
                    user: *user,
                    target_celsius: entry.target_celsius,
                    version: entry.version,
                }
            })
            .collect()
    }

    /// Drops a delivered target, unless it was replaced in the meantime.
    pub fn complete(&self, claimed: &ClaimedTarget) {
        let mut targets = self.targets.lock();
        if targets
            .entries
            .get(&claimed.user)
            .is_some_and(|entry| entry.version == claimed.version)
        {
            targets.entries.shift_remove(&claimed.user);
        }
    }

    /// Makes an undelivered target eligible again. Targets removed or
    /// replaced while the delivery was in flight are left as they are.
    pub fn release(&self, claimed: &ClaimedTarget) {
        if let Some(entry) = self.targets.lock().entries.get_mut(&claimed.user)
            && entry.version == claimed.version
        {
            entry.in_flight = false;
        }
    }
}

/// Tells each user once when the internal temperature reaches their target.
#[derive(Debug, Clone)]
pub struct TargetWatcher {
    registry: Arc<TargetRegistry>,
    check_interval: Duration,
}

impl TargetWatcher {
    pub fn new(registry: Arc<TargetRegistry>, check_interval: Duration) -> Self {
        Self {
            registry,
            check_interval,
        }
    }

    /// Runs one evaluation against the store. Returns the users that were
    /// notified.
    pub async fn check<N>(&self, store: &LatestReadingStore, notifier: &N) -> Vec<ChatId>
    where
        N: Notifier + ?Sized,
    {
        let Some(reading) = store.peek() else {
            return Vec::new();
        };
        let temperature_celsius = reading.internal_temperature_celsius;

        let mut notified = Vec::new();
        for claimed in self.registry.claim_reached(temperature_celsius) {
            let ClaimedTarget {
                user,
                target_celsius,
                ..
            } = claimed;
            let text = format!(
                "🌡️ The internal temperature reached {temperature_celsius} °C (your target: {target_celsius} °C)"
            );

            match notifier.notify(user, &text).await {
                Ok(()) => {
                    info!(%user, target_celsius, "target temperature alert sent");
                    self.registry.complete(&claimed);
                    notified.push(user);
                }
                Err(err) => {
                    warn!(%user, "failed to send target temperature alert: {err:#}");
                    self.registry.release(&claimed);
                }
            }
        }

        notified
    }

    pub async fn run<N>(
        self,
        store: Arc<LatestReadingStore>,
        notifier: Arc<N>,
        shutdown: CancellationToken,
    ) where
        N: Notifier + ?Sized,
    {
        let mut ticker = interval(self.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            self.check(&store, notifier.as_ref()).await;
        }

        info!("target watcher stopped");
    }
}
