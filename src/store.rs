use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::reading::Reading;

#[derive(Debug, Default)]
struct Slot {
    reading: Option<Reading>,
    generation: u64,
}

/// Single-slot holder of the most recent [`Reading`].
///
/// Publishing replaces whatever is resident, so consumers always see the newest
/// value and may skip older ones that were never consumed. `peek` and
/// `next_after` leave the slot untouched; `take` empties it and waits for the
/// next publish when nothing is resident.
#[derive(Debug, Default)]
pub struct LatestReadingStore {
    slot: Mutex<Slot>,
    takers: Notify,
    followers: Notify,
}

impl LatestReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, reading: Reading) {
        {
            let mut slot = self.slot.lock();
            slot.reading = Some(reading);
            slot.generation += 1;
        }
        self.takers.notify_one();
        self.followers.notify_waiters();
    }

    pub fn peek(&self) -> Option<Reading> {
        self.slot.lock().reading
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().reading.is_none()
    }

    /// Removes and returns the resident reading, waiting for a publish if the
    /// slot is empty.
    pub async fn take(&self) -> Reading {
        loop {
            // Registered before checking the slot so a publish in between is not missed.
            let published = self.takers.notified();

            let resident = self.slot.lock().reading.take();
            if let Some(reading) = resident {
                return reading;
            }

            published.await;
        }
    }

    /// Waits until a reading published after generation `seen` is resident and
    /// returns it with its generation, without consuming it.
    pub async fn next_after(&self, seen: u64) -> (u64, Reading) {
        loop {
            let published = self.followers.notified();

            let resident = {
                let slot = self.slot.lock();
                slot.reading
                    .filter(|_| slot.generation > seen)
                    .map(|reading| (slot.generation, reading))
            };
            if let Some(resident) = resident {
                return resident;
            }

            published.await;
        }
    }
}
