use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::time::{Duration, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{db::Point, reading::Reading, store::LatestReadingStore};

#[async_trait]
pub trait ReadingSink: Send + Sync {
    async fn write(&self, points: &[Point]) -> Result<()>;
}

/// Forwards every newly published reading to a sink. Readings are followed,
/// not taken, so the watchers keep seeing the latest value.
#[derive(Debug, Clone)]
pub struct Publisher {
    source: String,
    stale_after: Duration,
}

impl Publisher {
    pub fn new(source: impl Into<String>, stale_after: Duration) -> Self {
        Self {
            source: source.into(),
            stale_after,
        }
    }

    pub async fn publish<S>(&self, sink: &S, reading: &Reading) -> Result<()>
    where
        S: ReadingSink + ?Sized,
    {
        let points = Point::from_reading(reading, &self.source, Utc::now());
        sink.write(&points).await?;
        debug!(points = points.len(), "reading persisted");
        Ok(())
    }

    pub async fn run<S>(
        self,
        store: Arc<LatestReadingStore>,
        sink: Arc<S>,
        shutdown: CancellationToken,
    ) where
        S: ReadingSink + ?Sized,
    {
        let mut seen = 0;

        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => break,
                next = timeout(self.stale_after, store.next_after(seen)) => next,
            };

            let Ok((generation, reading)) = next else {
                warn!(stale_after = ?self.stale_after, "no fresh reading from the station");
                continue;
            };
            seen = generation;

            if let Err(err) = self.publish(sink.as_ref(), &reading).await {
                warn!("failed to persist reading: {err:#}");
            }
        }

        info!("publisher stopped");
    }
}
