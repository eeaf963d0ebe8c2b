use anyhow::{Context as _, Result};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt as _},
    time::{Duration, sleep, timeout},
};
use tokio_serial::{SerialPortBuilderExt as _, SerialStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    reading::{Arity, ParseReadingError, Reading},
    store::LatestReadingStore,
};

pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Longest partial line kept across read timeouts.
pub const MAX_LINE_LEN: usize = 256;

pub fn open_serial(path: &str, baud_rate: u32) -> Result<SerialStream> {
    tokio_serial::new(path, baud_rate)
        .open_native_async()
        .with_context(|| format!("failed to open serial device: {path}"))
}

/// Feeds the store from a line-oriented byte stream.
#[derive(Debug, Clone, Copy)]
pub struct SerialReader {
    arity: Arity,
    read_timeout: Duration,
}

impl SerialReader {
    pub fn new(arity: Arity, read_timeout: Duration) -> Self {
        Self {
            arity,
            read_timeout,
        }
    }

    /// Reads until the stream ends or `shutdown` fires. Bad lines and read
    /// errors are logged and skipped.
    pub async fn run<R>(
        &self,
        mut reader: R,
        store: &LatestReadingStore,
        shutdown: CancellationToken,
    ) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        // Partial lines survive a timed-out read and are completed by the next one.
        let mut buf = Vec::new();

        loop {
            if shutdown.is_cancelled() {
                info!("serial reader stopped");
                return Ok(());
            }

            let read = tokio::select! {
                _ = shutdown.cancelled() => continue,
                read = timeout(self.read_timeout, reader.read_until(b'\n', &mut buf)) => read,
            };

            match read {
                Err(_) => {
                    if buf.len() > MAX_LINE_LEN {
                        warn!(len = buf.len(), "discarding unterminated serial data");
                        buf.clear();
                    } else {
                        debug!(timeout = ?self.read_timeout, "no data from serial device");
                    }
                    continue;
                }
                Ok(Err(err)) => {
                    warn!("failed to read from serial device: {err:#}");
                    buf.clear();
                    sleep(self.read_timeout).await;
                    continue;
                }
                Ok(Ok(0)) => {
                    if !buf.is_empty() {
                        self.ingest_line(&buf, store);
                    }
                    info!("serial stream closed");
                    return Ok(());
                }
                Ok(Ok(_)) => {
                    self.ingest_line(&buf, store);
                    buf.clear();
                }
            }
        }
    }

    /// Publishes the reading encoded in `line`, returning it if accepted.
    pub fn ingest_line(&self, line: &[u8], store: &LatestReadingStore) -> Option<Reading> {
        let text = match std::str::from_utf8(line) {
            Ok(t) => t,
            Err(err) => {
                warn!("failed to decode serial line: {err}");
                return None;
            }
        };

        match Reading::parse(text, self.arity) {
            Ok(reading) => {
                debug!(?reading, "reading received");
                store.publish(reading);
                Some(reading)
            }
            Err(err @ ParseReadingError::FieldCount { .. }) => {
                debug!(line = text.trim(), "discarding line: {err}");
                None
            }
            Err(err @ ParseReadingError::InvalidField { .. }) => {
                warn!(line = text.trim(), "discarding line: {err}");
                None
            }
        }
    }
}
