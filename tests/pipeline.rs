use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::{
    io::{AsyncWriteExt as _, BufReader, DuplexStream, duplex},
    task::JoinHandle,
    time::{Duration, sleep},
};
use tokio_util::sync::CancellationToken;
use weather_station::{
    alert::{ChatId, Notifier, TargetRegistry, TargetWatcher, ThresholdWatcher, WatcherConfig},
    db::{Point, Publisher, ReadingSink},
    reading::Arity,
    serial::SerialReader,
    store::LatestReadingStore,
};

const ADMIN: ChatId = ChatId(1);

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(ChatId, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, recipient: ChatId, text: &str) -> Result<()> {
        self.sent.lock().push((recipient, text.to_string()));
        Ok(())
    }
}

impl RecordingNotifier {
    fn count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[derive(Default)]
struct MemorySink {
    points: Mutex<Vec<Point>>,
}

#[async_trait]
impl ReadingSink for MemorySink {
    async fn write(&self, points: &[Point]) -> Result<()> {
        self.points.lock().extend_from_slice(points);
        Ok(())
    }
}

struct Station {
    store: Arc<LatestReadingStore>,
    device: DuplexStream,
    shutdown: CancellationToken,
    reader: JoinHandle<Result<()>>,
}

impl Station {
    fn start(arity: Arity) -> Self {
        let store = Arc::new(LatestReadingStore::new());
        let shutdown = CancellationToken::new();
        let (device, host) = duplex(1024);

        let reader = tokio::spawn({
            let store = store.clone();
            let shutdown = shutdown.clone();
            async move {
                SerialReader::new(arity, Duration::from_secs(5))
                    .run(BufReader::new(host), &store, shutdown)
                    .await
            }
        });

        Self {
            store,
            device,
            shutdown,
            reader,
        }
    }

    async fn send(&mut self, line: &str) -> Result<()> {
        self.device.write_all(line.as_bytes()).await?;
        self.device.write_all(b"\n").await?;
        sleep(Duration::from_millis(100)).await;
        Ok(())
    }

    async fn stop(self) -> Result<()> {
        self.shutdown.cancel();
        self.reader.await??;
        Ok(())
    }
}

fn config() -> WatcherConfig {
    WatcherConfig {
        check_interval: Duration::from_secs(30),
        low_temperature_celsius: 14.0,
        dwell: Duration::from_secs(15 * 60),
        cooldown: Duration::from_secs(5 * 60),
    }
}

#[tokio::test(start_paused = true)]
async fn low_temperature_alert_is_debounced() -> Result<()> {
    let mut station = Station::start(Arity::Basic);
    let notifier = Arc::new(RecordingNotifier::default());

    station.send("10.0,45,1012,2.5,90").await?;

    let watcher = tokio::spawn(ThresholdWatcher::new(config(), ADMIN).run(
        station.store.clone(),
        notifier.clone(),
        station.shutdown.clone(),
    ));

    sleep(Duration::from_secs(14 * 60 + 45)).await;
    assert_eq!(notifier.count(), 0);

    sleep(Duration::from_secs(75)).await;
    assert_eq!(notifier.count(), 1);
    {
        let sent = notifier.sent.lock();
        assert_eq!(sent[0].0, ADMIN);
        assert!(sent[0].1.contains("below 14°C for 15 minutes"), "{}", sent[0].1);
    }

    sleep(Duration::from_secs(3 * 60 + 30)).await;
    assert_eq!(notifier.count(), 1, "cooldown should suppress reminders");

    sleep(Duration::from_secs(45)).await;
    assert_eq!(notifier.count(), 1, "no reminder at exactly minute 20");

    sleep(Duration::from_secs(45)).await;
    assert_eq!(notifier.count(), 2, "reminder expected once the cooldown elapsed");

    station.stop().await?;
    watcher.await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn warm_reading_resets_dwell() -> Result<()> {
    let mut station = Station::start(Arity::Basic);
    let notifier = Arc::new(RecordingNotifier::default());

    station.send("10.0,45,1012,2.5,90").await?;
    let watcher = tokio::spawn(ThresholdWatcher::new(config(), ADMIN).run(
        station.store.clone(),
        notifier.clone(),
        station.shutdown.clone(),
    ));

    sleep(Duration::from_secs(10 * 60 + 15)).await;
    station.send("15.0,45,1012,2.5,90").await?;
    sleep(Duration::from_secs(30)).await;
    station.send("10.0,45,1012,2.5,90").await?;

    sleep(Duration::from_secs(10 * 60)).await;
    assert_eq!(notifier.count(), 0, "dwell should restart after the warm reading");

    sleep(Duration::from_secs(6 * 60)).await;
    assert_eq!(notifier.count(), 1);

    station.stop().await?;
    watcher.await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn user_target_fires_once() -> Result<()> {
    let mut station = Station::start(Arity::Co2);
    let notifier = Arc::new(RecordingNotifier::default());
    let targets = Arc::new(TargetRegistry::new());
    targets.insert(ChatId(7), 20.0);

    let watcher = tokio::spawn(
        TargetWatcher::new(targets.clone(), Duration::from_secs(30)).run(
            station.store.clone(),
            notifier.clone(),
            station.shutdown.clone(),
        ),
    );

    station.send("18.0,45,1012,2.5,90,600").await?;
    sleep(Duration::from_secs(60)).await;
    assert_eq!(notifier.count(), 0);
    assert_eq!(targets.get(ChatId(7)), Some(20.0));

    station.send("20.0,45,1012,2.5,90,600").await?;
    sleep(Duration::from_secs(30)).await;
    assert_eq!(notifier.count(), 1);
    assert!(targets.is_empty());

    sleep(Duration::from_secs(5 * 60)).await;
    assert_eq!(notifier.count(), 1);
    assert_eq!(notifier.sent.lock()[0].0, ChatId(7));

    station.stop().await?;
    watcher.await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn publisher_and_watchers_share_the_latest_reading() -> Result<()> {
    let mut station = Station::start(Arity::Basic);
    let sink = Arc::new(MemorySink::default());

    let publisher = tokio::spawn(
        Publisher::new("ESP32", Duration::from_secs(300)).run(
            station.store.clone(),
            sink.clone(),
            station.shutdown.clone(),
        ),
    );

    station.send("21.0,45,1012,2.5,90").await?;
    station.send("12.5,bad,1,2").await?;
    station.send("22.0,46,1011,3.0,91").await?;

    let points = sink.points.lock().clone();
    assert_eq!(points.len(), 10);
    assert!(points.iter().all(|p| p.source == "ESP32"));
    assert_eq!(points[5].measurement, "temperature");
    assert_eq!(points[5].value, 22.0);

    assert_eq!(
        station.store.peek().map(|r| r.internal_temperature_celsius),
        Some(22.0),
        "persisting must not empty the slot"
    );

    station.stop().await?;
    publisher.await?;
    Ok(())
}
