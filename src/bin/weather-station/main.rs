mod args;

use std::{process::ExitCode, sync::Arc};

use anyhow::{Context as _, Result, anyhow};
use args::Args;
use clap::Parser as _;
use tokio::{io::BufReader, task::JoinSet, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use weather_station::{
    alert::{TargetRegistry, TargetWatcher, ThresholdWatcher},
    bot::{CommandHandler, run_polling},
    db::{PgSink, Publisher, new_pool},
    serial::{SerialReader, open_serial},
    store::LatestReadingStore,
    telegram::TelegramClient,
};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("weather_station=info")),
        )
        .init();

    if let Err(e) = run().await {
        error!("{e:#}");
        return ExitCode::from(1);
    }

    ExitCode::from(0)
}

async fn run() -> Result<()> {
    let args = Args::parse();
    let config = args.watcher_config();

    let store = Arc::new(LatestReadingStore::new());
    let targets = Arc::new(TargetRegistry::new());
    let telegram =
        Arc::new(TelegramClient::new(&args.bot_token).context("failed to create Telegram client")?);

    let serial = open_serial(&args.serial_device, args.baud_rate)?;
    info!(device = %args.serial_device, baud_rate = args.baud_rate, arity = %args.arity, "serial device opened");

    let shutdown = CancellationToken::new();
    let mut tasks: JoinSet<Result<&'static str>> = JoinSet::new();

    tasks.spawn({
        let reader = SerialReader::new(args.arity, args.read_timeout());
        let store = store.clone();
        let shutdown = shutdown.clone();
        async move {
            reader
                .run(BufReader::new(serial), &store, shutdown)
                .await
                .context("serial reader failed")?;
            Ok("serial reader")
        }
    });

    match &args.database_url {
        Some(database_url) => {
            let pool = new_pool(database_url).await?;
            let publisher = Publisher::new(&args.source_tag, config.check_interval * 10);
            let fut = publisher.run(store.clone(), Arc::new(PgSink::new(pool)), shutdown.clone());
            tasks.spawn(async move {
                fut.await;
                Ok("publisher")
            });
        }
        None => warn!("no database configured, readings will not be persisted"),
    }

    let fut = ThresholdWatcher::new(config, args.admin_chat_id).run(
        store.clone(),
        telegram.clone(),
        shutdown.clone(),
    );
    tasks.spawn(async move {
        fut.await;
        Ok("threshold watcher")
    });

    let fut = TargetWatcher::new(targets.clone(), config.check_interval).run(
        store.clone(),
        telegram.clone(),
        shutdown.clone(),
    );
    tasks.spawn(async move {
        fut.await;
        Ok("target watcher")
    });

    tasks.spawn({
        let handler = CommandHandler::new(
            args.admin_chat_id,
            args.bot_username.clone(),
            args.timezone,
            store.clone(),
            targets.clone(),
        );
        let telegram = telegram.clone();
        let poll_interval = args.poll_interval();
        let shutdown = shutdown.clone();
        async move {
            run_polling(&telegram, &handler, poll_interval, shutdown).await;
            Ok("chat polling")
        }
    });

    // Any task ending on its own (the serial stream closing, for instance) stops the station.
    let first = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for shutdown signal")?;
            info!("shutdown requested");
            None
        }
        joined = tasks.join_next() => joined,
    };

    shutdown.cancel();

    let mut result = match first {
        Some(joined) => report(joined),
        None => Ok(()),
    };

    let drain = async {
        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = report(joined) {
                result = Err(err);
            }
        }
    };
    if tokio::time::timeout(Duration::from_secs(30), drain).await.is_err() {
        tasks.abort_all();
        return Err(anyhow!("timed out waiting for tasks to stop"));
    }

    result
}

fn report(joined: Result<Result<&'static str>, tokio::task::JoinError>) -> Result<()> {
    let name = joined.context("task panicked")??;
    info!("{name} finished");
    Ok(())
}
