use tokio::time::{Duration, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{bot::CommandHandler, telegram::TelegramClient};

const LONG_POLL_TIMEOUT: Duration = Duration::from_secs(10);

/// Polls the Bot API for messages and answers them until `shutdown` fires.
pub async fn run_polling(
    client: &TelegramClient,
    handler: &CommandHandler,
    poll_interval: Duration,
    shutdown: CancellationToken,
) {
    let mut offset = 0;

    info!("polling for chat messages");
    loop {
        let updates = tokio::select! {
            _ = shutdown.cancelled() => break,
            updates = client.get_updates(offset, LONG_POLL_TIMEOUT) => updates,
        };

        match updates {
            Ok(updates) => {
                for update in updates {
                    offset = offset.max(update.update_id + 1);

                    let Some(message) = update.message else {
                        continue;
                    };
                    let Some(text) = message.text.as_deref() else {
                        continue;
                    };

                    let chat = message.chat.id;
                    debug!(%chat, kind = ?message.chat.kind, text, "message received");

                    let Some(reply) = handler.handle(chat, message.chat.kind, text) else {
                        continue;
                    };

                    if let Err(err) = client.send_message(chat, &reply).await {
                        warn!(%chat, "failed to reply: {err:#}");
                    }
                }
            }
            Err(err) => warn!("{err:#}"),
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = sleep(poll_interval) => {}
        }
    }

    info!("chat polling stopped");
}
