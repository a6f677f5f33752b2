//! Answers in-channel "get" commands with a direct download link.
//!
//! Replying "get" to a message carrying a document, video or sticker makes
//! the bot answer with `<base-url><route-prefix><reference>`.

use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};

use crate::backend::{Backend, Message, Reply, Update};
use crate::config::Config;

const COMMAND: &str = "get";

/// Pause before polling again after a failed poll.
const RETRY_DELAY: Duration = Duration::from_secs(3);

/// Run until the update stream ends, which it never does on its own.
/// Fails early only if the backend rejects our credentials.
pub async fn run(backend: Arc<dyn Backend>, config: Arc<Config>) {
    if let Err(e) = backend.verify().await {
        tracing::error!(error = %e, "Backend rejected credentials; command loop not started");
        return;
    }

    tracing::info!(channel = %config.bot.channel, "Command loop started");

    let updates = updates(Arc::clone(&backend), config.poll_timeout);
    let mut updates = std::pin::pin!(updates);
    while let Some(update) = updates.next().await {
        handle_update(backend.as_ref(), &config, &update).await;
    }
}

/// Endless sequence of updates, long-polling the backend as needed.
pub fn updates(backend: Arc<dyn Backend>, timeout: Duration) -> impl Stream<Item = Update> {
    futures::stream::unfold((backend, 0i64), move |(backend, offset)| async move {
        let mut offset = offset;
        loop {
            match backend.poll_events(offset, timeout).await {
                Ok(batch) => {
                    if let Some(last) = batch.iter().map(|u| u.update_id).max() {
                        offset = offset.max(last + 1);
                    }
                    if !batch.is_empty() {
                        let items = futures::stream::iter(batch);
                        return Some((items, (backend, offset)));
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Polling for updates failed, retrying");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    })
    .flatten()
}

/// Answer one update, if it is a command we serve.
pub async fn handle_update(backend: &dyn Backend, config: &Config, update: &Update) {
    let Some(message) = update.message() else {
        return;
    };
    let Some(reply) = reply_for(message, config) else {
        return;
    };

    if !delivery_allowed(&config.bot.channel, message.chat.id) {
        tracing::debug!(chat_id = message.chat.id, "Ignoring command from foreign chat");
        return;
    }

    match backend.send_reply(&reply).await {
        Ok(()) => tracing::debug!(chat_id = reply.chat_id, "Sent direct link"),
        Err(e) => tracing::warn!(error = %e, chat_id = reply.chat_id, "Failed to send direct link"),
    }
}

/// The reply a message asks for: a "get" replying to linkable media.
pub fn reply_for(message: &Message, config: &Config) -> Option<Reply> {
    if message.text.as_deref() != Some(COMMAND) {
        return None;
    }
    let reference = message.reply_to_message.as_ref()?.linkable_reference()?;

    Some(Reply {
        chat_id: message.chat.id,
        text: config.public_url(reference),
        reply_to_message_id: message.message_id,
    })
}

/// A "@handle" channel answers anywhere. A numeric channel only answers its
/// own chat, and an unparsable one never answers.
pub fn delivery_allowed(channel: &str, chat_id: i64) -> bool {
    if channel.starts_with('@') {
        return true;
    }
    channel.parse::<i64>().is_ok_and(|id| id == chat_id)
}
