//! Output routing: public or private delivery, chunked to the platform limit

use super::base::Transport;
use crate::error::ChannelError;
use crate::messages::{DeliveryMode, DispatchResult, InvocationContext};
use crate::settings::OutputSettings;
use tracing::{debug, error, warn};

/// Notice sent to the originating channel when a private channel cannot be opened
pub const DM_OPEN_FAILED_NOTICE: &str = "Something went wrong while sending the DM!";

/// Notice sent to the originating channel when a private send is rejected
pub const DM_SEND_FAILED_NOTICE: &str =
    "Failed to send you a DM. Did you disable DM in your privacy settings?";

/// Split `text` into pieces of at most `chunk_size` characters
///
/// Each piece ends just after the last `delimiter` that lies completely inside
/// the window, or at the hard limit when the window has none. Concatenating the
/// pieces gives back `text`.
pub fn split_chunks(text: &str, chunk_size: usize, delimiter: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let chunk_size = chunk_size.max(1);

    if chars.len() <= chunk_size {
        return vec![text.to_string()];
    }

    let delim: Vec<char> = delimiter.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let limit = (start + chunk_size).min(chars.len());
        let end = if limit == chars.len() {
            limit
        } else {
            find_split(&chars[start..limit], &delim)
                .map(|offset| start + offset)
                .unwrap_or(limit)
        };
        chunks.push(chars[start..end].iter().collect());
        start = end;
    }

    chunks
}

/// Offset just past the last complete occurrence of `delim` in `window`
fn find_split(window: &[char], delim: &[char]) -> Option<usize> {
    if delim.is_empty() || delim.len() > window.len() {
        return None;
    }
    (0..=window.len() - delim.len())
        .rev()
        .find(|&i| window[i..i + delim.len()] == *delim)
        .map(|i| i + delim.len())
}

/// Wrap a chunk in a code block
fn codeblock(chunk: &str) -> String {
    format!(
        "```\n{}{}```",
        chunk,
        if chunk.ends_with('\n') { "" } else { "\n" }
    )
}

/// Delivers dispatch results through a [`Transport`]
#[derive(Debug, Clone)]
pub struct OutputRouter {
    chunk_size: usize,
    delimiter: String,
}

impl OutputRouter {
    pub fn new(settings: &OutputSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            delimiter: settings.delimiter.clone(),
        }
    }

    /// The chunks `text` would be sent as
    pub fn chunks(&self, text: &str) -> Vec<String> {
        split_chunks(text, self.chunk_size, &self.delimiter)
    }

    /// Send every chunk of `result`, in order, returning one result per chunk
    ///
    /// A failed chunk does not stop the ones after it. When private delivery
    /// fails, a single notice is posted to the channel the command came from.
    pub async fn deliver(
        &self,
        result: &DispatchResult,
        ctx: &InvocationContext,
        transport: &dyn Transport,
    ) -> Vec<Result<(), ChannelError>> {
        let chunks = self.chunks(&result.output_text);
        let total = chunks.len();
        let mut outcomes = Vec::with_capacity(total);
        let mut notified = false;

        for (index, chunk) in chunks.into_iter().enumerate() {
            let body = if result.codeblock {
                codeblock(&chunk)
            } else {
                chunk
            };

            let sent = match result.delivery_mode {
                DeliveryMode::Public => transport.send_channel(&ctx.channel_id, &body).await,
                DeliveryMode::Private => transport.send_private(&ctx.user_id, &body).await,
            };

            match &sent {
                Ok(()) => debug!("sent chunk {}/{} to {:?}", index + 1, total, result.delivery_mode),
                Err(e) => {
                    error!("chunk {}/{} not delivered: {}", index + 1, total, e);
                    if result.delivery_mode == DeliveryMode::Private && !notified {
                        notified = true;
                        self.notify_dm_failure(e, ctx, transport).await;
                    }
                }
            }
            outcomes.push(sent);
        }

        outcomes
    }

    async fn notify_dm_failure(
        &self,
        failure: &ChannelError,
        ctx: &InvocationContext,
        transport: &dyn Transport,
    ) {
        let notice = match failure {
            ChannelError::PrivateChannelFailed(_) => DM_OPEN_FAILED_NOTICE,
            _ => DM_SEND_FAILED_NOTICE,
        };
        if let Err(e) = transport.send_channel(&ctx.channel_id, notice).await {
            warn!("could not post DM failure notice: {}", e);
        }
    }
}
