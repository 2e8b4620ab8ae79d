/// Notification stream subscriber
///
/// `GET /api/notifications/sse` sends the full notification list as
/// `data: <json>\n\n` on every poll, an `event: error` frame when the server
/// can't load it, and `:` comment lines as keep-alives. [`SseDecoder`]
/// reassembles frames from arbitrarily split chunks; [`NotificationStream`]
/// runs the connection on a background task and writes each list into the
/// query cache.
///
/// There is no reconnect: when the stream ends or errors the task finishes
/// and the caller decides what to do.
///
/// # Example
///
/// ```no_run
/// use tasqar_client::{api::HttpClient, cache::QueryCache, sse::NotificationStream};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example(client: HttpClient) {
/// let cache = QueryCache::new();
/// let (stream, mut updates) = NotificationStream::spawn(client, cache.clone(), CancellationToken::new());
///
/// while let Some(notifications) = updates.recv().await {
///     println!("{} unread", notifications.iter().filter(|n| !n.read).count());
/// }
///
/// stream.stop();
/// # }
/// ```

use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use tasqar_shared::models::notification::Notification;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::HttpClient;
use crate::cache::{QueryCache, QueryData};
use crate::error::{ClientError, ClientResult};

const UPDATE_CHANNEL_CAPACITY: usize = 16;

/// One server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// `event:` field; None for the default message event
    pub event: Option<String>,
    /// `data:` lines joined with `\n`
    pub data: String,
}

/// Incremental `text/event-stream` parser
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every frame it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer
            .extend(chunk.iter().copied().filter(|&b| b != b'\r'));

        let mut frames = Vec::new();
        while let Some(end) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let raw: Vec<u8> = self.buffer.drain(..end + 2).collect();
            if let Some(frame) = parse_frame(&raw[..end]) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Bytes held back waiting for the end of a frame
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

fn parse_frame(raw: &[u8]) -> Option<SseFrame> {
    let text = String::from_utf8_lossy(raw);
    let mut event = None;
    let mut data: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.starts_with(':') {
            continue;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => event = Some(value.to_string()),
            "data" => data.push(value),
            _ => {}
        }
    }

    if event.is_none() && data.is_empty() {
        return None;
    }

    Some(SseFrame {
        event,
        data: data.join("\n"),
    })
}

/// Reads frames until the stream ends, errors or is cancelled
///
/// Each notification list is written to the cache and forwarded on
/// `updates`. Returns Ok on cancellation or when the receiver is gone.
pub async fn pump<S, E>(
    chunks: S,
    cache: &QueryCache,
    updates: &mpsc::Sender<Vec<Notification>>,
    cancel: &CancellationToken,
) -> ClientResult<()>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    tokio::pin!(chunks);
    let mut decoder = SseDecoder::new();

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Notification stream cancelled");
                return Ok(());
            }
            chunk = chunks.next() => chunk,
        };

        let chunk = match chunk {
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => return Err(ClientError::Stream(e.to_string())),
            None => return Err(ClientError::Stream("closed by server".to_string())),
        };

        for frame in decoder.push(&chunk) {
            match frame.event.as_deref() {
                None | Some("message") => {
                    let notifications: Vec<Notification> = serde_json::from_str(&frame.data)?;
                    cache.set(QueryData::Notifications(notifications.clone()));
                    let sent = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            tracing::debug!("Notification stream cancelled");
                            return Ok(());
                        }
                        sent = updates.send(notifications) => sent,
                    };
                    if sent.is_err() {
                        return Ok(());
                    }
                }
                Some("error") => return Err(ClientError::Stream(frame.data)),
                Some(other) => tracing::debug!(event = other, "Ignoring unknown event"),
            }
        }
    }
}

/// Background notification subscription
pub struct NotificationStream {
    handle: JoinHandle<ClientResult<()>>,
    cancel: CancellationToken,
}

impl NotificationStream {
    /// Connects on a spawned task; lists arrive on the returned receiver
    pub fn spawn(
        client: HttpClient,
        cache: QueryCache,
        cancel: CancellationToken,
    ) -> (Self, mpsc::Receiver<Vec<Notification>>) {
        let (tx, rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
        let task_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            let response = tokio::select! {
                _ = task_cancel.cancelled() => return Ok(()),
                response = client.open_notification_stream() => response?,
            };

            tracing::info!("Notification stream connected");
            let result = pump(response.bytes_stream(), &cache, &tx, &task_cancel).await;

            if let Err(e) = &result {
                tracing::warn!(error = %e, "Notification stream ended");
            }
            result
        });

        (Self { handle, cancel }, rx)
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the background task and returns how it ended
    pub async fn join(self) -> ClientResult<()> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(ClientError::Stream(e.to_string())),
        }
    }
}
