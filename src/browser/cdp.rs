//! Chrome DevTools Protocol connection
//!
//! Commands are JSON messages with a numeric `id`; the browser answers with a
//! message carrying the same `id`. Messages without an `id` are events.
//!
//! A reader task correlates responses with pending commands through oneshot
//! channels and fans events out on a broadcast channel. A writer task owns the
//! websocket sink.

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::{Error, Result};

const EVENT_CAPACITY: usize = 4096;

/// Waiters keyed by command id; errors travel as the browser's message
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<std::result::Result<Value, String>>>>>;

/// Event pushed by the browser
#[derive(Debug, Clone, Deserialize)]
pub struct CdpEvent {
    pub method: String,
    #[serde(default)]
    pub params: Value,
    /// Target session the event belongs to, absent for browser-level events
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    code: i64,
    message: String,
}

/// Any incoming message, before it is told apart
#[derive(Debug, Deserialize)]
struct RawMessage {
    id: Option<u64>,
    result: Option<Value>,
    error: Option<ErrorPayload>,
    method: Option<String>,
    #[serde(default)]
    params: Value,
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// Websocket connection to a browser's DevTools endpoint
#[derive(Debug)]
pub struct CdpConnection {
    next_id: AtomicU64,
    outgoing: mpsc::UnboundedSender<Message>,
    pending: PendingMap,
    events: broadcast::Sender<CdpEvent>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl CdpConnection {
    /// Connect to a `ws://` DevTools endpoint
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| Error::browser(format!("DevTools connection to {} failed: {}", url, e)))?;
        let (mut sink, mut source) = stream.split();

        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Message>();
        let writer = tokio::spawn(async move {
            while let Some(message) = outgoing_rx.recv().await {
                if let Err(e) = sink.send(message).await {
                    tracing::debug!("DevTools write failed: {}", e);
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let pending: PendingMap = Arc::default();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let reader_pending = pending.clone();
        let reader_events = events.clone();
        let reader = tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(Message::Text(text)) => dispatch(&text, &reader_pending, &reader_events),
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::debug!("DevTools read failed: {}", e);
                        break;
                    }
                }
            }

            let waiting: Vec<_> = match reader_pending.lock() {
                Ok(mut pending) => pending.drain().map(|(_, tx)| tx).collect(),
                Err(_) => Vec::new(),
            };
            for tx in waiting {
                let _ = tx.send(Err("DevTools connection closed".to_string()));
            }
        });

        Ok(Self {
            next_id: AtomicU64::new(0),
            outgoing,
            pending,
            events,
            reader,
            writer,
        })
    }

    /// Send a command and wait for its result.
    ///
    /// `session_id` routes the command to an attached target.
    pub async fn call(&self, method: &str, params: Value, session_id: Option<&str>) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut message = json!({ "id": id, "method": method, "params": params });
        if let Some(session_id) = session_id {
            message["sessionId"] = Value::String(session_id.to_string());
        }

        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .map_err(|_| Error::internal("DevTools pending map poisoned"))?
            .insert(id, tx);

        tracing::trace!("DevTools -> {} #{}", method, id);
        self.outgoing
            .send(Message::Text(message.to_string().into()))
            .map_err(|_| Error::browser("DevTools connection closed"))?;

        match rx.await {
            Ok(result) => result.map_err(|e| Error::browser(format!("{} failed: {}", method, e))),
            Err(_) => Err(Error::browser("DevTools connection closed")),
        }
    }

    /// Receive every event arriving from now on
    pub fn subscribe(&self) -> broadcast::Receiver<CdpEvent> {
        self.events.subscribe()
    }
}

impl Drop for CdpConnection {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

fn dispatch(text: &str, pending: &PendingMap, events: &broadcast::Sender<CdpEvent>) {
    let message: RawMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!("Ignoring undecodable DevTools message: {}", e);
            return;
        }
    };

    if let Some(id) = message.id {
        let waiter = pending.lock().ok().and_then(|mut pending| pending.remove(&id));
        let Some(waiter) = waiter else {
            tracing::trace!("DevTools response #{} has no waiter", id);
            return;
        };
        let result = match message.error {
            Some(error) => Err(format!("{} ({})", error.message, error.code)),
            None => Ok(message.result.unwrap_or(Value::Null)),
        };
        let _ = waiter.send(result);
    } else if let Some(method) = message.method {
        let _ = events.send(CdpEvent {
            method,
            params: message.params,
            session_id: message.session_id,
        });
    }
}
