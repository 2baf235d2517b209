//! [`TransportSession`] – the request/reply channel to the decision service.
//!
//! A session is strictly half-duplex: [`TransportSession::exchange`] sends one
//! request and waits for its reply (or the deadline) before the caller can
//! issue the next one.
//!
//! [`WsSession`] carries the exchange over a WebSocket, one text frame each
//! way.  Ping, pong and empty frames arriving while a reply is awaited count
//! as readiness without data, which lets a timeout report whether the peer
//! was alive at all.
//!
//! After a timeout the old connection is dropped and a fresh one is opened
//! before the next request, so a late reply to an abandoned request can never
//! be read as the answer to a newer one.  The reconnect and the send run under
//! the same deadline as the reply: a peer that accepts TCP but never finishes
//! the handshake yields a [`TimeoutKind::NoReadiness`] timeout, not a hang.

use std::time::Duration;

use async_trait::async_trait;
use fieldbot_types::{FieldError, TimeoutKind};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message,
};
use tracing::{debug, info, warn};

/// One request/reply channel to a decision service.
#[async_trait]
pub trait TransportSession: Send {
    /// Where this session is connected, for diagnostics.
    fn endpoint(&self) -> &str;

    /// Send `request` and wait at most `timeout` for the reply payload.
    ///
    /// # Errors
    ///
    /// - [`FieldError::TransportTimeout`] when no reply arrived in time.
    /// - [`FieldError::ResponseDecode`] when the reply is not text.
    /// - [`FieldError::FatalTransport`] when the connection failed.
    async fn exchange(&mut self, request: &str, timeout: Duration) -> Result<String, FieldError>;
}

#[async_trait]
impl<T: TransportSession + ?Sized> TransportSession for Box<T> {
    fn endpoint(&self) -> &str {
        (**self).endpoint()
    }

    async fn exchange(&mut self, request: &str, timeout: Duration) -> Result<String, FieldError> {
        (**self).exchange(request, timeout).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// WebSocket session
// ─────────────────────────────────────────────────────────────────────────────

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Ceiling on any single exchange when the requested timeout would overflow
/// the clock.
const MAX_WAIT_SECS: u64 = 24 * 60 * 60;

/// WebSocket-backed [`TransportSession`].
pub struct WsSession {
    url: String,
    /// `None` after a timeout until the next exchange reconnects.
    stream: Option<WsStream>,
}

impl WsSession {
    /// Connect to `url` (e.g. `"ws://10.0.0.2:1980"`).
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Init`] if the handshake fails.
    pub async fn connect(url: &str) -> Result<Self, FieldError> {
        info!(endpoint = url, "connecting to decision service");
        let stream = open(url).await.map_err(|e| FieldError::Init {
            component: url.to_string(),
            details: e.to_string(),
        })?;
        Ok(Self {
            url: url.to_string(),
            stream: Some(stream),
        })
    }

    /// `true` while a connection is held (i.e. the last exchange did not
    /// time out).
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

async fn open(url: &str) -> Result<WsStream, tokio_tungstenite::tungstenite::Error> {
    let (stream, _response) = connect_async(url).await?;
    Ok(stream)
}

#[async_trait]
impl TransportSession for WsSession {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn exchange(&mut self, request: &str, timeout: Duration) -> Result<String, FieldError> {
        // One deadline covers reconnect, send and reply.
        let started = Instant::now();
        let deadline = started
            .checked_add(timeout)
            .unwrap_or_else(|| started + Duration::from_secs(MAX_WAIT_SECS));
        let timed_out = |kind| FieldError::TransportTimeout {
            kind,
            waited_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };

        if self.stream.is_none() {
            debug!(endpoint = %self.url, "reopening decision-service connection");
            let fresh = match tokio::time::timeout_at(deadline, open(&self.url)).await {
                Ok(opened) => opened
                    .map_err(|e| FieldError::FatalTransport(format!("reconnect to {}: {e}", self.url)))?,
                Err(_) => {
                    warn!(endpoint = %self.url, "reconnect did not complete before the reply deadline");
                    return Err(timed_out(TimeoutKind::NoReadiness));
                }
            };
            self.stream = Some(fresh);
        }
        let Some(stream) = self.stream.as_mut() else {
            return Err(FieldError::FatalTransport("no connection".to_string()));
        };

        let sent = tokio::time::timeout_at(
            deadline,
            stream.send(Message::Text(request.to_string().into())),
        )
        .await;
        match sent {
            Ok(result) => result.map_err(|e| FieldError::FatalTransport(format!("send failed: {e}")))?,
            Err(_) => {
                self.stream = None;
                return Err(timed_out(TimeoutKind::NoReadiness));
            }
        }

        let mut saw_activity = false;
        loop {
            let next = match tokio::time::timeout_at(deadline, stream.next()).await {
                Ok(next) => next,
                Err(_) => {
                    self.stream = None;
                    return Err(timed_out(if saw_activity {
                        TimeoutKind::ReadyWithoutData
                    } else {
                        TimeoutKind::NoReadiness
                    }));
                }
            };
            match next {
                None => {
                    return Err(FieldError::FatalTransport("connection closed by peer".to_string()));
                }
                Some(Err(e)) => return Err(FieldError::FatalTransport(e.to_string())),
                Some(Ok(Message::Close(frame))) => {
                    return Err(FieldError::FatalTransport(format!("peer sent close: {frame:?}")));
                }
                Some(Ok(Message::Text(text))) if !text.as_str().is_empty() => {
                    return Ok(text.as_str().to_owned());
                }
                Some(Ok(Message::Binary(bytes))) if !bytes.is_empty() => {
                    return String::from_utf8(bytes.to_vec())
                        .map_err(|e| FieldError::ResponseDecode(format!("binary reply is not UTF-8: {e}")));
                }
                Some(Ok(_)) => saw_activity = true,
            }
        }
    }
}
