//! Websocket change channel for a Supabase-style realtime service.
//!
//! Connection lifecycle:
//!
//! 1. Connect to `{realtime_url}/websocket?apikey=...&vsn=1.0.0`.
//! 2. Send `phx_join` for `realtime:public:{table}` (plus filter suffix).
//! 3. Surface the join acknowledgement as [`ChannelEvent::Joined`], then
//!    each postgres change as [`ChannelEvent::Change`].
//! 4. Answer pings and send heartbeats; any close or error becomes a single
//!    [`ChannelEvent::Closed`], after which `next_event` returns `None`.
//!
//! The channel does not reconnect. The synchronizer owns the fallback
//! decision and degrades to polling when the channel dies.

mod messages;

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::domain::{ChangeEvent, Filter};
use crate::error::TransportError;
use crate::transport::{ChangeChannel, ChannelEvent};

use messages::{IncomingMessage, OutgoingMessage};

const HEARTBEAT_PERIOD: Duration = Duration::from_secs(30);

/// A joined-or-joining Phoenix channel over one websocket connection.
pub struct RealtimeChannel {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    topic: String,
    heartbeat: Interval,
    next_ref: u64,
    closed: bool,
}

impl RealtimeChannel {
    /// Connect and request a join for `table` (restricted to `filter`).
    ///
    /// The join acknowledgement is not awaited here; it is delivered through
    /// `next_event` so the caller can bound the wait with its own timer.
    pub async fn open(
        realtime_url: &str,
        api_key: &str,
        table: &str,
        filter: Option<&Filter>,
    ) -> Result<Self, TransportError> {
        let url = format!(
            "{}/websocket?apikey={}&vsn=1.0.0",
            realtime_url.trim_end_matches('/'),
            api_key
        );
        let topic = match filter {
            Some(filter) => format!("realtime:public:{}:{}", table, filter.realtime_expr()),
            None => format!("realtime:public:{table}"),
        };

        info!(url = %realtime_url, topic = %topic, "connecting realtime channel");
        let (mut ws, response) = connect_async(&url).await?;
        debug!(status = %response.status(), "websocket connected");

        let join = OutgoingMessage::join(&topic, 1);
        let json = serde_json::to_string(&join)
            .map_err(|e| TransportError::Protocol(e.to_string()))?;
        ws.send(Message::Text(json)).await?;

        // First heartbeat only after a full period; the join just went out.
        let mut heartbeat = interval_at(Instant::now() + HEARTBEAT_PERIOD, HEARTBEAT_PERIOD);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Ok(Self {
            ws,
            topic,
            heartbeat,
            next_ref: 2,
            closed: false,
        })
    }

    async fn send_heartbeat(&mut self) -> Result<(), TransportError> {
        let msg = OutgoingMessage::heartbeat(self.next_ref);
        self.next_ref += 1;
        let json = serde_json::to_string(&msg)
            .map_err(|e| TransportError::Protocol(e.to_string()))?;
        self.ws.send(Message::Text(json)).await?;
        Ok(())
    }

    /// Map one incoming frame to a channel event, or `None` to keep reading.
    fn interpret(&self, text: &str) -> Option<ChannelEvent> {
        let msg: IncomingMessage = match serde_json::from_str(text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(error = %e, "unparseable realtime frame, skipping");
                return None;
            }
        };

        if msg.is_join_ack(&self.topic) {
            return Some(ChannelEvent::Joined);
        }
        if msg.is_termination() && msg.topic == self.topic {
            return Some(ChannelEvent::Closed {
                reason: format!("channel terminated: {}", msg.event),
            });
        }
        if let Some(kind) = msg.change_kind() {
            return Some(ChannelEvent::Change(ChangeEvent::new(kind)));
        }

        // Heartbeat replies and presence frames carry nothing for us.
        None
    }
}

#[async_trait]
impl ChangeChannel for RealtimeChannel {
    async fn next_event(&mut self) -> Option<ChannelEvent> {
        if self.closed {
            return None;
        }

        loop {
            tokio::select! {
                _ = self.heartbeat.tick() => {
                    if let Err(e) = self.send_heartbeat().await {
                        warn!(error = %e, "heartbeat failed");
                        self.closed = true;
                        return Some(ChannelEvent::Closed { reason: e.to_string() });
                    }
                }
                frame = self.ws.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(event) = self.interpret(&text) {
                            if matches!(event, ChannelEvent::Closed { .. }) {
                                self.closed = true;
                            }
                            return Some(event);
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if self.ws.send(Message::Pong(payload)).await.is_err() {
                            self.closed = true;
                            return Some(ChannelEvent::Closed {
                                reason: "pong send failed".into(),
                            });
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        self.closed = true;
                        return Some(ChannelEvent::Closed {
                            reason: "server closed connection".into(),
                        });
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        self.closed = true;
                        return Some(ChannelEvent::Closed { reason: e.to_string() });
                    }
                }
            }
        }
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            // Best effort; the server also reaps dropped sockets.
            let _ = self.ws.close(None).await;
        }
    }
}
