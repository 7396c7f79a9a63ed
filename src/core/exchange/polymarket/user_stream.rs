//! Authenticated user-channel stream (C2): maker/taker fills and order
//! lifecycle updates, L2-signed on connect.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use super::config::PolymarketConfig;
use super::user_messages::PolymarketUserMessage;
use crate::core::exchange::{SequenceGapEvent, UserChannelEvent, UserChannelStream};
use crate::error::Result;

/// Streams maker fills, taker fills, order updates, heartbeats and
/// subscription acks as a single canonicalized event sum type.
pub struct PolymarketUserStream {
    config: PolymarketConfig,
    ws: Option<WebSocketStream<MaybeTlsStream<TcpStream>>>,
    pending: Vec<UserChannelEvent>,
    last_ws_sequence: Option<u64>,
}

impl PolymarketUserStream {
    #[must_use]
    pub fn new(config: PolymarketConfig) -> Self {
        Self { config, ws: None, pending: Vec::new(), last_ws_sequence: None }
    }

    /// Track `ws_sequence` continuity; returns a gap event if `seq` skipped
    /// ahead of the last sequence number observed.
    fn check_sequence(&mut self, seq: u64) -> Option<UserChannelEvent> {
        let gap = self.last_ws_sequence.and_then(|last| {
            (seq > last + 1).then_some(SequenceGapEvent { expected_start: last + 1, expected_end: seq })
        });
        self.last_ws_sequence = Some(seq.max(self.last_ws_sequence.unwrap_or(0)));
        gap.map(UserChannelEvent::SequenceGap)
    }

    fn auth_message(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "user",
            "auth": {
                "apiKey": self.config.api_key,
                "passphrase": self.config.api_passphrase,
            },
        })
    }
}

#[async_trait]
impl UserChannelStream for PolymarketUserStream {
    async fn connect(&mut self) -> Result<()> {
        info!(url = %self.config.ws_user_url, "connecting to user channel");
        let (mut ws_stream, response) = connect_async(&self.config.ws_user_url).await?;
        info!(status = %response.status(), "user channel connected");

        let auth = serde_json::to_string(&self.auth_message())?;
        ws_stream.send(Message::Text(auth)).await?;

        self.ws = Some(ws_stream);
        Ok(())
    }

    async fn next_event(&mut self) -> Option<UserChannelEvent> {
        if let Some(event) = self.pending.pop() {
            return Some(event);
        }

        let ws = self.ws.as_mut()?;

        loop {
            match ws.next().await? {
                Ok(Message::Text(text)) => {
                    debug!(raw = %text, "received user-channel message");
                    match serde_json::from_str::<PolymarketUserMessage>(&text) {
                        Ok(PolymarketUserMessage::Trade(trade)) => {
                            let gap = self.check_sequence(trade.ws_sequence);
                            let mut updates: Vec<UserChannelEvent> = trade
                                .maker_updates()
                                .into_iter()
                                .map(UserChannelEvent::MakerFill)
                                .collect();
                            if let Some(taker) = trade.taker_update() {
                                updates.push(UserChannelEvent::TakerFill(taker));
                            }
                            self.pending.extend(updates.into_iter().rev());
                            if let Some(gap_event) = gap {
                                return Some(gap_event);
                            }
                            match self.pending.pop() {
                                Some(event) => return Some(event),
                                None => continue,
                            }
                        }
                        Ok(PolymarketUserMessage::Order(order)) => {
                            let gap = self.check_sequence(order.ws_sequence);
                            if let Some(update) = order.to_order_update() {
                                self.pending.push(UserChannelEvent::OrderUpdate(update));
                            }
                            if let Some(gap_event) = gap {
                                return Some(gap_event);
                            }
                            match self.pending.pop() {
                                Some(event) => return Some(event),
                                None => continue,
                            }
                        }
                        Ok(PolymarketUserMessage::Heartbeat) => return Some(UserChannelEvent::Heartbeat),
                        Ok(PolymarketUserMessage::SubscriptionAck) => {
                            return Some(UserChannelEvent::SubscriptionAck)
                        }
                        Ok(PolymarketUserMessage::Unknown) => continue,
                        Err(e) => {
                            warn!(error = %e, raw = %text, "failed to parse user-channel message");
                            continue;
                        }
                    }
                }
                Ok(Message::Ping(data)) => {
                    debug!("received ping");
                    if ws.send(Message::Pong(data)).await.is_err() {
                        return None;
                    }
                }
                Ok(Message::Close(frame)) => {
                    info!(frame = ?frame, "user channel closed by server");
                    return None;
                }
                Ok(_) => continue,
                Err(e) => {
                    error!(error = %e, "user-channel websocket error");
                    return None;
                }
            }
        }
    }

    fn exchange_name(&self) -> &'static str {
        "Polymarket"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream() -> PolymarketUserStream {
        PolymarketUserStream::new(PolymarketConfig::default())
    }

    #[test]
    fn consecutive_sequences_detect_no_gap() {
        let mut s = stream();
        assert!(s.check_sequence(1).is_none());
        assert!(s.check_sequence(2).is_none());
        assert!(s.check_sequence(3).is_none());
    }

    #[test]
    fn skipped_sequence_reports_the_missing_range() {
        let mut s = stream();
        assert!(s.check_sequence(1).is_none());
        let gap = s.check_sequence(5);
        match gap {
            Some(UserChannelEvent::SequenceGap(g)) => {
                assert_eq!(g.expected_start, 2);
                assert_eq!(g.expected_end, 5);
            }
            other => panic!("expected SequenceGap, got {other:?}"),
        }
    }

    #[test]
    fn out_of_order_replay_does_not_report_a_gap() {
        let mut s = stream();
        assert!(s.check_sequence(5).is_none());
        assert!(s.check_sequence(3).is_none());
    }
}
