//! Market-data WebSocket stream.
//!
//! Subscribes to a fixed token list and yields book snapshots / incremental
//! updates / tick-size changes as a single [`MarketEvent`] stream. Does not
//! reconnect on its own; the orchestrator (C9) owns retry/backoff and
//! rebuilds a fresh stream on disconnect.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use super::messages::{PolymarketSubscribeMessage, PolymarketWsMessage};
use crate::core::domain::TokenId;
use crate::core::exchange::{MarketDataStream, MarketEvent};
use crate::error::Result;

/// Market-data stream implementing [`MarketDataStream`] against Polymarket's
/// public WebSocket feed.
pub struct PolymarketDataStream {
    url: String,
    ws: Option<WebSocketStream<MaybeTlsStream<TcpStream>>>,
    pending: Vec<MarketEvent>,
}

impl PolymarketDataStream {
    #[must_use]
    pub fn new(url: String) -> Self {
        Self { url, ws: None, pending: Vec::new() }
    }
}

#[async_trait]
impl MarketDataStream for PolymarketDataStream {
    async fn connect(&mut self) -> Result<()> {
        info!(url = %self.url, "connecting to market data stream");
        let (ws_stream, response) = connect_async(&self.url).await?;
        info!(status = %response.status(), "market data stream connected");
        self.ws = Some(ws_stream);
        Ok(())
    }

    async fn subscribe(&mut self, token_ids: &[TokenId]) -> Result<()> {
        let ws = self
            .ws
            .as_mut()
            .ok_or_else(|| crate::error::Error::Connection("not connected".into()))?;

        let asset_ids: Vec<String> = token_ids.iter().map(|t| t.as_str().to_string()).collect();
        let msg = PolymarketSubscribeMessage::new(asset_ids.clone());
        let json = serde_json::to_string(&msg)?;

        info!(assets = ?asset_ids, "subscribing to market data");
        ws.send(Message::Text(json)).await?;
        Ok(())
    }

    async fn next_event(&mut self) -> Option<MarketEvent> {
        if let Some(event) = self.pending.pop() {
            return Some(event);
        }

        let ws = self.ws.as_mut()?;

        loop {
            match ws.next().await? {
                Ok(Message::Text(text)) => {
                    debug!(raw = %text, "received market data message");
                    match serde_json::from_str::<PolymarketWsMessage>(&text) {
                        Ok(PolymarketWsMessage::Book(book)) => {
                            return Some(MarketEvent::BookSnapshot {
                                token_id: book.token_id(),
                                bids: book.parsed_bids(),
                                asks: book.parsed_asks(),
                            });
                        }
                        Ok(PolymarketWsMessage::PriceChange(change)) => {
                            let token_id = change.token_id();
                            let mut deltas: Vec<MarketEvent> = change
                                .parsed_changes()
                                .into_iter()
                                .map(|(side, price, size)| MarketEvent::BookDelta {
                                    token_id: token_id.clone(),
                                    side,
                                    price,
                                    size,
                                })
                                .collect();
                            let Some(first) = deltas.pop() else { continue };
                            self.pending.extend(deltas);
                            return Some(first);
                        }
                        Ok(PolymarketWsMessage::TickSizeChange(change)) => {
                            let Some(new_tick_size) = change.parsed_tick_size() else { continue };
                            return Some(MarketEvent::TickSizeChanged {
                                token_id: change.token_id(),
                                new_tick_size,
                            });
                        }
                        Ok(PolymarketWsMessage::Unknown) => continue,
                        Err(e) => {
                            warn!(error = %e, raw = %text, "failed to parse market data message");
                            continue;
                        }
                    }
                }
                Ok(Message::Ping(data)) => {
                    debug!("received ping");
                    if ws.send(Message::Pong(data)).await.is_err() {
                        return Some(MarketEvent::Disconnected {
                            reason: "failed to send pong".into(),
                        });
                    }
                }
                Ok(Message::Close(frame)) => {
                    info!(frame = ?frame, "market data stream closed by server");
                    return Some(MarketEvent::Disconnected {
                        reason: frame.map(|f| f.reason.to_string()).unwrap_or_default(),
                    });
                }
                Ok(_) => continue,
                Err(e) => {
                    error!(error = %e, "market data websocket error");
                    return Some(MarketEvent::Disconnected { reason: e.to_string() });
                }
            }
        }
    }

    fn exchange_name(&self) -> &'static str {
        "Polymarket"
    }
}
