//! WebSocket endpoint (spec.md §4.9): typed messages carrying commands in
//! and price/index/alert data out, plus a presence/system envelope.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use quotron_types::{Alert, MarketIndex, Quote};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::state::AppState;

/// The closed set of message kinds the WebSocket carries in either
/// direction (spec.md §4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// Client identity/handshake payload.
    User {
        /// Display name or client identifier.
        name: String,
    },
    /// A client-issued command (`fetch_price`, `fetch_indices`, `monitor`).
    Command {
        /// Which command to run.
        command: Command,
        /// Command arguments, e.g. the symbol or index name.
        #[serde(default)]
        args: Vec<String>,
    },
    /// A fetched quote, pushed in response to `fetch_price`.
    PriceData {
        /// The fetched quote.
        quote: Quote,
    },
    /// A fetched index, pushed in response to `fetch_indices`.
    IndexData {
        /// The fetched index.
        index: MarketIndex,
    },
    /// An alert forwarded from `quotron:alerts:stream`.
    Alert {
        /// The forwarded alert.
        alert: Alert,
    },
    /// Client-side typing indicator, echoed back unmodified.
    Typing,
    /// An error surfaced to the client in place of the expected data message.
    Error {
        /// Human-readable description.
        message: String,
    },
    /// A server-originated informational message (connect/disconnect, etc.).
    System {
        /// Human-readable description.
        message: String,
    },
}

/// Commands a client may issue over the `command` message kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Fetch a single equity/crypto quote; `args[0]` is the symbol.
    FetchPrice,
    /// Fetch one or more market indices; `args` are the index names.
    FetchIndices,
    /// Subscribe this connection to the alert broadcast feed.
    Monitor,
}

/// Axum handler for the `GET /ws` upgrade.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut alerts = state.alerts.subscribe();
    let mut monitoring = false;

    let greeting = WsMessage::System {
        message: "connected".to_string(),
    };
    if send(&mut sender, &greeting).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<WsMessage>(&text) {
                            Ok(msg) => {
                                if let WsMessage::Command { command: Command::Monitor, .. } = &msg {
                                    monitoring = true;
                                }
                                if handle_message(&state, &mut sender, msg).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                debug!(error = %e, "malformed websocket message");
                                let err = WsMessage::Error { message: format!("malformed message: {e}") };
                                if send(&mut sender, &err).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "websocket receive error");
                        break;
                    }
                }
            }
            alert = alerts.recv(), if monitoring => {
                match alert {
                    Ok(alert) => {
                        if send(&mut sender, &WsMessage::Alert { alert }).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "websocket client lagged behind alert feed");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

async fn handle_message(
    state: &Arc<AppState>,
    sender: &mut (impl futures_util::Sink<Message, Error = axum::Error> + Unpin),
    msg: WsMessage,
) -> Result<(), axum::Error> {
    match msg {
        WsMessage::Command { command: Command::FetchPrice, args } => {
            let Some(symbol) = args.first() else {
                return send(sender, &WsMessage::Error { message: "fetch_price requires a symbol".to_string() }).await;
            };
            match state.equity.get_stock_quote(symbol).await {
                Ok(quote) => send(sender, &WsMessage::PriceData { quote }).await,
                Err(e) => send(sender, &WsMessage::Error { message: e.to_string() }).await,
            }
        }
        WsMessage::Command { command: Command::FetchIndices, args } => {
            for name in &args {
                match state.equity.get_market_index(name).await {
                    Ok(index) => send(sender, &WsMessage::IndexData { index }).await?,
                    Err(e) => send(sender, &WsMessage::Error { message: e.to_string() }).await?,
                }
            }
            Ok(())
        }
        WsMessage::Command { command: Command::Monitor, .. } => {
            send(sender, &WsMessage::System { message: "monitoring alerts".to_string() }).await
        }
        WsMessage::Typing => send(sender, &WsMessage::Typing).await,
        WsMessage::User { .. } | WsMessage::PriceData { .. } | WsMessage::IndexData { .. } | WsMessage::Alert { .. } | WsMessage::Error { .. } | WsMessage::System { .. } => {
            Ok(())
        }
    }
}

async fn send(
    sender: &mut (impl futures_util::Sink<Message, Error = axum::Error> + Unpin),
    msg: &WsMessage,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(msg).unwrap_or_else(|_| "{\"type\":\"error\"}".to_string());
    sender.send(Message::Text(text.into())).await
}
