//! WebSocket handler implementation
//!
//! Each connection owns a session. Requests are answered in order; every
//! subscription runs a task that forwards the newest event of its topic, so a
//! slow client skips intermediate updates instead of building a backlog.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use common::error::Error;
use futures::{SinkExt, StreamExt};
use market_data::channel::Topic;
use market_data::TopicReceiver;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::ApiError;
use crate::ws::message::{Subscription, WsError, WsNotification, WsRequest, WsResponse};
use crate::AppState;

/// Messages queued per connection before senders wait
const OUTBOUND_BUFFER: usize = 100;
/// Open subscriptions allowed per connection, each backed by a task
const MAX_SUBSCRIPTIONS: usize = 50;
const DEFAULT_DEPTH: usize = 20;
const DEFAULT_TRADES: usize = 100;

/// Handle WebSocket connection
pub async fn ws_handler(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let client_id = Uuid::new_v4();
    info!("New WebSocket connection: {}", client_id);

    let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_BUFFER);
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Forward queued messages to the socket
    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = ws_sender.send(Message::Text(message)).await {
                error!("Error sending message: {}", e);
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    let mut session = Session::new(state, tx.clone());

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                debug!("Received text message: {}", text);
                let response = session.handle_text(&text);
                if !send_json(&tx, &response).await {
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                debug!("Received close message");
                break;
            }
            Err(e) => {
                error!("Error receiving message: {}", e);
                break;
            }
            // Pings are answered by axum
            _ => {}
        }
    }

    info!("WebSocket connection closed: {}", client_id);
    session.close();
    send_task.abort();
}

/// Serialize and queue a message; false once the connection is gone
async fn send_json<T: serde::Serialize>(tx: &mpsc::Sender<String>, message: &T) -> bool {
    match serde_json::to_string(message) {
        Ok(text) => tx.send(text).await.is_ok(),
        Err(e) => {
            error!("Failed to serialize WebSocket message: {}", e);
            true
        }
    }
}

fn service_error(error: Error) -> WsError {
    let code = ApiError::from(error);
    WsError {
        code: code.status_and_code().0.as_u16(),
        message: code.to_string(),
    }
}

fn string_param<'a>(params: &'a Value, name: &str) -> Result<&'a str, WsError> {
    params
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| WsError::bad_request(format!("Missing or invalid {} parameter", name)))
}

fn usize_param(params: &Value, name: &str, default: usize) -> usize {
    params
        .get(name)
        .and_then(Value::as_u64)
        .map_or(default, |value| value as usize)
}

/// State of one connection
pub struct Session {
    state: Arc<AppState>,
    tx: mpsc::Sender<String>,
    subscriptions: HashMap<Uuid, (Subscription, JoinHandle<()>)>,
}

impl Session {
    pub fn new(state: Arc<AppState>, tx: mpsc::Sender<String>) -> Self {
        Self {
            state,
            tx,
            subscriptions: HashMap::new(),
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Answer one raw request
    pub fn handle_text(&mut self, text: &str) -> WsResponse {
        match serde_json::from_str::<WsRequest>(text) {
            Ok(request) => {
                let outcome = self.dispatch(&request);
                WsResponse::reply(request.id, outcome)
            }
            Err(e) => WsResponse::reply("0".to_string(), Err(WsError::bad_request(format!("Invalid request: {}", e)))),
        }
    }

    fn dispatch(&mut self, request: &WsRequest) -> Result<Value, WsError> {
        let params = &request.params;
        match request.method.as_str() {
            "subscribe" => self.subscribe(string_param(params, "channel")?, string_param(params, "market")?),
            "unsubscribe" => {
                let id = Uuid::parse_str(string_param(params, "subscriptionId")?)
                    .map_err(|_| WsError::bad_request("Invalid subscription ID"))?;
                self.unsubscribe(id)
            }
            "getOrderBook" => {
                let market = string_param(params, "market")?;
                let depth = usize_param(params, "depth", DEFAULT_DEPTH);
                let book = self.state.exchange.market_depth(market, depth).map_err(service_error)?;
                Ok(json!(book))
            }
            "getTrades" => {
                let market = string_param(params, "market")?;
                let limit = usize_param(params, "limit", DEFAULT_TRADES);
                let trades = self.state.exchange.recent_trades(market, limit).map_err(service_error)?;
                Ok(json!({ "market": market, "trades": trades }))
            }
            "getTicker" => {
                let market = string_param(params, "market")?;
                let ticker = self.state.exchange.ticker(market).map_err(service_error)?;
                Ok(json!(ticker))
            }
            "ping" => Ok(json!({ "pong": chrono::Utc::now().to_rfc3339() })),
            other => Err(WsError::bad_request(format!("Unknown method: {}", other))),
        }
    }

    fn subscribe(&mut self, channel: &str, market: &str) -> Result<Value, WsError> {
        let topic = Topic::parse(channel, market)
            .ok_or_else(|| WsError::bad_request(format!("Invalid channel: {}", channel)))?;
        self.state.exchange.market(market).map_err(service_error)?;
        if self.subscriptions.len() >= MAX_SUBSCRIPTIONS {
            return Err(WsError {
                code: 429,
                message: format!("At most {} subscriptions per connection", MAX_SUBSCRIPTIONS),
            });
        }

        let subscription = Subscription {
            id: Uuid::new_v4(),
            topic: topic.clone(),
        };
        let receiver = self.state.exchange.market_data().channel().subscribe(topic);
        let task = forward(receiver, subscription.clone(), self.tx.clone());
        self.subscriptions.insert(subscription.id, (subscription.clone(), task));

        debug!("Subscribed {} to {} {}", subscription.id, channel, market);
        Ok(json!({
            "subscriptionId": subscription.id,
            "channel": channel,
            "market": market,
        }))
    }

    fn unsubscribe(&mut self, id: Uuid) -> Result<Value, WsError> {
        let (_, task) = self.subscriptions.remove(&id).ok_or_else(|| WsError {
            code: 404,
            message: "Subscription not found".to_string(),
        })?;
        task.abort();
        Ok(json!({ "unsubscribed": true }))
    }

    /// Stop every subscription task
    pub fn close(&mut self) {
        for (_, (_, task)) in self.subscriptions.drain() {
            task.abort();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

/// Push the current and every later value of a topic to the client
fn forward(mut receiver: TopicReceiver, subscription: Subscription, tx: mpsc::Sender<String>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let latest = receiver.borrow_and_update().clone();
            if let Some(event) = latest {
                if !send_json(&tx, &WsNotification::new(&subscription, event)).await {
                    break;
                }
            }
            if receiver.changed().await.is_err() {
                break;
            }
        }
        debug!("Subscription {} ended", subscription.id);
    })
}
