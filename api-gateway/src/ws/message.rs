//! WebSocket messages

use market_data::channel::Topic;
use market_data::MarketEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// WebSocket request message
#[derive(Debug, Deserialize)]
pub struct WsRequest {
    /// Request ID, echoed in the response
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// WebSocket response message
#[derive(Debug, Serialize, Deserialize)]
pub struct WsResponse {
    /// Request ID
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<WsError>,
}

impl WsResponse {
    pub fn reply(id: String, outcome: Result<serde_json::Value, WsError>) -> Self {
        match outcome {
            Ok(result) => Self { id, result: Some(result), error: None },
            Err(error) => Self { id, result: None, error: Some(error) },
        }
    }
}

/// WebSocket error
#[derive(Debug, Serialize, Deserialize)]
pub struct WsError {
    /// HTTP-style error code
    pub code: u16,
    pub message: String,
}

impl WsError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self { code: 400, message: message.into() }
    }
}

/// Update pushed for a subscription
#[derive(Debug, Serialize)]
pub struct WsNotification {
    /// Channel name: orderbook, trades or ticker
    pub method: String,
    pub params: NotificationParams,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationParams {
    pub subscription_id: Uuid,
    pub market: String,
    /// The newest event on the topic
    #[serde(flatten)]
    pub event: MarketEvent,
}

impl WsNotification {
    pub fn new(subscription: &Subscription, event: MarketEvent) -> Self {
        Self {
            method: subscription.topic.channel_name().to_string(),
            params: NotificationParams {
                subscription_id: subscription.id,
                market: subscription.topic.market().to_string(),
                event,
            },
        }
    }
}

/// WebSocket subscription
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    pub id: Uuid,
    pub topic: Topic,
}
