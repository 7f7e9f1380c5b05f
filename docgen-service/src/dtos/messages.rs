use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// One inbound channel event: `{ from, channel_id, body }`.
#[derive(Debug, Deserialize, Validate)]
pub struct InboundMessageRequest {
    #[validate(length(min = 1, max = 128))]
    pub from: String,
    pub channel_id: Option<String>,
    #[validate(length(min = 1, max = 65536))]
    pub body: String,
}

/// Acknowledgment for an inbound message. Always returned with HTTP 200 so
/// channel retries do not storm; the outcome code carries the result.
#[derive(Debug, Serialize, Deserialize)]
pub struct InboundAckResponse {
    pub status: String,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,
    /// Confirmation text for the channel to send back to the sender.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
}

impl InboundAckResponse {
    pub fn rejected(outcome: &str) -> Self {
        Self {
            status: "accepted".to_string(),
            outcome: outcome.to_string(),
            document_id: None,
            document_number: None,
            reply: None,
        }
    }
}
