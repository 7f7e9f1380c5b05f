//! Inbound message audit log model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Audit record for one inbound channel event. Written for every delivery
/// regardless of parse outcome, and updated at most once to attach the
/// outcome and the derived document, if any.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InboundMessage {
    pub message_id: Uuid,
    /// Null when no tenant resolved for the sender.
    pub company_id: Option<Uuid>,
    pub from_identifier: String,
    pub channel_id: Option<String>,
    pub raw_body: String,
    pub parsed_successfully: bool,
    pub derived_document_id: Option<Uuid>,
    pub created_utc: DateTime<Utc>,
    pub processed_utc: Option<DateTime<Utc>>,
}

/// Input for logging an inbound message.
#[derive(Debug, Clone)]
pub struct CreateInboundMessage {
    pub company_id: Option<Uuid>,
    pub from_identifier: String,
    pub channel_id: Option<String>,
    pub raw_body: String,
}
