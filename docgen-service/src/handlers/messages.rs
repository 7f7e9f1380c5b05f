use crate::dtos::{InboundAckResponse, InboundMessageRequest};
use crate::services::pipeline::IngestOutcome;
use crate::startup::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use service_core::error::AppError;
use validator::Validate;

/// Accept one raw inbound message for parsing.
///
/// The channel protocol requires an acknowledgment regardless of parse
/// outcome, so every handled delivery returns 200 with an outcome code;
/// only infrastructure failures surface as errors.
pub async fn inbound_message(
    State(state): State<AppState>,
    Json(payload): Json<InboundMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let outcome = state
        .pipeline
        .ingest_message(&payload.from, payload.channel_id.as_deref(), &payload.body)
        .await?;

    let ack = match outcome {
        IngestOutcome::Created {
            document, reply, ..
        } => InboundAckResponse {
            status: "accepted".to_string(),
            outcome: "created".to_string(),
            document_id: Some(document.document_id),
            document_number: Some(document.document_number),
            reply: Some(reply),
        },
        other => InboundAckResponse::rejected(other.code()),
    };

    Ok(Json(ack))
}
