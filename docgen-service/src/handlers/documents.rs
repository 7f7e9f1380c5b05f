use crate::dtos::{
    CreateDocumentRequest, DocumentListResponse, DocumentResponse, DocumentSummaryResponse,
    ListDocumentsParams, UpdateStatusRequest,
};
use crate::middleware::user_id::UserId;
use crate::models::{Company, DocumentStatus, DocumentType, ListDocumentsFilter};
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

/// The authenticated caller's company; listing and fetching never create
/// one implicitly.
async fn require_company(state: &AppState, user_id: &UserId) -> Result<Company, AppError> {
    state
        .store
        .find_company_by_owner(&user_id.0)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("No company for this user")))
}

pub async fn create_document(
    State(state): State<AppState>,
    user_id: UserId,
    Json(payload): Json<CreateDocumentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    // Company is created lazily on first authenticated access.
    let company = state.pipeline.company_for_user(&user_id.0).await?;
    let input = payload.into_submit()?;

    let (document, line_items) = state.pipeline.submit_document(&company, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(DocumentResponse::from_parts(document, line_items)),
    ))
}

pub async fn get_document(
    State(state): State<AppState>,
    user_id: UserId,
    Path(document_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let company = require_company(&state, &user_id).await?;

    let document = state
        .store
        .get_document(company.company_id, document_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Document not found")))?;
    let line_items = state
        .store
        .get_line_items(company.company_id, document_id)
        .await?;

    Ok(Json(DocumentResponse::from_parts(document, line_items)))
}

pub async fn list_documents(
    State(state): State<AppState>,
    user_id: UserId,
    Query(params): Query<ListDocumentsParams>,
) -> Result<impl IntoResponse, AppError> {
    let company = require_company(&state, &user_id).await?;

    let filter = ListDocumentsFilter {
        document_type: params.document_type.as_deref().and_then(DocumentType::parse),
        status: params.status.as_deref().and_then(DocumentStatus::parse),
        page_size: params.page_size.unwrap_or(20),
        page_token: params.page_token,
    };

    let documents = state
        .store
        .list_documents(company.company_id, &filter)
        .await?;

    Ok(Json(DocumentListResponse {
        documents: documents
            .into_iter()
            .map(DocumentSummaryResponse::from)
            .collect(),
    }))
}

pub async fn update_document_status(
    State(state): State<AppState>,
    user_id: UserId,
    Path(document_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let status = DocumentStatus::parse(&payload.status).ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!("Unknown status: {}", payload.status))
    })?;

    let company = require_company(&state, &user_id).await?;

    let document = state
        .store
        .update_document_status(company.company_id, document_id, status)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Document not found")))?;
    let line_items = state
        .store
        .get_line_items(company.company_id, document_id)
        .await?;

    Ok(Json(DocumentResponse::from_parts(document, line_items)))
}

pub async fn render_document_pdf(
    State(state): State<AppState>,
    user_id: UserId,
    Path(document_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let company = require_company(&state, &user_id).await?;

    let document = state
        .store
        .get_document(company.company_id, document_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Document not found")))?;
    let line_items = state
        .store
        .get_line_items(company.company_id, document_id)
        .await?;

    let bytes = state
        .renderer
        .render(&company, &document, &line_items)
        .await
        .map_err(|e| {
            // Retryable for the caller; the stored document is untouched.
            tracing::error!(document_id = %document_id, error = %e, "Rendering failed");
            AppError::ServiceUnavailable
        })?;

    tracing::info!(
        document_id = %document_id,
        size = bytes.len(),
        "Document rendered"
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}.pdf\"", document.document_number),
            ),
        ],
        bytes,
    ))
}
