use crate::models::{Document, DocumentType, LineItem, NewLineItem};
use crate::services::pipeline::SubmitDocument;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

/// Structured document submission from the web form. Validated at the
/// boundary, then converted into typed pipeline input.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDocumentRequest {
    pub document_type: String,
    #[validate(length(min = 1, max = 255))]
    pub customer_name: String,
    #[validate(email)]
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    #[validate(length(min = 1), nested)]
    pub line_items: Vec<LineItemRequest>,
    /// Basis-like units: percent x 100.
    #[validate(range(min = 0, max = 10000))]
    #[serde(default)]
    pub tax_rate: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LineItemRequest {
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    #[validate(range(min = 1))]
    pub quantity: i64,
    /// Cents.
    #[validate(range(min = 0))]
    pub unit_price: i64,
}

impl CreateDocumentRequest {
    /// Convert into typed pipeline input. Runs after `validate()`.
    pub fn into_submit(self) -> Result<SubmitDocument, AppError> {
        let document_type = DocumentType::parse(&self.document_type).ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!(
                "Unknown document type: {}",
                self.document_type
            ))
        })?;
        let line_items = self
            .line_items
            .into_iter()
            .map(|item| NewLineItem::new(item.description, item.quantity, item.unit_price))
            .collect();
        Ok(SubmitDocument {
            document_type,
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            customer_phone: self.customer_phone,
            line_items,
            tax_rate: self.tax_rate,
            notes: self.notes,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LineItemResponse {
    pub description: String,
    pub quantity: i64,
    pub unit_price: i64,
    pub total: i64,
}

impl From<LineItem> for LineItemResponse {
    fn from(item: LineItem) -> Self {
        Self {
            description: item.description,
            quantity: item.quantity,
            unit_price: item.unit_price,
            total: item.total,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub document_id: Uuid,
    pub company_id: Uuid,
    pub document_number: String,
    pub document_type: String,
    pub status: String,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub subtotal: i64,
    pub tax_rate: i64,
    pub tax_amount: i64,
    pub total: i64,
    pub notes: Option<String>,
    pub line_items: Vec<LineItemResponse>,
    pub created_at: String,
    pub updated_at: String,
}

impl DocumentResponse {
    pub fn from_parts(document: Document, line_items: Vec<LineItem>) -> Self {
        Self {
            document_id: document.document_id,
            company_id: document.company_id,
            document_number: document.document_number,
            document_type: document.document_type,
            status: document.status,
            customer_name: document.customer_name,
            customer_email: document.customer_email,
            customer_phone: document.customer_phone,
            subtotal: document.subtotal,
            tax_rate: document.tax_rate,
            tax_amount: document.tax_amount,
            total: document.total,
            notes: document.notes,
            line_items: line_items.into_iter().map(LineItemResponse::from).collect(),
            created_at: document.created_utc.to_rfc3339(),
            updated_at: document.updated_utc.to_rfc3339(),
        }
    }
}

/// Listing omits line items; fetch a single document for the full shape.
#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentSummaryResponse {
    pub document_id: Uuid,
    pub document_number: String,
    pub document_type: String,
    pub status: String,
    pub customer_name: String,
    pub total: i64,
    pub created_at: String,
}

impl From<Document> for DocumentSummaryResponse {
    fn from(document: Document) -> Self {
        Self {
            document_id: document.document_id,
            document_number: document.document_number,
            document_type: document.document_type,
            status: document.status,
            customer_name: document.customer_name,
            total: document.total,
            created_at: document.created_utc.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListDocumentsParams {
    pub document_type: Option<String>,
    pub status: Option<String>,
    pub page_size: Option<i32>,
    pub page_token: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentSummaryResponse>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    #[validate(length(min = 1))]
    pub status: String,
}
