//! Document and line item models.

use crate::models::money::{self, Cents};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Document kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Invoice,
    Quotation,
    Receipt,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Invoice => "invoice",
            DocumentType::Quotation => "quotation",
            DocumentType::Receipt => "receipt",
        }
    }

    /// Strict variant used at the request boundary.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "invoice" => Some(DocumentType::Invoice),
            "quotation" => Some(DocumentType::Quotation),
            "receipt" => Some(DocumentType::Receipt),
            _ => None,
        }
    }

    /// Prefix used in generated document numbers.
    pub fn number_prefix(&self) -> &'static str {
        match self {
            DocumentType::Invoice => "INV",
            DocumentType::Quotation => "QUO",
            DocumentType::Receipt => "REC",
        }
    }
}

/// Document status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    Sent,
    Paid,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Sent => "sent",
            DocumentStatus::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(DocumentStatus::Draft),
            "sent" => Some(DocumentStatus::Sent),
            "paid" => Some(DocumentStatus::Paid),
            _ => None,
        }
    }
}

/// A generated document. Immutable once created, except for status moves
/// through the explicit update path.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Document {
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
    pub source_message_id: Option<Uuid>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Line item on a document.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LineItem {
    pub line_item_id: Uuid,
    pub document_id: Uuid,
    pub company_id: Uuid,
    pub description: String,
    pub quantity: i64,
    pub unit_price: i64,
    pub total: i64,
    pub sort_order: i32,
    pub created_utc: DateTime<Utc>,
}

/// Validated line item input. The total is fixed here, at creation, and is
/// never recomputed from another source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLineItem {
    pub description: String,
    pub quantity: i64,
    pub unit_price: Cents,
    pub total: Cents,
}

impl NewLineItem {
    pub fn new(description: impl Into<String>, quantity: i64, unit_price: Cents) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
            total: money::line_total(quantity, unit_price),
        }
    }
}

/// Input for persisting a document with its items.
#[derive(Debug, Clone)]
pub struct CreateDocument {
    pub company_id: Uuid,
    pub document_number: String,
    pub document_type: DocumentType,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub line_items: Vec<NewLineItem>,
    pub subtotal: Cents,
    pub tax_rate: i64,
    pub tax_amount: Cents,
    pub total: Cents,
    pub notes: Option<String>,
    pub source_message_id: Option<Uuid>,
}

/// Filter parameters for listing documents.
#[derive(Debug, Clone, Default)]
pub struct ListDocumentsFilter {
    pub document_type: Option<DocumentType>,
    pub status: Option<DocumentStatus>,
    pub page_size: i32,
    pub page_token: Option<Uuid>,
}
