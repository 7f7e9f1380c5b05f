//! Persistence contract consumed by the assembly pipeline and handlers.

use crate::models::{
    Company, CreateCompany, CreateDocument, CreateInboundMessage, Document, DocumentStatus,
    DocumentType, InboundMessage, LineItem, ListDocumentsFilter, UpdateCompany,
};
use async_trait::async_trait;
use service_core::error::AppError;
use uuid::Uuid;

/// Storage operations the core pipeline needs. Object-safe so tests can
/// substitute an in-memory implementation for the Postgres one.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_company_by_owner(&self, owner_user_id: &str)
        -> Result<Option<Company>, AppError>;

    async fn create_company(&self, input: &CreateCompany) -> Result<Company, AppError>;

    async fn update_company(
        &self,
        company_id: Uuid,
        input: &UpdateCompany,
    ) -> Result<Option<Company>, AppError>;

    async fn find_company_by_channel(
        &self,
        channel_id: &str,
    ) -> Result<Option<Company>, AppError>;

    /// Fuzzy phone lookup: exact normalized match, else last-10-digit match.
    async fn find_company_by_phone(&self, phone: &str) -> Result<Option<Company>, AppError>;

    /// Persist a document together with its line items. The only durable
    /// document write in the pipeline.
    async fn create_document(&self, input: &CreateDocument) -> Result<Document, AppError>;

    async fn get_document(
        &self,
        company_id: Uuid,
        document_id: Uuid,
    ) -> Result<Option<Document>, AppError>;

    async fn get_line_items(
        &self,
        company_id: Uuid,
        document_id: Uuid,
    ) -> Result<Vec<LineItem>, AppError>;

    async fn list_documents(
        &self,
        company_id: Uuid,
        filter: &ListDocumentsFilter,
    ) -> Result<Vec<Document>, AppError>;

    async fn update_document_status(
        &self,
        company_id: Uuid,
        document_id: Uuid,
        status: DocumentStatus,
    ) -> Result<Option<Document>, AppError>;

    async fn count_documents_by_type(
        &self,
        company_id: Uuid,
        document_type: DocumentType,
    ) -> Result<i64, AppError>;

    /// Atomic increment-and-fetch of the monthly usage counter.
    async fn increment_usage(&self, company_id: Uuid) -> Result<i64, AppError>;

    /// Recount usage from the documents actually created this month and
    /// store the result. Reconciliation for partial failures.
    async fn recompute_usage(&self, company_id: Uuid) -> Result<i64, AppError>;

    async fn create_message_log(
        &self,
        input: &CreateInboundMessage,
    ) -> Result<InboundMessage, AppError>;

    /// Attach the parse outcome to an inbound message log, at most once.
    async fn attach_parse_outcome(
        &self,
        message_id: Uuid,
        parsed: bool,
        document_id: Option<Uuid>,
    ) -> Result<(), AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}
