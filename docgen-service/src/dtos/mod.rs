//! Request/response DTOs for the HTTP surface.

mod company;
mod documents;
mod messages;

pub use company::{CompanyResponse, UpdateCompanyRequest};
pub use documents::{
    CreateDocumentRequest, DocumentListResponse, DocumentResponse, DocumentSummaryResponse,
    LineItemRequest, LineItemResponse, ListDocumentsParams, UpdateStatusRequest,
};
pub use messages::{InboundAckResponse, InboundMessageRequest};
