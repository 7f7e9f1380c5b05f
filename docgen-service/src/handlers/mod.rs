mod company;
mod documents;
mod health;
mod messages;

pub use company::{get_company, update_company};
pub use documents::{
    create_document, get_document, list_documents, render_document_pdf, update_document_status,
};
pub use health::{health_check, metrics_endpoint, readiness_check};
pub use messages::inbound_message;
