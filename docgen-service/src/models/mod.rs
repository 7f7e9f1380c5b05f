//! Domain models for docgen-service.

mod company;
mod document;
mod message;
pub mod money;
mod plan;

pub use company::{Company, CreateCompany, UpdateCompany};
pub use document::{
    CreateDocument, Document, DocumentStatus, DocumentType, LineItem, ListDocumentsFilter,
    NewLineItem,
};
pub use message::{CreateInboundMessage, InboundMessage};
pub use plan::{QuotaLimit, SubscriptionPlan};
