//! Test helper module for docgen-service integration tests.
//!
//! Provides an in-memory `DocumentStore` and a `TestApp` that spawns the
//! full HTTP application on a random port, so the pipeline is exercised end
//! to end without PostgreSQL.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use docgen_service::config::{DatabaseConfig, DocgenConfig};
use docgen_service::models::{
    Company, CreateCompany, CreateDocument, CreateInboundMessage, Document, DocumentStatus,
    DocumentType, InboundMessage, LineItem, ListDocumentsFilter, UpdateCompany,
};
use docgen_service::services::metrics::init_metrics;
use docgen_service::services::renderer::PdfRenderer;
use docgen_service::services::store::DocumentStore;
use docgen_service::startup::Application;
use docgen_service::utils::phone::{normalize_phone, phones_match};
use service_core::config::Config as CoreConfig;
use service_core::error::AppError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const TEST_USER_ID: &str = "user-11111111";

#[derive(Default)]
struct MemoryState {
    companies: Vec<Company>,
    documents: Vec<Document>,
    line_items: Vec<LineItem>,
    messages: Vec<InboundMessage>,
}

/// In-memory double of the persistence store.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    /// When set, the next usage increment fails once (partial-failure path).
    fail_next_increment: AtomicBool,
}

impl MemoryStore {
    pub fn insert_company(&self, company: Company) {
        self.state.lock().unwrap().companies.push(company);
    }

    pub fn fail_next_increment(&self) {
        self.fail_next_increment.store(true, Ordering::SeqCst);
    }

    pub fn company(&self, company_id: Uuid) -> Option<Company> {
        self.state
            .lock()
            .unwrap()
            .companies
            .iter()
            .find(|c| c.company_id == company_id)
            .cloned()
    }

    pub fn companies(&self) -> Vec<Company> {
        self.state.lock().unwrap().companies.clone()
    }

    pub fn documents(&self) -> Vec<Document> {
        self.state.lock().unwrap().documents.clone()
    }

    pub fn messages(&self) -> Vec<InboundMessage> {
        self.state.lock().unwrap().messages.clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_company_by_owner(
        &self,
        owner_user_id: &str,
    ) -> Result<Option<Company>, AppError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .companies
            .iter()
            .find(|c| c.owner_user_id == owner_user_id)
            .cloned())
    }

    async fn create_company(&self, input: &CreateCompany) -> Result<Company, AppError> {
        let mut state = self.state.lock().unwrap();
        if state
            .companies
            .iter()
            .any(|c| c.owner_user_id == input.owner_user_id)
        {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "A company already exists for user {}",
                input.owner_user_id
            )));
        }
        let now = Utc::now();
        let company = Company {
            company_id: Uuid::new_v4(),
            owner_user_id: input.owner_user_id.clone(),
            name: input.name.clone(),
            address: None,
            phone: input.phone.as_deref().map(normalize_phone),
            email: input.email.clone(),
            logo_url: None,
            inbound_channel_id: input.inbound_channel_id.clone(),
            subscription_plan: input.subscription_plan.as_str().to_string(),
            subscription_active: true,
            billing_customer_ref: None,
            billing_subscription_ref: None,
            documents_used_this_month: 0,
            usage_reset_at: now,
            created_utc: now,
            updated_utc: now,
        };
        state.companies.push(company.clone());
        Ok(company)
    }

    async fn update_company(
        &self,
        company_id: Uuid,
        input: &UpdateCompany,
    ) -> Result<Option<Company>, AppError> {
        let mut state = self.state.lock().unwrap();
        let Some(company) = state
            .companies
            .iter_mut()
            .find(|c| c.company_id == company_id)
        else {
            return Ok(None);
        };
        if let Some(name) = &input.name {
            company.name = name.clone();
        }
        if let Some(address) = &input.address {
            company.address = Some(address.clone());
        }
        if let Some(phone) = &input.phone {
            company.phone = Some(normalize_phone(phone));
        }
        if let Some(email) = &input.email {
            company.email = Some(email.clone());
        }
        if let Some(logo_url) = &input.logo_url {
            company.logo_url = Some(logo_url.clone());
        }
        if let Some(channel) = &input.inbound_channel_id {
            company.inbound_channel_id = Some(channel.clone());
        }
        company.updated_utc = Utc::now();
        Ok(Some(company.clone()))
    }

    async fn find_company_by_channel(
        &self,
        channel_id: &str,
    ) -> Result<Option<Company>, AppError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .companies
            .iter()
            .find(|c| c.inbound_channel_id.as_deref() == Some(channel_id))
            .cloned())
    }

    async fn find_company_by_phone(&self, phone: &str) -> Result<Option<Company>, AppError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .companies
            .iter()
            .find(|c| {
                c.phone
                    .as_deref()
                    .map(|stored| phones_match(stored, phone))
                    .unwrap_or(false)
            })
            .cloned())
    }

    async fn create_document(&self, input: &CreateDocument) -> Result<Document, AppError> {
        let mut state = self.state.lock().unwrap();
        if state.documents.iter().any(|d| {
            d.company_id == input.company_id
                && d.document_type == input.document_type.as_str()
                && d.document_number == input.document_number
        }) {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Document number {} already exists",
                input.document_number
            )));
        }
        let now = Utc::now();
        let document = Document {
            document_id: Uuid::new_v4(),
            company_id: input.company_id,
            document_number: input.document_number.clone(),
            document_type: input.document_type.as_str().to_string(),
            status: "draft".to_string(),
            customer_name: input.customer_name.clone(),
            customer_email: input.customer_email.clone(),
            customer_phone: input.customer_phone.clone(),
            subtotal: input.subtotal,
            tax_rate: input.tax_rate,
            tax_amount: input.tax_amount,
            total: input.total,
            notes: input.notes.clone(),
            source_message_id: input.source_message_id,
            created_utc: now,
            updated_utc: now,
        };
        for (sort_order, item) in input.line_items.iter().enumerate() {
            state.line_items.push(LineItem {
                line_item_id: Uuid::new_v4(),
                document_id: document.document_id,
                company_id: input.company_id,
                description: item.description.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                total: item.total,
                sort_order: sort_order as i32,
                created_utc: now,
            });
        }
        state.documents.push(document.clone());
        Ok(document)
    }

    async fn get_document(
        &self,
        company_id: Uuid,
        document_id: Uuid,
    ) -> Result<Option<Document>, AppError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .documents
            .iter()
            .find(|d| d.company_id == company_id && d.document_id == document_id)
            .cloned())
    }

    async fn get_line_items(
        &self,
        company_id: Uuid,
        document_id: Uuid,
    ) -> Result<Vec<LineItem>, AppError> {
        let mut items: Vec<LineItem> = self
            .state
            .lock()
            .unwrap()
            .line_items
            .iter()
            .filter(|i| i.company_id == company_id && i.document_id == document_id)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.sort_order);
        Ok(items)
    }

    async fn list_documents(
        &self,
        company_id: Uuid,
        filter: &ListDocumentsFilter,
    ) -> Result<Vec<Document>, AppError> {
        let limit = filter.page_size.clamp(1, 100) as usize;
        let mut documents: Vec<Document> = self
            .state
            .lock()
            .unwrap()
            .documents
            .iter()
            .filter(|d| d.company_id == company_id)
            .filter(|d| {
                filter
                    .document_type
                    .map(|t| d.document_type == t.as_str())
                    .unwrap_or(true)
            })
            .filter(|d| {
                filter
                    .status
                    .map(|s| d.status == s.as_str())
                    .unwrap_or(true)
            })
            .filter(|d| {
                filter
                    .page_token
                    .map(|cursor| d.document_id > cursor)
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        documents.sort_by_key(|d| d.document_id);
        documents.truncate(limit);
        Ok(documents)
    }

    async fn update_document_status(
        &self,
        company_id: Uuid,
        document_id: Uuid,
        status: DocumentStatus,
    ) -> Result<Option<Document>, AppError> {
        let mut state = self.state.lock().unwrap();
        let Some(document) = state
            .documents
            .iter_mut()
            .find(|d| d.company_id == company_id && d.document_id == document_id)
        else {
            return Ok(None);
        };
        document.status = status.as_str().to_string();
        document.updated_utc = Utc::now();
        Ok(Some(document.clone()))
    }

    async fn count_documents_by_type(
        &self,
        company_id: Uuid,
        document_type: DocumentType,
    ) -> Result<i64, AppError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .documents
            .iter()
            .filter(|d| d.company_id == company_id && d.document_type == document_type.as_str())
            .count() as i64)
    }

    async fn increment_usage(&self, company_id: Uuid) -> Result<i64, AppError> {
        if self.fail_next_increment.swap(false, Ordering::SeqCst) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "Injected increment failure"
            )));
        }
        let mut state = self.state.lock().unwrap();
        let company = state
            .companies
            .iter_mut()
            .find(|c| c.company_id == company_id)
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Company not found")))?;
        company.documents_used_this_month += 1;
        Ok(company.documents_used_this_month)
    }

    async fn recompute_usage(&self, company_id: Uuid) -> Result<i64, AppError> {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        let count = state
            .documents
            .iter()
            .filter(|d| {
                d.company_id == company_id
                    && d.created_utc.year() == now.year()
                    && d.created_utc.month() == now.month()
            })
            .count() as i64;
        let company = state
            .companies
            .iter_mut()
            .find(|c| c.company_id == company_id)
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Company not found")))?;
        company.documents_used_this_month = count;
        Ok(count)
    }

    async fn create_message_log(
        &self,
        input: &CreateInboundMessage,
    ) -> Result<InboundMessage, AppError> {
        let message = InboundMessage {
            message_id: Uuid::new_v4(),
            company_id: input.company_id,
            from_identifier: input.from_identifier.clone(),
            channel_id: input.channel_id.clone(),
            raw_body: input.raw_body.clone(),
            parsed_successfully: false,
            derived_document_id: None,
            created_utc: Utc::now(),
            processed_utc: None,
        };
        self.state.lock().unwrap().messages.push(message.clone());
        Ok(message)
    }

    async fn attach_parse_outcome(
        &self,
        message_id: Uuid,
        parsed: bool,
        document_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = state
            .messages
            .iter_mut()
            .find(|m| m.message_id == message_id && m.processed_utc.is_none())
        {
            message.parsed_successfully = parsed;
            message.derived_document_id = document_id;
            message.processed_utc = Some(Utc::now());
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

/// A fully assembled company row for seeding.
pub fn company_fixture(owner_user_id: &str) -> Company {
    let now = Utc::now();
    Company {
        company_id: Uuid::new_v4(),
        owner_user_id: owner_user_id.to_string(),
        name: "Kedai Test Sdn Bhd".to_string(),
        address: None,
        phone: None,
        email: None,
        logo_url: None,
        inbound_channel_id: None,
        subscription_plan: "starter".to_string(),
        subscription_active: true,
        billing_customer_ref: None,
        billing_subscription_ref: None,
        documents_used_this_month: 0,
        usage_reset_at: now,
        created_utc: now,
        updated_utc: now,
    }
}

/// Test application wrapper: the real router and pipeline over an
/// in-memory store, on a random port.
pub struct TestApp {
    pub address: String,
    pub store: Arc<MemoryStore>,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_store(Arc::new(MemoryStore::default())).await
    }

    pub async fn spawn_with_store(store: Arc<MemoryStore>) -> Self {
        // Required for the metrics endpoint; registering twice is harmless.
        init_metrics();

        let config = DocgenConfig {
            common: CoreConfig {
                port: 0,
                log_level: "info".to_string(),
            },
            database: DatabaseConfig {
                url: "postgres://unused".to_string(),
                max_connections: 1,
                min_connections: 1,
            },
        };

        let renderer = PdfRenderer::new().expect("Failed to build renderer");
        let app = Application::build(config, store.clone(), Arc::new(renderer))
            .await
            .expect("Failed to build application");
        let port = app.port();
        tokio::spawn(app.run_until_stopped());

        TestApp {
            address: format!("http://127.0.0.1:{}", port),
            store,
            client: reqwest::Client::new(),
        }
    }
}
