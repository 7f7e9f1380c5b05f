//! Database service for docgen-service.

use crate::models::{
    Company, CreateCompany, CreateDocument, CreateInboundMessage, Document, DocumentStatus,
    DocumentType, InboundMessage, LineItem, ListDocumentsFilter, UpdateCompany,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::DocumentStore;
use crate::utils::phone::{digits, normalize_phone};
use async_trait::async_trait;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const COMPANY_COLUMNS: &str = "company_id, owner_user_id, name, address, phone, email, logo_url, \
     inbound_channel_id, subscription_plan, subscription_active, billing_customer_ref, \
     billing_subscription_ref, documents_used_this_month, usage_reset_at, created_utc, updated_utc";

const DOCUMENT_COLUMNS: &str = "document_id, company_id, document_number, document_type, status, \
     customer_name, customer_email, customer_phone, subtotal, tax_rate, tax_amount, total, notes, \
     source_message_id, created_utc, updated_utc";

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "docgen-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for Database {
    // -------------------------------------------------------------------------
    // Company Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    async fn find_company_by_owner(
        &self,
        owner_user_id: &str,
    ) -> Result<Option<Company>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_company_by_owner"])
            .start_timer();

        let company = sqlx::query_as::<_, Company>(&format!(
            "SELECT {} FROM companies WHERE owner_user_id = $1",
            COMPANY_COLUMNS
        ))
        .bind(owner_user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to find company: {}", e)))?;

        timer.observe_duration();

        Ok(company)
    }

    #[instrument(skip(self, input), fields(owner_user_id = %input.owner_user_id))]
    async fn create_company(&self, input: &CreateCompany) -> Result<Company, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_company"])
            .start_timer();

        let company_id = Uuid::new_v4();
        let phone = input.phone.as_deref().map(normalize_phone);
        let company = sqlx::query_as::<_, Company>(&format!(
            r#"
            INSERT INTO companies (company_id, owner_user_id, name, phone, email, inbound_channel_id, subscription_plan)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            COMPANY_COLUMNS
        ))
        .bind(company_id)
        .bind(&input.owner_user_id)
        .bind(&input.name)
        .bind(&phone)
        .bind(&input.email)
        .bind(&input.inbound_channel_id)
        .bind(input.subscription_plan.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "A company already exists for user {}",
                    input.owner_user_id
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create company: {}", e)),
        })?;

        timer.observe_duration();

        info!(company_id = %company.company_id, name = %company.name, "Company created");

        Ok(company)
    }

    #[instrument(skip(self, input), fields(company_id = %company_id))]
    async fn update_company(
        &self,
        company_id: Uuid,
        input: &UpdateCompany,
    ) -> Result<Option<Company>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_company"])
            .start_timer();

        let phone = input.phone.as_deref().map(normalize_phone);
        let company = sqlx::query_as::<_, Company>(&format!(
            r#"
            UPDATE companies
            SET name = COALESCE($2, name),
                address = COALESCE($3, address),
                phone = COALESCE($4, phone),
                email = COALESCE($5, email),
                logo_url = COALESCE($6, logo_url),
                inbound_channel_id = COALESCE($7, inbound_channel_id),
                updated_utc = NOW()
            WHERE company_id = $1
            RETURNING {}
            "#,
            COMPANY_COLUMNS
        ))
        .bind(company_id)
        .bind(&input.name)
        .bind(&input.address)
        .bind(&phone)
        .bind(&input.email)
        .bind(&input.logo_url)
        .bind(&input.inbound_channel_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update company: {}", e)))?;

        timer.observe_duration();

        Ok(company)
    }

    #[instrument(skip(self))]
    async fn find_company_by_channel(
        &self,
        channel_id: &str,
    ) -> Result<Option<Company>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_company_by_channel"])
            .start_timer();

        let company = sqlx::query_as::<_, Company>(&format!(
            "SELECT {} FROM companies WHERE inbound_channel_id = $1",
            COMPANY_COLUMNS
        ))
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to find company: {}", e)))?;

        timer.observe_duration();

        Ok(company)
    }

    #[instrument(skip(self))]
    async fn find_company_by_phone(&self, phone: &str) -> Result<Option<Company>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_company_by_phone"])
            .start_timer();

        let normalized = normalize_phone(phone);
        let suffix = digits(&normalized);
        if normalized.is_empty() {
            timer.observe_duration();
            return Ok(None);
        }

        // Exact normalized match first, then last-10-digit match to absorb
        // country-code prefix variation.
        let company = sqlx::query_as::<_, Company>(&format!(
            r#"
            SELECT {}
            FROM companies
            WHERE phone = $1
               OR (phone IS NOT NULL
                   AND RIGHT(regexp_replace(phone, '[^0-9]', '', 'g'), 10) = RIGHT($2, 10))
            ORDER BY (phone = $1) DESC
            LIMIT 1
            "#,
            COMPANY_COLUMNS
        ))
        .bind(&normalized)
        .bind(&suffix)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to find company: {}", e)))?;

        timer.observe_duration();

        Ok(company)
    }

    // -------------------------------------------------------------------------
    // Document Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(company_id = %input.company_id, document_number = %input.document_number))]
    async fn create_document(&self, input: &CreateDocument) -> Result<Document, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_document"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let document_id = Uuid::new_v4();
        let document = sqlx::query_as::<_, Document>(&format!(
            r#"
            INSERT INTO documents (
                document_id, company_id, document_number, document_type, status,
                customer_name, customer_email, customer_phone,
                subtotal, tax_rate, tax_amount, total, notes, source_message_id
            )
            VALUES ($1, $2, $3, $4, 'draft', $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            DOCUMENT_COLUMNS
        ))
        .bind(document_id)
        .bind(input.company_id)
        .bind(&input.document_number)
        .bind(input.document_type.as_str())
        .bind(&input.customer_name)
        .bind(&input.customer_email)
        .bind(&input.customer_phone)
        .bind(input.subtotal)
        .bind(input.tax_rate)
        .bind(input.tax_amount)
        .bind(input.total)
        .bind(&input.notes)
        .bind(input.source_message_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Document number {} already exists",
                    input.document_number
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create document: {}", e)),
        })?;

        for (sort_order, item) in input.line_items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO line_items (
                    line_item_id, document_id, company_id, description,
                    quantity, unit_price, total, sort_order
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(document_id)
            .bind(input.company_id)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.total)
            .bind(sort_order as i32)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to insert line item: {}", e))
            })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit document: {}", e))
        })?;

        timer.observe_duration();

        info!(
            document_id = %document.document_id,
            document_number = %document.document_number,
            "Document created"
        );

        Ok(document)
    }

    #[instrument(skip(self), fields(company_id = %company_id, document_id = %document_id))]
    async fn get_document(
        &self,
        company_id: Uuid,
        document_id: Uuid,
    ) -> Result<Option<Document>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_document"])
            .start_timer();

        let document = sqlx::query_as::<_, Document>(&format!(
            "SELECT {} FROM documents WHERE company_id = $1 AND document_id = $2",
            DOCUMENT_COLUMNS
        ))
        .bind(company_id)
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get document: {}", e)))?;

        timer.observe_duration();

        Ok(document)
    }

    #[instrument(skip(self), fields(company_id = %company_id, document_id = %document_id))]
    async fn get_line_items(
        &self,
        company_id: Uuid,
        document_id: Uuid,
    ) -> Result<Vec<LineItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_line_items"])
            .start_timer();

        let line_items = sqlx::query_as::<_, LineItem>(
            r#"
            SELECT line_item_id, document_id, company_id, description,
                quantity, unit_price, total, sort_order, created_utc
            FROM line_items
            WHERE company_id = $1 AND document_id = $2
            ORDER BY sort_order, created_utc
            "#,
        )
        .bind(company_id)
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get line items: {}", e)))?;

        timer.observe_duration();

        Ok(line_items)
    }

    #[instrument(skip(self, filter), fields(company_id = %company_id))]
    async fn list_documents(
        &self,
        company_id: Uuid,
        filter: &ListDocumentsFilter,
    ) -> Result<Vec<Document>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_documents"])
            .start_timer();

        let limit = filter.page_size.clamp(1, 100) as i64;
        let type_str = filter.document_type.map(|t| t.as_str().to_string());
        let status_str = filter.status.map(|s| s.as_str().to_string());

        let documents = sqlx::query_as::<_, Document>(&format!(
            r#"
            SELECT {}
            FROM documents
            WHERE company_id = $1
              AND ($2::varchar IS NULL OR document_type = $2)
              AND ($3::varchar IS NULL OR status = $3)
              AND ($4::uuid IS NULL OR document_id > $4)
            ORDER BY document_id
            LIMIT $5
            "#,
            DOCUMENT_COLUMNS
        ))
        .bind(company_id)
        .bind(&type_str)
        .bind(&status_str)
        .bind(filter.page_token)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list documents: {}", e)))?;

        timer.observe_duration();

        Ok(documents)
    }

    #[instrument(skip(self), fields(company_id = %company_id, document_id = %document_id))]
    async fn update_document_status(
        &self,
        company_id: Uuid,
        document_id: Uuid,
        status: DocumentStatus,
    ) -> Result<Option<Document>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_document_status"])
            .start_timer();

        let document = sqlx::query_as::<_, Document>(&format!(
            r#"
            UPDATE documents
            SET status = $3, updated_utc = NOW()
            WHERE company_id = $1 AND document_id = $2
            RETURNING {}
            "#,
            DOCUMENT_COLUMNS
        ))
        .bind(company_id)
        .bind(document_id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update document status: {}", e))
        })?;

        timer.observe_duration();

        if let Some(ref doc) = document {
            info!(document_id = %doc.document_id, status = %doc.status, "Document status updated");
        }

        Ok(document)
    }

    #[instrument(skip(self), fields(company_id = %company_id))]
    async fn count_documents_by_type(
        &self,
        company_id: Uuid,
        document_type: DocumentType,
    ) -> Result<i64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["count_documents_by_type"])
            .start_timer();

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM documents WHERE company_id = $1 AND document_type = $2",
        )
        .bind(company_id)
        .bind(document_type.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to count documents: {}", e))
        })?;

        timer.observe_duration();

        Ok(count)
    }

    // -------------------------------------------------------------------------
    // Usage Counter Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self), fields(company_id = %company_id))]
    async fn increment_usage(&self, company_id: Uuid) -> Result<i64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["increment_usage"])
            .start_timer();

        // Single-statement increment-and-fetch; concurrency safety lives in
        // the database, not application memory.
        let new_count: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE companies
            SET documents_used_this_month = documents_used_this_month + 1,
                updated_utc = NOW()
            WHERE company_id = $1
            RETURNING documents_used_this_month
            "#,
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to increment usage: {}", e))
        })?;

        timer.observe_duration();

        new_count.ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Company not found")))
    }

    #[instrument(skip(self), fields(company_id = %company_id))]
    async fn recompute_usage(&self, company_id: Uuid) -> Result<i64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["recompute_usage"])
            .start_timer();

        let new_count: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE companies
            SET documents_used_this_month = (
                    SELECT COUNT(*)
                    FROM documents
                    WHERE documents.company_id = companies.company_id
                      AND documents.created_utc >= date_trunc('month', NOW())
                ),
                updated_utc = NOW()
            WHERE company_id = $1
            RETURNING documents_used_this_month
            "#,
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to recompute usage: {}", e))
        })?;

        timer.observe_duration();

        let new_count =
            new_count.ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Company not found")))?;

        info!(company_id = %company_id, documents_used = new_count, "Usage counter reconciled");

        Ok(new_count)
    }

    // -------------------------------------------------------------------------
    // Inbound Message Operations
    // -------------------------------------------------------------------------

    #[instrument(skip(self, input), fields(from = %input.from_identifier))]
    async fn create_message_log(
        &self,
        input: &CreateInboundMessage,
    ) -> Result<InboundMessage, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_message_log"])
            .start_timer();

        let message_id = Uuid::new_v4();
        let message = sqlx::query_as::<_, InboundMessage>(
            r#"
            INSERT INTO inbound_messages (message_id, company_id, from_identifier, channel_id, raw_body)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING message_id, company_id, from_identifier, channel_id, raw_body,
                parsed_successfully, derived_document_id, created_utc, processed_utc
            "#,
        )
        .bind(message_id)
        .bind(input.company_id)
        .bind(&input.from_identifier)
        .bind(&input.channel_id)
        .bind(&input.raw_body)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to log inbound message: {}", e))
        })?;

        timer.observe_duration();

        Ok(message)
    }

    #[instrument(skip(self), fields(message_id = %message_id))]
    async fn attach_parse_outcome(
        &self,
        message_id: Uuid,
        parsed: bool,
        document_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["attach_parse_outcome"])
            .start_timer();

        // The processed_utc guard keeps the update to at most one.
        sqlx::query(
            r#"
            UPDATE inbound_messages
            SET parsed_successfully = $2,
                derived_document_id = $3,
                processed_utc = NOW()
            WHERE message_id = $1 AND processed_utc IS NULL
            "#,
        )
        .bind(message_id)
        .bind(parsed)
        .bind(document_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to attach parse outcome: {}", e))
        })?;

        timer.observe_duration();

        Ok(())
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }
}
