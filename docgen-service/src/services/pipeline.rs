//! Document assembly pipeline.
//!
//! One logical task per inbound request. Steps run strictly in order:
//! resolve tenant, write the audit log, gate quota, parse, number, persist,
//! increment usage. Terminal rejections still complete the audit-log write.

use crate::models::money;
use crate::models::{
    Company, CreateCompany, CreateDocument, CreateInboundMessage, Document, DocumentType,
    LineItem, NewLineItem, SubscriptionPlan,
};
use crate::parser::{self, ParsedDraft};
use crate::services::metrics::{
    DOCUMENTS_TOTAL, MESSAGES_TOTAL, PARTIAL_FAILURES_TOTAL, QUOTA_DENIALS_TOTAL,
};
use crate::services::numbering;
use crate::services::store::DocumentStore;
use crate::utils::phone::normalize_phone;
use service_core::error::AppError;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Structured input for the web-form path, already boundary-validated.
#[derive(Debug, Clone)]
pub struct SubmitDocument {
    pub document_type: DocumentType,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub line_items: Vec<NewLineItem>,
    pub tax_rate: i64,
    pub notes: Option<String>,
}

/// Terminal result of ingesting one inbound message. Rejections are
/// expected conditions, not errors: the channel is always acknowledged.
#[derive(Debug)]
pub enum IngestOutcome {
    Created {
        document: Document,
        line_items: Vec<LineItem>,
        reply: String,
    },
    TenantUnresolved,
    QuotaExceeded,
    ParseFailure,
}

impl IngestOutcome {
    /// Stable outcome code for the channel acknowledgment.
    pub fn code(&self) -> &'static str {
        match self {
            IngestOutcome::Created { .. } => "created",
            IngestOutcome::TenantUnresolved => "tenant_unresolved",
            IngestOutcome::QuotaExceeded => "quota_exceeded",
            IngestOutcome::ParseFailure => "parse_failure",
        }
    }
}

#[derive(Clone)]
pub struct DocumentPipeline {
    store: Arc<dyn DocumentStore>,
}

impl DocumentPipeline {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Company for an authenticated user, created lazily on first access.
    pub async fn company_for_user(&self, owner_user_id: &str) -> Result<Company, AppError> {
        if let Some(company) = self.store.find_company_by_owner(owner_user_id).await? {
            return Ok(company);
        }
        self.store
            .create_company(&CreateCompany {
                owner_user_id: owner_user_id.to_string(),
                name: "My Business".to_string(),
                phone: None,
                email: None,
                inbound_channel_id: None,
                subscription_plan: SubscriptionPlan::Starter,
            })
            .await
    }

    /// Ingest one raw inbound message end to end.
    #[instrument(skip(self, body), fields(from = %from))]
    pub async fn ingest_message(
        &self,
        from: &str,
        channel_id: Option<&str>,
        body: &str,
    ) -> Result<IngestOutcome, AppError> {
        let company = self.resolve_tenant(channel_id, from).await?;

        // The audit log is written for every delivery, resolved or not,
        // before any further processing can fail.
        let log = self
            .store
            .create_message_log(&CreateInboundMessage {
                company_id: company.as_ref().map(|c| c.company_id),
                from_identifier: from.to_string(),
                channel_id: channel_id.map(str::to_string),
                raw_body: body.to_string(),
            })
            .await?;

        let Some(company) = company else {
            MESSAGES_TOTAL
                .with_label_values(&["tenant_unresolved"])
                .inc();
            info!(from = %from, "Inbound message from unresolved sender");
            return Ok(IngestOutcome::TenantUnresolved);
        };

        // Quota is a pre-check here; parsing still runs so the audit row
        // records whether the message itself was well formed.
        let quota_denied = !self.quota_permits(&company);

        let Some(draft) = parser::parse_message(body) else {
            self.store
                .attach_parse_outcome(log.message_id, false, None)
                .await?;
            MESSAGES_TOTAL.with_label_values(&["parse_failure"]).inc();
            info!(message_id = %log.message_id, "Inbound message did not parse");
            return Ok(IngestOutcome::ParseFailure);
        };

        if quota_denied {
            self.store
                .attach_parse_outcome(log.message_id, true, None)
                .await?;
            MESSAGES_TOTAL.with_label_values(&["quota_exceeded"]).inc();
            QUOTA_DENIALS_TOTAL
                .with_label_values(&[company.effective_plan().as_str()])
                .inc();
            info!(
                message_id = %log.message_id,
                company_id = %company.company_id,
                "Quota exceeded; document creation skipped"
            );
            return Ok(IngestOutcome::QuotaExceeded);
        }

        let input = draft_to_create(&company, &draft, Some(log.message_id));
        match self.finalize(&company, input).await {
            Ok((document, line_items)) => {
                self.store
                    .attach_parse_outcome(log.message_id, true, Some(document.document_id))
                    .await?;
                MESSAGES_TOTAL.with_label_values(&["created"]).inc();
                let reply = parser::confirmation_message(&draft, &document.document_number);
                Ok(IngestOutcome::Created {
                    document,
                    line_items,
                    reply,
                })
            }
            Err(e) => {
                // Fail fast, but complete the audit write first.
                if let Err(log_err) = self
                    .store
                    .attach_parse_outcome(log.message_id, true, None)
                    .await
                {
                    error!(
                        message_id = %log.message_id,
                        error = %log_err,
                        "Failed to record parse outcome after persistence failure"
                    );
                }
                Err(e)
            }
        }
    }

    /// Structured submission from the web form; bypasses parsing.
    #[instrument(skip(self, input), fields(company_id = %company.company_id))]
    pub async fn submit_document(
        &self,
        company: &Company,
        input: SubmitDocument,
    ) -> Result<(Document, Vec<LineItem>), AppError> {
        if !self.quota_permits(company) {
            QUOTA_DENIALS_TOTAL
                .with_label_values(&[company.effective_plan().as_str()])
                .inc();
            let limit = company
                .effective_plan()
                .monthly_document_limit()
                .ceiling()
                .unwrap_or(0);
            return Err(AppError::QuotaExceeded {
                used: company.documents_used_this_month,
                limit,
            });
        }

        let totals = money::compute_totals(&input.line_items, input.tax_rate)
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;

        let create = CreateDocument {
            company_id: company.company_id,
            document_number: String::new(),
            document_type: input.document_type,
            customer_name: input.customer_name,
            customer_email: input.customer_email,
            customer_phone: input.customer_phone,
            line_items: input.line_items,
            subtotal: totals.subtotal,
            tax_rate: input.tax_rate,
            tax_amount: totals.tax_amount,
            total: totals.total,
            notes: input.notes,
            source_message_id: None,
        };

        self.finalize(company, create).await
    }

    /// Map an inbound identifier to a tenant. `None` is a normal miss, not
    /// an error: the caller logs the message and acknowledges.
    async fn resolve_tenant(
        &self,
        channel_id: Option<&str>,
        from: &str,
    ) -> Result<Option<Company>, AppError> {
        if let Some(channel_id) = channel_id.filter(|c| !c.is_empty()) {
            if let Some(company) = self.store.find_company_by_channel(channel_id).await? {
                return Ok(Some(company));
            }
        }

        let normalized = normalize_phone(from);
        if normalized.is_empty() {
            return Ok(None);
        }
        self.store.find_company_by_phone(&normalized).await
    }

    fn quota_permits(&self, company: &Company) -> bool {
        company
            .effective_plan()
            .monthly_document_limit()
            .permits(company.documents_used_this_month)
    }

    /// Number, persist and count one document. The document insert is the
    /// only durable document write; the usage increment follows it and is
    /// never skipped once the insert succeeds.
    async fn finalize(
        &self,
        company: &Company,
        mut input: CreateDocument,
    ) -> Result<(Document, Vec<LineItem>), AppError> {
        let existing = self
            .store
            .count_documents_by_type(company.company_id, input.document_type)
            .await?;
        input.document_number = numbering::next_document_number(input.document_type, existing);

        let document = self.store.create_document(&input).await?;
        let line_items = self
            .store
            .get_line_items(company.company_id, document.document_id)
            .await?;

        DOCUMENTS_TOTAL
            .with_label_values(&[document.document_type.as_str()])
            .inc();

        match self.store.increment_usage(company.company_id).await {
            Ok(new_count) => {
                if let Some(limit) = company
                    .effective_plan()
                    .monthly_document_limit()
                    .ceiling()
                {
                    if new_count > limit {
                        // The documented pre-check/increment race: the
                        // overshoot is recorded, not hidden.
                        warn!(
                            company_id = %company.company_id,
                            used = new_count,
                            limit = limit,
                            "Usage counter passed the plan ceiling"
                        );
                    }
                }
            }
            Err(e) => {
                // Document persisted but the counter did not move. This is
                // a recoverable inconsistency: record it and reconcile from
                // the actual document counts.
                PARTIAL_FAILURES_TOTAL
                    .with_label_values(&["usage_increment"])
                    .inc();
                error!(
                    company_id = %company.company_id,
                    document_id = %document.document_id,
                    error = %e,
                    "Usage increment failed after persist; reconciling"
                );
                if let Err(recount_err) = self.store.recompute_usage(company.company_id).await {
                    error!(
                        company_id = %company.company_id,
                        error = %recount_err,
                        "Usage reconciliation failed; counter remains stale"
                    );
                }
            }
        }

        info!(
            company_id = %company.company_id,
            document_id = %document.document_id,
            document_number = %document.document_number,
            total = document.total,
            "Document assembled"
        );

        Ok((document, line_items))
    }
}

fn draft_to_create(
    company: &Company,
    draft: &ParsedDraft,
    source_message_id: Option<Uuid>,
) -> CreateDocument {
    CreateDocument {
        company_id: company.company_id,
        document_number: String::new(),
        document_type: draft.document_type,
        customer_name: draft.customer_name.clone(),
        customer_email: None,
        customer_phone: draft.customer_phone.clone(),
        line_items: draft.line_items.clone(),
        subtotal: draft.subtotal,
        tax_rate: draft.tax_rate,
        tax_amount: draft.tax_amount,
        total: draft.total,
        notes: draft.notes.clone(),
        source_message_id,
    }
}
