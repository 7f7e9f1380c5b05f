//! Company (tenant) model.

use crate::models::plan::SubscriptionPlan;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A business account. Owns documents, inbound messages and a monthly
/// document quota. Exactly one owning user in the current scope.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Company {
    pub company_id: Uuid,
    pub owner_user_id: String,
    pub name: String,
    pub address: Option<String>,
    /// Stored normalized (no whitespace, hyphens or parentheses).
    pub phone: Option<String>,
    pub email: Option<String>,
    pub logo_url: Option<String>,
    /// Identifier of the business number on the messaging channel.
    pub inbound_channel_id: Option<String>,
    pub subscription_plan: String,
    /// "Currently paying" signal maintained by the billing webhook
    /// processor; the core never talks to the provider directly.
    pub subscription_active: bool,
    pub billing_customer_ref: Option<String>,
    pub billing_subscription_ref: Option<String>,
    pub documents_used_this_month: i64,
    pub usage_reset_at: DateTime<Utc>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Company {
    /// Tier used for quota decisions. A lapsed subscription is held to the
    /// starter ceiling regardless of the stored plan.
    pub fn effective_plan(&self) -> SubscriptionPlan {
        if self.subscription_active {
            SubscriptionPlan::from_string(&self.subscription_plan)
        } else {
            SubscriptionPlan::Starter
        }
    }
}

/// Input for creating a company.
#[derive(Debug, Clone)]
pub struct CreateCompany {
    pub owner_user_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub inbound_channel_id: Option<String>,
    pub subscription_plan: SubscriptionPlan,
}

/// Input for updating company settings.
#[derive(Debug, Clone, Default)]
pub struct UpdateCompany {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub logo_url: Option<String>,
    pub inbound_channel_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company(plan: &str, active: bool) -> Company {
        Company {
            company_id: Uuid::new_v4(),
            owner_user_id: "user-1".to_string(),
            name: "Test Sdn Bhd".to_string(),
            address: None,
            phone: None,
            email: None,
            logo_url: None,
            inbound_channel_id: None,
            subscription_plan: plan.to_string(),
            subscription_active: active,
            billing_customer_ref: None,
            billing_subscription_ref: None,
            documents_used_this_month: 0,
            usage_reset_at: Utc::now(),
            created_utc: Utc::now(),
            updated_utc: Utc::now(),
        }
    }

    #[test]
    fn lapsed_subscription_downgrades_to_starter() {
        assert_eq!(
            company("business", false).effective_plan(),
            SubscriptionPlan::Starter
        );
        assert_eq!(
            company("business", true).effective_plan(),
            SubscriptionPlan::Business
        );
    }
}
