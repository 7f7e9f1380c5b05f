//! Subscription plans and the monthly document quota table.

use serde::{Deserialize, Serialize};

/// Subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPlan {
    Starter,
    Pro,
    Business,
}

impl SubscriptionPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Starter => "starter",
            SubscriptionPlan::Pro => "pro",
            SubscriptionPlan::Business => "business",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "pro" => SubscriptionPlan::Pro,
            "business" => SubscriptionPlan::Business,
            _ => SubscriptionPlan::Starter,
        }
    }

    /// Fixed tier table for documents per calendar month.
    pub fn monthly_document_limit(&self) -> QuotaLimit {
        match self {
            SubscriptionPlan::Starter => QuotaLimit::Limited(10),
            SubscriptionPlan::Pro => QuotaLimit::Limited(50),
            SubscriptionPlan::Business => QuotaLimit::Unlimited,
        }
    }
}

/// Monthly ceiling. Unlimited is its own variant, never a numeric sentinel,
/// so comparisons cannot silently overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuotaLimit {
    Limited(i64),
    Unlimited,
}

impl QuotaLimit {
    /// Whether one more document may be created given the current count.
    pub fn permits(&self, used: i64) -> bool {
        match self {
            QuotaLimit::Limited(limit) => used < *limit,
            QuotaLimit::Unlimited => true,
        }
    }

    /// The ceiling as a number, for error reporting only.
    pub fn ceiling(&self) -> Option<i64> {
        match self {
            QuotaLimit::Limited(limit) => Some(*limit),
            QuotaLimit::Unlimited => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_boundary() {
        let limit = SubscriptionPlan::Starter.monthly_document_limit();
        assert!(limit.permits(9));
        assert!(!limit.permits(10));
        assert!(!limit.permits(11));
    }

    #[test]
    fn unlimited_never_denies() {
        let limit = SubscriptionPlan::Business.monthly_document_limit();
        assert!(limit.permits(0));
        assert!(limit.permits(i64::MAX));
    }

    #[test]
    fn unknown_plan_falls_back_to_starter() {
        assert_eq!(
            SubscriptionPlan::from_string("enterprise"),
            SubscriptionPlan::Starter
        );
    }
}
