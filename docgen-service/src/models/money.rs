//! Integer-cent monetary arithmetic shared by every document entry path.
//!
//! All amounts are `i64` cents; percent rates are stored as value x 100
//! (6% = 600, 6.5% = 650) so one-decimal-place rates never touch floating
//! point. Rounding is round-half-up throughout, including the decimal
//! string to cents conversion at the text boundary.

use crate::models::NewLineItem;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Monetary amount in the smallest currency unit.
pub type Cents = i64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("line item {index} is invalid: {reason}")]
    InvalidLineItem { index: usize, reason: &'static str },

    #[error("document has no line items")]
    EmptyDocument,
}

/// Derived monetary fields of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Cents,
    pub tax_amount: Cents,
    pub total: Cents,
}

/// Line total, fixed once at item creation.
pub fn line_total(quantity: i64, unit_price: Cents) -> Cents {
    quantity * unit_price
}

/// Compute subtotal, tax and total for a validated line item sequence.
///
/// `tax_rate` is in basis-like units (percent x 100). Pure function; the
/// caller owns persistence.
pub fn compute_totals(items: &[NewLineItem], tax_rate: i64) -> Result<Totals, MoneyError> {
    if items.is_empty() {
        return Err(MoneyError::EmptyDocument);
    }

    let mut subtotal: Cents = 0;
    for (index, item) in items.iter().enumerate() {
        if item.description.trim().is_empty() {
            return Err(MoneyError::InvalidLineItem {
                index,
                reason: "description must not be empty",
            });
        }
        if item.quantity < 1 {
            return Err(MoneyError::InvalidLineItem {
                index,
                reason: "quantity must be at least 1",
            });
        }
        if item.unit_price < 0 {
            return Err(MoneyError::InvalidLineItem {
                index,
                reason: "unit price must not be negative",
            });
        }
        // The item total is the source of truth, established at creation.
        subtotal += item.total;
    }

    let tax_amount = round_half_up_div(subtotal * tax_rate, 10_000);
    Ok(Totals {
        subtotal,
        tax_amount,
        total: subtotal + tax_amount,
    })
}

/// Integer division rounding half away from zero (operands non-negative).
fn round_half_up_div(numerator: i64, denominator: i64) -> i64 {
    (numerator + denominator / 2) / denominator
}

/// Decimal amount ("50", "2.50") to cents, rounding half-up.
pub fn decimal_to_cents(amount: Decimal) -> Option<Cents> {
    (amount * Decimal::from(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Decimal percentage ("6", "6.5") to basis-like rate units.
pub fn percent_to_rate(percent: Decimal) -> Option<i64> {
    decimal_to_cents(percent)
}

/// Render cents as a plain decimal amount, e.g. 10050 -> "100.50".
pub fn format_cents(amount: Cents) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let amount = amount.abs();
    format!("{}{}.{:02}", sign, amount / 100, amount % 100)
}

/// Render a basis-like rate as a percentage, e.g. 600 -> "6", 650 -> "6.5".
pub fn format_rate(rate: i64) -> String {
    let whole = rate / 100;
    let frac = rate % 100;
    if frac == 0 {
        format!("{}", whole)
    } else if frac % 10 == 0 {
        format!("{}.{}", whole, frac / 10)
    } else {
        format!("{}.{:02}", whole, frac)
    }
}
