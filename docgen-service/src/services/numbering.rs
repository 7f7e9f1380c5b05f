//! Document number generation.
//!
//! Numbers look like `INV-2026-0007-K3QZ`: type prefix, calendar year, a
//! zero-padded ordinal derived from the existing count of that kind for the
//! tenant, and a short time-derived token. The ordinal is an approximate
//! sequence for readability; the token is what keeps concurrently created
//! numbers unique, with the database unique index as the final backstop.

use crate::models::DocumentType;
use chrono::{Datelike, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

const TOKEN_LEN: usize = 4;

// Tie-break for tokens minted in the same millisecond.
static TOKEN_SEQ: AtomicU64 = AtomicU64::new(0);

/// Assemble a document number from its parts.
pub fn format_document_number(
    document_type: DocumentType,
    year: i32,
    sequence: i64,
    token: &str,
) -> String {
    format!(
        "{}-{}-{:04}-{}",
        document_type.number_prefix(),
        year,
        sequence,
        token
    )
}

/// Number for the next document of a kind, given the current count.
pub fn next_document_number(document_type: DocumentType, existing_count: i64) -> String {
    format_document_number(
        document_type,
        Utc::now().year(),
        existing_count + 1,
        &time_token(),
    )
}

/// Short uppercase base-36 token: three characters from the millisecond
/// clock plus one from a process-wide sequence, so two numbers minted in
/// the same instant still differ.
fn time_token() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let encoded = to_base36(millis);
    let start = encoded.len().saturating_sub(TOKEN_LEN - 1);
    let seq = TOKEN_SEQ.fetch_add(1, Ordering::Relaxed) % 36;
    format!("{}{}", &encoded[start..], to_base36(seq as u128))
}

fn to_base36(mut value: u128) -> String {
    const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).expect("base36 alphabet is ascii")
}
