//! Phone and channel identifier normalization.

/// Strip whitespace, hyphens and parentheses; keep any leading "+".
pub fn normalize_phone(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')'))
        .collect()
}

/// Digits only.
pub fn digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Last `n` digits of the digit string.
pub fn last_digits(raw: &str, n: usize) -> String {
    let all = digits(raw);
    let start = all.len().saturating_sub(n);
    all[start..].to_string()
}

/// Fuzzy phone equality used by the tenant resolver: exact normalized
/// match, else last-10-digit match to tolerate country-code prefix
/// variation ("+60" vs "60").
pub fn phones_match(stored: &str, candidate: &str) -> bool {
    let a = normalize_phone(stored);
    let b = normalize_phone(candidate);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }
    let suffix_a = last_digits(&a, 10);
    let suffix_b = last_digits(&b, 10);
    !suffix_a.is_empty() && suffix_a == suffix_b
}
