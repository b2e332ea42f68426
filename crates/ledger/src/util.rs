//! Internal helpers for validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation so every write path enforces the same invariants.

use std::collections::HashSet;

use uuid::Uuid;

use crate::{EPSILON, LedgerError, MoneyCents, ResultLedger, commands::ShareSpec};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultLedger<Uuid> {
    Uuid::parse_str(value).map_err(|_| LedgerError::InvalidId(format!("invalid {label} id")))
}

/// Validate a participant share set against an expense total.
///
/// Rules:
/// - at least one share
/// - no duplicate participants
/// - every share >= 0
/// - shares sum to the total within [`EPSILON`]
pub(crate) fn validate_shares(total: MoneyCents, shares: &[ShareSpec]) -> ResultLedger<()> {
    if shares.is_empty() {
        return Err(LedgerError::Validation(
            "expense needs at least one participant share".to_string(),
        ));
    }

    let mut seen: HashSet<&str> = HashSet::with_capacity(shares.len());
    for share in shares {
        if !seen.insert(share.user_id.as_str()) {
            return Err(LedgerError::Validation(format!(
                "duplicate participant: {}",
                share.user_id
            )));
        }
        if share.amount.is_negative() {
            return Err(LedgerError::Validation(format!(
                "negative share for {}",
                share.user_id
            )));
        }
    }

    let sum: MoneyCents = shares.iter().map(|s| s.amount).sum();
    if (sum - total).abs() > EPSILON {
        return Err(LedgerError::Validation(format!(
            "shares sum to {sum}, expense total is {total}"
        )));
    }

    Ok(())
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultLedger<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::Validation(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}
