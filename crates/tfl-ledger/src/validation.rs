//! Argument validation shared by the ledgers and the dispatch surface.

use tfl_types::Amount;

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};

pub fn require_arity(function: &str, args: &[String], expected: usize) -> LedgerResult<()> {
    if args.len() != expected {
        return Err(LedgerError::Validation(format!(
            "{function}: incorrect number of arguments, expecting {expected}, got {}",
            args.len()
        )));
    }
    Ok(())
}

pub fn require_non_empty(field: &str, value: &str) -> LedgerResult<()> {
    if value.is_empty() {
        return Err(LedgerError::Validation(format!("{field} must be a non-empty string")));
    }
    Ok(())
}

/// Ids must be non-empty and must not collide with an index record key.
pub fn require_record_id(config: &LedgerConfig, field: &str, id: &str) -> LedgerResult<()> {
    require_non_empty(field, id)?;
    if config.is_reserved_key(id) {
        return Err(LedgerError::Validation(format!(
            "{field} {id:?} is a reserved key"
        )));
    }
    Ok(())
}

pub fn parse_amount(field: &str, value: &str) -> LedgerResult<Amount> {
    value
        .parse::<Amount>()
        .map_err(|e| LedgerError::Validation(format!("{field} must be a numeric string: {e}")))
}

pub fn parse_non_negative_amount(field: &str, value: &str) -> LedgerResult<Amount> {
    let amount = parse_amount(field, value)?;
    if amount.is_negative() {
        return Err(LedgerError::Validation(format!(
            "{field} must not be negative, got {amount}"
        )));
    }
    Ok(amount)
}

pub fn parse_positive_amount(field: &str, value: &str) -> LedgerResult<Amount> {
    let amount = parse_amount(field, value)?;
    if !amount.is_positive() {
        return Err(LedgerError::Validation(format!(
            "{field} must be greater than zero, got {amount}"
        )));
    }
    Ok(amount)
}
