use std::path::Path;

use serde::{Deserialize, Serialize};
use tfl_gate::GateConfig;

use crate::error::{LedgerError, LedgerResult};

/// Where invoice operations take the calling principal from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallerSource {
    /// The principal is passed as a positional argument.
    #[default]
    Arguments,
    /// The principal comes from the identity provider.
    Identity,
}

/// Configuration for the account and invoice ledgers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Key of the singleton account index record.
    pub account_index_key: String,
    /// Key of the singleton invoice index record.
    pub invoice_index_key: String,
    /// Currency stamped on newly created invoices.
    pub default_currency: String,
    /// Store account owner names lower-cased.
    pub lowercase_owner_names: bool,
    /// When `true`, any value at an account key blocks account creation.
    /// When `false`, only a decodable account carrying the same account
    /// number does.
    pub strict_existence_check: bool,
    /// Re-read the index after creating a record and rebuild it if the new
    /// id is missing.
    pub verify_index_writes: bool,
    pub caller_source: CallerSource,
    pub gate: GateConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            account_index_key: "_accountindex".into(),
            invoice_index_key: "invoiceIDs".into(),
            default_currency: "USD".into(),
            lowercase_owner_names: true,
            strict_existence_check: false,
            verify_index_writes: true,
            caller_source: CallerSource::Arguments,
            gate: GateConfig::default(),
        }
    }
}

impl LedgerConfig {
    /// Parse and validate a TOML document. Missing fields take defaults.
    pub fn from_toml_str(raw: &str) -> LedgerResult<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if self.account_index_key.is_empty() || self.invoice_index_key.is_empty() {
            return Err(LedgerError::Config("index keys must not be empty".into()));
        }
        if self.account_index_key == self.invoice_index_key {
            return Err(LedgerError::Config(format!(
                "account and invoice indexes share the key {:?}",
                self.account_index_key
            )));
        }
        if self.default_currency.is_empty() {
            return Err(LedgerError::Config("default currency must not be empty".into()));
        }
        Ok(())
    }

    /// Returns `true` if `key` is reserved for an index record.
    pub fn is_reserved_key(&self, key: &str) -> bool {
        key == self.account_index_key || key == self.invoice_index_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfl_gate::OfferVisibility;

    #[test]
    fn default_config() {
        let c = LedgerConfig::default();
        assert_eq!(c.account_index_key, "_accountindex");
        assert_eq!(c.invoice_index_key, "invoiceIDs");
        assert_eq!(c.default_currency, "USD");
        assert!(c.lowercase_owner_names);
        assert!(!c.strict_existence_check);
        assert!(c.verify_index_writes);
        assert_eq!(c.caller_source, CallerSource::Arguments);
        c.validate().unwrap();
    }

    #[test]
    fn toml_overrides() {
        let c = LedgerConfig::from_toml_str(
            r#"
            default_currency = "EUR"
            caller_source = "identity"

            [gate]
            open_offer_visibility = "buyers"
            role_key_prefix = "role:"
            "#,
        )
        .unwrap();
        assert_eq!(c.default_currency, "EUR");
        assert_eq!(c.caller_source, CallerSource::Identity);
        assert_eq!(c.gate.open_offer_visibility, OfferVisibility::Buyers);
        assert_eq!(c.gate.role_key_prefix, "role:");
        assert_eq!(c.account_index_key, "_accountindex");
    }

    #[test]
    fn rejects_colliding_index_keys() {
        let err = LedgerConfig::from_toml_str(
            r#"
            account_index_key = "idx"
            invoice_index_key = "idx"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(LedgerConfig::from_toml_str("caller_source = 3").is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tfl.toml");
        std::fs::write(&path, "lowercase_owner_names = false\n").unwrap();
        let c = LedgerConfig::load(&path).unwrap();
        assert!(!c.lowercase_owner_names);
        assert!(LedgerConfig::load(dir.path().join("missing.toml")).is_err());
    }
}
