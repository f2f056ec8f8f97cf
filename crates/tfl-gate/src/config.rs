use serde::{Deserialize, Serialize};

/// Who may enumerate invoices currently offered for trade.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferVisibility {
    /// Any caller, registered or not.
    #[default]
    Anyone,
    /// Only principals registered with the `buyer` role.
    Buyers,
}

/// Configuration for identity and authorization checks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Whether invoice creation requires the named payer to hold the
    /// `payer` role.
    pub validate_payer_role: bool,
    /// Visibility of the open trade offer listing.
    pub open_offer_visibility: OfferVisibility,
    /// Prefix prepended to a principal name to form its role record key.
    /// Empty keeps role records in the same flat key space as accounts and
    /// invoices.
    pub role_key_prefix: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            validate_payer_role: true,
            open_offer_visibility: OfferVisibility::Anyone,
            role_key_prefix: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = GateConfig::default();
        assert!(c.validate_payer_role);
        assert_eq!(c.open_offer_visibility, OfferVisibility::Anyone);
        assert!(c.role_key_prefix.is_empty());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c: GateConfig = toml::from_str(r#"open_offer_visibility = "buyers""#).unwrap();
        assert_eq!(c.open_offer_visibility, OfferVisibility::Buyers);
        assert!(c.validate_payer_role);
    }
}
