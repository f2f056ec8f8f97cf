use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::codec::{PrimaryRecord, Record};

/// A balance-holding account, keyed by its account number.
///
/// The balance is never negative at rest; the account ledger refuses any
/// transfer that would make it so.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "accountnumber")]
    pub account_number: String,
    #[serde(rename = "ownername")]
    pub owner_name: String,
    pub currency: String,
    pub balance: Amount,
}

impl Account {
    pub fn new(
        account_number: impl Into<String>,
        owner_name: impl Into<String>,
        currency: impl Into<String>,
        balance: Amount,
    ) -> Self {
        Self {
            account_number: account_number.into(),
            owner_name: owner_name.into(),
            currency: currency.into(),
            balance,
        }
    }
}

impl Record for Account {
    const KIND: &'static str = "account";
}

impl PrimaryRecord for Account {
    fn primary_key(&self) -> &str {
        &self.account_number
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    use super::*;
    use crate::codec::{decode, encode};

    #[test]
    fn field_names_are_lower_case() {
        let account = Account::new("A001", "alice", "USD", "500.00".parse().unwrap());
        let bytes = encode(&account).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "accountnumber": "A001",
                "ownername": "alice",
                "currency": "USD",
                "balance": "500.00",
            })
        );
        assert_eq!(decode::<Account>("A001", &bytes).unwrap(), account);
    }

    #[test]
    fn decode_legacy_exponent_balance() {
        let raw = br#"{"accountnumber":"B7","ownername":"bob","currency":"GBP","balance":"3.5E+03"}"#;
        let account: Account = decode("B7", raw).unwrap();
        assert_eq!(account.balance, "3500".parse().unwrap());
    }

    #[test]
    fn decode_reports_key_on_corruption() {
        let err = decode::<Account>("A9", b"not json").unwrap_err();
        match err {
            crate::TypeError::Corrupt { kind, key, .. } => {
                assert_eq!(kind, "account");
                assert_eq!(key, "A9");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn any_account_round_trips(
            number in "\\PC{1,24}",
            owner in "\\PC{0,24}",
            currency in "[A-Z]{3}",
            mantissa in any::<i64>(),
            scale in 0u32..=28,
        ) {
            let balance = Amount::new(Decimal::new(mantissa, scale));
            let account = Account::new(number.as_str(), owner, currency, balance);
            let bytes = encode(&account).unwrap();
            let back: Account = decode(&number, &bytes).unwrap();
            prop_assert_eq!(back.balance.to_string(), balance.to_string());
            prop_assert_eq!(back, account);
        }
    }
}
