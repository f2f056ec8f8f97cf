use serde::{Deserialize, Serialize};

use crate::codec::Record;

/// A singleton record listing the ids of every live primary record of one
/// category, in creation order.
pub trait IndexRecord: Record + Default {
    fn from_entries(entries: Vec<String>) -> Self;

    fn entries(&self) -> &[String];

    fn entries_mut(&mut self) -> &mut Vec<String>;

    fn contains(&self, id: &str) -> bool {
        self.entries().iter().any(|e| e == id)
    }

    /// Remove the first entry equal to `id`. Returns `true` if one was found.
    fn remove(&mut self, id: &str) -> bool {
        let entries = self.entries_mut();
        match entries.iter().position(|e| e == id) {
            Some(pos) => {
                entries.remove(pos);
                true
            }
            None => false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIndex {
    #[serde(rename = "accountnumbers")]
    pub account_numbers: Vec<String>,
}

impl Record for AccountIndex {
    const KIND: &'static str = "account index";
}

impl IndexRecord for AccountIndex {
    fn from_entries(entries: Vec<String>) -> Self {
        Self {
            account_numbers: entries,
        }
    }

    fn entries(&self) -> &[String] {
        &self.account_numbers
    }

    fn entries_mut(&mut self) -> &mut Vec<String> {
        &mut self.account_numbers
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceIndex {
    #[serde(rename = "invoiceids")]
    pub invoice_ids: Vec<String>,
}

impl Record for InvoiceIndex {
    const KIND: &'static str = "invoice index";
}

impl IndexRecord for InvoiceIndex {
    fn from_entries(entries: Vec<String>) -> Self {
        Self {
            invoice_ids: entries,
        }
    }

    fn entries(&self) -> &[String] {
        &self.invoice_ids
    }

    fn entries_mut(&mut self) -> &mut Vec<String> {
        &mut self.invoice_ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_takes_first_match_only() {
        let mut idx = AccountIndex::from_entries(vec!["a".into(), "b".into(), "c".into()]);
        assert!(idx.remove("b"));
        assert_eq!(idx.entries(), ["a", "c"]);
        assert!(!idx.remove("b"));
        assert_eq!(idx.entries(), ["a", "c"]);
    }

    #[test]
    fn empty_index_encoding() {
        let json = serde_json::to_string(&InvoiceIndex::default()).unwrap();
        assert_eq!(json, r#"{"invoiceids":[]}"#);
    }
}
