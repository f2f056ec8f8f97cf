use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::amount::Amount;
use crate::codec::{undefined, PrimaryRecord, Record};
use crate::error::TypeError;
use crate::principal::Principal;

/// Lifecycle state of an invoice.
///
/// Status only moves forward one step at a time:
/// `Created -> Offered -> Accepted`. `Accepted` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InvoiceStatus {
    Created = 0,
    Offered = 1,
    Accepted = 2,
}

impl InvoiceStatus {
    /// The stored integer code.
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u64) -> Result<Self, TypeError> {
        match code {
            0 => Ok(Self::Created),
            1 => Ok(Self::Offered),
            2 => Ok(Self::Accepted),
            other => Err(TypeError::InvalidStatus(other)),
        }
    }

    /// The single state reachable from this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Created => Some(Self::Offered),
            Self::Offered => Some(Self::Accepted),
            Self::Accepted => None,
        }
    }

    pub fn can_advance_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Created => "CREATED",
            Self::Offered => "OFFERED",
            Self::Accepted => "ACCEPTED",
        };
        f.write_str(label)
    }
}

impl Serialize for InvoiceStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for InvoiceStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u64::deserialize(deserializer)?;
        Self::from_code(code).map_err(D::Error::custom)
    }
}

/// A multi-party invoice record, keyed by its invoice id.
///
/// `supplier` and `payer` are fixed at creation. `buyer` stays unset until
/// the invoice is accepted and is never rebound afterwards. `discount` is set
/// when the supplier offers the invoice for trade.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(rename = "invoiceid")]
    pub invoice_id: String,
    pub amount: Amount,
    pub currency: String,
    pub supplier: Principal,
    pub payer: Principal,
    #[serde(with = "undefined")]
    pub buyer: Option<Principal>,
    #[serde(rename = "duedate", with = "undefined")]
    pub due_date: Option<String>,
    #[serde(with = "undefined")]
    pub discount: Option<Amount>,
    pub status: InvoiceStatus,
}

impl Invoice {
    /// A freshly created invoice: no buyer, no discount, no due date.
    pub fn new(
        invoice_id: impl Into<String>,
        amount: Amount,
        currency: impl Into<String>,
        supplier: Principal,
        payer: Principal,
    ) -> Self {
        Self {
            invoice_id: invoice_id.into(),
            amount,
            currency: currency.into(),
            supplier,
            payer,
            buyer: None,
            due_date: None,
            discount: None,
            status: InvoiceStatus::Created,
        }
    }

    /// Returns `true` if `principal` is recorded as supplier, payer, or buyer.
    pub fn is_party(&self, principal: &Principal) -> bool {
        self.supplier == *principal
            || self.payer == *principal
            || self.buyer.as_ref() == Some(principal)
    }
}

impl Record for Invoice {
    const KIND: &'static str = "invoice";
}

impl PrimaryRecord for Invoice {
    fn primary_key(&self) -> &str {
        &self.invoice_id
    }
}
