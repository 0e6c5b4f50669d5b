//! # Fiado Notebook
//!
//! The counter's running-credit notebook: customers take goods now and pay
//! later. A plain running balance, append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::CoreResult;
use crate::money::Money;
use crate::validation::{validate_customer_name, validate_payment_amount};

/// Direction of a notebook entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Goods taken on credit; raises what the customer owes.
    Charge,
    /// Money paid back; lowers it.
    Credit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FiadoEntry {
    pub id: String,
    pub kind: EntryKind,
    pub amount: Money,
    pub detail: String,
    #[ts(as = "String")]
    pub recorded_at: DateTime<Utc>,
}

/// One customer's page in the notebook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreditAccount {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub entries: Vec<FiadoEntry>,
}

impl CreditAccount {
    pub fn open(name: &str, phone: Option<String>) -> CoreResult<Self> {
        validate_customer_name(name)?;
        Ok(CreditAccount {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            phone,
            entries: Vec::new(),
        })
    }

    /// Appends an entry. `amount` must be positive; the kind carries the sign.
    pub fn record(&mut self, kind: EntryKind, amount: Money, detail: &str) -> CoreResult<&FiadoEntry> {
        validate_payment_amount(amount)?;

        self.entries.push(FiadoEntry {
            id: Uuid::new_v4().to_string(),
            kind,
            amount,
            detail: detail.trim().to_string(),
            recorded_at: Utc::now(),
        });
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Positive: the customer owes the shop. Negative: the shop owes them.
    pub fn balance(&self) -> Money {
        self.entries
            .iter()
            .map(|e| match e.kind {
                EntryKind::Charge => e.amount,
                EntryKind::Credit => Money::zero() - e.amount,
            })
            .sum()
    }
}
