//! # Photocopy Board
//!
//! Copy jobs left at the counter: pending → ready → delivered, with the same
//! append-only payment pattern as book orders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::CoreResult;
use crate::money::Money;
use crate::types::Payment;
use crate::validation::{validate_customer_name, validate_payment_amount, validate_price, validate_title};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Ready,
    Delivered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PhotocopyJob {
    pub id: String,
    pub requester: String,
    /// What to copy ("Apunte Historia 3er año, 40 hojas").
    pub material: String,
    pub phone: Option<String>,
    pub status: JobStatus,
    pub price: Money,
    pub payments: Vec<Payment>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl PhotocopyJob {
    pub fn new(requester: &str, material: &str, phone: Option<String>, price: Money) -> CoreResult<Self> {
        validate_customer_name(requester)?;
        validate_title(material)?;
        validate_price(price)?;

        Ok(PhotocopyJob {
            id: Uuid::new_v4().to_string(),
            requester: requester.trim().to_string(),
            material: material.trim().to_string(),
            phone,
            status: JobStatus::Pending,
            price,
            payments: Vec::new(),
            created_at: Utc::now(),
        })
    }

    /// Free transitions, like book lines.
    pub fn set_status(&mut self, status: JobStatus) -> JobStatus {
        std::mem::replace(&mut self.status, status)
    }

    pub fn add_payment(&mut self, amount: Money, note: &str) -> CoreResult<&Payment> {
        validate_payment_amount(amount)?;

        self.payments.push(Payment::new(amount, note));
        Ok(&self.payments[self.payments.len() - 1])
    }

    /// `price - Σ payments`; negative when overpaid.
    pub fn outstanding(&self) -> Money {
        self.price - self.payments.iter().map(|p| p.amount).sum::<Money>()
    }
}
