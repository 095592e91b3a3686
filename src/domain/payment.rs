use crate::domain::money::Amount;
use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a captured charge.
///
/// ```text
/// PENDING --verify--> SUCCESS --release--> RELEASED   (terminal)
/// PENDING --fail----> FAILED                          (terminal, gateway-driven)
/// SUCCESS --refund--> REFUNDED                        (terminal, gateway-driven)
/// ```
///
/// The engine only ever walks `verify` and `release`; `FAILED` and
/// `REFUNDED` arrive from the gateway collaborator via ledger snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Refunded,
    Released,
}

impl PaymentStatus {
    /// Whether records in this status count toward an organizer's balance.
    pub fn counts_toward_balance(&self) -> bool {
        matches!(self, PaymentStatus::Success | PaymentStatus::Released)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Success => "SUCCESS",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
            PaymentStatus::Released => "RELEASED",
        };
        f.write_str(name)
    }
}

impl FromStr for PaymentStatus {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "success" => Ok(PaymentStatus::Success),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            "released" => Ok(PaymentStatus::Released),
            other => Err(PaymentError::ValidationError(format!(
                "unknown payment status `{other}`"
            ))),
        }
    }
}

/// How the hiker paid. Tags only; the charge itself happened at the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Esewa,
    Khalti,
    Bank,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Esewa => "esewa",
            PaymentMethod::Khalti => "khalti",
            PaymentMethod::Bank => "bank",
        };
        f.write_str(name)
    }
}

impl FromStr for PaymentMethod {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "card" => Ok(PaymentMethod::Card),
            "esewa" => Ok(PaymentMethod::Esewa),
            "khalti" => Ok(PaymentMethod::Khalti),
            "bank" => Ok(PaymentMethod::Bank),
            other => Err(PaymentError::ValidationError(format!(
                "unknown payment method `{other}`"
            ))),
        }
    }
}

/// A charge result reported by the gateway integration.
///
/// This is the input to `PaymentRecord::capture`; the record derives the
/// net amount and starts its lifecycle from here.
#[derive(Debug, Clone)]
pub struct CapturedCharge {
    pub id: String,
    pub transaction_id: String,
    pub organizer: u32,
    pub event: u32,
    pub event_title: String,
    pub payer_name: String,
    pub payer_email: String,
    pub participants: u16,
    pub amount: Decimal,
    pub fee: Decimal,
    pub currency: String,
    pub method: PaymentMethod,
    pub payment_date: DateTime<Utc>,
}

/// One captured payment and everything the marketplace knows about it.
///
/// The payer, event and organizer fields are read-only references owned by
/// other systems; they are denormalized here so listings and free-text
/// search need no joins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    pub transaction_id: String,
    pub organizer: u32,
    pub event: u32,
    pub event_title: String,
    pub payer_name: String,
    pub payer_email: String,
    pub participants: u16,
    pub amount: Amount,
    pub fee: Decimal,
    /// `amount - fee`, fixed at capture time and never recomputed.
    pub net_amount: Decimal,
    pub currency: String,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub payment_date: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<String>,
    pub released_date: Option<DateTime<Utc>>,
    pub released_by: Option<String>,
    pub release_notes: Option<String>,
}

impl PaymentRecord {
    /// Creates a `PENDING` record from a gateway capture.
    ///
    /// Validates the money invariants: the gross amount must be positive
    /// and the platform fee must satisfy `0 <= fee <= amount`.
    pub fn capture(charge: CapturedCharge) -> Result<Self, PaymentError> {
        let amount = Amount::new(charge.amount)?;
        if charge.fee < Decimal::ZERO || charge.fee > charge.amount {
            return Err(PaymentError::ValidationError(format!(
                "fee {} must be between zero and the gross amount {}",
                charge.fee, charge.amount
            )));
        }
        if charge.id.is_empty() || charge.transaction_id.is_empty() {
            return Err(PaymentError::ValidationError(
                "payment id and transaction id must not be empty".to_string(),
            ));
        }

        Ok(Self {
            id: charge.id,
            transaction_id: charge.transaction_id,
            organizer: charge.organizer,
            event: charge.event,
            event_title: charge.event_title,
            payer_name: charge.payer_name,
            payer_email: charge.payer_email,
            participants: charge.participants,
            amount,
            fee: charge.fee,
            net_amount: charge.amount - charge.fee,
            currency: charge.currency,
            method: charge.method,
            status: PaymentStatus::Pending,
            payment_date: charge.payment_date,
            verified_at: None,
            verified_by: None,
            released_date: None,
            released_by: None,
            release_notes: None,
        })
    }
}

/// The write half of a status transition.
///
/// A patch is applied by the store under its write lock only if the record
/// still sits in the expected predecessor status, which is what keeps two
/// concurrent releases from both landing. Release metadata is written
/// exactly once, at the moment of the transition.
#[derive(Debug, Clone)]
pub enum StatusPatch {
    Verify {
        actor: String,
        at: DateTime<Utc>,
    },
    Release {
        actor: String,
        notes: String,
        at: DateTime<Utc>,
    },
}

impl StatusPatch {
    pub fn apply(&self, record: &mut PaymentRecord) {
        match self {
            StatusPatch::Verify { actor, at } => {
                record.status = PaymentStatus::Success;
                record.verified_at = Some(*at);
                record.verified_by = Some(actor.clone());
            }
            StatusPatch::Release { actor, notes, at } => {
                record.status = PaymentStatus::Released;
                record.released_date = Some(*at);
                record.released_by = Some(actor.clone());
                record.release_notes = Some(notes.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn charge(amount: Decimal, fee: Decimal) -> CapturedCharge {
        CapturedCharge {
            id: "pay_1".to_string(),
            transaction_id: "TXN-1".to_string(),
            organizer: 7,
            event: 42,
            event_title: "Annapurna Base Camp Trek".to_string(),
            payer_name: "Mina Gurung".to_string(),
            payer_email: "mina@example.com".to_string(),
            participants: 2,
            amount,
            fee,
            currency: "NPR".to_string(),
            method: PaymentMethod::Esewa,
            payment_date: Utc::now(),
        }
    }

    #[test]
    fn test_capture_derives_net_amount() {
        let record = PaymentRecord::capture(charge(dec!(1000), dec!(100))).unwrap();
        assert_eq!(record.status, PaymentStatus::Pending);
        assert_eq!(record.net_amount, dec!(900));
        assert_eq!(record.net_amount + record.fee, record.amount.value());
        assert!(record.verified_at.is_none());
        assert!(record.release_notes.is_none());
    }

    #[test]
    fn test_capture_rejects_fee_above_amount() {
        let result = PaymentRecord::capture(charge(dec!(100), dec!(150)));
        assert!(matches!(result, Err(PaymentError::ValidationError(_))));
    }

    #[test]
    fn test_capture_rejects_negative_fee() {
        let result = PaymentRecord::capture(charge(dec!(100), dec!(-1)));
        assert!(matches!(result, Err(PaymentError::ValidationError(_))));
    }

    #[test]
    fn test_capture_allows_zero_fee() {
        let record = PaymentRecord::capture(charge(dec!(100), dec!(0))).unwrap();
        assert_eq!(record.net_amount, dec!(100));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(
            "released".parse::<PaymentStatus>().unwrap(),
            PaymentStatus::Released
        );
        assert_eq!(
            "SUCCESS".parse::<PaymentStatus>().unwrap(),
            PaymentStatus::Success
        );
        assert!(matches!(
            "settled".parse::<PaymentStatus>(),
            Err(PaymentError::ValidationError(_))
        ));
    }

    #[test]
    fn test_release_patch_writes_metadata() {
        let mut record = PaymentRecord::capture(charge(dec!(500), dec!(50))).unwrap();
        let at = Utc::now();
        StatusPatch::Verify {
            actor: "admin".to_string(),
            at,
        }
        .apply(&mut record);
        assert_eq!(record.status, PaymentStatus::Success);
        assert_eq!(record.verified_by.as_deref(), Some("admin"));

        StatusPatch::Release {
            actor: "admin".to_string(),
            notes: "BANK-REF-42".to_string(),
            at,
        }
        .apply(&mut record);
        assert_eq!(record.status, PaymentStatus::Released);
        assert_eq!(record.release_notes.as_deref(), Some("BANK-REF-42"));
        assert_eq!(record.released_date, Some(at));
    }
}
