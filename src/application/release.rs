use crate::domain::payment::{PaymentRecord, PaymentStatus, StatusPatch};
use crate::domain::ports::PaymentStoreArc;
use crate::error::{PaymentError, Result};
use chrono::Utc;

/// Outcome of a `bulk_release` call, itemized per id.
///
/// Partial failure is a structured result, not an error: callers must
/// inspect `failed` instead of assuming uniform success.
#[derive(Debug, Default)]
pub struct BulkResult {
    pub succeeded: Vec<String>,
    pub failed: Vec<BulkFailure>,
}

#[derive(Debug)]
pub struct BulkFailure {
    pub id: String,
    pub reason: PaymentError,
}

impl BulkResult {
    /// Every id moved to RELEASED.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Some ids moved, some did not.
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty() && !self.succeeded.is_empty()
    }
}

/// The payment state machine: verification and fund-release transitions.
///
/// Every transition is a guarded compare-and-set through the store, so two
/// concurrent releases of the same payment can never both succeed: the
/// loser observes `StateConflict`, or `AlreadyReleased` when it checked
/// after the winner landed. Single-record operations apply no partial
/// state on failure.
#[derive(Clone)]
pub struct ReleaseEngine {
    store: PaymentStoreArc,
}

impl ReleaseEngine {
    pub fn new(store: PaymentStoreArc) -> Self {
        Self { store }
    }

    /// PENDING -> SUCCESS, after the admin reconciled the charge against the
    /// gateway. Stamps `verified_at`/`verified_by`.
    pub async fn verify_payment(&self, id: &str, actor: &str) -> Result<PaymentRecord> {
        if actor.is_empty() {
            return Err(PaymentError::ValidationError(
                "actor must not be empty".to_string(),
            ));
        }

        let current = self.fetch(id).await?;
        if current.status != PaymentStatus::Pending {
            return Err(PaymentError::InvalidStateTransition {
                id: id.to_string(),
                expected: PaymentStatus::Pending,
                actual: current.status,
            });
        }

        let updated = self
            .store
            .update_if_status(
                id,
                PaymentStatus::Pending,
                StatusPatch::Verify {
                    actor: actor.to_string(),
                    at: Utc::now(),
                },
            )
            .await?;
        tracing::info!(id, actor, "payment verified");
        Ok(updated)
    }

    /// SUCCESS -> RELEASED. `notes` is mandatory: it is the human-readable
    /// settlement reference (e.g. a bank slip) and the only trace that money
    /// left the platform, since this system never moves funds itself.
    ///
    /// A payment already in RELEASED fails with `AlreadyReleased`: a second
    /// release would mean paying the organizer twice, so it is always a
    /// reported error, never a silent success.
    pub async fn release_payment(&self, id: &str, actor: &str, notes: &str) -> Result<PaymentRecord> {
        if actor.is_empty() {
            return Err(PaymentError::ValidationError(
                "actor must not be empty".to_string(),
            ));
        }
        if notes.trim().is_empty() {
            return Err(PaymentError::ValidationError(
                "release notes must not be empty".to_string(),
            ));
        }

        let current = self.fetch(id).await?;
        match current.status {
            PaymentStatus::Success => {}
            PaymentStatus::Released => {
                return Err(PaymentError::AlreadyReleased(id.to_string()));
            }
            actual => {
                return Err(PaymentError::InvalidStateTransition {
                    id: id.to_string(),
                    expected: PaymentStatus::Success,
                    actual,
                });
            }
        }

        let updated = self
            .store
            .update_if_status(
                id,
                PaymentStatus::Success,
                StatusPatch::Release {
                    actor: actor.to_string(),
                    notes: notes.to_string(),
                    at: Utc::now(),
                },
            )
            .await?;
        tracing::info!(id, actor, notes, "payment released");
        Ok(updated)
    }

    /// Releases each id independently; one id's failure never prevents the
    /// others from succeeding, and the batch never aborts early. Atomicity
    /// is per-record, not per-batch: only the succeeded subset changes
    /// balances.
    pub async fn bulk_release(&self, ids: &[String], actor: &str, notes: &str) -> Result<BulkResult> {
        // Empty notes would fail every item identically, so the call itself
        // is malformed.
        if notes.trim().is_empty() {
            return Err(PaymentError::ValidationError(
                "release notes must not be empty".to_string(),
            ));
        }

        let mut result = BulkResult::default();
        for id in ids {
            match self.release_payment(id, actor, notes).await {
                Ok(_) => result.succeeded.push(id.clone()),
                Err(reason) => {
                    tracing::warn!(id = %id, %reason, "bulk release item failed");
                    result.failed.push(BulkFailure {
                        id: id.clone(),
                        reason,
                    });
                }
            }
        }
        Ok(result)
    }

    async fn fetch(&self, id: &str) -> Result<PaymentRecord> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::{CapturedCharge, PaymentMethod};
    use crate::domain::ports::PaymentStore;
    use crate::infrastructure::in_memory::InMemoryPaymentStore;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn record(id: &str) -> PaymentRecord {
        PaymentRecord::capture(CapturedCharge {
            id: id.to_string(),
            transaction_id: format!("TXN-{id}"),
            organizer: 1,
            event: 1,
            event_title: "Poon Hill Sunrise Trek".to_string(),
            payer_name: "Kiran Magar".to_string(),
            payer_email: "kiran@example.com".to_string(),
            participants: 2,
            amount: dec!(1000),
            fee: dec!(100),
            currency: "NPR".to_string(),
            method: PaymentMethod::Esewa,
            payment_date: Utc::now(),
        })
        .unwrap()
    }

    async fn engine_with(records: Vec<PaymentRecord>) -> ReleaseEngine {
        let store = InMemoryPaymentStore::new();
        for rec in records {
            store.insert(rec).await.unwrap();
        }
        ReleaseEngine::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_verify_stamps_actor_and_time() {
        let engine = engine_with(vec![record("pay_1")]).await;

        let updated = engine.verify_payment("pay_1", "admin@trailpay").await.unwrap();
        assert_eq!(updated.status, PaymentStatus::Success);
        assert_eq!(updated.verified_by.as_deref(), Some("admin@trailpay"));
        assert!(updated.verified_at.is_some());
    }

    #[tokio::test]
    async fn test_verify_non_pending_fails_without_mutation() {
        let engine = engine_with(vec![record("pay_1")]).await;
        engine.verify_payment("pay_1", "admin").await.unwrap();

        let result = engine.verify_payment("pay_1", "admin").await;
        assert!(matches!(
            result,
            Err(PaymentError::InvalidStateTransition {
                expected: PaymentStatus::Pending,
                actual: PaymentStatus::Success,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_release_requires_success() {
        let engine = engine_with(vec![record("pay_1")]).await;

        let result = engine.release_payment("pay_1", "admin", "BANK-REF-1").await;
        assert!(matches!(
            result,
            Err(PaymentError::InvalidStateTransition {
                expected: PaymentStatus::Success,
                actual: PaymentStatus::Pending,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_release_requires_notes() {
        let engine = engine_with(vec![record("pay_1")]).await;
        engine.verify_payment("pay_1", "admin").await.unwrap();

        let result = engine.release_payment("pay_1", "admin", "  ").await;
        assert!(matches!(result, Err(PaymentError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_double_release_reports_already_released() {
        let engine = engine_with(vec![record("pay_1")]).await;
        engine.verify_payment("pay_1", "admin").await.unwrap();
        engine
            .release_payment("pay_1", "admin", "BANK-REF-1")
            .await
            .unwrap();

        let result = engine.release_payment("pay_1", "admin", "BANK-REF-2").await;
        assert!(matches!(result, Err(PaymentError::AlreadyReleased(id)) if id == "pay_1"));
    }

    #[tokio::test]
    async fn test_release_metadata_written_once() {
        let engine = engine_with(vec![record("pay_1")]).await;
        engine.verify_payment("pay_1", "admin").await.unwrap();
        engine
            .release_payment("pay_1", "admin", "BANK-REF-1")
            .await
            .unwrap();

        // The failed second release must not overwrite the original notes.
        let _ = engine.release_payment("pay_1", "other", "BANK-REF-2").await;
        let current = engine.fetch("pay_1").await.unwrap();
        assert_eq!(current.release_notes.as_deref(), Some("BANK-REF-1"));
        assert_eq!(current.released_by.as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn test_verify_unknown_id_is_not_found() {
        let engine = engine_with(vec![]).await;
        let result = engine.verify_payment("pay_404", "admin").await;
        assert!(matches!(result, Err(PaymentError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_bulk_release_is_itemized() {
        let engine = engine_with(vec![record("pay_a"), record("pay_b"), record("pay_c")]).await;
        for id in ["pay_a", "pay_b", "pay_c"] {
            engine.verify_payment(id, "admin").await.unwrap();
        }
        // pay_b goes out ahead of the batch.
        engine
            .release_payment("pay_b", "admin", "BANK-REF-0")
            .await
            .unwrap();

        let ids: Vec<String> = ["pay_a", "pay_b", "pay_c"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let result = engine.bulk_release(&ids, "admin", "BANK-REF-1").await.unwrap();

        assert_eq!(result.succeeded, vec!["pay_a", "pay_c"]);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].id, "pay_b");
        assert!(matches!(
            result.failed[0].reason,
            PaymentError::AlreadyReleased(_)
        ));
        assert!(result.is_partial());
        assert!(!result.is_complete());
    }

    #[tokio::test]
    async fn test_bulk_release_rejects_empty_notes_upfront() {
        let engine = engine_with(vec![record("pay_a")]).await;
        engine.verify_payment("pay_a", "admin").await.unwrap();

        let result = engine
            .bulk_release(&["pay_a".to_string()], "admin", "")
            .await;
        assert!(matches!(result, Err(PaymentError::ValidationError(_))));

        // Nothing was released.
        let still_success = engine.fetch("pay_a").await.unwrap();
        assert_eq!(still_success.status, PaymentStatus::Success);
    }
}
