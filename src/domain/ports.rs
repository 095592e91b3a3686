use super::payment::{PaymentRecord, PaymentStatus, StatusPatch};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Storage port for the payment ledger.
///
/// Implementations must be safe to share across concurrent admin sessions:
/// `update_if_status` is the guarded compare-and-set every state transition
/// goes through: the patch applies only while the record still sits in
/// `expected`, otherwise the call fails with `StateConflict` and writes
/// nothing. Reads are snapshots; a caller that reads after its own
/// successful write observes that write.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Adds a new record. Fails with `DuplicateTransaction` when the
    /// gateway reference was already recorded.
    async fn insert(&self, record: PaymentRecord) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<PaymentRecord>>;

    async fn all(&self) -> Result<Vec<PaymentRecord>>;

    /// Applies `patch` iff the record's status still equals `expected`,
    /// returning the updated record.
    async fn update_if_status(
        &self,
        id: &str,
        expected: PaymentStatus,
        patch: StatusPatch,
    ) -> Result<PaymentRecord>;
}

pub type PaymentStoreArc = Arc<dyn PaymentStore>;
