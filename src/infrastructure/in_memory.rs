use crate::domain::payment::{PaymentRecord, PaymentStatus, StatusPatch};
use crate::domain::ports::PaymentStore;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    payments: HashMap<String, PaymentRecord>,
    /// transaction_id -> payment id, for duplicate-charge protection.
    tx_index: HashMap<String, String>,
}

/// A thread-safe in-memory ledger store.
///
/// Uses `Arc<RwLock<..>>` to allow shared concurrent access; transitions run
/// under the write lock, which makes the status compare-and-set atomic.
/// Ideal for tests and single-run CLI sessions where persistence is not
/// required.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, record: PaymentRecord) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.tx_index.contains_key(&record.transaction_id) {
            return Err(PaymentError::DuplicateTransaction(
                record.transaction_id.clone(),
            ));
        }
        if inner.payments.contains_key(&record.id) {
            return Err(PaymentError::ValidationError(format!(
                "payment id `{}` already exists",
                record.id
            )));
        }
        inner
            .tx_index
            .insert(record.transaction_id.clone(), record.id.clone());
        inner.payments.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<PaymentRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.payments.get(id).cloned())
    }

    async fn all(&self) -> Result<Vec<PaymentRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.payments.values().cloned().collect())
    }

    async fn update_if_status(
        &self,
        id: &str,
        expected: PaymentStatus,
        patch: StatusPatch,
    ) -> Result<PaymentRecord> {
        let mut inner = self.inner.write().await;
        let record = inner
            .payments
            .get_mut(id)
            .ok_or_else(|| PaymentError::NotFound(id.to_string()))?;
        if record.status != expected {
            return Err(PaymentError::StateConflict {
                id: id.to_string(),
                actual: record.status,
            });
        }
        patch.apply(record);
        Ok(record.clone())
    }
}
