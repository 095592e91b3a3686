use crate::domain::payment::{PaymentRecord, PaymentStatus, StatusPatch};
use crate::domain::ports::PaymentStore;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for payment records, keyed by payment id.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family mapping gateway transaction ids to payment ids.
pub const CF_TX_INDEX: &str = "tx_index";

/// A persistent ledger store backed by RocksDB.
///
/// Payment records are stored as JSON in one column family; a second column
/// family indexes gateway transaction ids for duplicate-charge protection.
/// All writes go through `write_lock` so the read-modify-write inside
/// `update_if_status` keeps the same compare-and-set guarantee as the
/// in-memory store. `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDbPaymentStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDbPaymentStore {
    /// Opens or creates a RocksDB instance at the specified path, ensuring
    /// both column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_payments = ColumnFamilyDescriptor::new(CF_PAYMENTS, Options::default());
        let cf_tx_index = ColumnFamilyDescriptor::new(CF_TX_INDEX, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_payments, cf_tx_index])?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf_handle(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            PaymentError::InternalError(Box::new(std::io::Error::other(format!(
                "column family `{name}` not found"
            ))))
        })
    }

    fn encode(record: &PaymentRecord) -> Result<Vec<u8>> {
        serde_json::to_vec(record).map_err(|e| PaymentError::InternalError(Box::new(e)))
    }

    fn decode(bytes: &[u8]) -> Result<PaymentRecord> {
        serde_json::from_slice(bytes).map_err(|e| PaymentError::InternalError(Box::new(e)))
    }
}

#[async_trait]
impl PaymentStore for RocksDbPaymentStore {
    async fn insert(&self, record: PaymentRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let tx_cf = self.cf_handle(CF_TX_INDEX)?;
        if self
            .db
            .get_pinned_cf(&tx_cf, record.transaction_id.as_bytes())?
            .is_some()
        {
            return Err(PaymentError::DuplicateTransaction(
                record.transaction_id.clone(),
            ));
        }

        let pay_cf = self.cf_handle(CF_PAYMENTS)?;
        if self
            .db
            .get_pinned_cf(&pay_cf, record.id.as_bytes())?
            .is_some()
        {
            return Err(PaymentError::ValidationError(format!(
                "payment id `{}` already exists",
                record.id
            )));
        }

        self.db.put_cf(
            &tx_cf,
            record.transaction_id.as_bytes(),
            record.id.as_bytes(),
        )?;
        self.db
            .put_cf(&pay_cf, record.id.as_bytes(), Self::encode(&record)?)?;

        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<PaymentRecord>> {
        let cf = self.cf_handle(CF_PAYMENTS)?;
        match self.db.get_cf(&cf, id.as_bytes())? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn all(&self) -> Result<Vec<PaymentRecord>> {
        let cf = self.cf_handle(CF_PAYMENTS)?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            records.push(Self::decode(&value)?);
        }
        Ok(records)
    }

    async fn update_if_status(
        &self,
        id: &str,
        expected: PaymentStatus,
        patch: StatusPatch,
    ) -> Result<PaymentRecord> {
        let _guard = self.write_lock.lock().await;

        let cf = self.cf_handle(CF_PAYMENTS)?;
        let bytes = self
            .db
            .get_cf(&cf, id.as_bytes())?
            .ok_or_else(|| PaymentError::NotFound(id.to_string()))?;
        let mut record = Self::decode(&bytes)?;

        if record.status != expected {
            return Err(PaymentError::StateConflict {
                id: id.to_string(),
                actual: record.status,
            });
        }

        patch.apply(&mut record);
        self.db
            .put_cf(&cf, id.as_bytes(), Self::encode(&record)?)?;
        Ok(record)
    }
}
