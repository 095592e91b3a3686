use crate::domain::filter::{Page, PaymentFilter, SortOrder};
use crate::domain::money::Balance;
use crate::domain::payment::{PaymentRecord, PaymentStatus};
use crate::domain::ports::PaymentStoreArc;
use crate::error::{PaymentError, Result};
use serde::Serialize;

/// Derived, read-only aggregate over the whole ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentStats {
    pub total_payments: usize,
    pub pending: usize,
    pub success: usize,
    pub released: usize,
    pub failed: usize,
    pub refunded: usize,
    /// Gross, fee and net sums over SUCCESS + RELEASED records.
    pub gross_collected: Balance,
    pub fees_collected: Balance,
    pub net_collected: Balance,
}

/// The authoritative record of every payment; single source of truth for
/// reads and for gateway-driven inserts.
#[derive(Clone)]
pub struct PaymentLedger {
    store: PaymentStoreArc,
}

impl PaymentLedger {
    pub fn new(store: PaymentStoreArc) -> Self {
        Self { store }
    }

    /// Records a captured payment. Only the gateway-integration collaborator
    /// calls this; the money invariants are revalidated here so a record
    /// built outside `PaymentRecord::capture` cannot smuggle in a bad fee.
    pub async fn insert(&self, record: PaymentRecord) -> Result<()> {
        let amount = record.amount.value();
        if record.fee < rust_decimal::Decimal::ZERO || record.fee > amount {
            return Err(PaymentError::ValidationError(format!(
                "fee {} must be between zero and the gross amount {}",
                record.fee, amount
            )));
        }
        if record.net_amount != amount - record.fee {
            return Err(PaymentError::ValidationError(format!(
                "net amount {} does not equal amount {} minus fee {}",
                record.net_amount, amount, record.fee
            )));
        }
        tracing::debug!(id = %record.id, transaction_id = %record.transaction_id, "recording payment");
        self.store.insert(record).await
    }

    pub async fn get(&self, id: &str) -> Result<PaymentRecord> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(id.to_string()))
    }

    /// Filtered, offset-paginated listing. Ordering is by payment date
    /// (newest first unless the filter asks otherwise) with ties broken by
    /// id, so the sort is total and pages never skip or duplicate records.
    pub async fn list(
        &self,
        filter: &PaymentFilter,
        page: usize,
        size: usize,
    ) -> Result<Page<PaymentRecord>> {
        if page == 0 {
            return Err(PaymentError::ValidationError(
                "page numbers start at 1".to_string(),
            ));
        }
        if size == 0 {
            return Err(PaymentError::ValidationError(
                "page size must be positive".to_string(),
            ));
        }

        let mut records: Vec<PaymentRecord> = self
            .store
            .all()
            .await?
            .into_iter()
            .filter(|record| filter.matches(record))
            .collect();

        records.sort_by(|a, b| match filter.order {
            SortOrder::NewestFirst => b
                .payment_date
                .cmp(&a.payment_date)
                .then_with(|| a.id.cmp(&b.id)),
            SortOrder::OldestFirst => a
                .payment_date
                .cmp(&b.payment_date)
                .then_with(|| a.id.cmp(&b.id)),
        });

        let total = records.len();
        let items = records
            .into_iter()
            .skip((page - 1).saturating_mul(size))
            .take(size)
            .collect();

        Ok(Page {
            items,
            page,
            size,
            total,
        })
    }

    /// Newest-first projection of one organizer's payments, backing the CSV
    /// export. Fails when no record references the organizer.
    pub async fn payments_for_organizer(&self, organizer: u32) -> Result<Vec<PaymentRecord>> {
        let mut records: Vec<PaymentRecord> = self
            .store
            .all()
            .await?
            .into_iter()
            .filter(|record| record.organizer == organizer)
            .collect();
        if records.is_empty() {
            return Err(PaymentError::OrganizerNotFound(organizer));
        }
        records.sort_by(|a, b| {
            b.payment_date
                .cmp(&a.payment_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(records)
    }

    /// Aggregate counts and sums over the whole ledger, never a page of it.
    pub async fn stats(&self) -> Result<PaymentStats> {
        let records = self.store.all().await?;
        let mut stats = PaymentStats {
            total_payments: records.len(),
            pending: 0,
            success: 0,
            released: 0,
            failed: 0,
            refunded: 0,
            gross_collected: Balance::ZERO,
            fees_collected: Balance::ZERO,
            net_collected: Balance::ZERO,
        };

        for record in &records {
            match record.status {
                PaymentStatus::Pending => stats.pending += 1,
                PaymentStatus::Success => stats.success += 1,
                PaymentStatus::Released => stats.released += 1,
                PaymentStatus::Failed => stats.failed += 1,
                PaymentStatus::Refunded => stats.refunded += 1,
            }
            if record.status.counts_toward_balance() {
                stats.gross_collected += Balance::new(record.amount.value());
                stats.fees_collected += Balance::new(record.fee);
                stats.net_collected += Balance::new(record.net_amount);
            }
        }

        Ok(stats)
    }
}
