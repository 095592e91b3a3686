use crate::domain::balance::OrganizerBalance;
use crate::domain::money::Balance;
use crate::domain::payment::PaymentStatus;
use crate::domain::ports::PaymentStoreArc;
use crate::error::{PaymentError, Result};
use std::collections::BTreeMap;

/// Derives per-organizer balances from ledger state.
///
/// Balances are recomputed from the store on every call; there is no
/// cached figure to drift from the ledger, so a view requested right after
/// a release reflects it. A failed ledger read propagates as an error
/// rather than degrading to a zero or partial balance.
#[derive(Clone)]
pub struct BalanceAggregator {
    store: PaymentStoreArc,
}

impl BalanceAggregator {
    pub fn new(store: PaymentStoreArc) -> Self {
        Self { store }
    }

    /// Groups non-FAILED, non-REFUNDED records by organizer. Ordered by
    /// organizer id.
    pub async fn organizer_balances(&self) -> Result<Vec<OrganizerBalance>> {
        let mut by_organizer: BTreeMap<u32, OrganizerBalance> = BTreeMap::new();

        for record in self.store.all().await? {
            if !record.status.counts_toward_balance() {
                continue;
            }
            let entry = by_organizer
                .entry(record.organizer)
                .or_insert_with(|| OrganizerBalance::empty(record.organizer));
            match record.status {
                PaymentStatus::Success => {
                    entry.pending_amount += Balance::new(record.net_amount);
                    entry.pending_payments += 1;
                }
                PaymentStatus::Released => {
                    entry.released_amount += Balance::new(record.net_amount);
                }
                _ => unreachable!("counts_toward_balance admits only SUCCESS and RELEASED"),
            }
            entry.total_balance = entry.pending_amount + entry.released_amount;
        }

        Ok(by_organizer.into_values().collect())
    }

    /// Balance for a single organizer. An organizer with records but no
    /// SUCCESS/RELEASED ones has a zero balance; an organizer with no
    /// records at all does not exist.
    pub async fn balance_for(&self, organizer: u32) -> Result<OrganizerBalance> {
        let records = self.store.all().await?;
        if !records.iter().any(|record| record.organizer == organizer) {
            return Err(PaymentError::OrganizerNotFound(organizer));
        }

        let mut balance = OrganizerBalance::empty(organizer);
        for record in records {
            if record.organizer != organizer || !record.status.counts_toward_balance() {
                continue;
            }
            match record.status {
                PaymentStatus::Success => {
                    balance.pending_amount += Balance::new(record.net_amount);
                    balance.pending_payments += 1;
                }
                PaymentStatus::Released => {
                    balance.released_amount += Balance::new(record.net_amount);
                }
                _ => unreachable!(),
            }
        }
        balance.total_balance = balance.pending_amount + balance.released_amount;
        Ok(balance)
    }
}
