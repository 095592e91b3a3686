use crate::domain::money::Balance;
use serde::Serialize;

/// Per-organizer financial summary, always derived from the ledger.
///
/// Never persisted: every instance is recomputed from the payment records
/// referencing the organizer, so it cannot drift from the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganizerBalance {
    pub organizer: u32,
    /// Sum of net amounts over SUCCESS records: verified, not yet paid out.
    pub pending_amount: Balance,
    /// Sum of net amounts over RELEASED records.
    pub released_amount: Balance,
    /// `pending_amount + released_amount`.
    pub total_balance: Balance,
    /// Count of SUCCESS records awaiting release.
    pub pending_payments: usize,
}

impl OrganizerBalance {
    pub fn empty(organizer: u32) -> Self {
        Self {
            organizer,
            pending_amount: Balance::ZERO,
            released_amount: Balance::ZERO,
            total_balance: Balance::ZERO,
            pending_payments: 0,
        }
    }
}
