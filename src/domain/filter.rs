use crate::domain::payment::{PaymentMethod, PaymentRecord, PaymentStatus};
use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

impl FromStr for SortOrder {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "newest" => Ok(SortOrder::NewestFirst),
            "oldest" => Ok(SortOrder::OldestFirst),
            other => Err(PaymentError::ValidationError(format!(
                "unknown sort order `{other}`, expected `newest` or `oldest`"
            ))),
        }
    }
}

/// Predicate for ledger listings. All set fields are ANDed together;
/// `PaymentFilter::default()` matches every record.
#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub status: Option<PaymentStatus>,
    pub method: Option<PaymentMethod>,
    pub organizer: Option<u32>,
    pub event: Option<u32>,
    /// Case-insensitive match over payer name, payer email, event title and
    /// transaction id.
    pub search: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub order: SortOrder,
}

impl PaymentFilter {
    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_method(mut self, method: PaymentMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn for_organizer(mut self, organizer: u32) -> Self {
        self.organizer = Some(organizer);
        self
    }

    pub fn for_event(mut self, event: u32) -> Self {
        self.event = Some(event);
        self
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn between(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    pub fn ordered(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn matches(&self, record: &PaymentRecord) -> bool {
        if self.status.is_some_and(|s| s != record.status) {
            return false;
        }
        if self.method.is_some_and(|m| m != record.method) {
            return false;
        }
        if self.organizer.is_some_and(|o| o != record.organizer) {
            return false;
        }
        if self.event.is_some_and(|e| e != record.event) {
            return false;
        }
        if self.from.is_some_and(|from| record.payment_date < from) {
            return false;
        }
        if self.to.is_some_and(|to| record.payment_date > to) {
            return false;
        }
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            let haystacks = [
                &record.payer_name,
                &record.payer_email,
                &record.event_title,
                &record.transaction_id,
            ];
            if !haystacks
                .iter()
                .any(|field| field.to_lowercase().contains(&term))
            {
                return false;
            }
        }
        true
    }
}

/// One offset-based page of a listing. `page` is 1-based; `total` counts
/// every record matching the filter, not just the page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub size: usize,
    pub total: usize,
}
