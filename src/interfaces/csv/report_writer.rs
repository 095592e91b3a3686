use crate::application::ledger::PaymentStats;
use crate::domain::balance::OrganizerBalance;
use crate::domain::money::Amount;
use crate::domain::payment::{PaymentMethod, PaymentRecord, PaymentStatus};
use crate::error::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

/// Flat CSV projection of one payment record, used by listings and the
/// per-organizer export.
#[derive(Debug, Serialize)]
struct PaymentRow<'a> {
    id: &'a str,
    transaction_id: &'a str,
    organizer: u32,
    event: u32,
    event_title: &'a str,
    payer_name: &'a str,
    payer_email: &'a str,
    participants: u16,
    amount: Amount,
    fee: Decimal,
    net_amount: Decimal,
    currency: &'a str,
    method: PaymentMethod,
    status: PaymentStatus,
    payment_date: DateTime<Utc>,
    verified_at: Option<DateTime<Utc>>,
    verified_by: Option<&'a str>,
    released_date: Option<DateTime<Utc>>,
    released_by: Option<&'a str>,
    release_notes: Option<&'a str>,
}

impl<'a> From<&'a PaymentRecord> for PaymentRow<'a> {
    fn from(record: &'a PaymentRecord) -> Self {
        Self {
            id: &record.id,
            transaction_id: &record.transaction_id,
            organizer: record.organizer,
            event: record.event,
            event_title: &record.event_title,
            payer_name: &record.payer_name,
            payer_email: &record.payer_email,
            participants: record.participants,
            amount: record.amount,
            fee: record.fee,
            net_amount: record.net_amount,
            currency: &record.currency,
            method: record.method,
            status: record.status,
            payment_date: record.payment_date,
            verified_at: record.verified_at,
            verified_by: record.verified_by.as_deref(),
            released_date: record.released_date,
            released_by: record.released_by.as_deref(),
            release_notes: record.release_notes.as_deref(),
        }
    }
}

/// Writes CSV projections of ledger state to any `Write` sink.
///
/// One writer handles one report shape per run; headers come from the row
/// structs.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_payments<'a>(
        &mut self,
        records: impl IntoIterator<Item = &'a PaymentRecord>,
    ) -> Result<()> {
        for record in records {
            self.writer.serialize(PaymentRow::from(record))?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_balances(&mut self, balances: &[OrganizerBalance]) -> Result<()> {
        for balance in balances {
            self.writer.serialize(balance)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_stats(&mut self, stats: &PaymentStats) -> Result<()> {
        self.writer.serialize(stats)?;
        self.writer.flush()?;
        Ok(())
    }
}
