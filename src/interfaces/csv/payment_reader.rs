use crate::domain::payment::{
    CapturedCharge, PaymentMethod, PaymentRecord, PaymentStatus,
};
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One row of a ledger snapshot CSV.
///
/// The gateway collaborator writes freshly captured charges as `pending`
/// rows; snapshots restored from persistence may carry any status together
/// with the verification/release metadata stamped at transition time. The
/// net amount is never part of the file; it is always rederived.
#[derive(Debug, Deserialize)]
pub struct PaymentRow {
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
    pub status: PaymentStatus,
    pub payment_date: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<String>,
    pub released_date: Option<DateTime<Utc>>,
    pub released_by: Option<String>,
    pub release_notes: Option<String>,
}

impl TryFrom<PaymentRow> for PaymentRecord {
    type Error = PaymentError;

    fn try_from(row: PaymentRow) -> Result<PaymentRecord> {
        let mut record = PaymentRecord::capture(CapturedCharge {
            id: row.id,
            transaction_id: row.transaction_id,
            organizer: row.organizer,
            event: row.event,
            event_title: row.event_title,
            payer_name: row.payer_name,
            payer_email: row.payer_email,
            participants: row.participants,
            amount: row.amount,
            fee: row.fee,
            currency: row.currency,
            method: row.method,
            payment_date: row.payment_date,
        })?;

        if row.status == PaymentStatus::Released
            && row.release_notes.as_deref().is_none_or(str::is_empty)
        {
            return Err(PaymentError::ValidationError(format!(
                "released payment `{}` is missing its release notes",
                record.id
            )));
        }

        record.status = row.status;
        record.verified_at = row.verified_at;
        record.verified_by = row.verified_by;
        record.released_date = row.released_date;
        record.released_by = row.released_by;
        record.release_notes = row.release_notes;
        Ok(record)
    }
}

/// Reads payment records from a CSV source.
///
/// Wraps `csv::Reader` and yields `Result<PaymentRecord>` lazily, so large
/// snapshots stream without loading the whole file into memory. Whitespace
/// is trimmed and short records tolerated.
pub struct PaymentReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> PaymentReader<R> {
    /// Creates a new `PaymentReader` from any `Read` source (e.g. File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn payments(self) -> impl Iterator<Item = Result<PaymentRecord>> {
        self.reader.into_deserialize::<PaymentRow>().map(|result| {
            result
                .map_err(PaymentError::from)
                .and_then(PaymentRecord::try_from)
        })
    }
}
