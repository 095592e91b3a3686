use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use trailpay::domain::payment::{CapturedCharge, PaymentMethod, PaymentRecord};

/// Builds a freshly captured (PENDING) payment record for tests.
pub fn captured(id: &str, organizer: u32, amount: Decimal, fee: Decimal) -> PaymentRecord {
    PaymentRecord::capture(CapturedCharge {
        id: id.to_string(),
        transaction_id: format!("TXN-{id}"),
        organizer,
        event: organizer * 10,
        event_title: "Annapurna Base Camp Trek".to_string(),
        payer_name: "Mina Gurung".to_string(),
        payer_email: "mina@example.com".to_string(),
        participants: 2,
        amount,
        fee,
        currency: "NPR".to_string(),
        method: PaymentMethod::Esewa,
        payment_date: Utc.with_ymd_and_hms(2026, 5, 1, 8, 30, 0).unwrap(),
    })
    .unwrap()
}
