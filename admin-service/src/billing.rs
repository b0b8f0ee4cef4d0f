use rust_decimal::{Decimal, RoundingStrategy};
use time::{Date, Duration};
use uuid::Uuid;
use water_client::domain::BillStatus;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    #[error("readings must not be negative")]
    NegativeReading,
    #[error("current reading {current} is below previous reading {previous}")]
    ReadingBelowPrevious { previous: Decimal, current: Decimal },
    #[error("consumption must not be negative")]
    NegativeConsumption,
    #[error("rate must not be negative")]
    NegativeRate,
    #[error("billing period ends ({end}) before it starts ({start})")]
    InvalidPeriod { start: Date, end: Date },
    #[error("payment amount must be positive")]
    NonPositivePayment,
    #[error("bill is already {0}")]
    BillClosed(BillStatus),
    #[error("payment of {amount} exceeds outstanding balance {balance}")]
    Overpayment { amount: Decimal, balance: Decimal },
    #[error("{field} {value} is out of range")]
    OutOfRange { field: &'static str, value: Decimal },
    #[error("{field} {value} has more than {places} decimal places")]
    TooPrecise {
        field: &'static str,
        value: Decimal,
        places: u32,
    },
    #[error("bill amount is out of range")]
    AmountOutOfRange,
    #[error("previous reading {previous} is below the meter's latest reading {latest}")]
    BehindLatestReading { latest: Decimal, previous: Decimal },
}

/// Column shapes in `sql/schema/01_core.sql`: (integer digits, scale).
const VOLUME: (u32, u32) = (11, 3);
const RATE: (u32, u32) = (8, 4);
const MONEY: (u32, u32) = (12, 2);

/// Reject values the matching `NUMERIC` column cannot hold exactly.
fn check_fits(field: &'static str, value: Decimal, (digits, scale): (u32, u32)) -> Result<(), BillingError> {
    if value.normalize().scale() > scale {
        return Err(BillingError::TooPrecise {
            field,
            value,
            places: scale,
        });
    }
    if value.abs() >= Decimal::from(10i64.pow(digits)) {
        return Err(BillingError::OutOfRange { field, value });
    }
    Ok(())
}

/// Consumption between two meter readings.
///
/// Rules:
/// - neither reading may be negative.
/// - both must fit `NUMERIC(14,3)`.
/// - the current reading may not be below the previous one; meters only count up.
pub fn consumption(previous: Decimal, current: Decimal) -> Result<Decimal, BillingError> {
    if previous < Decimal::ZERO || current < Decimal::ZERO {
        return Err(BillingError::NegativeReading);
    }
    check_fits("previous_reading", previous, VOLUME)?;
    check_fits("current_reading", current, VOLUME)?;
    if current < previous {
        return Err(BillingError::ReadingBelowPrevious { previous, current });
    }
    Ok(current - previous)
}

/// Previous value for a new reading on a meter whose newest stored value is
/// `latest`. An explicit value may not reach back behind `latest`.
pub fn previous_reading(latest: Option<Decimal>, explicit: Option<Decimal>) -> Result<Decimal, BillingError> {
    match (latest, explicit) {
        (Some(latest), Some(previous)) if previous < latest => {
            Err(BillingError::BehindLatestReading { latest, previous })
        }
        (_, Some(previous)) => Ok(previous),
        (latest, None) => Ok(latest.unwrap_or(Decimal::ZERO)),
    }
}

/// `consumption * rate`, rounded to cents with midpoints away from zero.
///
/// Inputs and the result must fit their bill columns.
pub fn bill_amount(consumption: Decimal, rate: Decimal) -> Result<Decimal, BillingError> {
    if consumption < Decimal::ZERO {
        return Err(BillingError::NegativeConsumption);
    }
    if rate < Decimal::ZERO {
        return Err(BillingError::NegativeRate);
    }
    check_fits("consumption", consumption, VOLUME)?;
    check_fits("rate", rate, RATE)?;

    let amount = consumption
        .checked_mul(rate)
        .ok_or(BillingError::AmountOutOfRange)?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    check_fits("amount", amount, MONEY).map_err(|_| BillingError::AmountOutOfRange)?;
    Ok(amount)
}

pub fn validate_period(start: Date, end: Date) -> Result<(), BillingError> {
    if end < start {
        return Err(BillingError::InvalidPeriod { start, end });
    }
    Ok(())
}

pub fn due_date(period_end: Date, due_days: i64) -> Date {
    period_end.saturating_add(Duration::days(due_days))
}

/// Deterministic bill number for a customer, meter and period.
///
/// Generating the same bill twice yields the same number, which the unique
/// constraint on `bills.bill_number` turns into a conflict.
pub fn bill_number(customer_id: Uuid, meter_id: Option<Uuid>, period_start: Date, period_end: Date) -> String {
    let mut h = blake3::Hasher::new();
    h.update(customer_id.as_bytes());
    match meter_id {
        Some(id) => {
            h.update(&[1]);
            h.update(id.as_bytes());
        }
        None => {
            h.update(&[0]);
        }
    }
    h.update(&period_start.to_julian_day().to_le_bytes());
    h.update(&period_end.to_julian_day().to_le_bytes());
    let digest = h.finalize().to_hex();

    format!(
        "BILL-{:04}{:02}-{}",
        period_end.year(),
        u8::from(period_end.month()),
        &digest.as_str()[..10]
    )
}

/// Payment number; `nonce` keeps two same-day payments on one bill apart.
pub fn payment_number(bill_id: Uuid, paid_on: Date, nonce: Uuid) -> String {
    let mut h = blake3::Hasher::new();
    h.update(bill_id.as_bytes());
    h.update(&paid_on.to_julian_day().to_le_bytes());
    h.update(nonce.as_bytes());
    let digest = h.finalize().to_hex();

    format!(
        "PAY-{:04}{:02}{:02}-{}",
        paid_on.year(),
        u8::from(paid_on.month()),
        paid_on.day(),
        &digest.as_str()[..10]
    )
}

/// Decide whether a payment may be taken against a bill.
///
/// Rules:
/// - the amount must be positive and in whole cents.
/// - only pending or overdue bills accept money.
/// - the amount may not exceed what is still owed.
///
/// Returns `true` when the payment settles the bill.
pub fn apply_payment(
    status: BillStatus,
    bill_amount: Decimal,
    already_paid: Decimal,
    amount: Decimal,
) -> Result<bool, BillingError> {
    if amount <= Decimal::ZERO {
        return Err(BillingError::NonPositivePayment);
    }
    check_fits("amount", amount, MONEY)?;
    if !status.is_open() {
        return Err(BillingError::BillClosed(status));
    }

    let balance = bill_amount - already_paid;
    if amount > balance {
        return Err(BillingError::Overpayment { amount, balance });
    }

    Ok(amount == balance)
}

/// Status as shown to users: pending bills past their due date read as overdue.
pub fn effective_status(status: BillStatus, due_date: Date, today: Date) -> BillStatus {
    match status {
        BillStatus::Pending if due_date < today => BillStatus::Overdue,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn dec(v: i64, scale: u32) -> Decimal {
        Decimal::new(v, scale)
    }

    #[test]
    fn consumption_is_difference_of_readings() {
        assert_eq!(consumption(dec(1200, 0), dec(1245, 0)).unwrap(), dec(45, 0));
        assert_eq!(consumption(dec(10, 0), dec(10, 0)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn consumption_rejects_reading_going_backwards() {
        let err = consumption(dec(500, 0), dec(499, 0)).unwrap_err();
        assert!(matches!(err, BillingError::ReadingBelowPrevious { .. }));
    }

    #[test]
    fn consumption_rejects_negative_readings() {
        assert_eq!(consumption(dec(-1, 0), dec(5, 0)), Err(BillingError::NegativeReading));
    }

    #[test]
    fn bill_amount_rounds_to_cents() {
        // 12.345 m3 at 1.5 = 18.5175
        assert_eq!(bill_amount(dec(12345, 3), dec(15, 1)).unwrap(), dec(1852, 2));
        // exact midpoint goes away from zero
        assert_eq!(bill_amount(dec(1, 0), dec(1005, 3)).unwrap(), dec(101, 2));
    }

    #[test]
    fn bill_amount_rejects_values_beyond_column_range() {
        let huge = Decimal::from(100_000_000_000_000_000_000i128);
        assert!(matches!(bill_amount(huge, huge), Err(BillingError::OutOfRange { .. })));
        assert!(matches!(
            bill_amount(dec(1, 0), dec(123456, 5)),
            Err(BillingError::TooPrecise { field: "rate", .. })
        ));
        // Both inputs fit, the product does not.
        let max_volume = dec(99_999_999_999, 0);
        assert_eq!(bill_amount(max_volume, dec(99_999_999, 4)), Err(BillingError::AmountOutOfRange));
    }

    #[test]
    fn consumption_rejects_readings_beyond_column_range() {
        assert!(matches!(
            consumption(Decimal::ZERO, dec(100_000_000_000, 0)),
            Err(BillingError::OutOfRange { field: "current_reading", .. })
        ));
        assert!(matches!(
            consumption(dec(1, 4), dec(2, 0)),
            Err(BillingError::TooPrecise { field: "previous_reading", .. })
        ));
    }

    #[test]
    fn previous_reading_may_not_reach_behind_latest() {
        assert_eq!(previous_reading(None, None), Ok(Decimal::ZERO));
        assert_eq!(previous_reading(Some(dec(500, 0)), None), Ok(dec(500, 0)));
        assert_eq!(previous_reading(Some(dec(500, 0)), Some(dec(520, 0))), Ok(dec(520, 0)));
        assert_eq!(
            previous_reading(Some(dec(500, 0)), Some(Decimal::ZERO)),
            Err(BillingError::BehindLatestReading {
                latest: dec(500, 0),
                previous: Decimal::ZERO
            })
        );
    }

    #[test]
    fn bill_amount_rejects_negative_rate() {
        assert_eq!(bill_amount(dec(10, 0), dec(-1, 0)), Err(BillingError::NegativeRate));
    }

    #[test]
    fn period_must_not_run_backwards() {
        assert!(validate_period(date!(2024 - 01 - 01), date!(2024 - 01 - 31)).is_ok());
        assert!(validate_period(date!(2024 - 01 - 01), date!(2024 - 01 - 01)).is_ok());
        assert!(validate_period(date!(2024 - 02 - 01), date!(2024 - 01 - 31)).is_err());
    }

    #[test]
    fn due_date_adds_days_across_month_end() {
        assert_eq!(due_date(date!(2024 - 01 - 31), 14), date!(2024 - 02 - 14));
    }

    #[test]
    fn bill_number_is_stable_per_period() {
        let customer = Uuid::from_u128(1);
        let meter = Some(Uuid::from_u128(2));
        let a = bill_number(customer, meter, date!(2024 - 03 - 01), date!(2024 - 03 - 31));
        let b = bill_number(customer, meter, date!(2024 - 03 - 01), date!(2024 - 03 - 31));
        let c = bill_number(customer, meter, date!(2024 - 04 - 01), date!(2024 - 04 - 30));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("BILL-202403-"));
        assert_eq!(a.len(), "BILL-202403-".len() + 10);
    }

    #[test]
    fn bill_number_distinguishes_meters() {
        let customer = Uuid::from_u128(1);
        let a = bill_number(customer, None, date!(2024 - 03 - 01), date!(2024 - 03 - 31));
        let b = bill_number(customer, Some(Uuid::from_u128(9)), date!(2024 - 03 - 01), date!(2024 - 03 - 31));
        assert_ne!(a, b);
    }

    #[test]
    fn payment_number_embeds_date() {
        let n = payment_number(Uuid::from_u128(7), date!(2024 - 05 - 09), Uuid::from_u128(1));
        assert!(n.starts_with("PAY-20240509-"));
        assert_ne!(n, payment_number(Uuid::from_u128(7), date!(2024 - 05 - 09), Uuid::from_u128(2)));
    }

    #[test]
    fn partial_then_final_payment_settles() {
        let amount = dec(10000, 2);
        assert_eq!(apply_payment(BillStatus::Pending, amount, Decimal::ZERO, dec(4000, 2)), Ok(false));
        assert_eq!(apply_payment(BillStatus::Overdue, amount, dec(4000, 2), dec(6000, 2)), Ok(true));
    }

    #[test]
    fn payment_rejected_on_paid_or_cancelled_bill() {
        let amount = dec(100, 0);
        assert_eq!(
            apply_payment(BillStatus::Paid, amount, amount, dec(1, 0)),
            Err(BillingError::BillClosed(BillStatus::Paid))
        );
        assert_eq!(
            apply_payment(BillStatus::Cancelled, amount, Decimal::ZERO, dec(1, 0)),
            Err(BillingError::BillClosed(BillStatus::Cancelled))
        );
    }

    #[test]
    fn payment_rejected_when_exceeding_balance_or_not_positive() {
        let amount = dec(100, 0);
        assert!(matches!(
            apply_payment(BillStatus::Pending, amount, dec(50, 0), dec(51, 0)),
            Err(BillingError::Overpayment { .. })
        ));
        assert_eq!(
            apply_payment(BillStatus::Pending, amount, Decimal::ZERO, Decimal::ZERO),
            Err(BillingError::NonPositivePayment)
        );
    }

    #[test]
    fn payment_must_be_whole_cents() {
        let amount = dec(1500, 2);
        assert!(matches!(
            apply_payment(BillStatus::Pending, amount, Decimal::ZERO, dec(14995, 3)),
            Err(BillingError::TooPrecise { field: "amount", .. })
        ));
        // Trailing zeros are not extra precision.
        assert_eq!(apply_payment(BillStatus::Pending, amount, Decimal::ZERO, dec(150000, 4)), Ok(true));
    }

    #[test]
    fn pending_past_due_reads_overdue() {
        let today = date!(2024 - 06 - 15);
        assert_eq!(effective_status(BillStatus::Pending, date!(2024 - 06 - 14), today), BillStatus::Overdue);
        assert_eq!(effective_status(BillStatus::Pending, today, today), BillStatus::Pending);
        assert_eq!(effective_status(BillStatus::Paid, date!(2024 - 01 - 01), today), BillStatus::Paid);
    }
}
