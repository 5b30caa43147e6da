//! Overflow-checked decimal arithmetic. Stored amounts are bounded on input,
//! but prices come from upstream and products of two bounded values can
//! still leave the `Decimal` range, so every derived figure goes through here.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::{Result, TrackerError};

/// Largest quantity or unit price accepted from a caller.
pub const MAX_AMOUNT: Decimal = dec!(100000000000000);

fn out_of_range(what: &str) -> TrackerError {
    TrackerError::validation(format!("{what} is out of range"))
}

pub(crate) fn mul(a: Decimal, b: Decimal, what: &str) -> Result<Decimal> {
    a.checked_mul(b).ok_or_else(|| out_of_range(what))
}

pub(crate) fn add(a: Decimal, b: Decimal, what: &str) -> Result<Decimal> {
    a.checked_add(b).ok_or_else(|| out_of_range(what))
}

pub(crate) fn sub(a: Decimal, b: Decimal, what: &str) -> Result<Decimal> {
    a.checked_sub(b).ok_or_else(|| out_of_range(what))
}

pub(crate) fn div(a: Decimal, b: Decimal, what: &str) -> Result<Decimal> {
    a.checked_div(b).ok_or_else(|| out_of_range(what))
}

pub(crate) fn sum(values: impl IntoIterator<Item = Decimal>, what: &str) -> Result<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |total, value| add(total, value, what))
}

/// `part` as a percentage of `whole`, 0 when `whole` is not positive.
pub(crate) fn percentage_of(part: Decimal, whole: Decimal, what: &str) -> Result<Decimal> {
    if whole > Decimal::ZERO {
        mul(div(part, whole, what)?, Decimal::ONE_HUNDRED, what)
    } else {
        Ok(Decimal::ZERO)
    }
}
