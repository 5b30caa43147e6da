use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Changes within `±DEFAULT_TREND_THRESHOLD` percent count as flat.
pub const DEFAULT_TREND_THRESHOLD: Decimal = dec!(0.5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Neutral,
}

#[must_use]
pub fn classify_trend(change: Decimal, threshold: Decimal) -> Trend {
    if change > threshold {
        Trend::Up
    } else if change < -threshold {
        Trend::Down
    } else {
        Trend::Neutral
    }
}

fn round_display(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// `2.5` -> `+2.50%`
#[must_use]
pub fn format_percentage(change: Decimal) -> String {
    let rounded = round_display(change, 2);
    if rounded.is_zero() {
        "0.00%".to_string()
    } else if rounded.is_sign_positive() {
        format!("+{rounded:.2}%")
    } else {
        format!("{rounded:.2}%")
    }
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

/// Dollar amount with thousands separators. Sub-dollar prices keep up to six
/// decimals so small-cap coins don't collapse to `$0.00`.
#[must_use]
pub fn format_price(price: Decimal) -> String {
    let sign = if price.is_sign_negative() && !price.is_zero() {
        "-"
    } else {
        ""
    };
    let abs = price.abs();

    let body = if abs >= Decimal::ONE || abs.is_zero() {
        let text = format!("{:.2}", round_display(abs, 2));
        match text.split_once('.') {
            Some((int, frac)) => format!("{}.{frac}", group_thousands(int)),
            None => group_thousands(&text),
        }
    } else {
        let rounded = round_display(abs, 6).normalize();
        if rounded.scale() < 2 {
            format!("{rounded:.2}")
        } else {
            rounded.to_string()
        }
    };
    format!("{sign}${body}")
}

/// `1234000000` -> `1.23B`
#[must_use]
pub fn format_compact(value: Decimal) -> String {
    const UNITS: [(Decimal, &str); 4] = [
        (dec!(1000000000000), "T"),
        (dec!(1000000000), "B"),
        (dec!(1000000), "M"),
        (dec!(1000), "K"),
    ];

    let abs = value.abs();
    for (unit, suffix) in UNITS {
        if abs >= unit {
            return format!("{:.2}{suffix}", round_display(value / unit, 2));
        }
    }
    format!("{:.2}", round_display(value, 2))
}
