//! Go-style duration strings such as `1h30m`, `90s` or `1.5h`
//!
//! The service stores durations in their canonical form (`1h30m0s`), so
//! declared values are normalised before they are compared.

use thiserror::Error;

const NANOSECOND: u128 = 1;
const MICROSECOND: u128 = 1_000 * NANOSECOND;
const MILLISECOND: u128 = 1_000 * MICROSECOND;
const SECOND: u128 = 1_000 * MILLISECOND;
const MINUTE: u128 = 60 * SECOND;
const HOUR: u128 = 60 * MINUTE;

const UNITS: [(&str, u128); 8] = [
    ("ns", NANOSECOND),
    ("us", MICROSECOND),
    ("µs", MICROSECOND),
    ("μs", MICROSECOND),
    ("ms", MILLISECOND),
    ("s", SECOND),
    ("m", MINUTE),
    ("h", HOUR),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed duration {0:?}")]
pub struct MalformedDuration(String);

/// Signed nanoseconds
pub fn parse(input: &str) -> Result<i64, MalformedDuration> {
    let malformed = || MalformedDuration(input.to_string());

    let (negative, mut rest) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        _ => (false, input),
    };
    if rest == "0" {
        return Ok(0);
    }
    if rest.is_empty() {
        return Err(malformed());
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_end);
        let unit_end = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_end);

        let scale = UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, scale)| *scale)
            .ok_or_else(malformed)?;
        total = scaled(number, scale)
            .and_then(|value| total.checked_add(value))
            .filter(|total| i64::try_from(*total).is_ok())
            .ok_or_else(malformed)?;
        rest = tail;
    }

    let total = i64::try_from(total).map_err(|_| malformed())?;
    Ok(if negative { -total } else { total })
}

/// `whole[.fraction]` times `scale`, truncated to nanoseconds
fn scaled(number: &str, scale: u128) -> Option<u128> {
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if fraction.contains('.') {
        return None;
    }

    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut value = whole.checked_mul(scale)?;
    let mut place = scale;
    for digit in fraction.chars() {
        place /= 10;
        if place == 0 {
            break;
        }
        value = value.checked_add(u128::from(digit.to_digit(10)?).checked_mul(place)?)?;
    }
    Some(value)
}

/// Canonical rendering, matching what the service returns
pub fn format(nanos: i64) -> String {
    let sign = if nanos < 0 { "-" } else { "" };
    let n = u128::from(nanos.unsigned_abs());

    if n == 0 {
        return "0s".to_string();
    }
    if n < MICROSECOND {
        return format!("{sign}{n}ns");
    }
    if n < MILLISECOND {
        return format!("{sign}{}µs", decimal(n, MICROSECOND));
    }
    if n < SECOND {
        return format!("{sign}{}ms", decimal(n, MILLISECOND));
    }

    let hours = n / HOUR;
    let minutes = (n % HOUR) / MINUTE;
    let seconds = decimal(n % MINUTE, SECOND);
    if hours > 0 {
        format!("{sign}{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{sign}{minutes}m{seconds}s")
    } else {
        format!("{sign}{seconds}s")
    }
}

fn decimal(value: u128, unit: u128) -> String {
    let whole = value / unit;
    let fraction = value % unit;
    if fraction == 0 {
        return whole.to_string();
    }
    let width = unit.ilog10() as usize;
    let digits = format!("{fraction:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

/// Parse and re-render in canonical form
pub fn normalize(input: &str) -> Result<String, MalformedDuration> {
    parse(input).map(format)
}
