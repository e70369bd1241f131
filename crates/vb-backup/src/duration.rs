//! Go-style duration strings
//!
//! Velero stores `spec.ttl` as a `metav1.Duration`, which travels as Go's
//! `time.Duration` text form (`720h0m0s`, `1h30m0s`, `1.5s`). The parser
//! accepts the same grammar the Go flag package does: one or more
//! `<number><unit>` pairs with optional fractions, units `ns`, `us`/`µs`,
//! `ms`, `s`, `m`, `h`, and a bare `0`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;
const NANOS_PER_MIN: u128 = 60 * NANOS_PER_SEC;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MIN;

/// Fraction digits beyond this cannot change a nanosecond result
const MAX_FRACTION_DIGITS: usize = 18;

/// Largest duration `metav1.Duration` can hold (an `int64` of nanoseconds)
const MAX_DURATION_NANOS: u128 = i64::MAX as u128;

/// A duration that serializes as a Go duration string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct KubeDuration(pub Duration);

impl KubeDuration {
    /// Whole hours
    pub const fn from_hours(hours: u64) -> Self {
        Self(Duration::from_secs(hours * 3600))
    }
}

impl FromStr for KubeDuration {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_duration(s).map(Self)
    }
}

impl fmt::Display for KubeDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_duration(self.0))
    }
}

impl Serialize for KubeDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(self.0))
    }
}

impl<'de> Deserialize<'de> for KubeDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_duration(&raw)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// Parse a Go duration string.
///
/// Totals beyond `i64::MAX` nanoseconds (about 2562047h) are rejected, since
/// the API server cannot decode them.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let s = input.trim();
    if s.is_empty() {
        return Err(Error::invalid_duration(input, "empty duration"));
    }
    if s.starts_with('-') {
        return Err(Error::invalid_duration(input, "duration must not be negative"));
    }
    let s = s.strip_prefix('+').unwrap_or(s);
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let overflow = || Error::invalid_duration(input, "duration out of range");
    let mut total: u128 = 0;
    let mut rest = s;

    while !rest.is_empty() {
        let int_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let int_part = &rest[..int_end];
        rest = &rest[int_end..];

        let mut frac_part = "";
        if let Some(after_dot) = rest.strip_prefix('.') {
            let frac_end = after_dot
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(after_dot.len());
            frac_part = &after_dot[..frac_end];
            rest = &after_dot[frac_end..];
        }
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(Error::invalid_duration(input, "expected a number"));
        }

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        rest = &rest[unit_end..];

        let scale = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => NANOS_PER_MICRO,
            "ms" => NANOS_PER_MILLI,
            "s" => NANOS_PER_SEC,
            "m" => NANOS_PER_MIN,
            "h" => NANOS_PER_HOUR,
            "" => return Err(Error::invalid_duration(input, "missing unit")),
            other => {
                return Err(Error::invalid_duration(
                    input,
                    format!("unknown unit {:?}", other),
                ))
            }
        };

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| overflow())?
        };
        total = whole
            .checked_mul(scale)
            .and_then(|n| total.checked_add(n))
            .ok_or_else(overflow)?;

        if !frac_part.is_empty() {
            let mut numerator: u128 = 0;
            let mut divisor: u128 = 1;
            for digit in frac_part.bytes().take(MAX_FRACTION_DIGITS) {
                numerator = numerator * 10 + u128::from(digit - b'0');
                divisor *= 10;
            }
            total = total
                .checked_add(numerator * scale / divisor)
                .ok_or_else(overflow)?;
        }
    }

    if total > MAX_DURATION_NANOS {
        return Err(overflow());
    }

    let secs = u64::try_from(total / NANOS_PER_SEC).map_err(|_| overflow())?;
    let nanos = u32::try_from(total % NANOS_PER_SEC).map_err(|_| overflow())?;
    Ok(Duration::new(secs, nanos))
}

/// Render a duration the way Go's `time.Duration.String()` does.
pub fn format_duration(d: Duration) -> String {
    let total = d.as_nanos();
    if total == 0 {
        return "0s".to_string();
    }

    if total < NANOS_PER_SEC {
        let (scale, unit) = if total < NANOS_PER_MICRO {
            (1, "ns")
        } else if total < NANOS_PER_MILLI {
            (NANOS_PER_MICRO, "µs")
        } else {
            (NANOS_PER_MILLI, "ms")
        };
        return format!("{}{}", format_scaled(total, scale), unit);
    }

    let secs = d.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = u128::from(secs % 60) * NANOS_PER_SEC + u128::from(d.subsec_nanos());

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    out.push_str(&format_scaled(seconds, NANOS_PER_SEC));
    out.push('s');
    out
}

/// `value / scale` as a decimal with trailing zeros trimmed
fn format_scaled(value: u128, scale: u128) -> String {
    let whole = value / scale;
    let frac = value % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let width = scale.to_string().len() - 1;
    let digits = format!("{:0width$}", frac, width = width);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}
