use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr, time::Duration};

/// A signed duration in Go's `time.Duration` string format, e.g. `1m30s`.
///
/// Both resource specs and remote entries carry durations in this form, and a
/// negative duration must survive parsing so validation can reject it.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct GoDuration {
    duration: Duration,
    is_negative: bool,
}

#[derive(Debug, thiserror::Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum ParseError {
    #[error("invalid unit: {}", EXPECTED_UNITS)]
    InvalidUnit,

    #[error("missing a unit: {}", EXPECTED_UNITS)]
    NoUnit,

    #[error("invalid floating-point number: {}", .0)]
    NotANumber(#[from] std::num::ParseFloatError),

    #[error("duration out of range")]
    OutOfRange,
}

const EXPECTED_UNITS: &str = "expected one of 'ns', 'us', '\u{00b5}s', 'ms', 's', 'm', or 'h'";

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Durations hold signed 64-bit nanoseconds, as in Go.
const MAX_NANOS: u128 = i64::MAX as u128;

impl From<Duration> for GoDuration {
    fn from(duration: Duration) -> Self {
        Self {
            duration,
            is_negative: false,
        }
    }
}

impl From<GoDuration> for Duration {
    fn from(GoDuration { duration, .. }: GoDuration) -> Self {
        duration
    }
}

impl GoDuration {
    pub const ZERO: Self = Self {
        duration: Duration::ZERO,
        is_negative: false,
    };

    pub fn from_secs(secs: u64) -> Self {
        Duration::from_secs(secs).into()
    }

    #[inline]
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.is_negative && !self.duration.is_zero()
    }

    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.duration.is_zero()
    }

    /// The duration in nanoseconds, negative when the duration is.
    #[must_use]
    pub fn as_nanos_signed(&self) -> i128 {
        // Parsing bounds the magnitude to Go's range.
        let nanos = i128::try_from(self.duration.as_nanos()).unwrap_or(i128::MAX);
        if self.is_negative {
            -nanos
        } else {
            nanos
        }
    }
}

impl PartialOrd for GoDuration {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GoDuration {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_nanos_signed().cmp(&other.as_nanos_signed())
    }
}

impl fmt::Debug for GoDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for GoDuration {
    /// Formats like Go's `Duration.String`: sub-second durations use the
    /// largest unit below a second, longer ones are split into hours, minutes
    /// and fractional seconds with leading zero units dropped.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_fraction(f: &mut fmt::Formatter<'_>, v: u128, per_unit: u128) -> fmt::Result {
            write!(f, "{}", v / per_unit)?;
            let rem = v % per_unit;
            if rem != 0 {
                let width = per_unit.ilog10() as usize;
                let digits = format!("{rem:0width$}");
                write!(f, ".{}", digits.trim_end_matches('0'))?;
            }
            Ok(())
        }

        let nanos = self.duration.as_nanos();
        if nanos == 0 {
            return f.write_str("0s");
        }
        if self.is_negative {
            f.write_str("-")?;
        }

        if nanos < NANOS_PER_SEC {
            let (per_unit, unit) = match nanos {
                n if n < 1_000 => (1, "ns"),
                n if n < 1_000_000 => (1_000, "\u{00b5}s"),
                _ => (1_000_000, "ms"),
            };
            write_fraction(f, nanos, per_unit)?;
            return f.write_str(unit);
        }

        let secs = nanos / NANOS_PER_SEC;
        let (hours, mins) = (secs / 3600, (secs / 60) % 60);
        if hours > 0 {
            write!(f, "{hours}h")?;
        }
        if hours > 0 || mins > 0 {
            write!(f, "{mins}m")?;
        }
        write_fraction(f, nanos % (60 * NANOS_PER_SEC), NANOS_PER_SEC)?;
        f.write_str("s")
    }
}

impl FromStr for GoDuration {
    type Err = ParseError;

    fn from_str(mut s: &str) -> Result<Self, Self::Err> {
        fn duration_from_units(val: f64, unit: &str) -> Result<Duration, ParseError> {
            const MINUTE: Duration = Duration::from_secs(60);
            let base = match unit {
                "ns" => Duration::from_nanos(1),
                // U+00B5 is the "micro sign" while U+03BC is "Greek letter mu"
                "us" | "\u{00b5}s" | "\u{03bc}s" => Duration::from_micros(1),
                "ms" => Duration::from_millis(1),
                "s" => Duration::from_secs(1),
                "m" => MINUTE,
                "h" => MINUTE * 60,
                _ => return Err(ParseError::InvalidUnit),
            };
            Duration::try_from_secs_f64(base.as_secs_f64() * val)
                .map_err(|_| ParseError::OutOfRange)
        }

        let is_negative = s.starts_with('-');
        s = s.trim_start_matches('+').trim_start_matches('-');

        let mut total = Duration::ZERO;
        while !s.is_empty() {
            if let Some(unit_start) = s.find(|c: char| c.is_alphabetic()) {
                let (val, rest) = s.split_at(unit_start);
                let val = val.parse::<f64>()?;
                let unit = match rest.find(|c: char| !c.is_alphabetic()) {
                    Some(next) => {
                        let (unit, rest) = rest.split_at(next);
                        s = rest;
                        unit
                    }
                    None => {
                        s = "";
                        rest
                    }
                };
                total = total
                    .checked_add(duration_from_units(val, unit)?)
                    .ok_or(ParseError::OutOfRange)?;
            } else if s == "0" {
                break;
            } else {
                return Err(ParseError::NoUnit);
            }
        }

        // The most negative duration has one more nanosecond than the most
        // positive.
        if total.as_nanos() > MAX_NANOS + u128::from(is_negative) {
            return Err(ParseError::OutOfRange);
        }

        Ok(GoDuration {
            duration: total,
            is_negative: is_negative && !total.is_zero(),
        })
    }
}

impl Serialize for GoDuration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GoDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Visitor;
        impl de::Visitor<'_> for Visitor {
            type Value = GoDuration;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string in Go `time.Duration.String()` format")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                value.parse::<GoDuration>().map_err(de::Error::custom)
            }
        }
        deserializer.deserialize_str(Visitor)
    }
}

impl schemars::JsonSchema for GoDuration {
    fn schema_name() -> String {
        "GoDuration".to_owned()
    }

    fn is_referenceable() -> bool {
        false
    }

    fn json_schema(_: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        schemars::schema::SchemaObject {
            instance_type: Some(schemars::schema::InstanceType::String.into()),
            // Not "duration": that format means ISO 8601.
            format: None,
            ..Default::default()
        }
        .into()
    }
}
