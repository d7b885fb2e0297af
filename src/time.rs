//! Temporal types for refinement.
//!
//! - [`TimeHorizon`]: the cut-off a refinement applies to fact timestamps,
//!   either unbounded, relative to "now", or an absolute instant.
//! - [`TimeRange`]: a closed `[from, to]` span, used to report the extent of
//!   the refined facts to a time-range selector.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Display form of the unbounded horizon.
pub const ANY_TIME: &str = "Any time";

static RELATIVE_RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

fn relative_regex() -> Result<&'static Regex, ValidationError> {
    RELATIVE_RE
        .get_or_init(|| {
            Regex::new(
                r"(?i)^(?:last\s+(\d+)\s+(minute|hour|day|week|month|year)s?|(\d+)\s+(minute|hour|day|week|month|year)s?\s+ago)$",
            )
        })
        .as_ref()
        .map_err(|e| ValidationError::InvalidTimeHorizon {
            input: String::new(),
            reason: format!("relative expression pattern failed to compile: {e}"),
        })
}

/// Unit of a relative horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl TimeUnit {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "minute" => Some(Self::Minute),
            "hour" => Some(Self::Hour),
            "day" => Some(Self::Day),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            "year" => Some(Self::Year),
            _ => None,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

/// Cut-off applied to fact timestamps: facts at or after it are dropped.
///
/// # Examples
///
/// ```
/// use factscope::TimeHorizon;
///
/// let horizon: TimeHorizon = "last 7 days".parse().unwrap();
/// assert!(!horizon.is_unbounded());
/// assert_eq!(horizon.to_string(), "last 7 days");
///
/// assert!("Any time".parse::<TimeHorizon>().unwrap().is_unbounded());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TimeHorizon {
    /// No time filtering.
    #[default]
    Unbounded,

    /// `amount` units before the moment of refinement.
    Relative {
        amount: u32,
        unit: TimeUnit,
    },

    /// A fixed instant.
    Absolute(DateTime<Utc>),
}

impl TimeHorizon {
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        matches!(self, Self::Unbounded)
    }

    /// Resolves the horizon to an instant, relative to `now`.
    ///
    /// Returns `None` only for the unbounded horizon. A relative horizon
    /// reaching before the representable range clamps to the earliest
    /// instant, so it keeps no facts.
    #[must_use]
    pub fn resolve(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match *self {
            Self::Unbounded => None,
            Self::Absolute(at) => Some(at),
            Self::Relative { amount, unit } => {
                let n = i64::from(amount);
                let end = match unit {
                    TimeUnit::Minute => now.checked_sub_signed(Duration::minutes(n)),
                    TimeUnit::Hour => now.checked_sub_signed(Duration::hours(n)),
                    TimeUnit::Day => now.checked_sub_signed(Duration::days(n)),
                    TimeUnit::Week => now.checked_sub_signed(Duration::weeks(n)),
                    TimeUnit::Month => now.checked_sub_months(Months::new(amount)),
                    TimeUnit::Year => amount
                        .checked_mul(12)
                        .and_then(|m| now.checked_sub_months(Months::new(m))),
                };
                Some(end.unwrap_or(DateTime::<Utc>::MIN_UTC))
            }
        }
    }
}

impl FromStr for TimeHorizon {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() || input.eq_ignore_ascii_case(ANY_TIME) {
            return Ok(Self::Unbounded);
        }

        if let Ok(at) = DateTime::parse_from_rfc3339(input) {
            return Ok(Self::Absolute(at.with_timezone(&Utc)));
        }

        let invalid = |reason: &str| ValidationError::InvalidTimeHorizon {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let caps = relative_regex()?
            .captures(input)
            .ok_or_else(|| invalid("expected 'Any time', 'last N <unit>s', 'N <unit>s ago' or an RFC 3339 instant"))?;

        let (amount, unit) = match (caps.get(1), caps.get(2), caps.get(3), caps.get(4)) {
            (Some(a), Some(u), _, _) | (_, _, Some(a), Some(u)) => (a.as_str(), u.as_str()),
            _ => return Err(invalid("incomplete relative expression")),
        };
        let amount: u32 = amount.parse().map_err(|_| invalid("amount out of range"))?;
        let unit = TimeUnit::parse(unit).ok_or_else(|| invalid("unknown unit"))?;

        Ok(Self::Relative { amount, unit })
    }
}

impl TryFrom<String> for TimeHorizon {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeHorizon> for String {
    fn from(horizon: TimeHorizon) -> Self {
        horizon.to_string()
    }
}

impl fmt::Display for TimeHorizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => f.write_str(ANY_TIME),
            Self::Relative { amount, unit } => {
                let plural = if *amount == 1 { "" } else { "s" };
                write!(f, "last {amount} {}{plural}", unit.as_str())
            }
            Self::Absolute(at) => write!(f, "{}", at.to_rfc3339()),
        }
    }
}

/// A closed range of time: `[from, to]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start of the range (inclusive).
    pub from: DateTime<Utc>,

    /// End of the range (inclusive).
    pub to: DateTime<Utc>,
}

impl TimeRange {
    /// Creates a time range from two timestamps.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidTimeHorizon` if `from > to`.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, ValidationError> {
        if from > to {
            return Err(ValidationError::InvalidTimeHorizon {
                input: format!("{from} → {to}"),
                reason: "range start is after its end".to_string(),
            });
        }
        Ok(Self { from, to })
    }

    /// The calendar month containing `now`: first instant of the month to
    /// first instant of the next.
    #[must_use]
    pub fn month_of(now: DateTime<Utc>) -> Self {
        let start = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|d| d.and_utc());
        let end = start.and_then(|s| s.checked_add_months(Months::new(1)));
        match (start, end) {
            (Some(from), Some(to)) => Self { from, to },
            _ => Self { from: now, to: now },
        }
    }

    /// Check if a timestamp falls within this range `[from, to]`.
    #[must_use]
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        time >= self.from && time <= self.to
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.to - self.from
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} → {}]", self.from, self.to)
    }
}
