//! Simulated time.
//!
//! [`SimTime`] is a point on the virtual clock driven by the
//! [`Scheduler`](crate::scheduler::Scheduler). It only moves forward when
//! events are processed and has no relation to wall-clock time.
//!
//! [`Duration`] is a thin wrapper around [`std::time::Duration`] that can be
//! parsed from human readable strings such as `"500ms"` or `"1.1s"`.

use core::fmt;
use logos::{Lexer, Logos};
use std::{
    ops::{Add, AddAssign, Sub},
    str::FromStr,
    time,
};
use thiserror::Error;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// An instant on the simulated clock, with nanosecond resolution.
///
/// ```
/// # use flowsim_core::time::SimTime;
/// # use std::time::Duration;
/// let start = SimTime::from_millis(1_100);
/// let next = start + Duration::from_millis(500);
///
/// assert_eq!(next.as_secs_f64(), 1.6);
/// assert_eq!(next.duration_since(start), Duration::from_millis(500));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimTime(u64);

impl SimTime {
    /// the origin of the simulated clock
    pub const ZERO: Self = Self(0);

    /// the latest representable instant
    pub const MAX: Self = Self(u64::MAX);

    #[inline]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    #[inline]
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros.saturating_mul(1_000))
    }

    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(1_000_000))
    }

    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(NANOS_PER_SEC))
    }

    /// Build an instant from fractional seconds, rounded to the nearest
    /// nanosecond. Negative and NaN values map to [`SimTime::ZERO`].
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs.is_nan() || secs <= 0.0 {
            return Self::ZERO;
        }
        let nanos = (secs * NANOS_PER_SEC as f64).round();
        if nanos >= u64::MAX as f64 {
            Self::MAX
        } else {
            Self(nanos as u64)
        }
    }

    #[inline]
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / NANOS_PER_SEC as f64
    }

    /// Time elapsed since the origin of the clock.
    #[inline]
    pub fn elapsed(self) -> time::Duration {
        time::Duration::from_nanos(self.0)
    }

    /// Time elapsed between `earlier` and `self`, saturating to zero if
    /// `earlier` is in the future.
    #[inline]
    pub fn duration_since(self, earlier: SimTime) -> time::Duration {
        time::Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }

    #[inline]
    pub fn saturating_add(self, duration: time::Duration) -> Self {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(nanos))
    }
}

impl Add<time::Duration> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: time::Duration) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl AddAssign<time::Duration> for SimTime {
    fn add_assign(&mut self, rhs: time::Duration) {
        *self = self.saturating_add(rhs);
    }
}

impl Sub for SimTime {
    type Output = time::Duration;

    fn sub(self, rhs: SimTime) -> Self::Output {
        self.duration_since(rhs)
    }
}

impl From<time::Duration> for SimTime {
    fn from(value: time::Duration) -> Self {
        SimTime::ZERO.saturating_add(value)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.as_secs_f64())
    }
}

/// A [`std::time::Duration`] that can be parsed from text.
///
/// ```
/// # use flowsim_core::time::Duration;
/// let d: Duration = "1s 500ms".parse().unwrap();
/// assert_eq!(d.into_duration().as_millis(), 1_500);
///
/// let d: Duration = "1.1s".parse().unwrap();
/// assert_eq!(d.into_duration().as_millis(), 1_100);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(time::Duration);

impl Duration {
    pub const fn new(dur: time::Duration) -> Self {
        Self(dur)
    }

    #[inline]
    pub fn into_duration(self) -> time::Duration {
        self.0
    }
}

impl From<Duration> for time::Duration {
    fn from(value: Duration) -> Self {
        value.0
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <time::Duration as fmt::Debug>::fmt(&self.0, f)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rem = self.0.as_nanos();
        if rem == 0 {
            return write!(f, "0s");
        }

        const UNITS: [(u128, &str); 5] = [
            (60_000_000_000, "m"),
            (1_000_000_000, "s"),
            (1_000_000, "ms"),
            (1_000, "µs"),
            (1, "ns"),
        ];
        for (nanos, unit) in UNITS {
            let value = rem / nanos;
            if value > 0 {
                write!(f, "{value}{unit}")?;
                rem %= nanos;
            }
        }
        Ok(())
    }
}

/// Error returned when a [`Duration`] cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationParseError {
    #[error("Failed to parse `{0}': unexpected token")]
    InvalidToken(String),
    #[error("Expecting duration to start with a number. Cannot parse `{0}'")]
    ExpectedNumber(String),
    #[error("Expecting a unit (ns, us, ms, s, m), failed to parse `{0}'")]
    ExpectedUnit(String),
    #[error("Empty duration")]
    Empty,
}

impl FromStr for Duration {
    type Err = DurationParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lex = Lexer::<'_, Token>::new(s);

        let mut total = time::Duration::ZERO;
        let mut parsed_any = false;

        while let Some(next) = lex.next() {
            let number = next.map_err(|()| DurationParseError::InvalidToken(s.to_owned()))?;
            if number != Token::Value {
                return Err(DurationParseError::ExpectedNumber(s.to_owned()));
            }
            let number: f64 = lex
                .slice()
                .parse()
                .map_err(|_| DurationParseError::ExpectedNumber(s.to_owned()))?;

            let Some(Ok(measure)) = lex.next() else {
                return Err(DurationParseError::ExpectedUnit(s.to_owned()));
            };
            let nanos_per_unit = match measure {
                Token::NanoSeconds => 1.0,
                Token::MicroSeconds => 1e3,
                Token::MilliSeconds => 1e6,
                Token::Seconds => 1e9,
                Token::Minutes => 60e9,
                Token::Value => return Err(DurationParseError::ExpectedUnit(s.to_owned())),
            };
            total += time::Duration::from_nanos((number * nanos_per_unit).round() as u64);
            parsed_any = true;
        }

        if !parsed_any {
            return Err(DurationParseError::Empty);
        }

        Ok(Self(total))
    }
}

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\n\f]+")] // Ignore this regex pattern between tokens
enum Token {
    #[token("ns")]
    NanoSeconds,
    #[regex("us|µs|μs")]
    MicroSeconds,
    #[token("ms")]
    MilliSeconds,
    #[token("s")]
    Seconds,
    #[token("m")]
    Minutes,

    #[regex(r"[0-9]+(\.[0-9]+)?")]
    Value,
}
