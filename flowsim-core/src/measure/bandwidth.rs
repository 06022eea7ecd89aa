use logos::{Lexer, Logos};
use std::{fmt, str::FromStr, time::Duration};
use thiserror::Error;

const NANOS_PER_SEC: u128 = 1_000_000_000;

const K: u64 = 1_000;
const M: u64 = 1_000_000;
const G: u64 = 1_000_000_000;

/// A data rate, in bits per second.
///
/// Used both for the speed of a [`Link`] and for the sending rate of a
/// [`TrafficSource`]. Multiples are decimal (SI): `1kbps` is `1_000`
/// bits per second.
///
/// # Example
///
/// ```
/// # use flowsim_core::measure::Bandwidth;
/// # use std::time::Duration;
/// let rate: Bandwidth = "1Mbps".parse().unwrap();
/// assert_eq!(rate.bits_per_sec(), 1_000_000);
///
/// // a 1040 bytes packet occupies a 1Mbps channel for 8.32ms
/// assert_eq!(rate.transmission_time(1040), Some(Duration::from_micros(8_320)));
/// ```
///
/// [`Link`]: crate::link::Link
/// [`TrafficSource`]: crate::app::TrafficSource
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bandwidth(u64);

impl Bandwidth {
    /// the `0` data rate, nothing can be transmitted
    pub const ZERO: Self = Self(0);

    /// the maximum data rate, effectively unlimited
    pub const MAX: Self = Self(u64::MAX);

    #[inline]
    pub const fn new(bits_per_sec: u64) -> Self {
        Self(bits_per_sec)
    }

    #[inline]
    pub const fn bits_per_sec(&self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Time needed to push `bytes` through this data rate:
    /// `bytes * 8 / rate`, rounded to the nearest nanosecond.
    ///
    /// Returns `None` for a zero data rate.
    pub fn transmission_time(&self, bytes: u64) -> Option<Duration> {
        if self.0 == 0 {
            return None;
        }
        let bits = (bytes as u128).saturating_mul(8);
        let rate = self.0 as u128;
        let nanos = (bits.saturating_mul(NANOS_PER_SEC) + rate / 2) / rate;
        Some(Duration::from_nanos(
            nanos.min(u64::MAX as u128) as u64,
        ))
    }

    /// Number of whole bytes this data rate can carry during `elapsed`.
    pub fn capacity(&self, elapsed: Duration) -> u64 {
        let bits = (self.0 as u128).saturating_mul(elapsed.as_nanos()) / NANOS_PER_SEC;
        (bits / 8).min(u64::MAX as u128) as u64
    }
}

impl fmt::Debug for Bandwidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Bandwidth").field(&self.0).finish()
    }
}

impl fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;

        let (unit, name) = if v >= G {
            (G, "gbps")
        } else if v >= M {
            (M, "mbps")
        } else if v >= K {
            (K, "kbps")
        } else {
            (1, "bps")
        };

        if v % unit == 0 {
            write!(f, "{}{name}", v / unit)
        } else {
            write!(f, "{:.2}{name}", v as f64 / unit as f64)
        }
    }
}

impl Default for Bandwidth {
    fn default() -> Self {
        crate::defaults::DEFAULT_BANDWIDTH
    }
}

/// Error returned when a [`Bandwidth`] cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BandwidthParseError {
    #[error("Expecting to parse a number")]
    ExpectedNumber,
    #[error("Expecting to parse a unit (bps, kbps, mbps, gbps)")]
    ExpectedUnit,
    #[error("Not expecting any other tokens to parse a bandwidth")]
    TrailingTokens,
    #[error("Bandwidth overflows {} bits per second", u64::MAX)]
    Overflow,
}

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\n\f]+")] // Ignore this regex pattern between tokens
enum BandwidthToken {
    #[token("bps", ignore(ascii_case))]
    Bps,
    #[token("kbps", ignore(ascii_case))]
    Kbps,
    #[token("mbps", ignore(ascii_case))]
    Mbps,
    #[token("gbps", ignore(ascii_case))]
    Gbps,

    #[regex(r"[0-9]+(\.[0-9]+)?")]
    Value,
}

impl FromStr for Bandwidth {
    type Err = BandwidthParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lex = Lexer::<'_, BandwidthToken>::new(s);

        let Some(Ok(BandwidthToken::Value)) = lex.next() else {
            return Err(BandwidthParseError::ExpectedNumber);
        };
        let number: f64 = lex
            .slice()
            .parse()
            .map_err(|_| BandwidthParseError::ExpectedNumber)?;
        let Some(Ok(token)) = lex.next() else {
            return Err(BandwidthParseError::ExpectedUnit);
        };
        let multiplier = match token {
            BandwidthToken::Bps => 1,
            BandwidthToken::Kbps => K,
            BandwidthToken::Mbps => M,
            BandwidthToken::Gbps => G,
            BandwidthToken::Value => return Err(BandwidthParseError::ExpectedUnit),
        };

        if lex.next().is_some() {
            return Err(BandwidthParseError::TrailingTokens);
        }

        let bps = (number * multiplier as f64).round();
        if bps >= u64::MAX as f64 {
            return Err(BandwidthParseError::Overflow);
        }

        Ok(Self::new(bps as u64))
    }
}
