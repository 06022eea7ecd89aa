use rand_core::Rng;
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Random packet loss applied by a [`Link`] when a packet enters it.
///
/// The probability is validated at construction, so a [`PacketLoss`] is
/// always in `[0.0, 1.0]`.
///
/// ```
/// # use flowsim_core::measure::PacketLoss;
/// let lossy = PacketLoss::new(0.01).unwrap();
/// assert_eq!(lossy.to_string(), "1%");
/// assert_eq!("1%".parse::<PacketLoss>().unwrap(), lossy);
///
/// assert!(PacketLoss::new(1.5).is_err());
/// ```
///
/// [`Link`]: crate::link::Link
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct PacketLoss(f64);

/// Error returned when building or parsing a [`PacketLoss`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PacketLossError {
    #[error("packet loss probability must be in [0.0, 1.0], got {0}")]
    OutOfRange(f64),
    #[error("expected a percentage such as `2.5%', got `{0}'")]
    InvalidPercentage(String),
}

impl PacketLoss {
    /// No packet is ever dropped.
    pub const NONE: Self = Self(0.0);

    /// Build a packet loss from a probability in `[0.0, 1.0]`.
    pub fn new(probability: f64) -> Result<Self, PacketLossError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(PacketLossError::OutOfRange(probability));
        }
        Ok(Self(probability))
    }

    #[inline]
    pub fn probability(&self) -> f64 {
        self.0
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.0 == 0.0
    }

    /// Draw from `rng` and decide whether the packet is dropped.
    ///
    /// No randomness is consumed when the probability is `0`, so adding a
    /// lossless link does not shift the drop sequence of the other links.
    pub fn should_drop<R: Rng>(&self, rng: &mut R) -> bool {
        if self.is_none() {
            return false;
        }
        let sample = (rng.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64);
        sample < self.0
    }
}

impl fmt::Display for PacketLoss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pct = self.0 * 100.0;
        if pct.fract() == 0.0 {
            write!(f, "{}%", pct as u64)
        } else {
            write!(f, "{pct:.2}%")
        }
    }
}

impl FromStr for PacketLoss {
    type Err = PacketLossError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let pct: f64 = s
            .trim()
            .strip_suffix('%')
            .and_then(|num| num.trim().parse().ok())
            .ok_or_else(|| PacketLossError::InvalidPercentage(s.to_owned()))?;

        Self::new(pct / 100.0)
    }
}
