use std::{fmt, str::FromStr, time::Duration};

/// One-way propagation delay of a [`Link`].
///
/// The latency is added to every packet once it has been fully
/// serialised on the link, regardless of its size.
///
/// # Default [`Latency`]
///
/// ```
/// # use flowsim_core::measure::Latency;
/// assert_eq!(
///     Latency::default().to_string(),
///     "2ms"
/// )
/// ```
///
/// [`Link`]: crate::link::Link
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Latency(Duration);

impl Latency {
    /// The `0` latency. I.e. no latency.
    pub const ZERO: Self = Self::new(Duration::ZERO);

    #[inline(always)]
    pub const fn new(duration: Duration) -> Self {
        Self(duration)
    }

    #[inline(always)]
    pub const fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    #[inline(always)]
    pub fn into_duration(self) -> Duration {
        self.0
    }
}

impl From<Latency> for Duration {
    fn from(value: Latency) -> Self {
        value.into_duration()
    }
}

impl From<Duration> for Latency {
    fn from(value: Duration) -> Self {
        Self::new(value)
    }
}

impl Default for Latency {
    fn default() -> Self {
        crate::defaults::DEFAULT_LATENCY
    }
}

impl fmt::Display for Latency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&crate::time::Duration::new(self.0), f)
    }
}

impl FromStr for Latency {
    type Err = crate::time::DurationParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let duration = crate::time::Duration::from_str(s)?;

        Ok(Self::new(duration.into_duration()))
    }
}
