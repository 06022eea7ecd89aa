use crate::measure::{Bandwidth, Latency};
use std::time::Duration;

/// Default [`Latency`] of a [`Link`].
///
/// ```
/// # use flowsim_core::defaults::*;
/// assert_eq!(
///     DEFAULT_LATENCY.to_string(),
///     "2ms"
/// );
/// ```
///
/// [`Link`]: crate::link::Link
pub const DEFAULT_LATENCY: Latency = Latency::new(Duration::from_millis(2));

/// Default [`Bandwidth`] of a [`Link`].
///
/// ```
/// # use flowsim_core::defaults::*;
/// assert_eq!(
///     DEFAULT_BANDWIDTH.to_string(),
///     "5mbps"
/// );
/// ```
///
/// [`Link`]: crate::link::Link
pub const DEFAULT_BANDWIDTH: Bandwidth = Bandwidth::new(5_000_000);

/// Default number of packets a link direction can hold while waiting
/// for the channel, the packet being transmitted excluded.
pub const DEFAULT_QUEUE_LIMIT: usize = 100;

/// First port handed out to sockets that do not ask for one.
pub const EPHEMERAL_PORT_START: u16 = 49_153;

/// Default interval between two throughput samples.
pub const DEFAULT_SAMPLE_PERIOD: Duration = Duration::from_millis(500);
