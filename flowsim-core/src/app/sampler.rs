use crate::{
    app::{RxCounter, SinkId},
    time::SimTime,
};
use std::{
    fmt,
    io::{self, Write},
    time::Duration,
};
use thiserror::Error;
use tracing::trace;

/// Unit a [`ThroughputSampler`] reports its values in.
///
/// Kilobits are binary (1 024 bits), megabits are decimal (1 000 000 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ThroughputUnit {
    Kbps,
    #[default]
    Mbps,
}

impl ThroughputUnit {
    /// Number of bits in one unit.
    pub const fn bits(&self) -> u64 {
        match self {
            Self::Kbps => 1_024,
            Self::Mbps => 1_000_000,
        }
    }
}

impl fmt::Display for ThroughputUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kbps => f.write_str("Kbit/s"),
            Self::Mbps => f.write_str("Mbit/s"),
        }
    }
}

/// One throughput measurement of one sink.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sample {
    pub time: SimTime,
    /// bytes received since the previous sample
    pub delta_bytes: u64,
    /// what was received since the previous sample, in the sampler's unit
    pub value: f64,
    /// `value` spread over the sampling period, in units per second
    pub rate: f64,
}

#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("Expected one output stream per sink ({sinks}), got {streams}")]
    StreamCount { sinks: usize, streams: usize },
    #[error("Expected {expected} sink counters, got {got}")]
    SinkCount { expected: usize, got: usize },
    #[error("Sampling period must be greater than 0")]
    ZeroPeriod,
    #[error("Cannot write throughput sample")]
    Io(#[from] io::Error),
}

/// Periodically measures how many bytes each watched sink received since
/// the previous measurement.
///
/// Every invocation, for each sink in order, the sampler computes
/// `(total - last) * 8` bits, converts them to the configured
/// [`ThroughputUnit`], appends `time value` to the sink's
/// output stream when the value is not zero and prints a line on the
/// console. The first sample covers everything received since time zero.
///
/// The sampler does not schedule itself: its host invokes
/// [`ThroughputSampler::sample`] every [`ThroughputSampler::period`] until
/// the end of the simulation.
pub struct ThroughputSampler {
    sinks: Vec<SinkId>,
    period: Duration,
    unit: ThroughputUnit,
    streams: Vec<Option<Box<dyn Write>>>,
    console: Option<Box<dyn Write>>,
    last_totals: Vec<u64>,
    last_samples: Vec<Sample>,
    invocations: u64,
}

impl ThroughputSampler {
    /// Watch `sinks`, writing the samples of `sinks[i]` to `streams[i]`.
    ///
    /// There must be exactly one (possibly absent) stream per sink. The
    /// console defaults to the standard output.
    pub fn new(
        sinks: Vec<SinkId>,
        period: Duration,
        unit: ThroughputUnit,
        streams: Vec<Option<Box<dyn Write>>>,
    ) -> Result<Self, SamplerError> {
        if sinks.len() != streams.len() {
            return Err(SamplerError::StreamCount {
                sinks: sinks.len(),
                streams: streams.len(),
            });
        }
        if period.is_zero() {
            return Err(SamplerError::ZeroPeriod);
        }

        let count = sinks.len();
        Ok(Self {
            sinks,
            period,
            unit,
            streams,
            console: Some(Box::new(io::stdout())),
            last_totals: vec![0; count],
            last_samples: vec![Sample::default(); count],
            invocations: 0,
        })
    }

    /// Watch `sinks` without writing any per-sink stream.
    pub fn without_streams(
        sinks: Vec<SinkId>,
        period: Duration,
        unit: ThroughputUnit,
    ) -> Result<Self, SamplerError> {
        let streams = sinks.iter().map(|_| None).collect();
        Self::new(sinks, period, unit, streams)
    }

    /// Replace the console the human readable lines are printed on.
    pub fn set_console<W>(&mut self, console: W)
    where
        W: Write + 'static,
    {
        self.console = Some(Box::new(console));
    }

    /// Do not print anything on the console.
    pub fn quiet(&mut self) {
        self.console = None;
    }

    pub fn sinks(&self) -> &[SinkId] {
        &self.sinks
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn unit(&self) -> ThroughputUnit {
        self.unit
    }

    /// How many times [`ThroughputSampler::sample`] ran.
    pub fn invocations(&self) -> u64 {
        self.invocations
    }

    /// The most recent sample of every sink, in sink order.
    pub fn last_samples(&self) -> &[Sample] {
        &self.last_samples
    }

    /// Take one sample of every sink.
    ///
    /// `counters[i]` must be the counter of `self.sinks()[i]`.
    pub fn sample(
        &mut self,
        now: SimTime,
        counters: &[&dyn RxCounter],
    ) -> Result<&[Sample], SamplerError> {
        if counters.len() != self.sinks.len() {
            return Err(SamplerError::SinkCount {
                expected: self.sinks.len(),
                got: counters.len(),
            });
        }
        self.invocations += 1;

        let period = self.period.as_secs_f64();
        let unit = self.unit.bits() as f64;

        // every sink is sampled even if writing one of them fails
        let mut result = Ok(());
        for (i, counter) in counters.iter().enumerate() {
            let total = counter.total_received_bytes();
            let delta_bytes = total.saturating_sub(self.last_totals[i]);
            let value = (delta_bytes as f64 * 8.0) / unit;
            let sample = Sample {
                time: now,
                delta_bytes,
                value,
                rate: value / period,
            };
            self.last_samples[i] = sample;
            self.last_totals[i] = total;
            trace!(sink = %self.sinks[i], delta_bytes, value, "throughput sample at {now}");

            let written = self.write(i, &sample);
            if result.is_ok() {
                result = written;
            }
        }

        result?;
        Ok(&self.last_samples)
    }

    fn write(&mut self, i: usize, sample: &Sample) -> io::Result<()> {
        let time = sample.time.as_secs_f64();
        let value = sample.value;

        if value != 0.0
            && let Some(stream) = self.streams[i].as_mut()
        {
            writeln!(stream, "{time:.6}\t{value:.6}")?;
        }
        if let Some(console) = self.console.as_mut() {
            writeln!(
                console,
                "{time:.6}s: \t{}\t{value:.6} {}",
                self.sinks[i], self.unit
            )?;
        }
        Ok(())
    }

    /// Flush every output stream and the console.
    pub fn flush(&mut self) -> io::Result<()> {
        for stream in self.streams.iter_mut().flatten() {
            stream.flush()?;
        }
        if let Some(console) = self.console.as_mut() {
            console.flush()?;
        }
        Ok(())
    }
}

impl fmt::Debug for ThroughputSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThroughputSampler")
            .field("sinks", &self.sinks)
            .field("period", &self.period)
            .field("unit", &self.unit)
            .field("invocations", &self.invocations)
            .field("last_samples", &self.last_samples)
            .finish_non_exhaustive()
    }
}
