use crate::{
    app::{AppContext, Socket, SocketError},
    measure::Bandwidth,
    node::Address,
    scheduler::EventId,
};
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Sends fixed-size datagrams at a constant data rate until a packet
/// budget is exhausted or the application is stopped.
///
/// Once the budget is reached the source stops scheduling sends but stays
/// running until [`TrafficSource::stop`] is called, so a later `stop` still
/// closes the socket.
///
/// The source is driven entirely through an [`AppContext`]: it never holds
/// more than one pending send, and every send is either the one issued on
/// [`start`] or the one issued by the previous send.
///
/// [`start`]: TrafficSource::start
#[derive(Debug, Default)]
pub struct TrafficSource {
    config: Option<SourceConfig>,
    socket: Option<Socket>,
    running: bool,
    packets_sent: u64,
    send_event: Option<EventId>,
}

/// Parameters of a [`TrafficSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceConfig {
    pub destination: Address,
    /// payload size of every datagram, in bytes
    pub packet_size: u64,
    /// number of datagrams to send, `0` for no limit
    pub packet_budget: u64,
    pub data_rate: Bandwidth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("Traffic source is already started")]
    AlreadyStarted,
    #[error("Traffic source was started before being configured")]
    NotConfigured,
    #[error("Packet size must be at least 1 byte")]
    ZeroPacketSize,
    #[error("Data rate must be greater than 0bps")]
    ZeroDataRate,
    #[error("Socket error")]
    Socket(#[from] SocketError),
}

impl TrafficSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the socket and sending parameters.
    ///
    /// Configuring again before [`TrafficSource::start`] replaces the
    /// previous configuration.
    pub fn configure(
        &mut self,
        socket: Socket,
        destination: Address,
        packet_size: u64,
        packet_budget: u64,
        data_rate: Bandwidth,
    ) -> Result<(), SourceError> {
        if self.running {
            return Err(SourceError::AlreadyStarted);
        }
        if packet_size == 0 {
            return Err(SourceError::ZeroPacketSize);
        }
        if data_rate.is_zero() {
            return Err(SourceError::ZeroDataRate);
        }

        self.config = Some(SourceConfig {
            destination,
            packet_size,
            packet_budget,
            data_rate,
        });
        self.socket = Some(socket);
        Ok(())
    }

    pub fn config(&self) -> Option<&SourceConfig> {
        self.config.as_ref()
    }

    pub fn socket(&self) -> Option<&Socket> {
        self.socket.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    /// Whether a send is scheduled.
    pub fn has_pending_send(&self) -> bool {
        self.send_event.is_some()
    }

    /// `true` once a budget is set and every packet of it was sent.
    pub fn budget_exhausted(&self) -> bool {
        self.config
            .is_some_and(|c| c.packet_budget > 0 && self.packets_sent >= c.packet_budget)
    }

    /// Connect the socket and send the first datagram right away.
    pub fn start<C>(&mut self, ctx: &mut C) -> Result<(), SourceError>
    where
        C: AppContext + ?Sized,
    {
        if self.running {
            return Err(SourceError::AlreadyStarted);
        }
        let (Some(config), Some(socket)) = (self.config, self.socket.as_mut()) else {
            return Err(SourceError::NotConfigured);
        };

        socket.bind()?;
        socket.connect(config.destination)?;

        debug!(
            socket = %socket,
            rate = %config.data_rate,
            size = config.packet_size,
            budget = config.packet_budget,
            "traffic source started at {}",
            ctx.now()
        );

        self.running = true;
        self.packets_sent = 0;
        self.send_packet(ctx);
        Ok(())
    }

    /// Cancel the pending send and close the socket.
    ///
    /// Stopping a source that is not running does nothing.
    pub fn stop<C>(&mut self, ctx: &mut C)
    where
        C: AppContext + ?Sized,
    {
        if !self.running {
            return;
        }
        self.running = false;

        if let Some(event) = self.send_event.take() {
            ctx.cancel(event);
        }
        if let Some(socket) = self.socket.as_mut() {
            socket.close();
        }

        debug!(
            packets_sent = self.packets_sent,
            "traffic source stopped at {}",
            ctx.now()
        );
    }

    /// The send timer fired.
    pub fn on_timer<C>(&mut self, ctx: &mut C)
    where
        C: AppContext + ?Sized,
    {
        self.send_event = None;
        self.send_packet(ctx);
    }

    fn send_packet<C>(&mut self, ctx: &mut C)
    where
        C: AppContext + ?Sized,
    {
        if !self.running {
            return;
        }
        let (Some(config), Some(socket)) = (self.config, self.socket.as_ref()) else {
            return;
        };

        let datagram = match socket.datagram(config.packet_size) {
            Ok(datagram) => datagram,
            Err(error) => {
                warn!(%error, "traffic source cannot send");
                return;
            }
        };
        ctx.send(datagram);
        self.packets_sent += 1;
        trace!(packets_sent = self.packets_sent, "datagram sent at {}", ctx.now());

        if self.budget_exhausted() {
            debug!(
                budget = config.packet_budget,
                "traffic source budget reached at {}",
                ctx.now()
            );
            return;
        }

        self.schedule_next(ctx, config);
    }

    fn schedule_next<C>(&mut self, ctx: &mut C, config: SourceConfig)
    where
        C: AppContext + ?Sized,
    {
        // a zero data rate is refused by `configure`
        let Some(interval) = config.data_rate.transmission_time(config.packet_size) else {
            return;
        };
        self.send_event = Some(ctx.schedule_after(interval));
    }
}
