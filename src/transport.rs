//! Boundary traits for the host-supplied transport capabilities.
//!
//! The physical bidirectional connection and the sub-stream multiplexer are
//! external collaborators - this crate never opens sockets itself. The host
//! environment implements these traits (over SockJS, WebSocket, or anything
//! comparable) and injects them into
//! [`Connection::new`](crate::Connection::new).
//!
//! Inbound traffic reaches the supervisor as a polled stream of tagged
//! [`MuxEvent`]s rather than imperatively assigned callbacks, so the whole
//! crate stays single-threaded and dispatch happens in one loop.

use crate::error::Error;

/// Liveness states of the underlying transport, mirroring the classic
/// numeric socket ready states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Connecting,
    Open,
    Closing,
    /// Terminal state. The periodic health check treats a transport in this
    /// state as dead and starts the reconnect-and-replay procedure.
    Closed,
}

impl ReadyState {
    /// The conventional numeric code for this state (`Closed` = 3).
    pub fn code(self) -> u8 {
        match self {
            ReadyState::Connecting => 0,
            ReadyState::Open => 1,
            ReadyState::Closing => 2,
            ReadyState::Closed => 3,
        }
    }
}

/// A live physical connection.
///
/// All traffic flows through the [`Multiplexer`]; the supervisor only ever
/// probes the transport for liveness and closes it on shutdown.
pub trait Transport {
    /// Reports the current liveness of the connection.
    fn ready_state(&self) -> ReadyState;

    /// Tears the connection down. Idempotent.
    fn close(&mut self);
}

/// Opens physical connections by address.
pub trait Connector {
    /// Opens a transport to `address`.
    ///
    /// Fails if the address is invalid or unreachable. The returned transport
    /// may still be in [`ReadyState::Connecting`]; the health check and the
    /// multiplexer's `Opened` events handle the rest of the lifecycle.
    fn open(&mut self, address: &str) -> Result<Box<dyn Transport>, Error>;
}

/// Events produced by [`Multiplexer::poll_events()`].
///
/// One tagged variant per sub-stream lifecycle transition, consumed by the
/// supervisor's single dispatch loop
/// ([`Connection::pump_events`](crate::Connection::pump_events)).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MuxEvent {
    /// The named sub-stream became writable.
    Opened { channel: String },
    /// A raw frame arrived on the named sub-stream.
    Frame { channel: String, data: String },
    /// The named sub-stream closed.
    Closed { channel: String },
}

/// A sub-stream multiplexer splitting one transport into named logical
/// streams.
///
/// Exactly one multiplexer exists per transport lifetime; the supervisor
/// drops it together with the transport and asks the [`MuxFactory`] for a
/// fresh one after reconnecting.
pub trait Multiplexer {
    /// Opens (or re-opens) the named sub-stream.
    fn open_channel(&mut self, name: &str);

    /// Transmits one serialized frame on the named sub-stream.
    fn send(&mut self, channel: &str, frame: &str) -> Result<(), Error>;

    /// Drains all pending sub-stream events.
    ///
    /// Never blocks; returns an empty vector when nothing happened.
    fn poll_events(&mut self) -> Vec<MuxEvent>;
}

/// Builds a [`Multiplexer`] bound to the host's current transport.
///
/// Called lazily by the supervisor the first time a channel is opened on a
/// fresh transport.
pub trait MuxFactory {
    fn build(&mut self) -> Result<Box<dyn Multiplexer>, Error>;
}
