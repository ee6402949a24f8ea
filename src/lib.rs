//! muxcomm - Managed, reconnecting, multiplexed messaging channels for Rust
//!
//! Muxcomm gives application code several independent named channels over one
//! underlying transport connection, each with framed `(event, payload)`
//! delivery, automatic reconnection, and per-channel message queueing across
//! connection interruptions. The physical transport and the sub-stream
//! multiplexer are host-supplied capabilities behind small traits; this crate
//! owns the lifecycle and message-delivery state machine.
//!
//! See the [README](https://github.com/muxcomm/muxcomm) for quick start guide,
//! examples, and configuration options.

// Internal-only modules
pub(crate) mod bus;
pub(crate) mod channel;
pub(crate) mod codec;
pub(crate) mod connection;
pub(crate) mod error;
pub(crate) mod options;
pub(crate) mod transport;

// These are the intended public API
pub use bus::{EventBus, Listener, SubscriptionId};
pub use channel::{Channel, ChannelRegistry, ChannelSpec};
pub use codec::{decode_json, encode_json, FrameCodec, FrameDecoder, FrameEncoder};
pub use connection::Connection;
pub use error::Error;
pub use options::{Options, DEFAULT_BROADCAST_PREFIX, DEFAULT_RECONNECT_INTERVAL};
pub use transport::{Connector, Multiplexer, MuxEvent, MuxFactory, ReadyState, Transport};

/// Convenient re-exports of commonly used types.
pub mod prelude {
    pub use crate::bus::{Listener, SubscriptionId};
    pub use crate::channel::{Channel, ChannelRegistry, ChannelSpec};
    pub use crate::codec::FrameCodec;
    pub use crate::connection::Connection;
    pub use crate::error::Error;
    pub use crate::options::Options;
    pub use crate::transport::{
        Connector, Multiplexer, MuxEvent, MuxFactory, ReadyState, Transport,
    };
}
