use thiserror::Error;

/// The error type for muxcomm operations.
///
/// This encompasses all errors that can occur when driving a managed
/// connection: configuration problems, channel addressing mistakes, frame
/// encoding/decoding failures, and sub-stream transmission faults.
///
/// No error here is fatal. Configuration and addressing errors abort the
/// single operation that caused them; codec errors drop the offending frame;
/// transmission errors leave the message queued for a later flush. Transport
/// death is not an error at all - it is detected by the periodic health check
/// and handled by automatic reconnection.
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================

    /// No target address was given to `start()` and none is configured.
    #[error("No address configured - pass one to start() or set the `address` key")]
    MissingAddress,

    /// A channel operation was attempted before the connection was started.
    #[error("Connection must be started before opening channels, see start()")]
    NotStarted,

    /// A channel spec was submitted without a name.
    #[error("Channel name must be non-empty")]
    MissingChannelName,

    /// Configuration file parsing or key lookup failed.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // ============================================================================
    // Addressing Errors
    // ============================================================================

    /// `send()` named a channel that has not been opened.
    ///
    /// The original implementation silently fell back to the first live
    /// channel here; unmatched names are a hard error in this crate.
    #[error("No channel named '{name}'")]
    ChannelNotFound {
        /// The channel name that did not resolve.
        name: String,
    },

    // ============================================================================
    // Codec Errors
    // ============================================================================

    /// An inbound frame did not have the expected shape.
    ///
    /// The default wire format is a two-element JSON array
    /// `[event, payload]` whose first element is a string. Anything else is
    /// reported and dropped; the channel stays connected.
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Serializing an outbound `(event, payload)` pair failed.
    #[error("Failed to encode frame: {0}")]
    Encode(serde_json::Error),

    /// Deserializing an inbound frame failed before shape validation.
    #[error("Failed to decode frame: {0}")]
    Decode(serde_json::Error),

    // ============================================================================
    // Transport Errors
    // ============================================================================

    /// The multiplexer refused to transmit a frame on a sub-stream.
    ///
    /// The message that triggered this is re-queued at the front of its
    /// channel's queue and retried on the next flush.
    #[error("Sub-stream transmission failed: {0}")]
    Transport(String),
}
