//! Named logical channels multiplexed over one transport.
//!
//! A [`Channel`] holds only its name and connected flag; its outbound queue
//! lives in the [`ChannelRegistry`] so it survives the channel being torn
//! down and recreated across reconnects. All collaborators (multiplexer,
//! event bus, codec, queue) are borrowed in by the supervisor for each
//! operation, keeping the channel free of shared ownership.

mod registry;

pub use registry::{ChannelRegistry, ChannelSpec};

use crate::bus::EventBus;
use crate::codec::{is_success, FrameCodec};
use crate::error::Error;
use crate::transport::Multiplexer;
use serde_json::Value;
use std::collections::VecDeque;
use tracing::{debug, error, warn};

/// A named logical stream over the shared transport.
///
/// Created by the supervisor when a sub-stream is opened on a fresh
/// transport, destroyed when the transport dies, and recreated transparently
/// on reconnect with `connected` reset to false.
#[derive(Debug)]
pub struct Channel {
    name: String,
    connected: bool,
}

impl Channel {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            connected: false,
        }
    }

    /// The channel's unique name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True between a successful sub-stream open and its close.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Marks the channel writable, announces `.open`, and flushes whatever
    /// queued up while it was disconnected.
    pub(crate) fn open(
        &mut self,
        queue: &mut VecDeque<String>,
        mux: &mut dyn Multiplexer,
        bus: &mut EventBus,
        prefix: &str,
    ) -> Result<bool, Error> {
        debug!(channel = %self.name, "Channel open");
        self.connected = true;
        bus.publish(&format!("{prefix}{}.open", self.name), &Value::Null);
        self.flush(queue, mux)
    }

    /// Decodes an inbound frame and dispatches it to listeners.
    ///
    /// A malformed frame is reported and dropped; the channel stays
    /// connected. A payload whose `success` field is falsy additionally
    /// triggers an `.error` event before the named event, with the same
    /// payload, so listeners can tell application-level failures from
    /// transport faults.
    pub(crate) fn receive(&mut self, raw: &str, codec: &FrameCodec, bus: &mut EventBus, prefix: &str) {
        let (event, payload) = match (codec.decoder)(raw) {
            Ok(frame) => frame,
            Err(err) => {
                error!(channel = %self.name, %err, "Dropping malformed frame");
                return;
            }
        };

        if !is_success(&payload) {
            bus.publish(&format!("{prefix}{}.error", self.name), &payload);
        }
        bus.publish(&format!("{prefix}{}.{event}", self.name), &payload);
    }

    /// Marks the channel unwritable and announces `.close`.
    pub(crate) fn close(&mut self, bus: &mut EventBus, prefix: &str) {
        debug!(channel = %self.name, "Channel close");
        self.connected = false;
        bus.publish(&format!("{prefix}{}.close", self.name), &Value::Null);
    }

    /// Encodes a message, appends it to the queue, and attempts a flush.
    ///
    /// Returns true only if at least one message was actually transmitted,
    /// i.e. the channel was connected at flush time.
    pub(crate) fn enqueue(
        &mut self,
        event: &str,
        payload: &Value,
        codec: &FrameCodec,
        queue: &mut VecDeque<String>,
        mux: &mut dyn Multiplexer,
    ) -> Result<bool, Error> {
        let frame = (codec.encoder)(event, payload)?;
        queue.push_back(frame);
        self.flush(queue, mux)
    }

    /// Drains the queue in strict FIFO order, one frame per sub-stream send.
    ///
    /// Does nothing unless the channel is connected and the queue is
    /// non-empty. A transmission failure puts the frame back at the front of
    /// the queue and stops the drain; the next flush retries it.
    pub(crate) fn flush(
        &mut self,
        queue: &mut VecDeque<String>,
        mux: &mut dyn Multiplexer,
    ) -> Result<bool, Error> {
        if !self.connected || queue.is_empty() {
            return Ok(false);
        }

        let mut sent = 0usize;
        while let Some(frame) = queue.pop_front() {
            if let Err(err) = mux.send(&self.name, &frame) {
                queue.push_front(frame);
                warn!(
                    channel = %self.name,
                    pending = queue.len(),
                    %err,
                    "Transmission failed, frame re-queued"
                );
                return Err(err);
            }
            sent += 1;
        }

        debug!(channel = %self.name, sent, "Flushed outbound queue");
        Ok(true)
    }
}
