use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Specification of a named channel.
///
/// Registered with the [`ChannelRegistry`] when the channel is first opened
/// and replayed verbatim after every automatic reconnect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSpec {
    /// Unique channel name, stable across reconnects.
    pub name: String,
    /// Optional transport-specific options, passed through opaquely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

impl ChannelSpec {
    /// Creates a spec with no transport-specific options.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: None,
        }
    }

    /// Attaches transport-specific options to the spec.
    pub fn with_options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }
}

/// Durable record of every channel ever requested.
///
/// The registry survives transport reconnection: its specs, in registration
/// order, are the replay list used to recreate all channels on a fresh
/// transport. It also owns the per-channel outbound queues, which persist
/// independent of channel liveness so messages queued across an interruption
/// are not lost.
#[derive(Default)]
pub struct ChannelRegistry {
    specs: Vec<ChannelSpec>,
    queues: HashMap<String, VecDeque<String>>,
}

impl ChannelRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a channel specification.
    ///
    /// Idempotent by name: the first registration wins and later calls for
    /// the same name are no-ops. Returns true if the spec was newly recorded.
    pub fn register(&mut self, spec: ChannelSpec) -> bool {
        if self.contains(&spec.name) {
            return false;
        }
        debug!(channel = %spec.name, "Registering channel spec");
        self.queues.entry(spec.name.clone()).or_default();
        self.specs.push(spec);
        true
    }

    /// Removes a channel specification and its queue.
    ///
    /// Returns true if the name was registered. Without this, long-lived
    /// connections that keep introducing distinct channel names would grow
    /// the replay list without bound.
    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.specs.len();
        self.specs.retain(|spec| spec.name != name);
        self.queues.remove(name);
        before != self.specs.len()
    }

    /// True if a spec with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.specs.iter().any(|spec| spec.name == name)
    }

    /// All specifications in registration order - the reconnect replay list.
    pub fn specs(&self) -> &[ChannelSpec] {
        &self.specs
    }

    /// The outbound queue for `name`, created on first use.
    pub(crate) fn queue_mut(&mut self, name: &str) -> &mut VecDeque<String> {
        self.queues.entry(name.to_string()).or_default()
    }

    /// Number of messages currently queued for `name`.
    pub fn queued(&self, name: &str) -> usize {
        self.queues.get(name).map_or(0, VecDeque::len)
    }
}
