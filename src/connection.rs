//! Connection supervisor: transport lifecycle, channel multiplexing, and the
//! reconnect-and-replay procedure.

use crate::bus::{EventBus, Listener, SubscriptionId};
use crate::channel::{Channel, ChannelRegistry, ChannelSpec};
use crate::codec::FrameCodec;
use crate::error::Error;
use crate::options::Options;
use crate::transport::{Connector, Multiplexer, MuxEvent, MuxFactory, ReadyState, Transport};
use config::Config;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Managed connection context: one per application instance.
///
/// Owns the physical transport, the sub-stream multiplexer, all live
/// channels, the channel registry, the event bus, and the health-check
/// schedule. There is no ambient global state; everything channel operations
/// need is reachable from this object.
///
/// Not thread-safe by design: all work happens on the host's single dispatch
/// context, which is expected to call [`Self::pump_events`] whenever the
/// multiplexer may have produced events and [`Self::tick`] at its timer
/// cadence.
///
/// # Lifecycle
///
/// ```text
/// IDLE --start()--> CONNECTED --health check detects death--> (teardown,
///     reopen, replay registry) --> CONNECTED --stop()--> IDLE
/// ```
pub struct Connection {
    options: Options,
    codec: FrameCodec,
    connector: Box<dyn Connector>,
    mux_factory: Box<dyn MuxFactory>,
    transport: Option<Box<dyn Transport>>,
    multiplexer: Option<Box<dyn Multiplexer>>,
    channels: Vec<Channel>,
    registry: ChannelRegistry,
    bus: EventBus,
    last_address: Option<String>,
    next_health_check: Option<Instant>,
}

// ============================================================================
// Constructors
// ============================================================================

impl Connection {
    /// Creates a new connection from configuration and the host's transport
    /// capabilities.
    ///
    /// # Configuration Keys
    ///
    /// - `address`: default target for [`Self::start`]
    /// - `broadcast_prefix`: event namespace (defaults to `"$socket."`)
    /// - `reconnect_interval`: health-check period in milliseconds
    ///   (defaults to 3000)
    pub fn new(
        config: &Config,
        connector: Box<dyn Connector>,
        mux_factory: Box<dyn MuxFactory>,
    ) -> Result<Self, Error> {
        Ok(Self::with_options(
            Options::from_config(config)?,
            connector,
            mux_factory,
        ))
    }

    /// Creates a new connection from already-resolved options.
    pub fn with_options(
        options: Options,
        connector: Box<dyn Connector>,
        mux_factory: Box<dyn MuxFactory>,
    ) -> Self {
        Self {
            options,
            codec: FrameCodec::default(),
            connector,
            mux_factory,
            transport: None,
            multiplexer: None,
            channels: Vec::new(),
            registry: ChannelRegistry::new(),
            bus: EventBus::new(),
            last_address: None,
            next_health_check: None,
        }
    }

    /// Replaces the default JSON-array frame codec.
    pub fn with_codec(mut self, codec: FrameCodec) -> Self {
        self.codec = codec;
        self
    }
}

// ============================================================================
// Connection Management
// ============================================================================

impl Connection {
    /// Opens the transport and arms the periodic health check.
    ///
    /// An explicit `address` overrides the configured one and becomes the
    /// target for subsequent automatic reconnects. Fails with
    /// [`Error::MissingAddress`] when neither is available.
    #[instrument(skip(self, address))]
    pub fn start(&mut self, address: Option<&str>) -> Result<(), Error> {
        let address = match address
            .map(str::to_owned)
            .or_else(|| self.options.address.clone())
        {
            Some(address) => address,
            None => {
                error!("No address given and none configured");
                return Err(Error::MissingAddress);
            }
        };

        if let Some(mut stale) = self.transport.take() {
            stale.close();
        }
        self.multiplexer = None;

        info!(%address, "Connecting");
        let transport = self.connector.open(&address)?;
        self.transport = Some(transport);
        self.last_address = Some(address);
        self.next_health_check = Some(Instant::now() + self.options.reconnect_interval);
        Ok(())
    }

    /// Clears the live channel set and closes the transport.
    ///
    /// The channel registry is intentionally retained, so a later `start`
    /// plus replay would recreate the same channels. The health check is
    /// disarmed; a manual stop never triggers automatic reconnection.
    #[instrument(skip(self))]
    pub fn stop(&mut self) {
        info!("Stopping connection");
        self.channels.clear();
        self.multiplexer = None;
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        self.next_health_check = None;
    }

    /// Opens a named sub-stream over the current transport and tracks it as
    /// a live [`Channel`].
    ///
    /// Lazily builds the single multiplexer for this transport lifetime on
    /// first use. The spec is recorded in the registry (first registration
    /// wins) so the channel is recreated after every reconnect.
    #[instrument(skip(self, spec), fields(channel = %spec.name))]
    pub fn open_channel(&mut self, spec: ChannelSpec) -> Result<(), Error> {
        if self.transport.is_none() {
            error!("Channel opened before start()");
            return Err(Error::NotStarted);
        }
        if spec.name.is_empty() {
            error!("Channel spec has no name");
            return Err(Error::MissingChannelName);
        }

        if self.multiplexer.is_none() {
            self.multiplexer = Some(self.mux_factory.build()?);
        }

        let name = spec.name.clone();
        info!(channel = %name, "Initializing channel");

        if let Some(mux) = self.multiplexer.as_deref_mut() {
            mux.open_channel(&name);
        }

        self.registry.register(spec);
        if !self.channels.iter().any(|channel| channel.name() == name) {
            self.channels.push(Channel::new(name));
        }
        Ok(())
    }

    /// Removes a channel from the live set and from the registry.
    ///
    /// A live channel is closed (announcing `.close`) before removal; its
    /// queued messages are discarded with the registry entry. Returns true
    /// if the name was registered.
    #[instrument(skip(self))]
    pub fn unregister(&mut self, name: &str) -> bool {
        if let Some(pos) = self
            .channels
            .iter()
            .position(|channel| channel.name() == name)
        {
            let mut channel = self.channels.remove(pos);
            let prefix = self.options.broadcast_prefix.clone();
            channel.close(&mut self.bus, &prefix);
        }
        self.registry.unregister(name)
    }
}

// ============================================================================
// Data Operations
// ============================================================================

impl Connection {
    /// Encodes and queues a message on the named channel, then attempts a
    /// flush.
    ///
    /// Returns `Ok(true)` only if at least one queued message was actually
    /// transmitted - the channel must be connected for that. A name that
    /// resolves to no live channel is a hard [`Error::ChannelNotFound`].
    #[instrument(skip(self, payload))]
    pub fn send(&mut self, channel: &str, event: &str, payload: &Value) -> Result<bool, Error> {
        let Some(live) = self
            .channels
            .iter_mut()
            .find(|live| live.name() == channel)
        else {
            error!(channel, "No such channel");
            return Err(Error::ChannelNotFound {
                name: channel.to_string(),
            });
        };

        let Some(mux) = self.multiplexer.as_deref_mut() else {
            error!(channel, "No multiplexer for live channel");
            return Err(Error::NotStarted);
        };

        let queue = self.registry.queue_mut(channel);
        live.enqueue(event, payload, &self.codec, queue, mux)
    }
}

// ============================================================================
// Event Operations
// ============================================================================

impl Connection {
    /// Drains pending multiplexer events and routes each to its channel.
    ///
    /// `Opened` marks the channel connected, announces `.open`, and flushes
    /// its queue; `Frame` decodes and dispatches; `Closed` marks the channel
    /// disconnected and announces `.close`. Events for unknown channel names
    /// are logged and discarded. Returns the number of events processed.
    pub fn pump_events(&mut self) -> usize {
        let Some(mux) = self.multiplexer.as_deref_mut() else {
            return 0;
        };

        let events = mux.poll_events();
        let count = events.len();
        let prefix = &self.options.broadcast_prefix;

        for event in events {
            match event {
                MuxEvent::Opened { channel } => {
                    let Some(live) = find_channel(&mut self.channels, &channel) else {
                        warn!(%channel, "Open event for unknown channel");
                        continue;
                    };
                    let queue = self.registry.queue_mut(&channel);
                    if let Err(err) = live.open(queue, &mut *mux, &mut self.bus, prefix) {
                        warn!(%channel, %err, "Flush on open failed");
                    }
                }
                MuxEvent::Frame { channel, data } => {
                    let Some(live) = find_channel(&mut self.channels, &channel) else {
                        warn!(%channel, "Frame for unknown channel");
                        continue;
                    };
                    live.receive(&data, &self.codec, &mut self.bus, prefix);
                }
                MuxEvent::Closed { channel } => {
                    let Some(live) = find_channel(&mut self.channels, &channel) else {
                        warn!(%channel, "Close event for unknown channel");
                        continue;
                    };
                    live.close(&mut self.bus, prefix);
                }
            }
        }

        if count > 0 {
            debug!(count, "Pumped multiplexer events");
        }
        count
    }

    /// Attaches a listener to `<broadcast_prefix><event>`.
    ///
    /// `event` is the un-prefixed name, e.g. `"chat.open"` or
    /// `"chat.message"`. Returns a handle for [`Self::unsubscribe`].
    pub fn on(&mut self, event: &str, listener: Listener) -> SubscriptionId {
        let qualified = format!("{}{}", self.options.broadcast_prefix, event);
        self.bus.subscribe(qualified, listener)
    }

    /// Detaches a listener. Returns false if the handle was already removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }
}

// ============================================================================
// Health Check
// ============================================================================

impl Connection {
    /// Runs the periodic transport health check.
    ///
    /// The host calls this at its timer cadence with the current instant;
    /// nothing happens before the armed deadline. When the deadline has
    /// passed and the transport is gone or reports [`ReadyState::Closed`],
    /// the connection is torn down and rebuilt: the timer is disarmed, every
    /// live channel announces `.close`, the live set is cleared, the
    /// transport is reopened at the last known address, and every registered
    /// spec is replayed through [`Self::open_channel`] in registration
    /// order.
    ///
    /// A failed reopen re-arms the check so the next tick retries at the
    /// same cadence; there is no backoff.
    #[instrument(skip(self, now))]
    pub fn tick(&mut self, now: Instant) -> Result<(), Error> {
        let Some(deadline) = self.next_health_check else {
            return Ok(());
        };
        if now < deadline {
            return Ok(());
        }
        self.next_health_check = Some(now + self.options.reconnect_interval);

        let dead = match self.transport.as_deref() {
            None => true,
            Some(transport) => transport.ready_state() == ReadyState::Closed,
        };
        if !dead {
            return Ok(());
        }

        self.reconnect(now)
    }

    fn reconnect(&mut self, now: Instant) -> Result<(), Error> {
        warn!("Transport dead, reconnecting");

        // Disarm first so a slow reopen cannot overlap another cycle.
        self.next_health_check = None;

        let prefix = self.options.broadcast_prefix.clone();
        for channel in &mut self.channels {
            channel.close(&mut self.bus, &prefix);
        }
        self.channels.clear();
        self.multiplexer = None;
        self.transport = None;

        let address = self.last_address.clone();
        if let Err(err) = self.start(address.as_deref()) {
            error!(%err, "Reconnect failed, will retry");
            self.next_health_check = Some(now + self.options.reconnect_interval);
            return Err(err);
        }

        let specs: Vec<ChannelSpec> = self.registry.specs().to_vec();
        for spec in specs {
            self.open_channel(spec)?;
        }
        Ok(())
    }
}

// ============================================================================
// Utilities
// ============================================================================

impl Connection {
    /// The live transport, if the connection is started.
    pub fn current_transport(&self) -> Option<&dyn Transport> {
        self.transport.as_deref()
    }

    /// True between a successful `start` and the next `stop` or transport
    /// death.
    pub fn is_started(&self) -> bool {
        self.transport.is_some()
    }

    /// The live channel with this name, if any.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|channel| channel.name() == name)
    }

    /// All currently live channels.
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// The durable channel registry.
    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }
}

fn find_channel<'a>(channels: &'a mut [Channel], name: &str) -> Option<&'a mut Channel> {
    channels.iter_mut().find(|channel| channel.name() == name)
}
