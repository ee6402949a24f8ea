//! Shared test support: a scripted in-memory implementation of the
//! host-supplied transport capabilities, plus tracing setup.
//!
//! Use the `TEST_LOG` environment variable to control tracing verbosity
//! (like -v, -vv, -vvv):
//!
//! ```bash
//! TEST_LOG=2 cargo test -- --nocapture
//! ```
#![allow(dead_code)]

use muxcomm::{
    Connection, Connector, Error, Multiplexer, MuxEvent, MuxFactory, ReadyState, Transport,
};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize tracing based on the TEST_LOG environment variable.
///
/// - TEST_LOG=1: Info level
/// - TEST_LOG=2: Debug level
/// - TEST_LOG=3: Trace level
pub fn init_tracing() {
    INIT.call_once(|| {
        if let Ok(level_str) = std::env::var("TEST_LOG") {
            let verbosity = level_str.parse::<u8>().unwrap_or(0);

            if verbosity > 0 {
                let level = match verbosity {
                    1 => "info",
                    2 => "debug",
                    _ => "trace", // 3 or more
                };

                let filter = format!("muxcomm={}", level);
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
                    .with_target(true)
                    .with_writer(std::io::stderr)
                    .with_test_writer()
                    .try_init();
            }
        }
    });
}

// ============================================================================
// Scripted Network
// ============================================================================

pub struct NetState {
    pub ready: ReadyState,
    pub fail_connect: bool,
    pub fail_sends: usize,
    pub opened_addresses: Vec<String>,
    pub opened_channels: Vec<String>,
    pub sent: Vec<(String, String)>,
    pub pending: Vec<MuxEvent>,
    pub mux_builds: usize,
}

impl Default for NetState {
    fn default() -> Self {
        Self {
            ready: ReadyState::Connecting,
            fail_connect: false,
            fail_sends: 0,
            opened_addresses: Vec::new(),
            opened_channels: Vec::new(),
            sent: Vec::new(),
            pending: Vec::new(),
            mux_builds: 0,
        }
    }
}

/// Handle to a scripted in-memory "network" shared by the connector, the
/// transport, and the multiplexer it hands out. Tests drive inbound traffic
/// by pushing [`MuxEvent`]s and inspect outbound traffic through the
/// recorded sends.
#[derive(Clone, Default)]
pub struct ScriptedNet {
    state: Rc<RefCell<NetState>>,
}

impl ScriptedNet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connector(&self) -> Box<dyn Connector> {
        Box::new(ScriptedConnector { net: self.clone() })
    }

    pub fn mux_factory(&self) -> Box<dyn MuxFactory> {
        Box::new(ScriptedMuxFactory { net: self.clone() })
    }

    // ------------------------------------------------------------------
    // Scripting
    // ------------------------------------------------------------------

    pub fn push_opened(&self, channel: &str) {
        self.state.borrow_mut().pending.push(MuxEvent::Opened {
            channel: channel.to_string(),
        });
    }

    pub fn push_frame(&self, channel: &str, data: &str) {
        self.state.borrow_mut().pending.push(MuxEvent::Frame {
            channel: channel.to_string(),
            data: data.to_string(),
        });
    }

    pub fn push_closed(&self, channel: &str) {
        self.state.borrow_mut().pending.push(MuxEvent::Closed {
            channel: channel.to_string(),
        });
    }

    pub fn set_ready(&self, ready: ReadyState) {
        self.state.borrow_mut().ready = ready;
    }

    pub fn fail_connect(&self, fail: bool) {
        self.state.borrow_mut().fail_connect = fail;
    }

    /// Makes the next `n` sub-stream sends fail.
    pub fn fail_next_sends(&self, n: usize) {
        self.state.borrow_mut().fail_sends = n;
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn opened_addresses(&self) -> Vec<String> {
        self.state.borrow().opened_addresses.clone()
    }

    pub fn opened_channels(&self) -> Vec<String> {
        self.state.borrow().opened_channels.clone()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.state.borrow().sent.clone()
    }

    pub fn sent_on(&self, channel: &str) -> Vec<String> {
        self.state
            .borrow()
            .sent
            .iter()
            .filter(|(name, _)| name == channel)
            .map(|(_, frame)| frame.clone())
            .collect()
    }

    pub fn mux_builds(&self) -> usize {
        self.state.borrow().mux_builds
    }

    pub fn ready(&self) -> ReadyState {
        self.state.borrow().ready
    }
}

struct ScriptedConnector {
    net: ScriptedNet,
}

impl Connector for ScriptedConnector {
    fn open(&mut self, address: &str) -> Result<Box<dyn Transport>, Error> {
        let mut state = self.net.state.borrow_mut();
        if state.fail_connect {
            return Err(Error::Transport(format!("connect refused: {address}")));
        }
        state.opened_addresses.push(address.to_string());
        state.ready = ReadyState::Open;
        Ok(Box::new(ScriptedTransport {
            net: self.net.clone(),
        }))
    }
}

struct ScriptedTransport {
    net: ScriptedNet,
}

impl Transport for ScriptedTransport {
    fn ready_state(&self) -> ReadyState {
        self.net.state.borrow().ready
    }

    fn close(&mut self) {
        self.net.state.borrow_mut().ready = ReadyState::Closed;
    }
}

struct ScriptedMuxFactory {
    net: ScriptedNet,
}

impl MuxFactory for ScriptedMuxFactory {
    fn build(&mut self) -> Result<Box<dyn Multiplexer>, Error> {
        self.net.state.borrow_mut().mux_builds += 1;
        Ok(Box::new(ScriptedMux {
            net: self.net.clone(),
        }))
    }
}

struct ScriptedMux {
    net: ScriptedNet,
}

impl Multiplexer for ScriptedMux {
    fn open_channel(&mut self, name: &str) {
        self.net
            .state
            .borrow_mut()
            .opened_channels
            .push(name.to_string());
    }

    fn send(&mut self, channel: &str, frame: &str) -> Result<(), Error> {
        let mut state = self.net.state.borrow_mut();
        if state.fail_sends > 0 {
            state.fail_sends -= 1;
            return Err(Error::Transport("scripted send failure".to_string()));
        }
        state.sent.push((channel.to_string(), frame.to_string()));
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<MuxEvent> {
        std::mem::take(&mut self.net.state.borrow_mut().pending)
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub type Captured = Rc<RefCell<Vec<(String, Value)>>>;

/// Subscribes to an un-prefixed event name and records every delivery.
pub fn capture(conn: &mut Connection, event: &str) -> Captured {
    let log: Captured = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    conn.on(
        event,
        Box::new(move |name, payload| {
            sink.borrow_mut().push((name.to_string(), payload.clone()));
        }),
    );
    log
}

pub fn build_config(address: &str) -> config::Config {
    config::Config::builder()
        .set_default("address", address)
        .unwrap()
        .build()
        .unwrap()
}
