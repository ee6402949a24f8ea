//! Connection options resolved from a [`config::Config`].

use crate::error::Error;
use config::Config;
use std::time::Duration;

/// Default namespace prefix for published event names.
pub const DEFAULT_BROADCAST_PREFIX: &str = "$socket.";

/// Default health-check period, which is also the reconnection cadence.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(3000);

/// Resolved connection options.
///
/// Built from configuration by [`Options::from_config`] or filled in
/// manually. The frame codec is not part of the options because encoder and
/// decoder functions cannot live in a configuration file; install one with
/// [`Connection::with_codec`](crate::Connection::with_codec).
#[derive(Debug, Clone)]
pub struct Options {
    /// Target address for `start()` when none is passed explicitly.
    pub address: Option<String>,
    /// Namespace prepended to every published event name.
    pub broadcast_prefix: String,
    /// Period of the transport health check. Reconnection attempts happen at
    /// this cadence; there is no backoff.
    pub reconnect_interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            address: None,
            broadcast_prefix: DEFAULT_BROADCAST_PREFIX.to_string(),
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
        }
    }
}

impl Options {
    /// Resolves options from configuration, falling back to defaults for
    /// absent keys.
    ///
    /// # Configuration Keys
    ///
    /// - `address`: target address for `start()` (no default)
    /// - `broadcast_prefix`: event namespace (defaults to `"$socket."`)
    /// - `reconnect_interval`: health-check period in milliseconds, must be
    ///   positive (defaults to 3000)
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let address = config.get_string("address").ok();

        let broadcast_prefix = config
            .get_string("broadcast_prefix")
            .unwrap_or_else(|_| DEFAULT_BROADCAST_PREFIX.to_string());

        let reconnect_interval = match config.get_int("reconnect_interval") {
            Ok(ms) => {
                let ms = u64::try_from(ms).ok().filter(|ms| *ms > 0).ok_or_else(|| {
                    Error::Config(config::ConfigError::Message(format!(
                        "reconnect_interval must be a positive number of milliseconds, got {ms}"
                    )))
                })?;
                Duration::from_millis(ms)
            }
            Err(_) => DEFAULT_RECONNECT_INTERVAL,
        };

        Ok(Self {
            address,
            broadcast_prefix,
            reconnect_interval,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_keys_are_absent() {
        let config = Config::builder().build().unwrap();
        let options = Options::from_config(&config).unwrap();
        assert_eq!(options.address, None);
        assert_eq!(options.broadcast_prefix, DEFAULT_BROADCAST_PREFIX);
        assert_eq!(options.reconnect_interval, DEFAULT_RECONNECT_INTERVAL);
    }

    #[test]
    fn configured_keys_override_defaults() {
        let config = Config::builder()
            .set_default("address", "wss://example.test/socket")
            .unwrap()
            .set_default("broadcast_prefix", "bus.")
            .unwrap()
            .set_default("reconnect_interval", 5000)
            .unwrap()
            .build()
            .unwrap();

        let options = Options::from_config(&config).unwrap();
        assert_eq!(options.address.as_deref(), Some("wss://example.test/socket"));
        assert_eq!(options.broadcast_prefix, "bus.");
        assert_eq!(options.reconnect_interval, Duration::from_millis(5000));
    }

    #[test]
    fn rejects_non_positive_interval() {
        let config = Config::builder()
            .set_default("reconnect_interval", 0)
            .unwrap()
            .build()
            .unwrap();
        assert!(matches!(
            Options::from_config(&config),
            Err(Error::Config(_))
        ));
    }
}
