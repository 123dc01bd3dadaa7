use crate::transport::TransportConfig;
use onair_core::IceServerConfig;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_POLL_WINDOW: Duration = Duration::from_secs(60);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_PURGE_CUTOFF: Duration = Duration::from_secs(120);
pub const DEFAULT_DIRECTORY_REFRESH: Duration = Duration::from_secs(5);
pub const DEFAULT_DISCONNECT_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("purge cutoff {cutoff:?} must be greater than poll window {window:?}")]
    RetentionTooShort { cutoff: Duration, window: Duration },
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
    #[error("invalid value {value:?} for {name}")]
    InvalidValue { name: &'static str, value: String },
}

/// Timing and transport settings for one participant's relay session.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub poll_interval: Duration,
    /// Maximum age of a signal still returned by a poll (W).
    pub poll_window: Duration,
    pub sweep_interval: Duration,
    /// Signals older than this are purged. Must exceed `poll_window`.
    pub purge_cutoff: Duration,
    pub directory_refresh_interval: Duration,
    /// How long a transport may stay disconnected before the link fails.
    pub disconnect_grace: Duration,
    pub transport: TransportConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_window: DEFAULT_POLL_WINDOW,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            purge_cutoff: DEFAULT_PURGE_CUTOFF,
            directory_refresh_interval: DEFAULT_DIRECTORY_REFRESH,
            disconnect_grace: DEFAULT_DISCONNECT_GRACE,
            transport: TransportConfig::default(),
        }
    }
}

impl RelayConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let intervals = [
            ("poll_interval", self.poll_interval),
            ("poll_window", self.poll_window),
            ("sweep_interval", self.sweep_interval),
            ("directory_refresh_interval", self.directory_refresh_interval),
        ];
        for (name, value) in intervals {
            if value.is_zero() {
                return Err(ConfigError::ZeroInterval(name));
            }
        }

        if self.purge_cutoff <= self.poll_window {
            return Err(ConfigError::RetentionTooShort {
                cutoff: self.purge_cutoff,
                window: self.poll_window,
            });
        }

        Ok(())
    }

    /// Defaults overridden by `ONAIR_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let millis = |name: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            match lookup(name).filter(|v| !v.trim().is_empty()) {
                Some(value) => value
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .map_err(|_| ConfigError::InvalidValue { name, value }),
                None => Ok(default),
            }
        };

        let mut config = Self {
            poll_interval: millis("ONAIR_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL)?,
            poll_window: millis("ONAIR_POLL_WINDOW_MS", DEFAULT_POLL_WINDOW)?,
            sweep_interval: millis("ONAIR_SWEEP_INTERVAL_MS", DEFAULT_SWEEP_INTERVAL)?,
            purge_cutoff: millis("ONAIR_PURGE_CUTOFF_MS", DEFAULT_PURGE_CUTOFF)?,
            directory_refresh_interval: millis(
                "ONAIR_DIRECTORY_REFRESH_MS",
                DEFAULT_DIRECTORY_REFRESH,
            )?,
            disconnect_grace: millis("ONAIR_DISCONNECT_GRACE_MS", DEFAULT_DISCONNECT_GRACE)?,
            transport: TransportConfig::default(),
        };

        if let Some(urls) = lookup("ONAIR_STUN_URLS") {
            let urls: Vec<String> = urls
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_owned)
                .collect();
            config.transport.ice_servers = if urls.is_empty() {
                Vec::new()
            } else {
                vec![IceServerConfig::stun(urls)]
            };
        }

        config.validate()?;
        Ok(config)
    }
}
