//! Dispatch tunables and the optional `fleetcmd.toml` config file.
//!
//! Every tunable has a default matching the documented behaviour, so an
//! absent file, an empty file, and a file that sets a single key are all
//! valid.
//!
//! ```toml
//! [dispatch]
//! batch_size = 25
//! poll_interval_secs = 10
//! poll_deadline_secs = 3600
//! ```

use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Instances requested per discovery page.
pub const DEFAULT_PAGE_SIZE: u32 = 100;
/// Largest page the instance listing API accepts.
pub const MAX_PAGE_SIZE: u32 = 100;
/// Instances per command invocation.
pub const DEFAULT_BATCH_SIZE: NonZeroUsize = NonZeroUsize::new(50).unwrap();
/// Largest instance list a single invocation (and a single result page)
/// can carry.
pub const MAX_BATCH_SIZE: usize = 50;
/// Remote execution timeout for the script.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 600;
/// Wait between result polls.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
/// Wait between submission and the first poll.
pub const DEFAULT_SETTLE_DELAY_SECS: u64 = 5;

/// Tunables for discovery, batching, and polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    pub page_size: u32,
    pub batch_size: NonZeroUsize,
    pub command_timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub settle_delay_secs: u64,
    /// Upper bound on how long one batch is polled. `None` polls until a
    /// terminal status or a request error.
    pub poll_deadline_secs: Option<u64>,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            settle_delay_secs: DEFAULT_SETTLE_DELAY_SECS,
            poll_deadline_secs: None,
        }
    }
}

impl DispatchSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    pub fn poll_deadline(&self) -> Option<Duration> {
        self.poll_deadline_secs.map(Duration::from_secs)
    }

    /// Reject values the remote API would refuse or that would make the
    /// poll loop spin.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::Invalid {
                field: "page_size",
                reason: format!("must be between 1 and {MAX_PAGE_SIZE}, got {}", self.page_size),
            });
        }
        if self.batch_size.get() > MAX_BATCH_SIZE {
            return Err(ConfigError::Invalid {
                field: "batch_size",
                reason: format!("must be at most {MAX_BATCH_SIZE}, got {}", self.batch_size),
            });
        }
        if self.command_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "command_timeout_secs",
                reason: "must be positive".to_string(),
            });
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "poll_interval_secs",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Contents of the optional config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    pub dispatch: DispatchSettings,
}

impl FleetConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: FleetConfig = toml::from_str(content)?;
        config.dispatch.validate()?;
        Ok(config)
    }
}
