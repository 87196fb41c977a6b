// AmpLink - Inter-Core Communication Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default schema version for YAML descriptors
fn default_schema_version() -> String {
    "1.0".to_string()
}

/// Simulated processing latency of the I/O core in microseconds.
pub const DEFAULT_IO_DELAY_US: u64 = 1000;
/// Simulated processing latency of the real-time core in microseconds.
/// Deliberately much shorter than the I/O core's; the RT core is the
/// low-latency half of the pair.
pub const DEFAULT_RT_DELAY_US: u64 = 50;

fn default_io_delay() -> u64 {
    DEFAULT_IO_DELAY_US
}

fn default_poll_interval_us() -> u64 {
    1000
}

fn default_poll_timeout_ms() -> u64 {
    100
}

/// Per-channel responder tuning.
///
/// The delay models remote-core processing latency only; it is a tuning
/// knob, not part of the register-level contract.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChannelTiming {
    pub id: u32,
    pub name: String,
    #[serde(default = "default_io_delay")]
    pub response_delay_us: u64,
}

/// Polling window used by the convenience operations (ping and friends).
/// The protocol engine itself never blocks; these bounds belong to the
/// caller side of the contract.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct PollConfig {
    #[serde(default = "default_poll_interval_us")]
    pub interval_us: u64,
    #[serde(default = "default_poll_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_us: default_poll_interval_us(),
            timeout_ms: default_poll_timeout_ms(),
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_micros(self.interval_us)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Top-level SoC descriptor.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SocDescriptor {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub name: String,
    #[serde(default)]
    pub channels: Vec<ChannelTiming>,
    #[serde(default)]
    pub poll: PollConfig,
}

impl Default for SocDescriptor {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            name: "amplink-soc".to_string(),
            channels: vec![
                ChannelTiming {
                    id: 0,
                    name: "io-core".to_string(),
                    response_delay_us: DEFAULT_IO_DELAY_US,
                },
                ChannelTiming {
                    id: 1,
                    name: "rt-core".to_string(),
                    response_delay_us: DEFAULT_RT_DELAY_US,
                },
            ],
            poll: PollConfig::default(),
        }
    }
}

impl SocDescriptor {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read SoC descriptor {:?}", path))?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse SoC descriptor YAML")
    }

    /// Responder delay for a channel id, falling back to the built-in
    /// defaults when the descriptor does not mention the channel.
    pub fn channel_delay(&self, id: u32) -> Duration {
        let us = self
            .channels
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.response_delay_us)
            .unwrap_or(match id {
                1 => DEFAULT_RT_DELAY_US,
                _ => DEFAULT_IO_DELAY_US,
            });
        Duration::from_micros(us)
    }
}
