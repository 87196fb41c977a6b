// AmpLink - Inter-Core Communication Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod counters;
pub mod device;
pub mod ipi;
pub mod mailbox;
pub mod mutex;
pub mod regs;
pub mod shmem;

pub use device::{ControlRequest, ControlResponse, DeviceInfo, MappedRegion, SocDevice};
pub use ipi::IpiDispatcher;
pub use mutex::{HwMutexArbiter, MutexGrant};

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("invalid channel id {0} (valid: 0..=1)")]
    InvalidChannel(u32),
    #[error("requested map size {requested:#x} exceeds region size {max:#x}")]
    InvalidMapSize { requested: usize, max: usize },
    #[error("failed to allocate device backing resources")]
    AllocationFailure(#[source] std::io::Error),
    #[error("no such operation '{0}'")]
    NoSuchOperation(String),
}

pub type DevResult<T> = Result<T, DeviceError>;

/// Logical communication path to one simulated remote core.
///
/// Channels are not materialized state; a `Channel` only selects which
/// register quartet and responder worker an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Channel {
    IoCore = 0,
    RtCore = 1,
}

impl Channel {
    pub const COUNT: usize = 2;
    pub const ALL: [Channel; Channel::COUNT] = [Channel::IoCore, Channel::RtCore];

    /// Validate a raw channel id at the control-interface boundary.
    pub fn from_id(id: u32) -> DevResult<Self> {
        match id {
            0 => Ok(Channel::IoCore),
            1 => Ok(Channel::RtCore),
            other => Err(DeviceError::InvalidChannel(other)),
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Bit position of this channel in the IPI registers.
    pub fn bit(self) -> u32 {
        1 << (self as u32)
    }

    pub fn name(self) -> &'static str {
        match self {
            Channel::IoCore => "io-core",
            Channel::RtCore => "rt-core",
        }
    }
}
