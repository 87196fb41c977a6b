// AmpLink - Inter-Core Communication Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! The device facade: one instance owns the register bank, the shared
//! memory block and the responder workers, and exposes the control
//! operations the environment forwards to it.

use crate::counters::LinkCounters;
use crate::ipi::IpiDispatcher;
use crate::mailbox::{CMD_PING, RESP_PONG};
use crate::mutex::HwMutexArbiter;
use crate::regs::{RegisterBank, REG_SPACE_SIZE, SHARED_MEM_SIZE, TOTAL_SIZE};
use crate::shmem::SharedMemory;
use crate::{Channel, DevResult, DeviceError};
use amplink_config::SocDescriptor;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Device geometry, as reported to mapping callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct DeviceInfo {
    pub core_count: u32,
    pub register_region_size: u32,
    pub shared_region_size: u32,
    pub register_offset: u32,
    pub shared_offset: u32,
}

/// A control request as it arrives from the environment, one synchronous
/// call each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
    GetInfo,
    SendIpi { channel: u32 },
    Ping { channel: u32 },
    GetStatus,
    SendMessage { channel: u32, cmd: u32, data: u32 },
    Reset,
    Describe,
}

impl ControlRequest {
    /// Decode a named operation with numeric arguments. Unknown names or
    /// a mismatched argument list are rejected the same way: there is no
    /// such operation with that shape.
    pub fn from_name(name: &str, args: &[u32]) -> DevResult<Self> {
        match (name, args) {
            ("get_info", []) => Ok(Self::GetInfo),
            ("send_ipi", [channel]) => Ok(Self::SendIpi { channel: *channel }),
            ("ping", [channel]) => Ok(Self::Ping { channel: *channel }),
            ("get_status", []) => Ok(Self::GetStatus),
            ("send_message", [channel, cmd, data]) => Ok(Self::SendMessage {
                channel: *channel,
                cmd: *cmd,
                data: *data,
            }),
            ("reset", []) => Ok(Self::Reset),
            ("describe", []) => Ok(Self::Describe),
            _ => Err(DeviceError::NoSuchOperation(name.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlResponse {
    Info(DeviceInfo),
    /// `None` when the poll window elapsed without a response.
    Pong(Option<u32>),
    Status(u32),
    Text(String),
    Unit,
}

/// One simulated SoC communication substrate.
///
/// The register bank and shared memory are allocated once here and
/// released when the device is dropped; every other component holds a
/// reference. Dropping the device also shuts down the responder workers.
pub struct SocDevice {
    regs: Arc<RegisterBank>,
    shmem: Arc<SharedMemory>,
    counters: Arc<LinkCounters>,
    dispatcher: IpiDispatcher,
    online: [AtomicBool; Channel::COUNT],
    last_cmd: AtomicU32,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl SocDevice {
    /// Bring up a device with default timing.
    pub fn new() -> DevResult<Self> {
        Self::with_config(&SocDescriptor::default())
    }

    pub fn with_config(desc: &SocDescriptor) -> DevResult<Self> {
        let regs = Arc::new(RegisterBank::new());
        let shmem = Arc::new(SharedMemory::new(SHARED_MEM_SIZE));
        let counters = Arc::new(LinkCounters::new());
        let delays = [desc.channel_delay(0), desc.channel_delay(1)];
        let dispatcher =
            IpiDispatcher::spawn(Arc::clone(&regs), Arc::clone(&counters), delays)?;

        tracing::info!(
            "device up: {:#x} bytes registers + {:#x} bytes shared memory",
            REG_SPACE_SIZE,
            SHARED_MEM_SIZE
        );

        Ok(Self {
            regs,
            shmem,
            counters,
            dispatcher,
            online: Default::default(),
            last_cmd: AtomicU32::new(0),
            poll_interval: desc.poll.interval(),
            poll_timeout: desc.poll.timeout(),
        })
    }

    /// Raw access to the register bank. The bank has no access control of
    /// its own; this is the same storage the responders observe.
    pub fn registers(&self) -> Arc<RegisterBank> {
        Arc::clone(&self.regs)
    }

    pub fn shared_memory(&self) -> Arc<SharedMemory> {
        Arc::clone(&self.shmem)
    }

    pub fn counters(&self) -> &LinkCounters {
        &self.counters
    }

    /// Arbiter handle over this device's mutex registers.
    pub fn mutex_arbiter(&self) -> HwMutexArbiter {
        HwMutexArbiter::new(Arc::clone(&self.regs))
    }

    pub fn info(&self) -> DeviceInfo {
        DeviceInfo {
            core_count: 6, // 4 application cores + 2 remote cores
            register_region_size: REG_SPACE_SIZE as u32,
            shared_region_size: SHARED_MEM_SIZE as u32,
            register_offset: 0,
            shared_offset: REG_SPACE_SIZE as u32,
        }
    }

    /// Trigger the IPI for a channel. Fails only for an out-of-range id.
    pub fn send_ipi(&self, channel: u32) -> DevResult<()> {
        let ch = Channel::from_id(channel)?;
        self.dispatcher.send_ipi(ch);
        Ok(())
    }

    /// Post a command/data pair into a channel's mailbox. Does not raise
    /// the IPI; pair with [`SocDevice::send_ipi`]. Posting over a pending
    /// command silently overwrites it.
    pub fn send_message(&self, channel: u32, cmd: u32, data: u32) -> DevResult<()> {
        let ch = Channel::from_id(channel)?;
        self.regs.mbox[ch.index()].post(cmd, data);
        self.last_cmd.store(cmd, Ordering::SeqCst);
        self.counters.record_message();
        tracing::debug!(
            "message posted to {}: cmd={:#06x} data={:#010x}",
            ch.name(),
            cmd,
            data
        );
        Ok(())
    }

    /// PING convenience: post the command, raise the IPI, poll for the
    /// response within the configured window and acknowledge it.
    ///
    /// `Ok(None)` means the window elapsed without a response; that is a
    /// caller-level timeout, not a device error.
    pub fn ping(&self, channel: u32) -> DevResult<Option<u32>> {
        let ch = Channel::from_id(channel)?;
        self.send_message(channel, CMD_PING, 0)?;
        self.dispatcher.send_ipi(ch);

        let resp = self.poll_response(ch);
        if resp == Some(RESP_PONG) {
            self.online[ch.index()].store(true, Ordering::SeqCst);
        }
        Ok(resp)
    }

    /// Bounded poll loop over a channel's status register, acknowledging
    /// the response if one shows up.
    fn poll_response(&self, ch: Channel) -> Option<u32> {
        let mbox = &self.regs.mbox[ch.index()];
        let deadline = Instant::now() + self.poll_timeout;
        loop {
            if let Some(resp) = mbox.poll() {
                mbox.clear_response();
                return Some(resp);
            }
            if Instant::now() >= deadline {
                tracing::warn!("{}: no response within poll window", ch.name());
                return None;
            }
            std::thread::sleep(self.poll_interval);
        }
    }

    /// Which remote cores have answered a ping since the last reset, as a
    /// bitmask (bit 0 = I/O core, bit 1 = RT core).
    pub fn get_status(&self) -> u32 {
        self.online
            .iter()
            .enumerate()
            .fold(0, |acc, (i, online)| {
                acc | ((online.load(Ordering::SeqCst) as u32) << i)
            })
    }

    /// Zero all registers, restore the reset defaults and clear the
    /// counters. Idempotent.
    pub fn reset(&self) {
        self.regs.reset();
        self.counters.reset();
        for online in &self.online {
            online.store(false, Ordering::SeqCst);
        }
        self.last_cmd.store(0, Ordering::SeqCst);
        tracing::info!("device reset");
    }

    /// Human-readable state report. Diagnostic only: the format is free
    /// to change and nothing should parse it.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        out.push_str("=== AmpLink 6-core SoC link ===\n");
        out.push_str("Topology:\n");
        out.push_str("  - 4x application cores\n");
        for ch in Channel::ALL {
            let state = if self.online[ch.index()].load(Ordering::SeqCst) {
                "Online"
            } else {
                "Offline"
            };
            out.push_str(&format!("  - 1x {} ({})\n", ch.name(), state));
        }
        out.push_str("Communication:\n");
        out.push_str(&format!(
            "  - per-core mailbox, {} channels\n",
            Channel::COUNT
        ));
        out.push_str(&format!(
            "  - {} KiB shared memory @ offset {:#x}\n",
            SHARED_MEM_SIZE / 1024,
            REG_SPACE_SIZE
        ));
        out.push_str("Statistics:\n");
        out.push_str(&format!("  - IPIs sent: {}\n", self.counters.ipi_count()));
        out.push_str(&format!(
            "  - Messages sent: {}\n",
            self.counters.msg_count()
        ));
        out.push_str(&format!(
            "  - Last command: {:#06x}\n",
            self.last_cmd.load(Ordering::SeqCst)
        ));
        out
    }

    /// Expose the combined registers+shared-memory block for direct
    /// access. Accesses through the returned view hit the live storage on
    /// every operation; nothing is cached, matching the modeled
    /// non-cached hardware mapping.
    pub fn map(&self, len: usize) -> DevResult<MappedRegion> {
        if len > TOTAL_SIZE {
            return Err(DeviceError::InvalidMapSize {
                requested: len,
                max: TOTAL_SIZE,
            });
        }
        tracing::debug!("mapping {:#x} bytes of device memory", len);
        Ok(MappedRegion {
            regs: Arc::clone(&self.regs),
            shmem: Arc::clone(&self.shmem),
            len,
        })
    }

    /// Dispatch boundary for named operations coming from the
    /// environment.
    pub fn control(&self, request: ControlRequest) -> DevResult<ControlResponse> {
        match request {
            ControlRequest::GetInfo => Ok(ControlResponse::Info(self.info())),
            ControlRequest::SendIpi { channel } => {
                self.send_ipi(channel)?;
                Ok(ControlResponse::Unit)
            }
            ControlRequest::Ping { channel } => Ok(ControlResponse::Pong(self.ping(channel)?)),
            ControlRequest::GetStatus => Ok(ControlResponse::Status(self.get_status())),
            ControlRequest::SendMessage { channel, cmd, data } => {
                self.send_message(channel, cmd, data)?;
                Ok(ControlResponse::Unit)
            }
            ControlRequest::Reset => {
                self.reset();
                Ok(ControlResponse::Unit)
            }
            ControlRequest::Describe => Ok(ControlResponse::Text(self.describe())),
        }
    }

    /// Diagnostic snapshot of registers and counters.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "registers": self.regs.snapshot(),
            "counters": {
                "ipi_count": self.counters.ipi_count(),
                "msg_count": self.counters.msg_count(),
            },
            "online": [
                self.online[0].load(Ordering::Relaxed),
                self.online[1].load(Ordering::Relaxed),
            ],
            "last_cmd": self.last_cmd.load(Ordering::Relaxed),
        })
    }
}

/// Direct view over the combined register + shared memory block.
///
/// Offsets are relative to the start of the register bank; the shared
/// memory begins at `REG_SPACE_SIZE`. Word accesses are assembled from
/// byte lanes, little-endian, so a view may straddle the region boundary.
/// Out-of-range accesses report `None`/`false` rather than faulting.
pub struct MappedRegion {
    regs: Arc<RegisterBank>,
    shmem: Arc<SharedMemory>,
    len: usize,
}

impl MappedRegion {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn read_u8(&self, offset: usize) -> Option<u8> {
        if offset >= self.len {
            return None;
        }
        if offset < REG_SPACE_SIZE {
            Some(self.regs.read_u8(offset as u64))
        } else {
            self.shmem.read_u8(offset - REG_SPACE_SIZE)
        }
    }

    pub fn write_u8(&self, offset: usize, value: u8) -> bool {
        if offset >= self.len {
            return false;
        }
        if offset < REG_SPACE_SIZE {
            self.regs.write_u8(offset as u64, value);
            true
        } else {
            self.shmem.write_u8(offset - REG_SPACE_SIZE, value)
        }
    }

    pub fn read_u32(&self, offset: usize) -> Option<u32> {
        let b0 = self.read_u8(offset)? as u32;
        let b1 = self.read_u8(offset + 1)? as u32;
        let b2 = self.read_u8(offset + 2)? as u32;
        let b3 = self.read_u8(offset + 3)? as u32;
        Some(b0 | (b1 << 8) | (b2 << 16) | (b3 << 24))
    }

    pub fn write_u32(&self, offset: usize, value: u32) -> bool {
        self.write_u8(offset, (value & 0xFF) as u8)
            && self.write_u8(offset + 1, ((value >> 8) & 0xFF) as u8)
            && self.write_u8(offset + 2, ((value >> 16) & 0xFF) as u8)
            && self.write_u8(offset + 3, ((value >> 24) & 0xFF) as u8)
    }
}
