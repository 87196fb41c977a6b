// AmpLink - Inter-Core Communication Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::Channel;
use bitflags::bitflags;
use std::sync::atomic::{AtomicU32, Ordering};

/// Register space size in bytes. The bank is byte-addressable up to this
/// size; everything past the named registers reads as zero.
pub const REG_SPACE_SIZE: usize = 4096;
/// Shared memory region size in bytes.
pub const SHARED_MEM_SIZE: usize = 32 * 1024;
/// Combined mappable size (registers followed by shared memory).
pub const TOTAL_SIZE: usize = REG_SPACE_SIZE + SHARED_MEM_SIZE;

// Byte offsets of the named registers. These are the external contract:
// callers access the bank through raw mappings and depend on them.
pub const IPI_STATUS: u64 = 0x00;
pub const IPI_TRIGGER: u64 = 0x04;
pub const IPI_CLEAR: u64 = 0x08;
pub const IPI_ENABLE: u64 = 0x0C;
/// First mailbox quartet; channel `c` lives at `MBOX_BASE + c * MBOX_STRIDE`.
pub const MBOX_BASE: u64 = 0x10;
pub const MBOX_STRIDE: u64 = 0x10;
pub const MBOX_CMD: u64 = 0x0;
pub const MBOX_DATA: u64 = 0x4;
pub const MBOX_STATUS: u64 = 0x8;
pub const MBOX_RESP: u64 = 0xC;
pub const HW_MUTEX_REQUEST: u64 = 0x30;
pub const HW_MUTEX_STATUS: u64 = 0x34;
pub const HW_MUTEX_RELEASE: u64 = 0x38;

/// Reset value of `hw_mutex_status`: 16 tracked locks, all free (1 = free).
pub const HW_MUTEX_STATUS_RESET: u32 = 0xFFFF;

bitflags! {
    /// Channel bit positions used by the IPI registers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IpiBits: u32 {
        const IO_CORE = 1 << 0;
        const RT_CORE = 1 << 1;
    }
}

/// Mailbox register quartet for one channel.
///
/// Protocol sequencing over these registers lives in [`crate::mailbox`];
/// this struct is pure storage.
#[derive(Debug, Default)]
pub struct MailboxRegs {
    pub cmd: AtomicU32,
    pub data: AtomicU32,
    pub status: AtomicU32,
    pub resp: AtomicU32,
}

/// The canonical register bank shared by every component.
///
/// There is no access control and no cached copy: any holder of a
/// reference may read or write any field, and all observers see the same
/// storage. Cross-context visibility is what the atomics buy; the bank
/// itself attaches no behavior to writes.
#[derive(Debug, Default)]
pub struct RegisterBank {
    pub ipi_status: AtomicU32,
    pub ipi_trigger: AtomicU32,
    pub ipi_clear: AtomicU32,
    pub ipi_enable: AtomicU32,
    pub mbox: [MailboxRegs; Channel::COUNT],
    pub hw_mutex_request: AtomicU32,
    pub hw_mutex_status: AtomicU32,
    pub hw_mutex_release: AtomicU32,
}

impl RegisterBank {
    /// A bank in its post-reset state.
    pub fn new() -> Self {
        let bank = Self::default();
        bank.apply_reset_defaults();
        bank
    }

    /// Zero the whole region, then restore the two non-zero defaults:
    /// both IPI channels enabled, all hardware mutex bits free.
    pub fn reset(&self) {
        self.ipi_status.store(0, Ordering::SeqCst);
        self.ipi_trigger.store(0, Ordering::SeqCst);
        self.ipi_clear.store(0, Ordering::SeqCst);
        self.ipi_enable.store(0, Ordering::SeqCst);
        for m in &self.mbox {
            m.cmd.store(0, Ordering::SeqCst);
            m.data.store(0, Ordering::SeqCst);
            m.status.store(0, Ordering::SeqCst);
            m.resp.store(0, Ordering::SeqCst);
        }
        self.hw_mutex_request.store(0, Ordering::SeqCst);
        self.hw_mutex_status.store(0, Ordering::SeqCst);
        self.hw_mutex_release.store(0, Ordering::SeqCst);
        self.apply_reset_defaults();
    }

    fn apply_reset_defaults(&self) {
        self.ipi_enable.store(IpiBits::all().bits(), Ordering::SeqCst);
        self.hw_mutex_status
            .store(HW_MUTEX_STATUS_RESET, Ordering::SeqCst);
    }

    /// Word read at a word-aligned byte offset. Reserved space reads zero.
    pub fn read_u32(&self, offset: u64) -> u32 {
        match offset {
            IPI_STATUS => self.ipi_status.load(Ordering::SeqCst),
            IPI_TRIGGER => self.ipi_trigger.load(Ordering::SeqCst),
            IPI_CLEAR => self.ipi_clear.load(Ordering::SeqCst),
            IPI_ENABLE => self.ipi_enable.load(Ordering::SeqCst),
            o if (MBOX_BASE..MBOX_BASE + 2 * MBOX_STRIDE).contains(&o) => {
                let m = &self.mbox[((o - MBOX_BASE) / MBOX_STRIDE) as usize];
                match (o - MBOX_BASE) % MBOX_STRIDE {
                    MBOX_CMD => m.cmd.load(Ordering::SeqCst),
                    MBOX_DATA => m.data.load(Ordering::SeqCst),
                    MBOX_STATUS => m.status.load(Ordering::SeqCst),
                    MBOX_RESP => m.resp.load(Ordering::SeqCst),
                    _ => 0,
                }
            }
            HW_MUTEX_REQUEST => self.hw_mutex_request.load(Ordering::SeqCst),
            HW_MUTEX_STATUS => self.hw_mutex_status.load(Ordering::SeqCst),
            HW_MUTEX_RELEASE => self.hw_mutex_release.load(Ordering::SeqCst),
            _ => 0,
        }
    }

    /// Word write at a word-aligned byte offset. Writes into reserved
    /// space are dropped.
    pub fn write_u32(&self, offset: u64, value: u32) {
        match offset {
            IPI_STATUS => self.ipi_status.store(value, Ordering::SeqCst),
            IPI_TRIGGER => self.ipi_trigger.store(value, Ordering::SeqCst),
            IPI_CLEAR => self.ipi_clear.store(value, Ordering::SeqCst),
            IPI_ENABLE => self.ipi_enable.store(value, Ordering::SeqCst),
            o if (MBOX_BASE..MBOX_BASE + 2 * MBOX_STRIDE).contains(&o) => {
                let m = &self.mbox[((o - MBOX_BASE) / MBOX_STRIDE) as usize];
                match (o - MBOX_BASE) % MBOX_STRIDE {
                    MBOX_CMD => m.cmd.store(value, Ordering::SeqCst),
                    MBOX_DATA => m.data.store(value, Ordering::SeqCst),
                    MBOX_STATUS => m.status.store(value, Ordering::SeqCst),
                    MBOX_RESP => m.resp.store(value, Ordering::SeqCst),
                    _ => {}
                }
            }
            HW_MUTEX_REQUEST => self.hw_mutex_request.store(value, Ordering::SeqCst),
            HW_MUTEX_STATUS => self.hw_mutex_status.store(value, Ordering::SeqCst),
            HW_MUTEX_RELEASE => self.hw_mutex_release.store(value, Ordering::SeqCst),
            _ => {}
        }
    }

    /// Byte read; the containing word is loaded and the lane extracted.
    pub fn read_u8(&self, offset: u64) -> u8 {
        let word = self.read_u32(offset & !3);
        let lane = (offset % 4) as u32;
        ((word >> (lane * 8)) & 0xFF) as u8
    }

    /// Byte write as a read-modify-write of the containing word. The two
    /// halves of the RMW are separate atomic operations; a concurrent
    /// writer to another lane of the same word can be lost, matching the
    /// byte-lane behavior of the modeled interconnect.
    pub fn write_u8(&self, offset: u64, value: u8) {
        let aligned = offset & !3;
        let lane = (offset % 4) as u32;
        let mask = 0xFFu32 << (lane * 8);
        let mut word = self.read_u32(aligned);
        word &= !mask;
        word |= (value as u32) << (lane * 8);
        self.write_u32(aligned, word);
    }

    /// Diagnostic register dump.
    pub fn snapshot(&self) -> serde_json::Value {
        let mbox: Vec<serde_json::Value> = self
            .mbox
            .iter()
            .map(|m| {
                serde_json::json!({
                    "cmd": m.cmd.load(Ordering::Relaxed),
                    "data": m.data.load(Ordering::Relaxed),
                    "status": m.status.load(Ordering::Relaxed),
                    "resp": m.resp.load(Ordering::Relaxed),
                })
            })
            .collect();
        serde_json::json!({
            "ipi_status": self.ipi_status.load(Ordering::Relaxed),
            "ipi_trigger": self.ipi_trigger.load(Ordering::Relaxed),
            "ipi_clear": self.ipi_clear.load(Ordering::Relaxed),
            "ipi_enable": self.ipi_enable.load(Ordering::Relaxed),
            "mbox": mbox,
            "hw_mutex_request": self.hw_mutex_request.load(Ordering::Relaxed),
            "hw_mutex_status": self.hw_mutex_status.load(Ordering::Relaxed),
            "hw_mutex_release": self.hw_mutex_release.load(Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_defaults() {
        let bank = RegisterBank::new();
        assert_eq!(bank.read_u32(IPI_ENABLE), 0x3);
        assert_eq!(bank.read_u32(HW_MUTEX_STATUS), 0xFFFF);
        assert_eq!(bank.read_u32(IPI_STATUS), 0);

        bank.write_u32(IPI_STATUS, 0xDEAD_BEEF);
        bank.mbox[0].cmd.store(0x42, Ordering::SeqCst);
        bank.reset();
        assert_eq!(bank.read_u32(IPI_STATUS), 0);
        assert_eq!(bank.read_u32(MBOX_BASE + MBOX_CMD), 0);
        assert_eq!(bank.read_u32(IPI_ENABLE), 0x3);
        assert_eq!(bank.read_u32(HW_MUTEX_STATUS), 0xFFFF);
    }

    #[test]
    fn test_offset_table_matches_fields() {
        let bank = RegisterBank::new();

        // Every named offset must round-trip through the offset interface
        // and land in the matching field.
        bank.write_u32(IPI_TRIGGER, 0x1);
        assert_eq!(bank.ipi_trigger.load(Ordering::SeqCst), 0x1);

        bank.write_u32(0x20, 0x0010); // channel 1 cmd
        assert_eq!(bank.mbox[1].cmd.load(Ordering::SeqCst), 0x0010);
        bank.write_u32(0x2C, 0x8001); // channel 1 resp
        assert_eq!(bank.mbox[1].resp.load(Ordering::SeqCst), 0x8001);

        bank.write_u32(0x14, 0x1234_5678); // channel 0 data
        assert_eq!(bank.mbox[0].data.load(Ordering::SeqCst), 0x1234_5678);
        bank.write_u32(0x18, 1); // channel 0 status
        assert_eq!(bank.mbox[0].status.load(Ordering::SeqCst), 1);

        bank.write_u32(HW_MUTEX_REQUEST, 0x0F);
        assert_eq!(bank.hw_mutex_request.load(Ordering::SeqCst), 0x0F);
    }

    #[test]
    fn test_reserved_space_reads_zero_and_drops_writes() {
        let bank = RegisterBank::new();
        assert_eq!(bank.read_u32(0x3C), 0);
        assert_eq!(bank.read_u32(0xFFC), 0);
        bank.write_u32(0x100, 0xFFFF_FFFF);
        assert_eq!(bank.read_u32(0x100), 0);
    }

    #[test]
    fn test_byte_lane_access() {
        let bank = RegisterBank::new();
        bank.write_u32(MBOX_BASE + MBOX_DATA, 0x1122_3344);
        assert_eq!(bank.read_u8(0x14), 0x44);
        assert_eq!(bank.read_u8(0x15), 0x33);
        assert_eq!(bank.read_u8(0x16), 0x22);
        assert_eq!(bank.read_u8(0x17), 0x11);

        bank.write_u8(0x15, 0xAB);
        assert_eq!(bank.read_u32(MBOX_BASE + MBOX_DATA), 0x1122_AB44);
    }

    #[test]
    fn test_snapshot_reports_live_values() {
        let bank = RegisterBank::new();
        bank.mbox[0].resp.store(0x8001, Ordering::SeqCst);
        let snap = bank.snapshot();
        assert_eq!(snap["ipi_enable"], 3);
        assert_eq!(snap["mbox"][0]["resp"], 0x8001);
        assert_eq!(snap["hw_mutex_status"], 0xFFFF);
    }
}
