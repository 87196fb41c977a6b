// AmpLink - Inter-Core Communication Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Mailbox request/response sequencing over one channel's register quartet.
//!
//! Each channel carries at most one outstanding command:
//! `IDLE -> CMD_PENDING` (caller posts cmd/data), `CMD_PENDING ->
//! RESPONSE_READY` (responder only), `RESPONSE_READY -> IDLE` (caller
//! clears status after reading the response). There is no queue: posting
//! while a command is pending silently overwrites it, and callers are
//! responsible for not overlapping requests.

use crate::regs::MailboxRegs;
use std::sync::atomic::Ordering;

/// A command value of zero means "no pending command" and is never
/// processed.
pub const CMD_NONE: u32 = 0x0000;
pub const CMD_PING: u32 = 0x0001;
pub const CMD_STATUS: u32 = 0x0010;

pub const RESP_PONG: u32 = 0x8001;
/// STATUS responses carry the low byte of the tick counter OR'd in.
pub const RESP_STATUS: u32 = 0x8010;
/// Marker for any unrecognized non-zero command.
pub const RESP_UNKNOWN: u32 = 0xFFFF;

pub const STATUS_READY: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MailboxState {
    Idle,
    CmdPending,
    ResponseReady,
}

impl MailboxRegs {
    /// Caller side: post a command/data pair. Data is written first so a
    /// responder that observes the command also observes its data.
    pub fn post(&self, cmd: u32, data: u32) {
        self.data.store(data, Ordering::SeqCst);
        self.cmd.store(cmd, Ordering::SeqCst);
    }

    /// Responder side: consume the pending command, if any. Clearing the
    /// command field is the commit point; it doubles as the "processed"
    /// signal for any later reader.
    pub fn take(&self) -> Option<(u32, u32)> {
        let cmd = self.cmd.swap(CMD_NONE, Ordering::SeqCst);
        if cmd == CMD_NONE {
            return None;
        }
        let data = self.data.load(Ordering::SeqCst);
        Some((cmd, data))
    }

    /// Responder side: publish a response. The response word is written
    /// before status goes non-zero, so a poller that sees status ready
    /// reads a valid response.
    pub fn complete(&self, resp: u32) {
        self.resp.store(resp, Ordering::SeqCst);
        self.status.store(STATUS_READY, Ordering::SeqCst);
    }

    /// Caller side: non-blocking response check.
    pub fn poll(&self) -> Option<u32> {
        if self.status.load(Ordering::SeqCst) != 0 {
            Some(self.resp.load(Ordering::SeqCst))
        } else {
            None
        }
    }

    /// Caller side: acknowledge the response. Leaves the response word
    /// intact.
    pub fn clear_response(&self) {
        self.status.store(0, Ordering::SeqCst);
    }

    /// Protocol state as derived from the registers.
    pub fn state(&self) -> MailboxState {
        if self.status.load(Ordering::SeqCst) != 0 {
            MailboxState::ResponseReady
        } else if self.cmd.load(Ordering::SeqCst) != CMD_NONE {
            MailboxState::CmdPending
        } else {
            MailboxState::Idle
        }
    }
}

/// The remote cores' command table.
pub fn execute(cmd: u32, _data: u32, tick: u32) -> u32 {
    match cmd {
        CMD_PING => RESP_PONG,
        CMD_STATUS => RESP_STATUS | (tick & 0xFF),
        _ => RESP_UNKNOWN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_round_trip() {
        let m = MailboxRegs::default();
        assert_eq!(m.state(), MailboxState::Idle);
        assert_eq!(m.poll(), None);

        m.post(CMD_PING, 0x1234_5678);
        assert_eq!(m.state(), MailboxState::CmdPending);

        let (cmd, data) = m.take().unwrap();
        assert_eq!(cmd, CMD_PING);
        assert_eq!(data, 0x1234_5678);
        // take() is the commit point: the command field is now clear.
        assert_eq!(m.state(), MailboxState::Idle);

        m.complete(RESP_PONG);
        assert_eq!(m.state(), MailboxState::ResponseReady);
        assert_eq!(m.poll(), Some(RESP_PONG));

        m.clear_response();
        assert_eq!(m.state(), MailboxState::Idle);
        // Clearing status does not disturb the response word.
        assert_eq!(m.resp.load(std::sync::atomic::Ordering::SeqCst), RESP_PONG);
    }

    #[test]
    fn test_take_on_empty_mailbox() {
        let m = MailboxRegs::default();
        assert_eq!(m.take(), None);

        // A zero command is "no pending command", never a request.
        m.post(CMD_NONE, 0xAAAA_AAAA);
        assert_eq!(m.take(), None);
    }

    #[test]
    fn test_second_post_overwrites_first() {
        let m = MailboxRegs::default();
        m.post(CMD_PING, 1);
        m.post(CMD_STATUS, 2);

        // Only the latest pair is observable; the first is gone. This is
        // the documented single-slot behavior, not a queue.
        assert_eq!(m.take(), Some((CMD_STATUS, 2)));
        assert_eq!(m.take(), None);
    }

    #[test]
    fn test_command_table() {
        assert_eq!(execute(CMD_PING, 0, 7), RESP_PONG);
        assert_eq!(execute(CMD_STATUS, 0, 0x1FE), RESP_STATUS | 0xFE);
        assert_eq!(execute(0x0042, 0, 0), RESP_UNKNOWN);
        assert_eq!(execute(0xBEEF, 9, 3), RESP_UNKNOWN);
    }
}
