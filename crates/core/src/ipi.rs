// AmpLink - Inter-Core Communication Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Interrupt delivery and the simulated remote cores.
//!
//! `send_ipi` and the responder run on different execution contexts on
//! purpose: the caller returns as soon as the registers are written, and
//! the only way to observe the outcome is to poll the channel's status
//! register. Each channel gets exactly one worker fed by a kick queue, so
//! responses for one channel are produced sequentially, while the two
//! channels run independently of each other.

use crate::counters::LinkCounters;
use crate::mailbox;
use crate::regs::RegisterBank;
use crate::{Channel, DevResult, DeviceError};
use std::sync::atomic::Ordering;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

struct ResponderWorker {
    kick: Sender<()>,
    handle: JoinHandle<()>,
}

pub struct IpiDispatcher {
    regs: Arc<RegisterBank>,
    counters: Arc<LinkCounters>,
    workers: Vec<ResponderWorker>,
}

impl IpiDispatcher {
    /// Spawn one responder worker per channel. `delays` holds the
    /// simulated processing latency per channel, indexed by channel id.
    pub fn spawn(
        regs: Arc<RegisterBank>,
        counters: Arc<LinkCounters>,
        delays: [Duration; Channel::COUNT],
    ) -> DevResult<Self> {
        let mut workers = Vec::with_capacity(Channel::COUNT);
        for ch in Channel::ALL {
            let (kick, inbox) = mpsc::channel();
            let regs = Arc::clone(&regs);
            let counters = Arc::clone(&counters);
            let delay = delays[ch.index()];
            let handle = std::thread::Builder::new()
                .name(format!("{}-responder", ch.name()))
                .spawn(move || responder_loop(ch, delay, regs, counters, inbox))
                .map_err(DeviceError::AllocationFailure)?;
            workers.push(ResponderWorker { kick, handle });
        }
        Ok(Self {
            regs,
            counters,
            workers,
        })
    }

    /// Raise the interrupt for `channel` and schedule its responder.
    ///
    /// Returns immediately; the response, if any, appears later in the
    /// channel's status/resp registers.
    pub fn send_ipi(&self, channel: Channel) {
        let bit = channel.bit();
        self.regs.ipi_trigger.store(bit, Ordering::SeqCst);
        self.regs.ipi_status.fetch_or(bit, Ordering::SeqCst);
        self.counters.record_ipi();
        tracing::debug!("IPI raised for {}", channel.name());

        // Only fails once the worker is shut down, which cannot happen
        // while the dispatcher is alive.
        let _ = self.workers[channel.index()].kick.send(());
    }
}

impl Drop for IpiDispatcher {
    fn drop(&mut self) {
        // Disconnect the kick queues, then wait for the workers to drain
        // any pending work and exit.
        for worker in self.workers.drain(..) {
            drop(worker.kick);
            let _ = worker.handle.join();
        }
    }
}

fn responder_loop(
    ch: Channel,
    delay: Duration,
    regs: Arc<RegisterBank>,
    counters: Arc<LinkCounters>,
    inbox: Receiver<()>,
) {
    while inbox.recv().is_ok() {
        // Modeled remote-core processing latency.
        std::thread::sleep(delay);

        let mbox = &regs.mbox[ch.index()];
        if let Some((cmd, data)) = mbox.take() {
            tracing::info!(
                "[{}] command received: cmd={:#06x} data={:#010x}",
                ch.name(),
                cmd,
                data
            );
            let resp = mailbox::execute(cmd, data, counters.next_tick());
            mbox.complete(resp);
            tracing::info!("[{}] response posted: {:#06x}", ch.name(), resp);
        }

        // Interrupt handled, whether or not a command was pending.
        regs.ipi_status.fetch_and(!ch.bit(), Ordering::SeqCst);
    }
}
