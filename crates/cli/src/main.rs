// AmpLink - Inter-Core Communication Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use amplink_config::SocDescriptor;
use amplink_core::mailbox::{CMD_STATUS, RESP_PONG};
use amplink_core::regs::{self, RegisterBank};
use amplink_core::{ControlRequest, ControlResponse, MappedRegion, SocDevice};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::error;

const EXIT_PASS: u8 = 0;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

fn parse_u32(s: &str) -> Result<u32, String> {
    let trimmed = s.trim();
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value '{}': {}", s, e))
    } else {
        u32::from_str(trimmed).map_err(|e| format!("Invalid value '{}': {}", s, e))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "AmpLink inter-core link simulator", long_about = None)]
struct Cli {
    /// Path to a SoC descriptor (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose protocol tracing
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the device geometry
    Info,
    /// Ping a remote core and wait for the PONG
    Ping {
        #[arg(value_parser = parse_u32)]
        channel: u32,
    },
    /// Post a mailbox command, raise the IPI and poll for the response
    Send {
        #[arg(value_parser = parse_u32)]
        channel: u32,
        #[arg(value_parser = parse_u32)]
        cmd: u32,
        #[arg(value_parser = parse_u32)]
        data: u32,
    },
    /// Print the human-readable device report
    Describe,
    /// Print a JSON snapshot of registers and counters
    Snapshot,
    /// Dispatch a named control operation with numeric arguments
    Op {
        name: String,
        #[arg(value_parser = parse_u32)]
        args: Vec<u32>,
    },
    /// Run the full register-bank exercise sequence
    Exercise,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .init();
    }

    let desc = match &cli.config {
        Some(path) => match SocDescriptor::from_file(path) {
            Ok(desc) => desc,
            Err(e) => {
                error!("{:#}", e);
                return ExitCode::from(EXIT_CONFIG_ERROR);
            }
        },
        None => SocDescriptor::default(),
    };

    let dev = match SocDevice::with_config(&desc) {
        Ok(dev) => dev,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
    };

    match run(&dev, cli.command) {
        Ok(()) => ExitCode::from(EXIT_PASS),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}

fn run(dev: &SocDevice, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Info => {
            let info = dev.info();
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Commands::Ping { channel } => match dev.ping(channel)? {
            Some(resp) => println!("channel {}: response {:#06x}", channel, resp),
            None => anyhow::bail!("channel {} did not respond within the poll window", channel),
        },
        Commands::Send { channel, cmd, data } => {
            dev.send_message(channel, cmd, data)?;
            dev.send_ipi(channel)?;
            match poll_response(&dev.registers(), channel as usize) {
                Some(resp) => println!("channel {}: response {:#06x}", channel, resp),
                None => anyhow::bail!(
                    "channel {} did not respond within the poll window",
                    channel
                ),
            }
        }
        Commands::Describe => print!("{}", dev.describe()),
        Commands::Snapshot => println!("{}", serde_json::to_string_pretty(&dev.snapshot())?),
        Commands::Op { name, args } => {
            let request = ControlRequest::from_name(&name, &args)?;
            match dev.control(request)? {
                ControlResponse::Text(text) => print!("{}", text),
                ControlResponse::Info(info) => {
                    println!("{}", serde_json::to_string_pretty(&info)?)
                }
                other => println!("{:?}", other),
            }
        }
        Commands::Exercise => exercise(dev)?,
    }
    Ok(())
}

/// Bounded status poll over a channel, acknowledging the response.
fn poll_response(regs: &Arc<RegisterBank>, channel: usize) -> Option<u32> {
    let deadline = Instant::now() + Duration::from_millis(100);
    loop {
        if let Some(resp) = regs.mbox[channel].poll() {
            regs.mbox[channel].clear_response();
            return Some(resp);
        }
        if Instant::now() >= deadline {
            return None;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}

fn dump_registers(map: &MappedRegion) {
    println!("register state:");
    println!("  IPI_STATUS:  {:#010x}", map.read_u32(0x00).unwrap_or(0));
    println!("  IPI_ENABLE:  {:#010x}", map.read_u32(0x0C).unwrap_or(0));
    println!("  MBOX0_CMD:   {:#010x}", map.read_u32(0x10).unwrap_or(0));
    println!("  MBOX0_RESP:  {:#010x}", map.read_u32(0x1C).unwrap_or(0));
    println!("  MUTEX_STAT:  {:#010x}", map.read_u32(0x34).unwrap_or(0));
}

/// End-to-end tour of the register bank: the sequence a bring-up engineer
/// would run against the real part.
fn exercise(dev: &SocDevice) -> anyhow::Result<()> {
    println!("AmpLink register bank exercise");
    println!("------------------------------");

    dev.reset();
    let info = dev.info();
    println!(
        "geometry: {} cores, {} B registers + {} B shared memory",
        info.core_count, info.register_region_size, info.shared_region_size
    );

    let map = dev.map(regs::TOTAL_SIZE)?;
    dump_registers(&map);

    for channel in 0..2u32 {
        match dev.ping(channel)? {
            Some(resp) if resp == RESP_PONG => {
                println!("channel {}: response {:#06x} (PONG)", channel, resp)
            }
            Some(resp) => println!("channel {}: unexpected response {:#06x}", channel, resp),
            None => anyhow::bail!("channel {} did not respond within the poll window", channel),
        }
    }

    dev.send_message(1, CMD_STATUS, 0)?;
    dev.send_ipi(1)?;
    match poll_response(&dev.registers(), 1) {
        Some(resp) => println!("rt-core status word: {:#06x}", resp),
        None => anyhow::bail!("rt-core did not answer the status query"),
    }

    let arbiter = dev.mutex_arbiter();
    let first = arbiter.request(0x0001);
    let second = arbiter.request(0x0003);
    println!(
        "mutex: first request acquired {:#06x}; second acquired {:#06x}, contended {:#06x}",
        first.acquired, second.acquired, second.contended
    );
    arbiter.release(0x0003);

    let banner = b"amplink shared memory";
    for (i, b) in banner.iter().enumerate() {
        map.write_u8(regs::REG_SPACE_SIZE + i, *b);
    }
    let mut readback = vec![0u8; banner.len()];
    dev.shared_memory().read_bytes(0, &mut readback);
    println!(
        "shared memory readback: {}",
        String::from_utf8_lossy(&readback)
    );

    dump_registers(&map);
    print!("{}", dev.describe());
    Ok(())
}
