//! hciprobe: send the HCI version query to a serial device and dump the reply
//!
//! Usage:
//!   hciprobe <DEVICE>            print the reply as ` xx` hex pairs
//!   hciprobe <DEVICE> --decode   also decode it as Local Version Information
//!   hciprobe --list [--json]     list available serial ports
//!
//! Diagnostics go to stderr and follow `RUST_LOG` (default `warn`).

use anyhow::{Context, Result};
use clap::Parser;
use hciprobe_core::hci::decode_local_version;
use hciprobe_core::protocol::{list_ports, Connection, ConnectionConfig, REQUEST_FRAME};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Query a UART-attached Bluetooth controller and print its raw reply in hex.
#[derive(Clone, Debug, Parser)]
#[command(name = "hciprobe", version)]
struct Args {
    /// Serial device path, e.g. /dev/ttyACM0 or COM3
    #[arg(required_unless_present = "list")]
    device: Option<String>,

    /// List available serial ports and exit
    #[arg(long, conflicts_with = "device")]
    list: bool,

    /// Decode the reply as an HCI Read Local Version Information result
    #[arg(long)]
    decode: bool,

    /// Emit port listings and decoded results as JSON
    #[arg(long)]
    json: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_ports(json: bool) -> Result<()> {
    let ports = list_ports();
    if json {
        println!("{}", serde_json::to_string_pretty(&ports)?);
    } else {
        for port in &ports {
            println!("{}", port);
        }
    }
    Ok(())
}

fn probe(device: String, decode: bool, json: bool) -> Result<()> {
    let mut conn = Connection::open(ConnectionConfig::for_port(device.clone()))
        .with_context(|| format!("failed to open {}", device))?;

    let response = conn
        .exchange(&REQUEST_FRAME)
        .with_context(|| format!("exchange with {} failed", device))?;
    drop(conn);

    debug!("received {} bytes", response.len());
    println!("{}", response);

    if decode {
        match decode_local_version(response.as_bytes()) {
            Ok(info) if json => println!("{}", serde_json::to_string_pretty(&info)?),
            Ok(info) => println!("{}", info),
            Err(e) => eprintln!("decode: {}", e),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();

    if args.list {
        return print_ports(args.json);
    }

    let device = args
        .device
        .context("a serial device path is required")?;
    probe(device, args.decode, args.json)
}
