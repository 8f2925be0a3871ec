//! Galahad II pump diagnostics
//!
//! Usage:
//!   galahad-diag detect             # List Lian Li HID endpoints
//!   galahad-diag selftest           # Check every protocol frame offline
//!   galahad-diag hardware           # Send the self-test frames to the pump

use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use galahad_lib::pump::protocol::{HeaderSignature, PacketEncoder, HEADER_CANDIDATES};
use galahad_lib::pump::transport::list_endpoints;
use galahad_lib::pump::validate::{cleanup_frames, self_test_suite};
use galahad_lib::{Connector, HidConnector, PumpModel, Transport};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Pause between frames sent to real hardware.
const HARDWARE_STEP: Duration = Duration::from_millis(500);

/// Lian Li Galahad II lighting diagnostics
#[derive(Parser)]
#[command(name = "galahad-diag", version = VERSION, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Header signature to use (0 = standard, 1-2 = alternates)
    #[arg(long, global = true, default_value_t = 0)]
    header: usize,

    /// Total LEDs assumed for unknown products
    #[arg(long, global = true, default_value_t = 24)]
    leds: u8,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List HID endpoints with the Lian Li vendor id
    Detect {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Build every self-test frame and check its layout
    Selftest,
    /// Send the self-test frames to a connected pump
    Hardware {
        /// Only open this model (trinity, performance, lcd)
        #[arg(long)]
        model: Option<String>,
    },
}

fn setup_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "info" })
    });

    fmt().with_env_filter(filter).with_target(false).init();
}

fn parse_model(name: &str) -> Result<PumpModel> {
    match name.to_ascii_lowercase().as_str() {
        "trinity" => Ok(PumpModel::Trinity),
        "performance" | "trinity-performance" => Ok(PumpModel::TrinityPerformance),
        "lcd" => Ok(PumpModel::Lcd),
        other => bail!("unknown model '{other}', expected trinity, performance or lcd"),
    }
}

fn do_detect(leds: u8, json: bool) -> Result<()> {
    let endpoints = list_endpoints(leds).context("HID enumeration failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&endpoints)?);
        return Ok(());
    }
    if endpoints.is_empty() {
        println!("No Lian Li HID endpoints found");
        return Ok(());
    }

    println!(
        "{:<8} {:<22} {:>5} {:>8} {:>6}  {}",
        "PID", "Model", "Intf", "Page", "Usage", "Accepted"
    );
    for ep in &endpoints {
        println!(
            "0x{:04X}   {:<22} {:>5} 0x{:04X}   0x{:02X}  {}",
            ep.pid,
            ep.model.map_or("unknown", PumpModel::label),
            ep.endpoint.interface,
            ep.endpoint.usage_page,
            ep.endpoint.usage,
            if ep.accepted { "yes" } else { "no" }
        );
    }
    Ok(())
}

fn do_selftest(header: HeaderSignature, leds: u8) -> Result<()> {
    let encoder = PacketEncoder::new(header);
    let cases = self_test_suite(&encoder, leds);

    let mut failed = 0usize;
    for case in &cases {
        let faults = case.check(header);
        if faults.is_empty() {
            println!("  ok    [{}] {}", case.group, case.name);
        } else {
            failed += 1;
            for fault in faults {
                println!("  FAIL  [{}] {}: {fault}", case.group, case.name);
            }
        }
    }

    println!(
        "\n{} frames, {} passed, {} failed ({})",
        cases.len(),
        cases.len() - failed,
        failed,
        header.name
    );
    if failed > 0 {
        bail!("{failed} self-test frame(s) malformed");
    }
    Ok(())
}

fn do_hardware(header: HeaderSignature, leds: u8, model: Option<PumpModel>) -> Result<()> {
    let connector = HidConnector::new(model, leds);
    let mut transport = connector.open().context("could not open pump")?;
    info!(pid = ?transport.product_id(), "pump opened");

    let encoder = PacketEncoder::new(header);
    let cases = self_test_suite(&encoder, leds);
    let mut failed = 0usize;

    for case in &cases {
        match transport.write(&case.packet) {
            Ok(()) => println!("  sent  [{}] {}", case.group, case.name),
            Err(e) => {
                failed += 1;
                warn!(case = %case.name, error = %e, "write failed");
            }
        }
        thread::sleep(HARDWARE_STEP);
    }

    // leave the pump dark and reset
    for packet in cleanup_frames(&encoder) {
        if let Err(e) = transport.write(&packet) {
            warn!(error = %e, "cleanup write failed");
        }
    }

    println!("\n{} frames sent, {} failed", cases.len() - failed, failed);
    if failed > 0 {
        bail!("{failed} hardware write(s) failed");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let header = *HEADER_CANDIDATES.get(cli.header).with_context(|| {
        format!(
            "header index {} out of range 0-{}",
            cli.header,
            HEADER_CANDIDATES.len() - 1
        )
    })?;

    match cli.command {
        Commands::Detect { json } => do_detect(cli.leds, json),
        Commands::Selftest => do_selftest(header, cli.leds),
        Commands::Hardware { model } => {
            let model = model.as_deref().map(parse_model).transpose()?;
            do_hardware(header, cli.leds, model)
        }
    }
}
