//! CLI Entry Point for revdev
//!
//! Provides a command-line interface for:
//! - Hammering one shared session from a writer thread and a reader thread
//! - Reversing a single phrase through the channel
//!
//! # Usage
//!
//! Stress a shared handle:
//! ```bash
//! revdev stress "hello world" --iterations 75
//! ```
//!
//! Reverse once:
//! ```bash
//! revdev reverse "hello"
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use revdev::config::RevdevConfig;
use revdev::{telemetry, ReadMode, ReverseDevice};
use std::path::PathBuf;
use std::thread;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "revdev")]
#[command(about = "Single-slot byte channel that reverses every write", long_about = None)]
struct Cli {
    /// Configuration file (defaults to config/revdev.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a phrase from one thread while another reads, on one shared handle
    Stress {
        /// Phrase the writer sends on every iteration
        phrase: String,

        /// Number of writes and of reads
        #[arg(long, default_value_t = 75)]
        iterations: usize,

        /// Fail reads immediately instead of waiting for the writer
        #[arg(long)]
        non_blocking: bool,
    },

    /// Write a phrase once and print what the channel gives back
    Reverse {
        /// Phrase to reverse
        phrase: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RevdevConfig::load_from(path),
        None => RevdevConfig::load(),
    }
    .context("Failed to load configuration")?;
    config.validate()?;
    telemetry::init_from_config(&config).map_err(|e| anyhow!(e))?;

    let device = ReverseDevice::register(&config.device)?;

    match cli.command {
        Commands::Stress {
            phrase,
            iterations,
            non_blocking,
        } => run_stress(
            &device,
            &phrase,
            iterations,
            ReadMode::from_blocking(!non_blocking),
        ),
        Commands::Reverse { phrase } => run_reverse(&device, &phrase),
    }
}

fn run_reverse(device: &ReverseDevice, phrase: &str) -> Result<()> {
    let session = device.open()?;
    session.write(phrase.as_bytes())?;
    let out = session.read(device.buffer_size(), ReadMode::NonBlocking)?;
    session.close();

    println!("{}", String::from_utf8_lossy(&out));
    Ok(())
}

fn run_stress(device: &ReverseDevice, phrase: &str, iterations: usize, mode: ReadMode) -> Result<()> {
    let session = device.open()?;
    let max_len = device.buffer_size();
    info!(session = session.id(), iterations, ?mode, "starting stress run");

    let writer = {
        let session = session.clone();
        let payload = phrase.as_bytes().to_vec();
        thread::Builder::new()
            .name("writer".into())
            .spawn(move || -> revdev::Result<usize> {
                for _ in 0..iterations {
                    session.write(&payload)?;
                }
                Ok(iterations)
            })
            .context("Failed to spawn writer thread")?
    };

    let reader = {
        let session = session.clone();
        thread::Builder::new()
            .name("reader".into())
            .spawn(move || -> revdev::Result<usize> {
                let mut delivered = 0;
                for read in 1..=iterations {
                    match session.read(max_len, mode) {
                        Ok(bytes) if !bytes.is_empty() => {
                            println!("Read({}): {}", read, String::from_utf8_lossy(&bytes));
                            delivered += 1;
                        }
                        Ok(_) => {}
                        Err(err) if err.is_retryable() => {
                            debug!(read, %err, "read returned without data");
                        }
                        Err(err) => return Err(err),
                    }
                }
                Ok(delivered)
            })
            .context("Failed to spawn reader thread")?
    };

    let writes = writer
        .join()
        .map_err(|_| anyhow!("writer thread panicked"))?
        .context("writer failed")?;
    let reads = reader
        .join()
        .map_err(|_| anyhow!("reader thread panicked"))?
        .context("reader failed")?;

    session.close();
    info!(writes, reads, "stress run finished");
    println!("{}", serde_json::to_string_pretty(&session.stats())?);
    Ok(())
}
