//! Command-line interface for pcm-capture and pcm-loopback
//!
//! Handles argument parsing, validation and logging configuration.

use std::path::PathBuf;

use clap::{Args, Parser};
use log::LevelFilter;

use crate::audio::wav::HeaderPolicy;
use crate::error::{AudioError, Result};

/// Logging flags shared by both programs.
#[derive(Args, Debug, Clone, Default)]
pub struct Verbosity {
    /// Increase logging verbosity
    /// -v = info, -vv = debug, -vvv = trace
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Verbosity {
    /// Get the log level filter based on verbosity flags
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Error
        } else {
            match self.verbose {
                0 => LevelFilter::Warn,
                1 => LevelFilter::Info,
                2 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }
}

/// Record the default microphone to a 16-bit PCM WAV file
#[derive(Parser, Debug)]
#[command(name = "pcm-capture")]
#[command(version, about, long_about = None)]
pub struct CaptureArgs {
    /// Recording length in seconds
    #[arg(allow_negative_numbers = true)]
    pub duration: i64,

    /// Number of interleaved channels
    #[arg(allow_negative_numbers = true)]
    pub channels: i64,

    /// Output WAV file
    pub output: PathBuf,

    /// ALSA capture device (defaults to the configured device)
    #[arg(long)]
    pub device: Option<String>,

    /// Requested sample rate in Hz; the device may pick the nearest one
    #[arg(long)]
    pub rate: Option<u32>,

    /// Frames transferred per read
    #[arg(long)]
    pub period: Option<usize>,

    /// Rewrite the header sizes from the captured payload when done
    #[arg(long)]
    pub patch_header: bool,

    #[command(flatten)]
    pub verbosity: Verbosity,
}

/// A capture request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub duration_secs: u32,
    pub channels: u32,
    pub header_policy: HeaderPolicy,
}

impl CaptureArgs {
    /// Reject non-positive duration or channel counts before anything is opened.
    pub fn validate(&self) -> Result<CaptureRequest> {
        let duration_secs = u32::try_from(self.duration)
            .ok()
            .filter(|d| *d > 0)
            .ok_or_else(|| AudioError::invalid_config(format!("Invalid duration: {}", self.duration)))?;
        let channels = u32::try_from(self.channels)
            .ok()
            .filter(|c| *c > 0)
            .ok_or_else(|| AudioError::invalid_config(format!("Invalid channels: {}", self.channels)))?;
        let header_policy = if self.patch_header {
            HeaderPolicy::Patched
        } else {
            HeaderPolicy::Declared
        };
        Ok(CaptureRequest {
            duration_secs,
            channels,
            header_policy,
        })
    }
}

/// Capture from the microphone and play it straight back
#[derive(Parser, Debug, Default)]
#[command(name = "pcm-loopback")]
#[command(version, about, long_about = None)]
pub struct LoopbackArgs {
    /// ALSA capture device (defaults to the configured device)
    #[arg(long)]
    pub capture_device: Option<String>,

    /// ALSA playback device (defaults to the configured device)
    #[arg(long)]
    pub playback_device: Option<String>,

    #[command(flatten)]
    pub verbosity: Verbosity,
}

/// Initialize the logging system based on CLI arguments
pub fn init_logging(verbosity: &Verbosity) {
    let mut builder = env_logger::Builder::new();

    // Base level for all modules - keep at warn to suppress noisy deps
    builder.filter_level(LevelFilter::Warn);
    builder.filter_module("pcm_tools", verbosity.log_level());

    // RUST_LOG still wins when set
    builder.parse_default_env();

    builder.format_timestamp_millis().init();
}
