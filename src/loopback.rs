//! Capture-to-playback loopback program flow.

use anyhow::{Context, Result};

use crate::audio::{self, loopback_iterations, FrameBuffer, FrameSink, FrameSource, RunStats, StreamLoop};
use crate::cli::LoopbackArgs;
use crate::config::{Config, StreamConfig};
use crate::error::AudioError;

/// Run the fixed-length loopback demo.
///
/// Both devices are opened with the same stream parameters. If the playback
/// device fails to open, the already-open capture device is released.
pub fn run<C, P, FC, FP>(
    args: &LoopbackArgs,
    config: &Config,
    open_capture: FC,
    open_playback: FP,
) -> Result<RunStats>
where
    C: FrameSource,
    P: FrameSink,
    FC: FnOnce(&str, &StreamConfig) -> std::result::Result<C, AudioError>,
    FP: FnOnce(&str, &StreamConfig) -> std::result::Result<P, AudioError>,
{
    let stream = StreamConfig::new(config.sample_rate, config.loopback_channels, config.period_frames)?;
    let capture_device = args.capture_device.as_deref().unwrap_or(config.capture_device);
    let playback_device = args.playback_device.as_deref().unwrap_or(config.playback_device);

    let mut capture = open_capture(capture_device, &stream)
        .with_context(|| format!("Failed to initialize ALSA capture device '{}'", capture_device))?;
    let mut playback = open_playback(playback_device, &stream)
        .with_context(|| format!("Failed to initialize ALSA playback device '{}'", playback_device))?;

    let total_frames = u64::from(config.loopback_duration_secs) * u64::from(capture.params().sample_rate);
    let iterations = loopback_iterations(total_frames, stream.period_frames());

    let mut stream_loop = StreamLoop::new(
        FrameBuffer::new(stream.period_frames(), stream.channels()),
        config.max_consecutive_errors,
    );
    let stats = stream_loop.loopback(&mut capture, &mut playback, iterations)?;

    audio::close(playback);
    audio::close(capture);
    Ok(stats)
}
