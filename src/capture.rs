//! Capture-to-file program flow.
//!
//! Validate arguments, open the capture device, write the WAV header from the
//! negotiated format, stream the requested duration into the file.

use std::fs::File;
use std::io::BufWriter;

use anyhow::{Context, Result};

use crate::audio::wav::{WavHeader, WavWriter};
use crate::audio::{self, FrameBuffer, FrameSource, RunStats, StreamLoop};
use crate::cli::CaptureArgs;
use crate::config::{Config, StreamConfig};
use crate::error::AudioError;

/// Run one recording. `open` opens the capture device; the binary passes
/// [`crate::audio::DeviceSession::open`].
///
/// Nothing is opened or created until the arguments validate, and the output
/// file is only created once the device is ready.
pub fn run<S, F>(args: &CaptureArgs, config: &Config, open: F) -> Result<RunStats>
where
    S: FrameSource,
    F: FnOnce(&str, &StreamConfig) -> std::result::Result<S, AudioError>,
{
    let request = args.validate()?;
    let stream = StreamConfig::new(
        args.rate.unwrap_or(config.sample_rate),
        request.channels,
        args.period.unwrap_or(config.period_frames),
    )?;
    let device = args.device.as_deref().unwrap_or(config.capture_device);

    let mut source = open(device, &stream)
        .with_context(|| format!("Failed to initialize ALSA capture device '{}'", device))?;
    let params = source.params().clone();

    let header = WavHeader::for_duration(params.sample_rate, params.channels, request.duration_secs)?;
    let total_frames = u64::from(request.duration_secs) * u64::from(params.sample_rate);

    let file = File::create(&args.output)
        .with_context(|| format!("Error opening WAV file '{}' for writing", args.output.display()))?;
    let mut writer = WavWriter::create(BufWriter::new(file), header)
        .with_context(|| format!("Failed to write WAV header to '{}'", args.output.display()))?;

    let mut stream_loop = StreamLoop::new(
        FrameBuffer::new(stream.period_frames(), params.channels),
        config.max_consecutive_errors,
    );
    let outcome = stream_loop.capture_to_file(&mut source, &mut writer, total_frames);

    // Finalize even when the loop aborted, so a patched header still
    // matches whatever was captured.
    let payload_bytes = writer.payload_bytes();
    let finished = writer
        .finish(request.header_policy)
        .with_context(|| format!("Failed to finalize '{}'", args.output.display()));
    let stats = outcome?;
    finished?;
    audio::close(source);

    log::info!(
        "Wrote {} payload bytes to {} (header declares {:?})",
        payload_bytes,
        args.output.display(),
        request.header_policy,
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::fake::{count, EventLog, ScriptedDevice, Step};
    use crate::audio::StreamDirection;
    use crate::audio::wav::HEADER_LEN;
    use clap::Parser;
    use std::cell::Cell;

    fn config() -> Config {
        Config {
            capture_device: "default",
            playback_device: "default",
            sample_rate: 44100,
            period_frames: 128,
            loopback_duration_secs: 5,
            loopback_channels: 2,
            max_consecutive_errors: 8,
        }
    }

    fn args(argv: &[&str]) -> CaptureArgs {
        CaptureArgs::try_parse_from(std::iter::once("pcm-capture").chain(argv.iter().copied())).unwrap()
    }

    fn u32_at(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    }

    #[test]
    fn records_declared_duration() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.wav");
        let log = EventLog::default();

        let stats = run(&args(&["2", "2", out.to_str().unwrap()]), &config(), |device, stream| {
            assert_eq!(device, "default");
            Ok(ScriptedDevice::new(StreamDirection::Capture, stream.sample_rate(), stream.channels(), &log))
        })
        .unwrap();

        assert_eq!(stats.frames_captured, 2 * 44100);
        let bytes = std::fs::read(&out).unwrap();
        assert_eq!(u32_at(&bytes, 4), 352836);
        assert_eq!(u32_at(&bytes, 40), 2 * 44100 * 2 * 2);
        assert_eq!(bytes.len(), HEADER_LEN + 2 * 44100 * 2 * 2);
        assert_eq!(count(&log, "capture:drain"), 1);
        assert_eq!(count(&log, "capture:release"), 1);
    }

    #[test]
    fn header_uses_negotiated_rate() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.wav");
        let log = EventLog::default();

        run(&args(&["1", "1", out.to_str().unwrap()]), &config(), |_, stream| {
            Ok(ScriptedDevice::new(StreamDirection::Capture, 48000, stream.channels(), &log))
        })
        .unwrap();

        let reader = hound::WavReader::open(&out).unwrap();
        assert_eq!(reader.spec().sample_rate, 48000);
        assert_eq!(reader.duration(), 48000);
    }

    #[test]
    fn overrun_does_not_shorten_the_recording() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.wav");
        let log = EventLog::default();
        let mut cfg = config();
        cfg.sample_rate = 8000;

        let stats = run(&args(&["1", "1", out.to_str().unwrap()]), &cfg, |_, stream| {
            Ok(ScriptedDevice::new(StreamDirection::Capture, stream.sample_rate(), 1, &log)
                .with_script([Step::Frames(100), Step::Xrun]))
        })
        .unwrap();

        assert_eq!(stats.overruns, 1);
        let bytes = std::fs::read(&out).unwrap();
        assert_eq!(u32_at(&bytes, 40), 16000);
        assert_eq!(bytes.len(), HEADER_LEN + 16000);
    }

    #[test]
    fn aborted_capture_keeps_or_patches_the_header() {
        let dir = tempfile::tempdir().unwrap();
        let declared = dir.path().join("declared.wav");
        let patched = dir.path().join("patched.wav");
        let mut cfg = config();
        cfg.sample_rate = 8000;

        for (path, extra) in [(&declared, None), (&patched, Some("--patch-header"))] {
            let log = EventLog::default();
            let mut argv: Vec<&str> = extra.into_iter().collect();
            argv.extend(["1", "1", path.to_str().unwrap()]);
            let script = std::iter::once(Step::Frames(100)).chain(std::iter::repeat_n(Step::Fail("EIO"), 8));
            let result = run(&args(&argv), &cfg, |_, stream| {
                Ok(ScriptedDevice::new(StreamDirection::Capture, stream.sample_rate(), 1, &log)
                    .with_script(script))
            });
            assert!(result.is_err());
        }

        let declared = std::fs::read(&declared).unwrap();
        assert_eq!(declared.len(), HEADER_LEN + 200);
        assert_eq!(u32_at(&declared, 40), 16000);

        let patched = std::fs::read(&patched).unwrap();
        assert_eq!(patched.len(), HEADER_LEN + 200);
        assert_eq!(u32_at(&patched, 4), 36 + 200);
        assert_eq!(u32_at(&patched, 40), 200);
    }

    #[test]
    fn invalid_arguments_open_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.wav");
        let opened = Cell::new(false);

        for argv in [["0", "2"], ["1", "-1"], ["-3", "1"]] {
            let result = run(&args(&[argv[0], argv[1], out.to_str().unwrap()]), &config(), |_, _| {
                opened.set(true);
                Err::<ScriptedDevice, _>(AudioError::invalid_config("unreachable"))
            });
            assert!(result.is_err());
        }

        assert!(!opened.get());
        assert!(!out.exists());
    }

    #[test]
    fn device_failure_creates_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.wav");

        let err = run(&args(&["1", "2", out.to_str().unwrap()]), &config(), |_, _| {
            Err::<ScriptedDevice, _>(AudioError::invalid_config("no such device"))
        })
        .unwrap_err();

        assert!(err.to_string().contains("Failed to initialize ALSA capture device"));
        assert!(!out.exists());
    }

    #[test]
    fn unwritable_output_releases_the_device() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("missing").join("out.wav");
        let log = EventLog::default();

        let result = run(&args(&["1", "1", out.to_str().unwrap()]), &config(), |_, stream| {
            Ok(ScriptedDevice::new(StreamDirection::Capture, stream.sample_rate(), 1, &log))
        });

        assert!(result.is_err());
        assert_eq!(count(&log, "capture:read"), 0);
        assert_eq!(count(&log, "capture:release"), 1);
    }

    #[test]
    fn aborted_capture_releases_the_device() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.wav");
        let log = EventLog::default();

        let result = run(&args(&["1", "1", out.to_str().unwrap()]), &config(), |_, stream| {
            Ok(ScriptedDevice::new(StreamDirection::Capture, stream.sample_rate(), 1, &log)
                .with_script(std::iter::repeat_n(Step::Fail("EIO"), 100)))
        });

        assert!(result.is_err());
        assert_eq!(count(&log, "capture:read"), 8);
        assert_eq!(count(&log, "capture:release"), 1);
    }
}
