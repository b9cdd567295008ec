use alsa::pcm::{Access, Format};

use crate::error::{AudioError, Result};

/// Process-wide settings.
///
/// Defaults come from `config.toml`, which `build.rs` bakes into the binary.
#[derive(Debug, Clone)]
pub struct Config {
    // 设备
    pub capture_device: &'static str,
    pub playback_device: &'static str,

    // 流参数
    pub sample_rate: u32,
    pub period_frames: usize,

    // 回环演示
    pub loopback_duration_secs: u32,
    pub loopback_channels: u32,

    pub max_consecutive_errors: u32,
}

impl Config {
    /// 从编译时设置的环境变量创建配置
    pub fn new() -> std::result::Result<Self, &'static str> {
        Ok(Self {
            capture_device: env!("PCM_CAPTURE_DEVICE"),
            playback_device: env!("PCM_PLAYBACK_DEVICE"),

            sample_rate: env!("PCM_SAMPLE_RATE").parse()
                .map_err(|_| "Failed to parse PCM_SAMPLE_RATE")?,
            period_frames: env!("PCM_PERIOD_FRAMES").parse()
                .map_err(|_| "Failed to parse PCM_PERIOD_FRAMES")?,

            loopback_duration_secs: env!("PCM_LOOPBACK_DURATION_SECS").parse()
                .map_err(|_| "Failed to parse PCM_LOOPBACK_DURATION_SECS")?,
            loopback_channels: env!("PCM_LOOPBACK_CHANNELS").parse()
                .map_err(|_| "Failed to parse PCM_LOOPBACK_CHANNELS")?,

            max_consecutive_errors: env!("PCM_MAX_CONSECUTIVE_ERRORS").parse()
                .map_err(|_| "Failed to parse PCM_MAX_CONSECUTIVE_ERRORS")?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new().expect("Failed to create default Config from build-time environment variables")
    }
}

/// Stream parameters requested from a device session.
///
/// Sample format and access mode are fixed; only rate, channel count and
/// transfer granularity vary. Fields are private so a config handed to a
/// session cannot change underneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    sample_rate: u32,
    channels: u32,
    period_frames: usize,
}

impl StreamConfig {
    pub const FORMAT: Format = Format::S16LE;
    pub const ACCESS: Access = Access::RWInterleaved;
    pub const BYTES_PER_SAMPLE: u32 = 2;

    pub fn new(sample_rate: u32, channels: u32, period_frames: usize) -> Result<Self> {
        if sample_rate == 0 {
            return Err(AudioError::invalid_config("sample rate must be positive"));
        }
        if channels == 0 {
            return Err(AudioError::invalid_config("channel count must be positive"));
        }
        if period_frames == 0 {
            return Err(AudioError::invalid_config("period size must be positive"));
        }
        if period_frames.checked_mul(channels as usize).is_none() {
            return Err(AudioError::invalid_config(format!(
                "period of {} frames x {} channels is too large",
                period_frames, channels
            )));
        }
        Ok(Self {
            sample_rate,
            channels,
            period_frames,
        })
    }

    /// Requested rate. The device may substitute the nearest one it supports.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Frames moved per transfer call.
    pub fn period_frames(&self) -> usize {
        self.period_frames
    }
}
