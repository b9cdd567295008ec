//! ALSA PCM device session for capture or playback.

use std::fmt;

use alsa::pcm::{HwParams, PCM};
use alsa::{Direction, ValueOr};

use crate::config::StreamConfig;
use crate::error::{AudioError, Result, TransferError};

use super::endpoint::{Endpoint, FrameSink, FrameSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamDirection {
    Capture,
    Playback,
}

impl fmt::Display for StreamDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamDirection::Capture => f.write_str("capture"),
            StreamDirection::Playback => f.write_str("playback"),
        }
    }
}

impl From<StreamDirection> for Direction {
    fn from(direction: StreamDirection) -> Self {
        match direction {
            StreamDirection::Capture => Direction::Capture,
            StreamDirection::Playback => Direction::Playback,
        }
    }
}

/// Parameters negotiated with the ALSA hardware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedParams {
    /// Actual sample rate after negotiation
    pub sample_rate: u32,
    /// Actual number of channels
    pub channels: u32,
    /// Hardware period size in frames. Informational; transfers use
    /// the period size from `StreamConfig`.
    pub hw_period_frames: usize,
}

/// An open PCM handle bound to one direction.
///
/// The handle is closed when the session is dropped, so every exit path
/// releases it.
pub struct DeviceSession {
    pcm: PCM,
    direction: StreamDirection,
    params: NegotiatedParams,
}

impl DeviceSession {
    /// Open `device` and negotiate S16_LE, RW interleaved, the requested
    /// channel count and the nearest supported rate.
    pub fn open(device: &str, direction: StreamDirection, config: &StreamConfig) -> Result<Self> {
        let pcm = PCM::new(device, direction.into(), false).map_err(|source| {
            AudioError::DeviceOpenFailed {
                device: device.to_string(),
                direction,
                source,
            }
        })?;

        let params = negotiate(&pcm, config).map_err(|source| {
            AudioError::ParameterNegotiationFailed {
                device: device.to_string(),
                direction,
                source,
            }
        })?;

        log::info!(
            "ALSA {}: device={}, rate={}, channels={}, period_size={}",
            direction,
            device,
            params.sample_rate,
            params.channels,
            params.hw_period_frames,
        );
        if params.sample_rate != config.sample_rate() {
            log::warn!(
                "ALSA {}: requested {} Hz, device substituted {} Hz",
                direction,
                config.sample_rate(),
                params.sample_rate,
            );
        }

        Ok(Self {
            pcm,
            direction,
            params,
        })
    }
}

fn negotiate(pcm: &PCM, config: &StreamConfig) -> alsa::Result<NegotiatedParams> {
    {
        let hwp = HwParams::any(pcm)?;
        hwp.set_access(StreamConfig::ACCESS)?;
        hwp.set_format(StreamConfig::FORMAT)?;
        hwp.set_channels(config.channels())?;
        hwp.set_rate_near(config.sample_rate(), ValueOr::Nearest)?;
        pcm.hw_params(&hwp)?;
    }

    // Read back actual negotiated parameters
    let hwp = pcm.hw_params_current()?;
    Ok(NegotiatedParams {
        sample_rate: hwp.get_rate()?,
        channels: hwp.get_channels()?,
        hw_period_frames: hwp.get_period_size()? as usize,
    })
}

impl Endpoint for DeviceSession {
    fn direction(&self) -> StreamDirection {
        self.direction
    }

    fn params(&self) -> &NegotiatedParams {
        &self.params
    }

    fn prepare(&mut self) -> std::result::Result<(), TransferError> {
        Ok(self.pcm.prepare()?)
    }

    fn drain(&mut self) -> std::result::Result<(), TransferError> {
        Ok(self.pcm.drain()?)
    }
}

impl FrameSource for DeviceSession {
    fn read_frames(&mut self, buf: &mut [i16]) -> std::result::Result<usize, TransferError> {
        let io = self.pcm.io_i16()?;
        Ok(io.readi(buf)?)
    }
}

impl FrameSink for DeviceSession {
    fn write_frames(&mut self, buf: &[i16]) -> std::result::Result<usize, TransferError> {
        let io = self.pcm.io_i16()?;
        Ok(io.writei(buf)?)
    }
}
