//! Blocking period-by-period transfer loops.
//!
//! - Capture → WAV: read a period, append it to the file, until the frame
//!   target is reached.
//! - Capture → playback: read a period, write the same buffer back out, for
//!   a fixed number of iterations.
//!
//! Xruns are reported, the device is prepared again and the loop carries on.
//! The lost frames are not backfilled. Unclassified errors are reported and
//! counted; too many in a row aborts the loop.

use std::io::{Seek, Write};

use crate::error::{AudioError, Result, TransferError};

use super::alsa_device::StreamDirection;
use super::endpoint::{self, Endpoint, FrameSink, FrameSource};
use super::wav::WavWriter;

/// One period of interleaved samples, allocated once and reused.
#[derive(Debug)]
pub struct FrameBuffer {
    samples: Vec<i16>,
    channels: usize,
}

impl FrameBuffer {
    pub fn new(period_frames: usize, channels: u32) -> Self {
        let channels = channels as usize;
        Self {
            samples: vec![0i16; period_frames * channels],
            channels,
        }
    }

    pub fn period_frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// The first `frames` frames.
    pub fn frames(&self, frames: usize) -> &[i16] {
        &self.samples[..frames.min(self.period_frames()) * self.channels]
    }

    pub fn frames_mut(&mut self, frames: usize) -> &mut [i16] {
        let len = frames.min(self.period_frames()) * self.channels;
        &mut self.samples[..len]
    }
}

/// What happened during one loop run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub frames_captured: u64,
    pub frames_played: u64,
    pub overruns: u32,
    pub underruns: u32,
    pub capture_errors: u32,
    pub playback_errors: u32,
    pub playback_attempts: u64,
}

/// Number of whole periods in `total_frames`. The remainder is dropped.
pub fn loopback_iterations(total_frames: u64, period_frames: usize) -> u64 {
    total_frames / period_frames as u64
}

/// Counts consecutive unclassified failures in one direction.
struct ErrorBudget {
    direction: StreamDirection,
    limit: u32,
    consecutive: u32,
}

impl ErrorBudget {
    fn new(direction: StreamDirection, limit: u32) -> Self {
        Self {
            direction,
            limit,
            consecutive: 0,
        }
    }

    fn reset(&mut self) {
        self.consecutive = 0;
    }

    /// A limit of 0 never trips.
    fn charge(&mut self) -> Result<()> {
        self.consecutive += 1;
        if self.limit > 0 && self.consecutive >= self.limit {
            return Err(AudioError::TooManyTransferErrors {
                direction: self.direction,
                count: self.consecutive,
            });
        }
        Ok(())
    }
}

fn recover<E: Endpoint>(endpoint: &mut E, budget: &mut ErrorBudget) -> Result<()> {
    match endpoint.prepare() {
        Ok(()) => budget.reset(),
        Err(e) => {
            log::error!("Failed to recover PCM {}: {}", endpoint.direction(), e);
            budget.charge()?;
        }
    }
    Ok(())
}

pub struct StreamLoop {
    buffer: FrameBuffer,
    max_consecutive_errors: u32,
}

impl StreamLoop {
    /// `max_consecutive_errors` of 0 retries unclassified errors forever.
    pub fn new(buffer: FrameBuffer, max_consecutive_errors: u32) -> Self {
        Self {
            buffer,
            max_consecutive_errors,
        }
    }

    /// Read from `source` into `sink` until `total_frames` frames have been
    /// captured, then drain the source.
    ///
    /// The last read asks only for the frames still missing, so a fault-free
    /// run appends exactly `total_frames` frames.
    pub fn capture_to_file<S, W>(
        &mut self,
        source: &mut S,
        sink: &mut WavWriter<W>,
        total_frames: u64,
    ) -> Result<RunStats>
    where
        S: FrameSource,
        W: Write + Seek,
    {
        let mut stats = RunStats::default();
        let mut budget = ErrorBudget::new(StreamDirection::Capture, self.max_consecutive_errors);
        let period = self.buffer.period_frames();

        log::info!(
            "Capture started: target={} frames, period={}, ch={}",
            total_frames,
            period,
            self.buffer.channels(),
        );

        while stats.frames_captured < total_frames {
            let remaining = total_frames - stats.frames_captured;
            let want = usize::try_from(remaining).map_or(period, |r| r.min(period));

            match source.read_frames(self.buffer.frames_mut(want)) {
                Ok(0) => {
                    log::error!("Error capturing audio: device returned no frames");
                    stats.capture_errors += 1;
                    budget.charge()?;
                }
                Ok(frames) => {
                    let frames = frames.min(want);
                    sink.write_samples(self.buffer.frames(frames))?;
                    stats.frames_captured += frames as u64;
                    budget.reset();
                }
                Err(TransferError::Xrun) => {
                    log::warn!("Buffer overrun during capture");
                    stats.overruns += 1;
                    recover(source, &mut budget)?;
                }
                Err(TransferError::Other(e)) => {
                    log::error!("Error capturing audio: {}", e);
                    stats.capture_errors += 1;
                    budget.charge()?;
                }
            }
        }

        endpoint::drain(source);

        log::info!(
            "Capture finished: frames={}, payload={} bytes, overruns={}, errors={}",
            stats.frames_captured,
            sink.payload_bytes(),
            stats.overruns,
            stats.capture_errors,
        );
        Ok(stats)
    }

    /// Copy `iterations` periods from `capture` to `playback`, then drain
    /// playback and capture, in that order.
    ///
    /// A failed read still forwards whatever the buffer holds, and every
    /// iteration makes exactly one playback attempt.
    pub fn loopback<C, P>(&mut self, capture: &mut C, playback: &mut P, iterations: u64) -> Result<RunStats>
    where
        C: FrameSource,
        P: FrameSink,
    {
        let mut stats = RunStats::default();
        let mut capture_budget =
            ErrorBudget::new(StreamDirection::Capture, self.max_consecutive_errors);
        let mut playback_budget =
            ErrorBudget::new(StreamDirection::Playback, self.max_consecutive_errors);
        let period = self.buffer.period_frames();

        log::info!(
            "Loopback started: iterations={}, period={}, ch={}",
            iterations,
            period,
            self.buffer.channels(),
        );

        for _ in 0..iterations {
            match capture.read_frames(self.buffer.frames_mut(period)) {
                Ok(0) => {
                    log::error!("Error capturing audio: device returned no frames");
                    stats.capture_errors += 1;
                    capture_budget.charge()?;
                }
                Ok(frames) => {
                    stats.frames_captured += frames as u64;
                    capture_budget.reset();
                }
                Err(TransferError::Xrun) => {
                    log::warn!("Buffer overrun during capture");
                    stats.overruns += 1;
                    recover(capture, &mut capture_budget)?;
                }
                Err(TransferError::Other(e)) => {
                    log::error!("Error capturing audio: {}", e);
                    stats.capture_errors += 1;
                    capture_budget.charge()?;
                }
            }

            stats.playback_attempts += 1;
            match playback.write_frames(self.buffer.frames(period)) {
                Ok(0) => {
                    log::error!("Error playing audio: device accepted no frames");
                    stats.playback_errors += 1;
                    playback_budget.charge()?;
                }
                Ok(frames) => {
                    stats.frames_played += frames as u64;
                    playback_budget.reset();
                }
                Err(TransferError::Xrun) => {
                    log::warn!("Buffer underrun during playback");
                    stats.underruns += 1;
                    recover(playback, &mut playback_budget)?;
                }
                Err(TransferError::Other(e)) => {
                    log::error!("Error playing audio: {}", e);
                    stats.playback_errors += 1;
                    playback_budget.charge()?;
                }
            }
        }

        endpoint::drain(playback);
        endpoint::drain(capture);

        log::info!(
            "Loopback finished: captured={}, played={}, overruns={}, underruns={}",
            stats.frames_captured,
            stats.frames_played,
            stats.overruns,
            stats.underruns,
        );
        Ok(stats)
    }
}
