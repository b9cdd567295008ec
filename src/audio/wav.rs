//! Canonical 44-byte RIFF/WAVE header and a streaming PCM payload writer.
//!
//! The header declares its payload size up front, computed from the
//! requested duration. [`HeaderPolicy::Patched`] rewrites the two size
//! fields after capture from the bytes actually written.

use std::io::{self, Seek, SeekFrom, Write};

use crate::config::StreamConfig;
use crate::error::{AudioError, Result};

pub const HEADER_LEN: usize = 44;

const BITS_PER_SAMPLE: u16 = 16;
const PCM_FORMAT_TAG: u16 = 1;
const FMT_CHUNK_LEN: u32 = 16;

// Byte offsets of the two size fields.
const RIFF_SIZE_OFFSET: u64 = 4;
const DATA_SIZE_OFFSET: u64 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderPolicy {
    /// Keep the size computed from the requested duration.
    Declared,
    /// Seek back and write the true payload size after capture.
    Patched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub channels: u16,
    pub sample_rate: u32,
    pub payload_size: u32,
}

impl WavHeader {
    /// Header for `duration_secs` of 16-bit interleaved PCM.
    pub fn for_duration(sample_rate: u32, channels: u32, duration_secs: u32) -> Result<Self> {
        let channels = u16::try_from(channels)
            .ok()
            .filter(|ch| ch.checked_mul(BITS_PER_SAMPLE / 8).is_some())
            .ok_or_else(|| AudioError::invalid_config(format!("{} channels do not fit a WAV header", channels)))?;
        let payload_size = u64::from(duration_secs)
            * u64::from(sample_rate)
            * u64::from(channels)
            * u64::from(StreamConfig::BYTES_PER_SAMPLE);
        let payload_size = u32::try_from(payload_size)
            .ok()
            .filter(|size| size.checked_add(36).is_some())
            .ok_or_else(|| {
                AudioError::invalid_config(format!(
                    "{}s at {} Hz x {} ch exceeds the 4 GiB WAV limit",
                    duration_secs, sample_rate, channels
                ))
            })?;
        Ok(Self {
            channels,
            sample_rate,
            payload_size,
        })
    }

    pub fn block_align(&self) -> u16 {
        self.channels * (BITS_PER_SAMPLE / 8)
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate.saturating_mul(u32::from(self.block_align()))
    }

    /// RIFF chunk size: everything after the first 8 bytes.
    pub fn chunk_size(&self) -> u32 {
        36 + self.payload_size
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        let mut pos = 0;
        let mut put = |bytes: &[u8]| {
            out[pos..pos + bytes.len()].copy_from_slice(bytes);
            pos += bytes.len();
        };

        // RIFF Header
        put(b"RIFF");
        put(&self.chunk_size().to_le_bytes());
        put(b"WAVE");

        // fmt sub-chunk
        put(b"fmt ");
        put(&FMT_CHUNK_LEN.to_le_bytes());
        put(&PCM_FORMAT_TAG.to_le_bytes());
        put(&self.channels.to_le_bytes());
        put(&self.sample_rate.to_le_bytes());
        put(&self.byte_rate().to_le_bytes());
        put(&self.block_align().to_le_bytes());
        put(&BITS_PER_SAMPLE.to_le_bytes());

        // data sub-chunk
        put(b"data");
        put(&self.payload_size.to_le_bytes());

        out
    }
}

/// Writes the header once, then appends little-endian samples.
pub struct WavWriter<W: Write + Seek> {
    inner: W,
    header: WavHeader,
    payload_bytes: u64,
    scratch: Vec<u8>,
}

impl<W: Write + Seek> WavWriter<W> {
    pub fn create(mut inner: W, header: WavHeader) -> io::Result<Self> {
        inner.write_all(&header.to_bytes())?;
        Ok(Self {
            inner,
            header,
            payload_bytes: 0,
            scratch: Vec::new(),
        })
    }

    pub fn header(&self) -> &WavHeader {
        &self.header
    }

    /// Payload bytes appended so far.
    pub fn payload_bytes(&self) -> u64 {
        self.payload_bytes
    }

    pub fn write_samples(&mut self, samples: &[i16]) -> io::Result<()> {
        self.scratch.clear();
        self.scratch.reserve(samples.len() * 2);
        for sample in samples {
            self.scratch.extend_from_slice(&sample.to_le_bytes());
        }
        self.inner.write_all(&self.scratch)?;
        self.payload_bytes += self.scratch.len() as u64;
        Ok(())
    }

    /// Apply `policy`, flush, and hand back the underlying writer.
    pub fn finish(mut self, policy: HeaderPolicy) -> io::Result<W> {
        if policy == HeaderPolicy::Patched {
            let payload = u32::try_from(self.payload_bytes)
                .ok()
                .filter(|size| size.checked_add(36).is_some())
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "payload too large for a WAV header"))?;
            self.header.payload_size = payload;
            self.inner.seek(SeekFrom::Start(RIFF_SIZE_OFFSET))?;
            self.inner.write_all(&self.header.chunk_size().to_le_bytes())?;
            self.inner.seek(SeekFrom::Start(DATA_SIZE_OFFSET))?;
            self.inner.write_all(&payload.to_le_bytes())?;
            self.inner.seek(SeekFrom::End(0))?;
        }
        self.inner.flush()?;
        Ok(self.inner)
    }
}
