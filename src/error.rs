//! Error types for device sessions and streaming loops.

use std::io;

use thiserror::Error;

use crate::audio::StreamDirection;

pub type Result<T> = std::result::Result<T, AudioError>;

/// Fatal errors. Any of these aborts the current program.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Error opening PCM device '{device}' for {direction}")]
    DeviceOpenFailed {
        device: String,
        direction: StreamDirection,
        #[source]
        source: alsa::Error,
    },

    #[error("Error setting HW params on '{device}' for {direction}")]
    ParameterNegotiationFailed {
        device: String,
        direction: StreamDirection,
        #[source]
        source: alsa::Error,
    },

    #[error("{direction} failed {count} times in a row, giving up")]
    TooManyTransferErrors {
        direction: StreamDirection,
        count: u32,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl AudioError {
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Outcome of a failed transfer, prepare or drain call.
///
/// `Xrun` is the EPIPE case: an overrun on capture, an underrun on playback.
/// It is recoverable by preparing the device again. Everything else is
/// unclassified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("xrun")]
    Xrun,

    #[error("{0}")]
    Other(String),
}

impl From<alsa::Error> for TransferError {
    fn from(e: alsa::Error) -> Self {
        if io::Error::from_raw_os_error(e.errno()).kind() == io::ErrorKind::BrokenPipe {
            TransferError::Xrun
        } else {
            TransferError::Other(e.to_string())
        }
    }
}
