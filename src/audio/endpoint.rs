//! Traits the streaming loops are written against.

use crate::error::TransferError;

use super::alsa_device::{NegotiatedParams, StreamDirection};

/// An opened PCM endpoint. Dropping it releases the underlying handle.
pub trait Endpoint {
    fn direction(&self) -> StreamDirection;

    /// Parameters the device actually accepted.
    fn params(&self) -> &NegotiatedParams;

    /// Put the device back into the prepared state after an xrun.
    fn prepare(&mut self) -> Result<(), TransferError>;

    /// Block until every queued frame has been played (or, for capture,
    /// stop the stream).
    fn drain(&mut self) -> Result<(), TransferError>;
}

/// A capture endpoint.
pub trait FrameSource: Endpoint {
    /// Read interleaved frames into `buf`. Returns the number of frames read.
    fn read_frames(&mut self, buf: &mut [i16]) -> Result<usize, TransferError>;
}

/// A playback endpoint.
pub trait FrameSink: Endpoint {
    /// Write interleaved frames from `buf`. Returns the number of frames accepted.
    fn write_frames(&mut self, buf: &[i16]) -> Result<usize, TransferError>;
}

/// Drain an endpoint. A failure is logged and otherwise ignored.
pub fn drain<E: Endpoint>(endpoint: &mut E) {
    if let Err(e) = endpoint.drain() {
        log::warn!("Failed to drain {} device: {}", endpoint.direction(), e);
    }
}

/// Release an endpoint's handle. Call [`drain`] first to flush queued audio.
pub fn close<E: Endpoint>(endpoint: E) {
    let direction = endpoint.direction();
    drop(endpoint);
    log::debug!("{} device released", direction);
}
