//! audio - Device sessions, streaming loops and the WAV container writer
//!
//! Uses ALSA for PCM I/O. Everything is synchronous and single-threaded:
//! each transfer call blocks until a full period has been read or written.

mod alsa_device;
mod endpoint;
#[cfg(test)]
pub(crate) mod fake;
mod stream;
pub mod wav;

pub use alsa_device::{DeviceSession, NegotiatedParams, StreamDirection};
pub use endpoint::{close, drain, Endpoint, FrameSink, FrameSource};
pub use stream::{loopback_iterations, FrameBuffer, RunStats, StreamLoop};
