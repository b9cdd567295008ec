//! pcm_tools - ALSA microphone capture to WAV, and capture-to-playback loopback
//!
//! Both programs share one core: a device session negotiated once at startup
//! and a blocking loop that moves fixed-size periods between endpoints.

pub mod audio;
pub mod capture;
pub mod cli;
pub mod config;
pub mod error;
pub mod loopback;
