//! Scripted in-memory endpoints for driving the streaming loops in tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::error::TransferError;

use super::alsa_device::{NegotiatedParams, StreamDirection};
use super::endpoint::{Endpoint, FrameSink, FrameSource};

/// Shared record of every call made on any fake endpoint, in order.
pub type EventLog = Rc<RefCell<Vec<String>>>;

#[derive(Debug, Clone)]
pub enum Step {
    /// Transfer this many frames (clamped to the buffer size).
    Frames(usize),
    Xrun,
    Fail(&'static str),
}

pub struct ScriptedDevice {
    direction: StreamDirection,
    params: NegotiatedParams,
    script: VecDeque<Step>,
    log: EventLog,
    prepare_fails: bool,
    next_sample: i16,
    pub written: Rc<RefCell<Vec<Vec<i16>>>>,
}

impl ScriptedDevice {
    pub fn new(direction: StreamDirection, sample_rate: u32, channels: u32, log: &EventLog) -> Self {
        Self {
            direction,
            params: NegotiatedParams {
                sample_rate,
                channels,
                hw_period_frames: 1024,
            },
            script: VecDeque::new(),
            log: log.clone(),
            prepare_fails: false,
            next_sample: 1,
            written: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Steps to play before falling back to full transfers.
    pub fn with_script(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.script.extend(steps);
        self
    }

    pub fn with_failing_prepare(mut self) -> Self {
        self.prepare_fails = true;
        self
    }

    fn record(&self, what: &str) {
        self.log.borrow_mut().push(format!("{}:{}", self.direction, what));
    }

    fn next_step(&mut self, capacity: usize) -> Result<usize, TransferError> {
        match self.script.pop_front() {
            None => Ok(capacity),
            Some(Step::Frames(n)) => Ok(n.min(capacity)),
            Some(Step::Xrun) => Err(TransferError::Xrun),
            Some(Step::Fail(msg)) => Err(TransferError::Other(msg.to_string())),
        }
    }
}

impl Endpoint for ScriptedDevice {
    fn direction(&self) -> StreamDirection {
        self.direction
    }

    fn params(&self) -> &NegotiatedParams {
        &self.params
    }

    fn prepare(&mut self) -> Result<(), TransferError> {
        self.record("prepare");
        if self.prepare_fails {
            return Err(TransferError::Other("prepare failed".to_string()));
        }
        Ok(())
    }

    fn drain(&mut self) -> Result<(), TransferError> {
        self.record("drain");
        Ok(())
    }
}

impl FrameSource for ScriptedDevice {
    fn read_frames(&mut self, buf: &mut [i16]) -> Result<usize, TransferError> {
        self.record("read");
        let channels = self.params.channels as usize;
        let frames = self.next_step(buf.len() / channels)?;
        for sample in &mut buf[..frames * channels] {
            *sample = self.next_sample;
            self.next_sample = self.next_sample.wrapping_add(1);
        }
        Ok(frames)
    }
}

impl FrameSink for ScriptedDevice {
    fn write_frames(&mut self, buf: &[i16]) -> Result<usize, TransferError> {
        self.record("write");
        self.written.borrow_mut().push(buf.to_vec());
        let channels = self.params.channels as usize;
        self.next_step(buf.len() / channels)
    }
}

impl Drop for ScriptedDevice {
    fn drop(&mut self) {
        self.record("release");
    }
}

pub fn count(log: &EventLog, event: &str) -> usize {
    log.borrow().iter().filter(|e| *e == event).count()
}
