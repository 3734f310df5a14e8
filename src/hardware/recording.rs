// src/hardware/recording.rs - Output driver that records every call
use super::{ChannelId, Direction, HardwareError, Level, OutputDriver};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverCall {
    Export(ChannelId),
    SetDirection(ChannelId, Direction),
    Write(ChannelId, Level),
}

#[derive(Debug, Default)]
struct Recording {
    calls: Vec<DriverCall>,
    levels: HashMap<ChannelId, Level>,
}

/// In-memory driver for dry runs and tests.
///
/// Clones share the same log, so a test can keep one handle while the
/// actuator owns another. Failures can be injected to exercise the
/// best-effort error path; failed calls are still logged.
#[derive(Debug, Clone, Default)]
pub struct RecordingDriver {
    inner: Arc<Mutex<Recording>>,
    failing: Arc<AtomicBool>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Recording> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every subsequent call fail (`true`) or succeed again (`false`).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.lock().calls.clone()
    }

    pub fn writes(&self) -> Vec<(ChannelId, Level)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                DriverCall::Write(channel, level) => Some((*channel, *level)),
                _ => None,
            })
            .collect()
    }

    /// Last level successfully written to `channel`.
    pub fn level(&self, channel: ChannelId) -> Option<Level> {
        self.lock().levels.get(&channel).copied()
    }

    pub fn clear(&self) {
        self.lock().calls.clear();
    }

    fn record(&self, call: DriverCall) -> Result<(), HardwareError> {
        let mut rec = self.lock();
        rec.calls.push(call);
        let channel = match call {
            DriverCall::Export(c) | DriverCall::SetDirection(c, _) | DriverCall::Write(c, _) => c,
        };
        if self.failing.load(Ordering::SeqCst) {
            return Err(HardwareError::Rejected {
                channel,
                reason: "injected failure".to_string(),
            });
        }
        if let DriverCall::Write(channel, level) = call {
            rec.levels.insert(channel, level);
        }
        Ok(())
    }
}

impl OutputDriver for RecordingDriver {
    fn export(&mut self, channel: ChannelId) -> Result<(), HardwareError> {
        self.record(DriverCall::Export(channel))
    }

    fn set_direction(&mut self, channel: ChannelId, direction: Direction) -> Result<(), HardwareError> {
        self.record(DriverCall::SetDirection(channel, direction))
    }

    fn write(&mut self, channel: ChannelId, level: Level) -> Result<(), HardwareError> {
        self.record(DriverCall::Write(channel, level))
    }
}
