use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::camera::FrameSize;
use crate::mailbox::Mailbox;

/// Tunables for a [`QrCodeReader`](crate::QrCodeReader).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderParams {
    /// Result mailbox capacity. Publishes beyond it are dropped.
    pub queue_capacity: usize,
    /// Wait before each capture, in milliseconds.
    pub frame_interval_ms: u64,
    /// Located symbols reported per frame. `1` reports only the first one.
    pub max_symbols_per_frame: usize,
    /// Largest frame size `setup` accepts.
    pub max_frame_size: FrameSize,
    /// Initial per-cycle diagnostics flag.
    pub debug: bool,
}

impl ReaderParams {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

impl Default for ReaderParams {
    fn default() -> Self {
        Self {
            queue_capacity: Mailbox::DEFAULT_CAPACITY,
            frame_interval_ms: 100,
            max_symbols_per_frame: 1,
            max_frame_size: FrameSize::Svga,
            debug: false,
        }
    }
}
