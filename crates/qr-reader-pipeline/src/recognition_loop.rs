//! Background capture → decode loop.
//!
//! Lifecycle: a [`RecognitionLoop`] is `NotStarted`; [`RecognitionLoop::spawn`]
//! moves it onto its own thread and returns a [`LoopHandle`] (`Running`);
//! [`LoopHandle::stop`] ends it (`Stopped`) and hands back the [`LoopParts`]
//! so a new loop instance can be built later.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use serde::{Deserialize, Serialize};

use crate::affinity::pin_current_thread;
use crate::decoder_state::{DecodeOutcome, DecoderState};
use crate::error::PrepareError;
use crate::frame::{FrameObserver, FrameSource};
use crate::mailbox::Mailbox;
use crate::result::Recognition;

/// Core the loop runs on when started without an explicit context.
pub const APP_CORE: usize = 1;

/// Where the recognition thread runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub name: String,
    /// Thread stack size in bytes; `None` uses the platform default.
    pub stack_size: Option<usize>,
    /// CPU to pin the thread to. Pinning failures are logged and ignored.
    pub core: Option<usize>,
}

impl ExecutionContext {
    pub fn on_core(core: usize) -> Self {
        Self {
            core: Some(core),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            name: "qrCodeDetectTask".to_string(),
            stack_size: None,
            core: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    NotStarted,
    Running,
    Stopped,
}

/// What one loop cycle did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The source had no frame; nothing else happened.
    NoFrame,
    /// The frame could not be staged; a `Recognition::Degraded` was published.
    Degraded(PrepareError),
    Decoded(DecodeOutcome),
}

/// Everything a loop owns, returned when it stops.
pub struct LoopParts {
    pub decoder: DecoderState,
    pub source: Box<dyn FrameSource>,
    pub observer: Option<FrameObserver>,
}

pub struct RecognitionLoop {
    decoder: DecoderState,
    source: Box<dyn FrameSource>,
    observer: Option<FrameObserver>,
    mailbox: Arc<Mailbox>,
    interval: Duration,
    debug: Arc<AtomicBool>,
}

impl RecognitionLoop {
    pub fn new(parts: LoopParts, mailbox: Arc<Mailbox>, interval: Duration) -> Self {
        Self {
            decoder: parts.decoder,
            source: parts.source,
            observer: parts.observer,
            mailbox,
            interval,
            debug: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share a verbosity flag with the owner; only affects diagnostics.
    pub fn with_debug_flag(mut self, debug: Arc<AtomicBool>) -> Self {
        self.debug = debug;
        self
    }

    pub fn decoder(&self) -> &DecoderState {
        &self.decoder
    }

    /// One cycle without the leading wait:
    /// acquire → prepare → observer → release → decode.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        let debug = self.debug.load(Ordering::Relaxed);
        self.decoder.set_debug(debug);
        if debug {
            log::debug!("acquiring frame");
        }

        let Some(frame) = self.source.acquire() else {
            if debug {
                log::debug!("camera capture failed");
            }
            return CycleOutcome::NoFrame;
        };
        let (width, height) = (frame.width, frame.height);
        if debug {
            log::debug!("frame #{} {width}x{height}", frame.sequence);
        }

        let prepared = self.decoder.prepare(width, height, &frame.data);
        if let Some(observer) = self.observer.as_mut() {
            observer(&frame);
        }
        self.source.release(frame);

        match prepared {
            Ok(()) => {
                let outcome = self.decoder.decode(&self.mailbox);
                if debug {
                    log::debug!(
                        "decode: {outcome:?}, mailbox {}/{} ({} dropped)",
                        self.mailbox.len(),
                        self.mailbox.capacity(),
                        self.mailbox.stats().dropped
                    );
                }
                CycleOutcome::Decoded(outcome)
            }
            Err(err) => {
                log::warn!("frame {width}x{height} not staged: {err}");
                self.mailbox.publish(Recognition::Degraded {
                    width,
                    height,
                    reason: err.to_string(),
                });
                CycleOutcome::Degraded(err)
            }
        }
    }

    /// Move the loop onto its own thread.
    pub fn spawn(self, context: &ExecutionContext) -> std::io::Result<LoopHandle> {
        let (stop_tx, stop_rx) = bounded(1);
        let mut builder = thread::Builder::new().name(context.name.clone());
        if let Some(bytes) = context.stack_size {
            builder = builder.stack_size(bytes);
        }

        let core = context.core;
        let thread = builder.spawn(move || {
            if let Some(core) = core {
                match pin_current_thread(core) {
                    Ok(()) => log::debug!("recognition loop pinned to core {core}"),
                    Err(err) => log::warn!("cannot pin recognition loop to core {core}: {err}"),
                }
            }
            self.run(stop_rx)
        })?;

        Ok(LoopHandle {
            stop: Some(stop_tx),
            thread: Some(thread),
        })
    }

    fn run(mut self, stop: Receiver<()>) -> LoopParts {
        log::info!("recognition loop running, interval {:?}", self.interval);
        loop {
            // The inter-frame wait doubles as the stop checkpoint.
            match stop.recv_timeout(self.interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
            self.run_cycle();
        }
        log::info!("recognition loop stopped");
        self.into_parts()
    }

    pub fn into_parts(self) -> LoopParts {
        LoopParts {
            decoder: self.decoder,
            source: self.source,
            observer: self.observer,
        }
    }
}

/// Handle to a running loop. Dropping it stops the loop and discards its parts.
pub struct LoopHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<LoopParts>>,
}

impl LoopHandle {
    pub fn state(&self) -> LoopState {
        match &self.thread {
            Some(thread) if !thread.is_finished() => LoopState::Running,
            _ => LoopState::Stopped,
        }
    }

    /// Signal the loop and block until its thread has exited.
    ///
    /// A cycle already in progress runs to completion first. Returns `None`
    /// if the thread panicked.
    pub fn stop(mut self) -> Option<LoopParts> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Option<LoopParts> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.try_send(());
        }
        let thread = self.thread.take()?;
        match thread.join() {
            Ok(parts) => Some(parts),
            Err(_) => {
                log::error!("recognition thread panicked");
                None
            }
        }
    }
}

impl Drop for LoopHandle {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
