//! Public reader object: setup, start/stop, result retrieval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use qr_reader_engine::EngineFactory;

use crate::camera::{CameraConfig, CameraDriver, CameraPins, FrameSize, PixelFormat};
use crate::decoder_state::DecoderState;
use crate::error::{ReaderError, SetupError};
use crate::frame::{FrameBuffer, FrameObserver, FrameSource};
use crate::mailbox::{Mailbox, MailboxStats, ResultReceiver};
use crate::params::ReaderParams;
use crate::recognition_loop::{
    ExecutionContext, LoopHandle, LoopParts, LoopState, RecognitionLoop, APP_CORE,
};
use crate::result::Recognition;

/// QR code reader driving a camera frame source on a background thread.
///
/// ```no_run
/// # use qr_reader_pipeline::{QrCodeReader, CameraDriver};
/// # fn driver() -> Box<dyn CameraDriver> { unimplemented!() }
/// let mut reader = QrCodeReader::new();
/// reader.setup(driver().as_mut())?;
/// reader.start()?;
/// if let Some(result) = reader.receive_result(std::time::Duration::from_millis(100)) {
///     println!("{result:?}");
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct QrCodeReader {
    params: ReaderParams,
    camera: CameraConfig,
    mailbox: Arc<Mailbox>,
    debug: Arc<AtomicBool>,
    decoder: Option<DecoderState>,
    source: Option<Box<dyn FrameSource>>,
    observer: Option<FrameObserver>,
    handle: Option<LoopHandle>,
    runs: usize,
}

impl QrCodeReader {
    /// Reader with default wiring (AI-Thinker pins, QVGA) and default params.
    pub fn new() -> Self {
        ReaderBuilder::default().build()
    }

    pub fn builder() -> ReaderBuilder {
        ReaderBuilder::default()
    }

    pub fn params(&self) -> &ReaderParams {
        &self.params
    }

    pub fn camera_config(&self) -> &CameraConfig {
        &self.camera
    }

    /// Bring up the camera through `driver` and keep its frame source.
    ///
    /// On error the reader stays un-set-up and must not be started.
    pub fn setup(&mut self, driver: &mut dyn CameraDriver) -> Result<(), SetupError> {
        if self.source.is_some() || self.handle.is_some() {
            return Err(SetupError::AlreadySetUp);
        }
        if !driver.external_memory_available() {
            log::error!("camera setup: no external frame memory");
            return Err(SetupError::NoExternalMemory);
        }
        if self.camera.frame_size > self.params.max_frame_size {
            log::error!(
                "camera setup: frame size {:?} above {:?}",
                self.camera.frame_size,
                self.params.max_frame_size
            );
            return Err(SetupError::UnsupportedFrameSize {
                requested: self.camera.frame_size,
                max: self.params.max_frame_size,
            });
        }
        if self.camera.pixel_format != PixelFormat::Grayscale {
            return Err(SetupError::UnsupportedPixelFormat(self.camera.pixel_format));
        }

        let source = driver.init(&self.camera).map_err(|err| {
            log::error!("camera setup: {err}");
            err
        })?;
        self.source = Some(source);
        if self.decoder.is_none() {
            self.decoder = Some(
                DecoderState::with_quirc()
                    .with_max_symbols_per_frame(self.params.max_symbols_per_frame),
            );
        }

        let (width, height) = self.camera.frame_size.dimensions();
        log::info!(
            "camera ready: {width}x{height} grayscale, xclk {} Hz, {} frame buffer(s)",
            self.camera.xclk_freq_hz,
            self.camera.fb_count
        );
        Ok(())
    }

    /// Start recognition on the application core. No-op when running.
    pub fn start(&mut self) -> Result<(), ReaderError> {
        self.start_on(&ExecutionContext::on_core(APP_CORE))
    }

    /// Start recognition on `context`. No-op when running.
    ///
    /// If the thread cannot be spawned the frame source and decoder are lost
    /// and [`setup`](Self::setup) has to run again.
    pub fn start_on(&mut self, context: &ExecutionContext) -> Result<(), ReaderError> {
        match &self.handle {
            Some(handle) if handle.state() == LoopState::Running => {
                log::debug!("recognition already running");
                return Ok(());
            }
            // Loop thread exited on its own; collect what it left behind.
            Some(_) => self.stop(),
            None => {}
        }

        let (decoder, source) = match (self.decoder.take(), self.source.take()) {
            (Some(decoder), Some(source)) => (decoder, source),
            (decoder, source) => {
                self.decoder = decoder;
                self.source = source;
                return Err(ReaderError::NotSetUp);
            }
        };
        let parts = LoopParts {
            decoder,
            source,
            observer: self.observer.take(),
        };

        let recognition = RecognitionLoop::new(
            parts,
            Arc::clone(&self.mailbox),
            self.params.frame_interval(),
        )
        .with_debug_flag(Arc::clone(&self.debug));
        let handle = recognition.spawn(context)?;

        log::info!(
            "recognition started on {:?} (core {:?})",
            context.name,
            context.core
        );
        self.handle = Some(handle);
        self.runs += 1;
        Ok(())
    }

    /// Stop recognition and wait for the loop thread to exit. No-op when
    /// not running.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        match handle.stop() {
            Some(parts) => {
                self.decoder = Some(parts.decoder);
                self.source = Some(parts.source);
                self.observer = parts.observer;
                log::info!("recognition stopped");
            }
            None => log::error!("recognition loop lost its frame source, run setup again"),
        }
    }

    pub fn is_started(&self) -> bool {
        self.state() == LoopState::Running
    }

    pub fn state(&self) -> LoopState {
        match &self.handle {
            Some(handle) => handle.state(),
            None if self.runs > 0 => LoopState::Stopped,
            None => LoopState::NotStarted,
        }
    }

    /// Wait up to `timeout` for the next result.
    pub fn receive_result(&self, timeout: Duration) -> Option<Recognition> {
        self.mailbox.receive(timeout)
    }

    /// Handle for consuming results from other threads.
    pub fn receiver(&self) -> ResultReceiver {
        ResultReceiver::new(Arc::clone(&self.mailbox))
    }

    /// Toggle per-cycle diagnostics. Takes effect on the next cycle.
    pub fn set_debug(&self, on: bool) {
        self.debug.store(on, Ordering::Relaxed);
    }

    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    pub fn mailbox_stats(&self) -> MailboxStats {
        self.mailbox.stats()
    }
}

impl Default for QrCodeReader {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for QrCodeReader {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Builder for [`QrCodeReader`].
#[derive(Default)]
pub struct ReaderBuilder {
    params: ReaderParams,
    camera: CameraConfig,
    observer: Option<FrameObserver>,
    factory: Option<EngineFactory>,
    source: Option<Box<dyn FrameSource>>,
}

impl ReaderBuilder {
    pub fn pins(mut self, pins: CameraPins) -> Self {
        self.camera.pins = pins;
        self
    }

    pub fn frame_size(mut self, size: FrameSize) -> Self {
        self.camera.frame_size = size;
        self
    }

    /// Replace the whole camera configuration.
    pub fn camera_config(mut self, config: CameraConfig) -> Self {
        self.camera = config;
        self
    }

    pub fn params(mut self, params: ReaderParams) -> Self {
        self.params = params;
        self
    }

    /// Called on the recognition thread with every frame, before release.
    pub fn on_frame(mut self, observer: impl FnMut(&FrameBuffer) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Use a custom decode engine instead of the `rqrr` one.
    pub fn engine(mut self, factory: EngineFactory) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Use an already running frame source; `setup` is then not needed.
    pub fn frame_source(mut self, source: impl FrameSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn build(self) -> QrCodeReader {
        let decoder = match self.factory {
            Some(factory) => DecoderState::new(factory),
            None => DecoderState::with_quirc(),
        }
        .with_max_symbols_per_frame(self.params.max_symbols_per_frame);

        QrCodeReader {
            mailbox: Arc::new(Mailbox::new(self.params.queue_capacity)),
            debug: Arc::new(AtomicBool::new(self.params.debug)),
            params: self.params,
            camera: self.camera,
            decoder: Some(decoder),
            source: self.source,
            observer: self.observer,
            handle: None,
            runs: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Idle;

    impl FrameSource for Idle {
        fn acquire(&mut self) -> Option<FrameBuffer> {
            None
        }

        fn release(&mut self, _frame: FrameBuffer) {}
    }

    #[test]
    fn start_without_setup_is_rejected() {
        let mut reader = QrCodeReader::new();
        assert!(matches!(reader.start(), Err(ReaderError::NotSetUp)));
        assert_eq!(reader.state(), LoopState::NotStarted);
    }

    #[test]
    fn builder_applies_params() {
        let reader = QrCodeReader::builder()
            .params(ReaderParams {
                queue_capacity: 3,
                debug: true,
                ..ReaderParams::default()
            })
            .frame_size(FrameSize::Vga)
            .build();
        assert!(reader.is_debug());
        assert_eq!(reader.camera_config().frame_size, FrameSize::Vga);
        assert_eq!(reader.mailbox.capacity(), 3);
    }

    #[test]
    fn debug_flag_toggles() {
        let reader = QrCodeReader::new();
        assert!(!reader.is_debug());
        reader.set_debug(true);
        assert!(reader.is_debug());
        reader.set_debug(false);
        assert!(!reader.is_debug());
    }

    #[test]
    fn lifecycle_moves_through_states() {
        let mut reader = QrCodeReader::builder()
            .params(ReaderParams {
                frame_interval_ms: 1,
                ..ReaderParams::default()
            })
            .frame_source(Idle)
            .build();
        assert_eq!(reader.state(), LoopState::NotStarted);
        reader.start().expect("start");
        assert_eq!(reader.state(), LoopState::Running);
        reader.stop();
        assert_eq!(reader.state(), LoopState::Stopped);
        reader.start().expect("restart");
        assert!(reader.is_started());
    }
}
