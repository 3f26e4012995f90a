use qr_reader_engine::EngineError;

use crate::camera::{FrameSize, PixelFormat};

/// Why a frame could not be staged into the decoder.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PrepareError {
    #[error("frame has zero width or height")]
    EmptyFrame,

    #[error("frame buffer too short (expected {expected} bytes, got {got})")]
    ShortBuffer { expected: usize, got: usize },

    #[error("engine image buffer too short (expected {expected} bytes, got {got})")]
    EngineBuffer { expected: usize, got: usize },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Raised by a [`CameraDriver`](crate::CameraDriver) that failed to bring up
/// the sensor.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("camera init failed: {0}")]
pub struct CameraInitError(pub String);

/// Fatal setup failures. The reader must not be started after one of these.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    #[error("no external frame memory available")]
    NoExternalMemory,

    #[error(transparent)]
    CameraInit(#[from] CameraInitError),

    #[error("frame size {requested:?} exceeds the supported maximum {max:?}")]
    UnsupportedFrameSize { requested: FrameSize, max: FrameSize },

    #[error("pixel format {0:?} is not supported, frames must be grayscale")]
    UnsupportedPixelFormat(PixelFormat),

    #[error("camera already set up")]
    AlreadySetUp,
}

/// Errors returned when starting the recognition loop.
#[derive(thiserror::Error, Debug)]
pub enum ReaderError {
    #[error("reader has no frame source, call setup() first")]
    NotSetUp,

    #[error("failed to spawn recognition thread: {0}")]
    Spawn(#[from] std::io::Error),
}
