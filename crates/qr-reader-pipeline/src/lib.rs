//! Frame-to-result QR recognition pipeline.
//!
//! This crate wires together a frame source, a reusable decoder state and a
//! bounded result mailbox:
//!
//! ```text
//! FrameSource::acquire → DecoderState::prepare → observer → FrameSource::release
//!                      → DecoderState::decode → Mailbox::publish → receive_result
//! ```
//!
//! [`QrCodeReader`] owns the pieces and runs the loop on a dedicated thread.
//! Results reach any number of consumer threads through [`ResultReceiver`]
//! handles; each result is delivered to exactly one of them.

mod affinity;
mod camera;
mod controller;
mod decoder_state;
mod error;
mod frame;
mod mailbox;
mod params;
mod recognition_loop;
mod result;

pub use camera::{CameraConfig, CameraDriver, CameraPins, FrameSize, PixelFormat};
pub use controller::{QrCodeReader, ReaderBuilder};
pub use decoder_state::{DecodeOutcome, DecoderState};
pub use error::{CameraInitError, PrepareError, ReaderError, SetupError};
pub use frame::{FrameBuffer, FrameObserver, FrameSource};
pub use mailbox::{Mailbox, MailboxStats, ResultReceiver};
pub use params::ReaderParams;
pub use recognition_loop::{
    CycleOutcome, ExecutionContext, LoopHandle, LoopParts, LoopState, RecognitionLoop, APP_CORE,
};
pub use result::Recognition;

pub use qr_reader_core::{DataType, DecodedSymbol, PAYLOAD_CAPACITY};
pub use qr_reader_engine::{DecodeEngine, EngineError, EngineFactory, QuircEngine};
