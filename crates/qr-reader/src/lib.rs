//! High-level facade crate for the `qr-reader-*` workspace.
//!
//! This crate provides:
//! - re-exports of the pipeline, engine and core crates,
//! - (feature-gated) helpers that feed `image::GrayImage`s through the same
//!   decoder the camera pipeline uses, and a replay camera driver that plays
//!   a list of images back as camera frames.
//!
//! ## Quickstart
//!
//! ```no_run
//! use qr_reader::{QrCodeReader, ReplayCamera};
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut camera = ReplayCamera::from_paths(["ticket.png"])?;
//! let mut reader = QrCodeReader::new();
//! reader.setup(&mut camera)?;
//! reader.start()?;
//!
//! while let Some(result) = reader.receive_result(Duration::from_millis(500)) {
//!     if let Some(text) = result.symbol().and_then(|s| s.payload_str()) {
//!         println!("{text}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `qr_reader::core`: grayscale views, the `DecodedSymbol` record, loggers.
//! - `qr_reader::engine`: the `DecodeEngine` seam and the `rqrr` engine.
//! - `qr_reader::pipeline`: decoder state, mailbox, recognition loop, reader.
//! - `qr_reader::still` (feature `image`): still images and replay camera.

pub use qr_reader_core as core;
pub use qr_reader_engine as engine;
pub use qr_reader_pipeline as pipeline;

pub use qr_reader_core::{DataType, DecodedSymbol, PAYLOAD_CAPACITY};
pub use qr_reader_pipeline::{
    CameraConfig, CameraDriver, CameraPins, ExecutionContext, FrameBuffer, FrameSize,
    QrCodeReader, ReaderBuilder, ReaderError, ReaderParams, Recognition, ResultReceiver,
    SetupError,
};

#[cfg(feature = "image")]
pub mod still;

#[cfg(feature = "image")]
pub use still::{decode_still, ReplayCamera, ReplayProgress, StillImageError};
