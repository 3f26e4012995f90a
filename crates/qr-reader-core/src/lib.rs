//! Core types for the `qr-reader-*` workspace.
//!
//! This crate is intentionally small. It does *not* depend on any decode
//! engine, camera driver or threading primitive; it only defines the data that
//! flows between them:
//! - [`GrayImageView`]: borrowed 8-bit grayscale frames, row-major,
//! - [`DecodedSymbol`]: the fixed-layout result record handed to consumers,
//! - logger installation helpers shared by the binaries and examples.

mod image;
mod logger;
mod symbol;

pub use image::{GrayImageView, ImageError};
pub use symbol::{DataType, DecodedSymbol, PAYLOAD_CAPACITY};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init, init_with_level, LogConfig};
