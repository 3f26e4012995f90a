//! Decode-engine seam for the `qr-reader` pipeline.
//!
//! This crate focuses on:
//! - the [`DecodeEngine`] trait: a reusable image buffer plus "locate symbol
//!   regions" and "decode one region" operations,
//! - the engine-independent [`CodeMatrix`] produced by region extraction,
//! - [`QuircEngine`], the default engine built on `rqrr`.
//!
//! It does **not** own frames, threads or result queues; that is the job of
//! `qr-reader-pipeline`.

mod classify;
mod engine;
mod quirc;

pub use classify::classify_payload;
pub use engine::{
    CodeMatrix, DecodeEngine, DecodeFailure, EccLevel, EngineError, EngineFactory, SymbolData,
};
pub use quirc::QuircEngine;
