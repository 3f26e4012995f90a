//! Reusable decoder state: one engine, one image buffer, resized on demand.

use qr_reader_core::DecodedSymbol;
use qr_reader_engine::{DecodeEngine, DecodeFailure, EngineFactory, QuircEngine, SymbolData};

use crate::error::PrepareError;
use crate::mailbox::Mailbox;
use crate::result::Recognition;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Result of [`DecoderState::decode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// No frame has been staged successfully.
    NotReady,
    /// The staged frame contains no symbol; nothing was published.
    NoSymbol,
    /// `published` symbols were sent to the mailbox. `first_valid` tells
    /// whether the first of them decoded.
    Reported { first_valid: bool, published: usize },
}

impl DecodeOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Reported { first_valid: true, .. })
    }
}

/// Owns the decode engine and the dimensions of the last staged frame.
///
/// The engine is created lazily on the first `prepare`; its image buffer is
/// reallocated only when the frame dimensions change.
pub struct DecoderState {
    width: u16,
    height: u16,
    frame_bytes: usize,
    staged: bool,
    debug: bool,
    max_symbols_per_frame: usize,
    factory: EngineFactory,
    engine: Option<Box<dyn DecodeEngine>>,
}

impl DecoderState {
    pub fn new(factory: EngineFactory) -> Self {
        Self {
            width: 0,
            height: 0,
            frame_bytes: 0,
            staged: false,
            debug: false,
            max_symbols_per_frame: 1,
            factory,
            engine: None,
        }
    }

    /// Decoder backed by the default `rqrr` engine.
    pub fn with_quirc() -> Self {
        Self::new(QuircEngine::factory())
    }

    /// Report up to `max` located symbols per frame (at least one).
    pub fn with_max_symbols_per_frame(mut self, max: usize) -> Self {
        self.max_symbols_per_frame = max.max(1);
        self
    }

    /// Log per-frame detail: resizes, empty frames, decode failures and the
    /// metadata of every decoded symbol.
    pub fn set_debug(&mut self, on: bool) {
        self.debug = on;
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn max_symbols_per_frame(&self) -> usize {
        self.max_symbols_per_frame
    }

    /// Dimensions of the last prepared frame, `(0, 0)` before first use.
    pub fn dimensions(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    pub fn frame_byte_count(&self) -> usize {
        self.frame_bytes
    }

    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    /// Stage a grayscale frame for decoding.
    ///
    /// `buf` must hold at least `width * height` bytes and is only read during
    /// the call. On failure the previous dimensions are kept and the staged
    /// frame is invalidated.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, buf))
    )]
    pub fn prepare(&mut self, width: u16, height: u16, buf: &[u8]) -> Result<(), PrepareError> {
        let staged = self.stage(width, height, buf);
        self.staged = staged.is_ok();
        staged
    }

    fn stage(&mut self, width: u16, height: u16, buf: &[u8]) -> Result<(), PrepareError> {
        if width == 0 || height == 0 {
            return Err(PrepareError::EmptyFrame);
        }
        let needed = width as usize * height as usize;
        if buf.len() < needed {
            return Err(PrepareError::ShortBuffer {
                expected: needed,
                got: buf.len(),
            });
        }

        let engine = match &mut self.engine {
            Some(engine) => engine,
            slot => slot.insert((self.factory)()?),
        };

        if self.width != width || self.height != height || self.frame_bytes == 0 {
            if self.debug {
                log::debug!(
                    "resizing decoder {}x{} -> {}x{}",
                    self.width,
                    self.height,
                    width,
                    height
                );
            }
            if let Err(err) = engine.resize(width, height) {
                log::error!("decoder resize to {width}x{height} failed: {err}");
                return Err(err.into());
            }
            self.width = width;
            self.height = height;
            self.frame_bytes = needed;
        }

        let image = engine.image_mut();
        if image.len() < self.frame_bytes {
            return Err(PrepareError::EngineBuffer {
                expected: self.frame_bytes,
                got: image.len(),
            });
        }
        image[..self.frame_bytes].copy_from_slice(&buf[..self.frame_bytes]);
        engine.identify();
        log::trace!("staged {width}x{height} frame");
        Ok(())
    }

    /// Decode the staged frame and publish the outcome to `mailbox`.
    ///
    /// Only the first `max_symbols_per_frame` located symbols are reported
    /// (one by default); further symbols in the same frame are ignored.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    pub fn decode(&mut self, mailbox: &Mailbox) -> DecodeOutcome {
        let engine = match self.engine.as_ref() {
            Some(engine) if self.staged && self.width != 0 && self.height != 0 => engine,
            _ => return DecodeOutcome::NotReady,
        };

        let count = engine.count();
        if count == 0 {
            if self.debug {
                log::debug!("no symbol located");
            }
            return DecodeOutcome::NoSymbol;
        }
        if self.debug && count > self.max_symbols_per_frame {
            log::debug!(
                "{count} symbols located, reporting {}",
                self.max_symbols_per_frame
            );
        }

        let mut first_valid = false;
        let mut published = 0;
        for index in 0..count.min(self.max_symbols_per_frame) {
            let decoded = engine
                .extract(index)
                .ok_or_else(|| DecodeFailure::Other(format!("symbol {index} could not be extracted")))
                .and_then(|code| engine.decode(&code));

            let symbol = match decoded {
                Ok(data) => {
                    if self.debug {
                        dump_symbol(&data);
                    }
                    DecodedSymbol::decoded(data.data_type, &data.payload)
                }
                Err(failure) => {
                    if self.debug {
                        log::debug!("decoding failed: {failure}");
                    }
                    DecodedSymbol::failed(&failure.to_string())
                }
            };

            if index == 0 {
                first_valid = symbol.is_valid();
            }
            mailbox.publish(Recognition::Symbol(symbol));
            published += 1;
        }

        DecodeOutcome::Reported {
            first_valid,
            published,
        }
    }
}

fn dump_symbol(data: &SymbolData) {
    log::debug!(
        "decoded version {} ecc {} mask {} type {} length {}",
        data.version,
        data.ecc_level.letter(),
        data.mask,
        data.data_type.name(),
        data.payload.len()
    );
    log::trace!("payload: {}", String::from_utf8_lossy(&data.payload));
}

impl std::fmt::Debug for DecoderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderState")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("frame_bytes", &self.frame_bytes)
            .field("staged", &self.staged)
            .field("debug", &self.debug)
            .field("max_symbols_per_frame", &self.max_symbols_per_frame)
            .field("has_engine", &self.engine.is_some())
            .finish()
    }
}
