use qr_reader_core::DataType;
use serde::{Deserialize, Serialize};

/// Errors raised by the engine itself (as opposed to per-symbol failures).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("cannot allocate a {width}x{height} image buffer")]
    OutOfMemory { width: u16, height: u16 },

    #[error("decode engine unavailable: {0}")]
    Unavailable(String),
}

/// Why a located symbol could not be decoded.
///
/// The `Display` text is what ends up in the payload of an invalid
/// `DecodedSymbol`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeFailure {
    #[error("Invalid grid size")]
    InvalidGridSize,
    #[error("Invalid version")]
    InvalidVersion,
    #[error("Format data ECC failure")]
    FormatEcc,
    #[error("ECC failure")]
    DataEcc,
    #[error("Unknown data type")]
    UnknownDataType,
    #[error("Data overflow")]
    DataOverflow,
    #[error("Data underflow")]
    DataUnderflow,
    #[error("{0}")]
    Other(String),
}

/// Error-correction level of a decoded symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EccLevel {
    M,
    L,
    H,
    Q,
}

impl EccLevel {
    /// Map the two format-information ECC bits (`0..=3`, ordered M, L, H, Q).
    pub fn from_format_bits(bits: u16) -> Option<Self> {
        match bits {
            0 => Some(Self::M),
            1 => Some(Self::L),
            2 => Some(Self::H),
            3 => Some(Self::Q),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Self::M => 'M',
            Self::L => 'L',
            Self::H => 'H',
            Self::Q => 'Q',
        }
    }
}

/// A successfully decoded symbol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolData {
    pub data_type: DataType,
    pub payload: Vec<u8>,
    pub version: u8,
    pub ecc_level: EccLevel,
    pub mask: u8,
}

/// Module matrix sampled from one located symbol region.
///
/// Cells are row-major, `true` meaning a dark module. `corners` are the region
/// bounds in frame pixels, clockwise from the top-left finder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeMatrix {
    pub size: usize,
    pub cells: Vec<bool>,
    pub corners: [(i32, i32); 4],
}

impl CodeMatrix {
    /// All-light matrix of `size` x `size` modules.
    pub fn blank(size: usize) -> Self {
        Self {
            size,
            cells: vec![false; size * size],
            corners: [(0, 0); 4],
        }
    }

    #[inline]
    pub fn cell(&self, x: usize, y: usize) -> bool {
        self.cells[y * self.size + x]
    }

    #[inline]
    pub fn set_cell(&mut self, x: usize, y: usize, dark: bool) {
        self.cells[y * self.size + x] = dark;
    }
}

/// Opaque QR decode capability.
///
/// Usage per frame mirrors the classic quirc flow:
/// `resize` (only when dimensions change) → write into `image_mut` →
/// `identify` → `count` → `extract(i)` → `decode`.
pub trait DecodeEngine: Send {
    /// Reallocate the internal image buffer for `width` x `height` pixels.
    ///
    /// On failure the previous buffer stays valid.
    fn resize(&mut self, width: u16, height: u16) -> Result<(), EngineError>;

    /// The internal image buffer, `width * height` bytes.
    fn image_mut(&mut self) -> &mut [u8];

    /// Locate symbol regions in the image currently in the buffer.
    fn identify(&mut self);

    /// Number of regions found by the last `identify`.
    fn count(&self) -> usize;

    /// Sample the module matrix of region `index`.
    fn extract(&self, index: usize) -> Option<CodeMatrix>;

    /// Decode a sampled module matrix into its payload.
    fn decode(&self, code: &CodeMatrix) -> Result<SymbolData, DecodeFailure>;
}

/// Lazily creates the engine the first time a frame is staged.
pub type EngineFactory =
    Box<dyn FnMut() -> Result<Box<dyn DecodeEngine>, EngineError> + Send + 'static>;
