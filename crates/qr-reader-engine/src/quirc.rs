//! Default engine: the `rqrr` port of quirc.

use qr_reader_core::GrayImageView;
use rqrr::{BitGrid, DeQRError, Grid, PreparedImage};

use crate::classify::classify_payload;
use crate::engine::{
    CodeMatrix, DecodeEngine, DecodeFailure, EccLevel, EngineError, EngineFactory, SymbolData,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// quirc-style engine backed by `rqrr`.
///
/// Owns a grayscale buffer sized by [`DecodeEngine::resize`]; `identify`
/// binarizes it, finds finder-pattern triples and samples every located grid
/// into a [`CodeMatrix`]. Decoding (format read, unmasking, Reed-Solomon) only
/// runs for the matrices the caller asks for.
#[derive(Debug, Default)]
pub struct QuircEngine {
    width: usize,
    height: usize,
    image: Vec<u8>,
    codes: Vec<CodeMatrix>,
}

impl QuircEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory for `DecoderState`; creation of this engine cannot fail.
    pub fn factory() -> EngineFactory {
        Box::new(|| Ok(Box::new(QuircEngine::new()) as Box<dyn crate::DecodeEngine>))
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}

impl DecodeEngine for QuircEngine {
    fn resize(&mut self, width: u16, height: u16) -> Result<(), EngineError> {
        let len = width as usize * height as usize;
        let mut image = Vec::new();
        image
            .try_reserve_exact(len)
            .map_err(|_| EngineError::OutOfMemory { width, height })?;
        image.resize(len, 0);

        self.image = image;
        self.width = width as usize;
        self.height = height as usize;
        self.codes.clear();
        Ok(())
    }

    fn image_mut(&mut self) -> &mut [u8] {
        &mut self.image
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self), fields(width = self.width, height = self.height))
    )]
    fn identify(&mut self) {
        self.codes.clear();
        if self.width == 0 || self.height == 0 {
            return;
        }

        let view = GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.image,
        };
        let mut prepared =
            PreparedImage::prepare_from_greyscale(view.width, view.height, |x, y| view.get(x, y));

        self.codes = prepared
            .detect_grids()
            .iter()
            .map(|grid| {
                let size = grid.grid.size();
                let mut code = CodeMatrix::blank(size);
                for y in 0..size {
                    for x in 0..size {
                        code.set_cell(x, y, grid.grid.bit(y, x));
                    }
                }
                code.corners = grid.bounds.map(|p| (p.x, p.y));
                code
            })
            .collect();
    }

    fn count(&self) -> usize {
        self.codes.len()
    }

    fn extract(&self, index: usize) -> Option<CodeMatrix> {
        self.codes.get(index).cloned()
    }

    fn decode(&self, code: &CodeMatrix) -> Result<SymbolData, DecodeFailure> {
        let grid = Grid {
            grid: MatrixGrid(code),
            bounds: code.corners.map(|(x, y)| rqrr::Point { x, y }),
        };

        let mut payload = Vec::new();
        let meta = grid.decode_to(&mut payload).map_err(DecodeFailure::from)?;
        let ecc_level = EccLevel::from_format_bits(meta.ecc_level)
            .ok_or_else(|| DecodeFailure::Other(format!("Invalid ECC level {}", meta.ecc_level)))?;

        Ok(SymbolData {
            data_type: classify_payload(&payload),
            version: meta.version.0 as u8,
            ecc_level,
            mask: meta.mask as u8,
            payload,
        })
    }
}

struct MatrixGrid<'a>(&'a CodeMatrix);

impl BitGrid for MatrixGrid<'_> {
    fn size(&self) -> usize {
        self.0.size
    }

    fn bit(&self, y: usize, x: usize) -> bool {
        self.0.cell(x, y)
    }
}

impl From<DeQRError> for DecodeFailure {
    fn from(err: DeQRError) -> Self {
        match err {
            DeQRError::InvalidGridSize => Self::InvalidGridSize,
            DeQRError::InvalidVersion => Self::InvalidVersion,
            DeQRError::FormatEcc => Self::FormatEcc,
            DeQRError::DataEcc => Self::DataEcc,
            DeQRError::UnknownDataType => Self::UnknownDataType,
            DeQRError::DataOverflow => Self::DataOverflow,
            DeQRError::DataUnderflow => Self::DataUnderflow,
            other => Self::Other(format!("{other:?}")),
        }
    }
}
