/// Errors produced when wrapping a raw grayscale buffer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("invalid grayscale dimensions (width={width}, height={height})")]
    EmptyDimensions { width: usize, height: usize },

    #[error("grayscale buffer too short (expected {expected} bytes, got {got})")]
    ShortBuffer { expected: usize, got: usize },
}

/// Borrowed 8-bit grayscale image.
///
/// `data` is row-major and holds at least `width * height` bytes. Camera
/// drivers are allowed to hand out buffers with trailing padding, so only the
/// first `pixel_count()` bytes are meaningful.
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8],
}

impl<'a> GrayImageView<'a> {
    /// Wrap `data` after checking it covers `width * height` pixels.
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::EmptyDimensions { width, height });
        }
        let expected = width * height;
        if data.len() < expected {
            return Err(ImageError::ShortBuffer {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// The meaningful pixels, without driver padding.
    #[inline]
    pub fn pixels(&self) -> &'a [u8] {
        &self.data[..self.pixel_count()]
    }

    /// Pixel at `(x, y)`; out-of-range coordinates read as black.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.data[y * self.width + x]
    }
}
