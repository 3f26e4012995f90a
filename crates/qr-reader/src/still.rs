//! Still-image helpers built on the camera pipeline's decoder.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ::image::GrayImage;
use qr_reader_core::DecodedSymbol;
use qr_reader_pipeline::{
    CameraConfig, CameraDriver, CameraInitError, DecoderState, FrameBuffer, FrameSource, Mailbox,
    PrepareError, Recognition,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced by the still-image helpers.
#[derive(thiserror::Error, Debug)]
pub enum StillImageError {
    #[error("image {width}x{height} does not fit a camera frame")]
    TooLarge { width: u32, height: u32 },

    #[error("failed to load {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: ::image::ImageError,
    },

    #[error(transparent)]
    Prepare(#[from] PrepareError),
}

/// Copy `img` into a camera frame.
pub fn frame_from_image(img: &GrayImage) -> Result<FrameBuffer, StillImageError> {
    let too_large = || StillImageError::TooLarge {
        width: img.width(),
        height: img.height(),
    };
    let width = u16::try_from(img.width()).map_err(|_| too_large())?;
    let height = u16::try_from(img.height()).map_err(|_| too_large())?;
    Ok(FrameBuffer::new(width, height, img.as_raw().clone()))
}

/// Load an image file as an 8-bit grayscale camera frame.
pub fn load_frame(path: impl AsRef<Path>) -> Result<FrameBuffer, StillImageError> {
    let path = path.as_ref();
    let img = ::image::open(path)
        .map_err(|source| StillImageError::Load {
            path: path.to_path_buf(),
            source,
        })?
        .to_luma8();
    frame_from_image(&img)
}

/// Decode up to `max_symbols` QR codes in a single grayscale image.
///
/// Failed decodes are returned as invalid symbols carrying the reason, the
/// same way the camera pipeline reports them. An image without a symbol
/// yields an empty vector.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(img), fields(width = img.width(), height = img.height()))
)]
pub fn decode_still(
    img: &GrayImage,
    max_symbols: usize,
) -> Result<Vec<DecodedSymbol>, StillImageError> {
    let frame = frame_from_image(img)?;
    let max_symbols = max_symbols.max(1);
    let mut decoder = DecoderState::with_quirc().with_max_symbols_per_frame(max_symbols);
    let mailbox = Mailbox::new(max_symbols);

    decoder.prepare(frame.width, frame.height, &frame.data)?;
    decoder.decode(&mailbox);

    Ok(std::iter::from_fn(|| mailbox.try_receive())
        .filter_map(Recognition::into_symbol)
        .collect())
}

/// Number of replayed frames the recognition loop has handed back.
///
/// A frame is released after it was staged for decoding, so once every frame
/// has been released only the last decode can still be in flight.
#[derive(Clone, Debug, Default)]
pub struct ReplayProgress(Arc<AtomicUsize>);

impl ReplayProgress {
    pub fn played(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    fn advance(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }
}

/// Camera driver that plays back a fixed list of frames.
///
/// Frame dimensions are taken from the frames themselves; the configured
/// frame size is only checked against them for a log message.
#[derive(Clone, Debug, Default)]
pub struct ReplayCamera {
    frames: Vec<FrameBuffer>,
    looping: bool,
    progress: ReplayProgress,
}

impl ReplayCamera {
    pub fn new(frames: Vec<FrameBuffer>) -> Self {
        Self {
            frames,
            looping: false,
            progress: ReplayProgress::default(),
        }
    }

    pub fn from_images<'a>(
        images: impl IntoIterator<Item = &'a GrayImage>,
    ) -> Result<Self, StillImageError> {
        let frames = images
            .into_iter()
            .map(frame_from_image)
            .collect::<Result<_, _>>()?;
        Ok(Self::new(frames))
    }

    pub fn from_paths<P: AsRef<Path>>(
        paths: impl IntoIterator<Item = P>,
    ) -> Result<Self, StillImageError> {
        let frames = paths
            .into_iter()
            .map(load_frame)
            .collect::<Result<_, _>>()?;
        Ok(Self::new(frames))
    }

    /// Start over from the first frame after the last one instead of running dry.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Frames left to hand to the pipeline; zero once `init` took them.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Shared counter of released frames, valid across `init`.
    pub fn progress(&self) -> ReplayProgress {
        self.progress.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl CameraDriver for ReplayCamera {
    fn external_memory_available(&self) -> bool {
        true
    }

    fn init(&mut self, config: &CameraConfig) -> Result<Box<dyn FrameSource>, CameraInitError> {
        if self.frames.is_empty() {
            return Err(CameraInitError("no frames to replay".to_string()));
        }
        let (width, height) = config.frame_size.dimensions();
        let mismatched = self
            .frames
            .iter()
            .filter(|f| (f.width, f.height) != (width, height))
            .count();
        if mismatched > 0 {
            log::debug!(
                "{mismatched} replay frame(s) differ from the configured {width}x{height}"
            );
        }

        Ok(Box::new(ReplaySource {
            frames: std::mem::take(&mut self.frames).into(),
            looping: self.looping,
            sequence: 0,
            progress: self.progress.clone(),
        }))
    }
}

struct ReplaySource {
    frames: VecDeque<FrameBuffer>,
    looping: bool,
    sequence: u64,
    progress: ReplayProgress,
}

impl FrameSource for ReplaySource {
    fn acquire(&mut self) -> Option<FrameBuffer> {
        let frame = if self.looping {
            let frame = self.frames.front()?.clone();
            self.frames.rotate_left(1);
            frame
        } else {
            self.frames.pop_front()?
        };
        self.sequence += 1;
        Some(frame.with_sequence(self.sequence))
    }

    fn release(&mut self, _frame: FrameBuffer) {
        self.progress.advance();
    }
}
