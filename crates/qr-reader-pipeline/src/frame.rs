use qr_reader_core::{GrayImageView, ImageError};

/// One captured grayscale frame.
///
/// `data` may be longer than `width * height` (drivers pad rows or reuse
/// larger buffers); only the leading pixels are read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    pub width: u16,
    pub height: u16,
    pub data: Vec<u8>,
    /// Monotonic capture counter assigned by the source.
    pub sequence: u64,
}

impl FrameBuffer {
    pub fn new(width: u16, height: u16, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
            sequence: 0,
        }
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn view(&self) -> Result<GrayImageView<'_>, ImageError> {
        GrayImageView::new(self.width as usize, self.height as usize, &self.data)
    }
}

/// Producer of frames, usually a camera driver's buffer pool.
///
/// Every frame returned by `acquire` is handed back through `release` exactly
/// once, after the per-frame observer has run.
pub trait FrameSource: Send {
    /// Next frame, or `None` when nothing is available right now.
    fn acquire(&mut self) -> Option<FrameBuffer>;

    /// Return a frame so its buffer can be reused.
    fn release(&mut self, frame: FrameBuffer);
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn acquire(&mut self) -> Option<FrameBuffer> {
        (**self).acquire()
    }

    fn release(&mut self, frame: FrameBuffer) {
        (**self).release(frame)
    }
}

/// Per-frame callback invoked on the recognition thread before the frame is
/// released. It must return quickly.
pub type FrameObserver = Box<dyn FnMut(&FrameBuffer) + Send + 'static>;
