//! Camera wiring and sensor configuration.
//!
//! The hardware itself sits behind [`CameraDriver`]; everything here is plain
//! data handed to the driver once during `QrCodeReader::setup`.

use serde::{Deserialize, Serialize};

use crate::error::CameraInitError;
use crate::frame::FrameSource;

/// GPIO assignment of a parallel camera module. `-1` means "not connected".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraPins {
    pub pwdn: i8,
    pub reset: i8,
    pub xclk: i8,
    pub siod: i8,
    pub sioc: i8,
    pub y9: i8,
    pub y8: i8,
    pub y7: i8,
    pub y6: i8,
    pub y5: i8,
    pub y4: i8,
    pub y3: i8,
    pub y2: i8,
    pub vsync: i8,
    pub href: i8,
    pub pclk: i8,
}

impl CameraPins {
    pub const AI_THINKER: CameraPins = CameraPins {
        pwdn: 32,
        reset: -1,
        xclk: 0,
        siod: 26,
        sioc: 27,
        y9: 35,
        y8: 34,
        y7: 39,
        y6: 36,
        y5: 21,
        y4: 19,
        y3: 18,
        y2: 5,
        vsync: 25,
        href: 23,
        pclk: 22,
    };

    pub const WROVER_KIT: CameraPins = CameraPins {
        pwdn: -1,
        reset: -1,
        xclk: 21,
        siod: 26,
        sioc: 27,
        y9: 35,
        y8: 34,
        y7: 39,
        y6: 36,
        y5: 19,
        y4: 18,
        y3: 5,
        y2: 4,
        vsync: 25,
        href: 23,
        pclk: 22,
    };

    pub const ESP_EYE: CameraPins = CameraPins {
        pwdn: -1,
        reset: -1,
        xclk: 4,
        siod: 18,
        sioc: 23,
        y9: 36,
        y8: 37,
        y7: 38,
        y6: 39,
        y5: 35,
        y4: 14,
        y3: 13,
        y2: 34,
        vsync: 5,
        href: 27,
        pclk: 25,
    };

    /// Data lines in bus order, `d0` (Y2) first.
    pub fn data_pins(&self) -> [i8; 8] {
        [
            self.y2, self.y3, self.y4, self.y5, self.y6, self.y7, self.y8, self.y9,
        ]
    }
}

impl Default for CameraPins {
    fn default() -> Self {
        Self::AI_THINKER
    }
}

/// Standard sensor resolutions, smallest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FrameSize {
    Qqvga,
    Qcif,
    Hqvga,
    Qvga,
    Cif,
    Vga,
    Svga,
    Xga,
    Sxga,
    Uxga,
}

impl FrameSize {
    /// `(width, height)` in pixels.
    pub fn dimensions(self) -> (u16, u16) {
        match self {
            Self::Qqvga => (160, 120),
            Self::Qcif => (176, 144),
            Self::Hqvga => (240, 176),
            Self::Qvga => (320, 240),
            Self::Cif => (400, 296),
            Self::Vga => (640, 480),
            Self::Svga => (800, 600),
            Self::Xga => (1024, 768),
            Self::Sxga => (1280, 1024),
            Self::Uxga => (1600, 1200),
        }
    }

    pub fn pixel_count(self) -> usize {
        let (w, h) = self.dimensions();
        w as usize * h as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    Grayscale,
    Rgb565,
    Yuv422,
    Jpeg,
}

/// Sensor configuration applied by [`CameraDriver::init`].
///
/// Built by value from pins and a frame size; integrators adjust it with the
/// `with_*` methods before passing it to the reader builder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub pins: CameraPins,
    pub frame_size: FrameSize,
    pub pixel_format: PixelFormat,
    pub xclk_freq_hz: u32,
    pub ledc_channel: u8,
    pub ledc_timer: u8,
    pub jpeg_quality: u8,
    pub fb_count: u8,
}

impl CameraConfig {
    pub fn new(pins: CameraPins, frame_size: FrameSize) -> Self {
        Self {
            pins,
            frame_size,
            pixel_format: PixelFormat::Grayscale,
            xclk_freq_hz: 10_000_000,
            ledc_channel: 0,
            ledc_timer: 0,
            jpeg_quality: 15,
            fb_count: 1,
        }
    }

    pub fn with_xclk_freq_hz(mut self, hz: u32) -> Self {
        self.xclk_freq_hz = hz;
        self
    }

    pub fn with_ledc(mut self, channel: u8, timer: u8) -> Self {
        self.ledc_channel = channel;
        self.ledc_timer = timer;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn with_fb_count(mut self, count: u8) -> Self {
        self.fb_count = count.max(1);
        self
    }

    pub fn with_pixel_format(mut self, format: PixelFormat) -> Self {
        self.pixel_format = format;
        self
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self::new(CameraPins::AI_THINKER, FrameSize::Qvga)
    }
}

/// Hardware abstraction used once by `QrCodeReader::setup`.
pub trait CameraDriver {
    /// Whether the board has the external RAM the frame buffers live in.
    fn external_memory_available(&self) -> bool;

    /// Apply `config` and return the frame source for the running sensor.
    fn init(&mut self, config: &CameraConfig) -> Result<Box<dyn FrameSource>, CameraInitError>;
}
