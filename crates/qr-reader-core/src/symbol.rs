use std::fmt;

use serde::{Deserialize, Serialize};

/// Capacity of [`DecodedSymbol::payload`], terminator included.
pub const PAYLOAD_CAPACITY: usize = 1024;

/// Encoding mode of a decoded QR payload.
///
/// Discriminants match the QR mode indicator bits so the raw value can be
/// handed to consumers that expect the classic `data_type` integer.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Numeric = 1,
    Alphanumeric = 2,
    Byte = 4,
    Kanji = 8,
}

impl DataType {
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            1 => Some(Self::Numeric),
            2 => Some(Self::Alphanumeric),
            4 => Some(Self::Byte),
            8 => Some(Self::Kanji),
            _ => None,
        }
    }

    #[inline]
    pub fn raw(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Alphanumeric => "alphanumeric",
            Self::Byte => "byte",
            Self::Kanji => "kanji",
        }
    }
}

/// Outcome of decoding one located symbol.
///
/// The layout is `repr(C)` and stable: `{valid, data_type, payload[1024],
/// payload_len}`. `payload` holds either the decoded bytes or, when `valid` is
/// false, the failure reason. It is always NUL-terminated at `payload_len`,
/// and `payload_len < PAYLOAD_CAPACITY`.
#[repr(C)]
#[derive(Clone)]
pub struct DecodedSymbol {
    valid: bool,
    data_type: i32,
    payload: [u8; PAYLOAD_CAPACITY],
    payload_len: i32,
}

impl DecodedSymbol {
    /// Successful decode. Payloads longer than `PAYLOAD_CAPACITY - 1` bytes are
    /// truncated so the terminator still fits.
    pub fn decoded(data_type: DataType, bytes: &[u8]) -> Self {
        let mut symbol = Self::empty();
        symbol.valid = true;
        symbol.data_type = data_type.raw();
        symbol.write_payload(bytes);
        symbol
    }

    /// Failed decode carrying a human-readable reason in place of the payload.
    pub fn failed(reason: &str) -> Self {
        let mut symbol = Self::empty();
        symbol.write_payload(reason.as_bytes());
        symbol
    }

    fn empty() -> Self {
        Self {
            valid: false,
            data_type: 0,
            payload: [0; PAYLOAD_CAPACITY],
            payload_len: 0,
        }
    }

    fn write_payload(&mut self, bytes: &[u8]) {
        let len = bytes.len().min(PAYLOAD_CAPACITY - 1);
        if len < bytes.len() {
            log::warn!(
                "payload truncated from {} to {} bytes",
                bytes.len(),
                len
            );
        }
        self.payload[..len].copy_from_slice(&bytes[..len]);
        self.payload[len] = 0;
        self.payload_len = len as i32;
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Encoding mode; `None` for failed decodes.
    pub fn data_type(&self) -> Option<DataType> {
        if self.valid {
            DataType::from_raw(self.data_type)
        } else {
            None
        }
    }

    #[inline]
    pub fn raw_data_type(&self) -> i32 {
        self.data_type
    }

    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload_len as usize
    }

    /// Payload bytes without the terminator.
    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.payload_len()]
    }

    /// Payload bytes including the trailing NUL.
    pub fn payload_with_nul(&self) -> &[u8] {
        &self.payload[..=self.payload_len()]
    }

    /// The full fixed-size payload buffer.
    pub fn raw_payload(&self) -> &[u8; PAYLOAD_CAPACITY] {
        &self.payload
    }

    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(self.payload()).ok()
    }
}

impl Default for DecodedSymbol {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for DecodedSymbol {
    fn eq(&self, other: &Self) -> bool {
        self.valid == other.valid
            && self.data_type == other.data_type
            && self.payload() == other.payload()
    }
}

impl Eq for DecodedSymbol {}

impl fmt::Debug for DecodedSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedSymbol")
            .field("valid", &self.valid)
            .field("data_type", &self.data_type)
            .field("payload", &String::from_utf8_lossy(self.payload()))
            .field("payload_len", &self.payload_len)
            .finish()
    }
}
