use qr_reader_core::DataType;

const ALPHANUMERIC: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

/// Narrowest QR encoding mode able to carry `payload`.
///
/// Engines that do not report the segment mode use this to fill
/// `SymbolData::data_type`. Kanji is never inferred; Shift-JIS bytes are
/// reported as `Byte`.
pub fn classify_payload(payload: &[u8]) -> DataType {
    if payload.is_empty() {
        return DataType::Byte;
    }
    if payload.iter().all(u8::is_ascii_digit) {
        DataType::Numeric
    } else if payload.iter().all(|b| ALPHANUMERIC.contains(b)) {
        DataType::Alphanumeric
    } else {
        DataType::Byte
    }
}
