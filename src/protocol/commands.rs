//! # ESC/POS Command Builders
//!
//! Deterministic, side-effect-free translation of structured content into
//! printer control bytes. Nothing in this module performs I/O.
//!
//! ## Escape Sequence Structure
//!
//! Commands follow these patterns:
//! - Single byte: `LF`
//! - Two bytes: `ESC @`
//! - Multi-byte with parameters: `GS k m n data...`, `GS v 0 m xL xH yL yH data...`
//!
//! ## Byte Order
//!
//! Multi-byte integers use **little-endian** encoding: a `u16` value 0x0234
//! is sent as bytes `[0x34, 0x02]`.

use crate::error::Error;
use crate::raster::RasterImage;

// ============================================================================
// ESCAPE SEQUENCE CONSTANTS
// ============================================================================

/// ESC (Escape) - command prefix byte (0x1B)
pub const ESC: u8 = 0x1B;

/// GS (Group Separator) - extended command prefix (0x1D)
pub const GS: u8 = 0x1D;

/// LF (Line Feed) - print the line buffer and advance paper (0x0A)
pub const LF: u8 = 0x0A;

/// CODE128 symbology selector for `GS k m` (m = 73)
pub const BARCODE_CODE128: u8 = 0x49;

/// Maximum barcode payload: the command carries its length in one byte
pub const BARCODE_MAX_LEN: usize = 255;

// ============================================================================
// COMMAND BUILDERS
// ============================================================================

/// # Initialize Printer (ESC @)
///
/// Resets the printer to its power-on default state. Must be the first bytes
/// of every job; nothing may be written before it.
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC @ |
/// | Hex     | 1B 40 |
///
/// ## Example
///
/// ```
/// use rotulo::protocol::commands;
///
/// assert_eq!(commands::init(), vec![0x1B, 0x40]);
/// ```
#[inline]
pub fn init() -> Vec<u8> {
    vec![ESC, b'@']
}

/// # Text Line
///
/// UTF-8 bytes of `line` followed by a single LF. The LF prints the line
/// buffer and advances paper by one line.
///
/// No line-length validation is performed — wrapping is the caller's
/// responsibility (58mm heads fit ~32 characters of font A).
///
/// ## Example
///
/// ```
/// use rotulo::protocol::commands;
///
/// assert_eq!(commands::text_line("ABC"), vec![b'A', b'B', b'C', 0x0A]);
/// ```
#[inline]
pub fn text_line(line: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(line.len() + 1);
    out.extend_from_slice(line.as_bytes());
    out.push(LF);
    out
}

/// # 1-D Barcode (GS k m n data)
///
/// Prints `value` as a CODE128 barcode.
///
/// | Format | Bytes                      |
/// |--------|----------------------------|
/// | ASCII  | GS k 73 n d1..dn LF        |
/// | Hex    | 1D 6B 49 n data... 0A      |
///
/// The header's `n` is a **single byte** carrying the payload length, so
/// values longer than 255 characters cannot be expressed. Such values are
/// rejected with [`Error::Validation`] before any bytes are produced —
/// truncating would print a scannable barcode encoding the wrong value.
///
/// Non-ASCII payloads are rejected for the same reason: the length byte
/// counts bytes, and multi-byte UTF-8 would desynchronize it from the glyph
/// count the symbology expects.
///
/// ## Example
///
/// ```
/// use rotulo::protocol::commands;
///
/// let cmd = commands::barcode("12345").unwrap();
/// assert_eq!(&cmd[..4], &[0x1D, 0x6B, 0x49, 5]);
/// assert_eq!(&cmd[4..9], b"12345");
/// assert_eq!(cmd[9], 0x0A);
/// ```
pub fn barcode(value: &str) -> Result<Vec<u8>, Error> {
    if value.len() > BARCODE_MAX_LEN {
        return Err(Error::Validation(format!(
            "barcode value is {} bytes; the length field is one byte (max {})",
            value.len(),
            BARCODE_MAX_LEN
        )));
    }
    if !value.is_ascii() {
        return Err(Error::Validation(
            "barcode value must be ASCII".to_string(),
        ));
    }

    let data = value.as_bytes();
    let mut out = Vec::with_capacity(4 + data.len() + 1);
    out.extend_from_slice(&[GS, b'k', BARCODE_CODE128, data.len() as u8]);
    out.extend_from_slice(data);
    out.push(LF);
    Ok(out)
}

/// # Raster Bit Image (GS v 0)
///
/// Prints an arbitrary 1-bit bitmap row by row.
///
/// | Format | Bytes                         |
/// |--------|-------------------------------|
/// | ASCII  | GS v 0 m xL xH yL yH data...  |
/// | Hex    | 1D 76 30 00 xL xH yL yH ...   |
///
/// - `m = 0`: normal scale
/// - `xL xH`: bytes per row, little-endian u16
/// - `yL yH`: row count, little-endian u16
/// - data: `bytes_per_row * height` packed bits, MSB-first, verbatim
///
/// Dimensions beyond `u16::MAX` cannot be expressed in the header and are
/// rejected with [`Error::Validation`].
pub fn raster_image(img: &RasterImage) -> Result<Vec<u8>, Error> {
    if img.bytes_per_row > u16::MAX as usize || img.height_px > u16::MAX as u32 {
        return Err(Error::Validation(format!(
            "raster image {}x{} exceeds the command's u16 dimension fields",
            img.width_px, img.height_px
        )));
    }

    let [x_l, x_h] = u16_le(img.bytes_per_row as u16);
    let [y_l, y_h] = u16_le(img.height_px as u16);

    let mut out = Vec::with_capacity(8 + img.packed_bits.len());
    out.extend_from_slice(&[GS, b'v', b'0', 0x00, x_l, x_h, y_l, y_h]);
    out.extend_from_slice(&img.packed_bits);
    Ok(out)
}

/// # Feed and Cut (LF LF, GS V B 16)
///
/// Fixed trailing sequence of every job: two line feeds to clear the print
/// head, then feed-and-partial-cut. Omitting it leaves the label physically
/// un-advanced inside the mechanism.
///
/// | Format | Bytes                |
/// |--------|----------------------|
/// | Hex    | 0A 0A 1D 56 42 10    |
///
/// Printers without a cutter ignore GS V and stop after the feed.
#[inline]
pub fn feed_and_cut() -> Vec<u8> {
    vec![LF, LF, GS, b'V', b'B', 0x10]
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Encode a u16 value as little-endian bytes [low, high]
///
/// ## Example
///
/// ```
/// use rotulo::protocol::commands::u16_le;
///
/// assert_eq!(u16_le(0x1234), [0x34, 0x12]);
/// assert_eq!(u16_le(48), [0x30, 0x00]); // 384 dots / 8 = 48 bytes per row
/// ```
#[inline]
pub const fn u16_le(value: u16) -> [u8; 2] {
    [value as u8, (value >> 8) as u8]
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_init() {
        assert_eq!(init(), vec![0x1B, 0x40]);
    }

    #[test]
    fn test_text_line_utf8_then_single_lf() {
        let bytes = text_line("ABC");
        assert_eq!(bytes, vec![0x41, 0x42, 0x43, 0x0A]);
        assert_eq!(bytes.iter().filter(|&&b| b == 0x0A).count(), 1);
    }

    #[test]
    fn test_text_line_non_ascii_is_utf8() {
        // Arabic label text goes through as UTF-8
        let bytes = text_line("حليب");
        assert_eq!(&bytes[..bytes.len() - 1], "حليب".as_bytes());
        assert_eq!(*bytes.last().unwrap(), 0x0A);
    }

    #[test]
    fn test_text_line_empty() {
        assert_eq!(text_line(""), vec![0x0A]);
    }

    #[test]
    fn test_barcode_header_and_payload() {
        let cmd = barcode("6901234567894").unwrap();
        assert_eq!(&cmd[..3], &[0x1D, 0x6B, 0x49]);
        assert_eq!(cmd[3], 13); // length byte equals value length
        assert_eq!(&cmd[4..17], b"6901234567894");
        assert_eq!(cmd[17], 0x0A);
        // header (4) + payload + trailing LF
        assert_eq!(cmd.len(), 4 + 13 + 1);
    }

    #[test]
    fn test_barcode_length_byte_tracks_value() {
        for len in [1usize, 42, 255] {
            let value = "7".repeat(len);
            let cmd = barcode(&value).unwrap();
            assert_eq!(cmd[3] as usize, len);
            assert_eq!(cmd.len(), 4 + len + 1);
        }
    }

    #[test]
    fn test_barcode_too_long_rejected() {
        let value = "9".repeat(256);
        match barcode(&value) {
            Err(Error::Validation(_)) => {}
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_barcode_non_ascii_rejected() {
        assert!(matches!(barcode("١٢٣"), Err(Error::Validation(_))));
    }

    #[test]
    fn test_raster_image_header_little_endian() {
        let img = RasterImage {
            width_px: 384,
            height_px: 0x0102,
            bytes_per_row: 48,
            packed_bits: vec![0u8; 48 * 0x0102],
        };
        let cmd = raster_image(&img).unwrap();
        assert_eq!(&cmd[..8], &[0x1D, 0x76, 0x30, 0x00, 48, 0x00, 0x02, 0x01]);
        assert_eq!(cmd.len(), 8 + img.packed_bits.len());
        assert_eq!(&cmd[8..], &img.packed_bits[..]);
    }

    #[test]
    fn test_feed_and_cut() {
        assert_eq!(feed_and_cut(), vec![0x0A, 0x0A, 0x1D, 0x56, 0x42, 0x10]);
    }

    #[test]
    fn test_u16_le() {
        assert_eq!(u16_le(0x0000), [0x00, 0x00]);
        assert_eq!(u16_le(0x00FF), [0xFF, 0x00]);
        assert_eq!(u16_le(0xFF00), [0x00, 0xFF]);
        assert_eq!(u16_le(0x1234), [0x34, 0x12]);
    }
}
