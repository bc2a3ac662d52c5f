//! # Threshold Rasterization
//!
//! Converts an RGBA bitmap (a rendered label preview, a logo) into the 1-bit
//! monochrome row-packed form the raster print command expects.
//!
//! ## Algorithm
//!
//! For each pixel:
//!
//! 1. Compute luminance `L = 0.299·R + 0.587·G + 0.114·B` (rounded)
//! 2. Fully transparent pixels (`alpha == 0`) count as luminance 255 —
//!    background is paper, and thermal paper is white
//! 3. The dot prints (bit = 1, black) when `L < threshold`
//!
//! Bits are packed 8 horizontal pixels per byte, MSB-first, row-major. Rows
//! whose width is not a multiple of 8 are padded to a whole byte; pad bits
//! are always zero since no pixel maps onto them.
//!
//! ## Why a Plain Threshold?
//!
//! Label content is text, barcodes, and line art — already high-contrast.
//! A fixed threshold keeps output deterministic (same bitmap + threshold ⇒
//! bit-identical raster), which halftone screens and error diffusion do not
//! guarantee across platforms.
//!
//! ## Usage Example
//!
//! ```
//! use image::RgbaImage;
//! use rotulo::raster::{self, DEFAULT_THRESHOLD};
//!
//! let img = RgbaImage::from_pixel(16, 4, image::Rgba([0, 0, 0, 255]));
//! let raster = raster::rasterize(&img, DEFAULT_THRESHOLD);
//! assert_eq!(raster.bytes_per_row, 2);
//! assert!(raster.packed_bits.iter().all(|&b| b == 0xFF));
//! ```

use image::RgbaImage;

/// Default luminance threshold. Pixels darker than this print as black.
pub const DEFAULT_THRESHOLD: u8 = 200;

/// A 1-bit monochrome bitmap, packed and ready for the raster print command.
///
/// Invariant: `packed_bits.len() == bytes_per_row * height_px`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    /// Width of the source bitmap in pixels
    pub width_px: u32,
    /// Height in rows
    pub height_px: u32,
    /// `ceil(width_px / 8)` — each row is padded to a whole byte
    pub bytes_per_row: usize,
    /// Row-major packed bits, MSB-first within each byte, 1 = print dot
    pub packed_bits: Vec<u8>,
}

/// Rasterize an [`RgbaImage`] with the given luminance threshold.
pub fn rasterize(image: &RgbaImage, threshold: u8) -> RasterImage {
    rasterize_rgba(image.as_raw(), image.width(), image.height(), threshold)
}

/// Rasterize a raw RGBA pixel buffer (4 bytes per pixel, row-major).
///
/// ## Panics
///
/// Panics if `pixels.len() != width * height * 4`.
pub fn rasterize_rgba(pixels: &[u8], width: u32, height: u32, threshold: u8) -> RasterImage {
    assert_eq!(
        pixels.len(),
        (width as usize) * (height as usize) * 4,
        "RGBA buffer size must be width * height * 4"
    );

    let bytes_per_row = (width as usize).div_ceil(8);
    let mut packed = vec![0u8; bytes_per_row * height as usize];

    for y in 0..height as usize {
        for x in 0..width as usize {
            let idx = (y * width as usize + x) * 4;
            let lum = luminance(
                pixels[idx],
                pixels[idx + 1],
                pixels[idx + 2],
                pixels[idx + 3],
            );
            if lum < threshold {
                let byte_index = y * bytes_per_row + (x >> 3);
                let bit_index = 7 - (x & 7);
                packed[byte_index] |= 1 << bit_index;
            }
        }
    }

    RasterImage {
        width_px: width,
        height_px: height,
        bytes_per_row,
        packed_bits: packed,
    }
}

/// ITU-R BT.601 luminance, with fully transparent pixels treated as white.
#[inline]
pub fn luminance(r: u8, g: u8, b: u8, a: u8) -> u8 {
    if a == 0 {
        return 255;
    }
    let lum = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    lum.round().min(255.0) as u8
}
