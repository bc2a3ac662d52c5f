//! # Label Content and Job Composition
//!
//! A shelf label is a small fixed-order document: English title, optional
//! Arabic name, optional price, optional barcode. This module owns the
//! ephemeral [`LabelContent`] value object and the builders that turn content
//! into complete print jobs.
//!
//! ## Field Order Contract
//!
//! The printer lays content down strictly in byte-arrival order, so the
//! physical label order is fixed by the builder, not the printer:
//!
//! ```text
//! init → title → arabic → "SAR <price>" → barcode → feed/cut
//! ```
//!
//! Every job produced here starts with the init sequence and ends with
//! feed/cut; callers never splice raw commands around a job.

use crate::error::Error;
use crate::protocol::commands;
use crate::raster::RasterImage;

/// Currency prefix printed before the price line
const PRICE_PREFIX: &str = "SAR ";

/// Ephemeral content of one shelf label. No identity, no persistence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelContent {
    /// English item name (always printed)
    pub title: String,
    /// Arabic item name, printed right under the title when present
    pub arabic_text: Option<String>,
    /// 1-D barcode payload (EAN/UPC digits as ASCII)
    pub barcode_value: Option<String>,
    /// Price without currency; the builder prepends `"SAR "`
    pub price_text: Option<String>,
}

/// Build a complete job printing each line of `lines` in order.
pub fn text_job(lines: &[String]) -> Vec<u8> {
    let mut job = commands::init();
    for line in lines {
        job.extend(commands::text_line(line));
    }
    job.extend(commands::feed_and_cut());
    job
}

/// Build a complete job for one shelf label.
///
/// Fails with [`Error::Validation`] (and produces nothing) when the barcode
/// value cannot be encoded; see [`commands::barcode`].
pub fn label_job(content: &LabelContent) -> Result<Vec<u8>, Error> {
    // Validate the barcode before emitting anything so a bad value can't
    // leave a half-built job.
    let barcode_cmd = content
        .barcode_value
        .as_deref()
        .map(commands::barcode)
        .transpose()?;

    let mut job = commands::init();
    job.extend(commands::text_line(&content.title));
    if let Some(arabic) = &content.arabic_text {
        job.extend(commands::text_line(arabic));
    }
    if let Some(price) = &content.price_text {
        job.extend(commands::text_line(&format!("{PRICE_PREFIX}{price}")));
    }
    if let Some(cmd) = barcode_cmd {
        job.extend(cmd);
    }
    job.extend(commands::feed_and_cut());
    Ok(job)
}

/// Build a complete job printing one raster image.
pub fn image_job(img: &RasterImage) -> Result<Vec<u8>, Error> {
    let raster_cmd = commands::raster_image(img)?;
    let mut job = commands::init();
    job.extend(raster_cmd);
    job.extend(commands::feed_and_cut());
    Ok(job)
}
