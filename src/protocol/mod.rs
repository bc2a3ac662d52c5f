//! # ESC/POS Protocol Implementation
//!
//! This module provides low-level command builders for the widely supported
//! ESC/POS subset spoken by Gprinter-class 58/80mm thermal label printers.
//!
//! ## Module Structure
//!
//! - [`commands`]: Byte-level builders (init, text, barcode, raster, feed/cut)
//! - [`label`]: Label content model and whole-job composition
//!
//! ## Job Structure
//!
//! Every print job is an ordered byte stream:
//!
//! ```text
//! ESC @  →  one or more of { text line | barcode | raster image }  →  feed/cut
//! ```
//!
//! The printer processes bytes strictly in arrival order, so the physical
//! layout of a label is determined entirely by encode-call order. The job
//! builders in [`label`] enforce init-first and feed/cut-last.
//!
//! ## Usage Example
//!
//! ```
//! use rotulo::protocol::commands;
//!
//! let mut data = Vec::new();
//! data.extend(commands::init());
//! data.extend(commands::text_line("Milk 1L"));
//! data.extend(commands::barcode("6901234567894").unwrap());
//! data.extend(commands::feed_and_cut());
//!
//! // Send `data` to the printer via a transport...
//! assert_eq!(&data[..2], &[0x1B, 0x40]);
//! ```

pub mod commands;
pub mod label;

pub use label::LabelContent;
