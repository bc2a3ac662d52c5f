//! # Rotulo - Bluetooth Shelf-Label Printer Client
//!
//! Rotulo drives Gprinter-class thermal label printers over Bluetooth. It
//! provides:
//!
//! - **Protocol implementation**: ESC/POS command builders for text,
//!   CODE128 barcodes, and raster images
//! - **Rasterization**: threshold-based 1-bit conversion of RGBA bitmaps
//! - **Transports**: Web Bluetooth GATT, host BLE plugin, and Classic
//!   serial (RFCOMM), behind one [`Transport`](transport::Transport) trait
//! - **Discovery**: tiered device location (silent reconnect → filtered →
//!   broad) with name and service-UUID heuristics
//! - **Session management**: single-connection ownership, chunked writes,
//!   and a one-shot reconnect-and-replay retry
//!
//! ## Quick Start
//!
//! ```no_run
//! use rotulo::protocol::LabelContent;
//! use rotulo::session::SessionManager;
//! use rotulo::transport::classic::ClassicSerialTransport;
//!
//! # async fn demo() -> Result<(), rotulo::Error> {
//! // Classic serial: the printer is already paired at the OS level
//! let session = SessionManager::new(Box::new(ClassicSerialTransport::new()));
//!
//! session
//!     .print_simple_label(&LabelContent {
//!         title: "Milk 1L".to_string(),
//!         barcode_value: Some("6901234567894".to_string()),
//!         price_text: Some("5.25".to_string()),
//!         ..Default::default()
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`protocol`] | ESC/POS command builders and label jobs |
//! | [`raster`] | RGBA → 1-bit threshold rasterization |
//! | [`transport`] | Transport trait and the three implementations |
//! | [`discovery`] | Printer-matching heuristics and UUID tables |
//! | [`session`] | Session manager (connection ownership, retry) |
//! | [`error`] | Error taxonomy |
//!
//! ## Supported Printers
//!
//! Tested against Gprinter GP-M322/GP-M421 (58mm, BLE UART service
//! FFE0/FFE1) and their SPP-only siblings. Other ESC/POS printers exposing
//! a writable GATT characteristic should work via the broad discovery
//! fallback.

pub mod discovery;
pub mod error;
pub mod protocol;
pub mod raster;
pub mod session;
pub mod transport;

// Re-exports for convenience
pub use error::Error;
pub use protocol::LabelContent;
pub use raster::RasterImage;
pub use session::SessionManager;
