//! # Printer Transport Layer
//!
//! Uniform contract over heterogeneous Bluetooth capabilities. Exactly one
//! transport is selected at startup by a platform capability check; the
//! session manager drives it through the [`Transport`] trait and never
//! touches platform APIs directly.
//!
//! ## Available Transports
//!
//! | Transport | Platform API | Discovery |
//! |-----------|--------------|-----------|
//! | [`ble_web::BleWebTransport`] | browser GATT | filtered → accept-all picker |
//! | [`ble_native::BleNativeTransport`] | host BLE plugin | silent reconnect → scan |
//! | [`classic::ClassicSerialTransport`] | RFCOMM/SPP | bonded device list |
//!
//! ## Chunking Contract
//!
//! The session manager splits every job into ~180-byte chunks before calling
//! [`Transport::write`]; BLE transports reject anything over
//! [`MAX_BLE_WRITE`] instead of silently splitting it again. Chunking happens
//! exactly once, and it happens above this layer.

pub mod ble_native;
pub mod ble_web;
pub mod classic;

use async_trait::async_trait;

use crate::error::Error;

/// Largest single write a BLE transport accepts (ATT payload ceiling).
/// Oversized buffers indicate a chunking bug upstream and fail loudly.
pub const MAX_BLE_WRITE: usize = 512;

/// Which wireless stack a device was found on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Browser-exposed Web Bluetooth GATT
    BleWeb,
    /// Host-application BLE plugin (active scan + silent reconnect)
    BleNative,
    /// Bluetooth Classic serial (RFCOMM/SPP) over OS-paired devices
    ClassicSerial,
}

/// A printer located by discovery. Lives for one session; only the native
/// transport persists the id/name pair for later silent reconnects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterDevice {
    /// Opaque handle, unique within its transport
    pub id: String,
    /// Advertised or bonded name ("GP-M322", ...)
    pub display_name: String,
    /// Transport the device was found on
    pub kind: TransportKind,
}

/// # Transport Contract
///
/// One live link to one printer. Implementations own their platform-specific
/// write handle (GATT characteristic, plugin device id, serial file) and tear
/// it down whole on [`disconnect`](Transport::disconnect).
///
/// `connect(target)`: with `None`, run this transport's discovery tiers; with
/// `Some(id)`, connect straight to a caller-chosen device (the "user picked
/// from a list" path). A successful connect on an already-connected transport
/// must tear the old link down first.
#[async_trait]
pub trait Transport: Send {
    /// Which stack this transport drives
    fn kind(&self) -> TransportKind;

    /// Locate a printer (or use `target`) and open the link
    async fn connect(&mut self, target: Option<&str>) -> Result<PrinterDevice, Error>;

    /// Tear down the link and drop all platform handles
    async fn disconnect(&mut self) -> Result<(), Error>;

    /// Send one pre-chunked buffer. Fails with [`Error::Write`] on link
    /// errors or oversized buffers.
    async fn write(&mut self, data: &[u8]) -> Result<(), Error>;

    /// Whether the link is currently believed up
    fn is_connected(&self) -> bool;
}
