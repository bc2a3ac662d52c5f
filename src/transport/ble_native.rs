//! # BLE Native Transport
//!
//! Drives a host-application BLE plugin through the [`BlePlugin`] trait. The
//! plugin owns the radio: it runs scans, connects by device id, and routes
//! writes to a service/characteristic pair. This transport owns the strategy.
//!
//! ## Discovery Tiers
//!
//! 1. **Tier 0 — silent reconnect**: if a previous session persisted a device
//!    id, connect straight to it. No scan, no UI. This is why the transport
//!    carries a [`DeviceStore`].
//! 2. **Tier 1 — filtered scan**: scan on the known printer service UUID for
//!    one scan window and take the first name-heuristic match.
//! 3. **Tier 2 — broad scan**: scan with no service filter; same heuristic.
//!
//! A successful connect from tier 1 or 2 persists the id/name pair so the
//! next session starts at tier 0.
//!
//! ## Persisted Device
//!
//! The only durable artifact of the whole crate: one `{device_id, name}`
//! pair, stored as a small JSON file by [`JsonFileStore`].

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::discovery::{self, uuids};
use crate::error::Error;
use crate::transport::{MAX_BLE_WRITE, PrinterDevice, Transport, TransportKind};

/// One device seen during a scan window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub device_id: String,
    pub name: Option<String>,
}

/// # BLE Plugin
///
/// The seam to the host application's BLE layer. Mirrors the plugin API
/// shape: explicit initialization, windowed scans that collect advertisement
/// results, and id-addressed connect/write/disconnect.
#[async_trait]
pub trait BlePlugin: Send + Sync {
    /// Prepare the plugin (permissions, adapter power state)
    async fn initialize(&self) -> Result<(), Error>;

    /// Scan for `window`, filtered to `services` (empty = no filter), and
    /// return everything seen
    async fn scan(&self, services: &[Uuid], window: Duration) -> Result<Vec<ScanResult>, Error>;

    /// Connect to a device by id
    async fn connect(&self, device_id: &str) -> Result<(), Error>;
    /// Disconnect a device by id
    async fn disconnect(&self, device_id: &str) -> Result<(), Error>;

    /// Write one buffer to a characteristic of a connected device
    async fn write(
        &self,
        device_id: &str,
        service: Uuid,
        characteristic: Uuid,
        data: &[u8],
    ) -> Result<(), Error>;
}

/// The persisted id/name pair enabling silent reconnect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedDevice {
    pub device_id: String,
    pub name: String,
}

/// Durable key/value storage for the last successful printer
pub trait DeviceStore: Send + Sync {
    fn load(&self) -> Option<SavedDevice>;
    fn save(&self, device: &SavedDevice);
    fn clear(&self);
}

/// [`DeviceStore`] backed by one small JSON file
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DeviceStore for JsonFileStore {
    fn load(&self) -> Option<SavedDevice> {
        let contents = std::fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&contents).ok()
    }

    fn save(&self, device: &SavedDevice) {
        // Best effort: losing the cache only costs one extra scan next launch
        match serde_json::to_string(device) {
            Ok(json) => {
                if let Err(err) = std::fs::write(&self.path, json) {
                    warn!("ble-native: could not persist device cache: {err}");
                }
            }
            Err(err) => warn!("ble-native: could not serialize device cache: {err}"),
        }
    }

    fn clear(&self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// A store that remembers nothing; tier 0 is always skipped
pub struct NoStore;

impl DeviceStore for NoStore {
    fn load(&self) -> Option<SavedDevice> {
        None
    }
    fn save(&self, _device: &SavedDevice) {}
    fn clear(&self) {}
}

/// Host-plugin BLE transport
pub struct BleNativeTransport<P: BlePlugin, S: DeviceStore> {
    plugin: P,
    store: S,
    scan_window: Duration,
    connected: Option<PrinterDevice>,
}

impl<P: BlePlugin, S: DeviceStore> BleNativeTransport<P, S> {
    pub fn new(plugin: P, store: S) -> Self {
        Self {
            plugin,
            store,
            scan_window: discovery::SCAN_WINDOW,
            connected: None,
        }
    }

    /// Shorten or lengthen the per-tier scan window
    pub fn set_scan_window(&mut self, window: Duration) {
        self.scan_window = window;
    }

    /// Tier 0: reconnect to the persisted device without scanning
    async fn try_silent_reconnect(&self) -> Option<PrinterDevice> {
        let saved = self.store.load()?;
        debug!("ble-native: tier 0 silent reconnect to {}", saved.device_id);
        match self.plugin.connect(&saved.device_id).await {
            Ok(()) => Some(PrinterDevice {
                id: saved.device_id,
                display_name: saved.name,
                kind: TransportKind::BleNative,
            }),
            Err(err) => {
                debug!("ble-native: silent reconnect failed: {err}");
                // A stale id will keep failing; drop it so future launches
                // go straight to scanning.
                self.store.clear();
                None
            }
        }
    }

    /// Run one scan tier and pick the first plausible printer
    async fn scan_tier(&self, services: &[Uuid]) -> Result<Option<ScanResult>, Error> {
        let results = self.plugin.scan(services, self.scan_window).await?;
        Ok(results.into_iter().find(|r| {
            r.name
                .as_deref()
                .is_some_and(discovery::is_plausible_printer)
        }))
    }

    /// Tiers 1 and 2, in order
    async fn discover(&self) -> Result<ScanResult, Error> {
        debug!("ble-native: tier 1 filtered scan");
        if let Some(candidate) = self.scan_tier(&[uuids::PRIMARY_SERVICE]).await? {
            return Ok(candidate);
        }

        debug!("ble-native: tier 2 broad scan");
        if let Some(candidate) = self.scan_tier(&[]).await? {
            return Ok(candidate);
        }

        Err(Error::DiscoveryFailed(
            "no printer-like device seen in filtered or broad scans".to_string(),
        ))
    }
}

#[async_trait]
impl<P: BlePlugin, S: DeviceStore> Transport for BleNativeTransport<P, S> {
    fn kind(&self) -> TransportKind {
        TransportKind::BleNative
    }

    async fn connect(&mut self, target: Option<&str>) -> Result<PrinterDevice, Error> {
        self.plugin.initialize().await?;

        if let Some(old) = self.connected.take() {
            let _ = self.plugin.disconnect(&old.id).await;
        }

        // Explicit target bypasses every tier
        if let Some(id) = target {
            self.plugin.connect(id).await?;
            let device = PrinterDevice {
                id: id.to_string(),
                display_name: id.to_string(),
                kind: TransportKind::BleNative,
            };
            self.connected = Some(device.clone());
            return Ok(device);
        }

        if let Some(device) = self.try_silent_reconnect().await {
            info!("ble-native: silently reconnected to {}", device.display_name);
            self.connected = Some(device.clone());
            return Ok(device);
        }

        let candidate = self.discover().await?;
        self.plugin.connect(&candidate.device_id).await?;

        let name = candidate.name.unwrap_or_else(|| "Unknown".to_string());
        self.store.save(&SavedDevice {
            device_id: candidate.device_id.clone(),
            name: name.clone(),
        });

        let device = PrinterDevice {
            id: candidate.device_id,
            display_name: name,
            kind: TransportKind::BleNative,
        };
        info!("ble-native: connected to {}", device.display_name);
        self.connected = Some(device.clone());
        Ok(device)
    }

    async fn disconnect(&mut self) -> Result<(), Error> {
        if let Some(device) = self.connected.take() {
            self.plugin.disconnect(&device.id).await?;
        }
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        let device = self
            .connected
            .as_ref()
            .ok_or_else(|| Error::Write("printer is not connected".to_string()))?;
        if data.len() > MAX_BLE_WRITE {
            return Err(Error::Write(format!(
                "buffer of {} bytes exceeds the {MAX_BLE_WRITE}-byte BLE write limit",
                data.len()
            )));
        }
        let result = self
            .plugin
            .write(
                &device.id,
                uuids::PRIMARY_SERVICE,
                uuids::PRIMARY_WRITE_CHARACTERISTIC,
                data,
            )
            .await;
        if result.is_err() {
            // The plugin reports link faults through write failures; the
            // session manager decides whether to reconnect.
            self.connected = None;
        }
        result
    }

    fn is_connected(&self) -> bool {
        self.connected.is_some()
    }
}
