//! # BLE Web Transport
//!
//! Drives a browser-style Web Bluetooth GATT API through the [`GattBridge`]
//! trait. The bridge is an external collaborator: in production it is backed
//! by the embedding runtime's GATT bindings, in tests by a scripted fake.
//!
//! ## Capability Gaps
//!
//! Web Bluetooth needs a secure context and does not exist at all on iOS.
//! Both are detected up front and surfaced as
//! [`Error::CapabilityUnavailable`] with a remediation message — there is
//! nothing to retry.
//!
//! ## User Gesture Precondition
//!
//! `connect()` must be called synchronously from a user-input handler:
//! browsers refuse the device-picker prompt otherwise. A short settle delay
//! is inserted before the first picker request so the gesture is still
//! considered live by the time the platform call lands; the delay is a
//! tunable constant, not a guarantee.
//!
//! ## Discovery Tiers
//!
//! 1. Filtered request: printer name prefixes + known service UUIDs
//! 2. Accept-all request with the broad optional-service table
//!
//! After connection, service/characteristic resolution degrades the same
//! way: known UUIDs in priority order, then full enumeration looking for
//! anything writable. Printer firmware UUIDs vary too widely to fail hard on
//! the catalogued list.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::discovery::{self, uuids};
use crate::error::Error;
use crate::transport::{MAX_BLE_WRITE, PrinterDevice, Transport, TransportKind};

/// Delay between the user gesture and the device-picker request
pub const GESTURE_SETTLE: Duration = Duration::from_millis(80);

/// Platform family reported by the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Android,
    Ios,
    Desktop,
}

/// One filter entry of a device request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceFilter {
    /// Match devices whose advertised name starts with this prefix
    NamePrefix(String),
    /// Match devices advertising any of these services
    Services(Vec<Uuid>),
}

/// A `requestDevice`-shaped discovery request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRequest {
    /// When true, no filters apply and the platform lists everything
    pub accept_all: bool,
    /// Filters (ignored when `accept_all`)
    pub filters: Vec<DeviceFilter>,
    /// Services the platform should expose after connection
    pub optional_services: Vec<Uuid>,
}

/// Device handle returned by the platform picker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeDevice {
    pub id: String,
    pub name: Option<String>,
}

/// A resolved GATT service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceHandle {
    pub id: String,
    pub uuid: Uuid,
}

/// A resolved GATT characteristic with its write capabilities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicHandle {
    pub id: String,
    pub uuid: Uuid,
    pub write: bool,
    pub write_without_response: bool,
}

impl CharacteristicHandle {
    /// Usable for printing: any write capability counts
    pub fn is_writable(&self) -> bool {
        self.write || self.write_without_response
    }
}

/// # GATT Bridge
///
/// The seam between this transport and the platform's Web Bluetooth
/// implementation. Mirrors the browser API shape: a picker request, a GATT
/// connection per device, service/characteristic lookup by UUID or by
/// enumeration, and write-without-response.
#[async_trait]
pub trait GattBridge: Send + Sync {
    /// Whether the GATT API exists at all (`navigator.bluetooth`)
    fn is_available(&self) -> bool;
    /// Whether the page/runtime is a secure context
    fn is_secure_context(&self) -> bool;
    /// Host platform family
    fn platform(&self) -> Platform;

    /// Show the device picker. `Ok(None)` means the user cancelled or the
    /// platform returned nothing.
    async fn request_device(&self, request: &DeviceRequest)
    -> Result<Option<BridgeDevice>, Error>;

    /// Open the GATT connection to a picked device
    async fn gatt_connect(&self, device: &BridgeDevice) -> Result<(), Error>;
    /// Drop the GATT connection
    async fn gatt_disconnect(&self, device: &BridgeDevice);
    /// Whether the GATT link is still up
    fn gatt_connected(&self, device: &BridgeDevice) -> bool;

    /// Look up one primary service by UUID (`Ok(None)` when absent)
    async fn primary_service(
        &self,
        device: &BridgeDevice,
        uuid: Uuid,
    ) -> Result<Option<ServiceHandle>, Error>;
    /// Enumerate all primary services
    async fn primary_services(&self, device: &BridgeDevice) -> Result<Vec<ServiceHandle>, Error>;

    /// Look up one characteristic by UUID within a service
    async fn characteristic(
        &self,
        service: &ServiceHandle,
        uuid: Uuid,
    ) -> Result<Option<CharacteristicHandle>, Error>;
    /// Enumerate all characteristics of a service
    async fn characteristics(
        &self,
        service: &ServiceHandle,
    ) -> Result<Vec<CharacteristicHandle>, Error>;

    /// Write one buffer without response
    async fn write_without_response(
        &self,
        characteristic: &CharacteristicHandle,
        data: &[u8],
    ) -> Result<(), Error>;
}

/// Live link state, constructed whole on connect and dropped whole on
/// disconnect
struct Link {
    device: BridgeDevice,
    characteristic: CharacteristicHandle,
}

/// Web Bluetooth transport over a [`GattBridge`]
pub struct BleWebTransport<G: GattBridge> {
    bridge: G,
    settle: Duration,
    link: Option<Link>,
}

impl<G: GattBridge> BleWebTransport<G> {
    pub fn new(bridge: G) -> Self {
        Self {
            bridge,
            settle: GESTURE_SETTLE,
            link: None,
        }
    }

    /// Override the user-gesture settle delay (some WebViews need more)
    pub fn set_settle_delay(&mut self, settle: Duration) {
        self.settle = settle;
    }

    /// Capability gate. Cheap, synchronous, and run before any platform call.
    fn check_capability(&self) -> Result<(), Error> {
        if !self.bridge.is_available() {
            return Err(Error::CapabilityUnavailable(
                "Web Bluetooth is not supported here; use Chrome on Android or desktop"
                    .to_string(),
            ));
        }
        if !self.bridge.is_secure_context() {
            return Err(Error::CapabilityUnavailable(
                "Bluetooth requires a secure context (HTTPS or localhost)".to_string(),
            ));
        }
        if self.bridge.platform() == Platform::Ios {
            return Err(Error::CapabilityUnavailable(
                "Web Bluetooth is not supported on iOS; use an Android device".to_string(),
            ));
        }
        Ok(())
    }

    /// Tier 1 request: pre-filtered picker
    fn filtered_request() -> DeviceRequest {
        let mut filters: Vec<DeviceFilter> = discovery::KNOWN_NAME_PREFIXES
            .iter()
            .map(|p| DeviceFilter::NamePrefix((*p).to_string()))
            .collect();
        filters.push(DeviceFilter::Services(uuids::PRINTER_SERVICES.to_vec()));
        DeviceRequest {
            accept_all: false,
            filters,
            optional_services: uuids::PRINTER_SERVICES.to_vec(),
        }
    }

    /// Tier 2 request: everything, with the long optional-service table
    fn broad_request() -> DeviceRequest {
        DeviceRequest {
            accept_all: true,
            filters: Vec::new(),
            optional_services: uuids::BROAD_DISCOVERY_SERVICES.to_vec(),
        }
    }

    /// Run the two picker tiers; first device wins
    async fn discover(&self) -> Result<BridgeDevice, Error> {
        debug!("ble-web: tier 1 filtered device request");
        match self.bridge.request_device(&Self::filtered_request()).await {
            Ok(Some(device)) => return Ok(device),
            Ok(None) => debug!("ble-web: filtered request returned nothing"),
            Err(err) => debug!("ble-web: filtered request failed: {err}"),
        }

        debug!("ble-web: tier 2 accept-all device request");
        match self.bridge.request_device(&Self::broad_request()).await {
            Ok(Some(device)) => Ok(device),
            Ok(None) => Err(Error::DiscoveryFailed(
                "no device selected after filtered and broad requests".to_string(),
            )),
            Err(err) => Err(Error::DiscoveryFailed(format!(
                "broad device request failed: {err}"
            ))),
        }
    }

    /// Resolve a writable characteristic, known UUIDs first, then full
    /// enumeration
    async fn resolve_characteristic(
        &self,
        device: &BridgeDevice,
    ) -> Result<CharacteristicHandle, Error> {
        // Tier A: catalogued services in priority order
        for &service_uuid in uuids::PRINTER_SERVICES {
            let Some(service) = self.bridge.primary_service(device, service_uuid).await? else {
                continue;
            };
            debug!("ble-web: found known service {service_uuid}");
            if let Some(ch) = self.writable_in_service(&service).await? {
                return Ok(ch);
            }
        }

        // Tier B: enumerate everything the device exposes
        debug!("ble-web: no known service usable, enumerating all primaries");
        for service in self.bridge.primary_services(device).await? {
            if let Some(ch) = self.writable_in_service(&service).await? {
                warn!(
                    "ble-web: using uncatalogued service {} / characteristic {}",
                    service.uuid, ch.uuid
                );
                return Ok(ch);
            }
        }

        Err(Error::ServiceResolution(
            "no write or write-without-response characteristic on this device".to_string(),
        ))
    }

    /// Known characteristic UUIDs first, then anything writable
    async fn writable_in_service(
        &self,
        service: &ServiceHandle,
    ) -> Result<Option<CharacteristicHandle>, Error> {
        for &char_uuid in uuids::WRITE_CHARACTERISTICS {
            if let Some(ch) = self.bridge.characteristic(service, char_uuid).await? {
                if ch.is_writable() {
                    return Ok(Some(ch));
                }
            }
        }
        let all = self.bridge.characteristics(service).await?;
        Ok(all.into_iter().find(CharacteristicHandle::is_writable))
    }
}

#[async_trait]
impl<G: GattBridge> Transport for BleWebTransport<G> {
    fn kind(&self) -> TransportKind {
        TransportKind::BleWeb
    }

    async fn connect(&mut self, target: Option<&str>) -> Result<PrinterDevice, Error> {
        self.check_capability()?;

        if let Some(link) = self.link.take() {
            self.bridge.gatt_disconnect(&link.device).await;
        }

        // Keep the user gesture "live" on platforms that gate the picker
        // prompt on gesture freshness.
        tokio::time::sleep(self.settle).await;

        let device = match target {
            Some(id) => BridgeDevice {
                id: id.to_string(),
                name: None,
            },
            None => self.discover().await?,
        };

        self.bridge.gatt_connect(&device).await.map_err(|err| {
            Error::Connection(format!("GATT connect to {} failed: {err}", device.id))
        })?;

        let characteristic = match self.resolve_characteristic(&device).await {
            Ok(ch) => ch,
            Err(err) => {
                self.bridge.gatt_disconnect(&device).await;
                return Err(err);
            }
        };

        let printer = PrinterDevice {
            id: device.id.clone(),
            display_name: device.name.clone().unwrap_or_else(|| "Unknown".to_string()),
            kind: TransportKind::BleWeb,
        };
        info!(
            "ble-web: connected to {} via characteristic {}",
            printer.display_name, characteristic.uuid
        );
        self.link = Some(Link {
            device,
            characteristic,
        });
        Ok(printer)
    }

    async fn disconnect(&mut self) -> Result<(), Error> {
        if let Some(link) = self.link.take() {
            self.bridge.gatt_disconnect(&link.device).await;
        }
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        let link = self
            .link
            .as_ref()
            .ok_or_else(|| Error::Write("printer is not connected".to_string()))?;
        if data.len() > MAX_BLE_WRITE {
            return Err(Error::Write(format!(
                "buffer of {} bytes exceeds the {MAX_BLE_WRITE}-byte BLE write limit",
                data.len()
            )));
        }
        if !self.bridge.gatt_connected(&link.device) {
            self.link = None;
            return Err(Error::Write("connection dropped".to_string()));
        }
        self.bridge
            .write_without_response(&link.characteristic, data)
            .await
    }

    fn is_connected(&self) -> bool {
        self.link
            .as_ref()
            .is_some_and(|link| self.bridge.gatt_connected(&link.device))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Scriptable bridge: records every request, serves canned answers
    struct FakeBridge {
        available: bool,
        secure: bool,
        platform: Platform,
        /// Device returned per request tier: (filtered, broad)
        filtered_result: Option<BridgeDevice>,
        broad_result: Option<BridgeDevice>,
        /// Services present by UUID, each with one writable characteristic
        known_service: Option<Uuid>,
        enumerated: Vec<(ServiceHandle, Vec<CharacteristicHandle>)>,
        requests: Mutex<Vec<bool>>, // accept_all flag of each request
        writes: Mutex<Vec<Vec<u8>>>,
    }

    impl FakeBridge {
        fn new() -> Self {
            Self {
                available: true,
                secure: true,
                platform: Platform::Android,
                filtered_result: None,
                broad_result: None,
                known_service: None,
                enumerated: Vec::new(),
                requests: Mutex::new(Vec::new()),
                writes: Mutex::new(Vec::new()),
            }
        }

        fn writable(uuid: Uuid) -> CharacteristicHandle {
            CharacteristicHandle {
                id: uuid.to_string(),
                uuid,
                write: false,
                write_without_response: true,
            }
        }
    }

    #[async_trait]
    impl GattBridge for FakeBridge {
        fn is_available(&self) -> bool {
            self.available
        }
        fn is_secure_context(&self) -> bool {
            self.secure
        }
        fn platform(&self) -> Platform {
            self.platform
        }

        async fn request_device(
            &self,
            request: &DeviceRequest,
        ) -> Result<Option<BridgeDevice>, Error> {
            self.requests.lock().unwrap().push(request.accept_all);
            if request.accept_all {
                Ok(self.broad_result.clone())
            } else {
                Ok(self.filtered_result.clone())
            }
        }

        async fn gatt_connect(&self, _device: &BridgeDevice) -> Result<(), Error> {
            Ok(())
        }
        async fn gatt_disconnect(&self, _device: &BridgeDevice) {}
        fn gatt_connected(&self, _device: &BridgeDevice) -> bool {
            true
        }

        async fn primary_service(
            &self,
            _device: &BridgeDevice,
            uuid: Uuid,
        ) -> Result<Option<ServiceHandle>, Error> {
            Ok(self.known_service.filter(|&u| u == uuid).map(|u| {
                ServiceHandle {
                    id: u.to_string(),
                    uuid: u,
                }
            }))
        }

        async fn primary_services(
            &self,
            _device: &BridgeDevice,
        ) -> Result<Vec<ServiceHandle>, Error> {
            Ok(self.enumerated.iter().map(|(s, _)| s.clone()).collect())
        }

        async fn characteristic(
            &self,
            service: &ServiceHandle,
            uuid: Uuid,
        ) -> Result<Option<CharacteristicHandle>, Error> {
            if self.known_service == Some(service.uuid) && uuid == uuids::WRITE_CHARACTERISTICS[0]
            {
                return Ok(Some(Self::writable(uuid)));
            }
            Ok(self
                .enumerated
                .iter()
                .find(|(s, _)| s.id == service.id)
                .and_then(|(_, chars)| chars.iter().find(|c| c.uuid == uuid).cloned()))
        }

        async fn characteristics(
            &self,
            service: &ServiceHandle,
        ) -> Result<Vec<CharacteristicHandle>, Error> {
            Ok(self
                .enumerated
                .iter()
                .find(|(s, _)| s.id == service.id)
                .map(|(_, chars)| chars.clone())
                .unwrap_or_default())
        }

        async fn write_without_response(
            &self,
            _characteristic: &CharacteristicHandle,
            data: &[u8],
        ) -> Result<(), Error> {
            self.writes.lock().unwrap().push(data.to_vec());
            Ok(())
        }
    }

    fn quick_transport(bridge: FakeBridge) -> BleWebTransport<FakeBridge> {
        let mut t = BleWebTransport::new(bridge);
        t.set_settle_delay(Duration::from_millis(0));
        t
    }

    #[tokio::test]
    async fn test_capability_gate_no_bluetooth() {
        let mut bridge = FakeBridge::new();
        bridge.available = false;
        let mut transport = quick_transport(bridge);
        let err = transport.connect(None).await.unwrap_err();
        assert!(matches!(err, Error::CapabilityUnavailable(_)));
    }

    #[tokio::test]
    async fn test_capability_gate_insecure_context() {
        let mut bridge = FakeBridge::new();
        bridge.secure = false;
        let mut transport = quick_transport(bridge);
        let err = transport.connect(None).await.unwrap_err();
        assert!(matches!(err, Error::CapabilityUnavailable(_)));
    }

    #[tokio::test]
    async fn test_capability_gate_ios() {
        let mut bridge = FakeBridge::new();
        bridge.platform = Platform::Ios;
        let mut transport = quick_transport(bridge);
        let err = transport.connect(None).await.unwrap_err();
        assert!(matches!(err, Error::CapabilityUnavailable(_)));
    }

    #[tokio::test]
    async fn test_broad_tier_attempted_before_discovery_failed() {
        // Tier 1 yields nothing; tier 2 must be issued before giving up
        let mut transport = quick_transport(FakeBridge::new());
        let err = transport.connect(None).await.unwrap_err();
        assert!(matches!(err, Error::DiscoveryFailed(_)));
        let requests = transport.bridge.requests.lock().unwrap().clone();
        assert_eq!(requests, vec![false, true]); // filtered, then accept-all
    }

    #[tokio::test]
    async fn test_filtered_tier_success_skips_broad() {
        let mut bridge = FakeBridge::new();
        bridge.filtered_result = Some(BridgeDevice {
            id: "dev-1".to_string(),
            name: Some("GP-M322".to_string()),
        });
        bridge.known_service = Some(uuids::PRINTER_SERVICES[0]);
        let mut transport = quick_transport(bridge);

        let printer = transport.connect(None).await.unwrap();
        assert_eq!(printer.display_name, "GP-M322");
        assert_eq!(printer.kind, TransportKind::BleWeb);
        let requests = transport.bridge.requests.lock().unwrap().clone();
        assert_eq!(requests, vec![false]);
    }

    #[tokio::test]
    async fn test_resolution_falls_back_to_enumeration() {
        let mut bridge = FakeBridge::new();
        bridge.filtered_result = Some(BridgeDevice {
            id: "dev-2".to_string(),
            name: Some("Printer_BE62".to_string()),
        });
        // No catalogued service; one odd vendor service with a writable char
        let vendor = uuid::Uuid::from_u128(0xDEAD_BEEF);
        bridge.enumerated = vec![(
            ServiceHandle {
                id: "svc".to_string(),
                uuid: vendor,
            },
            vec![
                CharacteristicHandle {
                    id: "ro".to_string(),
                    uuid: uuid::Uuid::from_u128(1),
                    write: false,
                    write_without_response: false,
                },
                FakeBridge::writable(uuid::Uuid::from_u128(2)),
            ],
        )];
        let mut transport = quick_transport(bridge);

        transport.connect(None).await.unwrap();
        assert!(transport.is_connected());
        assert_eq!(
            transport.link.as_ref().unwrap().characteristic.uuid,
            uuid::Uuid::from_u128(2)
        );
    }

    #[tokio::test]
    async fn test_no_writable_characteristic_is_terminal() {
        let mut bridge = FakeBridge::new();
        bridge.filtered_result = Some(BridgeDevice {
            id: "dev-3".to_string(),
            name: Some("GP-58N".to_string()),
        });
        // Device exposes services but nothing writable
        bridge.enumerated = vec![(
            ServiceHandle {
                id: "svc".to_string(),
                uuid: uuid::Uuid::from_u128(7),
            },
            vec![CharacteristicHandle {
                id: "ro".to_string(),
                uuid: uuid::Uuid::from_u128(8),
                write: false,
                write_without_response: false,
            }],
        )];
        let mut transport = quick_transport(bridge);
        let err = transport.connect(None).await.unwrap_err();
        assert!(matches!(err, Error::ServiceResolution(_)));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_oversized_write_fails_loudly() {
        let mut bridge = FakeBridge::new();
        bridge.filtered_result = Some(BridgeDevice {
            id: "dev-4".to_string(),
            name: Some("GP-M421".to_string()),
        });
        bridge.known_service = Some(uuids::PRINTER_SERVICES[0]);
        let mut transport = quick_transport(bridge);
        transport.connect(None).await.unwrap();

        let err = transport.write(&vec![0u8; MAX_BLE_WRITE + 1]).await.unwrap_err();
        assert!(matches!(err, Error::Write(_)));
        assert!(transport.bridge.writes.lock().unwrap().is_empty());

        transport.write(&[0x1B, 0x40]).await.unwrap();
        assert_eq!(
            transport.bridge.writes.lock().unwrap().as_slice(),
            &[vec![0x1B, 0x40]]
        );
    }
}
