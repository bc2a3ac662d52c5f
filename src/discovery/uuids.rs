//! # Known GATT UUIDs
//!
//! Configuration data for discovery and service resolution. None of this is
//! logic: the tier algorithms iterate these tables without caring how long
//! they are.
//!
//! ## Why the tables exist
//!
//! - [`PRINTER_SERVICES`] / [`WRITE_CHARACTERISTICS`]: the de-facto UART
//!   service/characteristic pairs Gprinter-class firmware exposes. Tried in
//!   priority order during service resolution.
//! - [`BROAD_DISCOVERY_SERVICES`]: passed as *optional* services on the
//!   broad "accept all devices" request. Web-style GATT APIs only expose a
//!   service after connection if it was named in the request, so listing
//!   many standard services maximizes the chance of finding something
//!   writable on an uncatalogued device.

use uuid::Uuid;

/// Build a full 128-bit UUID from a 16-bit Bluetooth SIG short id.
///
/// Short ids sit in bits 96..112 of the Bluetooth base UUID
/// `00000000-0000-1000-8000-00805F9B34FB`.
///
/// ## Example
///
/// ```
/// use rotulo::discovery::uuids::uuid16;
///
/// assert_eq!(
///     uuid16(0xFFE0).to_string(),
///     "0000ffe0-0000-1000-8000-00805f9b34fb"
/// );
/// ```
pub const fn uuid16(short: u16) -> Uuid {
    Uuid::from_u128(((short as u128) << 96) | 0x0000_0000_0000_1000_8000_00805F9B34FB)
}

/// Known printer service UUIDs, in resolution priority order
pub const PRINTER_SERVICES: &[Uuid] = &[
    uuid16(0xFFE0), // common UART service
    uuid16(0xFF00), // alternative vendor service
    uuid16(0x1800), // Generic Access (last resort)
];

/// Known writable characteristic UUIDs, in resolution priority order
pub const WRITE_CHARACTERISTICS: &[Uuid] = &[
    uuid16(0xFFE1), // common UART characteristic
    uuid16(0xFF01), // alternative vendor characteristic
];

/// Primary service/characteristic pair used for plugin-routed writes
pub const PRIMARY_SERVICE: Uuid = uuid16(0xFFE0);
/// See [`PRIMARY_SERVICE`]
pub const PRIMARY_WRITE_CHARACTERISTIC: Uuid = uuid16(0xFFE1);

/// Standard GATT services enumerated on the broad discovery request
pub const BROAD_DISCOVERY_SERVICES: &[Uuid] = &[
    uuid16(0xFFE0), // UART service
    uuid16(0xFF00), // alternative vendor service
    uuid16(0x1800), // Generic Access
    uuid16(0x1801), // Generic Attribute
    uuid16(0x1802), // Immediate Alert
    uuid16(0x1803), // Link Loss
    uuid16(0x1804), // Tx Power
    uuid16(0x1805), // Current Time
    uuid16(0x1806), // Reference Time Update
    uuid16(0x1807), // Next DST Change
    uuid16(0x1808), // Glucose
    uuid16(0x1809), // Health Thermometer
    uuid16(0x180A), // Device Information
    uuid16(0x180D), // Heart Rate
    uuid16(0x180E), // Phone Alert Status
    uuid16(0x180F), // Battery
    uuid16(0x1810), // Blood Pressure
    uuid16(0x1811), // Alert Notification
    uuid16(0x1812), // Human Interface Device
    uuid16(0x1813), // Scan Parameters
    uuid16(0x1814), // Running Speed and Cadence
    uuid16(0x1815), // Automation IO
    uuid16(0x1816), // Cycling Speed and Cadence
    uuid16(0x1818), // Cycling Power
    uuid16(0x1819), // Location and Navigation
    uuid16(0x181A), // Environmental Sensing
    uuid16(0x181B), // Body Composition
    uuid16(0x181C), // User Data
    uuid16(0x181D), // Weight Scale
    uuid16(0x181E), // Bond Management
    uuid16(0x181F), // Continuous Glucose Monitoring
    uuid16(0x1820), // Internet Protocol Support
    uuid16(0x1821), // Indoor Positioning
    uuid16(0x1822), // Pulse Oximeter
    uuid16(0x1823), // HTTP Proxy
    uuid16(0x1824), // Transport Discovery
    uuid16(0x1825), // Object Transfer
    uuid16(0x1826), // Fitness Machine
    uuid16(0x1827), // Mesh Provisioning
    uuid16(0x1828), // Mesh Proxy
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid16_uses_bluetooth_base() {
        assert_eq!(
            uuid16(0x180F).to_string(),
            "0000180f-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(
            uuid16(0x0000).to_string(),
            "00000000-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn test_uart_pair_comes_first() {
        assert_eq!(PRINTER_SERVICES[0], uuid16(0xFFE0));
        assert_eq!(WRITE_CHARACTERISTICS[0], uuid16(0xFFE1));
    }

    #[test]
    fn test_broad_table_covers_printer_services() {
        for service in PRINTER_SERVICES {
            assert!(BROAD_DISCOVERY_SERVICES.contains(service));
        }
    }
}
