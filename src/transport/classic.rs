//! # Bluetooth Classic Serial Transport
//!
//! RFCOMM/SPP transport for printers already paired at the OS level.
//! Discovery here is static: list bonded devices, pick the one whose name
//! matches the printer heuristic. No scan window, no picker.
//!
//! ## Connection Path (Linux)
//!
//! 1. `bluetoothctl devices Paired` lists bonded devices with names
//! 2. The name heuristic picks a candidate (first bonded device otherwise)
//! 3. `/proc/net/rfcomm` (or `rfcomm -a`) locates an existing `/dev/rfcommN`
//!    binding for that MAC; `rfcomm bind` creates one when missing
//! 4. The device node is opened and switched to raw TTY mode
//!
//! ## TTY Configuration
//!
//! The RFCOMM device is a tty; without raw mode the line discipline mangles
//! binary data. Everything is disabled: input processing, output
//! post-processing, echo, canonical mode, and crucially XON/XOFF software
//! flow control — 0x11 (XON) and 0x13 (XOFF) occur routinely in packed
//! raster data.
//!
//! ## Chunked Writes
//!
//! Writes go out in 1024-byte chunks with a short delay between them so the
//! printer's modest serial buffer keeps up. This is a link-reliability
//! detail below the session manager's 180-byte job chunking and never splits
//! those chunks further.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write as _};
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::discovery;
use crate::error::Error;
use crate::transport::{PrinterDevice, Transport, TransportKind};

/// Chunk size for serial writes (bytes)
const CHUNK_SIZE: usize = 1024;

/// Delay between serial chunks
const CHUNK_DELAY: Duration = Duration::from_millis(2);

/// RFCOMM channel used when binding (standard for SPP)
const SPP_CHANNEL: u8 = 1;

/// A device bonded at the OS level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BondedDevice {
    pub mac: String,
    pub name: String,
}

/// Classic Bluetooth (SPP) printer transport
pub struct ClassicSerialTransport {
    file: Option<File>,
    device: Option<PrinterDevice>,
}

impl ClassicSerialTransport {
    pub fn new() -> Self {
        Self {
            file: None,
            device: None,
        }
    }

    /// Pick the bonded device to talk to: name-heuristic match, else the
    /// first bonded device (a bonded list of one is almost always the
    /// printer the user just paired).
    fn pick_candidate(devices: &[BondedDevice]) -> Option<&BondedDevice> {
        devices
            .iter()
            .find(|d| discovery::is_plausible_printer(&d.name))
            .or_else(|| devices.first())
    }

    /// Resolve the /dev/rfcommN path for a MAC, binding one if needed
    fn resolve_device_path(mac: &str) -> Result<String, Error> {
        if let Some(path) = find_rfcomm_for_mac(mac)? {
            return Ok(path);
        }
        debug!("classic: no rfcomm binding for {mac}, binding slot 0");
        bind_rfcomm(mac, 0)
    }

    fn open_raw(path: &str) -> Result<File, Error> {
        let file = OpenOptions::new().write(true).open(path).map_err(|e| {
            Error::Connection(format!("failed to open {path}: {e}"))
        })?;
        configure_tty_raw(file.as_raw_fd())?;
        Ok(file)
    }
}

impl Default for ClassicSerialTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ClassicSerialTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::ClassicSerial
    }

    async fn connect(&mut self, target: Option<&str>) -> Result<PrinterDevice, Error> {
        self.file = None;
        self.device = None;

        let candidate = match target {
            Some(mac) => {
                if !is_valid_mac(mac) {
                    return Err(Error::Connection(format!(
                        "'{mac}' is not a Bluetooth MAC address"
                    )));
                }
                BondedDevice {
                    mac: mac.to_string(),
                    name: mac.to_string(),
                }
            }
            None => {
                // bluetoothctl is a blocking shell-out; keep it off the
                // async executor.
                let bonded = tokio::task::spawn_blocking(list_paired_devices)
                    .await
                    .map_err(|e| Error::Connection(format!("device listing failed: {e}")))??;
                if bonded.is_empty() {
                    return Err(Error::DiscoveryFailed(
                        "no bonded Bluetooth devices; pair the printer in OS settings first"
                            .to_string(),
                    ));
                }
                Self::pick_candidate(&bonded)
                    .cloned()
                    .ok_or_else(|| Error::DiscoveryFailed("no bonded candidate".to_string()))?
            }
        };

        // rfcomm lookup/bind shells out and waits on udev; same treatment.
        let mac = candidate.mac.clone();
        let (file, path) = tokio::task::spawn_blocking(move || {
            let path = Self::resolve_device_path(&mac)?;
            let file = Self::open_raw(&path)?;
            Ok::<_, Error>((file, path))
        })
        .await
        .map_err(|e| Error::Connection(format!("rfcomm setup failed: {e}")))??;
        info!("classic: connected to {} via {path}", candidate.name);

        let device = PrinterDevice {
            id: candidate.mac,
            display_name: candidate.name,
            kind: TransportKind::ClassicSerial,
        };
        self.file = Some(file);
        self.device = Some(device.clone());
        Ok(device)
    }

    async fn disconnect(&mut self) -> Result<(), Error> {
        // Dropping the File closes the tty; the RFCOMM binding stays for
        // the next session.
        self.file = None;
        self.device = None;
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| Error::Write("printer is not connected".to_string()))?;

        for chunk in data.chunks(CHUNK_SIZE) {
            file.write_all(chunk)
                .map_err(|e| Error::Write(format!("serial write failed: {e}")))?;
            if data.len() > CHUNK_SIZE {
                tokio::time::sleep(CHUNK_DELAY).await;
            }
        }
        file.flush()
            .map_err(|e| Error::Write(format!("serial flush failed: {e}")))?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.file.is_some()
    }
}

// ============================================================================
// BONDED DEVICE LISTING
// ============================================================================

/// List OS-paired devices via bluetoothctl.
///
/// Newer bluetoothctl spells it `devices Paired`, older releases
/// `paired-devices`; both print `Device XX:XX:XX:XX:XX:XX Name...` lines.
pub fn list_paired_devices() -> Result<Vec<BondedDevice>, Error> {
    let output = Command::new("bluetoothctl")
        .args(["devices", "Paired"])
        .output()
        .map_err(|e| Error::Connection(format!("failed to run bluetoothctl: {e}")))?;

    let mut devices = parse_paired_list(&String::from_utf8_lossy(&output.stdout));
    if devices.is_empty() {
        let output = Command::new("bluetoothctl")
            .arg("paired-devices")
            .output()
            .map_err(|e| Error::Connection(format!("failed to run bluetoothctl: {e}")))?;
        devices = parse_paired_list(&String::from_utf8_lossy(&output.stdout));
    }
    Ok(devices)
}

/// Parse `bluetoothctl` device-list output
pub fn parse_paired_list(output: &str) -> Vec<BondedDevice> {
    output
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix("Device ")?;
            let (mac, name) = rest.split_once(' ')?;
            if !is_valid_mac(mac) {
                return None;
            }
            Some(BondedDevice {
                mac: mac.to_string(),
                name: name.trim().to_string(),
            })
        })
        .collect()
}

// ============================================================================
// RFCOMM SETUP
// ============================================================================

/// Validate a Bluetooth MAC address format (XX:XX:XX:XX:XX:XX).
pub fn is_valid_mac(mac: &str) -> bool {
    let parts: Vec<&str> = mac.split(':').collect();
    if parts.len() != 6 {
        return false;
    }
    parts
        .iter()
        .all(|part| part.len() == 2 && part.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Find an existing RFCOMM device bound to the given MAC address.
///
/// Checks `/proc/net/rfcomm` first, then falls back to `rfcomm -a`.
/// Returns the device path (e.g., "/dev/rfcomm0") if found.
pub fn find_rfcomm_for_mac(mac: &str) -> Result<Option<String>, Error> {
    if let Ok(contents) = fs::read_to_string("/proc/net/rfcomm") {
        if let Some(dev) = parse_rfcomm_table(&contents, mac) {
            let path = format!("/dev/{dev}");
            if Path::new(&path).exists() {
                return Ok(Some(path));
            }
        }
    }

    let output = Command::new("rfcomm")
        .arg("-a")
        .output()
        .map_err(|e| Error::Connection(format!("failed to run 'rfcomm -a': {e}")))?;
    if let Some(dev) = parse_rfcomm_table(&String::from_utf8_lossy(&output.stdout), mac) {
        let path = format!("/dev/{dev}");
        if Path::new(&path).exists() {
            return Ok(Some(path));
        }
    }

    Ok(None)
}

/// Parse rfcomm table output (`rfcomm0: XX:XX:XX:XX:XX:XX channel 1 ...`)
/// and return the device name bound to `mac`, if any.
pub fn parse_rfcomm_table(contents: &str, mac: &str) -> Option<String> {
    let mac_upper = mac.to_uppercase();
    for line in contents.lines() {
        if line.to_uppercase().contains(&mac_upper) {
            if let Some(dev_name) = line.split(':').next() {
                return Some(dev_name.trim().to_string());
            }
        }
    }
    None
}

/// Bind an RFCOMM device for a MAC address and return its path.
///
/// Requires root privileges for `rfcomm bind`. Blocks while udev creates
/// the node; call it from a blocking task in async contexts.
pub fn bind_rfcomm(mac: &str, slot: u8) -> Result<String, Error> {
    let mac_upper = mac.to_uppercase();
    let device_path = format!("/dev/rfcomm{slot}");

    let output = Command::new("rfcomm")
        .args([
            "bind",
            &slot.to_string(),
            &mac_upper,
            &SPP_CHANNEL.to_string(),
        ])
        .output()
        .map_err(|e| Error::Connection(format!("failed to run rfcomm bind: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Connection(format!(
            "rfcomm bind failed: {}",
            stderr.trim()
        )));
    }

    // Give udev a moment to create the node
    std::thread::sleep(Duration::from_millis(500));

    if !Path::new(&device_path).exists() {
        return Err(Error::Connection(format!(
            "{device_path} was not created"
        )));
    }
    Ok(device_path)
}

// ============================================================================
// TTY CONFIGURATION
// ============================================================================

/// Configure a file descriptor for raw TTY mode.
///
/// Disables all input/output processing so binary data passes through
/// unmodified:
///
/// - **Input flags**: IGNBRK, BRKINT, PARMRK, ISTRIP, INLCR, IGNCR, ICRNL,
///   IXON, IXOFF, IXANY
/// - **Output flags**: OPOST
/// - **Local flags**: ECHO, ECHONL, ICANON, ISIG, IEXTEN
/// - **Control flags**: CSIZE, PARENB cleared, then CS8 set
///
/// IXON/IXOFF/IXANY matter most: 0x11 (XON) and 0x13 (XOFF) appear in
/// packed raster data and must not be eaten as flow control.
#[cfg(unix)]
fn configure_tty_raw(fd: i32) -> Result<(), Error> {
    use std::mem::MaybeUninit;

    let mut termios = MaybeUninit::uninit();
    let result = unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) };
    if result != 0 {
        return Err(Error::Connection(format!(
            "tcgetattr failed: {}",
            io::Error::last_os_error()
        )));
    }
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);
    termios.c_oflag &= !libc::OPOST;
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
    termios.c_cflag |= libc::CS8;

    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) };
    if result != 0 {
        return Err(Error::Connection(format!(
            "tcsetattr failed: {}",
            io::Error::last_os_error()
        )));
    }
    Ok(())
}

#[cfg(not(unix))]
fn configure_tty_raw(_fd: i32) -> Result<(), Error> {
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_mac_addresses() {
        assert!(is_valid_mac("00:11:22:33:44:55"));
        assert!(is_valid_mac("AA:BB:CC:DD:EE:FF"));
        assert!(is_valid_mac("aa:bb:cc:dd:ee:ff"));
    }

    #[test]
    fn test_invalid_mac_addresses() {
        assert!(!is_valid_mac("00:11:22:33:44")); // too short
        assert!(!is_valid_mac("00:11:22:33:44:55:66")); // too long
        assert!(!is_valid_mac("00-11-22-33-44-55")); // wrong separator
        assert!(!is_valid_mac("GG:HH:II:JJ:KK:LL")); // invalid hex
        assert!(!is_valid_mac(""));
    }

    #[test]
    fn test_parse_paired_list() {
        let output = "\
Device 00:11:62:AA:BB:CC GP-M322
Device 44:55:66:77:88:99 JBL Flip 5
not a device line
Device bad-mac Gprinter
";
        let devices = parse_paired_list(output);
        assert_eq!(
            devices,
            vec![
                BondedDevice {
                    mac: "00:11:62:AA:BB:CC".to_string(),
                    name: "GP-M322".to_string(),
                },
                BondedDevice {
                    mac: "44:55:66:77:88:99".to_string(),
                    name: "JBL Flip 5".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_parse_paired_list_empty() {
        assert!(parse_paired_list("").is_empty());
        assert!(parse_paired_list("No default controller available\n").is_empty());
    }

    #[test]
    fn test_pick_candidate_prefers_printer_names() {
        let devices = vec![
            BondedDevice {
                mac: "44:55:66:77:88:99".to_string(),
                name: "JBL Flip 5".to_string(),
            },
            BondedDevice {
                mac: "00:11:62:AA:BB:CC".to_string(),
                name: "Printer_BE62".to_string(),
            },
        ];
        let picked = ClassicSerialTransport::pick_candidate(&devices).unwrap();
        assert_eq!(picked.name, "Printer_BE62");
    }

    #[test]
    fn test_pick_candidate_falls_back_to_first() {
        let devices = vec![BondedDevice {
            mac: "44:55:66:77:88:99".to_string(),
            name: "Mystery Device".to_string(),
        }];
        let picked = ClassicSerialTransport::pick_candidate(&devices).unwrap();
        assert_eq!(picked.mac, "44:55:66:77:88:99");
    }

    #[tokio::test]
    async fn test_connect_rejects_malformed_target() {
        let mut transport = ClassicSerialTransport::new();
        let err = transport.connect(Some("not-a-mac")).await.unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
        assert!(!transport.is_connected());
    }

    #[test]
    fn test_parse_rfcomm_table() {
        let table = "rfcomm0: 00:11:62:AA:BB:CC channel 1 clean \n\
                     rfcomm1: 44:55:66:77:88:99 channel 1 clean \n";
        assert_eq!(
            parse_rfcomm_table(table, "00:11:62:aa:bb:cc"),
            Some("rfcomm0".to_string())
        );
        assert_eq!(
            parse_rfcomm_table(table, "44:55:66:77:88:99"),
            Some("rfcomm1".to_string())
        );
        assert_eq!(parse_rfcomm_table(table, "FF:FF:FF:FF:FF:FF"), None);
        assert_eq!(parse_rfcomm_table("", "00:11:62:AA:BB:CC"), None);
    }
}
