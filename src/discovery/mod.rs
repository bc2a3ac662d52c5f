//! # Device Discovery Heuristics
//!
//! Thermal printer firmware rarely advertises anything identifying itself as
//! a printer. Discovery therefore works on two weak signals:
//!
//! 1. **Name fragments** — vendor/model prefixes the supported printers ship
//!    with out of the box ("GP-M322", "Printer_BE62", ...)
//! 2. **Service UUIDs** — the short list of GATT services these printers
//!    expose (see [`uuids`])
//!
//! Each transport runs the same tier ladder against its own platform API,
//! first success wins:
//!
//! | Tier | Strategy                                             |
//! |------|------------------------------------------------------|
//! | 0    | Silent reconnect by persisted device id (native only)|
//! | 1    | Filtered request: name prefixes + known service UUIDs|
//! | 2    | Broad "accept all devices" request                   |
//!
//! The matching heuristic itself is a pure function so it can be shared and
//! tested without any platform in the loop. The tables are configuration
//! data; adding a printer model means adding a string here, not touching the
//! tier logic.

pub mod uuids;

use std::time::Duration;

/// Known full/partial printer names (substring match)
pub const KNOWN_PRINTER_NAMES: &[&str] = &["GP-M322", "GP-M421", "Gprinter", "Printer_BE62"];

/// Known printer name prefixes (prefix match)
pub const KNOWN_NAME_PREFIXES: &[&str] = &["GP-", "GP", "Printer_", "Printer-"];

/// How long a scan tier listens before it is considered exhausted
pub const SCAN_WINDOW: Duration = Duration::from_secs(7);

/// Whether an advertised/bonded device name plausibly belongs to a printer.
///
/// A device matches when its name contains any known printer name or starts
/// with any known prefix. Empty names never match.
///
/// ## Example
///
/// ```
/// use rotulo::discovery::is_plausible_printer;
///
/// assert!(is_plausible_printer("GP-M322"));
/// assert!(is_plausible_printer("Printer_BE62_A1"));
/// assert!(!is_plausible_printer("JBL Flip 5"));
/// ```
pub fn is_plausible_printer(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    KNOWN_PRINTER_NAMES.iter().any(|n| name.contains(n))
        || KNOWN_NAME_PREFIXES.iter().any(|p| name.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_model_names_match() {
        assert!(is_plausible_printer("GP-M322"));
        assert!(is_plausible_printer("GP-M421"));
        assert!(is_plausible_printer("Gprinter 58mm"));
        assert!(is_plausible_printer("Printer_BE62"));
    }

    #[test]
    fn test_prefixes_match() {
        assert!(is_plausible_printer("GP-58N"));
        assert!(is_plausible_printer("Printer_0042"));
        assert!(is_plausible_printer("Printer-West"));
    }

    #[test]
    fn test_substring_model_inside_longer_name() {
        assert!(is_plausible_printer("Shop Gprinter back office"));
    }

    #[test]
    fn test_non_printers_do_not_match() {
        assert!(!is_plausible_printer(""));
        assert!(!is_plausible_printer("JBL Flip 5"));
        assert!(!is_plausible_printer("Galaxy Buds"));
        // prefix must be at the start
        assert!(!is_plausible_printer("MyGP-M999"));
    }
}
