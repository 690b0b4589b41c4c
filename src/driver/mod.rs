/* Driver match table: the bus/vendor/product identities bound to the backlight driver, the
 * `bus:vid:pid` pattern parser used by the config file, and the lookup applied to hotplug events. */
pub mod magic_backlight;

use std::collections::HashSet;
use std::fmt;

/* USB identity shared by the T2 keyboard and touch bar backlight interfaces. */
pub const USB_VENDOR_ID_APPLE: u16 = 0x05ac;
pub const USB_DEVICE_ID_APPLE_TOUCHBAR_BACKLIGHT: u16 = 0x8102;

/* Bus protocol identifier used in match patterns and udev HID_ID values. */
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BusType {
    Usb,
    Bluetooth,
    Other(String),
}

impl BusType {
    /* Convert the numeric bustype from a udev HID_ID attribute into a BusType. */
    pub fn from_u16(bustype: u16) -> Self {
        match bustype {
            0x03 => BusType::Usb,
            0x05 => BusType::Bluetooth,
            other => BusType::Other(format!("{:04x}", other)),
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "usb" => BusType::Usb,
            "bluetooth" => BusType::Bluetooth,
            other => BusType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for BusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusType::Usb => f.write_str("usb"),
            BusType::Bluetooth => f.write_str("bluetooth"),
            BusType::Other(s) => f.write_str(s),
        }
    }
}

/* One `bus:vid:pid` identity the driver binds to. */
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HidDeviceId {
    pub bustype: BusType,
    pub vid: u16,
    pub pid: u16,
}

impl fmt::Display for HidDeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:04x}:{:04x}", self.bustype, self.vid, self.pid)
    }
}

/* Built-in identities. The touch bar backlight interface shares this one;  */
/* the probe tells the two apart by their report collections.             */
pub fn builtin_ids() -> Vec<HidDeviceId> {
    vec![HidDeviceId {
        bustype: BusType::Usb,
        vid: USB_VENDOR_ID_APPLE,
        pid: USB_DEVICE_ID_APPLE_TOUCHBAR_BACKLIGHT,
    }]
}

/* Parse a match string like `"usb:05ac:8102;usb:05ac:8103"`. */
pub fn parse_device_matches(s: &str) -> Result<Vec<HidDeviceId>, String> {
    let mut matches = Vec::new();

    for part in s.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let segments: Vec<&str> = part.split(':').collect();
        if segments.len() != 3 {
            return Err(format!("Invalid DeviceMatch pattern: {}", part));
        }

        let bustype = BusType::from_str(segments[0]);
        let vid = u16::from_str_radix(segments[1], 16)
            .map_err(|e| format!("Invalid VID in '{}': {}", part, e))?;
        let pid = u16::from_str_radix(segments[2], 16)
            .map_err(|e| format!("Invalid PID in '{}': {}", part, e))?;

        matches.push(HidDeviceId { bustype, vid, pid });
    }

    if matches.is_empty() {
        return Err("DeviceMatch is empty".to_string());
    }

    Ok(matches)
}

/* Set of identities hotplug events are filtered against. */
#[derive(Debug, Clone)]
pub struct DeviceTable {
    ids: HashSet<HidDeviceId>,
}

impl DeviceTable {
    /* Built-in identities plus any configured extras. */
    pub fn new(extra: &[HidDeviceId]) -> Self {
        let ids = builtin_ids().into_iter().chain(extra.iter().cloned()).collect();
        Self { ids }
    }

    pub fn matches(&self, bustype: u16, vid: u16, pid: u16) -> bool {
        self.ids.contains(&HidDeviceId {
            bustype: BusType::from_u16(bustype),
            vid,
            pid,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_matches_single() {
        let matches = parse_device_matches("usb:05ac:8102").unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].bustype, BusType::Usb);
        assert_eq!(matches[0].vid, 0x05ac);
        assert_eq!(matches[0].pid, 0x8102);
    }

    #[test]
    fn test_parse_device_matches_multiple() {
        let matches = parse_device_matches("usb:05ac:8102; bluetooth:05ac:0267;").unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[1].bustype, BusType::Bluetooth);
        assert_eq!(matches[1].pid, 0x0267);
    }

    #[test]
    fn test_parse_device_matches_invalid() {
        assert!(parse_device_matches("usb:05ac").is_err());
        assert!(parse_device_matches("usb:zzzz:8102").is_err());
        assert!(parse_device_matches("").is_err());
    }

    #[test]
    fn test_device_table_builtin() {
        let table = DeviceTable::new(&[]);
        assert_eq!(table.len(), 1);
        assert!(table.matches(0x03, 0x05ac, 0x8102));
        assert!(!table.matches(0x05, 0x05ac, 0x8102));
        assert!(!table.matches(0x03, 0x05ac, 0x8302));
    }

    #[test]
    fn test_device_table_extra_and_duplicates() {
        let extra = parse_device_matches("usb:05ac:8102;usb:05ac:8103").unwrap();
        let table = DeviceTable::new(&extra);
        assert_eq!(table.len(), 2);
        assert!(table.matches(0x03, 0x05ac, 0x8103));
    }

    #[test]
    fn test_bustype_from_u16() {
        assert_eq!(BusType::from_u16(0x03), BusType::Usb);
        assert_eq!(BusType::from_u16(0x05), BusType::Bluetooth);
        assert_eq!(BusType::from_u16(0x01), BusType::Other("0001".to_string()));
    }

    #[test]
    fn test_device_id_display() {
        assert_eq!(builtin_ids()[0].to_string(), "usb:05ac:8102");
    }
}
