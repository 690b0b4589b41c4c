/* Daemon configuration: optional INI file named by MAGIC_BACKLIGHTD_CONFIG selecting the DBus bus
 * and adding DeviceMatch patterns to the built-in id table. */
use std::path::{Path, PathBuf};

use configparser::ini::Ini;
use tracing::{debug, warn};

use crate::driver::{self, HidDeviceId};

/* Environment variable overriding the config file location. */
pub const CONFIG_ENV: &str = "MAGIC_BACKLIGHTD_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "/etc/magic-backlightd.conf";

/* Which message bus the DBus surface is published on. */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusKind {
    #[default]
    System,
    Session,
}

impl BusKind {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system" => Some(BusKind::System),
            "session" => Some(BusKind::Session),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub bus: BusKind,
    /* Extra identities on top of the built-in table */
    pub extra_matches: Vec<HidDeviceId>,
}

/* Config file path from the environment, or the default. */
pub fn config_path() -> PathBuf {
    PathBuf::from(std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string()))
}

/* Load the config file at `path`.                                  */
/*                                                                  */
/* A missing file yields the defaults. Unparseable entries are      */
/* logged and skipped so a bad line never keeps the daemon down.    */
pub fn load_config(path: &Path) -> Config {
    if !path.exists() {
        debug!("No config file at {:?}, using defaults", path);
        return Config::default();
    }

    let mut ini = new_ini();
    if let Err(err) = ini.load(path) {
        warn!("Failed to parse config {:?}: {}", path, err);
        return Config::default();
    }

    let config = parse_config(&ini);
    for id in &config.extra_matches {
        debug!("Config adds device match {}", id);
    }
    config
}

/* `;` separates DeviceMatch patterns, so only `#` starts a comment. */
fn new_ini() -> Ini {
    let mut ini = Ini::new();
    ini.set_comment_symbols(&['#']);
    ini
}

/* Build a Config from loaded INI sections (section and key names are lowercased). */
fn parse_config(ini: &Ini) -> Config {
    let bus = match ini.get("daemon", "bus") {
        Some(value) => BusKind::parse(&value).unwrap_or_else(|| {
            warn!("Unknown [Daemon] Bus '{}', using system bus", value);
            BusKind::System
        }),
        None => BusKind::System,
    };

    let extra_matches = match ini.get("device", "devicematch") {
        Some(value) => driver::parse_device_matches(&value).unwrap_or_else(|err| {
            warn!("Ignoring [Device] DeviceMatch: {}", err);
            Vec::new()
        }),
        None => Vec::new(),
    };

    Config { bus, extra_matches }
}
