/* udev hotplug monitor: enumerates existing hidraw nodes and dispatches add/remove actions, with
 * the HID identity and sysfs path needed for binding, to the main DBus loop from a blocking thread. */
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const SUBSYSTEM_HIDRAW: &str = "hidraw";

/* Poll timeout so the blocking thread notices a closed channel */
const POLL_TIMEOUT_MS: u16 = 1000;

/* Actions dispatched from the udev monitor to the DBus server. */
#[derive(Debug)]
pub enum DeviceAction {
    Add {
        sysname: String,
        devnode: PathBuf,
        syspath: PathBuf,
        name: String,
        bustype: u16,
        vid: u16,
        pid: u16,
    },
    Remove {
        sysname: String,
    },
}

impl DeviceAction {
    fn sysname(&self) -> &str {
        match self {
            DeviceAction::Add { sysname, .. } => sysname,
            DeviceAction::Remove { sysname } => sysname,
        }
    }
}

/* Run the udev monitor: report existing hidraw nodes, then follow hotplug. */
/*                                                                          */
/* The `udev` crate types contain raw pointers and are not `Send`, so all   */
/* udev work happens synchronously inside a blocking thread.               */
pub async fn run(tx: mpsc::Sender<DeviceAction>) {
    info!("udev monitor started, watching {} nodes", SUBSYSTEM_HIDRAW);

    match tokio::task::spawn_blocking(move || run_blocking(tx)).await {
        Ok(Ok(())) => info!("udev monitor shutting down normally"),
        Ok(Err(e)) => warn!("udev monitor error: {}", e),
        Err(e) => warn!("udev monitor task panicked: {}", e),
    }
}

fn run_blocking(tx: mpsc::Sender<DeviceAction>) -> Result<(), String> {
    /* Listen before enumerating so nothing plugged in between is missed */
    let monitor = udev::MonitorBuilder::new()
        .and_then(|b| b.match_subsystem(SUBSYSTEM_HIDRAW))
        .and_then(|b| b.listen())
        .map_err(|e| format!("udev monitor: {}", e))?;

    for action in enumerate_existing()? {
        debug!("Enumerated existing device: {}", action.sysname());
        if tx.blocking_send(action).is_err() {
            return Ok(());
        }
    }

    let fd = monitor.as_raw_fd();

    loop {
        /* SAFETY: `fd` belongs to `monitor`, which outlives this borrow. */
        let mut pollfd = [nix::poll::PollFd::new(
            unsafe { std::os::unix::io::BorrowedFd::borrow_raw(fd) },
            nix::poll::PollFlags::POLLIN,
        )];

        match nix::poll::poll(&mut pollfd, nix::poll::PollTimeout::from(POLL_TIMEOUT_MS)) {
            Ok(0) => {
                if tx.is_closed() {
                    return Ok(());
                }
                continue;
            }
            Ok(_) => {}
            Err(nix::errno::Errno::EINTR) => continue,
            Err(e) => return Err(format!("poll: {}", e)),
        }

        for event in monitor.iter() {
            let action = match event.event_type() {
                udev::EventType::Add => build_add_action(&event.device()),
                udev::EventType::Remove => Some(DeviceAction::Remove {
                    sysname: event.device().sysname().to_string_lossy().to_string(),
                }),
                /* bind/unbind/change do not affect hidraw nodes */
                _ => None,
            };

            if let Some(action) = action {
                info!("Hotplug {:?}", action);
                if tx.blocking_send(action).is_err() {
                    return Ok(());
                }
            }
        }
    }
}

/* Build `Add` actions for all hidraw nodes already present. */
fn enumerate_existing() -> Result<Vec<DeviceAction>, String> {
    let mut enumerator = udev::Enumerator::new().map_err(|e| format!("udev enumerator: {}", e))?;
    enumerator
        .match_subsystem(SUBSYSTEM_HIDRAW)
        .map_err(|e| format!("match_subsystem: {}", e))?;

    let devices = enumerator
        .scan_devices()
        .map_err(|e| format!("scan_devices: {}", e))?;

    Ok(devices.filter_map(|d| build_add_action(&d)).collect())
}

/* Build a `DeviceAction::Add` from a hidraw udev device. */
/*                                                        */
/* Identity and name live on the parent `hid` device.     */
fn build_add_action(device: &udev::Device) -> Option<DeviceAction> {
    let sysname = device.sysname().to_string_lossy().to_string();
    let devnode = device.devnode()?.to_path_buf();
    let syspath = device.syspath().to_path_buf();

    let hid_parent = device.parent_with_subsystem("hid").ok()??;

    let name = hid_parent
        .property_value("HID_NAME")
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| "Unknown".to_string());

    let hid_id = hid_parent.property_value("HID_ID")?;
    let (bustype, vid, pid) = parse_hid_id(&hid_id.to_string_lossy())?;

    Some(DeviceAction::Add {
        sysname,
        devnode,
        syspath,
        name,
        bustype,
        vid,
        pid,
    })
}

/* Parse a `HID_ID` value (`BBBB:VVVVVVVV:PPPPPPPP`, hex) into (bustype, vid, pid). */
fn parse_hid_id(s: &str) -> Option<(u16, u16, u16)> {
    let mut parts = s.trim().split(':');
    let bustype = u16::from_str_radix(parts.next()?, 16).ok()?;
    let vid = u16::from_str_radix(parts.next()?, 16).ok()?;
    let pid = u16::from_str_radix(parts.next()?, 16).ok()?;

    if parts.next().is_some() {
        return None;
    }

    Some((bustype, vid, pid))
}
