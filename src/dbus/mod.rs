/* DBus surface: Manager and per-backlight LED objects, plus the event loop that binds and unbinds
 * keyboard backlights as udev reports hidraw devices coming and going. */
pub mod led;
pub mod manager;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use zbus::connection::Builder;

use crate::config::{BusKind, Config};
use crate::driver::DeviceTable;
use crate::driver::magic_backlight::{self, MagicBacklight};
use crate::error::BacklightError;
use crate::hid::HidTransport;
use crate::hid::hidraw::HidrawTransport;
use crate::udev_monitor::DeviceAction;

pub const BUS_NAME: &str = "org.freedesktop.magicbacklight1";
pub const MANAGER_PATH: &str = "/org/freedesktop/magicbacklight1";

/* A backlight bound to a hidraw node and the LED object published for it. */
struct BoundDevice {
    path: String,
    backlight: Arc<MagicBacklight<HidrawTransport>>,
}

/* Object path of the LED published for a hidraw sysname. */
fn led_path(sysname: &str) -> String {
    format!("{MANAGER_PATH}/led/{}", sysname.replace('-', "_"))
}

/// Apply `update` to the Manager object and announce the new `Leds` list.
async fn update_manager<F>(conn: &zbus::Connection, update: F) -> Result<()>
where
    F: FnOnce(&mut manager::BacklightManager),
{
    let iface_ref = conn
        .object_server()
        .interface::<_, manager::BacklightManager>(MANAGER_PATH)
        .await?;
    update(&mut *iface_ref.get_mut().await);
    iface_ref
        .get()
        .await
        .leds_changed(iface_ref.signal_emitter())
        .await?;
    Ok(())
}

/// Probe a matched hidraw node and publish its LED object on success.
///
/// Probe failures are logged, never fatal to the daemon. A `NoDevice`
/// result is expected for the touch bar interface sharing the USB identity.
async fn bind_device(
    conn: &zbus::Connection,
    sysname: &str,
    devnode: &Path,
    syspath: &Path,
) -> Option<BoundDevice> {
    let path = led_path(sysname);
    let transport = HidrawTransport::new(sysname, devnode, syspath);
    let mut registry = led::DbusLedRegistry::new(conn, path.clone());

    let backlight = match magic_backlight::probe(transport, &mut registry).await {
        Ok(backlight) => backlight,
        Err(BacklightError::NoDevice(reason)) => {
            debug!("{sysname}: not bound: {reason}");
            return None;
        }
        Err(e) => {
            warn!("{sysname}: keyboard backlight probe failed: {e}");
            return None;
        }
    };

    if !announce(conn, sysname, &path, &backlight).await {
        return None;
    }

    Some(BoundDevice { path, backlight })
}

/// List a freshly probed backlight on the Manager.
///
/// A failure only affects this device: its LED object is withdrawn and its
/// transport stopped, the daemon keeps serving the others.
async fn announce<T: HidTransport>(
    conn: &zbus::Connection,
    sysname: &str,
    path: &str,
    backlight: &MagicBacklight<T>,
) -> bool {
    let Err(e) = update_manager(conn, |m| m.add_led(path.to_string())).await else {
        return true;
    };

    warn!("{sysname}: failed to announce {path}: {e}");
    if let Err(e) = update_manager(conn, |m| m.remove_led(path)).await {
        debug!("{sysname}: manager not updated: {e}");
    }
    withdraw_led(conn, path).await;
    backlight.remove();
    false
}

async fn withdraw_led(conn: &zbus::Connection, path: &str) {
    if let Err(e) = conn
        .object_server()
        .remove::<led::MagicBacklightLed, _>(path)
        .await
    {
        debug!("LED object {} already gone: {e}", path);
    }
}

/// Withdraw the LED object of `sysname` and stop its transport.
async fn unbind_device(
    conn: &zbus::Connection,
    sysname: &str,
    bound: &mut HashMap<String, BoundDevice>,
) -> Result<()> {
    let Some(device) = bound.remove(sysname) else {
        debug!("Device removed: {} (was not bound)", sysname);
        return Ok(());
    };

    withdraw_led(conn, &device.path).await;
    device.backlight.remove();
    update_manager(conn, |m| m.remove_led(&device.path)).await?;

    info!("Device {} removed from {}", sysname, device.path);
    Ok(())
}

/// Start the DBus server and run the bind/unbind loop.
///
/// This function blocks until the udev monitor's channel closes.
pub async fn run_server(
    mut device_rx: mpsc::Receiver<DeviceAction>,
    table: DeviceTable,
    config: &Config,
) -> Result<()> {
    let builder = match config.bus {
        BusKind::System => Builder::system()?,
        BusKind::Session => Builder::session()?,
    };

    let conn = builder
        .name(BUS_NAME)?
        .serve_at(MANAGER_PATH, manager::BacklightManager::default())?
        .build()
        .await?;

    info!("DBus server ready on {} ({:?} bus)", BUS_NAME, config.bus);

    let mut bound: HashMap<String, BoundDevice> = HashMap::new();

    while let Some(action) = device_rx.recv().await {
        match action {
            DeviceAction::Add {
                sysname,
                devnode,
                syspath,
                name,
                bustype,
                vid,
                pid,
            } => {
                if !table.matches(bustype, vid, pid) {
                    debug!(
                        "Ignoring unsupported device {} ({:04x}:{:04x})",
                        sysname, vid, pid
                    );
                    continue;
                }

                if bound.contains_key(&sysname) {
                    debug!("Device {} is already bound", sysname);
                    continue;
                }

                info!("Matched device: {} -> {} ({:04x}:{:04x})", sysname, name, vid, pid);

                if let Some(device) = bind_device(&conn, &sysname, &devnode, &syspath).await {
                    info!(
                        "Keyboard backlight {} registered at {} (max brightness {})",
                        sysname,
                        device.path,
                        device.backlight.max_brightness()
                    );
                    bound.insert(sysname, device);
                }
            }

            DeviceAction::Remove { sysname } => {
                unbind_device(&conn, &sysname, &mut bound).await?;
            }
        }
    }

    info!("udev monitor channel closed, shutting down");
    for (_, device) in bound.drain() {
        device.backlight.remove();
    }
    Ok(())
}
