/* magic-backlightd entrypoint: sets up tracing, loads the config, spawns the udev monitor and runs
 * the DBus server that binds keyboard backlights. */
mod config;
mod dbus;
mod driver;
mod error;
mod hid;
mod led;
mod udev_monitor;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        "Starting magic-backlightd version {} (API version {})",
        env!("CARGO_PKG_VERSION"),
        dbus::manager::API_VERSION
    );

    let config_path = config::config_path();
    let config = config::load_config(&config_path);
    let table = driver::DeviceTable::new(&config.extra_matches);
    info!("Matching {} device identities", table.len());

    let (device_tx, device_rx) = tokio::sync::mpsc::channel(32);

    /* Spawn the udev monitor for hidraw device hotplug */
    tokio::spawn(udev_monitor::run(device_tx));

    /* Run the DBus server (blocks until shutdown) */
    dbus::run_server(device_rx, table, &config).await?;

    Ok(())
}
