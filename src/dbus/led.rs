/* DBus LED interface: one object per bound backlight exposing its name, range and a read-write
 * brightness that runs the driver callback; plus the LedRegistry that publishes these objects. */
use async_trait::async_trait;
use tracing::{debug, warn};
use zbus::interface;

use crate::led::{LedClassdev, LedRegistry, RegistrationError};

/// The `org.freedesktop.magicbacklight1.Led` interface.
///
/// Mirrors a brightness class device: the last requested level is kept here
/// for reads, the hardware itself is never queried.
pub struct MagicBacklightLed {
    cdev: LedClassdev,
    brightness: u32,
}

impl MagicBacklightLed {
    pub fn new(cdev: LedClassdev) -> Self {
        /* Drivers force the device off before registering */
        Self {
            cdev,
            brightness: 0,
        }
    }
}

#[interface(name = "org.freedesktop.magicbacklight1.Led")]
impl MagicBacklightLed {
    /// LED name, e.g. ":white:kbd_backlight" (constant).
    #[zbus(property)]
    fn name(&self) -> String {
        self.cdev.name.clone()
    }

    /// Highest accepted brightness (constant).
    #[zbus(property)]
    fn max_brightness(&self) -> u32 {
        self.cdev.max_brightness
    }

    /// Last requested brightness (read-write). Writes above the maximum are clamped.
    #[zbus(property)]
    fn brightness(&self) -> u32 {
        self.brightness
    }

    #[zbus(property)]
    async fn set_brightness(&mut self, value: u32) -> zbus::Result<()> {
        let cdev = self.cdev.clone();

        /* The callback blocks on the feature report ioctls */
        let result = tokio::task::spawn_blocking(move || cdev.set_brightness(value))
            .await
            .map_err(|e| zbus::fdo::Error::Failed(format!("Brightness worker failed: {e}")))?;

        let level = match result {
            Ok(level) => level,
            Err(e) => {
                warn!("{}: brightness {} rejected: {e}", self.cdev.name, value);
                return Err(zbus::fdo::Error::Failed(e.to_string()).into());
            }
        };

        debug!("{}: brightness {} -> {}", self.cdev.name, self.brightness, level);
        self.brightness = level;
        Ok(())
    }
}

/* Registry that publishes each endpoint as an LED object at a fixed path. */
pub struct DbusLedRegistry<'a> {
    conn: &'a zbus::Connection,
    path: String,
}

impl<'a> DbusLedRegistry<'a> {
    pub fn new(conn: &'a zbus::Connection, path: String) -> Self {
        Self { conn, path }
    }
}

#[async_trait]
impl LedRegistry for DbusLedRegistry<'_> {
    async fn register(&mut self, cdev: LedClassdev) -> Result<(), RegistrationError> {
        let name = cdev.name.clone();
        let added = self
            .conn
            .object_server()
            .at(self.path.as_str(), MagicBacklightLed::new(cdev))
            .await?;

        if !added {
            return Err(RegistrationError::Duplicate(format!("{name} at {}", self.path)));
        }

        debug!("LED {} registered at {}", name, self.path);
        Ok(())
    }
}
