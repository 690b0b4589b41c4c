/* Brightness-control class: the endpoint description a driver hands to the host (name, range,
 * blocking set callback) and the LedRegistry seam the host implements to publish it. */
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::BacklightError;

/* Color and function components of LED names, as in dt-bindings/leds/common.h. */
pub const LED_COLOR_WHITE: &str = "white";
pub const LED_FUNCTION_KBD_BACKLIGHT: &str = "kbd_backlight";

/* Build an LED name in the `devicename:color:function` convention. */
/* An empty device name yields e.g. `:white:kbd_backlight`.           */
pub fn led_name(devicename: &str, color: &str, function: &str) -> String {
    format!("{devicename}:{color}:{function}")
}

/// Callback invoked for every external brightness request.
///
/// Receives a level already clamped to `[0, max_brightness]` and may block
/// until the hardware accepted it.
pub type BrightnessSetFn = Arc<dyn Fn(u32) -> Result<(), BacklightError> + Send + Sync>;

/* Errors a registry can reject an endpoint with. */
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("LED {0} is already registered")]
    Duplicate(String),

    #[error("DBus error: {0}")]
    Dbus(#[from] zbus::Error),
}

/// One brightness-control endpoint.
#[derive(Clone)]
pub struct LedClassdev {
    pub name: String,
    pub max_brightness: u32,
    pub brightness_set_blocking: BrightnessSetFn,
}

impl LedClassdev {
    /* Requests above the advertised range are clamped, never rejected. */
    pub fn clamp(&self, value: u32) -> u32 {
        value.min(self.max_brightness)
    }

    /* Clamp `value`, run the driver callback and return the level actually requested. */
    pub fn set_brightness(&self, value: u32) -> Result<u32, BacklightError> {
        let level = self.clamp(value);
        (self.brightness_set_blocking)(level)?;
        Ok(level)
    }
}

impl fmt::Debug for LedClassdev {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedClassdev")
            .field("name", &self.name)
            .field("max_brightness", &self.max_brightness)
            .finish_non_exhaustive()
    }
}

/// Host service that exposes registered endpoints to the rest of the system.
#[async_trait]
pub trait LedRegistry: Send {
    async fn register(&mut self, cdev: LedClassdev) -> Result<(), RegistrationError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recording_cdev(max_brightness: u32) -> (LedClassdev, Arc<Mutex<Vec<u32>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let cdev = LedClassdev {
            name: led_name("", LED_COLOR_WHITE, LED_FUNCTION_KBD_BACKLIGHT),
            max_brightness,
            brightness_set_blocking: Arc::new(move |level: u32| {
                sink.lock().push(level);
                Ok(())
            }),
        };
        (cdev, calls)
    }

    #[test]
    fn test_led_name() {
        assert_eq!(
            led_name("", LED_COLOR_WHITE, LED_FUNCTION_KBD_BACKLIGHT),
            ":white:kbd_backlight"
        );
        assert_eq!(led_name("apple", "white", "kbd_backlight"), "apple:white:kbd_backlight");
    }

    #[test]
    fn test_set_brightness_clamps_to_range() {
        let (cdev, calls) = recording_cdev(255);
        assert_eq!(cdev.set_brightness(128).unwrap(), 128);
        assert_eq!(cdev.set_brightness(1000).unwrap(), 255);
        assert_eq!(cdev.set_brightness(0).unwrap(), 0);
        assert_eq!(*calls.lock(), vec![128, 255, 0]);
    }

    #[test]
    fn test_set_brightness_propagates_callback_error() {
        let cdev = LedClassdev {
            name: "test".to_string(),
            max_brightness: 10,
            brightness_set_blocking: Arc::new(|_: u32| Err(BacklightError::NoDevice("gone".into()))),
        };
        assert!(matches!(cdev.set_brightness(5), Err(BacklightError::NoDevice(_))));
    }

    #[test]
    fn test_debug_omits_callback() {
        let (cdev, _) = recording_cdev(3);
        let dbg = format!("{cdev:?}");
        assert!(dbg.contains(":white:kbd_backlight"));
        assert!(dbg.contains("max_brightness: 3"));
    }
}
