/* DBus Manager interface: entry point that lists the object paths of all bound keyboard
 * backlights. */
use zbus::interface;
use zbus::zvariant::ObjectPath;

/// DBus API version.
pub const API_VERSION: i32 = 1;

/// The `org.freedesktop.magicbacklight1.Manager` interface.
///
/// State is managed through zbus's built-in interior mutability (`get_mut()`),
/// so no additional locking is needed.
#[derive(Default)]
pub struct BacklightManager {
    leds: Vec<String>,
}

impl BacklightManager {
    /// Record a newly bound LED object path.
    pub fn add_led(&mut self, path: String) {
        self.leds.push(path);
    }

    /// Forget an LED object path (called on unbind).
    pub fn remove_led(&mut self, path: &str) {
        self.leds.retain(|p| p != path);
    }
}

#[interface(name = "org.freedesktop.magicbacklight1.Manager")]
impl BacklightManager {
    /// The DBus API version (constant, read-only).
    #[zbus(property, name = "APIVersion")]
    fn api_version(&self) -> i32 {
        API_VERSION
    }

    /// Array of object paths to the bound LEDs.
    #[zbus(property)]
    pub(crate) fn leds(&self) -> Vec<ObjectPath<'static>> {
        self.leds
            .iter()
            .filter_map(|p| ObjectPath::try_from(p.clone()).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_remove_led() {
        let mut manager = BacklightManager::default();
        manager.add_led("/org/freedesktop/magicbacklight1/led/hidraw2".to_string());
        manager.add_led("/org/freedesktop/magicbacklight1/led/hidraw3".to_string());
        manager.remove_led("/org/freedesktop/magicbacklight1/led/hidraw2");

        let leds = manager.leds();
        assert_eq!(leds.len(), 1);
        assert_eq!(leds[0].as_str(), "/org/freedesktop/magicbacklight1/led/hidraw3");
    }

    #[test]
    fn test_invalid_paths_are_skipped() {
        let mut manager = BacklightManager::default();
        manager.add_led("not a path".to_string());
        assert!(manager.leds().is_empty());
        assert_eq!(manager.api_version(), API_VERSION);
    }
}
