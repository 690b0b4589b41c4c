/* Apple Magic Keyboard backlight (T2 MacBookPro16,x / MacBookAir9,1): probe sequence for the
 * keyboard backlight interface and the two-report (power, brightness) protocol that sets its level. */
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::BacklightError;
use crate::hid::{HidTransport, ReportHandle, ReportType};
use crate::led::{self, BrightnessSetFn, LedClassdev, LedRegistry};

/* Usage of the keyboard backlight collection. The touch bar backlight */
/* interface on the same USB device declares a different one.           */
pub const HID_USAGE_MAGIC_BL: u32 = 0xff00000f;

pub const APPLE_MAGIC_REPORT_ID_POWER: u8 = 3;
pub const APPLE_MAGIC_REPORT_ID_BRIGHTNESS: u8 = 1;

/* Low byte of the control word; mimics the Windows driver. */
const CONTROL_WORD_BASE: i32 = 0x5e;

/* Rate used for every host-requested change. Only the probe uses 0. */
const HOST_TRANSITION_RATE: u8 = 1;

/* Second field of both reports: mode byte low, transition rate high. */
pub fn control_word(rate: u8) -> i32 {
    CONTROL_WORD_BASE | (i32::from(rate) << 8)
}

/* A bound keyboard backlight.                                     */
/*                                                                 */
/* Owns the transport; the report handles and `max_brightness` are */
/* resolved once during probe and never change afterwards.        */
pub struct MagicBacklight<T: HidTransport> {
    hdev: T,
    power: ReportHandle,
    brightness: ReportHandle,
    max_brightness: u32,
    /* Output buffer sized for the largest feature report */
    buf: Mutex<Vec<u8>>,
}

impl<T: HidTransport> MagicBacklight<T> {
    pub fn max_brightness(&self) -> u32 {
        self.max_brightness
    }

    pub fn name(&self) -> &str {
        self.hdev.name()
    }

    /* Encode `value` and the control word into one report and submit it. */
    /*                                                                   */
    /* Write failures are logged and otherwise ignored: the control path */
    /* is fire-and-forget.                                               */
    fn report_set(&self, handle: ReportHandle, value: i32, rate: u8) {
        let Some(report) = self.hdev.report(handle) else {
            warn!("{}: feature report {} vanished", self.hdev.name(), handle.id());
            return;
        };

        let mut buf = self.buf.lock();
        report.encode(&[value, control_word(rate)], &mut buf);

        if let Err(e) = self.hdev.set_report(handle, &buf) {
            warn!(
                "{}: failed to set feature report {} to {}: {e}",
                self.hdev.name(),
                handle.id(),
                value
            );
        }
    }

    /* Set the backlight level.                                        */
    /*                                                                 */
    /* Power is always written first since the hardware ignores a      */
    /* brightness level while powered off. Level 0 only writes power.  */
    pub fn set(&self, brightness: u32, rate: u8) {
        debug!("{}: set brightness {} rate {}", self.hdev.name(), brightness, rate);

        self.report_set(self.power, i32::from(brightness != 0), rate);
        if brightness != 0 {
            let level = i32::try_from(brightness).unwrap_or(i32::MAX);
            self.report_set(self.brightness, level, rate);
        }
    }

    /* Unbind: stop the transport. The handles are dead afterwards. */
    pub fn remove(&self) {
        self.hdev.hw_stop();
        info!("{}: keyboard backlight unbound", self.hdev.name());
    }
}

/* Callback handed to the LED registry for host-initiated changes. */
fn brightness_callback<T>(backlight: &Arc<MagicBacklight<T>>) -> BrightnessSetFn
where
    T: HidTransport + 'static,
{
    let backlight = Arc::clone(backlight);
    Arc::new(move |level: u32| -> Result<(), BacklightError> {
        backlight.set(level, HOST_TRANSITION_RATE);
        Ok(())
    })
}

/* Resolve the power and brightness reports and the brightness ceiling. */
fn resolve_reports<T: HidTransport>(
    hdev: &T,
) -> Result<(ReportHandle, ReportHandle, u32), BacklightError> {
    let brightness = hdev.register_report(ReportType::Feature, APPLE_MAGIC_REPORT_ID_BRIGHTNESS);
    let power = hdev.register_report(ReportType::Feature, APPLE_MAGIC_REPORT_ID_POWER);

    let (Some(brightness), Some(power)) = (brightness, power) else {
        return Err(BacklightError::NoDevice(format!(
            "missing feature report (brightness: {}, power: {})",
            brightness.is_some(),
            power.is_some()
        )));
    };

    /* Both reports carry a value field followed by the control word */
    for handle in [power, brightness] {
        let fields = hdev.report(handle).map_or(0, |r| r.fields().len());
        if fields < 2 {
            return Err(BacklightError::NoDevice(format!(
                "feature report {} has {} field(s), expected 2",
                handle.id(),
                fields
            )));
        }
    }

    let logical_maximum = hdev
        .report(brightness)
        .and_then(|r| r.field(0))
        .map_or(0, |f| f.logical_maximum);
    let max_brightness = u32::try_from(logical_maximum).map_err(|_| {
        BacklightError::NoDevice(format!("negative brightness maximum {logical_maximum}"))
    })?;

    Ok((power, brightness, max_brightness))
}

/* Bind to a freshly enumerated device.                                  */
/*                                                                       */
/* On success the backlight is off and registered with `registry`. Every */
/* failure after the transport started stops it again before returning. */
pub async fn probe<T, R>(mut hdev: T, registry: &mut R) -> Result<Arc<MagicBacklight<T>>, BacklightError>
where
    T: HidTransport + 'static,
    R: LedRegistry + ?Sized,
{
    hdev.parse()?;

    /* Reject the touch bar backlight before touching anything */
    let usage = hdev
        .descriptor()
        .and_then(|d| d.collections().first())
        .map(|c| c.usage);
    if usage != Some(HID_USAGE_MAGIC_BL) {
        return Err(BacklightError::NoDevice(format!(
            "{}: first collection usage {:#010x} is not the keyboard backlight",
            hdev.name(),
            usage.unwrap_or(0)
        )));
    }

    let len = hdev
        .descriptor()
        .map_or(0, |d| d.max_report_len(ReportType::Feature));
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| BacklightError::OutOfMemory(len))?;

    hdev.hw_start()?;

    let (power, brightness, max_brightness) = match resolve_reports(&hdev) {
        Ok(resolved) => resolved,
        Err(e) => {
            hdev.hw_stop();
            return Err(e);
        }
    };

    let backlight = Arc::new(MagicBacklight {
        hdev,
        power,
        brightness,
        max_brightness,
        buf: Mutex::new(buf),
    });

    /* Start from a known state whatever the hardware powered up in. */
    /* The writes block on HIDIOCSFEATURE like the host callback does. */
    let off = Arc::clone(&backlight);
    if let Err(e) = tokio::task::spawn_blocking(move || off.set(0, 0)).await {
        warn!("{}: initial power-off did not run: {e}", backlight.name());
    }

    let cdev = LedClassdev {
        name: led::led_name("", led::LED_COLOR_WHITE, led::LED_FUNCTION_KBD_BACKLIGHT),
        max_brightness,
        brightness_set_blocking: brightness_callback(&backlight),
    };

    if let Err(e) = registry.register(cdev).await {
        backlight.hdev.hw_stop();
        return Err(e.into());
    }

    info!(
        "{}: keyboard backlight bound, max brightness {}",
        backlight.name(),
        max_brightness
    );
    Ok(backlight)
}
