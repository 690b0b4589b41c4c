/* Backlight driver errors: the failure kinds a probe can end with, distinguishing transport
 * failures, device-shape mismatches, allocation failure and endpoint registration failure. */
use thiserror::Error;

use crate::hid::TransportError;
use crate::led::RegistrationError;

/* Errors that end a backlight probe. */
#[derive(Debug, Error)]
pub enum BacklightError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /* The device is not the keyboard backlight interface, or its */
    /* reports do not have the expected shape.                    */
    #[error("No such device: {0}")]
    NoDevice(String),

    #[error("Out of memory allocating {0} byte report buffer")]
    OutOfMemory(usize),

    #[error("LED registration failed: {0}")]
    Registration(#[from] RegistrationError),
}
