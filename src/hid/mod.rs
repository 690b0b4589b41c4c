/* HID transport seam: the HidTransport trait the backlight driver talks to, report handles into
 * the transport's report table, and the transport-level error type. */
pub mod descriptor;
pub mod hidraw;

use thiserror::Error;

pub use descriptor::{DescriptorError, Report, ReportDescriptor, ReportType};

/* Transport-level failures. Propagated unchanged by the driver. */
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to read report descriptor {path}: {source}")]
    DescriptorRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed report descriptor: {0}")]
    Descriptor(#[from] DescriptorError),

    #[error("I/O failure on {device}: {source}")]
    Io {
        device: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Feature report ioctl failed: {0}")]
    IoctlFailed(std::io::Error),

    #[error("Transport for {0} is not started")]
    NotStarted(String),
}

/* Non-owning reference to a report in the transport's table. */
/*                                                            */
/* Only the transport hands these out, so a handle always     */
/* names a report the parsed descriptor declared.             */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReportHandle {
    kind: ReportType,
    id: u8,
}

impl ReportHandle {
    fn new(kind: ReportType, id: u8) -> Self {
        Self { kind, id }
    }

    pub fn id(&self) -> u8 {
        self.id
    }
}

/* Services a HID transport provides to a device driver.           */
/*                                                                 */
/* `parse` runs once before the transport is shared; everything    */
/* after that takes `&self` so the driver can keep the transport   */
/* behind an `Arc` and still stop it on unbind.                    */
pub trait HidTransport: Send + Sync {
    /* Name used in log lines, e.g. the hidraw sysname. */
    fn name(&self) -> &str;

    /* Fetch and parse the device's report descriptor. */
    fn parse(&mut self) -> Result<(), TransportError>;

    /* The parsed descriptor, `None` until `parse` succeeded. */
    fn descriptor(&self) -> Option<&ReportDescriptor>;

    /* Bring up I/O to the device. */
    fn hw_start(&self) -> Result<(), TransportError>;

    /* Tear down I/O. Stopping a stopped transport is a no-op. */
    fn hw_stop(&self);

    /* Submit an encoded report as a SET_REPORT request and wait for completion. */
    fn set_report(&self, handle: ReportHandle, buf: &[u8]) -> Result<(), TransportError>;

    /* Look up a declared report of the given type and id. */
    fn register_report(&self, kind: ReportType, id: u8) -> Option<ReportHandle> {
        self.descriptor()?
            .report(kind, id)
            .map(|_| ReportHandle::new(kind, id))
    }

    fn report(&self, handle: ReportHandle) -> Option<&Report> {
        self.descriptor()?.report(handle.kind, handle.id)
    }
}
