/* hidraw transport: reads the report descriptor from sysfs, opens /dev/hidrawN on start and submits
 * feature reports with the HIDIOCSFEATURE ioctl. */
use nix::libc;
use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use super::{HidTransport, ReportDescriptor, ReportHandle, ReportType, TransportError};

/* Compute the `HIDIOCSFEATURE(len)` ioctl request number.        */
/*                                                                */
/* Linux hidraw.h: `_IOC(_IOC_READ|_IOC_WRITE, 'H', 0x06, len)`. */
fn hid_set_feature_req(len: usize) -> libc::c_ulong {
    let ioc_readwrite: libc::c_ulong = 3;
    let ioc_type: libc::c_ulong = b'H' as libc::c_ulong;
    let ioc_nr: libc::c_ulong = 0x06;
    (ioc_readwrite << 30) | (ioc_type << 8) | ioc_nr | ((len as libc::c_ulong) << 16)
}

/* Sysfs location of the raw report descriptor for a hidraw node. */
fn descriptor_path(syspath: &Path) -> PathBuf {
    syspath.join("device").join("report_descriptor")
}

/* Transport over one `/dev/hidrawN` node.                  */
/*                                                         */
/* The node is only held open between `hw_start` and       */
/* `hw_stop`; the descriptor comes from sysfs so parsing   */
/* needs no open file.                                     */
pub struct HidrawTransport {
    sysname: String,
    devnode: PathBuf,
    syspath: PathBuf,
    descriptor: Option<ReportDescriptor>,
    file: Mutex<Option<File>>,
}

impl HidrawTransport {
    pub fn new(sysname: &str, devnode: &Path, syspath: &Path) -> Self {
        Self {
            sysname: sysname.to_string(),
            devnode: devnode.to_path_buf(),
            syspath: syspath.to_path_buf(),
            descriptor: None,
            file: Mutex::new(None),
        }
    }
}

impl HidTransport for HidrawTransport {
    fn name(&self) -> &str {
        &self.sysname
    }

    fn parse(&mut self) -> Result<(), TransportError> {
        let path = descriptor_path(&self.syspath);
        let bytes = std::fs::read(&path).map_err(|source| TransportError::DescriptorRead {
            path: path.display().to_string(),
            source,
        })?;

        let descriptor = ReportDescriptor::parse(&bytes)?;
        debug!(
            "{}: parsed {} byte report descriptor ({} collections, largest feature report {} bytes)",
            self.sysname,
            bytes.len(),
            descriptor.collections().len(),
            descriptor.max_report_len(ReportType::Feature)
        );
        self.descriptor = Some(descriptor);
        Ok(())
    }

    fn descriptor(&self) -> Option<&ReportDescriptor> {
        self.descriptor.as_ref()
    }

    fn hw_start(&self) -> Result<(), TransportError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.devnode)
            .map_err(|source| TransportError::Io {
                device: self.devnode.display().to_string(),
                source,
            })?;

        *self.file.lock() = Some(file);
        debug!("{}: opened {}", self.sysname, self.devnode.display());
        Ok(())
    }

    fn hw_stop(&self) {
        if self.file.lock().take().is_some() {
            debug!("{}: closed {}", self.sysname, self.devnode.display());
        }
    }

    /* `buf[0]` must hold the report id, as produced by `Report::encode`. */
    fn set_report(&self, handle: ReportHandle, buf: &[u8]) -> Result<(), TransportError> {
        let guard = self.file.lock();
        let file = guard
            .as_ref()
            .ok_or_else(|| TransportError::NotStarted(self.sysname.clone()))?;

        let fd = file.as_raw_fd();
        let req = hid_set_feature_req(buf.len());

        /* SAFETY: `fd` stays open while `guard` is held. `buf` is   */
        /* a live immutable slice and its length is encoded into    */
        /* `req` via the ioctl macro, so the kernel reads exactly   */
        /* `buf.len()` bytes.                                        */
        let res = unsafe { libc::ioctl(fd, req, buf.as_ptr()) };

        if res < 0 {
            return Err(TransportError::IoctlFailed(std::io::Error::last_os_error()));
        }

        debug!(
            "{}: SET_FEATURE id {} {} bytes: {:02x?}",
            self.sysname,
            handle.id(),
            buf.len(),
            buf
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hid_set_feature_req_encoding() {
        /* _IOC(3, 'H', 0x06, 4) */
        assert_eq!(hid_set_feature_req(4), 0xc0044806);
        assert_eq!(hid_set_feature_req(64), 0xc0404806);
    }

    #[test]
    fn test_descriptor_path() {
        let path = descriptor_path(Path::new("/sys/devices/virtual/hidraw/hidraw3"));
        assert_eq!(
            path,
            PathBuf::from("/sys/devices/virtual/hidraw/hidraw3/device/report_descriptor")
        );
    }

    #[test]
    fn test_set_report_before_start_fails() {
        let transport = HidrawTransport::new(
            "hidraw99",
            Path::new("/dev/hidraw99"),
            Path::new("/nonexistent/hidraw99"),
        );
        let handle = ReportHandle::new(ReportType::Feature, 1);
        assert!(matches!(
            transport.set_report(handle, &[0x01, 0x00]),
            Err(TransportError::NotStarted(_))
        ));
    }

    #[test]
    fn test_parse_missing_descriptor_is_read_error() {
        let mut transport = HidrawTransport::new(
            "hidraw99",
            Path::new("/dev/hidraw99"),
            Path::new("/nonexistent/hidraw99"),
        );
        assert!(matches!(
            transport.parse(),
            Err(TransportError::DescriptorRead { .. })
        ));
        assert!(transport.descriptor().is_none());
    }

    #[test]
    fn test_hw_stop_without_start_is_noop() {
        let transport = HidrawTransport::new(
            "hidraw99",
            Path::new("/dev/hidraw99"),
            Path::new("/nonexistent/hidraw99"),
        );
        transport.hw_stop();
        transport.hw_stop();
    }
}
