//! # SelectMAP Device Surfaces
//!
//! Each slot exposes two OS surfaces, addressed by slot number:
//!
//! - a line-text **status surface** (`/proc/fpga/selectmapN`) reporting the
//!   operating mode and the number of bytes pending in the hardware FIFO
//! - a byte-stream **data surface** (`/dev/selectmapN`) used to write
//!   command frames to the FIFO and read responses back
use std::{
    error::Error,
    fmt::Display,
    fs::File,
    io::{self, BufRead, BufReader, Read, Write},
    path::{Path, PathBuf},
};

use smap_protocol::SlotId;

/// Default directory holding the per-slot status surfaces.
pub const DEFAULT_STATUS_DIR: &str = "/proc/fpga";
/// Default directory holding the per-slot data surfaces.
pub const DEFAULT_DEVICE_DIR: &str = "/dev";

/// Errors produced by the device surfaces.
#[derive(Debug)]
pub enum DeviceError {
    /// The status surface could not be opened or read.
    StatusUnavailable(io::Error),
    /// The status surface reports an operating mode other than FIFO.
    NotFifoMode,
    /// The status surface holds no parsable pending-byte count.
    NoReadCount,
    /// The data surface could not be opened, read or written.
    DataUnavailable(io::Error),
    /// The data surface accepted only part of a command frame.
    ShortWrite { expected: usize, written: usize },
}

impl Display for DeviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceError::StatusUnavailable(e) => write!(f, "status surface unavailable: {}", e),
            DeviceError::NotFifoMode => write!(f, "device is not in FIFO mode"),
            DeviceError::NoReadCount => write!(f, "status surface reports no read count"),
            DeviceError::DataUnavailable(e) => write!(f, "data surface unavailable: {}", e),
            DeviceError::ShortWrite { expected, written } => {
                write!(f, "wrote {} of {} frame bytes", written, expected)
            }
        }
    }
}

impl Error for DeviceError {}

/// One slot's pair of device surfaces.
///
/// Every operation opens and closes the underlying file; no handle is cached
/// across calls, since an open/close cycle may reset the device's read
/// cursor.
#[derive(Debug, Clone)]
pub struct DeviceChannel {
    status_path: PathBuf,
    data_path: PathBuf,
}

impl DeviceChannel {
    pub fn new(status_dir: &Path, device_dir: &Path, slot: SlotId) -> DeviceChannel {
        DeviceChannel {
            status_path: status_dir.join(format!("selectmap{}", slot)),
            data_path: device_dir.join(format!("selectmap{}", slot)),
        }
    }

    /// Builds a channel from explicit surface paths.
    pub fn from_paths(
        status_path: impl Into<PathBuf>,
        data_path: impl Into<PathBuf>,
    ) -> DeviceChannel {
        DeviceChannel {
            status_path: status_path.into(),
            data_path: data_path.into(),
        }
    }

    pub fn status_path(&self) -> &Path {
        &self.status_path
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Scans the status surface for the pending-byte count.
    ///
    /// The surface is reopened and rescanned on every call. A `Mode:` line
    /// whose second token is not `FIFO` aborts the scan immediately; the
    /// first `Read count:` line yields its third whitespace-separated token
    /// as the count.
    pub fn read_count(&self) -> Result<u32, DeviceError> {
        let file = File::open(&self.status_path).map_err(DeviceError::StatusUnavailable)?;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(DeviceError::StatusUnavailable)?;
            if line.starts_with("Mode:") && line.split_whitespace().nth(1) != Some("FIFO") {
                return Err(DeviceError::NotFifoMode);
            }
            if line.starts_with("Read count:") {
                return line
                    .split_whitespace()
                    .nth(2)
                    .and_then(|token| token.parse().ok())
                    .ok_or(DeviceError::NoReadCount);
            }
        }
        Err(DeviceError::NoReadCount)
    }

    /// Reads one byte from the data surface.
    pub fn read_byte(&self) -> Result<u8, DeviceError> {
        let mut file = File::open(&self.data_path).map_err(DeviceError::DataUnavailable)?;
        let mut byte = [0u8; 1];
        file.read_exact(&mut byte)
            .map_err(DeviceError::DataUnavailable)?;
        Ok(byte[0])
    }

    /// Writes a full command frame to the data surface in one write.
    /// A partial write is a failure.
    pub fn write_frame(&self, frame: &[u8]) -> Result<(), DeviceError> {
        let mut file = File::create(&self.data_path).map_err(DeviceError::DataUnavailable)?;
        let written = file.write(frame).map_err(DeviceError::DataUnavailable)?;
        if written != frame.len() {
            return Err(DeviceError::ShortWrite {
                expected: frame.len(),
                written,
            });
        }
        Ok(())
    }
}
