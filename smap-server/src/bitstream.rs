//! Receiver for the length-declared binary bitstream payload.

use std::{
    error::Error,
    fmt::Display,
    fs::File,
    io::{self, Read, Write},
    path::Path,
};

/// Largest chunk read from the connection in one call.
const CHUNK_SIZE: usize = 10240;

/// Errors that may occur while receiving a bitstream payload.
#[derive(Debug)]
pub enum TransferError {
    /// The peer stopped sending before the declared length arrived.
    UnexpectedEof { expected: u64, received: u64 },
    IoError(io::Error),
}

impl From<io::Error> for TransferError {
    fn from(value: io::Error) -> Self {
        TransferError::IoError(value)
    }
}

impl Display for TransferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferError::UnexpectedEof { expected, received } => write!(
                f,
                "stream ended after {} of {} declared bytes",
                received, expected
            ),
            TransferError::IoError(error) => write!(f, "{}", error),
        }
    }
}

impl Error for TransferError {}

/// Reads exactly `length` bytes from `reader` and persists them to `dest`,
/// overwriting any previous content.
///
/// Bytes are consumed in chunks of at most [`CHUNK_SIZE`] and never beyond
/// `length`, so the stream stays positioned directly after the payload. On
/// failure the partially written file is left in place and the error is
/// surfaced to the caller, which must not go on to program the slot.
pub fn receive(reader: &mut impl Read, length: u64, dest: &Path) -> Result<(), TransferError> {
    let mut file = File::create(dest)?;
    let mut buf = [0u8; CHUNK_SIZE];
    let mut received: u64 = 0;
    while received < length {
        let remaining = length - received;
        let want = if remaining < CHUNK_SIZE as u64 {
            remaining as usize
        } else {
            CHUNK_SIZE
        };
        let n = reader.read(&mut buf[..want])?;
        if n == 0 {
            return Err(TransferError::UnexpectedEof {
                expected: length,
                received,
            });
        }
        file.write_all(&buf[..n])?;
        received += n as u64;
        log::trace!("received {} of {} bitstream bytes", received, length);
    }
    Ok(())
}
