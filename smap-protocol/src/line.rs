//! Bounded reader for CRLF-terminated protocol lines.

use std::io::Read;

use crate::error::LineError;

/// Reads bytes from `reader` until a CRLF terminator, end of stream, or the
/// `max` length bound.
///
/// The terminator is excluded from the returned line. A carriage return must
/// be followed immediately by a line feed; any other byte after a pending CR
/// fails the read. A line may hold at most `max - 1` content bytes; one more
/// fails with [`LineError::TooLong`].
///
/// End of stream before a terminator yields the (possibly empty) partial line
/// as a success, so a half-closed peer reads as "no more input" rather than
/// an error. Callers must validate field contents instead of trusting line
/// completeness.
pub fn read_line(reader: &mut impl Read, max: usize) -> Result<Vec<u8>, LineError> {
    let mut line = Vec::new();
    let mut pending_cr = false;
    let mut byte = [0u8; 1];
    loop {
        if reader.read(&mut byte)? == 0 {
            return Ok(line);
        }
        match (byte[0], pending_cr) {
            (b'\n', true) => return Ok(line),
            (_, true) => return Err(LineError::BareCarriageReturn),
            (b'\r', false) => pending_cr = true,
            (b, false) => {
                if line.len() >= max.saturating_sub(1) {
                    return Err(LineError::TooLong { max });
                }
                line.push(b);
            }
        }
    }
}
