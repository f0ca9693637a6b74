/// Read and write implementations for requests and responses
use std::io::{self, Read, Write};

use crate::{
    error::{RequestError, ResponseError},
    line::read_line,
    protocol::{MacAddr, PortId, Request, Response, SlotId, Verdict},
};

/// Upper bound for any request header line.
pub const MAX_REQUEST_LINE: usize = 20;
/// Upper bound for a response line read back by clients.
pub const MAX_RESPONSE_LINE: usize = 256;

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn read_slot(reader: &mut impl Read) -> Result<SlotId, RequestError> {
    let line = read_line(reader, MAX_REQUEST_LINE).map_err(RequestError::SlotLine)?;
    SlotId::from_line(&line).ok_or_else(|| RequestError::InvalidSlot(lossy(&line)))
}

/// Consumes the blank line that terminates a multi-field request header.
/// Only the read is checked; content is discarded unexamined.
fn read_terminator(reader: &mut impl Read) -> Result<(), RequestError> {
    read_line(reader, MAX_REQUEST_LINE)
        .map(|_| ())
        .map_err(RequestError::Terminator)
}

impl Request {
    /// Reads one request header from the stream.
    ///
    /// Command routing keys on the first three bytes of the first line. For
    /// [`Request::Program`] the reader is left positioned at the first payload
    /// byte; the payload itself is not consumed here.
    pub fn from_reader(reader: &mut impl Read) -> Result<Request, RequestError> {
        let line = read_line(reader, MAX_REQUEST_LINE).map_err(RequestError::CommandLine)?;
        let Some(tag) = line.get(..3) else {
            return Err(RequestError::UnknownCommand(lossy(&line)));
        };
        match tag {
            b"GET" => Ok(Request::Acquire {
                slot: read_slot(reader)?,
            }),
            b"REL" => Ok(Request::Release {
                slot: read_slot(reader)?,
            }),
            b"RST" => Ok(Request::Reset {
                slot: read_slot(reader)?,
            }),
            b"PRG" => {
                let slot = read_slot(reader)?;
                let line = read_line(reader, MAX_REQUEST_LINE).map_err(RequestError::SizeLine)?;
                let length: i64 = str::from_utf8(&line)
                    .ok()
                    .and_then(|text| text.trim().parse().ok())
                    .ok_or_else(|| RequestError::InvalidSize(lossy(&line)))?;
                if length <= 0 {
                    return Err(RequestError::InvalidSize(lossy(&line)));
                }
                read_terminator(reader)?;
                Ok(Request::Program {
                    slot,
                    length: length as u64,
                })
            }
            b"STA" => Ok(Request::Status {
                slot: read_slot(reader)?,
            }),
            b"MAC" => {
                let slot = read_slot(reader)?;
                let line = read_line(reader, MAX_REQUEST_LINE).map_err(RequestError::MacLine)?;
                let mac = str::from_utf8(&line)
                    .ok()
                    .and_then(MacAddr::parse)
                    .ok_or_else(|| RequestError::InvalidMac(lossy(&line)))?;
                read_terminator(reader)?;
                let line = read_line(reader, MAX_REQUEST_LINE).map_err(RequestError::PortLine)?;
                let port = PortId::from_line(&line)
                    .ok_or_else(|| RequestError::InvalidPort(lossy(&line)))?;
                Ok(Request::SetMac { slot, mac, port })
            }
            _ => Err(RequestError::UnknownCommand(lossy(&line))),
        }
    }

    /// Writes the request header. For [`Request::Program`] the caller streams
    /// the payload afterwards.
    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        match self {
            Request::Acquire { slot } => write!(writer, "GET\r\n{}\r\n", slot),
            Request::Release { slot } => write!(writer, "REL\r\n{}\r\n", slot),
            Request::Reset { slot } => write!(writer, "RST\r\n{}\r\n", slot),
            Request::Program { slot, length } => {
                write!(writer, "PRG\r\n{}\r\n{}\r\n\r\n", slot, length)
            }
            Request::Status { slot } => write!(writer, "STA\r\n{}\r\n", slot),
            Request::SetMac { slot, mac, port } => {
                write!(writer, "MAC\r\n{}\r\n{}\r\n\r\n{}\r\n", slot, mac, port)
            }
        }
    }
}

impl Response {
    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        let verdict = match self.verdict() {
            Verdict::Ok => "OK",
            Verdict::Nok => "NOK",
        };
        write!(writer, "{}\r\n{}\r\n\r\n", verdict, self.message())
    }

    pub fn from_reader(reader: &mut impl Read) -> Result<Response, ResponseError> {
        let line = read_line(reader, MAX_RESPONSE_LINE)?;
        let verdict = match line.as_slice() {
            b"OK" => Verdict::Ok,
            b"NOK" => Verdict::Nok,
            other => return Err(ResponseError::InvalidVerdict(lossy(other))),
        };
        let message = read_line(reader, MAX_RESPONSE_LINE)?;
        // trailing blank line
        let _ = read_line(reader, MAX_RESPONSE_LINE)?;
        let message = lossy(&message);
        Ok(match verdict {
            Verdict::Ok => Response::ok(message),
            Verdict::Nok => Response::nok(message),
        })
    }
}

#[cfg(test)]
mod test {
    use crate::error::RequestError;
    use crate::protocol::{MacAddr, PortId, Request, Response, SlotId};
    use std::io::Cursor;

    #[test]
    fn read_acquire() {
        let mut cursor = Cursor::new(b"GET\r\n2\r\n".to_vec());
        match Request::from_reader(&mut cursor).unwrap() {
            Request::Acquire { slot } => assert_eq!(slot, SlotId::new(2).unwrap()),
            other => panic!("expected Acquire, got {:?}", other),
        }
    }

    #[test]
    fn unknown_command_is_rejected_without_reading_further() {
        let mut cursor = Cursor::new(b"XYZ\r\n2\r\n".to_vec());
        match Request::from_reader(&mut cursor) {
            Err(RequestError::UnknownCommand(cmd)) => assert_eq!(cmd, "XYZ"),
            other => panic!("expected UnknownCommand, got {:?}", other),
        }
        // the slot line is still unread
        assert_eq!(cursor.position(), 5);
    }

    #[test]
    fn out_of_range_slot_is_rejected() {
        let mut cursor = Cursor::new(b"STA\r\n9\r\n".to_vec());
        match Request::from_reader(&mut cursor) {
            Err(RequestError::InvalidSlot(text)) => assert_eq!(text, "9"),
            other => panic!("expected InvalidSlot, got {:?}", other),
        }
    }

    #[test]
    fn every_command_validates_the_slot_field() {
        for tag in ["GET", "REL", "RST", "PRG", "STA", "MAC"] {
            for slot in 0..=4u8 {
                let mut cursor = Cursor::new(format!("{}\r\n{}\r\n", tag, slot).into_bytes());
                match Request::from_reader(&mut cursor) {
                    Ok(request) => assert_eq!(request.slot(), SlotId::new(slot).unwrap()),
                    // multi-field commands fail later, but never on the slot
                    Err(error) => assert!(
                        !matches!(error, RequestError::InvalidSlot(_)),
                        "slot {} rejected for {}: {:?}",
                        slot,
                        tag,
                        error
                    ),
                }
            }
            for slot in ["5", "9", "x", ""] {
                let mut cursor = Cursor::new(format!("{}\r\n{}\r\n", tag, slot).into_bytes());
                match Request::from_reader(&mut cursor) {
                    Err(RequestError::InvalidSlot(text)) => assert_eq!(text, slot),
                    other => panic!("expected InvalidSlot for {} {}, got {:?}", tag, slot, other),
                }
            }
        }
    }

    #[test]
    fn half_closed_connection_reads_as_invalid_slot() {
        // end of stream yields an empty slot line, which fails validation
        let mut cursor = Cursor::new(b"GET\r\n".to_vec());
        match Request::from_reader(&mut cursor) {
            Err(RequestError::InvalidSlot(text)) => assert!(text.is_empty()),
            other => panic!("expected InvalidSlot, got {:?}", other),
        }
    }

    #[test]
    fn read_program_header_leaves_payload_unread() {
        let mut data = b"PRG\r\n0\r\n4\r\n\r\n".to_vec();
        let header_len = data.len() as u64;
        data.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        let mut cursor = Cursor::new(data);
        match Request::from_reader(&mut cursor).unwrap() {
            Request::Program { slot, length } => {
                assert_eq!(slot, SlotId::new(0).unwrap());
                assert_eq!(length, 4);
            }
            other => panic!("expected Program, got {:?}", other),
        }
        assert_eq!(cursor.position(), header_len);
    }

    #[test]
    fn non_positive_file_size_is_rejected() {
        for size in ["0", "-17", "many"] {
            let mut cursor = Cursor::new(format!("PRG\r\n1\r\n{}\r\n\r\n", size).into_bytes());
            match Request::from_reader(&mut cursor) {
                Err(RequestError::InvalidSize(_)) => {}
                other => panic!("expected InvalidSize for {:?}, got {:?}", size, other),
            }
        }
    }

    #[test]
    fn read_set_mac() {
        let mut cursor = Cursor::new(b"MAC\r\n3\r\naa:bb:cc:dd:ee:ff\r\n\r\n2\r\n".to_vec());
        match Request::from_reader(&mut cursor).unwrap() {
            Request::SetMac { slot, mac, port } => {
                assert_eq!(slot, SlotId::new(3).unwrap());
                assert_eq!(mac.octets(), [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
                assert_eq!(port, PortId::new(2).unwrap());
            }
            other => panic!("expected SetMac, got {:?}", other),
        }
    }

    #[test]
    fn malformed_mac_is_rejected() {
        let mut cursor = Cursor::new(b"MAC\r\n3\r\naa:bb:cc\r\n\r\n2\r\n".to_vec());
        match Request::from_reader(&mut cursor) {
            Err(RequestError::InvalidMac(text)) => assert_eq!(text, "aa:bb:cc"),
            other => panic!("expected InvalidMac, got {:?}", other),
        }
    }

    #[test]
    fn out_of_range_port_is_rejected() {
        let mut cursor = Cursor::new(b"MAC\r\n3\r\naa:bb:cc:dd:ee:ff\r\n\r\n7\r\n".to_vec());
        match Request::from_reader(&mut cursor) {
            Err(RequestError::InvalidPort(text)) => assert_eq!(text, "7"),
            other => panic!("expected InvalidPort, got {:?}", other),
        }
    }

    #[test]
    fn write_set_mac() {
        let request = Request::SetMac {
            slot: SlotId::new(1).unwrap(),
            mac: MacAddr::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]),
            port: PortId::new(4).unwrap(),
        };
        let mut out = Vec::new();
        request.write_to(&mut out).unwrap();
        assert_eq!(out, b"MAC\r\n1\r\naa:bb:cc:dd:ee:ff\r\n\r\n4\r\n".to_vec());
    }

    #[test]
    fn written_requests_parse_back() {
        let requests = [
            Request::Acquire {
                slot: SlotId::new(0).unwrap(),
            },
            Request::Program {
                slot: SlotId::new(2).unwrap(),
                length: 1000,
            },
            Request::SetMac {
                slot: SlotId::new(4).unwrap(),
                mac: MacAddr::new([0, 1, 2, 3, 4, 5]),
                port: PortId::new(0).unwrap(),
            },
        ];
        for request in requests {
            let mut wire = Vec::new();
            request.write_to(&mut wire).unwrap();
            let parsed = Request::from_reader(&mut Cursor::new(wire)).unwrap();
            assert_eq!(parsed, request);
        }
    }

    #[test]
    fn write_ok_response() {
        let mut out = Vec::new();
        Response::ok("Get Successfull").write_to(&mut out).unwrap();
        assert_eq!(out, b"OK\r\nGet Successfull\r\n\r\n".to_vec());
    }

    #[test]
    fn read_nok_response() {
        let mut cursor = Cursor::new(b"NOK\r\ninvalid fpga number\r\n\r\n".to_vec());
        let response = Response::from_reader(&mut cursor).unwrap();
        assert!(!response.is_ok());
        assert_eq!(response.message(), "invalid fpga number");
    }
}
