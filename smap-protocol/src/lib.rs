//! # SelectMAP Slot-Agent Protocol Library
//!
//! This crate provides a Rust implementation of the wire protocol spoken by
//! SelectMAP slot agents, enabling client-server communication for managing
//! FPGA accelerator slots on a remote host.
//!
//! ## Overview
//!
//! The slot-agent protocol is a CRLF line-oriented text protocol over TCP
//! with a strict one-request-per-connection discipline. This library
//! implements the protocol specification, allowing you to:
//!
//! - Parse and serialize requests and responses
//! - Validate slot numbers, port numbers and MAC addresses
//! - Read bounded CRLF-terminated lines with well-defined truncation
//!   semantics
//!
//! ## Protocol Features
//!
//! - **Commands**:
//!   - `GET` / `REL` / `RST`: acquire, release or reset a slot
//!   - `PRG`: program a slot with a length-declared binary bitstream
//!   - `STA`: probe a slot's FIFO synchronization state
//!   - `MAC`: assign a MAC address to one of a slot's network ports
//! - **Responses**: `OK` or `NOK` verdict, one message line, one blank line
//!
//! ## Basic Usage
//!
//! ### Reading Requests
//!
//! ```
//! use smap_protocol::{Request, SlotId};
//! use std::io::Cursor;
//!
//! let wire = b"GET\r\n2\r\n";
//! let mut reader = Cursor::new(wire.to_vec());
//! let request = Request::from_reader(&mut reader).expect("Request should parse");
//! assert_eq!(request, Request::Acquire { slot: SlotId::new(2).unwrap() });
//! ```
//!
//! ### Writing Responses
//!
//! ```
//! use smap_protocol::Response;
//!
//! let mut buffer = Vec::new();
//! Response::ok("Get Successfull")
//!     .write_to(&mut buffer)
//!     .expect("Writing to vector shouldn't fail");
//! assert_eq!(buffer, b"OK\r\nGet Successfull\r\n\r\n");
//! ```
//!
//! ### Parsing MAC Addresses
//!
//! ```
//! use smap_protocol::MacAddr;
//!
//! let mac = MacAddr::parse("aa:bb:cc:dd:ee:ff").expect("MAC should parse");
//! assert_eq!(mac.octets(), [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
//! ```
//!
//! ## Message Format
//!
//! Every request starts with a three-letter command line followed by a slot
//! number line. `PRG` adds a decimal payload-length line, a blank terminator
//! and the raw payload; `MAC` adds a colon-separated hexadecimal address
//! line, a blank terminator and a port number line. All text lines are
//! CRLF-terminated and bounded to [`codec::MAX_REQUEST_LINE`] bytes.
//!
//! ## Error Handling
//!
//! Request parsing reports [`error::RequestError`], which names the field
//! whose read or validation failed and carries the exact `NOK` message the
//! server must answer with. There is no shared error state; every fallible
//! operation returns its own error value.
//!
//! ## Thread Safety
//!
//! The types in this library are thread-safe and can be safely shared across
//! threads. However, I/O operations (reading/writing) are not synchronized
//! and require external coordination.

pub mod protocol;
pub use protocol::*;
pub mod codec;
pub mod error;
pub mod line;
