//! # SelectMAP Slot-Agent Client
//!
//! A Rust client library for connecting to SelectMAP slot-agent servers and
//! managing FPGA accelerator slots on a remote host.
//!
//! ## Overview
//!
//! This crate provides a high-level client interface to slot agents. It
//! handles request serialization and response parsing, and respects the
//! protocol's one-request-per-connection discipline: every operation opens
//! its own TCP connection, which the server closes after answering.
//!
//! ## Basic Usage
//!
//! ### Connecting to a Server
//!
//! ```ignore
//! use smap_client::SmapClient;
//! use smap_protocol::SlotId;
//!
//! let client = SmapClient::new("127.0.0.1:6677")?;
//! let slot = SlotId::new(2).unwrap();
//!
//! let reply = client.acquire(slot)?;
//! println!("acquire: {} ({})", reply.is_ok(), reply.message());
//! ```
//!
//! ### Programming a Slot
//!
//! ```ignore
//! let bitstream = std::fs::read("counter.bit")?;
//! let reply = client.program(slot, &bitstream)?;
//! assert!(reply.is_ok());
//! ```
//!
//! ### Assigning a MAC Address
//!
//! ```ignore
//! use smap_protocol::{MacAddr, PortId};
//!
//! let mac = MacAddr::parse("aa:bb:cc:dd:ee:ff").unwrap();
//! client.set_mac(slot, mac, PortId::new(0).unwrap())?;
//! ```
//!
//! ## Related Crates
//!
//! - [`smap_server`](https://docs.rs/smap-server/) - Server implementation
//! - [`smap_protocol`](https://docs.rs/smap-protocol/) - Protocol encoding/decoding
use std::{
    error::Error,
    fmt::Display,
    io::{self, Write},
    net::{SocketAddr, TcpStream, ToSocketAddrs},
};

use smap_protocol::{MacAddr, PortId, Request, Response, SlotId, error::ResponseError};

/// Errors that may occur during one client operation.
#[derive(Debug)]
pub enum ClientError {
    IoError(io::Error),
    /// The server's answer did not parse as a response.
    Response(ResponseError),
}

impl From<io::Error> for ClientError {
    fn from(value: io::Error) -> Self {
        ClientError::IoError(value)
    }
}

impl Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::IoError(error) => write!(f, "{}", error),
            ClientError::Response(error) => write!(f, "{}", error),
        }
    }
}

impl Error for ClientError {}

/// Client for remote slot management.
///
/// Holds only the server address; every operation opens a fresh connection.
pub struct SmapClient {
    addr: SocketAddr,
}

impl SmapClient {
    /// Resolves the server address. No connection is made until the first
    /// operation.
    pub fn new(addr: impl ToSocketAddrs) -> io::Result<SmapClient> {
        let addr = addr.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "no address resolved")
        })?;
        Ok(SmapClient { addr })
    }

    /// Runs one request/response exchange on a fresh connection.
    fn exchange(&self, request: &Request, payload: Option<&[u8]>) -> Result<Response, ClientError> {
        let mut tcp = TcpStream::connect(self.addr)?;
        request.write_to(&mut tcp)?;
        if let Some(payload) = payload {
            tcp.write_all(payload)?;
        }
        Response::from_reader(&mut tcp).map_err(ClientError::Response)
    }

    /// Claim a slot and have it provisioned to a known idle state.
    pub fn acquire(&self, slot: SlotId) -> Result<Response, ClientError> {
        self.exchange(&Request::Acquire { slot }, None)
    }

    /// Return a previously acquired slot.
    pub fn release(&self, slot: SlotId) -> Result<Response, ClientError> {
        self.exchange(&Request::Release { slot }, None)
    }

    /// Re-initialize a slot's configuration registers and default bitstream.
    pub fn reset(&self, slot: SlotId) -> Result<Response, ClientError> {
        self.exchange(&Request::Reset { slot }, None)
    }

    /// Program a slot with the given bitstream.
    pub fn program(&self, slot: SlotId, bitstream: &[u8]) -> Result<Response, ClientError> {
        let request = Request::Program {
            slot,
            length: bitstream.len() as u64,
        };
        self.exchange(&request, Some(bitstream))
    }

    /// Probe a slot's FIFO synchronization state.
    pub fn status(&self, slot: SlotId) -> Result<Response, ClientError> {
        self.exchange(&Request::Status { slot }, None)
    }

    /// Assign a MAC address to one of a slot's network ports.
    ///
    /// The server acknowledges the request itself, not the hardware
    /// handshake; an `OK` reply does not guarantee the address was taken.
    pub fn set_mac(
        &self,
        slot: SlotId,
        mac: MacAddr,
        port: PortId,
    ) -> Result<Response, ClientError> {
        self.exchange(&Request::SetMac { slot, mac, port }, None)
    }
}
