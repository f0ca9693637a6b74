//! # SelectMAP Slot-Agent Server Library
//!
//! This crate provides a foundation for implementing SelectMAP slot-agent
//! servers that manage FPGA accelerator slots over network connections.
//!
//! ## Overview
//!
//! A slot agent lets remote clients acquire, program, reset, release and
//! query FPGA slots on a host machine. This library abstracts the protocol
//! handling and provides a server implementation that can work with
//! different backend device drivers.
//!
//! ## Architecture
//!
//! The crate is built around two main components:
//!
//! - **[`SlotBackend`] Trait**: Defines the interface that backend drivers
//!   must implement to handle the low-level slot operations (provisioning,
//!   programming and FIFO synchronization)
//! - **[`server::Server`]**: A generic server that handles protocol
//!   communication, request parsing, per-slot serialization and client
//!   connections
//!
//! ## How It Works
//!
//! 1. A backend driver (e.g. the SelectMAP device backend) implements the
//!    [`SlotBackend`] trait
//! 2. The driver is wrapped in a [`server::Server`] instance
//! 3. The server listens for TCP connections, spawning one worker thread
//!    per accepted connection
//! 4. Each connection carries exactly one request; the dispatcher validates
//!    it, takes the addressed slot's lock, and forwards the operation to the
//!    backend driver
//! 5. The outcome is mapped to an `OK`/`NOK` response line pair and the
//!    connection is closed
//!
//! ## Basic Usage
//!
//! ### Implementing a Backend Driver
//!
//! Create a struct that implements the [`SlotBackend`] trait:
//!
//! ```ignore
//! use smap_server::{SlotBackend, SyncResult};
//!
//! struct MyDriver {
//!     // device-specific fields
//! }
//!
//! impl SlotBackend for MyDriver {
//!     fn acquire(&self, slot: SlotId) -> io::Result<()> {
//!         // provision the slot to a known idle state
//!         Ok(())
//!     }
//!
//!     // ...remaining operations
//! }
//! ```
//!
//! ### Starting the Server
//!
//! ```ignore
//! use smap_server::server::{Server, Config};
//!
//! let driver = MyDriver::new()?;
//! let server = Server::new(driver, Config::default());
//! server.listen("0.0.0.0:6677")?;
//! ```
//!
//! ## Concurrency
//!
//! Workers share no state beyond the backend itself. The server holds one
//! lock per slot and keeps it for the full duration of any hardware
//! sequence (drain→command→poll, or receive→program), so concurrent
//! connections can never interleave device access on the same slot.
//!
//! ## Logging
//!
//! This crate uses the `log` crate for diagnostics. Enable logging to see:
//! - Client connections and the requests they carry
//! - Rejected requests with their diagnostic codes
//! - Bitstream transfer progress and provisioning failures
//!
//! Configure logging with an implementation like `env_logger`:
//!
//! ```ignore
//! env_logger::init();
//! ```

pub mod bitstream;
pub mod server;

use std::io;
use std::path::Path;

use smap_protocol::{MacAddr, PortId, SlotId};

/// Outcome of one drain→command→poll exchange with a slot's hardware FIFO.
///
/// Produced by the synchronizing operations ([`SlotBackend::status`] and
/// [`SlotBackend::set_mac`]); each variant maps to exactly one response line
/// in the protocol.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SyncResult {
    /// The slot answered with the expected acknowledgement byte.
    Acknowledged,
    /// The slot answered, but not with the expected byte.
    UnexpectedResponse,
    /// The slot produced no response within the bounded poll window.
    TimedOut,
    /// The slot's status surface could not be opened or read.
    StatusUnavailable,
    /// The slot's data surface could not be opened, read or written.
    DataUnavailable,
    /// The slot is not operating in FIFO mode.
    NotFifoMode,
    /// The status surface reported no usable pending-byte count.
    NoReadCount,
    /// The reported FIFO depth exceeds the drain safety bound; the slot is
    /// considered desynchronized and is not touched further.
    FifoOverrun,
}

/// Trait that backend drivers must implement to provide slot operations.
///
/// This trait defines the interface between the protocol server and the
/// actual slot hardware. Implementors are responsible for translating the
/// high-level operations into device-specific provisioning and FIFO
/// command exchanges.
///
/// The server serializes calls per slot; implementations never see two
/// concurrent calls for the same [`SlotId`], but must tolerate concurrent
/// calls for different slots.
pub trait SlotBackend: Send + Sync {
    /// Claim a slot, re-initializing it to a known idle state.
    fn acquire(&self, slot: SlotId) -> io::Result<()>;

    /// Return a slot, re-initializing it on the way out.
    fn release(&self, slot: SlotId) -> io::Result<()>;

    /// Re-initialize a slot's configuration registers and load its default
    /// bitstream.
    fn reset(&self, slot: SlotId) -> io::Result<()>;

    /// Provision a slot with the bitstream persisted at `bitstream`.
    ///
    /// Called only after the full payload has been received; a transfer
    /// failure never reaches the backend.
    fn program(&self, slot: SlotId, bitstream: &Path) -> io::Result<()>;

    /// Probe the slot's FIFO synchronization state.
    fn status(&self, slot: SlotId) -> SyncResult;

    /// Push a MAC address assignment for `port` through the slot's command
    /// FIFO.
    ///
    /// The protocol reports success to the client regardless of the
    /// handshake outcome; the returned [`SyncResult`] is only logged.
    fn set_mac(&self, slot: SlotId, mac: MacAddr, port: PortId) -> SyncResult;
}
