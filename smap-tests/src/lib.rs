//! Test support for exercising a slot-agent server end to end: a scriptable
//! in-memory backend and a loopback server bootstrap.
use std::io;
use std::net::{SocketAddr, TcpListener};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;

use smap_protocol::{MacAddr, PortId, SlotId};
use smap_server::server::Builder;
use smap_server::{SlotBackend, SyncResult};

/// One recorded backend invocation, by raw slot number.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Call {
    Acquire(u8),
    Release(u8),
    Reset(u8),
    /// Slot number and the bitstream bytes the server spooled for it.
    Program(u8, Vec<u8>),
    Status(u8),
    SetMac(u8, [u8; 6], u8),
}

/// Scriptable backend that records every call it receives.
pub struct MockBackend {
    calls: Arc<Mutex<Vec<Call>>>,
    pub status_result: SyncResult,
    pub mac_result: SyncResult,
    pub provisioning_fails: bool,
}

impl MockBackend {
    pub fn new() -> MockBackend {
        MockBackend {
            calls: Arc::new(Mutex::new(Vec::new())),
            status_result: SyncResult::Acknowledged,
            mac_result: SyncResult::Acknowledged,
            provisioning_fails: false,
        }
    }

    /// Handle for inspecting recorded calls after the backend has moved
    /// into the server.
    pub fn calls(&self) -> Arc<Mutex<Vec<Call>>> {
        Arc::clone(&self.calls)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn provision(&self) -> io::Result<()> {
        if self.provisioning_fails {
            Err(io::Error::other("scripted provisioning failure"))
        } else {
            Ok(())
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        MockBackend::new()
    }
}

impl SlotBackend for MockBackend {
    fn acquire(&self, slot: SlotId) -> io::Result<()> {
        self.record(Call::Acquire(slot.raw()));
        self.provision()
    }

    fn release(&self, slot: SlotId) -> io::Result<()> {
        self.record(Call::Release(slot.raw()));
        self.provision()
    }

    fn reset(&self, slot: SlotId) -> io::Result<()> {
        self.record(Call::Reset(slot.raw()));
        self.provision()
    }

    fn program(&self, slot: SlotId, bitstream: &Path) -> io::Result<()> {
        let payload = std::fs::read(bitstream)?;
        self.record(Call::Program(slot.raw(), payload));
        self.provision()
    }

    fn status(&self, slot: SlotId) -> SyncResult {
        self.record(Call::Status(slot.raw()));
        self.status_result
    }

    fn set_mac(&self, slot: SlotId, mac: MacAddr, port: PortId) -> SyncResult {
        self.record(Call::SetMac(slot.raw(), mac.octets(), port.raw()));
        self.mac_result
    }
}

/// Boots a server around `backend` on an ephemeral loopback port and returns
/// the bound address. The server thread serves until process exit.
pub fn start_server(backend: MockBackend, spool_dir: &Path) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Builder::new().spool_dir(spool_dir).build(backend);
    thread::spawn(move || {
        let _ = server.serve(listener);
    });
    addr
}
