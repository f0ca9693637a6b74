use std::{
    io,
    net::{TcpListener, TcpStream, ToSocketAddrs},
    path::PathBuf,
    sync::{Mutex, PoisonError},
    thread,
    time::Duration,
};

use crate::{SlotBackend, SyncResult, bitstream};
use smap_protocol::{Request, Response, SlotId};

const MSG_ACQUIRED: &str = "Get Successfull";
const MSG_RELEASED: &str = "Release Successfull";
const MSG_RESET: &str = "Reset Successfull";
const MSG_PROGRAMMED: &str = "Program Successfull";
const MSG_MAC_SET: &str = "MAC-SET Successfull";
const MSG_RESET_FAILED: &str = "slot reset failed";
const MSG_PROGRAM_FAILED: &str = "slot program failed";
const MSG_TRANSFER_FAILED: &str = "file transfer failed";
const MSG_STATUS_ACK: &str = "STATUS_RSP";
const MSG_STATUS_INVALID: &str = "STATUS_ERR_INVALID";
const MSG_STATUS_TIMEOUT: &str = "STATUS_ERR_TIMEOUT";
const MSG_NOT_FIFO_MODE: &str = "FPGA is not in FIFO mode. STATUS_ERR_TIMEOUT";
const MSG_STATUS_SURFACE_GONE: &str =
    "cannot open the slot status interface. STATUS_ERR_TIMEOUT. STATUS is not available. Try again.";
const MSG_DATA_SURFACE_GONE: &str =
    "cannot open the slot data interface. STATUS_ERR_TIMEOUT. STATUS is not available. Try again.";

#[derive(Debug, Clone)]
pub struct Config {
    /// Socket read and write timeout for client connections.
    pub read_write_timeout: Duration,
    /// Directory where received bitstreams are spooled, one file per slot.
    pub spool_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            read_write_timeout: Duration::from_secs(30),
            spool_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Spool file for a slot's most recently received bitstream.
    pub fn spool_path(&self, slot: SlotId) -> PathBuf {
        self.spool_dir.join(format!("slot{}.bit", slot))
    }
}

/// Builder to create a [Server] instance and modify configuration options
///
/// # Example
///
/// ```ignore
/// use smap_server::server::Builder;
/// use std::time::Duration;
///
/// let server = Builder::new()
///     .rw_timeout(Duration::from_secs(20))
///     .spool_dir("/var/spool/smap")
///     .build(my_backend);
/// ```
#[derive(Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Set the TCP read and write timeout
    pub fn rw_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_write_timeout = timeout;
        self
    }

    /// Set the directory received bitstreams are spooled into
    pub fn spool_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.spool_dir = dir.into();
        self
    }

    /// Build and return the server
    pub fn build<T: SlotBackend>(self, backend: T) -> Server<T> {
        Server::new(backend, self.config)
    }
}

#[derive(Debug)]
pub struct Server<T: SlotBackend> {
    backend: T,
    config: Config,
    /// One lock per slot, held for the whole hardware sequence of a request.
    slot_locks: [Mutex<()>; SlotId::COUNT],
}

impl<T: SlotBackend> Server<T> {
    pub fn new(backend: T, config: Config) -> Server<T> {
        Server {
            backend,
            config,
            slot_locks: std::array::from_fn(|_| Mutex::new(())),
        }
    }

    /// Binds `addr` and serves connections forever.
    pub fn listen(&self, addr: impl ToSocketAddrs) -> io::Result<()> {
        self.serve(TcpListener::bind(addr)?)
    }

    /// Serves connections from an already bound listener, one worker thread
    /// per connection. Workers only share the backend and the slot locks.
    pub fn serve(&self, listener: TcpListener) -> io::Result<()> {
        if let Ok(addr) = listener.local_addr() {
            log::info!("Server listening for connections on {}", addr);
        }
        thread::scope(|scope| {
            for stream in listener.incoming() {
                match stream {
                    Ok(tcp) => {
                        scope.spawn(move || {
                            if let Ok(addr) = tcp.peer_addr() {
                                log::info!("New client connection from {}", addr);
                            }
                            if let Err(e) = self.handle_client(tcp) {
                                log::error!("Client error: {}", e);
                            }
                        });
                    }
                    Err(e) => log::error!("Connection error: {}", e),
                }
            }
        });
        Ok(())
    }

    /// Handles exactly one request: parse, dispatch, answer, close.
    fn handle_client(&self, mut tcp: TcpStream) -> io::Result<()> {
        tcp.set_read_timeout(Some(self.config.read_write_timeout))?;
        tcp.set_write_timeout(Some(self.config.read_write_timeout))?;

        let response = match Request::from_reader(&mut tcp) {
            Ok(request) => {
                log::debug!("Received request {:?}", request);
                self.process_request(request, &mut tcp)
            }
            Err(error) => {
                log::warn!("Rejecting request (code {}): {}", error.code(), error);
                Response::nok(error.client_message())
            }
        };
        response.write_to(&mut tcp)
    }

    /// Runs the hardware side of a validated request under the slot's lock.
    fn process_request(&self, request: Request, tcp: &mut TcpStream) -> Response {
        let slot = request.slot();
        let _guard = self.slot_locks[slot.index()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match request {
            Request::Acquire { slot } => {
                log::info!("Acquiring slot {}", slot);
                provision_response(self.backend.acquire(slot), slot, MSG_ACQUIRED, MSG_RESET_FAILED)
            }
            Request::Release { slot } => {
                log::info!("Releasing slot {}", slot);
                provision_response(self.backend.release(slot), slot, MSG_RELEASED, MSG_RESET_FAILED)
            }
            Request::Reset { slot } => {
                log::info!("Resetting slot {}", slot);
                provision_response(self.backend.reset(slot), slot, MSG_RESET, MSG_RESET_FAILED)
            }
            Request::Program { slot, length } => {
                let dest = self.config.spool_path(slot);
                log::info!(
                    "Receiving {} bitstream bytes for slot {} into {}",
                    length,
                    slot,
                    dest.display()
                );
                if let Err(error) = bitstream::receive(tcp, length, &dest) {
                    log::error!("Bitstream transfer for slot {} failed (code 108): {}", slot, error);
                    return Response::nok(MSG_TRANSFER_FAILED);
                }
                provision_response(
                    self.backend.program(slot, &dest),
                    slot,
                    MSG_PROGRAMMED,
                    MSG_PROGRAM_FAILED,
                )
            }
            Request::Status { slot } => {
                let result = self.backend.status(slot);
                log::debug!("Status probe on slot {} returned {:?}", slot, result);
                status_response(result)
            }
            Request::SetMac { slot, mac, port } => {
                let result = self.backend.set_mac(slot, mac, port);
                if result != SyncResult::Acknowledged {
                    // The wire answer is OK regardless; the handshake outcome
                    // is visible only here.
                    log::warn!(
                        "Set-MAC handshake on slot {} port {} returned {:?}",
                        slot,
                        port,
                        result
                    );
                }
                Response::ok(MSG_MAC_SET)
            }
        }
    }
}

fn provision_response(
    result: io::Result<()>,
    slot: SlotId,
    ok_message: &str,
    err_message: &str,
) -> Response {
    match result {
        Ok(()) => Response::ok(ok_message),
        Err(error) => {
            log::error!("Provisioning slot {} failed: {}", slot, error);
            Response::nok(err_message)
        }
    }
}

/// Maps a synchronization outcome to its response line.
fn status_response(result: SyncResult) -> Response {
    match result {
        SyncResult::Acknowledged => Response::ok(MSG_STATUS_ACK),
        SyncResult::UnexpectedResponse => Response::nok(MSG_STATUS_INVALID),
        SyncResult::TimedOut | SyncResult::NoReadCount | SyncResult::FifoOverrun => {
            Response::nok(MSG_STATUS_TIMEOUT)
        }
        SyncResult::NotFifoMode => Response::nok(MSG_NOT_FIFO_MODE),
        SyncResult::StatusUnavailable => Response::nok(MSG_STATUS_SURFACE_GONE),
        SyncResult::DataUnavailable => Response::nok(MSG_DATA_SURFACE_GONE),
    }
}

#[cfg(test)]
mod test {
    use super::status_response;
    use crate::SyncResult;

    #[test]
    fn status_responses_follow_the_catalogue() {
        let ok = status_response(SyncResult::Acknowledged);
        assert!(ok.is_ok());
        assert_eq!(ok.message(), "STATUS_RSP");

        let invalid = status_response(SyncResult::UnexpectedResponse);
        assert!(!invalid.is_ok());
        assert_eq!(invalid.message(), "STATUS_ERR_INVALID");

        for result in [
            SyncResult::TimedOut,
            SyncResult::NoReadCount,
            SyncResult::FifoOverrun,
        ] {
            let response = status_response(result);
            assert!(!response.is_ok());
            assert_eq!(response.message(), "STATUS_ERR_TIMEOUT");
        }

        assert!(
            status_response(SyncResult::NotFifoMode)
                .message()
                .starts_with("FPGA is not in FIFO mode")
        );
        assert!(
            status_response(SyncResult::StatusUnavailable)
                .message()
                .contains("STATUS is not available")
        );
        assert!(
            status_response(SyncResult::DataUnavailable)
                .message()
                .contains("STATUS is not available")
        );
    }
}
