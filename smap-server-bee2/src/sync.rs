//! # FIFO Synchronization Engine
//!
//! The drain → command → poll state machine shared by the status probe and
//! the MAC assignment: stale bytes left in the hardware FIFO by a previous,
//! possibly interrupted exchange are drained first, then the command frame
//! is issued in a single write, then the pending count is polled until the
//! slot answers or the bounded poll window closes.
use std::{thread, time::Duration};

use smap_protocol::{MacAddr, PortId};
use smap_server::SyncResult;

use crate::device::{DeviceChannel, DeviceError};

/// Pending counts above this bound cannot come from a valid exchange; the
/// slot is treated as desynchronized and left untouched.
pub const MAX_PENDING: u32 = 129;
/// Number of response poll attempts after the command is issued.
pub const POLL_ITERATIONS: u32 = 100;
/// Delay before each poll attempt.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

const STATUS_PROBE_OPCODE: u8 = 0x31;
const STATUS_PROBE_ACK: u8 = 0x2D;
const SET_MAC_OPCODE: u8 = 0x6A;
const SET_MAC_ACK: u8 = 0x6B;

/// A framed command for a slot's FIFO, paired with the single
/// acknowledgement byte the slot is expected to answer with.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandFrame {
    payload: Box<[u8]>,
    ack: u8,
}

impl CommandFrame {
    /// The one-byte status probe.
    pub fn status_probe() -> CommandFrame {
        CommandFrame {
            payload: Box::new([STATUS_PROBE_OPCODE]),
            ack: STATUS_PROBE_ACK,
        }
    }

    /// The eight-byte MAC assignment frame: opcode, port number, then the
    /// six address octets in the order they were written on the wire.
    pub fn set_mac(mac: MacAddr, port: PortId) -> CommandFrame {
        let mut payload = [0u8; 8];
        payload[0] = SET_MAC_OPCODE;
        payload[1] = port.raw();
        payload[2..].copy_from_slice(&mac.octets());
        CommandFrame {
            payload: Box::new(payload),
            ack: SET_MAC_ACK,
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn ack(&self) -> u8 {
        self.ack
    }
}

/// The device operations the engine needs. [`DeviceChannel`] is the real
/// implementation; tests script their own.
pub trait Channel {
    fn read_count(&self) -> Result<u32, DeviceError>;
    fn read_byte(&self) -> Result<u8, DeviceError>;
    fn write_frame(&self, frame: &[u8]) -> Result<(), DeviceError>;
}

impl Channel for DeviceChannel {
    fn read_count(&self) -> Result<u32, DeviceError> {
        DeviceChannel::read_count(self)
    }

    fn read_byte(&self) -> Result<u8, DeviceError> {
        DeviceChannel::read_byte(self)
    }

    fn write_frame(&self, frame: &[u8]) -> Result<(), DeviceError> {
        DeviceChannel::write_frame(self, frame)
    }
}

/// Drives one framed command exchange against a slot's FIFO.
///
/// The engine performs no network I/O; callers translate the returned
/// [`SyncResult`] into a protocol response.
pub struct SyncEngine<'a, C> {
    channel: &'a C,
    poll_iterations: u32,
    poll_interval: Duration,
}

impl<'a, C: Channel> SyncEngine<'a, C> {
    pub fn new(channel: &'a C) -> SyncEngine<'a, C> {
        SyncEngine {
            channel,
            poll_iterations: POLL_ITERATIONS,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Overrides the poll window. Tests use this to poll without delay.
    pub fn with_poll(channel: &'a C, iterations: u32, interval: Duration) -> SyncEngine<'a, C> {
        SyncEngine {
            channel,
            poll_iterations: iterations,
            poll_interval: interval,
        }
    }

    pub fn run(&self, frame: &CommandFrame) -> SyncResult {
        let mut pending = match self.pending() {
            Ok(count) => count,
            Err(result) => return result,
        };
        while pending > 0 {
            match self.channel.read_byte() {
                Ok(stale) => log::trace!("drained stale byte {:#04x}", stale),
                Err(error) => return sync_error(error),
            }
            pending = match self.pending() {
                Ok(count) => count,
                Err(result) => return result,
            };
        }

        if let Err(error) = self.channel.write_frame(frame.payload()) {
            return sync_error(error);
        }
        log::debug!(
            "issued command {:#04x}, awaiting acknowledgement {:#04x}",
            frame.payload()[0],
            frame.ack()
        );

        for attempt in 0..self.poll_iterations {
            thread::sleep(self.poll_interval);
            let waiting = match self.pending() {
                Ok(count) => count,
                Err(result) => return result,
            };
            if waiting == 0 {
                continue;
            }
            // One response byte decides the exchange; no further polling.
            return match self.channel.read_byte() {
                Ok(byte) if byte == frame.ack() => SyncResult::Acknowledged,
                Ok(byte) => {
                    log::debug!(
                        "expected acknowledgement {:#04x}, got {:#04x} on attempt {}",
                        frame.ack(),
                        byte,
                        attempt
                    );
                    SyncResult::UnexpectedResponse
                }
                Err(error) => sync_error(error),
            };
        }
        SyncResult::TimedOut
    }

    /// Queries the pending count and applies the drain safety bound.
    fn pending(&self) -> Result<u32, SyncResult> {
        match self.channel.read_count() {
            Ok(count) if count > MAX_PENDING => {
                log::warn!(
                    "pending count {} exceeds the safety bound {}",
                    count,
                    MAX_PENDING
                );
                Err(SyncResult::FifoOverrun)
            }
            Ok(count) => Ok(count),
            Err(error) => Err(sync_error(error)),
        }
    }
}

fn sync_error(error: DeviceError) -> SyncResult {
    log::warn!("device error during synchronization: {}", error);
    match error {
        DeviceError::StatusUnavailable(_) => SyncResult::StatusUnavailable,
        DeviceError::NotFifoMode => SyncResult::NotFifoMode,
        DeviceError::NoReadCount => SyncResult::NoReadCount,
        DeviceError::DataUnavailable(_) | DeviceError::ShortWrite { .. } => {
            SyncResult::DataUnavailable
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Channel, CommandFrame, SyncEngine};
    use crate::device::DeviceError;
    use smap_protocol::{MacAddr, PortId};
    use smap_server::SyncResult;
    use std::{cell::RefCell, collections::VecDeque, io, time::Duration};

    struct ScriptedChannel {
        counts: RefCell<VecDeque<Result<u32, DeviceError>>>,
        reads: RefCell<VecDeque<u8>>,
        written: RefCell<Vec<Vec<u8>>>,
    }

    impl ScriptedChannel {
        fn new(
            counts: Vec<Result<u32, DeviceError>>,
            reads: Vec<u8>,
        ) -> ScriptedChannel {
            ScriptedChannel {
                counts: RefCell::new(counts.into()),
                reads: RefCell::new(reads.into()),
                written: RefCell::new(Vec::new()),
            }
        }
    }

    impl Channel for ScriptedChannel {
        fn read_count(&self) -> Result<u32, DeviceError> {
            self.counts
                .borrow_mut()
                .pop_front()
                .expect("unexpected read_count call")
        }

        fn read_byte(&self) -> Result<u8, DeviceError> {
            Ok(self
                .reads
                .borrow_mut()
                .pop_front()
                .expect("unexpected read_byte call"))
        }

        fn write_frame(&self, frame: &[u8]) -> Result<(), DeviceError> {
            self.written.borrow_mut().push(frame.to_vec());
            Ok(())
        }
    }

    fn run_fast(channel: &ScriptedChannel, frame: &CommandFrame) -> SyncResult {
        SyncEngine::with_poll(channel, 100, Duration::ZERO).run(frame)
    }

    #[test]
    fn status_probe_frame_layout() {
        let frame = CommandFrame::status_probe();
        assert_eq!(frame.payload(), [0x31]);
        assert_eq!(frame.ack(), 0x2D);
    }

    #[test]
    fn mac_frame_layout() {
        let mac = MacAddr::parse("aa:bb:cc:dd:ee:ff").unwrap();
        let frame = CommandFrame::set_mac(mac, PortId::new(2).unwrap());
        assert_eq!(
            frame.payload(),
            [0x6A, 0x02, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]
        );
        assert_eq!(frame.ack(), 0x6B);
    }

    #[test]
    fn drains_stale_bytes_before_issuing_the_command() {
        let channel = ScriptedChannel::new(
            // pre-command counts 3, 2, 1, 0; one poll sees the response
            vec![Ok(3), Ok(2), Ok(1), Ok(0), Ok(1)],
            vec![0x10, 0x20, 0x30, 0x2D],
        );
        let result = run_fast(&channel, &CommandFrame::status_probe());
        assert_eq!(result, SyncResult::Acknowledged);
        assert_eq!(*channel.written.borrow(), vec![vec![0x31]]);
        // exactly three stale bytes were drained before the one response read
        assert!(channel.reads.borrow().is_empty());
    }

    #[test]
    fn all_zero_polls_time_out() {
        let mut counts = vec![Ok(0)];
        counts.extend((0..100).map(|_| Ok(0)));
        let channel = ScriptedChannel::new(counts, vec![]);
        let result = run_fast(&channel, &CommandFrame::status_probe());
        assert_eq!(result, SyncResult::TimedOut);
        assert!(channel.counts.borrow().is_empty());
    }

    #[test]
    fn acknowledgement_mid_window_stops_the_poll() {
        // response appears on the fifth poll attempt
        let channel = ScriptedChannel::new(
            vec![Ok(0), Ok(0), Ok(0), Ok(0), Ok(0), Ok(1), Ok(99)],
            vec![0x2D],
        );
        let result = run_fast(&channel, &CommandFrame::status_probe());
        assert_eq!(result, SyncResult::Acknowledged);
        // the trailing scripted count was never queried
        assert_eq!(channel.counts.borrow().len(), 1);
    }

    #[test]
    fn mismatched_acknowledgement_is_unexpected() {
        let channel = ScriptedChannel::new(vec![Ok(0), Ok(1)], vec![0x00]);
        let result = run_fast(&channel, &CommandFrame::status_probe());
        assert_eq!(result, SyncResult::UnexpectedResponse);
    }

    #[test]
    fn precheck_translates_sentinels() {
        let cases = [
            (Err(DeviceError::NotFifoMode), SyncResult::NotFifoMode),
            (Err(DeviceError::NoReadCount), SyncResult::NoReadCount),
            (
                Err(DeviceError::StatusUnavailable(io::Error::other("gone"))),
                SyncResult::StatusUnavailable,
            ),
            (Ok(130), SyncResult::FifoOverrun),
        ];
        for (count, expected) in cases {
            let channel = ScriptedChannel::new(vec![count], vec![]);
            let result = run_fast(&channel, &CommandFrame::status_probe());
            assert_eq!(result, expected);
            assert!(channel.written.borrow().is_empty());
        }
    }

    #[test]
    fn boundary_count_is_still_drained() {
        let mut counts: Vec<Result<u32, DeviceError>> = vec![Ok(129)];
        counts.extend((0..129).map(|i| Ok(128 - i)));
        counts.push(Ok(1));
        let channel = ScriptedChannel::new(counts, {
            let mut reads = vec![0xEE; 129];
            reads.push(0x2D);
            reads
        });
        let result = run_fast(&channel, &CommandFrame::status_probe());
        assert_eq!(result, SyncResult::Acknowledged);
    }

    #[test]
    fn error_mid_drain_stops_immediately() {
        let channel = ScriptedChannel::new(
            vec![Ok(2), Err(DeviceError::NotFifoMode)],
            vec![0x10],
        );
        let result = run_fast(&channel, &CommandFrame::status_probe());
        assert_eq!(result, SyncResult::NotFifoMode);
        assert!(channel.written.borrow().is_empty());
    }

    #[test]
    fn overrun_during_poll_aborts() {
        let channel = ScriptedChannel::new(vec![Ok(0), Ok(0), Ok(200)], vec![]);
        let result = run_fast(&channel, &CommandFrame::status_probe());
        assert_eq!(result, SyncResult::FifoOverrun);
    }

    #[test]
    fn repeated_runs_are_deterministic() {
        for _ in 0..3 {
            let channel = ScriptedChannel::new(vec![Ok(0), Ok(1)], vec![0x2D]);
            assert_eq!(
                run_fast(&channel, &CommandFrame::status_probe()),
                SyncResult::Acknowledged
            );
        }
    }
}
