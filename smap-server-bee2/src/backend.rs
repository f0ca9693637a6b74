//! # SelectMAP Backend
//!
//! Implements [`SlotBackend`] directly on top of the per-slot device
//! surfaces: provisioning goes through register pokes on the status surface
//! plus a bitstream copy into the data surface, and the synchronizing
//! operations go through the [`SyncEngine`](crate::sync::SyncEngine).
use std::{
    fs::File,
    io::{self, Write},
    path::{Path, PathBuf},
};

use smap_protocol::{MacAddr, PortId, SlotId};
use smap_server::{SlotBackend, SyncResult};

use crate::device::DeviceChannel;
use crate::sync::{CommandFrame, SyncEngine};

// Configuration register words written to the status surface around a
// bitstream load, in order: clear, enable configuration, start.
const REG_CLEAR: &str = "00000000";
const REG_CONFIGURE: &str = "04000000";
const REG_START: &str = "0f000000";

/// Slot backend driving the SelectMAP surfaces of a BEE2-style board.
pub struct SelectmapBackend {
    channels: [DeviceChannel; SlotId::COUNT],
    default_bitstream: PathBuf,
}

impl SelectmapBackend {
    pub fn new(
        status_dir: &Path,
        device_dir: &Path,
        default_bitstream: impl Into<PathBuf>,
    ) -> SelectmapBackend {
        SelectmapBackend {
            channels: std::array::from_fn(|i| {
                DeviceChannel::new(status_dir, device_dir, SlotId::ALL[i])
            }),
            default_bitstream: default_bitstream.into(),
        }
    }

    fn channel(&self, slot: SlotId) -> &DeviceChannel {
        &self.channels[slot.index()]
    }

    /// Writes one register word to the slot's status surface.
    fn poke_register(&self, slot: SlotId, word: &str) -> io::Result<()> {
        let mut file = File::create(self.channel(slot).status_path())?;
        writeln!(file, "{}", word)
    }

    /// Streams a bitstream into the slot's data surface.
    fn load_bitstream(&self, slot: SlotId, bitstream: &Path) -> io::Result<()> {
        let mut source = File::open(bitstream)?;
        let mut dest = File::create(self.channel(slot).data_path())?;
        let bytes = io::copy(&mut source, &mut dest)?;
        log::debug!("streamed {} bitstream bytes into slot {}", bytes, slot);
        Ok(())
    }

    /// The full provisioning sequence for a slot: clear the configuration
    /// registers, enable configuration, stream the bitstream, start.
    fn provision(&self, slot: SlotId, bitstream: &Path) -> io::Result<()> {
        self.poke_register(slot, REG_CLEAR)?;
        self.poke_register(slot, REG_CONFIGURE)?;
        self.load_bitstream(slot, bitstream)?;
        self.poke_register(slot, REG_START)
    }

    fn synchronize(&self, slot: SlotId, frame: &CommandFrame) -> SyncResult {
        SyncEngine::new(self.channel(slot)).run(frame)
    }
}

impl SlotBackend for SelectmapBackend {
    fn acquire(&self, slot: SlotId) -> io::Result<()> {
        self.provision(slot, &self.default_bitstream)
    }

    fn release(&self, slot: SlotId) -> io::Result<()> {
        self.provision(slot, &self.default_bitstream)
    }

    fn reset(&self, slot: SlotId) -> io::Result<()> {
        self.provision(slot, &self.default_bitstream)
    }

    fn program(&self, slot: SlotId, bitstream: &Path) -> io::Result<()> {
        self.provision(slot, bitstream)
    }

    fn status(&self, slot: SlotId) -> SyncResult {
        self.synchronize(slot, &CommandFrame::status_probe())
    }

    fn set_mac(&self, slot: SlotId, mac: MacAddr, port: PortId) -> SyncResult {
        self.synchronize(slot, &CommandFrame::set_mac(mac, port))
    }
}
