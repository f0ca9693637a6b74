//! # SelectMAP Slot Agent for BEE2 Boards
//!
//! Network-facing control agent for the FPGA accelerator slots of a BEE2
//! board, exposing acquire/release/reset/program/status/set-MAC operations
//! over the slot-agent wire protocol.
//!
//! ## Overview
//!
//! This crate extends [`smap_server`](https://docs.rs/smap-server/) with the
//! concrete SelectMAP backend: each slot is driven through its two Linux
//! device surfaces, the line-text status interface under `/proc/fpga` and
//! the byte-stream data interface under `/dev`.
mod backend;
mod device;
mod sync;

use std::error::Error;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;
use env_logger::Env;
use smap_server::server::Builder;

use crate::backend::SelectmapBackend;

#[derive(Parser)]
#[command(about = "Network control agent for SelectMAP FPGA accelerator slots", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "6677")]
    port: u16,

    #[arg(short, long, default_value = "0.0.0.0")]
    ip: IpAddr,

    /// Directory holding the per-slot status surfaces
    #[arg(long, default_value = device::DEFAULT_STATUS_DIR)]
    status_dir: PathBuf,

    /// Directory holding the per-slot data surfaces
    #[arg(long, default_value = device::DEFAULT_DEVICE_DIR)]
    device_dir: PathBuf,

    /// Bitstream loaded into a slot on acquire, release and reset
    #[arg(long, default_value = "default.bit")]
    default_bitstream: PathBuf,

    /// Directory received bitstreams are spooled into
    #[arg(long, default_value = ".")]
    spool_dir: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    log::info!("Starting SelectMAP slot agent");

    let args = Args::parse();
    let addr = SocketAddr::new(args.ip, args.port);
    log::debug!(
        "Surfaces under {} and {}, default bitstream {}",
        args.status_dir.display(),
        args.device_dir.display(),
        args.default_bitstream.display()
    );

    let backend = SelectmapBackend::new(
        &args.status_dir,
        &args.device_dir,
        args.default_bitstream,
    );
    let server = Builder::new().spool_dir(args.spool_dir).build(backend);

    log::info!("Binding to address: {}", addr);
    server.listen(addr)?;
    Ok(())
}
