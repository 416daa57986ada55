//! The downstream primitives this engine consumes, expressed as two
//! object-safe traits (spec.md §6). Everything below this boundary — ELF
//! loading, BD register packing, tile-type discovery, platform I/O
//! selection — is out of scope and lives entirely in the caller's
//! implementation.

use crate::error::RouteError;
use crate::geometry::{Direction, TileLocation};

/// Identity of the platform back-end driving the physical device. Inspected
/// in exactly one place: choosing how a shim tile's DMA descriptor encodes
/// its target address (spec.md §4.6 point 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    BareMetal,
    Socket,
    Other,
}

/// DMA channel kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Mm2s,
    S2mm,
}

/// Stream-switch and shim-DMA control surface, plus core lifecycle control.
/// Implemented by the caller's platform layer; the engine only ever calls
/// through `&mut dyn HardwareBackend`.
pub trait HardwareBackend {
    /// Which platform I/O back-end is driving this device.
    fn backend_kind(&self) -> BackendKind;

    /// Connect `(slave_dir, slave_port)` to `(master_dir, master_port)` on
    /// `tile`'s stream switch.
    fn stream_connect_enable(
        &mut self,
        tile: TileLocation,
        slave_dir: Direction,
        slave_port: u8,
        master_dir: Direction,
        master_port: u8,
    ) -> Result<(), RouteError>;

    /// Tear down a previously-enabled connection.
    fn stream_connect_disable(
        &mut self,
        tile: TileLocation,
        slave_dir: Direction,
        slave_port: u8,
        master_dir: Direction,
        master_port: u8,
    ) -> Result<(), RouteError>;

    /// Error-suppressing variant used by `RoutingSwitchReset` (spec.md
    /// §4.8): invalid tuples must not abort the sweep.
    fn stream_connect_disable_silent(
        &mut self,
        tile: TileLocation,
        slave_dir: Direction,
        slave_port: u8,
        master_dir: Direction,
        master_port: u8,
    );

    /// Enable the shim-to-AIE DMA path on the host-edge `port`.
    fn enable_shim_dma_to_aie(&mut self, tile: TileLocation, port: u8) -> Result<(), RouteError>;

    /// Enable the AIE-to-shim DMA path on the host-edge `port`.
    fn enable_aie_to_shim_dma(&mut self, tile: TileLocation, port: u8) -> Result<(), RouteError>;

    /// Push a buffer descriptor onto `channel`'s queue.
    fn dma_channel_push_bd_to_queue(
        &mut self,
        tile: TileLocation,
        channel: u8,
        kind: ChannelKind,
        bd: u8,
    ) -> Result<(), RouteError>;

    /// Enable `channel` so queued BDs begin transferring.
    fn dma_channel_enable(&mut self, tile: TileLocation, channel: u8, kind: ChannelKind) -> Result<(), RouteError>;

    /// Number of BDs still pending completion on `channel`.
    fn dma_pending_bd_count(&mut self, tile: TileLocation, channel: u8, kind: ChannelKind) -> Result<u32, RouteError>;

    /// Enable the compute core on `tile` and begin execution.
    fn core_enable(&mut self, tile: TileLocation) -> Result<(), RouteError>;

    /// Block until the core on `tile` signals completion.
    fn core_wait_for_done(&mut self, tile: TileLocation) -> Result<(), RouteError>;
}

/// Object describing a single DMA transfer, as handed to
/// `MemoryBackend::init_descriptor`.
#[derive(Debug, Clone, Copy)]
pub struct DmaDescriptor {
    pub addr: u64,
    pub len: u32,
}

/// Where a buffer address falls, selecting which concrete write/read
/// primitive `MemoryBackend` should dispatch to (spec.md §9 "Dynamic
/// function dispatch").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemKind {
    /// Address falls within this tile's local/private memory.
    Local,
    /// Address falls within memory shared across tiles (e.g. a memory
    /// tile's shared bank, or host-visible DRAM).
    Shared,
}

/// Buffer-descriptor programming and device-memory access.
pub trait MemoryBackend {
    /// Initialize BD `bd` on `tile` to describe `desc`, with the address
    /// interpreted per `kind` (pointer vs. mem-instance offset, resolved by
    /// the caller ahead of time per spec.md §4.6 point 2).
    fn dma_desc_init(&mut self, tile: TileLocation, bd: u8, desc: DmaDescriptor) -> Result<(), RouteError>;

    /// Mark BD `bd` on `tile` enabled (ready to be queued).
    fn dma_enable_bd(&mut self, tile: TileLocation, bd: u8) -> Result<(), RouteError>;

    /// Commit the BD's descriptor fields to hardware.
    fn dma_write_bd(&mut self, tile: TileLocation, bd: u8) -> Result<(), RouteError>;

    /// Write `data` into device memory at `addr`, dispatching to the
    /// tile-local or shared-memory primitive based on `kind`.
    fn block_write(&mut self, kind: MemKind, addr: u64, data: &[u8]) -> Result<(), RouteError>;

    /// Read `len` bytes of device memory at `addr` into `out`.
    fn block_read(&mut self, kind: MemKind, addr: u64, out: &mut [u8]) -> Result<(), RouteError>;
}
