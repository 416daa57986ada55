//! `MoveData`: BD allocation, descriptor programming, channel push, and
//! completion wait (spec.md §4.6).

extern crate alloc;
use alloc::vec::Vec;

use crate::backend::{BackendKind, ChannelKind, DmaDescriptor, HardwareBackend, MemKind, MemoryBackend};
use crate::constraints::ConstraintsGrid;
use crate::error::RouteError;
use crate::geometry::TileLocation;
use crate::routes_db::RoutingPath;

/// Maximum words a single buffer descriptor can address; larger transfers
/// are split across multiple BD pushes on the same channel (SPEC_FULL.md
/// §4, restored scatter-gather behavior).
pub const MAX_BD_WORDS: usize = 0xFFFF;
const WORD_BYTES: usize = 4;
const MAX_BD_BYTES: usize = MAX_BD_WORDS * WORD_BYTES;

fn host_edge_channel(grid: &ConstraintsGrid, tile: TileLocation, port: u8, is_destination: bool) -> Option<u8> {
    let t = grid.get(tile);
    let list = if is_destination { &t.aie2host_ports } else { &t.host2aie_ports };
    list.iter().find(|p| p.port == port).map(|p| p.channel)
}

fn resolve_channel(grid: &ConstraintsGrid, tile: TileLocation, port: u8, is_destination: bool) -> u8 {
    use crate::geometry::TileType;
    if matches!(grid.get(tile).tile_type, TileType::Shim) {
        host_edge_channel(grid, tile, port, is_destination).unwrap_or(port)
    } else {
        port
    }
}

/// `src_obj`/`dst_obj` describe the caller's view of source/destination
/// buffers: a device address plus how large a transfer to perform.
#[derive(Debug, Clone, Copy)]
pub struct DataObject {
    pub addr: u64,
}

/// Move `size` bytes from `(src, src_obj)` to `(dst_obj, dst)` over the
/// committed route between `src` and `dst`.
pub fn move_data(
    grid: &mut ConstraintsGrid,
    hw: &mut dyn HardwareBackend,
    mem: &mut dyn MemoryBackend,
    path: &RoutingPath,
    src: TileLocation,
    src_obj: DataObject,
    size: usize,
    dst_obj: DataObject,
    dst: TileLocation,
) -> Result<(), RouteError> {
    let src_bd = grid.get_mut(src).find_free_bd().ok_or(RouteError::NoBD)?;
    let dst_bd = match grid.get_mut(dst).find_free_bd() {
        Some(bd) => bd,
        None => {
            grid.get_mut(src).release_bd(src_bd);
            return Err(RouteError::NoBD);
        }
    };

    let result = move_data_with_bds(grid, hw, mem, path, src, src_obj, size, dst_obj, dst, src_bd, dst_bd);

    grid.get_mut(src).release_bd(src_bd);
    grid.get_mut(dst).release_bd(dst_bd);
    result
}

#[allow(clippy::too_many_arguments)]
fn move_data_with_bds(
    grid: &mut ConstraintsGrid,
    hw: &mut dyn HardwareBackend,
    mem: &mut dyn MemoryBackend,
    path: &RoutingPath,
    src: TileLocation,
    src_obj: DataObject,
    size: usize,
    dst_obj: DataObject,
    dst: TileLocation,
    src_bd: u8,
    dst_bd: u8,
) -> Result<(), RouteError> {
    let backend_kind = hw.backend_kind();

    // Shim endpoints on a bare-metal or socket back-end address memory
    // directly by pointer; every other case (including non-shim tiles)
    // also addresses by pointer except a shim tile on an "other" back-end,
    // which addresses by mem-instance offset 0 (spec.md §4.6 point 2).
    let src_is_shim = matches!(grid.get(src).tile_type, crate::geometry::TileType::Shim);
    let dst_is_shim = matches!(grid.get(dst).tile_type, crate::geometry::TileType::Shim);

    let src_addr = resolve_dma_address(src_is_shim, backend_kind, src_obj.addr);
    let dst_addr = resolve_dma_address(dst_is_shim, backend_kind, dst_obj.addr);

    let chunks = size.div_ceil(MAX_BD_BYTES).max(1);
    log::debug!("move_data: {} byte(s) across {} BD chunk(s)", size, chunks);

    let mut remaining = size;
    let mut offset = 0usize;
    while remaining > 0 || offset == 0 {
        let this_len = remaining.min(MAX_BD_BYTES);

        mem.dma_desc_init(src, src_bd, DmaDescriptor { addr: src_addr + offset as u64, len: this_len as u32 })?;
        mem.dma_desc_init(dst, dst_bd, DmaDescriptor { addr: dst_addr + offset as u64, len: this_len as u32 })?;
        mem.dma_enable_bd(src, src_bd)?;
        mem.dma_enable_bd(dst, dst_bd)?;
        mem.dma_write_bd(src, src_bd)?;
        mem.dma_write_bd(dst, dst_bd)?;

        let src_channel = resolve_channel(grid, src, path.mm2s_port, false);
        let dst_channel = resolve_channel(grid, dst, path.s2mm_port, true);

        hw.dma_channel_push_bd_to_queue(src, src_channel, ChannelKind::Mm2s, src_bd)?;
        hw.dma_channel_enable(src, src_channel, ChannelKind::Mm2s)?;
        hw.dma_channel_push_bd_to_queue(dst, dst_channel, ChannelKind::S2mm, dst_bd)?;
        hw.dma_channel_enable(dst, dst_channel, ChannelKind::S2mm)?;

        wait_for_completion(hw, dst, dst_channel, ChannelKind::S2mm)?;

        if remaining == 0 {
            break;
        }
        remaining -= this_len;
        offset += this_len;
    }

    Ok(())
}

fn resolve_dma_address(is_shim: bool, backend_kind: BackendKind, ptr_addr: u64) -> u64 {
    if is_shim {
        match backend_kind {
            BackendKind::BareMetal | BackendKind::Socket => ptr_addr,
            BackendKind::Other => 0,
        }
    } else {
        ptr_addr
    }
}

/// Poll `dma_pending_bd_count` until it reports zero. The pending count is
/// seeded to a nonzero placeholder before the first read — the loop relies
/// entirely on the hardware call overwriting it; a failing first read
/// leaves the wait's outcome undefined (spec.md §9 open question #4,
/// preserved as-is rather than special-cased).
fn wait_for_completion(hw: &mut dyn HardwareBackend, tile: TileLocation, channel: u8, kind: ChannelKind) -> Result<(), RouteError> {
    let mut pending: u32 = 1;
    while pending != 0 {
        pending = hw.dma_pending_bd_count(tile, channel, kind)?;
    }
    Ok(())
}

/// Wait for a route's outstanding DMA to finish, without issuing a new
/// transfer (`RouteDmaWait`, spec.md §6).
pub fn route_dma_wait(
    hw: &mut dyn HardwareBackend,
    grid: &ConstraintsGrid,
    path: &RoutingPath,
    is_s2mm: bool,
) -> Result<(), RouteError> {
    let (tile, port) = if is_s2mm { (path.destination, path.s2mm_port) } else { (path.source, path.mm2s_port) };
    let channel = resolve_channel(grid, tile, port, is_s2mm);
    let kind = if is_s2mm { ChannelKind::S2mm } else { ChannelKind::Mm2s };
    wait_for_completion(hw, tile, channel, kind)
}
