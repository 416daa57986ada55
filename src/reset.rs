//! `RoutingSwitchReset`: best-effort sweep that disables every in-use
//! stream-switch connection on tiles this engine never auto-configured
//! (spec.md §4.8). Those tiles were left in whatever state the firmware or
//! a previous session put them in, so there is no recorded
//! slave-port-to-master-port pairing to tear down precisely; the sweep
//! pairs up the in-use bits it finds index-wise and disables each pairing
//! through the error-suppressing backend call, so a guess that does not
//! correspond to a real connection is harmless.

extern crate alloc;
use alloc::vec::Vec;

use crate::backend::HardwareBackend;
use crate::constraints::{ConstraintsGrid, CoreConstraint};
use crate::geometry::{Direction, Polarity, TileLocation};

const CARDINALS: [Direction; 4] = [Direction::North, Direction::South, Direction::East, Direction::West];

fn in_use_cardinal(initial: &CoreConstraint, current: &CoreConstraint, polarity: Polarity) -> Vec<(Direction, u8)> {
    let mut out = Vec::new();
    for &dir in CARDINALS.iter() {
        for idx in 0..8u8 {
            let valid_initially = initial.port_available(dir, polarity, idx);
            let free_now = current.port_available(dir, polarity, idx);
            if valid_initially && !free_now {
                out.push((dir, idx));
            }
        }
    }
    out
}

fn in_use_dma(initial: &CoreConstraint, current: &CoreConstraint, is_mm2s: bool) -> Vec<u8> {
    let mut out = Vec::new();
    for idx in 0..8u8 {
        let valid_initially = if is_mm2s { initial.mm2s_available(idx) } else { initial.s2mm_available(idx) };
        let free_now = if is_mm2s { current.mm2s_available(idx) } else { current.s2mm_available(idx) };
        if valid_initially && !free_now {
            out.push(idx);
        }
    }
    out
}

/// Sweep every tile in `grid` that is not `auto_configured` and disable
/// whatever connections it still shows as in-use.
pub fn routing_switch_reset(grid: &ConstraintsGrid, backend: &mut dyn HardwareBackend) {
    for loc in grid.iter_locations() {
        let current = grid.get(loc);
        if current.auto_configured {
            continue;
        }
        reset_tile(loc, current, backend);
    }
}

fn reset_tile(loc: TileLocation, current: &CoreConstraint, backend: &mut dyn HardwareBackend) {
    let initial = CoreConstraint::new(current.tile_type);

    let slave = in_use_cardinal(&initial, current, Polarity::Slave);
    let master = in_use_cardinal(&initial, current, Polarity::Master);
    let mm2s = in_use_dma(&initial, current, true);
    let s2mm = in_use_dma(&initial, current, false);

    let count = slave.len().max(master.len()).max(mm2s.len()).max(s2mm.len());
    for i in 0..count {
        let (slave_dir, slave_port) = slave.get(i).copied().unwrap_or((Direction::Dma, 0));
        let (master_dir, master_port) = master.get(i).copied().unwrap_or((Direction::Dma, 0));
        if slave.get(i).is_none() && master.get(i).is_none() {
            continue;
        }
        backend.stream_connect_disable_silent(loc, slave_dir, slave_port, master_dir, master_port);
    }
    for &port in mm2s.iter() {
        backend.stream_connect_disable_silent(loc, Direction::Dma, port, Direction::Dma, port);
    }
    for &port in s2mm.iter() {
        backend.stream_connect_disable_silent(loc, Direction::Dma, port, Direction::Dma, port);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendKind, ChannelKind};
    use crate::error::RouteError;
    use crate::geometry::{DeviceGeometry, TileType};
    use core::cell::RefCell;

    struct RecordingBackend {
        disabled: RefCell<Vec<(TileLocation, Direction, u8, Direction, u8)>>,
    }
    impl HardwareBackend for RecordingBackend {
        fn backend_kind(&self) -> BackendKind {
            BackendKind::Other
        }
        fn stream_connect_enable(&mut self, _: TileLocation, _: Direction, _: u8, _: Direction, _: u8) -> Result<(), RouteError> {
            Ok(())
        }
        fn stream_connect_disable(&mut self, _: TileLocation, _: Direction, _: u8, _: Direction, _: u8) -> Result<(), RouteError> {
            Ok(())
        }
        fn stream_connect_disable_silent(&mut self, tile: TileLocation, sd: Direction, sp: u8, md: Direction, mp: u8) {
            self.disabled.borrow_mut().push((tile, sd, sp, md, mp));
        }
        fn enable_shim_dma_to_aie(&mut self, _: TileLocation, _: u8) -> Result<(), RouteError> {
            Ok(())
        }
        fn enable_aie_to_shim_dma(&mut self, _: TileLocation, _: u8) -> Result<(), RouteError> {
            Ok(())
        }
        fn dma_channel_push_bd_to_queue(&mut self, _: TileLocation, _: u8, _: ChannelKind, _: u8) -> Result<(), RouteError> {
            Ok(())
        }
        fn dma_channel_enable(&mut self, _: TileLocation, _: u8, _: ChannelKind) -> Result<(), RouteError> {
            Ok(())
        }
        fn dma_pending_bd_count(&mut self, _: TileLocation, _: u8, _: ChannelKind) -> Result<u32, RouteError> {
            Ok(0)
        }
        fn core_enable(&mut self, _: TileLocation) -> Result<(), RouteError> {
            Ok(())
        }
        fn core_wait_for_done(&mut self, _: TileLocation) -> Result<(), RouteError> {
            Ok(())
        }
    }

    fn geom() -> DeviceGeometry {
        DeviceGeometry {
            num_cols: 8,
            num_rows: 6,
            shim_row: 0,
            mem_tile_row_start: 1,
            mem_tile_num_rows: 1,
            aie_tile_row_start: 2,
            aie_tile_num_rows: 4,
        }
    }

    #[test]
    fn untouched_tiles_produce_no_disable_calls() {
        let grid = ConstraintsGrid::new(geom()).unwrap();
        let mut backend = RecordingBackend { disabled: RefCell::new(Vec::new()) };
        routing_switch_reset(&grid, &mut backend);
        assert!(backend.disabled.borrow().is_empty());
    }

    #[test]
    fn manually_claimed_port_on_non_auto_tile_is_disabled() {
        let mut grid = ConstraintsGrid::new(geom()).unwrap();
        let loc = TileLocation::new(2, 3);
        assert_eq!(grid.get(loc).tile_type, TileType::Compute);
        grid.get_mut(loc).claim_port(Direction::North, Polarity::Slave, 0);
        // auto_configured stays false: this tile was never committed through
        // the engine.
        let mut backend = RecordingBackend { disabled: RefCell::new(Vec::new()) };
        routing_switch_reset(&grid, &mut backend);
        assert!(!backend.disabled.borrow().is_empty());
    }

    #[test]
    fn auto_configured_tiles_are_skipped() {
        let mut grid = ConstraintsGrid::new(geom()).unwrap();
        let loc = TileLocation::new(2, 3);
        grid.get_mut(loc).claim_port(Direction::North, Polarity::Slave, 0);
        grid.get_mut(loc).auto_configured = true;
        let mut backend = RecordingBackend { disabled: RefCell::new(Vec::new()) };
        routing_switch_reset(&grid, &mut backend);
        assert!(backend.disabled.borrow().is_empty());
    }
}
