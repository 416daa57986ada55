//! Diagnostics: routes inspection and stream-switch/constraint dumps
//! (spec.md §4.9). `DumpRoutingSwitchInfo`'s per-mask popcount is an
//! addition beyond the distilled spec text — a cheap summary that's
//! useful wherever the full 8-bit masks already get logged.

extern crate alloc;
use alloc::vec::Vec;

use crate::constraints::ConstraintsGrid;
use crate::geometry::{Direction, Polarity, TileLocation};
use crate::routes_db::{RouteId, RoutesDb, RoutingPath};

/// Look up the committed path for `route_id` without mutating anything
/// (`RoutesReveal`, spec.md §4.9).
pub fn routes_reveal(routes_db: &RoutesDb, route_id: RouteId) -> Option<&RoutingPath> {
    routes_db.get(route_id)
}

/// Snapshot of one tile's stream-switch port availability, with a
/// free-port-count summary per mask alongside the raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchInfo {
    pub slave: [u8; 4],
    pub master: [u8; 4],
    pub slave_free_count: [u32; 4],
    pub master_free_count: [u32; 4],
    pub mm2s_state: u8,
    pub s2mm_state: u8,
    pub mm2s_free_count: u32,
    pub s2mm_free_count: u32,
    pub bd_free_count: u32,
}

const CARDINALS: [Direction; 4] = [Direction::North, Direction::South, Direction::East, Direction::West];

/// Build a `SwitchInfo` snapshot for `tile` and log it at debug level
/// (`DumpRoutingSwitchInfo`, spec.md §4.9).
pub fn dump_routing_switch_info(grid: &ConstraintsGrid, tile: TileLocation) -> SwitchInfo {
    let t = grid.get(tile);
    let mut slave = [0u8; 4];
    let mut master = [0u8; 4];
    let mut slave_free_count = [0u32; 4];
    let mut master_free_count = [0u32; 4];
    for (i, &dir) in CARDINALS.iter().enumerate() {
        let s = mask_byte(t, dir, Polarity::Slave);
        let m = mask_byte(t, dir, Polarity::Master);
        slave[i] = s;
        master[i] = m;
        slave_free_count[i] = s.count_ones();
        master_free_count[i] = m.count_ones();
    }
    let info = SwitchInfo {
        slave,
        master,
        slave_free_count,
        master_free_count,
        mm2s_state: t.mm2s_state,
        s2mm_state: t.s2mm_state,
        mm2s_free_count: t.mm2s_state.count_ones(),
        s2mm_free_count: t.s2mm_state.count_ones(),
        bd_free_count: t.free_bd_count(),
    };
    log::debug!(
        "tile ({}, {}): slave={:?} master={:?} mm2s=0b{:08b} s2mm=0b{:08b} free_bd={}",
        tile.col,
        tile.row,
        info.slave,
        info.master,
        info.mm2s_state,
        info.s2mm_state,
        info.bd_free_count,
    );
    info
}

fn mask_byte(t: &crate::constraints::CoreConstraint, dir: Direction, polarity: Polarity) -> u8 {
    let mut byte = 0u8;
    for idx in 0..8u8 {
        if t.port_available(dir, polarity, idx) {
            byte |= 1 << idx;
        }
    }
    byte
}

/// Dump every tile's `SwitchInfo` in grid order, logging as it goes
/// (`dumpConstraints`, spec.md §4.9).
pub fn dump_constraints(grid: &ConstraintsGrid) -> Vec<(TileLocation, SwitchInfo)> {
    grid.iter_locations().map(|loc| (loc, dump_routing_switch_info(grid, loc))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{DeviceGeometry, Direction, Polarity};

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
    fn popcount_matches_claimed_ports() {
        let mut grid = ConstraintsGrid::new(geom()).unwrap();
        let loc = TileLocation::new(2, 3);
        let before = dump_routing_switch_info(&grid, loc);
        grid.get_mut(loc).claim_port(Direction::North, Polarity::Slave, 0);
        let after = dump_routing_switch_info(&grid, loc);
        assert_eq!(after.slave_free_count[Direction::North.idx()], before.slave_free_count[Direction::North.idx()] - 1);
    }

    #[test]
    fn dump_constraints_covers_every_tile() {
        let grid = ConstraintsGrid::new(geom()).unwrap();
        let all = dump_constraints(&grid);
        assert_eq!(all.len(), grid.iter_locations().count());
    }
}
