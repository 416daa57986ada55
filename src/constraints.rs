//! Per-tile core constraints: port/BD availability bit-vectors and the dense
//! constraints grid they live in.

extern crate alloc;
use alloc::vec::Vec;
use bitflags::bitflags;

use crate::error::RouteError;
use crate::geometry::{Direction, DeviceGeometry, Polarity, TileLocation, TileType};
use crate::routes_db::RouteId;

bitflags! {
    /// Which cardinal directions a tile's stream switch exposes at all.
    /// Memory tiles expose only North/South; shim and compute tiles expose
    /// all four.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DirSupported: u8 {
        const NORTH = 0b0001;
        const SOUTH = 0b0010;
        const EAST  = 0b0100;
        const WEST  = 0b1000;
    }
}

/// One host-edge port/channel mapping entry on a shim tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostEdgePort {
    pub port: u8,
    pub channel: u8,
    pub available: bool,
}

/// Default shim-tile host-edge port/channel mapping (spec.md §3).
pub fn default_host2aie_ports() -> Vec<HostEdgePort> {
    alloc::vec![
        HostEdgePort { port: 3, channel: 0, available: true },
        HostEdgePort { port: 7, channel: 1, available: true },
    ]
}

pub fn default_aie2host_ports() -> Vec<HostEdgePort> {
    alloc::vec![
        HostEdgePort { port: 2, channel: 0, available: true },
        HostEdgePort { port: 3, channel: 1, available: true },
    ]
}

/// Per-tile resource state: port-availability bit-vectors, BD free mask,
/// and the routes whose source is this tile.
#[derive(Debug, Clone)]
pub struct CoreConstraint {
    pub tile_type: TileType,
    pub auto_configured: bool,
    pub core_executing: bool,

    /// Indexed by `Direction::idx()` (N, S, E, W). Bit `i` set means port
    /// `i` is free.
    slave: [u8; 4],
    master: [u8; 4],

    pub mm2s_state: u8,
    pub s2mm_state: u8,
    /// Shim tiles' host-facing DMA controller masks (spec.md §3); distinct
    /// from `mm2s_state`/`s2mm_state`, which track the tile's local DMA.
    /// No current operation claims against these independently of
    /// `host2aie_ports`/`aie2host_ports`.
    pub shim_mm2s_state: u8,
    pub shim_s2mm_state: u8,

    /// BD free mask. Only the low `bd_width` bits are meaningful.
    bd_state: u64,
    pub bd_width: u8,

    pub host2aie_ports: Vec<HostEdgePort>,
    pub aie2host_ports: Vec<HostEdgePort>,

    pub routes_db: Vec<RouteId>,
    pub mm2s_in_use: Vec<u8>,
    pub s2mm_in_use: Vec<u8>,

    pub dir_supported: DirSupported,
}

static_assertions::const_assert!(48 <= u64::BITS as usize);

impl CoreConstraint {
    /// Build a fresh, unrouted constraint record for `tile_type`, loading
    /// the initial masks from the table in spec.md §3.
    pub fn new(tile_type: TileType) -> Self {
        let (slave, master, dma_mask, bd_width, dir_supported) = match tile_type {
            TileType::Compute => (
                [0x0F, 0x3F, 0x0F, 0x0F],
                [0x3F, 0x0F, 0x0F, 0x0F],
                0x03u8,
                16u8,
                DirSupported::all(),
            ),
            TileType::Memory => (
                [0x0F, 0x3F, 0x00, 0x00],
                [0x3F, 0x0F, 0x00, 0x00],
                0x3Fu8,
                48u8,
                DirSupported::NORTH | DirSupported::SOUTH,
            ),
            TileType::Shim => (
                [0x0F, 0x00, 0x0F, 0x0F],
                [0x3F, 0x00, 0x0F, 0x0F],
                0x03u8,
                16u8,
                DirSupported::all(),
            ),
        };
        let bd_state = if bd_width >= 64 { u64::MAX } else { (1u64 << bd_width) - 1 };
        Self {
            tile_type,
            auto_configured: false,
            core_executing: false,
            slave,
            master,
            mm2s_state: dma_mask,
            s2mm_state: dma_mask,
            shim_mm2s_state: dma_mask,
            shim_s2mm_state: dma_mask,
            bd_state,
            bd_width,
            host2aie_ports: if matches!(tile_type, TileType::Shim) {
                default_host2aie_ports()
            } else {
                Vec::new()
            },
            aie2host_ports: if matches!(tile_type, TileType::Shim) {
                default_aie2host_ports()
            } else {
                Vec::new()
            },
            routes_db: Vec::new(),
            mm2s_in_use: Vec::new(),
            s2mm_in_use: Vec::new(),
            dir_supported,
        }
    }

    fn byte(&self, dir: Direction, polarity: Polarity) -> u8 {
        match polarity {
            Polarity::Slave => self.slave[dir.idx()],
            Polarity::Master => self.master[dir.idx()],
        }
    }

    /// Slave byte for `dir`, exposed crate-wide for the port matcher.
    pub(crate) fn byte_slave(&self, dir: Direction) -> u8 {
        self.byte(dir, Polarity::Slave)
    }

    /// Master byte for `dir`, exposed crate-wide for the port matcher.
    pub(crate) fn byte_master(&self, dir: Direction) -> u8 {
        self.byte(dir, Polarity::Master)
    }

    fn byte_mut(&mut self, dir: Direction, polarity: Polarity) -> &mut u8 {
        match polarity {
            Polarity::Slave => &mut self.slave[dir.idx()],
            Polarity::Master => &mut self.master[dir.idx()],
        }
    }

    /// `port_available(dir, polarity, idx)` — read bit `idx`.
    pub fn port_available(&self, dir: Direction, polarity: Polarity, idx: u8) -> bool {
        self.byte(dir, polarity) & (1 << idx) != 0
    }

    /// Clear bit `idx` (claim the port). Idempotent: claiming an
    /// already-claimed port is a no-op.
    pub fn claim_port(&mut self, dir: Direction, polarity: Polarity, idx: u8) {
        *self.byte_mut(dir, polarity) &= !(1 << idx);
    }

    /// Set bit `idx` (release the port). Idempotent.
    pub fn release_port(&mut self, dir: Direction, polarity: Polarity, idx: u8) {
        *self.byte_mut(dir, polarity) |= 1 << idx;
    }

    /// Lowest free port index for `(dir, polarity)`, or `None` if none free.
    pub fn lowest_free_port(&self, dir: Direction, polarity: Polarity) -> Option<u8> {
        let byte = self.byte(dir, polarity);
        if byte == 0 {
            None
        } else {
            Some(byte.trailing_zeros() as u8)
        }
    }

    /// `mm2s_state`/`s2mm_state` accessors, analogous to the port
    /// accessors above but over the endpoint-DMA byte.
    pub fn mm2s_available(&self, idx: u8) -> bool {
        self.mm2s_state & (1 << idx) != 0
    }
    pub fn claim_mm2s(&mut self, idx: u8) {
        self.mm2s_state &= !(1 << idx);
    }
    pub fn release_mm2s(&mut self, idx: u8) {
        self.mm2s_state |= 1 << idx;
    }
    pub fn lowest_free_mm2s(&self) -> Option<u8> {
        if self.mm2s_state == 0 {
            None
        } else {
            Some(self.mm2s_state.trailing_zeros() as u8)
        }
    }

    pub fn s2mm_available(&self, idx: u8) -> bool {
        self.s2mm_state & (1 << idx) != 0
    }
    pub fn claim_s2mm(&mut self, idx: u8) {
        self.s2mm_state &= !(1 << idx);
    }
    pub fn release_s2mm(&mut self, idx: u8) {
        self.s2mm_state |= 1 << idx;
    }
    pub fn lowest_free_s2mm(&self) -> Option<u8> {
        if self.s2mm_state == 0 {
            None
        } else {
            Some(self.s2mm_state.trailing_zeros() as u8)
        }
    }

    /// Return and claim the least-significant free BD index, or `None` if
    /// the tile's BD pool is exhausted.
    pub fn find_free_bd(&mut self) -> Option<u8> {
        if self.bd_state == 0 {
            return None;
        }
        let idx = self.bd_state.trailing_zeros() as u8;
        self.bd_state &= !(1u64 << idx);
        Some(idx)
    }

    /// Release BD `idx` back to the free pool. Idempotent.
    pub fn release_bd(&mut self, idx: u8) {
        self.bd_state |= 1u64 << idx;
    }

    /// Count of free BD slots, for diagnostics.
    pub fn free_bd_count(&self) -> u32 {
        self.bd_state.count_ones()
    }
}

/// Dense `[col][row]` matrix of `CoreConstraint`, one entry per tile.
#[derive(Debug, Clone)]
pub struct ConstraintsGrid {
    geometry: DeviceGeometry,
    tiles: Vec<CoreConstraint>,
}

impl ConstraintsGrid {
    /// Build a grid from device geometry, loading per-tile-type initial
    /// masks (spec.md §4.1).
    pub fn new(geometry: DeviceGeometry) -> Result<Self, RouteError> {
        geometry.validate()?;
        let mut tiles = Vec::with_capacity(geometry.num_cols as usize * geometry.num_rows as usize);
        for row in 0..geometry.num_rows {
            for col in 0..geometry.num_cols {
                let loc = TileLocation::new(col, row);
                tiles.push(CoreConstraint::new(geometry.tile_type(loc)));
            }
        }
        Ok(Self { geometry, tiles })
    }

    pub fn geometry(&self) -> &DeviceGeometry {
        &self.geometry
    }

    fn index(&self, loc: TileLocation) -> usize {
        loc.row as usize * self.geometry.num_cols as usize + loc.col as usize
    }

    pub fn get(&self, loc: TileLocation) -> &CoreConstraint {
        &self.tiles[self.index(loc)]
    }

    pub fn get_mut(&mut self, loc: TileLocation) -> &mut CoreConstraint {
        let idx = self.index(loc);
        &mut self.tiles[idx]
    }

    /// Borrow two distinct tiles mutably at once (needed when an allocation
    /// spans two adjacent tiles).
    pub fn get_two_mut(
        &mut self,
        a: TileLocation,
        b: TileLocation,
    ) -> (&mut CoreConstraint, &mut CoreConstraint) {
        let ia = self.index(a);
        let ib = self.index(b);
        assert_ne!(ia, ib, "get_two_mut requires distinct tiles");
        if ia < ib {
            let (left, right) = self.tiles.split_at_mut(ib);
            (&mut left[ia], &mut right[0])
        } else {
            let (left, right) = self.tiles.split_at_mut(ia);
            (&mut right[0], &mut left[ib])
        }
    }

    pub fn iter_locations(&self) -> impl Iterator<Item = TileLocation> + '_ {
        let cols = self.geometry.num_cols;
        (0..self.tiles.len()).map(move |i| TileLocation::new((i as u8) % cols, (i / cols as usize) as u8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_masks_match_table() {
        let c = CoreConstraint::new(TileType::Compute);
        assert_eq!(c.byte(Direction::North, Polarity::Slave), 0x0F);
        assert_eq!(c.byte(Direction::South, Polarity::Slave), 0x3F);
        assert_eq!(c.mm2s_state, 0x03);
        assert_eq!(c.bd_width, 16);

        let m = CoreConstraint::new(TileType::Memory);
        assert_eq!(m.byte(Direction::East, Polarity::Slave), 0x00);
        assert_eq!(m.byte(Direction::West, Polarity::Master), 0x00);
        assert_eq!(m.bd_width, 48);
        assert_eq!(m.dir_supported, DirSupported::NORTH | DirSupported::SOUTH);

        let s = CoreConstraint::new(TileType::Shim);
        assert_eq!(s.byte(Direction::South, Polarity::Slave), 0x00);
        assert_eq!(s.byte(Direction::South, Polarity::Master), 0x00);
        assert_eq!(s.host2aie_ports.len(), 2);
    }

    #[test]
    fn claim_and_release_are_idempotent() {
        let mut c = CoreConstraint::new(TileType::Compute);
        c.claim_port(Direction::North, Polarity::Slave, 0);
        c.claim_port(Direction::North, Polarity::Slave, 0);
        assert!(!c.port_available(Direction::North, Polarity::Slave, 0));
        c.release_port(Direction::North, Polarity::Slave, 0);
        c.release_port(Direction::North, Polarity::Slave, 0);
        assert!(c.port_available(Direction::North, Polarity::Slave, 0));
    }

    #[test]
    fn find_free_bd_claims_atomically() {
        let mut c = CoreConstraint::new(TileType::Compute);
        let first = c.find_free_bd().unwrap();
        assert_eq!(first, 0);
        let second = c.find_free_bd().unwrap();
        assert_eq!(second, 1);
        c.release_bd(first);
        assert_eq!(c.find_free_bd().unwrap(), 0);
    }

    #[test]
    fn memory_tile_bd_pool_is_48_bits() {
        let mut c = CoreConstraint::new(TileType::Memory);
        assert_eq!(c.free_bd_count(), 48);
        for _ in 0..48 {
            c.find_free_bd().unwrap();
        }
        assert_eq!(c.find_free_bd(), None);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Any sequence of claim/release calls on a single port leaves
            /// `free_bd_count` and the port masks consistent with "claimed
            /// is the opposite of released", regardless of how many
            /// redundant calls are interleaved (idempotency holds for any
            /// sequence length).
            #[test]
            fn claim_release_sequence_matches_final_action(actions in proptest::collection::vec(any::<bool>(), 1..32)) {
                let mut c = CoreConstraint::new(TileType::Compute);
                let mut last_claim = false;
                for claim in actions {
                    if claim {
                        c.claim_port(Direction::North, Polarity::Slave, 0);
                    } else {
                        c.release_port(Direction::North, Polarity::Slave, 0);
                    }
                    last_claim = claim;
                }
                prop_assert_eq!(c.port_available(Direction::North, Polarity::Slave, 0), !last_claim);
            }

            /// Claiming `n` distinct BDs then releasing them all returns
            /// the free count to its starting value, for any `n` up to the
            /// pool width.
            #[test]
            fn bd_claim_release_round_trips_free_count(n in 0usize..16) {
                let mut c = CoreConstraint::new(TileType::Compute);
                let start = c.free_bd_count();
                let mut claimed = alloc::vec::Vec::new();
                for _ in 0..n {
                    claimed.push(c.find_free_bd().unwrap());
                }
                prop_assert_eq!(c.free_bd_count(), start - n as u32);
                for bd in claimed {
                    c.release_bd(bd);
                }
                prop_assert_eq!(c.free_bd_count(), start);
            }
        }
    }

    #[test]
    fn grid_indexes_col_row() {
        let geometry = DeviceGeometry {
            num_cols: 8,
            num_rows: 6,
            shim_row: 0,
            mem_tile_row_start: 1,
            mem_tile_num_rows: 1,
            aie_tile_row_start: 2,
            aie_tile_num_rows: 4,
        };
        let grid = ConstraintsGrid::new(geometry).unwrap();
        assert_eq!(grid.get(TileLocation::new(0, 0)).tile_type, TileType::Shim);
        assert_eq!(grid.get(TileLocation::new(3, 3)).tile_type, TileType::Compute);
        assert_eq!(grid.iter_locations().count(), 48);
    }
}
