//! Port/channel matching: finding a single free port on one tile, or a
//! mutually-available port pair across two adjacent tiles.

use crate::constraints::CoreConstraint;
use crate::geometry::{Direction, Polarity, TileType};

/// Find the first free port for entering/leaving `tile` in `direction`.
///
/// - On shim tiles, when `direction` is the shim-external `South` alias,
///   this consults the host-edge port list instead of a mask byte:
///   `host2aie_ports` when `is_end_tile` is `false` (host → AIE, the route's
///   entry side), `aie2host_ports` when `true` (AIE → host, the route's
///   exit side).
/// - When `direction` is `Dma`, this consults `mm2s_state` (`is_end_tile ==
///   false`, the route's source) or `s2mm_state` (`is_end_tile == true`,
///   the route's destination).
/// - Otherwise it scans the tile's slave byte for `direction` — every
///   current call site uses this function to find the ingress-side port of
///   the tile it is committing, never the egress side (that is always
///   resolved via `first_matching_port` against the next tile).
pub fn first_free_port(tile: &CoreConstraint, direction: Direction, is_end_tile: bool) -> Option<u8> {
    if matches!(tile.tile_type, TileType::Shim) && matches!(direction, Direction::South) {
        let list = if is_end_tile { &tile.aie2host_ports } else { &tile.host2aie_ports };
        return list.iter().find(|p| p.available).map(|p| p.port);
    }
    match direction {
        Direction::Dma => {
            if is_end_tile {
                tile.lowest_free_s2mm()
            } else {
                tile.lowest_free_mm2s()
            }
        }
        cardinal => tile.lowest_free_port(cardinal, Polarity::Slave),
    }
}

/// Find the first port index available on both sides of a directed hop:
/// `src_tile`'s master byte for `direction`, intersected with `dst_tile`'s
/// slave byte for the mirrored direction.
pub fn first_matching_port(src_tile: &CoreConstraint, dst_tile: &CoreConstraint, direction: Direction) -> Option<u8> {
    let src_master = src_tile.byte_master(direction);
    let dst_slave = dst_tile.byte_slave(direction.opposite());
    let common = src_master & dst_slave;
    if common == 0 {
        None
    } else {
        Some(common.trailing_zeros() as u8)
    }
}
