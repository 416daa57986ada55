//! Breadth-first shortest-path planner over the constraints grid.

extern crate alloc;
use alloc::collections::{BTreeMap, BTreeSet, VecDeque};
use alloc::vec::Vec;

use crate::constraints::ConstraintsGrid;
use crate::error::RouteError;
use crate::geometry::{Direction, TileLocation};

/// Optional constraints narrowing the set of admissible paths.
#[derive(Debug, Clone, Default)]
pub struct RouteConstraints {
    pub blacklist: BTreeSet<TileLocation>,
    pub whitelist: BTreeSet<TileLocation>,
}

impl RouteConstraints {
    pub fn none() -> Self {
        Self::default()
    }
}

const NEIGHBOR_ORDER: [Direction; 4] = [Direction::North, Direction::South, Direction::East, Direction::West];

/// Find the shortest admissible path from `source` to `destination`.
///
/// `source == destination` short-circuits to an empty path (len 0) without
/// touching the grid at all — this is a deliberate no-op per spec.md §4.4 /
/// §8 (an open question on whether that is the intended behavior; the
/// current engine preserves it).
///
/// Whitelist semantics follow the concrete algorithm in spec.md §4.4
/// ("reject the reconstructed path unless every non-source tile along it
/// belongs to the whitelist") rather than §3's looser prose ("must contain
/// every whitelist tile"): a non-empty whitelist is treated as an
/// allowed-set that every tile but the source must belong to. This is
/// implemented as traversal-time pruning rather than
/// generate-then-reject — the two are behaviorally equivalent here, since
/// a tile excluded from the whitelist can never appear on *any* admissible
/// path, so pruning it up front changes no outcome while avoiding wasted
/// reconstruction work.
pub fn plan_route(
    grid: &ConstraintsGrid,
    source: TileLocation,
    destination: TileLocation,
    constraints: &RouteConstraints,
) -> Result<Vec<TileLocation>, RouteError> {
    if source == destination {
        return Ok(Vec::new());
    }

    let geometry = *grid.geometry();
    if !geometry.contains(source) || !geometry.contains(destination) {
        return Err(RouteError::InvalidArgs);
    }

    let mut visited: BTreeSet<TileLocation> = BTreeSet::new();
    let mut pred: BTreeMap<TileLocation, TileLocation> = BTreeMap::new();
    let mut queue: VecDeque<TileLocation> = VecDeque::new();

    visited.insert(source);
    queue.push_back(source);

    while let Some(current) = queue.pop_front() {
        if current == destination {
            return Ok(reconstruct(&pred, source, destination));
        }

        for &dir in NEIGHBOR_ORDER.iter() {
            let Some(adj) = geometry.neighbor(current, dir) else { continue };
            if visited.contains(&adj) {
                continue;
            }
            if constraints.blacklist.contains(&adj) {
                continue;
            }
            if !constraints.whitelist.is_empty() && !constraints.whitelist.contains(&adj) {
                continue;
            }
            let current_tile = grid.get(current);
            let adj_tile = grid.get(adj);
            // Precheck per spec.md §4.4 point 3: intersect current's slave
            // byte for `dir` with the neighbor's master byte for the
            // opposite direction.
            if current_tile.byte_slave(dir) & adj_tile.byte_master(dir.opposite()) == 0 {
                continue;
            }
            visited.insert(adj);
            pred.insert(adj, current);
            queue.push_back(adj);
        }
    }

    Err(RouteError::NoPath)
}

fn reconstruct(
    pred: &BTreeMap<TileLocation, TileLocation>,
    source: TileLocation,
    destination: TileLocation,
) -> Vec<TileLocation> {
    let mut path = Vec::new();
    let mut cur = destination;
    path.push(cur);
    while cur != source {
        cur = pred[&cur];
        path.push(cur);
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::DeviceGeometry;

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
    fn same_source_and_destination_is_empty_path() {
        let grid = ConstraintsGrid::new(geom()).unwrap();
        let t = TileLocation::new(2, 3);
        let path = plan_route(&grid, t, t, &RouteConstraints::none()).unwrap();
        assert!(path.is_empty());
    }

    #[test]
    fn east_west_shortest_path_in_compute_row() {
        let grid = ConstraintsGrid::new(geom()).unwrap();
        let src = TileLocation::new(2, 3);
        let dst = TileLocation::new(4, 3);
        let path = plan_route(&grid, src, dst, &RouteConstraints::none()).unwrap();
        assert_eq!(path, alloc::vec![
            TileLocation::new(2, 3),
            TileLocation::new(3, 3),
            TileLocation::new(4, 3),
        ]);
    }

    #[test]
    fn memory_row_blocks_east_west_hops() {
        // A path confined to row 1 (memory) cannot move east/west; the
        // planner must detour through a compute or shim row instead.
        let grid = ConstraintsGrid::new(geom()).unwrap();
        let src = TileLocation::new(2, 1);
        let dst = TileLocation::new(4, 1);
        let path = plan_route(&grid, src, dst, &RouteConstraints::none()).unwrap();
        // Every intermediate hop that changes column must happen off row 1.
        for loc in &path {
            if loc.col != src.col && *loc != src && *loc != dst {
                assert_ne!(loc.row, 1);
            }
        }
    }

    #[test]
    fn blacklist_is_avoided() {
        let grid = ConstraintsGrid::new(geom()).unwrap();
        let src = TileLocation::new(2, 3);
        let dst = TileLocation::new(4, 3);
        let mut constraints = RouteConstraints::none();
        constraints.blacklist.insert(TileLocation::new(3, 3));
        let path = plan_route(&grid, src, dst, &constraints).unwrap();
        assert!(!path.contains(&TileLocation::new(3, 3)));
    }

    #[test]
    fn whitelist_restricts_to_allowed_tiles() {
        let grid = ConstraintsGrid::new(geom()).unwrap();
        let src = TileLocation::new(2, 3);
        let dst = TileLocation::new(4, 3);
        let mut constraints = RouteConstraints::none();
        constraints.whitelist.insert(TileLocation::new(3, 3));
        constraints.whitelist.insert(dst);
        let path = plan_route(&grid, src, dst, &constraints).unwrap();
        for loc in path.iter().skip(1) {
            assert!(constraints.whitelist.contains(loc));
        }
    }

    #[test]
    fn whitelist_without_destination_yields_no_path() {
        let grid = ConstraintsGrid::new(geom()).unwrap();
        let src = TileLocation::new(2, 3);
        let dst = TileLocation::new(4, 3);
        let mut constraints = RouteConstraints::none();
        constraints.whitelist.insert(TileLocation::new(3, 3));
        assert_eq!(plan_route(&grid, src, dst, &constraints), Err(RouteError::NoPath));
    }
}
