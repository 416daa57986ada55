//! Route committer: walks a planned path and allocates/enables one
//! stream-switch connection per tile (spec.md §4.5).

extern crate alloc;
use alloc::vec::Vec;

use crate::backend::HardwareBackend;
use crate::constraints::ConstraintsGrid;
use crate::error::RouteError;
use crate::geometry::{Direction, Polarity, TileLocation, TileType};
use crate::ports::{first_free_port, first_matching_port};
use crate::routes_db::{RoutingPath, RoutingStep};

fn direction_between(grid: &ConstraintsGrid, from: TileLocation, to: TileLocation) -> Direction {
    let geometry = grid.geometry();
    for dir in [Direction::North, Direction::South, Direction::East, Direction::West] {
        if geometry.neighbor(from, dir) == Some(to) {
            return dir;
        }
    }
    unreachable!("path hops must be grid-adjacent")
}

fn is_shim(grid: &ConstraintsGrid, loc: TileLocation) -> bool {
    matches!(grid.get(loc).tile_type, TileType::Shim)
}

/// Commit `path` (as produced by `plan_route`) against `grid`, issuing the
/// hardware-enable calls in hop order and recording the resulting
/// `RoutingPath`. On failure, the route attempt aborts immediately;
/// ports claimed on earlier hops of the *same* attempt are **not** rolled
/// back (spec.md §9 open question #1 — this preserves the upstream
/// driver's behavior rather than adding rollback).
pub fn commit_route(
    grid: &mut ConstraintsGrid,
    backend: &mut dyn HardwareBackend,
    path: &[TileLocation],
) -> Result<RoutingPath, RouteError> {
    debug_assert!(path.len() >= 2, "commit_route requires at least a 2-tile path");

    let source = path[0];
    let destination = path[path.len() - 1];
    let mut steps = Vec::with_capacity(path.len());

    let mut last_dir = Direction::Dma;
    let mut last_port = 0u8;
    let mut mm2s_port = 0u8;

    for i in 0..path.len() {
        let tile = path[i];
        if i < path.len() - 1 {
            let fwd_dir = direction_between(grid, tile, path[i + 1]);
            let shim_entry = is_shim(grid, tile);
            let slave_dir = if i == 0 {
                if shim_entry { Direction::South } else { Direction::Dma }
            } else {
                last_dir.opposite()
            };
            let master_dir = fwd_dir;

            let source_port = if i == 0 {
                first_free_port(grid.get(tile), slave_dir, false).ok_or(RouteError::NoAvailablePort)?
            } else {
                last_port
            };
            let dest_port = {
                let (cur, next) = grid.get_two_mut(tile, path[i + 1]);
                first_matching_port(cur, next, fwd_dir).ok_or(RouteError::NoAvailablePort)?
            };

            backend.stream_connect_enable(tile, slave_dir, source_port, master_dir, dest_port)?;

            let cur = grid.get_mut(tile);
            match slave_dir {
                Direction::Dma => cur.claim_mm2s(source_port),
                // Shim-external alias: tracked via host2aie_ports below, not
                // a cardinal mask bit.
                Direction::South if shim_entry && i == 0 => {}
                cardinal => cur.claim_port(cardinal, Polarity::Slave, source_port),
            }
            cur.claim_port(master_dir, Polarity::Master, dest_port);

            if shim_entry && i == 0 {
                backend.enable_shim_dma_to_aie(tile, source_port)?;
                if let Some(entry) = cur.host2aie_ports.iter_mut().find(|p| p.port == source_port) {
                    entry.available = false;
                }
            }

            if i == 0 {
                mm2s_port = source_port;
            }

            steps.push(RoutingStep {
                source_tile: tile,
                source_port,
                dest_port,
                source_direction: slave_dir,
                dest_direction: master_dir,
            });

            last_dir = master_dir;
            last_port = dest_port;
        } else {
            let shim_exit = is_shim(grid, tile);
            let dest_dir = if shim_exit { Direction::South } else { Direction::Dma };
            let dest_port = first_free_port(grid.get(tile), dest_dir, true).ok_or(RouteError::NoAvailablePort)?;
            let slave_dir = last_dir.opposite();

            backend.stream_connect_enable(tile, slave_dir, last_port, dest_dir, dest_port)?;

            let cur = grid.get_mut(tile);
            cur.claim_port(slave_dir, Polarity::Slave, last_port);
            if matches!(dest_dir, Direction::Dma) {
                cur.claim_s2mm(dest_port);
            }

            if shim_exit {
                backend.enable_aie_to_shim_dma(tile, dest_port)?;
                if let Some(entry) = cur.aie2host_ports.iter_mut().find(|p| p.port == dest_port) {
                    entry.available = false;
                }
            }

            steps.push(RoutingStep {
                source_tile: tile,
                source_port: last_port,
                dest_port,
                source_direction: slave_dir,
                dest_direction: dest_dir,
            });

            let path_out = RoutingPath { source, destination, mm2s_port, s2mm_port: dest_port, steps };

            for loc in path.iter() {
                grid.get_mut(*loc).auto_configured = true;
            }

            return Ok(path_out);
        }
    }

    unreachable!("loop always returns on the terminal tile");
}
