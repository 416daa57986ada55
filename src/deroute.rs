//! `DeRoute`: locate a committed path, disable its switch connections, and
//! restore the port/BD state the committer claimed (spec.md §4.7).

use crate::backend::HardwareBackend;
use crate::constraints::ConstraintsGrid;
use crate::error::RouteError;
use crate::geometry::{Direction, Polarity, TileLocation, TileType};
use crate::routes_db::RoutesDb;

fn is_shim(grid: &ConstraintsGrid, loc: TileLocation) -> bool {
    matches!(grid.get(loc).tile_type, TileType::Shim)
}

/// Tear down the route from `source` to `destination`, releasing every
/// port and BD bit the committer claimed for it. Clears `core_executing` on
/// `destination` when `modify_core_config` is set and `destination` is a
/// compute tile — the committer never sets `core_executing`; only
/// `SetCoreExecute` does, so this only ever undoes that caller's own prior
/// call.
pub fn deroute(
    grid: &mut ConstraintsGrid,
    routes_db: &mut RoutesDb,
    backend: &mut dyn HardwareBackend,
    source: TileLocation,
    destination: TileLocation,
    modify_core_config: bool,
) -> Result<(), RouteError> {
    let candidates = grid.get(source).routes_db.clone();
    let route_id = routes_db.find(&candidates, source, destination).ok_or(RouteError::NoRoute)?;
    let path = routes_db.get(route_id).ok_or(RouteError::NoRoute)?.clone();

    let last = path.steps.len().saturating_sub(1);
    for (i, step) in path.steps.iter().enumerate() {
        backend.stream_connect_disable(
            step.source_tile,
            step.source_direction,
            step.source_port,
            step.dest_direction,
            step.dest_port,
        )?;

        let shim_entry = i == 0 && is_shim(grid, step.source_tile);
        let shim_exit = i == last && is_shim(grid, step.source_tile);
        let tile = grid.get_mut(step.source_tile);

        match step.source_direction {
            Direction::Dma => tile.release_mm2s(step.source_port),
            Direction::South if shim_entry => {
                if let Some(entry) = tile.host2aie_ports.iter_mut().find(|p| p.port == step.source_port) {
                    entry.available = true;
                }
            }
            cardinal => tile.release_port(cardinal, Polarity::Slave, step.source_port),
        }
        match step.dest_direction {
            Direction::Dma => tile.release_s2mm(step.dest_port),
            Direction::South if shim_exit => {
                if let Some(entry) = tile.aie2host_ports.iter_mut().find(|p| p.port == step.dest_port) {
                    entry.available = true;
                }
            }
            cardinal => tile.release_port(cardinal, Polarity::Master, step.dest_port),
        }
        tile.auto_configured = false;
    }

    grid.get_mut(source).routes_db.retain(|&id| id != route_id);
    routes_db.erase(route_id);

    if modify_core_config && matches!(grid.get(destination).tile_type, TileType::Compute) {
        grid.get_mut(destination).core_executing = false;
    }

    Ok(())
}
