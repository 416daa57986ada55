#![no_std]
//! `aie_route`: automatic stream-routing and data-movement engine for
//! spatial AI-engine accelerators.
//!
//! The engine owns the grid's resource-constraint state and routes
//! database; it drives the platform through the `HardwareBackend` and
//! `MemoryBackend` traits and never touches hardware directly. Callers
//! supply both when constructing a `RoutingInstance`.

#[cfg(test)]
extern crate std;
extern crate alloc;
use alloc::boxed::Box;
use alloc::vec::Vec;

pub mod backend;
pub mod committer;
pub mod constraints;
pub mod deroute;
pub mod dma;
pub mod dump;
pub mod error;
pub mod geometry;
pub mod planner;
pub mod ports;
pub mod reset;
pub mod routes_db;

pub use backend::{BackendKind, ChannelKind, DmaDescriptor, HardwareBackend, MemKind, MemoryBackend};
pub use constraints::{default_aie2host_ports, default_host2aie_ports, ConstraintsGrid, CoreConstraint, HostEdgePort};
pub use dma::DataObject;
pub use dump::SwitchInfo;
pub use error::RouteError;
pub use geometry::{DeviceGeometry, Direction, Polarity, TileLocation, TileType};
pub use planner::RouteConstraints;
pub use routes_db::{RouteId, RoutingPath, RoutingStep, RoutesDb};

/// A live routing engine instance bound to one device's geometry and
/// platform back-ends (`InitRoutingHandler` / `RoutingInstance_free` in
/// spec.md §6, collapsed into ordinary construction/`Drop`).
pub struct RoutingInstance {
    grid: ConstraintsGrid,
    routes_db: RoutesDb,
    hw: Box<dyn HardwareBackend>,
    mem: Box<dyn MemoryBackend>,
}

impl RoutingInstance {
    /// Build a fresh instance over `geometry`, loading the per-tile-type
    /// initial port/BD masks (spec.md §4.1).
    pub fn new(
        geometry: DeviceGeometry,
        hw: Box<dyn HardwareBackend>,
        mem: Box<dyn MemoryBackend>,
    ) -> Result<Self, RouteError> {
        let grid = ConstraintsGrid::new(geometry)?;
        log::info!("routing instance initialized: {}x{} tiles", geometry.num_cols, geometry.num_rows);
        Ok(Self { grid, routes_db: RoutesDb::new(), hw, mem })
    }

    fn find_route_id(&self, source: TileLocation, destination: TileLocation) -> Option<RouteId> {
        self.routes_db.find(&self.grid.get(source).routes_db, source, destination)
    }

    /// Plan and commit a route from `source` to `destination`
    /// (`Route`, spec.md §6). Returns `RouteError::AlreadyRouted` if a
    /// route between this exact pair is already committed.
    pub fn route(
        &mut self,
        source: TileLocation,
        destination: TileLocation,
        constraints: &RouteConstraints,
    ) -> Result<(), RouteError> {
        if self.find_route_id(source, destination).is_some() {
            return Err(RouteError::AlreadyRouted);
        }

        let path = planner::plan_route(&self.grid, source, destination, constraints)?;
        if path.is_empty() {
            log::debug!("route: source == destination ({:?}), no-op", source);
            return Ok(());
        }

        let committed = committer::commit_route(&mut self.grid, self.hw.as_mut(), &path)?;
        let id = self.routes_db.insert(committed);
        self.grid.get_mut(source).routes_db.push(id);
        log::info!("route committed: {:?} -> {:?} over {} hop(s)", source, destination, path.len() - 1);
        Ok(())
    }

    /// Tear down a previously committed route (`DeRoute`, spec.md §6).
    pub fn deroute(
        &mut self,
        source: TileLocation,
        destination: TileLocation,
        modify_core_config: bool,
    ) -> Result<(), RouteError> {
        deroute::deroute(&mut self.grid, &mut self.routes_db, self.hw.as_mut(), source, destination, modify_core_config)?;
        log::info!("route torn down: {:?} -> {:?}", source, destination);
        Ok(())
    }

    /// Move `size` bytes over the committed route from `source` to
    /// `destination` (`MoveData`, spec.md §6).
    #[allow(clippy::too_many_arguments)]
    pub fn move_data(
        &mut self,
        source: TileLocation,
        destination: TileLocation,
        src_obj: DataObject,
        size: usize,
        dst_obj: DataObject,
    ) -> Result<(), RouteError> {
        let id = self.find_route_id(source, destination).ok_or(RouteError::NoRoute)?;
        let path = self.routes_db.get(id).ok_or(RouteError::NoRoute)?.clone();
        dma::move_data(&mut self.grid, self.hw.as_mut(), self.mem.as_mut(), &path, source, src_obj, size, dst_obj, destination)
    }

    /// Block until the route's outstanding DMA transfer completes
    /// (`RouteDmaWait`, spec.md §6), without issuing a new transfer.
    pub fn route_dma_wait(&mut self, source: TileLocation, destination: TileLocation, is_s2mm: bool) -> Result<(), RouteError> {
        let id = self.find_route_id(source, destination).ok_or(RouteError::NoRoute)?;
        let path = self.routes_db.get(id).ok_or(RouteError::NoRoute)?.clone();
        dma::route_dma_wait(self.hw.as_mut(), &self.grid, &path, is_s2mm)
    }

    /// Enable hardware execution on every tile previously marked via
    /// `set_core_execute`, up to `count` of them in grid order (`Run`,
    /// spec.md §6 — the table gives this operation `instance, count` as its
    /// inputs, not a single tile, so it is modeled as a bounded sweep over
    /// whichever cores the caller has already flagged as wanting to run
    /// rather than a single-tile enable).
    pub fn run(&mut self, count: u32) -> Result<(), RouteError> {
        let mut started = 0u32;
        for loc in self.grid.iter_locations() {
            if started >= count {
                break;
            }
            if self.grid.get(loc).core_executing {
                self.hw.core_enable(loc)?;
                started += 1;
            }
        }
        Ok(())
    }

    /// Block until `tile`'s compute core signals completion, then clear
    /// its executing flag (`CoreWait`, spec.md §6).
    pub fn core_wait(&mut self, tile: TileLocation) -> Result<(), RouteError> {
        self.hw.core_wait_for_done(tile)?;
        self.grid.get_mut(tile).core_executing = false;
        Ok(())
    }

    /// Set or clear `tile`'s `core_executing` bookkeeping flag without
    /// touching hardware (`SetCoreExecute`, spec.md §6). Flags a tile as a
    /// candidate the next `run` sweep should enable; also usable to
    /// reconcile state when a caller drives the core directly without going
    /// through `run`.
    pub fn set_core_execute(&mut self, tile: TileLocation, executing: bool) {
        self.grid.get_mut(tile).core_executing = executing;
    }

    /// Replace `tile`'s host-edge port/channel mapping
    /// (`ConfigHostEdgeConstraints`, spec.md §6). `tile` must be a shim
    /// tile. Takes ownership of both lists (spec.md §9 open question #5).
    pub fn config_host_edge_constraints(
        &mut self,
        tile: TileLocation,
        host2aie: Vec<HostEdgePort>,
        aie2host: Vec<HostEdgePort>,
    ) -> Result<(), RouteError> {
        if !matches!(self.grid.get(tile).tile_type, TileType::Shim) {
            return Err(RouteError::InvalidArgs);
        }
        let t = self.grid.get_mut(tile);
        t.host2aie_ports = host2aie;
        t.aie2host_ports = aie2host;
        Ok(())
    }

    /// Restore `tile`'s host-edge port/channel mapping to the default
    /// table (`ResetHostEdgeConstraints`, spec.md §6).
    pub fn reset_host_edge_constraints(&mut self, tile: TileLocation) -> Result<(), RouteError> {
        if !matches!(self.grid.get(tile).tile_type, TileType::Shim) {
            return Err(RouteError::InvalidArgs);
        }
        let t = self.grid.get_mut(tile);
        t.host2aie_ports = default_host2aie_ports();
        t.aie2host_ports = default_aie2host_ports();
        Ok(())
    }

    /// Sweep every tile this engine never auto-configured and disable
    /// whatever connections it still shows in use (`RoutingSwitchReset`,
    /// spec.md §6).
    pub fn routing_switch_reset(&mut self) {
        reset::routing_switch_reset(&self.grid, self.hw.as_mut());
    }

    /// Inspect the committed path between `source` and `destination`
    /// (`RoutesReveal`, spec.md §6).
    pub fn routes_reveal(&self, source: TileLocation, destination: TileLocation) -> Option<&RoutingPath> {
        let id = self.find_route_id(source, destination)?;
        dump::routes_reveal(&self.routes_db, id)
    }

    /// Snapshot one tile's stream-switch port availability
    /// (`DumpRoutingSwitchInfo`, spec.md §6).
    pub fn dump_routing_switch_info(&self, tile: TileLocation) -> SwitchInfo {
        dump::dump_routing_switch_info(&self.grid, tile)
    }

    /// Snapshot every tile's stream-switch port availability
    /// (`dumpConstraints`, spec.md §6).
    pub fn dump_constraints(&self) -> Vec<(TileLocation, SwitchInfo)> {
        dump::dump_constraints(&self.grid)
    }

    /// The device geometry this instance was built with.
    pub fn geometry(&self) -> &DeviceGeometry {
        self.grid.geometry()
    }

    /// Stage `data` into device memory at `addr`, ahead of a `move_data`
    /// call. A thin pass-through to the memory back-end so callers don't
    /// need to hold their own handle to it.
    pub fn block_write(&mut self, kind: MemKind, addr: u64, data: &[u8]) -> Result<(), RouteError> {
        self.mem.block_write(kind, addr, data)
    }

    /// Read `out.len()` bytes of device memory at `addr`.
    pub fn block_read(&mut self, kind: MemKind, addr: u64, out: &mut [u8]) -> Result<(), RouteError> {
        self.mem.block_read(kind, addr, out)
    }
}
