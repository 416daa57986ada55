//! Routing paths, routing steps, and the arena-backed routes database.
//!
//! Design note (spec.md §9): the routes database is modeled as a
//! contiguous arena (`Vec<Option<RoutingPath>>`) indexed by `RouteId`
//! rather than as a pointer-chased singly-linked list, for cache
//! locality. Each tile's `CoreConstraint::routes_db` holds the `RouteId`s
//! whose source is that tile (invariant #3); within a path, steps are an
//! owned `Vec<RoutingStep>` in path order rather than `next`-pointer-linked
//! nodes — the ordering is exactly equivalent, just addressed by index
//! instead of pointer.

extern crate alloc;
use alloc::vec::Vec;

use crate::geometry::{Direction, TileLocation};

/// A single switch-level fan-out at `source_tile`: packets arriving on
/// `(source_direction, source_port)` depart on `(dest_direction,
/// dest_port)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingStep {
    pub source_tile: TileLocation,
    pub source_port: u8,
    pub dest_port: u8,
    pub source_direction: Direction,
    pub dest_direction: Direction,
}

/// A committed end-to-end path: the ordered chain of switch-level hops
/// plus the endpoint DMA channel ports resolved at commit time.
#[derive(Debug, Clone)]
pub struct RoutingPath {
    pub source: TileLocation,
    pub destination: TileLocation,
    pub mm2s_port: u8,
    pub s2mm_port: u8,
    pub steps: Vec<RoutingStep>,
}

/// Opaque handle into a `RoutesDb` arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RouteId(u32);

/// Arena-backed routes database, shared across the whole grid. Each tile
/// only ever sees the subset of `RouteId`s it owns (its own
/// `routes_db` list), but lookups go through this single arena so that
/// erasing a route is an O(1) slot free rather than a list splice across
/// tiles.
#[derive(Debug, Clone, Default)]
pub struct RoutesDb {
    arena: Vec<Option<RoutingPath>>,
    free: Vec<u32>,
}

impl RoutesDb {
    pub fn new() -> Self {
        Self { arena: Vec::new(), free: Vec::new() }
    }

    /// Insert a new path, returning the id to record in the source tile's
    /// `routes_db` list.
    pub fn insert(&mut self, path: RoutingPath) -> RouteId {
        if let Some(slot) = self.free.pop() {
            self.arena[slot as usize] = Some(path);
            RouteId(slot)
        } else {
            self.arena.push(Some(path));
            RouteId((self.arena.len() - 1) as u32)
        }
    }

    pub fn get(&self, id: RouteId) -> Option<&RoutingPath> {
        self.arena.get(id.0 as usize).and_then(|slot| slot.as_ref())
    }

    pub fn get_mut(&mut self, id: RouteId) -> Option<&mut RoutingPath> {
        self.arena.get_mut(id.0 as usize).and_then(|slot| slot.as_mut())
    }

    /// Remove and return the path at `id`, freeing the slot for reuse.
    pub fn erase(&mut self, id: RouteId) -> Option<RoutingPath> {
        let slot = self.arena.get_mut(id.0 as usize)?;
        let path = slot.take()?;
        self.free.push(id.0);
        Some(path)
    }

    /// Find the id of the route matching `(source, destination)` among the
    /// candidate ids (normally a tile's own `routes_db` list, per
    /// invariant #3).
    pub fn find(&self, candidates: &[RouteId], source: TileLocation, destination: TileLocation) -> Option<RouteId> {
        candidates.iter().copied().find(|&id| {
            self.get(id)
                .map(|p| p.source == source && p.destination == destination)
                .unwrap_or(false)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_path(source: TileLocation, destination: TileLocation) -> RoutingPath {
        RoutingPath { source, destination, mm2s_port: 0, s2mm_port: 0, steps: Vec::new() }
    }

    #[test]
    fn insert_find_erase_roundtrip() {
        let mut db = RoutesDb::new();
        let a = TileLocation::new(2, 3);
        let b = TileLocation::new(4, 3);
        let id = db.insert(dummy_path(a, b));
        assert_eq!(db.find(&[id], a, b), Some(id));
        assert_eq!(db.find(&[id], a, TileLocation::new(5, 3)), None);
        assert!(db.erase(id).is_some());
        assert_eq!(db.get(id), None);
    }

    #[test]
    fn erased_slots_are_reused() {
        let mut db = RoutesDb::new();
        let a = TileLocation::new(0, 0);
        let b = TileLocation::new(1, 0);
        let id1 = db.insert(dummy_path(a, b));
        db.erase(id1);
        let id2 = db.insert(dummy_path(a, b));
        assert_eq!(id1, id2);
    }
}
