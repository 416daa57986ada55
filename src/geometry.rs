//! Device geometry, tile locations, tile types, and cardinal directions.

use crate::error::RouteError;

/// `(col, row)` location of a tile in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileLocation {
    pub col: u8,
    pub row: u8,
}

impl TileLocation {
    pub const fn new(col: u8, row: u8) -> Self {
        Self { col, row }
    }
}

/// Tile type, derived from the row band a tile falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileType {
    Shim,
    Memory,
    Compute,
}

/// Cardinal grid directions plus the endpoint-local `Dma` pseudo-direction.
///
/// `South` doubles as the shim-external ("toward host") direction on shim
/// tiles; it never denotes a real grid hop there, since row 0 has no row
/// south of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    North,
    South,
    East,
    West,
    Dma,
}

impl Direction {
    /// The opposite cardinal direction. Panics (in debug) if called on `Dma`,
    /// which has no opposite — callers must not invoke this on it.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::Dma => unreachable!("Dma has no opposite direction"),
        }
    }

    /// Index into the four-element `[N, S, E, W]` byte arrays used by
    /// `CoreConstraint`. Panics on `Dma`, which is stored separately.
    pub fn idx(self) -> usize {
        match self {
            Direction::North => 0,
            Direction::South => 1,
            Direction::East => 2,
            Direction::West => 3,
            Direction::Dma => unreachable!("Dma has no cardinal index"),
        }
    }

    /// The column/row delta applied when stepping one tile in this
    /// direction. `Dma` has no spatial meaning and is not handled here.
    fn delta(self) -> (i16, i16) {
        match self {
            Direction::North => (0, 1),
            Direction::South => (0, -1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
            Direction::Dma => unreachable!("Dma has no spatial delta"),
        }
    }
}

/// Polarity of a stream-switch port: ingress (`Slave`) or egress (`Master`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Slave,
    Master,
}

/// Static description of the accelerator grid's row bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceGeometry {
    pub num_cols: u8,
    pub num_rows: u8,
    pub shim_row: u8,
    pub mem_tile_row_start: u8,
    pub mem_tile_num_rows: u8,
    pub aie_tile_row_start: u8,
    pub aie_tile_num_rows: u8,
}

impl DeviceGeometry {
    /// Validate that the row bands are contiguous and fit within
    /// `num_rows`. Mirrors the initialization-time geometry assertion in the
    /// upstream driver.
    pub fn validate(&self) -> Result<(), RouteError> {
        if self.num_cols == 0 || self.num_rows == 0 {
            return Err(RouteError::InvalidArgs);
        }
        if self.shim_row != 0 {
            return Err(RouteError::InvalidArgs);
        }
        let mem_start = self.shim_row as u16 + 1;
        if mem_start != self.mem_tile_row_start as u16 {
            return Err(RouteError::InvalidArgs);
        }
        let aie_start = mem_start + self.mem_tile_num_rows as u16;
        if aie_start != self.aie_tile_row_start as u16 {
            return Err(RouteError::InvalidArgs);
        }
        let total_rows = aie_start + self.aie_tile_num_rows as u16;
        if total_rows != self.num_rows as u16 {
            return Err(RouteError::InvalidArgs);
        }
        Ok(())
    }

    /// Determine the tile type of `loc` from its row band.
    pub fn tile_type(&self, loc: TileLocation) -> TileType {
        if loc.row == self.shim_row {
            TileType::Shim
        } else if loc.row >= self.mem_tile_row_start
            && loc.row < self.mem_tile_row_start + self.mem_tile_num_rows
        {
            TileType::Memory
        } else {
            TileType::Compute
        }
    }

    /// Whether `loc` falls within the grid bounds.
    pub fn contains(&self, loc: TileLocation) -> bool {
        loc.col < self.num_cols && loc.row < self.num_rows
    }

    /// The neighboring tile one step from `loc` in `direction`, or `None`
    /// if that neighbor would fall outside the grid. `direction` must be a
    /// cardinal direction (not `Dma`).
    pub fn neighbor(&self, loc: TileLocation, direction: Direction) -> Option<TileLocation> {
        let (dc, dr) = direction.delta();
        let col = loc.col as i16 + dc;
        let row = loc.row as i16 + dr;
        if col < 0 || row < 0 {
            return None;
        }
        let next = TileLocation::new(col as u8, row as u8);
        if self.contains(next) {
            Some(next)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn tile_type_bands() {
        let g = geom();
        assert_eq!(g.tile_type(TileLocation::new(0, 0)), TileType::Shim);
        assert_eq!(g.tile_type(TileLocation::new(0, 1)), TileType::Memory);
        assert_eq!(g.tile_type(TileLocation::new(0, 3)), TileType::Compute);
    }

    #[test]
    fn rejects_gap_in_bands() {
        let mut g = geom();
        g.aie_tile_row_start = 3; // leaves a gap at row 2
        assert_eq!(g.validate(), Err(RouteError::InvalidArgs));
    }

    #[test]
    fn neighbor_respects_bounds() {
        let g = geom();
        assert_eq!(g.neighbor(TileLocation::new(0, 0), Direction::South), None);
        assert_eq!(
            g.neighbor(TileLocation::new(0, 0), Direction::North),
            Some(TileLocation::new(0, 1))
        );
        assert_eq!(g.neighbor(TileLocation::new(7, 0), Direction::East), None);
    }

    #[test]
    fn opposite_is_involutive() {
        for d in [Direction::North, Direction::South, Direction::East, Direction::West] {
            assert_eq!(d.opposite().opposite(), d);
        }
    }
}
