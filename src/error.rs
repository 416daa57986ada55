//! Error taxonomy for the routing engine.
//!
//! Every fallible public operation returns `Result<T, RouteError>`. There is
//! no panicking path for allocation or hardware failure; both surface as a
//! variant here, matching the teacher HAL's `AccelError` / `NicError` style
//! of small `Copy` error enums.

use core::fmt;

/// Opaque code returned by a `HardwareBackend`/`MemoryBackend` call that
/// failed. The engine does not interpret hardware error codes beyond
/// "non-OK"; the code is carried through for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HwErrorCode(pub u32);

/// Error kinds produced by the routing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteError {
    /// A caller-supplied argument is structurally invalid (bad geometry,
    /// out-of-range tile location, malformed constraints).
    InvalidArgs,
    /// The BFS planner found no admissible path between source and
    /// destination under the given blacklist/whitelist.
    NoPath,
    /// A hop along an otherwise-admissible path has no free port on one or
    /// both sides of the connection.
    NoAvailablePort,
    /// `Route` was called for a `(src, dst)` pair that already has a
    /// committed path in the source tile's routes database.
    AlreadyRouted,
    /// `DeRoute`/`MoveData`/`RouteDmaWait` referenced a `(src, dst)` pair
    /// with no committed path.
    NoRoute,
    /// No free buffer-descriptor slot remained on the requested tile.
    NoBD,
    /// A downstream hardware call returned a non-OK result.
    HardwareError(HwErrorCode),
    /// A host-side allocation (grid, routes arena, BD bookkeeping) failed.
    AllocationFailure,
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::InvalidArgs => write!(f, "invalid arguments"),
            RouteError::NoPath => write!(f, "no admissible path"),
            RouteError::NoAvailablePort => write!(f, "no available stream-switch port"),
            RouteError::AlreadyRouted => write!(f, "route already committed"),
            RouteError::NoRoute => write!(f, "no committed route"),
            RouteError::NoBD => write!(f, "no free buffer descriptor"),
            RouteError::HardwareError(code) => write!(f, "hardware error (code {})", code.0),
            RouteError::AllocationFailure => write!(f, "allocation failure"),
        }
    }
}

impl core::error::Error for RouteError {}
