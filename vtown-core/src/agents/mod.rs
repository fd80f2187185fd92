pub mod business;
pub mod household;
pub mod infrastructure;

pub use business::*;
pub use household::*;
pub use infrastructure::*;

use slotmap::SlotMap;

use crate::grid::SpatialGrid;
use crate::types::{AgentRef, InfrastructureId, InfrastructureType, Position};

/// Common capability of everything that lives on the grid.
///
/// Each kind declares the narrow slice of the world it may touch during its
/// step; the model builds that environment from disjoint borrows of its state.
pub trait Agent {
    type Env<'a>;

    fn step(&mut self, env: Self::Env<'_>);

    fn position(&self) -> Position;
}

// === ACCESS RADII ===

pub const ROAD_ACCESS_RADIUS: i32 = 2;
pub const MARKET_ACCESS_RADIUS: i32 = 3;
pub const UTILITY_ACCESS_RADIUS: i32 = 2;

/// Households within this Euclidean distance of the centre count as urban.
pub const URBAN_RADIUS: f64 = 10.0;

/// Which networked services reach a cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceAccess {
    pub road: bool,
    pub market: bool,
    pub utility: bool,
}

impl ServiceAccess {
    pub fn count(&self) -> usize {
        usize::from(self.road) + usize::from(self.market) + usize::from(self.utility)
    }
}

/// Read-only lookup of infrastructure around a position.
#[derive(Clone, Copy)]
pub struct InfrastructureView<'a> {
    pub grid: &'a SpatialGrid,
    pub units: &'a SlotMap<InfrastructureId, InfrastructureUnit>,
}

impl<'a> InfrastructureView<'a> {
    pub fn new(grid: &'a SpatialGrid, units: &'a SlotMap<InfrastructureId, InfrastructureUnit>) -> Self {
        Self { grid, units }
    }

    /// Units within Chebyshev `radius` of `pos`, own cell included.
    pub fn units_within(&self, pos: Position, radius: i32) -> impl Iterator<Item = &'a InfrastructureUnit> + 'a {
        let units = self.units;
        self.grid
            .neighbors(pos, radius, true)
            .into_iter()
            .filter_map(move |agent| match agent {
                AgentRef::Infrastructure(id) => units.get(id),
                _ => None,
            })
    }

    pub fn has_within(&self, pos: Position, kind: InfrastructureType, radius: i32) -> bool {
        self.units_within(pos, radius)
            .any(|unit| unit.infrastructure_type == kind)
    }

    /// Sum of quality-scaled bonuses of every unit within `radius`.
    pub fn bonus_within(&self, pos: Position, radius: i32) -> f64 {
        self.units_within(pos, radius)
            .map(|unit| unit.productivity_bonus())
            .sum()
    }

    pub fn access(&self, pos: Position) -> ServiceAccess {
        ServiceAccess {
            road: self.has_within(pos, InfrastructureType::Road, ROAD_ACCESS_RADIUS),
            market: self.has_within(pos, InfrastructureType::Market, MARKET_ACCESS_RADIUS),
            utility: self.has_within(pos, InfrastructureType::Utility, UTILITY_ACCESS_RADIUS),
        }
    }
}
