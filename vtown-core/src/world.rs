// World state for the town development simulation

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use slotmap::SlotMap;

use crate::agents::{
    Agent, BusinessEnv, BusinessUnit, HouseholdEnv, HouseholdUnit, InfrastructureEnv,
    InfrastructureUnit, InfrastructureView, URBAN_RADIUS,
};
use crate::config::SimConfig;
use crate::grid::SpatialGrid;
use crate::types::{
    AgentRef, BusinessId, HouseholdId, InfrastructureId, InfrastructureType, Position, Sector,
    euclidean,
};

/// Cells already holding this many facilities accept no more.
pub const MAX_INFRASTRUCTURE_PER_CELL: usize = 2;

/// Complete agent state of one model run
#[derive(Debug, Clone)]
pub struct World {
    pub tick: u64,
    pub grid: SpatialGrid,

    pub households: SlotMap<HouseholdId, HouseholdUnit>,
    pub businesses: SlotMap<BusinessId, BusinessUnit>,
    pub infrastructure: SlotMap<InfrastructureId, InfrastructureUnit>,

    /// Households served per facility type, summed over units at the end of the last tick.
    pub coverage: BTreeMap<InfrastructureType, usize>,
}

impl World {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            tick: 0,
            grid: SpatialGrid::new(width, height),
            households: SlotMap::with_key(),
            businesses: SlotMap::with_key(),
            infrastructure: SlotMap::with_key(),
            coverage: InfrastructureType::ALL.iter().map(|t| (*t, 0)).collect(),
        }
    }

    pub fn center(&self) -> Position {
        self.grid.center()
    }

    pub fn infrastructure_view(&self) -> InfrastructureView<'_> {
        InfrastructureView::new(&self.grid, &self.infrastructure)
    }

    // === Agent Management ===

    /// Add a household at a (clamped) position, returns its ID
    pub fn add_household(
        &mut self,
        pos: Position,
        make: impl FnOnce(HouseholdId, Position) -> HouseholdUnit,
    ) -> HouseholdId {
        let pos = self.grid.clamp(pos);
        let id = self.households.insert_with_key(|id| make(id, pos));
        self.grid.place(AgentRef::Household(id), pos);
        id
    }

    /// Add a business at a (clamped) position, returns its ID
    pub fn add_business(
        &mut self,
        pos: Position,
        make: impl FnOnce(BusinessId, Position) -> BusinessUnit,
    ) -> BusinessId {
        let pos = self.grid.clamp(pos);
        let id = self.businesses.insert_with_key(|id| make(id, pos));
        self.grid.place(AgentRef::Business(id), pos);
        id
    }

    /// Place a facility without the per-cell limit. Used for the seed network.
    pub fn place_infrastructure(&mut self, pos: Position, kind: InfrastructureType) -> InfrastructureId {
        let pos = self.grid.clamp(pos);
        let id = self
            .infrastructure
            .insert_with_key(|id| InfrastructureUnit::new(id, pos, kind));
        self.grid.place(AgentRef::Infrastructure(id), pos);
        id
    }

    /// Build a facility unless the cell is saturated or off the grid.
    pub fn add_infrastructure(&mut self, pos: Position, kind: InfrastructureType) -> Option<InfrastructureId> {
        if !self.grid.in_bounds(pos) || self.is_saturated(pos) {
            return None;
        }
        Some(self.place_infrastructure(pos, kind))
    }

    pub fn is_saturated(&self, pos: Position) -> bool {
        self.grid.infrastructure_count(pos) >= MAX_INFRASTRUCTURE_PER_CELL
    }

    /// Every live agent, households first, then businesses, then facilities.
    pub fn agent_refs(&self) -> Vec<AgentRef> {
        self.households
            .keys()
            .map(AgentRef::Household)
            .chain(self.businesses.keys().map(AgentRef::Business))
            .chain(self.infrastructure.keys().map(AgentRef::Infrastructure))
            .collect()
    }

    /// Step one agent with an environment carved out of the world's fields.
    pub fn step_agent(&mut self, agent: AgentRef, config: &SimConfig, rng: &mut StdRng) {
        tracing::trace!(tick = self.tick, kind = agent.kind(), id = agent.as_u64(), "agent step");
        match agent {
            AgentRef::Household(id) => {
                let Some(household) = self.households.get_mut(id) else {
                    return;
                };
                household.step(HouseholdEnv {
                    grid: &mut self.grid,
                    infrastructure: &self.infrastructure,
                    config,
                    rng,
                    tick: self.tick,
                });
            }
            AgentRef::Business(id) => {
                let Some(business) = self.businesses.get_mut(id) else {
                    return;
                };
                business.step(BusinessEnv {
                    grid: &self.grid,
                    households: &self.households,
                    infrastructure: &self.infrastructure,
                    rng,
                });
            }
            AgentRef::Infrastructure(id) => {
                let Some(unit) = self.infrastructure.get_mut(id) else {
                    return;
                };
                unit.step(InfrastructureEnv { grid: &self.grid });
            }
        }
    }

    /// Recompute per-type coverage from each unit's reported served count.
    pub fn aggregate_coverage(&mut self) {
        let mut coverage: BTreeMap<InfrastructureType, usize> =
            InfrastructureType::ALL.iter().map(|t| (*t, 0)).collect();
        for unit in self.infrastructure.values() {
            *coverage.entry(unit.infrastructure_type).or_default() += unit.served_households;
        }
        self.coverage = coverage;
    }

    // === Queries ===

    pub fn population(&self) -> usize {
        self.households.len()
    }

    pub fn count_by_sector(&self, sector: Sector) -> usize {
        self.households.values().filter(|h| h.sector == sector).count()
    }

    pub fn infrastructure_count(&self, kind: InfrastructureType) -> usize {
        self.infrastructure
            .values()
            .filter(|u| u.infrastructure_type == kind)
            .count()
    }

    pub fn is_urban(&self, pos: Position) -> bool {
        euclidean(pos, self.center()) <= URBAN_RADIUS
    }

    pub fn average_income(&self) -> f64 {
        mean(self.households.values().map(|h| h.income))
    }

    pub fn average_education(&self) -> f64 {
        mean(self.households.values().map(|h| f64::from(h.education_level)))
    }

    pub fn average_health(&self) -> f64 {
        mean(self.households.values().map(|h| h.health_index))
    }

    pub fn urbanization_rate(&self) -> f64 {
        if self.households.is_empty() {
            return 0.0;
        }
        let urban = self
            .households
            .values()
            .filter(|h| self.is_urban(h.position))
            .count();
        urban as f64 / self.households.len() as f64
    }

    /// Annualized household income plus business revenue per resident.
    pub fn gdp_per_capita(&self) -> f64 {
        if self.households.is_empty() {
            return 0.0;
        }
        let income: f64 = self.households.values().map(|h| h.income).sum();
        let revenue: f64 = self.businesses.values().map(|b| b.revenue).sum();
        (income + revenue) * 12.0 / self.households.len() as f64
    }

    /// Total served households over five services per resident.
    pub fn infrastructure_coverage_rate(&self) -> f64 {
        let served: usize = self.coverage.values().sum();
        let possible = (self.population() * InfrastructureType::ALL.len()).max(1);
        served as f64 / possible as f64
    }

    /// Share of households reaching at least two of road, market and utility.
    pub fn service_access_rate(&self) -> f64 {
        if self.households.is_empty() {
            return 0.0;
        }
        let view = self.infrastructure_view();
        let served = self
            .households
            .values()
            .filter(|h| h.service_access(&view).count() >= 2)
            .count();
        served as f64 / self.households.len() as f64
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}
