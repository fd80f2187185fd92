use serde::{Deserialize, Serialize};

use super::Agent;
use crate::grid::SpatialGrid;
use crate::types::{AgentRef, InfrastructureId, InfrastructureType, Position};

pub const QUALITY_FLOOR: f64 = 0.1;
pub const QUALITY_DECAY_PER_TICK: f64 = 0.02;
/// Share of construction cost an upgrade must cover.
pub const UPGRADE_COST_SHARE: f64 = 0.3;
pub const UPGRADE_QUALITY_GAIN: f64 = 0.3;
pub const UPGRADE_CAPACITY_FACTOR: f64 = 1.2;
/// Annual upkeep at full quality, as a share of construction cost.
pub const MAINTENANCE_SHARE: f64 = 0.05;

/// A point facility (road segment, school, clinic, market, utility).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfrastructureUnit {
    pub id: InfrastructureId,
    pub position: Position,
    pub infrastructure_type: InfrastructureType,
    pub coverage_radius: i32,
    pub capacity: f64,
    pub construction_cost: f64,
    pub quality: f64,
    pub age: u32,
    /// Households inside the coverage radius as of the unit's last step.
    pub served_households: usize,
}

pub struct InfrastructureEnv<'a> {
    pub grid: &'a SpatialGrid,
}

impl InfrastructureUnit {
    pub fn new(id: InfrastructureId, position: Position, infrastructure_type: InfrastructureType) -> Self {
        Self {
            id,
            position,
            infrastructure_type,
            coverage_radius: infrastructure_type.coverage_radius(),
            capacity: infrastructure_type.base_capacity(),
            construction_cost: infrastructure_type.construction_cost(),
            quality: 1.0,
            age: 0,
            served_households: 0,
        }
    }

    pub fn with_quality(mut self, quality: f64) -> Self {
        self.quality = quality.clamp(QUALITY_FLOOR, 1.0);
        self
    }

    pub fn degrade(&mut self) {
        self.quality = (self.quality - QUALITY_DECAY_PER_TICK).max(QUALITY_FLOOR);
    }

    /// Count households within the coverage radius.
    pub fn serve(&mut self, grid: &SpatialGrid) -> usize {
        let mut served = 0;
        grid.for_each_neighbor(self.position, self.coverage_radius, true, |agent| {
            if matches!(agent, AgentRef::Household(_)) {
                served += 1;
            }
        });
        self.served_households = served;
        served
    }

    pub fn productivity_bonus(&self) -> f64 {
        self.infrastructure_type.base_bonus() * self.quality
    }

    /// Annual upkeep; rises as quality falls.
    pub fn maintenance_cost(&self) -> f64 {
        self.construction_cost * MAINTENANCE_SHARE * (2.0 - self.quality)
    }

    /// Apply an investment. Returns false, leaving the unit untouched, if it
    /// covers less than the required share of construction cost.
    pub fn upgrade(&mut self, investment: f64) -> bool {
        if investment < self.construction_cost * UPGRADE_COST_SHARE {
            return false;
        }
        self.quality = (self.quality + UPGRADE_QUALITY_GAIN).min(1.0);
        self.capacity *= UPGRADE_CAPACITY_FACTOR;
        true
    }
}

impl Agent for InfrastructureUnit {
    type Env<'a> = InfrastructureEnv<'a>;

    fn step(&mut self, env: InfrastructureEnv<'_>) {
        self.age += 1;
        self.degrade();
        self.serve(env.grid);
    }

    fn position(&self) -> Position {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HouseholdId;
    use slotmap::SlotMap;

    fn unit(kind: InfrastructureType) -> InfrastructureUnit {
        let mut keys: SlotMap<InfrastructureId, ()> = SlotMap::with_key();
        InfrastructureUnit::new(keys.insert(()), (5, 5), kind)
    }

    #[test]
    fn test_upgrade_threshold() {
        let mut road = unit(InfrastructureType::Road).with_quality(0.5);
        let threshold = road.construction_cost * UPGRADE_COST_SHARE;

        assert!(!road.upgrade(threshold - 1.0));
        assert_eq!(road.quality, 0.5);
        assert_eq!(road.capacity, 1000.0);

        assert!(road.upgrade(threshold));
        assert!((road.quality - 0.8).abs() < 1e-12);
        assert!((road.capacity - 1200.0).abs() < 1e-9);

        // Capped at full quality
        assert!(road.upgrade(threshold));
        assert_eq!(road.quality, 1.0);
    }

    #[test]
    fn test_quality_never_below_floor() {
        let grid = SpatialGrid::new(10, 10);
        let mut school = unit(InfrastructureType::School);
        for _ in 0..200 {
            school.step(InfrastructureEnv { grid: &grid });
            assert!(school.quality >= QUALITY_FLOOR);
            assert!(school.quality <= 1.0);
        }
        assert_eq!(school.age, 200);
        assert_eq!(school.quality, QUALITY_FLOOR);
    }

    #[test]
    fn test_serves_households_in_radius() {
        let mut grid = SpatialGrid::new(20, 20);
        let mut households: SlotMap<HouseholdId, ()> = SlotMap::with_key();
        grid.place(AgentRef::Household(households.insert(())), (5, 5));
        grid.place(AgentRef::Household(households.insert(())), (6, 4));
        grid.place(AgentRef::Household(households.insert(())), (9, 9));

        let mut road = unit(InfrastructureType::Road);
        road.step(InfrastructureEnv { grid: &grid });
        assert_eq!(road.served_households, 2);

        let mut market = unit(InfrastructureType::Market);
        market.step(InfrastructureEnv { grid: &grid });
        assert_eq!(market.served_households, 3);
    }

    #[test]
    fn test_bonus_and_maintenance_scale_with_quality() {
        let market = unit(InfrastructureType::Market).with_quality(0.5);
        assert!((market.productivity_bonus() - 0.125).abs() < 1e-12);
        // 5% of 20k at quality 0.5 -> 1000 * 1.5
        assert!((market.maintenance_cost() - 1500.0).abs() < 1e-9);
    }
}
