// Situation assessment and budget allocation

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{InfrastructureType, Sector};
use crate::world::World;

/// Normalized snapshot of the settlement used to bias the budget split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SituationAssessment {
    /// Average income over 5000, capped at 1.
    pub economic_development: f64,
    pub agricultural_dependency: f64,
    /// Average schooling over the 12-year maximum.
    pub education_level: f64,
    pub health_level: f64,
    /// Units in place, by type.
    pub infrastructure_coverage: BTreeMap<InfrastructureType, usize>,
    pub urbanization_rate: f64,
    pub business_density: f64,
}

/// Pure read of the world.
pub fn assess_current_situation(world: &World) -> SituationAssessment {
    let infrastructure_coverage = InfrastructureType::ALL
        .iter()
        .map(|kind| (*kind, world.infrastructure_count(*kind)))
        .collect();
    let households = world.population();
    let business_density = world.businesses.len() as f64 / households.max(1) as f64;
    let urbanization_rate = world.urbanization_rate();

    if households == 0 {
        return SituationAssessment {
            economic_development: 0.0,
            agricultural_dependency: 1.0,
            education_level: 0.0,
            health_level: 0.5,
            infrastructure_coverage,
            urbanization_rate,
            business_density,
        };
    }

    SituationAssessment {
        economic_development: (world.average_income() / 5000.0).min(1.0),
        agricultural_dependency: world.count_by_sector(Sector::Agriculture) as f64 / households as f64,
        education_level: world.average_education() / 12.0,
        health_level: world.average_health(),
        infrastructure_coverage,
        urbanization_rate,
        business_density,
    }
}

// === ALLOCATION ===

/// Budget per program area. Shares sum to the annual budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetAllocation {
    pub infrastructure: f64,
    pub education: f64,
    pub health: f64,
    pub economic: f64,
    pub grants: f64,
}

impl BudgetAllocation {
    pub const BASE: BudgetAllocation = BudgetAllocation {
        infrastructure: 0.5,
        education: 0.15,
        health: 0.15,
        economic: 0.1,
        grants: 0.1,
    };

    pub fn total(&self) -> f64 {
        self.infrastructure + self.education + self.health + self.economic + self.grants
    }

    fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            infrastructure: f(self.infrastructure),
            education: f(self.education),
            health: f(self.health),
            economic: f(self.economic),
            grants: f(self.grants),
        }
    }

    fn shift(&mut self, delta: BudgetAllocation) {
        self.infrastructure += delta.infrastructure;
        self.education += delta.education;
        self.health += delta.health;
        self.economic += delta.economic;
        self.grants += delta.grants;
    }
}

const NO_SHIFT: BudgetAllocation = BudgetAllocation {
    infrastructure: 0.0,
    education: 0.0,
    health: 0.0,
    economic: 0.0,
    grants: 0.0,
};

/// No area ever gets less than this share before renormalization.
pub const MIN_SHARE: f64 = 0.05;

/// Split the annual budget. Each threshold rule that fires shifts several
/// shares; rules stack.
pub fn allocate_budget(situation: &SituationAssessment, annual_budget: f64) -> BudgetAllocation {
    let mut shares = BudgetAllocation::BASE;

    if situation.education_level < 0.3 {
        shares.shift(BudgetAllocation {
            education: 0.05,
            infrastructure: -0.03,
            economic: -0.02,
            ..NO_SHIFT
        });
    }
    if situation.health_level < 0.6 {
        shares.shift(BudgetAllocation {
            health: 0.05,
            infrastructure: -0.03,
            grants: -0.02,
            ..NO_SHIFT
        });
    }
    if situation.agricultural_dependency > 0.7 {
        shares.shift(BudgetAllocation {
            economic: 0.08,
            infrastructure: -0.05,
            grants: -0.03,
            ..NO_SHIFT
        });
    }
    if situation.urbanization_rate < 0.3 {
        shares.shift(BudgetAllocation {
            infrastructure: 0.1,
            education: -0.03,
            health: -0.03,
            economic: -0.02,
            grants: -0.02,
        });
    }

    let floored = shares.map(|share| share.max(MIN_SHARE));
    let total = floored.total();
    floored.map(|share| share / total * annual_budget)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neutral() -> SituationAssessment {
        SituationAssessment {
            economic_development: 0.5,
            agricultural_dependency: 0.5,
            education_level: 0.5,
            health_level: 0.8,
            infrastructure_coverage: BTreeMap::new(),
            urbanization_rate: 0.5,
            business_density: 0.1,
        }
    }

    #[test]
    fn test_no_rules_keeps_base_split() {
        let allocation = allocate_budget(&neutral(), 100_000.0);
        assert!((allocation.infrastructure - 50_000.0).abs() < 1e-6);
        assert!((allocation.education - 15_000.0).abs() < 1e-6);
        assert!((allocation.total() - 100_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_low_education_shifts_toward_schooling() {
        let situation = SituationAssessment {
            education_level: 0.1,
            ..neutral()
        };
        let budget = 100_000.0;
        let allocation = allocate_budget(&situation, budget);
        assert!(allocation.education / budget > 0.15);
        assert!(allocation.infrastructure / budget < 0.5);
        assert!(allocation.economic / budget < 0.1);
        assert!((allocation.total() - budget).abs() < 1e-6);
    }

    #[test]
    fn test_rules_stack_and_floor() {
        let situation = SituationAssessment {
            education_level: 0.0,
            health_level: 0.2,
            agricultural_dependency: 1.0,
            urbanization_rate: 0.0,
            ..neutral()
        };
        let allocation = allocate_budget(&situation, 1.0);
        // infra .5 -.03 -.03 -.05 +.1 = .49; grants .1 -.02 -.03 -.02 = .03 -> floored .05
        let total = 0.49 + 0.17 + 0.17 + 0.14 + 0.05;
        assert!((allocation.infrastructure - 0.49 / total).abs() < 1e-9);
        assert!((allocation.grants - 0.05 / total).abs() < 1e-9);
        assert!((allocation.total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_world_fallback() {
        let world = World::new(10, 10);
        let situation = assess_current_situation(&world);
        assert_eq!(situation.economic_development, 0.0);
        assert_eq!(situation.agricultural_dependency, 1.0);
        assert_eq!(situation.education_level, 0.0);
        assert_eq!(situation.health_level, 0.5);
        assert_eq!(situation.urbanization_rate, 0.0);
        assert_eq!(situation.business_density, 0.0);
        assert_eq!(situation.infrastructure_coverage.len(), 5);
    }
}
