//! Annual policy cycle: assess, allocate, execute five programs, record.

pub mod infrastructure;
pub mod programs;
pub mod siting;
pub mod situation;

pub use infrastructure::*;
pub use programs::*;
pub use situation::*;

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::PolicyConfig;
use crate::types::InfrastructureType;
use crate::world::World;

/// Outcomes of every program in one cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramResults {
    pub infrastructure: InfrastructureResults,
    pub education: BeneficiaryResults,
    pub health: BeneficiaryResults,
    pub economic: EconomicResults,
    pub grants: GrantResults,
}

/// One auditable entry of the policy history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub step: u64,
    pub allocation: BudgetAllocation,
    pub results: ProgramResults,
    pub situation: SituationAssessment,
}

/// Aggregate indicators captured after a cycle, for later comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectivenessSnapshot {
    pub gdp_per_capita: f64,
    pub education_level: f64,
    pub health_level: f64,
    pub infrastructure_coverage: f64,
    pub urbanization_rate: f64,
}

#[derive(Debug, Clone)]
pub struct PolicyEngine {
    pub annual_budget: f64,
    /// Budget left in the current cycle; reset at the start of each one.
    pub current_budget: f64,
    /// Tie-breaker for the build order when two types are equally needed.
    pub infrastructure_priorities: BTreeMap<InfrastructureType, f64>,
    /// Passed through from the config unchanged. Grant and loan spending
    /// comes from the cycle's allocation.
    pub grant_program_budget: f64,
    pub microfinance_budget: f64,
    history: Vec<PolicyRecord>,
    effectiveness: BTreeMap<u64, EffectivenessSnapshot>,
}

impl PolicyEngine {
    pub fn new(annual_budget: f64, config: &PolicyConfig) -> Self {
        Self {
            annual_budget,
            current_budget: annual_budget,
            infrastructure_priorities: config.infrastructure_weights.clone(),
            grant_program_budget: config.grant_program_budget,
            microfinance_budget: config.microfinance_budget,
            history: Vec::new(),
            effectiveness: BTreeMap::new(),
        }
    }

    pub fn history(&self) -> &[PolicyRecord] {
        &self.history
    }

    pub fn effectiveness(&self) -> &BTreeMap<u64, EffectivenessSnapshot> {
        &self.effectiveness
    }

    pub fn assess_current_situation(&self, world: &World) -> SituationAssessment {
        assess_current_situation(world)
    }

    pub fn allocate_budget(&self, situation: &SituationAssessment) -> BudgetAllocation {
        allocate_budget(situation, self.annual_budget)
    }

    /// Run one full cycle against the world and append it to the history.
    pub fn execute_annual_policies<R: Rng + ?Sized>(&mut self, world: &mut World, rng: &mut R) -> &PolicyRecord {
        self.current_budget = self.annual_budget;

        let situation = self.assess_current_situation(world);
        let allocation = self.allocate_budget(&situation);

        let results = ProgramResults {
            infrastructure: implement_infrastructure_development(
                world,
                allocation.infrastructure,
                &self.infrastructure_priorities,
                rng,
            ),
            education: implement_education_programs(world, allocation.education),
            health: implement_health_programs(world, allocation.health),
            economic: implement_economic_programs(world, allocation.economic, rng),
            grants: implement_grant_programs(world, allocation.grants),
        };
        self.current_budget -= results.infrastructure.total_cost
            + results.education.total_cost
            + results.health.total_cost
            + results.economic.total_cost
            + results.grants.total_cost;

        tracing::debug!(
            tick = world.tick,
            built = results.infrastructure.projects_completed,
            schooled = results.education.beneficiaries,
            treated = results.health.beneficiaries,
            unspent = self.current_budget,
            "policy cycle executed"
        );

        self.history.push(PolicyRecord {
            step: world.tick,
            allocation,
            results,
            situation,
        });
        self.update_policy_effectiveness(world);

        let index = self.history.len() - 1;
        &self.history[index]
    }

    /// Passive log of outcomes once there is a previous cycle to compare to.
    fn update_policy_effectiveness(&mut self, world: &World) {
        if self.history.len() < 2 {
            return;
        }
        self.effectiveness.insert(
            world.tick,
            EffectivenessSnapshot {
                gdp_per_capita: world.gdp_per_capita(),
                education_level: world.average_education(),
                health_level: world.average_health(),
                infrastructure_coverage: world.infrastructure_coverage_rate(),
                urbanization_rate: world.urbanization_rate(),
            },
        );
    }

    pub fn history_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.history)
    }

    /// Replace the history with a previously saved one.
    pub fn load_history(&mut self, json: &str) -> serde_json::Result<()> {
        self.history = serde_json::from_str(json)?;
        Ok(())
    }
}
