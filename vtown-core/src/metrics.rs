// Per-tick aggregate indicators and data rows

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{InfrastructureType, Sector};
use crate::world::World;

/// Model-level indicators for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub step: u64,
    pub population: usize,
    pub total_businesses: usize,
    pub gdp_per_capita: f64,
    pub gini_coefficient: f64,
    pub average_education: f64,
    pub average_health: f64,
    pub urbanization_rate: f64,
    pub infrastructure_coverage: f64,
    pub service_access_rate: f64,
    pub employment: BTreeMap<Sector, usize>,
    /// Households served, summed over units of each type.
    pub coverage_by_type: BTreeMap<InfrastructureType, usize>,
    pub units_by_type: BTreeMap<InfrastructureType, usize>,
}

impl ModelMetrics {
    pub fn collect(world: &World) -> Self {
        let incomes: Vec<f64> = world.households.values().map(|h| h.income).collect();
        Self {
            step: world.tick,
            population: world.population(),
            total_businesses: world.businesses.len(),
            gdp_per_capita: world.gdp_per_capita(),
            gini_coefficient: gini_coefficient(&incomes),
            average_education: world.average_education(),
            average_health: world.average_health(),
            urbanization_rate: world.urbanization_rate(),
            infrastructure_coverage: world.infrastructure_coverage_rate(),
            service_access_rate: world.service_access_rate(),
            employment: Sector::ALL
                .iter()
                .map(|s| (*s, world.count_by_sector(*s)))
                .collect(),
            coverage_by_type: world.coverage.clone(),
            units_by_type: InfrastructureType::ALL
                .iter()
                .map(|t| (*t, world.infrastructure_count(*t)))
                .collect(),
        }
    }

    pub fn employment_in(&self, sector: Sector) -> usize {
        self.employment.get(&sector).copied().unwrap_or(0)
    }

    pub fn coverage_of(&self, kind: InfrastructureType) -> usize {
        self.coverage_by_type.get(&kind).copied().unwrap_or(0)
    }
}

/// Gini coefficient of a distribution: 0 is perfect equality. Zero for
/// fewer than two values or a non-positive total.
pub fn gini_coefficient(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len() as f64;
    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, x)| (n - i as f64) * x)
        .sum();
    (n + 1.0 - 2.0 * weighted / total) / n
}

// === DATA ROWS ===

/// One `model_metrics` row.
#[cfg(feature = "instrument")]
pub fn emit_model_metrics(run_id: u64, metrics: &ModelMetrics) {
    tracing::info!(
        target: "model_metrics",
        run_id,
        tick = metrics.step,
        population = metrics.population,
        total_businesses = metrics.total_businesses,
        gdp_per_capita = metrics.gdp_per_capita,
        gini_coefficient = metrics.gini_coefficient,
        average_education = metrics.average_education,
        average_health = metrics.average_health,
        urbanization_rate = metrics.urbanization_rate,
        infrastructure_coverage = metrics.infrastructure_coverage,
        service_access_rate = metrics.service_access_rate,
        agricultural_employment = metrics.employment_in(Sector::Agriculture),
        manufacturing_employment = metrics.employment_in(Sector::Manufacturing),
        services_employment = metrics.employment_in(Sector::Services),
        road_coverage = metrics.coverage_of(InfrastructureType::Road),
        school_coverage = metrics.coverage_of(InfrastructureType::School),
        clinic_coverage = metrics.coverage_of(InfrastructureType::Clinic),
        market_coverage = metrics.coverage_of(InfrastructureType::Market),
        utility_coverage = metrics.coverage_of(InfrastructureType::Utility),
    );
}

/// One `agent_data` row per agent. Columns a kind lacks are left at their defaults.
#[cfg(feature = "instrument")]
pub fn emit_agent_data(run_id: u64, world: &World) {
    use crate::types::KeyToU64;

    let tick = world.tick;
    for household in world.households.values() {
        tracing::info!(
            target: "agent_data",
            run_id,
            tick,
            agent_id = household.id.to_u64(),
            agent_type = "household",
            position_x = household.position.0,
            position_y = household.position.1,
            income = household.income,
            savings = household.savings,
            education = household.education_level,
            health = household.health_index,
            sector = household.sector.as_str(),
            flood_affected = household.flood_affected,
        );
    }
    for business in world.businesses.values() {
        tracing::info!(
            target: "agent_data",
            run_id,
            tick,
            agent_id = business.id.to_u64(),
            agent_type = "business",
            position_x = business.position.0,
            position_y = business.position.1,
            business_type = business.business_type.as_str(),
            business_size = business.size.as_str(),
            revenue = business.revenue,
            profit = business.profit,
            employees = business.current_employees,
        );
    }
    for unit in world.infrastructure.values() {
        tracing::info!(
            target: "agent_data",
            run_id,
            tick,
            agent_id = unit.id.to_u64(),
            agent_type = "infrastructure",
            position_x = unit.position.0,
            position_y = unit.position.1,
            infrastructure_type = unit.infrastructure_type.as_str(),
            quality = unit.quality,
            coverage_radius = unit.coverage_radius,
            served_households = unit.served_households,
        );
    }
}

/// One `policy` row per annual cycle.
#[cfg(feature = "instrument")]
pub fn emit_policy_record(run_id: u64, record: &crate::policy::PolicyRecord) {
    let allocation = &record.allocation;
    let results = &record.results;
    tracing::info!(
        target: "policy",
        run_id,
        tick = record.step,
        infrastructure_budget = allocation.infrastructure,
        education_budget = allocation.education,
        health_budget = allocation.health,
        economic_budget = allocation.economic,
        grants_budget = allocation.grants,
        projects_completed = results.infrastructure.projects_completed,
        infrastructure_cost = results.infrastructure.total_cost,
        education_beneficiaries = results.education.beneficiaries,
        health_beneficiaries = results.health.beneficiaries,
        businesses_supported = results.economic.businesses_supported,
        training_provided = results.economic.training_provided,
        direct_grants = results.grants.direct_grants,
        microfinance_loans = results.grants.microfinance_loans,
        education_level = record.situation.education_level,
        health_level = record.situation.health_level,
        agricultural_dependency = record.situation.agricultural_dependency,
        urbanization_rate = record.situation.urbanization_rate,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gini_degenerate_inputs() {
        assert_eq!(gini_coefficient(&[]), 0.0);
        assert_eq!(gini_coefficient(&[5000.0]), 0.0);
        assert_eq!(gini_coefficient(&[0.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_gini_known_values() {
        assert!(gini_coefficient(&[10.0, 10.0, 10.0, 10.0]).abs() < 1e-12);
        // One holder of everything among four: (n - 1) / n
        assert!((gini_coefficient(&[0.0, 0.0, 0.0, 100.0]) - 0.75).abs() < 1e-12);
        // Order of input does not matter
        let a = gini_coefficient(&[1.0, 2.0, 3.0, 4.0]);
        let b = gini_coefficient(&[4.0, 1.0, 3.0, 2.0]);
        assert!((a - b).abs() < 1e-12);
        assert!((a - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_empty_world_metrics() {
        let metrics = ModelMetrics::collect(&World::new(10, 10));
        assert_eq!(metrics.population, 0);
        assert_eq!(metrics.gdp_per_capita, 0.0);
        assert_eq!(metrics.gini_coefficient, 0.0);
        assert_eq!(metrics.employment_in(Sector::Services), 0);
        assert_eq!(metrics.coverage_of(InfrastructureType::Road), 0);
    }
}
