// Education, health, economic and grant programs

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::agents::MAX_EDUCATION;
use crate::sampling::{chance, choose};
use crate::types::{BusinessSize, HouseholdId, Sector};
use crate::world::World;

pub const EDUCATION_COST_PER_BENEFICIARY: f64 = 300.0;
/// Households at or above this level are not enrolled.
pub const EDUCATION_ELIGIBILITY_CEILING: u8 = 10;

pub const HEALTH_COST_PER_BENEFICIARY: f64 = 250.0;
pub const HEALTH_ELIGIBILITY_CEILING: f64 = 0.8;
pub const HEALTH_BOOST: f64 = 0.15;

pub const BUSINESS_GRANT: f64 = 5000.0;
pub const BUSINESS_GRANT_SHARE: f64 = 0.6;
pub const BUSINESS_GRANT_PRODUCTIVITY: f64 = 0.1;
pub const TRAINING_COST: f64 = 500.0;
pub const TRAINING_MIN_EDUCATION: u8 = 5;
pub const TRAINING_TRANSITION_PROBABILITY: f64 = 0.3;

pub const DIRECT_GRANT: f64 = 1000.0;
pub const DIRECT_GRANT_SHARE: f64 = 0.4;
pub const DIRECT_GRANT_INCOME_CEILING: f64 = 2000.0;
pub const MICROFINANCE_LOAN: f64 = 2000.0;
pub const LOAN_SAVINGS_RANGE: (f64, f64) = (500.0, 3000.0);

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BeneficiaryResults {
    pub beneficiaries: usize,
    pub total_cost: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EconomicResults {
    pub businesses_supported: usize,
    pub training_provided: usize,
    /// Trainees who actually left agriculture.
    pub sector_transitions: usize,
    pub total_cost: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GrantResults {
    pub direct_grants: usize,
    pub microfinance_loans: usize,
    pub total_cost: f64,
}

/// Whole units of `unit_cost` a budget pays for.
fn affordable(budget: f64, unit_cost: f64) -> usize {
    if budget <= 0.0 {
        0
    } else {
        (budget / unit_cost).floor() as usize
    }
}

/// One extra year of schooling for the least-educated eligible households.
pub fn implement_education_programs(world: &mut World, budget: f64) -> BeneficiaryResults {
    let mut eligible: Vec<(HouseholdId, u8)> = world
        .households
        .iter()
        .filter(|(_, h)| h.education_level < EDUCATION_ELIGIBILITY_CEILING)
        .map(|(id, h)| (id, h.education_level))
        .collect();
    eligible.sort_by_key(|(_, level)| *level);

    let beneficiaries = affordable(budget, EDUCATION_COST_PER_BENEFICIARY).min(eligible.len());
    for (id, _) in &eligible[..beneficiaries] {
        if let Some(household) = world.households.get_mut(*id) {
            household.education_level = (household.education_level + 1).min(MAX_EDUCATION);
        }
    }

    BeneficiaryResults {
        beneficiaries,
        total_cost: beneficiaries as f64 * EDUCATION_COST_PER_BENEFICIARY,
    }
}

/// Health boost for the least-healthy eligible households.
pub fn implement_health_programs(world: &mut World, budget: f64) -> BeneficiaryResults {
    let mut eligible: Vec<(HouseholdId, f64)> = world
        .households
        .iter()
        .filter(|(_, h)| h.health_index < HEALTH_ELIGIBILITY_CEILING)
        .map(|(id, h)| (id, h.health_index))
        .collect();
    eligible.sort_by(|a, b| a.1.total_cmp(&b.1));

    let beneficiaries = affordable(budget, HEALTH_COST_PER_BENEFICIARY).min(eligible.len());
    for (id, _) in &eligible[..beneficiaries] {
        if let Some(household) = world.households.get_mut(*id) {
            household.health_index = (household.health_index + HEALTH_BOOST).min(1.0);
        }
    }

    BeneficiaryResults {
        beneficiaries,
        total_cost: beneficiaries as f64 * HEALTH_COST_PER_BENEFICIARY,
    }
}

/// Grants to small firms from the reserved share, then skills training for
/// schooled farm workers from what is left.
pub fn implement_economic_programs<R: Rng + ?Sized>(
    world: &mut World,
    budget: f64,
    rng: &mut R,
) -> EconomicResults {
    let mut results = EconomicResults::default();

    let small: Vec<_> = world
        .businesses
        .iter()
        .filter(|(_, b)| b.size == BusinessSize::Small)
        .map(|(id, _)| id)
        .collect();
    let grants = affordable(budget * BUSINESS_GRANT_SHARE, BUSINESS_GRANT).min(small.len());
    for id in &small[..grants] {
        if let Some(business) = world.businesses.get_mut(*id) {
            business.capital += BUSINESS_GRANT;
            business.productivity += BUSINESS_GRANT_PRODUCTIVITY;
        }
    }
    results.businesses_supported = grants;
    let remaining = budget - grants as f64 * BUSINESS_GRANT;

    let trainees: Vec<HouseholdId> = world
        .households
        .iter()
        .filter(|(_, h)| h.sector == Sector::Agriculture && h.education_level >= TRAINING_MIN_EDUCATION)
        .map(|(id, _)| id)
        .collect();
    let trained = affordable(remaining, TRAINING_COST).min(trainees.len());
    for id in &trainees[..trained] {
        if !chance(rng, TRAINING_TRANSITION_PROBABILITY) {
            continue;
        }
        let sector = choose(rng, &Sector::NON_AGRICULTURAL).unwrap_or(Sector::Manufacturing);
        if let Some(household) = world.households.get_mut(*id) {
            household.sector = sector;
            results.sector_transitions += 1;
        }
    }
    results.training_provided = trained;

    results.total_cost = grants as f64 * BUSINESS_GRANT + trained as f64 * TRAINING_COST;
    results
}

/// Direct grants to the poorest households from the reserved share, then
/// microfinance loans to modest savers. Loans are never repaid.
pub fn implement_grant_programs(world: &mut World, budget: f64) -> GrantResults {
    let mut poor: Vec<(HouseholdId, f64)> = world
        .households
        .iter()
        .filter(|(_, h)| h.income < DIRECT_GRANT_INCOME_CEILING)
        .map(|(id, h)| (id, h.income))
        .collect();
    poor.sort_by(|a, b| a.1.total_cmp(&b.1));

    let grants = affordable(budget * DIRECT_GRANT_SHARE, DIRECT_GRANT).min(poor.len());
    for (id, _) in &poor[..grants] {
        if let Some(household) = world.households.get_mut(*id) {
            household.savings += DIRECT_GRANT;
        }
    }

    // Eligibility is judged after the grants land
    let (lo, hi) = LOAN_SAVINGS_RANGE;
    let borrowers: Vec<HouseholdId> = world
        .households
        .iter()
        .filter(|(_, h)| (lo..=hi).contains(&h.savings))
        .map(|(id, _)| id)
        .collect();
    let remaining = budget - grants as f64 * DIRECT_GRANT;
    let loans = affordable(remaining, MICROFINANCE_LOAN).min(borrowers.len());
    for id in &borrowers[..loans] {
        if let Some(household) = world.households.get_mut(*id) {
            household.savings += MICROFINANCE_LOAN;
        }
    }

    GrantResults {
        direct_grants: grants,
        microfinance_loans: loans,
        total_cost: grants as f64 * DIRECT_GRANT + loans as f64 * MICROFINANCE_LOAN,
    }
}
