// Greedy infrastructure build-out

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::siting::find_optimal_location;
use crate::types::InfrastructureType;
use crate::world::World;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfrastructureResults {
    pub projects_completed: usize,
    pub total_cost: f64,
    pub types_built: Vec<InfrastructureType>,
}

/// Need per type: one minus the ratio of units in place to the population
/// target, floored at zero. Every type is fully needed in an empty town.
pub fn assess_infrastructure_needs(world: &World) -> BTreeMap<InfrastructureType, f64> {
    let population = world.population();
    InfrastructureType::ALL
        .iter()
        .map(|kind| {
            if population == 0 {
                return (*kind, 1.0);
            }
            let target = population as f64 / 100.0 * kind.target_per_hundred();
            let ratio = world.infrastructure_count(*kind) as f64 / target.max(1.0);
            (*kind, (1.0 - ratio).max(0.0))
        })
        .collect()
}

/// Build the most needed types first. Equal needs are ordered by the
/// configured priority weight, higher first.
pub fn implement_infrastructure_development<R: Rng + ?Sized>(
    world: &mut World,
    budget: f64,
    priorities: &BTreeMap<InfrastructureType, f64>,
    rng: &mut R,
) -> InfrastructureResults {
    let mut results = InfrastructureResults::default();

    let weight = |kind: &InfrastructureType| priorities.get(kind).copied().unwrap_or(0.0);
    let mut needs: Vec<(InfrastructureType, f64)> = assess_infrastructure_needs(world).into_iter().collect();
    needs.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then_with(|| weight(&b.0).total_cmp(&weight(&a.0)))
    });

    let mut remaining = budget;
    for (kind, need) in needs {
        if remaining <= 0.0 {
            break;
        }
        let cost = kind.construction_cost();
        let affordable = (remaining / cost).floor() as usize;
        let wanted = ((need * 3.0).round_ties_even() as usize).max(1);

        for _ in 0..affordable.min(wanted) {
            if remaining < cost {
                break;
            }
            let site = find_optimal_location(world, kind, rng);
            if let Some(id) = world.add_infrastructure(site, kind) {
                tracing::debug!(kind = kind.as_str(), x = site.0, y = site.1, ?id, "infrastructure built");
                remaining -= cost;
                results.projects_completed += 1;
                results.types_built.push(kind);
            }
        }
    }

    results.total_cost = budget - remaining;
    results
}
