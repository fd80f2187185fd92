// Model clock: owns the world, the policy engine and the RNG

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::agents::{BusinessUnit, HouseholdUnit};
use crate::config::SimConfig;
use crate::metrics::ModelMetrics;
use crate::policy::PolicyEngine;
use crate::sampling::{choose_weighted, uniform_int};
use crate::types::{InfrastructureType, Sector};
use crate::world::World;

/// Ticks per policy cycle.
pub const POLICY_INTERVAL: u64 = 5;
/// Share of the initial population settled in the rural corner.
pub const RURAL_SHARE: f64 = 0.7;
pub const INITIAL_EXTRA_ROADS: usize = 5;

/// One simulation run.
pub struct Model {
    pub world: World,
    pub config: SimConfig,
    pub policy: PolicyEngine,
    pub run_id: u64,
    rng: StdRng,
    metrics: Vec<ModelMetrics>,
}

impl Model {
    /// Build and populate a model. The seed falls back to the config's
    /// `random_seed`, then to OS entropy.
    pub fn new(config: SimConfig, seed: Option<u64>) -> Self {
        Self::for_run(config, seed, 0)
    }

    /// Like `new`, with every emitted row tagged `run_id`.
    pub fn for_run(config: SimConfig, seed: Option<u64>, run_id: u64) -> Self {
        let rng = match seed.or(config.random_seed) {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::with_rng(config, rng, run_id)
    }

    pub fn with_rng(config: SimConfig, rng: StdRng, run_id: u64) -> Self {
        let mut model = Self::empty(config, rng);
        model.run_id = run_id;
        model.create_initial_population();
        model.create_initial_businesses();
        model.create_initial_infrastructure();
        model.record_tick();
        model
    }

    /// A model with no agents; callers populate the world themselves.
    pub fn empty(config: SimConfig, rng: StdRng) -> Self {
        let world = World::new(config.grid_width, config.grid_height);
        let policy = PolicyEngine::new(config.policy_budget, &config.policy_config);
        Self {
            world,
            config,
            policy,
            run_id: 0,
            rng,
            metrics: Vec::new(),
        }
    }

    pub fn tick(&self) -> u64 {
        self.world.tick
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Indicators for every tick so far, starting at tick 0.
    pub fn metrics(&self) -> &[ModelMetrics] {
        &self.metrics
    }

    pub fn latest_metrics(&self) -> Option<&ModelMetrics> {
        self.metrics.last()
    }

    // === Initialization ===

    fn create_initial_population(&mut self) {
        let n = self.config.initial_population;
        let (width, height) = self.world.grid.bounds();
        let (cx, cy) = self.world.center();

        for i in 0..n {
            let pos = if (i as f64) < n as f64 * RURAL_SHARE {
                (
                    uniform_int(&mut self.rng, 0, width / 3),
                    uniform_int(&mut self.rng, 0, height / 3),
                )
            } else {
                (
                    uniform_int(&mut self.rng, cx - 5, cx + 5),
                    uniform_int(&mut self.rng, cy - 5, cy + 5),
                )
            };
            let config = &self.config;
            let rng = &mut self.rng;
            self.world
                .add_household(pos, |id, pos| HouseholdUnit::generate(id, pos, config, rng));
        }
    }

    fn create_initial_businesses(&mut self) {
        let (width, height) = self.world.grid.bounds();
        let (cx, cy) = self.world.center();
        let types = [
            (Sector::Agriculture, 0.5),
            (Sector::Manufacturing, 0.3),
            (Sector::Services, 0.2),
        ];

        for _ in 0..self.config.initial_businesses {
            let kind = choose_weighted(&mut self.rng, &types).unwrap_or(Sector::Agriculture);
            let pos = if kind == Sector::Agriculture {
                (
                    uniform_int(&mut self.rng, 0, width / 2),
                    uniform_int(&mut self.rng, 0, height / 2),
                )
            } else {
                (
                    uniform_int(&mut self.rng, cx - 10, cx + 10),
                    uniform_int(&mut self.rng, cy - 10, cy + 10),
                )
            };
            let rng = &mut self.rng;
            self.world
                .add_business(pos, |id, pos| BusinessUnit::generate(id, pos, kind, rng));
        }
    }

    /// One facility of each type near the centre plus a few scattered roads.
    fn create_initial_infrastructure(&mut self) {
        let (width, height) = self.world.grid.bounds();
        let (cx, cy) = self.world.center();
        for kind in InfrastructureType::ALL {
            let pos = (
                cx + self.rng.random_range(-3..=3),
                cy + self.rng.random_range(-3..=3),
            );
            self.world.place_infrastructure(pos, kind);
        }
        for _ in 0..INITIAL_EXTRA_ROADS {
            let pos = (
                uniform_int(&mut self.rng, 0, width),
                uniform_int(&mut self.rng, 0, height),
            );
            self.world.place_infrastructure(pos, InfrastructureType::Road);
        }
    }

    // === Stepping ===

    /// Advance one tick: every agent steps in a fresh random order, the policy
    /// cycle runs on its interval, then coverage and metrics are recomputed.
    pub fn step(&mut self) -> &ModelMetrics {
        self.world.tick += 1;

        let mut order = self.world.agent_refs();
        order.shuffle(&mut self.rng);
        for agent in order {
            self.world.step_agent(agent, &self.config, &mut self.rng);
        }

        if self.world.tick % POLICY_INTERVAL == 0 {
            #[cfg_attr(not(feature = "instrument"), allow(unused_variables))]
            let record = self.policy.execute_annual_policies(&mut self.world, &mut self.rng);
            #[cfg(feature = "instrument")]
            crate::metrics::emit_policy_record(self.run_id, record);
        }

        self.world.aggregate_coverage();
        self.record_tick()
    }

    pub fn run(&mut self, steps: u64) -> &ModelMetrics {
        for _ in 0..steps {
            self.step();
        }
        self.current_metrics()
    }

    fn current_metrics(&mut self) -> &ModelMetrics {
        if self.metrics.is_empty() {
            self.record_tick();
        }
        let index = self.metrics.len() - 1;
        &self.metrics[index]
    }

    /// Collect (and emit) this tick's indicators.
    fn record_tick(&mut self) -> &ModelMetrics {
        let metrics = ModelMetrics::collect(&self.world);
        #[cfg(feature = "instrument")]
        {
            crate::metrics::emit_model_metrics(self.run_id, &metrics);
            crate::metrics::emit_agent_data(self.run_id, &self.world);
        }
        tracing::trace!(run_id = self.run_id, tick = metrics.step, gdp = metrics.gdp_per_capita, "tick recorded");
        self.metrics.push(metrics);
        let index = self.metrics.len() - 1;
        &self.metrics[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SimConfig {
        SimConfig {
            grid_width: 30,
            grid_height: 30,
            initial_population: 40,
            initial_businesses: 8,
            ..SimConfig::default()
        }
    }

    #[test]
    fn test_initial_population_layout() {
        let model = Model::new(small_config(), Some(42));
        assert_eq!(model.world.households.len(), 40);
        assert_eq!(model.world.businesses.len(), 8);
        assert_eq!(model.world.infrastructure.len(), 10);
        assert_eq!(model.metrics().len(), 1);
        assert_eq!(model.metrics()[0].step, 0);

        // First 70% in the rural corner
        let rural = model
            .world
            .households
            .values()
            .filter(|h| h.position.0 < 10 && h.position.1 < 10)
            .count();
        assert!(rural >= 28);
    }

    #[test]
    fn test_policy_runs_every_fifth_tick() {
        let mut model = Model::new(small_config(), Some(7));
        for _ in 0..4 {
            model.step();
        }
        assert!(model.policy.history().is_empty());
        model.step();
        assert_eq!(model.policy.history().len(), 1);
        assert_eq!(model.policy.history()[0].step, 5);
        model.run(5);
        assert_eq!(model.policy.history().len(), 2);
        assert_eq!(model.metrics().len(), 11);
    }

    #[test]
    fn test_empty_model_steps_cleanly() {
        let config = SimConfig {
            initial_population: 0,
            initial_businesses: 0,
            ..small_config()
        };
        let mut model = Model::empty(config, StdRng::seed_from_u64(1));
        let metrics = model.run(5).clone();
        assert_eq!(metrics.population, 0);
        assert_eq!(metrics.gdp_per_capita, 0.0);
        assert_eq!(metrics.gini_coefficient, 0.0);
        // Budget still buys facilities at the centre of an empty town
        assert!(!model.world.infrastructure.is_empty());
    }
}
