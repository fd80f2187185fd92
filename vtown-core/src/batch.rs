//! Sequential multi-run driver with optional parameter sweeps.

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::info;

use crate::config::{ConfigError, SimConfig, apply_overrides};
use crate::metrics::ModelMetrics;
use crate::model::Model;
use crate::policy::PolicyRecord;

/// What a finished run leaves behind for reporting.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: u64,
    pub seed: Option<u64>,
    pub initial: ModelMetrics,
    pub final_metrics: ModelMetrics,
    /// Metric rows produced, tick 0 included.
    pub steps_recorded: usize,
    pub history: Vec<PolicyRecord>,
}

/// Runs share one thread so data rows from different runs never interleave.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    base: serde_yml::Value,
    pub runs: u64,
    pub steps: u64,
    pub seed: Option<u64>,
    /// Top-level config key -> values; run `i` takes `values[i % len]`.
    pub sweep: BTreeMap<String, Vec<serde_yml::Value>>,
}

impl BatchRunner {
    pub fn new(base: serde_yml::Value) -> Self {
        Self {
            base,
            runs: 1,
            steps: 100,
            seed: None,
            sweep: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &SimConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(serde_yml::to_value(config)?))
    }

    pub fn with_runs(mut self, runs: u64) -> Self {
        self.runs = runs;
        self
    }

    pub fn with_steps(mut self, steps: u64) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_sweep(mut self, key: impl Into<String>, values: Vec<serde_yml::Value>) -> Self {
        self.sweep.insert(key.into(), values);
        self
    }

    /// Configuration for one run, sweep values applied.
    pub fn config_for(&self, run_id: u64) -> Result<SimConfig, ConfigError> {
        let overrides: BTreeMap<String, serde_yml::Value> = self
            .sweep
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(key, values)| {
                let pick = (run_id % values.len() as u64) as usize;
                (key.clone(), values[pick].clone())
            })
            .collect();
        SimConfig::from_value(apply_overrides(&self.base, &overrides)?)
    }

    /// Seed for run `i`: the batch seed plus `i`, else the config's seed plus `i`.
    pub fn seed_for(&self, run_id: u64, config: &SimConfig) -> Option<u64> {
        self.seed
            .or(config.random_seed)
            .map(|seed| seed.wrapping_add(run_id))
    }

    pub fn run(&self) -> Result<Vec<RunOutcome>, ConfigError> {
        info!(runs = self.runs, steps = self.steps, "starting batch");
        let mut outcomes = Vec::new();
        for run_id in 0..self.runs {
            let config = self.config_for(run_id)?;
            let seed = self.seed_for(run_id, &config);
            outcomes.push(self.run_one(run_id, config, seed));
        }
        Ok(outcomes)
    }

    fn run_one(&self, run_id: u64, config: SimConfig, seed: Option<u64>) -> RunOutcome {
        info!(run_id, ?seed, "run started");
        let started = Instant::now();

        let mut model = Model::for_run(config, seed, run_id);
        for step in 1..=self.steps {
            model.step();
            if step % 20 == 0 {
                info!(run_id, step, total = self.steps, "progress");
            }
        }

        let metrics = model.metrics();
        let outcome = RunOutcome {
            run_id,
            seed,
            initial: metrics.first().cloned().unwrap_or_else(|| ModelMetrics::collect(&model.world)),
            final_metrics: metrics.last().cloned().unwrap_or_else(|| ModelMetrics::collect(&model.world)),
            steps_recorded: metrics.len(),
            history: model.policy.history().to_vec(),
        };
        info!(
            run_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            population = outcome.final_metrics.population,
            gdp_per_capita = outcome.final_metrics.gdp_per_capita,
            "run finished"
        );
        outcome
    }
}
