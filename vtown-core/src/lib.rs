// Village-to-town development simulation
//
// Module structure:
// - types      IDs, positions, sectors, infrastructure kinds
// - config     YAML configuration and parameter overrides
// - grid       Bounded spatial grid with Moore neighbourhoods
// - sampling   Random draw helpers
// - agents     Households, businesses and infrastructure units
// - world      Agent arenas and aggregate queries
// - policy     Annual assess / allocate / execute cycle
// - metrics    Per-tick indicators and data rows
// - model      Model clock
// - batch      Multi-run driver
// - report     Plain-text summary across runs

pub mod agents;
pub mod batch;
pub mod config;
pub mod grid;
pub mod metrics;
pub mod model;
pub mod policy;
pub mod report;
pub mod sampling;
pub mod types;
pub mod world;

pub use agents::{Agent, BusinessUnit, HouseholdUnit, InfrastructureUnit};
pub use batch::{BatchRunner, RunOutcome};
pub use config::{ConfigError, PolicyConfig, SimConfig};
pub use grid::SpatialGrid;
pub use metrics::{ModelMetrics, gini_coefficient};
pub use model::Model;
pub use policy::{BudgetAllocation, PolicyEngine, PolicyRecord, SituationAssessment};
pub use report::SummaryReport;
pub use types::*;
pub use world::World;

#[cfg(feature = "instrument")]
pub use instrument;
