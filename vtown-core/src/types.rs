use serde::{Deserialize, Serialize};
use slotmap::{Key, new_key_type};

// ============================================================================
// IDs - Using slotmap for generational indices
// ============================================================================

new_key_type! {
    pub struct HouseholdId;
    pub struct BusinessId;
    pub struct InfrastructureId;
}

/// Trait for converting SlotMap keys to u64 for output tables
pub trait KeyToU64 {
    fn to_u64(self) -> u64;
}

impl KeyToU64 for HouseholdId {
    fn to_u64(self) -> u64 {
        self.data().as_ffi()
    }
}

impl KeyToU64 for BusinessId {
    fn to_u64(self) -> u64 {
        self.data().as_ffi()
    }
}

impl KeyToU64 for InfrastructureId {
    fn to_u64(self) -> u64 {
        self.data().as_ffi()
    }
}

/// The closed set of agent kinds living on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentRef {
    Household(HouseholdId),
    Business(BusinessId),
    Infrastructure(InfrastructureId),
}

impl AgentRef {
    pub fn as_u64(self) -> u64 {
        match self {
            AgentRef::Household(id) => id.to_u64(),
            AgentRef::Business(id) => id.to_u64(),
            AgentRef::Infrastructure(id) => id.to_u64(),
        }
    }

    pub fn kind(self) -> &'static str {
        match self {
            AgentRef::Household(_) => "household",
            AgentRef::Business(_) => "business",
            AgentRef::Infrastructure(_) => "infrastructure",
        }
    }

    pub fn is_infrastructure(self) -> bool {
        matches!(self, AgentRef::Infrastructure(_))
    }
}

// ============================================================================
// Positions
// ============================================================================

/// Integer grid coordinate (x, y).
pub type Position = (i32, i32);

/// Moore-neighbourhood distance.
pub fn chebyshev(a: Position, b: Position) -> i32 {
    (a.0 - b.0).abs().max((a.1 - b.1).abs())
}

pub fn euclidean(a: Position, b: Position) -> f64 {
    let dx = f64::from(a.0 - b.0);
    let dy = f64::from(a.1 - b.1);
    (dx * dx + dy * dy).sqrt()
}

// ============================================================================
// Sectors
// ============================================================================

/// Economic sector of a household, and the line of business of a firm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    Agriculture,
    Manufacturing,
    Services,
}

impl Sector {
    pub const ALL: [Sector; 3] = [Sector::Agriculture, Sector::Manufacturing, Sector::Services];

    /// Targets of a move out of agriculture.
    pub const NON_AGRICULTURAL: [Sector; 2] = [Sector::Manufacturing, Sector::Services];

    pub fn as_str(self) -> &'static str {
        match self {
            Sector::Agriculture => "agriculture",
            Sector::Manufacturing => "manufacturing",
            Sector::Services => "services",
        }
    }

    /// Monthly revenue of a firm of this type before productivity and staffing.
    pub fn base_revenue(self) -> f64 {
        match self {
            Sector::Agriculture => 1000.0,
            Sector::Manufacturing => 2000.0,
            Sector::Services => 1500.0,
        }
    }
}

// ============================================================================
// Business size
// ============================================================================

/// Firm size class. Ordered; firms only ever move up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessSize {
    Small,
    Medium,
    Large,
}

impl BusinessSize {
    pub fn max_employees(self) -> u32 {
        match self {
            BusinessSize::Small => 5,
            BusinessSize::Medium => 20,
            BusinessSize::Large => 50,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BusinessSize::Small => "small",
            BusinessSize::Medium => "medium",
            BusinessSize::Large => "large",
        }
    }
}

// ============================================================================
// Infrastructure types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfrastructureType {
    Road,
    School,
    Clinic,
    Market,
    Utility,
}

impl InfrastructureType {
    pub const ALL: [InfrastructureType; 5] = [
        InfrastructureType::Road,
        InfrastructureType::School,
        InfrastructureType::Clinic,
        InfrastructureType::Market,
        InfrastructureType::Utility,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InfrastructureType::Road => "road",
            InfrastructureType::School => "school",
            InfrastructureType::Clinic => "clinic",
            InfrastructureType::Market => "market",
            InfrastructureType::Utility => "utility",
        }
    }

    /// Chebyshev radius within which the facility serves households.
    pub fn coverage_radius(self) -> i32 {
        match self {
            InfrastructureType::Road => 1,
            InfrastructureType::School => 3,
            InfrastructureType::Clinic => 4,
            InfrastructureType::Market => 5,
            InfrastructureType::Utility => 2,
        }
    }

    /// Initial capacity (traffic, students, patients, vendors, connections).
    pub fn base_capacity(self) -> f64 {
        match self {
            InfrastructureType::Road => 1000.0,
            InfrastructureType::School => 200.0,
            InfrastructureType::Clinic => 100.0,
            InfrastructureType::Market => 50.0,
            InfrastructureType::Utility => 500.0,
        }
    }

    pub fn construction_cost(self) -> f64 {
        match self {
            InfrastructureType::Road => 10_000.0,
            InfrastructureType::School => 50_000.0,
            InfrastructureType::Clinic => 30_000.0,
            InfrastructureType::Market => 20_000.0,
            InfrastructureType::Utility => 40_000.0,
        }
    }

    /// Productivity bonus at full quality.
    pub fn base_bonus(self) -> f64 {
        match self {
            InfrastructureType::Road => 0.2,
            InfrastructureType::School => 0.15,
            InfrastructureType::Clinic => 0.1,
            InfrastructureType::Market => 0.25,
            InfrastructureType::Utility => 0.2,
        }
    }

    /// Units per 100 residents the planner aims for.
    pub fn target_per_hundred(self) -> f64 {
        match self {
            InfrastructureType::Road => 0.5,
            InfrastructureType::School => 0.25,
            InfrastructureType::Clinic => 0.2,
            InfrastructureType::Market => 0.15,
            InfrastructureType::Utility => 0.3,
        }
    }
}
