use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use super::{Agent, HouseholdUnit, InfrastructureUnit, InfrastructureView, ServiceAccess};
use crate::grid::SpatialGrid;
use crate::sampling::{chance, choose_weighted, gaussian, uniform};
use crate::types::{AgentRef, BusinessId, BusinessSize, HouseholdId, InfrastructureId, Position, Sector};

pub const ROAD_PRODUCTIVITY_FACTOR: f64 = 1.3;
pub const UTILITY_PRODUCTIVITY_FACTOR: f64 = 1.2;
pub const MARKET_PRODUCTIVITY_FACTOR: f64 = 1.1;

pub const WAGE_PER_EMPLOYEE: f64 = 2000.0;
pub const GRID_POWER_COST: f64 = 500.0;
pub const OFF_GRID_POWER_COST: f64 = 200.0;

pub const HIRING_PROFIT_THRESHOLD: f64 = 5000.0;
pub const HIRING_RADIUS: i32 = 5;
pub const HIRING_PROBABILITY: f64 = 0.3;

/// A firm. Grows in size only; never sheds staff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessUnit {
    pub id: BusinessId,
    pub position: Position,
    pub business_type: Sector,
    pub size: BusinessSize,
    /// Intrinsic productivity before infrastructure.
    pub productivity: f64,
    /// Productivity after this tick's infrastructure multipliers.
    pub current_productivity: f64,
    pub capital: f64,
    pub max_employees: u32,
    pub current_employees: u32,
    pub revenue: f64,
    pub profit: f64,
}

pub struct BusinessEnv<'a> {
    pub grid: &'a SpatialGrid,
    pub households: &'a SlotMap<HouseholdId, HouseholdUnit>,
    pub infrastructure: &'a SlotMap<InfrastructureId, InfrastructureUnit>,
    pub rng: &'a mut StdRng,
}

impl BusinessUnit {
    pub fn new(id: BusinessId, position: Position, business_type: Sector, size: BusinessSize) -> Self {
        Self {
            id,
            position,
            business_type,
            size,
            productivity: 1.0,
            current_productivity: 1.0,
            capital: 0.0,
            max_employees: size.max_employees(),
            current_employees: 0,
            revenue: 0.0,
            profit: 0.0,
        }
    }

    /// Draw size, productivity and starting capital.
    pub fn generate<R: Rng + ?Sized>(
        id: BusinessId,
        position: Position,
        business_type: Sector,
        rng: &mut R,
    ) -> Self {
        let size = choose_weighted(
            rng,
            &[
                (BusinessSize::Small, 0.7),
                (BusinessSize::Medium, 0.25),
                (BusinessSize::Large, 0.05),
            ],
        )
        .unwrap_or(BusinessSize::Small);
        let productivity = uniform(rng, 0.5, 1.5);
        let capital = match size {
            BusinessSize::Large => gaussian(rng, 50_000.0, 20_000.0),
            BusinessSize::Medium => gaussian(rng, 20_000.0, 10_000.0),
            BusinessSize::Small => gaussian(rng, 5_000.0, 2_000.0),
        };

        let mut business = Self::new(id, position, business_type, size);
        business.productivity = productivity;
        business.current_productivity = productivity;
        business.capital = capital;
        business
    }

    pub fn with_productivity(mut self, productivity: f64) -> Self {
        self.productivity = productivity;
        self.current_productivity = productivity;
        self
    }

    pub fn with_employees(mut self, employees: u32) -> Self {
        self.current_employees = employees.min(self.max_employees);
        self
    }

    pub fn update_productivity(&mut self, access: ServiceAccess) {
        let mut productivity = self.productivity;
        if access.road {
            productivity *= ROAD_PRODUCTIVITY_FACTOR;
        }
        if access.utility {
            productivity *= UTILITY_PRODUCTIVITY_FACTOR;
        }
        if access.market {
            productivity *= MARKET_PRODUCTIVITY_FACTOR;
        }
        self.current_productivity = productivity;
    }

    pub fn calculate_revenue(&mut self, access: ServiceAccess) {
        let staffing = 1.0 + f64::from(self.current_employees) * 0.1;
        self.revenue = self.business_type.base_revenue() * self.current_productivity * staffing;

        let wages = f64::from(self.current_employees) * WAGE_PER_EMPLOYEE;
        let power = if access.utility {
            GRID_POWER_COST
        } else {
            OFF_GRID_POWER_COST
        };
        self.profit = self.revenue - wages - power;
    }

    /// Take on one worker if profitable, below capacity, and someone in the
    /// sector lives nearby.
    pub fn hire_employees<R: Rng + ?Sized>(
        &mut self,
        grid: &SpatialGrid,
        households: &SlotMap<HouseholdId, HouseholdUnit>,
        rng: &mut R,
    ) -> bool {
        if self.profit <= HIRING_PROFIT_THRESHOLD || self.current_employees >= self.max_employees {
            return false;
        }
        let available = grid
            .neighbors(self.position, HIRING_RADIUS, true)
            .into_iter()
            .any(|agent| match agent {
                AgentRef::Household(id) => households
                    .get(id)
                    .is_some_and(|h| h.sector == self.business_type),
                _ => false,
            });
        if available && chance(rng, HIRING_PROBABILITY) {
            self.current_employees += 1;
            true
        } else {
            false
        }
    }

    pub fn consider_expansion<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.profit > 20_000.0 && self.size == BusinessSize::Small {
            if chance(rng, 0.1) {
                self.grow(BusinessSize::Medium, 2.0);
            }
        } else if self.profit > 50_000.0 && self.size == BusinessSize::Medium && chance(rng, 0.05) {
            self.grow(BusinessSize::Large, 3.0);
        }
    }

    fn grow(&mut self, size: BusinessSize, capital_factor: f64) {
        if size <= self.size {
            return;
        }
        tracing::debug!(business = ?self.id, from = self.size.as_str(), to = size.as_str(), "business expanded");
        self.size = size;
        self.max_employees = size.max_employees();
        self.capital *= capital_factor;
    }
}

impl Agent for BusinessUnit {
    type Env<'a> = BusinessEnv<'a>;

    fn step(&mut self, env: BusinessEnv<'_>) {
        let access = InfrastructureView::new(env.grid, env.infrastructure).access(self.position);
        self.update_productivity(access);
        self.calculate_revenue(access);
        self.hire_employees(env.grid, env.households, env.rng);
        self.consider_expansion(env.rng);
    }

    fn position(&self) -> Position {
        self.position
    }
}
