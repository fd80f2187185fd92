use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use super::{Agent, InfrastructureUnit, InfrastructureView, ServiceAccess, URBAN_RADIUS};
use crate::config::SimConfig;
use crate::grid::SpatialGrid;
use crate::sampling::{chance, choose, choose_weighted, gaussian, uniform};
use crate::types::{AgentRef, HouseholdId, InfrastructureId, Position, Sector, euclidean};

// === CONSTANTS ===

/// Ticks a flood-affected household needs before it recovers.
pub const FLOOD_RECOVERY_TICKS: u64 = 5;
/// Share of savings left after a flood.
pub const FLOOD_SAVINGS_RETAINED: f64 = 0.4;
pub const FLOOD_INCOME_FACTOR: f64 = 0.6;
pub const LANDLESS_FARM_INCOME_FACTOR: f64 = 0.7;
pub const COOPERATIVE_INCOME_FACTOR: f64 = 1.15;

pub const REMITTANCE_MEAN: f64 = 2000.0;
pub const REMITTANCE_SD: f64 = 500.0;

pub const MIGRATION_SEARCH_RADIUS: i32 = 2;
/// Cells holding this many agents are full.
pub const MAX_CELL_OCCUPANCY: usize = 5;
pub const INCOME_POTENTIAL_INFRA_RADIUS: i32 = 3;

pub const MAX_EDUCATION: u8 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

// === HOUSEHOLD ===

/// A family unit: earns, saves, invests in schooling and health, may move
/// toward better-paying cells and may leave farming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HouseholdUnit {
    pub id: HouseholdId,
    pub position: Position,
    pub household_size: u32,
    pub age_head: u32,
    pub gender_head: Gender,
    pub sector: Sector,
    /// Monthly income.
    pub income: f64,
    pub savings: f64,
    pub education_level: u8,
    pub health_index: f64,
    /// Resistance to moving, 0..1.
    pub rural_attachment: f64,
    /// Income multiple a new cell must offer before moving.
    pub migration_threshold: f64,
    pub risk_tolerance: f64,
    pub social_capital: f64,

    // Inclusion flags
    pub has_microfinance_access: bool,
    pub has_offgrid_electricity: bool,
    pub receives_remittances: bool,
    pub is_cooperative_member: bool,
    pub is_landless: bool,

    pub flood_affected: bool,
    pub last_flood_step: Option<u64>,
}

pub struct HouseholdEnv<'a> {
    pub grid: &'a mut SpatialGrid,
    pub infrastructure: &'a SlotMap<InfrastructureId, InfrastructureUnit>,
    pub config: &'a SimConfig,
    pub rng: &'a mut StdRng,
    pub tick: u64,
}

impl HouseholdUnit {
    /// A household with neutral attributes and no inclusion flags.
    pub fn new(id: HouseholdId, position: Position, sector: Sector) -> Self {
        Self {
            id,
            position,
            household_size: 4,
            age_head: 40,
            gender_head: Gender::Male,
            sector,
            income: 0.0,
            savings: 0.0,
            education_level: 0,
            health_index: 1.0,
            rural_attachment: 0.5,
            migration_threshold: 1.5,
            risk_tolerance: 0.5,
            social_capital: 0.5,
            has_microfinance_access: false,
            has_offgrid_electricity: false,
            receives_remittances: false,
            is_cooperative_member: false,
            is_landless: false,
            flood_affected: false,
            last_flood_step: None,
        }
    }

    /// Draw a household from the configured distributions.
    pub fn generate<R: Rng + ?Sized>(
        id: HouseholdId,
        position: Position,
        config: &SimConfig,
        rng: &mut R,
    ) -> Self {
        let [size_lo, size_hi] = config.household_size_range;
        let household_size = if size_hi > size_lo {
            rng.random_range(size_lo..=size_hi)
        } else {
            size_lo
        };
        let age_head = rng.random_range(20..65);
        let gender_head = if chance(rng, 0.7) { Gender::Male } else { Gender::Female };
        let sector = choose_weighted(rng, &config.initial_sector_distribution.weighted())
            .unwrap_or(Sector::Agriculture);

        let wage = config.wage(sector);
        let income = gaussian(rng, wage, wage * 0.15);
        let savings = gaussian(rng, income, income * 0.6).max(0.0);

        let has_microfinance_access = chance(rng, config.microfinance_membership_rate);
        let has_offgrid_electricity = chance(rng, config.offgrid_electric_share);
        let receives_remittances = chance(rng, config.remittance_receiving_rate);
        let is_cooperative_member = chance(rng, config.cooperative_membership_rate);
        let is_landless = chance(rng, config.landless_household_rate);

        let [edu_lo, edu_hi] = config.education_range;
        let education_level = if edu_hi > edu_lo {
            rng.random_range(edu_lo..=edu_hi)
        } else {
            edu_lo
        }
        .min(MAX_EDUCATION);
        let [h_lo, h_hi] = config.health_range;
        let health_index = uniform(rng, h_lo, h_hi).clamp(0.0, 1.0);
        let [ra_lo, ra_hi] = config.rural_attachment_range;
        let rural_attachment = uniform(rng, ra_lo, ra_hi);
        let [mt_lo, mt_hi] = config.migration_threshold_range;
        let migration_threshold = uniform(rng, mt_lo, mt_hi);

        let risk_tolerance = uniform(rng, 0.1, 0.9);
        let social_capital = uniform(rng, 0.1, 1.0);

        Self {
            id,
            position,
            household_size,
            age_head,
            gender_head,
            sector,
            income,
            savings,
            education_level,
            health_index,
            rural_attachment,
            migration_threshold,
            risk_tolerance,
            social_capital,
            has_microfinance_access,
            has_offgrid_electricity,
            receives_remittances,
            is_cooperative_member,
            is_landless,
            flood_affected: false,
            last_flood_step: None,
        }
    }

    pub fn with_income(mut self, income: f64) -> Self {
        self.income = income;
        self
    }

    pub fn with_savings(mut self, savings: f64) -> Self {
        self.savings = savings.max(0.0);
        self
    }

    pub fn with_education(mut self, level: u8) -> Self {
        self.education_level = level.min(MAX_EDUCATION);
        self
    }

    pub fn with_health(mut self, health: f64) -> Self {
        self.health_index = health.clamp(0.0, 1.0);
        self
    }

    pub fn is_urban(&self, center: Position) -> bool {
        euclidean(self.position, center) <= URBAN_RADIUS
    }

    /// Road, market and utility access; off-grid power counts as utility.
    pub fn service_access(&self, view: &InfrastructureView<'_>) -> ServiceAccess {
        let mut access = view.access(self.position);
        access.utility |= self.has_offgrid_electricity;
        access
    }

    // === DECISIONS ===

    /// Flood shock or recovery. One draw is consumed every call.
    pub fn check_flood_effects<R: Rng + ?Sized>(&mut self, config: &SimConfig, tick: u64, rng: &mut R) {
        let hit = chance(rng, config.flood_risk_probability);
        if hit && !self.flood_affected {
            self.flood_affected = true;
            self.last_flood_step = Some(tick);
            self.savings *= FLOOD_SAVINGS_RETAINED;
        } else if self.flood_affected {
            let since = self.last_flood_step.map_or(u64::MAX, |at| tick.saturating_sub(at));
            if since >= FLOOD_RECOVERY_TICKS {
                self.flood_affected = false;
            }
        }
    }

    pub fn update_income<R: Rng + ?Sized>(
        &mut self,
        view: &InfrastructureView<'_>,
        config: &SimConfig,
        rng: &mut R,
    ) {
        let multipliers = &config.productivity_multipliers;
        let access = self.service_access(view);

        let mut infrastructure = 1.0;
        if access.road {
            infrastructure *= multipliers.infrastructure_road;
        }
        if access.market {
            infrastructure *= multipliers.infrastructure_market;
        }
        if access.utility {
            infrastructure *= multipliers.infrastructure_utility;
        }

        let education = 1.0 + f64::from(self.education_level) * multipliers.education_factor;
        let health = 0.5 + self.health_index * multipliers.health_factor;
        let noise = gaussian(rng, 1.0, config.random_variation.income);

        let mut adjustment = 1.0;
        if self.is_landless && self.sector == Sector::Agriculture {
            adjustment *= LANDLESS_FARM_INCOME_FACTOR;
        }
        if self.is_cooperative_member {
            adjustment *= COOPERATIVE_INCOME_FACTOR;
        }
        if self.sector != Sector::Agriculture && self.is_urban(view.grid.center()) {
            adjustment *= config.rural_urban_wage_multiplier;
        }
        if self.flood_affected {
            adjustment *= FLOOD_INCOME_FACTOR;
        }

        self.income = config.wage(self.sector) * infrastructure * education * health * noise * adjustment;

        if self.receives_remittances {
            self.income += gaussian(rng, REMITTANCE_MEAN, REMITTANCE_SD).max(0.0);
        }

        let consumption = self.income * config.consumption_rate;
        self.savings = (self.savings + (self.income - consumption)).max(0.0);
    }

    /// Expected earnings at a cell from centrality and nearby facilities.
    pub fn income_potential(view: &InfrastructureView<'_>, pos: Position) -> f64 {
        let distance = euclidean(pos, view.grid.center());
        let urban_bonus = (1.0 - distance / 20.0).max(0.0);
        let infrastructure_score = view.bonus_within(pos, INCOME_POTENTIAL_INFRA_RADIUS);
        1000.0 + urban_bonus * 2000.0 + infrastructure_score * 500.0
    }

    /// Move to the first neighbouring cell that pays enough better. Returns
    /// the new position if the household moved.
    pub fn consider_migration<R: Rng + ?Sized>(
        &mut self,
        grid: &mut SpatialGrid,
        infrastructure: &SlotMap<InfrastructureId, InfrastructureUnit>,
        rng: &mut R,
    ) -> Option<Position> {
        // Farmers are tied to their land
        if self.sector == Sector::Agriculture {
            return None;
        }

        let target = {
            let view = InfrastructureView::new(grid, infrastructure);
            let current = Self::income_potential(&view, self.position);
            let mut target = None;
            for cell in grid.neighborhood(self.position, MIGRATION_SEARCH_RADIUS, false) {
                if Self::income_potential(&view, cell) <= current * self.migration_threshold {
                    continue;
                }
                if grid.cell_contents(cell).len() >= MAX_CELL_OCCUPANCY {
                    continue;
                }
                if chance(rng, 1.0 - self.rural_attachment) {
                    target = Some(cell);
                    break;
                }
            }
            target
        }?;

        if grid.move_agent(AgentRef::Household(self.id), self.position, target) {
            tracing::trace!(household = ?self.id, from = ?self.position, to = ?target, "household migrated");
            self.position = target;
            Some(target)
        } else {
            None
        }
    }

    pub fn make_education_investment<R: Rng + ?Sized>(&mut self, config: &SimConfig, rng: &mut R) {
        if self.savings <= 1000.0 || self.education_level >= MAX_EDUCATION {
            return;
        }
        let mut cost = config.education_cost_multiplier * f64::from(self.education_level + 1);
        let mut probability = config.education_investment_probability;
        if self.is_cooperative_member {
            probability *= 1.3;
            cost *= 0.8;
        }
        if self.flood_affected {
            probability *= 0.5;
        }
        if self.savings > cost && chance(rng, probability) {
            self.savings -= cost;
            self.education_level += 1;
        }
    }

    pub fn make_health_investment<R: Rng + ?Sized>(&mut self, config: &SimConfig, rng: &mut R) {
        if self.health_index >= 0.8 || self.savings <= 500.0 {
            return;
        }
        let mut cost = config.health_investment_cost;
        let mut probability = config.health_investment_probability;
        if self.has_microfinance_access {
            probability *= 1.4;
            cost *= 0.9;
        }
        if self.flood_affected {
            probability *= 1.2;
        }
        if chance(rng, probability) {
            self.savings = (self.savings - cost).max(0.0);
            self.health_index = (self.health_index + config.health_improvement_per_investment).min(1.0);
        }
    }

    pub fn consider_sector_change<R: Rng + ?Sized>(&mut self, center: Position, rng: &mut R) {
        match self.sector {
            Sector::Agriculture if self.education_level >= 8 => {
                let mut probability = 0.1;
                if self.is_landless {
                    probability *= 2.0;
                }
                if self.is_cooperative_member {
                    probability *= 1.3;
                }
                if self.flood_affected {
                    probability *= 1.5;
                }
                if chance(rng, probability) {
                    self.sector = choose(rng, &Sector::NON_AGRICULTURAL).unwrap_or(Sector::Services);
                }
            }
            Sector::Manufacturing if self.education_level >= 10 => {
                let mut probability = 0.05;
                if self.is_urban(center) {
                    probability *= 2.0;
                }
                if chance(rng, probability) {
                    self.sector = Sector::Services;
                }
            }
            _ => {}
        }
    }
}

impl Agent for HouseholdUnit {
    type Env<'a> = HouseholdEnv<'a>;

    fn step(&mut self, env: HouseholdEnv<'_>) {
        let HouseholdEnv {
            grid,
            infrastructure,
            config,
            rng,
            tick,
        } = env;

        self.check_flood_effects(config, tick, rng);
        self.update_income(&InfrastructureView::new(grid, infrastructure), config, rng);
        self.consider_migration(grid, infrastructure, rng);
        self.make_education_investment(config, rng);
        self.make_health_investment(config, rng);
        self.consider_sector_change(grid.center(), rng);
    }

    fn position(&self) -> Position {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InfrastructureType;
    use rand::SeedableRng;

    struct Fixture {
        grid: SpatialGrid,
        infrastructure: SlotMap<InfrastructureId, InfrastructureUnit>,
        households: SlotMap<HouseholdId, ()>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                grid: SpatialGrid::new(50, 50),
                infrastructure: SlotMap::with_key(),
                households: SlotMap::with_key(),
            }
        }

        fn household(&mut self, pos: Position, sector: Sector) -> HouseholdUnit {
            let id = self.households.insert(());
            self.grid.place(AgentRef::Household(id), pos);
            HouseholdUnit::new(id, pos, sector)
        }

        fn build(&mut self, pos: Position, kind: InfrastructureType) {
            let id = self
                .infrastructure
                .insert_with_key(|id| InfrastructureUnit::new(id, pos, kind));
            self.grid.place(AgentRef::Infrastructure(id), pos);
        }

        fn view(&self) -> InfrastructureView<'_> {
            InfrastructureView::new(&self.grid, &self.infrastructure)
        }

        /// Fill a cell with other households.
        fn crowd(&mut self, pos: Position, count: usize) {
            for _ in 0..count {
                let id = self.households.insert(());
                self.grid.place(AgentRef::Household(id), pos);
            }
        }
    }

    /// Share of independent draws in which `household` leaves its sector.
    fn switch_rate(household: &HouseholdUnit, center: Position, trials: u32) -> f64 {
        let mut rng = StdRng::seed_from_u64(42);
        let switched = (0..trials)
            .filter(|_| {
                let mut trial = household.clone();
                trial.consider_sector_change(center, &mut rng);
                trial.sector != household.sector
            })
            .count();
        switched as f64 / f64::from(trials)
    }

    fn quiet_config() -> SimConfig {
        let mut config = SimConfig::default();
        config.random_variation.income = 0.0;
        config
    }

    #[test]
    fn test_savings_grow_by_unconsumed_income() {
        let mut fx = Fixture::new();
        let mut config = quiet_config();
        config.base_wages.agriculture = 3000.0;
        config.productivity_multipliers.health_factor = 0.5;
        let mut household = fx.household((2, 2), Sector::Agriculture).with_savings(100.0);
        let mut rng = StdRng::seed_from_u64(1);

        household.update_income(&fx.view(), &config, &mut rng);

        assert!((household.income - 3000.0).abs() < 1e-9);
        assert!((household.savings - (100.0 + 3000.0 * 0.2)).abs() < 1e-9);
    }

    #[test]
    fn test_infrastructure_and_flags_multiply_income() {
        let mut fx = Fixture::new();
        let config = quiet_config();
        fx.build((3, 3), InfrastructureType::Road);
        fx.build((4, 4), InfrastructureType::Market);
        let mut household = fx.household((2, 2), Sector::Agriculture);
        household.is_landless = true;
        household.flood_affected = true;
        let mut rng = StdRng::seed_from_u64(2);

        household.update_income(&fx.view(), &config, &mut rng);

        let expected = 2500.0 * 1.2 * 1.15 * LANDLESS_FARM_INCOME_FACTOR * FLOOD_INCOME_FACTOR;
        assert!((household.income - expected).abs() < 1e-6);
    }

    #[test]
    fn test_flood_shock_and_recovery() {
        let mut config = quiet_config();
        config.flood_risk_probability = 1.0;
        let mut fx = Fixture::new();
        let mut household = fx.household((1, 1), Sector::Agriculture).with_savings(1000.0);
        let mut rng = StdRng::seed_from_u64(3);

        household.check_flood_effects(&config, 3, &mut rng);
        assert!(household.flood_affected);
        assert_eq!(household.last_flood_step, Some(3));
        assert!((household.savings - 400.0).abs() < 1e-9);

        // Still affected: no second shock, no recovery yet
        household.check_flood_effects(&config, 7, &mut rng);
        assert!(household.flood_affected);
        assert!((household.savings - 400.0).abs() < 1e-9);

        household.check_flood_effects(&config, 8, &mut rng);
        assert!(!household.flood_affected);
    }

    #[test]
    fn test_farmers_never_migrate() {
        let mut fx = Fixture::new();
        fx.build((26, 26), InfrastructureType::Market);
        let mut household = fx.household((24, 24), Sector::Agriculture);
        household.rural_attachment = 0.0;
        household.migration_threshold = 0.5;
        let mut rng = StdRng::seed_from_u64(4);

        let moved = household.consider_migration(&mut fx.grid, &fx.infrastructure, &mut rng);
        assert_eq!(moved, None);
        assert_eq!(household.position, (24, 24));
    }

    #[test]
    fn test_migration_takes_first_better_cell() {
        let mut fx = Fixture::new();
        let mut household = fx.household((18, 18), Sector::Services);
        household.rural_attachment = 0.0;
        household.migration_threshold = 1.0;
        let mut rng = StdRng::seed_from_u64(5);

        // Centre is (25, 25); scanning x outer, y inner, (17, 20) is the
        // first cell nearer the centre than (18, 18).
        let moved = household.consider_migration(&mut fx.grid, &fx.infrastructure, &mut rng);
        assert_eq!(moved, Some((17, 20)));
        let view = fx.view();
        assert!(
            HouseholdUnit::income_potential(&view, (17, 20))
                > HouseholdUnit::income_potential(&view, (18, 18))
        );
        assert_eq!(household.position, (17, 20));
        assert_eq!(fx.grid.cell_contents((17, 20)), &[AgentRef::Household(household.id)]);
        assert!(fx.grid.cell_contents((18, 18)).is_empty());
    }

    #[test]
    fn test_migration_skips_full_cell() {
        let mut fx = Fixture::new();
        let mut household = fx.household((18, 18), Sector::Services);
        household.rural_attachment = 0.0;
        household.migration_threshold = 1.0;
        fx.crowd((17, 20), MAX_CELL_OCCUPANCY);
        let mut rng = StdRng::seed_from_u64(5);

        // (18, 19) is the next cell nearer the centre in scan order
        let moved = household.consider_migration(&mut fx.grid, &fx.infrastructure, &mut rng);
        assert_eq!(moved, Some((18, 19)));
        assert_eq!(fx.grid.cell_contents((17, 20)).len(), MAX_CELL_OCCUPANCY);
        assert_eq!(fx.grid.cell_contents((18, 19)), &[AgentRef::Household(household.id)]);
    }

    #[test]
    fn test_full_rural_attachment_never_migrates() {
        let mut fx = Fixture::new();
        let mut household = fx.household((18, 18), Sector::Manufacturing);
        household.rural_attachment = 1.0;
        household.migration_threshold = 1.0;
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..500 {
            assert_eq!(household.consider_migration(&mut fx.grid, &fx.infrastructure, &mut rng), None);
        }
        assert_eq!(household.position, (18, 18));
        assert_eq!(fx.grid.cell_contents((18, 18)), &[AgentRef::Household(household.id)]);
    }

    #[test]
    fn test_education_investment_deducts_cost() {
        let mut config = quiet_config();
        config.education_investment_probability = 1.0;
        config.education_cost_multiplier = 500.0;
        let mut fx = Fixture::new();
        let mut rng = StdRng::seed_from_u64(12);

        // Fourth year of schooling costs 500 * 4
        let mut household = fx
            .household((1, 1), Sector::Agriculture)
            .with_education(3)
            .with_savings(5000.0);
        household.make_education_investment(&config, &mut rng);
        assert_eq!(household.education_level, 4);
        assert_eq!(household.savings, 3000.0);

        // Cooperative members pay 80%
        let mut member = fx
            .household((2, 2), Sector::Agriculture)
            .with_education(3)
            .with_savings(5000.0);
        member.is_cooperative_member = true;
        member.make_education_investment(&config, &mut rng);
        assert_eq!(member.education_level, 4);
        assert_eq!(member.savings, 3400.0);
    }

    #[test]
    fn test_no_education_investment_below_cost() {
        let mut config = quiet_config();
        config.education_investment_probability = 1.0;
        config.education_cost_multiplier = 500.0;
        let mut fx = Fixture::new();
        let mut household = fx
            .household((1, 1), Sector::Agriculture)
            .with_education(3)
            .with_savings(1500.0);
        let mut rng = StdRng::seed_from_u64(13);

        for _ in 0..10 {
            household.make_education_investment(&config, &mut rng);
        }
        assert_eq!(household.education_level, 3);
        assert_eq!(household.savings, 1500.0);
    }

    #[test]
    fn test_sector_change_needs_schooling() {
        let mut fx = Fixture::new();
        let center = fx.grid.center();

        let mut farmer = fx.household((1, 1), Sector::Agriculture).with_education(7);
        farmer.is_landless = true;
        farmer.is_cooperative_member = true;
        farmer.flood_affected = true;
        assert_eq!(switch_rate(&farmer, center, 2000), 0.0);

        let worker = fx.household(center, Sector::Manufacturing).with_education(9);
        assert_eq!(switch_rate(&worker, center, 2000), 0.0);

        let clerk = fx.household(center, Sector::Services).with_education(MAX_EDUCATION);
        assert_eq!(switch_rate(&clerk, center, 2000), 0.0);
    }

    #[test]
    fn test_farm_exit_rate_stacks_multipliers() {
        let mut fx = Fixture::new();
        let center = fx.grid.center();
        let mut farmer = fx.household((1, 1), Sector::Agriculture).with_education(8);

        let base = switch_rate(&farmer, center, 20_000);
        assert!((base - 0.1).abs() < 0.01, "base rate {base}");

        farmer.is_landless = true;
        farmer.is_cooperative_member = true;
        farmer.flood_affected = true;
        let amplified = switch_rate(&farmer, center, 20_000);
        assert!((amplified - 0.1 * 2.0 * 1.3 * 1.5).abs() < 0.02, "amplified rate {amplified}");

        let mut rng = StdRng::seed_from_u64(14);
        for _ in 0..200 {
            let mut trial = farmer.clone();
            trial.consider_sector_change(center, &mut rng);
            assert!(trial.sector == Sector::Agriculture || Sector::NON_AGRICULTURAL.contains(&trial.sector));
        }
    }

    #[test]
    fn test_urban_manufacturing_moves_to_services_twice_as_often() {
        let mut fx = Fixture::new();
        let center = fx.grid.center();
        let rural = fx.household((1, 1), Sector::Manufacturing).with_education(10);
        let urban = fx.household(center, Sector::Manufacturing).with_education(10);
        assert!(!rural.is_urban(center));
        assert!(urban.is_urban(center));

        let rural_rate = switch_rate(&rural, center, 20_000);
        let urban_rate = switch_rate(&urban, center, 20_000);
        assert!((rural_rate - 0.05).abs() < 0.008, "rural rate {rural_rate}");
        assert!((urban_rate - 0.1).abs() < 0.01, "urban rate {urban_rate}");

        let mut trial = urban.clone();
        let mut rng = StdRng::seed_from_u64(15);
        while trial.sector == Sector::Manufacturing {
            trial.consider_sector_change(center, &mut rng);
        }
        assert_eq!(trial.sector, Sector::Services);
    }

    #[test]
    fn test_education_investment_bounded() {
        let mut config = quiet_config();
        config.education_investment_probability = 1.0;
        config.education_cost_multiplier = 10.0;
        let mut fx = Fixture::new();
        let mut household = fx.household((1, 1), Sector::Agriculture).with_savings(1_000_000.0);
        let mut rng = StdRng::seed_from_u64(6);

        for _ in 0..30 {
            household.make_education_investment(&config, &mut rng);
        }
        assert_eq!(household.education_level, MAX_EDUCATION);
    }

    #[test]
    fn test_health_investment_keeps_invariants() {
        let mut config = quiet_config();
        config.health_investment_probability = 1.0;
        config.health_investment_cost = 10_000.0;
        config.health_improvement_per_investment = 0.5;
        let mut fx = Fixture::new();
        let mut household = fx
            .household((1, 1), Sector::Agriculture)
            .with_health(0.7)
            .with_savings(600.0);
        let mut rng = StdRng::seed_from_u64(7);

        household.make_health_investment(&config, &mut rng);
        assert_eq!(household.health_index, 1.0);
        assert_eq!(household.savings, 0.0);
    }

    #[test]
    fn test_generated_households_respect_ranges() {
        let config = SimConfig::default();
        let mut keys: SlotMap<HouseholdId, ()> = SlotMap::with_key();
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..200 {
            let h = HouseholdUnit::generate(keys.insert(()), (0, 0), &config, &mut rng);
            assert!((2..=8).contains(&h.household_size));
            assert!((20..65).contains(&h.age_head));
            assert!(h.education_level <= MAX_EDUCATION);
            assert!((0.3..=1.0).contains(&h.health_index));
            assert!(h.savings >= 0.0);
            assert!(!h.is_landless);
        }
    }
}
