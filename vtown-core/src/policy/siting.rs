//! Site selection for new facilities.
//!
//! Each facility type has its own heuristic. Candidate scans skip cells that
//! already hold the maximum number of facilities, and centroid-based sites
//! move to the nearest open cell.

use rand::Rng;

use crate::agents::InfrastructureView;
use crate::types::{InfrastructureType, Position, chebyshev, euclidean};
use crate::world::World;

pub const ROAD_SEARCH_RADIUS: i32 = 5;
pub const MARKET_CANDIDATES: usize = 50;
pub const UTILITY_SEARCH_RADIUS: i32 = 3;
/// Euclidean reach used to score utility candidates.
pub const UTILITY_SERVICE_DISTANCE: f64 = 3.0;

pub fn find_optimal_location<R: Rng + ?Sized>(world: &World, kind: InfrastructureType, rng: &mut R) -> Position {
    if world.households.is_empty() {
        return world.center();
    }
    let site = match kind {
        InfrastructureType::Road => find_road_connection_point(world),
        InfrastructureType::School | InfrastructureType::Clinic => {
            find_underserved_population_center(world, kind)
        }
        InfrastructureType::Market => find_high_accessibility_location(world, rng),
        InfrastructureType::Utility => find_utility_expansion_point(world),
    };
    tracing::trace!(kind = kind.as_str(), x = site.0, y = site.1, "site chosen");
    site
}

/// Mean household position, rounded half-to-even and clamped to the grid,
/// then moved to the nearest unsaturated cell.
pub fn population_weighted_center(world: &World) -> Position {
    centroid(world, world.households.values().map(|h| h.position)).unwrap_or_else(|| world.center())
}

fn centroid(world: &World, positions: impl Iterator<Item = Position>) -> Option<Position> {
    let (sx, sy, n) = positions.fold((0.0, 0.0, 0usize), |(sx, sy, n), (x, y)| {
        (sx + f64::from(x), sy + f64::from(y), n + 1)
    });
    if n == 0 {
        return None;
    }
    let x = (sx / n as f64).round_ties_even() as i32;
    let y = (sy / n as f64).round_ties_even() as i32;
    Some(nearest_open_cell(world, world.grid.clamp((x, y))))
}

/// Closest cell to `from`, in Chebyshev rings, that can still take a
/// facility. The grid center if every cell is full.
fn nearest_open_cell(world: &World, from: Position) -> Position {
    let (width, height) = world.grid.bounds();
    for radius in 0..width.max(height) {
        let open = world
            .grid
            .neighborhood(from, radius, true)
            .into_iter()
            .find(|cell| chebyshev(*cell, from) == radius && !world.is_saturated(*cell));
        if let Some(cell) = open {
            return cell;
        }
    }
    world.center()
}

/// Cell maximizing distance-weighted household density within a 11x11
/// window. Scans the whole grid.
pub fn find_road_connection_point(world: &World) -> Position {
    let (width, height) = world.grid.bounds();
    let w = width as usize;
    let h = height as usize;
    let idx = |x: i32, y: i32| x as usize * h + y as usize;

    // Each household adds one to its clipped 3x3 block
    let mut density = vec![0.0_f64; w * h];
    for household in world.households.values() {
        for cell in world.grid.neighborhood(household.position, 1, true) {
            density[idx(cell.0, cell.1)] += 1.0;
        }
    }

    let mut best: Option<(f64, Position)> = None;
    for x in 0..width {
        for y in 0..height {
            if world.is_saturated((x, y)) {
                continue;
            }
            let mut score = 0.0;
            for dx in -ROAD_SEARCH_RADIUS..=ROAD_SEARCH_RADIUS {
                for dy in -ROAD_SEARCH_RADIUS..=ROAD_SEARCH_RADIUS {
                    let (nx, ny) = (x + dx, y + dy);
                    if !world.grid.in_bounds((nx, ny)) {
                        continue;
                    }
                    let distance = f64::from(dx * dx + dy * dy).sqrt().max(1.0);
                    score += density[idx(nx, ny)] / distance;
                }
            }
            if best.is_none_or(|(best_score, _)| score > best_score) {
                best = Some((score, (x, y)));
            }
        }
    }
    best.map_or_else(|| world.center(), |(_, pos)| pos)
}

/// Centroid of households no unit of `kind` reaches (Euclidean distance
/// within its coverage radius); the population centroid if all are reached.
pub fn find_underserved_population_center(world: &World, kind: InfrastructureType) -> Position {
    let units: Vec<_> = world
        .infrastructure
        .values()
        .filter(|u| u.infrastructure_type == kind)
        .collect();
    let underserved = world.households.values().map(|h| h.position).filter(|pos| {
        !units
            .iter()
            .any(|u| euclidean(*pos, u.position) <= f64::from(u.coverage_radius))
    });
    centroid(world, underserved).unwrap_or_else(|| population_weighted_center(world))
}

/// Best of a fixed number of uniformly sampled cells, scored by summed
/// inverse distance to every household.
pub fn find_high_accessibility_location<R: Rng + ?Sized>(world: &World, rng: &mut R) -> Position {
    let (width, height) = world.grid.bounds();
    let mut best: Option<(f64, Position)> = None;
    for _ in 0..MARKET_CANDIDATES {
        let candidate = (rng.random_range(0..width), rng.random_range(0..height));
        if world.is_saturated(candidate) {
            continue;
        }
        let accessibility: f64 = world
            .households
            .values()
            .map(|h| 1.0 / euclidean(candidate, h.position).max(1.0))
            .sum();
        if best.is_none_or(|(best_score, _)| accessibility > best_score) {
            best = Some((accessibility, candidate));
        }
    }
    best.map_or_else(|| world.center(), |(_, pos)| pos)
}

/// Grow the utility network: search the 7x7 window around each existing
/// utility for the cell reaching the most households without power.
pub fn find_utility_expansion_point(world: &World) -> Position {
    let utilities: Vec<Position> = world
        .infrastructure
        .values()
        .filter(|u| u.infrastructure_type == InfrastructureType::Utility)
        .map(|u| u.position)
        .collect();
    if utilities.is_empty() {
        return population_weighted_center(world);
    }

    let view: InfrastructureView<'_> = world.infrastructure_view();
    let unpowered: Vec<Position> = world
        .households
        .values()
        .filter(|h| !h.service_access(&view).utility)
        .map(|h| h.position)
        .collect();

    let mut best: Option<(usize, Position)> = None;
    for origin in utilities {
        for dx in -UTILITY_SEARCH_RADIUS..=UTILITY_SEARCH_RADIUS {
            for dy in -UTILITY_SEARCH_RADIUS..=UTILITY_SEARCH_RADIUS {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let candidate = (origin.0 + dx, origin.1 + dy);
                if !world.grid.in_bounds(candidate) || world.is_saturated(candidate) {
                    continue;
                }
                let score = unpowered
                    .iter()
                    .filter(|pos| euclidean(candidate, **pos) <= UTILITY_SERVICE_DISTANCE)
                    .count();
                if best.is_none_or(|(best_score, _)| score > best_score) {
                    best = Some((score, candidate));
                }
            }
        }
    }
    best.map_or_else(|| population_weighted_center(world), |(_, pos)| pos)
}
