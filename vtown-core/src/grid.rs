// Spatial index: a bounded multi-occupancy grid

use crate::types::{AgentRef, Position};

/// Non-toroidal grid of cells, each holding any number of agents.
///
/// Neighbourhoods are Moore (Chebyshev) squares clipped at the bounds and
/// enumerated in a fixed order: x outer, y inner. Callers that take "the
/// first qualifying cell" depend on that order.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    width: i32,
    height: i32,
    cells: Vec<Vec<AgentRef>>,
}

impl SpatialGrid {
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let len = usize::try_from(width * height).unwrap_or(0);
        Self {
            width,
            height,
            cells: vec![Vec::new(); len],
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn bounds(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    /// Town centre, using integer halves of the dimensions.
    pub fn center(&self) -> Position {
        (self.width / 2, self.height / 2)
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.0 >= 0 && pos.0 < self.width && pos.1 >= 0 && pos.1 < self.height
    }

    pub fn clamp(&self, pos: Position) -> Position {
        (pos.0.clamp(0, self.width - 1), pos.1.clamp(0, self.height - 1))
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if self.in_bounds(pos) {
            usize::try_from(pos.0 * self.height + pos.1).ok()
        } else {
            None
        }
    }

    /// Put an agent into a cell. Out-of-bounds positions are clamped.
    pub fn place(&mut self, agent: AgentRef, pos: Position) -> Position {
        let pos = self.clamp(pos);
        if let Some(idx) = self.index(pos) {
            self.cells[idx].push(agent);
        }
        pos
    }

    pub fn remove(&mut self, agent: AgentRef, pos: Position) -> bool {
        let Some(idx) = self.index(pos) else {
            return false;
        };
        let cell = &mut self.cells[idx];
        match cell.iter().position(|a| *a == agent) {
            Some(i) => {
                cell.remove(i);
                true
            }
            None => false,
        }
    }

    /// Move an agent between cells. Returns false (and leaves the grid
    /// untouched) if the agent is not at `from` or `to` is out of bounds.
    pub fn move_agent(&mut self, agent: AgentRef, from: Position, to: Position) -> bool {
        if !self.in_bounds(to) || !self.remove(agent, from) {
            return false;
        }
        self.place(agent, to);
        true
    }

    pub fn cell_contents(&self, pos: Position) -> &[AgentRef] {
        match self.index(pos) {
            Some(idx) => &self.cells[idx],
            None => &[],
        }
    }

    /// Number of infrastructure units sharing a cell.
    pub fn infrastructure_count(&self, pos: Position) -> usize {
        self.cell_contents(pos)
            .iter()
            .filter(|a| a.is_infrastructure())
            .count()
    }

    /// Cells within Chebyshev `radius` of `pos`.
    pub fn neighborhood(&self, pos: Position, radius: i32, include_center: bool) -> Vec<Position> {
        let mut cells = Vec::new();
        for x in (pos.0 - radius).max(0)..=(pos.0 + radius).min(self.width - 1) {
            for y in (pos.1 - radius).max(0)..=(pos.1 + radius).min(self.height - 1) {
                if !include_center && (x, y) == pos {
                    continue;
                }
                cells.push((x, y));
            }
        }
        cells
    }

    /// Agents within Chebyshev `radius` of `pos`.
    pub fn neighbors(&self, pos: Position, radius: i32, include_center: bool) -> Vec<AgentRef> {
        self.neighborhood(pos, radius, include_center)
            .into_iter()
            .flat_map(|cell| self.cell_contents(cell).iter().copied())
            .collect()
    }

    /// Iterate agents within Chebyshev `radius` without allocating.
    pub fn for_each_neighbor(
        &self,
        pos: Position,
        radius: i32,
        include_center: bool,
        mut f: impl FnMut(AgentRef),
    ) {
        for x in (pos.0 - radius).max(0)..=(pos.0 + radius).min(self.width - 1) {
            for y in (pos.1 - radius).max(0)..=(pos.1 + radius).min(self.height - 1) {
                if !include_center && (x, y) == pos {
                    continue;
                }
                for agent in self.cell_contents((x, y)) {
                    f(*agent);
                }
            }
        }
    }
}
