use biosim_types::{AgentIndex, Area, Coord, GridSnapshot, Occupant};
use rand::Rng;
use thiserror::Error;

/// Random draws before `random_empty_cell` falls back to scanning every cell.
const PLACEMENT_DRAWS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("cell {coord:?} is outside the grid")]
    OutOfBounds { coord: Coord },
    #[error("cell {coord:?} is already occupied")]
    CellOccupied { coord: Coord },
    #[error("{agent:?} is not on the grid")]
    UnknownAgent { agent: AgentIndex },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved(Coord),
    /// The clamped target held a barrier or another agent, or was the agent's own cell.
    Blocked,
}

/// Dense occupancy grid. Row-major with `y * width + x`; every cell holds at most one occupant.
#[derive(Debug, Clone)]
pub struct Grid {
    width: u32,
    height: u32,
    cells: Vec<Option<Occupant>>,
    roster: Vec<Coord>,
}

impl Grid {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width as usize * height as usize],
            roster: Vec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Marks every cell of every area as a barrier. Cells outside the grid are ignored.
    pub fn paint_barriers(&mut self, barriers: &[Area]) {
        for barrier in barriers {
            for cell in barrier.cells() {
                if let Some(idx) = self.cell_index(cell) {
                    self.cells[idx] = Some(Occupant::Barrier);
                }
            }
        }
    }

    pub fn occupant_at(&self, coord: Coord) -> Option<Occupant> {
        self.cell_index(coord).and_then(|idx| self.cells[idx])
    }

    pub fn is_empty_at(&self, coord: Coord) -> bool {
        self.cell_index(coord)
            .is_some_and(|idx| self.cells[idx].is_none())
    }

    pub fn agent_count(&self) -> usize {
        self.roster.len()
    }

    pub fn location_of(&self, agent: AgentIndex) -> Option<Coord> {
        self.roster.get(agent.0 as usize).copied()
    }

    /// Registers the next agent at `location`. Indices are handed out in call order.
    pub fn add_agent(&mut self, location: Coord) -> Result<AgentIndex, GridError> {
        let idx = self
            .cell_index(location)
            .ok_or(GridError::OutOfBounds { coord: location })?;
        if self.cells[idx].is_some() {
            return Err(GridError::CellOccupied { coord: location });
        }
        let agent = AgentIndex(self.roster.len() as u32);
        self.cells[idx] = Some(Occupant::Agent(agent));
        self.roster.push(location);
        Ok(agent)
    }

    /// Moves `agent` toward `target`, clamped into the grid. The move only happens if the
    /// clamped cell is empty.
    pub fn update_location(
        &mut self,
        agent: AgentIndex,
        target: Coord,
    ) -> Result<MoveOutcome, GridError> {
        let current = self
            .location_of(agent)
            .ok_or(GridError::UnknownAgent { agent })?;
        let target = self.clamp(target);
        let (Some(from_idx), Some(to_idx)) = (self.cell_index(current), self.cell_index(target))
        else {
            return Err(GridError::OutOfBounds { coord: current });
        };
        if self.cells[to_idx].is_some() {
            return Ok(MoveOutcome::Blocked);
        }

        self.cells[from_idx] = None;
        self.cells[to_idx] = Some(Occupant::Agent(agent));
        self.roster[agent.0 as usize] = target;
        Ok(MoveOutcome::Moved(target))
    }

    /// Empties every agent cell and forgets the roster. Barriers stay.
    pub fn clear_all(&mut self) {
        for location in self.roster.drain(..) {
            let idx = location.y as usize * self.width as usize + location.x as usize;
            self.cells[idx] = None;
        }
    }

    /// Uniformly random empty cell, or `None` when the grid is full.
    pub fn random_empty_cell<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Coord> {
        if self.cells.is_empty() {
            return None;
        }
        for _ in 0..PLACEMENT_DRAWS {
            let coord = Coord::new(
                rng.random_range(0..self.width as i32),
                rng.random_range(0..self.height as i32),
            );
            if self.is_empty_at(coord) {
                return Some(coord);
            }
        }

        let empty: Vec<usize> = self
            .cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_none())
            .map(|(idx, _)| idx)
            .collect();
        if empty.is_empty() {
            return None;
        }
        let idx = empty[rng.random_range(0..empty.len())];
        Some(self.coord_of(idx))
    }

    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot {
            width: self.width,
            height: self.height,
            cells: self.cells.clone(),
        }
    }

    fn clamp(&self, coord: Coord) -> Coord {
        Coord::new(
            coord.x.clamp(0, self.width as i32 - 1),
            coord.y.clamp(0, self.height as i32 - 1),
        )
    }

    fn cell_index(&self, coord: Coord) -> Option<usize> {
        if coord.x < 0
            || coord.y < 0
            || coord.x >= self.width as i32
            || coord.y >= self.height as i32
        {
            return None;
        }
        Some(coord.y as usize * self.width as usize + coord.x as usize)
    }

    fn coord_of(&self, idx: usize) -> Coord {
        let width = self.width as usize;
        Coord::new((idx % width) as i32, (idx / width) as i32)
    }
}
