use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentIndex(pub u32);

/// Eight-way compass. Discriminants are the clockwise rotation order starting at north.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Compass {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Compass {
    pub const ALL: [Compass; 8] = [
        Compass::N,
        Compass::NE,
        Compass::E,
        Compass::SE,
        Compass::S,
        Compass::SW,
        Compass::W,
        Compass::NW,
    ];

    /// Rotates by `steps` eighth-turns. Positive is clockwise, so `rotate(2)` is a right angle
    /// to the right.
    pub fn rotate(self, steps: i32) -> Compass {
        let len = Self::ALL.len() as i32;
        Self::ALL[(self as i32 + steps).rem_euclid(len) as usize]
    }

    /// Unit offset for one step in this direction. North is +y.
    pub fn unit_offset(self) -> Coord {
        let (x, y) = match self {
            Compass::N => (0, 1),
            Compass::NE => (1, 1),
            Compass::E => (1, 0),
            Compass::SE => (1, -1),
            Compass::S => (0, -1),
            Compass::SW => (-1, -1),
            Compass::W => (-1, 0),
            Compass::NW => (-1, 1),
        };
        Coord { x, y }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Saturates at the `i32` range; callers clamp to the grid.
    pub fn offset(self, delta: Coord) -> Coord {
        Coord {
            x: self.x.saturating_add(delta.x),
            y: self.y.saturating_add(delta.y),
        }
    }

    pub fn is_unit(self) -> bool {
        (-1..=1).contains(&self.x) && (-1..=1).contains(&self.y)
    }
}

/// Axis-aligned rectangle, half-open: `top_left` is inside, `bottom_right` is not.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Area {
    pub top_left: Coord,
    pub bottom_right: Coord,
}

impl Area {
    pub const fn new(top_left: Coord, bottom_right: Coord) -> Self {
        Self {
            top_left,
            bottom_right,
        }
    }

    pub fn contains(&self, coord: Coord) -> bool {
        coord.x >= self.top_left.x
            && coord.x < self.bottom_right.x
            && coord.y >= self.top_left.y
            && coord.y < self.bottom_right.y
    }

    pub fn is_empty(&self) -> bool {
        self.bottom_right.x <= self.top_left.x || self.bottom_right.y <= self.top_left.y
    }

    pub fn cells(&self) -> impl Iterator<Item = Coord> + '_ {
        (self.top_left.x..self.bottom_right.x)
            .flat_map(move |x| (self.top_left.y..self.bottom_right.y).map(move |y| Coord { x, y }))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sensor {
    /// Distance from the left edge.
    LocX,
    /// Distance from the bottom edge.
    LocY,
    BoundaryDistX,
    /// Distance to the nearest edge on either axis.
    BoundaryDist,
    BoundaryDistY,
    Age,
    /// Whether any move was rejected during the previous step.
    Blocked,
}

impl Sensor {
    pub const ALL: [Sensor; 7] = [
        Sensor::LocX,
        Sensor::LocY,
        Sensor::BoundaryDistX,
        Sensor::BoundaryDist,
        Sensor::BoundaryDistY,
        Sensor::Age,
        Sensor::Blocked,
    ];
    pub const COUNT: usize = Self::ALL.len();

    /// Interprets a raw gene id modulo the catalog size.
    pub fn from_gene_id(id: u8) -> Sensor {
        Self::ALL[id as usize % Self::COUNT]
    }

    pub fn name(self) -> &'static str {
        match self {
            Sensor::LocX => "LOC_X",
            Sensor::LocY => "LOC_Y",
            Sensor::BoundaryDistX => "BOUNDARY_DIST_X",
            Sensor::BoundaryDist => "BOUNDARY_DIST",
            Sensor::BoundaryDistY => "BOUNDARY_DIST_Y",
            Sensor::Age => "AGE",
            Sensor::Blocked => "BLOCKED",
        }
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    MoveX,
    MoveY,
    /// Moves along an axis picked at random when the move is applied.
    MoveRandom,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::MoveX, Action::MoveY, Action::MoveRandom];
    pub const COUNT: usize = Self::ALL.len();

    pub fn from_gene_id(id: u8) -> Action {
        Self::ALL[id as usize % Self::COUNT]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Action::MoveX => "MOVE_X",
            Action::MoveY => "MOVE_Y",
            Action::MoveRandom => "MOVE_RANDOM",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One synaptic specification. Ids are raw and only meaningful modulo the catalog they index:
/// sensors or neurons for the source, actions or neurons for the sink.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Gene {
    pub source_is_sensor: bool,
    pub source_id: u8,
    pub sink_is_action: bool,
    pub sink_id: u8,
    pub weight: i16,
}

impl Gene {
    /// Connection multiplier in [-1, 1].
    pub fn multiplier(&self) -> f32 {
        (self.weight as f32 / i16::MAX as f32).max(-1.0)
    }

    pub fn source_catalog_size(&self, neuron_count: u32) -> usize {
        if self.source_is_sensor {
            Sensor::COUNT
        } else {
            neuron_catalog_size(neuron_count)
        }
    }

    pub fn sink_catalog_size(&self, neuron_count: u32) -> usize {
        if self.sink_is_action {
            Action::COUNT
        } else {
            neuron_catalog_size(neuron_count)
        }
    }

    /// Reduces both ids into their catalogs. Each id is reduced against its own catalog.
    pub fn normalize(&mut self, neuron_count: u32) {
        self.source_id = (self.source_id as usize % self.source_catalog_size(neuron_count)) as u8;
        self.sink_id = (self.sink_id as usize % self.sink_catalog_size(neuron_count)) as u8;
    }
}

fn neuron_catalog_size(neuron_count: u32) -> usize {
    (neuron_count.max(1) as usize).min(u8::MAX as usize + 1)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Genome {
    pub genes: Vec<Gene>,
    pub neuron_count: u32,
}

impl Genome {
    pub fn normalize(&mut self) {
        let neuron_count = self.neuron_count;
        for gene in &mut self.genes {
            gene.normalize(neuron_count);
        }
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Occupant {
    Barrier,
    Agent(AgentIndex),
}

/// Read-only copy of the cell grid, row-major with `y * width + x`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GridSnapshot {
    pub width: u32,
    pub height: u32,
    pub cells: Vec<Option<Occupant>>,
}

impl GridSnapshot {
    pub fn occupant_at(&self, coord: Coord) -> Option<Occupant> {
        if coord.x < 0
            || coord.y < 0
            || coord.x >= self.width as i32
            || coord.y >= self.height as i32
        {
            return None;
        }
        self.cells[coord.y as usize * self.width as usize + coord.x as usize]
    }

    pub fn agent_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|cell| matches!(cell, Some(Occupant::Agent(_))))
            .count()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationReport {
    pub generation: u32,
    pub survivors: u32,
    pub population: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub generation: u32,
    pub step: u32,
    pub population: u32,
    pub moves_applied_last_step: u64,
    pub blocked_moves_last_step: u64,
    pub evaluation_failures_last_step: u64,
    pub evaluation_failures_total: u64,
    pub last_survivor_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorldConfig {
    pub width: u32,
    pub height: u32,
    pub population: u32,
    /// Per-mille chance for each independent mutation event.
    pub mutation_rate: u32,
    pub steps_per_generation: u32,
    pub generations: u32,
    #[serde(default = "default_genome_length")]
    pub genome_length: u32,
    #[serde(default = "default_movement_scale")]
    pub movement_scale: f32,
    #[serde(default = "default_min_brain_connections")]
    pub min_brain_connections: u32,
    pub survival_area: Area,
    #[serde(default)]
    pub barriers: Vec<Area>,
}

impl WorldConfig {
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        let size = 500;
        Self {
            width: size,
            height: size,
            population: 1_000,
            mutation_rate: 100,
            steps_per_generation: 250,
            generations: 1_000,
            genome_length: default_genome_length(),
            movement_scale: default_movement_scale(),
            min_brain_connections: default_min_brain_connections(),
            survival_area: Area::new(Coord::new(0, 0), Coord::new(100, size as i32)),
            barriers: vec![
                Area::new(Coord::new(200, 0), Coord::new(210, 100)),
                Area::new(Coord::new(200, size as i32 - 100), Coord::new(210, size as i32)),
                Area::new(Coord::new(220, 90), Coord::new(240, size as i32 - 90)),
            ],
        }
    }
}

fn default_genome_length() -> u32 {
    16
}

fn default_movement_scale() -> f32 {
    3.0
}

fn default_min_brain_connections() -> u32 {
    3
}
