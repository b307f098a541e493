use crate::brain::{ActionVector, EvalError, NeuralNet, SensorReader};
use biosim_types::{Coord, Genome, Sensor};

/// World facts a brain may sense that do not belong to any single agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct WorldView {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) steps_per_generation: u32,
}

/// One individual: its genome, the brain compiled from it, and where it stands.
#[derive(Debug, Clone)]
pub struct Agent {
    genome: Genome,
    brain: NeuralNet,
    birth_location: Coord,
    location: Coord,
    age: u32,
    blocked_last_step: bool,
}

impl Agent {
    pub(crate) fn new(genome: Genome, brain: NeuralNet, location: Coord) -> Self {
        Self {
            genome,
            brain,
            birth_location: location,
            location,
            age: 0,
            blocked_last_step: false,
        }
    }

    /// Same genome and brain, accumulators included, newly born at `location`.
    pub(crate) fn clone_at(&self, location: Coord) -> Self {
        Self::new(self.genome.clone(), self.brain.clone(), location)
    }

    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    pub fn brain(&self) -> &NeuralNet {
        &self.brain
    }

    pub fn birth_location(&self) -> Coord {
        self.birth_location
    }

    pub fn location(&self) -> Coord {
        self.location
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn blocked_last_step(&self) -> bool {
        self.blocked_last_step
    }

    pub(crate) fn set_location(&mut self, location: Coord) {
        self.location = location;
    }

    pub(crate) fn set_blocked_last_step(&mut self, blocked: bool) {
        self.blocked_last_step = blocked;
    }

    /// Evaluates the brain once. Age advances whether or not evaluation succeeds.
    pub(crate) fn think(&mut self, world: WorldView) -> Result<ActionVector, EvalError> {
        let senses = Senses {
            location: self.location,
            age: self.age,
            blocked: self.blocked_last_step,
            world,
        };
        let result = self.brain.evaluate(&senses);
        self.age = self.age.saturating_add(1);
        result
    }
}

/// Agent state frozen for one evaluation, so the brain can be borrowed mutably alongside it.
#[derive(Debug, Clone, Copy)]
struct Senses {
    location: Coord,
    age: u32,
    blocked: bool,
    world: WorldView,
}

impl SensorReader for Senses {
    fn read(&self, sensor: Sensor) -> f32 {
        let (width, height) = (self.world.width, self.world.height);
        match sensor {
            Sensor::LocX => fraction_along(self.location.x, width),
            Sensor::LocY => fraction_along(self.location.y, height),
            Sensor::BoundaryDistX => boundary_distance(self.location.x, width),
            Sensor::BoundaryDistY => boundary_distance(self.location.y, height),
            Sensor::BoundaryDist => boundary_distance(self.location.x, width)
                .min(boundary_distance(self.location.y, height)),
            Sensor::Age => self.age as f32 / self.world.steps_per_generation.max(1) as f32,
            Sensor::Blocked => {
                if self.blocked {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// 0 at the low edge, 1 at the high edge.
fn fraction_along(position: i32, extent: u32) -> f32 {
    if extent <= 1 {
        return 0.0;
    }
    position as f32 / (extent - 1) as f32
}

/// 0 on an edge, 1 at the centre.
fn boundary_distance(position: i32, extent: u32) -> f32 {
    let nearest = position.min(extent as i32 - 1 - position).max(0);
    let half = extent as f32 / 2.0;
    (nearest as f32 / half).min(1.0)
}
