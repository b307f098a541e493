use biosim_types::{
    AgentIndex, GenerationReport, GridSnapshot, MetricsSnapshot, Occupant, WorldConfig,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

mod agent;
mod brain;
mod compile;
mod genome;
mod graph;
mod grid;
mod spawn;
mod turn;

#[cfg(test)]
mod tests;

pub use agent::Agent;
pub use brain::{
    ActionVector, Connection, ConnectionSink, ConnectionSource, EvalError, NeuralNet, Neuron,
    SensorReader, MAX_FIRINGS_PER_STEP,
};
pub use compile::{CompileError, NetworkCompiler, NodeKey, DEFAULT_MIN_CONNECTIONS};
pub use graph::{ConnectionGraph, Edge, GraphError, Path};
pub use grid::{Grid, GridError, MoveOutcome};
pub use spawn::{generate_viable_genome, MAX_GENOME_ATTEMPTS};
pub use turn::{EvaluationFailure, StepReport};

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid world config: {0}")]
    InvalidConfig(String),
    #[error("genome failed to compile: {0}")]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("no viable genome after {attempts} attempts")]
    GenomeGeneration { attempts: u32 },
    #[error("no empty cell left after placing {population} agents")]
    GridFull { population: usize },
    #[error("population went extinct at generation {generation}")]
    Extinction { generation: u32 },
    #[error("simulation is extinct")]
    Extinct,
    #[error("simulation was interrupted while {phase}")]
    Interrupted { phase: Phase },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Evaluating,
    Selecting,
    Reproducing,
    Extinct,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Evaluating => "evaluating",
            Phase::Selecting => "selecting",
            Phase::Reproducing => "reproducing",
            Phase::Extinct => "extinct",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct Simulation {
    config: WorldConfig,
    seed: u64,
    rng: ChaCha8Rng,
    generation: u32,
    step: u32,
    phase: Phase,
    agents: Vec<Agent>,
    grid: Grid,
    compiler: NetworkCompiler,
    survivors: Vec<Agent>,
    metrics: MetricsSnapshot,
}

impl Simulation {
    pub fn new(config: WorldConfig, seed: u64) -> Result<Self, SimError> {
        biosim_config::validate_world_config(&config).map_err(SimError::InvalidConfig)?;

        let mut grid = Grid::new(config.width, config.height);
        grid.paint_barriers(&config.barriers);
        let compiler = NetworkCompiler::new(config.min_brain_connections as usize);
        let mut sim = Self {
            agents: Vec::with_capacity(config.population as usize),
            config,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            generation: 0,
            step: 0,
            phase: Phase::Evaluating,
            grid,
            compiler,
            survivors: Vec::new(),
            metrics: MetricsSnapshot::default(),
        };

        sim.spawn_initial_population()?;
        sim.metrics.population = sim.agents.len() as u32;
        sim.debug_assert_consistent_state();
        Ok(sim)
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Steps already run in the current generation.
    pub fn current_step(&self) -> u32 {
        self.step
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Agents kept by the most recent cull. Empty before the first one.
    pub fn survivors(&self) -> &[Agent] {
        &self.survivors
    }

    pub fn compiler(&self) -> &NetworkCompiler {
        &self.compiler
    }

    pub fn metrics(&self) -> &MetricsSnapshot {
        &self.metrics
    }

    pub fn grid_snapshot(&self) -> GridSnapshot {
        self.grid.snapshot()
    }

    /// Runs the steps left in this generation, then culls and reproduces.
    pub fn run_generation(&mut self) -> Result<GenerationReport, SimError> {
        while self.step < self.config.steps_per_generation {
            self.step()?;
        }
        self.end_generation()
    }

    /// Keeps the agents standing in the survival area and refills the population from them.
    /// Zero survivors moves the simulation into the extinct phase for good.
    pub fn end_generation(&mut self) -> Result<GenerationReport, SimError> {
        self.ensure_evaluating()?;

        self.phase = Phase::Selecting;
        let survival_area = self.config.survival_area;
        self.survivors = std::mem::take(&mut self.agents)
            .into_iter()
            .filter(|agent| survival_area.contains(agent.location()))
            .collect();
        self.grid.clear_all();

        let survivors = self.survivors.len() as u32;
        self.metrics.last_survivor_count = survivors;
        if survivors == 0 {
            self.phase = Phase::Extinct;
            self.metrics.population = 0;
            info!(generation = self.generation, "population went extinct");
            return Err(SimError::Extinction {
                generation: self.generation,
            });
        }

        self.phase = Phase::Reproducing;
        self.reproduce()?;

        let report = GenerationReport {
            generation: self.generation,
            survivors,
            population: self.agents.len() as u32,
        };
        debug!(
            generation = report.generation,
            survivors = report.survivors,
            population = report.population,
            "generation culled"
        );

        self.generation = self.generation.saturating_add(1);
        self.step = 0;
        self.phase = Phase::Evaluating;
        self.metrics.generation = self.generation;
        self.metrics.step = 0;
        self.metrics.population = report.population;
        self.debug_assert_consistent_state();
        Ok(report)
    }

    fn ensure_evaluating(&self) -> Result<(), SimError> {
        match self.phase {
            Phase::Evaluating => Ok(()),
            Phase::Extinct => Err(SimError::Extinct),
            phase => Err(SimError::Interrupted { phase }),
        }
    }

    fn debug_assert_consistent_state(&self) {
        if cfg!(debug_assertions) {
            debug_assert_eq!(
                self.agents.len(),
                self.grid.agent_count(),
                "grid roster should match the agent list",
            );
            for (idx, agent) in self.agents.iter().enumerate() {
                let index = AgentIndex(idx as u32);
                debug_assert_eq!(
                    self.grid.location_of(index),
                    Some(agent.location()),
                    "grid roster must agree with the agent's own location",
                );
                debug_assert_eq!(
                    self.grid.occupant_at(agent.location()),
                    Some(Occupant::Agent(index)),
                    "cell must point at the agent standing on it",
                );
            }
        }
    }
}
