use crate::agent::Agent;
use crate::brain::NeuralNet;
use crate::compile::{CompileError, NetworkCompiler};
use crate::genome::{clone_with_mutation, random_genome};
use crate::{SimError, Simulation};
use biosim_types::{Coord, Genome};
use rand::Rng;
use tracing::warn;

/// Random genomes tried before giving up on finding one that compiles to a viable brain.
pub const MAX_GENOME_ATTEMPTS: u32 = 1_000;

/// Draws random genomes until one compiles past the compiler's minimum connectivity.
pub fn generate_viable_genome<R: Rng + ?Sized>(
    genome_length: usize,
    compiler: &NetworkCompiler,
    rng: &mut R,
) -> Result<(Genome, NeuralNet), SimError> {
    for _ in 0..MAX_GENOME_ATTEMPTS {
        let genome = random_genome(genome_length, rng);
        match compiler.compile(&genome) {
            Ok(brain) => return Ok((genome, brain)),
            Err(CompileError::TooSimple { .. }) => continue,
            Err(err) => return Err(SimError::Compile(err)),
        }
    }
    warn!(
        genome_length,
        attempts = MAX_GENOME_ATTEMPTS,
        min_connections = compiler.min_connections(),
        "gave up generating a viable genome"
    );
    Err(SimError::GenomeGeneration {
        attempts: MAX_GENOME_ATTEMPTS,
    })
}

/// A child of `parent` born at `location`. A mutated genome gets a fresh brain; if that brain
/// is too simple the child is an unmutated copy instead.
pub(crate) fn spawn_offspring<R: Rng + ?Sized>(
    parent: &Agent,
    location: Coord,
    mutation_rate: u32,
    compiler: &NetworkCompiler,
    rng: &mut R,
) -> Result<Agent, SimError> {
    let (genome, mutated) = clone_with_mutation(parent.genome(), mutation_rate, rng);
    if !mutated {
        return Ok(parent.clone_at(location));
    }
    match compiler.compile(&genome) {
        Ok(brain) => Ok(Agent::new(genome, brain, location)),
        Err(CompileError::TooSimple { .. }) => Ok(parent.clone_at(location)),
        Err(err) => Err(SimError::Compile(err)),
    }
}

impl Simulation {
    /// A config whose genomes cannot reach the minimum connectivity is rejected here, before
    /// any generation runs.
    pub(crate) fn spawn_initial_population(&mut self) -> Result<(), SimError> {
        for _ in 0..self.config.population {
            match self.place_fresh() {
                Err(SimError::GenomeGeneration { attempts }) => {
                    return Err(SimError::InvalidConfig(format!(
                        "genome_length {} produced no brain with min_brain_connections {} \
                         in {attempts} attempts",
                        self.config.genome_length, self.config.min_brain_connections
                    )));
                }
                placed => placed?,
            }
        }
        Ok(())
    }

    /// Refills the grid from the current survivors: an equal share of clones each, then
    /// alternating fresh individuals and clones of random survivors for the remainder.
    pub(crate) fn reproduce(&mut self) -> Result<(), SimError> {
        let survivors = std::mem::take(&mut self.survivors);
        let result = self.refill_from(&survivors);
        self.survivors = survivors;
        result
    }

    fn refill_from(&mut self, survivors: &[Agent]) -> Result<(), SimError> {
        if survivors.is_empty() {
            return Err(SimError::Extinction {
                generation: self.generation,
            });
        }
        let population = self.config.population as usize;
        let share = population / survivors.len();

        for parent in survivors {
            for _ in 0..share {
                self.place_offspring(parent)?;
            }
        }

        let mut fresh_turn = true;
        while self.agents.len() < population {
            if fresh_turn {
                match self.place_fresh() {
                    Err(SimError::GenomeGeneration { attempts }) => {
                        warn!(
                            generation = self.generation,
                            attempts,
                            "no viable fresh genome, cloning a survivor instead"
                        );
                        self.place_random_offspring(survivors)?;
                    }
                    placed => placed?,
                }
            } else {
                self.place_random_offspring(survivors)?;
            }
            fresh_turn = !fresh_turn;
        }
        Ok(())
    }

    fn place_random_offspring(&mut self, survivors: &[Agent]) -> Result<(), SimError> {
        let parent = &survivors[self.rng.random_range(0..survivors.len())];
        self.place_offspring(parent)
    }

    fn place_fresh(&mut self) -> Result<(), SimError> {
        let location = self.random_empty_cell()?;
        let (genome, brain) = generate_viable_genome(
            self.config.genome_length as usize,
            &self.compiler,
            &mut self.rng,
        )?;
        self.place(Agent::new(genome, brain, location))
    }

    fn place_offspring(&mut self, parent: &Agent) -> Result<(), SimError> {
        let location = self.random_empty_cell()?;
        let child = spawn_offspring(
            parent,
            location,
            self.config.mutation_rate,
            &self.compiler,
            &mut self.rng,
        )?;
        self.place(child)
    }

    fn random_empty_cell(&mut self) -> Result<Coord, SimError> {
        self.grid
            .random_empty_cell(&mut self.rng)
            .ok_or(SimError::GridFull {
                population: self.agents.len(),
            })
    }

    fn place(&mut self, agent: Agent) -> Result<(), SimError> {
        let index = self.grid.add_agent(agent.location())?;
        debug_assert_eq!(index.0 as usize, self.agents.len());
        self.agents.push(agent);
        Ok(())
    }
}
