use crate::agent::WorldView;
use crate::brain::{ActionVector, EvalError};
use crate::grid::MoveOutcome;
use crate::{SimError, Simulation};
use biosim_types::{Action, AgentIndex, Coord};
use rand::Rng;
use rayon::prelude::*;
use tracing::warn;

/// A brain that failed to evaluate this step. The agent sat the step out.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationFailure {
    pub agent: AgentIndex,
    pub error: EvalError,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StepReport {
    pub generation: u32,
    /// Zero-based step within the generation that just ran.
    pub step: u32,
    pub moves_applied: u64,
    pub blocked_moves: u64,
    pub failures: Vec<EvaluationFailure>,
}

impl Simulation {
    /// Runs one step: every brain is evaluated in parallel against the same world state, then
    /// moves are applied one agent at a time in index order.
    pub fn step(&mut self) -> Result<StepReport, SimError> {
        self.ensure_evaluating()?;

        let world = WorldView {
            width: self.config.width,
            height: self.config.height,
            steps_per_generation: self.config.steps_per_generation,
        };
        let decisions: Vec<Result<ActionVector, EvalError>> = self
            .agents
            .par_iter_mut()
            .map(|agent| agent.think(world))
            .collect();

        let mut report = StepReport {
            generation: self.generation,
            step: self.step,
            ..StepReport::default()
        };
        let mut applied: Result<(), SimError> = Ok(());
        for (idx, decision) in decisions.into_iter().enumerate() {
            let agent = AgentIndex(idx as u32);
            match decision {
                Ok(actions) => match self.apply_actions(agent, &actions, &mut report) {
                    Ok(blocked) => self.agents[idx].set_blocked_last_step(blocked),
                    Err(err) => {
                        applied = Err(err);
                        break;
                    }
                },
                Err(error) => {
                    warn!(
                        agent = idx,
                        generation = self.generation,
                        step = self.step,
                        %error,
                        "brain evaluation failed"
                    );
                    self.agents[idx].set_blocked_last_step(false);
                    report.failures.push(EvaluationFailure { agent, error });
                }
            }
        }

        // Every agent has aged by now, even if a move failed.
        self.step = self.step.saturating_add(1);
        self.record_step(&report);
        applied?;
        self.debug_assert_consistent_state();
        Ok(report)
    }

    /// Returns whether any of the agent's moves was blocked.
    fn apply_actions(
        &mut self,
        agent: AgentIndex,
        actions: &ActionVector,
        report: &mut StepReport,
    ) -> Result<bool, SimError> {
        let mut blocked = false;
        for (action, value) in actions.iter() {
            let distance = (value * self.config.movement_scale).trunc() as i32;
            if distance == 0 {
                continue;
            }
            let delta = match action {
                Action::MoveX => Coord::new(distance, 0),
                Action::MoveY => Coord::new(0, distance),
                Action::MoveRandom => {
                    if self.rng.random::<bool>() {
                        Coord::new(distance, 0)
                    } else {
                        Coord::new(0, distance)
                    }
                }
            };

            let idx = agent.0 as usize;
            let target = self.agents[idx].location().offset(delta);
            match self.grid.update_location(agent, target)? {
                MoveOutcome::Moved(location) => {
                    self.agents[idx].set_location(location);
                    report.moves_applied += 1;
                }
                MoveOutcome::Blocked => {
                    blocked = true;
                    report.blocked_moves += 1;
                }
            }
        }
        Ok(blocked)
    }

    fn record_step(&mut self, report: &StepReport) {
        let failures = report.failures.len() as u64;
        self.metrics.generation = self.generation;
        self.metrics.step = self.step;
        self.metrics.population = self.agents.len() as u32;
        self.metrics.moves_applied_last_step = report.moves_applied;
        self.metrics.blocked_moves_last_step = report.blocked_moves;
        self.metrics.evaluation_failures_last_step = failures;
        self.metrics.evaluation_failures_total += failures;
    }
}
