use super::support::{
    leftward_genome, location_of, rightward_genome, sensor_gene, sim_with_agents,
    single_gene_genome, stable_test_config,
};
use super::*;

const TOP: i32 = 7;

#[test]
fn lower_index_wins_contested_cell() {
    let mut sim = sim_with_agents(
        stable_test_config(),
        vec![
            (rightward_genome(), Coord::new(2, TOP)),
            (leftward_genome(), Coord::new(4, TOP)),
        ],
    );

    let report = sim.step().expect("step");
    assert_eq!(location_of(&sim, 0), Coord::new(3, TOP));
    assert_eq!(location_of(&sim, 1), Coord::new(4, TOP));
    assert_eq!(report.moves_applied, 1);
    assert_eq!(report.blocked_moves, 1);
    assert!(!sim.agents()[0].blocked_last_step());
    assert!(sim.agents()[1].blocked_last_step());
}

#[test]
fn swapping_indices_swaps_the_winner() {
    let mut sim = sim_with_agents(
        stable_test_config(),
        vec![
            (leftward_genome(), Coord::new(4, TOP)),
            (rightward_genome(), Coord::new(2, TOP)),
        ],
    );

    sim.step().expect("step");
    assert_eq!(location_of(&sim, 0), Coord::new(3, TOP));
    assert_eq!(location_of(&sim, 1), Coord::new(2, TOP));
}

#[test]
fn moves_apply_sequentially_not_simultaneously() {
    // The trailing agent only finds room if the leader has already moved.
    let mut sim = sim_with_agents(
        stable_test_config(),
        vec![
            (rightward_genome(), Coord::new(4, TOP)),
            (rightward_genome(), Coord::new(3, TOP)),
        ],
    );
    sim.step().expect("step");
    assert_eq!(location_of(&sim, 0), Coord::new(5, TOP));
    assert_eq!(location_of(&sim, 1), Coord::new(4, TOP));

    let mut sim = sim_with_agents(
        stable_test_config(),
        vec![
            (rightward_genome(), Coord::new(3, TOP)),
            (rightward_genome(), Coord::new(4, TOP)),
        ],
    );
    sim.step().expect("step");
    assert_eq!(location_of(&sim, 0), Coord::new(3, TOP));
    assert_eq!(location_of(&sim, 1), Coord::new(5, TOP));
}

#[test]
fn barrier_blocks_and_sets_blocked_flag() {
    let mut cfg = stable_test_config();
    cfg.barriers = vec![Area::new(Coord::new(3, 0), Coord::new(4, 8))];
    let mut sim = sim_with_agents(cfg, vec![(rightward_genome(), Coord::new(2, TOP))]);

    let report = sim.step().expect("step");
    assert_eq!(location_of(&sim, 0), Coord::new(2, TOP));
    assert_eq!(report.blocked_moves, 1);
    assert!(sim.agents()[0].blocked_last_step());
    assert_eq!(sim.metrics().blocked_moves_last_step, 1);
    assert_eq!(
        sim.grid_snapshot().occupant_at(Coord::new(3, TOP)),
        Some(Occupant::Barrier)
    );
}

#[test]
fn grid_edge_counts_as_blocked() {
    let mut sim = sim_with_agents(
        stable_test_config(),
        vec![(rightward_genome(), Coord::new(7, TOP))],
    );
    sim.step().expect("step");
    assert_eq!(location_of(&sim, 0), Coord::new(7, TOP));
    assert!(sim.agents()[0].blocked_last_step());
}

#[test]
fn huge_movement_scale_clamps_to_the_edge() {
    let mut cfg = stable_test_config();
    cfg.movement_scale = 4.0e9;
    let mut sim = sim_with_agents(
        cfg,
        vec![
            (rightward_genome(), Coord::new(5, TOP)),
            (leftward_genome(), Coord::new(2, TOP)),
        ],
    );

    let report = sim.step().expect("step");
    assert_eq!(location_of(&sim, 0), Coord::new(7, TOP));
    assert_eq!(location_of(&sim, 1), Coord::new(0, TOP));
    assert_eq!(report.moves_applied, 2);
}

#[test]
fn zero_length_moves_are_skipped() {
    // LOC_X reads zero on the left edge, so the output truncates to no move at all.
    let genome = single_gene_genome(sensor_gene(Sensor::LocX, Action::MoveX, i16::MAX));
    let mut sim = sim_with_agents(stable_test_config(), vec![(genome, Coord::new(0, 3))]);

    let report = sim.step().expect("step");
    assert_eq!(location_of(&sim, 0), Coord::new(0, 3));
    assert_eq!(report.moves_applied, 0);
    assert_eq!(report.blocked_moves, 0);
    assert!(!sim.agents()[0].blocked_last_step());
}

#[test]
fn blocked_flag_clears_after_a_free_step() {
    let mut sim = sim_with_agents(
        stable_test_config(),
        vec![
            (rightward_genome(), Coord::new(2, TOP)),
            (rightward_genome(), Coord::new(1, TOP)),
        ],
    );
    // Index 0 moves first, then index 1 finds the vacated cell free.
    sim.step().expect("step");
    assert!(!sim.agents()[1].blocked_last_step());

    let mut sim = sim_with_agents(
        stable_test_config(),
        vec![
            (rightward_genome(), Coord::new(1, TOP)),
            (rightward_genome(), Coord::new(2, TOP)),
        ],
    );
    sim.step().expect("first step");
    assert!(sim.agents()[0].blocked_last_step());
    sim.step().expect("second step");
    assert!(!sim.agents()[0].blocked_last_step());
    assert_eq!(location_of(&sim, 0), Coord::new(2, TOP));
    assert_eq!(location_of(&sim, 1), Coord::new(4, TOP));
}

#[test]
fn random_axis_moves_stay_on_one_axis() {
    let genome = single_gene_genome(sensor_gene(Sensor::LocY, Action::MoveRandom, i16::MAX));
    let mut sim = sim_with_agents(stable_test_config(), vec![(genome, Coord::new(3, TOP))]);

    let before = location_of(&sim, 0);
    sim.step().expect("step");
    let after = location_of(&sim, 0);
    // +1 on x, or +1 on y which clamps back onto the top row and is blocked.
    if after == before {
        assert!(sim.agents()[0].blocked_last_step());
    } else {
        assert_eq!(after, Coord::new(4, TOP));
    }
}

#[test]
fn evaluation_failure_skips_agent_and_is_recorded() {
    let mut sim = sim_with_agents(
        stable_test_config(),
        vec![(rightward_genome(), Coord::new(2, TOP))],
    );

    let mut broken = NeuralNet::with_neuron_slots(1);
    let slot = broken.sensor_slot(Sensor::LocY);
    broken.push_connection(Connection {
        source: ConnectionSource::Sensor {
            sensor: Sensor::LocY,
            slot,
        },
        sink: ConnectionSink::Neuron(0),
        multiplier: 1.0,
    });
    super::support::install_agent(
        &mut sim,
        Agent::new(rightward_genome(), broken, Coord::new(5, TOP)),
    );

    let report = sim.step().expect("a failed brain does not abort the step");
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].agent, AgentIndex(1));
    assert_eq!(report.failures[0].error, EvalError::MissingNeuron { id: 0 });
    assert_eq!(location_of(&sim, 0), Coord::new(3, TOP));
    assert_eq!(location_of(&sim, 1), Coord::new(5, TOP));
    assert_eq!(sim.agents()[1].age(), 1);

    sim.step().expect("second step");
    assert_eq!(sim.metrics().evaluation_failures_last_step, 1);
    assert_eq!(sim.metrics().evaluation_failures_total, 2);
}

#[test]
fn step_updates_metrics_and_counters() {
    let mut sim = sim_with_agents(
        stable_test_config(),
        vec![(rightward_genome(), Coord::new(0, TOP))],
    );
    let report = sim.step().expect("step");
    assert_eq!(report.step, 0);
    assert_eq!(report.generation, 0);
    assert_eq!(sim.current_step(), 1);
    assert_eq!(sim.metrics().step, 1);
    assert_eq!(sim.metrics().moves_applied_last_step, 1);
    assert_eq!(sim.metrics().population, 1);
    assert_eq!(sim.agents()[0].age(), 1);
}

#[test]
fn occupancy_stays_exclusive_across_random_runs() {
    let mut cfg = stable_test_config();
    cfg.width = 12;
    cfg.height = 12;
    cfg.population = 60;
    cfg.genome_length = 9;
    cfg.movement_scale = 4.0;
    cfg.survival_area = Area::new(Coord::new(0, 0), Coord::new(12, 12));
    cfg.barriers = vec![Area::new(Coord::new(5, 2), Coord::new(7, 10))];
    let mut sim = Simulation::new(cfg, 77).expect("valid config");

    for _ in 0..20 {
        sim.step().expect("step");
        let snapshot = sim.grid_snapshot();
        assert_eq!(snapshot.agent_count(), sim.agents().len());
        for (idx, agent) in sim.agents().iter().enumerate() {
            assert_eq!(
                snapshot.occupant_at(agent.location()),
                Some(Occupant::Agent(AgentIndex(idx as u32)))
            );
        }
    }
}

#[test]
fn grid_failure_mid_step_still_advances_the_step() {
    let mut sim = sim_with_agents(
        stable_test_config(),
        vec![(rightward_genome(), Coord::new(2, TOP))],
    );
    sim.grid.clear_all();

    let err = sim.step().expect_err("agent is missing from the grid");
    assert!(matches!(
        err,
        SimError::Grid(GridError::UnknownAgent {
            agent: AgentIndex(0)
        })
    ));
    assert_eq!(sim.current_step(), 1);
    assert_eq!(sim.metrics().step, 1);
    assert_eq!(sim.agents()[0].age(), 1);
}
