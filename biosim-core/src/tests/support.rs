use super::*;

/// 8x8 world, left half survives, every brain needs only one connection.
pub(super) fn stable_test_config() -> WorldConfig {
    WorldConfig {
        width: 8,
        height: 8,
        population: 6,
        mutation_rate: 0,
        steps_per_generation: 4,
        generations: 3,
        genome_length: 4,
        movement_scale: 2.0,
        min_brain_connections: 1,
        survival_area: Area::new(Coord::new(0, 0), Coord::new(4, 8)),
        barriers: Vec::new(),
    }
}

pub(super) fn sensor_gene(sensor: Sensor, action: Action, weight: i16) -> Gene {
    Gene {
        source_is_sensor: true,
        source_id: sensor as u8,
        sink_is_action: true,
        sink_id: action as u8,
        weight,
    }
}

pub(super) fn single_gene_genome(gene: Gene) -> Genome {
    Genome {
        genes: vec![gene],
        neuron_count: 1,
    }
}

/// Reads `LOC_Y`, so on the top row it steps one cell right per step at scale 2.
pub(super) fn rightward_genome() -> Genome {
    single_gene_genome(sensor_gene(Sensor::LocY, Action::MoveX, i16::MAX))
}

pub(super) fn leftward_genome() -> Genome {
    single_gene_genome(sensor_gene(Sensor::LocY, Action::MoveX, i16::MIN))
}

/// Replaces the spawned population with exactly these agents, in this index order.
pub(super) fn sim_with_agents(config: WorldConfig, placements: Vec<(Genome, Coord)>) -> Simulation {
    let mut sim = Simulation::new(config, 1).expect("test config should be valid");
    sim.agents.clear();
    sim.grid.clear_all();
    for (genome, location) in placements {
        let brain = sim
            .compiler
            .compile(&genome)
            .expect("test genome should compile");
        install_agent(&mut sim, Agent::new(genome, brain, location));
    }
    sim
}

pub(super) fn install_agent(sim: &mut Simulation, agent: Agent) {
    let index = sim
        .grid
        .add_agent(agent.location())
        .expect("test agent cell should be free");
    assert_eq!(index.0 as usize, sim.agents.len());
    sim.agents.push(agent);
}

pub(super) fn location_of(sim: &Simulation, idx: usize) -> Coord {
    sim.agents()[idx].location()
}
