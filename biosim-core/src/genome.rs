use biosim_types::{Gene, Genome};
use rand::Rng;

const WEIGHT_NUDGE: i16 = 10;
const MIN_MUTATED_NEURONS: u32 = 1;
/// Neuron ids are stored in a byte.
const MAX_MUTATED_NEURONS: u32 = u8::MAX as u32 + 1;
const MUTATION_RATE_SCALE: f64 = 1_000.0;

pub(crate) fn random_gene<R: Rng + ?Sized>(neuron_count: u32, rng: &mut R) -> Gene {
    let mut gene = Gene {
        source_is_sensor: rng.random(),
        source_id: rng.random(),
        sink_is_action: rng.random(),
        sink_id: rng.random(),
        weight: rng.random(),
    };
    gene.normalize(neuron_count);
    gene
}

pub(crate) fn random_genome<R: Rng + ?Sized>(length: usize, rng: &mut R) -> Genome {
    let neuron_count = (length as f64).sqrt() as u32;
    let genes = (0..length)
        .map(|_| random_gene(neuron_count, rng))
        .collect();
    Genome {
        genes,
        neuron_count,
    }
}

/// Copies `parent` and applies independent mutation events, each with probability
/// `mutation_rate / 1000`. Returns the child and whether anything changed.
pub(crate) fn clone_with_mutation<R: Rng + ?Sized>(
    parent: &Genome,
    mutation_rate: u32,
    rng: &mut R,
) -> (Genome, bool) {
    let chance = (mutation_rate as f64 / MUTATION_RATE_SCALE).clamp(0.0, 1.0);
    let mut genome = parent.clone();
    let mut mutated = false;

    if genome.genes.is_empty() {
        if rng.random_bool(chance) {
            genome.genes.push(random_gene(genome.neuron_count, rng));
            mutated = true;
        }
        return (genome, mutated);
    }

    for idx in 0..genome.genes.len() {
        if rng.random_bool(chance) {
            let neuron_count = genome.neuron_count;
            mutate_gene(&mut genome.genes[idx], neuron_count, rng);
            mutated = true;
        }
    }

    if rng.random_bool(chance) {
        insert_random_gene(&mut genome, rng);
        mutated = true;
    }

    if rng.random_bool(chance) {
        delete_random_gene(&mut genome, rng);
        mutated = true;
    }

    if rng.random_bool(chance) {
        genome.neuron_count = nudge_neuron_count(genome.neuron_count, rng);
        mutated = true;
    }

    genome.normalize();
    (genome, mutated)
}

fn insert_random_gene<R: Rng + ?Sized>(genome: &mut Genome, rng: &mut R) {
    let idx = rng.random_range(0..=genome.genes.len());
    let gene = random_gene(genome.neuron_count, rng);
    genome.genes.insert(idx, gene);
}

/// A genome is never emptied: with a single gene left, a gene is inserted instead.
fn delete_random_gene<R: Rng + ?Sized>(genome: &mut Genome, rng: &mut R) {
    if genome.genes.len() > 1 {
        let idx = rng.random_range(0..genome.genes.len());
        genome.genes.remove(idx);
    } else {
        insert_random_gene(genome, rng);
    }
}

/// Applies exactly one of: source id ±1, sink id ±1, weight ±10.
fn mutate_gene<R: Rng + ?Sized>(gene: &mut Gene, neuron_count: u32, rng: &mut R) {
    let up = rng.random::<bool>();
    match rng.random_range(0..3) {
        0 => {
            let size = gene.source_catalog_size(neuron_count);
            gene.source_id = nudge_id(gene.source_id, size, up);
        }
        1 => {
            let size = gene.sink_catalog_size(neuron_count);
            gene.sink_id = nudge_id(gene.sink_id, size, up);
        }
        _ => {
            gene.weight = if up {
                gene.weight.saturating_add(WEIGHT_NUDGE)
            } else {
                gene.weight.saturating_sub(WEIGHT_NUDGE)
            };
        }
    }
    gene.normalize(neuron_count);
}

/// Steps an id by one within `0..size`, wrapping at both ends.
fn nudge_id(id: u8, size: usize, up: bool) -> u8 {
    let id = id as usize % size;
    let next = if up { id + 1 } else { id + size - 1 };
    (next % size) as u8
}

/// Moves the neuron count one step up or down, held within `1..=256`.
fn nudge_neuron_count<R: Rng + ?Sized>(count: u32, rng: &mut R) -> u32 {
    if rng.random::<bool>() {
        count.saturating_add(1).min(MAX_MUTATED_NEURONS)
    } else {
        count.saturating_sub(1).max(MIN_MUTATED_NEURONS)
    }
}
