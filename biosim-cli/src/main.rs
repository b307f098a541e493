use anyhow::{Context, Result};
use biosim_config::{default_world_config, load_world_config_from_path};
use biosim_core::{generate_viable_genome, NetworkCompiler, SimError, Simulation};
use biosim_types::{MetricsSnapshot, WorldConfig};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "biosim")]
#[command(about = "Evolving grid creatures with genome-compiled brains")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run generations and dump survivor brains along the way.
    Run {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Overrides `generations` from the config.
        #[arg(long)]
        generations: Option<u32>,
        /// Dump every N generations; 0 disables dumps.
        #[arg(long, default_value_t = 10)]
        dump_every: u32,
        #[arg(long, default_value = "out")]
        out: PathBuf,
    },
    /// Compile one random viable brain and print it.
    Brain {
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = 16)]
        genes: usize,
        #[arg(long, default_value_t = biosim_core::DEFAULT_MIN_CONNECTIONS)]
        min_connections: usize,
    },
}

#[derive(Debug, Serialize)]
struct RunSummary {
    seed: u64,
    generations_run: u32,
    extinct: bool,
    elapsed_ms: u128,
    final_metrics: MetricsSnapshot,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "biosim_cli=info,biosim_core=info".to_owned()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            seed,
            generations,
            dump_every,
            out,
        } => run_command(config, seed, generations, dump_every, out),
        Commands::Brain {
            seed,
            genes,
            min_connections,
        } => brain_command(seed, genes, min_connections),
    }
}

fn run_command(
    config_path: Option<PathBuf>,
    seed: u64,
    generations: Option<u32>,
    dump_every: u32,
    out: PathBuf,
) -> Result<()> {
    let mut cfg = load_config(config_path)?;
    if let Some(generations) = generations {
        cfg.generations = generations;
    }
    let total = cfg.generations;

    let start = Instant::now();
    let mut sim = Simulation::new(cfg, seed)?;
    let mut extinct = false;
    let mut generations_run = 0;

    for _ in 0..total {
        match sim.run_generation() {
            Ok(report) => {
                generations_run += 1;
                info!(
                    generation = report.generation,
                    survivors = report.survivors,
                    population = report.population,
                    "generation complete"
                );
                if dump_every > 0 && report.generation % dump_every == 0 {
                    dump_generation(&out, report.generation, &sim)?;
                }
            }
            Err(SimError::Extinction { generation }) => {
                info!(generation, "population went extinct, stopping run");
                extinct = true;
                break;
            }
            Err(err) => return Err(err).context("simulation failed"),
        }
    }

    let summary = RunSummary {
        seed,
        generations_run,
        extinct,
        elapsed_ms: start.elapsed().as_millis(),
        final_metrics: sim.metrics().clone(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn brain_command(seed: u64, genes: usize, min_connections: usize) -> Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let compiler = NetworkCompiler::new(min_connections);
    let (genome, brain) = generate_viable_genome(genes, &compiler, &mut rng)
        .context("failed to generate a viable brain")?;

    info!(
        genes = genome.len(),
        neurons = brain.active_neuron_count(),
        connections = brain.connections().len(),
        "compiled brain"
    );
    println!("{brain}");
    Ok(())
}

/// Writes `<out>/<generation>/peeps.txt` and `grid.json` for the generation just culled.
fn dump_generation(out: &Path, generation: u32, sim: &Simulation) -> Result<()> {
    let dir = out.join(format!("{generation:04}"));
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create dump directory {}", dir.display()))?;

    let brains: Vec<String> = sim
        .survivors()
        .iter()
        .map(|agent| agent.brain().canonical_string())
        .collect();
    let peeps = dir.join("peeps.txt");
    fs::write(&peeps, render_brain_dump(&brains))
        .with_context(|| format!("failed writing survivor brains to {}", peeps.display()))?;

    let grid = dir.join("grid.json");
    fs::write(&grid, serde_json::to_string(&sim.grid_snapshot())?)
        .with_context(|| format!("failed writing grid snapshot to {}", grid.display()))?;
    Ok(())
}

/// Distinct brains in first-seen order, each followed by one `*` per extra survivor sharing it.
fn render_brain_dump(brains: &[String]) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for brain in brains {
        if let Some(&idx) = seen.get(brain.as_str()) {
            blocks[idx].push('*');
            continue;
        }
        seen.insert(brain.as_str(), blocks.len());
        blocks.push(format!("{brain}\n"));
    }
    blocks.join("\n")
}

fn load_config(path: Option<PathBuf>) -> Result<WorldConfig> {
    match path {
        Some(path) => load_world_config_from_path(&path),
        None => Ok(default_world_config()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brain_dump_marks_repeats() {
        let brains = vec![
            "LOC_X -[0.500015]-> MOVE_X".to_owned(),
            "AGE -[-0.250000]-> MOVE_Y".to_owned(),
            "LOC_X -[0.500015]-> MOVE_X".to_owned(),
            "LOC_X -[0.500015]-> MOVE_X".to_owned(),
        ];
        assert_eq!(
            render_brain_dump(&brains),
            "LOC_X -[0.500015]-> MOVE_X\n**\nAGE -[-0.250000]-> MOVE_Y\n"
        );
        assert_eq!(render_brain_dump(&[]), "");
    }

    #[test]
    fn cli_parses_run_overrides() {
        let cli = Cli::try_parse_from([
            "biosim",
            "run",
            "--seed",
            "7",
            "--generations",
            "3",
            "--dump-every",
            "0",
        ])
        .expect("valid arguments");
        match cli.command {
            Commands::Run {
                seed,
                generations,
                dump_every,
                config,
                out,
            } => {
                assert_eq!(seed, 7);
                assert_eq!(generations, Some(3));
                assert_eq!(dump_every, 0);
                assert!(config.is_none());
                assert_eq!(out, PathBuf::from("out"));
            }
            Commands::Brain { .. } => panic!("expected the run subcommand"),
        }
    }
}
