use anyhow::{Context, Result};
use biosim_types::{Area, WorldConfig};
use std::path::{Path, PathBuf};

const DEFAULT_WORLD_CONFIG_REL_PATH: &str = "default.toml";
const MAX_MUTATION_RATE: u32 = 1_000;

pub fn world_config_from_toml_str(raw: &str) -> Result<WorldConfig, toml::de::Error> {
    toml::from_str(raw)
}

pub fn default_world_config() -> WorldConfig {
    world_config_from_toml_str(include_str!("../default.toml"))
        .expect("default world config TOML must deserialize")
}

pub fn default_world_config_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_WORLD_CONFIG_REL_PATH)
}

pub fn load_world_config_from_path(path: &Path) -> Result<WorldConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read world config from {}", path.display()))?;
    let config = world_config_from_toml_str(&raw)
        .context("world config TOML failed schema deserialization")
        .with_context(|| format!("failed to parse world config from {}", path.display()))?;
    validate_world_config(&config)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("invalid world config in {}", path.display()))?;
    Ok(config)
}

pub fn validate_world_config(config: &WorldConfig) -> Result<(), String> {
    if config.width == 0 || config.height == 0 {
        return Err("width and height must be greater than zero".to_owned());
    }
    if config.width > i32::MAX as u32 || config.height > i32::MAX as u32 {
        return Err("width and height must fit in a signed 32-bit coordinate".to_owned());
    }
    if config.population == 0 {
        return Err("population must be greater than zero".to_owned());
    }
    if config.mutation_rate > MAX_MUTATION_RATE {
        return Err(format!("mutation_rate must be <= {MAX_MUTATION_RATE}"));
    }
    if config.steps_per_generation == 0 {
        return Err("steps_per_generation must be greater than zero".to_owned());
    }
    if !config.movement_scale.is_finite() || config.movement_scale <= 0.0 {
        return Err("movement_scale must be finite and greater than zero".to_owned());
    }
    if config.genome_length == 0 {
        return Err("genome_length must be greater than zero".to_owned());
    }
    if config.genome_length < config.min_brain_connections {
        return Err("genome_length must be >= min_brain_connections".to_owned());
    }
    if config.survival_area.is_empty() {
        return Err("survival_area must cover at least one cell".to_owned());
    }
    if !area_within_bounds(&config.survival_area, config) {
        return Err("survival_area must lie within the grid".to_owned());
    }
    for (idx, barrier) in config.barriers.iter().enumerate() {
        if !area_within_bounds(barrier, config) {
            return Err(format!("barrier {idx} must lie within the grid"));
        }
    }

    let free_cells = config.cell_count() - barrier_cell_count(config);
    if config.population as usize > free_cells {
        return Err(format!(
            "population ({}) exceeds the {free_cells} cells not covered by barriers",
            config.population
        ));
    }
    Ok(())
}

fn area_within_bounds(area: &Area, config: &WorldConfig) -> bool {
    area.top_left.x >= 0
        && area.top_left.y >= 0
        && area.bottom_right.x <= config.width as i32
        && area.bottom_right.y <= config.height as i32
}

/// Barriers may overlap, so cells are counted once each.
fn barrier_cell_count(config: &WorldConfig) -> usize {
    let width = config.width as usize;
    let mut blocked = vec![false; config.cell_count()];
    for barrier in &config.barriers {
        for cell in barrier.cells() {
            blocked[cell.y as usize * width + cell.x as usize] = true;
        }
    }
    blocked.iter().filter(|cell| **cell).count()
}
