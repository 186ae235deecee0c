use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::actor::Integration;
use crate::error::NavResult;
use crate::flocking::FlockParams;
use crate::grid::CellId;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub pathfinding: PathfindingConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub flocking: FlockParams,
    #[serde(default)]
    pub scenario: ScenarioConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_rows")]
    pub rows: i32,
    #[serde(default = "default_cols")]
    pub cols: i32,
    #[serde(default = "default_cell_size")]
    pub cell_size: f32,
    /// Row-major ids of blocked cells
    #[serde(default)]
    pub blocked: Vec<CellId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathfindingConfig {
    /// Abort a search after this many expansions; unset means no cap
    #[serde(default)]
    pub max_expansions: Option<usize>,
    /// Where the demo writes its search dump, if anywhere
    #[serde(default)]
    pub dump_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentsConfig {
    #[serde(default = "default_walk_speed")]
    pub walk_speed: f32,
    #[serde(default = "default_arrival_threshold")]
    pub arrival_threshold: f32,
    #[serde(default = "default_integration")]
    pub integration: Integration,
    #[serde(default = "default_walk_list_len")]
    pub walk_list_len: usize,
    #[serde(default = "default_walk_list_extent")]
    pub walk_list_extent: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioConfig {
    /// (row, col) of every agent to spawn
    #[serde(default = "default_spawns")]
    pub spawns: Vec<(i32, i32)>,
    /// Everyone is sent here with `move_to`
    #[serde(default = "default_goal")]
    pub goal: (i32, i32),
    #[serde(default = "default_ticks")]
    pub ticks: u32,
    #[serde(default = "default_dt")]
    pub dt: f32,
    /// Start every agent with the flocking flag set
    #[serde(default)]
    pub flocking: bool,
    /// Give every agent a random walk list instead of a planned route
    #[serde(default)]
    pub random_walk: bool,
    /// Play `route` back as chained scripted commands instead of planning
    #[serde(default)]
    pub scripted: bool,
    /// Cells visited in order when `scripted` is set; empty means just `goal`
    #[serde(default)]
    pub route: Vec<(i32, i32)>,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_enable_event_log")]
    pub enable_event_log: bool,
    #[serde(default = "default_event_log_path")]
    pub event_log_path: String,
    /// Used when RUST_LOG is not set
    #[serde(default = "default_level")]
    pub level: String,
}

// Default values
fn default_rows() -> i32 { 20 }
fn default_cols() -> i32 { 20 }
fn default_cell_size() -> f32 { 10.0 }
fn default_walk_speed() -> f32 { 25.0 }
fn default_arrival_threshold() -> f32 { 5.0 }
fn default_integration() -> Integration { Integration::Ballistic }
fn default_walk_list_len() -> usize { 15 }
fn default_walk_list_extent() -> f32 { 30.0 }
fn default_spawns() -> Vec<(i32, i32)> { vec![(0, 0), (0, 2), (2, 0)] }
fn default_goal() -> (i32, i32) { (19, 19) }
fn default_ticks() -> u32 { 600 }
fn default_dt() -> f32 { 1.0 / 30.0 }
fn default_seed() -> u64 { 425 }
fn default_enable_event_log() -> bool { true }
fn default_event_log_path() -> String { "event_log.json".to_string() }
fn default_level() -> String { "info".to_string() }

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            cols: default_cols(),
            cell_size: default_cell_size(),
            blocked: Vec::new(),
        }
    }
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            walk_speed: default_walk_speed(),
            arrival_threshold: default_arrival_threshold(),
            integration: default_integration(),
            walk_list_len: default_walk_list_len(),
            walk_list_extent: default_walk_list_extent(),
        }
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            spawns: default_spawns(),
            goal: default_goal(),
            ticks: default_ticks(),
            dt: default_dt(),
            flocking: false,
            random_walk: false,
            scripted: false,
            route: Vec::new(),
            seed: default_seed(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_event_log: default_enable_event_log(),
            event_log_path: default_event_log_path(),
            level: default_level(),
        }
    }
}

impl Config {
    /// Load configuration from file, or use defaults if it is missing or invalid
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("No {} found, using default configuration", path.display());
            return Config::default();
        }
        match Self::from_file(path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Failed to load {}: {}", path.display(), e);
                warn!("Using default configuration");
                Config::default()
            }
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> NavResult<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> NavResult<Self> {
        Ok(toml::from_str(contents)?)
    }
}
