use glam::Vec3;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::actor::{Actor, AgentId};
use crate::config::AgentsConfig;
use crate::error::NavResult;
use crate::flocking::FlockParams;
use crate::grid::{CellId, Grid, GridPos, TAG_BLOCKED};
use crate::simulation::Simulation;

/// Save state containing grid and agent positions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveState {
    /// Grid revision number at save time
    pub grid_revision: u64,
    pub grid_rows: i32,
    pub grid_cols: i32,
    pub cell_size: f32,
    /// Blocked cells (stored as cell IDs)
    pub blocked_cells: Vec<CellId>,
    /// Blocked cells carrying a label other than the default
    #[serde(default)]
    pub tags: Vec<(CellId, char)>,
    pub tick: u64,
    #[serde(default)]
    pub flock: FlockParams,
    /// Arrival threshold and integration handed to every agent
    #[serde(default)]
    pub agents: AgentsConfig,
    /// Agents without their routes
    pub actors: Vec<ActorSaveData>,
}

/// Minimal agent data for saving/loading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorSaveData {
    pub id: AgentId,
    pub position: Vec3,
    pub facing: Vec3,
    pub speed: f32,
    pub flocking: bool,
    pub cell: Option<GridPos>,
}

impl SaveState {
    pub fn from_simulation(sim: &Simulation) -> Self {
        let grid = sim.grid();

        let actors = sim
            .actors()
            .iter()
            .map(|actor| ActorSaveData {
                id: actor.id,
                position: actor.position,
                facing: actor.facing,
                speed: actor.speed,
                flocking: actor.is_flocking(),
                cell: actor.cell,
            })
            .collect();

        SaveState {
            grid_revision: grid.revision(),
            grid_rows: grid.rows(),
            grid_cols: grid.cols(),
            cell_size: grid.cell_size(),
            blocked_cells: grid.blocked_cells(),
            tags: grid
                .cells()
                .iter()
                .filter(|c| !c.is_walkable() && c.tag != TAG_BLOCKED)
                .map(|c| (c.id, c.tag))
                .collect(),
            tick: sim.tick(),
            flock: *sim.flock_params(),
            agents: sim.agent_config().clone(),
            actors,
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> NavResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> NavResult<Self> {
        let json = fs::read_to_string(path)?;
        let save_state: SaveState = serde_json::from_str(&json)?;
        Ok(save_state)
    }

    pub fn restore_grid(&self) -> NavResult<Grid> {
        let mut grid = Grid::with_blocked(
            self.grid_rows,
            self.grid_cols,
            self.cell_size,
            &self.blocked_cells,
        )?;
        // Labels only; walkability comes from `blocked_cells`
        for &(id, tag) in &self.tags {
            let pos = grid.coords(id);
            if !grid.is_walkable(pos.row, pos.col) {
                grid.place_obstacle(pos.row, pos.col, tag);
            }
        }
        Ok(grid.with_revision(self.grid_revision))
    }

    /// Rebuild a simulation with every agent idle where it was saved
    pub fn restore(&self) -> NavResult<Simulation> {
        let mut sim = Simulation::new(self.restore_grid()?);
        sim.set_flock_params(self.flock);
        sim.set_agent_config(self.agents.clone());
        sim.set_tick(self.tick);
        for data in &self.actors {
            let mut actor = Actor::new(data.id, data.position, data.speed);
            actor.facing = data.facing;
            actor.cell = data.cell;
            actor.set_flocking(data.flocking);
            sim.add_actor(actor);
        }
        info!(
            "Restored {} agents on a {}x{} grid",
            self.actors.len(),
            self.grid_rows,
            self.grid_cols
        );
        Ok(sim)
    }
}
