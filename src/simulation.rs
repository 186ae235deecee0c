use glam::Vec3;
use log::{debug, info};
use rand::Rng;

use crate::actor::{Actor, AgentId, CommandMode, MoveOutcome, Transition};
use crate::config::{AgentsConfig, Config};
use crate::error::NavResult;
use crate::event_log::{EventLog, SimEvent};
use crate::flocking::{assimilate, compute_steering, FlockMember, FlockParams};
use crate::grid::{Grid, GridPos};
use crate::pathfinding::Pathfinder;

/// What the renderer needs to apply for one agent after a step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentUpdate {
    pub id: AgentId,
    pub position: Vec3,
    pub displacement: Vec3,
    pub yaw_delta: f32,
    pub transition: Option<Transition>,
}

/// Owns the grid, the shared pathfinder and every agent.
///
/// `step` reads a snapshot of all agents, advances each one, then applies
/// flock joins and flock halts, so no agent sees a neighbor mid-update.
#[derive(Debug)]
pub struct Simulation {
    grid: Grid,
    pathfinder: Pathfinder,
    actors: Vec<Actor>,
    next_id: u32,
    flock: FlockParams,
    agent_config: AgentsConfig,
    events: EventLog,
    tick: u64,
}

impl Simulation {
    pub fn new(grid: Grid) -> Self {
        Simulation {
            grid,
            pathfinder: Pathfinder::new(),
            actors: Vec::new(),
            next_id: 0,
            flock: FlockParams::default(),
            agent_config: AgentsConfig::default(),
            events: EventLog::new(),
            tick: 0,
        }
    }

    /// Build the grid and tuning from config. Agents are not spawned.
    pub fn from_config(config: &Config) -> NavResult<Self> {
        let grid = Grid::with_blocked(
            config.grid.rows,
            config.grid.cols,
            config.grid.cell_size,
            &config.grid.blocked,
        )?;
        let mut sim = Simulation::new(grid);
        sim.pathfinder.set_max_expansions(config.pathfinding.max_expansions);
        sim.flock = config.flocking;
        sim.agent_config = config.agents.clone();
        sim.events.set_enabled(config.logging.enable_event_log);
        info!(
            "Simulation ready: {}x{} grid, {} blocked cells",
            sim.grid.rows(),
            sim.grid.cols(),
            config.grid.blocked.len()
        );
        Ok(sim)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// For placing or clearing obstacles between steps
    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn pathfinder(&self) -> &Pathfinder {
        &self.pathfinder
    }

    pub fn pathfinder_mut(&mut self) -> &mut Pathfinder {
        &mut self.pathfinder
    }

    pub fn flock_params(&self) -> &FlockParams {
        &self.flock
    }

    pub fn set_flock_params(&mut self, params: FlockParams) {
        self.flock = params;
    }

    pub fn agent_config(&self) -> &AgentsConfig {
        &self.agent_config
    }

    /// Settings applied to agents registered from now on
    pub fn set_agent_config(&mut self, config: AgentsConfig) {
        self.agent_config = config;
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventLog {
        &mut self.events
    }

    /// Completed steps
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Resume counting from a saved tick
    pub(crate) fn set_tick(&mut self, tick: u64) {
        self.tick = tick;
    }

    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    pub fn actor(&self, id: AgentId) -> Option<&Actor> {
        self.actors.iter().find(|a| a.id == id)
    }

    pub fn actor_mut(&mut self, id: AgentId) -> Option<&mut Actor> {
        self.actors.iter_mut().find(|a| a.id == id)
    }

    pub fn ids(&self) -> Vec<AgentId> {
        self.actors.iter().map(|a| a.id).collect()
    }

    /// Spawn an idle agent on a walkable cell
    pub fn spawn(&mut self, row: i32, col: i32) -> Option<AgentId> {
        if !self.grid.is_walkable(row, col) {
            debug!("[spawn] ({},{}) is not walkable", row, col);
            return None;
        }
        let id = self.allocate_id();
        let pos = GridPos::new(row, col);
        let actor = Actor::at_cell(id, &self.grid, pos, self.agent_config.walk_speed);
        self.add_actor(actor);
        self.events.log(self.tick, SimEvent::Spawned { agent: id, cell: pos });
        Some(id)
    }

    /// Register an existing actor. Its id is kept unless already taken.
    pub fn add_actor(&mut self, mut actor: Actor) -> AgentId {
        if self.actor(actor.id).is_some() {
            actor.id = self.allocate_id();
        }
        self.next_id = self.next_id.max(actor.id.0 + 1);
        actor.arrival_threshold = self.agent_config.arrival_threshold;
        actor.integration = self.agent_config.integration;
        let id = actor.id;
        self.actors.push(actor);
        id
    }

    fn allocate_id(&mut self) -> AgentId {
        let id = AgentId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Queue a world-space destination
    pub fn walk_to(&mut self, id: AgentId, destination: Vec3, mode: CommandMode) -> bool {
        match self.actor_mut(id) {
            Some(actor) => {
                actor.walk_to(destination, mode);
                true
            }
            None => false,
        }
    }

    /// Queue a cell center without planning
    pub fn walk_to_cell(&mut self, id: AgentId, row: i32, col: i32, mode: CommandMode) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        self.actors[index].walk_to_cell(&self.grid, row, col, mode)
    }

    /// Plan a route for one agent and queue it. `None` for an unknown id.
    pub fn move_to(&mut self, id: AgentId, row: i32, col: i32) -> Option<MoveOutcome> {
        let index = self.index_of(id)?;
        let outcome = self.actors[index].move_to(&self.grid, &mut self.pathfinder, row, col);
        let goal = GridPos::new(row, col);

        let event = match &outcome {
            MoveOutcome::Planned { steps } => SimEvent::PathPlanned {
                agent: id,
                goal,
                steps: *steps,
            },
            MoveOutcome::Busy => SimEvent::CommandIgnored {
                agent: id,
                reason: "already walking".to_string(),
            },
            MoveOutcome::InvalidTarget => SimEvent::CommandIgnored {
                agent: id,
                reason: format!("({},{}) is not walkable", row, col),
            },
            MoveOutcome::NoPath(reason) => SimEvent::PathNotFound {
                agent: id,
                goal,
                reason: reason.to_string(),
            },
        };
        self.events.log(self.tick, event);
        Some(outcome)
    }

    /// Send every agent to the same point
    pub fn walk_all_to(&mut self, destination: Vec3, mode: CommandMode) {
        for actor in &mut self.actors {
            actor.walk_to(destination, mode);
        }
    }

    /// Send every agent along a fixed list of cells as chained scripted
    /// commands. Cells that are off the grid or blocked are skipped.
    /// Returns the number of cells issued.
    pub fn script_route(&mut self, route: &[(i32, i32)]) -> usize {
        let mut issued = 0;
        for &(row, col) in route {
            if !self.grid.is_walkable(row, col) {
                debug!("Route cell ({},{}) is not walkable, skipping", row, col);
                continue;
            }
            let destination = self.grid.world_position(row, col);
            self.walk_all_to(destination, CommandMode::Scripted);
            issued += 1;
        }
        issued
    }

    /// Plan for every agent, in registration order
    pub fn move_all_to(&mut self, row: i32, col: i32) -> Vec<(AgentId, MoveOutcome)> {
        self.ids()
            .into_iter()
            .filter_map(|id| self.move_to(id, row, col).map(|outcome| (id, outcome)))
            .collect()
    }

    /// Give one agent a random walk list sized by the agent config
    pub fn random_walk<R: Rng>(&mut self, id: AgentId, rng: &mut R) -> bool {
        let count = self.agent_config.walk_list_len;
        let extent = self.agent_config.walk_list_extent;
        match self.actor_mut(id) {
            Some(actor) => {
                actor.random_walk_list(rng, count, extent);
                true
            }
            None => false,
        }
    }

    pub fn set_flocking(&mut self, id: AgentId, flocking: bool) -> bool {
        let Some(actor) = self.actor_mut(id) else {
            return false;
        };
        let changed = actor.is_flocking() != flocking;
        actor.set_flocking(flocking);
        if changed {
            self.events.log(self.tick, SimEvent::FlockingChanged { agent: id, flocking });
        }
        true
    }

    pub fn toggle_flocking(&mut self, id: AgentId) -> bool {
        match self.actor(id).map(Actor::is_flocking) {
            Some(current) => self.set_flocking(id, !current),
            None => false,
        }
    }

    pub fn set_flocking_all(&mut self, flocking: bool) {
        for id in self.ids() {
            self.set_flocking(id, flocking);
        }
    }

    /// Every agent as of now, in registration order
    pub fn snapshot(&self) -> Vec<FlockMember> {
        self.actors.iter().map(Actor::member).collect()
    }

    /// Advance every agent by `dt` seconds
    pub fn step(&mut self, dt: f32) -> Vec<AgentUpdate> {
        self.tick += 1;
        let tick = self.tick;
        let snapshot = self.snapshot();

        let steering: Vec<Option<Vec3>> = snapshot
            .iter()
            .map(|me| me.flocking.then(|| compute_steering(&self.flock, me, &snapshot)))
            .collect();

        let mut updates = Vec::with_capacity(self.actors.len());
        let mut leaders = Vec::new();
        for (actor, steer) in self.actors.iter_mut().zip(steering) {
            let report = actor.update(dt, steer);
            if let Some(transition) = report.transition {
                debug!("[{}] {:?} at {:?}", actor.id, transition, actor.position);
                self.events.log(tick, SimEvent::from_transition(actor.id, transition));
                if transition == Transition::Stopped && actor.is_flocking() {
                    leaders.push(actor.id);
                }
            }
            updates.push(AgentUpdate {
                id: actor.id,
                position: actor.position,
                displacement: report.displacement,
                yaw_delta: report.yaw_delta,
                transition: report.transition,
            });
        }

        // One flocking agent stopping stops the whole flock
        if let Some(&leader) = leaders.first() {
            for (actor, update) in self.actors.iter_mut().zip(updates.iter_mut()) {
                if !actor.is_flocking() || leaders.contains(&actor.id) {
                    continue;
                }
                let was_queued = actor.is_walking() || actor.queue_len() > 0;
                if let Some(transition) = actor.halt() {
                    update.transition = Some(transition);
                }
                if was_queued {
                    info!("[{}] halted with the flock of {}", actor.id, leader);
                    self.events.log(tick, SimEvent::FlockHalted { agent: actor.id, leader });
                }
            }
        }

        // Moving flocking agents pull nearby loners in
        for recruiter in &snapshot {
            let still_walking = self.actor(recruiter.id).is_some_and(Actor::is_walking);
            if !(recruiter.flocking && recruiter.walking && still_walking) {
                continue;
            }
            for recruit in assimilate(&self.flock, recruiter, &snapshot) {
                if let Some(actor) = self.actor_mut(recruit) {
                    if !actor.is_flocking() {
                        actor.set_flocking(true);
                        info!("[{}] joined the flock of {}", recruit, recruiter.id);
                        self.events.log(
                            tick,
                            SimEvent::JoinedFlock {
                                agent: recruit,
                                recruiter: recruiter.id,
                            },
                        );
                    }
                }
            }
        }

        updates
    }

    /// Step until every agent is idle or `max_ticks` steps have run.
    /// Returns the number of steps taken.
    pub fn run_until_idle(&mut self, dt: f32, max_ticks: u32) -> u32 {
        for n in 0..max_ticks {
            if self.is_idle() {
                return n;
            }
            self.step(dt);
        }
        max_ticks
    }

    /// No agent walking and nothing queued
    pub fn is_idle(&self) -> bool {
        self.actors
            .iter()
            .all(|a| !a.is_walking() && a.queue_len() == 0)
    }

    fn index_of(&self, id: AgentId) -> Option<usize> {
        self.actors.iter().position(|a| a.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_rejects_blocked_and_out_of_range() {
        let grid = Grid::with_blocked(3, 3, 10.0, &[4]).unwrap();
        let mut sim = Simulation::new(grid);
        assert!(sim.spawn(1, 1).is_none());
        assert!(sim.spawn(5, 0).is_none());
        assert_eq!(sim.spawn(0, 0), Some(AgentId(0)));
        assert_eq!(sim.spawn(2, 2), Some(AgentId(1)));
        assert_eq!(sim.actor(AgentId(1)).unwrap().cell, Some(GridPos::new(2, 2)));
    }

    #[test]
    fn test_add_actor_keeps_free_id() {
        let grid = Grid::new(3, 3, 10.0).unwrap();
        let mut sim = Simulation::new(grid);
        let a = sim.add_actor(Actor::new(AgentId(7), Vec3::ZERO, 1.0));
        let b = sim.add_actor(Actor::new(AgentId(7), Vec3::ZERO, 1.0));
        assert_eq!(a, AgentId(7));
        assert_eq!(b, AgentId(8));
        assert_eq!(sim.spawn(0, 0), Some(AgentId(9)));
    }

    #[test]
    fn test_toggle_flocking_logs_change() {
        let grid = Grid::new(3, 3, 10.0).unwrap();
        let mut sim = Simulation::new(grid);
        let id = sim.spawn(0, 0).unwrap();
        assert!(sim.toggle_flocking(id));
        assert!(sim.actor(id).unwrap().is_flocking());
        assert!(!sim.toggle_flocking(AgentId(99)));
        assert!(sim
            .events()
            .events()
            .iter()
            .any(|e| e.event == SimEvent::FlockingChanged { agent: id, flocking: true }));
    }
}
