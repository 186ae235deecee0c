use glam::Vec3;
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::f32::consts::PI;
use std::fmt;

use crate::flocking::FlockMember;
use crate::grid::{Grid, GridPos};
use crate::pathfinding::{PathFailure, Pathfinder};

/// Stable handle for an agent inside a `Simulation`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionState {
    Idle,
    Walking,
}

/// How position is advanced while walking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Integration {
    /// Re-aim at the destination every tick; arrive within `arrival_threshold`
    Homing,
    /// Commit to a direction and count down the remaining distance
    Ballistic,
}

/// Whether `walk_to` replaces the queue or appends to it while walking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandMode {
    Interactive,
    /// Scripted playback issues a whole route as consecutive commands
    Scripted,
}

/// What happened to the motion state during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    /// Idle -> Walking; the host switches to the run clip
    StartedWalking,
    /// Reached a waypoint and took the next one from the queue
    ReachedWaypoint,
    /// Walking -> Idle; the host switches to the idle clip
    Stopped,
}

impl Transition {
    /// Animation clip the host should blend to, if the state changed
    pub fn animation(&self) -> Option<&'static str> {
        match self {
            Transition::StartedWalking => Some("run"),
            Transition::ReachedWaypoint => None,
            Transition::Stopped => Some("idle"),
        }
    }
}

/// Per-tick output for the renderer
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickReport {
    pub displacement: Vec3,
    /// Yaw change in radians about +Y, measured from +Z
    pub yaw_delta: f32,
    pub transition: Option<Transition>,
}

/// Result of `move_to`
#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// Path found and queued
    Planned { steps: usize },
    /// Already walking or holding a queued route; no replanning mid-walk
    Busy,
    /// Target missing or not walkable
    InvalidTarget,
    NoPath(PathFailure),
}

/// A queued destination; `cell` is claimed on arrival when present
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub position: Vec3,
    pub cell: Option<GridPos>,
}

/// Locomotion state machine for one agent
#[derive(Clone, Debug)]
pub struct Actor {
    pub id: AgentId,

    pub position: Vec3,

    /// Unit travel direction while walking, zero while idle
    pub direction: Vec3,

    /// Unit vector the body faces; used to report yaw deltas
    pub facing: Vec3,

    pub destination: Option<Waypoint>,

    walk_list: VecDeque<Waypoint>,

    state: MotionState,

    /// World units per second
    pub speed: f32,

    /// Distance left in ballistic mode
    remaining: f32,

    /// Homing arrival radius
    pub arrival_threshold: f32,

    /// Mode used when not flocking
    pub integration: Integration,

    flocking: bool,

    /// Cell claimed on arriving at a cell waypoint. Cleared on arrival at a
    /// plain world point and when halted mid-walk.
    pub cell: Option<GridPos>,
}

impl Actor {
    /// Create an idle actor at the given position
    pub fn new(id: AgentId, position: Vec3, speed: f32) -> Self {
        Actor {
            id,
            position,
            direction: Vec3::ZERO,
            facing: Vec3::Z,
            destination: None,
            walk_list: VecDeque::new(),
            state: MotionState::Idle,
            speed,
            remaining: 0.0,
            arrival_threshold: 5.0,
            integration: Integration::Ballistic,
            flocking: false,
            cell: None,
        }
    }

    /// Create an actor standing on the center of a cell
    pub fn at_cell(id: AgentId, grid: &Grid, pos: GridPos, speed: f32) -> Self {
        let mut actor = Self::new(id, grid.world_position(pos.row, pos.col), speed);
        actor.cell = Some(pos);
        actor
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn is_walking(&self) -> bool {
        self.state == MotionState::Walking
    }

    pub fn is_flocking(&self) -> bool {
        self.flocking
    }

    pub fn set_flocking(&mut self, flocking: bool) {
        self.flocking = flocking;
    }

    pub fn toggle_flocking(&mut self) {
        self.flocking = !self.flocking;
    }

    /// Flocking agents are displaced by shared steering, so they always home
    pub fn effective_integration(&self) -> Integration {
        if self.flocking {
            Integration::Homing
        } else {
            self.integration
        }
    }

    /// This agent as the flocking model sees it for the coming tick.
    ///
    /// An idle agent with queued waypoints already heads for the first one.
    pub fn member(&self) -> FlockMember {
        let heading = if self.is_walking() {
            self.direction
        } else {
            self.walk_list
                .front()
                .map_or(Vec3::ZERO, |w| (w.position - self.position).normalize_or_zero())
        };
        FlockMember {
            id: self.id,
            position: self.position,
            heading,
            flocking: self.flocking,
            walking: self.is_walking(),
        }
    }

    /// Distance still to cover in ballistic mode
    pub fn remaining_distance(&self) -> f32 {
        self.remaining
    }

    pub fn pending_waypoints(&self) -> impl Iterator<Item = &Waypoint> {
        self.walk_list.iter()
    }

    pub fn queue_len(&self) -> usize {
        self.walk_list.len()
    }

    /// Queue a world-space destination.
    ///
    /// While walking, an interactive command replaces the current route;
    /// a scripted one is appended so consecutive commands chain.
    pub fn walk_to(&mut self, destination: Vec3, mode: CommandMode) {
        self.enqueue(
            Waypoint {
                position: destination,
                cell: None,
            },
            mode,
        );
    }

    /// Queue the center of a cell. Missing or blocked cells are ignored.
    pub fn walk_to_cell(&mut self, grid: &Grid, row: i32, col: i32, mode: CommandMode) -> bool {
        match grid.cell_at(row, col) {
            Some(cell) if cell.is_walkable() => {
                self.enqueue(
                    Waypoint {
                        position: grid.world_position(row, col),
                        cell: Some(cell.pos()),
                    },
                    mode,
                );
                true
            }
            _ => false,
        }
    }

    fn enqueue(&mut self, mut waypoint: Waypoint, mode: CommandMode) {
        // Agents stay on their own plane
        waypoint.position.y = self.position.y;
        if self.is_walking() && mode == CommandMode::Interactive {
            self.state = MotionState::Idle;
            self.destination = None;
            self.direction = Vec3::ZERO;
            self.walk_list.clear();
        }
        self.walk_list.push_back(waypoint);
    }

    /// Plan around obstacles to a cell and queue every step of the path.
    ///
    /// Refused while walking (or with a route still queued) and for a
    /// non-walkable target.
    pub fn move_to(&mut self, grid: &Grid, pathfinder: &mut Pathfinder, row: i32, col: i32) -> MoveOutcome {
        if self.is_walking() || !self.walk_list.is_empty() {
            return MoveOutcome::Busy;
        }
        if !grid.is_walkable(row, col) {
            return MoveOutcome::InvalidTarget;
        }

        // The claimed cell is only trusted while we still stand inside it
        let start = match grid.cell_at_world(self.position) {
            Some(here) => here.pos(),
            None => self.cell.unwrap_or_else(|| grid.world_to_grid(self.position)),
        };

        match pathfinder.search(grid, start, GridPos::new(row, col)) {
            Ok(path) => {
                for step in path.steps() {
                    self.walk_to_cell(grid, step.row, step.col, CommandMode::Interactive);
                }
                MoveOutcome::Planned { steps: path.len() }
            }
            Err(reason) => {
                debug!("[{}] move_to ({},{}) failed: {}", self.id, row, col, reason);
                MoveOutcome::NoPath(reason)
            }
        }
    }

    /// Queue `count` random points within +/- `extent` on the XZ plane
    pub fn random_walk_list<R: Rng>(&mut self, rng: &mut R, count: usize, extent: f32) {
        if !(extent > 0.0) {
            debug!("[{}] random walk extent {} is empty", self.id, extent);
            return;
        }
        for _ in 0..count {
            let x = rng.gen_range(-extent..extent);
            let z = rng.gen_range(-extent..extent);
            self.walk_to(Vec3::new(x, self.position.y, z), CommandMode::Scripted);
        }
    }

    /// Stop where we stand and forget the route
    pub fn halt(&mut self) -> Option<Transition> {
        self.walk_list.clear();
        self.destination = None;
        self.direction = Vec3::ZERO;
        self.remaining = 0.0;
        if self.is_walking() {
            self.cell = None;
            self.state = MotionState::Idle;
            Some(Transition::Stopped)
        } else {
            None
        }
    }

    /// Pop the next waypoint and aim at it. Returns the yaw change.
    fn next_location(&mut self) -> Option<f32> {
        let Some(waypoint) = self.walk_list.pop_front() else {
            self.state = MotionState::Idle;
            self.destination = None;
            self.direction = Vec3::ZERO;
            self.remaining = 0.0;
            return None;
        };

        self.state = MotionState::Walking;
        self.destination = Some(waypoint);

        let to_target = waypoint.position - self.position;
        self.remaining = to_target.length();
        self.direction = to_target.normalize_or_zero();

        Some(self.rotate(self.direction))
    }

    /// Turn to face `towards`; returns the signed yaw change
    fn rotate(&mut self, towards: Vec3) -> f32 {
        let flat = Vec3::new(towards.x, 0.0, towards.z).normalize_or_zero();
        if flat == Vec3::ZERO {
            return 0.0;
        }
        let delta = wrap_angle(yaw_of(flat) - yaw_of(self.facing));
        self.facing = flat;
        delta
    }

    fn arrive(&mut self, report: &mut TickReport) {
        self.cell = self.destination.and_then(|w| w.cell);
        match self.next_location() {
            Some(yaw) => {
                report.yaw_delta += yaw;
                report.transition.get_or_insert(Transition::ReachedWaypoint);
            }
            None => {
                report.transition = Some(Transition::Stopped);
            }
        }
    }

    /// Advance one tick (call once per frame).
    ///
    /// `steering` is the flocking velocity for this tick; it is only used
    /// while the agent is flocking.
    pub fn update(&mut self, delta_time: f32, steering: Option<Vec3>) -> TickReport {
        let mut report = TickReport::default();
        let start = self.position;

        if !self.is_walking() {
            match self.next_location() {
                Some(yaw) => {
                    report.yaw_delta = yaw;
                    report.transition = Some(Transition::StartedWalking);
                }
                None => return report,
            }
        }

        let Some(destination) = self.destination.map(|w| w.position) else {
            return report;
        };
        let movement_this_frame = self.speed * delta_time;

        match self.effective_integration() {
            Integration::Ballistic => {
                if movement_this_frame >= self.remaining {
                    self.position = destination;
                    self.remaining = 0.0;
                    self.arrive(&mut report);
                } else {
                    self.position += self.direction * movement_this_frame;
                    self.remaining -= movement_this_frame;
                }
            }
            Integration::Homing => {
                let to_target = destination - self.position;
                let distance = to_target.length();

                if distance <= self.arrival_threshold {
                    self.remaining = 0.0;
                    self.arrive(&mut report);
                } else {
                    self.direction = to_target / distance;
                    self.remaining = distance;
                    match steering.filter(|_| self.flocking) {
                        Some(velocity) => {
                            self.position += velocity * movement_this_frame;
                        }
                        None if movement_this_frame >= distance => {
                            self.position = destination;
                            self.remaining = 0.0;
                            self.arrive(&mut report);
                        }
                        None => {
                            self.position += self.direction * movement_this_frame;
                        }
                    }
                }
            }
        }

        report.displacement = self.position - start;
        report
    }
}

fn yaw_of(v: Vec3) -> f32 {
    v.x.atan2(v.z)
}

/// Wrap to (-PI, PI]
fn wrap_angle(mut angle: f32) -> f32 {
    while angle > PI {
        angle -= 2.0 * PI;
    }
    while angle <= -PI {
        angle += 2.0 * PI;
    }
    angle
}
