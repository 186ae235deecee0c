use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::actor::{AgentId, Transition};
use crate::error::NavResult;
use crate::grid::GridPos;

/// Things that happen to agents during a simulation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    /// Agent registered at a cell
    Spawned { agent: AgentId, cell: GridPos },
    /// Idle -> Walking
    StartedWalking { agent: AgentId },
    /// Arrived at a waypoint with more queued
    ReachedWaypoint { agent: AgentId },
    /// Walking -> Idle
    Stopped { agent: AgentId },
    /// Stopped because another flocking agent stopped
    FlockHalted { agent: AgentId, leader: AgentId },
    /// Picked up by a moving flocking agent
    JoinedFlock { agent: AgentId, recruiter: AgentId },
    /// Flocking switched on or off by a command
    FlockingChanged { agent: AgentId, flocking: bool },
    /// `move_to` found a route
    PathPlanned { agent: AgentId, goal: GridPos, steps: usize },
    /// `move_to` found nothing
    PathNotFound { agent: AgentId, goal: GridPos, reason: String },
    /// Command refused (already walking, bad target)
    CommandIgnored { agent: AgentId, reason: String },
}

impl SimEvent {
    pub fn agent(&self) -> AgentId {
        match self {
            SimEvent::Spawned { agent, .. }
            | SimEvent::StartedWalking { agent }
            | SimEvent::ReachedWaypoint { agent }
            | SimEvent::Stopped { agent }
            | SimEvent::FlockHalted { agent, .. }
            | SimEvent::JoinedFlock { agent, .. }
            | SimEvent::FlockingChanged { agent, .. }
            | SimEvent::PathPlanned { agent, .. }
            | SimEvent::PathNotFound { agent, .. }
            | SimEvent::CommandIgnored { agent, .. } => *agent,
        }
    }

    pub fn from_transition(agent: AgentId, transition: Transition) -> Self {
        match transition {
            Transition::StartedWalking => SimEvent::StartedWalking { agent },
            Transition::ReachedWaypoint => SimEvent::ReachedWaypoint { agent },
            Transition::Stopped => SimEvent::Stopped { agent },
        }
    }
}

/// Logged event with the tick it happened on
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoggedEvent {
    /// Step the event happened in; commands issued before the first step are tick 0
    pub tick: u64,
    pub event: SimEvent,
}

/// Event logger
#[derive(Debug, Default)]
pub struct EventLog {
    enabled: bool,
    events: Vec<LoggedEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        EventLog {
            enabled: true,
            events: Vec::new(),
        }
    }

    /// A log that drops everything
    pub fn disabled() -> Self {
        EventLog::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn log(&mut self, tick: u64, event: SimEvent) {
        if self.enabled {
            self.events.push(LoggedEvent { tick, event });
        }
    }

    pub fn events(&self) -> &[LoggedEvent] {
        &self.events
    }

    /// Events concerning one agent, in order
    pub fn for_agent(&self, agent: AgentId) -> impl Iterator<Item = &LoggedEvent> {
        self.events.iter().filter(move |e| e.event.agent() == agent)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Save log to JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> NavResult<()> {
        let json = serde_json::to_string_pretty(&self.events)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> NavResult<Self> {
        let json = fs::read_to_string(path)?;
        let events: Vec<LoggedEvent> = serde_json::from_str(&json)?;
        Ok(EventLog {
            enabled: true,
            events,
        })
    }

    /// Print log to console
    pub fn print(&self) {
        println!("\n=== Event Log ({} events) ===", self.events.len());
        for (i, logged) in self.events.iter().enumerate() {
            println!("[tick {:5}] #{:3} {:?}", logged.tick, i + 1, logged.event);
        }
        println!("=== End of Log ===\n");
    }

    /// Get summary statistics
    pub fn summary(&self) -> String {
        let mut walks = 0;
        let mut waypoints = 0;
        let mut stops = 0;
        let mut flock_halts = 0;
        let mut joins = 0;
        let mut planned = 0;
        let mut failed = 0;
        let mut ignored = 0;

        for logged in &self.events {
            match &logged.event {
                SimEvent::StartedWalking { .. } => walks += 1,
                SimEvent::ReachedWaypoint { .. } => waypoints += 1,
                SimEvent::Stopped { .. } => stops += 1,
                SimEvent::FlockHalted { .. } => flock_halts += 1,
                SimEvent::JoinedFlock { .. } => joins += 1,
                SimEvent::PathPlanned { .. } => planned += 1,
                SimEvent::PathNotFound { .. } => failed += 1,
                SimEvent::CommandIgnored { .. } => ignored += 1,
                SimEvent::Spawned { .. } | SimEvent::FlockingChanged { .. } => {}
            }
        }

        let last_tick = self.events.last().map_or(0, |e| e.tick);

        format!(
            "Last Event Tick: {}\n\
             Total Events: {}\n\
             Locomotion: {} walks started, {} waypoints reached, {} stops, {} flock halts\n\
             Flocking: {} agents joined\n\
             Planning: {} paths planned, {} failed, {} commands ignored",
            last_tick,
            self.events.len(),
            walks,
            waypoints,
            stops,
            flock_halts,
            joins,
            planned,
            failed,
            ignored
        )
    }
}
