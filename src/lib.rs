pub mod actor;
pub mod config;
pub mod debug_dump;
pub mod error;
pub mod event_log;
pub mod flocking;
pub mod grid;
pub mod pathfinding;
pub mod save_state;
pub mod simulation;

pub use actor::{Actor, AgentId, CommandMode, Integration, MotionState, MoveOutcome, Transition};
pub use config::Config;
pub use error::{NavError, NavResult};
pub use flocking::FlockParams;
pub use grid::{Grid, GridPos};
pub use pathfinding::{Path, PathFailure, Pathfinder};
pub use simulation::{AgentUpdate, Simulation};
