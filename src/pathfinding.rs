use crate::grid::{CellId, Grid, GridPos};
use glam::Vec3;
use log::{debug, trace};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use thiserror::Error;

/// Why a search produced no path
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathFailure {
    #[error("start ({}, {}) is outside the grid", .0.row, .0.col)]
    StartOutOfBounds(GridPos),

    #[error("goal ({}, {}) is outside the grid", .0.row, .0.col)]
    GoalOutOfBounds(GridPos),

    #[error("goal ({}, {}) is not walkable", .0.row, .0.col)]
    GoalBlocked(GridPos),

    #[error("goal unreachable after {expansions} expansions")]
    Unreachable { expansions: usize },

    #[error("gave up after {limit} expansions")]
    ExpansionLimit { limit: usize },
}

/// Ordered cells from start (exclusive) to goal (inclusive)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    steps: Vec<GridPos>,
    cost: f64,
}

impl Path {
    /// The "no path" value
    pub fn empty() -> Self {
        Path::default()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn steps(&self) -> &[GridPos] {
        &self.steps
    }

    /// Sum of step costs along the path
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// World-space waypoint for every step
    pub fn waypoints(&self, grid: &Grid) -> Vec<Vec3> {
        self.steps
            .iter()
            .map(|p| grid.world_position(p.row, p.col))
            .collect()
    }

    pub fn into_steps(self) -> Vec<GridPos> {
        self.steps
    }
}

/// Open/closed/unvisited marker for one cell in the current search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Unvisited,
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy)]
struct NodeRecord {
    g: f64,
    h: f64,
    f: f64,
    parent: Option<CellId>,
    /// Generation this record was last written in
    stamp: u32,
    closed: bool,
}

impl Default for NodeRecord {
    fn default() -> Self {
        NodeRecord {
            g: 0.0,
            h: 0.0,
            f: 0.0,
            parent: None,
            stamp: 0,
            closed: false,
        }
    }
}

/// Heap entry; stale once the node's f drops below `f` or the node closes
#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    f: f64,
    id: CellId,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (BinaryHeap is max-heap by default)
        other
            .f
            .partial_cmp(&self.f)
            .unwrap_or(Ordering::Equal)
            // Tie-breaker: lowest row-major id wins
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Per-search bookkeeping, reused across searches.
///
/// Records are invalidated by bumping `generation` instead of clearing the
/// arrays, so a warm `SearchState` does not allocate. A single instance must
/// not be shared by concurrent searches; give each thread its own.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    nodes: Vec<NodeRecord>,
    generation: u32,
    open: BinaryHeap<OpenEntry>,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation sized for `cell_count` cells
    fn begin(&mut self, cell_count: usize) {
        if self.nodes.len() != cell_count {
            self.nodes.clear();
            self.nodes.resize(cell_count, NodeRecord::default());
            self.generation = 0;
        }
        self.generation = match self.generation.checked_add(1) {
            Some(g) => g,
            None => {
                for node in &mut self.nodes {
                    node.stamp = 0;
                }
                1
            }
        };
        self.open.clear();
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Status of a cell as of the most recent search
    pub fn status(&self, id: CellId) -> NodeStatus {
        match self.nodes.get(id) {
            Some(n) if self.generation != 0 && n.stamp == self.generation => {
                if n.closed {
                    NodeStatus::Closed
                } else {
                    NodeStatus::Open
                }
            }
            _ => NodeStatus::Unvisited,
        }
    }

    /// Best known (g, h, f) for a visited cell
    pub fn costs(&self, id: CellId) -> Option<(f64, f64, f64)> {
        match self.status(id) {
            NodeStatus::Unvisited => None,
            _ => {
                let n = &self.nodes[id];
                Some((n.g, n.h, n.f))
            }
        }
    }

    pub fn parent(&self, id: CellId) -> Option<CellId> {
        match self.status(id) {
            NodeStatus::Unvisited => None,
            _ => self.nodes[id].parent,
        }
    }

    fn touch(&mut self, id: CellId) -> &mut NodeRecord {
        let generation = self.generation;
        let node = &mut self.nodes[id];
        if node.stamp != generation {
            *node = NodeRecord {
                stamp: generation,
                ..NodeRecord::default()
            };
        }
        node
    }

    fn close(&mut self, id: CellId) {
        self.touch(id).closed = true;
    }

    fn open_or_improve(&mut self, id: CellId, g: f64, h: f64, parent: CellId) -> bool {
        let node = self.touch(id);
        // Every opened node has a parent; only the start has none and it is closed
        if node.parent.is_none() || g < node.g {
            node.g = g;
            node.h = h;
            node.f = g + h;
            node.parent = Some(parent);
            let f = node.f;
            self.open.push(OpenEntry { f, id });
            true
        } else {
            false
        }
    }

    /// Pop the open node with the lowest f, skipping stale heap entries
    fn pop_lowest(&mut self) -> Option<CellId> {
        while let Some(entry) = self.open.pop() {
            let node = &self.nodes[entry.id];
            if node.stamp == self.generation && !node.closed && node.f == entry.f {
                return Some(entry.id);
            }
        }
        None
    }
}

/// A* over the 8-connected grid.
///
/// Step costs are `cell_size` (axis) and `cell_size * sqrt(2)` (diagonal);
/// the heuristic is the Manhattan distance in world units. Blocked cells are
/// skipped; diagonal steps between two blocked orthogonals are allowed.
#[derive(Debug, Clone, Default)]
pub struct Pathfinder {
    state: SearchState,
    max_expansions: Option<usize>,
    last_expansions: usize,
}

impl Pathfinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up after `limit` node expansions
    pub fn with_max_expansions(limit: usize) -> Self {
        Pathfinder {
            max_expansions: Some(limit),
            ..Self::default()
        }
    }

    pub fn set_max_expansions(&mut self, limit: Option<usize>) {
        self.max_expansions = limit;
    }

    pub fn max_expansions(&self) -> Option<usize> {
        self.max_expansions
    }

    /// Bookkeeping of the most recent search, for debug dumps
    pub fn state(&self) -> &SearchState {
        &self.state
    }

    /// Nodes closed by the most recent search
    pub fn last_expansions(&self) -> usize {
        self.last_expansions
    }

    /// Find a path; any failure is logged and yields an empty path
    pub fn find_path(&mut self, grid: &Grid, start: GridPos, goal: GridPos) -> Path {
        match self.search(grid, start, goal) {
            Ok(path) => path,
            Err(reason) => {
                debug!(
                    "[find_path] no path ({},{}) -> ({},{}): {}",
                    start.row, start.col, goal.row, goal.col, reason
                );
                Path::empty()
            }
        }
    }

    /// Run A* and report why it failed, if it did
    pub fn search(&mut self, grid: &Grid, start: GridPos, goal: GridPos) -> Result<Path, PathFailure> {
        self.last_expansions = 0;

        let start_id = grid
            .id_of(start.row, start.col)
            .ok_or(PathFailure::StartOutOfBounds(start))?;
        let goal_id = grid
            .id_of(goal.row, goal.col)
            .ok_or(PathFailure::GoalOutOfBounds(goal))?;
        if !grid.is_walkable(goal.row, goal.col) {
            return Err(PathFailure::GoalBlocked(goal));
        }

        let straight_cost = grid.cell_size() as f64;
        let diagonal_cost = straight_cost * std::f64::consts::SQRT_2;

        self.state.begin(grid.len());
        self.state.close(start_id);

        let mut current = start_id;
        let mut expansions = 0;

        while self.state.status(goal_id) != NodeStatus::Closed {
            expansions += 1;
            if let Some(limit) = self.max_expansions {
                if expansions > limit {
                    self.last_expansions = expansions - 1;
                    return Err(PathFailure::ExpansionLimit { limit });
                }
            }

            let cell = &grid.cells()[current];
            let g_current = self.state.nodes[current].g;

            for (dir, neighbor) in grid.neighbors(cell) {
                if !neighbor.is_walkable() || self.state.status(neighbor.id) == NodeStatus::Closed {
                    continue;
                }
                let step = if dir.is_diagonal() { diagonal_cost } else { straight_cost };
                let h = grid.manhattan_distance(neighbor.pos(), goal) as f64;
                if self.state.open_or_improve(neighbor.id, g_current + step, h, current) {
                    trace!(
                        "[A*] ({},{}) g={:.2} h={:.2} via ({},{})",
                        neighbor.row,
                        neighbor.col,
                        g_current + step,
                        h,
                        cell.row,
                        cell.col
                    );
                }
            }

            match self.state.pop_lowest() {
                Some(next) => {
                    self.state.close(next);
                    current = next;
                }
                None => {
                    self.last_expansions = expansions;
                    return Err(PathFailure::Unreachable { expansions });
                }
            }
        }
        self.last_expansions = expansions;

        let path = self.reconstruct(grid, start_id, goal_id);
        debug!(
            "[find_path] ({},{}) -> ({},{}): {} steps, cost {:.2}, {} expansions",
            start.row,
            start.col,
            goal.row,
            goal.col,
            path.len(),
            path.cost(),
            expansions
        );
        Ok(path)
    }

    fn reconstruct(&self, grid: &Grid, start_id: CellId, goal_id: CellId) -> Path {
        let mut steps = Vec::new();
        let mut id = goal_id;
        while id != start_id {
            steps.push(grid.coords(id));
            match self.state.nodes[id].parent {
                Some(parent) => id = parent,
                None => break,
            }
        }
        steps.reverse();

        Path {
            steps,
            cost: self.state.nodes[goal_id].g,
        }
    }
}

/// Format path for display
pub fn format_path(path: &Path) -> String {
    if path.is_empty() {
        return "No path".to_string();
    }

    path.steps()
        .iter()
        .map(|p| format!("({},{})", p.row, p.col))
        .collect::<Vec<_>>()
        .join(" -> ")
}
