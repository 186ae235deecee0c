//! Character dump of a grid after a search.
//!
//! One line per row, every cell followed by a space:
//! `S` start (`X` if no path was found), `E` goal, `0`-`9` path order
//! (cycling), `~` closed, `-` open, otherwise the cell's tag.

use std::fs;
use std::path::Path as FsPath;

use crate::error::NavResult;
use crate::grid::{Grid, GridPos};
use crate::pathfinding::{NodeStatus, Path, PathFailure, Pathfinder, SearchState};

/// Render the grid as left by the most recent search in `state`.
///
/// `path` is `None` when that search failed.
pub fn render(grid: &Grid, state: &SearchState, start: GridPos, goal: GridPos, path: Option<&Path>) -> String {
    let mut marks: Vec<Option<char>> = vec![None; grid.len()];

    if let Some(path) = path {
        for (i, step) in path.steps().iter().enumerate() {
            if let Some(id) = grid.id_of(step.row, step.col) {
                marks[id] = char::from_digit((i % 10) as u32, 10);
            }
        }
    }
    if let Some(id) = grid.id_of(start.row, start.col) {
        marks[id] = Some(if path.is_some() { 'S' } else { 'X' });
    }
    if let Some(id) = grid.id_of(goal.row, goal.col) {
        marks[id] = Some('E');
    }

    let mut out = String::with_capacity(grid.len() * 2 + grid.rows() as usize);
    for cell in grid.cells() {
        let ch = marks[cell.id].unwrap_or(match state.status(cell.id) {
            NodeStatus::Closed => '~',
            NodeStatus::Open => '-',
            NodeStatus::Unvisited => cell.tag,
        });
        out.push(ch);
        out.push(' ');
        if cell.col == grid.cols() - 1 {
            out.push('\n');
        }
    }
    out
}

/// Run a search and render what it left behind, handing back the result too
pub fn dump_search(
    grid: &Grid,
    pathfinder: &mut Pathfinder,
    start: GridPos,
    goal: GridPos,
) -> (String, Result<Path, PathFailure>) {
    let result = pathfinder.search(grid, start, goal);
    let dump = render(grid, pathfinder.state(), start, goal, result.as_ref().ok());
    (dump, result)
}

/// Write a rendered dump to disk
pub fn write_to_file<P: AsRef<FsPath>>(path: P, dump: &str) -> NavResult<()> {
    fs::write(path, dump)?;
    Ok(())
}
