use navflock::{Grid, GridPos, Path};

/// Build a grid from character art.
/// Format:
/// - ■: blocked cell
/// - □: free cell
///
/// Blank lines and surrounding whitespace are ignored.
pub fn grid_from_art(art: &str, cell_size: f32) -> Grid {
    let lines: Vec<&str> = art
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let rows = lines.len() as i32;
    let cols = lines.first().map_or(0, |l| l.chars().count()) as i32;
    let mut grid = Grid::new(rows, cols, cell_size).expect("art must describe a non-empty grid");

    for (row, line) in lines.iter().enumerate() {
        assert_eq!(line.chars().count() as i32, cols, "ragged row {} in grid art", row);
        for (col, ch) in line.chars().enumerate() {
            if ch == '■' {
                grid.set_occupied(row as i32, col as i32);
            }
        }
    }
    grid
}

/// Visualize a path on a grid
pub fn visualize_path(grid: &Grid, path: &Path, start: GridPos, goal: GridPos) -> String {
    let mut result = String::new();
    result.push_str(&format!(
        "\nPath: {}\nLength: {} steps, Cost: {:.2}\n\n",
        navflock::pathfinding::format_path(path),
        path.len(),
        path.cost()
    ));

    for row in 0..grid.rows() {
        for col in 0..grid.cols() {
            let pos = GridPos::new(row, col);
            let symbol = if pos == start {
                'S'
            } else if pos == goal {
                'D'
            } else if path.steps().contains(&pos) {
                '*'
            } else if !grid.is_walkable(row, col) {
                '■'
            } else {
                '□'
            };
            result.push(symbol);
        }
        result.push('\n');
    }
    result
}

/// Every step is one king move from the previous one and lands on a walkable cell
pub fn assert_valid_path(grid: &Grid, path: &Path, start: GridPos) {
    let mut prev = start;
    for step in path.steps() {
        assert_eq!(prev.chebyshev(step), 1, "step {:?} -> {:?} is not adjacent", prev, step);
        assert!(grid.is_walkable(step.row, step.col), "step {:?} is blocked", step);
        prev = *step;
    }
}

pub fn assert_approx(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-4,
        "expected {:.5}, got {:.5}",
        expected,
        actual
    );
}

pub fn assert_approx_f32(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-4,
        "expected {:.5}, got {:.5}",
        expected,
        actual
    );
}
