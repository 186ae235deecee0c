use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::process::ExitCode;

use navflock::debug_dump;
use navflock::pathfinding::format_path;
use navflock::save_state::SaveState;
use navflock::{Config, GridPos, MoveOutcome, NavResult, Simulation};

fn run(config: &Config, save_path: Option<&str>) -> NavResult<()> {
    let scenario = &config.scenario;
    let mut sim = Simulation::from_config(config)?;

    for &(row, col) in &scenario.spawns {
        if sim.spawn(row, col).is_none() {
            warn!("Cannot spawn at ({},{}), skipping", row, col);
        }
    }
    if scenario.flocking {
        sim.set_flocking_all(true);
    }

    let (goal_row, goal_col) = scenario.goal;
    if scenario.random_walk {
        let mut rng = StdRng::seed_from_u64(scenario.seed);
        for id in sim.ids() {
            sim.random_walk(id, &mut rng);
        }
    } else if scenario.scripted {
        let route = if scenario.route.is_empty() {
            vec![scenario.goal]
        } else {
            scenario.route.clone()
        };
        let issued = sim.script_route(&route);
        info!("Scripted route: {} of {} cells issued to every agent", issued, route.len());
    } else {
        for (id, outcome) in sim.move_all_to(goal_row, goal_col) {
            match outcome {
                MoveOutcome::Planned { steps } => info!("{}: {} steps to goal", id, steps),
                other => warn!("{}: {:?}", id, other),
            }
        }
    }

    // Show the search for the first spawn
    if let Some(&(row, col)) = scenario.spawns.first() {
        let start = GridPos::new(row, col);
        let goal = GridPos::new(goal_row, goal_col);
        let grid = sim.grid().clone();
        let (dump, result) = debug_dump::dump_search(&grid, sim.pathfinder_mut(), start, goal);
        println!("{}", dump);
        match result {
            Ok(path) => println!("Path: {}", format_path(&path)),
            Err(reason) => println!("No path: {}", reason),
        }
        if let Some(dump_path) = &config.pathfinding.dump_path {
            debug_dump::write_to_file(dump_path, &dump)?;
            info!("Search dump written to {}", dump_path);
        }
    }

    let ticks = sim.run_until_idle(scenario.dt, scenario.ticks);
    info!("Simulation settled after {} ticks", ticks);

    for actor in sim.actors() {
        println!(
            "{} at ({:.1}, {:.1}) cell {:?} {:?}{}",
            actor.id,
            actor.position.x,
            actor.position.z,
            actor.cell.map(|c| (c.row, c.col)),
            actor.state(),
            if actor.is_flocking() { " [flock]" } else { "" }
        );
    }

    println!("\n{}", sim.events().summary());
    if config.logging.enable_event_log {
        sim.events().save_to_file(&config.logging.event_log_path)?;
        info!("Event log written to {}", config.logging.event_log_path);
    }

    if let Some(path) = save_path {
        SaveState::from_simulation(&sim).save_to_file(path)?;
        info!("State saved to {}", path);
    }

    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let save_path = args.iter().position(|a| a == "--save").and_then(|i| args.get(i + 1));
    let config_path = args
        .iter()
        .skip(1)
        .find(|a| !a.starts_with("--") && Some(*a) != save_path)
        .map(String::as_str)
        .unwrap_or("config.toml");

    let loaded = Config::from_file(config_path);
    let level = loaded
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = match loaded {
        Ok(config) => {
            info!("Loaded configuration from {}", config_path);
            config
        }
        Err(e) => {
            warn!("Using default configuration ({}: {})", config_path, e);
            Config::default()
        }
    };

    match run(&config, save_path.map(String::as_str)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
