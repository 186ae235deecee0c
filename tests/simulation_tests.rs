mod common;

use common::{assert_approx_f32, grid_from_art};
use glam::Vec3;
use navflock::config::AgentsConfig;
use navflock::event_log::SimEvent;
use navflock::save_state::SaveState;
use navflock::{
    Actor, AgentId, CommandMode, Config, FlockParams, Grid, GridPos, Integration, MoveOutcome, Simulation,
    Transition,
};

fn open_sim() -> Simulation {
    Simulation::new(Grid::new(20, 20, 10.0).unwrap())
}

fn place(sim: &mut Simulation, id: u32, position: Vec3, speed: f32) -> AgentId {
    sim.add_actor(Actor::new(AgentId(id), position, speed))
}

#[test]
fn test_flocking_step_reads_snapshot() {
    let mut sim = open_sim();
    let a = place(&mut sim, 0, Vec3::new(-5.0, 0.0, 0.0), 10.0);
    let b = place(&mut sim, 1, Vec3::new(5.0, 0.0, 0.0), 10.0);
    sim.set_flocking_all(true);
    sim.walk_to(a, Vec3::new(-5.0, 0.0, 80.0), CommandMode::Interactive);
    sim.walk_to(b, Vec3::new(5.0, 0.0, 80.0), CommandMode::Interactive);

    let updates = sim.step(0.1);
    let (ua, ub) = (updates[0], updates[1]);
    assert_eq!(ua.id, a);
    assert_eq!(ub.id, b);

    // Mirror images: neither agent saw the other's new position
    assert_approx_f32(ua.displacement.x, -ub.displacement.x);
    assert_approx_f32(ua.displacement.z, ub.displacement.z);
    assert!(ua.displacement.z > 0.0);
    assert_eq!(ua.transition, Some(Transition::StartedWalking));
}

#[test]
fn test_step_order_does_not_matter() {
    let build = |reversed: bool| {
        let mut sim = open_sim();
        let mut specs = vec![
            (0, Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 90.0)),
            (1, Vec3::new(8.0, 0.0, 3.0), Vec3::new(40.0, 0.0, 90.0)),
            (2, Vec3::new(-6.0, 0.0, 9.0), Vec3::new(-40.0, 0.0, 90.0)),
        ];
        if reversed {
            specs.reverse();
        }
        for (id, pos, goal) in specs {
            let id = place(&mut sim, id, pos, 12.0);
            sim.set_flocking(id, true);
            sim.walk_to(id, goal, CommandMode::Scripted);
        }
        for _ in 0..5 {
            sim.step(0.1);
        }
        sim
    };

    let forward = build(false);
    let backward = build(true);
    for id in 0..3 {
        let p = forward.actor(AgentId(id)).unwrap().position;
        let q = backward.actor(AgentId(id)).unwrap().position;
        assert!(p.distance(q) < 1e-4, "agent {} diverged: {:?} vs {:?}", id, p, q);
    }
}

#[test]
fn test_walking_flocker_recruits_nearby_agents() {
    let mut sim = open_sim();
    let leader = place(&mut sim, 0, Vec3::ZERO, 10.0);
    let near = place(&mut sim, 1, Vec3::new(20.0, 0.0, 0.0), 10.0);
    let far = place(&mut sim, 2, Vec3::new(0.0, 0.0, 90.0), 10.0);
    sim.set_flocking(leader, true);

    // An idle flocker recruits nobody
    sim.step(0.1);
    assert!(!sim.actor(near).unwrap().is_flocking());

    sim.walk_to(leader, Vec3::new(-90.0, 0.0, 0.0), CommandMode::Interactive);
    sim.step(0.1);
    assert!(!sim.actor(near).unwrap().is_flocking(), "leader was idle at the start of this step");

    sim.step(0.1);
    assert!(sim.actor(near).unwrap().is_flocking());
    assert!(!sim.actor(far).unwrap().is_flocking());

    let joins: Vec<_> = sim
        .events()
        .events()
        .iter()
        .filter(|e| matches!(e.event, SimEvent::JoinedFlock { .. }))
        .collect();
    assert_eq!(joins.len(), 1);
    assert_eq!(
        joins[0].event,
        SimEvent::JoinedFlock {
            agent: near,
            recruiter: leader
        }
    );
    assert_eq!(joins[0].tick, 3);
}

#[test]
fn test_flock_halts_together() {
    let mut sim = open_sim();
    let short = place(&mut sim, 0, Vec3::ZERO, 10.0);
    let long = place(&mut sim, 1, Vec3::new(100.0, 0.0, 0.0), 10.0);
    let loner = place(&mut sim, 2, Vec3::new(-100.0, 0.0, 0.0), 10.0);
    sim.set_flocking(short, true);
    sim.set_flocking(long, true);

    // Within the arrival threshold, so it stops on the first step
    sim.walk_to(short, Vec3::new(1.0, 0.0, 0.0), CommandMode::Interactive);
    sim.walk_to(long, Vec3::new(100.0, 0.0, 90.0), CommandMode::Interactive);
    sim.walk_to(long, Vec3::new(0.0, 0.0, 90.0), CommandMode::Scripted);
    sim.walk_to(loner, Vec3::new(-100.0, 0.0, 90.0), CommandMode::Interactive);

    let updates = sim.step(0.1);
    assert_eq!(updates[0].transition, Some(Transition::Stopped));
    assert_eq!(updates[1].transition, Some(Transition::Stopped));

    let long_actor = sim.actor(long).unwrap();
    assert!(!long_actor.is_walking());
    assert_eq!(long_actor.queue_len(), 0);
    assert!(sim.actor(loner).unwrap().is_walking());

    assert!(sim.events().events().iter().any(|e| e.event
        == SimEvent::FlockHalted {
            agent: long,
            leader: short
        }));

    // Halts are counted on their own, not as part of the stops
    let summary = sim.events().summary();
    assert!(summary.contains("1 stops, 1 flock halts"), "{}", summary);
}

#[test]
fn test_move_all_to_reaches_goal() {
    let grid = grid_from_art(
        "
        □□□□□□
        □□□□□□
        ■■■■□■
        □□□□□□
        □□□□□□
        ",
        10.0,
    );
    let mut sim = Simulation::new(grid);
    let ids: Vec<_> = [(0, 0), (0, 5), (1, 2)]
        .iter()
        .map(|&(r, c)| sim.spawn(r, c).unwrap())
        .collect();

    let outcomes = sim.move_all_to(4, 0);
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes
        .iter()
        .all(|(_, o)| matches!(o, MoveOutcome::Planned { .. })));

    // Already holding a route
    assert_eq!(sim.move_to(ids[0], 3, 3), Some(MoveOutcome::Busy));
    assert_eq!(sim.move_to(AgentId(42), 3, 3), None);

    let ticks = sim.run_until_idle(0.1, 2000);
    assert!(ticks < 2000);
    for id in &ids {
        let actor = sim.actor(*id).unwrap();
        assert_eq!(actor.cell, Some(GridPos::new(4, 0)));
        assert_eq!(actor.position, sim.grid().world_position(4, 0));
    }

    let summary = sim.events().summary();
    println!("{}", summary);
    assert!(summary.contains("3 paths planned, 0 failed, 1 commands ignored"));
    assert!(summary.contains("3 walks started"));
}

#[test]
fn test_move_to_failure_is_logged() {
    let grid = Grid::with_blocked(3, 3, 10.0, &[3, 4, 5]).unwrap();
    let mut sim = Simulation::new(grid);
    let id = sim.spawn(0, 0).unwrap();

    assert!(matches!(sim.move_to(id, 2, 2), Some(MoveOutcome::NoPath(_))));
    assert_eq!(sim.move_to(id, 1, 1), Some(MoveOutcome::InvalidTarget));

    let kinds: Vec<_> = sim.events().for_agent(id).map(|e| &e.event).collect();
    assert!(matches!(kinds[0], SimEvent::Spawned { .. }));
    assert!(matches!(kinds[1], SimEvent::PathNotFound { .. }));
    assert!(matches!(kinds[2], SimEvent::CommandIgnored { .. }));
}

#[test]
fn test_walk_all_to_and_idle() {
    let mut sim = open_sim();
    place(&mut sim, 0, Vec3::ZERO, 50.0);
    place(&mut sim, 1, Vec3::new(20.0, 0.0, 0.0), 50.0);
    assert!(sim.is_idle());

    sim.walk_all_to(Vec3::new(10.0, 0.0, 30.0), CommandMode::Interactive);
    assert!(!sim.is_idle());

    sim.run_until_idle(0.1, 100);
    for actor in sim.actors() {
        assert_eq!(actor.position, Vec3::new(10.0, 0.0, 30.0));
    }
}

#[test]
fn test_scripted_route_is_walked_in_order() {
    let mut sim = Simulation::new(Grid::with_blocked(6, 6, 10.0, &[14]).unwrap());
    let a = sim.spawn(0, 0).unwrap();
    let b = sim.spawn(0, 2).unwrap();

    // (2,2) is blocked and (9,9) is off the grid
    let issued = sim.script_route(&[(0, 5), (2, 2), (5, 5), (9, 9), (5, 0)]);
    assert_eq!(issued, 3);
    assert_eq!(sim.actor(a).unwrap().queue_len(), 3);
    assert_eq!(sim.actor(b).unwrap().queue_len(), 3);

    let mut visited = Vec::new();
    for _ in 0..500 {
        for update in sim.step(0.1) {
            if update.id == a
                && matches!(update.transition, Some(Transition::ReachedWaypoint | Transition::Stopped))
            {
                visited.push(update.position);
            }
        }
        if sim.is_idle() {
            break;
        }
    }
    assert!(sim.is_idle());

    let grid = sim.grid();
    assert_eq!(
        visited,
        vec![grid.world_position(0, 5), grid.world_position(5, 5), grid.world_position(5, 0)]
    );
    assert_eq!(sim.actor(b).unwrap().position, grid.world_position(5, 0));
}

#[test]
fn test_from_config_builds_grid_and_tuning() {
    let config = Config::from_toml_str(
        r#"
        [grid]
        rows = 4
        cols = 6
        cell_size = 2.0
        blocked = [7, 8]

        [agents]
        walk_speed = 40.0
        integration = "homing"

        [flocking]
        assimilation_radius = 12.0

        [logging]
        enable_event_log = false
        "#,
    )
    .unwrap();

    let mut sim = Simulation::from_config(&config).unwrap();
    assert_eq!(sim.grid().rows(), 4);
    assert_eq!(sim.grid().cols(), 6);
    assert!(!sim.grid().is_walkable(1, 1));
    assert_eq!(sim.flock_params().assimilation_radius, 12.0);

    let id = sim.spawn(0, 0).unwrap();
    let actor = sim.actor(id).unwrap();
    assert_eq!(actor.speed, 40.0);
    assert_eq!(actor.integration, navflock::Integration::Homing);
    assert!(sim.events().events().is_empty());
}

#[test]
fn test_from_config_rejects_bad_grid() {
    let config = Config::from_toml_str("[grid]\nrows = 0").unwrap();
    assert!(Simulation::from_config(&config).is_err());
}

#[test]
fn test_save_and_restore() {
    let mut sim = Simulation::new(Grid::with_blocked(6, 6, 10.0, &[7, 14, 21]).unwrap());
    sim.grid_mut().place_obstacle(4, 4, 'T');
    sim.set_flock_params(FlockParams {
        assimilation_radius: 20.0,
        ..FlockParams::default()
    });
    sim.set_agent_config(AgentsConfig {
        arrival_threshold: 2.0,
        integration: Integration::Homing,
        ..AgentsConfig::default()
    });
    let a = sim.spawn(0, 0).unwrap();
    let b = sim.spawn(5, 5).unwrap();
    sim.set_flocking(b, true);
    sim.move_to(a, 5, 0);
    for _ in 0..7 {
        sim.step(0.1);
    }

    let saved = SaveState::from_simulation(&sim);
    assert_eq!(saved.blocked_cells, vec![7, 14, 21, 28]);
    assert_eq!(saved.tags, vec![(28, 'T')]);
    assert_eq!(saved.tick, 7);

    let path = std::env::temp_dir().join(format!("navflock_save_{}.json", std::process::id()));
    saved.save_to_file(&path).unwrap();
    let loaded = SaveState::load_from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(loaded, saved);

    let mut restored = loaded.restore().unwrap();
    assert_eq!(restored.grid().blocked_cells(), sim.grid().blocked_cells());
    assert_eq!(restored.grid().revision(), sim.grid().revision());
    assert_eq!(restored.grid().cell_at(4, 4).unwrap().tag, 'T');
    assert_eq!(restored.tick(), 7);
    assert_eq!(restored.flock_params(), sim.flock_params());
    assert_eq!(restored.agent_config(), sim.agent_config());
    assert_eq!(restored.ids(), vec![a, b]);
    for id in [a, b] {
        let before = sim.actor(id).unwrap();
        let after = restored.actor(id).unwrap();
        assert_eq!(after.position, before.position);
        assert_eq!(after.cell, before.cell);
        assert_eq!(after.is_flocking(), before.is_flocking());
        assert_eq!(after.arrival_threshold, 2.0);
        assert_eq!(after.integration, Integration::Homing);
        assert!(!after.is_walking());
    }

    // Ticks carry on from the save
    restored.step(0.1);
    assert_eq!(restored.tick(), 8);
}
