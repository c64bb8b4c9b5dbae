//! Restarting the driver from the files on disk must not change what the
//! agent does.
//!
//! Each run drives the same world twice: once in a single invocation, once
//! with the driver stopped every few steps and every in-memory object rebuilt
//! from `.burrow/state/`. The primitive call logs must match exactly.

use std::path::Path;

use burrow::core::materials::MaterialClassification;
use burrow::core::types::{Pose, Position};
use burrow::io::config::AgentConfig;
use burrow::io::init::AgentPaths;
use burrow::io::materials::default_materials;
use burrow::io::store::StateStore;
use burrow::looping::{LoopStop, run_loop};
use burrow::machine::TaskRecord;
use burrow::tasks::Task;
use burrow::tasks::branch::BranchMine;
use burrow::tasks::quarry::Quarry;
use burrow::test_support::{Container, GridWorld, ScriptedOperator};
use burrow::tracker::PositionTracker;

const STONE: &str = "minecraft:stone";

fn base_world() -> GridWorld {
    let mut world = GridWorld::open(Pose::default());
    world.fill(Position::new(-8, -4, -12), Position::new(8, 3, 4), STONE);
    world.clear(Position::ORIGIN);
    world.place_container(Position::new(0, 1, 0), Container::drop_box(5_000));
    world.place_container(Position::new(0, -1, 0), Container::fuel_box(50_000));
    world
}

fn seed_state<M: Task>(root: &Path, task: &TaskRecord<M>) {
    let paths = AgentPaths::new(root);
    std::fs::create_dir_all(&paths.state_dir).expect("state dir");
    paths.pose_store().save(&Pose::default()).expect("pose");
    paths
        .task_store::<TaskRecord<M>>()
        .save(task)
        .expect("task");
}

/// Drive the task in `root` to completion, restarting every `every` steps
/// (0 = never). Returns the number of invocations.
fn drive<M: Task>(
    root: &Path,
    world: &mut GridWorld,
    materials: &MaterialClassification,
    config: &AgentConfig,
    every: u64,
) -> usize {
    let paths = AgentPaths::new(root);
    let mut config = config.clone();
    config.driver.max_steps = every;
    for invocation in 1..=10_000 {
        let mut tracker = PositionTracker::load(paths.pose_store()).expect("load pose");
        let mut tasks = paths.task_store::<TaskRecord<M>>();
        let outcome = run_loop(
            world,
            &mut tracker,
            &mut tasks,
            materials,
            &config,
            &mut ScriptedOperator::default(),
            |_| {},
        )
        .expect("loop");
        match outcome.stop {
            LoopStop::Complete => return invocation,
            LoopStop::MaxSteps { .. } => {}
            LoopStop::Aborted { fatal } => panic!("halted: {fatal}"),
        }
    }
    panic!("task did not finish");
}

fn compare_runs<M: Task>(
    task: TaskRecord<M>,
    world: GridWorld,
    materials: &MaterialClassification,
    config: &AgentConfig,
    every: u64,
) -> GridWorld {
    let straight_dir = tempfile::tempdir().expect("tempdir");
    seed_state(straight_dir.path(), &task);
    let mut straight = world.clone();
    assert_eq!(drive::<M>(straight_dir.path(), &mut straight, materials, config, 0), 1);

    let restarted_dir = tempfile::tempdir().expect("tempdir");
    seed_state(restarted_dir.path(), &task);
    let mut restarted = world;
    let invocations = drive::<M>(restarted_dir.path(), &mut restarted, materials, config, every);
    assert!(invocations > 1, "expected restarts, got {invocations}");

    assert_eq!(restarted.calls(), straight.calls());
    assert_eq!(restarted.mined(), straight.mined());
    assert_eq!(restarted.pose(), straight.pose());

    let pose_raw = std::fs::read_to_string(AgentPaths::new(restarted_dir.path()).pose_path)
        .expect("pose file");
    assert!(pose_raw.starts_with(r#"{"kind":"pose","#), "{pose_raw}");
    let task_raw = std::fs::read_to_string(AgentPaths::new(restarted_dir.path()).task_path)
        .expect("task file");
    assert!(
        task_raw.starts_with(&format!(r#"{{"kind":"{}","#, M::KIND)),
        "{task_raw}"
    );
    restarted
}

#[test]
fn quarry_with_refuel_trips_survives_restarts() {
    let mut world = base_world();
    world.set_fuel(Some(40));
    let mut config = AgentConfig::default();
    config.fuel.reserve = 8;
    config.fuel.refuel_target = 400;
    let quarry = Quarry::new(Position::new(0, 0, 1), 3, 3, 3).expect("quarry");

    let world = compare_runs(
        TaskRecord::new(quarry.clone()),
        world,
        &MaterialClassification::default(),
        &config,
        7,
    );

    for index in 0..quarry.total() {
        assert_eq!(world.block(quarry.cell(index)), None);
    }
    assert_eq!(world.pose().position, Position::ORIGIN);
    assert_eq!(world.spilled(), 0);
}

#[test]
fn branch_mine_with_veins_survives_restarts() {
    let mut world = base_world();
    world.set_block(Position::new(2, 1, -4), "minecraft:coal_ore");
    world.set_block(Position::new(2, 2, -4), "minecraft:coal_ore");
    world.set_block(Position::new(3, 2, -4), "minecraft:coal_ore");
    world.set_block(Position::new(-4, 0, -7), "minecraft:diamond_ore");
    world.set_block(Position::new(-4, 0, -8), "minecraft:iron_ore");
    let mine = BranchMine::new(Position::ORIGIN, 2, 4, 6).expect("mine");

    let world = compare_runs(
        TaskRecord::new(mine),
        world,
        &default_materials(),
        &AgentConfig::default(),
        5,
    );

    for cell in [
        Position::new(3, 2, -4),
        Position::new(-4, 0, -7),
        Position::new(-4, 0, -8),
    ] {
        assert_eq!(world.block(cell), None, "{cell} left behind");
    }
    assert_eq!(world.pose().position, Position::ORIGIN);
}
