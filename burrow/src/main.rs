use std::path::Path;

use anyhow::{Context, Result, anyhow};
use burrow::core::types::{Heading, Pose, Position};
use burrow::exit_codes;
use burrow::io::init::{AgentPaths, InitOptions, init_agent};
use burrow::io::store::StateStore;
use burrow::logging;
use burrow::start::{TaskSpec, start_task};
use burrow::tasks::{AnyTask, TaskSummary};
use burrow::validate::validate_agent;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "burrow",
    version,
    about = "Dead-reckoning excavation agent with resumable tasks"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create `.burrow/` with config, materials and a pose record.
    Init {
        /// Overwrite existing files (drops any task record).
        #[arg(short, long)]
        force: bool,
        /// Starting position; also becomes the base.
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        x: i64,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        y: i64,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        z: i64,
        #[arg(long, value_enum, default_value_t = HeadingArg::North)]
        heading: HeadingArg,
    },
    /// Check config, materials, pose and task record.
    Validate,
    /// Write a fresh task record anchored at the current pose.
    Start {
        /// Replace an unfinished task.
        #[arg(short, long, global = true)]
        force: bool,
        #[command(subcommand)]
        task: StartCommand,
    },
    /// Print the pose and task progress.
    Status {
        /// Print the task summary as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum StartCommand {
    /// Clear a width x length x depth volume below the agent.
    Quarry {
        #[arg(long)]
        width: u32,
        #[arg(long)]
        length: u32,
        #[arg(long)]
        depth: u32,
    },
    /// Dig parallel tunnels off a trunk and follow ore veins.
    Branch {
        #[arg(long)]
        branches: u32,
        #[arg(long, default_value_t = 3)]
        spacing: u32,
        #[arg(long)]
        length: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum HeadingArg {
    North,
    East,
    South,
    West,
}

impl From<HeadingArg> for Heading {
    fn from(arg: HeadingArg) -> Self {
        match arg {
            HeadingArg::North => Heading::North,
            HeadingArg::East => Heading::East,
            HeadingArg::South => Heading::South,
            HeadingArg::West => Heading::West,
        }
    }
}

impl From<StartCommand> for TaskSpec {
    fn from(command: StartCommand) -> Self {
        match command {
            StartCommand::Quarry {
                width,
                length,
                depth,
            } => TaskSpec::Quarry {
                width,
                length,
                depth,
            },
            StartCommand::Branch {
                branches,
                spacing,
                length,
            } => TaskSpec::BranchMine {
                branches,
                spacing,
                length,
            },
        }
    }
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let root = std::env::current_dir().context("resolve current directory")?;
    match cli.command {
        Command::Init {
            force,
            x,
            y,
            z,
            heading,
        } => cmd_init(&root, force, Pose::new(Position::new(x, y, z), heading.into())),
        Command::Validate => cmd_validate(&root),
        Command::Start { force, task } => cmd_start(&root, task.into(), force),
        Command::Status { json } => cmd_status(&root, json),
    }
}

fn cmd_init(root: &Path, force: bool, pose: Pose) -> Result<i32> {
    let paths = init_agent(root, &InitOptions { force, pose })?;
    println!("initialized {} at {pose}", paths.agent_dir.display());
    Ok(exit_codes::OK)
}

fn cmd_validate(root: &Path) -> Result<i32> {
    let outcome = validate_agent(root)?;
    match outcome.task {
        Some(summary) => println!("ok: {} task, {}", summary.kind, summary.progress),
        None => println!("ok: no task started"),
    }
    Ok(exit_codes::OK)
}

fn cmd_start(root: &Path, spec: TaskSpec, force: bool) -> Result<i32> {
    let task = start_task(root, &spec, force)?;
    let summary = task.summary();
    println!("started {} task: {}", summary.kind, summary.progress);
    Ok(exit_codes::OK)
}

fn cmd_status(root: &Path, json: bool) -> Result<i32> {
    let paths = AgentPaths::new(root);
    let pose = paths
        .pose_store()
        .load()?
        .ok_or_else(|| anyhow!("missing {} (run `burrow init`)", paths.pose_path.display()))?;
    let summary = AnyTask::load(&paths.task_path)?.map(|task| task.summary());

    if json {
        let payload = serde_json::json!({ "pose": pose, "task": summary });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("pose: {pose}");
        match &summary {
            Some(summary) => print_summary(summary),
            None => println!("task: none"),
        }
    }

    Ok(match summary {
        Some(summary) if summary.finished => exit_codes::COMPLETE,
        Some(summary) if summary.halted.is_some() => exit_codes::HALTED,
        _ => exit_codes::OK,
    })
}

fn print_summary(summary: &TaskSummary) {
    println!("task: {} ({} steps)", summary.kind, summary.steps);
    println!("phase: {}", summary.phase);
    println!("progress: {}", summary.progress);
    if let Some(fatal) = &summary.halted {
        println!("halted: {fatal}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_start_quarry() {
        let cli = Cli::try_parse_from([
            "burrow", "start", "quarry", "--width", "4", "--length", "5", "--depth", "2",
        ])
        .expect("parse");
        let Command::Start { force, task } = cli.command else {
            panic!("expected start");
        };
        assert!(!force);
        assert_eq!(
            TaskSpec::from(task),
            TaskSpec::Quarry {
                width: 4,
                length: 5,
                depth: 2
            }
        );
    }

    #[test]
    fn parses_start_branch_with_default_spacing_and_force() {
        let cli = Cli::try_parse_from([
            "burrow", "start", "branch", "--branches", "6", "--length", "24", "--force",
        ])
        .expect("parse");
        let Command::Start { force, task } = cli.command else {
            panic!("expected start");
        };
        assert!(force);
        assert_eq!(
            TaskSpec::from(task),
            TaskSpec::BranchMine {
                branches: 6,
                spacing: 3,
                length: 24
            }
        );
    }

    #[test]
    fn parses_init_pose_with_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "burrow", "init", "--x", "-12", "--y", "40", "--z", "-3", "--heading", "west",
        ])
        .expect("parse");
        let Command::Init {
            x, y, z, heading, ..
        } = cli.command
        else {
            panic!("expected init");
        };
        assert_eq!((x, y, z), (-12, 40, -3));
        assert_eq!(Heading::from(heading), Heading::West);
    }

    #[test]
    fn start_requires_dimensions() {
        assert!(Cli::try_parse_from(["burrow", "start", "quarry", "--width", "4"]).is_err());
    }
}
