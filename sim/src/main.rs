mod case;
mod cli;
mod config;
mod judge;
mod outcome;
mod results;
mod run;
mod world;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sim", version, about = "Simulation harness for burrow")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List cases under `sim/cases/`.
    List,
    /// Generate the case's world and drive its task to the end.
    Run {
        case_id: String,
        #[arg(long, default_value_t = 1)]
        runs: u32,
        /// Ask on the console when the agent halts instead of aborting.
        #[arg(long)]
        interactive: bool,
    },
    /// Remove a case's workspaces and results.
    Clean { case_id: String },
}

fn main() -> Result<()> {
    burrow::logging::init();
    let cli = Cli::parse();
    let repo_root = std::env::current_dir()?;
    match cli.command {
        Command::List => cli::list_cases(&repo_root),
        Command::Run {
            case_id,
            runs,
            interactive,
        } => cli::run_case_by_id(&repo_root, &case_id, runs, interactive),
        Command::Clean { case_id } => cli::clean_case(&repo_root, &case_id),
    }
}
