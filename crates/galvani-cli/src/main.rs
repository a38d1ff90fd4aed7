//! Command-line interface for the Galvani circuit simulator.

mod output;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use galvani_core::{Circuit, DEFAULT_CIRCUIT_FILE};
use galvani_solver::{goal_seek_parameter, normalize_circuit, solve_circuit, GoalSeekRequest};

#[derive(Parser)]
#[command(name = "galvani", about = "Educational DC circuit simulator", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Solve a circuit and print its DC operating point.
    Solve {
        /// Circuit JSON file.
        #[arg(default_value = DEFAULT_CIRCUIT_FILE)]
        file: PathBuf,
    },
    /// Run a parameter goal-seek described by a JSON request file.
    Seek {
        /// Circuit JSON file.
        #[arg(default_value = DEFAULT_CIRCUIT_FILE)]
        file: PathBuf,
        /// Goal-seek request JSON file.
        #[arg(long)]
        request: PathBuf,
        /// Write the updated circuit back to the file on success.
        #[arg(long)]
        write: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Solve { file } => run_solve(&file),
        Command::Seek {
            file,
            request,
            write,
        } => run_seek(&file, &request, write),
    }
}

fn load_circuit(path: &Path) -> Result<Circuit> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading circuit file {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    let cir = Circuit::from_json(&value).with_context(|| format!("loading {}", path.display()))?;
    log::debug!("loaded {} components from {}", cir.len(), path.display());
    Ok(cir)
}

fn save_circuit(path: &Path, cir: &Circuit) -> Result<()> {
    let text = serde_json::to_string_pretty(&cir.to_json())?;
    fs::write(path, text).with_context(|| format!("writing circuit file {}", path.display()))
}

fn run_solve(file: &Path) -> Result<()> {
    let mut cir = load_circuit(file)?;
    normalize_circuit(&mut cir);

    let result = solve_circuit(&cir);
    output::print_solve_result(&cir, &result);
    Ok(())
}

fn run_seek(file: &Path, request: &Path, write: bool) -> Result<()> {
    let mut cir = load_circuit(file)?;
    normalize_circuit(&mut cir);

    let text = fs::read_to_string(request)
        .with_context(|| format!("reading request file {}", request.display()))?;
    let req: GoalSeekRequest =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", request.display()))?;

    let result = goal_seek_parameter(&mut cir, &req);
    output::print_goal_seek_result(&req, &result);

    if result.ok && write {
        save_circuit(file, &cir)?;
        println!("Updated circuit written to {}.", file.display());
    }
    Ok(())
}
