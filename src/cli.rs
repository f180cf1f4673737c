//! `clap`-derive CLI facade (spec §6.2), mirroring the invocation surface of
//! §6: `solve`, `compare`, `serve`, `list-solvers`, `list-constraints`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "exam_scheduler")]
#[command(about = "Exam-timetabling solver harness and comparator", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Solve an instance with one named backend.
    Solve {
        #[arg(long)]
        instance: PathBuf,
        #[arg(long)]
        solver: String,
        /// Comma-separated active-constraint names; empty = defaults.
        #[arg(long, value_delimiter = ',')]
        constraints: Vec<String>,
    },
    /// Run two backends on the same instance and report a comparison.
    Compare {
        #[arg(long)]
        instance: PathBuf,
        #[arg(long = "solver-a")]
        solver_a: String,
        #[arg(long = "solver-b")]
        solver_b: String,
        #[arg(long, value_delimiter = ',')]
        constraints: Vec<String>,
    },
    /// Run the HTTP facade.
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: String,
    },
    /// List registered solver names.
    ListSolvers,
    /// List catalog constraint names and their default-activation flag.
    ListConstraints,
}

pub async fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Solve { instance, solver, constraints } => run_solve(&instance, &solver, constraints),
        Command::Compare { instance, solver_a, solver_b, constraints } => {
            run_compare(&instance, &solver_a, &solver_b, constraints)
        }
        Command::Serve { addr } => {
            crate::server::run_server(&addr).await;
            ExitCode::SUCCESS
        }
        Command::ListSolvers => {
            for name in crate::list_solvers() {
                println!("{name}");
            }
            ExitCode::SUCCESS
        }
        Command::ListConstraints => {
            for info in crate::list_constraints() {
                println!("{}\t{}", info.name, info.default_active);
            }
            ExitCode::SUCCESS
        }
    }
}

fn run_solve(instance: &PathBuf, solver: &str, constraints: Vec<String>) -> ExitCode {
    let problem = match crate::load_problem(instance) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    match crate::solve(&problem, solver, &constraints) {
        Ok(outcome) => {
            println!("{}", serde_json::to_string_pretty(&outcome).expect("SolveOutcome serializes"));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run_compare(instance: &PathBuf, solver_a: &str, solver_b: &str, constraints: Vec<String>) -> ExitCode {
    let problem = match crate::load_problem(instance) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    match crate::compare(&problem, solver_a, solver_b, &constraints) {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report).expect("ComparisonReport serializes"));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
