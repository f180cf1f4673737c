//! Exam-timetabling scheduler: ingests an instance file into a `Problem`,
//! runs it through a named solver backend under an active-constraint set,
//! and scores/compares the resulting timetables.
//!
//! The invocation surface mirrors the six operations a façade (CLI or HTTP)
//! needs: [`load_problem`], [`list_solvers`], [`list_constraints`],
//! [`solve`], [`evaluate`], [`compare`].

pub mod cli;
pub mod comparator;
pub mod constraints;
pub mod domain;
pub mod error;
pub mod evaluator;
pub mod factory;
pub mod ingest;
pub mod server;
pub mod solvers;
pub mod stats;

use domain::{Assignment, ComparisonReport, MetricScore, Problem, SolveOutcome};
use error::Result;
use solvers::SolveBudget;
use std::path::Path;

pub fn load_problem(path: impl AsRef<Path>) -> Result<Problem> {
    ingest::load_problem(path)
}

pub fn list_solvers() -> Vec<&'static str> {
    factory::list_solvers()
}

pub fn list_constraints() -> Vec<constraints::ConstraintInfo> {
    constraints::list_constraints()
}

pub fn solve(problem: &Problem, solver_name: &str, active_constraints: &[String]) -> Result<SolveOutcome> {
    let adapter = factory::build(solver_name)?;
    let active = constraints::resolve(active_constraints)?;
    Ok(adapter.solve(problem, &active, SolveBudget::default()))
}

pub fn evaluate(problem: &Problem, assignment: &Assignment, active_constraints: &[String]) -> Result<Vec<MetricScore>> {
    let active = constraints::resolve(active_constraints)?;
    evaluator::evaluate(problem, assignment, &active)
}

pub fn compare(
    problem: &Problem,
    solver_a: &str,
    solver_b: &str,
    active_constraints: &[String],
) -> Result<ComparisonReport> {
    let active = constraints::resolve(active_constraints)?;
    comparator::compare(problem, solver_a, solver_b, &active)
}
