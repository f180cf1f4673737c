//! Maps a solver name + active-constraint set to a constructed adapter
//! (spec §4.6). Validates constraint names against the catalog up front so
//! adapters never see an unknown name.

use crate::constraints::ConstraintEntry;
use crate::error::{Result, SchedulerError};
use crate::solvers::cpsat::CpSatAdapter;
use crate::solvers::evolutionary::EvolutionaryAdapter;
use crate::solvers::local_search::LocalSearchAdapter;
use crate::solvers::mip::MipAdapter;
use crate::solvers::smt::SmtAdapter;
use crate::solvers::tabu::TabuAdapter;
use crate::solvers::SolverAdapter;

/// Every registered solver name, in a stable display order.
pub const SOLVER_NAMES: &[&str] = &["z3", "ortools", "gurobi", "cbc", "scip", "deap", "tabu", "local"];

pub fn list_solvers() -> Vec<&'static str> {
    SOLVER_NAMES.to_vec()
}

/// Builds the adapter for `name`, or `UnknownSolver` if it isn't registered.
/// `gurobi`, `cbc`, and `scip` all resolve to the same MIP engine (see
/// `DESIGN.md`), tagged with the requested name for reporting.
pub fn build(name: &str) -> Result<Box<dyn SolverAdapter>> {
    match name {
        "z3" => Ok(Box::new(SmtAdapter)),
        "ortools" => Ok(Box::new(CpSatAdapter)),
        "gurobi" => Ok(Box::new(MipAdapter { solver_name: "gurobi" })),
        "cbc" => Ok(Box::new(MipAdapter { solver_name: "cbc" })),
        "scip" => Ok(Box::new(MipAdapter { solver_name: "scip" })),
        "deap" => Ok(Box::new(EvolutionaryAdapter)),
        "tabu" => Ok(Box::new(TabuAdapter)),
        "local" => Ok(Box::new(LocalSearchAdapter)),
        other => Err(SchedulerError::UnknownSolver(other.to_string())),
    }
}

/// Resolves the constraint-name list against the catalog, erroring on
/// anything unknown, before handing the active list to a solver.
pub fn resolve_active<'a>(names: &[String]) -> Result<Vec<&'a dyn ConstraintEntry>> {
    crate::constraints::resolve(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_solver_builds() {
        for name in SOLVER_NAMES {
            assert!(build(name).is_ok(), "{name} should build");
        }
    }

    #[test]
    fn unknown_solver_is_rejected() {
        let err = build("not-a-real-solver").unwrap_err();
        assert!(matches!(err, SchedulerError::UnknownSolver(_)));
    }
}
