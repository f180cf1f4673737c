//! Runs the same `Problem` through two named adapters, times them, scores
//! both, and produces a `ComparisonReport` (spec §4.5). The two `solve`
//! calls run on separate threads (spec §5: "MAY be executed in parallel when
//! the underlying backend is thread-safe").

use crate::constraints::ConstraintEntry;
use crate::domain::{ComparisonReport, MetricComparison, Problem, SolveOutcome, Winner};
use crate::error::Result;
use crate::evaluator;
use crate::factory;
use crate::solvers::SolveBudget;
use crate::stats;

const TIE_THRESHOLD: f64 = 1.0;

fn winner_of(a: f64, b: f64) -> Winner {
    if (a - b).abs() < TIE_THRESHOLD {
        Winner::Tie
    } else if a > b {
        Winner::A
    } else {
        Winner::B
    }
}

pub fn compare(
    problem: &Problem,
    solver_a: &str,
    solver_b: &str,
    active: &[&dyn ConstraintEntry],
) -> Result<ComparisonReport> {
    let adapter_a = factory::build(solver_a)?;
    let adapter_b = factory::build(solver_b)?;
    let budget = SolveBudget::default();

    let (outcome_a, outcome_b) = std::thread::scope(|scope| {
        let handle_a = scope.spawn(|| adapter_a.solve(problem, active, budget));
        let handle_b = scope.spawn(|| adapter_b.solve(problem, active, budget));
        (handle_a.join().expect("solver thread panicked"), handle_b.join().expect("solver thread panicked"))
    });

    build_report(problem, solver_a, solver_b, outcome_a, outcome_b, active)
}

fn build_report(
    problem: &Problem,
    solver_a: &str,
    solver_b: &str,
    outcome_a: SolveOutcome,
    outcome_b: SolveOutcome,
    active: &[&dyn ConstraintEntry],
) -> Result<ComparisonReport> {
    match (&outcome_a, &outcome_b) {
        (SolveOutcome::Sat { assignment: assignment_a, elapsed_ms: ms_a }, SolveOutcome::Sat { assignment: assignment_b, elapsed_ms: ms_b }) => {
            let metrics_a = evaluator::evaluate(problem, assignment_a, active)?;
            let metrics_b = evaluator::evaluate(problem, assignment_b, active)?;

            let metrics: Vec<MetricComparison> = metrics_a
                .iter()
                .zip(&metrics_b)
                .map(|(ma, mb)| MetricComparison {
                    name: ma.name.clone(),
                    score_a: ma.value,
                    score_b: mb.value,
                    winner: winner_of(ma.value, mb.value),
                })
                .collect();

            let time_a = evaluator::time_score(*ms_a, *ms_b);
            let time_b = evaluator::time_score(*ms_b, *ms_a);
            let quality_a = evaluator::final_quality(&metrics_a, time_a);
            let quality_b = evaluator::final_quality(&metrics_b, time_b);

            Ok(ComparisonReport::Decided {
                solver_a: solver_a.to_string(),
                solver_b: solver_b.to_string(),
                elapsed_ms_a: *ms_a,
                elapsed_ms_b: *ms_b,
                metrics,
                quality_a,
                quality_b,
                winner: winner_of(quality_a, quality_b),
                stats_a: stats::compute(problem, assignment_a),
                stats_b: stats::compute(problem, assignment_b),
            })
        }
        (SolveOutcome::Sat { .. }, _) => Ok(ComparisonReport::OneUnsat {
            solver_a: solver_a.to_string(),
            solver_b: solver_b.to_string(),
            unsat_side: Winner::B,
            winner: Winner::A,
        }),
        (_, SolveOutcome::Sat { .. }) => Ok(ComparisonReport::OneUnsat {
            solver_a: solver_a.to_string(),
            solver_b: solver_b.to_string(),
            unsat_side: Winner::A,
            winner: Winner::B,
        }),
        _ => Ok(ComparisonReport::BothUnsat { solver_a: solver_a.to_string(), solver_b: solver_b.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Exam, Room, TimeSlot};
    use std::collections::BTreeSet;

    fn sat_problem() -> Problem {
        Problem {
            name: "sat0".into(),
            rooms: vec![Room { id: 0, capacity: 2 }, Room { id: 1, capacity: 2 }],
            slots: vec![TimeSlot { id: 0 }, TimeSlot { id: 1 }],
            exams: vec![
                Exam { id: 0, students: BTreeSet::from([0, 1]), duration_minutes: None, department: None, morning_required: None },
                Exam { id: 1, students: BTreeSet::from([2]), duration_minutes: None, department: None, morning_required: None },
            ],
            total_students: 3,
            invigilators: vec![],
        }
    }

    fn unsat_problem() -> Problem {
        Problem {
            name: "unsat0".into(),
            rooms: vec![Room { id: 0, capacity: 1 }],
            slots: vec![TimeSlot { id: 0 }],
            exams: vec![Exam {
                id: 0,
                students: BTreeSet::from([0, 1]),
                duration_minutes: None,
                department: None,
                morning_required: None,
            }],
            total_students: 2,
            invigilators: vec![],
        }
    }

    #[test]
    fn ties_when_both_sides_return_the_same_outcome_shape() {
        let problem = sat_problem();
        let active = crate::constraints::resolve(&[]).unwrap();
        let report = compare(&problem, "z3", "z3", &active).unwrap();
        match report {
            ComparisonReport::Decided { metrics, winner, .. } => {
                assert!(metrics.iter().all(|m| m.winner == crate::domain::Winner::Tie));
                assert_eq!(winner, crate::domain::Winner::Tie);
            }
            other => panic!("expected Decided, got {other:?}"),
        }
    }

    #[test]
    fn both_unsat_when_neither_side_is_satisfiable() {
        let problem = unsat_problem();
        let active = crate::constraints::resolve(&[]).unwrap();
        let report = compare(&problem, "z3", "ortools", &active).unwrap();
        assert!(matches!(report, ComparisonReport::BothUnsat { .. }));
    }
}
