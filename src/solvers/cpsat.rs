//! CP-SAT adapter: the same `slot[e]`/`room[e]` integers as the SMT adapter,
//! but reified into booleans for pairwise encodings (spec §4.3). Grounded on
//! the `cp_sat` crate usage in the course-scheduling sibling example.

use super::{SolverAdapter, SolveBudget};
use crate::constraints::{ConstraintEntry, CpSatContext};
use crate::domain::{Assignment, Problem, SolveOutcome};
use cp_sat::builder::CpModelBuilder;
use cp_sat::proto::{CpSolverStatus, SatParameters};
use std::time::Instant;

pub struct CpSatAdapter;

impl SolverAdapter for CpSatAdapter {
    fn name(&self) -> &'static str {
        "ortools"
    }

    fn solve(&self, problem: &Problem, active: &[&dyn ConstraintEntry], budget: SolveBudget) -> SolveOutcome {
        let start = Instant::now();
        let mut model = CpModelBuilder::default();

        let num_slots = problem.num_slots().max(1) as i64;
        let num_rooms = problem.num_rooms().max(1) as i64;
        let slot_vars: Vec<_> =
            (0..problem.num_exams()).map(|_| model.new_int_var([(0, num_slots - 1)])).collect();
        let room_vars: Vec<_> =
            (0..problem.num_exams()).map(|_| model.new_int_var([(0, num_rooms - 1)])).collect();

        {
            let mut cpsat_ctx = CpSatContext { problem, model: &mut model, slot_vars: &slot_vars, room_vars: &room_vars };
            for constraint in active {
                constraint.encode_cpsat(&mut cpsat_ctx);
            }
        }

        let mut params = SatParameters::default();
        params.max_time_in_seconds = Some(budget.wall_clock.as_secs_f64());

        let response = model.solve_with_parameters(&params);
        match response.status() {
            CpSolverStatus::Infeasible => SolveOutcome::Unsat { elapsed_ms: start.elapsed().as_millis() as u64 },
            CpSolverStatus::Optimal | CpSolverStatus::Feasible => {
                let mut assignment = Assignment::new();
                for (i, exam) in problem.exams.iter().enumerate() {
                    let slot = slot_vars[i].solution_value(&response);
                    let room = room_vars[i].solution_value(&response);
                    assignment.insert(exam.id, slot as u32, room as u32);
                }
                SolveOutcome::Sat { assignment, elapsed_ms: start.elapsed().as_millis() as u64 }
            }
            other => SolveOutcome::Error { message: format!("cp-sat returned unexpected status {other:?}") },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Exam, Room, TimeSlot};
    use std::collections::BTreeSet;

    #[test]
    fn finds_a_satisfying_assignment() {
        let problem = Problem {
            name: "sat0".into(),
            rooms: vec![Room { id: 0, capacity: 2 }, Room { id: 1, capacity: 2 }],
            slots: vec![TimeSlot { id: 0 }, TimeSlot { id: 1 }],
            exams: vec![
                Exam { id: 0, students: BTreeSet::from([0, 1]), duration_minutes: None, department: None, morning_required: None },
                Exam { id: 1, students: BTreeSet::from([2]), duration_minutes: None, department: None, morning_required: None },
            ],
            total_students: 3,
            invigilators: vec![],
        };
        let active = crate::constraints::resolve(&[]).unwrap();
        let outcome = CpSatAdapter.solve(&problem, &active, SolveBudget::default());
        assert!(outcome.is_sat(), "{outcome:?}");
    }
}
