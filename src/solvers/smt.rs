//! SMT adapter: `slot[e]`/`room[e]` as bounded integers, asserted through
//! each active constraint's `encode_smt`. Grounded on the crate-level
//! decision to keep one real backend per solver family rather than
//! fabricating bindings to several.

use super::{SolverAdapter, SolveBudget};
use crate::constraints::{ConstraintEntry, SmtContext};
use crate::domain::{Assignment, Problem, SolveOutcome};
use std::time::Instant;
use z3::ast::Ast;
use z3::{Config, Context, SatResult, Solver};

pub struct SmtAdapter;

impl SolverAdapter for SmtAdapter {
    fn name(&self) -> &'static str {
        "z3"
    }

    fn solve(&self, problem: &Problem, active: &[&dyn ConstraintEntry], budget: SolveBudget) -> SolveOutcome {
        let start = Instant::now();
        let mut cfg = Config::new();
        cfg.set_timeout_msec(budget.wall_clock.as_millis() as u64);
        let ctx = Context::new(&cfg);
        let solver = Solver::new(&ctx);

        let slot_vars: Vec<_> =
            (0..problem.num_exams()).map(|i| z3::ast::Int::new_const(&ctx, format!("slot_{i}"))).collect();
        let room_vars: Vec<_> =
            (0..problem.num_exams()).map(|i| z3::ast::Int::new_const(&ctx, format!("room_{i}"))).collect();

        let mut smt_ctx = SmtContext { problem, ctx: &ctx, solver: &solver, slot_vars: &slot_vars, room_vars: &room_vars };
        for constraint in active {
            constraint.encode_smt(&mut smt_ctx);
        }

        match solver.check() {
            SatResult::Unsat => SolveOutcome::Unsat { elapsed_ms: start.elapsed().as_millis() as u64 },
            SatResult::Unknown => SolveOutcome::Error { message: "z3 returned unknown (timeout or incompleteness)".into() },
            SatResult::Sat => {
                let model = match solver.get_model() {
                    Some(m) => m,
                    None => return SolveOutcome::Error { message: "z3 reported sat with no model".into() },
                };
                let mut assignment = Assignment::new();
                for (i, exam) in problem.exams.iter().enumerate() {
                    let slot = eval_int(&model, &slot_vars[i]);
                    let room = eval_int(&model, &room_vars[i]);
                    let (Some(slot), Some(room)) = (slot, room) else {
                        return SolveOutcome::Error { message: format!("z3 model missing value for exam {}", exam.id) };
                    };
                    assignment.insert(exam.id, slot as u32, room as u32);
                }
                SolveOutcome::Sat { assignment, elapsed_ms: start.elapsed().as_millis() as u64 }
            }
        }
    }
}

fn eval_int(model: &z3::Model, var: &z3::ast::Int) -> Option<i64> {
    model.eval(var, true).and_then(|v| v.as_i64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Exam, Room, TimeSlot};
    use std::collections::BTreeSet;

    fn tiny_problem() -> Problem {
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

    #[test]
    fn finds_a_satisfying_assignment() {
        let problem = tiny_problem();
        let active = crate::constraints::resolve(&[]).unwrap();
        let outcome = SmtAdapter.solve(&problem, &active, SolveBudget::default());
        assert!(outcome.is_sat(), "{outcome:?}");
    }

    #[test]
    fn reports_unsat_for_an_infeasible_instance() {
        let problem = Problem {
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
        };
        let active = crate::constraints::resolve(&[]).unwrap();
        let outcome = SmtAdapter.solve(&problem, &active, SolveBudget::default());
        assert!(outcome.is_unsat(), "{outcome:?}");
    }
}
