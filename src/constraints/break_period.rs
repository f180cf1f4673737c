use super::support::mip_slot_indicator;
use super::{Constraint, CpSatContext, Evaluate, MipContext, SmtContext};
use crate::domain::{Assignment, Problem};

/// Exams longer than two hours get a clear slot immediately after them, with
/// nothing else scheduled in it. Grounded on
/// `original_source/constraints.py`'s `NoConsecutiveSlotsConstraint`.
pub struct BreakPeriod;

const LONG_DURATION_MINUTES: u32 = 120;

fn is_long(exam: &crate::domain::Exam) -> bool {
    exam.duration_minutes.is_some_and(|d| d > LONG_DURATION_MINUTES)
}

impl Constraint for BreakPeriod {
    fn name(&self) -> &'static str {
        "break_period"
    }

    fn default_active(&self) -> bool {
        false
    }

    fn encode_smt(&self, ctx: &mut SmtContext) {
        use z3::ast::Ast;
        let one = z3::ast::Int::from_i64(ctx.ctx, 1);
        for (i, exam) in ctx.problem.exams.iter().enumerate() {
            if !is_long(exam) {
                continue;
            }
            for (j, other) in ctx.problem.exams.iter().enumerate() {
                if i == j {
                    continue;
                }
                ctx.solver.assert(&(&ctx.slot_vars[j] - &ctx.slot_vars[i])._eq(&one).not());
            }
        }
    }

    fn encode_cpsat(&self, ctx: &mut CpSatContext) {
        use cp_sat::builder::LinearExpr;
        for (i, exam) in ctx.problem.exams.iter().enumerate() {
            if !is_long(exam) {
                continue;
            }
            for j in 0..ctx.problem.exams.len() {
                if i == j {
                    continue;
                }
                let diff = LinearExpr::from(ctx.slot_vars[j].clone()) - LinearExpr::from(ctx.slot_vars[i].clone());
                ctx.model.add_ne(diff, 1);
            }
        }
    }

    fn encode_mip(&self, ctx: &mut MipContext) {
        use good_lp::{constraint, Expression, SolverModel};
        let num_exams = ctx.problem.num_exams() as f64;
        let num_slots = ctx.problem.num_slots() as u32;
        for exam in ctx.problem.exams.iter().filter(|e| is_long(e)) {
            for t in 0..num_slots.saturating_sub(1) {
                let exam_in_t = mip_slot_indicator(ctx.problem, ctx.assignment_vars, exam.id, t);
                let occupancy_next: Expression = ctx
                    .problem
                    .exams
                    .iter()
                    .map(|e| mip_slot_indicator(ctx.problem, ctx.assignment_vars, e.id, t + 1))
                    .sum();
                ctx.model.add_constraint(constraint!(occupancy_next + num_exams * exam_in_t <= num_exams));
            }
        }
    }
}

impl Evaluate for BreakPeriod {
    fn evaluate(&self, problem: &Problem, assignment: &Assignment) -> f64 {
        let long_exams: Vec<_> = problem.exams.iter().filter(|e| is_long(e)).collect();
        if long_exams.is_empty() {
            return 100.0;
        }
        let mut sum = 0.0;
        for exam in &long_exams {
            let Some(placement) = assignment.get(exam.id) else { continue };
            let next_occupied = problem
                .exams
                .iter()
                .any(|e| e.id != exam.id && assignment.get(e.id).is_some_and(|p| p.slot == placement.slot + 1));
            sum += if next_occupied { 0.0 } else { 100.0 };
        }
        sum / long_exams.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Exam, Room, TimeSlot};
    use std::collections::BTreeSet;

    fn problem() -> Problem {
        Problem {
            name: "t".into(),
            rooms: vec![Room { id: 0, capacity: 10 }],
            slots: vec![TimeSlot { id: 0 }, TimeSlot { id: 1 }, TimeSlot { id: 2 }],
            exams: vec![
                Exam { id: 0, students: BTreeSet::from([0]), duration_minutes: Some(150), department: None, morning_required: None },
                Exam { id: 1, students: BTreeSet::from([1]), duration_minutes: None, department: None, morning_required: None },
            ],
            total_students: 2,
            invigilators: vec![],
        }
    }

    #[test]
    fn clear_next_slot_scores_full_marks() {
        let p = problem();
        let mut a = Assignment::new();
        a.insert(0, 0, 0);
        a.insert(1, 2, 0);
        assert_eq!(BreakPeriod.evaluate(&p, &a), 100.0);
    }

    #[test]
    fn occupied_next_slot_scores_zero() {
        let p = problem();
        let mut a = Assignment::new();
        a.insert(0, 0, 0);
        a.insert(1, 1, 0);
        assert_eq!(BreakPeriod.evaluate(&p, &a), 0.0);
    }
}
