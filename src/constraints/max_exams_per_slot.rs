use super::support::{average_or_full_marks, clamp_score, exams_by_slot, mip_slot_indicator};
use super::{Constraint, CpSatContext, Evaluate, MipContext, SmtContext};
use crate::domain::{Assignment, Problem};

const MAX_CONCURRENT: usize = 3;

/// No more than three exams run concurrently in any one slot, across all
/// rooms. Grounded on `original_source/constraints.py`'s
/// `MaxExamsPerSlotConstraint`, whose backends all hardcode the same cap.
pub struct MaxExamsPerSlot;

impl Constraint for MaxExamsPerSlot {
    fn name(&self) -> &'static str {
        "max_exams_per_slot"
    }

    fn default_active(&self) -> bool {
        true
    }

    fn encode_smt(&self, ctx: &mut SmtContext) {
        use super::support::smt::weighted_indicator_sum;
        use z3::ast::Ast;
        for slot in ctx.problem.slots.iter() {
            let slot_lit = z3::ast::Int::from_i64(ctx.ctx, slot.id as i64);
            let terms: Vec<_> = ctx.slot_vars.iter().map(|v| (v._eq(&slot_lit), 1i64)).collect();
            let count = weighted_indicator_sum(ctx.ctx, &terms);
            ctx.solver.assert(&count.le(&z3::ast::Int::from_i64(ctx.ctx, MAX_CONCURRENT as i64)));
        }
    }

    fn encode_cpsat(&self, ctx: &mut CpSatContext) {
        use super::support::cpsat::reify_eq;
        use cp_sat::builder::LinearExpr;
        for slot in ctx.problem.slots.iter() {
            let slot_var = ctx.model.new_int_var([(slot.id as i64, slot.id as i64)]);
            let mut count = LinearExpr::from(0);
            for v in ctx.slot_vars.iter() {
                let lit = reify_eq(ctx.model, v.clone(), slot_var.clone());
                count = count + LinearExpr::from(lit);
            }
            ctx.model.add_le(count, MAX_CONCURRENT as i64);
        }
    }

    fn encode_mip(&self, ctx: &mut MipContext) {
        use good_lp::{constraint, Expression, SolverModel};
        for slot in &ctx.problem.slots {
            let concurrent: Expression = ctx
                .problem
                .exams
                .iter()
                .map(|e| mip_slot_indicator(ctx.problem, ctx.assignment_vars, e.id, slot.id))
                .sum();
            ctx.model.add_constraint(constraint!(concurrent <= MAX_CONCURRENT as f64));
        }
    }
}

impl Evaluate for MaxExamsPerSlot {
    fn evaluate(&self, _problem: &Problem, assignment: &Assignment) -> f64 {
        let by_slot = exams_by_slot(assignment);
        average_or_full_marks(by_slot.values().map(|exams| {
            let n = exams.len();
            if n <= MAX_CONCURRENT { 100.0 } else { clamp_score(100.0 - 25.0 * (n - MAX_CONCURRENT) as f64) }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Exam, Room, TimeSlot};
    use std::collections::BTreeSet;

    fn problem(n: u32) -> Problem {
        Problem {
            name: "t".into(),
            rooms: (0..n).map(|id| Room { id, capacity: 10 }).collect(),
            slots: vec![TimeSlot { id: 0 }],
            exams: (0..n)
                .map(|id| Exam {
                    id,
                    students: BTreeSet::from([id]),
                    duration_minutes: None,
                    department: None,
                    morning_required: None,
                })
                .collect(),
            total_students: n,
            invigilators: vec![],
        }
    }

    #[test]
    fn three_concurrent_is_full_marks() {
        let p = problem(3);
        let mut a = Assignment::new();
        for e in 0..3 {
            a.insert(e, 0, e);
        }
        assert_eq!(MaxExamsPerSlot.evaluate(&p, &a), 100.0);
    }

    #[test]
    fn four_concurrent_is_penalized() {
        let p = problem(4);
        let mut a = Assignment::new();
        for e in 0..4 {
            a.insert(e, 0, e);
        }
        assert_eq!(MaxExamsPerSlot.evaluate(&p, &a), 75.0);
    }
}
