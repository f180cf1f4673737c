use super::{Constraint, CpSatContext, Evaluate, MipContext, SmtContext};
use crate::domain::{Assignment, Problem};

/// Every exam has exactly one (slot, room). Always active; every other
/// constraint's evaluation assumes this one already holds.
pub struct SingleAssignment;

impl Constraint for SingleAssignment {
    fn name(&self) -> &'static str {
        "single_assignment"
    }

    fn default_active(&self) -> bool {
        true
    }

    fn encode_smt(&self, ctx: &mut SmtContext) {
        use z3::ast::Ast;
        let num_slots = ctx.problem.num_slots() as i64;
        let num_rooms = ctx.problem.num_rooms() as i64;
        for i in 0..ctx.problem.num_exams() {
            let zero = z3::ast::Int::from_i64(ctx.ctx, 0);
            ctx.solver.assert(&ctx.slot_vars[i].ge(&zero));
            ctx.solver.assert(&ctx.slot_vars[i].lt(&z3::ast::Int::from_i64(ctx.ctx, num_slots)));
            ctx.solver.assert(&ctx.room_vars[i].ge(&zero));
            ctx.solver.assert(&ctx.room_vars[i].lt(&z3::ast::Int::from_i64(ctx.ctx, num_rooms)));
        }
    }

    fn encode_cpsat(&self, _ctx: &mut CpSatContext) {
        // Range constraints are already baked into each IntVar's domain at
        // creation time (see `solvers::cpsat`), so there's nothing to add
        // here — mirrors the original `BasicRangeConstraint.apply_ortools`.
    }

    fn encode_mip(&self, ctx: &mut MipContext) {
        use good_lp::{constraint, Expression, SolverModel};
        for exam in &ctx.problem.exams {
            let scheduled_once: Expression = ctx
                .problem
                .rooms
                .iter()
                .flat_map(|r| ctx.problem.slots.iter().map(move |t| (r.id, t.id)))
                .filter_map(|(r, t)| ctx.assignment_vars.get(&(exam.id, r, t)))
                .map(|&v| Expression::from(v))
                .sum();
            ctx.model.add_constraint(constraint!(scheduled_once == 1));
        }
    }
}

impl Evaluate for SingleAssignment {
    fn evaluate(&self, problem: &Problem, assignment: &Assignment) -> f64 {
        if problem.num_exams() == 0 {
            return 100.0;
        }
        super::support::average_or_full_marks(
            problem.exams.iter().map(|e| if assignment.get(e.id).is_some() { 100.0 } else { 0.0 }),
        )
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
            slots: vec![TimeSlot { id: 0 }, TimeSlot { id: 1 }],
            exams: vec![
                Exam { id: 0, students: BTreeSet::from([0]), duration_minutes: None, department: None, morning_required: None },
                Exam { id: 1, students: BTreeSet::from([1]), duration_minutes: None, department: None, morning_required: None },
            ],
            total_students: 2,
            invigilators: vec![],
        }
    }

    #[test]
    fn full_marks_when_every_exam_placed() {
        let p = problem();
        let mut a = Assignment::new();
        a.insert(0, 0, 0);
        a.insert(1, 1, 0);
        assert_eq!(SingleAssignment.evaluate(&p, &a), 100.0);
    }

    #[test]
    fn averages_per_exam_when_one_is_missing() {
        let p = problem();
        let mut a = Assignment::new();
        a.insert(0, 0, 0);
        assert_eq!(SingleAssignment.evaluate(&p, &a), 50.0);
    }
}
