use super::support::{average_or_full_marks, mip_slot_indicator, student_slots};
use super::{Constraint, CpSatContext, Evaluate, MipContext, SmtContext};
use crate::domain::{Assignment, Problem};
use std::collections::HashSet;

/// No student sits two exams in slots `t, t` or `t, t±1`; the soft score
/// further rewards spacing them more than one slot apart. Grounded on
/// `original_source/solvers/tabusearch.py`'s `student_spacing` entry.
pub struct StudentSpacing;

/// Distinct ordered exam-id pairs that share at least one student.
fn conflicting_pairs(problem: &Problem) -> Vec<(u32, u32)> {
    let mut seen = HashSet::new();
    let mut pairs = Vec::new();
    for i in 0..problem.exams.len() {
        for j in (i + 1)..problem.exams.len() {
            let a = &problem.exams[i];
            let b = &problem.exams[j];
            if a.students.is_disjoint(&b.students) {
                continue;
            }
            if seen.insert((a.id, b.id)) {
                pairs.push((a.id, b.id));
            }
        }
    }
    pairs
}

impl Constraint for StudentSpacing {
    fn name(&self) -> &'static str {
        "student_spacing"
    }

    fn default_active(&self) -> bool {
        true
    }

    fn encode_smt(&self, ctx: &mut SmtContext) {
        use z3::ast::{Ast, Bool};
        let index_of = |id: u32| ctx.problem.exams.iter().position(|e| e.id == id).unwrap();
        let two = z3::ast::Int::from_i64(ctx.ctx, 2);
        for (a, b) in conflicting_pairs(ctx.problem) {
            let (i, j) = (index_of(a), index_of(b));
            let forward = (&ctx.slot_vars[i] - &ctx.slot_vars[j]).ge(&two);
            let backward = (&ctx.slot_vars[j] - &ctx.slot_vars[i]).ge(&two);
            ctx.solver.assert(&Bool::or(ctx.ctx, &[&forward, &backward]));
        }
    }

    fn encode_cpsat(&self, ctx: &mut CpSatContext) {
        use super::support::cpsat::reify_diff_ge;
        let index_of = |id: u32| ctx.problem.exams.iter().position(|e| e.id == id).unwrap();
        for (a, b) in conflicting_pairs(ctx.problem) {
            let (i, j) = (index_of(a), index_of(b));
            let forward = reify_diff_ge(ctx.model, ctx.slot_vars[i].clone(), ctx.slot_vars[j].clone(), 2);
            let backward = reify_diff_ge(ctx.model, ctx.slot_vars[j].clone(), ctx.slot_vars[i].clone(), 2);
            ctx.model.add_bool_or(vec![forward, backward]);
        }
    }

    fn encode_mip(&self, ctx: &mut MipContext) {
        use good_lp::{constraint, SolverModel};
        let num_slots = ctx.problem.num_slots() as u32;
        for (a, b) in conflicting_pairs(ctx.problem) {
            for t in 0..num_slots {
                let a_t = mip_slot_indicator(ctx.problem, ctx.assignment_vars, a, t);
                let b_t = mip_slot_indicator(ctx.problem, ctx.assignment_vars, b, t);
                ctx.model.add_constraint(constraint!(a_t.clone() + b_t.clone() <= 1));
                if t + 1 < num_slots {
                    let a_next = mip_slot_indicator(ctx.problem, ctx.assignment_vars, a, t + 1);
                    let b_next = mip_slot_indicator(ctx.problem, ctx.assignment_vars, b, t + 1);
                    ctx.model.add_constraint(constraint!(a_t + b_next <= 1));
                    ctx.model.add_constraint(constraint!(b_t + a_next <= 1));
                }
            }
        }
    }
}

impl Evaluate for StudentSpacing {
    fn evaluate(&self, problem: &Problem, assignment: &Assignment) -> f64 {
        let by_student = student_slots(problem, assignment);
        average_or_full_marks(by_student.values().flat_map(|slots| {
            super::support::index_pairs(slots.len()).map(move |(i, j)| {
                let gap = slots[j].abs_diff(slots[i]);
                match gap {
                    0 => 0.0,
                    1 => 50.0,
                    _ => 100.0,
                }
            })
        }))
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
                Exam { id: 0, students: BTreeSet::from([0]), duration_minutes: None, department: None, morning_required: None },
                Exam { id: 1, students: BTreeSet::from([0]), duration_minutes: None, department: None, morning_required: None },
            ],
            total_students: 1,
            invigilators: vec![],
        }
    }

    #[test]
    fn adjacent_slots_score_fifty() {
        let p = problem();
        let mut a = Assignment::new();
        a.insert(0, 0, 0);
        a.insert(1, 1, 0);
        assert_eq!(StudentSpacing.evaluate(&p, &a), 50.0);
    }

    #[test]
    fn well_spaced_scores_full_marks() {
        let p = problem();
        let mut a = Assignment::new();
        a.insert(0, 0, 0);
        a.insert(1, 2, 0);
        assert_eq!(StudentSpacing.evaluate(&p, &a), 100.0);
    }

    #[test]
    fn no_shared_students_is_full_marks_by_convention() {
        let mut p = problem();
        p.exams[1].students = BTreeSet::from([1]);
        let mut a = Assignment::new();
        a.insert(0, 0, 0);
        a.insert(1, 0, 0);
        assert_eq!(StudentSpacing.evaluate(&p, &a), 100.0);
    }
}
