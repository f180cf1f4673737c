use super::support::{average_or_full_marks, mip_slot_indicator};
use super::{Constraint, CpSatContext, Evaluate, MipContext, SmtContext};
use crate::domain::{Assignment, Problem};

/// Exams flagged `morning_required` must land in the first half of the slot
/// grid. Grounded on `original_source/constraints.py`'s `BasicRangeConstraint`
/// family, narrowed to the morning-only exam subset.
pub struct MorningSessions;

fn morning_exams(problem: &Problem) -> impl Iterator<Item = &crate::domain::Exam> {
    problem.exams.iter().filter(|e| e.morning_required == Some(true))
}

impl Constraint for MorningSessions {
    fn name(&self) -> &'static str {
        "morning_sessions"
    }

    fn default_active(&self) -> bool {
        false
    }

    fn encode_smt(&self, ctx: &mut SmtContext) {
        use z3::ast::Ast;
        let cutoff = ctx.problem.morning_cutoff() as i64;
        let cutoff_lit = z3::ast::Int::from_i64(ctx.ctx, cutoff);
        for exam in morning_exams(ctx.problem) {
            let i = ctx.problem.exams.iter().position(|e| e.id == exam.id).unwrap();
            ctx.solver.assert(&ctx.slot_vars[i].lt(&cutoff_lit));
        }
    }

    fn encode_cpsat(&self, ctx: &mut CpSatContext) {
        let cutoff = ctx.problem.morning_cutoff() as i64;
        for exam in morning_exams(ctx.problem) {
            let i = ctx.problem.exams.iter().position(|e| e.id == exam.id).unwrap();
            ctx.model.add_le(ctx.slot_vars[i].clone(), cutoff - 1);
        }
    }

    fn encode_mip(&self, ctx: &mut MipContext) {
        use good_lp::{constraint, SolverModel};
        let cutoff = ctx.problem.num_slots() as u32 / 2;
        for exam in morning_exams(ctx.problem) {
            for t in cutoff..ctx.problem.num_slots() as u32 {
                let indicator = mip_slot_indicator(ctx.problem, ctx.assignment_vars, exam.id, t);
                ctx.model.add_constraint(constraint!(indicator == 0));
            }
        }
    }
}

impl Evaluate for MorningSessions {
    fn evaluate(&self, problem: &Problem, assignment: &Assignment) -> f64 {
        let cutoff = problem.morning_cutoff();
        average_or_full_marks(morning_exams(problem).filter_map(|e| {
            let placement = assignment.get(e.id)?;
            Some(if placement.slot < cutoff { 100.0 } else { 0.0 })
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
            slots: vec![TimeSlot { id: 0 }, TimeSlot { id: 1 }, TimeSlot { id: 2 }, TimeSlot { id: 3 }],
            exams: vec![Exam {
                id: 0,
                students: BTreeSet::from([0]),
                duration_minutes: None,
                department: None,
                morning_required: Some(true),
            }],
            total_students: 1,
            invigilators: vec![],
        }
    }

    #[test]
    fn scores_full_marks_in_the_morning() {
        let p = problem();
        let mut a = Assignment::new();
        a.insert(0, 0, 0);
        assert_eq!(MorningSessions.evaluate(&p, &a), 100.0);
    }

    #[test]
    fn scores_zero_in_the_afternoon() {
        let p = problem();
        let mut a = Assignment::new();
        a.insert(0, 3, 0);
        assert_eq!(MorningSessions.evaluate(&p, &a), 0.0);
    }

    #[test]
    fn no_morning_required_exams_is_full_marks_by_convention() {
        let mut p = problem();
        p.exams[0].morning_required = None;
        let mut a = Assignment::new();
        a.insert(0, 3, 0);
        assert_eq!(MorningSessions.evaluate(&p, &a), 100.0);
    }
}
