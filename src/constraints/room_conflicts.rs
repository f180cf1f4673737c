use super::support::{average_or_full_marks, clamp_score, exams_by_cell, index_pairs};
use super::{Constraint, CpSatContext, Evaluate, MipContext, SmtContext};
use crate::domain::{Assignment, Problem};

/// No two exams share the same (slot, room) cell.
pub struct RoomConflicts;

impl Constraint for RoomConflicts {
    fn name(&self) -> &'static str {
        "room_conflicts"
    }

    fn default_active(&self) -> bool {
        true
    }

    fn encode_smt(&self, ctx: &mut SmtContext) {
        use z3::ast::{Ast, Bool};
        let n = ctx.problem.num_exams();
        for (i, j) in index_pairs(n) {
            let same_slot = ctx.slot_vars[i]._eq(&ctx.slot_vars[j]);
            let same_room = ctx.room_vars[i]._eq(&ctx.room_vars[j]);
            let both = Bool::and(ctx.ctx, &[&same_slot, &same_room]);
            ctx.solver.assert(&both.not());
        }
    }

    fn encode_cpsat(&self, ctx: &mut CpSatContext) {
        let n = ctx.problem.num_exams();
        for (i, j) in index_pairs(n) {
            // If the two exams share a slot, they must not share a room.
            let same_slot = ctx.model.new_bool_var();
            ctx.model.add_eq(ctx.slot_vars[i].clone(), ctx.slot_vars[j].clone()).only_enforce_if(same_slot);
            ctx.model
                .add_ne(ctx.slot_vars[i].clone(), ctx.slot_vars[j].clone())
                .only_enforce_if(same_slot.not());
            ctx.model
                .add_ne(ctx.room_vars[i].clone(), ctx.room_vars[j].clone())
                .only_enforce_if(same_slot);
        }
    }

    fn encode_mip(&self, ctx: &mut MipContext) {
        use good_lp::{constraint, Expression, SolverModel};
        for room in &ctx.problem.rooms {
            for slot in &ctx.problem.slots {
                let occupants: Expression = ctx
                    .problem
                    .exams
                    .iter()
                    .filter_map(|e| ctx.assignment_vars.get(&(e.id, room.id, slot.id)))
                    .map(|&v| Expression::from(v))
                    .sum();
                ctx.model.add_constraint(constraint!(occupants <= 1));
            }
        }
    }
}

impl Evaluate for RoomConflicts {
    fn evaluate(&self, _problem: &Problem, assignment: &Assignment) -> f64 {
        let by_cell = exams_by_cell(assignment);
        average_or_full_marks(by_cell.values().map(|exams| {
            let n = exams.len() as f64;
            clamp_score(100.0 - 50.0 * (n - 1.0))
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
            slots: vec![TimeSlot { id: 0 }],
            exams: vec![
                Exam { id: 0, students: BTreeSet::from([0]), duration_minutes: None, department: None, morning_required: None },
                Exam { id: 1, students: BTreeSet::from([1]), duration_minutes: None, department: None, morning_required: None },
            ],
            total_students: 2,
            invigilators: vec![],
        }
    }

    #[test]
    fn penalizes_two_exams_sharing_a_cell() {
        let p = problem();
        let mut a = Assignment::new();
        a.insert(0, 0, 0);
        a.insert(1, 0, 0);
        assert_eq!(RoomConflicts.evaluate(&p, &a), 50.0);
    }

    #[test]
    fn full_marks_when_no_cell_is_shared() {
        let mut p = problem();
        p.rooms.push(Room { id: 1, capacity: 10 });
        let mut a = Assignment::new();
        a.insert(0, 0, 0);
        a.insert(1, 0, 1);
        assert_eq!(RoomConflicts.evaluate(&p, &a), 100.0);
    }
}
