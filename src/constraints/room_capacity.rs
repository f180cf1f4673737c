use super::support::{average_or_full_marks, clamp_score, exams_by_cell};
use super::{Constraint, CpSatContext, Evaluate, MipContext, SmtContext};
use crate::domain::{Assignment, Problem};

/// The students sitting an exam in a (slot, room) cell must not exceed the
/// room's capacity. Grounded on `original_source/constraints.py`'s
/// `RoomCapacityConstraint`, but summed per cell consistently across every
/// backend rather than the source's per-exam-only z3 variant.
pub struct RoomCapacity;

impl Constraint for RoomCapacity {
    fn name(&self) -> &'static str {
        "room_capacity"
    }

    fn default_active(&self) -> bool {
        true
    }

    fn encode_smt(&self, ctx: &mut SmtContext) {
        use super::support::smt::weighted_indicator_sum;
        use z3::ast::Ast;

        for room in ctx.problem.rooms.iter() {
            let room_lit = z3::ast::Int::from_i64(ctx.ctx, room.id as i64);
            for slot in ctx.problem.slots.iter() {
                let slot_lit = z3::ast::Int::from_i64(ctx.ctx, slot.id as i64);
                let terms: Vec<_> = ctx
                    .problem
                    .exams
                    .iter()
                    .enumerate()
                    .map(|(i, exam)| {
                        let in_cell = ctx.room_vars[i]._eq(&room_lit) & ctx.slot_vars[i]._eq(&slot_lit);
                        (in_cell, exam.student_count() as i64)
                    })
                    .collect();
                let occupants = weighted_indicator_sum(ctx.ctx, &terms);
                ctx.solver.assert(&occupants.le(&z3::ast::Int::from_i64(ctx.ctx, room.capacity as i64)));
            }
        }
    }

    fn encode_cpsat(&self, ctx: &mut CpSatContext) {
        use super::support::cpsat::{reify_and, reify_eq};
        use cp_sat::builder::LinearExpr;

        for room in ctx.problem.rooms.iter() {
            let room_var = ctx.model.new_int_var([(room.id as i64, room.id as i64)]);
            for slot in ctx.problem.slots.iter() {
                let slot_var = ctx.model.new_int_var([(slot.id as i64, slot.id as i64)]);
                let mut occupants = LinearExpr::from(0);
                for (i, exam) in ctx.problem.exams.iter().enumerate() {
                    let same_room = reify_eq(ctx.model, ctx.room_vars[i].clone(), room_var.clone());
                    let same_slot = reify_eq(ctx.model, ctx.slot_vars[i].clone(), slot_var.clone());
                    let in_cell = reify_and(ctx.model, &[same_room, same_slot]);
                    occupants = occupants + LinearExpr::from(in_cell) * (exam.student_count() as i64);
                }
                ctx.model.add_le(occupants, room.capacity as i64);
            }
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
                    .filter_map(|e| {
                        ctx.assignment_vars.get(&(e.id, room.id, slot.id)).map(|&v| (e.student_count() as f64) * v)
                    })
                    .sum();
                ctx.model.add_constraint(constraint!(occupants <= room.capacity as f64));
            }
        }
    }
}

impl Evaluate for RoomCapacity {
    fn evaluate(&self, problem: &Problem, assignment: &Assignment) -> f64 {
        let by_cell = exams_by_cell(assignment);
        average_or_full_marks(by_cell.iter().filter_map(|((_, room), exams)| {
            let capacity = problem.room_capacity(*room).unwrap_or(0);
            if capacity == 0 {
                return None;
            }
            let students: usize = exams.iter().filter_map(|&e| problem.exam(e)).map(|e| e.student_count()).sum();
            let utilisation = (students as f64 / capacity as f64) * 100.0;
            Some(if utilisation <= 100.0 { utilisation } else { clamp_score(100.0 - 2.0 * (utilisation - 100.0)) })
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
            rooms: vec![Room { id: 0, capacity: 2 }],
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
    fn full_marks_at_exact_capacity() {
        let p = problem();
        let mut a = Assignment::new();
        a.insert(0, 0, 0);
        assert_eq!(RoomCapacity.evaluate(&p, &a), 100.0);
    }

    #[test]
    fn penalizes_over_capacity() {
        let mut p = problem();
        p.rooms[0].capacity = 1;
        let mut a = Assignment::new();
        a.insert(0, 0, 0);
        // utilisation = 200 -> 100 - 2*(200-100) = -100 -> clamped to 0
        assert_eq!(RoomCapacity.evaluate(&p, &a), 0.0);
    }

    #[test]
    fn zero_capacity_room_is_excluded() {
        let mut p = problem();
        p.rooms[0].capacity = 0;
        let mut a = Assignment::new();
        a.insert(0, 0, 0);
        assert_eq!(RoomCapacity.evaluate(&p, &a), 100.0);
    }
}
