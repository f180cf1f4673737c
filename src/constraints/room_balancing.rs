use super::support::{clamp_score, exams_by_room};
use super::{Constraint, CpSatContext, Evaluate, MipContext, SmtContext};
use crate::domain::{Assignment, Problem};

/// Spreads exams across rooms evenly: no room should host more than
/// `ceil(E/R) + 1` exams. Grounded on `original_source/metrics.py`'s room
/// utilisation bucketing.
pub struct RoomBalancing;

fn usage_cap(problem: &Problem) -> u32 {
    let (e, r) = (problem.num_exams() as u32, problem.num_rooms().max(1) as u32);
    e.div_ceil(r) + 1
}

impl Constraint for RoomBalancing {
    fn name(&self) -> &'static str {
        "room_balancing"
    }

    fn default_active(&self) -> bool {
        false
    }

    fn encode_smt(&self, ctx: &mut SmtContext) {
        use super::support::smt::weighted_indicator_sum;
        use z3::ast::Ast;
        let cap = usage_cap(ctx.problem) as i64;
        for room in ctx.problem.rooms.iter().filter(|r| r.capacity > 0) {
            let room_lit = z3::ast::Int::from_i64(ctx.ctx, room.id as i64);
            let terms: Vec<_> = ctx.room_vars.iter().map(|v| (v._eq(&room_lit), 1i64)).collect();
            let usage = weighted_indicator_sum(ctx.ctx, &terms);
            ctx.solver.assert(&usage.le(&z3::ast::Int::from_i64(ctx.ctx, cap)));
        }
    }

    fn encode_cpsat(&self, ctx: &mut CpSatContext) {
        use super::support::cpsat::reify_eq;
        use cp_sat::builder::LinearExpr;
        let cap = usage_cap(ctx.problem) as i64;
        for room in ctx.problem.rooms.iter().filter(|r| r.capacity > 0) {
            let room_var = ctx.model.new_int_var([(room.id as i64, room.id as i64)]);
            let mut usage = LinearExpr::from(0);
            for v in ctx.room_vars.iter() {
                let lit = reify_eq(ctx.model, v.clone(), room_var.clone());
                usage = usage + LinearExpr::from(lit);
            }
            ctx.model.add_le(usage, cap);
        }
    }

    fn encode_mip(&self, ctx: &mut MipContext) {
        use good_lp::{constraint, Expression, SolverModel};
        let cap = usage_cap(ctx.problem) as f64;
        for room in ctx.problem.rooms.iter().filter(|r| r.capacity > 0) {
            let usage: Expression = ctx
                .problem
                .slots
                .iter()
                .flat_map(|t| ctx.problem.exams.iter().map(move |e| (e.id, t.id)))
                .filter_map(|(e, t)| ctx.assignment_vars.get(&(e, room.id, t)))
                .map(|&v| Expression::from(v))
                .sum();
            ctx.model.add_constraint(constraint!(usage <= cap));
        }
    }
}

impl Evaluate for RoomBalancing {
    fn evaluate(&self, problem: &Problem, assignment: &Assignment) -> f64 {
        let by_room = exams_by_room(assignment);
        let usages: Vec<f64> = problem
            .rooms
            .iter()
            .filter(|r| r.capacity > 0)
            .map(|r| by_room.get(&r.id).map_or(0, |exams| exams.len()) as f64)
            .collect();
        if usages.is_empty() {
            return 100.0;
        }
        let mean = usages.iter().sum::<f64>() / usages.len() as f64;
        let delta = usages.iter().map(|u| (u - mean).abs()).fold(0.0, f64::max);
        clamp_score(100.0 - 15.0 * delta)
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
            rooms: vec![Room { id: 0, capacity: 10 }, Room { id: 1, capacity: 10 }],
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
    fn even_split_scores_full_marks() {
        let p = problem();
        let mut a = Assignment::new();
        a.insert(0, 0, 0);
        a.insert(1, 0, 1);
        assert_eq!(RoomBalancing.evaluate(&p, &a), 100.0);
    }

    #[test]
    fn lopsided_split_is_penalized() {
        let p = problem();
        let mut a = Assignment::new();
        a.insert(0, 0, 0);
        a.insert(1, 0, 0);
        assert_eq!(RoomBalancing.evaluate(&p, &a), 85.0);
    }
}
