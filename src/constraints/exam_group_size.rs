use super::support::{average_or_full_marks, clamp_score, mip_exam_time_expr};
use super::{Constraint, CpSatContext, Evaluate, MipContext, SmtContext};
use crate::domain::{Assignment, ExamId, Problem};

/// Exams whose student counts are close (within 20% of the larger) should
/// sit in adjacent slots, easing invigilator and room turnover between
/// similarly sized cohorts. Grounded on `original_source/metrics.py`'s
/// cohort-size bucketing.
pub struct ExamGroupSize;

fn qualifying_pairs(problem: &Problem) -> Vec<(ExamId, ExamId)> {
    let mut pairs = Vec::new();
    for i in 0..problem.exams.len() {
        for j in (i + 1)..problem.exams.len() {
            let (a, b) = (&problem.exams[i], &problem.exams[j]);
            let (ca, cb) = (a.student_count() as f64, b.student_count() as f64);
            let larger = ca.max(cb);
            if larger == 0.0 {
                continue;
            }
            if (ca - cb).abs() <= 0.2 * larger {
                pairs.push((a.id, b.id));
            }
        }
    }
    pairs
}

fn aux_key(a: ExamId, b: ExamId) -> String {
    format!("order_{a}_{b}")
}

impl Constraint for ExamGroupSize {
    fn name(&self) -> &'static str {
        "exam_group_size"
    }

    fn default_active(&self) -> bool {
        false
    }

    fn encode_smt(&self, ctx: &mut SmtContext) {
        use z3::ast::{Ast, Bool};
        let one = z3::ast::Int::from_i64(ctx.ctx, 1);
        let index_of = |id: u32| ctx.problem.exams.iter().position(|e| e.id == id).unwrap();
        for (a, b) in qualifying_pairs(ctx.problem) {
            let (i, j) = (index_of(a), index_of(b));
            let forward = (&ctx.slot_vars[i] - &ctx.slot_vars[j])._eq(&one);
            let backward = (&ctx.slot_vars[j] - &ctx.slot_vars[i])._eq(&one);
            ctx.solver.assert(&Bool::or(ctx.ctx, &[&forward, &backward]));
        }
    }

    fn encode_cpsat(&self, ctx: &mut CpSatContext) {
        use super::support::cpsat::reify_diff_eq;
        let index_of = |id: u32| ctx.problem.exams.iter().position(|e| e.id == id).unwrap();
        for (a, b) in qualifying_pairs(ctx.problem) {
            let (i, j) = (index_of(a), index_of(b));
            let forward = reify_diff_eq(ctx.model, ctx.slot_vars[i].clone(), ctx.slot_vars[j].clone(), 1);
            let backward = reify_diff_eq(ctx.model, ctx.slot_vars[j].clone(), ctx.slot_vars[i].clone(), 1);
            ctx.model.add_bool_or(vec![forward, backward]);
        }
    }

    fn mip_aux_vars(
        &self,
        problem: &Problem,
        vars: &mut good_lp::ProblemVariables,
    ) -> std::collections::HashMap<String, good_lp::Variable> {
        use good_lp::variable;
        qualifying_pairs(problem)
            .into_iter()
            .map(|(a, b)| (aux_key(a, b), vars.add(variable().binary())))
            .collect()
    }

    fn encode_mip(&self, ctx: &mut MipContext) {
        use good_lp::{constraint, SolverModel};
        let big_m = ctx.big_m;
        let Some(aux) = ctx.aux_vars.get(self.name()) else { return };
        for (a, b) in qualifying_pairs(ctx.problem) {
            let Some(&z) = aux.get(&aux_key(a, b)) else { continue };
            let t_a = mip_exam_time_expr(ctx.problem, ctx.assignment_vars, a);
            let t_b = mip_exam_time_expr(ctx.problem, ctx.assignment_vars, b);
            // z=1: t_a - t_b == 1.  z=0: t_b - t_a == 1.
            ctx.model.add_constraint(constraint!(t_a.clone() - t_b.clone() <= 1.0 + big_m * (1.0 - z)));
            ctx.model.add_constraint(constraint!(t_a.clone() - t_b.clone() >= 1.0 - big_m * (1.0 - z)));
            ctx.model.add_constraint(constraint!(t_b.clone() - t_a.clone() <= 1.0 + big_m * z));
            ctx.model.add_constraint(constraint!(t_b - t_a >= 1.0 - big_m * z));
        }
    }
}

impl Evaluate for ExamGroupSize {
    fn evaluate(&self, problem: &Problem, assignment: &Assignment) -> f64 {
        average_or_full_marks(qualifying_pairs(problem).into_iter().filter_map(|(a, b)| {
            let pa = assignment.get(a)?;
            let pb = assignment.get(b)?;
            let k = pa.slot.abs_diff(pb.slot);
            Some(match k {
                1 => 100.0,
                0 => 50.0,
                _ => clamp_score(100.0 - 20.0 * (k as f64 - 1.0)),
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
                Exam {
                    id: 0,
                    students: BTreeSet::from_iter(0..10),
                    duration_minutes: None,
                    department: None,
                    morning_required: None,
                },
                Exam {
                    id: 1,
                    students: BTreeSet::from_iter(10..19),
                    duration_minutes: None,
                    department: None,
                    morning_required: None,
                },
            ],
            total_students: 19,
            invigilators: vec![],
        }
    }

    #[test]
    fn adjacent_slots_score_full_marks() {
        let p = problem();
        let mut a = Assignment::new();
        a.insert(0, 0, 0);
        a.insert(1, 1, 0);
        assert_eq!(ExamGroupSize.evaluate(&p, &a), 100.0);
    }

    #[test]
    fn same_slot_scores_fifty() {
        let p = problem();
        let mut a = Assignment::new();
        a.insert(0, 0, 0);
        a.insert(1, 0, 0);
        assert_eq!(ExamGroupSize.evaluate(&p, &a), 50.0);
    }

    #[test]
    fn dissimilar_sizes_are_not_qualifying_pairs() {
        let mut p = problem();
        p.exams[1].students = BTreeSet::from([10]);
        let mut a = Assignment::new();
        a.insert(0, 0, 0);
        a.insert(1, 2, 0);
        assert_eq!(ExamGroupSize.evaluate(&p, &a), 100.0);
    }
}
