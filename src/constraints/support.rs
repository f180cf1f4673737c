//! Small helpers shared across constraint evaluators so the pairwise and
//! grouping logic in §4.2's table isn't copy-pasted into every file.

use crate::domain::{Assignment, ExamId, Problem, RoomId, SlotId, StudentId};
use std::collections::BTreeMap;

/// Groups exam ids by the (slot, room) cell they were placed in.
pub fn exams_by_cell(assignment: &Assignment) -> BTreeMap<(SlotId, RoomId), Vec<ExamId>> {
    let mut by_cell: BTreeMap<(SlotId, RoomId), Vec<ExamId>> = BTreeMap::new();
    for (exam, placement) in assignment.iter() {
        by_cell.entry((placement.slot, placement.room)).or_default().push(exam);
    }
    by_cell
}

/// Groups exam ids by slot alone.
pub fn exams_by_slot(assignment: &Assignment) -> BTreeMap<SlotId, Vec<ExamId>> {
    let mut by_slot: BTreeMap<SlotId, Vec<ExamId>> = BTreeMap::new();
    for (exam, placement) in assignment.iter() {
        by_slot.entry(placement.slot).or_default().push(exam);
    }
    by_slot
}

/// Groups exam ids by room alone.
pub fn exams_by_room(assignment: &Assignment) -> BTreeMap<RoomId, Vec<ExamId>> {
    let mut by_room: BTreeMap<RoomId, Vec<ExamId>> = BTreeMap::new();
    for (exam, placement) in assignment.iter() {
        by_room.entry(placement.room).or_default().push(exam);
    }
    by_room
}

/// For each student, the sorted list of slots their exams were placed in.
pub fn student_slots(problem: &Problem, assignment: &Assignment) -> BTreeMap<StudentId, Vec<SlotId>> {
    let mut by_student: BTreeMap<StudentId, Vec<SlotId>> = BTreeMap::new();
    for exam in &problem.exams {
        let Some(placement) = assignment.get(exam.id) else { continue };
        for &student in &exam.students {
            by_student.entry(student).or_default().push(placement.slot);
        }
    }
    for slots in by_student.values_mut() {
        slots.sort_unstable();
    }
    by_student
}

/// Averages a score sequence, defaulting to 100 when there's nothing to
/// score (spec §4.2: "no applicable items... score is 100 by convention").
pub fn average_or_full_marks(scores: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for s in scores {
        sum += s;
        count += 1;
    }
    if count == 0 { 100.0 } else { sum / count as f64 }
}

pub fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// All `(i, j)` index pairs with `i < j` over `0..n`.
pub fn index_pairs(n: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..n).flat_map(move |i| ((i + 1)..n).map(move |j| (i, j)))
}

use good_lp::Expression;
use std::collections::HashMap;

/// `sum_r x[exam, r, slot]`: 0/1-valued (by the `single_assignment`
/// constraint) indicator that `exam` was placed in `slot`, built directly
/// from the existing assignment variables rather than a fresh one.
pub fn mip_slot_indicator(
    problem: &Problem,
    assignment_vars: &HashMap<(ExamId, RoomId, SlotId), good_lp::Variable>,
    exam: ExamId,
    slot: SlotId,
) -> Expression {
    problem
        .rooms
        .iter()
        .filter_map(|room| assignment_vars.get(&(exam, room.id, slot)))
        .map(|&v| Expression::from(v))
        .sum()
}

/// `sum_{r,t} t * x[exam, r, t]`: the (weighted) slot an exam lands in. Valid
/// as a plain affine `Expression` since exactly one `x` is 1 under
/// `single_assignment`.
pub fn mip_exam_time_expr(
    problem: &Problem,
    assignment_vars: &HashMap<(ExamId, RoomId, SlotId), good_lp::Variable>,
    exam: ExamId,
) -> Expression {
    problem
        .slots
        .iter()
        .flat_map(|slot| problem.rooms.iter().map(move |room| (room.id, slot.id)))
        .filter_map(|(room, slot)| assignment_vars.get(&(exam, room, slot)).map(|&v| (slot, v)))
        .map(|(slot, v)| (slot as f64) * v)
        .sum()
}

/// `sum_{r,t} r * x[exam, r, t]`: the (weighted) room an exam lands in.
pub fn mip_exam_room_expr(
    problem: &Problem,
    assignment_vars: &HashMap<(ExamId, RoomId, SlotId), good_lp::Variable>,
    exam: ExamId,
) -> Expression {
    problem
        .slots
        .iter()
        .flat_map(|slot| problem.rooms.iter().map(move |room| (room.id, slot.id)))
        .filter_map(|(room, slot)| assignment_vars.get(&(exam, room, slot)).map(|&v| (room, v)))
        .map(|(room, v)| (room as f64) * v)
        .sum()
}

/// Reification helpers shared by every constraint whose CP-SAT encoding needs
/// a boolean standing in for "these two int vars are equal" or "all of these
/// booleans hold" (room_conflicts, student_spacing, max_exams_per_slot,
/// morning_sessions, department_grouping, break_period).
pub mod cpsat {
    use cp_sat::builder::{BoolVar, CpModelBuilder, IntVar};

    /// A fresh bool that's true iff `a == b`.
    pub fn reify_eq(model: &mut CpModelBuilder, a: IntVar, b: IntVar) -> BoolVar {
        let lit = model.new_bool_var();
        model.add_eq(a.clone(), b.clone()).only_enforce_if(lit);
        model.add_ne(a, b).only_enforce_if(lit.not());
        lit
    }

    /// A fresh bool that's true iff every literal in `lits` is true.
    pub fn reify_and(model: &mut CpModelBuilder, lits: &[BoolVar]) -> BoolVar {
        let out = model.new_bool_var();
        model.add_bool_and(lits.to_vec()).only_enforce_if(out);
        let negated: Vec<BoolVar> = lits.iter().map(|l| l.not()).collect();
        model.add_bool_or(negated).only_enforce_if(out.not());
        out
    }

    /// A fresh bool that's true iff `a - b >= bound`.
    pub fn reify_diff_ge(
        model: &mut CpModelBuilder,
        a: IntVar,
        b: IntVar,
        bound: i64,
    ) -> BoolVar {
        use cp_sat::builder::LinearExpr;
        let lit = model.new_bool_var();
        let diff = LinearExpr::from(a) - LinearExpr::from(b);
        model.add_ge(diff.clone(), bound).only_enforce_if(lit);
        model.add_le(diff, bound - 1).only_enforce_if(lit.not());
        lit
    }

    /// A fresh bool that's true iff `a - b == value`.
    pub fn reify_diff_eq(
        model: &mut CpModelBuilder,
        a: IntVar,
        b: IntVar,
        value: i64,
    ) -> BoolVar {
        use cp_sat::builder::LinearExpr;
        let lit = model.new_bool_var();
        let diff = LinearExpr::from(a) - LinearExpr::from(b);
        model.add_eq(diff.clone(), value).only_enforce_if(lit);
        model.add_ne(diff, value).only_enforce_if(lit.not());
        lit
    }
}

/// Matching SMT helper: build a `sum_i cond_i ? weight_i : 0` as a single
/// linear `Int` expression, used wherever a backend needs "the number of
/// students placed into this cell" without a dedicated aux variable.
pub mod smt {
    use z3::ast::{Ast, Bool, Int};
    use z3::Context;

    pub fn weighted_indicator_sum<'ctx>(ctx: &'ctx Context, terms: &[(Bool<'ctx>, i64)]) -> Int<'ctx> {
        let zero = Int::from_i64(ctx, 0);
        let addends: Vec<Int<'ctx>> =
            terms.iter().map(|(cond, weight)| cond.ite(&Int::from_i64(ctx, *weight), &zero)).collect();
        let refs: Vec<&Int<'ctx>> = addends.iter().collect();
        if refs.is_empty() { zero } else { Int::add(ctx, &refs) }
    }
}
