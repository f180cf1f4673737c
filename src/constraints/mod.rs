//! The constraint catalog: one entry per named constraint, each able to (a)
//! encode itself as a hard constraint for every backend and (b) evaluate an
//! arbitrary candidate [`Assignment`] as a soft [0,100] score.
//!
//! Backend polymorphism is recast (per spec §9) as a trait per concern:
//! [`Constraint`] owns the per-backend encoders, [`Evaluate`] owns scoring,
//! so that a caller which only wants scores (the evaluator, the comparator)
//! never needs to link a solver backend.

mod break_period;
mod department_grouping;
mod exam_group_size;
mod invigilator_assignment;
mod invigilator_break;
mod max_exams_per_slot;
mod morning_sessions;
mod room_balancing;
mod room_capacity;
mod room_conflicts;
mod single_assignment;
mod student_spacing;
pub mod support;

use crate::domain::{Assignment, ExamId, Problem, RoomId, SlotId};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Encoding context for the SMT backend (spec §4.3, "SMT adapter").
pub struct SmtContext<'a, 'ctx> {
    pub problem: &'a Problem,
    pub ctx: &'ctx z3::Context,
    pub solver: &'a z3::Solver<'ctx>,
    pub slot_vars: &'a [z3::ast::Int<'ctx>],
    pub room_vars: &'a [z3::ast::Int<'ctx>],
}

/// Encoding context for the CP-SAT backend.
pub struct CpSatContext<'a> {
    pub problem: &'a Problem,
    pub model: &'a mut cp_sat::builder::CpModelBuilder,
    pub slot_vars: &'a [cp_sat::builder::IntVar],
    pub room_vars: &'a [cp_sat::builder::IntVar],
}

/// Encoding context for the MIP backend (binary `x[e, r, t]` indicators,
/// big-M `= T + 1` throughout per spec §9).
pub struct MipContext<'a> {
    pub problem: &'a Problem,
    pub model: &'a mut good_lp::solvers::highs::HighsProblem,
    pub assignment_vars: &'a HashMap<(ExamId, RoomId, SlotId), good_lp::Variable>,
    /// Per-constraint auxiliary binaries declared by [`Constraint::mip_aux_vars`]
    /// before the model was finalized, keyed by the constraint's own name and
    /// then by whatever tag it chose when declaring them.
    pub aux_vars: &'a HashMap<&'static str, HashMap<String, good_lp::Variable>>,
    pub big_m: f64,
}

/// One catalog entry's hard-constraint encoders, one per backend family.
pub trait Constraint: Send + Sync {
    fn name(&self) -> &'static str;
    fn default_active(&self) -> bool;
    fn encode_smt(&self, ctx: &mut SmtContext);
    fn encode_cpsat(&self, ctx: &mut CpSatContext);

    /// Declares any auxiliary binary variables this constraint's MIP
    /// encoding needs (e.g. a reification of "these two exams share a
    /// slot"). `good_lp` requires every variable to exist before the model
    /// is finalized with `.using(...)`, so declaration is a separate pass
    /// from [`Constraint::encode_mip`]. Most constraints need nothing extra
    /// and can rely on the default empty map.
    fn mip_aux_vars(
        &self,
        _problem: &Problem,
        _vars: &mut good_lp::ProblemVariables,
    ) -> HashMap<String, good_lp::Variable> {
        HashMap::new()
    }

    fn encode_mip(&self, ctx: &mut MipContext);
}

/// A catalog entry's soft-scoring function. Pure and deterministic (spec
/// invariant 4): two calls with equal inputs must produce equal outputs.
pub trait Evaluate: Send + Sync {
    /// Scores `assignment` against `problem` in `[0, 100]`, higher is better.
    /// `assignment` is assumed already validated (see
    /// [`crate::domain::Assignment::validate`]); callers that accept
    /// attacker-controlled assignments must validate first.
    fn evaluate(&self, problem: &Problem, assignment: &Assignment) -> f64;
}

pub trait ConstraintEntry: Constraint + Evaluate {}
impl<T: Constraint + Evaluate> ConstraintEntry for T {}

/// A summary row for [`crate::list_constraints`]: name plus default-active
/// flag, no solver or evaluation machinery attached.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConstraintInfo {
    pub name: &'static str,
    pub default_active: bool,
}

fn all_constraints() -> Vec<Box<dyn ConstraintEntry>> {
    vec![
        Box::new(single_assignment::SingleAssignment),
        Box::new(room_conflicts::RoomConflicts),
        Box::new(room_capacity::RoomCapacity),
        Box::new(student_spacing::StudentSpacing),
        Box::new(max_exams_per_slot::MaxExamsPerSlot),
        Box::new(morning_sessions::MorningSessions),
        Box::new(exam_group_size::ExamGroupSize),
        Box::new(department_grouping::DepartmentGrouping),
        Box::new(room_balancing::RoomBalancing),
        Box::new(invigilator_assignment::InvigilatorAssignment),
        Box::new(break_period::BreakPeriod),
        Box::new(invigilator_break::InvigilatorBreak),
    ]
}

/// The process-wide constraint registry (spec §9: constructed once, read-only
/// thereafter).
pub static CATALOG: LazyLock<HashMap<&'static str, Box<dyn ConstraintEntry>>> =
    LazyLock::new(|| all_constraints().into_iter().map(|c| (c.name(), c)).collect());

/// The default active-constraint set (spec §6).
pub const DEFAULT_ACTIVE: &[&str] = &[
    "single_assignment",
    "room_conflicts",
    "room_capacity",
    "student_spacing",
    "max_exams_per_slot",
];

/// Resolves constraint names to catalog entries, rejecting unknown names. An
/// empty `names` list resolves to [`DEFAULT_ACTIVE`] (spec §4.3: "if empty,
/// defaults are used").
pub fn resolve<'a>(names: &[String]) -> crate::error::Result<Vec<&'a dyn ConstraintEntry>> {
    let names: Vec<String> = if names.is_empty() {
        DEFAULT_ACTIVE.iter().map(|s| s.to_string()).collect()
    } else {
        names.to_vec()
    };
    names
        .iter()
        .map(|name| {
            CATALOG
                .get(name.as_str())
                .map(|c| c.as_ref())
                .ok_or_else(|| crate::error::SchedulerError::UnknownConstraint(name.clone()))
        })
        .collect()
}

/// Lists every catalog entry's name and default-activation flag (spec §6
/// `list_constraints`).
pub fn list_constraints() -> Vec<ConstraintInfo> {
    let mut infos: Vec<ConstraintInfo> = CATALOG
        .values()
        .map(|c| ConstraintInfo { name: c.name(), default_active: c.default_active() })
        .collect();
    infos.sort_by_key(|i| i.name);
    infos
}

/// Checks a single active constraint's hard semantics (the §4.2 "hard
/// semantics for encoding" column) directly against a candidate assignment,
/// independent of any backend's model. Used by the heuristic adapters
/// (local-search, tabu, evolutionary), which search over the `Evaluate`
/// objective but still need a feasibility oracle to recognise a solved
/// instance — mirrors `original_source/solvers/localsearch.py`'s
/// `_validate_solution`.
pub fn is_hard_satisfied(name: &str, problem: &Problem, assignment: &Assignment) -> bool {
    use support::{exams_by_cell, exams_by_room, exams_by_slot, student_slots};

    match name {
        "single_assignment" => problem.exams.iter().all(|e| assignment.get(e.id).is_some()),
        "room_conflicts" => exams_by_cell(assignment).values().all(|exams| exams.len() <= 1),
        "room_capacity" => exams_by_cell(assignment).iter().all(|((_, room), exams)| {
            let capacity = problem.room_capacity(*room).unwrap_or(0);
            let students: usize =
                exams.iter().filter_map(|&e| problem.exam(e)).map(|e| e.student_count()).sum();
            students as u32 <= capacity
        }),
        "student_spacing" => student_slots(problem, assignment).values().all(|slots| {
            support::index_pairs(slots.len()).all(|(i, j)| slots[j].abs_diff(slots[i]) >= 2)
        }),
        "max_exams_per_slot" => exams_by_slot(assignment).values().all(|exams| exams.len() <= 3),
        "morning_sessions" => {
            let cutoff = problem.morning_cutoff();
            problem
                .exams
                .iter()
                .filter(|e| e.morning_required == Some(true))
                .all(|e| assignment.get(e.id).is_some_and(|p| p.slot < cutoff))
        }
        "exam_group_size" => {
            let mut ok = true;
            for i in 0..problem.exams.len() {
                for j in (i + 1)..problem.exams.len() {
                    let (a, b) = (&problem.exams[i], &problem.exams[j]);
                    let (ca, cb) = (a.student_count() as f64, b.student_count() as f64);
                    let larger = ca.max(cb);
                    if larger == 0.0 || (ca - cb).abs() > 0.2 * larger {
                        continue;
                    }
                    let (Some(pa), Some(pb)) = (assignment.get(a.id), assignment.get(b.id)) else { continue };
                    if pa.slot.abs_diff(pb.slot) != 1 {
                        ok = false;
                    }
                }
            }
            ok
        }
        "department_grouping" => {
            let mut ok = true;
            for i in 0..problem.exams.len() {
                for j in (i + 1)..problem.exams.len() {
                    let (a, b) = (&problem.exams[i], &problem.exams[j]);
                    if a.department.is_none() || a.department != b.department {
                        continue;
                    }
                    let (Some(pa), Some(pb)) = (assignment.get(a.id), assignment.get(b.id)) else { continue };
                    if pa.slot == pb.slot && pa.room.abs_diff(pb.room) > 2 {
                        ok = false;
                    }
                }
            }
            ok
        }
        "room_balancing" => {
            let by_room = exams_by_room(assignment);
            let cap = (problem.num_exams() as u32).div_ceil(problem.num_rooms().max(1) as u32) + 1;
            problem
                .rooms
                .iter()
                .filter(|r| r.capacity > 0)
                .all(|r| by_room.get(&r.id).map_or(0, |v| v.len()) as u32 <= cap)
        }
        "break_period" => problem.exams.iter().filter(|e| e.duration_minutes.is_some_and(|d| d > 120)).all(|e| {
            let Some(p) = assignment.get(e.id) else { return true };
            !problem.exams.iter().any(|other| {
                other.id != e.id && assignment.get(other.id).is_some_and(|op| op.slot == p.slot + 1)
            })
        }),
        // invigilator_assignment / invigilator_break carry no hard encoding
        // in any backend (spec §9 open question); nothing to check here.
        "invigilator_assignment" | "invigilator_break" => true,
        _ => true,
    }
}

/// A candidate is fully feasible under `active` when every one of its named
/// constraints' hard semantics holds.
pub fn is_feasible(active: &[&dyn ConstraintEntry], problem: &Problem, assignment: &Assignment) -> bool {
    active.iter().all(|c| is_hard_satisfied(c.name(), problem, assignment))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_active_matches_spec() {
        for name in DEFAULT_ACTIVE {
            let entry = CATALOG.get(name).expect("constraint in catalog");
            assert!(entry.default_active(), "{name} should default-activate");
        }
        let non_default_count = CATALOG.values().filter(|c| !c.default_active()).count();
        assert_eq!(non_default_count, CATALOG.len() - DEFAULT_ACTIVE.len());
    }

    #[test]
    fn resolve_empty_yields_defaults() {
        let resolved = resolve(&[]).unwrap();
        assert_eq!(resolved.len(), DEFAULT_ACTIVE.len());
    }

    #[test]
    fn resolve_rejects_unknown_name() {
        let err = resolve(&["not_a_real_constraint".to_string()]).unwrap_err();
        assert!(matches!(err, crate::error::SchedulerError::UnknownConstraint(_)));
    }
}
