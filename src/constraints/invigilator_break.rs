use super::support::average_or_full_marks;
use super::{Constraint, CpSatContext, Evaluate, MipContext, SmtContext};
use crate::domain::{Assignment, InvigilatorId, Problem, SlotId};
use std::collections::BTreeMap;

/// An invigilator assigned in slot `t` must not also be assigned in `t+1`.
/// Shares `invigilator_assignment`'s synthesised-invigilator approach (no
/// backend carries a dedicated invigilator variable).
pub struct InvigilatorBreak;

fn canonical_invigilator(problem: &Problem, room: u32) -> Option<InvigilatorId> {
    let n = problem.invigilators.len() as u32;
    if n == 0 {
        None
    } else {
        Some(problem.invigilators[(room % n) as usize].id)
    }
}

fn slots_by_invigilator(problem: &Problem, assignment: &Assignment) -> BTreeMap<InvigilatorId, Vec<SlotId>> {
    let mut by_invigilator: BTreeMap<InvigilatorId, Vec<SlotId>> = BTreeMap::new();
    for exam in &problem.exams {
        let Some(placement) = assignment.get(exam.id) else { continue };
        let Some(inv) = canonical_invigilator(problem, placement.room) else { continue };
        by_invigilator.entry(inv).or_default().push(placement.slot);
    }
    for slots in by_invigilator.values_mut() {
        slots.sort_unstable();
        slots.dedup();
    }
    by_invigilator
}

impl Constraint for InvigilatorBreak {
    fn name(&self) -> &'static str {
        "invigilator_break"
    }

    fn default_active(&self) -> bool {
        false
    }

    fn encode_smt(&self, _ctx: &mut SmtContext) {}
    fn encode_cpsat(&self, _ctx: &mut CpSatContext) {}
    fn encode_mip(&self, _ctx: &mut MipContext) {}
}

impl Evaluate for InvigilatorBreak {
    fn evaluate(&self, problem: &Problem, assignment: &Assignment) -> f64 {
        if problem.invigilators.is_empty() {
            return 100.0;
        }
        let by_invigilator = slots_by_invigilator(problem, assignment);
        average_or_full_marks(by_invigilator.values().flat_map(|slots| {
            super::support::index_pairs(slots.len())
                .map(move |(i, j)| if slots[j].abs_diff(slots[i]) >= 2 { 100.0 } else { 0.0 })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Exam, Invigilator, Room, TimeSlot};
    use std::collections::BTreeSet;

    fn problem() -> Problem {
        Problem {
            name: "t".into(),
            rooms: vec![Room { id: 0, capacity: 10 }],
            slots: vec![TimeSlot { id: 0 }, TimeSlot { id: 1 }, TimeSlot { id: 2 }],
            exams: vec![
                Exam { id: 0, students: BTreeSet::from([0]), duration_minutes: None, department: None, morning_required: None },
                Exam { id: 1, students: BTreeSet::from([1]), duration_minutes: None, department: None, morning_required: None },
            ],
            total_students: 2,
            invigilators: vec![Invigilator { id: 0, max_exams_per_day: 3, unavailable_slots: BTreeSet::new() }],
        }
    }

    #[test]
    fn consecutive_slots_score_zero() {
        let p = problem();
        let mut a = Assignment::new();
        a.insert(0, 0, 0);
        a.insert(1, 1, 0);
        assert_eq!(InvigilatorBreak.evaluate(&p, &a), 0.0);
    }

    #[test]
    fn gap_of_two_scores_full_marks() {
        let p = problem();
        let mut a = Assignment::new();
        a.insert(0, 0, 0);
        a.insert(1, 2, 0);
        assert_eq!(InvigilatorBreak.evaluate(&p, &a), 100.0);
    }
}
