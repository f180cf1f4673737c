use super::support::{average_or_full_marks, clamp_score};
use super::{Constraint, CpSatContext, Evaluate, MipContext, SmtContext};
use crate::domain::{Assignment, InvigilatorId, Problem, SlotId};
use std::collections::BTreeMap;

/// Assigns an invigilator to each exam, respecting `max_exams_per_day`,
/// unavailability, and non-concurrency. Per the base `Assignment` staying
/// exam-only (no backend introduces a dedicated invigilator variable), the
/// assignment is synthesised as `room_id mod |invigilators|` purely for
/// scoring purposes.
pub struct InvigilatorAssignment;

fn canonical_invigilator(problem: &Problem, room: u32) -> Option<InvigilatorId> {
    let n = problem.invigilators.len() as u32;
    if n == 0 {
        None
    } else {
        Some(problem.invigilators[(room % n) as usize].id)
    }
}

fn assignments_by_invigilator(
    problem: &Problem,
    assignment: &Assignment,
) -> BTreeMap<InvigilatorId, Vec<(SlotId, u32)>> {
    let mut by_invigilator: BTreeMap<InvigilatorId, Vec<(SlotId, u32)>> = BTreeMap::new();
    for exam in &problem.exams {
        let Some(placement) = assignment.get(exam.id) else { continue };
        let Some(inv) = canonical_invigilator(problem, placement.room) else { continue };
        by_invigilator.entry(inv).or_default().push((placement.slot, exam.id));
    }
    for entries in by_invigilator.values_mut() {
        entries.sort_unstable();
    }
    by_invigilator
}

impl Constraint for InvigilatorAssignment {
    fn name(&self) -> &'static str {
        "invigilator_assignment"
    }

    fn default_active(&self) -> bool {
        false
    }

    fn encode_smt(&self, _ctx: &mut SmtContext) {
        // No dedicated invigilator decision variable in any backend (spec §9
        // open question); enforcement happens purely in `evaluate`.
    }

    fn encode_cpsat(&self, _ctx: &mut CpSatContext) {}

    fn encode_mip(&self, _ctx: &mut MipContext) {}
}

impl Evaluate for InvigilatorAssignment {
    fn evaluate(&self, problem: &Problem, assignment: &Assignment) -> f64 {
        if problem.invigilators.is_empty() {
            return 100.0;
        }
        let by_invigilator = assignments_by_invigilator(problem, assignment);

        let overload_scores = problem.invigilators.iter().map(|inv| {
            let count = by_invigilator.get(&inv.id).map_or(0, |v| v.len()) as i64;
            let overflow = (count - inv.max_exams_per_day as i64).max(0);
            clamp_score(100.0 - 25.0 * overflow as f64)
        });

        let unavailability_scores = problem.invigilators.iter().flat_map(|inv| {
            by_invigilator
                .get(&inv.id)
                .into_iter()
                .flatten()
                .map(move |(slot, _)| if inv.unavailable_slots.contains(slot) { 0.0 } else { 100.0 })
        });

        let consecutive_scores = by_invigilator.values().flat_map(|entries| {
            super::support::index_pairs(entries.len()).map(move |(i, j)| {
                let gap = entries[j].0.abs_diff(entries[i].0);
                if gap <= 1 { 50.0 } else { 100.0 }
            })
        });

        average_or_full_marks(overload_scores.chain(unavailability_scores).chain(consecutive_scores))
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
            slots: vec![TimeSlot { id: 0 }, TimeSlot { id: 1 }],
            exams: vec![
                Exam { id: 0, students: BTreeSet::from([0]), duration_minutes: None, department: None, morning_required: None },
                Exam { id: 1, students: BTreeSet::from([1]), duration_minutes: None, department: None, morning_required: None },
            ],
            total_students: 2,
            invigilators: vec![Invigilator { id: 0, max_exams_per_day: 3, unavailable_slots: BTreeSet::new() }],
        }
    }

    #[test]
    fn no_invigilators_is_full_marks_by_convention() {
        let mut p = problem();
        p.invigilators.clear();
        let mut a = Assignment::new();
        a.insert(0, 0, 0);
        a.insert(1, 1, 0);
        assert_eq!(InvigilatorAssignment.evaluate(&p, &a), 100.0);
    }

    #[test]
    fn unavailable_slot_is_penalized() {
        let mut p = problem();
        p.invigilators[0].unavailable_slots.insert(0);
        let mut a = Assignment::new();
        a.insert(0, 0, 0);
        let score = InvigilatorAssignment.evaluate(&p, &a);
        assert!(score < 100.0);
    }
}
