//! Local-search adapter: greedy initial placement, then single-exam
//! neighbourhood moves with occasional random restarts. Grounded on
//! `original_source/solvers/localsearch.py`'s `LocalSearchSolver`.

use super::{SolverAdapter, SolveBudget};
use crate::constraints::{is_feasible, ConstraintEntry};
use crate::domain::{Assignment, Problem, SolveOutcome};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;

const MAX_ATTEMPTS: usize = 50;
const MAX_ITERATIONS_PER_ATTEMPT: usize = 1000;
const RANDOM_MOVE_PROBABILITY: f64 = 0.1;

pub struct LocalSearchAdapter;

fn objective(problem: &Problem, assignment: &Assignment, active: &[&dyn ConstraintEntry]) -> f64 {
    active.iter().map(|c| c.evaluate(problem, assignment)).sum()
}

/// Builds a full assignment by placing exams (largest cohort first) into the
/// (room, slot) cell that maximises the running objective.
fn greedy_initial(problem: &Problem, active: &[&dyn ConstraintEntry], rng: &mut StdRng) -> Assignment {
    let mut order: Vec<_> = problem.exams.iter().collect();
    order.sort_by_key(|e| std::cmp::Reverse(e.student_count()));

    let mut assignment = Assignment::new();
    for exam in order {
        let mut best: Option<(u32, u32, f64)> = None;
        for room in &problem.rooms {
            for slot in &problem.slots {
                let mut candidate = assignment.clone();
                candidate.insert(exam.id, slot.id, room.id);
                let score = objective(problem, &candidate, active);
                if best.is_none_or(|(_, _, best_score)| score > best_score) {
                    best = Some((slot.id, room.id, score));
                }
            }
        }
        if let Some((slot, room, _)) = best {
            assignment.insert(exam.id, slot, room);
        } else if let (Some(room), Some(slot)) = (problem.rooms.first(), problem.slots.first()) {
            let _ = rng; // no randomness needed when there's a unique cell
            assignment.insert(exam.id, slot.id, room.id);
        }
    }
    assignment
}

fn random_neighbor(problem: &Problem, assignment: &Assignment, rng: &mut StdRng) -> Assignment {
    let mut next = assignment.clone();
    if problem.exams.is_empty() {
        return next;
    }
    let exam = &problem.exams[rng.gen_range(0..problem.exams.len())];
    let placement = next.get(exam.id).unwrap_or(crate::domain::ExamPlacement { slot: 0, room: 0 });
    if rng.gen_bool(0.5) && problem.num_rooms() > 0 {
        let room = problem.rooms[rng.gen_range(0..problem.rooms.len())].id;
        next.insert(exam.id, placement.slot, room);
    } else if problem.num_slots() > 0 {
        let slot = problem.slots[rng.gen_range(0..problem.slots.len())].id;
        next.insert(exam.id, slot, placement.room);
    }
    next
}

impl SolverAdapter for LocalSearchAdapter {
    fn name(&self) -> &'static str {
        "local"
    }

    fn solve(&self, problem: &Problem, active: &[&dyn ConstraintEntry], budget: SolveBudget) -> SolveOutcome {
        let start = Instant::now();
        let deadline = super::deadline(budget);
        let mut rng = StdRng::seed_from_u64(1234);

        let mut best: Option<(Assignment, f64)> = None;
        'attempts: for _ in 0..MAX_ATTEMPTS {
            if Instant::now() >= deadline {
                break;
            }
            let mut current = greedy_initial(problem, active, &mut rng);
            let mut current_score = objective(problem, &current, active);

            for _ in 0..MAX_ITERATIONS_PER_ATTEMPT {
                if Instant::now() >= deadline {
                    break 'attempts;
                }
                if is_feasible(active, problem, &current) {
                    break;
                }
                let candidate = random_neighbor(problem, &current, &mut rng);
                let candidate_score = objective(problem, &candidate, active);
                if candidate_score > current_score || rng.gen_bool(RANDOM_MOVE_PROBABILITY) {
                    current = candidate;
                    current_score = candidate_score;
                }
            }

            if best.as_ref().is_none_or(|(_, score)| current_score > *score) {
                best = Some((current.clone(), current_score));
            }
            if is_feasible(active, problem, &current) {
                break;
            }
        }

        match best {
            Some((assignment, _)) if is_feasible(active, problem, &assignment) => {
                SolveOutcome::Sat { assignment, elapsed_ms: start.elapsed().as_millis() as u64 }
            }
            _ => SolveOutcome::Unsat { elapsed_ms: start.elapsed().as_millis() as u64 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Exam, Room, TimeSlot};
    use std::collections::BTreeSet;

    #[test]
    fn finds_a_satisfying_assignment_for_an_easy_instance() {
        let problem = Problem {
            name: "sat0".into(),
            rooms: vec![Room { id: 0, capacity: 2 }, Room { id: 1, capacity: 2 }],
            slots: vec![TimeSlot { id: 0 }, TimeSlot { id: 1 }, TimeSlot { id: 2 }],
            exams: vec![
                Exam { id: 0, students: BTreeSet::from([0, 1]), duration_minutes: None, department: None, morning_required: None },
                Exam { id: 1, students: BTreeSet::from([2]), duration_minutes: None, department: None, morning_required: None },
            ],
            total_students: 3,
            invigilators: vec![],
        };
        let active = crate::constraints::resolve(&[]).unwrap();
        let outcome = LocalSearchAdapter.solve(&problem, &active, SolveBudget::default());
        assert!(outcome.is_sat(), "{outcome:?}");
    }
}
