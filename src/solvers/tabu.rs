//! Tabu-search adapter: short-term memory of recent assignment hashes,
//! neighbourhood of single-variable moves, aspiration by strict improvement.
//! Grounded on `original_source/solvers/tabusearch.py`'s `TabuSearchSolver`.

use super::{SolverAdapter, SolveBudget};
use crate::constraints::{is_feasible, ConstraintEntry};
use crate::domain::{Assignment, Problem, SolveOutcome};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Instant;

const TABU_TENURE: usize = 10;
const NEIGHBOR_SAMPLE: usize = 20;
const MAX_ITERATIONS: usize = 5000;

pub struct TabuAdapter;

fn objective(problem: &Problem, assignment: &Assignment, active: &[&dyn ConstraintEntry]) -> f64 {
    active.iter().map(|c| c.evaluate(problem, assignment)).sum()
}

fn hash_of(assignment: &Assignment) -> u64 {
    let mut hasher = DefaultHasher::new();
    assignment.to_canonical_text().hash(&mut hasher);
    hasher.finish()
}

fn initial_assignment(problem: &Problem) -> Assignment {
    let mut assignment = Assignment::new();
    for (i, exam) in problem.exams.iter().enumerate() {
        let room = problem.rooms.get(i % problem.num_rooms().max(1)).map(|r| r.id).unwrap_or(0);
        let slot = problem.slots.get(i % problem.num_slots().max(1)).map(|t| t.id).unwrap_or(0);
        assignment.insert(exam.id, slot, room);
    }
    assignment
}

/// Every single-variable (room or slot) move reachable from `assignment`,
/// sampled down to `NEIGHBOR_SAMPLE` entries.
fn sampled_neighbors(problem: &Problem, assignment: &Assignment, rng: &mut StdRng) -> Vec<Assignment> {
    let mut neighbors = Vec::new();
    for exam in &problem.exams {
        let Some(placement) = assignment.get(exam.id) else { continue };
        for room in &problem.rooms {
            if room.id == placement.room {
                continue;
            }
            let mut n = assignment.clone();
            n.insert(exam.id, placement.slot, room.id);
            neighbors.push(n);
        }
        for slot in &problem.slots {
            if slot.id == placement.slot {
                continue;
            }
            let mut n = assignment.clone();
            n.insert(exam.id, slot.id, placement.room);
            neighbors.push(n);
        }
    }
    if neighbors.len() > NEIGHBOR_SAMPLE {
        let mut sampled = Vec::with_capacity(NEIGHBOR_SAMPLE);
        for _ in 0..NEIGHBOR_SAMPLE {
            let idx = rng.gen_range(0..neighbors.len());
            sampled.push(neighbors.swap_remove(idx));
        }
        sampled
    } else {
        neighbors
    }
}

impl SolverAdapter for TabuAdapter {
    fn name(&self) -> &'static str {
        "tabu"
    }

    fn solve(&self, problem: &Problem, active: &[&dyn ConstraintEntry], budget: SolveBudget) -> SolveOutcome {
        let start = Instant::now();
        let deadline = super::deadline(budget);
        let mut rng = StdRng::seed_from_u64(4242);

        let mut current = initial_assignment(problem);
        let mut current_score = objective(problem, &current, active);
        let mut best = current.clone();
        let mut best_score = current_score;

        let mut tabu: VecDeque<u64> = VecDeque::with_capacity(TABU_TENURE);
        tabu.push_back(hash_of(&current));

        for _ in 0..MAX_ITERATIONS {
            if Instant::now() >= deadline || is_feasible(active, problem, &best) {
                break;
            }
            let neighbors = sampled_neighbors(problem, &current, &mut rng);
            if neighbors.is_empty() {
                break;
            }

            let mut chosen: Option<(Assignment, f64)> = None;
            for neighbor in neighbors {
                let score = objective(problem, &neighbor, active);
                let h = hash_of(&neighbor);
                let tabu_hit = tabu.contains(&h);
                // Aspiration: accept a tabu move anyway if it beats the best seen.
                if tabu_hit && score <= best_score {
                    continue;
                }
                if chosen.as_ref().is_none_or(|(_, chosen_score)| score > *chosen_score) {
                    chosen = Some((neighbor, score));
                }
            }

            let Some((next, next_score)) = chosen else { break };
            current = next;
            current_score = next_score;
            tabu.push_back(hash_of(&current));
            if tabu.len() > TABU_TENURE {
                tabu.pop_front();
            }
            if current_score > best_score {
                best = current.clone();
                best_score = current_score;
            }
        }

        if is_feasible(active, problem, &best) {
            SolveOutcome::Sat { assignment: best, elapsed_ms: start.elapsed().as_millis() as u64 }
        } else {
            SolveOutcome::Unsat { elapsed_ms: start.elapsed().as_millis() as u64 }
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
        let outcome = TabuAdapter.solve(&problem, &active, SolveBudget::default());
        assert!(outcome.is_sat(), "{outcome:?}");
    }
}
