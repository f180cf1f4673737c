//! Evolutionary adapter: chromosome = interleaved (room, slot) per exam,
//! two-point crossover, per-gene mutation, tournament selection. Grounded on
//! `original_source/solvers/deap.py`'s `DEAPSolver`.

use super::{SolverAdapter, SolveBudget};
use crate::constraints::{is_feasible, ConstraintEntry};
use crate::domain::{Assignment, Problem, RoomId, SlotId, SolveOutcome};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;

const POPULATION_SIZE: usize = 300;
const GENERATIONS: usize = 100;
const CROSSOVER_PROBABILITY: f64 = 0.7;
const MUTATION_PROBABILITY_PER_GENE: f64 = 0.05;
const TOURNAMENT_SIZE: usize = 3;

pub struct EvolutionaryAdapter;

/// One gene per exam, in `problem.exams` order.
type Chromosome = Vec<(RoomId, SlotId)>;

fn to_assignment(problem: &Problem, chromosome: &Chromosome) -> Assignment {
    let mut assignment = Assignment::new();
    for (exam, &(room, slot)) in problem.exams.iter().zip(chromosome) {
        assignment.insert(exam.id, slot, room);
    }
    assignment
}

fn random_chromosome(problem: &Problem, rng: &mut StdRng) -> Chromosome {
    problem
        .exams
        .iter()
        .map(|_| {
            let room = problem.rooms[rng.gen_range(0..problem.num_rooms().max(1))].id;
            let slot = problem.slots[rng.gen_range(0..problem.num_slots().max(1))].id;
            (room, slot)
        })
        .collect()
}

fn fitness(problem: &Problem, chromosome: &Chromosome, active: &[&dyn ConstraintEntry]) -> f64 {
    let assignment = to_assignment(problem, chromosome);
    active.iter().map(|c| c.evaluate(problem, &assignment)).sum()
}

fn tournament_select<'a>(population: &'a [Chromosome], scores: &[f64], rng: &mut StdRng) -> &'a Chromosome {
    let mut best_idx = rng.gen_range(0..population.len());
    for _ in 1..TOURNAMENT_SIZE {
        let candidate = rng.gen_range(0..population.len());
        if scores[candidate] > scores[best_idx] {
            best_idx = candidate;
        }
    }
    &population[best_idx]
}

fn two_point_crossover(a: &Chromosome, b: &Chromosome, rng: &mut StdRng) -> (Chromosome, Chromosome) {
    let len = a.len();
    if len < 2 {
        return (a.clone(), b.clone());
    }
    let mut p1 = rng.gen_range(0..len);
    let mut p2 = rng.gen_range(0..len);
    if p1 > p2 {
        std::mem::swap(&mut p1, &mut p2);
    }
    let mut child_a = a.clone();
    let mut child_b = b.clone();
    child_a[p1..p2].clone_from_slice(&b[p1..p2]);
    child_b[p1..p2].clone_from_slice(&a[p1..p2]);
    (child_a, child_b)
}

fn mutate(problem: &Problem, chromosome: &mut Chromosome, rng: &mut StdRng) {
    for gene in chromosome.iter_mut() {
        if rng.gen_bool(MUTATION_PROBABILITY_PER_GENE) {
            gene.0 = problem.rooms[rng.gen_range(0..problem.num_rooms().max(1))].id;
        }
        if rng.gen_bool(MUTATION_PROBABILITY_PER_GENE) {
            gene.1 = problem.slots[rng.gen_range(0..problem.num_slots().max(1))].id;
        }
    }
}

impl SolverAdapter for EvolutionaryAdapter {
    fn name(&self) -> &'static str {
        "deap"
    }

    fn solve(&self, problem: &Problem, active: &[&dyn ConstraintEntry], budget: SolveBudget) -> SolveOutcome {
        let start = Instant::now();
        let deadline = super::deadline(budget);
        let mut rng = StdRng::seed_from_u64(7);

        if problem.exams.is_empty() {
            return SolveOutcome::Sat { assignment: Assignment::new(), elapsed_ms: start.elapsed().as_millis() as u64 };
        }

        let mut population: Vec<Chromosome> = (0..POPULATION_SIZE).map(|_| random_chromosome(problem, &mut rng)).collect();
        let mut best: Option<(Chromosome, f64)> = None;

        for _ in 0..GENERATIONS {
            if Instant::now() >= deadline {
                break;
            }
            let scores: Vec<f64> = population.iter().map(|c| fitness(problem, c, active)).collect();

            for (chromosome, &score) in population.iter().zip(&scores) {
                if best.as_ref().is_none_or(|(_, best_score)| score > *best_score) {
                    best = Some((chromosome.clone(), score));
                }
            }
            if let Some((chromosome, _)) = &best {
                if is_feasible(active, problem, &to_assignment(problem, chromosome)) {
                    break;
                }
            }

            let mut next_gen = Vec::with_capacity(POPULATION_SIZE);
            while next_gen.len() < POPULATION_SIZE {
                let parent_a = tournament_select(&population, &scores, &mut rng);
                let parent_b = tournament_select(&population, &scores, &mut rng);
                let (mut child_a, mut child_b) = if rng.gen_bool(CROSSOVER_PROBABILITY) {
                    two_point_crossover(parent_a, parent_b, &mut rng)
                } else {
                    (parent_a.clone(), parent_b.clone())
                };
                mutate(problem, &mut child_a, &mut rng);
                mutate(problem, &mut child_b, &mut rng);
                next_gen.push(child_a);
                if next_gen.len() < POPULATION_SIZE {
                    next_gen.push(child_b);
                }
            }
            population = next_gen;
        }

        match best {
            Some((chromosome, _)) => {
                let assignment = to_assignment(problem, &chromosome);
                if is_feasible(active, problem, &assignment) {
                    SolveOutcome::Sat { assignment, elapsed_ms: start.elapsed().as_millis() as u64 }
                } else {
                    SolveOutcome::Unsat { elapsed_ms: start.elapsed().as_millis() as u64 }
                }
            }
            None => SolveOutcome::Unsat { elapsed_ms: start.elapsed().as_millis() as u64 },
        }
    }
}
