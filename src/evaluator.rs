//! Scores a `Problem`/`Assignment` pair against the active constraint set
//! (spec §4.4): one `MetricScore` per constraint, plus a weighted aggregate.

use crate::constraints::ConstraintEntry;
use crate::domain::{Assignment, MetricScore, Problem};
use crate::error::Result;

/// Default per-constraint weights (spec §4.4 table). Constraints absent from
/// this map (`max_exams_per_slot`, `invigilator_assignment`) are still scored
/// and reported, but don't contribute to the weighted aggregate — the table
/// in the spec simply doesn't assign them one.
pub const DEFAULT_WEIGHTS: &[(&str, f64)] = &[
    ("single_assignment", 0.15),
    ("room_conflicts", 0.15),
    ("room_capacity", 0.10),
    ("student_spacing", 0.10),
    ("morning_sessions", 0.05),
    ("break_period", 0.10),
    ("exam_group_size", 0.05),
    ("department_grouping", 0.10),
    ("room_balancing", 0.10),
    ("invigilator_break", 0.10),
];

fn weight_of(name: &str) -> Option<f64> {
    DEFAULT_WEIGHTS.iter().find(|(n, _)| *n == name).map(|(_, w)| *w)
}

/// One `MetricScore` per active constraint (§4.2's evaluators), in catalog
/// order. Fails fast if `assignment` doesn't validate against `problem`
/// (§7's `InvalidAssignment`).
pub fn evaluate(
    problem: &Problem,
    assignment: &Assignment,
    active: &[&dyn ConstraintEntry],
) -> Result<Vec<MetricScore>> {
    assignment.validate(problem)?;
    Ok(active
        .iter()
        .map(|c| MetricScore { name: c.name().to_string(), value: c.evaluate(problem, assignment) })
        .collect())
}

/// The constraint-weighted mean `S` over `metrics`, renormalised so the
/// weights of the constraints actually present sum to 1 (spec §4.4).
/// Constraints with no declared weight are excluded from the renormalisation
/// entirely rather than counted at weight 0 against a smaller denominator.
pub fn constraint_mean(metrics: &[MetricScore]) -> f64 {
    let weighted: Vec<(f64, f64)> =
        metrics.iter().filter_map(|m| weight_of(&m.name).map(|w| (w, m.value))).collect();
    let total_weight: f64 = weighted.iter().map(|(w, _)| w).sum();
    if total_weight <= 0.0 {
        return 100.0;
    }
    weighted.iter().map(|(w, value)| (w / total_weight) * value).sum()
}

/// `Final = 0.85 * S + 0.15 * TimeScore` (spec §4.4). `time_score` is `100.0`
/// (no penalty) when there's no opponent to compare wall-clock against.
pub fn final_quality(metrics: &[MetricScore], time_score: f64) -> f64 {
    0.85 * constraint_mean(metrics) + 0.15 * time_score
}

/// `TimeScore = 100 * (1 - t_self / max(t_self, t_other))` (spec §4.4): a
/// side that finished in zero relative time scores 100, ties score 0.
pub fn time_score(self_ms: u64, other_ms: u64) -> f64 {
    let denom = (self_ms.max(other_ms)) as f64;
    if denom == 0.0 {
        return 100.0;
    }
    100.0 * (1.0 - self_ms as f64 / denom)
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
            slots: vec![TimeSlot { id: 0 }, TimeSlot { id: 1 }],
            exams: vec![Exam {
                id: 0,
                students: BTreeSet::from_iter(0..8),
                duration_minutes: None,
                department: None,
                morning_required: None,
            }],
            total_students: 8,
            invigilators: vec![],
        }
    }

    #[test]
    fn matches_the_deterministic_scoring_scenario() {
        let p = problem();
        let mut a = Assignment::new();
        a.insert(0, 0, 0);
        let active = crate::constraints::resolve(&[]).unwrap();
        let metrics = evaluate(&p, &a, &active).unwrap();
        let by_name: std::collections::HashMap<_, _> = metrics.iter().map(|m| (m.name.as_str(), m.value)).collect();
        assert_eq!(by_name["room_capacity"], 80.0);
        assert_eq!(by_name["room_conflicts"], 100.0);
        assert_eq!(by_name["single_assignment"], 100.0);
        assert_eq!(by_name["student_spacing"], 100.0);
        assert_eq!(by_name["max_exams_per_slot"], 100.0);
    }

    #[test]
    fn rejects_an_invalid_assignment() {
        let p = problem();
        let a = Assignment::new();
        let active = crate::constraints::resolve(&[]).unwrap();
        assert!(evaluate(&p, &a, &active).is_err());
    }

    #[test]
    fn time_score_of_equal_durations_is_zero() {
        assert_eq!(time_score(100, 100), 0.0);
    }

    #[test]
    fn time_score_of_instant_self_is_full_marks() {
        assert_eq!(time_score(0, 50), 100.0);
    }
}
