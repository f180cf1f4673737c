//! Read-only descriptive statistics over a solved timetable: room
//! utilisation, time distribution, and student spread. Informative only —
//! no weight in the aggregate quality score (see `SPEC_FULL.md` §3.1).
//! Grounded on `original_source/metrics.py`'s `MetricsAnalyzer`.

use crate::constraints::support::{exams_by_room, exams_by_slot, student_slots};
use crate::domain::{Assignment, Problem, RoomId, SlotId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomUtilisation {
    pub room: RoomId,
    pub exams_hosted: usize,
    pub students_hosted: usize,
    pub capacity: u32,
    pub utilisation_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotOccupancy {
    pub slot: SlotId,
    pub exams: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimetableStats {
    pub room_utilisation: Vec<RoomUtilisation>,
    pub time_distribution: Vec<SlotOccupancy>,
    /// Histogram of "slots spanned by one student's exams", keyed by span.
    pub student_spread_histogram: BTreeMap<u32, usize>,
}

pub fn compute(problem: &Problem, assignment: &Assignment) -> TimetableStats {
    let by_room = exams_by_room(assignment);
    let room_utilisation = problem
        .rooms
        .iter()
        .filter(|r| r.capacity > 0)
        .map(|room| {
            let exams = by_room.get(&room.id).cloned().unwrap_or_default();
            let students: usize = exams.iter().filter_map(|&e| problem.exam(e)).map(|e| e.student_count()).sum();
            RoomUtilisation {
                room: room.id,
                exams_hosted: exams.len(),
                students_hosted: students,
                capacity: room.capacity,
                utilisation_pct: (students as f64 / room.capacity as f64) * 100.0,
            }
        })
        .collect();

    let by_slot = exams_by_slot(assignment);
    let time_distribution = problem
        .slots
        .iter()
        .map(|slot| SlotOccupancy { slot: slot.id, exams: by_slot.get(&slot.id).map_or(0, |v| v.len()) })
        .collect();

    let mut student_spread_histogram = BTreeMap::new();
    for slots in student_slots(problem, assignment).values() {
        let span = match (slots.first(), slots.last()) {
            (Some(&first), Some(&last)) => last - first,
            _ => 0,
        };
        *student_spread_histogram.entry(span).or_insert(0) += 1;
    }

    TimetableStats { room_utilisation, time_distribution, student_spread_histogram }
}
