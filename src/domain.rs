//! Immutable value objects shared by every layer of the scheduler: rooms, time
//! slots, exams, invigilators, the `Problem` that owns them, and the
//! `Assignment` / scoring types produced downstream.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type RoomId = u32;
pub type SlotId = u32;
pub type ExamId = u32;
pub type StudentId = u32;
pub type InvigilatorId = u32;

/// A physical space with an integer capacity. Zero-capacity rooms are legal
/// (e.g. a placeholder row in an instance file) but are excluded from
/// capacity-based metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub capacity: u32,
}

/// A discrete time window. Slots are totally ordered by `id`; "morning" is
/// the first `T / 2` slots of a problem with `T` slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: SlotId,
}

/// A test session shared by a set of students, to be placed at exactly one
/// (slot, room). `students` must be non-empty for a well-formed instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: ExamId,
    pub students: BTreeSet<StudentId>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub morning_required: Option<bool>,
}

impl Exam {
    pub fn student_count(&self) -> usize {
        self.students.len()
    }
}

/// A staff member who can supervise at most `max_exams_per_day` sessions,
/// subject to a set of unavailable slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invigilator {
    pub id: InvigilatorId,
    #[serde(default = "default_max_exams_per_day")]
    pub max_exams_per_day: u32,
    #[serde(default)]
    pub unavailable_slots: BTreeSet<SlotId>,
}

fn default_max_exams_per_day() -> u32 {
    3
}

/// The full, immutable scheduling instance. Created once by the ingester and
/// shared read-only by every collaborator thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub name: String,
    pub rooms: Vec<Room>,
    pub slots: Vec<TimeSlot>,
    pub exams: Vec<Exam>,
    pub total_students: u32,
    #[serde(default)]
    pub invigilators: Vec<Invigilator>,
}

impl Problem {
    pub fn num_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn num_exams(&self) -> usize {
        self.exams.len()
    }

    pub fn morning_cutoff(&self) -> u32 {
        (self.num_slots() / 2) as u32
    }

    pub fn room_capacity(&self, room: RoomId) -> Option<u32> {
        self.rooms.iter().find(|r| r.id == room).map(|r| r.capacity)
    }

    pub fn exam(&self, id: ExamId) -> Option<&Exam> {
        self.exams.iter().find(|e| e.id == id)
    }

    /// Exams that list `student` as an enrollee, in exam-id order.
    pub fn exams_for_student(&self, student: StudentId) -> Vec<&Exam> {
        self.exams.iter().filter(|e| e.students.contains(&student)).collect()
    }
}

/// Where one exam was placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamPlacement {
    pub slot: SlotId,
    pub room: RoomId,
}

/// A total map from exam id to (slot, room). Immutable once produced by a
/// backend; bounds (`0 <= slot < T`, `0 <= room < R`) are validated by
/// [`Assignment::validate`] before it is handed to the evaluator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    placements: BTreeMap<ExamId, ExamPlacement>,
}

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, exam: ExamId, slot: SlotId, room: RoomId) {
        self.placements.insert(exam, ExamPlacement { slot, room });
    }

    pub fn get(&self, exam: ExamId) -> Option<ExamPlacement> {
        self.placements.get(&exam).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ExamId, ExamPlacement)> + '_ {
        self.placements.iter().map(|(&e, &p)| (e, p))
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Bounds-checks every placement against the problem's room and slot
    /// counts, and requires every exam in `problem` to have a placement.
    /// Evaluators must call this and fail fast rather than score nonsense.
    pub fn validate(&self, problem: &Problem) -> crate::error::Result<()> {
        let num_rooms = problem.num_rooms() as u32;
        let num_slots = problem.num_slots() as u32;
        for exam in &problem.exams {
            let placement = self.placements.get(&exam.id).ok_or_else(|| {
                crate::error::SchedulerError::InvalidAssignment(format!(
                    "exam {} has no placement",
                    exam.id
                ))
            })?;
            if placement.slot >= num_slots {
                return Err(crate::error::SchedulerError::InvalidAssignment(format!(
                    "exam {} placed at out-of-range slot {}",
                    exam.id, placement.slot
                )));
            }
            if placement.room >= num_rooms {
                return Err(crate::error::SchedulerError::InvalidAssignment(format!(
                    "exam {} placed in out-of-range room {}",
                    exam.id, placement.room
                )));
            }
        }
        Ok(())
    }

    /// Canonical one-line-per-exam text serialisation (§6): `Exam <e>: Room
    /// <r>, Time slot <t>`.
    pub fn to_canonical_text(&self) -> String {
        let mut lines: Vec<String> = self
            .placements
            .iter()
            .map(|(exam, p)| format!("Exam {}: Room {}, Time slot {}", exam, p.room, p.slot))
            .collect();
        lines.sort();
        lines.join("\n")
    }

    /// Parses the canonical text form back into an `Assignment` (used for the
    /// round-trip property in §8.5).
    pub fn from_canonical_text(text: &str) -> crate::error::Result<Self> {
        let mut assignment = Assignment::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let parse_err = || crate::error::SchedulerError::ParseError {
                line: lineno + 1,
                reason: format!("malformed assignment line: {line}"),
            };
            let rest = line.strip_prefix("Exam ").ok_or_else(parse_err)?;
            let (exam_str, rest) = rest.split_once(':').ok_or_else(parse_err)?;
            let exam: ExamId = exam_str.trim().parse().map_err(|_| parse_err())?;
            let rest = rest.trim().strip_prefix("Room ").ok_or_else(parse_err)?;
            let (room_str, rest) = rest.split_once(',').ok_or_else(parse_err)?;
            let room: RoomId = room_str.trim().parse().map_err(|_| parse_err())?;
            let slot_str = rest
                .trim()
                .strip_prefix("Time slot ")
                .ok_or_else(parse_err)?;
            let slot: SlotId = slot_str.trim().parse().map_err(|_| parse_err())?;
            assignment.insert(exam, slot, room);
        }
        Ok(assignment)
    }
}

/// A single constraint's score, always in `[0, 100]`, higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricScore {
    pub name: String,
    pub value: f64,
}

/// The result of one backend's `solve` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SolveOutcome {
    Sat { assignment: Assignment, elapsed_ms: u64 },
    Unsat { elapsed_ms: u64 },
    Error { message: String },
}

impl SolveOutcome {
    pub fn elapsed_ms(&self) -> Option<u64> {
        match self {
            SolveOutcome::Sat { elapsed_ms, .. } => Some(*elapsed_ms),
            SolveOutcome::Unsat { elapsed_ms } => Some(*elapsed_ms),
            SolveOutcome::Error { .. } => None,
        }
    }

    pub fn is_sat(&self) -> bool {
        matches!(self, SolveOutcome::Sat { .. })
    }

    pub fn is_unsat(&self) -> bool {
        matches!(self, SolveOutcome::Unsat { .. })
    }
}

/// Which side of a comparison came out ahead on one metric (or the aggregate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    A,
    B,
    Tie,
}

/// One constraint's score on both sides of a comparison, plus the winner
/// (`Tie` when `|a - b| < 1.0`, spec §4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricComparison {
    pub name: String,
    pub score_a: f64,
    pub score_b: f64,
    pub winner: Winner,
}

/// The result of running two solvers on the same `Problem` (spec §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ComparisonReport {
    /// Both sides produced a `Sat` outcome; full per-metric comparison.
    Decided {
        solver_a: String,
        solver_b: String,
        elapsed_ms_a: u64,
        elapsed_ms_b: u64,
        metrics: Vec<MetricComparison>,
        quality_a: f64,
        quality_b: f64,
        winner: Winner,
        stats_a: crate::stats::TimetableStats,
        stats_b: crate::stats::TimetableStats,
    },
    /// Exactly one side is `Unsat`/`Error`; the other wins trivially, with no
    /// per-metric comparison (sentinel "N/A" per spec §4.5).
    OneUnsat { solver_a: String, solver_b: String, unsat_side: Winner, winner: Winner },
    /// Both sides are `Unsat`/`Error`; there is no winner.
    BothUnsat { solver_a: String, solver_b: String },
}
