//! Parses the line-oriented instance-file format (spec §4.1) into a
//! validated [`Problem`].

use crate::domain::{Exam, Problem, Room, StudentId, TimeSlot};
use crate::error::{Result, SchedulerError};
use std::collections::BTreeMap;
use std::path::Path;

fn parse_error(line: usize, reason: impl Into<String>) -> SchedulerError {
    SchedulerError::ParseError { line, reason: reason.into() }
}

/// Matches a header line of the form `<name>:\s*(\d+)` and returns the
/// captured number, erroring with the original line number if the line
/// doesn't start with `expected_prefix` or the trailing number is malformed.
fn parse_header(line: &str, lineno: usize, expected_prefix: &str) -> Result<u32> {
    let without_prefix = line
        .strip_prefix(expected_prefix)
        .ok_or_else(|| parse_error(lineno, format!("expected header '{expected_prefix}...'")))?;
    let value = without_prefix.trim_start_matches(':').trim();
    value
        .parse::<u32>()
        .map_err(|_| parse_error(lineno, format!("expected a number after '{expected_prefix}'")))
}

/// Parses a path to an instance file into a [`Problem`]. See spec §4.1 for
/// the exact grammar.
pub fn load_problem(path: impl AsRef<Path>) -> Result<Problem> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "instance".to_string());
    parse_problem(&text, name)
}

/// Parses already-loaded instance-file text into a [`Problem`]. Split out
/// from [`load_problem`] so tests and the HTTP facade can parse in-memory
/// text without touching the filesystem.
pub fn parse_problem(text: &str, name: impl Into<String>) -> Result<Problem> {
    let mut lines = text.lines().enumerate();

    let (lineno, line) = lines
        .next()
        .ok_or_else(|| parse_error(1, "empty instance file"))?;
    let total_students = parse_header(line.trim(), lineno + 1, "Number of students")?;

    let (lineno, line) = lines
        .next()
        .ok_or_else(|| parse_error(2, "missing 'Number of exams' header"))?;
    let num_exams = parse_header(line.trim(), lineno + 1, "Number of exams")?;

    let (lineno, line) = lines
        .next()
        .ok_or_else(|| parse_error(3, "missing 'Number of slots' header"))?;
    let num_slots = parse_header(line.trim(), lineno + 1, "Number of slots")?;

    let (lineno, line) = lines
        .next()
        .ok_or_else(|| parse_error(4, "missing 'Number of rooms' header"))?;
    let num_rooms = parse_header(line.trim(), lineno + 1, "Number of rooms")?;

    let mut rooms = Vec::with_capacity(num_rooms as usize);
    for r in 0..num_rooms {
        let (lineno, line) = lines.next().ok_or_else(|| {
            parse_error(lineno_hint(&rooms), format!("missing capacity line for room {r}"))
        })?;
        let expected_prefix = format!("Room {r} capacity");
        let capacity = parse_header(line.trim(), lineno + 1, &expected_prefix)?;
        rooms.push(Room { id: r, capacity });
    }

    let slots = (0..num_slots).map(|id| TimeSlot { id }).collect();

    let mut students_by_exam: BTreeMap<u32, std::collections::BTreeSet<StudentId>> =
        BTreeMap::new();
    for (lineno, line) in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let exam_id: u32 = parts
            .next()
            .ok_or_else(|| parse_error(lineno + 1, "expected '<exam-id> <student-id>'"))?
            .parse()
            .map_err(|_| parse_error(lineno + 1, "exam id is not a number"))?;
        let student_id: StudentId = parts
            .next()
            .ok_or_else(|| parse_error(lineno + 1, "expected a student id after the exam id"))?
            .parse()
            .map_err(|_| parse_error(lineno + 1, "student id is not a number"))?;
        if parts.next().is_some() {
            return Err(parse_error(lineno + 1, "too many fields on enrollment line"));
        }
        students_by_exam.entry(exam_id).or_default().insert(student_id);
    }

    let exams = (0..num_exams)
        .map(|id| Exam {
            id,
            students: students_by_exam.remove(&id).unwrap_or_default(),
            duration_minutes: None,
            department: None,
            morning_required: None,
        })
        .collect();

    let problem = Problem {
        name: name.into(),
        rooms,
        slots,
        exams,
        total_students,
        invigilators: Vec::new(),
    };

    if problem.total_students < max_student_id(&problem).map(|m| m + 1).unwrap_or(0) {
        return Err(parse_error(
            0,
            "total_students is smaller than the highest referenced student id",
        ));
    }

    Ok(problem)
}

fn max_student_id(problem: &Problem) -> Option<StudentId> {
    problem.exams.iter().flat_map(|e| e.students.iter().copied()).max()
}

/// Best-effort line number for an error raised while still inside the fixed
/// room-capacity header block (used only for the "missing line" case, where
/// there's no real line to point at).
fn lineno_hint(rooms_so_far: &[Room]) -> usize {
    5 + rooms_so_far.len()
}
