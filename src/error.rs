use thiserror::Error;

/// Error taxonomy for the scheduling core.
///
/// `Unsat` and a solver running out of its time budget are not represented here:
/// both are ordinary data carried inside [`crate::domain::SolveOutcome`], not failures.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("parse error at line {line}: {reason}")]
    ParseError { line: usize, reason: String },

    #[error("unknown solver: {0}")]
    UnknownSolver(String),

    #[error("unknown constraint: {0}")]
    UnknownConstraint(String),

    #[error("backend error: {0}")]
    BackendError(String),

    #[error("invalid assignment: {0}")]
    InvalidAssignment(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
