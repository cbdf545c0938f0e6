// Local validation errors, rejected before any store call is issued

use thiserror::Error;

/// Input problems caught on the client side. None of these reach the store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Task title cannot be empty")]
    EmptyTaskTitle,

    #[error("Stage name cannot be empty")]
    EmptyStageName,

    #[error("Template name cannot be empty")]
    EmptyTemplateName,

    #[error("Timer target must be between 1 and 365 working days (got {0})")]
    InvalidTimerDays(i64),

    #[error("No timer is running")]
    TimerNotRunning,
}
