use thiserror::Error;

/// Attendance status code outside `P`, `A`, `L`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusError {
    #[error("unknown attendance status code {0:?} (expected P, A or L)")]
    Unknown(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    #[error("unparseable attendance date {0:?} (expected RFC 3339 or YYYY-MM-DD)")]
    Unparseable(String),
}

/// Validation failures for class configuration and combined reports.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid class code {0:?} (expected 6 characters A-Z or 0-9)")]
    InvalidCode(String),

    #[error("cannot combine class {0} with itself")]
    SelfCombination(String),

    #[error("total classes must be at least 1, got {0}")]
    InvalidTotal(i64),
}
