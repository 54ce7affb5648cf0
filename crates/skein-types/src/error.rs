use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq)]
pub enum TypeError {
    #[error("missing axis: {0}")]
    MissingAxis(String),

    #[error("axis {0} is reserved")]
    ReservedAxis(String),

    #[error("invalid {axis} span [{start}, {end})")]
    InvalidSpan { axis: String, start: f64, end: f64 },
}
