use chrono::NaiveDate;
use thiserror::Error;

use crate::decimal::Money;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid principal: {amount}")]
    InvalidPrincipal {
        amount: Money,
    },

    #[error("invalid salary day: {day} (must be within 1..=31)")]
    InvalidSalaryDay {
        day: u8,
    },

    #[error("no processed or disbursed date available for loan")]
    MissingAnchorDate,

    #[error("extension limit exceeded: {used} of {maximum} used")]
    ExtensionLimitExceeded {
        used: u8,
        maximum: u8,
    },

    #[error("an extension is already pending for this loan")]
    ExtensionPending,

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("invalid penalty tier table: {message}")]
    InvalidTierTable {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("malformed plan snapshot: {message}")]
    MalformedPlan {
        message: String,
    },

    #[error("due date could not be resolved: {message}")]
    DueDateUnresolvable {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, EngineError>;
