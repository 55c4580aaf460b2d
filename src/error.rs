use thiserror::Error;

use crate::recur::RulePart;

/// Errors raised while building or validating a [`RecurrenceRule`].
///
/// [`RecurrenceRule`]: crate::recur::RecurrenceRule
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecurError {
    #[error("missing FREQ in recurrence rule")]
    MissingFrequency,

    #[error("unknown recurrence rule part '{part}'")]
    UnknownPart { part: String },

    #[error("invalid {part} value '{value}': {reason}")]
    InvalidValue {
        part: RulePart,
        value: String,
        reason: String,
    },

    #[error("invalid {part} in recurrence rule: {reason}")]
    InvalidCombination { part: RulePart, reason: String },

    #[error("COUNT and UNTIL cannot both be set")]
    CountAndUntil,

    #[error("invalid UNTIL value '{value}'")]
    InvalidUntil { value: String },
}

impl RecurError {
    /// The rule part the error is about, if it concerns a single one.
    pub fn part(&self) -> Option<RulePart> {
        match self {
            RecurError::InvalidValue { part, .. } | RecurError::InvalidCombination { part, .. } => {
                Some(*part)
            }
            _ => None,
        }
    }

    pub(crate) fn invalid_value(
        part: RulePart,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        RecurError::InvalidValue {
            part,
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn combination(part: RulePart, reason: impl Into<String>) -> Self {
        RecurError::InvalidCombination {
            part,
            reason: reason.into(),
        }
    }
}

/// Timezone resolution and registration failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimezoneError {
    #[error("timezone '{0}' not found")]
    NotFound(String),

    /// Something other than a VTIMEZONE was handed to the registry.
    #[error("cannot register {0} as a timezone")]
    NotATimezone(String),

    #[error("timezone '{0}' can only be resolved through a registry")]
    Unresolved(String),

    #[error("invalid timezone definition: {0}")]
    InvalidDefinition(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    #[error("invalid date or date-time value '{value}'")]
    Parse { value: String },

    /// Calendar arithmetic left the representable range.
    #[error("date out of range: {0}")]
    OutOfRange(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Recur(#[from] RecurError),

    #[error(transparent)]
    Timezone(#[from] TimezoneError),

    #[error(transparent)]
    Time(#[from] TimeError),
}
