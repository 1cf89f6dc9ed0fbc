//! Error types for the filter parser.

use thiserror::Error;

/// A specialized Result type for filter parsing operations.
pub type FilterResult<T> = Result<T, FilterError>;

/// Errors that can occur while parsing a filter expression.
///
/// Positions are 0-indexed byte offsets into the original input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilterError {
    /// A connective or parenthesis had nothing on one side.
    #[error("empty condition at position {position}")]
    EmptyCondition {
        /// Where the condition was expected.
        position: usize,
    },

    /// A condition had a field but no recognizable operator.
    #[error("no comparison operator in condition: {condition}")]
    MissingOperator {
        /// The condition text as written.
        condition: String,
    },

    /// An operator appeared without a field name before it.
    #[error("missing field name before operator at position {position}")]
    MissingField {
        /// Position of the operator.
        position: usize,
    },

    /// An operator that needs a value was not followed by one.
    #[error("missing value for field {field}")]
    MissingValue {
        /// The field whose value is missing.
        field: String,
    },

    /// A token appeared where it is not allowed.
    #[error("unexpected token '{token}' at position {position}")]
    UnexpectedToken {
        /// The token text.
        token: String,
        /// Where the token starts.
        position: usize,
    },

    /// An opening parenthesis was never closed.
    #[error("unclosed parenthesis at position {position}")]
    UnclosedParenthesis {
        /// Position of the opening parenthesis.
        position: usize,
    },

    /// A quoted value ran to the end of the input.
    #[error("unterminated quote starting at position {position}")]
    UnterminatedQuote {
        /// Position of the opening quote.
        position: usize,
    },
}

impl FilterError {
    /// Creates an unexpected token error.
    pub fn unexpected_token(token: impl Into<String>, position: usize) -> Self {
        FilterError::UnexpectedToken {
            token: token.into(),
            position,
        }
    }

    /// Creates a missing operator error.
    pub fn missing_operator(condition: impl Into<String>) -> Self {
        FilterError::MissingOperator {
            condition: condition.into(),
        }
    }

    /// Creates a missing value error.
    pub fn missing_value(field: impl Into<String>) -> Self {
        FilterError::MissingValue {
            field: field.into(),
        }
    }
}
