use thiserror::Error;

/// Errors that can occur when parsing filter expressions and category templates
#[derive(Debug, Error, PartialEq)]
pub enum FilterParseError {
    #[error("Missing operator in filter term '{0}'. Expected field:value, field>value, field:* ...")]
    MissingOperator(String),

    #[error("Missing field name in filter term '{0}'")]
    EmptyField(String),

    #[error("Empty filter value for field '{0}'")]
    EmptyValue(String),

    #[error("Unterminated placeholder in category template '{0}'")]
    UnterminatedPlaceholder(String),

    #[error("Empty placeholder in category template '{0}'")]
    EmptyPlaceholder(String),

    #[error("Category template '{0}' references no fields")]
    NoPlaceholders(String),
}

/// Raised by user-supplied categorizers and filters for a single record
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{0}")]
pub struct EvalError(pub String);

impl EvalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
