//! Category keys for reports.

use super::error::{EvalError, FilterParseError};
use super::parser::FilterExpression;
use crate::request::Record;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Key under which a report groups a record. `Absent` sorts after every value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum CategoryKey {
    Value(String),
    Absent,
}

impl CategoryKey {
    pub fn value(value: impl Into<String>) -> Self {
        CategoryKey::Value(value.into())
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryKey::Value(v) => write!(f, "{v}"),
            CategoryKey::Absent => write!(f, "(absent)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(String),
}

/// A category key template such as `{controller}#{action}.{format}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl CategoryTemplate {
    pub fn parse(source: &str) -> Result<Self, FilterParseError> {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(open) = rest.find('{') {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let close = rest[open..]
                .find('}')
                .ok_or_else(|| FilterParseError::UnterminatedPlaceholder(source.to_string()))?;
            let name = rest[open + 1..open + close].trim();
            if name.is_empty() {
                return Err(FilterParseError::EmptyPlaceholder(source.to_string()));
            }
            segments.push(Segment::Field(name.to_string()));
            rest = &rest[open + close + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        if !segments.iter().any(|s| matches!(s, Segment::Field(_))) {
            return Err(FilterParseError::NoPlaceholders(source.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Field(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Missing fields render empty; when none of them are present the key is `Absent`
    pub fn render(&self, record: &dyn Record) -> CategoryKey {
        let mut out = String::new();
        let mut found = false;
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(name) => {
                    if let Some(value) = record.field(name) {
                        found = true;
                        out.push_str(&value.to_string());
                    }
                }
            }
        }
        if found {
            CategoryKey::Value(out)
        } else {
            CategoryKey::Absent
        }
    }
}

pub type CategorizeFn = Arc<dyn Fn(&dyn Record) -> Result<CategoryKey, EvalError> + Send + Sync>;
pub type PredicateFn = Arc<dyn Fn(&dyn Record) -> Result<bool, EvalError> + Send + Sync>;

/// Derives the category key of a record
#[derive(Clone)]
pub enum Categorizer {
    /// The rendered value of one field
    Field(String),
    Template(CategoryTemplate),
    Custom(CategorizeFn),
}

impl Categorizer {
    pub fn field(name: impl Into<String>) -> Self {
        Categorizer::Field(name.into())
    }

    pub fn template(source: &str) -> Result<Self, FilterParseError> {
        CategoryTemplate::parse(source).map(Categorizer::Template)
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&dyn Record) -> Result<CategoryKey, EvalError> + Send + Sync + 'static,
    {
        Categorizer::Custom(Arc::new(f))
    }

    pub fn categorize(&self, record: &dyn Record) -> Result<CategoryKey, EvalError> {
        match self {
            Categorizer::Field(name) => Ok(record
                .field(name)
                .map(|v| CategoryKey::Value(v.to_string()))
                .unwrap_or(CategoryKey::Absent)),
            Categorizer::Template(template) => Ok(template.render(record)),
            Categorizer::Custom(f) => f(record),
        }
    }
}

impl fmt::Debug for Categorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Categorizer::Field(name) => f.debug_tuple("Field").field(name).finish(),
            Categorizer::Template(t) => f.debug_tuple("Template").field(&t.source).finish(),
            Categorizer::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl fmt::Display for Categorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Categorizer::Field(name) => write!(f, "{name}"),
            Categorizer::Template(t) => write!(f, "{}", t.source),
            Categorizer::Custom(_) => write!(f, "<custom>"),
        }
    }
}

/// Decides whether a report sees a record at all
#[derive(Clone)]
pub enum RequestFilter {
    Expression(FilterExpression),
    Custom(PredicateFn),
}

impl RequestFilter {
    pub fn parse(expression: &str) -> Result<Self, FilterParseError> {
        FilterExpression::parse(expression).map(RequestFilter::Expression)
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&dyn Record) -> Result<bool, EvalError> + Send + Sync + 'static,
    {
        RequestFilter::Custom(Arc::new(f))
    }

    pub fn evaluate(&self, record: &dyn Record) -> Result<bool, EvalError> {
        match self {
            RequestFilter::Expression(expr) => Ok(expr.matches(record)),
            RequestFilter::Custom(f) => f(record),
        }
    }
}

impl fmt::Debug for RequestFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestFilter::Expression(expr) => f.debug_tuple("Expression").field(expr).finish(),
            RequestFilter::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl fmt::Display for RequestFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestFilter::Expression(expr) => write!(f, "{expr}"),
            RequestFilter::Custom(_) => write!(f, "<custom>"),
        }
    }
}
