//! Format definitions: the ordered set of line definitions for one log dialect.
//!
//! Profiles describe formats declaratively ([`FormatConfig`]); [`FileFormat::compile`]
//! validates them once, up front, so that a broken definition fails the run before
//! any line is read.

mod definition;

pub use definition::{
    CaptureConfig, CaptureSpec, LineDefinition, LineDefinitionConfig, LineRole,
};

use crate::convert::{Conversion, ConverterSpecError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

pub const DEFAULT_MAX_OPEN_REQUESTS: usize = 1024;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("format '{0}' has no line definitions")]
    Empty(String),
    #[error("line definition without a name")]
    MissingName,
    #[error("duplicate line definition '{0}'")]
    DuplicateLine(String),
    #[error("invalid regexp for line '{line}': {source}")]
    InvalidRegex {
        line: String,
        #[source]
        source: regex::Error,
    },
    #[error("invalid teaser for line '{line}': {source}")]
    InvalidTeaser {
        line: String,
        #[source]
        source: regex::Error,
    },
    #[error("line '{line}' declares {captures} captures but its regexp has {groups} groups")]
    CaptureCountMismatch {
        line: String,
        captures: usize,
        groups: usize,
    },
    #[error("capture '{capture}' of line '{line}': {source}")]
    Converter {
        line: String,
        capture: String,
        #[source]
        source: ConverterSpecError,
    },
    #[error("max_open_requests must be at least 1")]
    NoOpenRequests,
}

/// Declarative format, as written in the `[format]` table of a profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormatConfig {
    pub name: String,
    /// Field whose value correlates lines of the same request. Positional when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_field: Option<String>,
    #[serde(default = "default_max_open_requests")]
    pub max_open_requests: usize,
    #[serde(default)]
    pub lines: Vec<LineDefinitionConfig>,
}

fn default_max_open_requests() -> usize {
    DEFAULT_MAX_OPEN_REQUESTS
}

impl FormatConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            correlation_field: None,
            max_open_requests: DEFAULT_MAX_OPEN_REQUESTS,
            lines: Vec::new(),
        }
    }

    pub fn line(mut self, line: LineDefinitionConfig) -> Self {
        self.lines.push(line);
        self
    }

    pub fn correlation_field(mut self, field: impl Into<String>) -> Self {
        self.correlation_field = Some(field.into());
        self
    }
}

/// A compiled format: line definitions in registration order
#[derive(Debug, Clone)]
pub struct FileFormat {
    pub name: String,
    pub definitions: Vec<LineDefinition>,
    pub correlation_field: Option<String>,
    pub max_open_requests: usize,
}

impl FileFormat {
    pub fn compile(config: &FormatConfig) -> Result<Self, FormatError> {
        if config.lines.is_empty() {
            return Err(FormatError::Empty(config.name.clone()));
        }
        if config.max_open_requests == 0 {
            return Err(FormatError::NoOpenRequests);
        }

        let mut seen = HashSet::new();
        let mut definitions = Vec::with_capacity(config.lines.len());
        for line in &config.lines {
            if line.name.trim().is_empty() {
                return Err(FormatError::MissingName);
            }
            if !seen.insert(line.name.as_str()) {
                return Err(FormatError::DuplicateLine(line.name.clone()));
            }
            definitions.push(compile_line(line)?);
        }

        Ok(Self {
            name: config.name.clone(),
            definitions,
            correlation_field: config.correlation_field.clone(),
            max_open_requests: config.max_open_requests,
        })
    }

    pub fn definition(&self, name: &str) -> Option<&LineDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }
}

fn compile_line(config: &LineDefinitionConfig) -> Result<LineDefinition, FormatError> {
    let regex = Regex::new(&config.regexp).map_err(|source| FormatError::InvalidRegex {
        line: config.name.clone(),
        source,
    })?;

    let teaser = config
        .teaser
        .as_deref()
        .map(Regex::new)
        .transpose()
        .map_err(|source| FormatError::InvalidTeaser {
            line: config.name.clone(),
            source,
        })?;

    // captures_len() counts the implicit whole-match group
    let groups = regex.captures_len() - 1;
    if groups != config.captures.len() {
        return Err(FormatError::CaptureCountMismatch {
            line: config.name.clone(),
            captures: config.captures.len(),
            groups,
        });
    }

    let captures = config
        .captures
        .iter()
        .map(|capture| {
            Conversion::from_tag(&capture.kind, capture.unit.as_deref())
                .map(|conversion| CaptureSpec {
                    name: capture.name.clone(),
                    conversion,
                })
                .map_err(|source| FormatError::Converter {
                    line: config.name.clone(),
                    capture: capture.name.clone(),
                    source,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LineDefinition {
        name: config.name.clone(),
        regex,
        teaser,
        role: LineRole::from_flags(config.header, config.footer),
        captures,
    })
}
