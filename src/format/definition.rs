use crate::convert::Conversion;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a line sits inside a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineRole {
    /// Opens a request
    Header,
    /// Contributes to the open request
    Body,
    /// Closes the open request, or stands alone as an orphan
    Footer,
    /// Header and footer at once: a complete single-line request
    Single,
}

impl LineRole {
    pub fn from_flags(header: bool, footer: bool) -> Self {
        match (header, footer) {
            (true, true) => LineRole::Single,
            (true, false) => LineRole::Header,
            (false, true) => LineRole::Footer,
            (false, false) => LineRole::Body,
        }
    }

    pub fn opens_request(self) -> bool {
        matches!(self, LineRole::Header | LineRole::Single)
    }

    pub fn closes_request(self) -> bool {
        matches!(self, LineRole::Footer | LineRole::Single)
    }
}

impl fmt::Display for LineRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineRole::Header => write!(f, "header"),
            LineRole::Body => write!(f, "body"),
            LineRole::Footer => write!(f, "footer"),
            LineRole::Single => write!(f, "single"),
        }
    }
}

/// Declarative description of one capture, as written in a profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptureConfig {
    pub name: String,
    /// Converter tag (`string`, `integer`, `duration`, `timestamp`, `eval`, ...)
    #[serde(rename = "type", default = "default_capture_type")]
    pub kind: String,
    /// Converter option, e.g. `msec` for durations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

fn default_capture_type() -> String {
    "string".to_string()
}

impl CaptureConfig {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            unit: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

/// Declarative description of one kind of log line, as written in a profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineDefinitionConfig {
    pub name: String,
    pub regexp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teaser: Option<String>,
    #[serde(default)]
    pub header: bool,
    #[serde(default)]
    pub footer: bool,
    #[serde(default)]
    pub captures: Vec<CaptureConfig>,
}

impl LineDefinitionConfig {
    pub fn new(name: impl Into<String>, regexp: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            regexp: regexp.into(),
            teaser: None,
            header: false,
            footer: false,
            captures: Vec::new(),
        }
    }

    pub fn teaser(mut self, teaser: impl Into<String>) -> Self {
        self.teaser = Some(teaser.into());
        self
    }

    pub fn header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    pub fn footer(mut self, footer: bool) -> Self {
        self.footer = footer;
        self
    }

    pub fn capture(mut self, capture: CaptureConfig) -> Self {
        self.captures.push(capture);
        self
    }
}

/// A capture with its converter resolved
#[derive(Debug, Clone)]
pub struct CaptureSpec {
    pub name: String,
    pub conversion: Conversion,
}

/// A validated, compiled line definition. Immutable once built.
#[derive(Debug, Clone)]
pub struct LineDefinition {
    pub name: String,
    pub regex: Regex,
    pub teaser: Option<Regex>,
    pub role: LineRole,
    pub captures: Vec<CaptureSpec>,
}

impl LineDefinition {
    /// Cheap pre-check; definitions without a teaser always pass
    pub fn teases(&self, line: &str) -> bool {
        self.teaser.as_ref().is_none_or(|teaser| teaser.is_match(line))
    }
}
