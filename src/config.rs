use crate::format::{FormatConfig, FormatError};
use crate::matcher::LineMatcher;
use crate::report::{ReportConfig, ReportError, ReportSet};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::warn;

const BUILTIN_PROFILES: &[(&str, &str)] = &[
    ("rails3", include_str!("../config/profiles/rails3.toml")),
    ("lograge", include_str!("../config/profiles/lograge.toml")),
];

pub const DEFAULT_PROFILE: &str = "rails3";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Unknown profile '{name}'. Built-ins: {available}")]
    UnknownProfile { name: String, available: String },
    #[error("Invalid format in profile '{profile}': {source}")]
    Format {
        profile: String,
        #[source]
        source: FormatError,
    },
    #[error("Invalid report in profile '{profile}': {source}")]
    Report {
        profile: String,
        #[source]
        source: ReportError,
    },
}

/// A profile: one log format and the reports to run over it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyzerConfig {
    /// Free-form label for the loaded profile.
    #[serde(default = "default_profile_name")]
    pub profile_name: String,
    pub format: FormatConfig,
    #[serde(default)]
    pub reports: Vec<ReportConfig>,
}

fn default_profile_name() -> String {
    "custom".to_string()
}

/// A validated profile, ready to process lines
#[derive(Debug, Clone)]
pub struct CompiledProfile {
    pub name: String,
    pub matcher: LineMatcher,
    pub reports: ReportSet,
}

impl AnalyzerConfig {
    pub fn new(profile_name: &str, format: FormatConfig) -> Self {
        Self {
            profile_name: profile_name.to_string(),
            format,
            reports: Vec::new(),
        }
    }

    pub fn report(mut self, report: ReportConfig) -> Self {
        self.reports.push(report);
        self
    }

    /// Validates every line definition and report before any input is read
    pub fn compile(&self) -> Result<CompiledProfile, ConfigError> {
        let matcher = LineMatcher::from_config(&self.format).map_err(|source| ConfigError::Format {
            profile: self.profile_name.clone(),
            source,
        })?;

        let report_error = |source| ConfigError::Report {
            profile: self.profile_name.clone(),
            source,
        };
        for report in &self.reports {
            if let Some(unknown) = report
                .line_types
                .iter()
                .find(|t| matcher.format().definition(t).is_none())
            {
                return Err(report_error(ReportError::UnknownLineType {
                    report: report.effective_title(),
                    line_type: unknown.clone(),
                }));
            }
        }
        let reports = ReportSet::compile(&self.reports).map_err(report_error)?;

        if let Some(field) = &self.format.correlation_field {
            let captured = self
                .format
                .lines
                .iter()
                .any(|line| line.captures.iter().any(|c| &c.name == field));
            if !captured {
                warn!(
                    profile = %self.profile_name,
                    %field,
                    "correlation field is never captured, correlation stays positional"
                );
            }
        }

        Ok(CompiledProfile {
            name: self.profile_name.clone(),
            matcher,
            reports,
        })
    }
}

pub fn load_config(path: Option<&Path>) -> Result<AnalyzerConfig, ConfigError> {
    if let Some(path) = path {
        load_config_from_path(path)
    } else {
        Ok(default_config().clone())
    }
}

pub fn load_config_from_path(path: &Path) -> Result<AnalyzerConfig, ConfigError> {
    let path_display = path.display().to_string();
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path_display.clone(),
        source,
    })?;

    toml::from_str::<AnalyzerConfig>(&raw).map_err(|source| ConfigError::Parse {
        path: path_display,
        source,
    })
}

/// Picks the profile for a run: an explicit file wins over a built-in name,
/// which wins over the default profile
pub fn resolve_config(
    path: Option<&Path>,
    profile: Option<&str>,
) -> Result<AnalyzerConfig, ConfigError> {
    match (path, profile) {
        (Some(path), _) => load_config_from_path(path),
        (None, Some(name)) => load_builtin_profile(name).ok_or_else(|| ConfigError::UnknownProfile {
            name: name.to_string(),
            available: builtin_profile_names().join(", "),
        }),
        (None, None) => load_config(None),
    }
}

pub fn default_config() -> &'static AnalyzerConfig {
    static DEFAULT_CONFIG: LazyLock<AnalyzerConfig> = LazyLock::new(|| {
        load_builtin_profile(DEFAULT_PROFILE).expect("built-in default profile must parse")
    });
    &DEFAULT_CONFIG
}

pub fn builtin_profile_names() -> Vec<&'static str> {
    BUILTIN_PROFILES.iter().map(|(name, _)| *name).collect()
}

/// Loads a built-in profile by name. Accepts `rails3`, `rails3.toml` or a
/// path ending in one of those.
pub fn load_builtin_profile(name: &str) -> Option<AnalyzerConfig> {
    let stem = Path::new(name).file_stem()?.to_str()?;
    let (_, raw) = BUILTIN_PROFILES.iter().find(|(n, _)| *n == stem)?;
    toml::from_str(raw).ok()
}
