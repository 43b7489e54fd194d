//! Line classification and field extraction.

use crate::convert::{ConversionError, Fields};
use crate::format::{FileFormat, FormatConfig, FormatError, LineDefinition};
use crate::request::TypedEvent;
use tracing::debug;

/// Result of matching one line against a format
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Matched(TypedEvent),
    /// No line definition matched
    NoMatch,
    /// A definition matched but one of its captures failed to convert;
    /// the line counts as unmatched
    Rejected {
        line_type: String,
        field: String,
        error: ConversionError,
    },
}

impl MatchOutcome {
    pub fn into_event(self) -> Option<TypedEvent> {
        match self {
            MatchOutcome::Matched(event) => Some(event),
            _ => None,
        }
    }
}

/// Matches lines against the ordered line definitions of a format.
/// Stateless; one matcher can be shared by any number of streams.
#[derive(Debug, Clone)]
pub struct LineMatcher {
    format: FileFormat,
}

impl LineMatcher {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    pub fn from_config(config: &FormatConfig) -> Result<Self, FormatError> {
        FileFormat::compile(config).map(Self::new)
    }

    pub fn format(&self) -> &FileFormat {
        &self.format
    }

    /// Classifies a line. Definitions are tried in registration order and the
    /// first one whose pattern matches decides the outcome.
    pub fn match_line(&self, line: &str, line_number: usize) -> MatchOutcome {
        for definition in &self.format.definitions {
            if !definition.teases(line) {
                continue;
            }
            let Some(captures) = definition.regex.captures(line) else {
                continue;
            };
            return extract(definition, &captures, line_number);
        }
        MatchOutcome::NoMatch
    }
}

fn extract(
    definition: &LineDefinition,
    captures: &regex::Captures<'_>,
    line_number: usize,
) -> MatchOutcome {
    let mut fields = Fields::new();

    for (index, spec) in definition.captures.iter().enumerate() {
        // groups that did not participate leave the field absent
        let Some(raw) = captures.get(index + 1) else {
            continue;
        };

        match spec.conversion.convert(raw.as_str()) {
            Ok(Some(value)) => {
                fields.insert(spec.name.clone(), value);
            }
            Ok(None) => {}
            Err(error) => {
                debug!(
                    line = line_number,
                    line_type = %definition.name,
                    field = %spec.name,
                    %error,
                    "conversion failed, treating line as unmatched"
                );
                return MatchOutcome::Rejected {
                    line_type: definition.name.clone(),
                    field: spec.name.clone(),
                    error,
                };
            }
        }
    }

    MatchOutcome::Matched(TypedEvent {
        line_type: definition.name.clone(),
        role: definition.role,
        line_number,
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::FieldValue;
    use crate::format::{CaptureConfig, LineDefinitionConfig, LineRole};

    fn matcher() -> LineMatcher {
        let format = FormatConfig::new("test")
            .line(
                LineDefinitionConfig::new("status", r"status=(\S+)(?: took=(\d+))?")
                    .capture(CaptureConfig::new("status", "integer"))
                    .capture(CaptureConfig::new("took", "duration").with_unit("msec")),
            )
            .line(
                LineDefinitionConfig::new("anything", r"status=(\S+)")
                    .capture(CaptureConfig::new("raw", "string")),
            );
        LineMatcher::from_config(&format).unwrap()
    }

    #[test]
    fn first_matching_definition_wins() {
        let event = matcher().match_line("status=200 took=15", 7).into_event().unwrap();
        assert_eq!(event.line_type, "status");
        assert_eq!(event.role, LineRole::Body);
        assert_eq!(event.line_number, 7);
        assert_eq!(event.get("status"), Some(&FieldValue::Integer(200)));
        assert_eq!(event.get("took"), Some(&FieldValue::Duration(0.015)));
    }

    #[test]
    fn optional_groups_leave_fields_absent() {
        let event = matcher().match_line("status=404", 1).into_event().unwrap();
        assert_eq!(event.get("took"), None);
    }

    #[test]
    fn conversion_failure_rejects_the_line_without_falling_through() {
        let outcome = matcher().match_line("status=abc", 1);
        assert!(matches!(
            outcome,
            MatchOutcome::Rejected { ref line_type, ref field, .. }
                if line_type == "status" && field == "status"
        ));
    }

    #[test]
    fn unrelated_lines_do_not_match() {
        assert_eq!(matcher().match_line("hello world", 1), MatchOutcome::NoMatch);
    }
}
