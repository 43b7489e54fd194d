use super::error::FilterParseError;
use std::fmt;
use std::str::FromStr;

/// Comparison applied by a filter term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// `field:value`
    Equals,
    /// `field!=value`
    NotEquals,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    /// `field~text`, substring match on the rendered value
    Contains,
    /// `field:*`
    Present,
}

impl FromStr for FilterOp {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ":" | "=" | "==" => Ok(FilterOp::Equals),
            "!=" => Ok(FilterOp::NotEquals),
            ">" => Ok(FilterOp::Greater),
            ">=" => Ok(FilterOp::GreaterOrEqual),
            "<" => Ok(FilterOp::Less),
            "<=" => Ok(FilterOp::LessOrEqual),
            "~" => Ok(FilterOp::Contains),
            _ => Err(FilterParseError::MissingOperator(s.to_string())),
        }
    }
}

impl FilterOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            FilterOp::Equals | FilterOp::Present => ":",
            FilterOp::NotEquals => "!=",
            FilterOp::Greater => ">",
            FilterOp::GreaterOrEqual => ">=",
            FilterOp::Less => "<",
            FilterOp::LessOrEqual => "<=",
            FilterOp::Contains => "~",
        }
    }
}

/// A single filter term (e.g., "duration>1.0" or "!method:GET")
#[derive(Debug, Clone, PartialEq)]
pub struct FilterTerm {
    /// Field the term reads
    pub field: String,
    pub op: FilterOp,
    /// The literal to compare against; empty for `Present`
    pub value: String,
    /// Whether this is an exclusion term (prefixed with !)
    pub exclude: bool,
}

impl FilterTerm {
    /// Parse a single filter term from a string
    pub fn parse(s: &str) -> Result<Self, FilterParseError> {
        let (exclude, rest) = if let Some(stripped) = s.strip_prefix('!') {
            (true, stripped)
        } else {
            (false, s)
        };

        let start = rest
            .find([':', '=', '!', '<', '>', '~'])
            .ok_or_else(|| FilterParseError::MissingOperator(s.to_string()))?;
        let field = rest[..start].trim();
        if field.is_empty() {
            return Err(FilterParseError::EmptyField(s.to_string()));
        }

        let after = &rest[start..];
        let op_len = if ["!=", ">=", "<=", "=="].iter().any(|op| after.starts_with(op)) {
            2
        } else {
            1
        };
        let mut op: FilterOp = after[..op_len]
            .parse()
            .map_err(|_| FilterParseError::MissingOperator(s.to_string()))?;

        let value = unquote(after[op_len..].trim());
        if value.is_empty() {
            return Err(FilterParseError::EmptyValue(field.to_string()));
        }
        if op == FilterOp::Equals && value == "*" {
            op = FilterOp::Present;
        }

        Ok(FilterTerm {
            field: field.to_string(),
            op,
            value: if op == FilterOp::Present {
                String::new()
            } else {
                value.to_string()
            },
            exclude,
        })
    }
}

impl fmt::Display for FilterTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exclude {
            write!(f, "!")?;
        }
        match self.op {
            FilterOp::Present => write!(f, "{}:*", self.field),
            op if self.value.contains(char::is_whitespace) => {
                write!(f, "{}{}\"{}\"", self.field, op.symbol(), self.value)
            }
            op => write!(f, "{}{}{}", self.field, op.symbol(), self.value),
        }
    }
}

/// A complete filter expression consisting of multiple terms
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterExpression {
    /// All filter terms (combined with AND logic)
    pub terms: Vec<FilterTerm>,
}

impl FilterExpression {
    /// Create a new empty filter expression
    pub fn new() -> Self {
        Self { terms: Vec::new() }
    }

    /// Parse a filter expression from a string
    ///
    /// Terms are separated by whitespace and combined with AND logic.
    pub fn parse(s: &str) -> Result<Self, FilterParseError> {
        let terms = split_preserving_quotes(s)
            .into_iter()
            .map(FilterTerm::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FilterExpression { terms })
    }

    /// Check if this expression is empty (no filters)
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Every field the expression reads
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|t| t.field.as_str())
    }
}

impl FromStr for FilterExpression {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{term}")?;
        }
        Ok(())
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Split a string by whitespace while preserving quoted segments
fn split_preserving_quotes(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ' ' | '\t' if !in_quotes => {
                if i > start {
                    let part = &s[start..i];
                    if !part.trim().is_empty() {
                        parts.push(part.trim());
                    }
                }
                start = i + 1;
            }
            _ => {}
        }
    }

    // Add the last part
    if start < s.len() {
        let part = &s[start..];
        if !part.trim().is_empty() {
            parts.push(part.trim());
        }
    }

    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_term() {
        let term = FilterTerm::parse("method:GET").unwrap();
        assert_eq!(term.field, "method");
        assert_eq!(term.op, FilterOp::Equals);
        assert_eq!(term.value, "GET");
        assert!(!term.exclude);
    }

    #[test]
    fn test_parse_exclude_term() {
        let term = FilterTerm::parse("!status:200").unwrap();
        assert_eq!(term.field, "status");
        assert!(term.exclude);
    }

    #[test]
    fn test_parse_two_character_operators() {
        assert_eq!(FilterTerm::parse("duration>=1.5").unwrap().op, FilterOp::GreaterOrEqual);
        assert_eq!(FilterTerm::parse("duration<=1.5").unwrap().op, FilterOp::LessOrEqual);
        assert_eq!(FilterTerm::parse("status!=200").unwrap().op, FilterOp::NotEquals);
        assert_eq!(FilterTerm::parse("path~/users").unwrap().op, FilterOp::Contains);
        let term = FilterTerm::parse("duration>1.0").unwrap();
        assert_eq!((term.op, term.value.as_str()), (FilterOp::Greater, "1.0"));
    }

    #[test]
    fn test_parse_presence() {
        let term = FilterTerm::parse("missing_resource:*").unwrap();
        assert_eq!(term.op, FilterOp::Present);
        assert!(term.value.is_empty());
    }

    #[test]
    fn test_parse_expression_with_quotes() {
        let expr = FilterExpression::parse(r#"method:GET path~"/a b" !status:500"#).unwrap();
        assert_eq!(expr.terms.len(), 3);
        assert_eq!(expr.terms[1].value, "/a b");
        assert_eq!(expr.to_string(), r#"method:GET path~"/a b" !status:500"#);
    }

    #[test]
    fn test_invalid_terms() {
        assert!(matches!(
            FilterTerm::parse("duration"),
            Err(FilterParseError::MissingOperator(_))
        ));
        assert!(matches!(
            FilterTerm::parse(">1.0"),
            Err(FilterParseError::EmptyField(_))
        ));
        assert!(matches!(
            FilterTerm::parse("duration>"),
            Err(FilterParseError::EmptyValue(_))
        ));
    }
}
