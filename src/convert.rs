//! Type converter registry.
//!
//! Converters are selected by tag when a format is loaded and dispatched
//! through [`Conversion`]; converting a captured string is a pure function.

mod literal;
mod sanitize;
mod timestamp;
mod value;

pub use literal::{LiteralError, parse_literal};
pub use sanitize::sanitize_parameters;
pub use timestamp::{from_epoch, hour_of, parse_canonical, to_datetime};
pub use value::{FieldValue, Fields};

use std::fmt;
use thiserror::Error;

/// Errors raised while converting a single captured value
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConversionError {
    #[error("'{0}' is not an integer")]
    InvalidInteger(String),
    #[error("'{0}' is not a number")]
    InvalidNumber(String),
    #[error("unrecognized timestamp '{0}'")]
    UnrecognizedTimestamp(String),
    #[error("unknown month abbreviation '{0}'")]
    UnknownMonth(String),
    #[error("'{0}' is not a valid date-time")]
    InvalidTimestamp(String),
    #[error("invalid literal: {0}")]
    Literal(#[from] LiteralError),
}

/// Errors raised while resolving a converter tag from a format definition
#[derive(Debug, Error, PartialEq)]
pub enum ConverterSpecError {
    #[error("unknown converter '{0}'")]
    UnknownConverter(String),
    #[error("unknown unit '{unit}' for converter '{converter}'")]
    UnknownUnit { converter: String, unit: String },
    #[error("converter '{0}' does not take a unit")]
    UnexpectedUnit(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationUnit {
    Seconds,
    Milliseconds,
    Microseconds,
}

impl DurationUnit {
    fn parse(unit: &str) -> Option<Self> {
        match unit.to_lowercase().as_str() {
            "sec" | "s" | "seconds" => Some(DurationUnit::Seconds),
            "msec" | "ms" | "milliseconds" => Some(DurationUnit::Milliseconds),
            "musec" | "usec" | "us" | "microseconds" => Some(DurationUnit::Microseconds),
            _ => None,
        }
    }

    fn divisor(self) -> f64 {
        match self {
            DurationUnit::Seconds => 1.0,
            DurationUnit::Milliseconds => 1_000.0,
            DurationUnit::Microseconds => 1_000_000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficUnit {
    Bytes,
    Kilobytes,
    Megabytes,
    Gigabytes,
}

impl TrafficUnit {
    fn parse(unit: &str) -> Option<Self> {
        match unit.to_lowercase().as_str() {
            "b" | "byte" | "bytes" => Some(TrafficUnit::Bytes),
            "kb" | "kilobyte" | "kilobytes" => Some(TrafficUnit::Kilobytes),
            "mb" | "megabyte" | "megabytes" => Some(TrafficUnit::Megabytes),
            "gb" | "gigabyte" | "gigabytes" => Some(TrafficUnit::Gigabytes),
            _ => None,
        }
    }

    fn multiplier(self) -> f64 {
        match self {
            TrafficUnit::Bytes => 1.0,
            TrafficUnit::Kilobytes => 1024.0,
            TrafficUnit::Megabytes => 1024.0 * 1024.0,
            TrafficUnit::Gigabytes => 1024.0 * 1024.0 * 1024.0,
        }
    }
}

/// How a captured string becomes a typed value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    String,
    NillableString,
    Integer,
    Float,
    Duration(DurationUnit),
    Traffic(TrafficUnit),
    Timestamp,
    Epoch,
    Eval,
}

impl Conversion {
    /// Resolves a converter tag and its optional unit, as written in a format definition
    pub fn from_tag(tag: &str, unit: Option<&str>) -> Result<Self, ConverterSpecError> {
        let unknown_unit = |unit: &str| ConverterSpecError::UnknownUnit {
            converter: tag.to_string(),
            unit: unit.to_string(),
        };

        let conversion = match tag.to_lowercase().as_str() {
            "duration" => {
                let unit = match unit {
                    Some(u) => DurationUnit::parse(u).ok_or_else(|| unknown_unit(u))?,
                    None => DurationUnit::Seconds,
                };
                return Ok(Conversion::Duration(unit));
            }
            "traffic" => {
                let unit = match unit {
                    Some(u) => TrafficUnit::parse(u).ok_or_else(|| unknown_unit(u))?,
                    None => TrafficUnit::Bytes,
                };
                return Ok(Conversion::Traffic(unit));
            }
            "string" | "symbol" => Conversion::String,
            "nillable_string" => Conversion::NillableString,
            "integer" | "int" => Conversion::Integer,
            "float" | "decimal" => Conversion::Float,
            "timestamp" => Conversion::Timestamp,
            "epoch" => Conversion::Epoch,
            "eval" => Conversion::Eval,
            _ => return Err(ConverterSpecError::UnknownConverter(tag.to_string())),
        };

        if unit.is_some() {
            return Err(ConverterSpecError::UnexpectedUnit(tag.to_string()));
        }
        Ok(conversion)
    }

    /// Converts a captured string. `Ok(None)` means the field is absent.
    pub fn convert(&self, raw: &str) -> Result<Option<FieldValue>, ConversionError> {
        if raw.trim().is_empty() && !matches!(self, Conversion::String) {
            return Ok(None);
        }

        let value = match self {
            Conversion::String => FieldValue::String(raw.to_string()),
            Conversion::NillableString => {
                if raw == "-" {
                    return Ok(None);
                }
                FieldValue::String(raw.to_string())
            }
            Conversion::Integer => FieldValue::Integer(
                raw.trim()
                    .parse()
                    .map_err(|_| ConversionError::InvalidInteger(raw.to_string()))?,
            ),
            Conversion::Float => FieldValue::Float(parse_number(raw)?),
            Conversion::Duration(unit) => FieldValue::Duration(parse_number(raw)? / unit.divisor()),
            Conversion::Traffic(unit) => {
                FieldValue::Integer((parse_number(raw)? * unit.multiplier()).round() as i64)
            }
            Conversion::Timestamp => FieldValue::Timestamp(parse_canonical(raw)?),
            Conversion::Epoch => {
                let seconds = raw
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| ConversionError::InvalidInteger(raw.to_string()))?;
                FieldValue::Timestamp(
                    from_epoch(seconds)
                        .ok_or_else(|| ConversionError::InvalidTimestamp(raw.to_string()))?,
                )
            }
            Conversion::Eval => FieldValue::Literal(eval_literal(raw)?),
        };
        Ok(Some(value))
    }
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conversion::String => write!(f, "string"),
            Conversion::NillableString => write!(f, "nillable_string"),
            Conversion::Integer => write!(f, "integer"),
            Conversion::Float => write!(f, "float"),
            Conversion::Duration(unit) => write!(f, "duration({unit:?})"),
            Conversion::Traffic(unit) => write!(f, "traffic({unit:?})"),
            Conversion::Timestamp => write!(f, "timestamp"),
            Conversion::Epoch => write!(f, "epoch"),
            Conversion::Eval => write!(f, "eval"),
        }
    }
}

fn parse_number(raw: &str) -> Result<f64, ConversionError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ConversionError::InvalidNumber(raw.to_string()))
}

/// Parses a parameter literal, sanitizing embedded object inspections first.
/// The raw text is tried as a fallback so sanitizing never breaks a valid literal.
fn eval_literal(raw: &str) -> Result<serde_json::Value, ConversionError> {
    let sanitized = sanitize_parameters(raw);
    match parse_literal(&sanitized) {
        Ok(value) => Ok(value),
        Err(err) if sanitized != raw => parse_literal(raw).map_err(|_| err.into()),
        Err(err) => Err(err.into()),
    }
}
