//! Filter expressions and category keys for reports
//!
//! Reports can restrict the records they see with a small expression language
//! and group records by a field or a template.
//!
//! # Syntax
//!
//! ```text
//! field:value          Field equals value
//! field!=value         Field present and not equal to value
//! field>value          Also >=, <, <= (numeric for numeric fields)
//! field~text           Rendered field contains text
//! field:*              Field is present
//! !term                Negates a term
//! multiple terms       Combine with AND
//! ```
//!
//! A term on a missing field is false, so `!status:200` accepts records
//! without a status.
//!
//! # Examples
//!
//! ```text
//! duration>1.0                       # Process blockers
//! missing_resource:*                 # Routing errors
//! method:POST !status:200            # Failed posts
//! path~"/admin"                      # Admin pages
//! ```
//!
//! # Category templates
//!
//! `{controller}#{action}.{format}` renders each placeholder from the record.

pub mod category;
pub mod error;
pub mod matcher;
pub mod parser;

pub use category::{CategorizeFn, Categorizer, CategoryKey, CategoryTemplate, PredicateFn, RequestFilter};
pub use error::{EvalError, FilterParseError};
pub use parser::{FilterExpression, FilterOp, FilterTerm};
