use super::parser::{FilterExpression, FilterOp, FilterTerm};
use crate::convert::FieldValue;
use crate::request::Record;
use std::cmp::Ordering;

impl FilterTerm {
    /// Evaluates the term against a record.
    ///
    /// A missing field, or a literal that cannot be read in the field's domain,
    /// makes every comparison false before the `!` prefix is applied.
    pub fn matches(&self, record: &dyn Record) -> bool {
        let value = record.field(&self.field);
        let hit = match (self.op, value) {
            (FilterOp::Present, value) => value.is_some(),
            (_, None) => false,
            (FilterOp::Contains, Some(value)) => value.to_string().contains(&self.value),
            (op, Some(value)) => compare(value, op, &self.value),
        };
        hit != self.exclude
    }
}

fn compare(value: &FieldValue, op: FilterOp, literal: &str) -> bool {
    let Some(ordering) = value.compare_literal(literal) else {
        return false;
    };
    match op {
        FilterOp::Equals => ordering == Ordering::Equal,
        FilterOp::NotEquals => ordering != Ordering::Equal,
        FilterOp::Greater => ordering == Ordering::Greater,
        FilterOp::GreaterOrEqual => ordering != Ordering::Less,
        FilterOp::Less => ordering == Ordering::Less,
        FilterOp::LessOrEqual => ordering != Ordering::Greater,
        FilterOp::Contains | FilterOp::Present => false,
    }
}

impl FilterExpression {
    /// True when every term matches; an empty expression accepts everything
    pub fn matches(&self, record: &dyn Record) -> bool {
        self.terms.iter().all(|term| term.matches(record))
    }
}

#[cfg(test)]
mod tests {
    use crate::convert::FieldValue;
    use crate::filter::FilterExpression;
    use crate::format::LineRole;
    use crate::request::{Request, TypedEvent};

    fn request(duration: f64, method: &str) -> Request {
        Request::open(
            TypedEvent::new("completed", LineRole::Single, 1)
                .with_field("duration", FieldValue::Duration(duration))
                .with_field("method", method)
                .with_field("path", "/users/42"),
        )
    }

    fn matches(expr: &str, request: &Request) -> bool {
        FilterExpression::parse(expr).unwrap().matches(request)
    }

    #[test]
    fn test_numeric_comparisons() {
        let slow = request(1.5, "GET");
        let fast = request(0.2, "GET");
        assert!(matches("duration>1.0", &slow));
        assert!(!matches("duration>1.0", &fast));
        assert!(matches("duration<=0.2", &fast));
        assert!(!matches("duration>abc", &slow));
    }

    #[test]
    fn test_missing_field_is_false_even_for_not_equals() {
        let req = request(1.0, "GET");
        assert!(!matches("status:200", &req));
        assert!(!matches("status!=200", &req));
        assert!(matches("!status:*", &req));
        assert!(!matches("status:*", &req));
    }

    #[test]
    fn test_terms_combine_with_and() {
        let req = request(2.0, "POST");
        assert!(matches("method:POST duration>1.0", &req));
        assert!(!matches("method:POST duration>5", &req));
        assert!(matches("path~users !method:GET", &req));
        assert!(matches("", &req));
    }
}
