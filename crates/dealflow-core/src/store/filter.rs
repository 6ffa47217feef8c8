use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// A single predicate over one field of a stored record.
#[derive(Debug, Clone)]
pub struct Filter {
    /// Field name to test.
    pub field: String,
    /// Comparison to apply.
    pub op: FilterOp,
}

/// Supported comparisons.
#[derive(Debug, Clone)]
pub enum FilterOp {
    /// Field equals the given JSON value.
    Eq(Value),
    /// Field is an RFC 3339 timestamp at or before the given instant.
    AtOrBefore(DateTime<Utc>),
}

impl Filter {
    /// Equality filter. The value is serialized to JSON; types that fail
    /// to serialize compare as null.
    pub fn eq(field: impl Into<String>, value: impl Serialize) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Eq(serde_json::to_value(value).unwrap_or(Value::Null)),
        }
    }

    /// Timestamp filter matching instants at or before `instant`.
    pub fn at_or_before(field: impl Into<String>, instant: DateTime<Utc>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::AtOrBefore(instant),
        }
    }

    /// Evaluate the predicate against a record. Timestamps are compared as
    /// instants, not as strings; malformed timestamps never match.
    pub fn matches(&self, record: &Value) -> bool {
        let field = match record.get(&self.field) {
            Some(v) => v,
            None => return false,
        };
        match &self.op {
            FilterOp::Eq(expected) => field == expected,
            FilterOp::AtOrBefore(instant) => match field.as_str() {
                Some(raw) => match DateTime::parse_from_rfc3339(raw) {
                    Ok(ts) => ts.with_timezone(&Utc) <= *instant,
                    Err(e) => {
                        tracing::warn!(
                            field = %self.field,
                            value = raw,
                            error = %e,
                            "Skipping record with malformed timestamp"
                        );
                        false
                    }
                },
                None => false,
            },
        }
    }
}
