//! Destination parameter values shared by both stores.
//!
//! `Value` is the domain every normalized field lands in: NULL, integer,
//! real, or text. Both the embedded store and the server store bind from
//! this enum, so normalizers never see backend-specific types.

use chrono::NaiveDate;

/// A typed destination value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent field ("no data", never zero).
    Null,

    /// 64-bit signed integer.
    Int(i64),

    /// 64-bit floating point.
    Real(f64),

    /// Text data.
    Text(String),
}

impl Value {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Render as text for cast-on-insert binding, NULL as `None`.
    ///
    /// Integers and reals use their canonical decimal form, which every
    /// destination type we target accepts as a cast source.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Int(v) => Some(v.to_string()),
            Value::Real(v) => Some(v.to_string()),
            Value::Text(v) => Some(v.clone()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        // NaiveDate renders as ISO-8601 (%Y-%m-%d)
        Value::Text(v.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}
