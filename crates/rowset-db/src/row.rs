//! Result rows and the values they carry.
//!
//! A [`Row`] is one record produced by a cursor: an ordered list of named
//! columns. Typed access goes through [`Row::get`], which converts the stored
//! [`Value`] with [`FromValue`].

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::error::{DbError, Result};

/// A single column value as held by the row store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the storage class, used in type mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Real(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "{v}"),
            Value::Blob(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

macro_rules! value_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Integer(value as i64)
                }
            }
        )*
    };
}

value_from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Integer(value as i64)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Real(value as f64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Blob(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Conversion from a stored [`Value`] into a Rust type.
///
/// Returns `None` when the value's storage class does not fit the target
/// type; [`Row::get`] turns that into [`DbError::TypeMismatch`].
pub trait FromValue: Sized {
    const EXPECTED: &'static str;

    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! integer_from_value {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                const EXPECTED: &'static str = stringify!($ty);

                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::Integer(v) => <$ty>::try_from(*v).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

integer_from_value!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl FromValue for bool {
    const EXPECTED: &'static str = "bool";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(v) => Some(*v != 0),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    const EXPECTED: &'static str = "f64";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Real(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl FromValue for String {
    const EXPECTED: &'static str = "String";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FromValue for Vec<u8> {
    const EXPECTED: &'static str = "Vec<u8>";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Blob(v) => Some(v.clone()),
            Value::Text(v) => Some(v.as_bytes().to_vec()),
            _ => None,
        }
    }
}

impl FromValue for Value {
    const EXPECTED: &'static str = "Value";

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// One result row with named columns.
///
/// Column names are shared between all rows of a cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the raw value of the named column.
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }

    /// Reads the named column as `T`.
    pub fn get<T: FromValue>(&self, column: &str) -> Result<T> {
        let value = self
            .value(column)
            .ok_or_else(|| DbError::ColumnNotFound(column.to_string()))?;

        T::from_value(value).ok_or_else(|| DbError::TypeMismatch {
            column: column.to_string(),
            expected: T::EXPECTED,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Row {
        let columns: Arc<[String]> = vec![
            "id".to_string(),
            "name".to_string(),
            "score".to_string(),
            "note".to_string(),
            "tags".to_string(),
        ]
        .into();
        Row::new(
            columns,
            vec![
                Value::Integer(7),
                Value::Text("Ann".into()),
                Value::Real(2.5),
                Value::Null,
                Value::Text(r#"["a","b"]"#.into()),
            ],
        )
    }

    #[test]
    fn test_typed_reads() {
        let row = row();

        assert_eq!(row.get::<i64>("id").unwrap(), 7);
        assert_eq!(row.get::<u32>("id").unwrap(), 7);
        assert_eq!(row.get::<String>("name").unwrap(), "Ann");
        assert_eq!(row.get::<f64>("score").unwrap(), 2.5);
        assert_eq!(row.get::<f64>("id").unwrap(), 7.0);
        assert_eq!(row.get::<Option<String>>("note").unwrap(), None);
    }

    #[test]
    fn test_missing_column() {
        let row = row();
        assert!(matches!(
            row.get::<i64>("age"),
            Err(DbError::ColumnNotFound(col)) if col == "age"
        ));
    }

    #[test]
    fn test_type_mismatch() {
        let row = row();
        assert!(matches!(
            row.get::<i64>("name"),
            Err(DbError::TypeMismatch { expected: "i64", .. })
        ));
        assert!(row.get::<String>("note").is_err());
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from(3u8), Value::Integer(3));
        assert_eq!(Value::from(true), Value::Integer(1));
        assert_eq!(Value::from("x"), Value::Text("x".into()));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(1.5)), Value::Real(1.5));
    }
}
