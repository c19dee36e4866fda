//! Row values for fixed-width SQL columns.
//!
//! [`Value`] is the dynamic form used when inserting rows and when reading
//! a single cell without knowing its Rust type up front. Hot loops should use
//! the typed accessors built on [`ColumnValue`](super::ColumnValue) instead.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ColumnValue, SqlType};

/// A dynamically-typed column value.
///
/// # Examples
///
/// ```
/// use quarry_common::types::{SqlType, Value};
///
/// let id = Value::from(7i32);
/// assert_eq!(id.sql_type(), Some(SqlType::Integer));
/// assert_eq!(id.as_i64(), Some(7));
/// assert!(Value::Null.is_null());
/// ```
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// SQL NULL; fits any nullable column.
    Null,

    /// Boolean value
    Boolean(bool),

    /// 16-bit signed integer
    SmallInt(i16),

    /// 32-bit signed integer
    Integer(i32),

    /// 64-bit signed integer
    BigInt(i64),

    /// 64-bit floating point
    Double(f64),
}

impl Value {
    /// Returns `true` if this value is null.
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the SQL type of this value, or `None` for null.
    #[must_use]
    pub const fn sql_type(&self) -> Option<SqlType> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(SqlType::Boolean),
            Value::SmallInt(_) => Some(SqlType::SmallInt),
            Value::Integer(_) => Some(SqlType::Integer),
            Value::BigInt(_) => Some(SqlType::BigInt),
            Value::Double(_) => Some(SqlType::Double),
        }
    }

    /// Returns the boolean value if this is a Boolean, otherwise None.
    #[inline]
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Widens any integer variant to i64.
    #[inline]
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Value::SmallInt(i) => Some(*i as i64),
            Value::Integer(i) => Some(*i as i64),
            Value::BigInt(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the float value if this is a Double, otherwise None.
    #[inline]
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the type name of this value.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self.sql_type() {
            Some(ty) => ty.name(),
            None => "NULL",
        }
    }

    /// Encodes a non-null value into `out`, which must hold at least
    /// `attr_size` bytes. Null writes nothing.
    pub fn write_le(&self, out: &mut [u8]) {
        match *self {
            Value::Null => {}
            Value::Boolean(v) => v.write_le(out),
            Value::SmallInt(v) => v.write_le(out),
            Value::Integer(v) => v.write_le(out),
            Value::BigInt(v) => v.write_le(out),
            Value::Double(v) => v.write_le(out),
        }
    }

    /// Decodes a value of type `ty` from its little-endian bytes.
    #[must_use]
    pub fn read_le(ty: SqlType, bytes: &[u8]) -> Self {
        match ty {
            SqlType::Boolean => Value::Boolean(bool::read_le(bytes)),
            SqlType::SmallInt => Value::SmallInt(i16::read_le(bytes)),
            SqlType::Integer => Value::Integer(i32::read_le(bytes)),
            SqlType::BigInt => Value::BigInt(i64::read_le(bytes)),
            SqlType::Double => Value::Double(f64::read_le(bytes)),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Boolean(b) => write!(f, "Boolean({b})"),
            Value::SmallInt(i) => write!(f, "SmallInt({i})"),
            Value::Integer(i) => write!(f, "Integer({i})"),
            Value::BigInt(i) => write!(f, "BigInt({i})"),
            Value::Double(fl) => write!(f, "Double({fl})"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::SmallInt(i) => write!(f, "{i}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::BigInt(i) => write!(f, "{i}"),
            Value::Double(fl) => write!(f, "{fl}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i16> for Value {
    fn from(i: i16) -> Self {
        Value::SmallInt(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::BigInt(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Double(f)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
