//! Fixed-width SQL column types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The storage type of a column.
///
/// Every type has a fixed attribute size, which is what lets a batch be laid
/// out as flat column-major arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    /// 1-byte boolean.
    Boolean,
    /// 2-byte signed integer.
    SmallInt,
    /// 4-byte signed integer.
    Integer,
    /// 8-byte signed integer.
    BigInt,
    /// 8-byte IEEE 754 float.
    Double,
}

impl SqlType {
    /// Returns the size in bytes of one value of this type.
    #[inline]
    #[must_use]
    pub const fn attr_size(self) -> usize {
        match self {
            Self::Boolean => 1,
            Self::SmallInt => 2,
            Self::Integer => 4,
            Self::BigInt | Self::Double => 8,
        }
    }

    /// Returns the SQL name of this type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Boolean => "BOOLEAN",
            Self::SmallInt => "SMALLINT",
            Self::Integer => "INTEGER",
            Self::BigInt => "BIGINT",
            Self::Double => "DOUBLE",
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A Rust type that maps onto exactly one [`SqlType`].
///
/// Used for typed reads out of column-major buffers. Values are stored
/// little-endian so that buffers have the same layout on every platform.
pub trait ColumnValue: Copy + Send + Sync + 'static {
    /// The SQL type this Rust type reads and writes.
    const SQL_TYPE: SqlType;

    /// Decodes a value from exactly `SQL_TYPE.attr_size()` bytes.
    fn read_le(bytes: &[u8]) -> Self;

    /// Encodes this value into exactly `SQL_TYPE.attr_size()` bytes.
    fn write_le(self, out: &mut [u8]);
}

impl ColumnValue for bool {
    const SQL_TYPE: SqlType = SqlType::Boolean;

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    #[inline]
    fn write_le(self, out: &mut [u8]) {
        out[0] = u8::from(self);
    }
}

macro_rules! impl_column_value {
    ($ty:ty, $sql:expr) => {
        impl ColumnValue for $ty {
            const SQL_TYPE: SqlType = $sql;

            #[inline]
            fn read_le(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(&bytes[..std::mem::size_of::<$ty>()]);
                <$ty>::from_le_bytes(raw)
            }

            #[inline]
            fn write_le(self, out: &mut [u8]) {
                out[..std::mem::size_of::<$ty>()].copy_from_slice(&self.to_le_bytes());
            }
        }
    };
}

impl_column_value!(i16, SqlType::SmallInt);
impl_column_value!(i32, SqlType::Integer);
impl_column_value!(i64, SqlType::BigInt);
impl_column_value!(f64, SqlType::Double);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_sizes_match_rust_types() {
        assert_eq!(i16::SQL_TYPE.attr_size(), std::mem::size_of::<i16>());
        assert_eq!(i32::SQL_TYPE.attr_size(), std::mem::size_of::<i32>());
        assert_eq!(i64::SQL_TYPE.attr_size(), std::mem::size_of::<i64>());
        assert_eq!(f64::SQL_TYPE.attr_size(), std::mem::size_of::<f64>());
        assert_eq!(bool::SQL_TYPE.attr_size(), 1);
    }

    #[test]
    fn test_little_endian_layout() {
        let mut buf = [0u8; 4];
        0x0102_0304i32.write_le(&mut buf);
        assert_eq!(buf, [0x04, 0x03, 0x02, 0x01]);
        assert_eq!(i32::read_le(&buf), 0x0102_0304);
    }

    #[test]
    fn test_display() {
        assert_eq!(SqlType::SmallInt.to_string(), "SMALLINT");
        assert_eq!(SqlType::Double.to_string(), "DOUBLE");
    }
}
