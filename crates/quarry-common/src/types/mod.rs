//! Core type definitions for Quarry.
//!
//! - Identifier types ([`TableOid`], [`ColumnOid`], [`TxId`], [`EpochId`])
//! - Column types ([`SqlType`], [`ColumnValue`]) and dynamic [`Value`]s

mod id;
mod sql_type;
mod value;

pub use id::{ColumnOid, EpochId, TableOid, TxId};
pub use sql_type::{ColumnValue, SqlType};
pub use value::Value;
