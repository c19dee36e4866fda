//! Transaction management.
//!
//! Transactions only decide row visibility here: a reader sees rows created
//! at or before its start epoch, plus its own writes.

mod manager;

pub use manager::{TransactionManager, TxInfo, TxState};
