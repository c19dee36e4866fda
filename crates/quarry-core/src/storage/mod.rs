//! Table storage.
//!
//! - [`schema`] - Column definitions and block layout
//! - [`block`] - Fixed-capacity column-major blocks
//! - [`slot`] - Tuple addresses and scan cursors
//! - [`table`] - Block-organized tables with range scans

pub mod block;
pub mod schema;
pub mod slot;
pub mod table;

pub use block::Block;
pub use schema::{BlockLayout, Column, Schema};
pub use slot::{SlotCursor, TupleSlot};
pub use table::{DEFAULT_BLOCK_SIZE, SqlTable};
