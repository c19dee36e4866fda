//! Common utilities used throughout Quarry.
//!
//! - [`error`] - The shared [`Error`] type and [`Result`] alias

pub mod error;

pub use error::{Error, Result};
