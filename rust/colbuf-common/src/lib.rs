//! Core definitions shared by all colbuf-* crates: the error taxonomy and
//! argument verification helpers.

pub mod error;
pub mod result;

pub use error::{Error, ErrorKind};
pub use result::Result;
