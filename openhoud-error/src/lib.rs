//! # openhoud-error
//!
//! Unified error handling for openhoud.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: Know what error occurred (e.g., OutOfRoot, InferenceFailed)
//! - **ErrorStatus**: Decide how to handle it (Permanent, Temporary, Persistent)
//! - **Error Context**: Assist in locating the cause with rich context
//! - **Error Source**: Wrap underlying errors without leaking raw types
//!
//! ## Usage
//!
//! ```rust
//! use openhoud_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::out_of_root("../etc/passwd")
//!         .with_operation("workspace::read")
//!         .with_context("root", "/repo"))
//! }
//!
//! assert_eq!(example().unwrap_err().kind(), ErrorKind::OutOfRoot);
//! ```
//!
//! ## Principles
//!
//! - All fallible functions return `Result<T, openhoud_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - Same error handled once, subsequent ops only append context
//! - Don't abuse `From<OtherError>` to prevent raw error leakage

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using the openhoud Error
pub type Result<T> = std::result::Result<T, Error>;
