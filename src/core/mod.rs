//! Core types shared by every stage of the acquisition pipeline.
//!
//! Currently this is the error layer: the [`ScaffoldError`] union, the
//! [`ErrorKind`] classification, and the [`ErrorContext`] presentation
//! wrapper used by the CLI entry point.

pub mod error;

pub use error::{ErrorContext, ErrorKind, ScaffoldError, user_friendly_error};
