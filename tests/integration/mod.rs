//! Integration test suite for the scaffold CLI.
//!
//! These tests drive the compiled binary end to end. They are restricted to
//! flows that terminate before any network activity (argument validation,
//! preflight gates, requirement checks), so they run reliably offline and
//! in CI.
//!
//! ```bash
//! cargo test --test integration
//! ```

mod about;
mod check;
mod new_preflight;
