//! Diagnostic reporting for the Strata toolchain.
//!
//! Stages of the flow report non-fatal conditions (warnings, notes) into a
//! shared [`DiagnosticSink`] rather than printing directly. The embedder
//! decides how to render the accumulated diagnostics.

#![warn(missing_docs)]

pub mod diagnostic;
pub mod severity;
pub mod sink;

pub use diagnostic::{Diagnostic, Stage};
pub use severity::Severity;
pub use sink::DiagnosticSink;
