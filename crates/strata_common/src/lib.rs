//! Shared foundational types used across the Strata FPGA toolchain.
//!
//! This crate provides core types including 2-D geometry primitives used by
//! the placement engine and common result types.

#![warn(missing_docs)]

pub mod geom;
pub mod result;

pub use geom::{Point, Rect};
pub use result::{InternalError, StrataResult};
