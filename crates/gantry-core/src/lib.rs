//! Core infrastructure for gantry.
//!
//! This crate provides framework-agnostic infrastructure:
//! - Finding and rule metadata types
//! - Patch IR for representing source rewrites
//! - Error types
//! - Text utilities (byte offset to line:column)

pub mod error;
pub mod finding;
pub mod patch;
pub mod text;
pub mod types;
