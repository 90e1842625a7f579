//! Framework-specific analysis and refactoring for ASP.NET Core programs.
//!
//! The host supplies a parsed program (operation tree + symbol table); this
//! crate resolves the framework surface against it, runs the detection
//! rules, and turns findings into anchored source patches:
//!
//! ```text
//! Program -> WellKnownTypes::resolve -> analyze() -> Vec<Finding>
//!         -> fix::apply_fixes(findings) -> rewritten units
//! ```
//!
//! The engine never parses source text itself, and it fails closed: a
//! program that does not reference the framework yields zero findings.

pub mod aggregate;
pub mod catalog;
pub mod dispatch;
pub mod fix;
pub mod naming;
pub mod program;
pub mod routes;
pub mod rules;
pub mod testkit;

pub use catalog::{CatalogError, WellKnownTypes};
pub use dispatch::{analyze, AnalysisOptions, AnalysisSession, CancelFlag, Rule, RuleCtx};
pub use fix::{apply_fixes, fixer_for, BatchOutcome, Fixer};
pub use program::Program;
