//! Fixers: one per fixable rule id.
//!
//! A fixer turns one finding plus the current program snapshot into an
//! anchored patch set. Fixers are pure and must be idempotent; when a
//! precondition no longer holds (the tree changed underneath the finding),
//! they return an empty patch set rather than fail. Anchors catch text
//! staleness later, at apply time.

pub mod batch;
mod health_check;
mod middleware;
mod param_modifier;
mod parameter_attribute;
mod with_name;

pub use batch::{apply_fixes, BatchOutcome};

use gantry_core::finding::{Finding, RuleId};
use gantry_core::patch::{PatchSet, Span};

use crate::program::{Program, Unit};

/// One code transformer, consuming findings of a single rule.
pub trait Fixer: Sync {
    /// The rule id whose findings this fixer consumes.
    fn rule(&self) -> RuleId;

    /// Build the patch for one finding against the current snapshot.
    fn fix(&self, finding: &Finding, program: &Program) -> PatchSet;
}

/// Look up the fixer for a rule id; rules without an automatic fix have
/// none.
pub fn fixer_for(rule: RuleId) -> Option<Box<dyn Fixer>> {
    match rule.0 {
        "GA002" => Some(Box::new(parameter_attribute::AddParameterAttribute)),
        "GA007" => Some(Box::new(param_modifier::RemoveParameterModifier)),
        "GA011" => Some(Box::new(with_name::ChainWithName)),
        "GA012" => Some(Box::new(health_check::SynthesizeHealthCheck)),
        "GA013" => Some(Box::new(middleware::ExtractMiddleware)),
        _ => None,
    }
}

/// The byte span the detection recorded on the finding.
pub(crate) fn finding_span(finding: &Finding) -> Option<Span> {
    let start = finding.location.byte_start?;
    let end = finding.location.byte_end?;
    if start > end {
        return None;
    }
    Some(Span::new(start, end))
}

/// The unit a finding addresses, resolved by path.
pub(crate) fn finding_unit<'p>(finding: &Finding, program: &'p Program) -> Option<&'p Unit> {
    program.unit_by_path(&finding.location.file)
}
