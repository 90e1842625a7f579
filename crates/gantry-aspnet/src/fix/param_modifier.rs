//! GA007 fixer: delete the parameter's passing-convention modifier.

use gantry_core::finding::{Finding, RuleId};
use gantry_core::patch::{Anchor, Edit, PatchSet, Span};

use crate::fix::{finding_unit, Fixer};
use crate::program::Program;
use crate::rules::handlers::HANDLER_PARAMETER_MODIFIER;

/// Removes the `ref`/`out`/`in` token (plus its trailing whitespace, which
/// the detection folded into the recorded span).
pub struct RemoveParameterModifier;

impl Fixer for RemoveParameterModifier {
    fn rule(&self) -> RuleId {
        HANDLER_PARAMETER_MODIFIER.id
    }

    fn fix(&self, finding: &Finding, program: &Program) -> PatchSet {
        build(finding, program).unwrap_or_default()
    }
}

fn build(finding: &Finding, program: &Program) -> Option<PatchSet> {
    let unit = finding_unit(finding, program)?;
    let start: u64 = finding.property("modifierStart")?.parse().ok()?;
    let end: u64 = finding.property("modifierEnd")?.parse().ok()?;
    if start >= end || end as usize > unit.source.len() {
        return None;
    }

    let span = Span::new(start, end);
    let edit = Edit::delete(0, unit.id, Anchor::at(span, &unit.source))
        .with_rule(HANDLER_PARAMETER_MODIFIER.id.0);
    Some(PatchSet::new().with_edit(edit))
}
