//! GA011 fixer: chain `.WithName(…)` onto the registration.

use gantry_core::finding::{Finding, RuleId};
use gantry_core::patch::{Anchor, Edit, PatchSet};

use crate::fix::{finding_span, finding_unit, Fixer};
use crate::program::{OpKind, Program};
use crate::rules::endpoints::ENDPOINT_NAME_SUGGESTION;

/// Rewrites `app.MapGet("/todos", …)` to
/// `app.MapGet("/todos", …).WithName("GetTodos")` using the suggested name
/// carried on the finding.
pub struct ChainWithName;

impl Fixer for ChainWithName {
    fn rule(&self) -> RuleId {
        ENDPOINT_NAME_SUGGESTION.id
    }

    fn fix(&self, finding: &Finding, program: &Program) -> PatchSet {
        build(finding, program).unwrap_or_default()
    }
}

fn build(finding: &Finding, program: &Program) -> Option<PatchSet> {
    let unit = finding_unit(finding, program)?;
    let span = finding_span(finding)?;
    let name = finding.property("SuggestedApiName")?;

    // The recorded span must still land on a registration invocation.
    let node = program.find_node_at(unit.id, span, OpKind::Invocation)?;
    let call_span = program.node(node).span;
    let call_text = program.node_text(node);

    let edit = Edit::replace(
        0,
        unit.id,
        Anchor::at(call_span, &unit.source),
        format!("{call_text}.WithName(\"{name}\")"),
    )
    .with_rule(ENDPOINT_NAME_SUGGESTION.id.0);
    Some(PatchSet::new().with_edit(edit))
}
