//! GA002 fixer: add the missing `[Parameter]` attribute.

use gantry_core::finding::{Finding, RuleId};
use gantry_core::patch::{Anchor, Edit, PatchSet, Span};

use crate::fix::{finding_span, finding_unit, Fixer};
use crate::program::Program;
use crate::rules::components::MISSING_PARAMETER_ATTRIBUTE;

/// Inserts `[Parameter]` on its own line above the property declaration,
/// matching the declaration's indentation.
pub struct AddParameterAttribute;

impl Fixer for AddParameterAttribute {
    fn rule(&self) -> RuleId {
        MISSING_PARAMETER_ATTRIBUTE.id
    }

    fn fix(&self, finding: &Finding, program: &Program) -> PatchSet {
        build(finding, program).unwrap_or_default()
    }
}

fn build(finding: &Finding, program: &Program) -> Option<PatchSet> {
    let unit = finding_unit(finding, program)?;
    let span = finding_span(finding)?;
    if span.end as usize > unit.source.len() {
        return None;
    }

    let line_start = unit.source[..span.start as usize]
        .rfind('\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    let indent: String = unit.source[line_start..]
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect();

    let point = Span::new(line_start as u64, line_start as u64);
    let edit = Edit::insert(
        0,
        unit.id,
        Anchor::at(point, &unit.source),
        format!("{indent}[Parameter]\n"),
    )
    .with_rule(MISSING_PARAMETER_ATTRIBUTE.id.0);
    Some(PatchSet::new().with_edit(edit))
}
