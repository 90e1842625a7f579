//! Batch-fix coordination.
//!
//! Applies many findings' fixes in one pass over one program snapshot.
//! Because every edit is location-addressed and anchored, independent
//! patches compose without re-running detection between them. Overlapping
//! edits reject the later one (by deterministic order) explicitly; the
//! remaining set applies atomically.

use gantry_core::error::GantryError;
use gantry_core::finding::Finding;
use gantry_core::patch::{Applied, Conflict, PatchSet};

use crate::fix::fixer_for;
use crate::program::Program;

/// Result of one batch application.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Modified unit contents and synthesized units.
    pub applied: Applied,
    /// Edits rejected for overlapping an earlier edit. Surfaced to the
    /// host so it can re-run detection and fix them in a later batch.
    pub rejected: Vec<Conflict>,
}

/// Build and apply the fixes for every fixable finding in the batch.
///
/// Findings without a registered fixer are skipped. Anchor mismatches and
/// other apply-time conflicts fail the whole batch; nothing is modified.
pub fn apply_fixes(program: &Program, findings: &[Finding]) -> Result<BatchOutcome, GantryError> {
    let mut merged = PatchSet::new();
    let mut next_id = 0u32;
    for finding in findings {
        let Some(fixer) = fixer_for(finding.rule) else {
            continue;
        };
        let patch = fixer.fix(finding, program);
        for mut edit in patch.edits {
            // Re-number for a deterministic order across the whole batch.
            edit.id = next_id;
            next_id += 1;
            merged.edits.push(edit);
        }
        for create in patch.creates {
            // Two findings may legitimately synthesize the same unit (a
            // partial method reports per declaration site); identical
            // contents collapse, divergent ones are left for apply to
            // reject.
            if !merged.creates.contains(&create) {
                merged.creates.push(create);
            }
        }
    }

    let rejected = merged.reject_overlaps();
    if !rejected.is_empty() {
        tracing::debug!(count = rejected.len(), "overlapping fixes rejected from batch");
    }
    let applied = merged.apply(&program.sources())?;
    Ok(BatchOutcome { applied, rejected })
}
