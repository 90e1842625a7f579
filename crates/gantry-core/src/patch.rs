//! Patch IR: anchored edits and atomic batch application.
//!
//! Fixers express their rewrites as location-addressed edits against an
//! immutable snapshot of the program text:
//!
//! - every edit carries an anchor (span + content hash) so it can be
//!   verified before it is applied;
//! - overlapping edits are rejected explicitly, never silently dropped;
//! - application is all-or-nothing per unit batch;
//! - synthesis fixers may add whole new units alongside span edits.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

// ============================================================================
// Spans and Hashes
// ============================================================================

/// Stable identifier of a compilation unit within one program snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit_{}", self.0)
    }
}

/// Byte offsets into unit content. Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: u64,
    /// End byte offset (exclusive).
    pub end: u64,
}

impl Span {
    /// Create a new span.
    ///
    /// # Panics
    /// Panics if `start > end`.
    pub fn new(start: u64, end: u64) -> Self {
        assert!(start <= end, "Span start ({start}) must be <= end ({end})");
        Span { start, end }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Check if the span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check if this span overlaps with another.
    ///
    /// Adjacent spans (one ends where another starts) do NOT overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Check if this span contains another span entirely.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// SHA-256 content hash, hex-encoded for JSON compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    /// Compute the SHA-256 hash of the given bytes.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentHash(hex::encode(hasher.finalize()))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Anchors
// ============================================================================

/// How an edit finds and validates its target location.
///
/// The edit only applies if the bytes at `span` still hash to
/// `before_hash`; a mismatch means the snapshot changed underneath the
/// finding, and the edit is rejected instead of corrupting the unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Anchor {
    /// The exact byte range to edit.
    pub span: Span,
    /// Hash of the bytes in `span` before the edit.
    pub before_hash: ContentHash,
}

impl Anchor {
    /// Anchor a span in the given unit content.
    ///
    /// # Panics
    /// Panics if the span is out of bounds for `content`.
    pub fn at(span: Span, content: &str) -> Self {
        let slice = &content.as_bytes()[span.start as usize..span.end as usize];
        Anchor {
            span,
            before_hash: ContentHash::compute(slice),
        }
    }

    /// Verify this anchor against unit content.
    fn verify(&self, unit: UnitId, content: &str) -> Option<Conflict> {
        if self.span.end as usize > content.len() {
            return Some(Conflict::SpanOutOfBounds {
                unit,
                span: self.span,
                unit_len: content.len() as u64,
            });
        }
        // Application splices with str operations, so a span endpoint inside
        // a multi-byte character must reject here, not abort there.
        if !content.is_char_boundary(self.span.start as usize)
            || !content.is_char_boundary(self.span.end as usize)
        {
            return Some(Conflict::SpanNotCharAligned {
                unit,
                span: self.span,
            });
        }
        let slice = &content.as_bytes()[self.span.start as usize..self.span.end as usize];
        let actual = ContentHash::compute(slice);
        if actual != self.before_hash {
            return Some(Conflict::AnchorMismatch {
                unit,
                span: self.span,
                expected: self.before_hash.clone(),
                actual,
            });
        }
        None
    }
}

// ============================================================================
// Edits
// ============================================================================

/// The kind of edit operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EditKind {
    /// Insert text at `anchor.span.start`.
    Insert,
    /// Delete the bytes in `anchor.span`.
    Delete,
    /// Replace the bytes in `anchor.span` with new text.
    Replace,
}

/// A single atomic text change anchored in one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edit {
    /// Stable identifier for deterministic ordering.
    pub id: u32,
    /// The unit this edit applies to.
    pub unit: UnitId,
    /// The kind of operation.
    pub kind: EditKind,
    /// How to find and verify the target location.
    pub anchor: Anchor,
    /// The new text (empty for Delete).
    pub text: String,
    /// The rule id that produced this edit, for provenance.
    pub rule: Option<String>,
}

impl Edit {
    /// Create an Insert edit.
    ///
    /// # Panics
    /// Panics if the anchor span is not empty.
    pub fn insert(id: u32, unit: UnitId, anchor: Anchor, text: impl Into<String>) -> Self {
        assert!(
            anchor.span.is_empty(),
            "Insert anchor span must be empty, got {}",
            anchor.span
        );
        Edit {
            id,
            unit,
            kind: EditKind::Insert,
            anchor,
            text: text.into(),
            rule: None,
        }
    }

    /// Create a Delete edit.
    ///
    /// # Panics
    /// Panics if the anchor span is empty.
    pub fn delete(id: u32, unit: UnitId, anchor: Anchor) -> Self {
        assert!(
            !anchor.span.is_empty(),
            "Delete anchor span must be non-empty"
        );
        Edit {
            id,
            unit,
            kind: EditKind::Delete,
            anchor,
            text: String::new(),
            rule: None,
        }
    }

    /// Create a Replace edit.
    pub fn replace(id: u32, unit: UnitId, anchor: Anchor, text: impl Into<String>) -> Self {
        Edit {
            id,
            unit,
            kind: EditKind::Replace,
            anchor,
            text: text.into(),
            rule: None,
        }
    }

    /// Tag this edit with the rule id that produced it.
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    /// Get the anchor's span.
    pub fn span(&self) -> Span {
        self.anchor.span
    }
}

/// A whole new unit produced by a synthesis fixer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitCreate {
    /// Workspace-relative path of the new unit.
    pub path: String,
    /// Full contents of the new unit.
    pub contents: String,
}

// ============================================================================
// Conflicts
// ============================================================================

/// A detected overlap or invalidation that rejects an edit or an apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Conflict {
    /// Two edits have overlapping spans in the same unit; the later edit
    /// (by deterministic order) is the rejected one.
    OverlappingSpans {
        unit: UnitId,
        kept: Span,
        rejected: Span,
        rejected_edit: u32,
    },
    /// Anchor content hash mismatch: the snapshot changed underneath.
    AnchorMismatch {
        unit: UnitId,
        span: Span,
        expected: ContentHash,
        actual: ContentHash,
    },
    /// Span is out of bounds for the unit.
    SpanOutOfBounds {
        unit: UnitId,
        span: Span,
        unit_len: u64,
    },
    /// A span endpoint falls inside a multi-byte character.
    SpanNotCharAligned { unit: UnitId, span: Span },
    /// Unit not present in the apply context.
    UnitMissing { unit: UnitId },
    /// Two synthesized units share a path, or a synthesized unit shadows an
    /// existing one.
    DuplicateUnitPath { path: String },
}

// ============================================================================
// PatchSet
// ============================================================================

/// An ordered set of edits and unit creations, applied atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatchSet {
    /// The edits to apply, in deterministic order.
    pub edits: Vec<Edit>,
    /// New units to add alongside the edits.
    pub creates: Vec<UnitCreate>,
}

impl PatchSet {
    /// Create an empty patch set.
    pub fn new() -> Self {
        PatchSet::default()
    }

    /// Add an edit.
    pub fn with_edit(mut self, edit: Edit) -> Self {
        self.edits.push(edit);
        self
    }

    /// Add a unit creation.
    pub fn with_create(mut self, create: UnitCreate) -> Self {
        self.creates.push(create);
        self
    }

    /// True when the patch set contains no edits and no creations.
    ///
    /// A fixer whose precondition no longer holds returns an empty patch
    /// set; applying it is a valid no-op.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty() && self.creates.is_empty()
    }

    /// Merge another patch set into this one.
    pub fn merge(&mut self, other: PatchSet) {
        self.edits.extend(other.edits);
        self.creates.extend(other.creates);
    }

    /// Sort edits deterministically: by unit, then span start, then edit id.
    pub fn sort_edits(&mut self) {
        self.edits
            .sort_by_key(|e| (e.unit, e.span().start, e.span().end, e.id));
    }

    /// Remove edits whose spans overlap an earlier (by deterministic order)
    /// edit in the same unit.
    ///
    /// Returns one `Conflict::OverlappingSpans` per rejected edit, so
    /// callers can surface rejections instead of silently dropping them.
    pub fn reject_overlaps(&mut self) -> Vec<Conflict> {
        self.sort_edits();

        let mut conflicts = Vec::new();
        let mut kept: Vec<Edit> = Vec::with_capacity(self.edits.len());

        for edit in self.edits.drain(..) {
            let overlap = kept
                .iter()
                .filter(|k| k.unit == edit.unit)
                .find(|k| k.span().overlaps(&edit.span()));
            match overlap {
                Some(winner) => conflicts.push(Conflict::OverlappingSpans {
                    unit: edit.unit,
                    kept: winner.span(),
                    rejected: edit.span(),
                    rejected_edit: edit.id,
                }),
                None => kept.push(edit),
            }
        }

        self.edits = kept;
        conflicts
    }

    /// Apply this patch set atomically against the given unit sources.
    ///
    /// Either every edit verifies and applies, or nothing is modified and
    /// all conflicts are returned. Edits are applied in reverse offset order
    /// within each unit so earlier spans stay valid.
    pub fn apply(&self, sources: &BTreeMap<UnitId, String>) -> Result<Applied, Vec<Conflict>> {
        let mut conflicts = Vec::new();

        // Verify anchors up front; nothing is modified if any fail.
        for edit in &self.edits {
            match sources.get(&edit.unit) {
                Some(content) => {
                    if let Some(conflict) = edit.anchor.verify(edit.unit, content) {
                        conflicts.push(conflict);
                    }
                }
                None => conflicts.push(Conflict::UnitMissing { unit: edit.unit }),
            }
        }

        // Overlap detection across the whole set.
        let mut ordered = self.clone();
        let overlap_conflicts = ordered.reject_overlaps();
        conflicts.extend(overlap_conflicts);

        // Synthesized unit paths must be unique.
        let mut seen_paths: HashMap<&str, ()> = HashMap::new();
        for create in &self.creates {
            if seen_paths.insert(create.path.as_str(), ()).is_some() {
                conflicts.push(Conflict::DuplicateUnitPath {
                    path: create.path.clone(),
                });
            }
        }

        if !conflicts.is_empty() {
            tracing::debug!(count = conflicts.len(), "patch apply rejected");
            return Err(conflicts);
        }

        let mut modified: BTreeMap<UnitId, String> = BTreeMap::new();
        let mut by_unit: BTreeMap<UnitId, Vec<&Edit>> = BTreeMap::new();
        for edit in &ordered.edits {
            by_unit.entry(edit.unit).or_default().push(edit);
        }

        for (unit, mut edits) in by_unit {
            let mut content = sources
                .get(&unit)
                .expect("anchor verification covers missing units")
                .clone();

            // Reverse offset order preserves span validity.
            edits.sort_by(|a, b| b.span().start.cmp(&a.span().start));

            for edit in edits {
                let start = edit.span().start as usize;
                let end = edit.span().end as usize;
                match edit.kind {
                    EditKind::Insert => content.insert_str(start, &edit.text),
                    EditKind::Delete => content.replace_range(start..end, ""),
                    EditKind::Replace => content.replace_range(start..end, &edit.text),
                }
            }

            modified.insert(unit, content);
        }

        Ok(Applied {
            modified,
            created: self.creates.clone(),
        })
    }
}

/// Result of a successful atomic apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    /// New content for every modified unit.
    pub modified: BTreeMap<UnitId, String>,
    /// Units synthesized by the patch set.
    pub created: Vec<UnitCreate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources(pairs: &[(u32, &str)]) -> BTreeMap<UnitId, String> {
        pairs
            .iter()
            .map(|(id, text)| (UnitId(*id), text.to_string()))
            .collect()
    }

    #[test]
    fn span_overlap_is_exclusive_of_adjacency() {
        let a = Span::new(0, 4);
        let b = Span::new(4, 8);
        let c = Span::new(3, 5);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }

    #[test]
    fn replace_applies_and_preserves_rest() {
        let srcs = sources(&[(0, "let x = 1;")]);
        let anchor = Anchor::at(Span::new(4, 5), &srcs[&UnitId(0)]);
        let patch = PatchSet::new().with_edit(Edit::replace(0, UnitId(0), anchor, "y"));
        let applied = patch.apply(&srcs).expect("apply");
        assert_eq!(applied.modified[&UnitId(0)], "let y = 1;");
    }

    #[test]
    fn multiple_edits_apply_in_reverse_offset_order() {
        let srcs = sources(&[(0, "aa bb cc")]);
        let src = &srcs[&UnitId(0)];
        let patch = PatchSet::new()
            .with_edit(Edit::replace(0, UnitId(0), Anchor::at(Span::new(0, 2), src), "xx"))
            .with_edit(Edit::replace(1, UnitId(0), Anchor::at(Span::new(6, 8), src), "zz"));
        let applied = patch.apply(&srcs).expect("apply");
        assert_eq!(applied.modified[&UnitId(0)], "xx bb zz");
    }

    #[test]
    fn stale_anchor_rejects_whole_apply() {
        let original = "let x = 1;".to_string();
        let anchor = Anchor::at(Span::new(4, 5), &original);
        let srcs = sources(&[(0, "let q = 1;")]);
        let patch = PatchSet::new().with_edit(Edit::replace(0, UnitId(0), anchor, "y"));
        let conflicts = patch.apply(&srcs).expect_err("must fail");
        assert!(matches!(conflicts[0], Conflict::AnchorMismatch { .. }));
    }

    #[test]
    fn reject_overlaps_keeps_earlier_edit() {
        let src = "abcdefgh".to_string();
        let mut patch = PatchSet::new()
            .with_edit(Edit::replace(0, UnitId(0), Anchor::at(Span::new(0, 4), &src), "1"))
            .with_edit(Edit::replace(1, UnitId(0), Anchor::at(Span::new(2, 6), &src), "2"));
        let conflicts = patch.reject_overlaps();
        assert_eq!(patch.edits.len(), 1);
        assert_eq!(patch.edits[0].id, 0);
        assert_eq!(conflicts.len(), 1);
        assert!(matches!(
            conflicts[0],
            Conflict::OverlappingSpans {
                rejected_edit: 1,
                ..
            }
        ));
    }

    #[test]
    fn non_overlapping_edits_in_different_units_merge() {
        let srcs = sources(&[(0, "one"), (1, "two")]);
        let mut a = PatchSet::new().with_edit(Edit::replace(
            0,
            UnitId(0),
            Anchor::at(Span::new(0, 3), &srcs[&UnitId(0)]),
            "1",
        ));
        let b = PatchSet::new().with_edit(Edit::replace(
            1,
            UnitId(1),
            Anchor::at(Span::new(0, 3), &srcs[&UnitId(1)]),
            "2",
        ));
        a.merge(b);
        assert!(a.reject_overlaps().is_empty());
        let applied = a.apply(&srcs).expect("apply");
        assert_eq!(applied.modified[&UnitId(0)], "1");
        assert_eq!(applied.modified[&UnitId(1)], "2");
    }

    #[test]
    fn duplicate_created_paths_conflict() {
        let srcs = sources(&[]);
        let patch = PatchSet::new()
            .with_create(UnitCreate {
                path: "New.cs".into(),
                contents: "a".into(),
            })
            .with_create(UnitCreate {
                path: "New.cs".into(),
                contents: "b".into(),
            });
        let conflicts = patch.apply(&srcs).expect_err("must fail");
        assert!(matches!(conflicts[0], Conflict::DuplicateUnitPath { .. }));
    }

    #[test]
    fn span_splitting_a_multibyte_char_rejects_the_apply() {
        // The anchor hashes raw bytes, so it verifies even mid-character;
        // the apply must still reject instead of aborting.
        let srcs = sources(&[(0, "aé")]);
        let anchor = Anchor::at(Span::new(1, 2), &srcs[&UnitId(0)]);
        let patch = PatchSet::new().with_edit(Edit::replace(0, UnitId(0), anchor, "x"));
        let conflicts = patch.apply(&srcs).expect_err("must fail");
        assert!(matches!(conflicts[0], Conflict::SpanNotCharAligned { .. }));
    }

    #[test]
    fn insert_at_point() {
        let srcs = sources(&[(0, "ab")]);
        let anchor = Anchor::at(Span::new(1, 1), &srcs[&UnitId(0)]);
        let patch = PatchSet::new().with_edit(Edit::insert(0, UnitId(0), anchor, "X"));
        let applied = patch.apply(&srcs).expect("apply");
        assert_eq!(applied.modified[&UnitId(0)], "aXb");
    }
}
