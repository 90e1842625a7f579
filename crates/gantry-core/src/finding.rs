//! Findings and rule metadata.
//!
//! A `Finding` is the sole hand-off artifact between detection and the
//! fixers: it carries a stable rule id, a source location, rendered message
//! arguments, and an ordered string property bag. Property keys form a small
//! per-rule schema (e.g. `SuggestedApiName`, `healthCheckName`) that the
//! matching fixer consumes instead of recomputing expensive facts.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::types::Location;

// ============================================================================
// Rule Identity
// ============================================================================

/// Stable string identifier of a rule, e.g. `GA001`.
///
/// The host routes findings to fixers by this id, and uses it to let users
/// selectively enable and disable rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RuleId(pub &'static str);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Severity of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Per-rule constants surfaced to the host.
#[derive(Debug, Clone, Serialize)]
pub struct RuleMeta {
    /// Stable rule id.
    pub id: RuleId,
    /// Kebab-case rule name.
    pub name: &'static str,
    /// Default severity.
    pub severity: Severity,
    /// Whether the rule runs unless the host disables it.
    pub enabled_by_default: bool,
    /// Message template; `{0}`, `{1}`, … are replaced by message args.
    pub message: &'static str,
}

impl RuleMeta {
    /// Render the message template with the given arguments.
    pub fn render_message(&self, args: &[String]) -> String {
        let mut out = self.message.to_string();
        for (i, arg) in args.iter().enumerate() {
            out = out.replace(&format!("{{{}}}", i), arg);
        }
        out
    }
}

// ============================================================================
// Finding
// ============================================================================

/// One reported instance of a detected pattern, addressed to a source
/// location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// The rule that produced this finding.
    pub rule: RuleId,
    /// Severity, copied from the rule metadata at creation time.
    pub severity: Severity,
    /// Primary source location.
    pub location: Location,
    /// Message arguments, in template order.
    pub message_args: Vec<String>,
    /// Ordered string property bag; the channel from detection to fixers.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl Finding {
    /// Create a finding with no message arguments or properties.
    pub fn new(meta: &RuleMeta, location: Location) -> Self {
        Finding {
            rule: meta.id,
            severity: meta.severity,
            location,
            message_args: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    /// Append a message argument.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.message_args.push(arg.into());
        self
    }

    /// Attach a property for the fixer.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Look up a property by key.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Sort key for deterministic output: (file, byte start, rule id).
    pub fn sort_key(&self) -> (String, u64, &'static str) {
        (
            self.location.file.clone(),
            self.location.byte_start.unwrap_or(0),
            self.rule.0,
        )
    }
}
