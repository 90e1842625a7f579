//! Cross-unit aggregation for health-check coverage.
//!
//! GA012 needs facts visible only after the whole program has been walked:
//! which types implement the health-check interface, and which methods
//! handle HTTP requests. Workers feed two shared maps during the walk;
//! findings are emitted once at end of session. Matching is purely the
//! naming convention below; no data flow between a handler and its health
//! check is traced, so false negatives are expected and accepted.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use gantry_core::finding::{Finding, RuleId, RuleMeta, Severity};
use gantry_core::patch::{Span, UnitId};

use crate::dispatch::RuleCtx;
use crate::program::Unit;

pub const HEALTH_CHECK_COVERAGE: RuleMeta = RuleMeta {
    id: RuleId("GA012"),
    name: "health-check-coverage",
    severity: Severity::Info,
    enabled_by_default: true,
    message: "HTTP endpoint '{0}' has no matching health check; consider adding '{1}'",
};

/// The naming-convention key associating an HTTP handler method with its
/// covering health check: `{method}{type minus "Controller"}HealthCheck`,
/// so `GetTodos` on `TodoController` derives `GetTodosTodoHealthCheck`.
pub fn derived_health_check_name(method_name: &str, type_name: &str) -> String {
    let stem = type_name.strip_suffix("Controller").unwrap_or(type_name);
    format!("{method_name}{stem}HealthCheck")
}

struct EndpointRecord {
    method_name: String,
    sites: Vec<(UnitId, Span)>,
}

/// Concurrent-safe session state for GA012. Insertion is first-writer-wins
/// with no cross-worker ordering guarantee, so two methods deriving the
/// same key record whichever worker got there first.
#[derive(Default)]
pub struct Aggregator {
    implementors: Mutex<HashSet<String>>,
    endpoints: Mutex<HashMap<String, EndpointRecord>>,
}

impl Aggregator {
    pub fn new() -> Self {
        Aggregator::default()
    }

    /// Record every type implementing the health-check interface. Runs once
    /// before the unit walk; the symbol table carries no per-unit split for
    /// types.
    pub fn record_implementors(&self, ctx: &RuleCtx<'_>) {
        let mut implementors = match self.implementors.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for (id, symbol) in ctx.program.symbols.types() {
            if ctx
                .program
                .symbols
                .implements(id, ctx.catalog.health_check_interface)
            {
                implementors.insert(symbol.name.clone());
            }
        }
    }

    /// Record the HTTP-attributed methods whose primary declaration lives
    /// in `unit`. Called from the worker walking that unit.
    pub fn record_unit_endpoints(&self, ctx: &RuleCtx<'_>, unit: &Unit) {
        for (id, method) in ctx.program.symbols.methods() {
            let Some(&(first_unit, _)) = method.declarations.first() else {
                continue;
            };
            if first_unit != unit.id {
                continue;
            }
            if !ctx
                .program
                .symbols
                .has_attribute(id, ctx.catalog.http_method_attribute)
            {
                continue;
            }
            let type_name = &ctx
                .program
                .symbols
                .type_symbol(method.containing_type)
                .name;
            let key = derived_health_check_name(&method.name, type_name);
            let mut endpoints = match self.endpoints.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            endpoints.entry(key).or_insert_with(|| EndpointRecord {
                method_name: method.name.clone(),
                sites: method.declarations.clone(),
            });
        }
    }

    /// Emit one finding per declaration site of every uncovered endpoint
    /// method. A method with partial declarations reports at each of them.
    pub fn emit(&self, ctx: &RuleCtx<'_>, out: &mut Vec<Finding>) {
        let implementors = match self.implementors.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let endpoints = match self.endpoints.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for (key, record) in endpoints.iter() {
            if implementors.contains(key) {
                continue;
            }
            for &(unit, span) in &record.sites {
                out.push(
                    Finding::new(&HEALTH_CHECK_COVERAGE, ctx.program.location(unit, span))
                        .with_arg(record.method_name.clone())
                        .with_arg(key.clone())
                        .with_property("healthCheckName", key.clone())
                        .with_property("methodName", record.method_name.clone()),
                );
            }
        }
    }
}
