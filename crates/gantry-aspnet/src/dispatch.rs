//! Rule dispatch over the operation tree.
//!
//! The session resolves the symbol catalog once, registers every enabled
//! rule against its trigger kinds, then walks each unit's arena in document
//! order, invoking matching rules per node. Units are independent, so the
//! walk fans out across a small worker pool; rules are stateless, the
//! catalog is read-only, and cross-unit facts route through the aggregator.
//! A cooperative cancel flag is checked between nodes so long sessions can
//! be abandoned cleanly.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use gantry_core::finding::{Finding, RuleMeta};

use crate::aggregate::{Aggregator, HEALTH_CHECK_COVERAGE};
use crate::catalog::WellKnownTypes;
use crate::program::{NodeId, OpKind, Program, Unit};
use crate::rules;
use crate::rules::components::{self, MISSING_PARAMETER_ATTRIBUTE};
use crate::rules::endpoints::{self, DUPLICATE_ROUTE_PREFIX};

// ============================================================================
// Rule contract
// ============================================================================

/// Read-only context handed to every rule invocation.
pub struct RuleCtx<'a> {
    pub program: &'a Program,
    pub catalog: &'a WellKnownTypes,
}

/// One stateless detection rule. `check` is invoked for every node whose
/// kind appears in `triggers`; invocation order within a node is
/// unspecified, so rules must not observe each other's output.
pub trait Rule: Sync {
    fn meta(&self) -> &'static RuleMeta;
    fn triggers(&self) -> &'static [OpKind];
    fn check(&self, ctx: &RuleCtx<'_>, node: NodeId, out: &mut Vec<Finding>);
}

// ============================================================================
// Options and cancellation
// ============================================================================

/// Host-supplied analysis configuration.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    /// Rule ids the host disabled for this session.
    pub disabled_rules: BTreeSet<String>,
    /// Worker cap for the unit walk; 0 means one worker per available core.
    pub max_workers: usize,
}

impl AnalysisOptions {
    fn enabled(&self, meta: &RuleMeta) -> bool {
        meta.enabled_by_default && !self.disabled_rules.contains(meta.id.0)
    }
}

/// Cooperative cancellation signal, checked between nodes and units.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    inner: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        CancelFlag::default()
    }

    pub fn cancel(&self) {
        self.inner.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::Relaxed)
    }
}

// ============================================================================
// Session
// ============================================================================

/// Analyze a program and return its findings, sorted by file, byte offset,
/// and rule id.
///
/// A program that does not reference the framework yields zero findings:
/// the catalog miss is logged and every rule short-circuits.
pub fn analyze(program: &Program, options: &AnalysisOptions, cancel: &CancelFlag) -> Vec<Finding> {
    let catalog = match WellKnownTypes::resolve(program) {
        Ok(catalog) => catalog,
        Err(err) => {
            tracing::debug!(%err, "framework surface unresolved; session yields no findings");
            return Vec::new();
        }
    };
    AnalysisSession::new(program, &catalog, options).run(cancel)
}

/// One analysis pass over one immutable program snapshot.
pub struct AnalysisSession<'a> {
    program: &'a Program,
    catalog: &'a WellKnownTypes,
    rules: Vec<Box<dyn Rule>>,
    run_property_pass: bool,
    run_prefix_pass: bool,
    run_aggregator: bool,
    max_workers: usize,
}

impl<'a> AnalysisSession<'a> {
    pub fn new(
        program: &'a Program,
        catalog: &'a WellKnownTypes,
        options: &AnalysisOptions,
    ) -> Self {
        let rules = rules::all_rules()
            .into_iter()
            .filter(|rule| options.enabled(rule.meta()))
            .collect();
        AnalysisSession {
            program,
            catalog,
            rules,
            run_property_pass: options.enabled(&MISSING_PARAMETER_ATTRIBUTE),
            run_prefix_pass: options.enabled(&DUPLICATE_ROUTE_PREFIX),
            run_aggregator: options.enabled(&HEALTH_CHECK_COVERAGE),
            max_workers: options.max_workers,
        }
    }

    pub fn run(&self, cancel: &CancelFlag) -> Vec<Finding> {
        let ctx = RuleCtx {
            program: self.program,
            catalog: self.catalog,
        };
        let mut triggers: HashMap<OpKind, Vec<&dyn Rule>> = HashMap::new();
        for rule in &self.rules {
            for kind in rule.triggers() {
                triggers.entry(*kind).or_default().push(rule.as_ref());
            }
        }

        let aggregator = Aggregator::new();
        if self.run_aggregator {
            aggregator.record_implementors(&ctx);
        }

        let workers = self.worker_count();
        let next_unit = AtomicUsize::new(0);
        let collected: Mutex<Vec<Finding>> = Mutex::new(Vec::new());
        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    let mut out = Vec::new();
                    loop {
                        if cancel.is_cancelled() {
                            break;
                        }
                        let index = next_unit.fetch_add(1, Ordering::Relaxed);
                        let Some(unit) = self.program.units.get(index) else {
                            break;
                        };
                        self.walk_unit(&ctx, unit, &triggers, &aggregator, cancel, &mut out);
                    }
                    let mut findings = match collected.lock() {
                        Ok(guard) => guard,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                    findings.append(&mut out);
                });
            }
        });
        let mut findings = match collected.into_inner() {
            Ok(findings) => findings,
            Err(poisoned) => poisoned.into_inner(),
        };

        if !cancel.is_cancelled() {
            if self.run_property_pass {
                components::missing_parameter_attribute(&ctx, &mut findings);
            }
            if self.run_aggregator {
                aggregator.emit(&ctx, &mut findings);
            }
        }

        findings.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        tracing::debug!(count = findings.len(), "analysis session complete");
        findings
    }

    fn walk_unit(
        &self,
        ctx: &RuleCtx<'_>,
        unit: &Unit,
        triggers: &HashMap<OpKind, Vec<&dyn Rule>>,
        aggregator: &Aggregator,
        cancel: &CancelFlag,
        out: &mut Vec<Finding>,
    ) {
        for (id, node) in unit.nodes() {
            if cancel.is_cancelled() {
                return;
            }
            if let Some(matching) = triggers.get(&node.op.kind()) {
                for rule in matching {
                    rule.check(ctx, id, out);
                }
            }
        }
        if self.run_prefix_pass {
            endpoints::duplicate_route_prefixes(ctx, unit, out);
        }
        if self.run_aggregator {
            aggregator.record_unit_endpoints(ctx, unit);
        }
    }

    fn worker_count(&self) -> usize {
        let cap = if self.max_workers > 0 {
            self.max_workers
        } else {
            thread::available_parallelism().map(usize::from).unwrap_or(1)
        };
        let units = self.program.units.len().max(1);
        cap.min(units)
    }
}
