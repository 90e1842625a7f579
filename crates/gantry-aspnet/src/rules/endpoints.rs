//! Endpoint naming and route grouping rules.

use std::collections::BTreeMap;

use gantry_core::finding::{Finding, RuleId, RuleMeta, Severity};
use gantry_core::patch::Span;

use crate::dispatch::{Rule, RuleCtx};
use crate::naming::suggested_endpoint_name;
use crate::program::{DelegateTarget, NodeId, Op, OpKind, Unit};
use crate::routes::{RouteTemplate, Segment};
use crate::rules::handlers::extract_route_handler;

pub const DUPLICATE_ROUTE_PREFIX: RuleMeta = RuleMeta {
    id: RuleId("GA010"),
    name: "duplicate-route-prefix",
    severity: Severity::Info,
    enabled_by_default: true,
    message: "Route shares the prefix '{0}' with other registrations in this file; \
              consider a route group",
};

pub const ENDPOINT_NAME_SUGGESTION: RuleMeta = RuleMeta {
    id: RuleId("GA011"),
    name: "endpoint-name-suggestion",
    severity: Severity::Info,
    enabled_by_default: true,
    message: "Endpoint can be named '{0}' for link generation and API metadata",
};

/// GA010 runs per unit rather than per node: registrations are bucketed by
/// their first literal path segment, and any bucket with more than one
/// member reports at every member.
pub fn duplicate_route_prefixes(ctx: &RuleCtx<'_>, unit: &Unit, out: &mut Vec<Finding>) {
    let mut buckets: BTreeMap<String, Vec<(NodeId, Span)>> = BTreeMap::new();
    for (id, node) in unit.nodes() {
        if node.op.kind() != OpKind::Invocation {
            continue;
        }
        let Some(handler) = extract_route_handler(ctx, id) else {
            continue;
        };
        let Some(pattern) = &handler.pattern else {
            continue;
        };
        let route = RouteTemplate::parse(pattern);
        let Some(prefix) = route.first_segment().and_then(Segment::literal) else {
            continue;
        };
        buckets
            .entry(prefix.to_string())
            .or_default()
            .push((id, node.span));
    }
    for (prefix, members) in buckets {
        if members.len() < 2 {
            continue;
        }
        for (id, span) in members {
            out.push(
                Finding::new(&DUPLICATE_ROUTE_PREFIX, ctx.program.location(id.unit, span))
                    .with_arg(prefix.clone())
                    .with_property("prefix", prefix.clone()),
            );
        }
    }
}

/// GA011: suggest a conventional operation name for an unnamed endpoint.
/// Skipped when `.WithName` already chains off the registration or the
/// handler method carries an explicit name attribute.
pub struct EndpointNameSuggestion;

impl Rule for EndpointNameSuggestion {
    fn meta(&self) -> &'static RuleMeta {
        &ENDPOINT_NAME_SUGGESTION
    }

    fn triggers(&self) -> &'static [OpKind] {
        &[OpKind::Invocation]
    }

    fn check(&self, ctx: &RuleCtx<'_>, id: NodeId, out: &mut Vec<Finding>) {
        let Some(handler) = extract_route_handler(ctx, id) else {
            return;
        };
        // `app.MapGet(…).WithName(…)` makes the registration the receiver
        // of the naming call, so an ancestor walk finds it.
        let mut current = ctx.program.node(id).parent;
        while let Some(ancestor) = current {
            if let Op::Invocation { method, .. } = &ctx.program.node(ancestor).op {
                if ctx.program.symbols.method(*method).name == "WithName" {
                    return;
                }
            }
            current = ctx.program.node(ancestor).parent;
        }
        if let Op::DelegateCreation {
            target: DelegateTarget::MethodGroup(target),
        } = &ctx.program.node(handler.delegate_node).op
        {
            if ctx
                .program
                .symbols
                .method(*target)
                .attributes
                .contains(&ctx.catalog.endpoint_name_attribute)
            {
                return;
            }
        }
        let Some(pattern) = &handler.pattern else {
            return;
        };
        let route = RouteTemplate::parse(pattern);
        let Some(name) = suggested_endpoint_name(&handler.method_name, &route) else {
            return;
        };
        let span = ctx.program.node(id).span;
        out.push(
            Finding::new(&ENDPOINT_NAME_SUGGESTION, ctx.program.location(id.unit, span))
                .with_arg(name.clone())
                .with_property("SuggestedApiName", name),
        );
    }
}
