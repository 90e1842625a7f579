//! Route-handler extraction and the rules built on it.
//!
//! A route registration is a 3-argument extension-method invocation named
//! `Map…` whose last parameter is `System.Delegate`. The handler behind it
//! may be an inline closure or a method-group reference; extraction
//! normalizes both into one shape. A method group whose body is not visible
//! to this session degrades to "no body", and body-dependent rules degrade
//! to no finding.

use std::iter;

use gantry_core::finding::{Finding, RuleId, RuleMeta, Severity};

use crate::dispatch::{Rule, RuleCtx};
use crate::program::{DelegateTarget, NodeId, Op, OpKind, ParamSymbol, RefKind, TypeId};

pub const SERVICE_LOCATOR_IN_HANDLER: RuleMeta = RuleMeta {
    id: RuleId("GA006"),
    name: "service-locator-in-handler",
    severity: Severity::Warning,
    enabled_by_default: true,
    message: "Route handler resolves services through '{0}'; declare the service as \
              a handler parameter instead",
};

pub const HANDLER_PARAMETER_MODIFIER: RuleMeta = RuleMeta {
    id: RuleId("GA007"),
    name: "handler-parameter-modifier",
    severity: Severity::Warning,
    enabled_by_default: true,
    message: "Route handler parameter '{0}' must be passed by value",
};

pub const HANDLER_RETURNS_REF_LIKE: RuleMeta = RuleMeta {
    id: RuleId("GA008"),
    name: "handler-returns-ref-like",
    severity: Severity::Warning,
    enabled_by_default: true,
    message: "Route handler returns the by-reference-only type '{0}', which cannot \
              be serialized as a response",
};

pub const ROUTE_VALUE_INDEXING: RuleMeta = RuleMeta {
    id: RuleId("GA009"),
    name: "route-value-indexing",
    severity: Severity::Info,
    enabled_by_default: true,
    message: "Prefer a bound route parameter over indexing into the route value \
              dictionary",
};

/// One extracted route registration, normalized over closure and
/// method-group handlers.
pub(crate) struct RouteHandler {
    /// Registration method name, e.g. `MapGet`.
    pub method_name: String,
    /// The route pattern, when the second argument is a string literal.
    pub pattern: Option<String>,
    /// The delegate-creation node passed as the handler.
    pub delegate_node: NodeId,
    /// The handler's parameters.
    pub params: Vec<ParamSymbol>,
    /// The handler's body, when visible to this session.
    pub body: Option<NodeId>,
    /// The handler's declared return type, when resolved.
    pub return_type: Option<TypeId>,
}

/// Extract the route handler behind a registration invocation, or `None`
/// when `id` is not a route registration.
pub(crate) fn extract_route_handler(ctx: &RuleCtx<'_>, id: NodeId) -> Option<RouteHandler> {
    let Op::Invocation { method, args, .. } = &ctx.program.node(id).op else {
        return None;
    };
    let m = ctx.program.symbols.method(*method);
    if !m.name.starts_with("Map")
        || m.containing_type != ctx.catalog.endpoint_route_builder_extensions
    {
        return None;
    }
    if args.len() != 3 || m.params.len() != 3 {
        return None;
    }
    if m.params[2].ty != Some(ctx.catalog.delegate_type) {
        return None;
    }

    let pattern = argument_value(ctx, args[1]).and_then(|value| {
        match &ctx.program.node(value).op {
            Op::StringLiteral { value } => Some(value.clone()),
            _ => None,
        }
    });

    let delegate_node = ctx
        .program
        .descendants(args[2])
        .into_iter()
        .find(|&d| matches!(ctx.program.node(d).op, Op::DelegateCreation { .. }))?;
    let (params, body, return_type) = match &ctx.program.node(delegate_node).op {
        Op::DelegateCreation {
            target:
                DelegateTarget::Lambda {
                    params,
                    body,
                    return_type,
                },
        } => (params.clone(), Some(*body), *return_type),
        Op::DelegateCreation {
            target: DelegateTarget::MethodGroup(target),
        } => {
            let target = ctx.program.symbols.method(*target);
            (target.params.clone(), target.body, target.return_type)
        }
        _ => return None,
    };

    Some(RouteHandler {
        method_name: m.name.clone(),
        pattern,
        delegate_node,
        params,
        body,
        return_type,
    })
}

fn argument_value(ctx: &RuleCtx<'_>, id: NodeId) -> Option<NodeId> {
    match &ctx.program.node(id).op {
        Op::Argument { value } => Some(*value),
        _ => None,
    }
}

/// Body node plus all its descendants.
fn body_and_descendants(ctx: &RuleCtx<'_>, body: NodeId) -> impl Iterator<Item = NodeId> {
    iter::once(body).chain(ctx.program.descendants(body))
}

/// GA006: the handler reaches back into the service provider instead of
/// declaring its dependencies as parameters. One finding per registration,
/// reported at the handler delegate.
pub struct ServiceLocatorInHandler;

impl Rule for ServiceLocatorInHandler {
    fn meta(&self) -> &'static RuleMeta {
        &SERVICE_LOCATOR_IN_HANDLER
    }

    fn triggers(&self) -> &'static [OpKind] {
        &[OpKind::Invocation]
    }

    fn check(&self, ctx: &RuleCtx<'_>, id: NodeId, out: &mut Vec<Finding>) {
        let Some(handler) = extract_route_handler(ctx, id) else {
            return;
        };
        let Some(body) = handler.body else {
            return;
        };
        for node in body_and_descendants(ctx, body) {
            let Op::Invocation { method, .. } = &ctx.program.node(node).op else {
                continue;
            };
            let m = ctx.program.symbols.method(*method);
            let is_locator = (m.containing_type == ctx.catalog.service_provider
                && m.name == "GetService")
                || (m.containing_type == ctx.catalog.service_provider_extensions
                    && (m.name == "GetService" || m.name == "GetRequiredService"));
            if is_locator {
                let span = ctx.program.node(handler.delegate_node).span;
                out.push(
                    Finding::new(
                        &SERVICE_LOCATOR_IN_HANDLER,
                        ctx.program.location(handler.delegate_node.unit, span),
                    )
                    .with_arg(m.name.clone()),
                );
                return;
            }
        }
    }
}

/// GA007: binding does not support `ref`/`out`/`in` handler parameters.
/// The modifier token span rides along for the fixer.
pub struct HandlerParameterModifier;

impl Rule for HandlerParameterModifier {
    fn meta(&self) -> &'static RuleMeta {
        &HANDLER_PARAMETER_MODIFIER
    }

    fn triggers(&self) -> &'static [OpKind] {
        &[OpKind::Invocation]
    }

    fn check(&self, ctx: &RuleCtx<'_>, id: NodeId, out: &mut Vec<Finding>) {
        let Some(handler) = extract_route_handler(ctx, id) else {
            return;
        };
        for param in &handler.params {
            if param.ref_kind == RefKind::Value {
                continue;
            }
            let Some((unit, span)) = param.decl else {
                continue;
            };
            let mut finding =
                Finding::new(&HANDLER_PARAMETER_MODIFIER, ctx.program.location(unit, span))
                    .with_arg(param.name.clone());
            if let Some((_, modifier)) = param.modifier_span {
                finding = finding
                    .with_property("modifierStart", modifier.start.to_string())
                    .with_property("modifierEnd", modifier.end.to_string());
            }
            out.push(finding);
        }
    }
}

/// GA008: handlers returning stack-only types. Reported at each offending
/// return statement, or at the handler reference when an expression-bodied
/// handler has no return statements at all.
pub struct HandlerReturnsRefLike;

impl Rule for HandlerReturnsRefLike {
    fn meta(&self) -> &'static RuleMeta {
        &HANDLER_RETURNS_REF_LIKE
    }

    fn triggers(&self) -> &'static [OpKind] {
        &[OpKind::Invocation]
    }

    fn check(&self, ctx: &RuleCtx<'_>, id: NodeId, out: &mut Vec<Finding>) {
        let Some(handler) = extract_route_handler(ctx, id) else {
            return;
        };
        let ref_like = |ty: Option<TypeId>| {
            ty.is_some_and(|t| ctx.program.symbols.type_symbol(t).is_ref_like)
        };
        if !ref_like(handler.return_type) {
            return;
        }
        let type_name = handler
            .return_type
            .map(|t| ctx.program.symbols.type_symbol(t).name.clone())
            .unwrap_or_default();
        let Some(body) = handler.body else {
            return;
        };

        let returns: Vec<NodeId> = body_and_descendants(ctx, body)
            .filter(|&n| matches!(ctx.program.node(n).op, Op::Return { .. }))
            .collect();
        if returns.is_empty() {
            let span = ctx.program.node(handler.delegate_node).span;
            out.push(
                Finding::new(
                    &HANDLER_RETURNS_REF_LIKE,
                    ctx.program.location(handler.delegate_node.unit, span),
                )
                .with_arg(type_name),
            );
            return;
        }
        for ret in returns {
            let Op::Return { value_type, .. } = &ctx.program.node(ret).op else {
                continue;
            };
            if ref_like(*value_type) {
                let span = ctx.program.node(ret).span;
                out.push(
                    Finding::new(
                        &HANDLER_RETURNS_REF_LIKE,
                        ctx.program.location(ret.unit, span),
                    )
                    .with_arg(type_name.clone()),
                );
            }
        }
    }
}

/// GA009: string-indexed route value access inside a handler body. A
/// literal key rides along as `paramName` so the host can offer a named
/// parameter.
pub struct RouteValueIndexing;

impl Rule for RouteValueIndexing {
    fn meta(&self) -> &'static RuleMeta {
        &ROUTE_VALUE_INDEXING
    }

    fn triggers(&self) -> &'static [OpKind] {
        &[OpKind::Invocation]
    }

    fn check(&self, ctx: &RuleCtx<'_>, id: NodeId, out: &mut Vec<Finding>) {
        let Some(handler) = extract_route_handler(ctx, id) else {
            return;
        };
        let Some(body) = handler.body else {
            return;
        };
        for node in body_and_descendants(ctx, body) {
            let Op::PropertyReference { property, argument } = &ctx.program.node(node).op
            else {
                continue;
            };
            if ctx.program.symbols.property(*property).containing_type
                != ctx.catalog.route_value_dictionary
            {
                continue;
            }
            let Some(key) = argument else {
                continue;
            };
            let span = ctx.program.node(node).span;
            let mut finding = Finding::new(
                &ROUTE_VALUE_INDEXING,
                ctx.program.location(node.unit, span),
            );
            if let Op::StringLiteral { value } = &ctx.program.node(*key).op {
                finding = finding.with_property("paramName", value.clone());
            }
            out.push(finding);
        }
    }
}
