//! Component parameter rules.

use gantry_core::finding::{Finding, RuleId, RuleMeta, Severity};

use crate::dispatch::{Rule, RuleCtx};
use crate::program::{MethodKind, NodeId, Op, OpKind};

pub const PARAMETER_MUTATION: RuleMeta = RuleMeta {
    id: RuleId("GA001"),
    name: "component-parameter-mutation",
    severity: Severity::Warning,
    enabled_by_default: true,
    message: "Component parameter '{0}' is assigned outside a constructor or a \
              SetParametersAsync override",
};

pub const MISSING_PARAMETER_ATTRIBUTE: RuleMeta = RuleMeta {
    id: RuleId("GA002"),
    name: "missing-parameter-attribute",
    severity: Severity::Warning,
    enabled_by_default: true,
    message: "Property '{0}' has [{1}] but is missing the companion [Parameter] attribute",
};

pub const JS_INTEROP_IN_INITIALIZER: RuleMeta = RuleMeta {
    id: RuleId("GA004"),
    name: "js-interop-in-initializer",
    severity: Severity::Warning,
    enabled_by_default: true,
    message: "JavaScript interop call '{0}' is not available during OnInitializedAsync; \
              move it to OnAfterRenderAsync",
};

/// GA001: assignment to a component parameter property outside the contexts
/// the framework writes parameters from.
pub struct ParameterMutation;

impl Rule for ParameterMutation {
    fn meta(&self) -> &'static RuleMeta {
        &PARAMETER_MUTATION
    }

    fn triggers(&self) -> &'static [OpKind] {
        &[OpKind::Assignment]
    }

    fn check(&self, ctx: &RuleCtx<'_>, id: NodeId, out: &mut Vec<Finding>) {
        let node = ctx.program.node(id);
        let Op::Assignment { target, .. } = &node.op else {
            return;
        };
        let Op::PropertyReference { property, .. } = &ctx.program.node(*target).op else {
            return;
        };
        let prop = ctx.program.symbols.property(*property);
        if !ctx.catalog.is_parameter_property(ctx.program, *property) {
            return;
        }
        if !ctx
            .program
            .symbols
            .is_base_type_of(ctx.catalog.component_base, prop.containing_type)
        {
            return;
        }
        // Only writes from inside a component count; a service mutating
        // `someComponent.Count` is the owner's business, not this rule's.
        let Some(mid) = node.containing_method else {
            return;
        };
        let writer = ctx.program.symbols.method(mid);
        if !ctx
            .program
            .symbols
            .is_base_type_of(ctx.catalog.component_base, writer.containing_type)
        {
            return;
        }
        // The framework itself writes parameters through SetParametersAsync;
        // constructors run before the first write and may initialize freely.
        // The override check walks the chain, so an override routed through
        // an intermediate base class still counts.
        if writer.kind == MethodKind::Constructor {
            return;
        }
        if ctx
            .program
            .symbols
            .is_overridden_by(ctx.catalog.set_parameters_async, mid)
        {
            return;
        }
        out.push(
            Finding::new(&PARAMETER_MUTATION, ctx.program.location(id.unit, node.span))
                .with_arg(prop.name.clone()),
        );
    }
}

/// GA002 runs over property declarations rather than operation nodes: one
/// finding per companion-requiring attribute present without `[Parameter]`.
pub fn missing_parameter_attribute(ctx: &RuleCtx<'_>, out: &mut Vec<Finding>) {
    for (_, prop) in ctx.program.symbols.properties() {
        let Some((unit, span)) = prop.decl else {
            continue;
        };
        if prop
            .attributes
            .iter()
            .any(|&a| a == ctx.catalog.parameter_attribute)
        {
            continue;
        }
        for &attr in &prop.attributes {
            if attr != ctx.catalog.supply_parameter_from_query_attribute
                && attr != ctx.catalog.editor_required_attribute
            {
                continue;
            }
            let attr_name = &ctx.program.symbols.type_symbol(attr).name;
            let display = attr_name.strip_suffix("Attribute").unwrap_or(attr_name);
            out.push(
                Finding::new(&MISSING_PARAMETER_ATTRIBUTE, ctx.program.location(unit, span))
                    .with_arg(prop.name.clone())
                    .with_arg(display),
            );
        }
    }
}

/// GA004: JS interop dispatched while prerendering has no browser yet.
pub struct JsInteropInInitializer;

impl Rule for JsInteropInInitializer {
    fn meta(&self) -> &'static RuleMeta {
        &JS_INTEROP_IN_INITIALIZER
    }

    fn triggers(&self) -> &'static [OpKind] {
        &[OpKind::Invocation]
    }

    fn check(&self, ctx: &RuleCtx<'_>, id: NodeId, out: &mut Vec<Finding>) {
        let node = ctx.program.node(id);
        let Op::Invocation {
            method,
            receiver_type,
            ..
        } = &node.op
        else {
            return;
        };
        if *receiver_type != Some(ctx.catalog.js_runtime) {
            return;
        }
        let Some(enclosing) = node.containing_method else {
            return;
        };
        if !ctx
            .program
            .symbols
            .is_overridden_by(ctx.catalog.on_initialized_async, enclosing)
        {
            return;
        }
        let containing = ctx.program.symbols.method(enclosing).containing_type;
        if !ctx
            .program
            .symbols
            .is_base_type_of(ctx.catalog.component_base, containing)
        {
            return;
        }
        out.push(
            Finding::new(
                &JS_INTEROP_IN_INITIALIZER,
                ctx.program.location(id.unit, node.span),
            )
            .with_arg(ctx.program.symbols.method(*method).name.clone()),
        );
    }
}
