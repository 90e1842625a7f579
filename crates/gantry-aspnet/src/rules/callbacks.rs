//! Loop-variable capture in event callbacks.
//!
//! `for (var i = 0; i < n; i++) { register(factory.Create(() => Use(i))); }`
//! captures `i` by reference; every callback observes the final loop value
//! when it eventually runs. Detection is two ancestor walks: one from the
//! local's declaration up to a counting loop that owns it, one from the
//! reference up through the enclosing closure to the callback-factory call.

use gantry_core::finding::{Finding, RuleId, RuleMeta, Severity};

use crate::dispatch::{Rule, RuleCtx};
use crate::program::{DelegateTarget, LoopKind, NodeId, Op, OpKind, Program};

pub const LOOP_CAPTURE_IN_CALLBACK: RuleMeta = RuleMeta {
    id: RuleId("GA003"),
    name: "loop-capture-in-callback",
    severity: Severity::Warning,
    enabled_by_default: true,
    message: "Loop variable '{0}' is captured by a callback and will hold its final \
              value when the callback runs; copy it to a local first",
};

pub struct LoopCaptureInCallback;

impl Rule for LoopCaptureInCallback {
    fn meta(&self) -> &'static RuleMeta {
        &LOOP_CAPTURE_IN_CALLBACK
    }

    fn triggers(&self) -> &'static [OpKind] {
        &[OpKind::LocalReference]
    }

    fn check(&self, ctx: &RuleCtx<'_>, id: NodeId, out: &mut Vec<Finding>) {
        let node = ctx.program.node(id);
        let Op::LocalReference { local } = &node.op else {
            return;
        };
        let symbol = ctx.program.symbols.local(*local);
        let Some(decl) = symbol.decl_node else {
            return;
        };
        if !declared_by_counting_loop(ctx.program, decl) {
            return;
        }
        // The reference must sit inside a closure passed as an argument to
        // an EventCallbackFactory method.
        let Some(lambda) = ctx.program.first_ancestor_or_self(id, |n| {
            matches!(
                &n.op,
                Op::DelegateCreation {
                    target: DelegateTarget::Lambda { .. }
                }
            )
        }) else {
            return;
        };
        let Some(argument) = ctx.program.node(lambda).parent else {
            return;
        };
        if !matches!(ctx.program.node(argument).op, Op::Argument { .. }) {
            return;
        }
        let Some(call) = ctx.program.node(argument).parent else {
            return;
        };
        let Op::Invocation { method, .. } = &ctx.program.node(call).op else {
            return;
        };
        if ctx.program.symbols.method(*method).containing_type
            != ctx.catalog.event_callback_factory
        {
            return;
        }
        out.push(
            Finding::new(
                &LOOP_CAPTURE_IN_CALLBACK,
                ctx.program.location(id.unit, node.span),
            )
            .with_arg(symbol.name.clone()),
        );
    }
}

/// True when `decl` lives inside the declaration clause of a `for` loop
/// (not merely inside its body).
fn declared_by_counting_loop(program: &Program, decl: NodeId) -> bool {
    let mut current = Some(decl);
    while let Some(id) = current {
        let node = program.node(id);
        if let Some(parent) = node.parent {
            if let Op::Loop {
                kind: LoopKind::For,
                declaration: Some(d),
                ..
            } = &program.node(parent).op
            {
                if *d == id {
                    return true;
                }
            }
        }
        current = node.parent;
    }
    false
}
