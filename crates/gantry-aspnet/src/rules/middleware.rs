//! Inline middleware detection.

use gantry_core::finding::{Finding, RuleId, RuleMeta, Severity};

use crate::dispatch::{Rule, RuleCtx};
use crate::program::{NodeId, Op, OpKind};

pub const INLINE_MIDDLEWARE: RuleMeta = RuleMeta {
    id: RuleId("GA013"),
    name: "inline-middleware",
    severity: Severity::Info,
    enabled_by_default: true,
    message: "Inline middleware can be extracted into a reusable middleware class",
};

/// GA013: a `Use` registration taking the two-parameter middleware delegate.
/// The extraction itself happens in the matching fixer.
pub struct InlineMiddleware;

impl Rule for InlineMiddleware {
    fn meta(&self) -> &'static RuleMeta {
        &INLINE_MIDDLEWARE
    }

    fn triggers(&self) -> &'static [OpKind] {
        &[OpKind::Invocation]
    }

    fn check(&self, ctx: &RuleCtx<'_>, id: NodeId, out: &mut Vec<Finding>) {
        let node = ctx.program.node(id);
        let Op::Invocation { method, .. } = &node.op else {
            return;
        };
        let m = ctx.program.symbols.method(*method);
        if m.name != "Use" || m.containing_type != ctx.catalog.use_extensions {
            return;
        }
        if m.params.len() != 2 || m.params[1].ty != Some(ctx.catalog.middleware_func) {
            return;
        }
        out.push(Finding::new(
            &INLINE_MIDDLEWARE,
            ctx.program.location(id.unit, node.span),
        ));
    }
}
