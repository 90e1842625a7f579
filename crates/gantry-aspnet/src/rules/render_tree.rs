//! Render-tree key tracking.

use gantry_core::finding::{Finding, RuleId, RuleMeta, Severity};

use crate::dispatch::{Rule, RuleCtx};
use crate::program::{NodeId, Op, OpKind};

pub const LOOP_ELEMENT_MISSING_KEY: RuleMeta = RuleMeta {
    id: RuleId("GA005"),
    name: "loop-element-missing-key",
    severity: Severity::Warning,
    enabled_by_default: true,
    message: "Elements rendered in a loop should set a key so the renderer can \
              track them across updates",
};

/// GA005: a loop inside `BuildRenderTree` opens an element per iteration
/// without keying it.
///
/// The loop body's top-level statements drive a small stack machine over the
/// builder's `OpenElement`/`OpenComponent`, `CloseElement`/`CloseComponent`,
/// and `SetKey` calls. Opens push their kind; a close must match the kind on
/// top of the stack, and a mismatched or unbalanced close ends the scan.
/// Only a `SetKey` directly under the outermost open keys the iteration;
/// closing an unkeyed outermost element reports once at the loop and stops
/// scanning.
pub struct LoopElementMissingKey;

#[derive(PartialEq, Eq)]
enum Opened {
    Element,
    Component,
}

impl Rule for LoopElementMissingKey {
    fn meta(&self) -> &'static RuleMeta {
        &LOOP_ELEMENT_MISSING_KEY
    }

    fn triggers(&self) -> &'static [OpKind] {
        &[OpKind::Loop]
    }

    fn check(&self, ctx: &RuleCtx<'_>, id: NodeId, out: &mut Vec<Finding>) {
        let node = ctx.program.node(id);
        let Op::Loop { body, .. } = &node.op else {
            return;
        };
        let Some(enclosing) = node.containing_method else {
            return;
        };
        if ctx.program.symbols.method(enclosing).name != "BuildRenderTree" {
            return;
        }
        let Op::Block { statements } = &ctx.program.node(*body).op else {
            return;
        };

        let mut stack: Vec<Opened> = Vec::new();
        let mut outer_key_seen = false;
        for &stmt in statements {
            let Op::ExpressionStatement { expr } = &ctx.program.node(stmt).op else {
                continue;
            };
            let Op::Invocation { method, .. } = &ctx.program.node(*expr).op else {
                continue;
            };
            let m = ctx.program.symbols.method(*method);
            if m.containing_type != ctx.catalog.render_tree_builder {
                continue;
            }
            match m.name.as_str() {
                "OpenElement" => stack.push(Opened::Element),
                "OpenComponent" => stack.push(Opened::Component),
                "SetKey" if stack.len() == 1 => outer_key_seen = true,
                close @ ("CloseElement" | "CloseComponent") => {
                    let expected = if close == "CloseElement" {
                        Opened::Element
                    } else {
                        Opened::Component
                    };
                    // Unbalanced or kind-mismatched closes mean the body is
                    // not the straight-line shape this scan understands.
                    match stack.pop() {
                        Some(opened) if opened == expected => {}
                        _ => return,
                    }
                    if stack.is_empty() {
                        if !outer_key_seen {
                            out.push(Finding::new(
                                &LOOP_ELEMENT_MISSING_KEY,
                                ctx.program.location(id.unit, node.span),
                            ));
                            return;
                        }
                        outer_key_seen = false;
                    }
                }
                _ => {}
            }
        }
    }
}
