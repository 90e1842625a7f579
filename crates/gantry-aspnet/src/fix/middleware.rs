//! GA013 fixer: extract inline middleware into a class.
//!
//! `app.Use(async (context, next) => { … })` becomes a synthesized
//! middleware class plus a companion extension class appended to the same
//! unit, with the call site rewritten to `app.UseMiddleware1()`. Captured
//! outer locals are not hoisted into the constructor; a closure that
//! captures produces code the author must finish by hand.

use gantry_core::finding::{Finding, RuleId};
use gantry_core::patch::{Anchor, Edit, PatchSet, Span};

use crate::fix::{finding_span, finding_unit, Fixer};
use crate::program::{DelegateTarget, NodeId, Op, OpKind, Program, Unit};
use crate::rules::middleware::INLINE_MIDDLEWARE;

pub struct ExtractMiddleware;

impl Fixer for ExtractMiddleware {
    fn rule(&self) -> RuleId {
        INLINE_MIDDLEWARE.id
    }

    fn fix(&self, finding: &Finding, program: &Program) -> PatchSet {
        build(finding, program).unwrap_or_default()
    }
}

fn build(finding: &Finding, program: &Program) -> Option<PatchSet> {
    let unit = finding_unit(finding, program)?;
    let span = finding_span(finding)?;
    let call = program.find_node_at(unit.id, span, OpKind::Invocation)?;
    let Op::Invocation { receiver, args, .. } = &program.node(call).op else {
        return None;
    };
    let receiver_text = program.node_text((*receiver)?);
    let delegate = args
        .get(1)
        .map(|&arg| program.descendants(arg))?
        .into_iter()
        .find(|&d| matches!(program.node(d).op, Op::DelegateCreation { .. }))?;
    let Op::DelegateCreation {
        target: DelegateTarget::Lambda { params, body, .. },
    } = &program.node(delegate).op
    else {
        return None;
    };

    let context_param = params.first().map(|p| p.name.as_str()).unwrap_or("context");
    let next_param = params.get(1).map(|p| p.name.as_str());
    let name = fresh_class_name(program);

    let invoke_body = invoke_body_lines(program, *body, next_param);
    let members = render_members(&name, context_param, &invoke_body);

    let call_span = program.node(call).span;
    let rewrite = Edit::replace(
        0,
        unit.id,
        Anchor::at(call_span, &unit.source),
        format!("{receiver_text}.Use{name}()"),
    )
    .with_rule(INLINE_MIDDLEWARE.id.0);
    let append = Edit::insert(
        1,
        unit.id,
        Anchor::at(end_of_unit(unit), &unit.source),
        members,
    )
    .with_rule(INLINE_MIDDLEWARE.id.0);

    Some(PatchSet::new().with_edit(rewrite).with_edit(append))
}

/// First `Middleware{n}` (n from 1) where neither the class nor its
/// companion extension class collides with a declared type name.
fn fresh_class_name(program: &Program) -> String {
    for n in 1u32.. {
        let candidate = format!("Middleware{n}");
        let extensions = format!("{candidate}Extensions");
        let taken = program
            .symbols
            .types()
            .any(|(_, t)| t.name == candidate || t.name == extensions);
        if !taken {
            return candidate;
        }
    }
    unreachable!("type name space exhausted")
}

/// The statements of the synthesized `Invoke` method, unindented.
///
/// A block-bodied closure contributes its statements verbatim; an
/// expression-bodied one is wrapped in a `return`. When the closure named a
/// continuation parameter, a local aliasing the `_next` field keeps the
/// copied body compiling unchanged.
fn invoke_body_lines(program: &Program, body: NodeId, next_param: Option<&str>) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(next) = next_param {
        lines.push(format!("var {next} = _next;"));
    }
    let text = program.node_text(body);
    match &program.node(body).op {
        Op::Block { .. } => {
            let inner = text
                .trim()
                .strip_prefix('{')
                .and_then(|t| t.strip_suffix('}'))
                .unwrap_or(text);
            for line in inner.lines() {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    lines.push(trimmed.to_string());
                }
            }
        }
        _ => lines.push(format!("return {};", text.trim())),
    }
    lines
}

fn render_members(name: &str, context_param: &str, invoke_body: &[String]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "\n\ninternal class {name}\n{{\n    private readonly RequestDelegate _next;\n\n    \
         public {name}(RequestDelegate next)\n    {{\n        _next = next;\n    }}\n\n    \
         public Task Invoke(HttpContext {context_param})\n    {{\n"
    ));
    for line in invoke_body {
        out.push_str("        ");
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(&format!(
        "    }}\n}}\n\ninternal static class {name}Extensions\n{{\n    \
         public static IApplicationBuilder Use{name}(this IApplicationBuilder builder)\n    \
         {{\n        return builder.UseMiddleware<{name}>();\n    }}\n}}\n"
    ));
    out
}

fn end_of_unit(unit: &Unit) -> Span {
    let end = unit.source.len() as u64;
    Span::new(end, end)
}
