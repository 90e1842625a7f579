//! End-to-end detection tests: build a program through the testkit, run a
//! full analysis session, assert on the findings.

use gantry_aspnet::dispatch::{analyze, AnalysisOptions, CancelFlag};
use gantry_aspnet::program::{
    DelegateTarget, LoopKind, MethodId, NodeId, Op, ParamSymbol, RefKind, TypeId,
};
use gantry_aspnet::testkit::{Framework, ProgramBuilder};
use gantry_core::finding::Finding;
use gantry_core::patch::{Span, UnitId};

fn run(builder: ProgramBuilder) -> Vec<Finding> {
    analyze(
        &builder.build(),
        &AnalysisOptions::default(),
        &CancelFlag::new(),
    )
}

fn by_rule<'a>(findings: &'a [Finding], id: &str) -> Vec<&'a Finding> {
    findings.iter().filter(|f| f.rule.0 == id).collect()
}

// ============================================================================
// Fail-closed catalog
// ============================================================================

#[test]
fn program_without_framework_reference_yields_no_findings() {
    let mut b = ProgramBuilder::new();
    let ty = b.class("Plain", "App.Plain");
    let m = b.add_method(ty, "Run");
    let unit = b.add_unit("Plain.cs");
    let line = b.line(unit, "x = 1;");
    let target = b.node(unit, line.span_of("x"), Op::Other);
    let value = b.node(unit, line.span_of("1"), Op::Other);
    b.node_in(unit, line.span(), Op::Assignment { target, value }, m);
    assert!(run(b).is_empty());
}

// ============================================================================
// GA001 component parameter mutation
// ============================================================================

enum Enclosing {
    OrdinaryMethod,
    Constructor,
    TransitiveOverride,
}

fn parameter_mutation_program(enclosing: Enclosing) -> ProgramBuilder {
    let mut b = ProgramBuilder::new();
    let fx = b.with_framework();

    let intermediate = b.class("BaseComponent", "App.BaseComponent");
    b.derive(intermediate, fx.component_base);
    let mid_override = b.add_method(intermediate, "SetParametersAsync");
    b.override_of(mid_override, fx.set_parameters_async);

    let counter = b.class("Counter", "App.Counter");
    b.derive(counter, intermediate);
    let count = b.add_property(counter, "Count");
    b.prop_attr(count, fx.parameter_attribute);

    let method = match enclosing {
        Enclosing::OrdinaryMethod => b.add_method(counter, "Increment"),
        Enclosing::Constructor => {
            let ctor = b.add_method(counter, "Counter");
            b.mark_constructor(ctor);
            ctor
        }
        Enclosing::TransitiveOverride => {
            let m = b.add_method(counter, "SetParametersAsync");
            b.override_of(m, mid_override);
            m
        }
    };

    let unit = b.add_unit("Counter.cs");
    let line = b.line(unit, "Count = Count + 1;");
    let target = b.node(
        unit,
        line.span_of("Count"),
        Op::PropertyReference {
            property: count,
            argument: None,
        },
    );
    let value = b.node(unit, line.span_of("Count + 1"), Op::Other);
    b.node_in(unit, line.span(), Op::Assignment { target, value }, method);
    b
}

#[test]
fn parameter_assignment_in_ordinary_method_is_flagged() {
    let findings = run(parameter_mutation_program(Enclosing::OrdinaryMethod));
    let hits = by_rule(&findings, "GA001");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].message_args, ["Count"]);
}

#[test]
fn parameter_assignment_from_outside_a_component_is_quiet() {
    let mut b = ProgramBuilder::new();
    let fx = b.with_framework();
    let counter = b.class("Counter", "App.Counter");
    b.derive(counter, fx.component_base);
    let count = b.add_property(counter, "Count");
    b.prop_attr(count, fx.parameter_attribute);

    // A plain service writing through a component reference.
    let service = b.class("CounterService", "App.CounterService");
    let reset = b.add_method(service, "Reset");
    let unit = b.add_unit("CounterService.cs");
    let line = b.line(unit, "component.Count = 0;");
    let target = b.node(
        unit,
        line.span_of("component.Count"),
        Op::PropertyReference {
            property: count,
            argument: None,
        },
    );
    let value = b.node(unit, line.span_of("0"), Op::Other);
    b.node_in(unit, line.span(), Op::Assignment { target, value }, reset);

    assert!(by_rule(&run(b), "GA001").is_empty());
}

#[test]
fn parameter_assignment_in_constructor_is_permitted() {
    let findings = run(parameter_mutation_program(Enclosing::Constructor));
    assert!(by_rule(&findings, "GA001").is_empty());
}

#[test]
fn parameter_assignment_in_transitive_override_is_permitted() {
    let findings = run(parameter_mutation_program(Enclosing::TransitiveOverride));
    assert!(by_rule(&findings, "GA001").is_empty());
}

// ============================================================================
// GA002 missing parameter attribute
// ============================================================================

#[test]
fn companion_attributes_without_parameter_report_per_attribute() {
    let mut b = ProgramBuilder::new();
    let fx = b.with_framework();
    let comp = b.class("Search", "App.Search");
    b.derive(comp, fx.component_base);

    let unit = b.add_unit("Search.cs");
    let line = b.line(unit, "    public string? Query { get; set; }");
    let query = b.add_property(comp, "Query");
    b.prop_attr(query, fx.supply_parameter_from_query_attribute);
    b.prop_attr(query, fx.editor_required_attribute);
    b.property_decl(query, unit, line.span());

    let findings = run(b);
    let hits = by_rule(&findings, "GA002");
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|f| f.message_args[0] == "Query"));
}

#[test]
fn companion_attribute_with_parameter_is_quiet() {
    let mut b = ProgramBuilder::new();
    let fx = b.with_framework();
    let comp = b.class("Search", "App.Search");
    let unit = b.add_unit("Search.cs");
    let line = b.line(unit, "    public string? Query { get; set; }");
    let query = b.add_property(comp, "Query");
    b.prop_attr(query, fx.supply_parameter_from_query_attribute);
    b.prop_attr(query, fx.parameter_attribute);
    b.property_decl(query, unit, line.span());
    assert!(by_rule(&run(b), "GA002").is_empty());
}

// ============================================================================
// GA003 loop capture in callback
// ============================================================================

fn loop_capture_program(copy_first: bool) -> ProgramBuilder {
    let mut b = ProgramBuilder::new();
    let fx = b.with_framework();
    let comp = b.class("List", "App.List");
    b.derive(comp, fx.component_base);
    let method = b.add_method(comp, "Render");

    let unit = b.add_unit("List.cs");
    let l1 = b.line(unit, "for (var i = 0; i < 10; i++)");
    let l2 = b.line(unit, "{");
    let l3 = b.line(unit, "    var copy = i;");
    let l4 = b.line(unit, "    factory.Create(() => Use(i));");
    let l5 = b.line(unit, "}");

    let i = b.add_local("i");
    let decl = b.node(
        unit,
        l1.span_of("var i = 0"),
        Op::LocalDeclaration {
            local: i,
            initializer: None,
        },
    );
    b.set_local_decl(i, decl);

    let copy = b.add_local("copy");
    let copy_decl = b.node(
        unit,
        l3.span_of("var copy = i"),
        Op::LocalDeclaration {
            local: copy,
            initializer: None,
        },
    );
    b.set_local_decl(copy, copy_decl);

    let captured = if copy_first { copy } else { i };
    let use_span = l4.span_of("(i)");
    let reference = b.node(
        unit,
        Span::new(use_span.start + 1, use_span.end - 1),
        Op::LocalReference { local: captured },
    );
    let lambda = b.lambda(unit, l4.span_of("() => Use(i)"), Vec::new(), reference);
    let arg = b.argument(lambda);
    let create = b.node(
        unit,
        l4.span_of("factory.Create(() => Use(i))"),
        Op::Invocation {
            method: fx.callback_create,
            receiver: None,
            receiver_type: Some(fx.event_callback_factory),
            args: vec![arg],
        },
    );
    let stmt = b.node(unit, l4.span(), Op::ExpressionStatement { expr: create });

    let body = b.node(
        unit,
        Span::new(l2.span().start, l5.span().end),
        Op::Block {
            statements: vec![copy_decl, stmt],
        },
    );
    let loop_span = Span::new(l1.span().start, l5.span().end);
    b.node_in(
        unit,
        loop_span,
        Op::Loop {
            kind: LoopKind::For,
            declaration: Some(decl),
            body,
        },
        method,
    );
    b
}

#[test]
fn loop_variable_captured_in_callback_is_flagged() {
    let findings = run(loop_capture_program(false));
    let hits = by_rule(&findings, "GA003");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].message_args, ["i"]);
}

#[test]
fn copied_loop_variable_is_not_flagged() {
    let findings = run(loop_capture_program(true));
    assert!(by_rule(&findings, "GA003").is_empty());
}

// ============================================================================
// GA004 JS interop in initializer
// ============================================================================

#[test]
fn js_interop_during_initialization_is_flagged() {
    let mut b = ProgramBuilder::new();
    let fx = b.with_framework();
    let comp = b.class("Clock", "App.Clock");
    b.derive(comp, fx.component_base);
    let init = b.add_method(comp, "OnInitializedAsync");
    b.override_of(init, fx.on_initialized_async);

    let unit = b.add_unit("Clock.cs");
    let line = b.line(unit, "await JS.InvokeAsync<string>(\"now\");");
    b.node_in(
        unit,
        line.span(),
        Op::Invocation {
            method: fx.js_invoke,
            receiver: None,
            receiver_type: Some(fx.js_runtime),
            args: vec![],
        },
        init,
    );

    let findings = run(b);
    let hits = by_rule(&findings, "GA004");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].message_args, ["InvokeAsync"]);
}

#[test]
fn js_interop_outside_initialization_is_quiet() {
    let mut b = ProgramBuilder::new();
    let fx = b.with_framework();
    let comp = b.class("Clock", "App.Clock");
    b.derive(comp, fx.component_base);
    let after = b.add_method(comp, "OnAfterRenderAsync");

    let unit = b.add_unit("Clock.cs");
    let line = b.line(unit, "await JS.InvokeAsync<string>(\"now\");");
    b.node_in(
        unit,
        line.span(),
        Op::Invocation {
            method: fx.js_invoke,
            receiver: None,
            receiver_type: Some(fx.js_runtime),
            args: vec![],
        },
        after,
    );
    assert!(by_rule(&run(b), "GA004").is_empty());
}

// ============================================================================
// GA005 loop element missing key
// ============================================================================

fn render_loop_program(with_key: bool) -> ProgramBuilder {
    let mut b = ProgramBuilder::new();
    let fx = b.with_framework();
    let comp = b.class("ItemList", "App.ItemList");
    b.derive(comp, fx.component_base);
    let render = b.add_method(comp, "BuildRenderTree");

    let unit = b.add_unit("ItemList.cs");
    let l1 = b.line(unit, "for (var i = 0; i < items.Count; i++)");
    let l2 = b.line(unit, "{");
    let open_line = b.line(unit, "    builder.OpenElement(0, \"li\");");
    let key_line = b.line(unit, "    builder.SetKey(items[i]);");
    let close_line = b.line(unit, "    builder.CloseElement();");
    let l6 = b.line(unit, "}");

    let stmt = |b: &mut ProgramBuilder, line: &gantry_aspnet::testkit::LineCursor, m: MethodId| {
        let call = b.node(
            unit,
            line.span(),
            Op::Invocation {
                method: m,
                receiver: None,
                receiver_type: Some(fx.render_tree_builder),
                args: vec![],
            },
        );
        b.node(unit, line.span(), Op::ExpressionStatement { expr: call })
    };
    let mut statements = vec![stmt(&mut b, &open_line, fx.open_element)];
    if with_key {
        statements.push(stmt(&mut b, &key_line, fx.set_key));
    }
    statements.push(stmt(&mut b, &close_line, fx.close_element));

    let body = b.node(
        unit,
        Span::new(l2.span().start, l6.span().end),
        Op::Block { statements },
    );
    b.node_in(
        unit,
        Span::new(l1.span().start, l6.span().end),
        Op::Loop {
            kind: LoopKind::For,
            declaration: None,
            body,
        },
        render,
    );
    b
}

#[test]
fn keyed_loop_element_is_quiet() {
    assert!(by_rule(&run(render_loop_program(true)), "GA005").is_empty());
}

#[test]
fn unkeyed_loop_element_reports_once_at_the_loop() {
    let findings = run(render_loop_program(false));
    let hits = by_rule(&findings, "GA005");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].location.line, 1);
    assert_eq!(hits[0].location.col, 1);
}

#[test]
fn mismatched_close_ends_the_key_scan() {
    let mut b = ProgramBuilder::new();
    let fx = b.with_framework();
    let comp = b.class("ItemList", "App.ItemList");
    b.derive(comp, fx.component_base);
    let render = b.add_method(comp, "BuildRenderTree");

    let unit = b.add_unit("ItemList.cs");
    let l1 = b.line(unit, "for (var i = 0; i < items.Count; i++)");
    let l2 = b.line(unit, "{");
    let open_line = b.line(unit, "    builder.OpenElement(0, \"li\");");
    let close_line = b.line(unit, "    builder.CloseComponent();");
    let l5 = b.line(unit, "}");

    let stmt = |b: &mut ProgramBuilder, line: &gantry_aspnet::testkit::LineCursor, m: MethodId| {
        let call = b.node(
            unit,
            line.span(),
            Op::Invocation {
                method: m,
                receiver: None,
                receiver_type: Some(fx.render_tree_builder),
                args: vec![],
            },
        );
        b.node(unit, line.span(), Op::ExpressionStatement { expr: call })
    };
    // CloseComponent against OpenElement: not the straight-line shape the
    // scan understands, so no finding even without a key.
    let statements = vec![
        stmt(&mut b, &open_line, fx.open_element),
        stmt(&mut b, &close_line, fx.close_component),
    ];
    let body = b.node(
        unit,
        Span::new(l2.span().start, l5.span().end),
        Op::Block { statements },
    );
    b.node_in(
        unit,
        Span::new(l1.span().start, l5.span().end),
        Op::Loop {
            kind: LoopKind::For,
            declaration: None,
            body,
        },
        render,
    );
    assert!(by_rule(&run(b), "GA005").is_empty());
}

// ============================================================================
// Route handler scenarios
// ============================================================================

#[allow(clippy::too_many_arguments)]
fn register_route(
    b: &mut ProgramBuilder,
    map: MethodId,
    unit: UnitId,
    source_line: &str,
    pattern: &str,
    params: Vec<ParamSymbol>,
    body: NodeId,
    return_type: Option<TypeId>,
) -> NodeId {
    let line = b.line(unit, source_line);
    let recv = b.node(unit, line.span_of("app"), Op::Other);
    let recv_value = b.node(unit, line.span_of("app"), Op::Other);
    let recv_arg = b.argument(recv_value);
    let lit = b.node(
        unit,
        line.span_of(pattern),
        Op::StringLiteral {
            value: pattern.to_string(),
        },
    );
    let pattern_arg = b.argument(lit);
    let lambda = b.node(
        unit,
        line.span(),
        Op::DelegateCreation {
            target: DelegateTarget::Lambda {
                params,
                body,
                return_type,
            },
        },
    );
    let delegate_arg = b.argument(lambda);
    b.node(
        unit,
        line.span(),
        Op::Invocation {
            method: map,
            receiver: Some(recv),
            receiver_type: None,
            args: vec![recv_arg, pattern_arg, delegate_arg],
        },
    )
}

fn empty_body(b: &mut ProgramBuilder, unit: UnitId) -> NodeId {
    b.node(
        unit,
        Span::new(0, 0),
        Op::Block {
            statements: vec![],
        },
    )
}

#[test]
fn service_locator_in_handler_reports_at_the_delegate() {
    let mut b = ProgramBuilder::new();
    let fx = b.with_framework();
    let unit = b.add_unit("Program.cs");
    let locate = b.node(
        unit,
        Span::new(0, 0),
        Op::Invocation {
            method: fx.spe_get_required_service,
            receiver: None,
            receiver_type: None,
            args: vec![],
        },
    );
    let stmt = b.node(unit, Span::new(0, 0), Op::ExpressionStatement { expr: locate });
    let body = b.node(
        unit,
        Span::new(0, 0),
        Op::Block {
            statements: vec![stmt],
        },
    );
    register_route(
        &mut b,
        fx.map_get,
        unit,
        "app.MapGet(\"/todos\", () => sp.GetRequiredService<Db>().All());",
        "/todos",
        vec![],
        body,
        None,
    );
    let findings = run(b);
    let hits = by_rule(&findings, "GA006");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].message_args, ["GetRequiredService"]);
}

#[test]
fn handler_parameter_modifier_is_flagged_with_fixer_spans() {
    let mut b = ProgramBuilder::new();
    let fx = b.with_framework();
    let unit = b.add_unit("Program.cs");
    let body = empty_body(&mut b, unit);
    let source = "app.MapGet(\"/todos\", (out int id) => Results.Ok());";
    // The registration occupies the first line, so line offsets are unit
    // offsets.
    let out_at = source.find("out int id").map(|i| i as u64).unwrap_or(0);
    let params = vec![ParamSymbol {
        name: "id".into(),
        ty: None,
        ref_kind: RefKind::Out,
        decl: Some((unit, Span::new(out_at, out_at + "out int id".len() as u64))),
        modifier_span: Some((unit, Span::new(out_at, out_at + "out ".len() as u64))),
    }];
    register_route(&mut b, fx.map_get, unit, source, "/todos", params, body, None);

    let findings = run(b);
    let hits = by_rule(&findings, "GA007");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].message_args, ["id"]);
    assert!(hits[0].property("modifierStart").is_some());
    assert!(hits[0].property("modifierEnd").is_some());
}

#[test]
fn ref_like_return_reports_each_return_statement() {
    let mut b = ProgramBuilder::new();
    let fx = b.with_framework();
    let span_ty = b.class("Span`1", "System.Span`1");
    b.mark_ref_like(span_ty);
    let unit = b.add_unit("Program.cs");
    let value = b.node(unit, Span::new(0, 0), Op::Other);
    let ret = b.node(
        unit,
        Span::new(0, 0),
        Op::Return {
            value: Some(value),
            value_type: Some(span_ty),
        },
    );
    let body = b.node(
        unit,
        Span::new(0, 0),
        Op::Block {
            statements: vec![ret],
        },
    );
    register_route(
        &mut b,
        fx.map_get,
        unit,
        "app.MapGet(\"/raw\", Span<byte> () => { return buffer; });",
        "/raw",
        vec![],
        body,
        Some(span_ty),
    );
    let findings = run(b);
    let hits = by_rule(&findings, "GA008");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].message_args, ["Span`1"]);
}

#[test]
fn ref_like_expression_bodied_handler_reports_at_the_delegate() {
    let mut b = ProgramBuilder::new();
    let fx = b.with_framework();
    let span_ty = b.class("Span`1", "System.Span`1");
    b.mark_ref_like(span_ty);
    let unit = b.add_unit("Program.cs");
    let expr = b.node(unit, Span::new(0, 0), Op::Other);
    register_route(
        &mut b,
        fx.map_get,
        unit,
        "app.MapGet(\"/raw\", Span<byte> () => buffer);",
        "/raw",
        vec![],
        expr,
        Some(span_ty),
    );
    let findings = run(b);
    assert_eq!(by_rule(&findings, "GA008").len(), 1);
}

#[test]
fn route_value_indexing_carries_the_literal_key() {
    let mut b = ProgramBuilder::new();
    let fx = b.with_framework();
    let unit = b.add_unit("Program.cs");
    let key = b.node(
        unit,
        Span::new(0, 0),
        Op::StringLiteral { value: "id".into() },
    );
    let access = b.node(
        unit,
        Span::new(0, 0),
        Op::PropertyReference {
            property: fx.route_values_indexer,
            argument: Some(key),
        },
    );
    let body = b.node(
        unit,
        Span::new(0, 0),
        Op::Block {
            statements: vec![access],
        },
    );
    register_route(
        &mut b,
        fx.map_get,
        unit,
        "app.MapGet(\"/todos/{id}\", (HttpContext ctx) => ctx.Request.RouteValues[\"id\"]);",
        "/todos/{id}",
        vec![],
        body,
        None,
    );
    let findings = run(b);
    let hits = by_rule(&findings, "GA009");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].property("paramName"), Some("id"));
}

// ============================================================================
// GA010 duplicate route prefix
// ============================================================================

#[test]
fn shared_route_prefix_reports_at_every_member() {
    let mut b = ProgramBuilder::new();
    let fx = b.with_framework();
    let unit = b.add_unit("Program.cs");
    for pattern in ["/a/1", "/a/2", "/b/1"] {
        let body = empty_body(&mut b, unit);
        let source = format!("app.MapGet(\"{pattern}\", () => Results.Ok());");
        register_route(&mut b, fx.map_get, unit, &source, pattern, vec![], body, None);
    }
    let findings = run(b);
    let hits = by_rule(&findings, "GA010");
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|f| f.property("prefix") == Some("a")));
}

// ============================================================================
// GA011 endpoint name suggestion
// ============================================================================

fn suggestion_for(map: fn(&Framework) -> MethodId, pattern: &str) -> Option<String> {
    let mut b = ProgramBuilder::new();
    let fx = b.with_framework();
    let unit = b.add_unit("Program.cs");
    let body = empty_body(&mut b, unit);
    let source = format!("app.MapX(\"{pattern}\", () => Results.Ok());");
    register_route(&mut b, map(&fx), unit, &source, pattern, vec![], body, None);
    let findings = run(b);
    by_rule(&findings, "GA011")
        .first()
        .and_then(|f| f.property("SuggestedApiName"))
        .map(str::to_string)
}

#[test]
fn endpoint_names_follow_verb_noun_convention() {
    assert_eq!(
        suggestion_for(|fx| fx.map_get, "/todos"),
        Some("GetTodos".into())
    );
    assert_eq!(
        suggestion_for(|fx| fx.map_get, "/todos/{id}"),
        Some("GetTodosById".into())
    );
    assert_eq!(
        suggestion_for(|fx| fx.map_post, "/todos"),
        Some("CreateTodo".into())
    );
}

#[test]
fn chained_with_name_suppresses_the_suggestion() {
    let mut b = ProgramBuilder::new();
    let fx = b.with_framework();
    let unit = b.add_unit("Program.cs");
    let body = empty_body(&mut b, unit);
    let call = register_route(
        &mut b,
        fx.map_get,
        unit,
        "app.MapGet(\"/todos\", () => Results.Ok()).WithName(\"GetTodos\");",
        "/todos",
        vec![],
        body,
        None,
    );
    b.node(
        unit,
        Span::new(0, 0),
        Op::Invocation {
            method: fx.with_name,
            receiver: Some(call),
            receiver_type: None,
            args: vec![],
        },
    );
    assert!(by_rule(&run(b), "GA011").is_empty());
}

// ============================================================================
// GA012 health-check coverage
// ============================================================================

fn controller_program(covered: bool) -> ProgramBuilder {
    let mut b = ProgramBuilder::new();
    let fx = b.with_framework();
    let controller = b.class("TodoController", "App.TodoController");
    let get = b.add_method(controller, "GetTodos");
    b.add_attr(get, fx.http_get_attribute);

    let unit = b.add_unit("TodoController.cs");
    let line = b.line(unit, "public IActionResult GetTodos() => Ok(store.All());");
    b.method_decl(get, unit, line.span());

    if covered {
        let check = b.class("GetTodosTodoHealthCheck", "App.GetTodosTodoHealthCheck");
        b.implement(check, fx.health_check_interface);
    }
    b
}

#[test]
fn uncovered_http_endpoint_reports_the_derived_name() {
    let findings = run(controller_program(false));
    let hits = by_rule(&findings, "GA012");
    assert_eq!(hits.len(), 1);
    assert_eq!(
        hits[0].property("healthCheckName"),
        Some("GetTodosTodoHealthCheck")
    );
    assert_eq!(hits[0].property("methodName"), Some("GetTodos"));
}

#[test]
fn same_named_health_check_covers_the_endpoint() {
    let findings = run(controller_program(true));
    assert!(by_rule(&findings, "GA012").is_empty());
}

// ============================================================================
// GA013 inline middleware
// ============================================================================

#[test]
fn inline_middleware_registration_is_flagged() {
    let mut b = ProgramBuilder::new();
    let fx = b.with_framework();
    let unit = b.add_unit("Program.cs");
    let line = b.line(unit, "app.Use(async (context, next) => await next(context));");
    b.node(
        unit,
        line.span(),
        Op::Invocation {
            method: fx.use_method,
            receiver: None,
            receiver_type: None,
            args: vec![],
        },
    );
    assert_eq!(by_rule(&run(b), "GA013").len(), 1);
}

// ============================================================================
// Session controls
// ============================================================================

#[test]
fn cancelled_session_returns_no_findings() {
    let b = controller_program(false);
    let cancel = CancelFlag::new();
    cancel.cancel();
    let findings = analyze(&b.build(), &AnalysisOptions::default(), &cancel);
    assert!(findings.is_empty());
}

#[test]
fn disabled_rules_are_skipped() {
    let mut b = ProgramBuilder::new();
    let fx = b.with_framework();
    let unit = b.add_unit("Program.cs");
    let body = empty_body(&mut b, unit);
    register_route(
        &mut b,
        fx.map_get,
        unit,
        "app.MapGet(\"/todos\", () => Results.Ok());",
        "/todos",
        vec![],
        body,
        None,
    );
    let mut options = AnalysisOptions::default();
    options.disabled_rules.insert("GA011".into());
    let findings = analyze(&b.build(), &options, &CancelFlag::new());
    assert!(by_rule(&findings, "GA011").is_empty());
}

#[test]
fn findings_serialize_for_host_reporting() {
    let findings = run(controller_program(false));
    let json = serde_json::to_value(&findings).expect("findings serialize");
    let first = &json.as_array().expect("array")[0];
    assert_eq!(first["rule"], "GA012");
    assert_eq!(first["severity"], "info");
    assert_eq!(first["location"]["file"], "TodoController.cs");
    assert_eq!(first["properties"]["healthCheckName"], "GetTodosTodoHealthCheck");
}

#[test]
fn findings_are_sorted_by_file_offset_and_rule() {
    let findings = run(render_loop_program(false));
    let mut sorted = findings.clone();
    sorted.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    assert_eq!(findings, sorted);
}
