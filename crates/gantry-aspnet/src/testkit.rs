//! Program construction support for tests.
//!
//! Rules consume a host-supplied semantic tree, so test inputs are built
//! here rather than parsed. `ProgramBuilder` accumulates symbols and units;
//! source text grows line by line, and each appended line hands back a
//! cursor that turns substrings into byte spans. Node creation wires parent
//! links automatically from the operation's child list.

use gantry_core::patch::{Span, UnitId};

use crate::program::{
    DelegateTarget, LocalId, LocalSymbol, MethodId, MethodKind, MethodSymbol, Node, NodeId, Op,
    ParamSymbol, Program, PropertyId, PropertySymbol, SymbolTable, TypeId, TypeSymbol, Unit,
};

// ============================================================================
// Framework handles
// ============================================================================

/// Symbol handles for the framework surface registered by
/// [`ProgramBuilder::with_framework`].
#[derive(Debug, Clone)]
pub struct Framework {
    pub component_base: TypeId,
    pub set_parameters_async: MethodId,
    pub on_initialized_async: MethodId,
    pub parameter_attribute: TypeId,
    pub cascading_parameter_attribute: TypeId,
    pub supply_parameter_from_query_attribute: TypeId,
    pub editor_required_attribute: TypeId,
    pub js_runtime: TypeId,
    pub js_invoke: MethodId,
    pub event_callback_factory: TypeId,
    pub callback_create: MethodId,
    pub render_tree_builder: TypeId,
    pub open_element: MethodId,
    pub open_component: MethodId,
    pub close_element: MethodId,
    pub close_component: MethodId,
    pub set_key: MethodId,
    pub endpoint_route_builder_extensions: TypeId,
    pub map_get: MethodId,
    pub map_post: MethodId,
    pub map_put: MethodId,
    pub map_delete: MethodId,
    pub with_name: MethodId,
    pub delegate_type: TypeId,
    pub service_provider: TypeId,
    pub sp_get_service: MethodId,
    pub service_provider_extensions: TypeId,
    pub spe_get_service: MethodId,
    pub spe_get_required_service: MethodId,
    pub route_value_dictionary: TypeId,
    pub route_values_indexer: PropertyId,
    pub endpoint_name_attribute: TypeId,
    pub use_extensions: TypeId,
    pub use_method: MethodId,
    pub middleware_func: TypeId,
    pub health_check_interface: TypeId,
    pub http_method_attribute: TypeId,
    pub http_get_attribute: TypeId,
    pub http_post_attribute: TypeId,
    pub http_context: TypeId,
    pub request_delegate: TypeId,
    pub task_type: TypeId,
}

// ============================================================================
// Line cursor
// ============================================================================

/// A just-appended source line; resolves substrings to unit byte spans.
#[derive(Debug, Clone)]
pub struct LineCursor {
    unit: UnitId,
    start: u64,
    text: String,
}

impl LineCursor {
    /// The unit this line belongs to.
    pub fn unit(&self) -> UnitId {
        self.unit
    }

    /// Span of the whole line, without the trailing newline.
    pub fn span(&self) -> Span {
        Span::new(self.start, self.start + self.text.len() as u64)
    }

    /// Span of the first occurrence of `needle` within this line.
    ///
    /// Panics when absent; a miss is a broken test fixture.
    pub fn span_of(&self, needle: &str) -> Span {
        let at = self
            .text
            .find(needle)
            .unwrap_or_else(|| panic!("{needle:?} not found in line {:?}", self.text));
        let start = self.start + at as u64;
        Span::new(start, start + needle.len() as u64)
    }
}

// ============================================================================
// Program builder
// ============================================================================

/// Accumulates symbols, units, source text, and operation nodes, then
/// freezes them into an immutable [`Program`].
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    units: Vec<Unit>,
    symbols: SymbolTable,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        ProgramBuilder::default()
    }

    /// Freeze into a program snapshot.
    pub fn build(self) -> Program {
        Program {
            units: self.units,
            symbols: self.symbols,
        }
    }

    // ------------------------------------------------------------------
    // Units and source text
    // ------------------------------------------------------------------

    /// Add an empty compilation unit.
    pub fn add_unit(&mut self, path: impl Into<String>) -> UnitId {
        let id = UnitId(self.units.len() as u32);
        self.units.push(Unit {
            id,
            path: path.into(),
            source: String::new(),
            nodes: Vec::new(),
        });
        id
    }

    /// Append one line of source text (a newline is added) and return a
    /// cursor for span derivation.
    pub fn line(&mut self, unit: UnitId, text: &str) -> LineCursor {
        let u = &mut self.units[unit.0 as usize];
        let start = u.source.len() as u64;
        u.source.push_str(text);
        u.source.push('\n');
        LineCursor {
            unit,
            start,
            text: text.to_string(),
        }
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    /// Add a node with no enclosing method. Children named by `op` get
    /// their parent link pointed at the new node.
    pub fn node(&mut self, unit: UnitId, span: Span, op: Op) -> NodeId {
        let children = op.children();
        let u = &mut self.units[unit.0 as usize];
        let id = NodeId {
            unit,
            index: u.nodes.len() as u32,
        };
        u.nodes.push(Node {
            parent: None,
            span,
            containing_method: None,
            op,
        });
        for child in children {
            self.units[child.unit.0 as usize].nodes[child.index as usize].parent = Some(id);
        }
        id
    }

    /// Like [`node`](Self::node), and additionally marks the new node and
    /// every node currently reachable from it as enclosed by `method`.
    pub fn node_in(&mut self, unit: UnitId, span: Span, op: Op, method: MethodId) -> NodeId {
        let id = self.node(unit, span, op);
        self.enclose_in(id, method);
        id
    }

    /// Set the enclosing method of `root` and all its descendants.
    pub fn enclose_in(&mut self, root: NodeId, method: MethodId) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = &mut self.units[id.unit.0 as usize].nodes[id.index as usize];
            node.containing_method = Some(method);
            stack.extend(node.op.children());
        }
    }

    /// Append a statement to a block node and reparent it.
    pub fn add_to_block(&mut self, block: NodeId, stmt: NodeId) {
        match &mut self.units[block.unit.0 as usize].nodes[block.index as usize].op {
            Op::Block { statements } => statements.push(stmt),
            other => panic!("add_to_block on non-block op {:?}", other.kind()),
        }
        self.set_parent(stmt, block);
    }

    /// Append an argument node to an invocation and reparent it.
    pub fn add_argument(&mut self, invocation: NodeId, arg: NodeId) {
        match &mut self.units[invocation.unit.0 as usize].nodes[invocation.index as usize].op {
            Op::Invocation { args, .. } => args.push(arg),
            other => panic!("add_argument on non-invocation op {:?}", other.kind()),
        }
        self.set_parent(arg, invocation);
    }

    pub fn set_parent(&mut self, node: NodeId, parent: NodeId) {
        self.units[node.unit.0 as usize].nodes[node.index as usize].parent = Some(parent);
    }

    pub fn set_span(&mut self, node: NodeId, span: Span) {
        self.units[node.unit.0 as usize].nodes[node.index as usize].span = span;
    }

    // ------------------------------------------------------------------
    // Symbols
    // ------------------------------------------------------------------

    /// Register a class (or interface, or attribute class).
    pub fn class(&mut self, name: impl Into<String>, qualified: impl Into<String>) -> TypeId {
        let id = TypeId(self.symbols.types.len() as u32);
        self.symbols.types.push(TypeSymbol {
            name: name.into(),
            qualified_name: qualified.into(),
            base: None,
            interfaces: Vec::new(),
            is_ref_like: false,
        });
        id
    }

    pub fn derive(&mut self, ty: TypeId, base: TypeId) {
        self.symbols.types[ty.0 as usize].base = Some(base);
    }

    pub fn implement(&mut self, ty: TypeId, interface_ty: TypeId) {
        self.symbols.types[ty.0 as usize].interfaces.push(interface_ty);
    }

    pub fn mark_ref_like(&mut self, ty: TypeId) {
        self.symbols.types[ty.0 as usize].is_ref_like = true;
    }

    /// Register an ordinary, parameterless member method.
    pub fn add_method(&mut self, ty: TypeId, name: impl Into<String>) -> MethodId {
        let id = MethodId(self.symbols.methods.len() as u32);
        self.symbols.methods.push(MethodSymbol {
            name: name.into(),
            containing_type: ty,
            kind: MethodKind::Ordinary,
            overrides: None,
            params: Vec::new(),
            return_type: None,
            attributes: Vec::new(),
            body: None,
            declarations: Vec::new(),
        });
        id
    }

    pub fn override_of(&mut self, method: MethodId, base_method: MethodId) {
        self.symbols.methods[method.0 as usize].overrides = Some(base_method);
    }

    pub fn mark_constructor(&mut self, method: MethodId) {
        self.symbols.methods[method.0 as usize].kind = MethodKind::Constructor;
    }

    pub fn add_attr(&mut self, method: MethodId, attribute: TypeId) {
        self.symbols.methods[method.0 as usize].attributes.push(attribute);
    }

    pub fn add_param(&mut self, method: MethodId, param: ParamSymbol) {
        self.symbols.methods[method.0 as usize].params.push(param);
    }

    pub fn set_return_type(&mut self, method: MethodId, ty: TypeId) {
        self.symbols.methods[method.0 as usize].return_type = Some(ty);
    }

    pub fn set_method_body(&mut self, method: MethodId, body: NodeId) {
        self.symbols.methods[method.0 as usize].body = Some(body);
        self.enclose_in(body, method);
    }

    /// Record a declaration site for a method.
    pub fn method_decl(&mut self, method: MethodId, unit: UnitId, span: Span) {
        self.symbols.methods[method.0 as usize]
            .declarations
            .push((unit, span));
    }

    pub fn add_property(&mut self, ty: TypeId, name: impl Into<String>) -> PropertyId {
        let id = PropertyId(self.symbols.properties.len() as u32);
        self.symbols.properties.push(PropertySymbol {
            name: name.into(),
            containing_type: ty,
            attributes: Vec::new(),
            decl: None,
        });
        id
    }

    pub fn prop_attr(&mut self, property: PropertyId, attribute: TypeId) {
        self.symbols.properties[property.0 as usize]
            .attributes
            .push(attribute);
    }

    /// Record the declaration site for a property.
    pub fn property_decl(&mut self, property: PropertyId, unit: UnitId, span: Span) {
        self.symbols.properties[property.0 as usize].decl = Some((unit, span));
    }

    pub fn add_local(&mut self, name: impl Into<String>) -> LocalId {
        let id = LocalId(self.symbols.locals.len() as u32);
        self.symbols.locals.push(LocalSymbol {
            name: name.into(),
            decl_node: None,
        });
        id
    }

    pub fn set_local_decl(&mut self, local: LocalId, decl_node: NodeId) {
        self.symbols.locals[local.0 as usize].decl_node = Some(decl_node);
    }

    // ------------------------------------------------------------------
    // Convenient node constructors
    // ------------------------------------------------------------------

    /// A lambda delegate-creation node wrapping `body`.
    pub fn lambda(
        &mut self,
        unit: UnitId,
        span: Span,
        params: Vec<ParamSymbol>,
        body: NodeId,
    ) -> NodeId {
        self.node(
            unit,
            span,
            Op::DelegateCreation {
                target: DelegateTarget::Lambda {
                    params,
                    body,
                    return_type: None,
                },
            },
        )
    }

    /// An argument node wrapping `value`, sharing its span.
    pub fn argument(&mut self, value: NodeId) -> NodeId {
        let span = self.units[value.unit.0 as usize].nodes[value.index as usize].span;
        self.node(value.unit, span, Op::Argument { value })
    }

    // ------------------------------------------------------------------
    // Framework surface
    // ------------------------------------------------------------------

    /// Register every framework symbol the catalog resolves, plus the
    /// member methods and attribute subclasses tests lean on.
    pub fn with_framework(&mut self) -> Framework {
        let component_base = self.class(
            "ComponentBase",
            "Microsoft.AspNetCore.Components.ComponentBase",
        );
        let set_parameters_async = self.add_method(component_base, "SetParametersAsync");
        let on_initialized_async = self.add_method(component_base, "OnInitializedAsync");
        let parameter_attribute = self.class(
            "ParameterAttribute",
            "Microsoft.AspNetCore.Components.ParameterAttribute",
        );
        let cascading_parameter_attribute = self.class(
            "CascadingParameterAttribute",
            "Microsoft.AspNetCore.Components.CascadingParameterAttribute",
        );
        let supply_parameter_from_query_attribute = self.class(
            "SupplyParameterFromQueryAttribute",
            "Microsoft.AspNetCore.Components.SupplyParameterFromQueryAttribute",
        );
        let editor_required_attribute = self.class(
            "EditorRequiredAttribute",
            "Microsoft.AspNetCore.Components.EditorRequiredAttribute",
        );
        let js_runtime = self.class("IJSRuntime", "Microsoft.JSInterop.IJSRuntime");
        let js_invoke = self.add_method(js_runtime, "InvokeAsync");
        let event_callback_factory = self.class(
            "EventCallbackFactory",
            "Microsoft.AspNetCore.Components.EventCallbackFactory",
        );
        let callback_create = self.add_method(event_callback_factory, "Create");
        let render_tree_builder = self.class(
            "RenderTreeBuilder",
            "Microsoft.AspNetCore.Components.Rendering.RenderTreeBuilder",
        );
        let open_element = self.add_method(render_tree_builder, "OpenElement");
        let open_component = self.add_method(render_tree_builder, "OpenComponent");
        let close_element = self.add_method(render_tree_builder, "CloseElement");
        let close_component = self.add_method(render_tree_builder, "CloseComponent");
        let set_key = self.add_method(render_tree_builder, "SetKey");

        let delegate_type = self.class("Delegate", "System.Delegate");
        let endpoint_route_builder_extensions = self.class(
            "EndpointRouteBuilderExtensions",
            "Microsoft.AspNetCore.Builder.EndpointRouteBuilderExtensions",
        );
        let map_method = |builder: &mut Self, name: &str| {
            let m = builder.add_method(endpoint_route_builder_extensions, name);
            builder.add_param(m, ParamSymbol::by_value("endpoints", None));
            builder.add_param(m, ParamSymbol::by_value("pattern", None));
            builder.add_param(m, ParamSymbol::by_value("handler", Some(delegate_type)));
            m
        };
        let map_get = map_method(self, "MapGet");
        let map_post = map_method(self, "MapPost");
        let map_put = map_method(self, "MapPut");
        let map_delete = map_method(self, "MapDelete");
        let with_name = self.add_method(endpoint_route_builder_extensions, "WithName");

        let service_provider = self.class("IServiceProvider", "System.IServiceProvider");
        let sp_get_service = self.add_method(service_provider, "GetService");
        let service_provider_extensions = self.class(
            "ServiceProviderServiceExtensions",
            "Microsoft.Extensions.DependencyInjection.ServiceProviderServiceExtensions",
        );
        let spe_get_service = self.add_method(service_provider_extensions, "GetService");
        let spe_get_required_service =
            self.add_method(service_provider_extensions, "GetRequiredService");

        let route_value_dictionary = self.class(
            "RouteValueDictionary",
            "Microsoft.AspNetCore.Routing.RouteValueDictionary",
        );
        let route_values_indexer = self.add_property(route_value_dictionary, "this[]");
        let endpoint_name_attribute = self.class(
            "EndpointNameAttribute",
            "Microsoft.AspNetCore.Routing.EndpointNameAttribute",
        );

        let http_context = self.class("HttpContext", "Microsoft.AspNetCore.Http.HttpContext");
        let request_delegate = self.class(
            "RequestDelegate",
            "Microsoft.AspNetCore.Http.RequestDelegate",
        );
        let task_type = self.class("Task", "System.Threading.Tasks.Task");
        let middleware_func = self.class(
            "Func`3",
            "System.Func`3[Microsoft.AspNetCore.Http.HttpContext,Microsoft.AspNetCore.Http.RequestDelegate,System.Threading.Tasks.Task]",
        );
        let use_extensions = self.class(
            "UseExtensions",
            "Microsoft.AspNetCore.Builder.UseExtensions",
        );
        let use_method = self.add_method(use_extensions, "Use");
        self.add_param(use_method, ParamSymbol::by_value("app", None));
        self.add_param(
            use_method,
            ParamSymbol::by_value("middleware", Some(middleware_func)),
        );

        let health_check_interface = self.class(
            "IHealthCheck",
            "Microsoft.Extensions.Diagnostics.HealthChecks.IHealthCheck",
        );
        let http_method_attribute = self.class(
            "HttpMethodAttribute",
            "Microsoft.AspNetCore.Mvc.Routing.HttpMethodAttribute",
        );
        let http_get_attribute = self.class(
            "HttpGetAttribute",
            "Microsoft.AspNetCore.Mvc.HttpGetAttribute",
        );
        self.derive(http_get_attribute, http_method_attribute);
        let http_post_attribute = self.class(
            "HttpPostAttribute",
            "Microsoft.AspNetCore.Mvc.HttpPostAttribute",
        );
        self.derive(http_post_attribute, http_method_attribute);

        Framework {
            component_base,
            set_parameters_async,
            on_initialized_async,
            parameter_attribute,
            cascading_parameter_attribute,
            supply_parameter_from_query_attribute,
            editor_required_attribute,
            js_runtime,
            js_invoke,
            event_callback_factory,
            callback_create,
            render_tree_builder,
            open_element,
            open_component,
            close_element,
            close_component,
            set_key,
            endpoint_route_builder_extensions,
            map_get,
            map_post,
            map_put,
            map_delete,
            with_name,
            delegate_type,
            service_provider,
            sp_get_service,
            service_provider_extensions,
            spe_get_service,
            spe_get_required_service,
            route_value_dictionary,
            route_values_indexer,
            endpoint_name_attribute,
            use_extensions,
            use_method,
            middleware_func,
            health_check_interface,
            http_method_attribute,
            http_get_attribute,
            http_post_attribute,
            http_context,
            request_delegate,
            task_type,
        }
    }
}
