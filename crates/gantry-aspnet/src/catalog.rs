//! Well-known framework symbol catalog.
//!
//! Binds the abstract framework concepts the rules reason about (the
//! component base type, the route-registration extension class, the
//! health-check interface, …) to concrete program symbols, once per
//! analysis session. Resolution fails closed: a program that does not
//! reference the framework produces a `MissingIdentifier` error and every
//! dependent rule becomes a guaranteed no-op.

use thiserror::Error;

use gantry_core::error::GantryError;

use crate::program::{MethodId, Program, TypeId};

/// A required framework identifier was absent from the program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("framework identifier not found: {0}")]
    MissingIdentifier(String),
}

impl From<CatalogError> for GantryError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::MissingIdentifier(name) => GantryError::MissingIdentifier(name),
        }
    }
}

/// Resolved handles to the framework surface.
///
/// Built once per program snapshot, immutable afterwards, and shared
/// read-only across walk workers. There is deliberately no global or
/// cached instance: callers construct one per session and pass it by
/// reference.
#[derive(Debug, Clone)]
pub struct WellKnownTypes {
    // Blazor components
    pub component_base: TypeId,
    pub set_parameters_async: MethodId,
    pub on_initialized_async: MethodId,
    pub parameter_attribute: TypeId,
    pub cascading_parameter_attribute: TypeId,
    pub supply_parameter_from_query_attribute: TypeId,
    pub editor_required_attribute: TypeId,
    pub js_runtime: TypeId,
    pub event_callback_factory: TypeId,
    pub render_tree_builder: TypeId,

    // Minimal API routing
    pub endpoint_route_builder_extensions: TypeId,
    pub delegate_type: TypeId,
    pub service_provider: TypeId,
    pub service_provider_extensions: TypeId,
    pub route_value_dictionary: TypeId,
    pub endpoint_name_attribute: TypeId,

    // Middleware
    pub use_extensions: TypeId,
    pub middleware_func: TypeId,

    // Health checks / MVC
    pub health_check_interface: TypeId,
    pub http_method_attribute: TypeId,
}

const COMPONENT_BASE: &str = "Microsoft.AspNetCore.Components.ComponentBase";
const PARAMETER_ATTRIBUTE: &str = "Microsoft.AspNetCore.Components.ParameterAttribute";
const CASCADING_PARAMETER_ATTRIBUTE: &str =
    "Microsoft.AspNetCore.Components.CascadingParameterAttribute";
const SUPPLY_PARAMETER_FROM_QUERY_ATTRIBUTE: &str =
    "Microsoft.AspNetCore.Components.SupplyParameterFromQueryAttribute";
const EDITOR_REQUIRED_ATTRIBUTE: &str =
    "Microsoft.AspNetCore.Components.EditorRequiredAttribute";
const JS_RUNTIME: &str = "Microsoft.JSInterop.IJSRuntime";
const EVENT_CALLBACK_FACTORY: &str = "Microsoft.AspNetCore.Components.EventCallbackFactory";
const RENDER_TREE_BUILDER: &str =
    "Microsoft.AspNetCore.Components.Rendering.RenderTreeBuilder";
const ENDPOINT_ROUTE_BUILDER_EXTENSIONS: &str =
    "Microsoft.AspNetCore.Builder.EndpointRouteBuilderExtensions";
const DELEGATE: &str = "System.Delegate";
const SERVICE_PROVIDER: &str = "System.IServiceProvider";
const SERVICE_PROVIDER_EXTENSIONS: &str =
    "Microsoft.Extensions.DependencyInjection.ServiceProviderServiceExtensions";
const ROUTE_VALUE_DICTIONARY: &str = "Microsoft.AspNetCore.Routing.RouteValueDictionary";
const ENDPOINT_NAME_ATTRIBUTE: &str = "Microsoft.AspNetCore.Routing.EndpointNameAttribute";
const USE_EXTENSIONS: &str = "Microsoft.AspNetCore.Builder.UseExtensions";
const MIDDLEWARE_FUNC: &str =
    "System.Func`3[Microsoft.AspNetCore.Http.HttpContext,Microsoft.AspNetCore.Http.RequestDelegate,System.Threading.Tasks.Task]";
const HEALTH_CHECK_INTERFACE: &str =
    "Microsoft.Extensions.Diagnostics.HealthChecks.IHealthCheck";
const HTTP_METHOD_ATTRIBUTE: &str = "Microsoft.AspNetCore.Mvc.Routing.HttpMethodAttribute";

const SET_PARAMETERS_ASYNC: &str = "SetParametersAsync";
const ON_INITIALIZED_ASYNC: &str = "OnInitializedAsync";

impl WellKnownTypes {
    /// Resolve the full framework surface against a program snapshot.
    ///
    /// Pure function of the symbol table. Returns the first missing
    /// identifier; callers log it and fail closed.
    pub fn resolve(program: &Program) -> Result<WellKnownTypes, CatalogError> {
        let symbols = &program.symbols;

        let require_type = |name: &str| {
            symbols
                .type_by_qualified_name(name)
                .ok_or_else(|| CatalogError::MissingIdentifier(name.to_string()))
        };

        let component_base = require_type(COMPONENT_BASE)?;

        let require_member = |ty: TypeId, name: &str| {
            symbols
                .member_method(ty, name)
                .ok_or_else(|| CatalogError::MissingIdentifier(name.to_string()))
        };

        Ok(WellKnownTypes {
            component_base,
            set_parameters_async: require_member(component_base, SET_PARAMETERS_ASYNC)?,
            on_initialized_async: require_member(component_base, ON_INITIALIZED_ASYNC)?,
            parameter_attribute: require_type(PARAMETER_ATTRIBUTE)?,
            cascading_parameter_attribute: require_type(CASCADING_PARAMETER_ATTRIBUTE)?,
            supply_parameter_from_query_attribute: require_type(
                SUPPLY_PARAMETER_FROM_QUERY_ATTRIBUTE,
            )?,
            editor_required_attribute: require_type(EDITOR_REQUIRED_ATTRIBUTE)?,
            js_runtime: require_type(JS_RUNTIME)?,
            event_callback_factory: require_type(EVENT_CALLBACK_FACTORY)?,
            render_tree_builder: require_type(RENDER_TREE_BUILDER)?,
            endpoint_route_builder_extensions: require_type(ENDPOINT_ROUTE_BUILDER_EXTENSIONS)?,
            delegate_type: require_type(DELEGATE)?,
            service_provider: require_type(SERVICE_PROVIDER)?,
            service_provider_extensions: require_type(SERVICE_PROVIDER_EXTENSIONS)?,
            route_value_dictionary: require_type(ROUTE_VALUE_DICTIONARY)?,
            endpoint_name_attribute: require_type(ENDPOINT_NAME_ATTRIBUTE)?,
            use_extensions: require_type(USE_EXTENSIONS)?,
            middleware_func: require_type(MIDDLEWARE_FUNC)?,
            health_check_interface: require_type(HEALTH_CHECK_INTERFACE)?,
            http_method_attribute: require_type(HTTP_METHOD_ATTRIBUTE)?,
        })
    }

    /// True when the property carries `[Parameter]` or
    /// `[CascadingParameter]`.
    pub fn is_parameter_property(
        &self,
        program: &Program,
        property: crate::program::PropertyId,
    ) -> bool {
        program
            .symbols
            .property(property)
            .attributes
            .iter()
            .any(|&a| a == self.parameter_attribute || a == self.cascading_parameter_attribute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::ProgramBuilder;

    #[test]
    fn resolve_succeeds_with_full_framework() {
        let mut builder = ProgramBuilder::new();
        builder.with_framework();
        let program = builder.build();
        let catalog = WellKnownTypes::resolve(&program).expect("resolves");
        assert_ne!(catalog.component_base, catalog.render_tree_builder);
    }

    #[test]
    fn resolve_reports_first_missing_identifier() {
        let builder = ProgramBuilder::new();
        let program = builder.build();
        let err = WellKnownTypes::resolve(&program).expect_err("must be missing");
        assert_eq!(
            err,
            CatalogError::MissingIdentifier(COMPONENT_BASE.to_string())
        );
    }

    #[test]
    fn catalog_miss_converts_to_the_unified_error() {
        let program = ProgramBuilder::new().build();
        let err = WellKnownTypes::resolve(&program).expect_err("must be missing");
        let unified = GantryError::from(err);
        assert!(matches!(unified, GantryError::MissingIdentifier(name) if name == COMPONENT_BASE));
    }
}
