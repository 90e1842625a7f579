//! Detection rules.
//!
//! Each rule is a stateless predicate over one triggering node plus the
//! symbol catalog. Three detections run outside the node walk: GA002 scans
//! property declarations, GA010 buckets registrations per unit, and GA012
//! lives in the cross-unit aggregator.

pub mod callbacks;
pub mod components;
pub mod endpoints;
pub mod handlers;
pub mod middleware;
pub mod render_tree;

use gantry_core::finding::RuleMeta;

use crate::aggregate;
use crate::dispatch::Rule;

/// All node-triggered rules, in rule-id order.
pub fn all_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(components::ParameterMutation),
        Box::new(callbacks::LoopCaptureInCallback),
        Box::new(components::JsInteropInInitializer),
        Box::new(render_tree::LoopElementMissingKey),
        Box::new(handlers::ServiceLocatorInHandler),
        Box::new(handlers::HandlerParameterModifier),
        Box::new(handlers::HandlerReturnsRefLike),
        Box::new(handlers::RouteValueIndexing),
        Box::new(endpoints::EndpointNameSuggestion),
        Box::new(middleware::InlineMiddleware),
    ]
}

/// Metadata for every rule this engine ships, including the pass-based
/// ones, in rule-id order. The host uses this to surface configuration.
pub fn rule_metas() -> Vec<&'static RuleMeta> {
    vec![
        &components::PARAMETER_MUTATION,
        &components::MISSING_PARAMETER_ATTRIBUTE,
        &callbacks::LOOP_CAPTURE_IN_CALLBACK,
        &components::JS_INTEROP_IN_INITIALIZER,
        &render_tree::LOOP_ELEMENT_MISSING_KEY,
        &handlers::SERVICE_LOCATOR_IN_HANDLER,
        &handlers::HANDLER_PARAMETER_MODIFIER,
        &handlers::HANDLER_RETURNS_REF_LIKE,
        &handlers::ROUTE_VALUE_INDEXING,
        &endpoints::DUPLICATE_ROUTE_PREFIX,
        &endpoints::ENDPOINT_NAME_SUGGESTION,
        &aggregate::HEALTH_CHECK_COVERAGE,
        &middleware::INLINE_MIDDLEWARE,
    ]
}
