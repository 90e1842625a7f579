//! Endpoint name derivation.
//!
//! Turns a route registration like `MapGet("/todos/{id}", …)` into a
//! conventional API operation name like `GetTodosById`. The verb comes from
//! the registration method, the noun from the last literal route segment,
//! and the `By` suffix from the last route parameter.

use crate::routes::RouteTemplate;

/// The naming verb for a route-registration method, e.g. `MapPost` maps to
/// `Create`. Unknown registration methods produce no verb and no name.
pub fn verb_for_registration(method_name: &str) -> Option<&'static str> {
    match method_name {
        "MapGet" => Some("Get"),
        "MapPost" => Some("Create"),
        "MapPut" => Some("Update"),
        "MapDelete" => Some("Delete"),
        _ => None,
    }
}

/// Upper-case the first letter, e.g. `todos` to `Todos`.
pub fn pascal_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Naive English singularization for resource nouns: `todos` to `todo`,
/// `categories` to `category`. Words ending in `ss` pass through.
pub fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{stem}y");
    }
    if word.ends_with("ss") {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix('s') {
        return stem.to_string();
    }
    word.to_string()
}

/// Assemble the suggested endpoint name for a registration method and its
/// parsed route. `None` when the verb or the resource noun is missing.
///
/// Reading endpoints keep the plural noun (`GetTodos`); mutating verbs take
/// the singular (`CreateTodo`). A trailing route parameter appends a
/// `By`-qualifier (`GetTodosById`).
pub fn suggested_endpoint_name(method_name: &str, route: &RouteTemplate) -> Option<String> {
    let verb = verb_for_registration(method_name)?;
    let noun = route.resource_segment()?;
    let noun = if verb == "Get" {
        pascal_case(noun)
    } else {
        pascal_case(&singularize(noun))
    };
    let mut name = format!("{verb}{noun}");
    if let Some(param) = route.last_parameter() {
        name.push_str("By");
        name.push_str(&pascal_case(param));
    }
    Some(name)
}
