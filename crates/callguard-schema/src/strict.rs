//! Exact-shape rewriting of JSON Schema documents.
//!
//! An object schema that says nothing about `additionalProperties` accepts
//! any extra field. Strict mode closes such object schemas so a payload must
//! match the declared shape exactly.
//!
//! The rewrite only ever narrows what a schema accepts:
//!
//! - a self-contained object schema gets `additionalProperties: false`;
//! - an object schema whose properties are spread over in-place applicators
//!   (`allOf`, `anyOf`, `oneOf`, `if`/`then`/`else`, `dependentSchemas`,
//!   `$ref`) gets `unevaluatedProperties: false` at the enclosing level, and
//!   the branches themselves stay open. Drafts without `unevaluated*` leave
//!   such schemas open;
//! - nothing under `not`, `if` or `contains` is touched, since narrowing a
//!   negated or counted sub-schema widens the outer one.

use serde_json::{Map, Value};

/// Keywords whose value is a map of name -> sub-schema validated against
/// a child instance (or only reachable by reference).
const SCHEMA_MAPS: [&str; 4] = ["properties", "patternProperties", "$defs", "definitions"];

/// Keywords whose value is a single sub-schema validated against child
/// instances.
const SCHEMA_SINGLES: [&str; 5] = [
    "additionalProperties",
    "unevaluatedProperties",
    "items",
    "additionalItems",
    "unevaluatedItems",
];

/// Keywords whose value is a list of sub-schemas validated against child
/// instances.
const SCHEMA_LISTS: [&str; 1] = ["prefixItems"];

/// In-place applicators holding a list of sub-schemas.
const IN_PLACE_LISTS: [&str; 3] = ["allOf", "anyOf", "oneOf"];

/// In-place applicators holding a single sub-schema. `if` is excluded: it
/// only selects a branch.
const IN_PLACE_SINGLES: [&str; 2] = ["then", "else"];

/// Keywords that pull in properties evaluated elsewhere.
const IN_PLACE_MARKERS: [&str; 9] = [
    "allOf",
    "anyOf",
    "oneOf",
    "if",
    "then",
    "else",
    "dependentSchemas",
    "$ref",
    "$dynamicRef",
];

/// Keywords that only make sense on object schemas.
const OBJECT_KEYWORDS: [&str; 8] = [
    "properties",
    "patternProperties",
    "additionalProperties",
    "unevaluatedProperties",
    "required",
    "dependentRequired",
    "dependentSchemas",
    "propertyNames",
];

/// Drafts that predate `unevaluatedProperties`.
const LEGACY_DRAFTS: [&str; 4] = ["draft-03", "draft-04", "draft-06", "draft-07"];

/// Close the object schemas in `schema` that do not already decide on
/// extra properties.
pub(crate) fn close_object_schemas(schema: &mut Value) {
    let unevaluated = supports_unevaluated(schema);
    close(schema, unevaluated, false);
}

fn supports_unevaluated(root: &Value) -> bool {
    match root.get("$schema").and_then(Value::as_str) {
        Some(uri) => !LEGACY_DRAFTS.iter().any(|draft| uri.contains(draft)),
        None => true,
    }
}

/// `in_place`: the schema applies to the same instance as an enclosing
/// schema, which owns the decision about extra properties.
fn close(schema: &mut Value, unevaluated: bool, in_place: bool) {
    match schema {
        Value::Object(map) => {
            if !in_place {
                close_level(map, unevaluated);
            }
            close_children(map, unevaluated);
        }
        // Draft-07 tuple form: `items` as an array of schemas.
        Value::Array(items) => items
            .iter_mut()
            .for_each(|item| close(item, unevaluated, false)),
        _ => {}
    }
}

fn close_level(map: &mut Map<String, Value>, unevaluated: bool) {
    if map.contains_key("additionalProperties") || map.contains_key("unevaluatedProperties") {
        return;
    }
    if !is_composed(map) {
        if describes_object(map) {
            map.insert("additionalProperties".to_string(), Value::Bool(false));
        }
        return;
    }
    if unevaluated && object_anywhere(map) {
        map.insert("unevaluatedProperties".to_string(), Value::Bool(false));
    }
}

fn close_children(map: &mut Map<String, Value>, unevaluated: bool) {
    for key in SCHEMA_MAPS {
        if let Some(Value::Object(children)) = map.get_mut(key) {
            children
                .values_mut()
                .for_each(|child| close(child, unevaluated, false));
        }
    }
    for key in SCHEMA_SINGLES {
        if let Some(child) = map.get_mut(key) {
            close(child, unevaluated, false);
        }
    }
    for key in SCHEMA_LISTS {
        if let Some(Value::Array(children)) = map.get_mut(key) {
            children
                .iter_mut()
                .for_each(|child| close(child, unevaluated, false));
        }
    }

    for key in IN_PLACE_LISTS {
        if let Some(Value::Array(branches)) = map.get_mut(key) {
            branches
                .iter_mut()
                .for_each(|branch| close(branch, unevaluated, true));
        }
    }
    for key in IN_PLACE_SINGLES {
        if let Some(branch) = map.get_mut(key) {
            close(branch, unevaluated, true);
        }
    }
    if let Some(Value::Object(branches)) = map.get_mut("dependentSchemas") {
        branches
            .values_mut()
            .for_each(|branch| close(branch, unevaluated, true));
    }
}

fn is_composed(map: &Map<String, Value>) -> bool {
    IN_PLACE_MARKERS.iter().any(|key| map.contains_key(*key))
}

fn describes_object(map: &Map<String, Value>) -> bool {
    match map.get("type") {
        Some(Value::String(kind)) => kind == "object",
        Some(Value::Array(kinds)) => kinds.iter().any(|kind| kind == "object"),
        _ => OBJECT_KEYWORDS.iter().any(|keyword| map.contains_key(*keyword)),
    }
}

/// Whether this schema or any in-place branch describes an object.
fn object_anywhere(map: &Map<String, Value>) -> bool {
    if describes_object(map) {
        return true;
    }
    let in_lists = IN_PLACE_LISTS
        .iter()
        .filter_map(|key| map.get(*key).and_then(Value::as_array))
        .flatten();
    let in_singles = IN_PLACE_SINGLES.iter().filter_map(|key| map.get(*key));
    in_lists
        .chain(in_singles)
        .filter_map(Value::as_object)
        .any(object_anywhere)
}
