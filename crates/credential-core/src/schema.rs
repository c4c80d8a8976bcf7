//! Effective property resolution, payload validation and JSON-schema export
//!
//! Properties whose `displayOptions.show` names another property become
//! conditional: the first listed value of the first listed property decides
//! whether they are required (condition holds, or the controlling property
//! is absent) or forbidden (condition fails). Export and validation share the
//! same rule so the published schema always describes what `validate_data`
//! accepts.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use crate::credential::CredentialData;
use crate::credential_type::{CredentialTypeRegistry, PropertyDefinition, PropertyKind};
use crate::error::{CredentialError, Result, ValidationIssue};

/// Own and inherited properties of a type; closer types win on name clashes.
///
/// Ordering follows first appearance from the root down, so an overridden
/// property keeps its inherited position.
pub fn effective_properties(
    registry: &CredentialTypeRegistry,
    type_name: &str,
) -> Result<Vec<PropertyDefinition>> {
    let definition = registry.get_by_name(type_name)?;
    let parents = registry.get_parent_types(type_name)?;

    let mut merged: IndexMap<&str, &PropertyDefinition> = IndexMap::new();
    for ty in parents.iter().rev().copied().chain(std::iter::once(definition)) {
        for property in &ty.properties {
            merged.insert(property.name.as_str(), property);
        }
    }

    Ok(merged.into_values().cloned().collect())
}

/// Drop properties that must never leave the process
pub fn visible_properties(properties: &[PropertyDefinition]) -> Vec<PropertyDefinition> {
    properties
        .iter()
        .filter(|p| !p.kind.is_hidden())
        .cloned()
        .collect()
}

/// A property whose presence depends on another property's value
struct DisplayDependency<'a> {
    controller: &'a str,
    value: Value,
    dependents: Vec<&'a str>,
}

fn display_dependencies(properties: &[PropertyDefinition]) -> Vec<DisplayDependency<'_>> {
    let mut deps: IndexMap<&str, DisplayDependency<'_>> = IndexMap::new();

    for property in properties {
        let Some((controller, values)) = property
            .display_options
            .as_ref()
            .and_then(|d| d.show.first())
        else {
            continue;
        };

        let dep = deps
            .entry(controller.as_str())
            .or_insert_with(|| DisplayDependency {
                controller: controller.as_str(),
                value: match values.first() {
                    Some(v) if !v.is_object() && !v.is_array() => v.clone(),
                    _ => Value::String(String::new()),
                },
                dependents: Vec::new(),
            });
        dep.dependents.push(property.name.as_str());
    }

    deps.into_values().collect()
}

fn property_schema(property: &PropertyDefinition) -> Value {
    let mut entry = match property.kind {
        PropertyKind::Options => json!({
            "type": "string",
            "enum": property.option_values(),
        }),
        PropertyKind::Json => json!({ "type": ["object", "string"] }),
        kind => json!({ "type": kind.json_type() }),
    };

    if let (Some(default), Value::Object(obj)) = (&property.default, &mut entry) {
        obj.insert("default".to_string(), default.clone());
    }

    entry
}

/// Export a JSON-schema document describing accepted credential data.
///
/// Hidden properties are left out. The result is meant for introspection;
/// nothing stores it.
pub fn export_schema(properties: &[PropertyDefinition]) -> Value {
    let visible = visible_properties(properties);
    let deps = display_dependencies(&visible);
    let conditional: HashSet<&str> = deps.iter().flat_map(|d| d.dependents.clone()).collect();

    let mut schema_properties = Map::new();
    let mut required = Vec::new();

    for property in &visible {
        if property.required && !conditional.contains(property.name.as_str()) {
            required.push(Value::String(property.name.clone()));
        }
        schema_properties.insert(property.name.clone(), property_schema(property));
    }

    let mut schema = json!({
        "additionalProperties": false,
        "type": "object",
        "properties": schema_properties,
        "required": required,
    });

    if !deps.is_empty() {
        let clauses: Vec<Value> = deps
            .iter()
            .map(|dep| {
                json!({
                    "if": { "properties": { dep.controller: { "enum": [dep.value] } } },
                    "then": {
                        "allOf": dep.dependents.iter()
                            .map(|name| json!({ "required": [name] }))
                            .collect::<Vec<_>>(),
                    },
                    "else": {
                        "allOf": dep.dependents.iter()
                            .map(|name| json!({ "not": { "required": [name] } }))
                            .collect::<Vec<_>>(),
                    },
                })
            })
            .collect();
        schema["allOf"] = Value::Array(clauses);
    }

    schema
}

fn kind_mismatch(property: &PropertyDefinition, value: &Value) -> Option<String> {
    let ok = match property.kind {
        PropertyKind::String => value.is_string(),
        PropertyKind::Number => value.is_number(),
        PropertyKind::Boolean => value.is_boolean(),
        PropertyKind::Options => {
            if property.options.is_empty() {
                !value.is_object() && !value.is_array()
            } else {
                return (!property.options.iter().any(|o| &o.value == value)).then(|| {
                    format!(
                        "must be one of {}",
                        Value::Array(property.option_values().into_iter().cloned().collect())
                    )
                });
            }
        }
        PropertyKind::Json => value.is_object() || value.is_array() || value.is_string(),
        PropertyKind::Hidden => true,
    };

    (!ok).then(|| format!("expected {}", property.kind.json_type()))
}

/// Check `data` against `properties`, reporting every problem at once.
///
/// Keys may name any effective property, hidden ones included. Required and
/// conditional checks only consider visible properties since callers never
/// supply hidden values.
pub fn validate_data(properties: &[PropertyDefinition], data: &CredentialData) -> Result<()> {
    let by_name: HashMap<&str, &PropertyDefinition> =
        properties.iter().map(|p| (p.name.as_str(), p)).collect();
    let mut issues = Vec::new();

    for (key, value) in data {
        match by_name.get(key.as_str()) {
            None => issues.push(ValidationIssue::new(key, "unknown property")),
            Some(property) => {
                if let Some(message) = kind_mismatch(property, value) {
                    issues.push(ValidationIssue::new(key, message));
                }
            }
        }
    }

    let visible = visible_properties(properties);
    let deps = display_dependencies(&visible);
    let conditional: HashSet<&str> = deps.iter().flat_map(|d| d.dependents.clone()).collect();

    for property in &visible {
        let name = property.name.as_str();
        if property.required && !conditional.contains(name) && !data.contains_key(name) {
            issues.push(ValidationIssue::new(name, "required property missing"));
        }
    }

    for dep in &deps {
        let applies = data
            .get(dep.controller)
            .map_or(true, |current| current == &dep.value);

        for name in &dep.dependents {
            let present = data.contains_key(*name);
            if applies && !present {
                issues.push(ValidationIssue::new(
                    *name,
                    format!("required when {} is {}", dep.controller, dep.value),
                ));
            } else if !applies && present {
                issues.push(ValidationIssue::new(
                    *name,
                    format!("only allowed when {} is {}", dep.controller, dep.value),
                ));
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(CredentialError::Validation(issues))
    }
}
