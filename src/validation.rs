//! Checks for the constrained dialect produced by [`SchemaOptions::strict`].
//!
//! [`SchemaOptions::strict`]: crate::options::SchemaOptions::strict
use serde_json::{Map, Value};

use crate::error::Violation;
use crate::options::SchemaValidator;
use crate::serializer::DEFINITIONS_KEY;

/// Rejects `nullable`, `const`, a `$ref` at the document root, and open objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictDialectValidator;

impl SchemaValidator for StrictDialectValidator {
    fn validate(&self, document: &Value) -> Vec<Violation> {
        let mut violations = Vec::new();
        let Value::Object(root) = document else {
            violations.push(Violation::new("", "document root must be a schema object"));
            return violations;
        };
        if root.contains_key("$ref") {
            violations.push(Violation::new("/$ref", "document root must not be a bare reference"));
        }
        visit_schema(root, "", &mut violations);
        violations
    }
}

fn visit_schema(schema: &Map<String, Value>, path: &str, violations: &mut Vec<Violation>) {
    if schema.contains_key("nullable") {
        violations.push(Violation::new(format!("{path}/nullable"), "`nullable` is not supported; use a type union"));
    }
    if schema.contains_key("const") {
        violations.push(Violation::new(format!("{path}/const"), "`const` is not supported; use a single-value enum"));
    }
    if is_object_schema(schema) && schema.get("additionalProperties") != Some(&Value::Bool(false)) {
        violations.push(Violation::new(
            format!("{path}/additionalProperties"),
            "object schemas must set `additionalProperties` to false",
        ));
    }

    for keyword in ["properties", DEFINITIONS_KEY] {
        if let Some(Value::Object(children)) = schema.get(keyword) {
            for (name, child) in children {
                visit_child(child, &format!("{path}/{keyword}/{}", escape(name)), violations);
            }
        }
    }
    if let Some(items) = schema.get("items") {
        visit_child(items, &format!("{path}/items"), violations);
    }
    if let Some(Value::Array(alternatives)) = schema.get("anyOf") {
        for (i, alternative) in alternatives.iter().enumerate() {
            visit_child(alternative, &format!("{path}/anyOf/{i}"), violations);
        }
    }
}

fn visit_child(child: &Value, path: &str, violations: &mut Vec<Violation>) {
    if let Value::Object(schema) = child {
        visit_schema(schema, path, violations);
    }
}

fn is_object_schema(schema: &Map<String, Value>) -> bool {
    let typed_object = match schema.get("type") {
        Some(Value::String(t)) => t == "object",
        Some(Value::Array(types)) => types.iter().any(|t| t == "object"),
        _ => false,
    };
    typed_object && schema.contains_key("properties")
}

/// JSON pointer token escaping.
fn escape(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn paths(document: Value) -> Vec<String> {
        StrictDialectValidator.validate(&document).into_iter().map(|v| v.path).collect()
    }

    #[test]
    fn conforming_document_passes() {
        let document = json!({
            "type": "object",
            "properties": {
                "nullable": {"type": ["integer", "null"]},
                "kind": {"type": "string", "enum": ["a"]},
                "child": {"$ref": "#"}
            },
            "required": ["nullable", "kind", "child"],
            "additionalProperties": false
        });
        assert!(paths(document).is_empty());
    }

    #[test]
    fn reports_each_forbidden_keyword_with_its_pointer() {
        let document = json!({
            "$ref": "#/$defs/Node",
            "$defs": {
                "Node": {
                    "type": "object",
                    "properties": {
                        "a/b": {"type": "integer", "nullable": true},
                        "tags": {"type": "array", "items": {"type": "string", "const": "x"}},
                        "open": {"anyOf": [{"type": "object", "properties": {}}, {"type": "null"}]}
                    },
                    "additionalProperties": false
                }
            }
        });
        assert_eq!(
            paths(document),
            vec![
                "/$ref",
                "/$defs/Node/properties/a~1b/nullable",
                "/$defs/Node/properties/tags/items/const",
                "/$defs/Node/properties/open/anyOf/0/additionalProperties",
            ]
        );
    }
}
