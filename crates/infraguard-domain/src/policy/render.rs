//! Canonical document form of a [`Policy`]; parsing it back yields an equal AST.

use crate::policy::ast::{Operand, Policy, PolicyNode};
use crate::value::AttributeValue;
use serde_json::{Map, Value as JsonValue, json};

impl Policy {
    pub fn to_document(&self) -> JsonValue {
        let meta = self.metadata();
        let mut metadata = Map::new();
        metadata.insert("id".to_string(), json!(meta.id));
        if let Some(name) = &meta.name {
            metadata.insert("name".to_string(), json!(name));
        }
        metadata.insert("category".to_string(), json!(meta.category));
        if let Some(guideline) = &meta.guideline {
            metadata.insert("guideline".to_string(), json!(guideline));
        }
        if let Some(severity) = meta.severity {
            metadata.insert("severity".to_string(), json!(severity.as_str()));
        }

        let mut doc = Map::new();
        doc.insert("metadata".to_string(), JsonValue::Object(metadata));
        if let Some(scope) = self.scope() {
            doc.insert("scope".to_string(), json!({ "resource_types": scope }));
        }
        doc.insert("definition".to_string(), render_node(self.definition()));
        JsonValue::Object(doc)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.to_document())
    }
}

fn render_node(node: &PolicyNode) -> JsonValue {
    match node {
        PolicyNode::Filter(filter) => {
            let mut out = Map::new();
            if !filter.resource_types.is_empty() {
                out.insert("resource_types".to_string(), json!(filter.resource_types));
            }
            out.insert("attribute".to_string(), json!(filter.attribute.to_string()));
            out.insert("operator".to_string(), json!(filter.operator.as_str()));
            if let Some(value) = render_operand(&filter.operand) {
                out.insert("value".to_string(), value);
            }
            JsonValue::Object(out)
        }
        PolicyNode::Logical(logical) => {
            let mut out = Map::new();
            let children: Vec<JsonValue> = logical.children.iter().map(render_node).collect();
            out.insert(logical.op.as_str().to_string(), JsonValue::Array(children));
            if let Some(flag) = logical.collect_skipped_keys {
                out.insert("collect_skipped_keys".to_string(), json!(flag));
            }
            JsonValue::Object(out)
        }
        PolicyNode::Connection(conn) => {
            let mut connection = Map::new();
            connection.insert("direction".to_string(), json!(conn.direction.as_str()));
            match conn.resource_types.as_slice() {
                [] => {}
                [single] => {
                    connection.insert("resource_type".to_string(), json!(single));
                }
                many => {
                    connection.insert("resource_type".to_string(), json!(many));
                }
            }
            if let Some(label) = &conn.label {
                connection.insert("label".to_string(), json!(label));
            }
            json!({
                "connection": JsonValue::Object(connection),
                "filter": render_node(&conn.filter),
            })
        }
    }
}

fn render_operand(operand: &Operand) -> Option<JsonValue> {
    match operand {
        Operand::None => None,
        Operand::Value(v) => Some(JsonValue::from(v.clone())),
        Operand::List(items) => Some(JsonValue::Array(
            items.iter().cloned().map(JsonValue::from).collect(),
        )),
        Operand::Number(n) => Some(JsonValue::from(AttributeValue::Number(*n))),
        Operand::Pattern(p) => Some(json!(p.as_str())),
    }
}
