//! Policy documents (YAML or JSON) into [`Policy`] ASTs.
//!
//! Everything that can be wrong with a policy is caught here: unknown operators,
//! malformed paths, bad regexes, operand shape, combinator arity. Evaluation never
//! sees an invalid AST.

use crate::attr_path::AttributePath;
use crate::graph::Direction;
use crate::policy::ast::{
    ConnectionCondition, FilterCondition, LogicalCombinator, LogicalOp, Operand, Pattern, Policy,
    PolicyMetadata, PolicyNode,
};
use crate::policy::error::{PolicyParseError, PolicyParseErrorKind as Kind};
use crate::policy::operator::{OperandKind, Operator};
use crate::value::AttributeValue;
use infraguard_types::Severity;
use serde_json::{Map, Value as JsonValue};

const FILTER_KEYS: &[&str] = &["resource_types", "attribute", "operator", "value"];
const CONNECTION_KEYS: &[&str] = &["direction", "resource_type", "resource_types", "label"];

/// Parse a YAML (or JSON) policy document.
pub fn parse_policy_str(text: &str) -> Result<Policy, PolicyParseError> {
    let doc: JsonValue = serde_yaml::from_str(text)
        .map_err(|e| PolicyParseError::new(None, "", Kind::Syntax(e.to_string())))?;
    parse_policy_document(&doc)
}

/// Parse an already-deserialized policy document.
pub fn parse_policy_document(doc: &JsonValue) -> Result<Policy, PolicyParseError> {
    let policy_id = doc
        .get("metadata")
        .and_then(|m| m.get("id"))
        .and_then(JsonValue::as_str)
        .map(str::to_string);
    let parser = Parser { policy_id };

    let root = parser.mapping(doc, "")?;
    let metadata = parser.metadata(root.get("metadata"))?;
    let scope = match root.get("scope") {
        None | Some(JsonValue::Null) => None,
        Some(value) => {
            let scope = parser.mapping(value, "scope")?;
            parser.reject_unknown(scope, &["resource_types"], "scope")?;
            Some(parser.type_list(scope.get("resource_types"), "scope.resource_types")?)
        }
    };
    let definition = match root.get("definition") {
        Some(def) => parser.node(def, "definition")?,
        None => return Err(parser.error("", Kind::MissingField { field: "definition" })),
    };

    Ok(Policy::new(metadata, scope, definition))
}

struct Parser {
    policy_id: Option<String>,
}

impl Parser {
    fn error(&self, at: &str, kind: Kind) -> PolicyParseError {
        PolicyParseError::new(self.policy_id.clone(), at, kind)
    }

    fn mapping<'a>(
        &self,
        value: &'a JsonValue,
        at: &str,
    ) -> Result<&'a Map<String, JsonValue>, PolicyParseError> {
        value.as_object().ok_or_else(|| {
            self.error(
                at,
                Kind::InvalidField {
                    field: field_name(at),
                    expected: "a mapping",
                },
            )
        })
    }

    fn reject_unknown(
        &self,
        map: &Map<String, JsonValue>,
        allowed: &[&str],
        at: &str,
    ) -> Result<(), PolicyParseError> {
        match map.keys().find(|k| !allowed.contains(&k.as_str())) {
            Some(key) => Err(self.error(at, Kind::UnexpectedKey { key: key.clone() })),
            None => Ok(()),
        }
    }

    fn string(
        &self,
        value: Option<&JsonValue>,
        field: &'static str,
        at: &str,
    ) -> Result<Option<String>, PolicyParseError> {
        match value {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(self.error(
                at,
                Kind::InvalidField {
                    field: field.to_string(),
                    expected: "a string",
                },
            )),
        }
    }

    fn metadata(&self, value: Option<&JsonValue>) -> Result<PolicyMetadata, PolicyParseError> {
        let Some(value) = value else {
            return Err(self.error("", Kind::MissingField { field: "metadata" }));
        };
        let meta = self.mapping(value, "metadata")?;

        let id = self
            .string(meta.get("id"), "id", "metadata.id")?
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| self.error("metadata", Kind::MissingField { field: "id" }))?;
        let category = self
            .string(meta.get("category"), "category", "metadata.category")?
            .ok_or_else(|| self.error("metadata", Kind::MissingField { field: "category" }))?;
        let name = self.string(meta.get("name"), "name", "metadata.name")?;
        let guideline = self.string(meta.get("guideline"), "guideline", "metadata.guideline")?;
        let severity = match self.string(meta.get("severity"), "severity", "metadata.severity")? {
            None => None,
            Some(raw) => Some(Severity::parse(&raw).ok_or_else(|| {
                self.error("metadata.severity", Kind::InvalidSeverity { value: raw })
            })?),
        };

        Ok(PolicyMetadata {
            id,
            category,
            name,
            guideline,
            severity,
        })
    }

    /// A string or a list of strings.
    fn type_list(
        &self,
        value: Option<&JsonValue>,
        at: &str,
    ) -> Result<Vec<String>, PolicyParseError> {
        let invalid = || {
            self.error(
                at,
                Kind::InvalidField {
                    field: field_name(at),
                    expected: "a string or a list of strings",
                },
            )
        };
        match value {
            None | Some(JsonValue::Null) => Ok(Vec::new()),
            Some(JsonValue::String(s)) => Ok(vec![s.clone()]),
            Some(JsonValue::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
                .collect(),
            Some(_) => Err(invalid()),
        }
    }

    fn node(&self, value: &JsonValue, at: &str) -> Result<PolicyNode, PolicyParseError> {
        let map = self.mapping(value, at)?;

        let ops: Vec<LogicalOp> = [LogicalOp::And, LogicalOp::Or, LogicalOp::Not]
            .into_iter()
            .filter(|op| map.contains_key(op.as_str()))
            .collect();
        match ops.as_slice() {
            [op] => return self.logical(*op, map, at),
            [first, ..] => {
                return Err(self.error(
                    at,
                    Kind::InconsistentCombinator {
                        op: first.as_str(),
                        message: "a node may hold only one of and/or/not".to_string(),
                    },
                ));
            }
            [] => {}
        }

        if map.contains_key("connection") {
            return self.connection(map, at);
        }
        if map.contains_key("attribute") || map.contains_key("operator") {
            return self.filter(map, at);
        }

        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        Err(self.error(
            at,
            Kind::UnknownDefinition {
                keys: keys.join(", "),
            },
        ))
    }

    fn logical(
        &self,
        op: LogicalOp,
        map: &Map<String, JsonValue>,
        at: &str,
    ) -> Result<PolicyNode, PolicyParseError> {
        self.reject_unknown(map, &[op.as_str(), "collect_skipped_keys"], at)?;

        let collect_skipped_keys = match map.get("collect_skipped_keys") {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::Bool(b)) => Some(*b),
            Some(_) => {
                return Err(self.error(
                    at,
                    Kind::InvalidField {
                        field: "collect_skipped_keys".to_string(),
                        expected: "a boolean",
                    },
                ));
            }
        };

        let body = map.get(op.as_str()).unwrap_or(&JsonValue::Null);
        let child_at = |i: usize| format!("{}[{i}]", join(at, op.as_str()));
        let children = match (op, body) {
            (LogicalOp::Not, JsonValue::Object(_)) => {
                vec![self.node(body, &join(at, op.as_str()))?]
            }
            (_, JsonValue::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.node(item, &child_at(i)))
                .collect::<Result<Vec<_>, _>>()?,
            _ => {
                return Err(self.error(
                    at,
                    Kind::InconsistentCombinator {
                        op: op.as_str(),
                        message: "children must be a list of definitions".to_string(),
                    },
                ));
            }
        };

        match (op, children.len()) {
            (LogicalOp::Not, 1) => {}
            (LogicalOp::Not, n) => {
                return Err(self.error(
                    at,
                    Kind::InconsistentCombinator {
                        op: op.as_str(),
                        message: format!("expects exactly one child, found {n}"),
                    },
                ));
            }
            (_, 0) => {
                return Err(self.error(
                    at,
                    Kind::InconsistentCombinator {
                        op: op.as_str(),
                        message: "expects at least one child".to_string(),
                    },
                ));
            }
            _ => {}
        }

        Ok(PolicyNode::Logical(LogicalCombinator {
            op,
            children,
            collect_skipped_keys,
        }))
    }

    fn connection(
        &self,
        map: &Map<String, JsonValue>,
        at: &str,
    ) -> Result<PolicyNode, PolicyParseError> {
        self.reject_unknown(map, &["connection", "filter"], at)?;

        let conn_at = join(at, "connection");
        let conn = match map.get("connection") {
            Some(value) => self.mapping(value, &conn_at)?,
            None => return Err(self.error(at, Kind::MissingField { field: "connection" })),
        };
        self.reject_unknown(conn, CONNECTION_KEYS, &conn_at)?;

        let direction = match self.string(conn.get("direction"), "direction", &conn_at)? {
            None => Direction::default(),
            Some(raw) => Direction::parse(&raw)
                .ok_or_else(|| self.error(&conn_at, Kind::InvalidDirection { value: raw }))?,
        };

        let mut resource_types =
            self.type_list(conn.get("resource_type"), &join(&conn_at, "resource_type"))?;
        resource_types.extend(
            self.type_list(conn.get("resource_types"), &join(&conn_at, "resource_types"))?,
        );

        let label = self.string(conn.get("label"), "label", &conn_at)?;

        let filter_at = join(at, "filter");
        let filter = match map.get("filter") {
            Some(value) => self.node(value, &filter_at)?,
            None => return Err(self.error(at, Kind::MissingField { field: "filter" })),
        };

        Ok(PolicyNode::Connection(ConnectionCondition {
            direction,
            resource_types,
            label,
            filter: Box::new(filter),
        }))
    }

    fn filter(
        &self,
        map: &Map<String, JsonValue>,
        at: &str,
    ) -> Result<PolicyNode, PolicyParseError> {
        self.reject_unknown(map, FILTER_KEYS, at)?;

        let resource_types =
            self.type_list(map.get("resource_types"), &join(at, "resource_types"))?;

        let attr_at = join(at, "attribute");
        let raw_path = self
            .string(map.get("attribute"), "attribute", &attr_at)?
            .ok_or_else(|| self.error(at, Kind::MissingField { field: "attribute" }))?;
        let attribute = AttributePath::parse(&raw_path)
            .map_err(|e| self.error(&attr_at, Kind::InvalidPath(e)))?;

        let op_at = join(at, "operator");
        let name = self
            .string(map.get("operator"), "operator", &op_at)?
            .ok_or_else(|| self.error(at, Kind::MissingField { field: "operator" }))?;
        let operator = Operator::parse(&name)
            .ok_or_else(|| self.error(&op_at, Kind::UnknownOperator { name }))?;

        let operand = self.operand(operator, map.get("value"), &join(at, "value"))?;

        Ok(PolicyNode::Filter(FilterCondition {
            resource_types,
            attribute,
            operator,
            operand,
        }))
    }

    fn operand(
        &self,
        operator: Operator,
        value: Option<&JsonValue>,
        at: &str,
    ) -> Result<Operand, PolicyParseError> {
        let value = value.filter(|v| !v.is_null());
        let mismatch = |expected: &'static str| {
            self.error(
                at,
                Kind::OperandMismatch {
                    operator: operator.as_str(),
                    expected,
                },
            )
        };

        match (operator.operand_kind(), value) {
            (OperandKind::None, None) => Ok(Operand::None),
            (OperandKind::None, Some(_)) => Err(mismatch("no value")),
            (_, None) => Err(self.error(at, Kind::MissingField { field: "value" })),
            (OperandKind::Value, Some(v)) => Ok(Operand::Value(AttributeValue::from(v.clone()))),
            (OperandKind::List, Some(JsonValue::Array(items))) => Ok(Operand::List(
                items.iter().cloned().map(AttributeValue::from).collect(),
            )),
            (OperandKind::List, Some(_)) => Err(mismatch("a list value")),
            (OperandKind::Number, Some(v)) => AttributeValue::from(v.clone())
                .as_number()
                .filter(|_| !v.is_array())
                .map(Operand::Number)
                .ok_or_else(|| mismatch("a numeric value")),
            (OperandKind::Pattern, Some(JsonValue::String(source))) => Pattern::new(source)
                .map(Operand::Pattern)
                .map_err(|e| {
                    self.error(
                        at,
                        Kind::InvalidRegex {
                            pattern: source.clone(),
                            message: e.to_string(),
                        },
                    )
                }),
            (OperandKind::Pattern, Some(_)) => Err(mismatch("a regex string")),
        }
    }
}

fn join(at: &str, key: &str) -> String {
    if at.is_empty() {
        key.to_string()
    } else {
        format!("{at}.{key}")
    }
}

fn field_name(at: &str) -> String {
    match at.rsplit('.').next() {
        Some("") | None => "document".to_string(),
        Some(last) => last.to_string(),
    }
}
