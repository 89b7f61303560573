//! Operator semantics over resolved attribute values.
//!
//! Positive operators hold if any match satisfies them; `not_*` operators hold if no
//! match satisfies the positive form, so an absent attribute satisfies them. `Null` is
//! treated as absent throughout.

use crate::policy::{Operand, Operator};
use crate::value::AttributeValue;
use std::cmp::Ordering;

/// Apply `operator` to every resolved match of a filter leaf.
pub(crate) fn apply(operator: Operator, operand: &Operand, matches: &[&AttributeValue]) -> bool {
    let present: Vec<&AttributeValue> = matches.iter().copied().filter(|v| !v.is_null()).collect();

    match operator {
        Operator::Exists => !present.is_empty(),
        Operator::NotExists => present.is_empty(),
        op => match op.negates() {
            Some(positive) => !present.iter().any(|v| holds(positive, operand, v)),
            None => present.iter().any(|v| holds(op, operand, v)),
        },
    }
}

/// Equality tolerant of source spelling: numbers (and numeric strings) compare
/// numerically, everything else by normalized string.
pub fn loose_eq(a: &AttributeValue, b: &AttributeValue) -> bool {
    let (a, b) = (a.scalar_view(), b.scalar_view());
    if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
        return x == y;
    }
    a.normalized_string() == b.normalized_string()
}

pub fn loose_cmp(a: &AttributeValue, n: f64) -> Option<Ordering> {
    a.as_number()?.partial_cmp(&n)
}

fn holds(operator: Operator, operand: &Operand, value: &AttributeValue) -> bool {
    match (operator, operand) {
        (Operator::Equals, Operand::Value(expected)) => loose_eq(value, expected),
        (Operator::Within, Operand::List(allowed)) => match value.scalar_view() {
            AttributeValue::List(items) => items.iter().all(|v| contains_loose(allowed, v)),
            scalar => contains_loose(allowed, scalar),
        },
        (Operator::Contains, Operand::Value(needle)) => match value.scalar_view() {
            AttributeValue::List(items) => contains_loose(items, needle),
            AttributeValue::Map(map) => map.contains_key(&needle.normalized_string()),
            AttributeValue::String(s) => s.contains(&needle.normalized_string()),
            _ => false,
        },
        (Operator::StartingWith, Operand::Value(prefix)) => {
            scalar_text(value).is_some_and(|s| s.starts_with(&prefix.normalized_string()))
        }
        (Operator::EndingWith, Operand::Value(suffix)) => {
            scalar_text(value).is_some_and(|s| s.ends_with(&suffix.normalized_string()))
        }
        (Operator::RegexMatch, Operand::Pattern(pattern)) => {
            scalar_text(value).is_some_and(|s| pattern.is_match(&s))
        }
        (Operator::GreaterThan, Operand::Number(n)) => {
            loose_cmp(value, *n) == Some(Ordering::Greater)
        }
        (Operator::GreaterThanOrEqual, Operand::Number(n)) => {
            matches!(loose_cmp(value, *n), Some(Ordering::Greater | Ordering::Equal))
        }
        (Operator::LessThan, Operand::Number(n)) => loose_cmp(value, *n) == Some(Ordering::Less),
        (Operator::LessThanOrEqual, Operand::Number(n)) => {
            matches!(loose_cmp(value, *n), Some(Ordering::Less | Ordering::Equal))
        }
        (Operator::IsEmpty, _) => value.is_empty_value(),
        (Operator::IsNotEmpty, _) => !value.is_empty_value(),
        (Operator::IsTrue, _) => value.as_bool() == Some(true),
        (Operator::IsFalse, _) => value.as_bool() == Some(false),
        (Operator::LengthEquals, Operand::Number(n)) => {
            length_cmp(value, *n) == Some(Ordering::Equal)
        }
        (Operator::LengthGreaterThan, Operand::Number(n)) => {
            length_cmp(value, *n) == Some(Ordering::Greater)
        }
        (Operator::LengthLessThan, Operand::Number(n)) => {
            length_cmp(value, *n) == Some(Ordering::Less)
        }
        (Operator::Subset, Operand::List(allowed)) => {
            as_items(value).iter().all(|v| contains_loose(allowed, v))
        }
        (Operator::Intersects, Operand::List(wanted)) => {
            as_items(value).iter().any(|v| contains_loose(wanted, v))
        }
        // Operand shapes are validated at parse time; anything else fails closed.
        _ => false,
    }
}

fn contains_loose(haystack: &[AttributeValue], needle: &AttributeValue) -> bool {
    haystack.iter().any(|v| loose_eq(v, needle))
}

/// String view of a scalar, `None` for lists and maps.
fn scalar_text(value: &AttributeValue) -> Option<String> {
    match value.scalar_view() {
        AttributeValue::List(_) | AttributeValue::Map(_) | AttributeValue::Null => None,
        scalar => Some(scalar.normalized_string()),
    }
}

fn as_items(value: &AttributeValue) -> Vec<&AttributeValue> {
    match value {
        AttributeValue::List(items) => items.iter().collect(),
        scalar => vec![scalar],
    }
}

fn length_cmp(value: &AttributeValue, n: f64) -> Option<Ordering> {
    (value.length()? as f64).partial_cmp(&n)
}
