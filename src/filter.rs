//! MongoDB-style metadata filter DSL (C7, §4.7).
//!
//! A filter is an arbitrary JSON value; it's parsed into a [`FilterNode`]
//! tree and evaluated against a document's first-class columns plus its
//! free-form `metadata` map. Evaluation never panics or throws on a type
//! mismatch — a comparison against an incompatible type simply evaluates to
//! `false` (fails closed). The only error path is a malformed filter shape
//! (unknown operator, non-object `$and`/`$or` member).

use serde_json::Value;

use crate::error::CoreError;
use crate::models::{Metadata, COLUMN_FIELDS};

#[derive(Debug, Clone)]
pub enum FilterNode {
    And(Vec<FilterNode>),
    Or(Vec<FilterNode>),
    Nor(Vec<FilterNode>),
    Not(Box<FilterNode>),
    Field(String, FieldOp),
}

#[derive(Debug, Clone)]
pub enum FieldOp {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    All(Vec<Value>),
    Exists(bool),
}

/// Parses a raw JSON filter into a [`FilterNode`] tree.
///
/// `{"k": "v"}` is sugar for `{"k": {"$eq": "v"}}`; an object with multiple
/// top-level keys is sugar for an implicit `$and` over each key.
pub fn parse_filter(value: &Value) -> Result<FilterNode, CoreError> {
    let obj = value
        .as_object()
        .ok_or_else(|| CoreError::InvalidFilter("filter must be a JSON object".to_string()))?;

    let clauses: Result<Vec<FilterNode>, CoreError> = obj
        .iter()
        .map(|(key, val)| parse_top_level_entry(key, val))
        .collect();
    let mut clauses = clauses?;

    if clauses.len() == 1 {
        Ok(clauses.remove(0))
    } else {
        Ok(FilterNode::And(clauses))
    }
}

fn parse_top_level_entry(key: &str, val: &Value) -> Result<FilterNode, CoreError> {
    match key {
        "$and" => Ok(FilterNode::And(parse_node_array(val)?)),
        "$or" => Ok(FilterNode::Or(parse_node_array(val)?)),
        "$nor" => Ok(FilterNode::Nor(parse_node_array(val)?)),
        "$not" => Ok(FilterNode::Not(Box::new(parse_filter(val)?))),
        field => Ok(FilterNode::Field(field.to_string(), parse_field_ops(val)?)),
    }
}

fn parse_node_array(val: &Value) -> Result<Vec<FilterNode>, CoreError> {
    let arr = val
        .as_array()
        .ok_or_else(|| CoreError::InvalidFilter("expected an array of filters".to_string()))?;
    arr.iter().map(parse_filter).collect()
}

/// Parses the operator object for a single field, or wraps a bare scalar as
/// an implicit `$eq`.
fn parse_field_ops(val: &Value) -> Result<FieldOp, CoreError> {
    match val {
        Value::Object(obj) if obj.keys().next().is_some_and(|k| k.starts_with('$')) => {
            if obj.len() != 1 {
                return Err(CoreError::InvalidFilter(
                    "a field operator object must have exactly one key".to_string(),
                ));
            }
            let (op, operand) = obj.iter().next().unwrap();
            match op.as_str() {
                "$eq" => Ok(FieldOp::Eq(operand.clone())),
                "$ne" => Ok(FieldOp::Ne(operand.clone())),
                "$gt" => Ok(FieldOp::Gt(operand.clone())),
                "$gte" => Ok(FieldOp::Gte(operand.clone())),
                "$lt" => Ok(FieldOp::Lt(operand.clone())),
                "$lte" => Ok(FieldOp::Lte(operand.clone())),
                "$exists" => Ok(FieldOp::Exists(operand.as_bool().unwrap_or(true))),
                "$in" => Ok(FieldOp::In(as_array_or_err(operand)?)),
                "$nin" => Ok(FieldOp::Nin(as_array_or_err(operand)?)),
                "$all" => Ok(FieldOp::All(as_array_or_err(operand)?)),
                other => Err(CoreError::InvalidFilter(format!("unknown operator: {other}"))),
            }
        }
        other => Ok(FieldOp::Eq(other.clone())),
    }
}

fn as_array_or_err(val: &Value) -> Result<Vec<Value>, CoreError> {
    val.as_array()
        .cloned()
        .ok_or_else(|| CoreError::InvalidFilter("operator expects an array operand".to_string()))
}

/// Evaluates `node` against a document's column fields and free-form
/// metadata. `columns` resolves the [`COLUMN_FIELDS`] by name; anything else
/// is looked up in `metadata`.
pub fn evaluate(node: &FilterNode, columns: &dyn Fn(&str) -> Option<Value>, metadata: &Metadata) -> bool {
    match node {
        FilterNode::And(nodes) => nodes.iter().all(|n| evaluate(n, columns, metadata)),
        FilterNode::Or(nodes) => nodes.iter().any(|n| evaluate(n, columns, metadata)),
        FilterNode::Nor(nodes) => !nodes.iter().any(|n| evaluate(n, columns, metadata)),
        FilterNode::Not(inner) => !evaluate(inner, columns, metadata),
        FilterNode::Field(field, op) => {
            let actual = if COLUMN_FIELDS.contains(&field.as_str()) {
                columns(field)
            } else {
                metadata.get(field).cloned()
            };
            evaluate_op(op, actual.as_ref())
        }
    }
}

fn evaluate_op(op: &FieldOp, actual: Option<&Value>) -> bool {
    match op {
        FieldOp::Exists(want) => actual.is_some() == *want,
        FieldOp::Eq(expected) => actual == Some(expected),
        FieldOp::Ne(expected) => actual != Some(expected),
        FieldOp::In(set) => actual.is_some_and(|a| set.contains(a)),
        FieldOp::Nin(set) => !actual.is_some_and(|a| set.contains(a)),
        FieldOp::All(required) => match actual.and_then(|a| a.as_array()) {
            Some(arr) => required.iter().all(|r| arr.contains(r)),
            None => false,
        },
        FieldOp::Gt(expected) => compare(actual, expected).is_some_and(|o| o.is_gt()),
        FieldOp::Gte(expected) => compare(actual, expected).is_some_and(|o| o.is_ge()),
        FieldOp::Lt(expected) => compare(actual, expected).is_some_and(|o| o.is_lt()),
        FieldOp::Lte(expected) => compare(actual, expected).is_some_and(|o| o.is_le()),
    }
}

/// Numeric or lexicographic comparison; `None` on type mismatch (fails
/// closed rather than panicking).
fn compare(actual: Option<&Value>, expected: &Value) -> Option<std::cmp::Ordering> {
    let actual = actual?;
    if let (Some(a), Some(b)) = (actual.as_f64(), expected.as_f64()) {
        return a.partial_cmp(&b);
    }
    if let (Some(a), Some(b)) = (actual.as_str(), expected.as_str()) {
        return Some(a.cmp(b));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_columns(_: &str) -> Option<Value> {
        None
    }

    #[test]
    fn implicit_eq_on_bare_scalar() {
        let filter = parse_filter(&json!({"category": "tech"})).unwrap();
        let mut metadata = Metadata::new();
        metadata.insert("category".to_string(), json!("tech"));
        assert!(evaluate(&filter, &no_columns, &metadata));

        metadata.insert("category".to_string(), json!("finance"));
        assert!(!evaluate(&filter, &no_columns, &metadata));
    }

    #[test]
    fn implicit_and_across_multiple_keys() {
        let filter = parse_filter(&json!({"a": 1, "b": 2})).unwrap();
        let mut metadata = Metadata::new();
        metadata.insert("a".to_string(), json!(1));
        metadata.insert("b".to_string(), json!(2));
        assert!(evaluate(&filter, &no_columns, &metadata));

        metadata.insert("b".to_string(), json!(3));
        assert!(!evaluate(&filter, &no_columns, &metadata));
    }

    #[test]
    fn gt_and_lte_numeric_range() {
        let filter = parse_filter(&json!({"score": {"$gt": 10, "$lte": 50}}));
        // a $gt/$lte pair under one key isn't valid (one key per op object);
        // express as an explicit $and instead.
        assert!(filter.is_err());

        let filter = parse_filter(&json!({"$and": [
            {"score": {"$gt": 10}},
            {"score": {"$lte": 50}},
        ]}))
        .unwrap();
        let mut metadata = Metadata::new();
        metadata.insert("score".to_string(), json!(25));
        assert!(evaluate(&filter, &no_columns, &metadata));
        metadata.insert("score".to_string(), json!(5));
        assert!(!evaluate(&filter, &no_columns, &metadata));
    }

    #[test]
    fn type_mismatch_fails_closed_not_panics() {
        let filter = parse_filter(&json!({"score": {"$gt": 10}})).unwrap();
        let mut metadata = Metadata::new();
        metadata.insert("score".to_string(), json!("not a number"));
        assert!(!evaluate(&filter, &no_columns, &metadata));
    }

    #[test]
    fn exists_false_matches_absent_key() {
        let filter = parse_filter(&json!({"ghost": {"$exists": false}})).unwrap();
        let metadata = Metadata::new();
        assert!(evaluate(&filter, &no_columns, &metadata));
    }

    #[test]
    fn unknown_operator_is_invalid_filter() {
        let err = parse_filter(&json!({"a": {"$bogus": 1}})).unwrap_err();
        assert!(matches!(err, CoreError::InvalidFilter(_)));
    }

    #[test]
    fn or_and_not_compose() {
        let filter = parse_filter(&json!({
            "$or": [
                {"a": 1},
                {"$not": {"a": 2}},
            ]
        }))
        .unwrap();
        let mut metadata = Metadata::new();
        metadata.insert("a".to_string(), json!(3));
        assert!(evaluate(&filter, &no_columns, &metadata));
    }

    #[test]
    fn column_field_routes_to_columns_callback() {
        let filter = parse_filter(&json!({"filename": "report.pdf"})).unwrap();
        let columns = |k: &str| -> Option<Value> {
            if k == "filename" {
                Some(json!("report.pdf"))
            } else {
                None
            }
        };
        let metadata = Metadata::new();
        assert!(evaluate(&filter, &columns, &metadata));
    }
}
