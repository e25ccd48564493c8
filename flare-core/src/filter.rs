//! Where expressions: the declarative predicate language shared by every
//! entity type.
//!
//! The wire form is a JSON object:
//!
//! ```text
//! {"jobId": "abc"}                                 equality
//! {"errorTime": null}                              is null
//! {"passed": {"neq": null}}                        is not null
//! {"connectionTime": {"between": [from, to]}}      inclusive range
//! {"totalFailedConnections": {"gt": 10}}           comparison
//! {"or": [{"connected": true}, {"hasError": true}]}
//! ```
//!
//! Several keys in one object are an implicit `and`. Parsing is done against
//! an [`EntitySchema`] so unknown fields and mistyped literals are rejected
//! before anything reaches storage.

use crate::error::ValidationError;
use crate::record::Record;
use crate::schema::{EntitySchema, FieldDef, ID_FIELD};
use crate::value::{json_type_name, FieldValue};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};
use std::cmp::Ordering;

/// Operator keys accepted inside a field's operator object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    /// Equal to
    Eq,
    /// Not equal to
    Neq,
    /// Greater than
    Gt,
    /// Greater than or equal
    Gte,
    /// Less than
    Lt,
    /// Less than or equal
    Lte,
    /// Inclusive range `[low, high]`
    Between,
    /// In list of values
    Inq,
    /// Not in list of values
    Nin,
}

impl FilterOperator {
    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "eq" => FilterOperator::Eq,
            "neq" => FilterOperator::Neq,
            "gt" => FilterOperator::Gt,
            "gte" => FilterOperator::Gte,
            "lt" => FilterOperator::Lt,
            "lte" => FilterOperator::Lte,
            "between" => FilterOperator::Between,
            "inq" => FilterOperator::Inq,
            "nin" => FilterOperator::Nin,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::Between => "between",
            FilterOperator::Inq => "inq",
            FilterOperator::Nin => "nin",
        }
    }
}

/// Binary comparison used by [`Where::Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Neq => ordering != Ordering::Equal,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Gte => ordering != Ordering::Less,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Lte => ordering != Ordering::Greater,
        }
    }

    pub fn operator(&self) -> FilterOperator {
        match self {
            CompareOp::Eq => FilterOperator::Eq,
            CompareOp::Neq => FilterOperator::Neq,
            CompareOp::Gt => FilterOperator::Gt,
            CompareOp::Gte => FilterOperator::Gte,
            CompareOp::Lt => FilterOperator::Lt,
            CompareOp::Lte => FilterOperator::Lte,
        }
    }
}

/// A predicate over one entity's fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Where {
    /// All clauses must hold. Empty matches everything.
    And(Vec<Where>),
    /// Any clause must hold. Empty matches nothing.
    Or(Vec<Where>),
    Compare {
        field: String,
        op: CompareOp,
        value: FieldValue,
    },
    Between {
        field: String,
        low: FieldValue,
        high: FieldValue,
    },
    In {
        field: String,
        values: Vec<FieldValue>,
    },
    NotIn {
        field: String,
        values: Vec<FieldValue>,
    },
    IsNull {
        field: String,
    },
    IsNotNull {
        field: String,
    },
}

impl Where {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Create an equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(field, CompareOp::Eq, value)
    }

    pub fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<FieldValue>) -> Self {
        Where::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn between(
        field: impl Into<String>,
        low: impl Into<FieldValue>,
        high: impl Into<FieldValue>,
    ) -> Self {
        Where::Between {
            field: field.into(),
            low: low.into(),
            high: high.into(),
        }
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Where::IsNull {
            field: field.into(),
        }
    }

    pub fn is_not_null(field: impl Into<String>) -> Self {
        Where::IsNotNull {
            field: field.into(),
        }
    }

    /// Match the single record addressed by `id`.
    pub fn id_eq(id: impl Into<String>) -> Self {
        Self::eq(ID_FIELD, FieldValue::Text(id.into()))
    }

    /// Conjoin two expressions, flattening nested `and`s.
    pub fn and(self, other: Where) -> Where {
        match (self, other) {
            (Where::And(mut a), Where::And(b)) => {
                a.extend(b);
                Where::And(a)
            }
            (Where::And(mut a), other) => {
                a.push(other);
                Where::And(a)
            }
            (this, Where::And(mut b)) => {
                b.insert(0, this);
                Where::And(b)
            }
            (this, other) => Where::And(vec![this, other]),
        }
    }

    // ========================================================================
    // Parsing
    // ========================================================================

    /// Parse the JSON wire form against `schema`.
    pub fn parse(schema: &EntitySchema, json: &JsonValue) -> Result<Where, ValidationError> {
        let object = json.as_object().ok_or_else(|| ValidationError::MalformedFilter {
            reason: format!("where must be an object, got {}", json_type_name(json)),
        })?;

        let mut clauses = Vec::with_capacity(object.len());
        for (key, value) in object {
            let clause = match key.as_str() {
                "and" => Where::And(parse_list(schema, key, value)?),
                "or" => Where::Or(parse_list(schema, key, value)?),
                field => parse_field(schema, field, value)?,
            };
            clauses.push(clause);
        }

        Ok(match clauses.len() {
            1 => clauses.remove(0),
            _ => Where::And(clauses),
        })
    }

    /// Check a programmatically built expression against `schema`.
    pub fn validate(&self, schema: &EntitySchema) -> Result<(), ValidationError> {
        match self {
            Where::And(clauses) | Where::Or(clauses) => {
                clauses.iter().try_for_each(|c| c.validate(schema))
            }
            Where::Compare { field, value, .. } => {
                let def = schema.require_field(field)?;
                check_literal(def, value)
            }
            Where::Between { field, low, high } => {
                let def = schema.require_field(field)?;
                check_literal(def, low)?;
                check_literal(def, high)
            }
            Where::In { field, values } | Where::NotIn { field, values } => {
                let def = schema.require_field(field)?;
                values.iter().try_for_each(|v| check_literal(def, v))
            }
            Where::IsNull { field } | Where::IsNotNull { field } => {
                schema.require_field(field).map(|_| ())
            }
        }
    }

    // ========================================================================
    // Evaluation
    // ========================================================================

    /// Evaluate against a record using relational null semantics: any
    /// comparison with a null field is false.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Where::And(clauses) => clauses.iter().all(|c| c.matches(record)),
            Where::Or(clauses) => clauses.iter().any(|c| c.matches(record)),
            Where::Compare { field, op, value } => record
                .value_or_null(field)
                .compare(value)
                .map(|ordering| op.holds(ordering))
                .unwrap_or(false),
            Where::Between { field, low, high } => {
                let current = record.value_or_null(field);
                matches!(
                    current.compare(low),
                    Some(Ordering::Greater | Ordering::Equal)
                ) && matches!(current.compare(high), Some(Ordering::Less | Ordering::Equal))
            }
            Where::In { field, values } => {
                let current = record.value_or_null(field);
                values.iter().any(|v| current.equals(v))
            }
            Where::NotIn { field, values } => {
                let current = record.value_or_null(field);
                !current.is_null() && !values.iter().any(|v| current.equals(v))
            }
            Where::IsNull { field } => record.value_or_null(field).is_null(),
            Where::IsNotNull { field } => !record.value_or_null(field).is_null(),
        }
    }

    /// Render back to the JSON wire form.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Where::And(clauses) => json!({ "and": clauses.iter().map(Where::to_json).collect::<Vec<_>>() }),
            Where::Or(clauses) => json!({ "or": clauses.iter().map(Where::to_json).collect::<Vec<_>>() }),
            Where::Compare { field, op, value } => {
                let operand = match op {
                    CompareOp::Eq => value.to_json(),
                    other => json!({ other.operator().as_str(): value.to_json() }),
                };
                single(field, operand)
            }
            Where::Between { field, low, high } => {
                single(field, json!({ "between": [low.to_json(), high.to_json()] }))
            }
            Where::In { field, values } => single(
                field,
                json!({ "inq": values.iter().map(FieldValue::to_json).collect::<Vec<_>>() }),
            ),
            Where::NotIn { field, values } => single(
                field,
                json!({ "nin": values.iter().map(FieldValue::to_json).collect::<Vec<_>>() }),
            ),
            Where::IsNull { field } => single(field, JsonValue::Null),
            Where::IsNotNull { field } => single(field, json!({ "neq": null })),
        }
    }
}

fn single(field: &str, operand: JsonValue) -> JsonValue {
    let mut map = Map::new();
    map.insert(field.to_string(), operand);
    JsonValue::Object(map)
}

fn parse_list(
    schema: &EntitySchema,
    key: &str,
    json: &JsonValue,
) -> Result<Vec<Where>, ValidationError> {
    let items = json.as_array().ok_or_else(|| ValidationError::MalformedFilter {
        reason: format!("'{}' expects an array of where objects", key),
    })?;
    items.iter().map(|item| Where::parse(schema, item)).collect()
}

fn parse_field(
    schema: &EntitySchema,
    name: &str,
    json: &JsonValue,
) -> Result<Where, ValidationError> {
    let def = schema.require_field(name)?;

    match json {
        JsonValue::Null => Ok(Where::is_null(def.name)),
        JsonValue::Object(ops) => {
            if ops.is_empty() {
                return Err(ValidationError::MalformedFilter {
                    reason: format!("empty operator object on field '{}'", name),
                });
            }
            let mut clauses = ops
                .iter()
                .map(|(op, operand)| parse_operator(def, op, operand))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(match clauses.len() {
                1 => clauses.remove(0),
                _ => Where::And(clauses),
            })
        }
        JsonValue::Array(_) => Err(ValidationError::MalformedFilter {
            reason: format!("field '{}' was given an array; use inq for membership", name),
        }),
        literal => Ok(Where::Compare {
            field: def.name.to_string(),
            op: CompareOp::Eq,
            value: FieldValue::from_json(def, literal)?,
        }),
    }
}

fn parse_operator(
    def: &FieldDef,
    raw_op: &str,
    operand: &JsonValue,
) -> Result<Where, ValidationError> {
    let operator = FilterOperator::parse(raw_op).ok_or_else(|| ValidationError::UnknownOperator {
        field: def.name.to_string(),
        operator: raw_op.to_string(),
    })?;
    let field = def.name.to_string();

    let op = match operator {
        FilterOperator::Eq if operand.is_null() => return Ok(Where::IsNull { field }),
        FilterOperator::Neq if operand.is_null() => return Ok(Where::IsNotNull { field }),
        FilterOperator::Between => {
            let bounds = literal_list(def, operator, operand)?;
            return match <[FieldValue; 2]>::try_from(bounds) {
                Ok([low, high]) => Ok(Where::Between { field, low, high }),
                Err(_) => Err(ValidationError::MalformedFilter {
                    reason: format!("between on '{}' expects exactly two bounds", def.name),
                }),
            };
        }
        FilterOperator::Inq => {
            let values = literal_list(def, operator, operand)?;
            return Ok(Where::In { field, values });
        }
        FilterOperator::Nin => {
            let values = literal_list(def, operator, operand)?;
            return Ok(Where::NotIn { field, values });
        }
        FilterOperator::Eq => CompareOp::Eq,
        FilterOperator::Neq => CompareOp::Neq,
        FilterOperator::Gt => CompareOp::Gt,
        FilterOperator::Gte => CompareOp::Gte,
        FilterOperator::Lt => CompareOp::Lt,
        FilterOperator::Lte => CompareOp::Lte,
    };

    Ok(Where::Compare {
        field,
        op,
        value: non_null_literal(def, operator, operand)?,
    })
}

fn non_null_literal(
    def: &FieldDef,
    operator: FilterOperator,
    json: &JsonValue,
) -> Result<FieldValue, ValidationError> {
    if json.is_null() || json.is_array() || json.is_object() {
        return Err(ValidationError::InvalidValue {
            field: def.name.to_string(),
            reason: format!(
                "'{}' expects a scalar literal, got {}",
                operator.as_str(),
                json_type_name(json)
            ),
        });
    }
    FieldValue::from_json(def, json)
}

fn literal_list(
    def: &FieldDef,
    operator: FilterOperator,
    json: &JsonValue,
) -> Result<Vec<FieldValue>, ValidationError> {
    let items = json.as_array().ok_or_else(|| ValidationError::MalformedFilter {
        reason: format!("'{}' on '{}' expects an array", operator.as_str(), def.name),
    })?;
    items
        .iter()
        .map(|item| non_null_literal(def, operator, item))
        .collect()
}

fn check_literal(def: &FieldDef, value: &FieldValue) -> Result<(), ValidationError> {
    if value.conforms_to(def.field_type) {
        Ok(())
    } else {
        Err(ValidationError::TypeMismatch {
            field: def.name.to_string(),
            expected: def.field_type,
            found: value.type_name().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::SOCKET_SCHEMA;
    use crate::value::parse_timestamp;

    fn socket(job: &str, connected: bool, at: &str) -> Record {
        Record::new()
            .with("id", format!("{}-{}", job, at))
            .with("jobId", job)
            .with("connected", connected)
            .with(
                "connectionTime",
                FieldValue::Timestamp(parse_timestamp(at).unwrap()),
            )
    }

    #[test]
    fn test_implicit_conjunction() {
        let filter = Where::parse(
            &SOCKET_SCHEMA,
            &json!({"jobId": "time", "connected": true}),
        )
        .unwrap();
        assert!(matches!(filter, Where::And(ref c) if c.len() == 2));

        assert!(filter.matches(&socket("time", true, "2019-03-09T11:51:13Z")));
        assert!(!filter.matches(&socket("time", false, "2019-03-09T11:51:13Z")));
        assert!(!filter.matches(&socket("other", true, "2019-03-09T11:51:13Z")));
    }

    #[test]
    fn test_between_is_inclusive() {
        let filter = Where::parse(
            &SOCKET_SCHEMA,
            &json!({"connectionTime": {"between": ["2019-03-09T11:51:12Z", "2019-03-09T11:51:22Z"]}}),
        )
        .unwrap();

        assert!(filter.matches(&socket("t", true, "2019-03-09T11:51:12Z")));
        assert!(filter.matches(&socket("t", true, "2019-03-09T11:51:22Z")));
        assert!(!filter.matches(&socket("t", true, "2019-03-09T11:51:22.000001Z")));
        assert!(!filter.matches(&socket("t", true, "2019-03-09T11:51:11Z")));
    }

    #[test]
    fn test_null_checks() {
        let is_null = Where::parse(&SOCKET_SCHEMA, &json!({"errorTime": null})).unwrap();
        let not_null = Where::parse(&SOCKET_SCHEMA, &json!({"errorTime": {"neq": null}})).unwrap();
        let record = socket("t", true, "2019-03-09T11:51:13Z");

        assert!(is_null.matches(&record));
        assert!(!not_null.matches(&record));

        let with_error = record.with("errorTime", parse_timestamp("2019-03-09T11:52:00Z").unwrap());
        assert!(!is_null.matches(&with_error));
        assert!(not_null.matches(&with_error));
    }

    #[test]
    fn test_comparisons_with_null_field_are_false() {
        let neq = Where::parse(&SOCKET_SCHEMA, &json!({"hasError": {"neq": true}})).unwrap();
        let record = socket("t", true, "2019-03-09T11:51:13Z");
        assert!(!neq.matches(&record));
        assert!(neq.matches(&record.with("hasError", false)));
    }

    #[test]
    fn test_or_and_nesting() {
        let filter = Where::parse(
            &SOCKET_SCHEMA,
            &json!({"or": [{"jobId": "a"}, {"and": [{"jobId": "b"}, {"connected": false}]}]}),
        )
        .unwrap();

        assert!(filter.matches(&socket("a", true, "2019-03-09T11:51:13Z")));
        assert!(filter.matches(&socket("b", false, "2019-03-09T11:51:13Z")));
        assert!(!filter.matches(&socket("b", true, "2019-03-09T11:51:13Z")));
        assert!(Where::And(vec![]).matches(&Record::new()));
        assert!(!Where::Or(vec![]).matches(&Record::new()));
    }

    #[test]
    fn test_membership() {
        let filter = Where::parse(&SOCKET_SCHEMA, &json!({"jobId": {"inq": ["a", "b"]}})).unwrap();
        assert!(filter.matches(&socket("b", true, "2019-03-09T11:51:13Z")));
        assert!(!filter.matches(&socket("c", true, "2019-03-09T11:51:13Z")));

        let filter = Where::parse(&SOCKET_SCHEMA, &json!({"jobId": {"nin": ["a"]}})).unwrap();
        assert!(filter.matches(&socket("c", true, "2019-03-09T11:51:13Z")));
        assert!(!filter.matches(&Record::new()));
    }

    #[test]
    fn test_rejects_unknown_field_and_operator() {
        let err = Where::parse(&SOCKET_SCHEMA, &json!({"colour": "red"})).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownField { .. }));

        let err = Where::parse(&SOCKET_SCHEMA, &json!({"jobId": {"like": "a%"}})).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownOperator { .. }));

        let err = Where::parse(&SOCKET_SCHEMA, &json!({"connectionTime": "soon"})).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { .. }));

        let err = Where::parse(&SOCKET_SCHEMA, &json!({"connectionTime": {"between": ["2019-03-09T11:51:12Z"]}}))
            .unwrap_err();
        assert!(matches!(err, ValidationError::MalformedFilter { .. }));

        let err = Where::parse(&SOCKET_SCHEMA, &json!({"connected": {"gt": null}})).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { .. }));
    }

    #[test]
    fn test_validate_programmatic_expression() {
        assert!(Where::eq("jobId", "x").validate(&SOCKET_SCHEMA).is_ok());
        assert!(Where::eq("jobId", true).validate(&SOCKET_SCHEMA).is_err());
        assert!(Where::is_null("nope").validate(&SOCKET_SCHEMA).is_err());
        assert!(Where::eq("timeToConnection", 12i64).validate(&SOCKET_SCHEMA).is_ok());
    }

    #[test]
    fn test_to_json_parses_back() {
        let original = json!({"and": [
            {"jobId": "time"},
            {"connectionTime": {"between": ["2019-03-09T11:51:12Z", "2019-03-09T11:51:22Z"]}},
            {"errorTime": null}
        ]});
        let parsed = Where::parse(&SOCKET_SCHEMA, &original).unwrap();
        let reparsed = Where::parse(&SOCKET_SCHEMA, &parsed.to_json()).unwrap();
        assert_eq!(parsed, reparsed);
    }

    #[test]
    fn test_and_flattens() {
        let combined = Where::eq("jobId", "a")
            .and(Where::eq("connected", true))
            .and(Where::is_null("errorTime"));
        assert!(matches!(combined, Where::And(ref c) if c.len() == 3));
    }
}
