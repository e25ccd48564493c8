//! Queries: a where expression plus ordering, pagination and projection.

use crate::error::ValidationError;
use crate::filter::Where;
use crate::record::Record;
use crate::schema::{EntitySchema, ID_FIELD};
use crate::value::json_type_name;
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::fmt;

/// Sort direction for one order key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// One `"field ASC|DESC"` entry of an order clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    pub field: String,
    pub direction: SortDirection,
}

impl OrderKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    fn parse(schema: &EntitySchema, raw: &str) -> Result<Self, ValidationError> {
        let mut parts = raw.split_whitespace();
        let field = parts.next().ok_or_else(|| ValidationError::MalformedFilter {
            reason: "empty order key".to_string(),
        })?;
        let direction = match parts.next() {
            None => SortDirection::Asc,
            Some(d) if d.eq_ignore_ascii_case("asc") => SortDirection::Asc,
            Some(d) if d.eq_ignore_ascii_case("desc") => SortDirection::Desc,
            Some(other) => {
                return Err(ValidationError::MalformedFilter {
                    reason: format!("unknown sort direction '{}' in '{}'", other, raw),
                })
            }
        };
        if parts.next().is_some() {
            return Err(ValidationError::MalformedFilter {
                reason: format!("order key '{}' has trailing tokens", raw),
            });
        }
        let def = schema.require_field(field)?;
        Ok(Self {
            field: def.name.to_string(),
            direction,
        })
    }

    /// Compare two records on this key. Nulls sort last in either direction.
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        let left = a.value_or_null(&self.field);
        let right = b.value_or_null(&self.field);
        match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let ordering = left.compare(right).unwrap_or(Ordering::Equal);
                match self.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            }
        }
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.direction.as_sql())
    }
}

/// Field selection.
///
/// With any included field only those are returned (plus `id` unless it is
/// excluded). With only exclusions every other field is returned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Projection {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Projection {
    pub fn include<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: fields.into_iter().map(Into::into).collect(),
            exclude: Vec::new(),
        }
    }

    fn parse(schema: &EntitySchema, json: &JsonValue) -> Result<Self, ValidationError> {
        let mut projection = Projection::default();
        match json {
            JsonValue::Array(names) => {
                for name in names {
                    let name = name.as_str().ok_or_else(|| ValidationError::MalformedFilter {
                        reason: "fields list must contain field names".to_string(),
                    })?;
                    projection.include.push(schema.require_field(name)?.name.to_string());
                }
            }
            JsonValue::Object(flags) => {
                for (name, flag) in flags {
                    let def = schema.require_field(name)?;
                    match flag.as_bool() {
                        Some(true) => projection.include.push(def.name.to_string()),
                        Some(false) => projection.exclude.push(def.name.to_string()),
                        None => {
                            return Err(ValidationError::MalformedFilter {
                                reason: format!("fields.{} must be a boolean", name),
                            })
                        }
                    }
                }
            }
            other => {
                return Err(ValidationError::MalformedFilter {
                    reason: format!("fields must be an object or array, got {}", json_type_name(other)),
                })
            }
        }
        Ok(projection)
    }

    /// Resolve to the concrete field list, in schema order.
    pub fn resolve(&self, schema: &EntitySchema) -> Result<Vec<&'static str>, ValidationError> {
        for name in self.include.iter().chain(&self.exclude) {
            schema.require_field(name)?;
        }

        let excluded = |name: &str| self.exclude.iter().any(|f| f == name);
        let fields: Vec<&'static str> = if self.include.is_empty() {
            schema.field_names().filter(|f| !excluded(f)).collect()
        } else {
            schema
                .field_names()
                .filter(|f| {
                    !excluded(f) && (*f == ID_FIELD || self.include.iter().any(|i| i == f))
                })
                .collect()
        };

        if fields.is_empty() {
            return Err(ValidationError::MalformedFilter {
                reason: "projection selects no fields".to_string(),
            });
        }
        Ok(fields)
    }
}

/// Which records, in what order, how many, with which fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    pub filter: Option<Where>,
    pub order: Vec<OrderKey>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
    pub fields: Option<Projection>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Where) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn order_by(mut self, key: OrderKey) -> Self {
        self.order.push(key);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn fields(mut self, projection: Projection) -> Self {
        self.fields = Some(projection);
        self
    }

    /// Parse the JSON `filter` object: `where`, `order`, `limit`,
    /// `skip`/`offset` and `fields`.
    pub fn parse(schema: &EntitySchema, json: &JsonValue) -> Result<Self, ValidationError> {
        let object = json.as_object().ok_or_else(|| ValidationError::MalformedFilter {
            reason: format!("filter must be an object, got {}", json_type_name(json)),
        })?;

        let mut query = Query::new();
        for (key, value) in object {
            match key.as_str() {
                "where" => query.filter = Some(Where::parse(schema, value)?),
                "order" => query.order = parse_order(schema, value)?,
                "limit" => query.limit = Some(parse_count(key, value)?),
                "skip" | "offset" => query.skip = Some(parse_count(key, value)?),
                "fields" => query.fields = Some(Projection::parse(schema, value)?),
                other => {
                    return Err(ValidationError::MalformedFilter {
                        reason: format!("unsupported filter key '{}'", other),
                    })
                }
            }
        }
        Ok(query)
    }

    /// Check a programmatically built query against `schema`.
    pub fn validate(&self, schema: &EntitySchema) -> Result<(), ValidationError> {
        if let Some(filter) = &self.filter {
            filter.validate(schema)?;
        }
        for key in &self.order {
            schema.require_field(&key.field)?;
        }
        if let Some(projection) = &self.fields {
            projection.resolve(schema)?;
        }
        Ok(())
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.filter.as_ref().map_or(true, |f| f.matches(record))
    }

    /// Evaluate the whole query over rows held in memory, in insertion order.
    pub fn evaluate<'a, I>(&self, schema: &EntitySchema, rows: I) -> Result<Vec<Record>, ValidationError>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let projection = self
            .fields
            .as_ref()
            .map(|p| p.resolve(schema))
            .transpose()?;

        let mut matched: Vec<&Record> = rows.into_iter().filter(|r| self.matches(r)).collect();
        // sort_by is stable, so ties keep insertion order
        matched.sort_by(|a, b| {
            self.order
                .iter()
                .map(|key| key.compare(a, b))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        let window = matched
            .into_iter()
            .skip(self.skip.unwrap_or(0))
            .take(self.limit.unwrap_or(usize::MAX));

        Ok(match projection {
            Some(fields) => window.map(|r| r.project(&fields)).collect(),
            None => window.cloned().collect(),
        })
    }
}

fn parse_order(schema: &EntitySchema, json: &JsonValue) -> Result<Vec<OrderKey>, ValidationError> {
    match json {
        JsonValue::String(raw) => Ok(vec![OrderKey::parse(schema, raw)?]),
        JsonValue::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .ok_or_else(|| ValidationError::MalformedFilter {
                        reason: "order entries must be strings".to_string(),
                    })
                    .and_then(|raw| OrderKey::parse(schema, raw))
            })
            .collect(),
        other => Err(ValidationError::MalformedFilter {
            reason: format!("order must be a string or array, got {}", json_type_name(other)),
        }),
    }
}

/// Counts must also fit a signed 64-bit SQL `LIMIT`/`OFFSET`.
fn parse_count(key: &str, json: &JsonValue) -> Result<usize, ValidationError> {
    json.as_u64()
        .filter(|n| i64::try_from(*n).is_ok())
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| ValidationError::MalformedFilter {
            reason: format!("{} must be a non-negative integer, got {}", key, json),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{NODE_SCHEMA, SOCKET_SCHEMA};
    use crate::value::{parse_timestamp, FieldValue};
    use serde_json::json;

    fn socket(id: &str, job: &str, connected: bool, at: &str) -> Record {
        Record::new()
            .with("id", id)
            .with("jobId", job)
            .with("connected", connected)
            .with("connectionTime", parse_timestamp(at).unwrap())
    }

    fn time_sockets() -> Vec<Record> {
        let mut rows: Vec<Record> = [13, 15, 17, 20, 23, 24]
            .iter()
            .enumerate()
            .map(|(i, sec)| {
                socket(
                    &format!("s{}", i),
                    "time",
                    true,
                    &format!("2019-03-09T11:51:{}Z", sec),
                )
            })
            .collect();
        rows.push(socket("other", "other-job", true, "2019-03-09T11:51:15Z"));
        rows.push(socket("off", "time", false, "2019-03-09T11:51:16Z"));
        rows
    }

    fn window(from: &str, to: &str) -> JsonValue {
        json!({"where": {
            "jobId": "time",
            "connected": true,
            "connectionTime": {"between": [from, to]}
        }})
    }

    #[test]
    fn test_time_window_counts() {
        let rows = time_sockets();

        let first = Query::parse(&SOCKET_SCHEMA, &window("2019-03-09T11:51:12Z", "2019-03-09T11:51:22Z")).unwrap();
        assert_eq!(first.evaluate(&SOCKET_SCHEMA, &rows).unwrap().len(), 4);

        let second = Query::parse(&SOCKET_SCHEMA, &window("2019-03-09T11:51:22Z", "2019-03-09T11:51:32Z")).unwrap();
        assert_eq!(second.evaluate(&SOCKET_SCHEMA, &rows).unwrap().len(), 2);

        let edge = Query::parse(&SOCKET_SCHEMA, &window("2019-03-09T11:51:20Z", "2019-03-09T11:51:23Z")).unwrap();
        assert_eq!(edge.evaluate(&SOCKET_SCHEMA, &rows).unwrap().len(), 2);
    }

    #[test]
    fn test_order_limit_and_projection() {
        let rows = time_sockets();

        let latest = Query::parse(
            &SOCKET_SCHEMA,
            &json!({"order": "connectionTime DESC", "limit": 1, "fields": {"connectionTime": true, "id": false}}),
        )
        .unwrap()
        .evaluate(&SOCKET_SCHEMA, &rows)
        .unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].to_json(), json!({"connectionTime": "2019-03-09T11:51:24Z"}));

        let earliest = Query::parse(
            &SOCKET_SCHEMA,
            &json!({"order": ["connectionTime ASC"], "limit": 1, "fields": ["connectionTime"]}),
        )
        .unwrap()
        .evaluate(&SOCKET_SCHEMA, &rows)
        .unwrap();
        assert_eq!(
            earliest[0].to_json(),
            json!({"id": "s0", "connectionTime": "2019-03-09T11:51:13Z"})
        );
    }

    #[test]
    fn test_nulls_sort_last_both_directions() {
        let rows = vec![
            Record::new().with("id", "a").with("timeToConnection", 5.0),
            Record::new().with("id", "b"),
            Record::new().with("id", "c").with("timeToConnection", 1.0),
        ];
        let ids = |q: Query| -> Vec<String> {
            q.evaluate(&SOCKET_SCHEMA, &rows)
                .unwrap()
                .iter()
                .map(|r| r.id().unwrap().to_string())
                .collect()
        };

        assert_eq!(ids(Query::new().order_by(OrderKey::asc("timeToConnection"))), ["c", "a", "b"]);
        assert_eq!(ids(Query::new().order_by(OrderKey::desc("timeToConnection"))), ["a", "c", "b"]);
    }

    #[test]
    fn test_ties_keep_insertion_order_and_skip() {
        let rows: Vec<Record> = (0..5)
            .map(|i| {
                Record::new()
                    .with("id", format!("n{}", i))
                    .with("jobId", if i % 2 == 0 { "even" } else { "odd" })
            })
            .collect();

        let result = Query::parse(&NODE_SCHEMA, &json!({"order": "jobId", "skip": 1, "limit": 2}))
            .unwrap()
            .evaluate(&NODE_SCHEMA, &rows)
            .unwrap();
        let ids: Vec<_> = result.iter().filter_map(Record::id).collect();
        assert_eq!(ids, ["n2", "n4"]);
    }

    #[test]
    fn test_exclusion_only_projection() {
        let fields = Projection {
            include: vec![],
            exclude: vec!["createdAt".into()],
        }
        .resolve(&NODE_SCHEMA)
        .unwrap();
        assert!(fields.contains(&"id"));
        assert!(!fields.contains(&"createdAt"));

        let err = Projection {
            include: vec!["id".into()],
            exclude: vec!["id".into()],
        }
        .resolve(&NODE_SCHEMA)
        .unwrap_err();
        assert!(matches!(err, ValidationError::MalformedFilter { .. }));
    }

    #[test]
    fn test_rejects_malformed_filters() {
        for bad in [
            json!({"limit": -1}),
            json!({"limit": "ten"}),
            json!({"limit": 9_223_372_036_854_775_808u64}),
            json!({"skip": u64::MAX}),
            json!({"order": "name SIDEWAYS"}),
            json!({"order": "colour DESC"}),
            json!({"include": "sockets"}),
            json!({"fields": {"name": "yes"}}),
            json!("where"),
        ] {
            assert!(Query::parse(&NODE_SCHEMA, &bad).is_err(), "accepted {}", bad);
        }
    }

    #[test]
    fn test_largest_signed_count_is_accepted() {
        let query = Query::parse(&NODE_SCHEMA, &json!({"limit": i64::MAX, "offset": 0})).unwrap();
        assert_eq!(query.limit, Some(i64::MAX as usize));
        assert_eq!(query.skip, Some(0));
    }

    #[test]
    fn test_validate_builder_query() {
        let query = Query::new()
            .filter(Where::eq("jobId", "j"))
            .order_by(OrderKey::desc("createdAt"))
            .fields(Projection::include(["name"]));
        assert!(query.validate(&NODE_SCHEMA).is_ok());

        let bad = Query::new().order_by(OrderKey::asc("colour"));
        assert!(bad.validate(&NODE_SCHEMA).is_err());
        assert!(Query::new()
            .filter(Where::eq("running", FieldValue::Text("yes".into())))
            .validate(&NODE_SCHEMA)
            .is_err());
    }
}
