//! SQL rendering for the PostgreSQL backend.
//!
//! Every statement is built from a static [`EntitySchema`], so table and
//! column names never come from request input. Literals always travel as
//! typed bind parameters. Only `LIMIT`/`OFFSET` are inlined, and those are
//! integers.
//!
//! Each table carries a hidden `"_rowid" BIGSERIAL` column. It is the final
//! sort key of every select, which gives the same insertion-order tie-break
//! as the in-memory backend.

use chrono::{DateTime, Utc};
use flare_core::{
    CompareOp, DefaultValue, EntitySchema, FieldDef, FieldType, FieldValue, Query, Record,
    ValidationError, Where, ID_FIELD,
};
use tokio_postgres::types::ToSql;

/// Hidden insertion-order column.
pub const ROWID_COLUMN: &str = "_rowid";

// ============================================================================
// SQL PARAMETER TYPE
// ============================================================================

/// Type-erased SQL parameter.
///
/// Nulls keep the column's type so the server never has to infer it.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    OptText(Option<String>),
    Bool(bool),
    OptBool(Option<bool>),
    Long(i64),
    OptLong(Option<i64>),
    Double(f64),
    OptDouble(Option<f64>),
    Timestamp(DateTime<Utc>),
    OptTimestamp(Option<DateTime<Utc>>),
}

impl SqlParam {
    /// Bind `value` as a parameter for a column of `field`'s type.
    pub fn for_field(field: &FieldDef, value: &FieldValue) -> Result<Self, ValidationError> {
        let param = match (field.field_type, value) {
            (FieldType::String, FieldValue::Null) => SqlParam::OptText(None),
            (FieldType::Boolean, FieldValue::Null) => SqlParam::OptBool(None),
            (FieldType::Integer, FieldValue::Null) => SqlParam::OptLong(None),
            (FieldType::Number, FieldValue::Null) => SqlParam::OptDouble(None),
            (FieldType::Timestamp, FieldValue::Null) => SqlParam::OptTimestamp(None),
            (FieldType::String, FieldValue::Text(s)) => SqlParam::Text(s.clone()),
            (FieldType::Boolean, FieldValue::Bool(b)) => SqlParam::Bool(*b),
            (FieldType::Integer, FieldValue::Integer(n)) => SqlParam::Long(*n),
            (FieldType::Number, FieldValue::Integer(n)) => SqlParam::Double(*n as f64),
            (FieldType::Number, FieldValue::Number(f)) => SqlParam::Double(*f),
            (FieldType::Timestamp, FieldValue::Timestamp(ts)) => SqlParam::Timestamp(*ts),
            (expected, other) => {
                return Err(ValidationError::TypeMismatch {
                    field: field.name.to_string(),
                    expected,
                    found: other.type_name().to_string(),
                })
            }
        };
        Ok(param)
    }

    /// Convert this SqlParam to a reference that can be used with tokio_postgres.
    pub fn as_to_sql(&self) -> &(dyn ToSql + Sync) {
        match self {
            SqlParam::Text(v) => v,
            SqlParam::OptText(v) => v,
            SqlParam::Bool(v) => v,
            SqlParam::OptBool(v) => v,
            SqlParam::Long(v) => v,
            SqlParam::OptLong(v) => v,
            SqlParam::Double(v) => v,
            SqlParam::OptDouble(v) => v,
            SqlParam::Timestamp(v) => v,
            SqlParam::OptTimestamp(v) => v,
        }
    }
}

// ============================================================================
// STATEMENT
// ============================================================================

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl Statement {
    fn raw(sql: String) -> Self {
        Self {
            sql,
            params: Vec::new(),
        }
    }

    pub fn param_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(SqlParam::as_to_sql).collect()
    }

    /// Bind a parameter and return its `$n` placeholder.
    fn bind(&mut self, field: &FieldDef, value: &FieldValue) -> Result<String, ValidationError> {
        self.params.push(SqlParam::for_field(field, value)?);
        Ok(format!("${}", self.params.len()))
    }

    fn push_filter(
        &mut self,
        schema: &EntitySchema,
        filter: Option<&Where>,
    ) -> Result<(), ValidationError> {
        if let Some(filter) = filter {
            let clause = self.render_where(schema, filter)?;
            self.sql.push_str(" WHERE ");
            self.sql.push_str(&clause);
        }
        Ok(())
    }

    fn render_where(
        &mut self,
        schema: &EntitySchema,
        filter: &Where,
    ) -> Result<String, ValidationError> {
        Ok(match filter {
            Where::And(clauses) if clauses.is_empty() => "TRUE".to_string(),
            Where::Or(clauses) if clauses.is_empty() => "FALSE".to_string(),
            Where::And(clauses) => self.render_group(schema, clauses, " AND ")?,
            Where::Or(clauses) => self.render_group(schema, clauses, " OR ")?,
            Where::Compare { field, op, value } => {
                let def = schema.require_field(field)?;
                let placeholder = self.bind(def, value)?;
                format!("{} {} {}", quote_ident(def.name), compare_sql(*op), placeholder)
            }
            Where::Between { field, low, high } => {
                let def = schema.require_field(field)?;
                let low = self.bind(def, low)?;
                let high = self.bind(def, high)?;
                format!("{} BETWEEN {} AND {}", quote_ident(def.name), low, high)
            }
            Where::In { field, values } => {
                let def = schema.require_field(field)?;
                if values.is_empty() {
                    "FALSE".to_string()
                } else {
                    let list = self.bind_list(def, values)?;
                    format!("{} IN ({})", quote_ident(def.name), list)
                }
            }
            Where::NotIn { field, values } => {
                let def = schema.require_field(field)?;
                if values.is_empty() {
                    format!("{} IS NOT NULL", quote_ident(def.name))
                } else {
                    let list = self.bind_list(def, values)?;
                    format!("{} NOT IN ({})", quote_ident(def.name), list)
                }
            }
            Where::IsNull { field } => {
                format!("{} IS NULL", quote_ident(schema.require_field(field)?.name))
            }
            Where::IsNotNull { field } => {
                format!("{} IS NOT NULL", quote_ident(schema.require_field(field)?.name))
            }
        })
    }

    fn render_group(
        &mut self,
        schema: &EntitySchema,
        clauses: &[Where],
        joiner: &str,
    ) -> Result<String, ValidationError> {
        let parts = clauses
            .iter()
            .map(|c| self.render_where(schema, c))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format!("({})", parts.join(joiner)))
    }

    fn bind_list(&mut self, def: &FieldDef, values: &[FieldValue]) -> Result<String, ValidationError> {
        let placeholders = values
            .iter()
            .map(|v| self.bind(def, v))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(placeholders.join(", "))
    }

    fn push_assignments(
        &mut self,
        schema: &EntitySchema,
        values: &Record,
    ) -> Result<(), ValidationError> {
        let mut assignments = Vec::with_capacity(values.len());
        for (name, value) in values.iter() {
            let def = schema.require_field(name)?;
            let placeholder = self.bind(def, value)?;
            assignments.push(format!("{} = {}", quote_ident(def.name), placeholder));
        }
        self.sql.push_str(&assignments.join(", "));
        Ok(())
    }
}

/// Double-quote an identifier so camelCase column names survive.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn compare_sql(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "=",
        CompareOp::Neq => "<>",
        CompareOp::Gt => ">",
        CompareOp::Gte => ">=",
        CompareOp::Lt => "<",
        CompareOp::Lte => "<=",
    }
}

// ============================================================================
// DATA STATEMENTS
// ============================================================================

/// `INSERT` of one complete row. Every schema field is written.
pub fn insert(schema: &EntitySchema, record: &Record) -> Result<Statement, ValidationError> {
    let mut stmt = Statement::raw(String::new());
    let mut columns = Vec::with_capacity(schema.fields.len());
    let mut placeholders = Vec::with_capacity(schema.fields.len());
    for def in schema.fields {
        columns.push(quote_ident(def.name));
        placeholders.push(stmt.bind(def, record.value_or_null(def.name))?);
    }
    stmt.sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(schema.table),
        columns.join(", "),
        placeholders.join(", ")
    );
    Ok(stmt)
}

/// `SELECT` returning one JSON object per row, keyed by field name.
pub fn select(schema: &EntitySchema, query: &Query) -> Result<Statement, ValidationError> {
    let fields: Vec<&'static str> = match &query.fields {
        Some(projection) => projection.resolve(schema)?,
        None => schema.field_names().collect(),
    };
    let object = fields
        .iter()
        .map(|f| format!("'{}', {}", f, quote_ident(f)))
        .collect::<Vec<_>>()
        .join(", ");

    let mut stmt = Statement::raw(format!(
        "SELECT json_build_object({}) FROM {}",
        object,
        quote_ident(schema.table)
    ));
    stmt.push_filter(schema, query.filter.as_ref())?;

    let mut order = Vec::with_capacity(query.order.len() + 1);
    for key in &query.order {
        let def = schema.require_field(&key.field)?;
        let collate = if def.field_type == FieldType::String {
            " COLLATE \"C\""
        } else {
            ""
        };
        order.push(format!(
            "{}{} {} NULLS LAST",
            quote_ident(def.name),
            collate,
            key.direction.as_sql()
        ));
    }
    order.push(quote_ident(ROWID_COLUMN));
    stmt.sql.push_str(" ORDER BY ");
    stmt.sql.push_str(&order.join(", "));

    if let Some(limit) = query.limit {
        stmt.sql.push_str(&format!(" LIMIT {}", sql_count(limit)));
    }
    if let Some(skip) = query.skip {
        stmt.sql.push_str(&format!(" OFFSET {}", sql_count(skip)));
    }
    Ok(stmt)
}

/// Postgres takes `LIMIT`/`OFFSET` as bigint.
fn sql_count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

pub fn count(schema: &EntitySchema, filter: Option<&Where>) -> Result<Statement, ValidationError> {
    let mut stmt = Statement::raw(format!("SELECT COUNT(*) FROM {}", quote_ident(schema.table)));
    stmt.push_filter(schema, filter)?;
    Ok(stmt)
}

/// `UPDATE` setting exactly the fields present in `changes`.
pub fn update(
    schema: &EntitySchema,
    changes: &Record,
    filter: Option<&Where>,
) -> Result<Statement, ValidationError> {
    if changes.is_empty() {
        return Err(ValidationError::MalformedRecord {
            reason: "update has no fields".to_string(),
        });
    }
    let mut stmt = Statement::raw(format!("UPDATE {} SET ", quote_ident(schema.table)));
    stmt.push_assignments(schema, changes)?;
    stmt.push_filter(schema, filter)?;
    Ok(stmt)
}

/// `UPDATE` of every mutable column of one row.
pub fn replace(schema: &EntitySchema, id: &str, record: &Record) -> Result<Statement, ValidationError> {
    let mut full = Record::new();
    for def in schema.mutable_fields() {
        full.insert(def.name, record.value_or_null(def.name).clone());
    }
    update(schema, &full, Some(&Where::id_eq(id)))
}

pub fn delete(schema: &EntitySchema, filter: Option<&Where>) -> Result<Statement, ValidationError> {
    let mut stmt = Statement::raw(format!("DELETE FROM {}", quote_ident(schema.table)));
    stmt.push_filter(schema, filter)?;
    Ok(stmt)
}

// ============================================================================
// SCHEMA STATEMENTS
// ============================================================================

fn column_definition(def: &FieldDef, with_constraints: bool) -> String {
    let mut column = format!("{} {}", quote_ident(def.name), def.field_type.sql_type());
    if let Some(DefaultValue::Integer(n)) = def.default {
        column.push_str(&format!(" DEFAULT {}", n));
    }
    if with_constraints {
        if def.name == ID_FIELD {
            column.push_str(" PRIMARY KEY");
        } else if def.required {
            column.push_str(" NOT NULL");
        }
    }
    column
}

/// `CREATE TABLE IF NOT EXISTS` with every schema column.
pub fn create_table(schema: &EntitySchema) -> String {
    let mut columns = vec![format!("{} BIGSERIAL", quote_ident(ROWID_COLUMN))];
    columns.extend(schema.fields.iter().map(|def| column_definition(def, true)));
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(schema.table),
        columns.join(", ")
    )
}

/// One `ADD COLUMN IF NOT EXISTS` per column, for tables created by an
/// older field list. Constraints are left to table creation.
pub fn add_missing_columns(schema: &EntitySchema) -> Vec<String> {
    let table = quote_ident(schema.table);
    let mut statements = vec![format!(
        "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} BIGSERIAL",
        table,
        quote_ident(ROWID_COLUMN)
    )];
    statements.extend(schema.fields.iter().map(|def| {
        format!(
            "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {}",
            table,
            column_definition(def, false)
        )
    }));
    statements
}

pub fn drop_table(schema: &EntitySchema) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(schema.table))
}
