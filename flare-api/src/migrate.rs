//! Table migration for the PostgreSQL backend.

use crate::db::DbClient;
use crate::sql;
use flare_core::{EntitySchema, FlareResult, StorageError, ALL_SCHEMAS};
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// What to do with existing tables at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MigrationMode {
    /// Create missing tables and add missing columns. Existing rows survive.
    #[default]
    Alter,
    /// Drop every table and create it again.
    Rebuild,
    /// Leave the schema alone.
    None,
}

impl MigrationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationMode::Alter => "alter",
            MigrationMode::Rebuild => "rebuild",
            MigrationMode::None => "none",
        }
    }

    /// Mode selected by command-line arguments: `--rebuild` drops tables.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if args.into_iter().any(|a| a.as_ref() == "--rebuild") {
            MigrationMode::Rebuild
        } else {
            MigrationMode::Alter
        }
    }
}

impl FromStr for MigrationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alter" => Ok(MigrationMode::Alter),
            "rebuild" | "drop" => Ok(MigrationMode::Rebuild),
            "none" | "off" => Ok(MigrationMode::None),
            other => Err(format!("unknown migration mode '{}'", other)),
        }
    }
}

impl fmt::Display for MigrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statements that bring one table in line with its schema.
pub fn migration_statements(schema: &EntitySchema, mode: MigrationMode) -> Vec<String> {
    match mode {
        MigrationMode::None => Vec::new(),
        MigrationMode::Alter => {
            let mut statements = vec![sql::create_table(schema)];
            statements.extend(sql::add_missing_columns(schema));
            statements
        }
        MigrationMode::Rebuild => vec![sql::drop_table(schema), sql::create_table(schema)],
    }
}

/// Migrate every entity table.
pub async fn migrate(db: &DbClient, mode: MigrationMode) -> FlareResult<()> {
    if mode == MigrationMode::None {
        info!("Schema migration disabled");
        return Ok(());
    }
    info!(mode = %mode, "Migrating schemas");

    let conn = db.get_conn().await?;
    for schema in ALL_SCHEMAS {
        let batch = migration_statements(schema, mode).join(";\n");
        conn.batch_execute(&batch)
            .await
            .map_err(|e| StorageError::Query {
                reason: format!("migrating {}: {}", schema.table, e),
            })?;
        info!(table = schema.table, "Table migrated");
    }
    Ok(())
}
