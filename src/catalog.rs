use serde::Deserialize;
use tracing::info;

use crate::drivers::Connection;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Database {
    pub name: String,
}

/// One physical partition as reported by `system.parts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionDescriptor {
    pub database: String,
    pub table: String,
    /// Engine-defined partition key, passed through untouched.
    pub partition_id: String,
}

impl PartitionDescriptor {
    pub fn new(database: &str, table: &str, partition_id: &str) -> Self {
        Self {
            database: database.to_string(),
            table: table.to_string(),
            partition_id: partition_id.to_string(),
        }
    }

    pub fn freeze_statement(&self) -> String {
        format!(
            "ALTER TABLE {}.{} FREEZE PARTITION '{}';",
            quote_ident(&self.database),
            quote_ident(&self.table),
            self.partition_id
        )
    }
}

#[derive(Deserialize)]
struct DatabaseRow {
    name: String,
}

#[derive(Deserialize)]
struct PartRow {
    partition: String,
    table: String,
    database: String,
}

pub fn list_databases(conn: &dyn Connection) -> Result<Vec<Database>> {
    conn.query("SHOW DATABASES")?
        .into_iter()
        .map(|row| -> Result<Database> {
            let row: DatabaseRow = serde_json::from_value(row)?;
            Ok(Database { name: row.name })
        })
        .collect()
}

/// Active partitions of every user table in `database`, in catalog order.
/// Tables whose name starts with `.` (materialized view internals and other
/// hidden tables) are skipped.
pub fn list_partitions(conn: &dyn Connection, database: &str) -> Result<Vec<PartitionDescriptor>> {
    let sql = format!(
        "SELECT partition, table, database FROM system.parts WHERE active AND database = {}",
        quote_literal(database)
    );

    let mut partitions = Vec::new();
    for row in conn.query(&sql)? {
        let row: PartRow = serde_json::from_value(row)?;
        if row.table.starts_with('.') {
            continue;
        }
        info!(
            "found {} partition of {} table in {} database",
            row.partition, row.table, row.database
        );
        partitions.push(PartitionDescriptor::new(&row.database, &row.table, &row.partition));
    }
    Ok(partitions)
}

/// Plain `[A-Za-z_][A-Za-z0-9_]*` names go through untouched, anything else
/// is backtick-quoted.
fn quote_ident(name: &str) -> String {
    let mut chars = name.chars();
    let plain = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        return name.to_string();
    }
    let escaped = name.replace('\\', "\\\\").replace('`', "\\`");
    format!("`{escaped}`")
}

fn quote_literal(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}
