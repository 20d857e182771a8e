// ABOUTME: SQLite introspection and catalog-ordered row reading
// ABOUTME: Functions to list tables, count rows, and project rows for upserts

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::catalog::TableDescriptor;
use crate::value::{Row, SqlValue};

/// List all user tables in a SQLite database
///
/// Queries sqlite_master for user-created tables, skipping `sqlite_*`
/// internals. Returns names sorted alphabetically.
pub fn list_tables(conn: &Connection) -> Result<Vec<String>> {
    tracing::debug!("Listing tables from SQLite database");

    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master \
             WHERE type='table' \
             AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
        )
        .context("Failed to prepare statement to list tables")?;

    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("Failed to query table list")?
        .collect::<Result<Vec<String>, _>>()
        .context("Failed to collect table names")?;

    Ok(tables)
}

/// Get row count for a specific table
///
/// # Security
///
/// The table name is validated before it is interpolated into SQL.
pub fn get_table_row_count(conn: &Connection, table: &str) -> Result<i64> {
    crate::utils::validate_identifier(table).context("Invalid table name for row count query")?;

    tracing::debug!("Getting row count for local table '{}'", table);

    let query = crate::query::build_count(table);
    let count: i64 = conn
        .query_row(&query, [], |row| row.get(0))
        .with_context(|| format!("Failed to count rows in table '{}'", table))?;

    Ok(count)
}

/// Read every row of a catalog table, projected in catalog column order.
///
/// Rows come back ordered by primary key, which only matters for log
/// readability. Values are typed by [`SqlValue::from_sqlite`] using the
/// column kinds from the catalog.
///
/// # Performance
///
/// Loads the whole table into memory. The local store is a single-user
/// desktop database, so tables stay small.
pub fn read_table_rows(conn: &Connection, table: &TableDescriptor) -> Result<Vec<Row>> {
    crate::utils::validate_identifier(table.name).context("Invalid table name for data reading")?;

    let query = format!(
        "SELECT {} FROM {} ORDER BY {}",
        table.column_names().join(", "),
        table.name,
        table.primary_key
    );

    let mut stmt = conn
        .prepare(&query)
        .with_context(|| format!("Failed to prepare statement for table '{}'", table.name))?;

    let rows = stmt
        .query_map([], |row| {
            let mut values = Vec::with_capacity(table.columns.len());
            for (idx, column) in table.columns.iter().enumerate() {
                values.push(SqlValue::from_sqlite(row.get_ref(idx)?, column.kind));
            }
            Ok(values)
        })
        .with_context(|| format!("Failed to query rows from table '{}'", table.name))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to collect rows from table '{}'", table.name))?;

    tracing::debug!("Read {} rows from local table '{}'", rows.len(), table.name);

    Ok(rows)
}
