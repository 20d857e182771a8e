// ABOUTME: Pure SQL builders for upserts, counts, key scans and keyed deletes
// ABOUTME: Dialect-specific text is delegated to the Dialect capability set

use crate::dialect::Dialect;

/// Maximum number of keys bound into a single `DELETE ... IN (...)`.
///
/// Keeps statements well inside PostgreSQL's 65535-parameter limit and
/// MySQL's `max_allowed_packet` defaults.
pub const DELETE_BATCH_SIZE: usize = 1000;

/// Build an insert-or-update statement for one row.
///
/// Generates, for PostgreSQL:
/// ```sql
/// INSERT INTO t (id, name, amount) VALUES ($1, $2, $3)
/// ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, amount = EXCLUDED.amount
/// ```
/// and for MySQL:
/// ```sql
/// INSERT INTO t (id, name, amount) VALUES (?, ?, ?)
/// ON DUPLICATE KEY UPDATE name = VALUES(name), amount = VALUES(amount)
/// ```
/// The primary key is bound like every other column but never assigned.
///
/// # Examples
///
/// ```
/// use orange_sync::dialect::Dialect;
/// use orange_sync::query::build_upsert;
///
/// let sql = build_upsert("t", &["id", "name"], "id", Dialect::MySql);
/// assert_eq!(
///     sql,
///     "INSERT INTO t (id, name) VALUES (?, ?) ON DUPLICATE KEY UPDATE name = VALUES(name)"
/// );
/// ```
pub fn build_upsert(table: &str, columns: &[&str], primary_key: &str, dialect: Dialect) -> String {
    let assignments: Vec<String> = columns
        .iter()
        .filter(|c| **c != primary_key)
        .map(|c| dialect.update_assignment(c))
        .collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({}) {}",
        table,
        columns.join(", "),
        dialect.placeholders(1, columns.len()),
        dialect.conflict_clause(primary_key, &assignments)
    )
}

pub fn build_count(table: &str) -> String {
    format!("SELECT COUNT(*) FROM {}", table)
}

/// Select every primary key of `table`, rendered as text.
pub fn build_select_keys(table: &str, primary_key: &str, dialect: Dialect) -> String {
    format!(
        "SELECT {} FROM {} ORDER BY {}",
        dialect.key_as_text(primary_key),
        table,
        primary_key
    )
}

/// Delete `num_keys` rows by primary key:
/// ```sql
/// DELETE FROM t WHERE id IN ($1, $2, $3)
/// ```
pub fn build_delete_keys(
    table: &str,
    primary_key: &str,
    num_keys: usize,
    dialect: Dialect,
) -> String {
    format!(
        "DELETE FROM {} WHERE {} IN ({})",
        table,
        primary_key,
        dialect.placeholders(1, num_keys)
    )
}

pub fn build_delete_all(table: &str) -> String {
    format!("DELETE FROM {}", table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_upsert_postgres() {
        let sql = build_upsert("t", &["id", "name", "amount"], "id", Dialect::Postgres);
        assert_eq!(
            sql,
            "INSERT INTO t (id, name, amount) VALUES ($1, $2, $3) ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, amount = EXCLUDED.amount"
        );
    }

    #[test]
    fn test_build_upsert_mysql() {
        let sql = build_upsert("t", &["id", "name", "amount"], "id", Dialect::MySql);
        assert_eq!(
            sql,
            "INSERT INTO t (id, name, amount) VALUES (?, ?, ?) ON DUPLICATE KEY UPDATE name = VALUES(name), amount = VALUES(amount)"
        );
    }

    #[test]
    fn test_build_upsert_is_deterministic() {
        let a = build_upsert("projects", &["id", "name"], "id", Dialect::Postgres);
        let b = build_upsert("projects", &["id", "name"], "id", Dialect::Postgres);
        assert_eq!(a, b);
    }

    #[test]
    fn test_build_upsert_primary_key_only() {
        assert_eq!(
            build_upsert("t", &["id"], "id", Dialect::Postgres),
            "INSERT INTO t (id) VALUES ($1) ON CONFLICT (id) DO NOTHING"
        );
    }

    #[test]
    fn test_build_upsert_for_catalog_table() {
        let table = crate::catalog::find("user_notifications").unwrap();
        let sql = build_upsert(
            table.name,
            &table.column_names(),
            table.primary_key,
            Dialect::Postgres,
        );
        assert!(sql.starts_with(
            "INSERT INTO user_notifications (id, user_id, notification_id, is_read, read_time) VALUES ($1, $2, $3, $4, $5)"
        ));
        assert!(!sql.contains("id = EXCLUDED.id,"));
        assert!(sql.contains("user_id = EXCLUDED.user_id"));
    }

    #[test]
    fn test_build_delete_keys() {
        assert_eq!(
            build_delete_keys("payments", "id", 3, Dialect::Postgres),
            "DELETE FROM payments WHERE id IN ($1, $2, $3)"
        );
        assert_eq!(
            build_delete_keys("payments", "id", 2, Dialect::MySql),
            "DELETE FROM payments WHERE id IN (?, ?)"
        );
    }

    #[test]
    fn test_build_select_keys_and_count() {
        assert_eq!(
            build_select_keys("users", "id", Dialect::Postgres),
            "SELECT CAST(id AS TEXT) FROM users ORDER BY id"
        );
        assert_eq!(
            build_select_keys("users", "id", Dialect::MySql),
            "SELECT CAST(id AS CHAR) FROM users ORDER BY id"
        );
        assert_eq!(build_count("users"), "SELECT COUNT(*) FROM users");
        assert_eq!(build_delete_all("users"), "DELETE FROM users");
    }
}
