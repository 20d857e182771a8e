// ABOUTME: Static catalog of the tables pushed to the remote database
// ABOUTME: Column order defines positional binding for reads and upserts

use serde::Serialize;

/// How a local column's values should be interpreted before binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
    /// Timestamp stored as text by the local ORM
    DateTime,
    /// Calendar date stored as text by the local ORM
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn col(name: &'static str, kind: ColumnKind) -> Column {
    Column { name, kind }
}

/// A synchronizable table.
///
/// `columns[0]` is always the primary key; the catalog tests enforce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableDescriptor {
    pub name: &'static str,
    pub primary_key: &'static str,
    pub columns: &'static [Column],
    /// Tables this one holds foreign keys to.
    pub references: &'static [&'static str],
}

impl TableDescriptor {
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    pub fn primary_key_index(&self) -> usize {
        self.columns
            .iter()
            .position(|c| c.name == self.primary_key)
            .unwrap_or(0)
    }
}

use ColumnKind::{Date, DateTime, Integer, Real, Text};

const USERS: &[Column] = &[
    col("id", Integer),
    col("username", Text),
    col("password", Text),
    col("name", Text),
    col("email", Text),
    col("phone", Text),
    col("avatar", Text),
    col("role", Text),
    col("department", Text),
    col("position", Text),
    col("status", Integer),
    col("last_login_time", DateTime),
    col("create_time", DateTime),
    col("update_time", DateTime),
];

const PROJECTS: &[Column] = &[
    col("id", Integer),
    col("name", Text),
    col("company", Text),
    col("total_amount", Real),
    col("received_amount", Real),
    col("status", Text),
    col("type", Text),
    col("contract_number", Text),
    col("contract_date", Date),
    col("payment_method", Text),
    col("start_date", Date),
    col("end_date", Date),
    col("description", Text),
    col("user_id", Integer),
    col("create_time", DateTime),
    col("update_time", DateTime),
];

const PAYMENTS: &[Column] = &[
    col("id", Integer),
    col("project_id", Integer),
    col("stage", Text),
    col("amount", Real),
    col("percentage", Real),
    col("plan_date", Date),
    col("status", Text),
    col("actual_date", Date),
    col("method", Text),
    col("remark", Text),
    col("user_id", Integer),
    col("create_time", DateTime),
    col("update_time", DateTime),
];

const DICTIONARIES: &[Column] = &[
    col("id", Integer),
    col("code", Text),
    col("name", Text),
    col("status", Integer),
    col("remark", Text),
    col("create_time", DateTime),
    col("update_time", DateTime),
];

const DICTIONARY_ITEMS: &[Column] = &[
    col("id", Integer),
    col("dictionary_id", Integer),
    col("label", Text),
    col("value", Text),
    col("sort", Integer),
    col("status", Integer),
    col("remark", Text),
    col("create_time", DateTime),
    col("update_time", DateTime),
];

const NOTIFICATIONS: &[Column] = &[
    col("id", Integer),
    col("title", Text),
    col("content", Text),
    col("type", Integer),
    col("sender_id", Integer),
    col("is_global", Integer),
    col("create_time", DateTime),
    col("update_time", DateTime),
];

const USER_NOTIFICATIONS: &[Column] = &[
    col("id", Integer),
    col("user_id", Integer),
    col("notification_id", Integer),
    col("is_read", Integer),
    col("read_time", DateTime),
];

const ACCESS_TOKENS: &[Column] = &[
    col("id", Integer),
    col("user_id", Integer),
    col("name", Text),
    col("token_hash", Text),
    col("scopes", Text),
    col("status", Integer),
    col("last_used_at", DateTime),
    col("expires_at", DateTime),
    col("create_time", DateTime),
    col("update_time", DateTime),
];

/// All synchronizable tables, parents before children.
static TABLES: &[TableDescriptor] = &[
    TableDescriptor {
        name: "users",
        primary_key: "id",
        columns: USERS,
        references: &[],
    },
    TableDescriptor {
        name: "projects",
        primary_key: "id",
        columns: PROJECTS,
        references: &["users"],
    },
    TableDescriptor {
        name: "payments",
        primary_key: "id",
        columns: PAYMENTS,
        references: &["projects", "users"],
    },
    TableDescriptor {
        name: "dictionaries",
        primary_key: "id",
        columns: DICTIONARIES,
        references: &[],
    },
    TableDescriptor {
        name: "dictionary_item",
        primary_key: "id",
        columns: DICTIONARY_ITEMS,
        references: &["dictionaries"],
    },
    TableDescriptor {
        name: "notifications",
        primary_key: "id",
        columns: NOTIFICATIONS,
        references: &["users"],
    },
    TableDescriptor {
        name: "user_notifications",
        primary_key: "id",
        columns: USER_NOTIFICATIONS,
        references: &["users", "notifications"],
    },
    TableDescriptor {
        name: "personal_access_tokens",
        primary_key: "id",
        columns: ACCESS_TOKENS,
        references: &["users"],
    },
];

/// The catalog in dependency order.
///
/// Upserting in this order never inserts a child before its parent.
/// Stale-row deletion is the opposite concern: a parent row whose children
/// still exist remotely fails to delete until the child table has been
/// reconciled, and is picked up by the next run.
pub fn tables() -> &'static [TableDescriptor] {
    TABLES
}

pub fn find(name: &str) -> Option<&'static TableDescriptor> {
    TABLES.iter().find(|t| t.name == name)
}

pub fn table_names() -> Vec<&'static str> {
    TABLES.iter().map(|t| t.name).collect()
}

/// Describe every pair in `requested` where a table is listed before a
/// catalog table it references. Unknown names are ignored.
pub fn ordering_warnings(requested: &[String]) -> Vec<String> {
    let mut warnings = Vec::new();
    for (idx, name) in requested.iter().enumerate() {
        let Some(table) = find(name) else {
            continue;
        };
        for parent in table.references {
            if requested[idx + 1..].iter().any(|later| later == parent) {
                warnings.push(format!(
                    "'{}' is synced before its parent '{}'; rows referencing new '{}' rows may be rejected",
                    table.name, parent, parent
                ));
            }
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_has_eight_tables_in_order() {
        assert_eq!(
            table_names(),
            vec![
                "users",
                "projects",
                "payments",
                "dictionaries",
                "dictionary_item",
                "notifications",
                "user_notifications",
                "personal_access_tokens",
            ]
        );
    }

    #[test]
    fn test_primary_key_is_first_column() {
        for table in tables() {
            assert_eq!(table.columns[0].name, table.primary_key, "{}", table.name);
            assert_eq!(table.primary_key_index(), 0);
        }
    }

    #[test]
    fn test_column_names_are_unique_identifiers() {
        for table in tables() {
            crate::utils::validate_identifier(table.name).unwrap();
            let mut seen = HashSet::new();
            for column in table.columns {
                crate::utils::validate_identifier(column.name).unwrap();
                assert!(seen.insert(column.name), "duplicate {}.{}", table.name, column.name);
            }
        }
    }

    #[test]
    fn test_catalog_order_respects_references() {
        let names = table_names();
        for (idx, table) in tables().iter().enumerate() {
            for parent in table.references {
                let parent_idx = names.iter().position(|n| n == parent).unwrap();
                assert!(parent_idx < idx, "{} before {}", parent, table.name);
            }
        }
        let all: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        assert!(ordering_warnings(&all).is_empty());
    }

    #[test]
    fn test_ordering_warnings_flags_child_first() {
        let requested = vec![
            "payments".to_string(),
            "projects".to_string(),
            "ghosts".to_string(),
        ];
        let warnings = ordering_warnings(&requested);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("'payments' is synced before its parent 'projects'"));
    }

    #[test]
    fn test_find() {
        let projects = find("projects").unwrap();
        assert_eq!(projects.columns.len(), 16);
        assert_eq!(projects.column_names()[1], "name");
        assert!(find("dictionary-items").is_none());
    }
}
