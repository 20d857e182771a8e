// ABOUTME: PostgreSQL remote store built on tokio-postgres
// ABOUTME: Connects lazily, optionally over TLS, and runs the generated sync statements

use anyhow::{Context, Result};
use async_trait::async_trait;
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use std::collections::HashMap;
use std::future::Future;
use std::str::FromStr;
use std::sync::Mutex;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, Config, NoTls, Statement};

use super::RemoteStore;
use crate::dialect::Dialect;
use crate::query;
use crate::target::TlsMode;
use crate::value::{PrimaryKey, SqlValue};

pub struct PostgresStore {
    config: Config,
    tls_mode: TlsMode,
    client: OnceCell<Client>,
    connection_task: Mutex<Option<JoinHandle<()>>>,
    /// Prepared upsert statements keyed by SQL text.
    statements: Mutex<HashMap<String, Statement>>,
}

impl PostgresStore {
    /// Parse the DSN without connecting.
    pub fn new(dsn: &str, tls_mode: TlsMode) -> Result<Self> {
        let config = Config::from_str(dsn).context("Invalid PostgreSQL connection string")?;
        Ok(Self {
            config,
            tls_mode,
            client: OnceCell::new(),
            connection_task: Mutex::new(None),
            statements: Mutex::new(HashMap::new()),
        })
    }

    /// Prepare `sql` once per store and reuse the server-side statement
    /// for every later row.
    async fn prepared(&self, client: &Client, sql: &str) -> Result<Statement> {
        let cached = match self.statements.lock() {
            Ok(statements) => statements.get(sql).cloned(),
            Err(_) => None,
        };
        if let Some(statement) = cached {
            return Ok(statement);
        }

        let statement = client
            .prepare(sql)
            .await
            .context("Failed to prepare statement")?;
        if let Ok(mut statements) = self.statements.lock() {
            statements.insert(sql.to_string(), statement.clone());
        }
        Ok(statement)
    }

    #[cfg(test)]
    fn prepared_count(&self) -> usize {
        self.statements.lock().map(|s| s.len()).unwrap_or(0)
    }

    async fn client(&self) -> Result<&Client> {
        self.client.get_or_try_init(|| self.connect()).await
    }

    async fn connect(&self) -> Result<Client> {
        match self.tls_mode {
            TlsMode::Require => {
                // sslmode=require encrypts without verifying the server certificate
                let connector = TlsConnector::builder()
                    .danger_accept_invalid_certs(true)
                    .danger_accept_invalid_hostnames(true)
                    .build()
                    .context("Failed to build TLS connector")?;
                let (client, connection) = self
                    .config
                    .connect(MakeTlsConnector::new(connector))
                    .await
                    .context("Failed to connect to PostgreSQL over TLS")?;
                self.spawn_connection(connection);
                Ok(client)
            }
            TlsMode::Disable => {
                let (client, connection) = self
                    .config
                    .connect(NoTls)
                    .await
                    .context("Failed to connect to PostgreSQL")?;
                self.spawn_connection(connection);
                Ok(client)
            }
        }
    }

    fn spawn_connection<F>(&self, connection: F)
    where
        F: Future<Output = Result<(), tokio_postgres::Error>> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("PostgreSQL connection error: {}", e);
            }
        });
        if let Ok(mut task) = self.connection_task.lock() {
            *task = Some(handle);
        }
    }
}

fn as_params(values: &[SqlValue]) -> Vec<&(dyn ToSql + Sync)> {
    values.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

#[async_trait]
impl RemoteStore for PostgresStore {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn ping(&self) -> Result<()> {
        let client = self.client().await?;
        client
            .simple_query("SELECT 1")
            .await
            .context("PostgreSQL ping failed")?;
        Ok(())
    }

    async fn count_rows(&self, table: &str) -> Result<i64> {
        let client = self.client().await?;
        let row = client
            .query_one(&query::build_count(table), &[])
            .await
            .with_context(|| format!("Failed to count rows in remote table '{}'", table))?;
        Ok(row.get(0))
    }

    async fn upsert_row(&self, table: &str, statement: &str, values: &[SqlValue]) -> Result<u64> {
        let client = self.client().await?;
        let prepared = self
            .prepared(client, statement)
            .await
            .with_context(|| format!("Failed to upsert row into '{}'", table))?;
        client
            .execute(&prepared, &as_params(values))
            .await
            .with_context(|| format!("Failed to upsert row into '{}'", table))
    }

    async fn primary_keys(&self, table: &str, primary_key: &str) -> Result<Vec<PrimaryKey>> {
        let client = self.client().await?;
        let sql = query::build_select_keys(table, primary_key, Dialect::Postgres);
        let rows = client
            .query(&sql, &[])
            .await
            .with_context(|| format!("Failed to read primary keys from '{}'", table))?;

        Ok(rows
            .iter()
            .filter_map(|row| row.get::<_, Option<String>>(0))
            .map(|key| PrimaryKey::parse(&key))
            .collect())
    }

    async fn delete_keys(
        &self,
        table: &str,
        primary_key: &str,
        keys: &[PrimaryKey],
    ) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let client = self.client().await?;
        let sql = query::build_delete_keys(table, primary_key, keys.len(), Dialect::Postgres);
        let values: Vec<SqlValue> = keys.iter().map(PrimaryKey::to_value).collect();
        client
            .execute(&sql, &as_params(&values))
            .await
            .with_context(|| format!("Failed to delete {} rows from '{}'", keys.len(), table))
    }

    async fn delete_all(&self, table: &str) -> Result<u64> {
        let client = self.client().await?;
        client
            .execute(&query::build_delete_all(table), &[])
            .await
            .with_context(|| format!("Failed to delete all rows from '{}'", table))
    }

    async fn close(&self) {
        let task = match self.connection_task.lock() {
            Ok(mut task) => task.take(),
            Err(_) => None,
        };
        if let Ok(mut statements) = self.statements.lock() {
            statements.clear();
        }
        if let Some(task) = task {
            task.abort();
            tracing::debug!("Closed PostgreSQL connection");
        }
    }
}
