// ABOUTME: MySQL remote store built on mysql_async
// ABOUTME: Single-connection pool with utf8mb4 session setup and optional TLS

use anyhow::{Context, Result};
use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Opts, OptsBuilder, Params, Pool, PoolConstraints, PoolOpts, SslOpts};

use super::RemoteStore;
use crate::dialect::Dialect;
use crate::query;
use crate::target::TlsMode;
use crate::value::{PrimaryKey, SqlValue};

pub struct MySqlStore {
    pool: Pool,
}

impl MySqlStore {
    /// Build the pool from a `mysql://` URL. No connection is made yet.
    pub fn new(dsn: &str, tls_mode: TlsMode) -> Result<Self> {
        let opts = Self::build_opts(dsn, tls_mode)?;
        Ok(Self {
            pool: Pool::new(opts),
        })
    }

    fn build_opts(dsn: &str, tls_mode: TlsMode) -> Result<Opts> {
        let opts = Opts::from_url(dsn).context("Invalid MySQL connection URL")?;

        // Tables are processed sequentially on one connection.
        let constraints = PoolConstraints::new(0, 1).unwrap_or_default();

        let mut builder = OptsBuilder::from_opts(opts)
            .init(vec!["SET NAMES utf8mb4"])
            .pool_opts(PoolOpts::default().with_constraints(constraints));

        if tls_mode == TlsMode::Require {
            builder = builder.ssl_opts(
                SslOpts::default()
                    .with_danger_accept_invalid_certs(true)
                    .with_danger_skip_domain_validation(true),
            );
        }

        Ok(builder.into())
    }

    async fn conn(&self) -> Result<Conn> {
        self.pool
            .get_conn()
            .await
            .context("Failed to connect to MySQL")
    }
}

fn positional(values: impl IntoIterator<Item = mysql_async::Value>) -> Params {
    Params::Positional(values.into_iter().collect())
}

#[async_trait]
impl RemoteStore for MySqlStore {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn().await?;
        conn.ping().await.context("MySQL ping failed")?;
        Ok(())
    }

    async fn count_rows(&self, table: &str) -> Result<i64> {
        let mut conn = self.conn().await?;
        let count: Option<i64> = conn
            .query_first(query::build_count(table))
            .await
            .with_context(|| format!("Failed to count rows in remote table '{}'", table))?;
        Ok(count.unwrap_or(0))
    }

    async fn upsert_row(&self, table: &str, statement: &str, values: &[SqlValue]) -> Result<u64> {
        let mut conn = self.conn().await?;
        conn.exec_drop(statement, positional(values.iter().map(SqlValue::to_mysql)))
            .await
            .with_context(|| format!("Failed to upsert row into '{}'", table))?;
        Ok(conn.affected_rows())
    }

    async fn primary_keys(&self, table: &str, primary_key: &str) -> Result<Vec<PrimaryKey>> {
        let mut conn = self.conn().await?;
        let sql = query::build_select_keys(table, primary_key, Dialect::MySql);
        let keys: Vec<Option<String>> = conn
            .query(sql)
            .await
            .with_context(|| format!("Failed to read primary keys from '{}'", table))?;

        Ok(keys
            .into_iter()
            .flatten()
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
        let mut conn = self.conn().await?;
        let sql = query::build_delete_keys(table, primary_key, keys.len(), Dialect::MySql);
        conn.exec_drop(sql, positional(keys.iter().map(|k| k.to_value().to_mysql())))
            .await
            .with_context(|| format!("Failed to delete {} rows from '{}'", keys.len(), table))?;
        Ok(conn.affected_rows())
    }

    async fn delete_all(&self, table: &str) -> Result<u64> {
        let mut conn = self.conn().await?;
        conn.query_drop(query::build_delete_all(table))
            .await
            .with_context(|| format!("Failed to delete all rows from '{}'", table))?;
        Ok(conn.affected_rows())
    }

    async fn close(&self) {
        if let Err(e) = self.pool.clone().disconnect().await {
            tracing::warn!("Error while closing MySQL pool: {}", e);
        } else {
            tracing::debug!("Closed MySQL pool");
        }
    }
}
