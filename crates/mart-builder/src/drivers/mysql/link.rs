//! MySQL/MariaDB data link.
//!
//! Uses SQLx for connection pooling and async query execution.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow, MySqlSslMode};
use sqlx::{Row as _, ValueRef};
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::core::traits::DataLink;
use crate::core::value::{Row, SqlValue};
use crate::error::{MartError, Result};

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Pooled connection to a MySQL or MariaDB server.
pub struct MysqlLink {
    pool: MySqlPool,
    schema: String,
}

impl MysqlLink {
    /// Connect using the given configuration and check the connection.
    pub async fn connect(config: &ConnectionConfig, max_conns: usize) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.user)
            .password(&config.password)
            .ssl_mode(MySqlSslMode::Preferred);

        let pool = MySqlPoolOptions::new()
            .max_connections(max_conns as u32)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| MartError::data_access("creating MySQL pool", e.to_string()))?;

        // Test connection
        sqlx::query("select 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| MartError::data_access("testing MySQL connection", e.to_string()))?;

        info!(
            "Connected to MySQL: {}:{}/{}",
            config.host, config.port, config.database
        );

        Ok(Self {
            pool,
            schema: config.schema.clone(),
        })
    }

    fn row_to_values(row: &MySqlRow) -> Row {
        (0..row.len())
            .map(|i| {
                let is_null: bool = row.try_get_raw(i).map(|r| r.is_null()).unwrap_or(true);
                if is_null {
                    return SqlValue::Null;
                }
                row.try_get::<i64, _>(i)
                    .map(SqlValue::Int)
                    .or_else(|_| row.try_get::<f64, _>(i).map(SqlValue::Float))
                    .or_else(|_| row.try_get::<String, _>(i).map(SqlValue::Text))
                    .or_else(|_| {
                        row.try_get::<Vec<u8>, _>(i)
                            .map(|b| SqlValue::Text(String::from_utf8_lossy(&b).into_owned()))
                    })
                    .unwrap_or(SqlValue::Null)
            })
            .collect()
    }
}

#[async_trait]
impl DataLink for MysqlLink {
    async fn product_name(&self) -> Result<String> {
        let version: String = sqlx::query_scalar("select version()")
            .fetch_one(&self.pool)
            .await?;
        debug!("Server version: {}", version);
        // MariaDB speaks the MySQL protocol and dialect.
        Ok("MySQL".to_string())
    }

    fn database_schema(&self) -> &str {
        &self.schema
    }

    async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        debug!("Running query: {}", sql);
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(Self::row_to_values).collect())
    }
}
