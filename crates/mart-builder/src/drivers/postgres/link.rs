//! PostgreSQL data link.
//!
//! Uses deadpool-postgres for connection pooling. Queries go through the
//! simple query protocol, so every value comes back as text or NULL.

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::{Config as PgConfig, SimpleQueryMessage};
use tracing::{debug, info, warn};

use crate::config::ConnectionConfig;
use crate::core::traits::DataLink;
use crate::core::value::{Row, SqlValue};
use crate::error::{MartError, Result};

/// Pooled connection to a PostgreSQL server.
pub struct PostgresLink {
    pool: Pool,
    schema: String,
}

impl PostgresLink {
    /// Connect using the given configuration and check the connection.
    pub async fn connect(config: &ConnectionConfig, max_conns: usize) -> Result<Self> {
        let mut pg_config = PgConfig::new();
        pg_config.host(&config.host);
        pg_config.port(config.port);
        pg_config.dbname(&config.database);
        pg_config.user(&config.user);
        pg_config.password(&config.password);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        warn!("PostgreSQL link does not use TLS. Credentials are sent in plaintext.");
        let mgr = Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config);
        let pool = Pool::builder(mgr)
            .max_size(max_conns)
            .build()
            .map_err(|e| MartError::data_access("creating PostgreSQL pool", e.to_string()))?;

        // Test connection
        let client = pool
            .get()
            .await
            .map_err(|e| MartError::data_access("connecting to PostgreSQL", e.to_string()))?;
        client.simple_query("select 1").await?;

        info!(
            "Connected to PostgreSQL: {}:{}/{}",
            config.host, config.port, config.database
        );

        Ok(Self {
            pool,
            schema: config.schema.clone(),
        })
    }
}

#[async_trait]
impl DataLink for PostgresLink {
    async fn product_name(&self) -> Result<String> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| MartError::data_access("reading PostgreSQL metadata", e.to_string()))?;
        let row = client.query_one("select version()", &[]).await?;
        let version: String = row.try_get(0)?;
        debug!("Server version: {}", version);
        // "PostgreSQL 16.2 on x86_64-pc-linux-gnu, ..."
        Ok(version
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string())
    }

    fn database_schema(&self) -> &str {
        &self.schema
    }

    async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        debug!("Running query: {}", sql);
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| MartError::data_access("querying PostgreSQL", e.to_string()))?;
        let messages = client.simple_query(sql).await?;

        let mut rows = Vec::new();
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                let values = (0..row.len())
                    .map(|i| match row.get(i) {
                        Some(text) => SqlValue::Text(text.to_string()),
                        None => SqlValue::Null,
                    })
                    .collect();
                rows.push(values);
            }
        }
        Ok(rows)
    }
}
