//! Configuration validation.

use super::Config;
use crate::core::identifier::validate_identifier;
use crate::error::{MartError, Result};

/// Dialect names accepted in `dialect`.
pub const KNOWN_DIALECTS: &[&str] = &["mysql", "oracle", "postgres"];

/// Connection types with a built-in data link.
pub const KNOWN_CONNECTIONS: &[&str] = &["postgres", "mysql"];

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if let Some(dialect) = &config.dialect {
        if !KNOWN_DIALECTS.contains(&dialect.as_str()) {
            return Err(MartError::Config(format!(
                "dialect must be one of {}, got '{}'",
                KNOWN_DIALECTS.join(", "),
                dialect
            )));
        }
    }

    let prefix = &config.translator.index_prefix;
    if prefix.is_empty() {
        return Err(MartError::Config(
            "translator.index_prefix must not be empty".into(),
        ));
    }
    validate_identifier(prefix)?;
    if !prefix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
        || prefix.starts_with(|c: char| c.is_ascii_digit())
    {
        return Err(MartError::Config(format!(
            "translator.index_prefix '{}' is not a valid identifier prefix",
            prefix
        )));
    }

    match &config.connection {
        Some(conn) => {
            if !KNOWN_CONNECTIONS.contains(&conn.r#type.as_str()) {
                return Err(MartError::Config(format!(
                    "connection.type must be one of {}, got '{}'",
                    KNOWN_CONNECTIONS.join(", "),
                    conn.r#type
                )));
            }
            if conn.host.is_empty() {
                return Err(MartError::Config("connection.host is required".into()));
            }
            if conn.database.is_empty() {
                return Err(MartError::Config("connection.database is required".into()));
            }
            if conn.user.is_empty() {
                return Err(MartError::Config("connection.user is required".into()));
            }
            if conn.port == 0 {
                return Err(MartError::Config("connection.port must not be 0".into()));
            }
        }
        None if config.dialect.is_none() => {
            return Err(MartError::Config(
                "either dialect or connection must be set".into(),
            ));
        }
        None => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConnectionConfig, TranslatorConfig};

    fn valid_config() -> Config {
        Config {
            dialect: Some("postgres".to_string()),
            translator: TranslatorConfig::default(),
            connection: Some(ConnectionConfig {
                r#type: "postgres".to_string(),
                host: "localhost".to_string(),
                port: 5432,
                database: "ensembl".to_string(),
                user: "mart".to_string(),
                password: "password".to_string(),
                schema: "public".to_string(),
            }),
        }
    }

    #[test]
    fn test_valid_config() {
        let config = valid_config();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_dialect_without_connection() {
        let mut config = valid_config();
        config.connection = None;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_neither_dialect_nor_connection() {
        let mut config = valid_config();
        config.connection = None;
        config.dialect = None;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_unknown_dialect() {
        let mut config = valid_config();
        config.dialect = Some("mssql".to_string());
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("mssql"));
    }

    #[test]
    fn test_bad_index_prefix() {
        for prefix in ["", "1X", "I-", "I X"] {
            let mut config = valid_config();
            config.translator.index_prefix = prefix.to_string();
            assert!(validate(&config).is_err(), "prefix {:?} accepted", prefix);
        }
    }

    #[test]
    fn test_wrong_connection_type() {
        let mut config = valid_config();
        if let Some(conn) = config.connection.as_mut() {
            conn.r#type = "oracle".to_string();
        }
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_port() {
        let mut config = valid_config();
        if let Some(conn) = config.connection.as_mut() {
            conn.port = 0;
        }
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_missing_host() {
        let mut config = valid_config();
        if let Some(conn) = config.connection.as_mut() {
            conn.host = "".to_string();
        }
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_connection_config_debug_redacts_password() {
        let mut config = valid_config();
        if let Some(conn) = config.connection.as_mut() {
            conn.password = "super_secret_password_123".to_string();
        }
        let debug_output = format!("{:?}", config.connection);
        assert!(
            debug_output.contains("[REDACTED]"),
            "Debug output should contain [REDACTED]"
        );
        assert!(
            !debug_output.contains("super_secret_password_123"),
            "Debug output should not contain actual password value"
        );
    }
}
