//! mart-builder CLI - translate mart action plans into dialect-specific SQL.

use clap::{Parser, Subcommand};
use mart_builder::core::schema::{SchemaModel, TableId};
use mart_builder::drivers::PostgresLink;
#[cfg(feature = "mysql")]
use mart_builder::drivers::MysqlLink;
use mart_builder::{
    translate_all, Config, ConnectionConfig, DataLink, Dialect, DialectRegistry, MartAction,
    MartError, SqlValue,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Connections opened for probing and sampling.
const LINK_POOL_SIZE: usize = 2;

#[derive(Parser)]
#[command(name = "mart-builder")]
#[command(about = "Translate mart construction plans into MySQL, Oracle or PostgreSQL SQL")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml", global = true)]
    config: PathBuf,

    /// Log format: text or json
    #[arg(long, default_value = "text", global = true)]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info", global = true)]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate an action plan into SQL statements
    Translate {
        /// YAML file holding the ordered list of actions
        #[arg(long)]
        plan: PathBuf,

        /// Dialect to translate with (overrides the configuration)
        #[arg(long)]
        dialect: Option<String>,

        /// Write statements to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Precede each action's statements with a comment
        #[arg(long)]
        comments: bool,
    },

    /// List the registered dialects
    Dialects,

    /// Connect and report which dialect understands the connection
    Probe,

    /// Print a page of rows from a source table
    Sample {
        /// Table to read
        #[arg(long)]
        table: String,

        /// Columns to read, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        columns: Vec<String>,

        /// Rows to skip (0-based)
        #[arg(long, default_value = "0")]
        offset: u64,

        /// Rows to return
        #[arg(long, default_value = "10")]
        count: u64,
    },

    /// Print the distinct values of a source column
    Distinct {
        /// Table to read
        #[arg(long)]
        table: String,

        /// Column to read
        #[arg(long)]
        column: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MartError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    match cli.command {
        Commands::Dialects => {
            let registry = DialectRegistry::with_builtins();
            for name in registry.names() {
                println!("{}", name);
            }
            Ok(())
        }
        Commands::Translate {
            plan,
            dialect,
            output,
            comments,
        } => {
            let config = load_config(&cli.config, dialect.as_deref())?;
            let registry = DialectRegistry::with_builtins_prefixed(&config.translator.index_prefix);
            let mut translator = match dialect.or_else(|| config.dialect.clone()) {
                Some(name) => registry.require_by_name(&name)?,
                None => {
                    let link = connect(require_connection(&config)?).await?;
                    registry.require(link.as_ref()).await?
                }
            };

            let actions = load_plan(&plan)?;
            info!(
                "Translating {} action(s) from {:?} with {}",
                actions.len(),
                plan,
                translator.name()
            );

            let include_comments = comments || config.translator.include_comments;
            let (statements, failure) =
                match translate_all(translator.as_mut(), &actions, include_comments) {
                    Ok(statements) => (statements, None),
                    Err((e, done)) => (done, Some(e)),
                };

            write_statements(&statements, output.as_deref())?;
            match failure {
                Some(e) => Err(e),
                None => {
                    info!("Wrote {} statement(s)", statements.len());
                    Ok(())
                }
            }
        }
        Commands::Probe => {
            let config = Config::load(&cli.config)?;
            let link = connect(require_connection(&config)?).await?;
            let registry = DialectRegistry::with_builtins_prefixed(&config.translator.index_prefix);
            let dialect = registry.require(link.as_ref()).await?;
            println!("{}", dialect.name());
            Ok(())
        }
        Commands::Sample {
            table,
            columns,
            offset,
            count,
        } => {
            let config = Config::load(&cli.config)?;
            let link = connect(require_connection(&config)?).await?;
            let dialect = select_dialect(&config, link.as_ref()).await?;

            let mut model = SchemaModel::new();
            let table_id = model_table(&mut model, link.as_ref(), &table, &columns)?;
            let rows = dialect
                .execute_select_rows(link.as_ref(), &model, table_id, offset, count)
                .await?;

            let mut sorted = columns;
            sorted.sort();
            sorted.dedup();
            println!("{}", sorted.join("\t"));
            for row in rows {
                println!("{}", format_row(&row));
            }
            Ok(())
        }
        Commands::Distinct { table, column } => {
            let config = Config::load(&cli.config)?;
            let link = connect(require_connection(&config)?).await?;
            let dialect = select_dialect(&config, link.as_ref()).await?;

            let mut model = SchemaModel::new();
            let table_id = model_table(&mut model, link.as_ref(), &table, &[column.clone()])?;
            let column_id = model.column_by_name(table_id, &column).ok_or_else(|| {
                MartError::Internal(format!("column {} missing from model", column))
            })?;
            for value in dialect
                .execute_select_distinct(link.as_ref(), &model, column_id)
                .await?
            {
                println!("{}", value);
            }
            Ok(())
        }
    }
}

/// Load the configuration file, or fall back to a bare configuration when a
/// dialect was named on the command line and no file exists.
fn load_config(path: &Path, dialect: Option<&str>) -> Result<Config, MartError> {
    match dialect {
        Some(name) if !path.exists() => {
            let config = Config::for_dialect(name);
            config.validate()?;
            Ok(config)
        }
        _ => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            Ok(config)
        }
    }
}

fn load_plan(path: &Path) -> Result<Vec<MartAction>, MartError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

fn require_connection(config: &Config) -> Result<&ConnectionConfig, MartError> {
    config
        .connection
        .as_ref()
        .ok_or_else(|| MartError::Config("connection is required for this command".into()))
}

async fn connect(conn: &ConnectionConfig) -> Result<Box<dyn DataLink>, MartError> {
    match conn.r#type.as_str() {
        "postgres" => Ok(Box::new(PostgresLink::connect(conn, LINK_POOL_SIZE).await?)),
        #[cfg(feature = "mysql")]
        "mysql" => Ok(Box::new(MysqlLink::connect(conn, LINK_POOL_SIZE).await?)),
        #[cfg(not(feature = "mysql"))]
        "mysql" => Err(MartError::Config(
            "MySQL connections need the 'mysql' feature".into(),
        )),
        other => Err(MartError::Config(format!(
            "unsupported connection type '{}'",
            other
        ))),
    }
}

/// The configured dialect, or the one the link reports.
async fn select_dialect(
    config: &Config,
    link: &dyn DataLink,
) -> Result<Box<dyn Dialect>, MartError> {
    let registry = DialectRegistry::with_builtins_prefixed(&config.translator.index_prefix);
    match &config.dialect {
        Some(name) => {
            let dialect = registry.require_by_name(name)?;
            if !dialect.understands_data_link(link).await? {
                warn!("Configured dialect {} does not match the connection", name);
            }
            Ok(dialect)
        }
        None => registry.require(link).await,
    }
}

/// Describe a source table to the model with just the columns being read.
fn model_table(
    model: &mut SchemaModel,
    link: &dyn DataLink,
    table: &str,
    columns: &[String],
) -> Result<TableId, MartError> {
    let schema = model.add_schema(link.database_schema());
    let table_id = model.add_table(schema, table)?;
    for column in columns {
        if model.column_by_name(table_id, column).is_none() {
            model.add_column(table_id, column)?;
        }
    }
    Ok(table_id)
}

fn format_row(row: &[SqlValue]) -> String {
    row.iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("\t")
}

fn write_statements(statements: &[String], output: Option<&Path>) -> Result<(), MartError> {
    let mut text = String::new();
    for statement in statements {
        text.push_str(statement);
        if !statement.starts_with("--") {
            text.push(';');
        }
        text.push('\n');
    }
    match output {
        Some(path) => std::fs::write(path, text)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Filter directive for a `--verbosity` value. Unknown values fall back to info.
fn log_directive(verbosity: &str) -> &'static str {
    match verbosity.to_lowercase().as_str() {
        "debug" => "debug",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    }
}

fn setup_logging(verbosity: &str, format: &str) {
    // RUST_LOG wins over --verbosity when set.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_directive(verbosity)));

    // Logs go to stderr so generated SQL on stdout stays clean.
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
