//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use ferry::{ConnectionConfig, JoinCondition, QuerySpec};

/// Ferry: move tabular data between ClickHouse and flat files
#[derive(Parser)]
#[command(name = "ferry")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

/// ClickHouse connection flags; each falls back to its environment variable.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// ClickHouse host
    #[arg(long, env = "CLICKHOUSE_HOST", default_value = "localhost", global = true)]
    pub host: String,

    /// ClickHouse HTTP port
    #[arg(long, env = "CLICKHOUSE_PORT", default_value = "8123", global = true)]
    pub port: u16,

    /// Database name
    #[arg(long, env = "CLICKHOUSE_DATABASE", default_value = "default", global = true)]
    pub database: String,

    /// User name
    #[arg(long, env = "CLICKHOUSE_USER", default_value = "default", global = true)]
    pub user: String,

    /// Password
    #[arg(
        long,
        env = "CLICKHOUSE_PASSWORD",
        default_value = "",
        hide_env_values = true,
        hide_default_value = true,
        global = true
    )]
    pub password: String,

    /// Use HTTPS
    #[arg(long, env = "CLICKHOUSE_SECURE", global = true)]
    pub secure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "CLICKHOUSE_TIMEOUT", default_value = "300", global = true)]
    pub timeout: u64,
}

impl ConnectionArgs {
    pub fn to_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            secure: self.secure,
            timeout_secs: self.timeout,
        }
    }
}

/// Tables, columns and joins of a read query.
#[derive(Args, Debug, Clone)]
pub struct SpecArgs {
    /// Table to read; repeat for joins (base table first)
    #[arg(short, long = "table", required = true)]
    pub tables: Vec<String>,

    /// Column to project; repeat for more (default: *)
    #[arg(short, long = "column")]
    pub columns: Vec<String>,

    /// Join condition, as TYPE:left_table.left_column=right_table.right_column
    #[arg(short, long = "join")]
    pub joins: Vec<String>,
}

impl SpecArgs {
    pub fn to_spec(&self) -> ferry::Result<QuerySpec> {
        let columns = if self.columns.is_empty() {
            vec!["*".to_string()]
        } else {
            self.columns.clone()
        };

        let join_conditions = self
            .joins
            .iter()
            .map(|j| j.parse::<JoinCondition>())
            .collect::<ferry::Result<Vec<_>>>()?;

        Ok(QuerySpec {
            tables: self.tables.clone(),
            columns,
            join_conditions,
        })
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,

        /// Port for the web server
        #[arg(short = 'P', long = "listen-port", default_value = "8000")]
        listen_port: u16,

        /// Largest accepted upload, in megabytes
        #[arg(long, default_value = "100")]
        max_upload_mb: usize,
    },

    /// List tables in the database
    Tables {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the columns of a table
    Describe {
        /// Table name
        #[arg(value_name = "TABLE")]
        table: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a query and print the buffered result
    Query {
        /// SQL query
        #[arg(value_name = "SQL")]
        sql: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Preview the first rows of a table or join
    Preview {
        #[command(flatten)]
        spec: SpecArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Stream a table or join to NDJSON or CSV
    Export {
        #[command(flatten)]
        spec: SpecArgs,

        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "ndjson")]
        format: ExportFormat,
    },

    /// Load a CSV/TSV/XLSX file into a table
    Import {
        /// Path to the data file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Destination table (default: file name without extension)
        #[arg(short, long)]
        table: Option<String>,

        /// Comma-separated subset of columns to load
        #[arg(long)]
        columns: Option<String>,

        /// Rows per INSERT statement
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Download a whole table as CSV or XLSX
    Download {
        /// Table name
        #[arg(value_name = "TABLE")]
        table: String,

        /// File format (csv or xlsx)
        #[arg(short, long, default_value = "csv")]
        format: String,

        /// Output path (default: <table>.<format>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Ndjson,
    Csv,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ndjson" | "jsonl" => Ok(ExportFormat::Ndjson),
            "csv" => Ok(ExportFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use ndjson or csv.", s)),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Ndjson => write!(f, "ndjson"),
            ExportFormat::Csv => write!(f, "csv"),
        }
    }
}
