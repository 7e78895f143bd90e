use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use esquery::{DatasourceConfig, Query, TimeRange};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

#[derive(Parser, Debug)]
#[command(name = "esquery")]
#[command(about = "esquery - Elasticsearch panel query builder")]
#[command(version)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the _msearch payload for one or more panel queries
    Build {
        /// Datasource config (TOML); defaults to ~/.esquery/datasource.toml
        #[arg(short, long, env = "ESQUERY_CONFIG")]
        config: Option<PathBuf>,

        /// Query JSON file, or `-` for stdin; an array builds several queries
        #[arg(short, long)]
        query: String,

        /// Range start
        #[arg(long, default_value = "5m")]
        from: String,

        /// Range end
        #[arg(long, default_value = "now")]
        to: String,

        /// Override the datasource backend version
        #[arg(long)]
        es_version: Option<i32>,
    },

    /// Print the indices a pattern resolves to over a time range
    Indices {
        /// Index pattern, e.g. "[logstash-]YYYY.MM.DD"
        #[arg(short, long)]
        pattern: String,

        /// Rotation interval (hourly, daily, weekly, monthly, yearly)
        #[arg(short, long, default_value = "")]
        interval: String,

        /// Range start
        #[arg(long, default_value = "24h")]
        from: String,

        /// Range end
        #[arg(long, default_value = "now")]
        to: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match cli.command {
        Commands::Build {
            config,
            query,
            from,
            to,
            es_version,
        } => {
            let mut ds = load_datasource(config)?;
            if let Some(version) = es_version {
                ds.es_version = version;
            }

            let queries = read_queries(&query)?;
            let range = TimeRange::new(from, to);
            tracing::info!(
                "Building {} queries for index '{}' (version {})",
                queries.len(),
                ds.index,
                ds.es_version
            );

            let mut payload = String::new();
            for (i, result) in esquery::build_batch(&queries, &range, &ds)
                .into_iter()
                .enumerate()
            {
                match result {
                    Ok(segment) => payload.push_str(&segment),
                    Err(e) => {
                        tracing::error!("Query {} failed [{}]: {}", i, e.error_type(), e);
                    }
                }
            }

            if payload.is_empty() {
                anyhow::bail!("no query could be built");
            }
            print!("{}", payload);
        }

        Commands::Indices {
            pattern,
            interval,
            from,
            to,
        } => {
            let range = TimeRange::new(from, to);
            let indices = esquery::resolve(&pattern, &interval, &range)
                .with_context(|| format!("Failed to resolve pattern '{}'", pattern))?;
            println!("{}", indices);
        }
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(fmt_layer)
        .init();
}

fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".esquery").join("datasource.toml"))
}

fn load_datasource(path: Option<PathBuf>) -> Result<DatasourceConfig> {
    match path {
        Some(path) => DatasourceConfig::load(&path)
            .with_context(|| format!("Failed to load datasource config {:?}", path)),
        None => match default_config_path() {
            Some(path) => DatasourceConfig::load_or_default(&path)
                .with_context(|| format!("Failed to load datasource config {:?}", path)),
            None => Ok(DatasourceConfig::default()),
        },
    }
}

fn read_queries(source: &str) -> Result<Vec<Query>> {
    let content = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read query from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read query file {}", source))?
    };

    let value: serde_json::Value =
        serde_json::from_str(&content).context("Query is not valid JSON")?;

    let queries = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    };
    Ok(queries)
}
