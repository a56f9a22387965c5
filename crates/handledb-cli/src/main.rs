//! HandleDB diagnostic command-line interface.
//!
//! Opens a store, queries seed tables, runs catalog operations, and
//! renders previews. Every command that produces a table prints the
//! minted handle token so the next invocation can pick it up.
//!
//! ```bash
//! handledb --store handles.db query users
//! handledb --store handles.db filter <token> "city == 'London'"
//! handledb --store handles.db show <token> --format csv
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use handledb_engine::{Engine, EngineConfig, Handle};

/// HandleDB command-line interface
#[derive(Parser, Debug)]
#[command(
    name = "handledb",
    version,
    about = "Diagnostic CLI for the HandleDB handle store and operation engine"
)]
struct Args {
    /// Durable store file; omit for a throwaway in-memory store
    #[arg(short, long, env = "HANDLEDB_STORE")]
    store: Option<PathBuf>,

    /// Configuration file path (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the queryable seed tables
    Tables,
    /// Bind a seed table to a fresh handle
    Query {
        /// Seed table name
        name: String,
    },
    /// Print the shape of a bound table
    Shape {
        /// Handle token
        token: String,
    },
    /// Render a bound table
    Show {
        /// Handle token
        token: String,
        /// Output format: head, tail, sample, full, json-records,
        /// json-split, csv
        #[arg(short, long, default_value = "head")]
        format: String,
        /// Rows for the preview formats
        #[arg(short = 'n', long)]
        rows: Option<i64>,
    },
    /// List every handle token in the store
    Handles,
    /// Project a table to the named columns
    Select {
        token: String,
        /// Columns to keep, in order
        columns: Vec<String>,
    },
    /// Keep rows matching a predicate expression
    Filter {
        token: String,
        /// Predicate, e.g. "amount > 100 and city == 'London'"
        expr: String,
    },
    /// Remove the named columns
    Drop {
        token: String,
        columns: Vec<String>,
    },
    /// Append a combined text column (rebinds the handle in place)
    Combine {
        token: String,
        col1: String,
        col2: String,
        new_name: String,
        /// Separator between the rendered values
        #[arg(long, default_value = " ")]
        sep: String,
    },
    /// Equi-join two handles on a shared column
    Join {
        left: String,
        right: String,
        /// Join column, present in both tables
        #[arg(long)]
        on: String,
        /// inner, left, right or outer
        #[arg(long, default_value = "inner")]
        kind: String,
    },
    /// Drop duplicate rows
    Dedupe {
        token: String,
        /// Judge duplicates on (and project to) these columns
        #[arg(long)]
        subset: Vec<String>,
    },
    /// Group and aggregate
    Group {
        token: String,
        /// Group columns
        #[arg(long, required = true)]
        by: Vec<String>,
        /// Aggregations as column:func, e.g. amount:sum
        #[arg(long, required = true)]
        agg: Vec<String>,
    },
    /// Describe a table's schema as a table
    Describe {
        token: String,
    },
    /// Rewrite the store log, dropping superseded records
    Compact,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let engine = Engine::new(load_config(&args)?).context("failed to start engine")?;
    debug!(durable = engine.store().is_durable(), "engine ready");

    match args.command {
        Command::Tables => {
            for name in engine.get_db_tables() {
                println!("{name}");
            }
        }
        Command::Query { name } => {
            let handle = engine.query_database(&name)?;
            println!("{handle}");
        }
        Command::Shape { token } => {
            println!("{}", engine.get_shape(&Handle::from_token(token))?);
        }
        Command::Show {
            token,
            format,
            rows,
        } => {
            println!(
                "{}",
                engine.materialize(&Handle::from_token(token), &format, rows)?
            );
        }
        Command::Handles => {
            for handle in engine.store().list_tokens() {
                println!("{handle}");
            }
        }
        Command::Select { token, columns } => {
            let handle = engine.select_columns(&Handle::from_token(token), &columns)?;
            println!("{handle}");
        }
        Command::Filter { token, expr } => {
            let handle = engine.filter_rows(&Handle::from_token(token), &expr)?;
            println!("{handle}");
        }
        Command::Drop { token, columns } => {
            let handle = engine.drop_columns(&Handle::from_token(token), &columns)?;
            println!("{handle}");
        }
        Command::Combine {
            token,
            col1,
            col2,
            new_name,
            sep,
        } => {
            let handle = engine.combine_columns(
                &Handle::from_token(token),
                &col1,
                &col2,
                &new_name,
                Some(&sep),
            )?;
            println!("{handle}");
        }
        Command::Join {
            left,
            right,
            on,
            kind,
        } => {
            let handle = engine.join(
                &Handle::from_token(left),
                &Handle::from_token(right),
                &on,
                &kind,
            )?;
            println!("{handle}");
        }
        Command::Dedupe { token, subset } => {
            let subset = if subset.is_empty() {
                None
            } else {
                Some(subset.as_slice())
            };
            let handle = engine.remove_duplicates(&Handle::from_token(token), subset)?;
            println!("{handle}");
        }
        Command::Group { token, by, agg } => {
            let aggs = parse_agg_specs(&agg)?;
            let handle = engine.group_by(&Handle::from_token(token), &by, &aggs)?;
            println!("{handle}");
        }
        Command::Describe { token } => {
            let handle = engine.describe_schema(&Handle::from_token(token))?;
            println!("{handle}");
        }
        Command::Compact => {
            engine.store().compact()?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("handledb_cli=debug,handledb_engine=debug,handledb_store=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn load_config(args: &Args) -> Result<EngineConfig> {
    let mut config = if let Some(path) = &args.config {
        EngineConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?
    } else {
        EngineConfig::default()
    };

    if let Some(store) = &args.store {
        config.store_path = Some(store.clone());
        config.memory_mode = false;
    }

    Ok(config)
}

fn parse_agg_specs(specs: &[String]) -> Result<Vec<(String, String)>> {
    specs
        .iter()
        .map(|spec| {
            let (col, func) = spec
                .split_once(':')
                .with_context(|| format!("expected column:func, got '{spec}'"))?;
            Ok((col.trim().to_string(), func.trim().to_string()))
        })
        .collect()
}
