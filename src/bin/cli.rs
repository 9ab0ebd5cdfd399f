//! vdba CLI - Main entry point for CLI binary
//!
//! This binary provides the `vdba` CLI tool for inspecting and querying a
//! database file.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use vdba::engine::{
    cli::{formatter::CliFormatter, parse_sort, Cli, Commands, OutputFormat},
    Connection, Filter, TableHandle,
};

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run_cli(cli) {
        CliFormatter::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the default `warn` level
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn run_cli(cli: Cli) -> Result<()> {
    let config = cli.connection_config().context("Failed to load connection config")?;
    let mut conn = Connection::open(config).context("Failed to open database")?;
    let json = cli.format == OutputFormat::Json;

    match &cli.command {
        Commands::Describe { table } => cmd_describe(&conn, &cli.schema, table, json)?,
        Commands::Find { table, filter, sort, limit, offset } => {
            cmd_find(&conn, &cli.schema, table, filter.as_deref(), sort, *limit, *offset, json)?
        }
        Commands::Count { table, filter } => cmd_count(&conn, &cli.schema, table, filter.as_deref(), json)?,
        Commands::Version => cmd_version(&conn, json)?,
    }

    conn.close();
    Ok(())
}

fn open_table<'c>(conn: &'c Connection, schema: &str, table: &str) -> Result<TableHandle<'c>> {
    Ok(conn.database()?.table(schema, table)?)
}

fn parse_filter(filter: Option<&str>) -> Result<Filter> {
    match filter {
        Some(text) => {
            let doc: serde_json::Value = serde_json::from_str(text).context("Filter is not valid JSON")?;
            Ok(Filter::parse(&doc)?)
        }
        None => Ok(Filter::new()),
    }
}

fn cmd_describe(conn: &Connection, schema: &str, table: &str, json: bool) -> Result<()> {
    let handle = open_table(conn, schema, table)?;
    let definition = handle.definition();

    if json {
        println!("{}", serde_json::to_string_pretty(definition.as_ref())?);
    } else {
        CliFormatter::describe(definition);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_find(
    conn: &Connection,
    schema: &str,
    table: &str,
    filter: Option<&str>,
    sort: &[String],
    limit: Option<u64>,
    offset: u64,
    json: bool,
) -> Result<()> {
    let handle = open_table(conn, schema, table)?;
    let mut query = handle.query().filter(parse_filter(filter)?);
    for arg in sort {
        let (column, direction) = parse_sort(arg)?;
        query = query.order_by(&column, direction);
    }
    query = match limit {
        Some(count) => query.limit(count, offset),
        None if offset > 0 => query.offset(offset),
        None => query,
    };

    let result = query.find()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result.to_json())?);
    } else {
        CliFormatter::rows(result.rows());
    }
    Ok(())
}

fn cmd_count(conn: &Connection, schema: &str, table: &str, filter: Option<&str>, json: bool) -> Result<()> {
    let handle = open_table(conn, schema, table)?;
    let count = handle.count(&parse_filter(filter)?)?;

    if json {
        println!("{}", serde_json::json!({ "table": handle.definition().qn(), "count": count }));
    } else {
        CliFormatter::kv(&handle.definition().qn(), &count.to_string());
    }
    Ok(())
}

fn cmd_version(conn: &Connection, json: bool) -> Result<()> {
    let server = conn.server()?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "vdba": env!("CARGO_PKG_VERSION"),
                "server": server,
            })
        );
    } else {
        CliFormatter::kv("vdba", env!("CARGO_PKG_VERSION"));
        CliFormatter::kv("sqlite", &server.version);
        CliFormatter::kv("host", &server.host);
    }
    Ok(())
}
