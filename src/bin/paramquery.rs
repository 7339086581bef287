//! paramquery: build parameterized T-SQL from query documents
//!
//! # Usage
//!
//! ```bash
//! # Runnable script for a query document
//! paramquery build query.json --schema schema.toml
//!
//! # Only the query text, or everything as JSON
//! paramquery build query.json --format query
//! paramquery build query.json --format json
//!
//! # Show how the filter will be grouped
//! paramquery explain query.json
//!
//! # Bundled student/classroom scenario
//! paramquery demo
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use paramquery::prelude::*;

const DEMO_SCHEMA: &str = include_str!("../../demos/schema.toml");
const DEMO_QUERY: &str = include_str!("../../demos/students.json");

#[derive(Parser)]
#[command(name = "paramquery")]
#[command(version)]
#[command(about = "Build parameterized T-SQL SELECT statements", long_about = None)]
#[command(after_help = "EXAMPLES:
    paramquery build query.json --schema schema.toml
    paramquery build query.json --format json --crlf
    paramquery explain query.json
    paramquery demo --format query")]
struct Cli {
    /// Config file (default: <config dir>/paramquery/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Declarations, assignments and query
    Script,
    /// Parameterized query text only
    Query,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a query document
    Build {
        /// Path to the JSON query document
        document: PathBuf,

        /// Entity schema (TOML)
        #[arg(short, long, env = "PARAMQUERY_SCHEMA")]
        schema: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value = "script")]
        format: OutputFormat,

        /// Terminate lines with CRLF
        #[arg(long)]
        crlf: bool,
    },
    /// Show the logical grouping of a document's filter
    Explain {
        /// Path to the JSON query document
        document: PathBuf,
    },
    /// Build the bundled student/classroom query
    Demo {
        #[arg(short, long, value_enum, default_value = "script")]
        format: OutputFormat,

        #[arg(long)]
        crlf: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "paramquery=debug" } else { "paramquery=warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let config = Config::load_or_default(cli.config.as_deref()).context("loading config")?;

    match &cli.command {
        Commands::Build {
            document,
            schema,
            format,
            crlf,
        } => {
            let schema_path = schema
                .clone()
                .or_else(|| config.schema_path.clone())
                .context("no schema given; use --schema, PARAMQUERY_SCHEMA or schema_path in the config")?;
            let schema = Schema::load(&schema_path)
                .with_context(|| format!("loading schema {}", schema_path.display()))?;
            let doc = QueryDocument::load(document)
                .with_context(|| format!("loading {}", document.display()))?;
            let built = build(doc, &schema, options(&config, *crlf))?;
            print_built(&built, *format)
        }
        Commands::Explain { document } => explain(document),
        Commands::Demo { format, crlf } => {
            let schema = Schema::from_toml_str(DEMO_SCHEMA)?;
            let doc = QueryDocument::from_json(DEMO_QUERY)?;
            if cli.verbose {
                println!("{}", "Demo document:".dimmed());
                println!("{}", DEMO_QUERY.dimmed());
            }
            let built = build(doc, &schema, options(&config, *crlf))?;
            print_built(&built, *format)
        }
    }
}

fn options(config: &Config, crlf: bool) -> BuildOptions {
    let options = config.build.clone();
    if crlf {
        options.with_line_ending(LineEnding::Crlf)
    } else {
        options
    }
}

fn build(doc: QueryDocument, schema: &Schema, options: BuildOptions) -> Result<BuiltQuery> {
    let built = doc.into_query(schema, options)?.build()?;
    Ok(built)
}

fn print_built(built: &BuiltQuery, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Script => print!("{}", built.runnable_script),
        OutputFormat::Query => {
            print!("{}", built.parameterized_query);
            if !built.command.parameters.is_empty() {
                println!();
                println!("{}", "Parameters:".cyan());
                for p in &built.command.parameters {
                    println!(
                        "  {} {} = {}",
                        p.name.green(),
                        format!("({:?})", p.kind).dimmed(),
                        p.value.yellow()
                    );
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(built)?),
    }
    Ok(())
}

fn explain(path: &Path) -> Result<()> {
    let doc = QueryDocument::load(path).with_context(|| format!("loading {}", path.display()))?;
    println!("{}", "Query document".cyan().bold());
    println!("  {} {}", "from:".dimmed(), doc.from.white());
    println!(
        "  {} {}",
        "aliases:".dimmed(),
        doc.aliases
            .iter()
            .map(|a| format!("{} as {}", a.entity, a.alias))
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("  {} {}", "columns:".dimmed(), doc.select.len());
    println!("  {} {}", "joins:".dimmed(), doc.joins.len());
    println!();

    match doc.predicate()? {
        Some(predicate) => {
            println!("{}", "Filter:".cyan().bold());
            println!("  {}", predicate.to_string().yellow());
            println!();
            println!("{}", "Grouping:".cyan().bold());
            print!("{}", paramquery::explain(&predicate));
        }
        None => println!("{}", "(no filter)".dimmed()),
    }
    Ok(())
}
