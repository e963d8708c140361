//! Cubeweave CLI - compile cube queries to SQL
//!
//! Usage:
//!   cubeweave compile <request.json> [--config <cubeweave.toml>]
//!   cubeweave graph <schemas.json>
//!   cubeweave validate <request.json>
//!
//! A request file holds `query`, `tableSchemas` and optionally
//! `resolutionConfig`, `columnProjections` and `contextParams`.

use clap::{Parser, Subcommand};
use cubeweave::config::Settings;
use cubeweave::joins::{table_sql_map, used_table_schemas, validate_join_paths, DirectedGraph};
use cubeweave::resolution::{compile_with_resolution, ResolutionRequest};
use cubeweave::{SqlCompiler, TableSchema};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cubeweave")]
#[command(about = "Cubeweave - compile multi-table cube queries to SQL")]
#[command(version)]
struct Cli {
    /// Path to a cubeweave.toml (defaults to $CUBEWEAVE_CONFIG or ./cubeweave.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a request to SQL, resolving configured columns
    Compile {
        /// Path to the request JSON file
        file: PathBuf,
    },

    /// Print the join graph declared by a list of table schemas
    Graph {
        /// Path to a JSON array of table schemas
        file: PathBuf,
    },

    /// Check a request's join declarations and join paths without compiling
    Validate {
        /// Path to the request JSON file
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&settings.logging.level);

    match cli.command {
        Commands::Compile { file } => cmd_compile(&file, &settings),
        Commands::Graph { file } => cmd_graph(&file),
        Commands::Validate { file } => cmd_validate(&file),
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_json<T: DeserializeOwned>(file: &Path) -> Result<T, ExitCode> {
    let source = fs::read_to_string(file).map_err(|e| {
        eprintln!("Error reading file '{}': {}", file.display(), e);
        ExitCode::FAILURE
    })?;

    serde_json::from_str(&source).map_err(|e| {
        eprintln!("Error parsing '{}': {}", file.display(), e);
        ExitCode::FAILURE
    })
}

fn cmd_compile(file: &Path, settings: &Settings) -> ExitCode {
    let request: ResolutionRequest = match read_json(file) {
        Ok(r) => r,
        Err(code) => return code,
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error starting runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let options = settings.query_options();
    let compiler = SqlCompiler::new().with_options(options);

    match runtime.block_on(compile_with_resolution(&compiler, &request, options)) {
        Ok(sql) => {
            println!("{}", sql);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Compilation error ({:?}): {}", e.category(), e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_graph(file: &Path) -> ExitCode {
    let schemas: Vec<TableSchema> = match read_json(file) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let graph = match DirectedGraph::build(&schemas, &table_sql_map(&schemas)) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Graph error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("File: {}", file.display());
    println!();

    if graph.is_empty() {
        println!("No joins declared.");
        return ExitCode::SUCCESS;
    }

    println!("Edges:");
    for (from, to, edge) in graph.edges() {
        println!("  - {} -> {} on {} ({})", from, to, edge.join_column, edge.condition);
    }
    println!();
    println!("Starting tables: {}", graph.starting_nodes().join(", "));
    if graph.has_cycle() {
        println!("Warning: join declarations form a cycle");
    }

    ExitCode::SUCCESS
}

fn cmd_validate(file: &Path) -> ExitCode {
    let request: ResolutionRequest = match read_json(file) {
        Ok(r) => r,
        Err(code) => return code,
    };

    let used = used_table_schemas(&request.table_schemas, &request.query);
    let result = DirectedGraph::build(&used, &table_sql_map(&used))
        .and_then(|_| validate_join_paths(&request.query.join_paths));

    match result {
        Ok(()) => {
            println!("OK: {} is valid", file.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Validation errors:");
            eprintln!("  {}", e);
            ExitCode::FAILURE
        }
    }
}
