//! Template Binder CLI
//!
//! Usage:
//!   template-binder [OPTIONS] [TEMPLATE]
//!
//! Options:
//!   -d, --data <FILE>    Data bound to the template (JSON or TOML)
//!   -s, --socket <FILE>  Socket state snapshot (JSON or TOML)
//!   -c, --config <FILE>  Render options (TOML)
//!   -a, --auto-exec      Call function values instead of leaving their tags
//!   --strict             Report failing tags and exit with status 1
//!   --scan               List the tags of the template
//!   --id <PART>...       Print the id derived from the parts
//!   -h, --help           Print help

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use template_binder::{
    compute_id, scan_expressions, ConfigError, RenderContext, RenderOptions, Renderer,
    SocketState, Value,
};

#[derive(Parser)]
#[command(name = "template-binder")]
#[command(about = "Render data-bound templates with {{ }} expression tags")]
struct Cli {
    /// Template file (reads from stdin if not provided)
    input: Option<PathBuf>,

    /// Data file bound to the template (JSON, or TOML for any other extension)
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Socket state snapshot exposed as `socket` (JSON or TOML)
    #[arg(short, long)]
    socket: Option<PathBuf>,

    /// Render options file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Call function values instead of leaving their tags
    #[arg(short, long)]
    auto_exec: bool,

    /// Print diagnostics for failing tags and exit with status 1
    #[arg(long)]
    strict: bool,

    /// List the tags found in the template instead of rendering it
    #[arg(long)]
    scan: bool,

    /// Print the id computed from these parts and exit
    #[arg(long, num_args = 1..)]
    id: Option<Vec<String>>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if let Some(parts) = &cli.id {
        println!("{}", compute_id(parts));
        return;
    }

    let mut options = match &cli.config {
        Some(path) => exit_on_error(RenderOptions::from_file(path), "config", path),
        None => RenderOptions::default(),
    };
    if cli.auto_exec {
        options = options.with_auto_exec_function(true);
    }

    let mut ctx = RenderContext::new();
    if let Some(path) = &cli.data {
        ctx = ctx.with_data(exit_on_error(load_data(path), "data", path));
    }
    if let Some(path) = &cli.socket {
        ctx = ctx.with_socket(exit_on_error(SocketState::from_file(path), "socket", path));
    }

    // Read input
    let (template, filename) = match &cli.input {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => (content, path.display().to_string()),
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => (buffer, "<stdin>".to_string()),
                Err(e) => {
                    eprintln!("Error reading from stdin: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    if cli.scan {
        for tag in scan_expressions(&template) {
            let kind = if tag.triple { "raw" } else { "escaped" };
            println!("{}..{}\t{}\t{}", tag.start, tag.end(), kind, tag.raw);
        }
        return;
    }

    let renderer = Renderer::with_options(options);
    if cli.strict {
        match renderer.try_render(&template, &ctx) {
            Ok(output) => print!("{}", output),
            Err(e) => {
                eprint!("{}", e.format(&template, &filename));
                std::process::exit(1);
            }
        }
    } else {
        print!("{}", renderer.render(&template, &ctx));
    }
}

/// Data files are JSON objects, or TOML tables for any other extension
fn load_data(path: &Path) -> Result<Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    let json: serde_json::Value = if template_binder::context::has_json_extension(path) {
        serde_json::from_str(&content)?
    } else {
        toml::from_str(&content)?
    };
    Ok(Value::from(json))
}

fn exit_on_error<T>(result: Result<T, ConfigError>, what: &str, path: &Path) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            eprintln!("Error loading {} '{}': {}", what, path.display(), e);
            std::process::exit(1);
        }
    }
}
