use crate::router::Router;
use crate::runtime_config::RuntimeConfig;
use crate::spec::{extract_routes, load_route_file};
use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use http::Method;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Command-line interface for routebind
///
/// Inspects a route file: lists the extracted table, matches a request
/// against it, or generates a URL from a named route.
#[derive(Parser, Debug)]
#[command(name = "routebind")]
#[command(about = "routebind route table inspector", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// List the extracted routes in match order
    Routes {
        /// Route file (YAML or JSON). Defaults to ROUTEBIND_ROUTES_FILE
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Match a request against the route table and print the bindings
    Match {
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// HTTP method of the request
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request path; a query string is ignored
        path: String,
    },
    /// Generate a URL from a named route
    Url {
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Route name
        name: String,

        /// Variable assignment, `name=value` (repeatable)
        #[arg(short = 'v', long = "var", value_parser = parse_assignment)]
        vars: Vec<(String, String)>,
    },
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(k, _)| !k.is_empty())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))
}

fn router_from_file(file: Option<&Path>, config: &RuntimeConfig) -> anyhow::Result<Router> {
    let path = file
        .map(Path::to_path_buf)
        .or_else(|| config.routes_file.clone())
        .ok_or_else(|| anyhow!("no route file given; pass --file or set ROUTEBIND_ROUTES_FILE"))?;
    let descriptors = load_route_file(&path)?.into_descriptors()?;
    let table = extract_routes(&descriptors)
        .with_context(|| format!("invalid route table in {}", path.display()))?;
    Ok(Router::new(Arc::new(table)).with_slow_match_threshold(config.slow_match))
}

/// Execute a parsed command and return what it would print.
///
/// # Errors
///
/// Returns an error if the route file cannot be loaded, no route matches,
/// or URL generation fails.
pub fn execute(command: &Commands, config: &RuntimeConfig) -> anyhow::Result<String> {
    match command {
        Commands::Routes { file } => {
            let router = router_from_file(file.as_deref(), config)?;
            Ok(router.dump_routes())
        }
        Commands::Match { file, method, path } => {
            let router = router_from_file(file.as_deref(), config)?;
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .with_context(|| format!("invalid HTTP method '{method}'"))?;
            let route_match = router
                .route(method.clone(), path)
                .ok_or_else(|| anyhow!("no route matches {method} {path}"))?;
            let params: serde_json::Map<String, serde_json::Value> = route_match
                .path_params
                .iter()
                .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.clone())))
                .collect();
            let body = serde_json::json!({
                "handler": route_match.handler_name,
                "route": route_match.route.name,
                "pattern": route_match.route.pattern,
                "params": params,
            });
            Ok(format!("{}\n", serde_json::to_string_pretty(&body)?))
        }
        Commands::Url { file, name, vars } => {
            let router = router_from_file(file.as_deref(), config)?;
            let variables: HashMap<String, String> = vars.iter().cloned().collect();
            let url = router.url_for(name, &variables)?;
            Ok(format!("{url}\n"))
        }
    }
}

/// Parse the process arguments, run the command and print its output
///
/// # Errors
///
/// Propagates any [`execute`] failure.
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let output = execute(&cli.command, &RuntimeConfig::from_env())?;
    print!("{output}");
    Ok(())
}
