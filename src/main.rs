//! Weft main entry point
//!
//! Command-line interface: resolve a root URL into a single aggregated text
//! body and print it or write it to a file.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use weft::{FsGraphStore, HttpTransport, Resolver, ResolverConfig};

/// Weft: weave a linked document collection into one text body
///
/// Weft crawls breadth-first from a root URL up to a bounded depth,
/// sanitizes each document into clean text, and emits the aggregated result
/// for downstream language-model consumption. Later runs revalidate against
/// the cached crawl and skip unchanged documents.
#[derive(Parser, Debug)]
#[command(name = "weft")]
#[command(version)]
#[command(about = "Weave a linked document collection into one text body", long_about = None)]
struct Cli {
    /// Root URL to resolve
    #[arg(value_name = "URL")]
    url: String,

    /// Write the aggregated text here instead of stdout
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Number of link layers to fetch (the root is layer 0)
    #[arg(short, long, default_value_t = weft::crawler::DEFAULT_MAX_DEPTH)]
    depth: u32,

    /// Maximum concurrent fetches
    #[arg(short, long, default_value_t = weft::crawler::DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Directory holding crawl snapshots for revalidation
    #[arg(long, default_value = weft::cache::DEFAULT_CACHE_DIR)]
    cache_dir: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let transport = HttpTransport::new().context("failed to build HTTP client")?;
    let store = FsGraphStore::new(&cli.cache_dir);
    let resolver = Resolver::new(
        transport,
        store,
        ResolverConfig {
            max_depth: cli.depth,
            concurrency: cli.concurrency,
        },
    );

    tracing::info!("resolving {} to depth {}", cli.url, cli.depth);
    let resolved = resolver.resolve(&cli.url).await?;
    tracing::info!(
        "crawl finished: {} resources, {} characters",
        resolved.graph.len(),
        resolved.content.len()
    );

    match &cli.output {
        Some(path) => {
            std::fs::write(path, &resolved.content)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!("content written to {}", path.display());
        }
        None => {
            print!("{}", resolved.content);
        }
    }

    Ok(())
}

/// Sets up the tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("weft=info,warn"),
            1 => EnvFilter::new("weft=debug,info"),
            2 => EnvFilter::new("weft=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
