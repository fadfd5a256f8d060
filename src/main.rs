use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ngramdex::fs::DirFs;
use ngramdex::index::codec::{deserialize_from_file, serialize_to_file, write_framed_file};
use ngramdex::index::{RepoIndex, build};
use ngramdex::utils::cache_path_for;
use ngramdex::{IndexConfig, grep};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ngramdex")]
#[command(about = "N-gram fingerprint index for fast substring search")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to config.json in the app data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index for a directory and write it to the cache
    Index {
        /// Directory to index
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Cache file to write (defaults to the per-directory cache path)
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Also write the fingerprints in the framed streaming format
        #[arg(long)]
        framed: Option<PathBuf>,

        /// Disable the progress bar
        #[arg(long)]
        no_progress: bool,
    },
    /// Search a cached index, confirming candidates with a line scan
    Grep {
        /// Literal strings to search for
        #[arg(required = true)]
        queries: Vec<String>,

        /// Directory the index was built from
        #[arg(short, long, default_value = ".")]
        path: PathBuf,

        /// Cache file to read (defaults to the per-directory cache path)
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Evaluate candidates on the calling thread
        #[arg(long)]
        sync: bool,

        /// List matching files
        #[arg(short = 'l', long)]
        files: bool,
    },
    /// Show index statistics
    Stats {
        /// Directory the index was built from
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Cache file to read
        #[arg(long)]
        cache: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => IndexConfig::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => IndexConfig::load().context("Failed to load config")?,
    };

    match cli.command {
        Commands::Index {
            path,
            cache,
            framed,
            no_progress,
        } => {
            let config = IndexConfig {
                progress: config.progress && !no_progress,
                ..config
            };
            run_index(&path, cache, framed.as_deref(), &config)?;
        }
        Commands::Grep {
            queries,
            path,
            cache,
            sync,
            files,
        } => {
            run_grep(&queries, &path, cache, sync, files, config)?;
        }
        Commands::Stats { path, cache } => {
            run_stats(&path, cache)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_cache(path: &Path, cache: Option<PathBuf>) -> Result<PathBuf> {
    match cache {
        Some(cache) => Ok(cache),
        None => cache_path_for(path).context("Could not determine cache location"),
    }
}

fn run_index(
    path: &Path,
    cache: Option<PathBuf>,
    framed: Option<&Path>,
    config: &IndexConfig,
) -> Result<()> {
    let cache = resolve_cache(path, cache)?;
    let fs = DirFs::open(path).with_context(|| format!("Invalid path {}", path.display()))?;
    println!("Indexing: {}", fs.root().display());

    let start = Instant::now();
    let index = build(Arc::new(fs), config).context("Failed to build index")?;
    serialize_to_file(&index, &cache)
        .with_context(|| format!("Failed to write {}", cache.display()))?;

    if let Some(framed) = framed {
        write_framed_file(&index, framed)
            .with_context(|| format!("Failed to write {}", framed.display()))?;
    }

    println!(
        "Indexed {} files in {:.2?}",
        index.len(),
        start.elapsed()
    );
    println!("Index stored at: {}", cache.display());
    Ok(())
}

fn load_index(path: &Path, cache: Option<PathBuf>) -> Result<RepoIndex> {
    let cache = resolve_cache(path, cache)?;
    deserialize_from_file(&cache).with_context(|| {
        format!(
            "No usable index at {}. Run 'ngramdex index' first.",
            cache.display()
        )
    })
}

fn run_grep(
    queries: &[String],
    path: &Path,
    cache: Option<PathBuf>,
    sync: bool,
    files: bool,
    config: IndexConfig,
) -> Result<()> {
    let index = load_index(path, cache)?.with_config(config);

    for query in queries {
        let start = Instant::now();
        let result = grep::grep(&index, query, !sync)
            .with_context(|| format!("Search for {:?} failed", query))?;
        println!(
            "{:?}: {} candidates, {} files, {} lines ({:.2?})",
            result.query,
            result.candidates,
            result.matches.len(),
            result.line_count(),
            start.elapsed()
        );
        if files {
            for m in &result.matches {
                println!("  {}:{}", m.path, m.lines);
            }
        }
    }
    Ok(())
}

fn run_stats(path: &Path, cache: Option<PathBuf>) -> Result<()> {
    let index = load_index(path, cache)?;
    let stats = index.stats();

    println!("Index Statistics");
    println!("================");
    println!();
    println!("Root path:        {}", index.root_dir().unwrap_or("-"));
    println!("Blob count:       {}", stats.blobs);
    println!("Total n-grams:    {}", stats.total_ngrams);
    println!("Mean per blob:    {:.1}", stats.mean_ngrams());
    println!("Max per blob:     {}", stats.max_ngrams);
    Ok(())
}
