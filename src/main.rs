//! stackpair: StackExchange Dump to Question-Answer Corpus Builder
//!
//! Turns archived Posts.xml dumps into plain-text question-answer corpora.

use anyhow::Result;
use clap::{Parser, Subcommand};
use reqwest::Client;
use stackpair::{
    catalog::{Site, SiteCatalog},
    config::{Config, FetchConfig, OutputFormat},
    fetch,
    pair::{PairCoordinatorBuilder, PostStream},
    sink::open_sink,
};
use std::path::{Path, PathBuf};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "stackpair")]
#[command(about = "Builds question-answer text corpora from StackExchange XML dumps")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "stackpair.toml")]
    config: PathBuf,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List sites available in the archive catalog
    Sites {
        /// Only show sites whose host or name contains this string
        filter: Option<String>,
    },

    /// Download and unpack site dumps
    Fetch {
        /// Site hosts or short names (e.g. askubuntu or askubuntu.com)
        #[arg(required = true)]
        sites: Vec<String>,

        /// Keep the 7z archives after extraction
        #[arg(long)]
        keep_sources: bool,
    },

    /// Build a corpus from an already-downloaded Posts dump
    Build {
        /// Path to Posts.xml, Posts.xml.bz2, or a directory containing one
        input: PathBuf,

        /// Source name used in output naming (derived from the input if omitted)
        #[arg(short, long)]
        source: Option<String>,

        /// Container format for the corpus
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Directory the corpus is written under
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Minimum score for a non-accepted answer to count
        #[arg(long)]
        min_score: Option<i64>,

        /// Maximum answers per question
        #[arg(long)]
        max_responses: Option<usize>,

        /// Emit questions still waiting on answers when the dump ends
        #[arg(long)]
        flush_incomplete: bool,

        /// Quiet mode (no progress output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Fetch dumps and build corpora for whole sites in one go
    Run {
        /// Site hosts or short names
        sites: Vec<String>,

        /// Process every site in the catalog
        #[arg(long)]
        all: bool,

        /// Keep the 7z archives after extraction
        #[arg(long)]
        keep_sources: bool,

        /// Quiet mode (no progress output)
        #[arg(short, long)]
        quiet: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Sites { filter } => list_sites(config, filter).await,
        Commands::Fetch {
            sites,
            keep_sources,
        } => fetch_dumps(config, sites, keep_sources).await,
        Commands::Build {
            input,
            source,
            format,
            out_dir,
            min_score,
            max_responses,
            flush_incomplete,
            quiet,
        } => build_corpus(
            config,
            input,
            source,
            format,
            out_dir,
            min_score,
            max_responses,
            flush_incomplete,
            quiet,
        ),
        Commands::Run {
            sites,
            all,
            keep_sources,
            quiet,
        } => run_pipeline(config, sites, all, keep_sources, quiet).await,
    }
}

async fn list_sites(config: Config, filter: Option<String>) -> Result<()> {
    let client = fetch::http_client(&config.fetch)?;
    let catalog = fetch::fetch_sites_catalog(&client).await?;
    let needle = filter.map(|f| f.to_lowercase());

    println!("\n{:<40} {}", "Host", "Name");
    println!("{:<40} {}", "----", "----");
    let mut shown = 0usize;
    for site in catalog.sites() {
        if let Some(ref needle) = needle {
            if !site.host.to_lowercase().contains(needle)
                && !site.name.to_lowercase().contains(needle)
            {
                continue;
            }
        }
        println!("{:<40} {}", site.host, site.name);
        shown += 1;
    }
    println!("\n{} sites", shown);

    Ok(())
}

async fn fetch_dumps(config: Config, sites: Vec<String>, keep_sources: bool) -> Result<()> {
    let mut fetch_config = config.fetch.clone();
    fetch_config.keep_sources = fetch_config.keep_sources || keep_sources;

    let client = fetch::http_client(&fetch_config)?;
    let catalog = fetch::fetch_sites_catalog(&client).await?;
    let picked = resolve_sites(&catalog, &sites)?;

    for site in &picked {
        let dir = fetch::fetch_site(&client, site, &fetch_config, false).await?;
        if !fetch_config.keep_sources {
            let archive = fetch_config.sources_dir.join(site.archive_file());
            std::fs::remove_file(&archive)?;
        }
        println!("{} unpacked into {}", site.host, dir.display());
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn build_corpus(
    mut config: Config,
    input: PathBuf,
    source: Option<String>,
    format: Option<OutputFormat>,
    out_dir: Option<PathBuf>,
    min_score: Option<i64>,
    max_responses: Option<usize>,
    flush_incomplete: bool,
    quiet: bool,
) -> Result<()> {
    // Command line flags win over the config file
    if let Some(format) = format {
        config.output.format = format;
    }
    if let Some(out_dir) = out_dir {
        config.output.out_dir = out_dir;
    }
    if let Some(min_score) = min_score {
        config.pairing.min_score = min_score;
    }
    if let Some(max_responses) = max_responses {
        config.pairing.max_responses = max_responses;
    }
    if flush_incomplete {
        config.pairing.flush_incomplete_at_eof = true;
    }
    config.validate()?;

    let input = resolve_posts_path(&input)?;
    let source = match source {
        Some(name) => name,
        None => derive_source_name(&input).ok_or_else(|| {
            anyhow::anyhow!(
                "Could not derive a source name from '{}'. Specify one with --source",
                input.display()
            )
        })?,
    };

    build_one(&input, &source, &config, quiet)
}

async fn run_pipeline(
    config: Config,
    sites: Vec<String>,
    all: bool,
    keep_sources: bool,
    quiet: bool,
) -> Result<()> {
    if sites.is_empty() && !all {
        anyhow::bail!("No sites given. Pass site names or --all");
    }

    let mut fetch_config = config.fetch.clone();
    fetch_config.keep_sources = fetch_config.keep_sources || keep_sources;

    let client = fetch::http_client(&fetch_config)?;
    let catalog = fetch::fetch_sites_catalog(&client).await?;

    let picked: Vec<Site> = if all {
        catalog.ordered_for_build().into_iter().cloned().collect()
    } else {
        resolve_sites(&catalog, &sites)?
    };

    info!("Processing {} sites", picked.len());

    let mut failed = 0usize;
    for site in &picked {
        if let Err(e) = run_site(&client, site, &config, &fetch_config, quiet).await {
            error!("{}: {:#}", site.host, e);
            failed += 1;
        }
    }

    if failed > 0 && failed == picked.len() {
        anyhow::bail!("All {} sites failed", failed);
    }
    if failed > 0 {
        info!("Done, {} of {} sites failed", failed, picked.len());
    }

    Ok(())
}

async fn run_site(
    client: &Client,
    site: &Site,
    config: &Config,
    fetch_config: &FetchConfig,
    quiet: bool,
) -> Result<()> {
    let site_dir = fetch::fetch_site(client, site, fetch_config, quiet).await?;
    let input = resolve_posts_path(&site_dir)?;
    build_one(&input, &site.host, config, quiet)?;

    if !fetch_config.keep_sources {
        fetch::cleanup_site(site, fetch_config)?;
    }
    Ok(())
}

fn build_one(input: &Path, source: &str, config: &Config, quiet: bool) -> Result<()> {
    info!("Building {} from {}", source, input.display());

    let stream = PostStream::open(input)
        .map_err(|e| anyhow::anyhow!("Failed to open dump '{}': {}", input.display(), e))?;
    let mut sink = open_sink(config.output.format, &config.output.out_dir, source)
        .map_err(|e| anyhow::anyhow!("Failed to open output sink: {}", e))?;

    let coordinator = PairCoordinatorBuilder::new(source)
        .with_min_score(config.pairing.min_score)
        .with_max_responses(config.pairing.max_responses)
        .with_retain_below_threshold(config.pairing.retain_below_threshold)
        .with_flush_incomplete_at_eof(config.pairing.flush_incomplete_at_eof)
        .with_quiet(quiet)
        .build();

    let report = coordinator.run(stream, sink.as_mut())?;
    info!(
        "{}: {} pairs written, {} questions left open",
        source, report.counts.pairs_written, report.open_at_eof
    );

    Ok(())
}

fn resolve_sites(catalog: &SiteCatalog, names: &[String]) -> Result<Vec<Site>> {
    let mut picked = Vec::with_capacity(names.len());
    for name in names {
        let site = catalog
            .find(name)
            .ok_or_else(|| anyhow::anyhow!("Site '{}' not found in the archive catalog", name))?;
        picked.push(site.clone());
    }
    Ok(picked)
}

/// Accept a Posts file directly or a directory that contains one.
fn resolve_posts_path(input: &Path) -> Result<PathBuf> {
    if input.is_dir() {
        for candidate in ["Posts.xml", "Posts.xml.bz2"] {
            let path = input.join(candidate);
            if path.exists() {
                return Ok(path);
            }
        }
        anyhow::bail!(
            "No Posts.xml or Posts.xml.bz2 under {}",
            input.display()
        );
    }
    if !input.exists() {
        anyhow::bail!("Dump file not found: {}", input.display());
    }
    Ok(input.to_path_buf())
}

/// A bare Posts.xml carries no site name, so fall back to its directory
/// (sources/askubuntu.com/Posts.xml builds as askubuntu.com).
fn derive_source_name(input: &Path) -> Option<String> {
    let stem = input.file_stem()?.to_str()?;
    let stem = stem.trim_end_matches(".xml");
    if stem.eq_ignore_ascii_case("posts") || stem.is_empty() {
        let parent = input.parent()?.file_name()?.to_str()?;
        if parent.is_empty() {
            None
        } else {
            Some(parent.to_string())
        }
    } else {
        Some(stem.to_string())
    }
}
