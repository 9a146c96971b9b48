//! # sitedigest CLI
//!
//! Command-line front end for the sitedigest pipeline.
//!
//! ## Subcommands
//!
//! - `clip`: Crawl or fetch the input and write the aggregated markdown document
//! - `urls`: Print the page URLs a job would process
//!
//! Job settings come from an optional JSON options file, with flags overriding it.
//! Set `GEMINI_API_KEY` to enable semantic deduplication and `RUST_LOG` to control
//! log output.

mod telemetry;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use sitedigest::prelude::{FetchStrategy, JobOptions, Pipeline};
use tracing::{info, instrument};

#[derive(Parser)]
#[command(author, version, about = "Turn a page, sitemap or site into one clean markdown document", long_about = None)]
struct Cli {
    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the aggregated document for an input
    Clip(ClipArgs),

    /// List the page URLs an input resolves to
    Urls(UrlsArgs),
}

#[derive(Args, Debug)]
struct JobArgs {
    /// JSON file with job options; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum number of pages
    #[arg(short = 'p', long)]
    max_pages: Option<usize>,

    /// Maximum concurrent fetches
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Delay between requests in milliseconds
    #[arg(long)]
    delay: Option<u64>,

    /// Maximum random jitter added to the delay, in milliseconds
    #[arg(long)]
    jitter: Option<u64>,

    /// Ignore robots.txt
    #[arg(long)]
    ignore_robots: bool,

    /// Fetch only the given page instead of crawling its site
    #[arg(short, long)]
    single: bool,

    /// Render pages in headless Chromium
    #[arg(long)]
    render: bool,

    /// Per-fetch timeout in seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Wall-clock limit for the whole job in seconds
    #[arg(long)]
    job_timeout: Option<u64>,

    /// User agent for all requests
    #[arg(long)]
    user_agent: Option<String>,

    /// Follow nested sitemap indexes
    #[arg(long)]
    expand_sitemaps: bool,
}

impl JobArgs {
    async fn options(&self) -> anyhow::Result<JobOptions> {
        let mut options = match &self.config {
            Some(path) => serde_json::from_str(&tokio::fs::read_to_string(path).await?)?,
            None => JobOptions::default(),
        };

        if let Some(max_pages) = self.max_pages {
            options.crawler.max_pages = max_pages;
        }
        if let Some(concurrency) = self.concurrency {
            options.crawler.max_concurrent_fetches = concurrency;
            options.fetch.max_concurrent_fetches = concurrency;
        }
        if let Some(delay) = self.delay {
            options.crawler.crawl_delay_ms = delay;
        }
        if let Some(jitter) = self.jitter {
            options.crawler.jitter_ms = jitter;
        }
        if let Some(timeout) = self.timeout {
            options.fetch.timeout_secs = timeout;
            options.fetch.render_timeout_secs = timeout;
        }
        if let Some(user_agent) = &self.user_agent {
            options.crawler.user_agent = user_agent.clone();
            options.fetch.user_agent = user_agent.clone();
        }
        if self.job_timeout.is_some() {
            options.job_timeout_secs = self.job_timeout;
        }
        if self.ignore_robots {
            options.crawler.respect_robots_txt = false;
        }
        if self.single {
            options.single_page = true;
        }
        if self.render {
            options.fetch.strategy = FetchStrategy::Rendered;
        }
        if self.expand_sitemaps {
            options.expand_nested_sitemaps = true;
        }

        Ok(options)
    }
}

#[derive(Args, Debug)]
struct ClipArgs {
    /// Page URL, sitemap URL or file, site URL, or markdown link list
    #[arg(required = true)]
    input: String,

    #[command(flatten)]
    job: JobArgs,

    /// Write the document here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit the document, metadata and provenance as JSON
    #[arg(long)]
    json: bool,

    /// Keep each page as one section instead of splitting at headings
    #[arg(long)]
    no_split: bool,

    /// Document title
    #[arg(long)]
    title: Option<String>,

    /// Tag for the front matter (repeatable)
    #[arg(long = "tag")]
    tags: Vec<String>,

    /// Minimum characters for a block to count as content
    #[arg(long)]
    min_length: Option<usize>,

    /// Maximum stopword ratio for a block to count as content
    #[arg(long)]
    max_stopword_ratio: Option<f32>,

    /// Maximum link density for a block to count as content
    #[arg(long)]
    max_link_density: Option<f32>,

    /// Similarity at or above which a section is a duplicate
    #[arg(long)]
    similarity: Option<f32>,
}

#[derive(Args, Debug)]
struct UrlsArgs {
    /// Page URL, sitemap URL or file, site URL, or markdown link list
    #[arg(required = true)]
    input: String,

    #[command(flatten)]
    job: JobArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _otel = telemetry::init_tracing_subscriber(cli.log_file.as_deref())?;

    match cli.command {
        Some(Commands::Clip(args)) => clip_command(args).await?,
        Some(Commands::Urls(args)) => urls_command(args).await?,
        None => Cli::command().print_help()?,
    }

    Ok(())
}

fn spinner(message: String) -> anyhow::Result<ProgressBar> {
    let progress = ProgressBar::new_spinner();
    progress.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} [{elapsed_precise}] {msg}")?);
    progress.enable_steady_tick(Duration::from_millis(120));
    progress.set_message(message);
    Ok(progress)
}

#[instrument]
async fn clip_command(args: ClipArgs) -> anyhow::Result<()> {
    let mut options = args.job.options().await?;
    if args.no_split {
        options.split_sections = false;
    }
    if let Some(title) = args.title {
        options.title = Some(title);
    }
    if !args.tags.is_empty() {
        options.tags = args.tags;
    }
    if let Some(min_length) = args.min_length {
        options.extractor.thresholds.min_length = min_length;
    }
    if let Some(ratio) = args.max_stopword_ratio {
        options.extractor.thresholds.max_stopword_ratio = ratio;
    }
    if let Some(density) = args.max_link_density {
        options.extractor.thresholds.max_link_density = density;
    }
    if let Some(similarity) = args.similarity {
        options.similarity_threshold = similarity;
    }

    let progress = spinner(format!("Clipping {}...", args.input))?;
    let pipeline = Pipeline::new(options)?.with_embedder_from_env();
    let result = pipeline.clip(&args.input).await;
    progress.finish_and_clear();
    let document = result?;

    info!(
        "Aggregated {} pages from {}",
        document.metadata.total_pages, document.metadata.domain
    );

    let rendered = if args.json {
        serde_json::to_string_pretty(&document)?
    } else {
        document.body
    };

    match args.output {
        Some(path) => {
            tokio::fs::write(&path, rendered).await?;
            eprintln!("Saved document to {}", path.display());
        }
        None => println!("{rendered}"),
    }

    Ok(())
}

#[instrument]
async fn urls_command(args: UrlsArgs) -> anyhow::Result<()> {
    let options = args.job.options().await?;

    let progress = spinner(format!("Resolving {}...", args.input))?;
    let result = Pipeline::new(options)?.resolve_urls(&args.input).await;
    progress.finish_and_clear();

    for url in result? {
        println!("{url}");
    }
    Ok(())
}
