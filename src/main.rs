//! Signal-Scan main entry point
//!
//! This is the command-line interface for the Signal-Scan company website
//! scanner.

use anyhow::Context;
use clap::{Parser, Subcommand};
use signal_scan::api::{self, AppState};
use signal_scan::config::{ResourceProfile, ScannerConfig};
use signal_scan::crawler::{ScanOptions, Scanner, DEFAULT_MAX_PAGES};
use signal_scan::output::{self, DomainOutcome, ReportFormat};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Signal-Scan: a time-boxed company website scanner
///
/// Resolves each domain to a working origin, fetches a bounded set of pages
/// under escalating timeouts, and reports the signals found. Configuration
/// is read from `SIGNALSCAN_*` environment variables (a `.env` file is
/// honoured).
#[derive(Parser, Debug)]
#[command(name = "signal-scan")]
#[command(version)]
#[command(about = "A time-boxed company website scanner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan one domain, or several as an explicit batch
    Scan {
        #[arg(value_name = "DOMAIN", required = true)]
        domains: Vec<String>,

        /// Pages to fetch per domain, home page included (1-30)
        #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
        max_pages: usize,

        /// Extra URL to fetch right after the home page (repeatable)
        #[arg(long = "extra-url", value_name = "URL")]
        extra_urls: Vec<String>,

        /// Ignore robots.txt
        #[arg(long)]
        no_robots: bool,

        /// Overall deadline per domain, in seconds
        #[arg(long, value_name = "SECONDS")]
        timeout: Option<f64>,

        /// Known company name
        #[arg(long)]
        company_name: Option<String>,

        /// Known company LinkedIn URL
        #[arg(long)]
        linkedin: Option<String>,

        #[arg(long, value_enum, default_value_t = ReportFormat::Json)]
        format: ReportFormat,

        /// Write the report to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Run the HTTP API
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: SocketAddr,
    },

    /// Print the resolved configuration and resource profile
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = ScannerConfig::from_env().context("Failed to load configuration")?;
    let profile = ResourceProfile::detect(&config.hints);

    match cli.command {
        Command::Scan {
            domains,
            max_pages,
            extra_urls,
            no_robots,
            timeout,
            company_name,
            linkedin,
            format,
            output,
        } => {
            let request = api::ScanRequest {
                domain: None,
                domains: Some(domains),
                max_pages: Some(max_pages),
                extra_urls,
                respect_robots: Some(!no_robots),
                timeout_sec: timeout,
                company_name,
                company_linkedin: linkedin,
            };
            let plan = request
                .validate(config.batch.max_batch_domains)
                .context("Invalid scan request")?;

            let scanner = Scanner::new(config, profile)?;
            handle_scan(&scanner, plan, format, output).await?;
        }
        Command::Serve { bind } => {
            let scanner = Arc::new(Scanner::new(config, profile)?);
            let listener = tokio::net::TcpListener::bind(bind)
                .await
                .with_context(|| format!("Failed to bind {}", bind))?;
            api::serve(listener, AppState::new(scanner)).await?;
        }
        Command::Status => {
            handle_status(&config, &profile);
        }
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` wins when it is set.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if let Ok(filter) = EnvFilter::try_from_default_env() {
        filter
    } else if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("signal_scan=info,warn"),
            1 => EnvFilter::new("signal_scan=debug,info"),
            2 => EnvFilter::new("signal_scan=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so reports on stdout stay machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Scans the requested domains and prints or writes the report
async fn handle_scan(
    scanner: &Scanner,
    plan: api::ScanPlan,
    format: ReportFormat,
    output_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let rendered = match plan.target {
        api::ScanTarget::Single(domain) => {
            let outcome = DomainOutcome::from(scanner.scan_domain(&domain, &plan.options).await);
            output::render_outcome(&domain, &outcome, format)?
        }
        api::ScanTarget::Batch(domains) if domains.len() == 1 => {
            let domain = &domains[0];
            let outcome = DomainOutcome::from(scanner.scan_domain(domain, &plan.options).await);
            output::render_outcome(domain, &outcome, format)?
        }
        api::ScanTarget::Batch(domains) => {
            let report = api::run_batch(scanner, &domains, &plan.options).await;
            output::render_batch(&report, format)?
        }
    };

    match output_path {
        Some(path) => {
            output::write_report(&rendered, &path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Report written to {}", path.display());
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

/// Handles `status`: shows the configuration and profile without any network activity
fn handle_status(config: &ScannerConfig, profile: &ResourceProfile) {
    println!("=== Signal-Scan Status ===\n");

    println!("Resource Profile:");
    println!("  Tier: {}", profile.tier);
    println!("  Max concurrent domains: {}", profile.max_concurrent_domains);
    println!("  Timeout multiplier: {}", profile.timeout_multiplier);
    println!("  Batch chunk size: {}", profile.batch_chunk_size);
    println!("  Page ceiling: {}", profile.page_ceiling);

    println!("\nFetching:");
    println!("  Byte cap per page: {}", config.fetch.max_html_bytes);
    let tiers: Vec<String> = config
        .fetch
        .tier_timeouts_secs
        .iter()
        .map(|secs| {
            let scaled = Duration::from_secs_f64(secs * profile.timeout_multiplier);
            format!("{}ms", scaled.as_millis())
        })
        .collect();
    println!("  Tier timeouts: {}", tiers.join(", "));
    println!(
        "  Additional page tiers: {}",
        config.fetch.additional_page_tiers
    );
    println!("  Page concurrency: {}", config.fetch.page_concurrency);

    println!("\nResolver:");
    println!("  Probe timeout: {}ms", config.resolver.probe_timeout_ms);
    println!("  Cache size: {}", config.resolver.domain_cache_size);
    println!(
        "  Sibling TLD fallback: {}",
        config.resolver.sibling_tld_fallback
    );

    println!("\nBatching:");
    println!("  Window: {}ms", config.batch.wait_ms);
    println!(
        "  Window size: {}..{}",
        config.batch.min_size, config.batch.max_size
    );
    println!("  Max domains per batch: {}", config.batch.max_batch_domains);

    println!("\nUser Agent: {}", config.user_agent);
    println!("\n✓ Configuration is valid");
}
