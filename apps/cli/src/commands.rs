//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use shopscribe_core::pipeline::{PublishOutcome, RunResult};
use shopscribe_core::{
    Clock, Collaborators, FixedClock, PipelineConfig, ProgressReporter, SeasonCalendar,
    SeedKeywords, SystemClock,
};
use shopscribe_openai::{OpenAiClient, OpenAiOptions};
use shopscribe_shared::{
    AppConfig, RunConfig, ShopscribeError, init_config, load_config, load_config_from,
};
use shopscribe_shopify::{ShopifyClient, ShopifyOptions};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Shopscribe: product-driven blog posts for Shopify stores.
#[derive(Parser)]
#[command(
    name = "shopscribe",
    version,
    about = "Generate and publish product-driven blog posts for a Shopify store.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.shopscribe/shopscribe.toml.
    #[arg(long, global = true, env = "SHOPSCRIBE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Select products, generate an article and publish it.
    Run {
        /// Products to feature (overrides selection.count).
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Publish immediately instead of creating a draft.
        #[arg(long)]
        publish: bool,

        /// Print the article request as JSON without writing anything.
        #[arg(long)]
        dry_run: bool,

        /// Evaluate seasons as of this date (YYYY-MM-DD) instead of today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Show which season window is active.
    Seasons {
        /// Date to evaluate (YYYY-MM-DD); defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so that
/// `--dry-run` output on stdout stays machine-readable.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "shopscribe=info",
        1 => "shopscribe=debug",
        _ => "shopscribe=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Run {
            count,
            publish,
            dry_run,
            date,
        } => cmd_run(config_path, count, publish, dry_run, date).await,
        Command::Seasons { date } => cmd_seasons(config_path, date),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn load_app_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(
    config_path: Option<&Path>,
    count: Option<usize>,
    publish: bool,
    dry_run: bool,
    date: Option<NaiveDate>,
) -> Result<()> {
    let mut app = load_app_config(config_path)?;
    if let Some(count) = count {
        app.selection.count = count;
        app.validate()?;
    }

    // Fails before any network call when credentials are missing.
    let run_config = RunConfig::resolve(&app)?;
    info!(?run_config, "resolved run configuration");

    let keywords = SeedKeywords::load(&app.selection.keywords_file)?;
    let mut pipeline = PipelineConfig::from_config(&app, &run_config, keywords)?;
    pipeline.dry_run = dry_run;
    if publish {
        pipeline.assemble.published = true;
    }

    let shopify = ShopifyClient::new(ShopifyOptions::from_config(&run_config, &app.store)?)?;
    let openai = OpenAiClient::new(OpenAiOptions::from_config(&run_config, &app.openai))?;
    let clock: Box<dyn Clock> = match date {
        Some(date) => Box::new(FixedClock(pipeline.rules.calendar.noon_utc(date)?)),
        None => Box::new(SystemClock),
    };

    let collaborators = Collaborators {
        catalog: &shopify,
        generation: &openai,
        publisher: &shopify,
        clock: clock.as_ref(),
    };
    let mut rng = StdRng::from_entropy();
    let reporter = CliProgress::new();

    let result = match shopscribe_core::run(collaborators, &pipeline, &mut rng, &reporter).await {
        Ok(result) => result,
        Err(e) => {
            reporter.spinner.finish_and_clear();
            print_failure(&e);
            return Err(e.into());
        }
    };

    print_result(&result)?;
    Ok(())
}

fn print_result(result: &RunResult) -> Result<()> {
    match &result.outcome {
        PublishOutcome::Skipped => {
            println!("{}", serde_json::to_string_pretty(&result.request)?);
        }
        PublishOutcome::Published {
            blog_id,
            article,
            metafield_error,
        } => {
            let products: Vec<&str> = result
                .selection
                .products()
                .iter()
                .map(|p| p.title.as_str())
                .collect();

            println!();
            if article.is_live() {
                println!("  Published: {}", article.title);
            } else {
                println!("  Draft created: {}", article.title);
            }
            println!("  Article ID:   {}", article.id);
            println!("  Blog ID:      {blog_id}");
            println!("  Handle:       {}", article.handle);
            match article.published_at.or(article.created_at) {
                Some(at) if article.is_live() => println!("  Published at: {}", at.to_rfc3339()),
                Some(at) => println!("  Created at:   {}", at.to_rfc3339()),
                None => println!("  Created at:   unknown"),
            }
            println!(
                "  Topic:        {} ({})",
                result.selection.topic(),
                result.selection.tier()
            );
            println!("  Products:     {}", products.join(", "));
            if let Some(err) = metafield_error {
                println!("  Warning:      meta description not attached: {err}");
            }
            println!("  Time:         {:.1}s", result.elapsed.as_secs_f64());
            println!();
        }
    }
    Ok(())
}

/// Spell out backend rejections before color-eyre prints the error chain.
fn print_failure(err: &ShopscribeError) {
    eprintln!();
    eprintln!("  Run failed: {err}");
    if let ShopscribeError::Http { status, url, body } = err {
        eprintln!("  Status:     {status}");
        eprintln!("  URL:        {url}");
        eprintln!("  Body:       {body}");
    }
    eprintln!();
}

fn cmd_seasons(config_path: Option<&Path>, date: Option<NaiveDate>) -> Result<()> {
    let app = load_app_config(config_path)?;
    let calendar = SeasonCalendar::new(&app.selection.timezone, app.seasons.clone())?;
    let date = date.unwrap_or_else(|| calendar.local_date(Utc::now()));
    let active = calendar.active_on(date);

    println!();
    println!("  Date:     {date} ({})", calendar.timezone());
    match active {
        Some(window) => {
            println!("  Active:   {} ({})", window.label, window.tag);
            println!("  Collections: {}", window.collections.join(", "));
        }
        None => println!("  Active:   none (freshness selection applies)"),
    }
    println!();
    for window in calendar.windows() {
        let marker = if active.is_some_and(|a| a.name == window.name) {
            "*"
        } else {
            " "
        };
        println!(
            "  {marker} {:<22} {}..{}  lead-in {:>2}d  {}",
            window.name,
            String::from(window.start),
            String::from(window.end),
            window.lead_in_days,
            window.label
        );
    }
    println!();
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load_app_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");

    match RunConfig::resolve(&config) {
        Ok(run) => println!("# environment\n# {run:?}"),
        Err(e) => println!("# environment incomplete: {e}"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _result: &RunResult) {
        self.spinner.finish_and_clear();
    }
}
