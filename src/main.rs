use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use lumi_harness::config::HarnessConfig;
use lumi_harness::report::ReportFormat;
use lumi_harness::{driver, report, runner, suites};

#[derive(Parser)]
#[command(name = "lumi-harness")]
#[command(author = "NL Team")]
#[command(version = "0.1.0")]
#[command(about = "Browser functional test harness over remote WebDriver", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the built-in test suite
    Run {
        /// YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Browser identifier (chrome, firefox, edge, safari)
        #[arg(short, long)]
        browser: Option<String>,

        /// Remote WebDriver endpoint
        #[arg(short, long)]
        endpoint: Option<String>,

        /// Application under test
        #[arg(long)]
        base_url: Option<String>,

        /// Output directory for reports and screenshots
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Run test classes in parallel, one session each
        #[arg(long, default_value = "false")]
        parallel: bool,

        /// Ask the browser to run headless
        #[arg(long, default_value = "false")]
        headless: bool,
    },

    /// Generate report from saved test results
    Report {
        /// Path to results.json
        results: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "html")]
        format: ReportFormat,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List known browser identifiers
    Browsers,

    /// List built-in test classes
    Tests,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_target(false)
        .init();

    match cli.command {
        Commands::Run {
            config,
            browser,
            endpoint,
            base_url,
            output,
            parallel,
            headless,
        } => {
            let mut config = HarnessConfig::load(config.as_deref())?;
            if let Some(browser) = browser {
                config.browser = browser;
            }
            if let Some(endpoint) = endpoint {
                config.endpoint = endpoint;
            }
            if let Some(base_url) = base_url {
                config.base_url = base_url;
            }
            if let Some(output) = output {
                config.output_dir = output;
            }
            config.parallel |= parallel;
            config.headless |= headless;

            println!("{} Running built-in suite", "▶".green().bold());
            println!("  Browser: {}", config.browser.cyan());
            println!("  Endpoint: {}", config.endpoint.cyan());
            println!("  Base URL: {}", config.base_url.cyan());
            if config.parallel {
                println!("  Parallel: {}", "Enabled".yellow());
            }
            if config.headless {
                println!("  Headless: {}", "Enabled".yellow());
            }
            println!(
                "  Output: {}",
                config.output_dir.display().to_string().cyan()
            );
            println!(
                "  Screenshots: {}",
                config.screenshot_root().display().to_string().cyan()
            );

            let run = runner::run_tests(&config, suites::all()).await?;
            if run.has_failures() {
                std::process::exit(1);
            }
        }

        Commands::Report {
            results,
            format,
            output,
        } => {
            println!(
                "{} Generating {:?} report from: {}",
                "📊".to_string().blue(),
                format,
                results.display()
            );
            let written = report::generate_report(&results, format, output.as_deref())?;
            println!(
                "{} Report written to {}",
                "✓".green(),
                written.display().to_string().cyan()
            );
        }

        Commands::Browsers => driver::list_browsers(),

        Commands::Tests => suites::list(),
    }

    Ok(())
}
