use std::path::PathBuf;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use tumbleweed_common::config::{Config, FileStore};

mod run;

#[derive(Parser)]
#[command(version, about = "Tumbleweed - Tumblr blog archiver", long_about = None)]
struct Cli {
    /// Path to the configuration file (.json or .toml)
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Blog name or hostname, overriding the configuration
    #[arg(long)]
    blog: Option<String>,

    /// API consumer key, overriding the configuration
    #[arg(long, env = "TUMBLR_API_KEY")]
    api_key: Option<String>,

    /// Archive root directory, overriding the configuration
    #[arg(long)]
    output: Option<PathBuf>,

    /// Ignore the incremental window and fetch the whole blog
    #[arg(long)]
    full: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_miette();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let store = FileStore::new(&cli.config);
    let mut config = if cli.config.exists() {
        Config::load(&store).await?
    } else {
        // First run: materialize the defaults so there is a file to edit.
        let config = Config::default();
        config.save(&store).await?;
        tracing::info!(path = %cli.config.display(), "wrote default configuration");
        config
    };
    if let Some(blog) = cli.blog {
        config.blog_identifier = blog;
    }
    if let Some(api_key) = cli.api_key {
        config.api_key = api_key;
    }
    if let Some(output) = cli.output {
        config.output_dir = output;
    }
    if cli.full {
        config.incremental_hours = None;
    }
    config.validate().into_diagnostic()?;

    let start = std::time::Instant::now();
    let summary = run::backup(&config).await.into_diagnostic()?;
    let elapsed = start.elapsed();

    println!(
        "✓ {} written, {} skipped, {} warnings in {:.2}s",
        summary.written,
        summary.skipped,
        summary.warnings,
        elapsed.as_secs_f64()
    );
    if summary.playlist_urls > 0 {
        println!("✓ {} new playlist entries", summary.playlist_urls);
    }
    println!("✓ Output: {}", config.output_dir.display());

    Ok(())
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}
