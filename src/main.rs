use chocomirror::{ChocoApi, PackageCacher, Reporter, StoreError};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "chocomirror")]
#[command(author, version, about = "Mirror Chocolatey packages for offline installation", long_about = None)]
struct Cli {
    /// Directory the packages and their downloads are cached into
    directory: PathBuf,

    /// Package to mirror (dependencies are mirrored too)
    package: String,

    /// Template variable assignments, e.g. '${arch}=x86,x64'
    #[arg(value_name = "${NAME}=VALUE,...")]
    variables: Vec<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Prints progress events the way the core reports them.
struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn caching_package(&self, name: &str) {
        println!("Caching package {}", name.bold());
    }

    fn downloading(&self, file_name: &str) {
        println!("  {} {}", "Downloading:".cyan(), file_name);
    }

    fn skipped(&self, file_name: &str) {
        println!(
            "  {} {} - file already exists on disk",
            "Skipped:".yellow(),
            file_name
        );
    }

    fn download_failed(&self, url: &str, error: &StoreError) {
        println!("  {} {} ({})", "Download failed:".red(), url, error);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if std::env::var("RUST_LOG").is_err() {
        let level = if cli.verbose { "debug" } else { "warn" };
        unsafe {
            std::env::set_var("RUST_LOG", level);
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let variables = cli
        .variables
        .iter()
        .map(|expression| chocomirror::variables::parse_assignment(expression))
        .collect::<chocomirror::Result<Vec<_>>>()?;

    if !cli.directory.exists() {
        std::fs::create_dir_all(&cli.directory)?;
        println!("Created directory {}", cli.directory.display().to_string().bold());
    }

    let cacher =
        PackageCacher::new(ChocoApi::new()?).with_reporter(Arc::new(ConsoleReporter));

    cacher
        .cache_package(&cli.package, &cli.directory, &variables)
        .await?;

    println!(
        "{} Mirrored {} into {}",
        "✓".green(),
        cli.package.bold(),
        cli.directory.display().to_string().dimmed()
    );

    Ok(())
}
