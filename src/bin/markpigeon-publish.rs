//! MarkPigeon Publisher CLI
//!
//! Publishes exported HTML documents and their assets to GitHub Pages

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use markpigeon_publisher::{
    AppConfig, ConfigUpdate, Credential, GitHubPublisher, SecureTokenManager, TokenSource,
    mask_token,
};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Publish MarkPigeon documents to GitHub Pages
#[derive(Parser)]
#[command(name = "markpigeon-publish")]
#[command(version)]
#[command(about = "Publish MarkPigeon documents to GitHub Pages", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish an HTML document and its assets
    Publish {
        /// Exported HTML document
        #[arg(value_name = "HTML_FILE")]
        html_file: PathBuf,

        /// Asset directory referenced by the document
        #[arg(short, long, value_name = "DIR")]
        assets: Option<PathBuf>,

        /// Repository to publish to (defaults to the configured one)
        #[arg(short, long)]
        repo: Option<String>,

        /// GitHub token (defaults to GITHUB_TOKEN, then the saved token)
        #[arg(long)]
        token: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the token is accepted by GitHub
    Check {
        #[arg(long)]
        token: Option<String>,
    },

    /// Star the MarkPigeon repository
    Star {
        #[arg(long)]
        token: Option<String>,
    },

    /// Show or change saved settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the saved settings (token masked)
    Show,

    /// Change saved settings
    Set {
        #[arg(long)]
        token: Option<String>,

        #[arg(long)]
        repo: Option<String>,

        #[arg(long)]
        username: Option<String>,

        #[arg(long, value_name = "BOOL")]
        privacy_warning: Option<bool>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("\n❌ Error");
            eprintln!("{:#}", e);
            process::exit(1);
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("markpigeon_publisher={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Publish {
            html_file,
            assets,
            repo,
            token,
            json,
        } => publish_command(html_file, assets, repo, token, json).await,
        Commands::Check { token } => check_command(token).await,
        Commands::Star { token } => star_command(token).await,
        Commands::Config { action } => config_command(action),
    }
}

fn resolve_token(explicit: Option<&str>, config: &AppConfig) -> Result<Credential> {
    let manager = SecureTokenManager::new();
    let Some((credential, source)) = manager.resolve(explicit, &config.github_token) else {
        bail!(
            "No GitHub token found. Pass --token, set {}, or run `markpigeon-publish config set --token <TOKEN>`",
            manager.env_var()
        );
    };

    let source = match source {
        TokenSource::Explicit => "command line",
        TokenSource::Environment => "environment",
        TokenSource::Config => "settings file",
    };
    tracing::debug!(token = %credential.masked(), source, "Resolved GitHub token");
    Ok(credential)
}

async fn publish_command(
    html_file: PathBuf,
    assets: Option<PathBuf>,
    repo: Option<String>,
    token: Option<String>,
    json: bool,
) -> Result<i32> {
    let config = AppConfig::load().context("Failed to load settings")?;
    let credential = resolve_token(token.as_deref(), &config)?;
    let repo_name = repo.unwrap_or_else(|| config.repo_name().to_string());

    if !json {
        println!("\n🕊️  markpigeon-publish\n");
        if config.privacy_warning_enabled {
            println!(
                "⚠️  {} is a public repository; anyone with the link can read published documents\n",
                repo_name
            );
        }
    }

    let mut publisher = GitHubPublisher::new(credential, repo_name)?;
    if !json {
        publisher = publisher.with_progress_callback(Arc::new(
            |current: usize, total: usize, message: &str| {
                println!("  [{}/{}] {}", current, total, message);
            },
        ));
    }

    let result = publisher.publish(&html_file, assets.as_deref()).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if result.success {
        if result.has_warnings() {
            println!("\n⚠️  {}", result.message);
            for error in &result.errors {
                eprintln!("  - {}", error);
            }
        } else {
            println!("\n✅ {}", result.message);
        }
        println!("🔗 {}", result.url);
        println!("   GitHub Pages can take a minute to serve new files.");
    } else {
        println!("\n❌ Publishing failed: {}", result.message);
        for error in &result.errors {
            eprintln!("  - {}", error);
        }
    }

    Ok(if result.success { 0 } else { 1 })
}

async fn check_command(token: Option<String>) -> Result<i32> {
    let config = AppConfig::load().context("Failed to load settings")?;
    let credential = resolve_token(token.as_deref(), &config)?;
    let publisher = GitHubPublisher::new(credential, config.repo_name())?;

    let (success, message) = publisher.check_connection().await;
    if success {
        println!("✅ Connected as {}", message);
        Ok(0)
    } else {
        println!("❌ Connection failed: {}", message);
        Ok(1)
    }
}

async fn star_command(token: Option<String>) -> Result<i32> {
    let mut config = AppConfig::load().context("Failed to load settings")?;
    let credential = resolve_token(token.as_deref(), &config)?;
    let publisher = GitHubPublisher::new(credential, config.repo_name())?;

    let (success, message) = publisher.star_repo().await;
    if !success {
        println!("❌ {}", message);
        return Ok(1);
    }

    println!("⭐ {}", message);
    if !config.has_starred_markpigeon {
        config.update(ConfigUpdate {
            has_starred_markpigeon: Some(true),
            ..ConfigUpdate::default()
        });
        if let Err(e) = config.save() {
            eprintln!("⚠️  Failed to save settings: {}", e);
        }
    }
    Ok(0)
}

fn config_command(action: ConfigAction) -> Result<i32> {
    let mut config = AppConfig::load().context("Failed to load settings")?;

    match action {
        ConfigAction::Show => {
            println!("githubToken:           {}", mask_token(&config.github_token));
            println!("githubRepoName:        {}", config.github_repo_name);
            println!("githubUsername:        {}", config.github_username);
            println!("privacyWarningEnabled: {}", config.privacy_warning_enabled);
            println!("hasStarredMarkpigeon:  {}", config.has_starred_markpigeon);
        }
        ConfigAction::Set {
            token,
            repo,
            username,
            privacy_warning,
        } => {
            let update = ConfigUpdate {
                github_token: token,
                github_repo_name: repo,
                github_username: username,
                privacy_warning_enabled: privacy_warning,
                has_starred_markpigeon: None,
            };
            if update == ConfigUpdate::default() {
                bail!("Nothing to set; pass at least one of --token, --repo, --username, --privacy-warning");
            }

            config.update(update);
            config.save().context("Failed to save settings")?;
            println!("✅ Settings saved");
        }
    }

    Ok(0)
}
