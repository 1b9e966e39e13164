mod cli;
mod config;
mod download;
mod executable;
mod feed;
mod install;
mod locate;
mod platform;
mod probe;
mod progress;
mod version;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, ConfigAction};
use config::normalize_key;
use feed::ReleaseFeed;
use install::{UpdateOutcome, Updater};
use platform::Platform;
use progress::UpdateProgress;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(&cli)?;

    // Load configuration
    let mut settings = config::load_settings()?;
    let root = config::install_root(&settings)?;

    match cli.command {
        Commands::Version => {
            println!("funcup v{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }

        Commands::List => {
            list_installed_versions(&root);
        }

        Commands::Which => match locate::latest_path(&root) {
            Some(dir) => println!("{}", executable::resolve(&dir).display()),
            None => {
                tracing::error!("No Core Tools install found under {}", root.display());
                std::process::exit(1);
            }
        },

        Commands::Current => {
            match probe::probe(locate::latest_path(&root).as_deref()).await {
                Some(local) => println!("{}", local.version),
                None => {
                    tracing::error!("No usable Core Tools install under {}", root.display());
                    std::process::exit(1);
                }
            }
        }

        Commands::Update { prerelease } => {
            let allow_prerelease = prerelease || settings.allow_prerelease;
            let updater = Updater::new(ReleaseFeed::new(
                settings.feed_url.clone(),
                Platform::current(),
            ));

            let progress = if cli.quiet {
                UpdateProgress::hidden()
            } else {
                UpdateProgress::new()
            };

            // Ctrl-C cancels the download; the swap itself always finishes.
            {
                let progress = progress.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        progress.cancel();
                    }
                });
            }

            match updater.update(&root, allow_prerelease, &progress).await {
                UpdateOutcome::UpToDate { install_path } => {
                    println!("Already up to date: {}", install_path.display());
                }
                UpdateOutcome::Installed {
                    install_path,
                    version,
                } => {
                    println!("Installed Core Tools {} at {}", version, install_path.display());
                }
                UpdateOutcome::RemoteUnavailable {
                    install_path: Some(install_path),
                } => {
                    eprintln!(
                        "Could not reach the release feed; keeping {}",
                        install_path.display()
                    );
                }
                UpdateOutcome::RemoteUnavailable { install_path: None } => {
                    tracing::error!("Could not reach the release feed and nothing is installed");
                    std::process::exit(1);
                }
                UpdateOutcome::Cancelled => {
                    eprintln!("Update cancelled");
                    std::process::exit(1);
                }
                UpdateOutcome::Failed { reason } => {
                    tracing::error!("Update failed: {}", reason);
                    std::process::exit(1);
                }
            }
        }

        Commands::Config { action } => {
            handle_config(&mut settings, action)?;
        }
    }

    Ok(())
}

fn setup_logging(cli: &Cli) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if cli.quiet {
        "error"
    } else if cli.verbose == 0 {
        "warn"
    } else if cli.verbose == 1 {
        "info"
    } else {
        "debug"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    Ok(())
}

fn list_installed_versions(root: &Path) {
    println!("--- Installed Core Tools ---");
    let installed = locate::installed(root);
    if installed.is_empty() {
        println!("  No versions installed yet.");
        return;
    }

    let last = installed.len() - 1;
    for (i, (version, path)) in installed.iter().enumerate() {
        if i == last {
            println!("  - {} (latest)", console::style(version).green());
        } else {
            println!("  - {}", version);
        }
        println!("    Path:    {}\n", path.display());
    }
    println!("----------------------------");
}

fn handle_config(settings: &mut config::Settings, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Get { key } => {
            if let Some(key) = key {
                let key = normalize_key(&key);
                let value = match key.as_str() {
                    "allow_prerelease" => settings.allow_prerelease.to_string(),
                    "install_root" => settings
                        .install_root
                        .clone()
                        .unwrap_or_else(|| "(default)".to_string()),
                    "feed_url" => settings.feed_url.clone(),
                    _ => format!("Setting '{}' not found", key),
                };
                println!("{}", value);
            } else {
                println!("--- funcup settings ---");
                println!("  allow_prerelease: {}", settings.allow_prerelease);
                println!(
                    "  install_root: {}",
                    settings
                        .install_root
                        .clone()
                        .unwrap_or_else(|| "(default)".to_string())
                );
                println!("  feed_url: {}", settings.feed_url);
            }
        }
        ConfigAction::Set { key_value } => {
            if let Some((key, value_str)) = key_value.split_once('=') {
                let key = normalize_key(key);
                match key.as_str() {
                    "allow_prerelease" => {
                        let value = value_str.to_lowercase() == "true" || value_str == "1";
                        settings.allow_prerelease = value;
                        config::save_settings(settings)?;
                        tracing::info!("Setting '{}' updated to '{}'", key, value);
                    }
                    "install_root" => {
                        settings.install_root = Some(value_str.to_string());
                        config::save_settings(settings)?;
                        tracing::info!("Setting '{}' updated to '{}'", key, value_str);
                    }
                    "feed_url" => {
                        settings.feed_url = value_str.to_string();
                        config::save_settings(settings)?;
                        tracing::info!("Setting '{}' updated to '{}'", key, value_str);
                    }
                    _ => {
                        tracing::error!("'{}' is not a valid configuration setting. Valid settings: allow-prerelease, install-root, feed-url", key);
                    }
                }
            } else {
                tracing::error!("Invalid format. Use 'key=value'.");
            }
        }
        ConfigAction::Unset { key } => {
            let key = normalize_key(&key);
            let defaults = config::Settings::default();
            match key.as_str() {
                "allow_prerelease" => {
                    settings.allow_prerelease = defaults.allow_prerelease;
                    config::save_settings(settings)?;
                    tracing::info!("Setting '{}' unset", key);
                }
                "install_root" => {
                    settings.install_root = defaults.install_root;
                    config::save_settings(settings)?;
                    tracing::info!("Setting '{}' unset", key);
                }
                "feed_url" => {
                    settings.feed_url = defaults.feed_url;
                    config::save_settings(settings)?;
                    tracing::info!("Setting '{}' unset", key);
                }
                _ => {
                    tracing::error!("'{}' is not a valid configuration setting. Valid settings: allow-prerelease, install-root, feed-url", key);
                }
            }
        }
        ConfigAction::Show { format } => match format.as_str() {
            "yaml" => println!("{}", serde_yaml::to_string(settings)?),
            _ => println!("{}", serde_json::to_string_pretty(settings)?),
        },
    }
    Ok(())
}
