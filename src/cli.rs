use clap::{Parser, Subcommand};

fn get_version() -> &'static str {
    const BASE_VERSION: &str = env!("CARGO_PKG_VERSION");

    // If there's a git tag at HEAD, use just the tag (release build)
    if let Some(tag) = option_env!("FUNCUP_GIT_TAG") {
        return tag;
    }

    // Not on a tag - include commit hash and branch (dev build)
    let commit = option_env!("FUNCUP_GIT_COMMIT").unwrap_or("unknown");
    let branch = option_env!("FUNCUP_GIT_BRANCH").unwrap_or("unknown");

    // Return a static string by leaking the formatted string
    // This is safe because it only happens once at startup
    let version = format!("v{}-{} ({})", BASE_VERSION, commit, branch);
    Box::leak(version.into_boxed_str())
}

#[derive(Parser)]
#[command(name = "funcup")]
#[command(about = "A version and update manager for Azure Functions Core Tools")]
#[command(version = get_version(), propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (use multiple times for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Reduce output to errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install the newest Core Tools release, replacing the current one
    Update {
        /// Consider prerelease builds as well
        #[arg(long)]
        prerelease: bool,
    },

    /// List installed Core Tools versions
    List,

    /// Print the path of the executable that would be launched
    Which,

    /// Ask the installed Core Tools binary which version it is
    Current,

    /// Manage funcup's configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show the current version
    Version,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a configuration setting
    Get {
        /// Key to get (if omitted, shows all settings)
        key: Option<String>,
    },
    /// Set a configuration setting
    Set {
        /// Key and value (e.g., 'allow-prerelease=true')
        key_value: String,
    },
    /// Unset a configuration setting (restores the default)
    Unset {
        /// Key to unset (e.g., 'feed-url')
        key: String,
    },
    /// Show full configuration
    Show {
        /// Output format (json, yaml)
        #[arg(long, default_value = "json")]
        format: String,
    },
}
