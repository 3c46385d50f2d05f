//! Command-line interface

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tweetpool::{UserRef, UserSelector};

/// Multi-account client for a rate-limited REST API.
///
/// Results are printed as JSON lines on stdout; logs go to stderr.
#[derive(Debug, Parser)]
#[command(name = "tweetpool")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, env = "CONFIG_PATH", default_value = "tweetpool.toml")]
    pub config: PathBuf,

    /// Print Prometheus metrics after the command completes
    #[arg(long, global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Show one user, by numeric id or @screen_name.
    User {
        #[arg(value_parser = parse_user_ref)]
        user: UserRef,
    },

    /// Look up many users, in batches of 100.
    Lookup(LookupArgs),

    /// Statuses posted by a user.
    Timeline {
        user_id: u64,
        #[command(flatten)]
        paging: PagingArgs,
    },

    /// Home timeline of a pooled user, read with their own access token.
    Home {
        /// User id owning the access token
        user_id: String,
        #[command(flatten)]
        paging: PagingArgs,
    },

    /// Ids a user follows, one page per line.
    Friends { user_id: u64 },

    /// Ids following a user, one page per line.
    Followers { user_id: u64 },

    /// Post a status as a pooled user.
    Post {
        /// User id owning the access token
        user_id: String,
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },

    /// Pool health and per-credential rate windows.
    Status,
}

#[derive(Debug, PartialEq, Eq, Args)]
#[group(required = true, multiple = false)]
pub struct LookupArgs {
    /// Comma-separated user ids
    #[arg(long, value_delimiter = ',')]
    pub ids: Option<Vec<u64>>,

    /// Comma-separated screen names
    #[arg(long, value_delimiter = ',')]
    pub screen_names: Option<Vec<String>>,
}

impl LookupArgs {
    pub fn selector(self) -> tweetpool::Result<UserSelector> {
        UserSelector::from_params(self.ids, self.screen_names)
    }
}

#[derive(Debug, PartialEq, Eq, Args)]
pub struct PagingArgs {
    /// Only statuses newer than this id
    #[arg(long)]
    pub since: Option<u64>,

    /// Stop after this many statuses
    #[arg(long)]
    pub count: Option<usize>,
}

fn parse_user_ref(value: &str) -> Result<UserRef, String> {
    match value.strip_prefix('@') {
        Some("") => Err("screen name must not be empty".into()),
        Some(name) => Ok(UserRef::ScreenName(name.to_string())),
        None => value
            .parse()
            .map(UserRef::Id)
            .map_err(|_| format!("expected a numeric id or @screen_name, got {value}")),
    }
}
