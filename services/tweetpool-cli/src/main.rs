//! tweetpool command-line client
//!
//! Single binary that:
//! 1. Loads the TOML config and the access-token file
//! 2. Builds a pooled client over the HTTP transport
//! 3. Runs one command, printing results as JSON lines on stdout
//! 4. Optionally prints Prometheus metrics for the run

mod cli;
mod config;
mod metrics;

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use futures_util::{Stream, StreamExt};
use serde_json::Value;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transport::{BearerSigner, Consumer, HttpTransport};
use tweetpool::Client;

use crate::cli::{Cli, Command};
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs on stderr; stdout carries command output
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let prometheus = metrics::install_recorder()?;

    info!(path = %cli.config.display(), "loading configuration");
    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;

    let client = build_client(&config).await?;

    let mut stdout = std::io::stdout().lock();
    let outcome = run(&client, cli.command, &mut stdout).await;

    if cli.metrics {
        write!(stdout, "{}", prometheus.render())?;
    }
    outcome
}

async fn build_client(config: &Config) -> Result<Client> {
    let secret = config
        .consumer
        .secret
        .clone()
        .context("consumer secret missing")?;
    let transport = HttpTransport::new(
        config.api.base_url.clone(),
        config.timeout(),
        Consumer::new(config.consumer.key.clone(), secret),
        Arc::new(BearerSigner),
    )?;

    let tokens = token_pool::load_access_tokens(&config.pool.access_tokens_file)
        .await
        .with_context(|| {
            format!(
                "failed to load access tokens from {}",
                config.pool.access_tokens_file.display()
            )
        })?;

    let client = Client::new(Arc::new(transport), config.client_config());
    for (user_id, credential) in tokens {
        client.add_access_token(user_id, credential)?;
    }
    info!(
        base_url = %config.api.base_url,
        wait_on_rate_limit = config.pool.wait_on_rate_limit,
        "client ready"
    );
    Ok(client)
}

/// Execute one command, writing each result as one JSON line.
async fn run(client: &Client, command: Command, out: &mut impl Write) -> Result<()> {
    let result = match command {
        Command::User { user } => client.get_user(&user).await.map(|v| vec![v]),
        Command::Lookup(args) => match args.selector().and_then(|s| client.lookup_users(s)) {
            Ok(users) => return drain(users, out).await,
            Err(e) => Err(e),
        },
        Command::Timeline { user_id, paging } => {
            return drain(client.user_timeline(user_id, paging.since, paging.count), out).await;
        }
        Command::Home { user_id, paging } => {
            match client.home_timeline(&user_id, paging.since, paging.count).await {
                Ok(statuses) => return drain(statuses, out).await,
                Err(e) => Err(e),
            }
        }
        Command::Friends { user_id } => {
            return drain(client.friends_ids(user_id).map(|p| p.map(Value::from)), out).await;
        }
        Command::Followers { user_id } => {
            return drain(client.followers_ids(user_id).map(|p| p.map(Value::from)), out).await;
        }
        Command::Post { user_id, text } => client
            .update_status(&user_id, &text.join(" "))
            .await
            .map(|v| vec![v]),
        Command::Status => Ok(vec![client.pool_status()]),
    };

    match result {
        Ok(values) => {
            for value in values {
                writeln!(out, "{value}")?;
            }
            Ok(())
        }
        Err(e) => Err(report(e)),
    }
}

/// Print every item of `stream` until it ends or fails.
async fn drain(
    stream: impl Stream<Item = tweetpool::Result<Value>>,
    out: &mut impl Write,
) -> Result<()> {
    futures_util::pin_mut!(stream);
    while let Some(item) = stream.next().await {
        match item {
            Ok(value) => writeln!(out, "{value}")?,
            Err(e) => return Err(report(e)),
        }
    }
    Ok(())
}

fn report(err: tweetpool::Error) -> anyhow::Error {
    error!(
        reason = %err.reason(),
        wait_secs = err.wait().map(|w| w.as_secs()),
        response = err.response(),
        "command failed"
    );
    anyhow::Error::new(err)
}
