//! prnotify binary entrypoint: load configuration, prepare the database,
//! wire the collaborators, and run the scheduler until interrupted.

use std::io::{self, Write};
use std::process::ExitCode;

use ortho_config::OrthoConfig;
use tokio::sync::watch;
use tracing::{info, warn};

use prnotify::telemetry::StderrJsonlTelemetrySink;
use prnotify::{
    ConfigError, GraphqlPullRequestSource, NotifyError, OrganizationName, PersonalAccessToken,
    PrnotifyConfig, ReconciliationEngine, Scheduler, SlackNotifier, SourceError, SqliteStateStore,
    StoreError, migrate_database,
};

/// Unrecoverable startup failures; everything past startup is retried or
/// logged instead of exiting.
#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
    #[error("I/O error: {message}")]
    Io { message: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if writeln!(io::stderr().lock(), "{error}").is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

async fn run() -> Result<(), StartupError> {
    let config = load_config()?;

    let organization = OrganizationName::new(config.require_organization()?)?;
    let database_url = config.require_database_url()?.to_owned();

    let schema_version = migrate_database(&database_url, &StderrJsonlTelemetrySink)?;
    info!(schema_version = schema_version.as_str(), "database ready");

    let token = PersonalAccessToken::new(config.resolve_github_token()?)?;
    let source = GraphqlPullRequestSource::for_token(&token, config.github_api_base())?;
    let store = SqliteStateStore::new(database_url)?;
    let notifier = SlackNotifier::new(
        config.require_slack_token()?,
        config.require_slack_channel()?,
        config.slack_api_base(),
    )?;

    let engine = ReconciliationEngine::new(store, notifier);
    let scheduler = Scheduler::new(source, engine, organization, config.poll_interval());

    let (shutdown_sender, shutdown_receiver) = watch::channel(false);
    let scheduler_task = tokio::spawn(scheduler.run(shutdown_receiver));

    tokio::signal::ctrl_c()
        .await
        .map_err(|error| StartupError::Io {
            message: error.to_string(),
        })?;
    info!("shutdown requested");

    let _ignored = shutdown_sender.send(true);
    if let Err(error) = scheduler_task.await {
        warn!(%error, "scheduler task did not shut down cleanly");
    }

    Ok(())
}

/// Loads configuration from CLI, environment, and files.
fn load_config() -> Result<PrnotifyConfig, ConfigError> {
    PrnotifyConfig::load().map_err(|error| ConfigError::Load {
        message: error.to_string(),
    })
}
