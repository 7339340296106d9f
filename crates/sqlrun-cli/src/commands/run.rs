use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use sqlrun_bigquery::auth::IAM_CREDENTIALS_BASE_URL;
use sqlrun_bigquery::{exchange_impersonated_token, BigQueryEngine, EnvToken, TokenProvider};
use sqlrun_engine::config::parser;
use sqlrun_engine::config::types::{Overrides, RunConfig};
use sqlrun_engine::{run_pipeline, PipelineError, RunSummary};

/// Parsed inputs for the `run` command. `None` means the flag was not
/// provided and the settings file value applies.
pub struct RunArgs {
    pub config: PathBuf,
    pub directory: Option<String>,
    pub project: Option<String>,
    pub dataset: Option<String>,
    pub location: Option<String>,
    pub impersonate_service_account: Option<String>,
    pub dry_run: bool,
}

/// Execute the `run` command: load settings, resolve the run
/// configuration, connect the engine, and drive the pipeline.
pub async fn execute(args: RunArgs) -> Result<()> {
    let settings = parser::load_settings(&args.config)
        .with_context(|| format!("Failed to load settings: {}", args.config.display()))?;

    // Relative directories in the settings file resolve against the
    // file's own location, not the invocation directory.
    let settings_dir = args
        .config
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let overrides = Overrides {
        directory: args.directory,
        project_id: args.project,
        dataset: args.dataset,
        location: args.location,
        impersonate_service_account: args.impersonate_service_account,
        dry_run: args.dry_run,
    };
    let config = RunConfig::resolve(settings, overrides, &settings_dir);

    println!("Using config: {}", args.config.display());
    println!("Directory:    {}", config.directory.display());
    println!("Project ID:   {}", config.project_id);
    if let Some(dataset) = &config.dataset {
        println!("Dataset:      {dataset}");
    }
    if let Some(location) = &config.location {
        println!("Location:     {location}");
    }
    if let Some(principal) = &config.impersonate_service_account {
        println!("Impersonate:  {principal}");
    }
    if !config.vars.is_empty() {
        let vars: Vec<String> = config
            .vars
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        println!("Vars:         {}", vars.join(", "));
    }
    if config.dry_run {
        println!("Dry run enabled: queries will be validated but not executed.");
    }

    let engine = connect_engine(&config)
        .await
        .map_err(PipelineError::EngineConnectFailed)?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, terminating the run");
            interrupt.cancel();
        }
    });

    let summary = run_pipeline(&config, &engine, &cancel).await?;
    print_summary(&summary);
    Ok(())
}

/// Build the token capability (with the optional one-shot impersonation
/// exchange) and connect the engine client. Connection problems are
/// fatal before any unit runs.
async fn connect_engine(config: &RunConfig) -> anyhow::Result<BigQueryEngine> {
    let base = EnvToken::new();
    let tokens: Arc<dyn TokenProvider> = match &config.impersonate_service_account {
        Some(principal) => {
            let http = reqwest::Client::new();
            let scoped =
                exchange_impersonated_token(&http, &base, principal, IAM_CREDENTIALS_BASE_URL)
                    .await?;
            Arc::new(scoped)
        }
        None => Arc::new(base),
    };
    let engine = BigQueryEngine::connect(config.project_id.clone(), tokens).await?;
    Ok(engine)
}

fn print_summary(summary: &RunSummary) {
    if summary.is_empty() {
        println!("\nNo .sql files found. Nothing to do.");
        return;
    }

    println!();
    for outcome in &summary.outcomes {
        println!(
            "  {:9} {} ({} ms)",
            outcome.status.label(),
            outcome.path.display(),
            outcome.duration.as_millis()
        );
    }
    println!(
        "\nAll {} file(s) processed successfully in {:.2}s ({} completed, {} validated, {} skipped).",
        summary.outcomes.len(),
        summary.duration.as_secs_f64(),
        summary.completed(),
        summary.validated(),
        summary.skipped()
    );
}
