//! CLI entrypoint: score a project's items and publish the resume cursor.

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use github_upvotes::github::gateway::ProjectGateway;
use github_upvotes::github::rate_limit::RateLimitGovernor;
use github_upvotes::logging::init_tracing;
use github_upvotes::output::write_cursor;
use github_upvotes::telemetry::{
    JsonlTelemetrySink, NoopTelemetrySink, TelemetryEvent, TelemetrySink,
};
use github_upvotes::upvotes::{Mutator, WriteTarget};
use github_upvotes::{OctocrabProjectGateway, RunReport, UpvoteError, UpvotesConfig, Walker};
use ortho_config::OrthoConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match load_config() {
        Ok(config) => config,
        Err(error) => {
            // Tracing is not initialised before the configuration is known.
            let _ignored = writeln!(io::stderr().lock(), "{error}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(config.verbose);

    match run(&config).await {
        Ok(report) if report.outcome.is_success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(error) => {
            tracing::error!(%error, "upvote run aborted");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &UpvotesConfig) -> Result<RunReport, UpvoteError> {
    config.validate()?;
    let token = config.resolve_token()?;
    let locator = config.locator()?;

    let gateway = Arc::new(OctocrabProjectGateway::for_token(
        &token,
        &locator,
        config.field_name(),
    )?);
    let governor = Arc::new(RateLimitGovernor::new(config.reserve_floor));
    let mutator = build_mutator(config, &gateway, &governor).await?;

    tracing::info!(
        organization = locator.organization().as_str(),
        project = locator.number().get(),
        field = config.field_name(),
        write = config.write,
        concurrency = config.concurrency,
        "starting upvote run"
    );
    let walker = Walker::new(
        gateway,
        mutator,
        Arc::clone(&governor),
        config.run_settings(),
    );
    let report = walker.run().await;

    publish_cursor(config, &report)?;
    telemetry_sink(config).record(TelemetryEvent::from(&report));
    Ok(report)
}

/// Loads configuration from CLI, environment, and files.
///
/// # Errors
///
/// Returns [`UpvoteError::Configuration`] when ortho-config fails to parse
/// arguments or load configuration files.
fn load_config() -> Result<UpvotesConfig, UpvoteError> {
    UpvotesConfig::load().map_err(|error| UpvoteError::Configuration {
        message: error.to_string(),
    })
}

/// Resolves the write target, looking up ids that were not configured.
async fn build_mutator(
    config: &UpvotesConfig,
    gateway: &Arc<OctocrabProjectGateway>,
    governor: &Arc<RateLimitGovernor>,
) -> Result<Mutator<OctocrabProjectGateway>, UpvoteError> {
    if !config.write {
        tracing::info!("dry run: scores will be logged but not written");
        return Ok(Mutator::dry_run(Arc::clone(governor)));
    }

    let target = match (config.project_id(), config.field_id()) {
        (Some(project_id), Some(field_id)) => WriteTarget {
            project_id,
            field_id,
        },
        (configured_project, configured_field) => {
            let metadata = gateway.project_metadata().await?;
            governor.observe(metadata.rate_limit);
            let field_id = configured_field.or(metadata.field_id).ok_or_else(|| {
                UpvoteError::Configuration {
                    message: format!(
                        "project has no number field named '{}'",
                        config.field_name()
                    ),
                }
            })?;
            WriteTarget {
                project_id: configured_project.unwrap_or(metadata.project_id),
                field_id,
            }
        }
    };
    tracing::debug!(
        project = %target.project_id,
        field = %target.field_id,
        "resolved write target"
    );

    Ok(Mutator::live(
        Arc::clone(gateway),
        target,
        Arc::clone(governor),
        config.mutation_delay(),
    ))
}

fn publish_cursor(config: &UpvotesConfig, report: &RunReport) -> Result<(), UpvoteError> {
    tracing::info!(
        cursor = report.cursor.output_value(),
        outcome = report.outcome.as_str(),
        scored = report.counters.scored,
        skipped = report.counters.skipped,
        written = report.counters.written,
        rate_limit_cost = report.rate_limit_cost,
        "run finished"
    );
    config
        .output_path()
        .map_or(Ok(()), |path| write_cursor(&path, &report.cursor))
}

fn telemetry_sink(config: &UpvotesConfig) -> Box<dyn TelemetrySink> {
    if config.verbose {
        Box::new(JsonlTelemetrySink::stderr())
    } else {
        Box::new(NoopTelemetrySink)
    }
}
