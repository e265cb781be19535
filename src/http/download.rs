//! `POST /download`: build a custom bundle and send it back.
//!
//! The flow is linear.  Validate the body, name the artifact after a fresh
//! request id, record the data-capture line, run the build tool, then look
//! for the artifact.  Its presence on disk is the only success signal; the
//! tool's exit status and output are logged but never inspected.
//!
//! A build that leaves no artifact answers `200` with an error payload
//! rather than an error status.  Existing clients key off the `error` field.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context as _;
use axum::{
    Json,
    body::Body,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use prometheus_client::metrics::gauge::Gauge;
use serde::Serialize;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::handler::AppError;
use crate::AppState;
use crate::build::{self, BuildRequest};
use crate::capture;
use crate::metrics::BuildOutcome;

/// Message returned when the build tool exits without leaving an artifact.
pub const BUILD_FAILED: &str = "Prebid file not built properly";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BuildFailure<'a> {
    error: &'static str,
    request_id: &'a str,
}

/// Validate `body` and, if it is acceptable, build and return the bundle.
pub async fn handle_download(state: &Arc<AppState>, body: &[u8]) -> Result<Response, AppError> {
    let request = match build::parse_body(body).and_then(build::validate) {
        Ok(request) => request,
        Err(e) => {
            debug!(reason = %e, "rejected download request");
            state.metrics.metrics.validation_failures.inc();
            return Ok(e.into_response());
        }
    };

    let request_id = Uuid::new_v4().to_string();
    build_bundle(state, &request, &request_id).await
}

#[instrument(skip_all, fields(%request_id, version = %request.version))]
async fn build_bundle(
    state: &Arc<AppState>,
    request: &BuildRequest,
    request_id: &str,
) -> Result<Response, AppError> {
    let build_config = &state.config.build;
    let file_name = build::artifact_file_name(request_id);
    let source_dir = build_config.source_dir(&request.version);
    let module_list = build::join_modules(&request.modules)?;

    capture::log_build_request(request, &module_list);

    let args = build::bundle_args(&source_dir, &module_list, &file_name);

    // The build runs on its own task so that a client hanging up drops only
    // this future, not the subprocess or the pipes it writes to.
    tokio::spawn(run_build(Arc::clone(state), args))
        .await
        .context("build task failed")??;

    let metrics = &state.metrics.metrics;
    let artifact = build_config.artifact_path(&source_dir, &file_name);
    if tokio::fs::try_exists(&artifact).await.unwrap_or(false) {
        info!(artifact = %artifact.display(), "serving built bundle");
        metrics.record_build(BuildOutcome::Success);
        serve_artifact(&artifact, &file_name).await
    } else {
        warn!(artifact = %artifact.display(), "build produced no artifact");
        metrics.record_build(BuildOutcome::Failure);
        Ok(Json(BuildFailure {
            error: BUILD_FAILED,
            request_id,
        })
        .into_response())
    }
}

/// Wait for a build slot, then run the build tool to completion.
#[instrument(skip_all)]
async fn run_build(state: Arc<AppState>, args: Vec<String>) -> anyhow::Result<()> {
    // Held until the build tool exits.
    let _permit = match &state.build_semaphore {
        Some(semaphore) => Some(
            semaphore
                .clone()
                .acquire_owned()
                .await
                .context("build semaphore closed")?,
        ),
        None => None,
    };

    let metrics = &state.metrics.metrics;
    let started = Instant::now();
    {
        let _in_flight = InFlight::enter(&metrics.builds_in_flight);
        match state.runner.run(&state.config.build.command, &args).await {
            Ok(output) => info!(%output, "build tool finished"),
            Err(e) => warn!(error = %e, "build tool could not be run"),
        }
    }
    metrics
        .build_duration_seconds
        .observe(started.elapsed().as_secs_f64());
    Ok(())
}

/// Raises the in-flight gauge for its lifetime.
struct InFlight<'a>(&'a Gauge);

impl<'a> InFlight<'a> {
    fn enter(gauge: &'a Gauge) -> Self {
        gauge.inc();
        Self(gauge)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.dec();
    }
}

/// Stream the artifact at `path` as an attachment named `file_name`.
async fn serve_artifact(path: &Path, file_name: &str) -> Result<Response, AppError> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open artifact: {}", path.display()))?;
    let len = file
        .metadata()
        .await
        .with_context(|| format!("failed to stat artifact: {}", path.display()))?
        .len();

    let body = Body::from_stream(ReaderStream::new(file));

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                "application/javascript; charset=utf-8".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
            (header::CONTENT_LENGTH, len.to_string()),
        ],
        body,
    )
        .into_response())
}
