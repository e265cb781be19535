use std::path::Path;
use std::sync::Arc;

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use crate::config::Config;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub checks: HealthChecks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub build_root: CheckResult,
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CheckResult {
    fn healthy(detail: impl Into<String>) -> Self {
        Self {
            ok: true,
            detail: Some(detail.into()),
        }
    }

    fn unhealthy(detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            detail: Some(detail.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Individual checks
// ---------------------------------------------------------------------------

async fn check_build_root(config: &Config) -> CheckResult {
    let root = config.build.prebid_root.clone();

    let result = tokio::task::spawn_blocking(move || count_source_trees(&root)).await;

    match result {
        Ok(Ok(count)) => CheckResult::healthy(format!("{count} version source trees available")),
        Ok(Err(e)) => CheckResult::unhealthy(format!(
            "cannot read {}: {e}",
            config.build.prebid_root.display()
        )),
        Err(e) => CheckResult::unhealthy(format!("build root check task failed: {e}")),
    }
}

/// Count `prebid_*` directories directly under `root`.
fn count_source_trees(root: &Path) -> std::io::Result<usize> {
    let mut count = 0;
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let is_tree = entry.file_name().to_string_lossy().starts_with("prebid_")
            && entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_tree {
            count += 1;
        }
    }
    Ok(count)
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// `GET /healthz` handler.  Returns 200 when the build root is readable,
/// 503 otherwise.
pub async fn health_handler(config: Arc<Config>) -> impl IntoResponse {
    let build_root = check_build_root(&config).await;

    let status = if build_root.ok {
        HealthStatus::Ok
    } else {
        HealthStatus::Unhealthy
    };
    let body = HealthResponse {
        status,
        checks: HealthChecks { build_root },
    };

    let http_status = match status {
        HealthStatus::Ok => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (http_status, Json(body))
}
