//! `GET /versions?id=<version>`: list the modules a version ships with.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::AppState;
use crate::build::is_valid_version;
use crate::catalog;
use crate::metrics::ListingOutcome;

pub const NOT_VALID_VERSION: &str = "not valid version";
pub const INVALID_VERSION_SPECIFIED: &str = "invalid version specified";

/// The value of `id` when the query carries exactly one.
pub fn single_id(query: &[(String, String)]) -> Option<&str> {
    let mut ids = query.iter().filter(|(key, _)| key == "id");
    match (ids.next(), ids.next()) {
        (Some((_, id)), None) => Some(id.as_str()),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
}

/// Classify the module folder of `version`.
///
/// A malformed version is a `400` with a plain-text body.  A well-formed
/// version with no readable module folder answers `200` with an error
/// payload; the underlying I/O error is only logged.
#[instrument(skip(state))]
pub async fn handle_versions(state: &AppState, version: Option<&str>) -> Response {
    let metrics = &state.metrics.metrics;

    let Some(version) = version.filter(|v| is_valid_version(v)) else {
        metrics.record_listing(ListingOutcome::InvalidVersion);
        return (StatusCode::BAD_REQUEST, NOT_VALID_VERSION).into_response();
    };

    let dir = state.config.build.modules_dir(version);
    match catalog::list_modules(&dir).await {
        Ok(listing) => {
            metrics.record_listing(ListingOutcome::Ok);
            // Detached: the response does not wait on the dump.
            drop(catalog::log_bidder_sources(listing.bidder_files));
            Json(listing.catalog).into_response()
        }
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "module directory unreadable");
            metrics.record_listing(ListingOutcome::UnknownVersion);
            Json(ErrorBody {
                error: INVALID_VERSION_SPECIFIED,
            })
            .into_response()
        }
    }
}
