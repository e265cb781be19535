//! Per-build data capture line.
//!
//! One line per accepted build request, positional and comma-joined, for
//! downstream CSV ingestion:
//!
//! ```text
//! dataCapture,<unix-ms>,<email>,<company>,<version>,<module;module;...>,
//! ```
//!
//! Consumers split on commas and read by column, so the module list has its
//! commas swapped for semicolons before it is written.

use tracing::info;

use crate::build::BuildRequest;

/// Leading column of every capture line.
pub const DATA_CAPTURE_TAG: &str = "dataCapture";

/// Build a capture line.  Every field, including the last, is followed by a
/// comma.
pub fn data_capture_line(timestamp_ms: i64, fields: &[&str]) -> String {
    let mut line = format!("{DATA_CAPTURE_TAG},{timestamp_ms},");
    for field in fields {
        line.push_str(field);
        line.push(',');
    }
    line
}

/// Replace commas in a joined module list so it stays a single column.
pub fn sanitize_module_list(module_list: &str) -> String {
    module_list.replace(',', ";")
}

/// Capture line for `request`: email, company, version, then the module
/// list.
pub fn capture_line(request: &BuildRequest, module_list: &str, timestamp_ms: i64) -> String {
    let modules = sanitize_module_list(module_list);
    data_capture_line(
        timestamp_ms,
        &[
            request.email.as_str(),
            request.company.as_str(),
            request.version.as_str(),
            modules.as_str(),
        ],
    )
}

/// Emit the capture line for an accepted build request.
pub fn log_build_request(request: &BuildRequest, module_list: &str) {
    let line = capture_line(request, module_list, chrono::Utc::now().timestamp_millis());
    info!(target: "data_capture", "{line}");
}
