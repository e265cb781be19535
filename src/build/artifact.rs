//! Naming and argument construction for a single bundle build.

use std::path::Path;

use anyhow::Result;

/// Artifact file name for a request: `prebid.<request_id>.js`.
pub fn artifact_file_name(request_id: &str) -> String {
    format!("prebid.{request_id}.js")
}

/// Join the requested modules with commas, the format the build tool's
/// `--modules` flag expects.
///
/// A single module is passed through unchanged.  An empty list is an error.
pub fn join_modules(modules: &[String]) -> Result<String> {
    anyhow::ensure!(!modules.is_empty(), "cannot build a bundle with no modules");
    Ok(modules.join(","))
}

/// Argument vector for the bundle subcommand:
/// `--cwd <dir> bundle --modules <list> --bundleName <file>`.
pub fn bundle_args(source_dir: &Path, module_list: &str, file_name: &str) -> Vec<String> {
    vec![
        "--cwd".to_string(),
        source_dir.display().to_string(),
        "bundle".to_string(),
        "--modules".to_string(),
        module_list.to_string(),
        "--bundleName".to_string(),
        file_name.to_string(),
    ]
}
