use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub build: BuildConfig,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address for the HTTP listener (e.g. `0.0.0.0:3000`).
    #[serde(default = "default_http_listen")]
    pub http_listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_listen: default_http_listen(),
        }
    }
}

fn default_http_listen() -> String {
    "0.0.0.0:3000".to_string()
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    /// Directory holding one checked-out source tree per version, each named
    /// `prebid_<version>`.
    #[serde(default = "default_prebid_root")]
    pub prebid_root: PathBuf,
    /// Program invoked to produce a bundle.
    #[serde(default = "default_command")]
    pub command: String,
    /// Folder, relative to a source tree, where the build tool writes bundles.
    #[serde(default = "default_output_subdir")]
    pub output_subdir: String,
    /// Folder, relative to a source tree, holding module sources.
    #[serde(default = "default_modules_subdir")]
    pub modules_subdir: String,
    /// Upper bound on simultaneous build subprocesses.  Unbounded when unset.
    #[serde(default)]
    pub max_concurrent_builds: Option<usize>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            prebid_root: default_prebid_root(),
            command: default_command(),
            output_subdir: default_output_subdir(),
            modules_subdir: default_modules_subdir(),
            max_concurrent_builds: None,
        }
    }
}

impl BuildConfig {
    /// Source tree for `version`: `{prebid_root}/prebid_{version}`.
    ///
    /// No existence check happens here; a missing tree only shows up later as
    /// a build that produced nothing.
    pub fn source_dir(&self, version: &str) -> PathBuf {
        self.prebid_root.join(format!("prebid_{version}"))
    }

    /// Where the build tool is expected to leave `file_name`.
    pub fn artifact_path(&self, source_dir: &Path, file_name: &str) -> PathBuf {
        source_dir.join(&self.output_subdir).join(file_name)
    }

    /// Module source folder for `version`.
    pub fn modules_dir(&self, version: &str) -> PathBuf {
        self.source_dir(version).join(&self.modules_subdir)
    }
}

fn default_prebid_root() -> PathBuf {
    PathBuf::from("prebid.js")
}

fn default_command() -> String {
    "gulp".to_string()
}

fn default_output_subdir() -> String {
    "build/dist".to_string()
}

fn default_modules_subdir() -> String {
    "modules".to_string()
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Load and validate a [`Config`] from a YAML file at `path`.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let config = parse_config(&contents)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    Ok(config)
}

/// Parse and validate a YAML config document.
pub fn parse_config(contents: &str) -> Result<Config> {
    // An empty document deserializes to `()`, not an empty mapping.
    let config: Config = if contents.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml::from_str(contents)?
    };
    validate_config(&config)?;
    Ok(config)
}

/// Basic sanity checks that cannot be expressed purely with serde.
pub fn validate_config(config: &Config) -> Result<()> {
    config
        .server
        .http_listen
        .parse::<SocketAddr>()
        .with_context(|| format!("invalid http_listen address: {}", config.server.http_listen))?;
    anyhow::ensure!(
        !config.build.command.trim().is_empty(),
        "build.command must not be empty"
    );
    anyhow::ensure!(
        config.build.max_concurrent_builds != Some(0),
        "build.max_concurrent_builds must be at least 1"
    );
    Ok(())
}
