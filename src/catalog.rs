//! Module catalog for a checked-out version.
//!
//! Files in a version's module folder are sorted into bidder adapters,
//! analytics adapters, and plain modules by file-name suffix, most specific
//! suffix first.  A suffix only counts when something precedes it.  A file
//! whose name starts with an adapter suffix (e.g. exactly `BidAdapter.js`)
//! has no adapter name and is left out of every category.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};

const BID_ADAPTER_SUFFIX: &str = "BidAdapter.js";
const ANALYTICS_ADAPTER_SUFFIX: &str = "AnalyticsAdapter.js";
const MODULE_SUFFIX: &str = ".js";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Classified module names for one version.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleCatalog {
    pub bidders: Vec<String>,
    pub analytics_adapters: Vec<String>,
    pub modules: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Bidder,
    AnalyticsAdapter,
    Module,
}

/// A catalog plus the bidder source files it was built from.
#[derive(Debug, Default)]
pub struct Listing {
    pub catalog: ModuleCatalog,
    pub bidder_files: Vec<PathBuf>,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

enum SuffixMatch<'a> {
    /// Suffix found after at least one character; holds the text before it.
    Named(&'a str),
    /// Suffix found at position zero.
    Leading,
    Absent,
}

/// Locate the first occurrence of `suffix` in `name`.
fn match_suffix<'a>(name: &'a str, suffix: &str) -> SuffixMatch<'a> {
    match name.find(suffix) {
        Some(0) => SuffixMatch::Leading,
        Some(pos) => SuffixMatch::Named(&name[..pos]),
        None => SuffixMatch::Absent,
    }
}

/// Classify a file name, returning its category and base name.  `None`
/// means the entry is not a module of any kind.
pub fn classify(file_name: &str) -> Option<(ModuleKind, String)> {
    for (suffix, kind) in [
        (BID_ADAPTER_SUFFIX, ModuleKind::Bidder),
        (ANALYTICS_ADAPTER_SUFFIX, ModuleKind::AnalyticsAdapter),
        (MODULE_SUFFIX, ModuleKind::Module),
    ] {
        match match_suffix(file_name, suffix) {
            SuffixMatch::Named(base) => return Some((kind, base.to_string())),
            SuffixMatch::Leading => return None,
            SuffixMatch::Absent => {}
        }
    }
    None
}

impl ModuleCatalog {
    /// File `file_name` under its category, if it has one.
    fn insert(&mut self, file_name: &str) -> Option<ModuleKind> {
        let (kind, base) = classify(file_name)?;
        match kind {
            ModuleKind::Bidder => self.bidders.push(base),
            ModuleKind::AnalyticsAdapter => self.analytics_adapters.push(base),
            ModuleKind::Module => self.modules.push(base),
        }
        Some(kind)
    }
}

// ---------------------------------------------------------------------------
// Directory listing
// ---------------------------------------------------------------------------

/// Read `dir` and classify every entry, sorted by file name.
///
/// Fails only if the directory itself cannot be read.
pub async fn list_modules(dir: &Path) -> std::io::Result<Listing> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();

    let mut listing = Listing::default();
    for name in &names {
        if listing.catalog.insert(name) == Some(ModuleKind::Bidder) {
            listing.bidder_files.push(dir.join(name));
        }
    }

    debug!(
        dir = %dir.display(),
        bidders = listing.catalog.bidders.len(),
        analytics_adapters = listing.catalog.analytics_adapters.len(),
        modules = listing.catalog.modules.len(),
        "classified module directory"
    );

    Ok(listing)
}

/// Dump bidder adapter sources to the log in the background.  Read failures
/// are logged and otherwise ignored.  The task yields how many files were
/// dumped; callers are free to drop the handle.
pub fn log_bidder_sources(files: Vec<PathBuf>) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut dumped = 0;
        for path in files {
            match tokio::fs::read_to_string(&path).await {
                Ok(contents) => {
                    info!(target: "bidder_source", file = %path.display(), "{contents}");
                    dumped += 1;
                }
                Err(e) => {
                    debug!(
                        target: "bidder_source",
                        file = %path.display(),
                        error = %e,
                        "could not read bidder source"
                    );
                }
            }
        }
        dumped
    })
}
