//! The persisted per-module scan cache.
//!
//! Inspecting a module for exports is the expensive part of discovery, so
//! the result is cached on disk per module: the module's last-modified
//! timestamp (ISO-8601) plus the names of the types that carried exports.
//! On the next scan a module whose timestamp is unchanged is inspected only
//! for those recorded types; any mismatch falls back to a full inspection.
//!
//! The cache is an optimization, never a source of truth: an absent,
//! unreadable, or malformed cache file means every module is fully
//! inspected. After every scan the whole file is rewritten to cover exactly
//! the requested modules (entries for modules no longer requested are
//! dropped), and the rewrite goes through a temp file plus rename so a
//! concurrent reader never sees a partial document.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DiscoveryError;
use crate::export::{ExportRecord, ModuleInspector};
use crate::scanner::ScannerOptions;

// ─────────────────────────────────────────────────────────────────────────────
// Cache document
// ─────────────────────────────────────────────────────────────────────────────

/// Cached scan result for one module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleCacheEntry {
    /// The module file's last-modified timestamp, ISO-8601.
    pub modified: String,
    /// Names of the types that carried export declarations.
    pub types_with_exports: Vec<String>,
}

/// The whole cache document: module path → cached scan result.
///
/// Serialized as pretty-printed JSON with sorted module keys, so the file
/// diffs cleanly across builds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCacheData {
    /// Cached entries keyed by module path.
    pub modules: BTreeMap<String, ModuleCacheEntry>,
}

/// Result of a cache-assisted scan.
pub struct ScanOutcome {
    /// Every export record found across the requested modules, in module
    /// order.
    pub records: Vec<ExportRecord>,
    /// How many modules were served from the cache fast path.
    pub cached_modules: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// ScanCache
// ─────────────────────────────────────────────────────────────────────────────

/// Reads and rewrites the on-disk scan cache around module inspection.
pub struct ScanCache {
    cache_file: PathBuf,
}

impl ScanCache {
    /// Creates a cache over the file named by the scanner options.
    #[must_use]
    pub fn new(options: &ScannerOptions) -> Self {
        Self {
            cache_file: options.cache_dir.join(&options.cache_filename),
        }
    }

    /// The cache file path.
    #[must_use]
    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    /// Inspects the given modules, using cached type lists for modules whose
    /// fingerprint is unchanged, then persists the refreshed cache.
    ///
    /// # Errors
    ///
    /// Propagates inspector failures and module metadata read failures.
    /// Cache file problems are not errors: they degrade to full inspection
    /// (on read) or are dropped with a log line (on write).
    pub fn load_or_scan(
        &self,
        modules: &[PathBuf],
        inspector: &dyn ModuleInspector,
    ) -> Result<ScanOutcome, DiscoveryError> {
        let previous = self.read();
        let mut next = ScanCacheData::default();
        let mut records = Vec::new();
        let mut cached_modules = 0usize;

        for module in modules {
            let fingerprint = module_fingerprint(module)?;
            let module_key = module.display().to_string();

            let module_records = match previous.modules.get(&module_key) {
                Some(entry) if entry.modified == fingerprint => {
                    cached_modules += 1;
                    if entry.types_with_exports.is_empty() {
                        // Nothing exported last time and the module is
                        // unchanged; no need to load it at all.
                        Vec::new()
                    } else {
                        inspector.inspect_types(module, &entry.types_with_exports)?
                    }
                }
                _ => inspector.inspect(module)?,
            };

            let mut type_names: Vec<String> = module_records
                .iter()
                .map(|record| record.impl_type().to_string())
                .collect();
            type_names.sort();
            type_names.dedup();

            next.modules.insert(
                module_key,
                ModuleCacheEntry {
                    modified: fingerprint,
                    types_with_exports: type_names,
                },
            );
            records.extend(module_records);
        }

        self.write(&next);
        tracing::debug!(
            cached = cached_modules,
            total = modules.len(),
            plugins = records.len(),
            "module scan complete"
        );
        Ok(ScanOutcome {
            records,
            cached_modules,
        })
    }

    /// Reads the persisted cache; absence or malformed content yields an
    /// empty cache.
    fn read(&self) -> ScanCacheData {
        let Ok(text) = fs::read_to_string(&self.cache_file) else {
            return ScanCacheData::default();
        };
        match serde_json::from_str(&text) {
            Ok(data) => data,
            Err(error) => {
                tracing::debug!(
                    cache_file = %self.cache_file.display(),
                    %error,
                    "scan cache is unreadable, falling back to a full scan"
                );
                ScanCacheData::default()
            }
        }
    }

    /// Persists the cache through a temp file and rename. Failures are
    /// logged and swallowed; the next scan simply misses the cache.
    fn write(&self, data: &ScanCacheData) {
        let Ok(text) = serde_json::to_string_pretty(data) else {
            return;
        };
        let temp_file = self.cache_file.with_extension("tmp");
        let written = fs::write(&temp_file, text)
            .and_then(|()| fs::rename(&temp_file, &self.cache_file));
        if let Err(error) = written {
            tracing::debug!(
                cache_file = %self.cache_file.display(),
                %error,
                "failed to persist the scan cache"
            );
        }
    }
}

/// The module file's last-modified timestamp as an ISO-8601 string.
fn module_fingerprint(module: &Path) -> Result<String, DiscoveryError> {
    let modified = fs::metadata(module)
        .and_then(|metadata| metadata.modified())
        .map_err(|source| DiscoveryError::Io {
            module: module.to_path_buf(),
            source,
        })?;
    Ok(DateTime::<Utc>::from(modified).to_rfc3339_opts(SecondsFormat::Nanos, true))
}
