//! Process-wide plugin discovery.
//!
//! [`PluginScanner`] owns discovery for one process: the first
//! [`find_plugins`] call lists the configured module files, runs the
//! cache-assisted scan, groups the resulting export records by contract,
//! and dependency-sorts every group. The index is built under a single lock
//! (concurrent first callers either perform the scan exclusively or wait
//! and read the published result) and is immutable afterwards.
//!
//! [`find_plugins`]: PluginScanner::find_plugins

use std::path::PathBuf;

use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::cache::ScanCache;
use crate::error::DiscoveryError;
use crate::export::{ExportRecord, ModuleInspector, TypeKey};
use tessera_graph::{sort_by_given_order, topological_sort};

/// Default name of the on-disk scan cache file.
pub const DEFAULT_CACHE_FILENAME: &str = "tessera-plugin-scan.json";

// ─────────────────────────────────────────────────────────────────────────────
// ScannerOptions
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the scanner and its cache, supplied by the host.
///
/// An explicit configuration object: no global state is consulted.
#[derive(Debug, Clone)]
pub struct ScannerOptions {
    /// Directory the cache file lives in.
    pub cache_dir: PathBuf,
    /// Name of the cache file inside `cache_dir`.
    pub cache_filename: String,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("."),
            cache_filename: DEFAULT_CACHE_FILENAME.to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PluginScanner
// ─────────────────────────────────────────────────────────────────────────────

type PluginIndex = HashMap<TypeKey, Vec<ExportRecord>>;

/// Discovers plugin exports across a set of module files, once per process.
///
/// # Example
///
/// ```ignore
/// let scanner = PluginScanner::new(
///     move || host_config.module_paths(),
///     ManifestInspector::new(),
///     &ScannerOptions::default(),
/// );
///
/// let generators = scanner.find_plugins(&TypeKey::new("gen::CodeGenerator"))?;
/// ```
pub struct PluginScanner {
    find_modules: Box<dyn Fn() -> Vec<PathBuf> + Send + Sync>,
    inspector: Box<dyn ModuleInspector>,
    cache: ScanCache,
    index: Mutex<Option<PluginIndex>>,
}

impl PluginScanner {
    /// Creates a scanner.
    ///
    /// `find_modules` returns the module file paths to scan; it is invoked
    /// once, when the first [`find_plugins`](Self::find_plugins) call runs
    /// discovery.
    pub fn new(
        find_modules: impl Fn() -> Vec<PathBuf> + Send + Sync + 'static,
        inspector: impl ModuleInspector + 'static,
        options: &ScannerOptions,
    ) -> Self {
        Self {
            find_modules: Box::new(find_modules),
            inspector: Box::new(inspector),
            cache: ScanCache::new(options),
            index: Mutex::new(None),
        }
    }

    /// Returns the plugins registered for the given contract, sorted by
    /// their declared dependencies.
    ///
    /// The first call performs process-wide discovery; subsequent calls
    /// serve from the in-memory index. A contract nobody exports yields an
    /// empty list.
    ///
    /// # Errors
    ///
    /// [`DiscoveryError::ModuleNotFound`] when a configured module path does
    /// not exist; [`DiscoveryError::Cycle`] when one contract's plugins
    /// declare circular dependencies; inspector failures propagate
    /// unchanged.
    pub fn find_plugins(&self, contract: &TypeKey) -> Result<Vec<ExportRecord>, DiscoveryError> {
        let mut guard = self.index.lock();
        if guard.is_none() {
            *guard = Some(self.load_plugins()?);
        }
        let Some(index) = guard.as_ref() else {
            unreachable!("plugin index was populated above");
        };
        Ok(index.get(contract).cloned().unwrap_or_default())
    }

    /// Lists the configured modules, failing on the first missing path.
    fn list_modules(&self) -> Result<Vec<PathBuf>, DiscoveryError> {
        let modules = (self.find_modules)();
        for module in &modules {
            if !module.exists() {
                return Err(DiscoveryError::ModuleNotFound {
                    path: module.clone(),
                });
            }
            tracing::trace!(module = %module.display(), "searching for plugins");
        }
        Ok(modules)
    }

    /// Runs the scan and builds the per-contract index.
    fn load_plugins(&self) -> Result<PluginIndex, DiscoveryError> {
        let modules = self.list_modules()?;
        let outcome = self.cache.load_or_scan(&modules, self.inspector.as_ref())?;
        tracing::info!(
            cached = outcome.cached_modules,
            total = modules.len(),
            plugins = outcome.records.len(),
            "used cached data for {} of {} modules",
            outcome.cached_modules,
            modules.len()
        );

        let mut index: PluginIndex = HashMap::new();
        for record in outcome.records {
            index.entry(record.contract().clone()).or_default().push(record);
        }
        for group in index.values_mut() {
            sort_group_by_dependency(group)?;
        }
        Ok(index)
    }
}

/// Orders one contract's records so every plugin appears after the plugin it
/// declares a dependency on.
fn sort_group_by_dependency(records: &mut Vec<ExportRecord>) -> Result<(), DiscoveryError> {
    let types: Vec<TypeKey> = records.iter().map(|record| record.impl_type().clone()).collect();
    let edges: Vec<(TypeKey, TypeKey)> = records
        .iter()
        .filter_map(|record| {
            record
                .depends_on()
                .map(|dependency| (dependency.clone(), record.impl_type().clone()))
        })
        .collect();

    let sorted = topological_sort(&types, &edges)?;
    sort_by_given_order(records, &sorted, |record| record.impl_type().clone())?;
    Ok(())
}
