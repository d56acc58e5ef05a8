//! Plugin discovery for Tessera (Layer 2).
//!
//! Plugins are implementation types shipped in binary modules, registered
//! against a *contract* (the interface they provide) together with a small
//! key/value metadata table. This crate finds them, orders them, and serves
//! them to consumers:
//!
//! - [`PluginScanner`] scans a configured set of module files once per
//!   process and serves per-contract, dependency-ordered
//!   [`ExportRecord`]s from an in-memory index.
//! - [`ScanCache`] persists a per-module fingerprint and export list so
//!   unchanged modules are never fully re-inspected. A stale or corrupt
//!   cache always degrades to a full rescan, never to an error.
//! - [`PluginMetadataCache`] gives each consuming contract a lazily built
//!   metadata view with dependency-sorted, suppression-filtered instance
//!   lists.
//!
//! How export declarations are physically read out of a module is
//! deliberately abstracted behind [`ModuleInspector`]; hosts plug in an
//! inspection mechanism appropriate to their packaging (an embedded
//! manifest, an explicit registration table, build-time codegen).
//!
//! [`PluginScanner`]: scanner::PluginScanner
//! [`ScanCache`]: cache::ScanCache
//! [`PluginMetadataCache`]: metadata::PluginMetadataCache
//! [`ExportRecord`]: export::ExportRecord
//! [`ModuleInspector`]: export::ModuleInspector

/// The persisted per-module scan cache.
pub mod cache;

/// Error types for discovery and the metadata framework.
pub mod error;

/// Export records, metadata values, and the module inspection contract.
pub mod export;

/// Per-contract metadata, ordering, and suppression views.
pub mod metadata;

/// Process-wide plugin discovery.
pub mod scanner;

pub use cache::{ModuleCacheEntry, ScanCache, ScanCacheData, ScanOutcome};
pub use error::{DiscoveryError, FrameworkError};
pub use export::{
    DEPENDS_ON_KEY, EXPORT_CONTRACT_KEY, ExportRecord, MetadataValue, ModuleInspector,
    SuppressPlugin, TypeKey,
};
pub use metadata::{MetadataTable, PluginMetadataCache, TypeKeyed};
pub use scanner::{DEFAULT_CACHE_FILENAME, PluginScanner, ScannerOptions};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::cache::{ScanCache, ScanOutcome};
    pub use crate::error::{DiscoveryError, FrameworkError};
    pub use crate::export::{
        DEPENDS_ON_KEY, EXPORT_CONTRACT_KEY, ExportRecord, MetadataValue, ModuleInspector,
        SuppressPlugin, TypeKey,
    };
    pub use crate::metadata::{MetadataTable, PluginMetadataCache, TypeKeyed};
    pub use crate::scanner::{PluginScanner, ScannerOptions};
}
