//! Error types for discovery and the metadata framework.
//!
//! Discovery errors indicate an environment or packaging problem (a missing
//! module file, a type that will not load); framework errors indicate the
//! engine was asked something inconsistent (a metadata query for a plugin
//! that was never registered). Both are distinguished from model-authoring
//! errors, which live in `tessera_dsl`. Cache problems are deliberately
//! absent: an unreadable or stale cache degrades to a full rescan.

use std::path::PathBuf;
use thiserror::Error;

use crate::export::TypeKey;
use tessera_graph::{CycleError, OrderError};

/// Errors raised while scanning modules for plugins.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// A configured module file path does not exist on disk.
    #[error("the given module file path does not exist: '{path}'")]
    ModuleNotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// A plugin type failed to load because one of the module's dependencies
    /// is missing. Consolidates the low-level load failure into a single
    /// actionable diagnostic.
    #[error("cannot load plugin type '{type_name}' from module '{module}': {reason}")]
    TypeLoad {
        /// The module being inspected.
        module: PathBuf,
        /// The type that failed to load.
        type_name: String,
        /// The missing-dependency diagnostic.
        reason: String,
    },

    /// Reading a module (metadata, contents) failed.
    #[error("cannot read module '{module}': {source}")]
    Io {
        /// The module being read.
        module: PathBuf,
        /// The underlying I/O failure.
        source: std::io::Error,
    },

    /// Plugins of one contract declare a circular dependency.
    #[error(transparent)]
    Cycle(#[from] CycleError),

    /// A computed plugin order did not cover a discovered plugin.
    #[error("failed to apply plugin order: {0}")]
    Order(#[from] OrderError),
}

/// Errors raised by the per-contract metadata cache.
#[derive(Debug, Error)]
pub enum FrameworkError {
    /// A metadata query named an implementation type that was never
    /// registered for the contract.
    #[error("there is no plugin '{plugin}' registered for contract '{contract}'")]
    PluginNotRegistered {
        /// The contract being queried.
        contract: TypeKey,
        /// The unknown implementation type.
        plugin: TypeKey,
    },

    /// A metadata value had the wrong kind for the query: the caller
    /// required a type reference.
    #[error(
        "metadata value '{key}' of plugin '{plugin}' must be a type reference, found a {found}"
    )]
    InvalidMetadataKind {
        /// The implementation type whose metadata is malformed.
        plugin: TypeKey,
        /// The queried metadata key.
        key: String,
        /// Kind name of the value actually present.
        found: &'static str,
    },

    /// Plugin dependencies for a group formed a cycle.
    #[error(transparent)]
    Cycle(#[from] CycleError),

    /// A memoized order did not cover an instance in the given list.
    #[error("failed to apply cached plugin order: {0}")]
    Order(#[from] OrderError),

    /// Discovery failed while lazily building the metadata index.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}
