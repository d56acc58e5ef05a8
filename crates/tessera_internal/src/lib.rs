//! # Tessera Internal Library
//!
//! Re-exports the core Tessera crates for convenience.

/// Layer 1: dependency graph and ordering primitives.
pub use tessera_graph;

/// Layer 2: concept model and fixpoint macro expansion.
pub use tessera_dsl;

/// Layer 2: tag-based code assembly.
pub use tessera_codegen;

/// Layer 2: plugin discovery, scan cache, and metadata views.
pub use tessera_plugin;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use tessera_codegen::prelude::*;
    pub use tessera_dsl::prelude::*;
    pub use tessera_graph::prelude::*;
    pub use tessera_plugin::prelude::*;
}
