//! A plugin-driven model compiler: declarative concepts expand to a fixpoint
//! and discovered generator plugins assemble the output artifacts.
//!

pub use tessera_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use tessera_internal::prelude::*;
}
