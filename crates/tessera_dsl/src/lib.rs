//! Concept model and fixpoint macro expansion for Tessera (Layer 2).
//!
//! A *concept* is a uniquely keyed declarative model element. Concepts may
//! reference other concepts through the properties that make up their key,
//! and some concepts, the *macro concepts*, generate further concepts when
//! expanded against the current model. `tessera_dsl` owns the concept arena
//! and the driver that expands macros round by round until a fixpoint is
//! reached (a full round that produces no previously unseen key).
//!
//! # Core Concepts
//!
//! - [`Concept`] - Trait implemented by every model element
//! - [`ConceptKey`] - Unique identity: kind plus identifying property values
//! - [`ConceptSet`] - Append-only arena indexed by key
//! - [`MacroConcept`] - Contract for concepts that generate further concepts
//! - [`AlternativeInitialization`] - Two-phase deferred-property contract
//! - [`MacroExpansion`] - The fixpoint expansion driver
//!
//! # Example
//!
//! ```ignore
//! let driver = MacroExpansion::new(ExpansionOptions::default());
//! let model = driver.expand(declarations)?;
//! for key in model.dependency_order()? {
//!     // concepts in a reference-respecting order
//! }
//! ```
//!
//! # Architecture
//!
//! This crate is Layer 2 of the Tessera architecture:
//!
//! - **Layer 1** (`tessera_graph`): ordering primitives
//! - **Layer 2** (`tessera_dsl`): concept graph and expansion (this crate)
//! - **Layer 2** (`tessera_codegen`, `tessera_plugin`): code assembly and
//!   plugin discovery
//! - **Layer 3** (plugins): concrete concept vocabularies and generators

/// Concept traits and identity types.
pub mod concept;

/// Error types for model validation and expansion.
pub mod error;

/// The fixpoint macro-expansion driver.
pub mod expansion;

/// The append-only concept arena.
pub mod set;

pub use concept::{
    AlternativeInitialization, Concept, ConceptKey, MacroConcept, SourceLocation,
};
pub use error::DslError;
pub use expansion::{Declaration, ExpansionOptions, MacroExpansion};
pub use set::{ConceptSet, MergeOutcome, Origin};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::concept::{
        AlternativeInitialization, Concept, ConceptKey, MacroConcept, SourceLocation,
    };
    pub use crate::error::DslError;
    pub use crate::expansion::{Declaration, ExpansionOptions, MacroExpansion};
    pub use crate::set::{ConceptSet, MergeOutcome, Origin};
}
