//! Tag-based code assembly for Tessera (Layer 2).
//!
//! Code generators do not write output files directly. They register text
//! *contributions* against named insertion points (*tags*) inside registered
//! *templates*, and the [`ArtifactAssembler`] resolves each template by
//! splicing every tag's contributions, in a deterministic order, into the
//! template text. Because contributors are independent plugins, the
//! assembler is what makes the final artifact reproducible: the same model
//! and the same plugin set always produce byte-identical output.
//!
//! # Core Concepts
//!
//! - [`Template`] - Registered text containing `{{tag}}` markers
//! - [`Tag`] - A named insertion point
//! - [`ArtifactAssembler`] - Collects contributions and resolves templates
//! - [`CodeGenerator`] - Contract implemented by generator plugins
//! - [`OrderingIndex`] - Concept-order-derived contribution ordering keys
//!
//! # Example
//!
//! ```
//! use tessera_codegen::{ArtifactAssembler, Tag, TemplateId};
//!
//! let mut assembler = ArtifactAssembler::new();
//! let template = TemplateId::new("schema.sql");
//! assembler.add_template(template.clone(), "-- tables\n{{Tables}}");
//!
//! let tag = Tag::new("Tables");
//! assembler.contribute(&template, &tag, 2, "CREATE TABLE b;\n");
//! assembler.contribute(&template, &tag, 1, "CREATE TABLE a;\n");
//!
//! let text = assembler.resolve(&template).unwrap();
//! assert_eq!(text, "-- tables\nCREATE TABLE a;\nCREATE TABLE b;\n");
//! ```

/// Template registration, contributions, and tag resolution.
pub mod assembler;

/// Error types for template resolution and generator execution.
pub mod error;

/// The code-generator contract and concept-order helpers.
pub mod generator;

pub use assembler::{ArtifactAssembler, Tag, Template, TemplateId};
pub use error::AssemblyError;
pub use generator::{CodeGenerator, OrderingIndex, run_generators};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::assembler::{ArtifactAssembler, Tag, Template, TemplateId};
    pub use crate::error::AssemblyError;
    pub use crate::generator::{CodeGenerator, OrderingIndex, run_generators};
}
