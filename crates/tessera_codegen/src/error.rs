//! Error types for template resolution and generator execution.

use thiserror::Error;

use crate::assembler::TemplateId;
use tessera_dsl::DslError;

/// Errors produced while assembling artifact text.
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// A template id was resolved without ever being registered.
    #[error("unknown template '{template}'")]
    UnknownTemplate {
        /// The unregistered template id.
        template: TemplateId,
    },

    /// Contributed fragments kept introducing new tag markers past the pass
    /// budget; a contribution cycle is the usual cause.
    #[error("template '{template}' did not resolve after {passes} passes; contributed fragments keep introducing new tags")]
    PassBudgetExceeded {
        /// The template that failed to resolve.
        template: TemplateId,
        /// Number of substitution passes executed.
        passes: usize,
    },

    /// A code generator reported a failure. Aborts the whole run; partial
    /// artifacts are never emitted.
    #[error("code generator '{generator}' failed: {message}")]
    Generator {
        /// Name of the failing generator.
        generator: String,
        /// The generator's failure message.
        message: String,
    },

    /// The concept model handed to a generator was invalid.
    #[error(transparent)]
    Model(#[from] DslError),
}
