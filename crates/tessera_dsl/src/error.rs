//! Error types for model validation and expansion.

use thiserror::Error;

use tessera_graph::CycleError;

/// Errors produced while building or expanding a concept model.
///
/// `User` marks an authoring mistake in the declared model; the remaining
/// variants indicate a misbehaving macro rule set or an inconsistent concept
/// graph. All of them abort the current run, since downstream consumers assume a
/// complete, fixpoint-reached model.
#[derive(Debug, Error)]
pub enum DslError {
    /// Malformed model input: a bad key, an unresolved reference, or a
    /// conflicting re-declaration. Reported with the declared location so
    /// the author can fix the declaration.
    #[error("invalid concept declaration {concept} ({origin}): {message}")]
    User {
        /// Rendering of the offending concept's key.
        concept: String,
        /// Where the concept was declared or which macro generated it.
        origin: String,
        /// What is wrong with the declaration.
        message: String,
    },

    /// A macro concept's expansion failed or produced a conflicting concept.
    #[error("macro expansion failed for {concept}: {message}")]
    Expansion {
        /// Rendering of the macro concept's key.
        concept: String,
        /// What went wrong during expansion.
        message: String,
    },

    /// Expansion kept producing new concepts past the round budget; a macro
    /// rule is likely non-terminating.
    #[error(
        "macro expansion did not reach a fixpoint after {rounds} rounds (limit {limit}); \
         concepts created in the final round: {recent}"
    )]
    RoundBudgetExceeded {
        /// Number of rounds executed.
        rounds: usize,
        /// The configured or derived round limit.
        limit: usize,
        /// Keys of the concepts created in the final round.
        recent: String,
    },

    /// The key-dependency graph contains a cycle.
    #[error(transparent)]
    Cycle(#[from] CycleError),
}
