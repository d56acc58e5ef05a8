//! The fixpoint macro-expansion driver.
//!
//! Expansion proceeds in rounds. Each round invokes every macro concept in
//! the model against the current full concept set and merges whatever it
//! returns. A round that produces no previously unseen key is the fixpoint;
//! a run that keeps producing new keys past the round budget is aborted as
//! non-terminating.
//!
//! Concepts requiring [`AlternativeInitialization`] pass through an explicit
//! per-instance state machine before they become visible to the model:
//!
//! ```text
//! Declared → PropertiesPopulated → Expanded
//! ```
//!
//! Phase one declares the deferred property names, phase two populates them
//! (possibly emitting auxiliary concepts). Only then is the concept inserted
//! into the arena, so a macro concept can never observe (or expand) a
//! partially initialized peer.
//!
//! [`AlternativeInitialization`]: crate::concept::AlternativeInitialization

use hashbrown::{HashMap, HashSet};
use std::sync::Arc;

use crate::concept::{Concept, ConceptKey, SourceLocation};
use crate::error::DslError;
use crate::set::{ConceptSet, MergeOutcome, Origin};

// ─────────────────────────────────────────────────────────────────────────────
// Declarations and options
// ─────────────────────────────────────────────────────────────────────────────

/// A parsed concept declaration: the concept plus where it was declared.
pub struct Declaration {
    /// The declared concept.
    pub concept: Box<dyn Concept>,
    /// Position of the declaration in its source document.
    pub location: SourceLocation,
}

impl Declaration {
    /// Creates a declaration.
    pub fn new(concept: Box<dyn Concept>, location: SourceLocation) -> Self {
        Self { concept, location }
    }
}

/// Configuration for one expansion run.
#[derive(Debug, Clone, Default)]
pub struct ExpansionOptions {
    /// Upper bound on expansion rounds. When unset, the bound is derived
    /// from the number of distinct concept kinds in the seeded model:
    /// expansion is expected to form chains through the kind vocabulary,
    /// not unbounded recursion.
    pub max_rounds: Option<usize>,
}

const ROUND_BUDGET_BASE: usize = 8;
const ROUND_BUDGET_PER_KIND: usize = 2;

// ─────────────────────────────────────────────────────────────────────────────
// Per-instance initialization state
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle of a macro concept instance, tracked by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MacroState {
    /// Deferred properties populated; eligible for expansion.
    PropertiesPopulated,
    /// Has produced its output at least once. Still re-runs every round;
    /// fixpoint detection relies on re-runs being idempotent.
    Expanded,
}

// ─────────────────────────────────────────────────────────────────────────────
// MacroExpansion
// ─────────────────────────────────────────────────────────────────────────────

/// Drives a concept model from its seed declarations to the expansion
/// fixpoint.
///
/// # Example
///
/// ```ignore
/// let driver = MacroExpansion::new(ExpansionOptions::default());
/// let model = driver.expand(declarations)?;
/// ```
#[derive(Debug, Default)]
pub struct MacroExpansion {
    options: ExpansionOptions,
}

impl MacroExpansion {
    /// Creates a driver with the given options.
    #[must_use]
    pub fn new(options: ExpansionOptions) -> Self {
        Self { options }
    }

    /// Expands the declared model to its fixpoint.
    ///
    /// Returns the complete concept set after validating that every key
    /// reference resolves and that the key-dependency graph is acyclic.
    ///
    /// # Errors
    ///
    /// - [`DslError::User`] for malformed declarations (conflicting keys,
    ///   unresolved references).
    /// - [`DslError::Expansion`] when a macro fails or emits a conflicting
    ///   concept.
    /// - [`DslError::RoundBudgetExceeded`] when expansion does not converge.
    /// - [`DslError::Cycle`] when key references form a cycle.
    pub fn expand(&self, declarations: Vec<Declaration>) -> Result<ConceptSet, DslError> {
        let mut set = ConceptSet::new();
        let mut states: HashMap<ConceptKey, MacroState> = HashMap::new();

        for declaration in declarations {
            self.intake(
                declaration.concept,
                Origin::Declared(declaration.location),
                &mut set,
                &mut states,
            )?;
        }

        let limit = self
            .options
            .max_rounds
            .unwrap_or_else(|| derived_round_budget(&set));

        let mut rounds = 0usize;
        loop {
            rounds += 1;
            let macro_keys: Vec<ConceptKey> = set
                .iter()
                .filter(|(_, concept)| concept.as_macro().is_some())
                .map(|(key, _)| key.clone())
                .collect();

            let mut created: Vec<ConceptKey> = Vec::new();
            for key in macro_keys {
                let Some(concept) = set.get(&key).map(Arc::clone) else {
                    continue;
                };
                let Some(makro) = concept.as_macro() else {
                    continue;
                };
                if !states.contains_key(&key) {
                    // Every macro is registered by intake() after its
                    // initialization phases; a missing state means the
                    // concept bypassed the driver.
                    return Err(DslError::Expansion {
                        concept: key.to_string(),
                        message: "macro concept was never initialized by the expansion driver"
                            .into(),
                    });
                }

                let produced = makro.create_new_concepts(&set)?;
                for new_concept in produced {
                    created.extend(self.intake(
                        new_concept,
                        Origin::Generated { by: key.clone() },
                        &mut set,
                        &mut states,
                    )?);
                }
                states.insert(key, MacroState::Expanded);
            }

            if created.is_empty() {
                tracing::debug!(concepts = set.len(), rounds, "macro expansion reached fixpoint");
                break;
            }
            if rounds >= limit {
                let recent = created
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(DslError::RoundBudgetExceeded {
                    rounds,
                    limit,
                    recent,
                });
            }
            tracing::trace!(round = rounds, new_concepts = created.len(), "expansion round complete");
        }

        // Validates references and the key-dependency DAG invariant.
        set.dependency_order()?;
        Ok(set)
    }

    /// Runs two-phase initialization if required, merges the concept and any
    /// auxiliary concepts it created, and returns the keys that were new.
    fn intake(
        &self,
        mut concept: Box<dyn Concept>,
        origin: Origin,
        set: &mut ConceptSet,
        states: &mut HashMap<ConceptKey, MacroState>,
    ) -> Result<Vec<ConceptKey>, DslError> {
        let mut auxiliary: Vec<Box<dyn Concept>> = Vec::new();
        if let Some(init) = concept.as_alternative_init() {
            let deferred = init.declared_deferred_properties();
            tracing::trace!(properties = ?deferred, "initializing deferred properties");
            auxiliary = init.initialize_deferred_properties()?;
        }

        let key = concept.key();
        let is_macro = concept.as_macro().is_some();

        let mut added = Vec::new();
        if set.insert(concept, origin)? == MergeOutcome::Added {
            if is_macro {
                states.insert(key.clone(), MacroState::PropertiesPopulated);
            }
            added.push(key.clone());
        }

        for aux in auxiliary {
            added.extend(self.intake(
                aux,
                Origin::Generated { by: key.clone() },
                set,
                states,
            )?);
        }
        Ok(added)
    }
}

/// Round budget derived from the kind vocabulary: expansion chains step
/// through kinds, so the number of distinct kinds bounds any terminating
/// chain's length.
fn derived_round_budget(seed: &ConceptSet) -> usize {
    let kinds: HashSet<&str> = seed.iter().map(|(_, concept)| concept.kind()).collect();
    ROUND_BUDGET_BASE + ROUND_BUDGET_PER_KIND * kinds.len()
}
