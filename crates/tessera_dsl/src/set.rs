//! The append-only concept arena.
//!
//! All concepts of a model live in one [`ConceptSet`], indexed by key and
//! kept in insertion order. References between concepts are stored as keys
//! and resolved by lookup, so the arena is the single owner of every concept
//! and no ownership cycles can form.

use core::any::Any;
use core::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::concept::{Concept, ConceptKey, SourceLocation};
use crate::error::DslError;
use tessera_graph::topological_sort;

// ─────────────────────────────────────────────────────────────────────────────
// Origin
// ─────────────────────────────────────────────────────────────────────────────

/// How a concept entered the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Parsed from a source document at the given location.
    Declared(SourceLocation),
    /// Emitted by the macro concept with the given key.
    Generated {
        /// Key of the generating macro concept.
        by: ConceptKey,
    },
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Declared(location) => write!(f, "declared at {location}"),
            Origin::Generated { by } => write!(f, "generated by {by}"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ConceptSet
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of merging a concept into the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The key was new; the concept was added.
    Added,
    /// An identical concept with this key was already present.
    AlreadyPresent,
}

struct ConceptEntry {
    concept: Arc<dyn Concept>,
    origin: Origin,
}

/// Append-only arena holding every concept of a model, indexed by key.
///
/// Insertion order is preserved and drives deterministic iteration. A key is
/// inserted at most once: re-inserting an identical concept is a no-op, and
/// inserting a different concept under an existing key is an error.
#[derive(Default)]
pub struct ConceptSet {
    entries: IndexMap<ConceptKey, ConceptEntry>,
}

impl ConceptSet {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of concepts in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the arena holds no concepts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if a concept with the given key is present.
    #[must_use]
    pub fn contains(&self, key: &ConceptKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Merges a concept into the arena.
    ///
    /// A concept whose key is already present is treated as already-present
    /// when its `Debug` rendering matches the stored one. A differing
    /// rendering at the same key is a conflicting re-declaration: a
    /// [`DslError::User`] for declared concepts, a [`DslError::Expansion`]
    /// for macro-generated ones.
    pub fn insert(
        &mut self,
        concept: Box<dyn Concept>,
        origin: Origin,
    ) -> Result<MergeOutcome, DslError> {
        let key = concept.key();
        if let Some(existing) = self.entries.get(&key) {
            let stored = format!("{:?}", existing.concept);
            let offered = format!("{:?}", concept);
            if stored == offered {
                return Ok(MergeOutcome::AlreadyPresent);
            }
            let message = format!(
                "a different concept with the same key already exists ({})",
                existing.origin
            );
            return Err(match origin {
                Origin::Declared(location) => DslError::User {
                    concept: key.to_string(),
                    origin: location.to_string(),
                    message,
                },
                Origin::Generated { by } => DslError::Expansion {
                    concept: by.to_string(),
                    message: format!("emitted conflicting concept {key}: {message}"),
                },
            });
        }

        self.entries.insert(
            key,
            ConceptEntry {
                concept: Arc::from(concept),
                origin,
            },
        );
        Ok(MergeOutcome::Added)
    }

    /// Looks up a concept by key.
    #[must_use]
    pub fn get(&self, key: &ConceptKey) -> Option<&Arc<dyn Concept>> {
        self.entries.get(key).map(|entry| &entry.concept)
    }

    /// Looks up a concept by key and downcasts it to a concrete type.
    #[must_use]
    pub fn resolve<T: Concept>(&self, key: &ConceptKey) -> Option<&T> {
        self.get(key).and_then(|concept| as_any(concept).downcast_ref::<T>())
    }

    /// How the concept with the given key entered the model.
    #[must_use]
    pub fn origin(&self, key: &ConceptKey) -> Option<&Origin> {
        self.entries.get(key).map(|entry| &entry.origin)
    }

    /// Position of the key in insertion order.
    #[must_use]
    pub fn position(&self, key: &ConceptKey) -> Option<usize> {
        self.entries.get_index_of(key)
    }

    /// Iterates over all concepts in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&ConceptKey, &Arc<dyn Concept>)> {
        self.entries.iter().map(|(key, entry)| (key, &entry.concept))
    }

    /// Iterates over the keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &ConceptKey> {
        self.entries.keys()
    }

    /// Iterates over all concepts of one kind, in insertion order.
    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Arc<dyn Concept>> {
        self.entries
            .values()
            .filter(move |entry| entry.concept.kind() == kind)
            .map(|entry| &entry.concept)
    }

    /// Concepts of one kind downcast to their concrete type.
    pub fn resolve_kind<'a, T: Concept>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a T> {
        self.of_kind(kind)
            .filter_map(|concept| as_any(concept).downcast_ref::<T>())
    }

    /// Computes the canonical concept order: a topological sort over the
    /// key-reference edges, with ties broken by insertion order.
    ///
    /// Also serves as model validation: every key reference must resolve to
    /// a concept in the arena, and the reference graph must be acyclic.
    ///
    /// # Errors
    ///
    /// [`DslError::User`] for an unresolved reference, [`DslError::Cycle`]
    /// when concepts form a key-dependency cycle.
    pub fn dependency_order(&self) -> Result<Vec<ConceptKey>, DslError> {
        let mut edges: Vec<(ConceptKey, ConceptKey)> = Vec::new();
        for (key, entry) in &self.entries {
            for reference in entry.concept.key_references() {
                if !self.entries.contains_key(&reference) {
                    return Err(DslError::User {
                        concept: key.to_string(),
                        origin: entry.origin.to_string(),
                        message: format!("unresolved reference to {reference}"),
                    });
                }
                edges.push((reference, key.clone()));
            }
        }

        let nodes: Vec<ConceptKey> = self.entries.keys().cloned().collect();
        Ok(topological_sort(&nodes, &edges)?)
    }
}

/// Upcasts a stored concept to `dyn Any` for downcasting.
fn as_any(concept: &Arc<dyn Concept>) -> &dyn Any {
    concept.as_ref()
}

impl fmt::Debug for ConceptSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, e)| (k, &e.concept)))
            .finish()
    }
}
