//! Concept traits and identity types.
//!
//! Every model element implements [`Concept`]. Identity is carried by
//! [`ConceptKey`]: the concept's kind plus the rendered values of its
//! identifying properties. Two concepts with equal keys are the same model
//! element; the arena in [`crate::set`] enforces that their full definitions
//! agree.
//!
//! References between concepts are expressed as keys, never as ownership:
//! a concept that uses another concept inside its key reports that key from
//! [`Concept::key_references`], and consumers resolve it through the arena.

use core::any::Any;
use core::fmt;

use crate::error::DslError;
use crate::set::ConceptSet;

// ─────────────────────────────────────────────────────────────────────────────
// ConceptKey
// ─────────────────────────────────────────────────────────────────────────────

/// Unique identity of a concept: its kind plus the ordered tuple of
/// identifying property values.
///
/// Keys are cheap to clone and hash, and render as `Kind arg.arg.…` for
/// error messages and logs.
///
/// # Example
///
/// ```
/// use tessera_dsl::ConceptKey;
///
/// let key = ConceptKey::new("Entity", ["Sales", "Order"]);
/// assert_eq!(key.to_string(), "Entity Sales.Order");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConceptKey {
    kind: String,
    args: Vec<String>,
}

impl ConceptKey {
    /// Creates a key from a kind identifier and its identifying values.
    pub fn new<K, I, A>(kind: K, args: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            kind: kind.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// The kind identifier this key belongs to.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The identifying property values, in declaration order.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for ConceptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.args.join("."))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SourceLocation
// ─────────────────────────────────────────────────────────────────────────────

/// Position of a concept declaration in its source document.
///
/// Carried through to user-facing errors so an author can find the offending
/// declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Path or name of the source document.
    pub file: String,
    /// 1-based line number of the declaration.
    pub line: u32,
}

impl SourceLocation {
    /// Creates a location.
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Concept trait
// ─────────────────────────────────────────────────────────────────────────────

/// A declarative model element with a unique key.
///
/// Implementations are plain data types. The `Debug` rendering doubles as the
/// definition fingerprint: the arena treats two concepts with equal keys and
/// equal renderings as the same element, and rejects equal keys with
/// differing renderings.
///
/// # Example
///
/// ```
/// use tessera_dsl::{Concept, ConceptKey};
///
/// #[derive(Debug)]
/// struct Entity {
///     module: String,
///     name: String,
/// }
///
/// impl Concept for Entity {
///     fn kind(&self) -> &'static str {
///         "Entity"
///     }
///
///     fn key(&self) -> ConceptKey {
///         ConceptKey::new(self.kind(), [self.module.clone(), self.name.clone()])
///     }
/// }
/// ```
pub trait Concept: Any + Send + Sync + fmt::Debug {
    /// The kind identifier shared by all concepts of this type.
    fn kind(&self) -> &'static str;

    /// The concept's unique key.
    fn key(&self) -> ConceptKey;

    /// Keys of concepts referenced by this concept's identifying properties.
    ///
    /// These references form the edges of the key-dependency graph: a
    /// referenced concept is ordered before every concept referencing it,
    /// and an unresolved reference fails model validation.
    fn key_references(&self) -> Vec<ConceptKey> {
        Vec::new()
    }

    /// Returns the macro view of this concept, if it generates further
    /// concepts during expansion.
    fn as_macro(&self) -> Option<&dyn MacroConcept> {
        None
    }

    /// Returns the two-phase initialization view of this concept, if some of
    /// its properties must be computed before it can participate in
    /// expansion.
    fn as_alternative_init(&mut self) -> Option<&mut dyn AlternativeInitialization> {
        None
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MacroConcept
// ─────────────────────────────────────────────────────────────────────────────

/// A concept that generates further concepts during expansion.
///
/// The expansion driver invokes [`create_new_concepts`] repeatedly (once per
/// round, against the current full model) until a round produces no new
/// keys. Implementations must therefore be idempotent: re-emitting a concept
/// that already exists (by key, with an identical definition) is a no-op,
/// while emitting a conflicting definition at an existing key aborts the run.
///
/// [`create_new_concepts`]: MacroConcept::create_new_concepts
pub trait MacroConcept: Send + Sync {
    /// Produces the concepts implied by this one, given the current model.
    fn create_new_concepts(&self, existing: &ConceptSet) -> Result<Vec<Box<dyn Concept>>, DslError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// AlternativeInitialization
// ─────────────────────────────────────────────────────────────────────────────

/// Two-phase initialization for concepts whose properties cannot all be
/// parsed directly.
///
/// The expansion driver runs both phases before the concept enters the model
/// and before its macro expansion (if any) becomes eligible:
///
/// 1. [`declared_deferred_properties`] names the properties that will be
///    computed rather than parsed.
/// 2. [`initialize_deferred_properties`] populates them on `self`, returning
///    any auxiliary concepts created along the way.
///
/// [`declared_deferred_properties`]: AlternativeInitialization::declared_deferred_properties
/// [`initialize_deferred_properties`]: AlternativeInitialization::initialize_deferred_properties
pub trait AlternativeInitialization {
    /// Names of the properties that are computed instead of parsed.
    fn declared_deferred_properties(&self) -> Vec<&'static str>;

    /// Populates the deferred properties, returning auxiliary concepts
    /// created as a side effect.
    fn initialize_deferred_properties(&mut self) -> Result<Vec<Box<dyn Concept>>, DslError>;
}
