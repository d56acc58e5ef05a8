//! Export records, metadata values, and the module inspection contract.
//!
//! An *export* declares that an implementation type satisfies a contract
//! type, optionally carrying metadata. Two metadata keys are reserved:
//! [`DEPENDS_ON_KEY`] expresses a plugin ordering edge, and
//! [`EXPORT_CONTRACT_KEY`] records the exported contract in the metadata
//! table itself so metadata consumers need no side channel.

use core::fmt;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::DiscoveryError;

/// Reserved metadata key: "this plugin must be ordered after the plugin with
/// the given type". The value must be a [`MetadataValue::TypeRef`].
pub const DEPENDS_ON_KEY: &str = "DependsOn";

/// Reserved metadata key holding the exported contract type, added to every
/// record's metadata table by [`ExportRecord::new`].
pub const EXPORT_CONTRACT_KEY: &str = "ExportContract";

// ─────────────────────────────────────────────────────────────────────────────
// TypeKey
// ─────────────────────────────────────────────────────────────────────────────

/// Fully-qualified type name identifying a contract or implementation type.
///
/// Discovery works across module boundaries, so identity is carried by name
/// rather than by a compile-time type id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(String);

impl TypeKey {
    /// Creates a type key from a fully-qualified name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates the key of a compile-time type.
    #[must_use]
    pub fn of<T: ?Sized>() -> Self {
        Self(core::any::type_name::<T>().to_string())
    }

    /// The name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MetadataValue
// ─────────────────────────────────────────────────────────────────────────────

/// A metadata payload attached to an export declaration.
///
/// Only a small fixed set of kinds is ever consulted, so metadata is a
/// closed union rather than an open "any" type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataValue {
    /// A reference to another type, e.g. a dependency edge.
    TypeRef(TypeKey),
    /// Free-form text.
    Str(String),
    /// A flag.
    Bool(bool),
}

impl MetadataValue {
    /// Human-readable name of this value's kind, for diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            MetadataValue::TypeRef(_) => "type reference",
            MetadataValue::Str(_) => "string",
            MetadataValue::Bool(_) => "boolean",
        }
    }

    /// The referenced type, if this value is a type reference.
    #[must_use]
    pub fn as_type_ref(&self) -> Option<&TypeKey> {
        match self {
            MetadataValue::TypeRef(key) => Some(key),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ExportRecord
// ─────────────────────────────────────────────────────────────────────────────

/// One discovered plugin: an implementation type exported for a contract
/// type, with its metadata table. Immutable once produced by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRecord {
    impl_type: TypeKey,
    contract: TypeKey,
    metadata: BTreeMap<String, MetadataValue>,
}

impl ExportRecord {
    /// Creates a record. The contract is also entered into the metadata
    /// table under [`EXPORT_CONTRACT_KEY`].
    #[must_use]
    pub fn new(impl_type: TypeKey, contract: TypeKey) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert(
            EXPORT_CONTRACT_KEY.to_string(),
            MetadataValue::TypeRef(contract.clone()),
        );
        Self {
            impl_type,
            contract,
            metadata,
        }
    }

    /// Adds a metadata entry (builder style).
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: MetadataValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Declares an ordering dependency on another implementation type
    /// (builder style). Shorthand for a [`DEPENDS_ON_KEY`] type reference.
    #[must_use]
    pub fn with_dependency(self, depends_on: TypeKey) -> Self {
        self.with_metadata(DEPENDS_ON_KEY, MetadataValue::TypeRef(depends_on))
    }

    /// The implementation type.
    #[must_use]
    pub fn impl_type(&self) -> &TypeKey {
        &self.impl_type
    }

    /// The exported contract type.
    #[must_use]
    pub fn contract(&self) -> &TypeKey {
        &self.contract
    }

    /// The full metadata table.
    #[must_use]
    pub fn metadata(&self) -> &BTreeMap<String, MetadataValue> {
        &self.metadata
    }

    /// Looks up one metadata value.
    #[must_use]
    pub fn metadata_value(&self, key: &str) -> Option<&MetadataValue> {
        self.metadata.get(key)
    }

    /// The declared ordering dependency, when present and well-formed.
    ///
    /// Kind enforcement (rejecting a non-type-reference value under
    /// [`DEPENDS_ON_KEY`]) lives in the metadata cache; the scanner only
    /// consumes well-formed edges.
    #[must_use]
    pub fn depends_on(&self) -> Option<&TypeKey> {
        self.metadata_value(DEPENDS_ON_KEY).and_then(MetadataValue::as_type_ref)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ModuleInspector
// ─────────────────────────────────────────────────────────────────────────────

/// Reads export declarations out of a module file.
///
/// This is the registry seam of the discovery subsystem: the engine never
/// inspects binaries itself. Hosts supply an inspector that understands
/// their module packaging: an embedded manifest section, a registration
/// table compiled into the module, or metadata generated at build time.
///
/// `inspect_types` is the cache fast path: the scanner already knows which
/// types carried exports last time and asks only about those, letting the
/// inspector skip full type enumeration for unchanged modules.
pub trait ModuleInspector: Send + Sync {
    /// Enumerates every export declaration in the module.
    ///
    /// # Errors
    ///
    /// [`DiscoveryError::TypeLoad`] for a type that fails to load because a
    /// dependency module is missing; any other failure propagates unchanged.
    fn inspect(&self, module: &Path) -> Result<Vec<ExportRecord>, DiscoveryError>;

    /// Reads export declarations for the named types only.
    fn inspect_types(
        &self,
        module: &Path,
        type_names: &[String],
    ) -> Result<Vec<ExportRecord>, DiscoveryError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// SuppressPlugin
// ─────────────────────────────────────────────────────────────────────────────

/// Excludes one discovered implementation from the delivered list of a
/// contract. Supplied by host configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuppressPlugin {
    /// The contract the suppression applies to.
    pub contract: TypeKey,
    /// The implementation type to exclude.
    pub suppressed: TypeKey,
}

impl SuppressPlugin {
    /// Creates a suppression entry.
    #[must_use]
    pub fn new(contract: TypeKey, suppressed: TypeKey) -> Self {
        Self {
            contract,
            suppressed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_carries_the_contract_in_metadata() {
        let record = ExportRecord::new(TypeKey::new("pkg::Impl"), TypeKey::new("pkg::Contract"));
        assert_eq!(
            record.metadata_value(EXPORT_CONTRACT_KEY),
            Some(&MetadataValue::TypeRef(TypeKey::new("pkg::Contract")))
        );
    }

    #[test]
    fn dependency_shorthand_round_trips() {
        let record = ExportRecord::new(TypeKey::new("pkg::G1"), TypeKey::new("pkg::Generator"))
            .with_dependency(TypeKey::new("pkg::G2"));
        assert_eq!(record.depends_on(), Some(&TypeKey::new("pkg::G2")));
    }

    #[test]
    fn non_type_ref_dependency_is_not_an_edge() {
        let record = ExportRecord::new(TypeKey::new("pkg::G1"), TypeKey::new("pkg::Generator"))
            .with_metadata(DEPENDS_ON_KEY, MetadataValue::Str("pkg::G2".into()));
        assert_eq!(record.depends_on(), None);
    }

    #[test]
    fn metadata_value_kind_names() {
        assert_eq!(
            MetadataValue::TypeRef(TypeKey::new("t")).kind_name(),
            "type reference"
        );
        assert_eq!(MetadataValue::Str(String::new()).kind_name(), "string");
        assert_eq!(MetadataValue::Bool(true).kind_name(), "boolean");
    }
}
