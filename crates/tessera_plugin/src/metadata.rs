//! Per-contract metadata, ordering, and suppression views.
//!
//! A [`PluginMetadataCache`] is the runtime face of discovery for one
//! contract. It must not hold plugin *instances*, since consumers construct
//! fresh instances per use to carry per-request context. It caches
//! only what is stable: the metadata table per implementation type and the
//! dependency order per grouping key. Instance lists are permuted to match
//! the cached order on every call.
//!
//! The metadata index is built lazily, exactly once, on first use;
//! concurrent first readers either perform the single construction or wait
//! and read the published result. The per-group order map is add-or-fetch:
//! the computation is pure for a fixed discovery result, so whichever caller
//! stores first wins and every caller converges on the same order.

use std::collections::BTreeMap;
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use parking_lot::Mutex;

use crate::error::{DiscoveryError, FrameworkError};
use crate::export::{DEPENDS_ON_KEY, MetadataValue, SuppressPlugin, TypeKey};
use tessera_graph::{sort_by_given_order, topological_sort};

// ─────────────────────────────────────────────────────────────────────────────
// TypeKeyed
// ─────────────────────────────────────────────────────────────────────────────

/// Reports the implementation type of a plugin instance.
///
/// Instance lists handed to [`PluginMetadataCache::sorted_and_filtered`] may
/// be rebuilt for every call; the type key is the stable identity that ties
/// an instance back to its discovered metadata.
pub trait TypeKeyed {
    /// The implementation type this instance belongs to.
    fn type_key(&self) -> TypeKey;
}

/// Per-implementation metadata table.
pub type MetadataTable = BTreeMap<String, MetadataValue>;

type MetadataProvider =
    Box<dyn Fn() -> Result<Vec<(TypeKey, MetadataTable)>, DiscoveryError> + Send + Sync>;

// ─────────────────────────────────────────────────────────────────────────────
// PluginMetadataCache
// ─────────────────────────────────────────────────────────────────────────────

/// Metadata, dependency ordering, and suppression for one contract's
/// plugins.
///
/// # Example
///
/// ```ignore
/// let cache = PluginMetadataCache::new(
///     TypeKey::new("gen::CodeGenerator"),
///     move || {
///         let records = scanner.find_plugins(&TypeKey::new("gen::CodeGenerator"))?;
///         Ok(records
///             .into_iter()
///             .map(|r| (r.impl_type().clone(), r.metadata().clone()))
///             .collect())
///     },
///     &suppressions,
/// );
///
/// let ordered = cache.sorted_and_filtered(&group_key, instances)?;
/// ```
pub struct PluginMetadataCache {
    contract: TypeKey,
    provider: MetadataProvider,
    index: Mutex<Option<Arc<HashMap<TypeKey, MetadataTable>>>>,
    sorted_by_group: Mutex<HashMap<TypeKey, Arc<Vec<TypeKey>>>>,
    suppressed: HashSet<TypeKey>,
}

impl PluginMetadataCache {
    /// Creates a cache for one contract.
    ///
    /// `provider` supplies the discovered (implementation type, metadata)
    /// pairs; it runs at most once, on first use. The suppression set is
    /// fixed here: only entries naming this contract apply.
    pub fn new(
        contract: TypeKey,
        provider: impl Fn() -> Result<Vec<(TypeKey, MetadataTable)>, DiscoveryError>
        + Send
        + Sync
        + 'static,
        suppressions: &[SuppressPlugin],
    ) -> Self {
        let suppressed = suppressions
            .iter()
            .filter(|entry| entry.contract == contract)
            .map(|entry| entry.suppressed.clone())
            .collect();
        Self {
            contract,
            provider: Box::new(provider),
            index: Mutex::new(None),
            sorted_by_group: Mutex::new(HashMap::new()),
            suppressed,
        }
    }

    /// The contract this cache serves.
    #[must_use]
    pub fn contract(&self) -> &TypeKey {
        &self.contract
    }

    /// Looks up one metadata value of an implementation type.
    ///
    /// # Errors
    ///
    /// [`FrameworkError::PluginNotRegistered`] when the type was never
    /// discovered for this contract. An absent key is `Ok(None)`, not an
    /// error.
    pub fn metadata_value(
        &self,
        plugin: &TypeKey,
        key: &str,
    ) -> Result<Option<MetadataValue>, FrameworkError> {
        let index = self.metadata_index()?;
        let Some(table) = index.get(plugin) else {
            return Err(FrameworkError::PluginNotRegistered {
                contract: self.contract.clone(),
                plugin: plugin.clone(),
            });
        };
        Ok(table.get(key).cloned())
    }

    /// The declared ordering dependency of an implementation type.
    ///
    /// # Errors
    ///
    /// [`FrameworkError::InvalidMetadataKind`] when a `DependsOn` value is
    /// present but is not a type reference.
    pub fn depends_on(&self, plugin: &TypeKey) -> Result<Option<TypeKey>, FrameworkError> {
        match self.metadata_value(plugin, DEPENDS_ON_KEY)? {
            None => Ok(None),
            Some(MetadataValue::TypeRef(dependency)) => Ok(Some(dependency)),
            Some(other) => Err(FrameworkError::InvalidMetadataKind {
                plugin: plugin.clone(),
                key: DEPENDS_ON_KEY.to_string(),
                found: other.kind_name(),
            }),
        }
    }

    /// Sorts instances by their types' declared dependencies and removes
    /// suppressed implementations.
    ///
    /// The dependency order is computed once per distinct `group_key` and
    /// reused for every later call with that key, permuting whatever
    /// instance list the caller brings to match it.
    ///
    /// # Errors
    ///
    /// [`FrameworkError::Cycle`] when the instances' dependencies form a
    /// cycle; [`FrameworkError::Order`] when an instance's type is not part
    /// of the order memoized for this group key.
    pub fn sorted_and_filtered<P: TypeKeyed + ?Sized>(
        &self,
        group_key: &TypeKey,
        instances: Vec<Arc<P>>,
    ) -> Result<Vec<Arc<P>>, FrameworkError> {
        let order = {
            let mut groups = self.sorted_by_group.lock();
            match groups.get(group_key) {
                Some(order) => Arc::clone(order),
                None => {
                    let order = Arc::new(self.dependency_order(&instances)?);
                    groups.insert(group_key.clone(), Arc::clone(&order));
                    order
                }
            }
        };

        let mut instances = instances;
        sort_by_given_order(&mut instances, &order, |instance| instance.type_key())?;

        if self.suppressed.is_empty() {
            return Ok(instances);
        }
        Ok(instances
            .into_iter()
            .filter(|instance| !self.suppressed.contains(&instance.type_key()))
            .collect())
    }

    /// Computes the dependency order over the instances' types.
    fn dependency_order<P: TypeKeyed + ?Sized>(
        &self,
        instances: &[Arc<P>],
    ) -> Result<Vec<TypeKey>, FrameworkError> {
        let mut types: Vec<TypeKey> = Vec::with_capacity(instances.len());
        let mut seen: HashSet<TypeKey> = HashSet::with_capacity(instances.len());
        for instance in instances {
            let key = instance.type_key();
            if seen.insert(key.clone()) {
                types.push(key);
            }
        }

        let mut edges: Vec<(TypeKey, TypeKey)> = Vec::new();
        for plugin in &types {
            if let Some(dependency) = self.depends_on(plugin)? {
                edges.push((dependency, plugin.clone()));
            }
        }

        Ok(topological_sort(&types, &edges)?)
    }

    /// Builds or fetches the published metadata index.
    fn metadata_index(&self) -> Result<Arc<HashMap<TypeKey, MetadataTable>>, FrameworkError> {
        let mut guard = self.index.lock();
        if let Some(index) = guard.as_ref() {
            return Ok(Arc::clone(index));
        }
        let pairs = (self.provider)()?;
        let index: Arc<HashMap<TypeKey, MetadataTable>> = Arc::new(pairs.into_iter().collect());
        *guard = Some(Arc::clone(&index));
        tracing::debug!(
            contract = %self.contract,
            plugins = index.len(),
            "built plugin metadata index"
        );
        Ok(index)
    }
}
