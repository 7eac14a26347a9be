//! Base-side input factories: resolve which stored component version a
//! comparison should read, and build the input for it.

use anyhow::{Context, Result};
use std::collections::HashMap;

use super::input::LazyInput;
use crate::component::Component;
use crate::store::SourceStore;

/// Injective key → uuid index of one branch's components.
///
/// Built once per computation task, immutable afterwards, and shared
/// read-only by every component's factory call across the parallel pass
/// (O(1) per lookup after the one-time build).
#[derive(Debug, Clone, Default)]
pub struct ComponentIndex {
    by_key: HashMap<String, String>,
}

impl ComponentIndex {
    /// Load the index for `branch_uuid` from the store.
    pub fn build(store: &dyn SourceStore, branch_uuid: &str) -> Result<Self> {
        let pairs = store
            .components_of_branch(branch_uuid)
            .with_context(|| format!("Failed to index components of branch {branch_uuid}"))?;
        let mut by_key = HashMap::with_capacity(pairs.len());
        for (key, uuid) in pairs {
            by_key.insert(key, uuid);
        }
        Ok(Self { by_key })
    }

    pub fn uuid_of(&self, key: &str) -> Option<&str> {
        self.by_key.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// Builds the base side of a comparison for one component. Never fails on
/// absence: a component with no counterpart yields an input that behaves as
/// empty.
pub trait InputFactory: Sync {
    fn create(&self, component: &Component) -> LazyInput<'_>;
}

/// Base side = the same-key component on the merge-source branch, resolved
/// through a prebuilt [`ComponentIndex`].
///
/// No file-move detection: a file renamed or moved between the branches has
/// no counterpart here, so all of its base-side issues surface as unmatched.
pub struct MergeBranchInputFactory<'a> {
    store: &'a dyn SourceStore,
    index: &'a ComponentIndex,
}

impl<'a> MergeBranchInputFactory<'a> {
    pub fn new(store: &'a dyn SourceStore, index: &'a ComponentIndex) -> Self {
        Self { store, index }
    }
}

impl InputFactory for MergeBranchInputFactory<'_> {
    fn create(&self, component: &Component) -> LazyInput<'_> {
        let target = self.index.uuid_of(&component.key).map(str::to_string);
        LazyInput::new(component.kind, target, self.store)
    }
}

/// Base side = the previous analysis of the same branch: the component's own
/// uuid is the target identity. A first-ever analysis simply finds no stored
/// rows and resolves to empty.
pub struct BaseInputFactory<'a> {
    store: &'a dyn SourceStore,
}

impl<'a> BaseInputFactory<'a> {
    pub fn new(store: &'a dyn SourceStore) -> Self {
        Self { store }
    }
}

impl InputFactory for BaseInputFactory<'_> {
    fn create(&self, component: &Component) -> LazyInput<'_> {
        LazyInput::new(component.kind, Some(component.uuid.clone()), self.store)
    }
}
