//! Identifier-keyed store of shared objects and the constructor registry.
//!
//! The store is the sole owner of every canonical shared object. Reference
//! nodes anywhere in the tree point at the canonical [`NodeId`] held here.
//! Each entry also carries a construct-once memo for the higher-level object
//! a registered factory builds from it.

use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

use crate::arena::NodeId;
use crate::document::Document;

/// Opaque handle to an object built by a registered factory.
pub type Constructed = Rc<dyn Any>;

pub(crate) type Factory = Rc<dyn Fn(&mut Document) -> Constructed>;

/// Memo state for a store entry's constructed object.
#[derive(Clone, Default)]
pub(crate) enum Construction {
    #[default]
    Unset,
    /// A factory for this entry is currently running.
    Constructing,
    Built(Constructed),
}

impl std::fmt::Debug for Construction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Construction::Unset => write!(f, "Unset"),
            Construction::Constructing => write!(f, "Constructing"),
            Construction::Built(_) => write!(f, "Built(..)"),
        }
    }
}

#[derive(Debug)]
pub(crate) struct StoreEntry {
    pub(crate) node: NodeId,
    pub(crate) type_tag: Option<String>,
    /// False for placeholders created by a reference seen before its
    /// definition while decoding.
    pub(crate) defined: bool,
    pub(crate) construction: Construction,
}

impl StoreEntry {
    pub(crate) fn new(node: NodeId, type_tag: Option<String>, defined: bool) -> Self {
        Self {
            node,
            type_tag,
            defined,
            construction: Construction::Unset,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct ObjectStore {
    entries: HashMap<String, StoreEntry>,
}

impl ObjectStore {
    pub(crate) fn get(&self, identifier: &str) -> Option<&StoreEntry> {
        self.entries.get(identifier)
    }

    pub(crate) fn get_mut(&mut self, identifier: &str) -> Option<&mut StoreEntry> {
        self.entries.get_mut(identifier)
    }

    pub(crate) fn insert(&mut self, identifier: String, entry: StoreEntry) {
        self.entries.insert(identifier, entry);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Adopt `type_tag` if the entry has none yet.
    pub(crate) fn fill_type_tag(&mut self, identifier: &str, type_tag: Option<&str>) {
        if let (Some(entry), Some(tag)) = (self.entries.get_mut(identifier), type_tag)
            && entry.type_tag.is_none()
        {
            entry.type_tag = Some(tag.to_owned());
        }
    }

    pub(crate) fn identifiers(&self) -> impl Iterator<Item = (&str, &StoreEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Type-tag keyed factories supplied by the host.
#[derive(Default)]
pub(crate) struct ConstructorRegistry {
    factories: HashMap<String, Factory>,
}

impl ConstructorRegistry {
    pub(crate) fn register(&mut self, type_tag: String, factory: Factory) {
        self.factories.insert(type_tag, factory);
    }

    pub(crate) fn get(&self, type_tag: &str) -> Option<Factory> {
        self.factories.get(type_tag).cloned()
    }

    pub(crate) fn contains(&self, type_tag: &str) -> bool {
        self.factories.contains_key(type_tag)
    }
}

impl std::fmt::Debug for ConstructorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

impl Document {
    /// Register `factory` as the constructor for objects tagged `type_tag`.
    ///
    /// A later registration for the same tag replaces the earlier one;
    /// objects already built keep their memoized instance.
    pub fn register_constructor<T, F>(&mut self, type_tag: impl Into<String>, factory: F)
    where
        T: Any,
        F: Fn(&mut Document) -> T + 'static,
    {
        let type_tag = type_tag.into();
        tracing::debug!(type_tag = %type_tag, "registering constructor");
        self.registry.register(
            type_tag,
            Rc::new(move |doc: &mut Document| Rc::new(factory(doc)) as Constructed),
        );
    }

    /// True if a factory is registered for `type_tag`.
    #[must_use]
    pub fn has_constructor(&self, type_tag: &str) -> bool {
        self.registry.contains(type_tag)
    }

    /// Get the object constructed from the shared object `identifier`,
    /// building it on first request.
    ///
    /// Returns `None` when the identifier is unknown, its type tag has no
    /// registered factory (retried on the next call), the factory for this
    /// identifier is already running, or the built object is not a `T`.
    /// A factory runs at most once per identifier for the document's
    /// lifetime. While it runs, the cursor stands on the shared object; the
    /// caller's cursor is restored afterwards.
    pub fn get_constructed_object<T: Any>(&mut self, identifier: &str) -> Option<Rc<T>> {
        let entry = self.store.get(identifier)?;
        match &entry.construction {
            Construction::Built(obj) => return Rc::clone(obj).downcast::<T>().ok(),
            Construction::Constructing => {
                tracing::debug!(identifier, "re-entrant construction request");
                return None;
            }
            Construction::Unset => {}
        }

        let node = entry.node;
        let Some(type_tag) = entry.type_tag.clone() else {
            tracing::debug!(identifier, "shared object has no type tag");
            return None;
        };
        let Some(factory) = self.registry.get(&type_tag) else {
            tracing::debug!(identifier, type_tag = %type_tag, "no constructor registered");
            return None;
        };

        if let Some(entry) = self.store.get_mut(identifier) {
            entry.construction = Construction::Constructing;
        }
        tracing::debug!(identifier, type_tag = %type_tag, "constructing shared object");

        let saved = self.cursor.clone();
        self.cursor.current = node;
        let built = factory(self);
        self.restore_cursor(saved);

        if let Some(entry) = self.store.get_mut(identifier) {
            entry.construction = Construction::Built(Rc::clone(&built));
        }
        built.downcast::<T>().ok()
    }

    /// True if the store holds a shared object under `identifier`.
    #[must_use]
    pub fn contains_object(&self, identifier: &str) -> bool {
        self.store.get(identifier).is_some()
    }

    /// Type tag of the shared object `identifier`, if any.
    #[must_use]
    pub fn object_type(&self, identifier: &str) -> Option<&str> {
        self.store.get(identifier)?.type_tag.as_deref()
    }

    /// Number of shared objects in the store.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.store.len()
    }

    /// True if the shared object `identifier` has a memoized constructed
    /// object.
    #[must_use]
    pub fn is_constructed(&self, identifier: &str) -> bool {
        self.store
            .get(identifier)
            .is_some_and(|e| matches!(e.construction, Construction::Built(_)))
    }

    /// Warn about references whose shared object was never defined.
    pub(crate) fn report_undefined_objects(&self) {
        for (identifier, entry) in self.store.identifiers() {
            if !entry.defined {
                tracing::warn!(identifier, "reference to shared object never defined");
            }
        }
    }

    /// True if `identifier` has had its content defined.
    pub(crate) fn is_defined(&self, identifier: &str) -> bool {
        self.store.get(identifier).is_some_and(|e| e.defined)
    }

    /// Mark the shared object `identifier` as defined.
    pub(crate) fn mark_defined(&mut self, identifier: &str) {
        if let Some(entry) = self.store.get_mut(identifier) {
            entry.defined = true;
        }
    }

    /// Get or create the store entry for `identifier`, returning the
    /// canonical node and whether it already existed.
    pub(crate) fn intern_object(
        &mut self,
        identifier: &str,
        type_tag: Option<&str>,
        defined: bool,
    ) -> (NodeId, bool) {
        if let Some(entry) = self.store.get(identifier) {
            let node = entry.node;
            self.store.fill_type_tag(identifier, type_tag);
            return (node, true);
        }
        let node = self.alloc_object(None);
        self.store.insert(
            identifier.to_owned(),
            StoreEntry::new(node, type_tag.map(str::to_owned), defined),
        );
        (node, false)
    }
}
