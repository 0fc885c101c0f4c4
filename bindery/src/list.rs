//! Ordered multi-value provider.
//!
//! A [`ListProvider<T>`] assembles a `List<T>` from independently contributed entries.
//! Each entry is identified by a key and may be constrained to appear before or after
//! other entries. The order is computed on every production with a stable topological
//! sort, so entries without constraints keep their insertion order.
//!
//! Entry tables are meant to be filled during the single-threaded wiring phase
//! (usually through a [`ListBuilder`](crate::list_builder::ListBuilder)). The table is
//! lock-guarded, so late mutation cannot corrupt it, but a production racing with
//! mutation sees whichever snapshot it locked first.

use std::collections::{HashMap, HashSet};

use crate::as_any::AsAny;
use crate::error::Error;
use crate::injector::Injector;
use crate::key::{Key, KeyId};
use crate::ordering;
use crate::provider::Provider;
use crate::runtime::{self, Sendable, Shared, Store};

#[cfg(feature = "tracing")]
use tracing::debug;

/// The value produced by list bindings.
pub type List<T> = Vec<Shared<T>>;

struct Entry<T: ?Sized + 'static> {
    key: KeyId,
    provider: Shared<dyn Provider<T>>,
    after: HashSet<KeyId>,
    before: HashSet<KeyId>,
}

struct EntryTable<T: ?Sized + 'static> {
    entries: Vec<Entry<T>>,
    index: HashMap<KeyId, usize>,
}

impl<T: ?Sized + 'static> EntryTable<T> {
    fn entry_mut(&mut self, key: &KeyId) -> Option<&mut Entry<T>> {
        let position = *self.index.get(key)?;
        self.entries.get_mut(position)
    }

    // before(A, B) and after(B, A) both become the edge A -> B. Targets that are not
    // entries contribute nothing.
    fn edges(&self) -> Vec<(usize, usize)> {
        let mut edges = Vec::new();

        for (position, entry) in self.entries.iter().enumerate() {
            for other in &entry.after {
                if let Some(&from) = self.index.get(other) {
                    edges.push((from, position));
                }
            }
            for other in &entry.before {
                if let Some(&to) = self.index.get(other) {
                    edges.push((position, to));
                }
            }
        }

        edges
    }
}

pub struct ListProvider<T: ?Sized + 'static> {
    list: KeyId,
    table: Store<EntryTable<T>>,
}

impl<T: ?Sized + Sendable + 'static> ListProvider<T> {
    /// Creates an empty provider for the list bound under `list`.
    pub fn new(list: &Key<List<T>>) -> Self {
        Self {
            list: list.id().clone(),
            table: Store::new(EntryTable {
                entries: Vec::new(),
                index: HashMap::new(),
            }),
        }
    }

    /// Returns the `ListProvider` bound under `key`, binding an empty one with
    /// [`Scope::NoScope`](crate::scope::Scope::NoScope) first if `key` is unbound.
    ///
    /// Fails with `TypeMismatch` if `key` is bound to some other kind of provider.
    pub fn get_or_create(
        injector: &Injector,
        key: &Key<List<T>>,
    ) -> Result<Shared<dyn Provider<List<T>>>, Error> {
        let original = injector.original_or_insert_with(key, || ListProvider::new(key))?;
        Self::downcast(&original, key.id())?;
        Ok(original)
    }

    pub(crate) fn downcast<'p>(
        original: &'p Shared<dyn Provider<List<T>>>,
        key: &KeyId,
    ) -> Result<&'p Self, Error> {
        let provider: &dyn Provider<List<T>> = &**original;
        AsAny::as_any(provider)
            .downcast_ref::<Self>()
            .ok_or_else(|| Error::type_mismatch(key, "ListProvider"))
    }

    /// Adds an entry, or replaces the provider of an existing entry in place.
    pub fn add(&self, key: KeyId, provider: Shared<dyn Provider<T>>) {
        let mut table = runtime::write(&self.table);

        if let Some(entry) = table.entry_mut(&key) {
            #[cfg(feature = "tracing")]
            debug!("Replacing entry {} of {}", key, self.list);

            entry.provider = provider;
            return;
        }

        #[cfg(feature = "tracing")]
        debug!("Adding entry {} to {}", key, self.list);

        let position = table.entries.len();
        table.index.insert(key.clone(), position);
        table.entries.push(Entry {
            key,
            provider,
            after: HashSet::new(),
            before: HashSet::new(),
        });
    }

    /// Requires `entry` to be placed after `other`.
    pub fn after(&self, entry: &KeyId, other: KeyId) -> Result<(), Error> {
        let mut table = runtime::write(&self.table);
        let target = table
            .entry_mut(entry)
            .ok_or_else(|| Error::entry_not_found(&self.list, entry))?;

        target.after.insert(other);
        Ok(())
    }

    /// Requires `entry` to be placed before `other`.
    pub fn before(&self, entry: &KeyId, other: KeyId) -> Result<(), Error> {
        let mut table = runtime::write(&self.table);
        let target = table
            .entry_mut(entry)
            .ok_or_else(|| Error::entry_not_found(&self.list, entry))?;

        target.before.insert(other);
        Ok(())
    }

    pub fn len(&self) -> usize {
        runtime::read(&self.table).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, entry: &KeyId) -> bool {
        runtime::read(&self.table).index.contains_key(entry)
    }

    /// Entry keys in the order they would be produced right now.
    pub fn ordered_keys(&self) -> Result<Vec<KeyId>, Error> {
        Ok(self.ordered()?.into_iter().map(|(key, _)| key).collect())
    }

    // Snapshot taken under the lock; providers run after it is released.
    fn ordered(&self) -> Result<Vec<(KeyId, Shared<dyn Provider<T>>)>, Error> {
        let table = runtime::read(&self.table);

        match ordering::stable_order(table.entries.len(), &table.edges()) {
            Ok(order) => Ok(order
                .into_iter()
                .map(|position| {
                    let entry = &table.entries[position];
                    (entry.key.clone(), entry.provider.clone())
                })
                .collect()),
            Err(cycle) => {
                let keys: Vec<KeyId> = cycle
                    .into_iter()
                    .map(|position| table.entries[position].key.clone())
                    .collect();
                Err(Error::ordering_cycle(&self.list, &keys))
            }
        }
    }
}

impl<T: ?Sized + Sendable + 'static> Provider<List<T>> for ListProvider<T> {
    fn get(&self, injector: &Injector) -> Result<Shared<List<T>>, Error> {
        let ordered = self.ordered()?;

        #[cfg(feature = "tracing")]
        debug!("Producing {} with {} entries", self.list, ordered.len());

        let values = ordered
            .into_iter()
            .map(|(_, provider)| provider.get(injector))
            .collect::<Result<List<T>, Error>>()?;

        Ok(Shared::new(values))
    }
}
