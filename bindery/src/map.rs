//! Named multi-value bindings.
//!
//! A [`MapProvider<T>`] produces a `Map<T>` from entries contributed under string
//! names. Unlike lists there is no ordering; re-putting a name replaces its entry.

use std::collections::{BTreeMap, HashMap};

use crate::as_any::AsAny;
use crate::error::Error;
use crate::injector::Injector;
use crate::key::{Key, KeyId};
use crate::provider::{DecoratingProvider, InstanceProvider, LookupProvider, Provider};
use crate::runtime::{self, Sendable, Shared, Store};
use crate::scope::Scope;

#[cfg(feature = "tracing")]
use tracing::debug;

/// The value produced by map bindings.
pub type Map<T> = HashMap<String, Shared<T>>;

pub struct MapProvider<T: ?Sized + 'static> {
    map: KeyId,
    entries: Store<BTreeMap<String, Shared<dyn Provider<T>>>>,
}

impl<T: ?Sized + Sendable + 'static> MapProvider<T> {
    pub fn new(map: &Key<Map<T>>) -> Self {
        Self {
            map: map.id().clone(),
            entries: Store::new(BTreeMap::new()),
        }
    }

    /// Returns the `MapProvider` bound under `key`, binding an empty one first if the
    /// key is unbound.
    pub fn get_or_create(
        injector: &Injector,
        key: &Key<Map<T>>,
    ) -> Result<Shared<dyn Provider<Map<T>>>, Error> {
        let original = injector.original_or_insert_with(key, || MapProvider::new(key))?;
        Self::downcast(&original, key.id())?;
        Ok(original)
    }

    fn downcast<'p>(
        original: &'p Shared<dyn Provider<Map<T>>>,
        key: &KeyId,
    ) -> Result<&'p Self, Error> {
        let provider: &dyn Provider<Map<T>> = &**original;
        AsAny::as_any(provider)
            .downcast_ref::<Self>()
            .ok_or_else(|| Error::type_mismatch(key, "MapProvider"))
    }

    pub fn put(&self, name: impl Into<String>, provider: Shared<dyn Provider<T>>) {
        let name = name.into();

        #[cfg(feature = "tracing")]
        debug!("Putting entry {:?} into {}", name, self.map);

        runtime::write(&self.entries).insert(name, provider);
    }

    /// Key of the map binding this provider serves.
    pub fn key(&self) -> &KeyId {
        &self.map
    }

    pub fn len(&self) -> usize {
        runtime::read(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        runtime::read(&self.entries).contains_key(name)
    }
}

impl<T: ?Sized + Sendable + 'static> Provider<Map<T>> for MapProvider<T> {
    fn get(&self, injector: &Injector) -> Result<Shared<Map<T>>, Error> {
        let entries: Vec<(String, Shared<dyn Provider<T>>)> = runtime::read(&self.entries)
            .iter()
            .map(|(name, provider)| (name.clone(), provider.clone()))
            .collect();

        let map = entries
            .into_iter()
            .map(|(name, provider)| provider.get(injector).map(|value| (name, value)))
            .collect::<Result<Map<T>, Error>>()?;

        Ok(Shared::new(map))
    }
}

/// Handle for contributing named entries to the map bound under one key.
pub struct MapBuilder<'a, T: ?Sized + 'static> {
    injector: &'a Injector,
    key: Key<Map<T>>,
}

impl<'a, T: ?Sized + Sendable + 'static> MapBuilder<'a, T> {
    pub(crate) fn new(injector: &'a Injector, key: Key<Map<T>>) -> Result<Self, Error> {
        MapProvider::get_or_create(injector, &key)?;
        Ok(Self { injector, key })
    }

    pub fn key(&self) -> &Key<Map<T>> {
        &self.key
    }

    /// Puts an entry that resolves `key` at production time.
    pub fn put(&self, name: impl Into<String>, key: &Key<T>) -> Result<&Self, Error> {
        self.insert(name.into(), Shared::new(LookupProvider::new(key.clone())))
    }

    pub fn put_value(&self, name: impl Into<String>, value: T) -> Result<&Self, Error>
    where
        T: Sized,
    {
        self.put_shared(name, Shared::new(value))
    }

    pub fn put_shared(&self, name: impl Into<String>, value: Shared<T>) -> Result<&Self, Error> {
        let instance: Shared<dyn Provider<T>> = Shared::new(InstanceProvider::new(value));
        self.insert(
            name.into(),
            Shared::new(DecoratingProvider::new(instance).with_member_injection()),
        )
    }

    pub fn put_all<I, N>(&self, values: I) -> Result<&Self, Error>
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Sized,
    {
        for (name, value) in values {
            self.put_value(name, value)?;
        }
        Ok(self)
    }

    /// Changes the scope of the map binding as a whole.
    pub fn in_scope(&self, scope: Scope) -> Result<&Self, Error> {
        self.injector.change_scope(&self.key, scope)?;
        Ok(self)
    }

    fn insert(&self, name: String, provider: Shared<dyn Provider<T>>) -> Result<&Self, Error> {
        let original = MapProvider::get_or_create(self.injector, &self.key)?;
        MapProvider::downcast(&original, self.key.id())?.put(name, provider);
        Ok(self)
    }
}
