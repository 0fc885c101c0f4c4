//! Builder façade over a list binding.
//!
//! A [`ListBuilder`] is a thin, stateless handle: every call looks up (or creates) the
//! [`ListProvider`] bound under the builder's key and mutates its entry table. Each
//! `add*` call returns an [`Added`] handle naming exactly the entries it added, and
//! ordering constraints are applied through that handle or through the explicit
//! [`ListBuilder::after`] / [`ListBuilder::before`] methods. There is no implicit
//! "last added" cursor.
//!
//! # Examples
//!
//! ```
//! use bindery::{Injector, Key, List};
//!
//! let injector = Injector::new();
//! let a = Key::<String>::named("a");
//! let b = Key::<String>::named("b");
//! injector.bind_instance(&a, String::from("a"));
//! injector.bind_instance(&b, String::from("b"));
//!
//! let pipeline = Key::<List<String>>::named("pipeline");
//! let builder = injector.list_builder(&pipeline).unwrap();
//! builder.add(&b).unwrap().after(&a).unwrap();
//! builder.add(&a).unwrap();
//!
//! let values: Vec<String> = injector
//!     .resolve(&pipeline)
//!     .unwrap()
//!     .iter()
//!     .map(|value| value.to_string())
//!     .collect();
//! assert_eq!(values, ["a", "b"]);
//! ```

use crate::error::Error;
use crate::injector::Injector;
use crate::key::{Key, KeyId};
use crate::list::{List, ListProvider};
use crate::provider::{DecoratingProvider, InstanceProvider, LookupProvider, Provider};
use crate::runtime::{Sendable, Shared};
use crate::scope::Scope;

/// Handle for contributing entries to the list bound under one key.
pub struct ListBuilder<'a, T: ?Sized + 'static> {
    injector: &'a Injector,
    key: Key<List<T>>,
}

impl<T: ?Sized + 'static> Clone for ListBuilder<'_, T> {
    fn clone(&self) -> Self {
        Self {
            injector: self.injector,
            key: self.key.clone(),
        }
    }
}

#[cfg(feature = "debug")]
impl<T: ?Sized + 'static> std::fmt::Debug for ListBuilder<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListBuilder").field("key", &self.key).finish()
    }
}

impl<'a, T: ?Sized + Sendable + 'static> ListBuilder<'a, T> {
    pub(crate) fn new(injector: &'a Injector, key: Key<List<T>>) -> Result<Self, Error> {
        ListProvider::get_or_create(injector, &key)?;
        Ok(Self { injector, key })
    }

    pub fn key(&self) -> &Key<List<T>> {
        &self.key
    }

    /// Adds an entry that resolves `key` through the injector at production time.
    /// The entry is identified by `key`.
    pub fn add(&self, key: &Key<T>) -> Result<Added<'a, T>, Error> {
        self.insert(key.id().clone(), Shared::new(LookupProvider::new(key.clone())))
    }

    /// Adds a pre-built value under an anonymous entry key unique to this value.
    ///
    /// The value goes through member injection each time the list is produced.
    pub fn add_value(&self, value: T) -> Result<Added<'a, T>, Error>
    where
        T: Sized,
    {
        self.add_shared(Shared::new(value))
    }

    pub fn add_shared(&self, value: Shared<T>) -> Result<Added<'a, T>, Error> {
        self.insert(anonymous_key(&value), completing(value))
    }

    /// Adds a pre-built value under an explicit entry key. Re-adding the same key
    /// replaces the value in place.
    pub fn add_keyed(&self, key: &Key<T>, value: Shared<T>) -> Result<Added<'a, T>, Error> {
        self.insert(key.id().clone(), completing(value))
    }

    /// Adds every value in order, each under its own anonymous entry key. A
    /// constraint applied to the returned handle applies to all of them.
    pub fn add_all<I>(&self, values: I) -> Result<Added<'a, T>, Error>
    where
        I: IntoIterator<Item = T>,
        T: Sized,
    {
        let entries: Vec<KeyId> = self.with_list(|list| {
            values
                .into_iter()
                .map(|value| {
                    let value = Shared::new(value);
                    let key = anonymous_key(&value);
                    list.add(key.clone(), completing(value));
                    key
                })
                .collect()
        })?;

        Ok(Added {
            builder: self.clone(),
            entries,
        })
    }

    /// Requires `entry` to be produced after `other`.
    pub fn after(&self, entry: impl AsRef<KeyId>, other: impl AsRef<KeyId>) -> Result<(), Error> {
        self.with_list(|list| list.after(entry.as_ref(), other.as_ref().clone()))?
    }

    /// Requires `entry` to be produced before `other`.
    pub fn before(&self, entry: impl AsRef<KeyId>, other: impl AsRef<KeyId>) -> Result<(), Error> {
        self.with_list(|list| list.before(entry.as_ref(), other.as_ref().clone()))?
    }

    /// Changes the scope of the list binding as a whole. With
    /// [`Scope::Singleton`] the first production is cached, so entries added
    /// afterwards are not seen until the scope is reset.
    pub fn in_scope(&self, scope: Scope) -> Result<(), Error> {
        self.injector.change_scope(&self.key, scope)
    }

    /// Entry keys in their current production order.
    pub fn ordered_keys(&self) -> Result<Vec<KeyId>, Error> {
        self.with_list(ListProvider::ordered_keys)?
    }

    fn insert(&self, entry: KeyId, provider: Shared<dyn Provider<T>>) -> Result<Added<'a, T>, Error> {
        self.with_list(|list| list.add(entry.clone(), provider))?;

        Ok(Added {
            builder: self.clone(),
            entries: vec![entry],
        })
    }

    // Looks the list up on every call, so a builder stays valid across rebinding of
    // unrelated keys and re-creates the list if it was never bound.
    fn with_list<R>(&self, f: impl FnOnce(&ListProvider<T>) -> R) -> Result<R, Error> {
        let original = ListProvider::get_or_create(self.injector, &self.key)?;
        let list = ListProvider::downcast(&original, self.key.id())?;
        Ok(f(list))
    }
}

/// The entries added by one `add*` call.
///
/// Constraints applied here affect exactly these entries.
pub struct Added<'a, T: ?Sized + 'static> {
    builder: ListBuilder<'a, T>,
    entries: Vec<KeyId>,
}

impl<'a, T: ?Sized + Sendable + 'static> Added<'a, T> {
    pub fn entries(&self) -> &[KeyId] {
        &self.entries
    }

    /// Requires each added entry to come after `other`.
    pub fn after(self, other: impl AsRef<KeyId>) -> Result<Self, Error> {
        for entry in &self.entries {
            self.builder.after(entry, other.as_ref())?;
        }
        Ok(self)
    }

    /// Requires each added entry to come before `other`.
    pub fn before(self, other: impl AsRef<KeyId>) -> Result<Self, Error> {
        for entry in &self.entries {
            self.builder.before(entry, other.as_ref())?;
        }
        Ok(self)
    }

    /// Shorthand for `after(Key::<U>::new())`.
    pub fn after_type<U: ?Sized + 'static>(self) -> Result<Self, Error> {
        self.after(Key::<U>::new())
    }

    /// Shorthand for `before(Key::<U>::new())`.
    pub fn before_type<U: ?Sized + 'static>(self) -> Result<Self, Error> {
        self.before(Key::<U>::new())
    }

    /// Back to the builder, for chaining further additions.
    pub fn builder(&self) -> &ListBuilder<'a, T> {
        &self.builder
    }
}

fn anonymous_key<T: ?Sized + 'static>(value: &Shared<T>) -> KeyId {
    Key::<T>::named(format!("instance@{:p}", Shared::as_ptr(value) as *const ())).into()
}

fn completing<T: ?Sized + Sendable + 'static>(value: Shared<T>) -> Shared<dyn Provider<T>> {
    let instance: Shared<dyn Provider<T>> = Shared::new(InstanceProvider::new(value));
    Shared::new(DecoratingProvider::new(instance).with_member_injection())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::resolve_guard::ResolveGuard;
    use crate::runtime::OnceSlot;

    fn strings(injector: &Injector, key: &Key<List<String>>) -> Vec<String> {
        injector
            .resolve(key)
            .unwrap()
            .iter()
            .map(|value| value.to_string())
            .collect()
    }

    fn bind_letters(injector: &Injector) -> (Key<String>, Key<String>, Key<String>) {
        let a = Key::<String>::named("A");
        let b = Key::<String>::named("B");
        let c = Key::<String>::named("C");
        injector.bind_instance(&a, String::from("a"));
        injector.bind_instance(&b, String::from("b"));
        injector.bind_instance(&c, String::from("c"));
        (a, b, c)
    }

    #[test]
    fn add_after_before_end_to_end() {
        let injector = Injector::new();
        let (a, b, c) = bind_letters(&injector);
        let list = Key::<List<String>>::new();

        let builder = injector.list_builder(&list).unwrap();
        builder.add(&a).unwrap();
        builder.add(&b).unwrap().after(&a).unwrap();
        builder.add(&c).unwrap().before(&a).unwrap();

        assert_eq!(strings(&injector, &list), ["c", "a", "b"]);
    }

    #[test]
    fn explicit_constraints_match_handle_constraints() {
        let injector = Injector::new();
        let (a, b, c) = bind_letters(&injector);
        let list = Key::<List<String>>::new();

        let builder = injector.list_builder(&list).unwrap();
        builder.add(&a).unwrap();
        builder.add(&b).unwrap();
        builder.add(&c).unwrap();
        builder.after(&b, &a).unwrap();
        builder.before(&c, &a).unwrap();

        assert_eq!(strings(&injector, &list), ["c", "a", "b"]);
        assert_eq!(
            builder.ordered_keys().unwrap(),
            vec![c.id().clone(), a.id().clone(), b.id().clone()]
        );
    }

    #[test]
    fn unpopulated_list_is_empty() {
        let injector = Injector::new();
        let list = Key::<List<String>>::new();
        injector.list_builder(&list).unwrap();

        assert!(injector.resolve(&list).unwrap().is_empty());
    }

    #[test]
    fn builders_for_same_key_share_entries() {
        let injector = Injector::new();
        let (a, b, _) = bind_letters(&injector);
        let list = Key::<List<String>>::new();

        injector.list_builder(&list).unwrap().add(&a).unwrap();
        injector.list_builder(&list).unwrap().add(&b).unwrap().before(&a).unwrap();

        assert_eq!(strings(&injector, &list), ["b", "a"]);
    }

    #[test]
    fn entries_resolve_bindings_at_production_time() {
        let injector = Injector::new();
        let a = Key::<String>::named("A");
        let list = Key::<List<String>>::new();

        injector.list_builder(&list).unwrap().add(&a).unwrap();
        assert_eq!(
            injector.resolve(&list).unwrap_err().kind,
            ErrorKind::UnboundKey
        );

        injector.bind_instance(&a, String::from("late"));
        assert_eq!(strings(&injector, &list), ["late"]);
    }

    #[test]
    fn values_get_distinct_entries() {
        let injector = Injector::new();
        let list = Key::<List<String>>::new();
        let builder = injector.list_builder(&list).unwrap();

        let first = builder.add_value(String::from("x")).unwrap();
        let second = builder.add_value(String::from("x")).unwrap();

        assert_ne!(first.entries(), second.entries());
        assert_eq!(strings(&injector, &list), ["x", "x"]);
    }

    #[test]
    fn keyed_value_replaces_in_place() {
        let injector = Injector::new();
        let (a, b, _) = bind_letters(&injector);
        let list = Key::<List<String>>::new();
        let builder = injector.list_builder(&list).unwrap();

        builder.add(&a).unwrap();
        builder.add(&b).unwrap();
        builder.add_keyed(&a, Shared::new(String::from("A!"))).unwrap();

        assert_eq!(strings(&injector, &list), ["A!", "b"]);
    }

    #[test]
    fn add_all_constrains_every_added_entry() {
        let injector = Injector::new();
        let (a, _, _) = bind_letters(&injector);
        let list = Key::<List<String>>::new();
        let builder = injector.list_builder(&list).unwrap();

        builder.add(&a).unwrap();
        let added = builder
            .add_all(vec![String::from("x"), String::from("y")])
            .unwrap()
            .before(&a)
            .unwrap();

        assert_eq!(added.entries().len(), 2);
        assert_eq!(strings(&injector, &list), ["x", "y", "a"]);
    }

    #[test]
    fn constraint_cycle_fails_production() {
        let injector = Injector::new();
        let (a, b, _) = bind_letters(&injector);
        let list = Key::<List<String>>::new();
        let builder = injector.list_builder(&list).unwrap();

        builder.add(&a).unwrap().after(&b).unwrap();
        builder.add(&b).unwrap().after(&a).unwrap();

        assert_eq!(
            injector.resolve(&list).unwrap_err().kind,
            ErrorKind::OrderingCycle
        );
    }

    #[test]
    fn ordering_cycle_leaves_other_keys_resolvable() {
        let injector = Injector::new();
        let (a, b, c) = bind_letters(&injector);
        let cyclic = Key::<List<String>>::named("cyclic");
        let ordered = Key::<List<String>>::named("ordered");

        let builder = injector.list_builder(&cyclic).unwrap();
        builder.add(&a).unwrap().after(&b).unwrap();
        builder.add(&b).unwrap().after(&a).unwrap();
        builder.in_scope(Scope::Singleton).unwrap();

        let builder = injector.list_builder(&ordered).unwrap();
        builder.add(&b).unwrap();
        builder.add(&c).unwrap().before(&b).unwrap();
        builder.add(&a).unwrap().after(&c).unwrap();

        let err = injector.resolve(&cyclic).unwrap_err();
        assert_eq!(err.kind, ErrorKind::OrderingCycle);
        assert_eq!(ResolveGuard::depth(), 0);

        assert_eq!(*injector.resolve(&c).unwrap(), "c");
        assert_eq!(strings(&injector, &ordered), ["c", "b", "a"]);
        assert_eq!(
            injector.resolve(&cyclic).unwrap_err().kind,
            ErrorKind::OrderingCycle
        );
    }

    #[test]
    fn constraint_on_unknown_target_is_ignored() {
        let injector = Injector::new();
        let (a, _, _) = bind_letters(&injector);
        let list = Key::<List<String>>::new();
        let builder = injector.list_builder(&list).unwrap();

        builder
            .add(&a)
            .unwrap()
            .after_type::<u64>()
            .unwrap()
            .before(Key::<String>::named("nowhere"))
            .unwrap();

        assert_eq!(strings(&injector, &list), ["a"]);
    }

    #[test]
    fn constraining_unknown_entry_fails() {
        let injector = Injector::new();
        let list = Key::<List<String>>::new();
        let builder = injector.list_builder(&list).unwrap();

        let err = builder
            .after(Key::<String>::named("missing"), Key::<String>::named("x"))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::BindingNotFound);
    }

    #[test]
    fn in_scope_singleton_caches_list() {
        let injector = Injector::new();
        let (a, b, _) = bind_letters(&injector);
        let list = Key::<List<String>>::new();
        let builder = injector.list_builder(&list).unwrap();

        builder.add(&a).unwrap();
        builder.in_scope(Scope::Singleton).unwrap();

        let first = injector.resolve(&list).unwrap();
        builder.add(&b).unwrap();
        let second = injector.resolve(&list).unwrap();

        assert!(Shared::ptr_eq(&first, &second));
        assert_eq!(second.len(), 1);

        builder.in_scope(Scope::NoScope).unwrap();
        assert_eq!(strings(&injector, &list), ["a", "b"]);
    }

    #[test]
    fn builder_on_foreign_binding_fails() {
        let injector = Injector::new();
        let list = Key::<List<String>>::new();
        injector.bind_instance(&list, Vec::new());

        let kind = injector.list_builder(&list).err().map(|err| err.kind);
        assert_eq!(kind, Some(ErrorKind::TypeMismatch));
    }

    struct Listener {
        channel: OnceSlot<Shared<String>>,
    }

    #[test]
    fn added_values_receive_member_injection() {
        let injector = Injector::new();
        let channel = Key::<String>::named("channel");
        injector.bind_instance(&channel, String::from("#ops"));
        injector.on_inject(move |listener: &Listener, injector: &Injector| {
            let _ = listener.channel.set(injector.resolve(&channel)?);
            Ok(())
        });

        let list = Key::<List<Listener>>::new();
        injector
            .list_builder(&list)
            .unwrap()
            .add_value(Listener {
                channel: OnceSlot::new(),
            })
            .unwrap();

        let listeners = injector.resolve(&list).unwrap();
        assert_eq!(
            listeners[0].channel.get().map(|c| c.as_str()),
            Some("#ops")
        );
    }
}
