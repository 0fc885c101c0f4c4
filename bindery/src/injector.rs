use std::any::TypeId;
use std::collections::{HashMap, HashSet};

use crate::as_any::AsAny;
use crate::binding::{AnyBinding, Binding};
use crate::error::Error;
use crate::key::{Key, KeyId};
use crate::list::List;
use crate::list_builder::ListBuilder;
use crate::map::{Map, MapBuilder};
use crate::provider::{DecoratingProvider, FactoryProvider, InstanceProvider, Provider};
use crate::resolve_guard::{InitWaits, ResolveGuard};
use crate::runtime::{self, AnyValue, Sendable, Shared, Store};
use crate::scope::Scope;

#[cfg(feature = "tracing")]
use tracing::{debug, info, trace};

/// Completes an already constructed value, typically by filling late-bound
/// dependencies held in [`OnceSlot`](crate::runtime::OnceSlot) fields.
trait MemberHook<T: ?Sized>: Sendable {
    fn inject(&self, target: &T, injector: &Injector) -> Result<(), Error>;
}

impl<T: ?Sized, F> MemberHook<T> for F
where
    F: Fn(&T, &Injector) -> Result<(), Error> + Sendable,
{
    fn inject(&self, target: &T, injector: &Injector) -> Result<(), Error> {
        self(target, injector)
    }
}

type MemberHooks<T> = Vec<Shared<dyn MemberHook<T>>>;

/// Registry of bindings and the entry point for resolution.
///
/// All mutation goes through `&self` methods; the binding table is the only shared
/// mutable state and every write is serialized through its lock. The lock is never
/// held while a provider runs, so providers may freely resolve other keys.
pub struct Injector {
    bindings: Store<HashMap<KeyId, Box<dyn AnyBinding>>>,
    members: Store<HashMap<TypeId, Box<AnyValue>>>,
    pub(crate) installed: Store<HashSet<TypeId>>,
    pub(crate) init_waits: Store<InitWaits>,
}

#[cfg(feature = "debug")]
impl std::fmt::Debug for Injector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bindings = runtime::read(&self.bindings);
        let mut keys: Vec<(&KeyId, Scope)> = bindings
            .values()
            .map(|binding| (binding.key_id(), binding.scope()))
            .collect();
        keys.sort_by(|a, b| a.0.cmp(b.0));

        f.debug_struct("Injector")
            .field("bindings", &keys)
            .field("member_hooks", &runtime::read(&self.members).len())
            .finish()
    }
}

impl Default for Injector {
    fn default() -> Self {
        Self::new()
    }
}

impl Injector {
    pub fn new() -> Self {
        Self {
            bindings: Store::new(HashMap::new()),
            members: Store::new(HashMap::new()),
            installed: Store::new(HashSet::new()),
            init_waits: Store::new(InitWaits::default()),
        }
    }

    /// Binds `key` to `provider`, replacing any previous binding for the key.
    pub fn bind<T, P>(&self, key: &Key<T>, provider: P, scope: Scope)
    where
        T: ?Sized + Sendable + 'static,
        P: Provider<T> + 'static,
    {
        self.bind_provider(key, Shared::new(provider), scope);
    }

    pub fn bind_provider<T>(&self, key: &Key<T>, provider: Shared<dyn Provider<T>>, scope: Scope)
    where
        T: ?Sized + Sendable + 'static,
    {
        let binding = Binding::new(key.clone(), provider, scope);
        let previous = runtime::write(&self.bindings).insert(key.id().clone(), Box::new(binding));

        #[cfg(feature = "tracing")]
        {
            if previous.is_some() {
                debug!("Rebound {} ({} scope)", key, scope);
            } else {
                debug!("Bound {} ({} scope)", key, scope);
            }
        }

        drop(previous);
    }

    /// Binds `key` to a pre-built value.
    pub fn bind_instance<T>(&self, key: &Key<T>, value: T)
    where
        T: Sendable + 'static,
    {
        self.bind_shared(key, Shared::new(value));
    }

    pub fn bind_shared<T>(&self, key: &Key<T>, value: Shared<T>)
    where
        T: ?Sized + Sendable + 'static,
    {
        self.bind(key, InstanceProvider::new(value), Scope::NoScope);
    }

    /// Binds `key` to a factory. Each produced value passes through member injection
    /// before it is handed out (or cached, for singletons).
    pub fn bind_factory<T, F>(&self, key: &Key<T>, scope: Scope, factory: F)
    where
        T: Sendable + 'static,
        F: Fn(&Injector) -> Result<T, Error> + Sendable + 'static,
    {
        let construct: Shared<dyn Provider<T>> =
            Shared::new(FactoryProvider::new(move |injector: &Injector| {
                factory(injector).map(Shared::new)
            }));

        self.bind(
            key,
            DecoratingProvider::new(construct).with_member_injection(),
            scope,
        );
    }

    /// Returns a snapshot of the binding for `key`.
    pub fn binding<T>(&self, key: &Key<T>) -> Option<Binding<T>>
    where
        T: ?Sized + Sendable + 'static,
    {
        // The table is keyed by the binding's own type, so a stored entry always
        // downcasts; an error here cannot occur.
        self.with_binding(key, Binding::clone).ok().flatten()
    }

    pub fn contains(&self, key: impl AsRef<KeyId>) -> bool {
        runtime::read(&self.bindings).contains_key(key.as_ref())
    }

    pub fn scope_of(&self, key: impl AsRef<KeyId>) -> Option<Scope> {
        runtime::read(&self.bindings)
            .get(key.as_ref())
            .map(|binding| binding.scope())
    }

    pub fn len(&self) -> usize {
        runtime::read(&self.bindings).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replaces the scope of an existing binding, keeping its provider chain.
    ///
    /// Any value cached under the old scope is dropped, after the binding table is
    /// unlocked.
    pub fn change_scope(&self, key: impl AsRef<KeyId>, scope: Scope) -> Result<(), Error> {
        let key = key.as_ref();
        let mut bindings = runtime::write(&self.bindings);
        let binding = bindings
            .get_mut(key)
            .ok_or_else(|| Error::binding_not_found(key))?;

        #[cfg(feature = "tracing")]
        debug!("Changing scope of {} from {} to {}", key, binding.scope(), scope);

        let replaced = binding.change_scope(scope);
        drop(bindings);
        drop(replaced);
        Ok(())
    }

    /// Appends a decoration stage to the binding for `key`. The binding's scope is
    /// re-applied around the extended chain.
    pub fn decorate<T, F>(&self, key: &Key<T>, stage: F) -> Result<(), Error>
    where
        T: ?Sized + Sendable + 'static,
        F: Fn(Shared<T>, &Injector) -> Result<Shared<T>, Error> + Sendable + 'static,
    {
        let mut bindings = runtime::write(&self.bindings);
        let stored = bindings
            .get_mut(key.id())
            .ok_or_else(|| Error::binding_not_found(key.id()))?;
        let binding = AsAny::as_any_mut(&mut **stored)
            .downcast_mut::<Binding<T>>()
            .ok_or_else(|| Error::type_mismatch(key.id(), std::any::type_name::<Binding<T>>()))?;

        #[cfg(feature = "tracing")]
        debug!("Decorating {}", key);

        let replaced = binding.decorate(Box::new(stage));
        drop(bindings);
        drop(replaced);
        Ok(())
    }

    /// The scoped provider bound under `key`, for callers that want to defer
    /// resolution.
    pub fn provider<T>(&self, key: &Key<T>) -> Result<Shared<dyn Provider<T>>, Error>
    where
        T: ?Sized + Sendable + 'static,
    {
        self.with_binding(key, |binding| binding.provider().clone())?
            .ok_or_else(|| Error::unbound_key(key.id()))
    }

    /// Produces the value bound under `key`.
    pub fn resolve<T>(&self, key: &Key<T>) -> Result<Shared<T>, Error>
    where
        T: ?Sized + Sendable + 'static,
    {
        let _guard = ResolveGuard::push(key.id())?;

        #[cfg(feature = "tracing")]
        trace!("Resolving {}", key);

        let provider = self.provider(key)?;
        provider.get(self)
    }

    /// Resolves the unqualified binding of `T`.
    pub fn instance<T>(&self) -> Result<Shared<T>, Error>
    where
        T: ?Sized + Sendable + 'static,
    {
        self.resolve(&Key::<T>::new())
    }

    /// Registers a member injection hook for `T`. Hooks run, in registration order,
    /// for every value produced by [`bind_factory`](Self::bind_factory) bindings and for
    /// every value handed to a list or map builder.
    pub fn on_inject<T, F>(&self, hook: F)
    where
        T: ?Sized + 'static,
        F: Fn(&T, &Injector) -> Result<(), Error> + Sendable + 'static,
    {
        let mut members = runtime::write(&self.members);
        let hooks = members
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(MemberHooks::<T>::new()));

        if let Some(hooks) = hooks.downcast_mut::<MemberHooks<T>>() {
            hooks.push(Shared::new(hook));
        }
    }

    /// Runs the member injection hooks registered for `T` against `target`.
    pub fn inject_members<T>(&self, target: &T) -> Result<(), Error>
    where
        T: ?Sized + 'static,
    {
        let hooks: MemberHooks<T> = runtime::read(&self.members)
            .get(&TypeId::of::<T>())
            .and_then(|hooks| hooks.downcast_ref::<MemberHooks<T>>())
            .cloned()
            .unwrap_or_default();

        for hook in hooks {
            hook.inject(target, self)?;
        }

        Ok(())
    }

    /// Builder for the ordered list bound under `key`. An empty list binding is
    /// created if the key is unbound.
    pub fn list_builder<T>(&self, key: &Key<List<T>>) -> Result<ListBuilder<'_, T>, Error>
    where
        T: ?Sized + Sendable + 'static,
    {
        ListBuilder::new(self, key.clone())
    }

    /// Builder for the map bound under `key`. An empty map binding is created if the
    /// key is unbound.
    pub fn map_builder<T>(&self, key: &Key<Map<T>>) -> Result<MapBuilder<'_, T>, Error>
    where
        T: ?Sized + Sendable + 'static,
    {
        MapBuilder::new(self, key.clone())
    }

    /// Drops every singleton-cached value. Bindings stay in place; the next
    /// resolution of a singleton key produces a fresh value.
    ///
    /// Cached values are released after the binding table is unlocked, so their
    /// `Drop` may use the injector.
    pub fn shutdown(&self) {
        let mut bindings = runtime::write(&self.bindings);

        let released: Vec<Box<AnyValue>> = bindings
            .values_mut()
            .filter(|binding| binding.scope().is_singleton())
            .map(|binding| binding.reset())
            .collect();

        #[cfg(feature = "tracing")]
        info!(
            "Injector shut down, {} singletons released, {} bindings kept",
            released.len(),
            bindings.len()
        );

        drop(bindings);
        drop(released);
    }

    /// Returns the original provider bound under `key`, binding the one made by
    /// `create` with no scope first if the key is unbound.
    pub(crate) fn original_or_insert_with<T, P>(
        &self,
        key: &Key<T>,
        create: impl FnOnce() -> P,
    ) -> Result<Shared<dyn Provider<T>>, Error>
    where
        T: ?Sized + Sendable + 'static,
        P: Provider<T> + 'static,
    {
        let mut bindings = runtime::write(&self.bindings);
        let stored = bindings.entry(key.id().clone()).or_insert_with(|| {
            #[cfg(feature = "tracing")]
            debug!("Creating empty multi-value binding {}", key);

            Box::new(Binding::new(
                key.clone(),
                Shared::new(create()),
                Scope::NoScope,
            ))
        });

        let binding = AsAny::as_any(&**stored)
            .downcast_ref::<Binding<T>>()
            .ok_or_else(|| Error::type_mismatch(key.id(), std::any::type_name::<Binding<T>>()))?;

        Ok(binding.original().clone())
    }

    fn with_binding<T, R>(
        &self,
        key: &Key<T>,
        f: impl FnOnce(&Binding<T>) -> R,
    ) -> Result<Option<R>, Error>
    where
        T: ?Sized + Sendable + 'static,
    {
        let bindings = runtime::read(&self.bindings);
        let Some(stored) = bindings.get(key.id()) else {
            return Ok(None);
        };

        let binding = AsAny::as_any(&**stored)
            .downcast_ref::<Binding<T>>()
            .ok_or_else(|| Error::type_mismatch(key.id(), std::any::type_name::<Binding<T>>()))?;

        Ok(Some(f(binding)))
    }
}
