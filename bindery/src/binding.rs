use crate::as_any::AsAny;
use crate::key::{Key, KeyId};
use crate::provider::{Decoration, DecoratingProvider, Provider};
use crate::runtime::{AnyValue, Sendable, Shared};
use crate::scope::Scope;

/// A registered (key, provider, scope) triple.
///
/// The binding keeps three views of its provider chain:
///
/// - `original`: the provider as it was bound
/// - `decorated`: `original` plus any stages added through [`Injector::decorate`]
/// - `scoped`: `decorated` wrapped by the current [`Scope`]
///
/// Only `scoped` is used for resolution. Changing the scope rebuilds it from
/// `decorated`, which is what drops a cached singleton value. The replaced wrapper is
/// handed back so the caller decides where the cached value is released.
///
/// [`Injector::decorate`]: crate::injector::Injector::decorate
pub struct Binding<T: ?Sized + 'static> {
    key: Key<T>,
    original: Shared<dyn Provider<T>>,
    decorated: Shared<dyn Provider<T>>,
    scoped: Shared<dyn Provider<T>>,
    scope: Scope,
}

impl<T: ?Sized + Sendable + 'static> Binding<T> {
    pub fn new(key: Key<T>, provider: Shared<dyn Provider<T>>, scope: Scope) -> Self {
        let original = provider.clone();
        let decorated = provider.clone();
        let scoped = scope.scope(key.id(), provider);
        Self {
            key,
            original,
            decorated,
            scoped,
            scope,
        }
    }

    pub fn key(&self) -> &Key<T> {
        &self.key
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// The provider exactly as it was bound, without decoration or scope.
    pub fn original(&self) -> &Shared<dyn Provider<T>> {
        &self.original
    }

    /// The provider used for resolution.
    pub fn provider(&self) -> &Shared<dyn Provider<T>> {
        &self.scoped
    }

    /// Downcasts the original provider to its concrete type.
    pub fn original_as<P: 'static>(&self) -> Option<&P> {
        let original: &dyn Provider<T> = &*self.original;
        AsAny::as_any(original).downcast_ref::<P>()
    }

    pub(crate) fn set_scope(&mut self, scope: Scope) -> Shared<dyn Provider<T>> {
        self.scope = scope;
        let scoped = scope.scope(self.key.id(), self.decorated.clone());
        std::mem::replace(&mut self.scoped, scoped)
    }

    pub(crate) fn decorate(&mut self, stage: Box<dyn Decoration<T>>) -> Shared<dyn Provider<T>> {
        self.decorated =
            Shared::new(DecoratingProvider::new(self.decorated.clone()).then_boxed(stage));
        let scoped = self.scope.scope(self.key.id(), self.decorated.clone());
        std::mem::replace(&mut self.scoped, scoped)
    }
}

impl<T: ?Sized + 'static> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            original: self.original.clone(),
            decorated: self.decorated.clone(),
            scoped: self.scoped.clone(),
            scope: self.scope,
        }
    }
}

/// Type-erased binding stored in the injector table.
pub(crate) trait AnyBinding: AsAny + Sendable {
    fn key_id(&self) -> &KeyId;

    fn scope(&self) -> Scope;

    /// Returns the replaced scope wrapper.
    fn change_scope(&mut self, scope: Scope) -> Box<AnyValue>;

    /// Re-applies the current scope, discarding any cached value once the returned
    /// wrapper is dropped.
    fn reset(&mut self) -> Box<AnyValue>;
}

impl<T: ?Sized + Sendable + 'static> AnyBinding for Binding<T> {
    fn key_id(&self) -> &KeyId {
        self.key.id()
    }

    fn scope(&self) -> Scope {
        self.scope
    }

    fn change_scope(&mut self, scope: Scope) -> Box<AnyValue> {
        Box::new(self.set_scope(scope))
    }

    fn reset(&mut self) -> Box<AnyValue> {
        Box::new(self.set_scope(self.scope))
    }
}
