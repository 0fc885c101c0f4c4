//! Provider definitions for dependency injection.
//!
//! A [`Provider<T>`] is a factory computation: "produce one `T`, or fail". Providers
//! receive the injector so they can resolve their own dependencies. They never cache;
//! reuse of produced values is the job of the [`Scope`](crate::scope::Scope) wrapped
//! around them by the binding.
//!
//! # Variants
//!
//! - [`InstanceProvider`]: returns a pre-built value, always succeeds
//! - [`FactoryProvider`]: runs a closure
//! - [`LookupProvider`]: resolves another key through the injector
//! - [`DecoratingProvider`]: runs an inner provider, then a chain of completion stages
//!
//! # Feature Flags
//!
//! With `thread-safe` enabled, providers and the values they produce must be
//! `Send + Sync` (expressed through [`Sendable`]).
//!
//! # Examples
//!
//! ```
//! use bindery::{Injector, Provider, FactoryProvider, Shared};
//!
//! let injector = Injector::new();
//! let provider = FactoryProvider::new(|_injector: &Injector| Ok(Shared::new(42u32)));
//!
//! assert_eq!(*provider.get(&injector).unwrap(), 42);
//! ```

use std::marker::PhantomData;

use crate::as_any::AsAny;
use crate::error::Error;
use crate::injector::Injector;
use crate::key::Key;
use crate::runtime::{Sendable, Shared};

#[cfg(feature = "tracing")]
use tracing::trace;

/// Produces values of type `T`.
pub trait Provider<T: ?Sized>: AsAny + Sendable {
    fn get(&self, injector: &Injector) -> Result<Shared<T>, Error>;
}

/// Provider returning one pre-built value.
pub struct InstanceProvider<T: ?Sized> {
    instance: Shared<T>,
}

impl<T: ?Sized> InstanceProvider<T> {
    pub fn new(instance: Shared<T>) -> Self {
        Self { instance }
    }
}

impl<T: ?Sized + Sendable + 'static> Provider<T> for InstanceProvider<T> {
    fn get(&self, _injector: &Injector) -> Result<Shared<T>, Error> {
        Ok(self.instance.clone())
    }
}

/// Provider backed by a closure.
///
/// The closure returns a `Shared<T>` so unsized tokens (`dyn Trait`) can be bound;
/// [`Injector::bind_factory`] covers the common sized case.
pub struct FactoryProvider<T: ?Sized, F> {
    factory: F,
    _type: PhantomData<fn() -> *const T>,
}

impl<T: ?Sized, F> FactoryProvider<T, F>
where
    F: Fn(&Injector) -> Result<Shared<T>, Error>,
{
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            _type: PhantomData,
        }
    }
}

impl<T, F> Provider<T> for FactoryProvider<T, F>
where
    T: ?Sized + 'static,
    F: Fn(&Injector) -> Result<Shared<T>, Error> + Sendable + 'static,
{
    fn get(&self, injector: &Injector) -> Result<Shared<T>, Error> {
        #[cfg(feature = "tracing")]
        trace!("Executing factory for {}", std::any::type_name::<T>());

        (self.factory)(injector)
    }
}

/// Provider that defers to whatever is bound under another key.
///
/// The lookup happens on every call, so rebinding the target is observed.
pub struct LookupProvider<T: ?Sized + 'static> {
    key: Key<T>,
}

impl<T: ?Sized + 'static> LookupProvider<T> {
    pub fn new(key: Key<T>) -> Self {
        Self { key }
    }

    pub fn key(&self) -> &Key<T> {
        &self.key
    }
}

impl<T: ?Sized + Sendable + 'static> Provider<T> for LookupProvider<T> {
    fn get(&self, injector: &Injector) -> Result<Shared<T>, Error> {
        injector.resolve(&self.key)
    }
}

/// One completion stage of a [`DecoratingProvider`].
///
/// Receives the value produced so far and returns the value to pass on, which may be
/// the same instance after completing it, or a replacement wrapping it.
pub trait Decoration<T: ?Sized>: Sendable {
    fn decorate(&self, value: Shared<T>, injector: &Injector) -> Result<Shared<T>, Error>;
}

impl<T: ?Sized, F> Decoration<T> for F
where
    F: Fn(Shared<T>, &Injector) -> Result<Shared<T>, Error> + Sendable,
{
    fn decorate(&self, value: Shared<T>, injector: &Injector) -> Result<Shared<T>, Error> {
        self(value, injector)
    }
}

/// Provider composed of a delegate and an ordered list of completion stages.
pub struct DecoratingProvider<T: ?Sized + 'static> {
    delegate: Shared<dyn Provider<T>>,
    stages: Vec<Box<dyn Decoration<T>>>,
}

impl<T: ?Sized + Sendable + 'static> DecoratingProvider<T> {
    pub fn new(delegate: Shared<dyn Provider<T>>) -> Self {
        Self {
            delegate,
            stages: Vec::new(),
        }
    }

    /// Appends a stage; stages run in the order they were added.
    pub fn then<F>(self, stage: F) -> Self
    where
        F: Fn(Shared<T>, &Injector) -> Result<Shared<T>, Error> + Sendable + 'static,
    {
        self.then_boxed(Box::new(stage))
    }

    pub(crate) fn then_boxed(mut self, stage: Box<dyn Decoration<T>>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Appends the member injection stage: every hook registered with
    /// [`Injector::on_inject`] for `T` runs against the produced value.
    pub fn with_member_injection(self) -> Self {
        self.then(|value: Shared<T>, injector: &Injector| {
            injector.inject_members::<T>(&*value)?;
            Ok(value)
        })
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

impl<T: ?Sized + Sendable + 'static> Provider<T> for DecoratingProvider<T> {
    fn get(&self, injector: &Injector) -> Result<Shared<T>, Error> {
        let value = self.delegate.get(injector)?;

        self.stages
            .iter()
            .try_fold(value, |value, stage| stage.decorate(value, injector))
    }
}
