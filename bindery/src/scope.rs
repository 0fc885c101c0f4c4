use std::fmt;

use crate::error::Error;
use crate::injector::Injector;
use crate::key::KeyId;
use crate::provider::Provider;
use crate::resolve_guard::InitWaits;
use crate::runtime::{OnceSlot, Sendable, Shared};

#[cfg(feature = "tracing")]
use tracing::debug;

/// Instance reuse policy applied around a binding's provider.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "debug", derive(Debug))]
pub enum Scope {
    /// Every resolution calls the provider.
    #[default]
    NoScope,
    /// The first produced value is cached for the lifetime of the binding's scope
    /// wrapper, i.e. until the scope is changed or the injector shuts down.
    Singleton,
}

impl Scope {
    pub fn is_singleton(self) -> bool {
        matches!(self, Scope::Singleton)
    }

    /// Wraps `provider`, bound under `key`, according to this policy.
    pub fn scope<T>(
        self,
        key: &KeyId,
        provider: Shared<dyn Provider<T>>,
    ) -> Shared<dyn Provider<T>>
    where
        T: ?Sized + Sendable + 'static,
    {
        match self {
            Scope::NoScope => provider,
            Scope::Singleton => Shared::new(SingletonProvider::new(key.clone(), provider)),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::NoScope => f.write_str("no-scope"),
            Scope::Singleton => f.write_str("singleton"),
        }
    }
}

/// Memoizing wrapper created by [`Scope::Singleton`].
///
/// Concurrent first calls block on the slot until one of them has produced the value;
/// the delegate runs exactly once unless it fails, in which case the next call retries.
/// A call that would block on a thread which is itself waiting, directly or through
/// other threads, for the caller fails with a cyclic binding error.
pub struct SingletonProvider<T: ?Sized + 'static> {
    key: KeyId,
    delegate: Shared<dyn Provider<T>>,
    instance: OnceSlot<Shared<T>>,
}

impl<T: ?Sized + 'static> SingletonProvider<T> {
    pub fn new(key: KeyId, delegate: Shared<dyn Provider<T>>) -> Self {
        Self {
            key,
            delegate,
            instance: OnceSlot::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.instance.get().is_some()
    }
}

impl<T: ?Sized + Sendable + 'static> Provider<T> for SingletonProvider<T> {
    fn get(&self, injector: &Injector) -> Result<Shared<T>, Error> {
        if let Some(instance) = self.instance.get() {
            return Ok(instance.clone());
        }

        let _awaiting = InitWaits::wait_for(&injector.init_waits, &self.key)?;
        self.instance
            .get_or_try_init(|| {
                let _producing = InitWaits::produce(&injector.init_waits, &self.key);

                #[cfg(feature = "tracing")]
                debug!(
                    "Creating singleton instance of {}",
                    std::any::type_name::<T>()
                );

                self.delegate.get(injector)
            })
            .map(Shared::clone)
    }
}
