//! Thread-local stack guard for circular dependency detection.
//!
//! This module provides [`ResolveGuard`], a utility for tracking the chain of keys
//! being resolved on the current thread. Resolving a key that is already on the stack
//! means a provider (directly or through other bindings) asked for the value it is
//! in the middle of producing; the guard reports the full chain instead of letting
//! the resolution recurse forever.
//!
//! # Example
//! ```
//! use bindery::{ErrorKind, Key, ResolveGuard};
//!
//! let a = Key::<u8>::named("A");
//! let b = Key::<u8>::named("B");
//!
//! let _g1 = ResolveGuard::push(a.id()).unwrap();
//! let _g2 = ResolveGuard::push(b.id()).unwrap();
//! let err = ResolveGuard::push(a.id()).unwrap_err();
//! assert_eq!(err.kind, ErrorKind::CyclicBinding);
//! ```
//!
//! The thread-local stack cannot see a cycle that spans threads: two threads each
//! producing one singleton of a mutually dependent pair would block on each other's
//! slot forever. [`InitWaits`] records, per injector, which thread is producing each
//! singleton and which singleton each thread is blocked on, so the thread that would
//! close such a loop fails instead of waiting.

use std::cell::RefCell;
use std::collections::HashMap;
use std::thread::{self, ThreadId};

use crate::error::Error;
use crate::key::KeyId;
use crate::runtime::{self, Store};

thread_local! {
    // Keys being resolved in this thread, outermost first.
    static RESOLVE_STACK: RefCell<Vec<KeyId>> = const { RefCell::new(Vec::new()) };
}

/// Guard that pops the last pushed key from the thread-local stack on drop.
#[derive(Debug)]
pub struct ResolveGuard {
    pub key: KeyId,
}

impl ResolveGuard {
    /// Try to push a key onto the thread-local stack.
    ///
    /// Returns `Err(Error::cyclic_binding(..))` if the key is already on the stack.
    /// Otherwise, returns a guard that will pop the key on drop.
    pub fn push(key: &KeyId) -> Result<Self, Error> {
        RESOLVE_STACK.with(|stack| {
            let mut v = stack.borrow_mut();
            if v.contains(key) {
                let mut chain = v.clone();
                chain.push(key.clone());
                return Err(Error::cyclic_binding(&chain));
            }
            v.push(key.clone());
            Ok(ResolveGuard { key: key.clone() })
        })
    }

    /// Number of keys currently being resolved on this thread.
    pub fn depth() -> usize {
        RESOLVE_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ResolveGuard {
    fn drop(&mut self) {
        RESOLVE_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Waits-for graph between threads producing singletons of one injector.
#[derive(Default)]
pub(crate) struct InitWaits {
    producing: HashMap<KeyId, ThreadId>,
    awaiting: HashMap<ThreadId, KeyId>,
}

impl InitWaits {
    /// Records that the current thread is about to wait for the value of `key`.
    ///
    /// Follows producer to awaited key to producer; if that walk reaches the current
    /// thread, waiting would never end and a cyclic binding error is returned instead.
    pub(crate) fn wait_for<'a>(
        waits: &'a Store<InitWaits>,
        key: &KeyId,
    ) -> Result<Awaiting<'a>, Error> {
        let me = thread::current().id();
        let mut graph = runtime::write(waits);

        let mut chain = vec![key.clone()];
        let mut current = key.clone();
        while let Some(&producer) = graph.producing.get(&current) {
            if producer == me {
                chain.push(key.clone());
                return Err(Error::cyclic_binding(&chain));
            }
            let Some(next) = graph.awaiting.get(&producer) else {
                break;
            };
            if chain.contains(next) {
                break;
            }
            chain.push(next.clone());
            current = next.clone();
        }

        graph.awaiting.insert(me, key.clone());
        Ok(Awaiting {
            waits,
            key: key.clone(),
        })
    }

    /// Marks the current thread as the producer of `key` until the guard drops.
    pub(crate) fn produce<'a>(waits: &'a Store<InitWaits>, key: &KeyId) -> Producing<'a> {
        let me = thread::current().id();
        let mut graph = runtime::write(waits);
        graph.producing.insert(key.clone(), me);
        graph.awaiting.remove(&me);

        Producing {
            waits,
            key: key.clone(),
        }
    }
}

pub(crate) struct Awaiting<'a> {
    waits: &'a Store<InitWaits>,
    key: KeyId,
}

impl Drop for Awaiting<'_> {
    fn drop(&mut self) {
        let me = thread::current().id();
        let mut graph = runtime::write(self.waits);
        if graph.awaiting.get(&me) == Some(&self.key) {
            graph.awaiting.remove(&me);
        }
    }
}

pub(crate) struct Producing<'a> {
    waits: &'a Store<InitWaits>,
    key: KeyId,
}

impl Drop for Producing<'_> {
    fn drop(&mut self) {
        runtime::write(self.waits).producing.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::key::Key;

    #[test]
    fn push_and_pop_stack() {
        let a = Key::<u8>::named("A");
        let b = Key::<u8>::named("B");
        {
            let _g1 = ResolveGuard::push(a.id()).unwrap();
            {
                let _g2 = ResolveGuard::push(b.id()).unwrap();
                let err = ResolveGuard::push(a.id()).unwrap_err();
                assert_eq!(err.kind, ErrorKind::CyclicBinding);
                assert_eq!(ResolveGuard::depth(), 2);
            }
            // B popped, only A remains
            assert!(ResolveGuard::push(a.id()).is_err());
            assert!(ResolveGuard::push(b.id()).is_ok());
        }
        assert_eq!(ResolveGuard::depth(), 0);
        let _g = ResolveGuard::push(a.id()).unwrap();
    }

    #[test]
    fn same_type_different_qualifier_is_not_a_cycle() {
        let _g1 = ResolveGuard::push(Key::<u8>::new().id()).unwrap();
        let _g2 = ResolveGuard::push(Key::<u8>::named("other").id()).unwrap();
    }

    #[test]
    fn error_reports_chain() {
        let a = Key::<u8>::named("A");
        let b = Key::<u16>::named("B");
        let _g1 = ResolveGuard::push(a.id()).unwrap();
        let _g2 = ResolveGuard::push(b.id()).unwrap();

        let err = ResolveGuard::push(a.id()).unwrap_err();
        assert!(err.message.contains(&format!("{} -> {} -> {}", a, b, a)));
    }

    #[test]
    fn waiting_on_own_production_fails() {
        let waits = Store::new(InitWaits::default());
        let a = Key::<u8>::named("A");

        let _producing = InitWaits::produce(&waits, a.id());
        let err = InitWaits::wait_for(&waits, a.id()).err().map(|err| err.kind);
        assert_eq!(err, Some(ErrorKind::CyclicBinding));
    }

    #[test]
    fn waiting_on_unrelated_production_is_allowed() {
        let waits = Store::new(InitWaits::default());
        let a = Key::<u8>::named("A");
        let b = Key::<u8>::named("B");

        {
            let _producing = InitWaits::produce(&waits, a.id());
            assert!(InitWaits::wait_for(&waits, b.id()).is_ok());
        }
        assert!(runtime::read(&waits).producing.is_empty());
        assert!(runtime::read(&waits).awaiting.is_empty());
    }

    #[cfg(feature = "thread-safe")]
    #[test]
    fn waiting_through_another_thread_fails() {
        let waits = Store::new(InitWaits::default());
        let a = Key::<u8>::named("A");
        let b = Key::<u8>::named("B");

        let _producing = InitWaits::produce(&waits, b.id());
        let (ready, release) = (std::sync::Barrier::new(2), std::sync::Barrier::new(2));
        std::thread::scope(|scope| {
            scope.spawn(|| {
                let _producing = InitWaits::produce(&waits, a.id());
                let _awaiting = InitWaits::wait_for(&waits, b.id()).unwrap();
                ready.wait();
                release.wait();
            });

            ready.wait();
            let err = InitWaits::wait_for(&waits, a.id()).err();
            release.wait();

            let err = err.unwrap();
            assert_eq!(err.kind, ErrorKind::CyclicBinding);
            assert!(err.message.contains(&format!("{} -> {} -> {}", a, b, a)));
        });
    }
}
