//! Runtime type definitions for shared ownership and interior mutability.
//!
//! This module provides conditional type aliases based on the `thread-safe` feature flag:
//!
//! - When `thread-safe` is enabled: `Arc`, `parking_lot::RwLock` and `once_cell::sync::OnceCell`
//! - When `thread-safe` is disabled: `Rc`, `RefCell` and `once_cell::unsync::OnceCell`
//!
//! # Type Aliases
//!
//! - [`Shared<T>`]: Smart pointer for shared ownership of resolved values
//! - [`Store<T>`]: Container providing interior mutability for the injector tables
//! - [`OnceSlot<T>`]: Write-once cell backing singleton caches
//! - [`AnyValue`]: Type-erased payload stored in the injector tables
//!
//! The [`Sendable`] marker is `Send + Sync` in thread-safe mode and empty otherwise, so
//! the rest of the crate can write one set of bounds for both modes.
//!
//! # Examples
//!
//! ```
//! use bindery::runtime::{self, Shared, Store};
//!
//! let store = Shared::new(Store::new(vec![1, 2, 3]));
//! runtime::write(&store).push(4);
//! assert_eq!(runtime::read(&store).len(), 4);
//! ```

use std::any::Any;

#[cfg(feature = "thread-safe")]
use std::sync::Arc;

#[cfg(not(feature = "thread-safe"))]
use std::{
    cell::{Ref, RefCell, RefMut},
    rc::Rc,
};

#[cfg(feature = "thread-safe")]
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Type alias for shared ownership of data.
///
/// When the `thread-safe` feature is enabled, this is [`Arc<T>`] (thread-safe reference counting).
/// When disabled, this is [`Rc<T>`] (single-threaded reference counting).
#[cfg(feature = "thread-safe")]
pub type Shared<T> = Arc<T>;
#[cfg(not(feature = "thread-safe"))]
pub type Shared<T> = Rc<T>;

/// Type alias for interior mutability.
///
/// With `thread-safe` this is a `parking_lot` read-write lock, which does not poison, so
/// table access never has to unwrap a lock result. Without it, a [`RefCell<T>`].
#[cfg(feature = "thread-safe")]
pub type Store<T> = RwLock<T>;
#[cfg(not(feature = "thread-safe"))]
pub type Store<T> = RefCell<T>;

/// Shared borrow of a [`Store`].
#[cfg(feature = "thread-safe")]
pub type StoreRead<'a, T> = RwLockReadGuard<'a, T>;
#[cfg(not(feature = "thread-safe"))]
pub type StoreRead<'a, T> = Ref<'a, T>;

/// Exclusive borrow of a [`Store`].
#[cfg(feature = "thread-safe")]
pub type StoreWrite<'a, T> = RwLockWriteGuard<'a, T>;
#[cfg(not(feature = "thread-safe"))]
pub type StoreWrite<'a, T> = RefMut<'a, T>;

/// Write-once cell. The sync variant blocks concurrent initializers until the first
/// one finishes, which is what gives singletons their exactly-once guarantee.
#[cfg(feature = "thread-safe")]
pub type OnceSlot<T> = once_cell::sync::OnceCell<T>;
#[cfg(not(feature = "thread-safe"))]
pub type OnceSlot<T> = once_cell::unsync::OnceCell<T>;

/// Type-erased value stored in injector tables.
#[cfg(feature = "thread-safe")]
pub type AnyValue = dyn Any + Send + Sync;
#[cfg(not(feature = "thread-safe"))]
pub type AnyValue = dyn Any;

/// Marker for values that may live inside the injector.
#[cfg(feature = "thread-safe")]
pub trait Sendable: Send + Sync {}
#[cfg(feature = "thread-safe")]
impl<T: ?Sized + Send + Sync> Sendable for T {}

/// Marker for values that may live inside the injector.
#[cfg(not(feature = "thread-safe"))]
pub trait Sendable {}
#[cfg(not(feature = "thread-safe"))]
impl<T: ?Sized> Sendable for T {}

/// Borrows a store for reading.
///
/// Callers must not hold the returned guard while running a provider: providers may
/// re-enter the injector.
pub fn read<T>(store: &Store<T>) -> StoreRead<'_, T> {
    #[cfg(feature = "thread-safe")]
    {
        store.read()
    }
    #[cfg(not(feature = "thread-safe"))]
    {
        store.borrow()
    }
}

/// Borrows a store for writing.
pub fn write<T>(store: &Store<T>) -> StoreWrite<'_, T> {
    #[cfg(feature = "thread-safe")]
    {
        store.write()
    }
    #[cfg(not(feature = "thread-safe"))]
    {
        store.borrow_mut()
    }
}
