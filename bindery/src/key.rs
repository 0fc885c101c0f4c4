//! Binding keys.
//!
//! A [`Key<T>`] names "a value of type `T`, optionally distinguished by a qualifier".
//! It is the only handle into the injector. [`KeyId`] is the same identity with the
//! type parameter erased; it is what the injector tables, list constraints and error
//! messages carry.
//!
//! ```
//! use bindery::Key;
//!
//! let plain = Key::<String>::new();
//! let named = Key::<String>::named("greeting");
//!
//! assert_ne!(plain, named);
//! assert_eq!(named, Key::<String>::named("greeting"));
//! assert_eq!(named.qualifier(), Some("greeting"));
//! ```

use std::any::TypeId;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

/// Type-erased key identity.
///
/// Equality, hashing and ordering use the type identity and the qualifier; the type
/// name is carried for diagnostics only.
#[derive(Clone)]
pub struct KeyId {
    type_id: TypeId,
    type_name: &'static str,
    qualifier: Option<Arc<str>>,
}

impl KeyId {
    fn of<T: ?Sized + 'static>(qualifier: Option<Arc<str>>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            qualifier,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }
}

impl PartialEq for KeyId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.qualifier == other.qualifier
    }
}

impl Eq for KeyId {}

impl Hash for KeyId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.qualifier.hash(state);
    }
}

impl PartialOrd for KeyId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyId {
    // Type name first so sorted output reads naturally; the TypeId breaks ties
    // between distinct types that share a name.
    fn cmp(&self, other: &Self) -> Ordering {
        self.type_name
            .cmp(other.type_name)
            .then_with(|| self.type_id.cmp(&other.type_id))
            .then_with(|| self.qualifier.cmp(&other.qualifier))
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(qualifier) => write!(f, "{}(\"{}\")", self.type_name, qualifier),
            None => f.write_str(self.type_name),
        }
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key<{}>", self)
    }
}

impl AsRef<KeyId> for KeyId {
    fn as_ref(&self) -> &KeyId {
        self
    }
}

/// Typed binding key.
pub struct Key<T: ?Sized + 'static> {
    id: KeyId,
    _type: PhantomData<fn() -> *const T>,
}

impl<T: ?Sized + 'static> Key<T> {
    /// Key for the unqualified binding of `T`.
    pub fn new() -> Self {
        Self {
            id: KeyId::of::<T>(None),
            _type: PhantomData,
        }
    }

    /// Key for `T` distinguished by `qualifier`.
    pub fn named(qualifier: impl Into<Arc<str>>) -> Self {
        Self {
            id: KeyId::of::<T>(Some(qualifier.into())),
            _type: PhantomData,
        }
    }

    pub fn id(&self) -> &KeyId {
        &self.id
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.id.qualifier()
    }

    pub fn type_name(&self) -> &'static str {
        self.id.type_name()
    }
}

impl<T: ?Sized + 'static> Default for Key<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized + 'static> Clone for Key<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            _type: PhantomData,
        }
    }
}

impl<T: ?Sized + 'static> PartialEq for Key<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T: ?Sized + 'static> Eq for Key<T> {}

impl<T: ?Sized + 'static> Hash for Key<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T: ?Sized + 'static> AsRef<KeyId> for Key<T> {
    fn as_ref(&self) -> &KeyId {
        &self.id
    }
}

impl<T: ?Sized + 'static> From<Key<T>> for KeyId {
    fn from(key: Key<T>) -> Self {
        key.id
    }
}

impl<T: ?Sized + 'static> fmt::Display for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.id, f)
    }
}

impl<T: ?Sized + 'static> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.id, f)
    }
}
