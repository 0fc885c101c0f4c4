//! Error types for the bindery injector.
//!
//! This module defines a lightweight error model used across the container to
//! describe failures that can occur during binding, resolution, scope changes
//! and list ordering.
//!
//! # Design
//!
//! - `ErrorKind` captures the error category.
//! - `Error` stores the category and a human-readable message.
//!
//! The helpers in `Error` are provided to keep call sites concise and to
//! maintain consistent error messages. A failure is always fatal to the single
//! call that produced it; the injector itself stays usable.
//!
//! # Feature Flags
//!
//! - `tracing`: logs errors when they are created.
//! - `debug`: enables extra diagnostic formatting in `Display`.
//!
//! # Examples
//!
//! ```
//! use bindery::{Error, ErrorKind, Key};
//!
//! let key = Key::<String>::named("greeting");
//! let err = Error::unbound_key(key.id());
//! assert_eq!(err.kind, ErrorKind::UnboundKey);
//! assert!(err.message.contains("greeting"));
//! ```

use core::fmt;

#[cfg(feature = "tracing")]
use tracing::{error, warn};

use crate::key::KeyId;

/// Error categories for the injector.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ErrorKind {
    /// `resolve` was called for a key that has no binding.
    UnboundKey,
    /// A binding (or list entry) that an operation needs to modify does not exist.
    BindingNotFound,
    /// A key was requested again while it was still being resolved.
    CyclicBinding,
    /// The before/after constraints of an ordered list form a cycle.
    OrderingCycle,
    /// The stored binding or provider does not have the expected type.
    TypeMismatch,
    /// A provider reported a failure of its own.
    ProviderFailed,
}

/// Container error structure.
///
/// `kind` enables programmatic handling, while `message` is human-readable.
#[derive(Clone, Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
}

impl Error {
    /// Creates a new error with the given kind and message.
    ///
    /// If the `tracing` feature is enabled, the error is automatically logged.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let error = Self {
            kind,
            message: message.into(),
        };

        #[cfg(feature = "tracing")]
        {
            if matches!(kind, ErrorKind::UnboundKey | ErrorKind::BindingNotFound) {
                warn!("{}", error);
            } else {
                error!("{}", error);
            }
        }

        error
    }

    /// No binding registered for the requested key.
    pub fn unbound_key(key: &KeyId) -> Self {
        Self::new(
            ErrorKind::UnboundKey,
            format!("No binding registered for key: {}", key),
        )
    }

    /// An operation required an existing binding that is absent.
    pub fn binding_not_found(key: &KeyId) -> Self {
        Self::new(
            ErrorKind::BindingNotFound,
            format!("Cannot modify missing binding: {}", key),
        )
    }

    /// A list constraint targets an entry that was never added.
    pub fn entry_not_found(list: &KeyId, entry: &KeyId) -> Self {
        Self::new(
            ErrorKind::BindingNotFound,
            format!("No entry {} in list binding {}", entry, list),
        )
    }

    /// Circular dependency detected in resolution chain.
    pub fn cyclic_binding(chain: &[KeyId]) -> Self {
        Self::new(
            ErrorKind::CyclicBinding,
            format!("Circular dependency detected: {}", join(chain)),
        )
    }

    /// The ordering constraints of a list contain a cycle.
    ///
    /// `cycle` lists the keys on the cycle in edge order.
    pub fn ordering_cycle(list: &KeyId, cycle: &[KeyId]) -> Self {
        Self::new(
            ErrorKind::OrderingCycle,
            format!(
                "Ordering constraints of {} form a cycle: {}",
                list,
                join(cycle)
            ),
        )
    }

    /// Type mismatch while downcasting a stored binding or provider.
    pub fn type_mismatch(key: &KeyId, expected: &str) -> Self {
        Self::new(
            ErrorKind::TypeMismatch,
            format!("Binding for {} is not a {}", key, expected),
        )
    }

    /// A provider failed to produce its value.
    pub fn provider_failed(key: &KeyId, reason: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::ProviderFailed,
            format!("Provider for {} failed: {}", key, reason),
        )
    }
}

fn join(keys: &[KeyId]) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[cfg(feature = "debug")]
        {
            write!(f, "({:?}) - {}", self.kind, self.message)
        }
        #[cfg(not(feature = "debug"))]
        {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for Error {}
