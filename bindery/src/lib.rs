//! Embeddable dependency injection container.
//!
//! Values are bound under typed [`Key`]s to [`Provider`]s wrapped in a [`Scope`], and
//! resolved through an explicitly constructed [`Injector`]. On top of single-valued
//! bindings the crate offers ordered multi-value bindings ([`ListBuilder`]) whose
//! entries declare `after` / `before` constraints, and named multi-value bindings
//! ([`MapBuilder`]).
//!
//! # Feature Flags
//!
//! - `thread-safe` (default): `Arc`, `parking_lot::RwLock` and sync once-cells; the
//!   injector is `Send + Sync`
//! - `tracing` (default): lifecycle and resolution logging through `tracing`
//! - `debug` (default): `Debug` implementations for the container types
//!
//! # Examples
//!
//! ```
//! use bindery::{Injector, Key, List, Scope};
//!
//! let injector = Injector::new();
//! let (a, b, c) = (Key::<String>::named("A"), Key::<String>::named("B"), Key::<String>::named("C"));
//! injector.bind_instance(&a, "a".to_string());
//! injector.bind_instance(&b, "b".to_string());
//! injector.bind_instance(&c, "c".to_string());
//!
//! let letters = Key::<List<String>>::new();
//! let builder = injector.list_builder(&letters).unwrap();
//! builder.add(&a).unwrap();
//! builder.add(&b).unwrap().after(&a).unwrap();
//! builder.add(&c).unwrap().before(&a).unwrap();
//! builder.in_scope(Scope::Singleton).unwrap();
//!
//! let resolved = injector.resolve(&letters).unwrap();
//! let values: Vec<&str> = resolved.iter().map(|value| value.as_str()).collect();
//! assert_eq!(values, ["c", "a", "b"]);
//! ```

pub mod as_any;
pub mod binding;
pub mod error;
pub mod injector;
pub mod key;
pub mod list;
pub mod list_builder;
pub mod map;
pub mod module;
pub mod ordering;
pub mod provider;
pub mod resolve_guard;
pub mod runtime;
pub mod scope;

pub use as_any::*;
pub use binding::Binding;
pub use error::*;
pub use injector::*;
pub use key::*;
pub use list::*;
pub use list_builder::*;
pub use map::*;
pub use module::*;
pub use provider::*;
pub use resolve_guard::*;
pub use runtime::*;
pub use scope::*;
