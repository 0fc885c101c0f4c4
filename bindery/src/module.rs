//! Grouping of related bindings.
//!
//! A [`Module`] configures a slice of the injector and may import other modules it
//! depends on. [`Injector::install`] walks imports depth-first before configuring the
//! module itself, and installs each module type at most once, so shared imports in a
//! diamond are configured a single time.
//!
//! # Examples
//!
//! ```
//! use bindery::{Error, Injector, Key, Module};
//!
//! #[derive(Debug)]
//! struct ConfigModule;
//!
//! impl Module for ConfigModule {
//!     fn configure(&self, injector: &Injector) -> Result<(), Error> {
//!         injector.bind_instance(&Key::<u16>::named("port"), 8080);
//!         Ok(())
//!     }
//! }
//!
//! let injector = Injector::with_modules([Box::new(ConfigModule) as Box<dyn Module>]).unwrap();
//! assert_eq!(*injector.resolve(&Key::<u16>::named("port")).unwrap(), 8080);
//! ```

use std::any::Any;

use crate::as_any::AsAny;
use crate::error::Error;
use crate::injector::Injector;
use crate::runtime;

#[cfg(feature = "tracing")]
use tracing::{debug, info};

#[cfg(feature = "debug")]
pub trait Module: AsAny + std::fmt::Debug {
    fn imports(&self) -> Vec<Box<dyn Module>> {
        vec![]
    }

    fn configure(&self, injector: &Injector) -> Result<(), Error>;
}

#[cfg(not(feature = "debug"))]
pub trait Module: AsAny {
    fn imports(&self) -> Vec<Box<dyn Module>> {
        vec![]
    }

    fn configure(&self, injector: &Injector) -> Result<(), Error>;
}

impl Injector {
    /// Creates an injector and installs `modules` in order.
    pub fn with_modules<I>(modules: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = Box<dyn Module>>,
    {
        let injector = Injector::new();
        for module in modules {
            injector.install(module.as_ref())?;
        }
        Ok(injector)
    }

    /// Installs `module` and, first, everything it imports. A module type that was
    /// already installed is skipped.
    pub fn install(&self, module: &dyn Module) -> Result<(), Error> {
        let type_id = Any::type_id(AsAny::as_any(module));

        if !runtime::write(&self.installed).insert(type_id) {
            #[cfg(feature = "tracing")]
            debug!("Module {:?} already installed, skipping", type_id);

            return Ok(());
        }

        for import in module.imports() {
            self.install(import.as_ref())?;
        }

        #[cfg(feature = "tracing")]
        info!("Configuring module {:?}", type_id);

        module.configure(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::key::Key;
    use crate::list::List;

    fn log_key() -> Key<List<String>> {
        Key::named("install-log")
    }

    fn record(injector: &Injector, name: &str) -> Result<(), Error> {
        injector
            .list_builder(&log_key())?
            .add_value(name.to_string())?;
        Ok(())
    }

    fn installed(injector: &Injector) -> Vec<String> {
        injector
            .resolve(&log_key())
            .unwrap()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    #[derive(Debug)]
    struct Storage;

    impl Module for Storage {
        fn configure(&self, injector: &Injector) -> Result<(), Error> {
            record(injector, "storage")
        }
    }

    #[derive(Debug)]
    struct Cache;

    impl Module for Cache {
        fn imports(&self) -> Vec<Box<dyn Module>> {
            vec![Box::new(Storage)]
        }

        fn configure(&self, injector: &Injector) -> Result<(), Error> {
            record(injector, "cache")
        }
    }

    #[derive(Debug)]
    struct App;

    impl Module for App {
        fn imports(&self) -> Vec<Box<dyn Module>> {
            vec![Box::new(Cache), Box::new(Storage)]
        }

        fn configure(&self, injector: &Injector) -> Result<(), Error> {
            record(injector, "app")
        }
    }

    #[derive(Debug)]
    struct Broken;

    impl Module for Broken {
        fn configure(&self, injector: &Injector) -> Result<(), Error> {
            injector.change_scope(Key::<u8>::new(), crate::scope::Scope::Singleton)
        }
    }

    #[test]
    fn imports_are_configured_first() {
        let injector = Injector::new();
        injector.install(&Cache).unwrap();

        assert_eq!(installed(&injector), ["storage", "cache"]);
    }

    #[test]
    fn shared_imports_are_installed_once() {
        let injector = Injector::new();
        injector.install(&App).unwrap();
        injector.install(&Storage).unwrap();

        assert_eq!(installed(&injector), ["storage", "cache", "app"]);
    }

    #[test]
    fn configuration_errors_propagate() {
        let err = Injector::with_modules([Box::new(Broken) as Box<dyn Module>])
            .err()
            .map(|err| err.kind);
        assert_eq!(err, Some(ErrorKind::BindingNotFound));
    }
}
