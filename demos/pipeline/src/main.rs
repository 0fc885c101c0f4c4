use bindery::{Error, Injector, Key, List, Module, OnceSlot, Scope, Shared};
use tracing::info;

trait Stage: Send + Sync {
    fn name(&self) -> String;

    /// Late wiring, run by member injection when the stage enters a pipeline.
    fn attach(&self, _injector: &Injector) -> Result<(), Error> {
        Ok(())
    }
}

#[derive(Debug)]
struct Named(&'static str);

impl Stage for Named {
    fn name(&self) -> String {
        self.0.to_string()
    }
}

/// Stage whose prefix is filled in by member injection.
#[derive(Debug)]
struct Tagged {
    tag: OnceSlot<Shared<String>>,
}

impl Stage for Tagged {
    fn name(&self) -> String {
        format!("tagged({})", self.tag.get().map(|tag| tag.as_str()).unwrap_or("?"))
    }

    fn attach(&self, injector: &Injector) -> Result<(), Error> {
        let _ = self.tag.set(injector.resolve(&Key::named("tag"))?);
        Ok(())
    }
}

fn pipeline() -> Key<List<dyn Stage>> {
    Key::named("http")
}

fn auth() -> Key<dyn Stage> {
    Key::named("auth")
}

fn logging() -> Key<dyn Stage> {
    Key::named("logging")
}

#[derive(Debug)]
struct CoreModule;

impl Module for CoreModule {
    fn configure(&self, injector: &Injector) -> Result<(), Error> {
        injector.bind_shared(&auth(), Shared::new(Named("auth")) as Shared<dyn Stage>);
        injector.bind_shared(&logging(), Shared::new(Named("logging")) as Shared<dyn Stage>);

        let stages = injector.list_builder(&pipeline())?;
        stages.add(&auth())?;
        stages.add(&logging())?.before(&auth())?;
        Ok(())
    }
}

#[derive(Debug)]
struct ExtrasModule;

impl Module for ExtrasModule {
    fn imports(&self) -> Vec<Box<dyn Module>> {
        vec![Box::new(CoreModule)]
    }

    fn configure(&self, injector: &Injector) -> Result<(), Error> {
        injector.bind_instance(&Key::<String>::named("tag"), String::from("v2"));
        injector.on_inject::<dyn Stage, _>(|stage, injector| stage.attach(injector));

        let stages = injector.list_builder(&pipeline())?;
        stages
            .add_shared(Shared::new(Tagged { tag: OnceSlot::new() }) as Shared<dyn Stage>)?
            .after(&auth())?;
        stages
            .add_shared(Shared::new(Named("compression")) as Shared<dyn Stage>)?
            .after(&logging())?
            .before(&auth())?;
        stages.in_scope(Scope::Singleton)
    }
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let injector = Injector::with_modules([Box::new(ExtrasModule) as Box<dyn Module>])?;

    let stages = injector.resolve(&pipeline())?;
    let names: Vec<String> = stages.iter().map(|stage| stage.name()).collect();
    info!("Pipeline: {}", names.join(" -> "));

    println!("Injector {:?}", injector);

    injector.shutdown();
    Ok(())
}
