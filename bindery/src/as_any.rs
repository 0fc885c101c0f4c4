use std::any::Any;

/// Upcast support for the container's trait objects.
///
/// Providers and bindings are stored as trait objects. This trait is a supertrait of
/// both so the injector can recover the concrete type behind a `dyn Provider<T>` (for
/// example to reach the entry table of a list provider) without trait upcasting.
///
/// Call it on `&dyn Trait`, not on a `Shared<dyn Trait>`: the blanket impl below also
/// covers the smart pointer itself.
pub trait AsAny: Any {
    /// Get a reference to the underlying type as a trait object.
    fn as_any(&self) -> &dyn Any;

    /// Get a mutable reference to the underlying type as a trait object.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Automatically implement AsAny for any type that implements the necessary bounds.
impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
