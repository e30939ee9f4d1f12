//! Datatype descriptors and the factory that builds them.
//!
//! A [`Datatype`] is an owned, fully-formed description of one stored
//! value's type: class, size, byte order. [`TypeSystem`] bundles an
//! engine with its registry and is the only way to mint descriptors.

use std::sync::Arc;

use crate::datatype::{ByteOrder, DataClass, NativeType, TypeSize};
use crate::engine::{MemoryTypeEngine, RawHandle, SearchDirection, TypeEngine};
use crate::error::Result;
use crate::handle::OwnedHandle;
use crate::record::TypeRecord;
use crate::registry::TypeRegistry;

/// An owned datatype descriptor.
///
/// Created through [`TypeSystem`]; the underlying engine handle is
/// released exactly once when the descriptor is dropped or explicitly
/// closed. Duplication is explicit via [`Datatype::try_clone`].
#[derive(Debug)]
pub struct Datatype {
    handle: OwnedHandle,
    registry: Arc<TypeRegistry>,
}

impl Datatype {
    fn new(engine: Arc<dyn TypeEngine>, raw: RawHandle, registry: Arc<TypeRegistry>) -> Datatype {
        Datatype {
            handle: OwnedHandle::new(engine, raw),
            registry,
        }
    }

    /// The raw engine handle backing this descriptor.
    pub fn raw_handle(&self) -> RawHandle {
        self.handle.raw()
    }

    /// Type class of the described value.
    pub fn class(&self) -> Result<DataClass> {
        let tag = self.handle.engine().get_class(self.handle.raw())?;
        DataClass::from_raw(tag)
    }

    /// Size of one value, or the variable-length sentinel.
    pub fn size(&self) -> Result<TypeSize> {
        self.handle.engine().get_size(self.handle.raw())
    }

    /// Byte order of the described value.
    pub fn order(&self) -> Result<ByteOrder> {
        let tag = self.handle.engine().get_order(self.handle.raw())?;
        ByteOrder::from_raw(tag)
    }

    /// Apply a new byte order.
    ///
    /// The engine rejects this for classes where order is not
    /// meaningful (strings, opaque, compound); callers must not assume
    /// success across all classes.
    pub fn set_order(&mut self, order: ByteOrder) -> Result<()> {
        self.handle.engine().set_order(self.handle.raw(), order.raw())
    }

    /// Reduce this type to a canonical native type, if one exists.
    ///
    /// Asks the engine for the ascending native resolution (smallest
    /// native type that losslessly represents this one) and looks the
    /// result up in the registry. `Ok(None)` is the normal outcome for
    /// compound, array, and other engine-only types.
    pub fn native_type(&self) -> Result<Option<NativeType>> {
        let engine = self.handle.engine();
        let raw = engine.get_native_type(self.handle.raw(), SearchDirection::Ascend)?;
        // Owning the temporary resolution handle guarantees it is
        // released on every return path below.
        let tmp = OwnedHandle::new(Arc::clone(engine), raw);
        self.registry.identify(tmp.raw())
    }

    /// Structural snapshot of this type.
    pub fn record(&self) -> Result<TypeRecord> {
        self.handle.engine().snapshot(self.handle.raw())
    }

    /// Portable description bytes for this type.
    pub fn to_message_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.record()?.to_message_bytes())
    }

    /// Explicitly duplicate this descriptor into an independent one
    /// with its own handle.
    pub fn try_clone(&self) -> Result<Datatype> {
        let engine = self.handle.engine();
        let raw = engine.copy_type(self.handle.raw())?;
        Ok(Datatype::new(
            Arc::clone(engine),
            raw,
            Arc::clone(&self.registry),
        ))
    }

    /// Release the descriptor now, surfacing the engine's result.
    pub fn close(self) -> Result<()> {
        self.handle.close()
    }
}

/// Factory for datatype descriptors.
///
/// Bundles a type engine with the registry built over its built-in
/// native types. Cheap to clone and share.
#[derive(Clone)]
pub struct TypeSystem {
    engine: Arc<dyn TypeEngine>,
    registry: Arc<TypeRegistry>,
}

impl TypeSystem {
    /// A type system over a fresh in-memory engine.
    pub fn new() -> TypeSystem {
        Self::with_engine(Arc::new(MemoryTypeEngine::new()))
    }

    /// A type system over an injected engine.
    pub fn with_engine(engine: Arc<dyn TypeEngine>) -> TypeSystem {
        let registry = Arc::new(TypeRegistry::from_engine(Arc::clone(&engine)));
        TypeSystem { engine, registry }
    }

    /// The registry over this system's built-in native types.
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// The underlying engine.
    pub fn engine(&self) -> &Arc<dyn TypeEngine> {
        &self.engine
    }

    /// Create a datatype from a class and a size.
    ///
    /// # Panics
    ///
    /// Aborts if the engine rejects the (class, size) combination. A
    /// descriptor that failed construction cannot be used safely, so
    /// this is unrecoverable by design.
    pub fn create(&self, class: DataClass, size: TypeSize) -> Datatype {
        let raw = match self.engine.create_type(class.raw(), size) {
            Ok(raw) => raw,
            Err(err) => panic!("failed to create datatype ({class:?}, {size}): {err}"),
        };
        Datatype::new(Arc::clone(&self.engine), raw, Arc::clone(&self.registry))
    }

    /// Copy a datatype from a native type's canonical engine
    /// representation.
    ///
    /// Succeeds for every [`NativeType`]: the registry covers the whole
    /// enumeration and built-ins always copy.
    pub fn copy(&self, native: NativeType) -> Datatype {
        let builtin = self
            .registry
            .resolve(native)
            .expect("full registry covers every native type");
        let raw = match self.engine.copy_type(builtin) {
            Ok(raw) => raw,
            Err(err) => panic!("failed to copy built-in {native:?}: {err}"),
        };
        Datatype::new(Arc::clone(&self.engine), raw, Arc::clone(&self.registry))
    }

    /// A double-precision float descriptor.
    pub fn create_double(&self) -> Datatype {
        self.copy(NativeType::Double)
    }

    /// A platform integer descriptor.
    pub fn create_int(&self) -> Datatype {
        self.copy(NativeType::Int)
    }

    /// A variable-length string descriptor.
    ///
    /// Copies the engine's single-byte character type and marks its
    /// size variable; every descriptor built here is variable-length by
    /// construction, never a fixed-width string.
    pub fn create_string(&self) -> Datatype {
        let raw = match self.engine.copy_type(self.engine.string_handle()) {
            Ok(raw) => raw,
            Err(err) => panic!("failed to copy built-in string type: {err}"),
        };
        let dt = Datatype::new(Arc::clone(&self.engine), raw, Arc::clone(&self.registry));
        if let Err(err) = self.engine.set_size(raw, TypeSize::Variable) {
            panic!("failed to mark string type variable-length: {err}");
        }
        dt
    }
}

impl Default for TypeSystem {
    fn default() -> Self {
        Self::new()
    }
}
