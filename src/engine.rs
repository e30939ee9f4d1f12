//! The storage engine's type/handle boundary and an in-memory engine.
//!
//! [`TypeEngine`] models the engine surface that descriptor code talks
//! to: handle-based, with raw `i32` class and order tags crossing the
//! boundary. [`MemoryTypeEngine`] is a real implementation backed by a
//! mutex-guarded handle table, with the built-in native types installed
//! at construction.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::datatype::{ByteOrder, DataClass, NativeType, TypeSize};
use crate::error::{Result, TypeError};
use crate::record::TypeRecord;

/// Opaque engine handle. Only ever minted by an engine; release through
/// [`TypeEngine::close_type`] (normally via [`crate::OwnedHandle`]).
pub type RawHandle = i64;

/// Direction for native-type resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDirection {
    /// Prefer the smallest native type that can losslessly represent
    /// the queried type.
    Ascend,
    /// Prefer the largest matching native type.
    Descend,
}

/// Default bound on simultaneously open (non-built-in) type handles.
pub const DEFAULT_MAX_OPEN_TYPES: usize = 65_536;

/// Configuration for [`MemoryTypeEngine`].
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Maximum number of simultaneously open non-built-in handles.
    pub max_open_types: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            max_open_types: DEFAULT_MAX_OPEN_TYPES,
        }
    }
}

/// The engine's type/handle API.
///
/// Raw tags cross this boundary; callers decode them with
/// [`DataClass::from_raw`] and [`ByteOrder::from_raw`]. All operations
/// are synchronous and complete or fail deterministically.
pub trait TypeEngine: Send + Sync {
    /// Canonical handle for a built-in native type. Built-ins are
    /// immutable and live for the engine's lifetime.
    fn native_handle(&self, native: NativeType) -> RawHandle;

    /// Canonical handle for the built-in single-byte character string
    /// type, the base for variable-length strings.
    fn string_handle(&self) -> RawHandle;

    /// Allocate a new type of the given class tag and size.
    fn create_type(&self, class_tag: i32, size: TypeSize) -> Result<RawHandle>;

    /// Clone a type into an independent new handle.
    fn copy_type(&self, handle: RawHandle) -> Result<RawHandle>;

    /// Class tag of the type behind `handle`.
    fn get_class(&self, handle: RawHandle) -> Result<i32>;

    /// Size of one value of the type behind `handle`.
    fn get_size(&self, handle: RawHandle) -> Result<TypeSize>;

    /// Change the size of the type behind `handle`; `TypeSize::Variable`
    /// marks the type variable-length.
    fn set_size(&self, handle: RawHandle, size: TypeSize) -> Result<()>;

    /// Resolve to a freshly minted handle for the native form of the
    /// type: the matching built-in where one exists, otherwise a copy
    /// of the type itself. The caller owns the returned handle.
    fn get_native_type(&self, handle: RawHandle, direction: SearchDirection) -> Result<RawHandle>;

    /// Byte-order tag of the type behind `handle`.
    fn get_order(&self, handle: RawHandle) -> Result<i32>;

    /// Apply a new byte order. Fails for classes where order is not
    /// meaningful.
    fn set_order(&self, handle: RawHandle, order_tag: i32) -> Result<()>;

    /// Release a handle. Exactly-once: a released or unknown handle is
    /// an error, and built-ins refuse to close.
    fn close_type(&self, handle: RawHandle) -> Result<()>;

    /// Structural snapshot of the type behind `handle`.
    fn snapshot(&self, handle: RawHandle) -> Result<TypeRecord>;

    /// Structural equality of two types.
    fn equal(&self, a: RawHandle, b: RawHandle) -> Result<bool> {
        Ok(self.snapshot(a)? == self.snapshot(b)?)
    }
}

struct TableEntry {
    record: TypeRecord,
    builtin: bool,
}

struct EngineInner {
    entries: HashMap<RawHandle, TableEntry>,
    next_handle: RawHandle,
    open_count: usize,
}

/// In-memory type engine.
///
/// Handle table guarded by an internal `Mutex`; handles are monotonic
/// and never reused within an engine's lifetime. Built-in native types
/// and the character string base type are installed at construction.
pub struct MemoryTypeEngine {
    inner: Mutex<EngineInner>,
    builtins: Vec<(NativeType, RawHandle)>,
    string_builtin: RawHandle,
    max_open_types: usize,
}

impl MemoryTypeEngine {
    /// Create an engine with default options.
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    /// Create an engine with explicit options.
    pub fn with_options(options: EngineOptions) -> Self {
        let mut entries = HashMap::new();
        let mut builtins = Vec::with_capacity(NativeType::ALL.len());
        let mut next_handle: RawHandle = 1;

        for native in NativeType::ALL {
            entries.insert(
                next_handle,
                TableEntry {
                    record: TypeRecord::for_native(native),
                    builtin: true,
                },
            );
            builtins.push((native, next_handle));
            next_handle += 1;
        }

        let string_builtin = next_handle;
        entries.insert(
            string_builtin,
            TableEntry {
                record: TypeRecord::c_string(),
                builtin: true,
            },
        );
        next_handle += 1;

        MemoryTypeEngine {
            inner: Mutex::new(EngineInner {
                entries,
                next_handle,
                open_count: 0,
            }),
            builtins,
            string_builtin,
            max_open_types: options.max_open_types,
        }
    }

    /// Number of currently open non-built-in handles.
    pub fn open_types(&self) -> usize {
        self.lock().open_count
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EngineInner> {
        // Engine state stays consistent under every error path, so a
        // poisoned lock only means another thread panicked mid-call.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn insert(&self, inner: &mut EngineInner, record: TypeRecord) -> Result<RawHandle> {
        if inner.open_count >= self.max_open_types {
            return Err(TypeError::TooManyOpenTypes(self.max_open_types));
        }
        let handle = inner.next_handle;
        inner.next_handle += 1;
        inner.open_count += 1;
        inner.entries.insert(
            handle,
            TableEntry {
                record,
                builtin: false,
            },
        );
        Ok(handle)
    }

    /// Built-in whose record the ascending table matches first, walking
    /// smallest to largest.
    fn ascend_match(&self, record: &TypeRecord) -> Option<NativeType> {
        let size = record.size.fixed()?;
        NativeType::ALL.into_iter().find(|nt| {
            nt.class() == record.class && nt.size() >= size && nt.signed() == record.signed
        })
    }
}

impl Default for MemoryTypeEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn entry<'a>(inner: &'a EngineInner, handle: RawHandle) -> Result<&'a TableEntry> {
    inner
        .entries
        .get(&handle)
        .ok_or(TypeError::InvalidHandle(handle))
}

fn entry_mut<'a>(inner: &'a mut EngineInner, handle: RawHandle) -> Result<&'a mut TableEntry> {
    inner
        .entries
        .get_mut(&handle)
        .ok_or(TypeError::InvalidHandle(handle))
}

impl TypeEngine for MemoryTypeEngine {
    fn native_handle(&self, native: NativeType) -> RawHandle {
        self.builtins
            .iter()
            .find(|(nt, _)| *nt == native)
            .map(|(_, h)| *h)
            .expect("built-in table covers every native type")
    }

    fn string_handle(&self) -> RawHandle {
        self.string_builtin
    }

    fn create_type(&self, class_tag: i32, size: TypeSize) -> Result<RawHandle> {
        let class = DataClass::from_raw(class_tag)?;
        match class {
            DataClass::NoClass
            | DataClass::Reference
            | DataClass::VarLength
            | DataClass::Array => {
                log::debug!("create_type rejected: class {class:?} needs a base type");
                return Err(TypeError::InvalidClassForCreate(class));
            }
            _ => {}
        }
        match size {
            TypeSize::Fixed(0) => return Err(TypeError::InvalidSize { class, size }),
            // Variable sizing is only reachable for strings; every
            // other class is fixed-size at creation.
            TypeSize::Variable if class != DataClass::String => {
                return Err(TypeError::InvalidSize { class, size });
            }
            _ => {}
        }
        let mut inner = self.lock();
        let handle = self.insert(&mut inner, TypeRecord::for_class(class, size))?;
        log::trace!("created type {handle} class={class:?} size={size}");
        Ok(handle)
    }

    fn copy_type(&self, handle: RawHandle) -> Result<RawHandle> {
        let mut inner = self.lock();
        let record = entry(&inner, handle)?.record.clone();
        let copy = self.insert(&mut inner, record)?;
        log::trace!("copied type {handle} -> {copy}");
        Ok(copy)
    }

    fn get_class(&self, handle: RawHandle) -> Result<i32> {
        let inner = self.lock();
        Ok(entry(&inner, handle)?.record.class.raw())
    }

    fn get_size(&self, handle: RawHandle) -> Result<TypeSize> {
        let inner = self.lock();
        Ok(entry(&inner, handle)?.record.size)
    }

    fn set_size(&self, handle: RawHandle, size: TypeSize) -> Result<()> {
        let mut inner = self.lock();
        let entry = entry_mut(&mut inner, handle)?;
        if entry.builtin {
            return Err(TypeError::ImmutableType(handle));
        }
        if size == TypeSize::Fixed(0) {
            return Err(TypeError::InvalidSize {
                class: entry.record.class,
                size,
            });
        }
        entry.record.size = size;
        // A resized type no longer matches the built-in it came from.
        entry.record.origin = None;
        Ok(())
    }

    fn get_native_type(&self, handle: RawHandle, direction: SearchDirection) -> Result<RawHandle> {
        let record = {
            let inner = self.lock();
            entry(&inner, handle)?.record.clone()
        };
        let matched = match record.origin {
            Some(native) => Some(native),
            None => match direction {
                SearchDirection::Ascend => self.ascend_match(&record),
                SearchDirection::Descend => {
                    let size = record.size.fixed();
                    size.and_then(|size| {
                        NativeType::ALL.into_iter().rev().find(|nt| {
                            nt.class() == record.class
                                && nt.size() >= size
                                && nt.signed() == record.signed
                        })
                    })
                }
            },
        };
        match matched {
            Some(native) => self.copy_type(self.native_handle(native)),
            // No canonical native form; the type is its own native form.
            None => self.copy_type(handle),
        }
    }

    fn get_order(&self, handle: RawHandle) -> Result<i32> {
        let inner = self.lock();
        Ok(entry(&inner, handle)?.record.order.raw())
    }

    fn set_order(&self, handle: RawHandle, order_tag: i32) -> Result<()> {
        let order = ByteOrder::from_raw(order_tag)?;
        // The Error tag marks corruption; it never lands on a live record.
        if order == ByteOrder::Error {
            return Err(TypeError::InvalidOrderTag(order_tag));
        }
        let mut inner = self.lock();
        let entry = entry_mut(&mut inner, handle)?;
        if entry.builtin {
            return Err(TypeError::ImmutableType(handle));
        }
        if !entry.record.class.is_orderable() {
            return Err(TypeError::OrderNotApplicable(entry.record.class));
        }
        entry.record.order = order;
        Ok(())
    }

    fn close_type(&self, handle: RawHandle) -> Result<()> {
        let mut inner = self.lock();
        match inner.entries.get(&handle) {
            None => return Err(TypeError::InvalidHandle(handle)),
            Some(e) if e.builtin => return Err(TypeError::ImmutableType(handle)),
            Some(_) => {}
        }
        inner.entries.remove(&handle);
        inner.open_count -= 1;
        log::trace!("closed type {handle}");
        Ok(())
    }

    fn snapshot(&self, handle: RawHandle) -> Result<TypeRecord> {
        let inner = self.lock();
        Ok(entry(&inner, handle)?.record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_query() {
        let engine = MemoryTypeEngine::new();
        let h = engine
            .create_type(DataClass::Integer.raw(), TypeSize::Fixed(4))
            .unwrap();
        assert_eq!(engine.get_class(h).unwrap(), DataClass::Integer.raw());
        assert_eq!(engine.get_size(h).unwrap(), TypeSize::Fixed(4));
        engine.close_type(h).unwrap();
    }

    #[test]
    fn create_rejects_zero_size() {
        let engine = MemoryTypeEngine::new();
        let err = engine
            .create_type(DataClass::Integer.raw(), TypeSize::Fixed(0))
            .unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidSize {
                class: DataClass::Integer,
                size: TypeSize::Fixed(0)
            }
        );
    }

    #[test]
    fn create_allows_variable_size_only_for_strings() {
        let engine = MemoryTypeEngine::new();
        let s = engine
            .create_type(DataClass::String.raw(), TypeSize::Variable)
            .unwrap();
        assert_eq!(engine.get_size(s).unwrap(), TypeSize::Variable);
        engine.close_type(s).unwrap();

        for class in [DataClass::Integer, DataClass::Float, DataClass::Opaque] {
            assert_eq!(
                engine.create_type(class.raw(), TypeSize::Variable),
                Err(TypeError::InvalidSize {
                    class,
                    size: TypeSize::Variable
                })
            );
        }
    }

    #[test]
    fn create_rejects_base_typed_classes() {
        let engine = MemoryTypeEngine::new();
        for class in [DataClass::Reference, DataClass::VarLength, DataClass::Array] {
            assert_eq!(
                engine.create_type(class.raw(), TypeSize::Fixed(8)),
                Err(TypeError::InvalidClassForCreate(class))
            );
        }
    }

    #[test]
    fn create_rejects_unknown_class_tag() {
        let engine = MemoryTypeEngine::new();
        assert_eq!(
            engine.create_type(42, TypeSize::Fixed(4)),
            Err(TypeError::InvalidClassTag(42))
        );
    }

    #[test]
    fn close_is_exactly_once() {
        let engine = MemoryTypeEngine::new();
        let h = engine
            .create_type(DataClass::Opaque.raw(), TypeSize::Fixed(16))
            .unwrap();
        engine.close_type(h).unwrap();
        assert_eq!(engine.close_type(h), Err(TypeError::InvalidHandle(h)));
        assert_eq!(engine.get_class(h), Err(TypeError::InvalidHandle(h)));
    }

    #[test]
    fn builtins_refuse_close_and_mutation() {
        let engine = MemoryTypeEngine::new();
        let h = engine.native_handle(NativeType::Int32);
        assert_eq!(engine.close_type(h), Err(TypeError::ImmutableType(h)));
        assert_eq!(
            engine.set_order(h, ByteOrder::BigEndian.raw()),
            Err(TypeError::ImmutableType(h))
        );
    }

    #[test]
    fn copy_is_independent() {
        let engine = MemoryTypeEngine::new();
        let a = engine
            .create_type(DataClass::Integer.raw(), TypeSize::Fixed(4))
            .unwrap();
        let b = engine.copy_type(a).unwrap();
        assert_ne!(a, b);
        engine.set_order(b, ByteOrder::BigEndian.raw()).unwrap();
        assert_eq!(engine.get_order(a).unwrap(), ByteOrder::LittleEndian.raw());
        assert_eq!(engine.get_order(b).unwrap(), ByteOrder::BigEndian.raw());
        engine.close_type(a).unwrap();
        engine.close_type(b).unwrap();
    }

    #[test]
    fn set_order_rejects_non_orderable_classes() {
        let engine = MemoryTypeEngine::new();
        let h = engine
            .create_type(DataClass::String.raw(), TypeSize::Fixed(8))
            .unwrap();
        assert_eq!(
            engine.set_order(h, ByteOrder::BigEndian.raw()),
            Err(TypeError::OrderNotApplicable(DataClass::String))
        );
        engine.close_type(h).unwrap();
    }

    #[test]
    fn set_order_rejects_unknown_tag() {
        let engine = MemoryTypeEngine::new();
        let h = engine
            .create_type(DataClass::Integer.raw(), TypeSize::Fixed(4))
            .unwrap();
        assert_eq!(engine.set_order(h, 9), Err(TypeError::InvalidOrderTag(9)));
        engine.close_type(h).unwrap();
    }

    #[test]
    fn set_order_rejects_the_error_tag() {
        let engine = MemoryTypeEngine::new();
        let h = engine
            .create_type(DataClass::Integer.raw(), TypeSize::Fixed(4))
            .unwrap();
        assert_eq!(
            engine.set_order(h, ByteOrder::Error.raw()),
            Err(TypeError::InvalidOrderTag(-1))
        );
        // The record keeps its previous order.
        assert_eq!(engine.get_order(h).unwrap(), ByteOrder::LittleEndian.raw());
        engine.close_type(h).unwrap();
    }

    #[test]
    fn native_resolution_prefers_origin() {
        let engine = MemoryTypeEngine::new();
        // A copy of the platform Int built-in resolves back to Int even
        // when a fixed-width built-in has the identical layout.
        let copy = engine.copy_type(engine.native_handle(NativeType::Int)).unwrap();
        let native = engine.get_native_type(copy, SearchDirection::Ascend).unwrap();
        assert!(engine
            .equal(native, engine.native_handle(NativeType::Int))
            .unwrap());
        engine.close_type(native).unwrap();
        engine.close_type(copy).unwrap();
    }

    #[test]
    fn native_resolution_widens_created_integers() {
        let engine = MemoryTypeEngine::new();
        let h = engine
            .create_type(DataClass::Integer.raw(), TypeSize::Fixed(3))
            .unwrap();
        let native = engine.get_native_type(h, SearchDirection::Ascend).unwrap();
        assert!(engine
            .equal(native, engine.native_handle(NativeType::Int32))
            .unwrap());
        engine.close_type(native).unwrap();
        engine.close_type(h).unwrap();
    }

    #[test]
    fn descending_resolution_prefers_the_widest_match() {
        let engine = MemoryTypeEngine::new();
        let h = engine
            .create_type(DataClass::Integer.raw(), TypeSize::Fixed(3))
            .unwrap();
        let native = engine.get_native_type(h, SearchDirection::Descend).unwrap();
        assert!(engine
            .equal(native, engine.native_handle(NativeType::Int64))
            .unwrap());
        engine.close_type(native).unwrap();
        engine.close_type(h).unwrap();
    }

    #[test]
    fn native_resolution_of_compound_is_a_self_copy() {
        let engine = MemoryTypeEngine::new();
        let h = engine
            .create_type(DataClass::Compound.raw(), TypeSize::Fixed(12))
            .unwrap();
        let native = engine.get_native_type(h, SearchDirection::Ascend).unwrap();
        assert_ne!(native, h);
        assert!(engine.equal(native, h).unwrap());
        engine.close_type(native).unwrap();
        engine.close_type(h).unwrap();
    }

    #[test]
    fn open_type_budget() {
        let engine = MemoryTypeEngine::with_options(EngineOptions { max_open_types: 2 });
        let a = engine
            .create_type(DataClass::Integer.raw(), TypeSize::Fixed(4))
            .unwrap();
        let _b = engine.copy_type(a).unwrap();
        assert_eq!(
            engine.copy_type(a),
            Err(TypeError::TooManyOpenTypes(2))
        );
        engine.close_type(a).unwrap();
        assert!(engine.copy_type(_b).is_ok());
    }

    #[test]
    fn resized_type_loses_builtin_identity() {
        let engine = MemoryTypeEngine::new();
        let h = engine.copy_type(engine.string_handle()).unwrap();
        engine.set_size(h, TypeSize::Variable).unwrap();
        assert_eq!(engine.get_size(h).unwrap(), TypeSize::Variable);
        engine.close_type(h).unwrap();
    }
}
