//! Bidirectional mapping between native machine types and engine
//! handles.

use std::fmt;
use std::sync::Arc;

use crate::datatype::NativeType;
use crate::engine::{RawHandle, TypeEngine};
use crate::error::{Result, TypeError};

/// Immutable table mapping [`NativeType`] tags to the engine's canonical
/// built-in handles.
///
/// Constructed explicitly and passed where needed, never an ambient
/// global, so tests can substitute partial fixtures. Read-only after
/// construction.
pub struct TypeRegistry {
    engine: Arc<dyn TypeEngine>,
    entries: Vec<(NativeType, RawHandle)>,
}

impl TypeRegistry {
    /// Build the full table covering every native type the engine
    /// defines.
    pub fn from_engine(engine: Arc<dyn TypeEngine>) -> TypeRegistry {
        let entries = NativeType::ALL
            .into_iter()
            .map(|native| (native, engine.native_handle(native)))
            .collect();
        TypeRegistry { engine, entries }
    }

    /// Build a registry over an explicit (possibly partial) table.
    pub fn new(engine: Arc<dyn TypeEngine>, entries: Vec<(NativeType, RawHandle)>) -> TypeRegistry {
        TypeRegistry { engine, entries }
    }

    /// Canonical engine handle for a native type.
    pub fn resolve(&self, native: NativeType) -> Result<RawHandle> {
        self.entries
            .iter()
            .find(|(nt, _)| *nt == native)
            .map(|(_, handle)| *handle)
            .ok_or(TypeError::UnsupportedType(native))
    }

    /// Inverse lookup: which native type, if any, `handle` structurally
    /// matches.
    ///
    /// `Ok(None)` is the normal outcome for compound, variable-length,
    /// and other custom types; only a dead handle is an error.
    pub fn identify(&self, handle: RawHandle) -> Result<Option<NativeType>> {
        for (native, builtin) in &self.entries {
            if self.engine.equal(handle, *builtin)? {
                return Ok(Some(*native));
            }
        }
        Ok(None)
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("entries", &self.entries)
            .finish()
    }
}
