//! Owning wrapper around a raw engine handle.

use std::fmt;
use std::sync::Arc;

use crate::engine::{RawHandle, TypeEngine};
use crate::error::Result;

/// Owns one engine handle and releases it exactly once.
///
/// Dropping the wrapper closes the handle; [`OwnedHandle::close`] does
/// the same but surfaces the engine's result. There is no `Clone` —
/// duplicating a handle goes through the engine's `copy_type`, never
/// through bitwise copies that would double-release.
pub struct OwnedHandle {
    engine: Arc<dyn TypeEngine>,
    raw: Option<RawHandle>,
}

impl OwnedHandle {
    /// Take ownership of `raw`, which must have been minted by `engine`.
    pub fn new(engine: Arc<dyn TypeEngine>, raw: RawHandle) -> OwnedHandle {
        OwnedHandle {
            engine,
            raw: Some(raw),
        }
    }

    /// The wrapped raw handle.
    pub fn raw(&self) -> RawHandle {
        // `raw` is only None after into_raw/close, both of which consume self.
        self.raw.expect("handle accessed after release")
    }

    /// The engine this handle belongs to.
    pub fn engine(&self) -> &Arc<dyn TypeEngine> {
        &self.engine
    }

    /// Release now, surfacing the engine's result.
    pub fn close(mut self) -> Result<()> {
        match self.raw.take() {
            Some(raw) => self.engine.close_type(raw),
            None => Ok(()),
        }
    }

    /// Transfer ownership out; the caller becomes responsible for
    /// releasing the raw handle.
    pub fn into_raw(mut self) -> RawHandle {
        self.raw.take().expect("handle accessed after release")
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        if let Some(raw) = self.raw.take() {
            // Nothing useful to do with a close failure during drop.
            let _ = self.engine.close_type(raw);
        }
    }
}

impl fmt::Debug for OwnedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedHandle").field("raw", &self.raw).finish()
    }
}
