//! Error types for the datatype layer.

use crate::datatype::{DataClass, NativeType, TypeSize};
use crate::engine::RawHandle;

/// Errors that can occur when querying or mutating datatypes.
///
/// Construction failures in [`crate::TypeSystem`] do not appear here;
/// they abort, because a half-built descriptor cannot be used safely.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    /// The handle was released, never allocated, or otherwise dead.
    #[error("invalid type handle: {0}")]
    InvalidHandle(RawHandle),

    /// The registry has no engine handle for this native type.
    #[error("native type {0:?} is not registered")]
    UnsupportedType(NativeType),

    /// The engine reported a class tag outside the known enumeration.
    #[error("cannot decode class tag {0}")]
    InvalidClassTag(i32),

    /// The engine reported a byte-order tag outside the known enumeration.
    #[error("cannot decode byte-order tag {0}")]
    InvalidOrderTag(i32),

    /// The class cannot be constructed from a bare (class, size) pair.
    #[error("class {0:?} cannot be created from a (class, size) pair")]
    InvalidClassForCreate(DataClass),

    /// The size is not valid for the requested class.
    #[error("invalid size {size} for class {class:?}")]
    InvalidSize {
        /// Requested class.
        class: DataClass,
        /// Requested size.
        size: TypeSize,
    },

    /// Byte order is not meaningful for this type class.
    #[error("byte order is not applicable to class {0:?}")]
    OrderNotApplicable(DataClass),

    /// The handle refers to an engine built-in, which cannot be
    /// mutated or closed.
    #[error("handle {0} is an immutable built-in type")]
    ImmutableType(RawHandle),

    /// The engine's open-type budget is exhausted.
    #[error("too many open types (limit {0})")]
    TooManyOpenTypes(usize),
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, TypeError>;
