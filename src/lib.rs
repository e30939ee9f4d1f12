//! Binary data-type descriptions for a handle-based typed-storage
//! engine.
//!
//! This crate implements the type-description subsystem an HDF5-style
//! storage engine needs: portable descriptors for stored values (class,
//! size, byte order), a registry bridging native machine types to
//! engine handles, and strict exactly-once handle ownership. The engine
//! boundary is the [`TypeEngine`] trait; [`MemoryTypeEngine`] is a real
//! in-memory implementation.
//!
//! ```
//! use typedesc::{ByteOrder, DataClass, NativeType, TypeSize, TypeSystem};
//!
//! let ts = TypeSystem::new();
//!
//! let mut counter = ts.create(DataClass::Integer, TypeSize::Fixed(4));
//! counter.set_order(ByteOrder::BigEndian).unwrap();
//! assert_eq!(counter.order().unwrap(), ByteOrder::BigEndian);
//!
//! let temperature = ts.create_double();
//! assert_eq!(temperature.native_type().unwrap(), Some(NativeType::Double));
//!
//! let label = ts.create_string();
//! assert!(label.size().unwrap().is_variable());
//! ```

pub mod datatype;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod handle;
pub mod record;
pub mod registry;

pub use datatype::{ByteOrder, DataClass, NativeType, TypeSize};
pub use descriptor::{Datatype, TypeSystem};
pub use engine::{
    EngineOptions, MemoryTypeEngine, RawHandle, SearchDirection, TypeEngine,
    DEFAULT_MAX_OPEN_TYPES,
};
pub use error::{Result, TypeError};
pub use handle::OwnedHandle;
pub use record::TypeRecord;
pub use registry::TypeRegistry;
