//! Core datatype enumerations: type class, byte order, native types,
//! and the variable-length size sentinel.
//!
//! Raw integer tags cross the engine boundary; decoding them back into
//! enums is fallible and never panics on out-of-range values.

use core::fmt;

use crate::error::TypeError;

/// Structural kind of a stored value.
///
/// `NoClass` is the error/uninitialized tag and never appears on a live
/// descriptor; the engine reports dead handles as errors instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataClass {
    NoClass,
    Integer,
    Float,
    Time,
    String,
    BitField,
    Opaque,
    Compound,
    Reference,
    Enum,
    VarLength,
    Array,
}

impl DataClass {
    /// Raw engine tag for this class.
    pub fn raw(self) -> i32 {
        match self {
            DataClass::NoClass => -1,
            DataClass::Integer => 0,
            DataClass::Float => 1,
            DataClass::Time => 2,
            DataClass::String => 3,
            DataClass::BitField => 4,
            DataClass::Opaque => 5,
            DataClass::Compound => 6,
            DataClass::Reference => 7,
            DataClass::Enum => 8,
            DataClass::VarLength => 9,
            DataClass::Array => 10,
        }
    }

    /// Decode a raw engine class tag.
    pub fn from_raw(tag: i32) -> Result<DataClass, TypeError> {
        Ok(match tag {
            -1 => DataClass::NoClass,
            0 => DataClass::Integer,
            1 => DataClass::Float,
            2 => DataClass::Time,
            3 => DataClass::String,
            4 => DataClass::BitField,
            5 => DataClass::Opaque,
            6 => DataClass::Compound,
            7 => DataClass::Reference,
            8 => DataClass::Enum,
            9 => DataClass::VarLength,
            10 => DataClass::Array,
            other => return Err(TypeError::InvalidClassTag(other)),
        })
    }

    /// Whether byte order is meaningful for values of this class.
    pub fn is_orderable(self) -> bool {
        matches!(
            self,
            DataClass::Integer
                | DataClass::Float
                | DataClass::Time
                | DataClass::BitField
                | DataClass::Enum
        )
    }
}

/// Layout of multi-byte values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// Error tag; never stored on a live record.
    Error,
    LittleEndian,
    BigEndian,
    Vax,
    /// Mixed orders within one compound value.
    Mixed,
    /// Order does not apply (single-byte or non-numeric data).
    None,
}

impl ByteOrder {
    /// Raw engine tag for this order.
    pub fn raw(self) -> i32 {
        match self {
            ByteOrder::Error => -1,
            ByteOrder::LittleEndian => 0,
            ByteOrder::BigEndian => 1,
            ByteOrder::Vax => 2,
            ByteOrder::Mixed => 3,
            ByteOrder::None => 4,
        }
    }

    /// Decode a raw engine order tag.
    pub fn from_raw(tag: i32) -> Result<ByteOrder, TypeError> {
        Ok(match tag {
            -1 => ByteOrder::Error,
            0 => ByteOrder::LittleEndian,
            1 => ByteOrder::BigEndian,
            2 => ByteOrder::Vax,
            3 => ByteOrder::Mixed,
            4 => ByteOrder::None,
            other => return Err(TypeError::InvalidOrderTag(other)),
        })
    }
}

/// Canonical machine representations used to bridge in-memory values to
/// portable descriptors.
///
/// `Int` and `UInt` are the platform-width integers; the fixed-width
/// variants are exact sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeType {
    Int,
    UInt,
    Float,
    Double,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Opaque,
}

impl NativeType {
    /// Every native type, in ascending-size search order: the engine's
    /// "smallest type that can losslessly represent" resolution walks
    /// this table front to back.
    pub const ALL: [NativeType; 13] = [
        NativeType::Int8,
        NativeType::UInt8,
        NativeType::Int16,
        NativeType::UInt16,
        NativeType::Int32,
        NativeType::UInt32,
        NativeType::Int,
        NativeType::UInt,
        NativeType::Int64,
        NativeType::UInt64,
        NativeType::Float,
        NativeType::Double,
        NativeType::Opaque,
    ];

    /// Type class of this native representation.
    pub fn class(self) -> DataClass {
        match self {
            NativeType::Float | NativeType::Double => DataClass::Float,
            NativeType::Opaque => DataClass::Opaque,
            _ => DataClass::Integer,
        }
    }

    /// In-memory size in bytes.
    pub fn size(self) -> u32 {
        match self {
            NativeType::Int8 | NativeType::UInt8 | NativeType::Opaque => 1,
            NativeType::Int16 | NativeType::UInt16 => 2,
            NativeType::Int32 | NativeType::UInt32 | NativeType::Float => 4,
            NativeType::Int64 | NativeType::UInt64 | NativeType::Double => 8,
            NativeType::Int | NativeType::UInt => core::mem::size_of::<usize>() as u32,
        }
    }

    /// Whether this is a signed representation. Floats report `true`.
    pub fn signed(self) -> bool {
        matches!(
            self,
            NativeType::Int
                | NativeType::Int8
                | NativeType::Int16
                | NativeType::Int32
                | NativeType::Int64
                | NativeType::Float
                | NativeType::Double
        )
    }
}

/// Size of one stored value.
///
/// `Variable` is the variable-length sentinel: the value's length is
/// determined per instance, not by the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeSize {
    /// Fixed size in bytes.
    Fixed(u32),
    /// Variable-length sentinel.
    Variable,
}

impl TypeSize {
    /// Fixed byte count, or `None` for variable-length types.
    pub fn fixed(self) -> Option<u32> {
        match self {
            TypeSize::Fixed(n) => Some(n),
            TypeSize::Variable => None,
        }
    }

    /// Whether this is the variable-length sentinel.
    pub fn is_variable(self) -> bool {
        matches!(self, TypeSize::Variable)
    }
}

impl fmt::Display for TypeSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSize::Fixed(n) => write!(f, "{n}"),
            TypeSize::Variable => write!(f, "variable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_tag_round_trip() {
        for class in [
            DataClass::NoClass,
            DataClass::Integer,
            DataClass::Float,
            DataClass::Time,
            DataClass::String,
            DataClass::BitField,
            DataClass::Opaque,
            DataClass::Compound,
            DataClass::Reference,
            DataClass::Enum,
            DataClass::VarLength,
            DataClass::Array,
        ] {
            assert_eq!(DataClass::from_raw(class.raw()).unwrap(), class);
        }
    }

    #[test]
    fn class_tag_out_of_range() {
        assert_eq!(DataClass::from_raw(11), Err(TypeError::InvalidClassTag(11)));
        assert_eq!(DataClass::from_raw(-2), Err(TypeError::InvalidClassTag(-2)));
    }

    #[test]
    fn order_tag_out_of_range() {
        assert_eq!(ByteOrder::from_raw(5), Err(TypeError::InvalidOrderTag(5)));
        assert_eq!(ByteOrder::from_raw(0), Ok(ByteOrder::LittleEndian));
    }

    #[test]
    fn native_type_sizes() {
        assert_eq!(NativeType::Int8.size(), 1);
        assert_eq!(NativeType::UInt16.size(), 2);
        assert_eq!(NativeType::Float.size(), 4);
        assert_eq!(NativeType::Double.size(), 8);
        assert_eq!(NativeType::Int.size() as usize, core::mem::size_of::<usize>());
    }

    #[test]
    fn ascending_table_is_nondecreasing_within_integers() {
        let mut last = 0;
        for nt in NativeType::ALL {
            if nt.class() == DataClass::Integer {
                assert!(nt.size() >= last);
                last = nt.size();
            }
        }
    }

    #[test]
    fn variable_sentinel() {
        assert!(TypeSize::Variable.is_variable());
        assert_eq!(TypeSize::Variable.fixed(), None);
        assert_eq!(TypeSize::Fixed(8).fixed(), Some(8));
    }
}
