//! Engine-resident type records and their portable wire encoding.
//!
//! A [`TypeRecord`] is the structural description the engine stores per
//! handle. [`TypeRecord::to_message_bytes`] renders it as a portable
//! datatype message (8-byte class/version/bit-field/size header followed
//! by class-specific properties) for embedding by a container layer.

use byteorder::{ByteOrder as _, LittleEndian};

use crate::datatype::{ByteOrder, DataClass, NativeType, TypeSize};

/// Message size field used for variable-length types: pointer plus
/// length, matching the in-memory representation of a vlen slot.
const VARLEN_SLOT_BYTES: u32 = 16;

/// Structural description of one engine-resident type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRecord {
    /// Type class.
    pub class: DataClass,
    /// Size of one value, or the variable-length sentinel.
    pub size: TypeSize,
    /// Byte order; `None` for classes where order does not apply.
    pub order: ByteOrder,
    /// Signedness for integer records; floats store `true`.
    pub signed: bool,
    /// The built-in native type this record was copied from, if any.
    /// Preserved across `copy_type` so native-type resolution is
    /// identity-preserving for built-ins.
    pub origin: Option<NativeType>,
}

impl TypeRecord {
    /// Record for a built-in native type.
    pub fn for_native(native: NativeType) -> TypeRecord {
        TypeRecord {
            class: native.class(),
            size: TypeSize::Fixed(native.size()),
            order: if native.size() > 1 {
                ByteOrder::LittleEndian
            } else {
                ByteOrder::None
            },
            signed: native.signed(),
            origin: Some(native),
        }
    }

    /// Record for the built-in single-byte character string type.
    pub fn c_string() -> TypeRecord {
        TypeRecord {
            class: DataClass::String,
            size: TypeSize::Fixed(1),
            order: ByteOrder::None,
            signed: false,
            origin: None,
        }
    }

    /// Default record for a freshly created (class, size) type.
    pub fn for_class(class: DataClass, size: TypeSize) -> TypeRecord {
        let order = if class.is_orderable() {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::None
        };
        TypeRecord {
            class,
            size,
            order,
            signed: matches!(class, DataClass::Integer | DataClass::Float),
            origin: None,
        }
    }

    /// Size of the message's size field: fixed byte count, or the vlen
    /// slot size for variable-length records.
    fn message_size(&self) -> u32 {
        match self.size {
            TypeSize::Fixed(n) => n,
            TypeSize::Variable => VARLEN_SLOT_BYTES,
        }
    }

    /// Encode this record as a portable datatype message.
    pub fn to_message_bytes(&self) -> Vec<u8> {
        let size = self.message_size();
        let bits = size.saturating_mul(8).min(u16::MAX as u32) as u16;
        match self.class {
            DataClass::Integer => {
                let mut bf0 = 0u8;
                if self.order == ByteOrder::BigEndian {
                    bf0 |= 0x01;
                }
                if self.signed {
                    bf0 |= 0x08;
                }
                let mut buf = build_header(0, 1, [bf0, 0, 0], size);
                push_bit_range(&mut buf, 0, bits);
                buf
            }
            DataClass::Float => {
                let mut bf0 = 0x20u8; // sign bit location flag
                match self.order {
                    ByteOrder::BigEndian => bf0 |= 0x01,
                    ByteOrder::Vax => bf0 |= 0x40,
                    _ => {}
                }
                let mut buf = build_header(1, 1, [bf0, 0x3f, 0], size);
                push_bit_range(&mut buf, 0, bits);
                let (exp_loc, exp_size, mant_size, bias): (u8, u8, u8, u32) = if size == 8 {
                    (52, 11, 52, 1023)
                } else {
                    (23, 8, 23, 127)
                };
                buf.push(exp_loc);
                buf.push(exp_size);
                buf.push(0); // mantissa location
                buf.push(mant_size);
                let mut bias_bytes = [0u8; 4];
                LittleEndian::write_u32(&mut bias_bytes, bias);
                buf.extend_from_slice(&bias_bytes);
                buf
            }
            DataClass::String => match self.size {
                // Fixed string: null-terminated ASCII.
                TypeSize::Fixed(_) => build_header(3, 1, [0, 0, 0], size),
                // Variable-length string: vlen message wrapping the
                // single-byte character base type.
                TypeSize::Variable => {
                    let mut buf = build_header(9, 1, [0x01, 0, 0], VARLEN_SLOT_BYTES);
                    buf.extend_from_slice(&TypeRecord::c_string().to_message_bytes());
                    buf
                }
            },
            DataClass::BitField => {
                let bf0 = if self.order == ByteOrder::BigEndian { 0x01 } else { 0 };
                let mut buf = build_header(4, 1, [bf0, 0, 0], size);
                push_bit_range(&mut buf, 0, bits);
                buf
            }
            DataClass::Time => {
                let mut buf = build_header(2, 1, [0, 0, 0], size);
                let mut prec = [0u8; 2];
                LittleEndian::write_u16(&mut prec, bits);
                buf.extend_from_slice(&prec);
                buf
            }
            DataClass::Opaque => build_header(5, 1, [0, 0, 0], size),
            // Sub-structured classes carry their members elsewhere; the
            // bare header still identifies class and size.
            other => {
                debug_assert!(other != DataClass::NoClass, "NoClass on a live record");
                build_header(other.raw() as u8, 1, [0, 0, 0], size)
            }
        }
    }
}

/// 8-byte message header: class+version, 24-bit class bit field, size.
fn build_header(class: u8, version: u8, bf: [u8; 3], size: u32) -> Vec<u8> {
    let mut buf = vec![0u8; 8];
    buf[0] = (class & 0x0F) | ((version & 0x0F) << 4);
    buf[1] = bf[0];
    buf[2] = bf[1];
    buf[3] = bf[2];
    LittleEndian::write_u32(&mut buf[4..8], size);
    buf
}

/// Append a (bit offset, bit precision) property pair.
fn push_bit_range(buf: &mut Vec<u8>, offset: u16, precision: u16) {
    let mut props = [0u8; 4];
    LittleEndian::write_u16(&mut props[0..2], offset);
    LittleEndian::write_u16(&mut props[2..4], precision);
    buf.extend_from_slice(&props);
}
