use crate::core::error::{Error, ErrorKind, Result};

/// Leading type tag written before every encoded value. Null is its own
/// tag, never absence of bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TypeTag {
    Null = 0,
    Bool = 1,
    Int = 2,
    Long = 3,
    ULong = 4,
    Float = 5,
    Double = 6,
    String = 7,
    Bytes = 8,
    IntArray = 9,
    LongArray = 10,
    List = 11,
    Object = 12,
}

impl TypeTag {
    pub fn from_byte(b: u8) -> Result<TypeTag> {
        Ok(match b {
            0 => TypeTag::Null,
            1 => TypeTag::Bool,
            2 => TypeTag::Int,
            3 => TypeTag::Long,
            4 => TypeTag::ULong,
            5 => TypeTag::Float,
            6 => TypeTag::Double,
            7 => TypeTag::String,
            8 => TypeTag::Bytes,
            9 => TypeTag::IntArray,
            10 => TypeTag::LongArray,
            11 => TypeTag::List,
            12 => TypeTag::Object,
            other => {
                return Err(Error::new(
                    ErrorKind::Serialization,
                    format!("unknown type tag {}", other),
                ));
            }
        })
    }
}
