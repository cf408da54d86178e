use bytes::{BufMut, BytesMut};

use crate::codec::tags::TypeTag;
use crate::codec::value::Value;
use crate::core::error::{Error, ErrorKind, Result};

/// Serialize one value graph: a leading tag per value, scalars
/// little-endian, strings/arrays length-prefixed, objects recursive.
pub fn to_buffer(value: &Value) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(64);
    write_value(&mut buf, value);
    buf.to_vec()
}

/// Decode one value graph from its byte form.
pub fn from_buffer(bytes: &[u8]) -> Result<Value> {
    let mut reader = Reader::new(bytes);
    read_value(&mut reader)
}

/// Decode a single named field of an encoded object, skipping every
/// other value without materializing it.
pub fn read_attribute(bytes: &[u8], field: &str) -> Result<Value> {
    let mut reader = Reader::new(bytes);
    let tag = TypeTag::from_byte(reader.read_u8()?)?;
    if tag != TypeTag::Object {
        return Err(Error::new(
            ErrorKind::AttributeMismatch,
            format!("record is {:?}, not an object", tag),
        ));
    }
    let field_count = reader.read_u32()?;
    for _ in 0..field_count {
        let name = reader.read_string()?;
        if name == field {
            return read_value(&mut reader);
        }
        skip_value(&mut reader)?;
    }
    Err(Error::new(
        ErrorKind::NotFound,
        format!("attribute {} not present in record", field),
    ))
}

fn write_value(buf: &mut BytesMut, value: &Value) {
    buf.put_u8(value.tag() as u8);
    match value {
        Value::Null => {}
        Value::Bool(v) => buf.put_u8(*v as u8),
        Value::Int(v) => buf.put_i32_le(*v),
        Value::Long(v) => buf.put_i64_le(*v),
        Value::ULong(v) => buf.put_u64_le(*v),
        Value::Float(v) => buf.put_f32_le(*v),
        Value::Double(v) => buf.put_f64_le(*v),
        Value::String(s) => {
            buf.put_u32_le(s.len() as u32);
            buf.put_slice(s.as_bytes());
        }
        Value::Bytes(b) => {
            buf.put_u32_le(b.len() as u32);
            buf.put_slice(b);
        }
        Value::IntArray(items) => {
            buf.put_u32_le(items.len() as u32);
            for v in items {
                buf.put_i32_le(*v);
            }
        }
        Value::LongArray(items) => {
            buf.put_u32_le(items.len() as u32);
            for v in items {
                buf.put_i64_le(*v);
            }
        }
        Value::List(items) => {
            buf.put_u32_le(items.len() as u32);
            for item in items {
                write_value(buf, item);
            }
        }
        Value::Object(fields) => {
            buf.put_u32_le(fields.len() as u32);
            for (name, field) in fields {
                buf.put_u32_le(name.len() as u32);
                buf.put_slice(name.as_bytes());
                write_value(buf, field);
            }
        }
    }
}

fn read_value(reader: &mut Reader) -> Result<Value> {
    let tag = TypeTag::from_byte(reader.read_u8()?)?;
    Ok(match tag {
        TypeTag::Null => Value::Null,
        TypeTag::Bool => Value::Bool(reader.read_u8()? != 0),
        TypeTag::Int => Value::Int(reader.read_i32()?),
        TypeTag::Long => Value::Long(reader.read_i64()?),
        TypeTag::ULong => Value::ULong(reader.read_u64()?),
        TypeTag::Float => Value::Float(f32::from_le_bytes(reader.take(4)?.try_into().unwrap())),
        TypeTag::Double => Value::Double(f64::from_le_bytes(reader.take(8)?.try_into().unwrap())),
        TypeTag::String => Value::String(reader.read_string()?),
        TypeTag::Bytes => {
            let len = reader.read_u32()? as usize;
            Value::Bytes(reader.take(len)?.to_vec())
        }
        TypeTag::IntArray => {
            let count = reader.read_u32()? as usize;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(reader.read_i32()?);
            }
            Value::IntArray(items)
        }
        TypeTag::LongArray => {
            let count = reader.read_u32()? as usize;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(reader.read_i64()?);
            }
            Value::LongArray(items)
        }
        TypeTag::List => {
            let count = reader.read_u32()? as usize;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(read_value(reader)?);
            }
            Value::List(items)
        }
        TypeTag::Object => {
            let count = reader.read_u32()? as usize;
            let mut fields = Vec::with_capacity(count);
            for _ in 0..count {
                let name = reader.read_string()?;
                fields.push((name, read_value(reader)?));
            }
            Value::Object(fields)
        }
    })
}

/// Advance past one encoded value without building it.
fn skip_value(reader: &mut Reader) -> Result<()> {
    let tag = TypeTag::from_byte(reader.read_u8()?)?;
    match tag {
        TypeTag::Null => {}
        TypeTag::Bool => reader.skip(1)?,
        TypeTag::Int | TypeTag::Float => reader.skip(4)?,
        TypeTag::Long | TypeTag::ULong | TypeTag::Double => reader.skip(8)?,
        TypeTag::String | TypeTag::Bytes => {
            let len = reader.read_u32()? as usize;
            reader.skip(len)?;
        }
        TypeTag::IntArray => {
            let count = reader.read_u32()? as usize;
            reader.skip(count * 4)?;
        }
        TypeTag::LongArray => {
            let count = reader.read_u32()? as usize;
            reader.skip(count * 8)?;
        }
        TypeTag::List => {
            let count = reader.read_u32()? as usize;
            for _ in 0..count {
                skip_value(reader)?;
            }
        }
        TypeTag::Object => {
            let count = reader.read_u32()? as usize;
            for _ in 0..count {
                let len = reader.read_u32()? as usize;
                reader.skip(len)?;
                skip_value(reader)?;
            }
        }
    }
    Ok(())
}

/// Bounds-checked cursor; a truncated buffer is a serialization error,
/// never a panic.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.buf.len() {
            return Err(Error::new(
                ErrorKind::Serialization,
                format!(
                    "buffer underflow: need {} bytes at offset {}, have {}",
                    n,
                    self.pos,
                    self.buf.len() - self.pos
                ),
            ));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn read_string(&mut self) -> Result<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| {
            Error::new(ErrorKind::Serialization, format!("invalid utf8: {}", e))
        })
    }
}
