use crate::core::error::{Error, ErrorKind, Result};

/// Bytes reserved at the front of every volume. Holds the committed
/// logical size as a little-endian u64, so position 0 is never a record
/// and a zero pointer can serve as the "no value" sentinel.
pub const STORE_HEADER_SIZE: u64 = 8;

/// Byte-addressable volume underlying every map. Positions handed out by
/// `allocate` are stable for the life of the volume; writes are visible
/// to subsequent reads in-process, durable only after `commit`.
pub trait Store: Send + Sync {
    /// Reserve `size` bytes, returning the previous logical size as the
    /// new record's position.
    fn allocate(&self, size: usize) -> Result<u64>;

    /// Positional read into a caller-supplied (typically pooled) buffer.
    /// No shared cursor; threads may read disjoint regions concurrently.
    fn read_into(&self, position: u64, buf: &mut [u8]) -> Result<()>;

    /// Positional read returning a fresh buffer.
    fn read(&self, position: u64, size: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; size];
        self.read_into(position, &mut buf)?;
        Ok(buf)
    }

    /// Positional write. Overlapping concurrent writes are not ordered
    /// by the store.
    fn write(&self, data: &[u8], position: u64) -> Result<()>;

    /// Current logical size (next allocation position).
    fn file_size(&self) -> u64;

    /// Persist the logical size into the store header and flush to the
    /// durable medium.
    fn commit(&self) -> Result<()>;

    /// Commit and release the volume. The handle stays usable for
    /// in-memory reads until dropped.
    fn close(&self) -> Result<()>;

    /// Truncate back to an empty volume, keeping the handle.
    fn reset(&self) -> Result<()>;

    /// Remove the underlying volume entirely.
    fn delete(&self) -> Result<()>;

    fn read_u8(&self, position: u64) -> Result<u8> {
        let bytes = self.read(position, 1)?;
        Ok(bytes[0])
    }

    fn write_u8(&self, value: u8, position: u64) -> Result<()> {
        self.write(&[value], position)
    }

    fn read_u32(&self, position: u64) -> Result<u32> {
        let bytes = self.read(position, 4)?;
        let arr: [u8; 4] = bytes.as_slice().try_into().map_err(|_| {
            Error::new(ErrorKind::Corrupt, format!("short u32 read at {}", position))
        })?;
        Ok(u32::from_le_bytes(arr))
    }

    fn write_u32(&self, value: u32, position: u64) -> Result<()> {
        self.write(&value.to_le_bytes(), position)
    }

    fn read_u64(&self, position: u64) -> Result<u64> {
        let bytes = self.read(position, 8)?;
        let arr: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
            Error::new(ErrorKind::Corrupt, format!("short u64 read at {}", position))
        })?;
        Ok(u64::from_le_bytes(arr))
    }

    fn write_u64(&self, value: u64, position: u64) -> Result<()> {
        self.write(&value.to_le_bytes(), position)
    }
}
