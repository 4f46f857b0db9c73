//! Read serialized data.

use crate::error::ReadError;
use crate::{LONG_LENGTH_PREFIX, MAX_SHORT_LEN};

/// A cursor over a buffer of serialized data.
#[derive(Clone, Debug)]
pub struct Reader<'data> {
    data: &'data [u8],
    offset: usize,
}

impl<'data> Reader<'data> {
    /// Construct a new reader at the start of `data`.
    #[inline]
    pub fn new(data: &'data [u8]) -> Reader<'data> {
        Reader { data, offset: 0 }
    }

    /// The current offset into the buffer.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The number of bytes left to read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Check that there is enough data left in the buffer for the given number
    /// of bytes to be read.
    #[inline]
    pub fn check_available(&self, bytes: usize) -> Result<(), ReadError> {
        match self.offset.checked_add(bytes) {
            Some(end) if end <= self.data.len() => Ok(()),
            Some(_) | None => Err(ReadError::TruncatedStream {
                offset: self.offset,
                needed: bytes - self.remaining(),
            }),
        }
    }

    /// Read a slice of `len` bytes.
    pub fn read_slice(&mut self, len: usize) -> Result<&'data [u8], ReadError> {
        self.check_available(len)?;
        let slice = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ReadError> {
        let mut buf = [0; N];
        buf.copy_from_slice(self.read_slice(N)?);
        Ok(buf)
    }

    pub fn read_u8(&mut self) -> Result<u8, ReadError> {
        let [byte] = self.read_array()?;
        Ok(byte)
    }

    /// Read a raw 32-bit unsigned integer, as used by `#` fields.
    pub fn read_nat(&mut self) -> Result<u32, ReadError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_int(&mut self) -> Result<i32, ReadError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_long(&mut self) -> Result<i64, ReadError> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_double(&mut self) -> Result<f64, ReadError> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// Read a 4-byte combinator number.
    pub fn read_number(&mut self) -> Result<u32, ReadError> {
        self.read_nat()
    }

    /// Read a combinator number, failing if it is not `number`.
    pub fn expect_number(&mut self, number: u32) -> Result<(), ReadError> {
        match self.read_number()? {
            found if found == number => Ok(()),
            found => Err(ReadError::UnknownDiscriminant { number: found }),
        }
    }

    /// Read a length-prefixed, padded byte sequence.
    pub fn read_bytes(&mut self) -> Result<&'data [u8], ReadError> {
        let start = self.offset;
        let (prefix_len, len) = match self.read_u8()? {
            len if len <= MAX_SHORT_LEN => (1, usize::from(len)),
            LONG_LENGTH_PREFIX => {
                let [b0, b1, b2] = self.read_array()?;
                (4, u32::from_le_bytes([b0, b1, b2, 0]) as usize)
            }
            _ => return Err(ReadError::InvalidLengthPrefix { offset: start }),
        };
        let bytes = self.read_slice(len)?;
        self.read_slice(crate::padding(prefix_len + len))?;
        Ok(bytes)
    }

    /// Read a length-prefixed, padded UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, ReadError> {
        let offset = self.offset;
        let bytes = self.read_bytes()?;
        match std::str::from_utf8(bytes) {
            Ok(string) => Ok(string.to_owned()),
            Err(_) => Err(ReadError::InvalidUtf8 { offset }),
        }
    }

    pub fn read<T: crate::Deserialize>(&mut self) -> Result<T, ReadError> {
        T::deserialize(self)
    }
}
