//! Write serialized data.

use crate::error::WriteError;
use crate::{LONG_LENGTH_PREFIX, MAX_BYTES_LEN, MAX_SHORT_LEN};

/// An in-memory buffer that can be written into.
#[derive(Clone, Debug, Default)]
pub struct Writer {
    buffer: Vec<u8>,
}

impl Writer {
    pub fn new() -> Writer {
        Writer { buffer: Vec::new() }
    }

    /// Get the buffer.
    pub fn into_buffer(self) -> Vec<u8> {
        self.buffer
    }

    /// Get the buffer.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn write_nat(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_int(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_long(&mut self, value: i64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_double(&mut self, value: f64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a 4-byte combinator number.
    pub fn write_number(&mut self, number: u32) {
        self.write_nat(number);
    }

    /// Write a 4-byte element count.
    pub fn write_count(&mut self, len: usize) -> Result<(), WriteError> {
        let count = u32::try_from(len).map_err(|_| WriteError::CountOverflow { len })?;
        self.write_nat(count);
        Ok(())
    }

    /// Write a length-prefixed byte sequence, padded to a multiple of 4.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), WriteError> {
        let len = bytes.len();
        let prefix_len = match len {
            len if len <= usize::from(MAX_SHORT_LEN) => {
                self.write_u8(len as u8);
                1
            }
            len if len <= MAX_BYTES_LEN => {
                let [b0, b1, b2, _] = (len as u32).to_le_bytes();
                self.buffer.extend_from_slice(&[LONG_LENGTH_PREFIX, b0, b1, b2]);
                4
            }
            len => return Err(WriteError::TooLong { len }),
        };
        self.buffer.extend_from_slice(bytes);
        let padding = crate::padding(prefix_len + len);
        self.buffer.extend(std::iter::repeat(0).take(padding));
        Ok(())
    }

    pub fn write_string(&mut self, string: &str) -> Result<(), WriteError> {
        self.write_bytes(string.as_bytes())
    }

    pub fn write<T: crate::Serialize + ?Sized>(&mut self, value: &T) -> Result<(), WriteError> {
        value.serialize(self)
    }
}
