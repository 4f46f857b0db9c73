//! Runtime support for code generated from TL schemas.
//!
//! Generated modules implement [`Serialize`] and [`Deserialize`] for every
//! combinator and type in a schema, and [`Bare`] for the combinators that may
//! be embedded without their leading number.

mod error;
mod read;
mod write;

pub use crate::error::{ReadError, WriteError};
pub use crate::read::Reader;
pub use crate::write::Writer;

/// Combinator number of the built-in `vector`.
pub const VECTOR_NUMBER: u32 = 0x1cb5c415;
/// Combinator number of `boolTrue = Bool`.
pub const BOOL_TRUE_NUMBER: u32 = 0x997275b5;
/// Combinator number of `boolFalse = Bool`.
pub const BOOL_FALSE_NUMBER: u32 = 0xbc799737;

/// The longest byte sequence that can be written with a 1-byte prefix.
pub const MAX_SHORT_LEN: u8 = 253;
/// The prefix byte announcing a 3-byte length.
pub const LONG_LENGTH_PREFIX: u8 = 0xfe;
/// The longest byte sequence that can be written at all.
pub const MAX_BYTES_LEN: usize = 0xff_ffff;

/// Number of zero bytes needed to bring `len` up to a multiple of 4.
#[inline]
pub fn padding(len: usize) -> usize {
    (4 - len % 4) % 4
}

/// Values that can be written in their boxed form.
pub trait Serialize {
    fn serialize(&self, writer: &mut Writer) -> Result<(), WriteError>;
}

/// Values that can be read from their boxed form.
pub trait Deserialize: Sized {
    fn deserialize(reader: &mut Reader<'_>) -> Result<Self, ReadError>;
}

/// Values with a bare encoding: the fields without the combinator number.
pub trait Bare: Sized {
    fn serialize_bare(&self, writer: &mut Writer) -> Result<(), WriteError>;

    fn deserialize_bare(reader: &mut Reader<'_>) -> Result<Self, ReadError>;
}

/// A function combinator.
pub trait Function: Serialize {
    /// The type of values returned in response to this function.
    type Return: Deserialize;
}

/// An entry in a table of combinators, sorted by number.
pub struct Entry<T> {
    pub number: u32,
    pub name: &'static str,
    pub read: fn(&mut Reader<'_>) -> Result<T, ReadError>,
}

/// Read a leading combinator number and decode the rest with the matching
/// entry of `table`.
pub fn dispatch<T>(table: &[Entry<T>], reader: &mut Reader<'_>) -> Result<T, ReadError> {
    let number = reader.read_number()?;
    match table.binary_search_by_key(&number, |entry| entry.number) {
        Ok(index) => (table[index].read)(reader),
        Err(_) => Err(ReadError::UnknownDiscriminant { number }),
    }
}

/// The opaque byte sequence type of TL schemas.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Bytes(pub Vec<u8>);

impl From<Vec<u8>> for Bytes {
    fn from(bytes: Vec<u8>) -> Bytes {
        Bytes(bytes)
    }
}

// Primitive values are always encoded without a number, so their boxed and
// bare encodings coincide.
macro_rules! primitive {
    ($ty:ty, $read:ident, $write:ident) => {
        impl Serialize for $ty {
            fn serialize(&self, writer: &mut Writer) -> Result<(), WriteError> {
                writer.$write(*self);
                Ok(())
            }
        }

        impl Deserialize for $ty {
            fn deserialize(reader: &mut Reader<'_>) -> Result<Self, ReadError> {
                reader.$read()
            }
        }

        impl Bare for $ty {
            fn serialize_bare(&self, writer: &mut Writer) -> Result<(), WriteError> {
                self.serialize(writer)
            }

            fn deserialize_bare(reader: &mut Reader<'_>) -> Result<Self, ReadError> {
                Self::deserialize(reader)
            }
        }
    };
}

primitive!(u32, read_nat, write_nat);
primitive!(i32, read_int, write_int);
primitive!(i64, read_long, write_long);
primitive!(f64, read_double, write_double);

impl Serialize for String {
    fn serialize(&self, writer: &mut Writer) -> Result<(), WriteError> {
        writer.write_string(self)
    }
}

impl Deserialize for String {
    fn deserialize(reader: &mut Reader<'_>) -> Result<Self, ReadError> {
        reader.read_string()
    }
}

impl Bare for String {
    fn serialize_bare(&self, writer: &mut Writer) -> Result<(), WriteError> {
        self.serialize(writer)
    }

    fn deserialize_bare(reader: &mut Reader<'_>) -> Result<Self, ReadError> {
        Self::deserialize(reader)
    }
}

impl Serialize for Bytes {
    fn serialize(&self, writer: &mut Writer) -> Result<(), WriteError> {
        writer.write_bytes(&self.0)
    }
}

impl Deserialize for Bytes {
    fn deserialize(reader: &mut Reader<'_>) -> Result<Self, ReadError> {
        Ok(Bytes(reader.read_bytes()?.to_vec()))
    }
}

impl Bare for Bytes {
    fn serialize_bare(&self, writer: &mut Writer) -> Result<(), WriteError> {
        self.serialize(writer)
    }

    fn deserialize_bare(reader: &mut Reader<'_>) -> Result<Self, ReadError> {
        Self::deserialize(reader)
    }
}

impl Serialize for bool {
    fn serialize(&self, writer: &mut Writer) -> Result<(), WriteError> {
        writer.write_number(match self {
            true => BOOL_TRUE_NUMBER,
            false => BOOL_FALSE_NUMBER,
        });
        Ok(())
    }
}

impl Deserialize for bool {
    fn deserialize(reader: &mut Reader<'_>) -> Result<Self, ReadError> {
        match reader.read_number()? {
            BOOL_TRUE_NUMBER => Ok(true),
            BOOL_FALSE_NUMBER => Ok(false),
            number => Err(ReadError::UnknownDiscriminant { number }),
        }
    }
}

impl<T: Serialize + ?Sized> Serialize for Box<T> {
    fn serialize(&self, writer: &mut Writer) -> Result<(), WriteError> {
        (**self).serialize(writer)
    }
}

impl<T: Deserialize> Deserialize for Box<T> {
    fn deserialize(reader: &mut Reader<'_>) -> Result<Self, ReadError> {
        T::deserialize(reader).map(Box::new)
    }
}

impl<T: Bare> Bare for Box<T> {
    fn serialize_bare(&self, writer: &mut Writer) -> Result<(), WriteError> {
        (**self).serialize_bare(writer)
    }

    fn deserialize_bare(reader: &mut Reader<'_>) -> Result<Self, ReadError> {
        T::deserialize_bare(reader).map(Box::new)
    }
}

/// Boxed vectors: the vector number, a count, then each element boxed.
impl<T: Serialize> Serialize for Vec<T> {
    fn serialize(&self, writer: &mut Writer) -> Result<(), WriteError> {
        write_vector(writer, self, T::serialize)
    }
}

impl<T: Deserialize> Deserialize for Vec<T> {
    fn deserialize(reader: &mut Reader<'_>) -> Result<Self, ReadError> {
        read_vector(reader, T::deserialize)
    }
}

/// Bare vectors: a count, then each element boxed.
impl<T: Serialize + Deserialize> Bare for Vec<T> {
    fn serialize_bare(&self, writer: &mut Writer) -> Result<(), WriteError> {
        writer.write_count(self.len())?;
        self.iter().try_for_each(|elem| elem.serialize(writer))
    }

    fn deserialize_bare(reader: &mut Reader<'_>) -> Result<Self, ReadError> {
        let count = reader.read_nat()?;
        read_elems(reader, count, T::deserialize)
    }
}

/// Write a vector whose elements have a custom encoding.
pub fn write_vector<T>(
    writer: &mut Writer,
    elems: &[T],
    mut write_elem: impl FnMut(&T, &mut Writer) -> Result<(), WriteError>,
) -> Result<(), WriteError> {
    writer.write_number(VECTOR_NUMBER);
    writer.write_count(elems.len())?;
    elems.iter().try_for_each(|elem| write_elem(elem, writer))
}

pub fn read_vector<T>(
    reader: &mut Reader<'_>,
    read_elem: impl FnMut(&mut Reader<'_>) -> Result<T, ReadError>,
) -> Result<Vec<T>, ReadError> {
    reader.expect_number(VECTOR_NUMBER)?;
    let count = reader.read_nat()?;
    read_elems(reader, count, read_elem)
}

/// Write the elements of a multiplicity field after checking them against
/// their count.
pub fn write_mult<T>(
    writer: &mut Writer,
    expected: u32,
    elems: &[T],
    mut write_elem: impl FnMut(&T, &mut Writer) -> Result<(), WriteError>,
) -> Result<(), WriteError> {
    if usize::try_from(expected).ok() != Some(elems.len()) {
        return Err(WriteError::CountMismatch {
            expected,
            found: elems.len(),
        });
    }
    elems.iter().try_for_each(|elem| write_elem(elem, writer))
}

/// Read `count` elements with `read_elem`.
pub fn read_elems<T>(
    reader: &mut Reader<'_>,
    count: u32,
    mut read_elem: impl FnMut(&mut Reader<'_>) -> Result<T, ReadError>,
) -> Result<Vec<T>, ReadError> {
    // Cap the preallocation by the data left, since `count` is untrusted.
    let mut elems = Vec::with_capacity(usize::min(count as usize, reader.remaining()));
    for _ in 0..count {
        elems.push(read_elem(reader)?);
    }
    Ok(elems)
}

/// Serialize a boxed value into a fresh buffer.
pub fn to_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, WriteError> {
    let mut writer = Writer::new();
    value.serialize(&mut writer)?;
    Ok(writer.into_buffer())
}

/// Deserialize a boxed value from the start of `data`.
pub fn from_bytes<T: Deserialize>(data: &[u8]) -> Result<T, ReadError> {
    T::deserialize(&mut Reader::new(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_is_little_endian() {
        assert_eq!(to_bytes(&1234i32).unwrap(), [0xd2, 0x04, 0x00, 0x00]);
        assert_eq!(from_bytes::<i32>(&[0xd2, 0x04, 0x00, 0x00]), Ok(1234));
    }

    #[test]
    fn short_string() {
        let bytes = to_bytes(&String::from("Peter")).unwrap();
        assert_eq!(bytes, [0x05, b'P', b'e', b't', b'e', b'r', 0x00, 0x00]);
    }

    #[test]
    fn length_prefix_boundary() {
        let bytes = to_bytes(&Bytes(vec![7; 253])).unwrap();
        assert_eq!(bytes[0], 253);
        assert_eq!(bytes.len(), 256);

        let bytes = to_bytes(&Bytes(vec![7; 254])).unwrap();
        assert_eq!(&bytes[..4], &[0xfe, 254, 0, 0]);
        assert_eq!(bytes.len(), 260);
        assert_eq!(from_bytes::<Bytes>(&bytes), Ok(Bytes(vec![7; 254])));
    }

    #[test]
    fn empty_bytes_are_padded() {
        assert_eq!(to_bytes(&Bytes(Vec::new())).unwrap(), [0, 0, 0, 0]);
    }

    #[test]
    fn boxed_vector() {
        let bytes = to_bytes(&vec![1i32, 2]).unwrap();
        assert_eq!(
            bytes,
            [0x15, 0xc4, 0xb5, 0x1c, 2, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0]
        );
        assert_eq!(from_bytes::<Vec<i32>>(&bytes), Ok(vec![1, 2]));
    }

    #[test]
    fn bool_numbers() {
        assert_eq!(to_bytes(&true).unwrap(), BOOL_TRUE_NUMBER.to_le_bytes());
        assert_eq!(
            from_bytes::<bool>(&1u32.to_le_bytes()),
            Err(ReadError::UnknownDiscriminant { number: 1 })
        );
    }

    #[test]
    fn mult_count_mismatch() {
        let mut writer = Writer::new();
        let result = write_mult(&mut writer, 3, &[1i32, 2], |elem, writer| elem.serialize(writer));
        assert_eq!(
            result,
            Err(WriteError::CountMismatch {
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn dispatch_unknown_number() {
        let table: &[Entry<i32>] = &[Entry {
            number: 1,
            name: "one",
            read: |reader| reader.read_int(),
        }];
        let data = [2, 0, 0, 0];
        assert_eq!(
            dispatch(table, &mut Reader::new(&data)),
            Err(ReadError::UnknownDiscriminant { number: 2 })
        );
        let data = [1, 0, 0, 0, 9, 0, 0, 0];
        assert_eq!(dispatch(table, &mut Reader::new(&data)), Ok(9));
    }
}
