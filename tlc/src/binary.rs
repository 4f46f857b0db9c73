//! Reading and writing binary data using the layouts declared in a schema.

use std::fmt;

use tlc_runtime::{ReadError, Reader, WriteError, Writer, VECTOR_NUMBER};

use crate::ir::builtin::BUILTINS;
use crate::ir::shape::{Primitive, Shape, ShapeError};
use crate::ir::{CombinatorId, CombinatorKind, ParameterKind, Schema, TypeId};
use crate::symbol::Symbol;

/// A decoded value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Nat(u32),
    Int(i32),
    Long(i64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Vector(Vec<Value>),
    /// A combinator with its fields, in declaration order.
    Object {
        number: u32,
        fields: Vec<(Symbol, Value)>,
    },
}

impl Value {
    pub fn description(&self) -> &'static str {
        match self {
            Value::Nat(_) => "nat",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Vector(_) => "vector",
            Value::Object { .. } => "object",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    Read(ReadError),
    Write(WriteError),
    Shape(ShapeError),
    UnknownCombinator {
        number: u32,
    },
    UnexpectedCombinator {
        number: u32,
        expected: String,
    },
    MismatchedValue {
        expected: String,
        found: &'static str,
    },
    MismatchedField {
        combinator: String,
        expected: Option<Symbol>,
        found: Option<Symbol>,
    },
    /// A multiplicity field without a preceding nat field to give its length.
    MissingCount {
        combinator: String,
        field: Symbol,
    },
    /// Values nested deeper than [`MAX_DEPTH`].
    TooDeep,
}

impl From<ReadError> for Error {
    fn from(error: ReadError) -> Error {
        Error::Read(error)
    }
}

impl From<WriteError> for Error {
    fn from(error: WriteError) -> Error {
        Error::Write(error)
    }
}

impl From<ShapeError> for Error {
    fn from(error: ShapeError) -> Error {
        Error::Shape(error)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Read(error) => error.fmt(f),
            Error::Write(error) => error.fmt(f),
            Error::Shape(error) => error.fmt(f),
            Error::UnknownCombinator { number } => {
                write!(f, "no combinator is numbered `#{number:08x}`")
            }
            Error::UnexpectedCombinator { number, expected } => {
                write!(f, "combinator `#{number:08x}` is not a constructor of `{expected}`")
            }
            Error::MismatchedValue { expected, found } => {
                write!(f, "expected a value of type `{expected}`, found {found}")
            }
            Error::MismatchedField {
                combinator,
                expected: Some(expected),
                found: Some(found),
            } => write!(f, "expected field `{expected}` of `{combinator}`, found `{found}`"),
            Error::MismatchedField {
                combinator,
                expected: Some(expected),
                found: None,
            } => write!(f, "missing field `{expected}` of `{combinator}`"),
            Error::MismatchedField {
                combinator,
                expected: None,
                found,
            } => match found {
                Some(found) => write!(f, "unexpected field `{found}` of `{combinator}`"),
                None => write!(f, "mismatched fields of `{combinator}`"),
            },
            Error::MissingCount { combinator, field } => {
                write!(f, "field `{field}` of `{combinator}` has no preceding `#` count")
            }
            Error::TooDeep => write!(f, "values are nested more than {MAX_DEPTH} levels deep"),
        }
    }
}

impl std::error::Error for Error {}

fn builtin_number(primitive: Primitive) -> u32 {
    (BUILTINS.iter())
        .find(|builtin| builtin.primitive == primitive)
        .map_or(0, |builtin| builtin.number())
}

/// The deepest nesting of vectors and objects that will be decoded.
pub const MAX_DEPTH: usize = 256;

pub struct Context<'schema> {
    schema: &'schema Schema,
}

impl<'schema> Context<'schema> {
    pub fn new(schema: &'schema Schema) -> Context<'schema> {
        Context { schema }
    }

    /// Serialize a boxed value.
    pub fn serialize(&self, value: &Value) -> Result<Vec<u8>, Error> {
        let mut writer = Writer::new();
        self.serialize_shape(&mut writer, &Shape::Any, value)?;
        Ok(writer.into_buffer())
    }

    /// Deserialize a boxed value, dispatching on its combinator number.
    pub fn deserialize(&self, reader: &mut Reader<'_>) -> Result<Value, Error> {
        self.deserialize_shape(reader, &Shape::Any)
    }

    pub fn deserialize_shape(&self, reader: &mut Reader<'_>, shape: &Shape) -> Result<Value, Error> {
        self.read_shape(reader, shape, 0)
    }

    fn read_shape(
        &self,
        reader: &mut Reader<'_>,
        shape: &Shape,
        depth: usize,
    ) -> Result<Value, Error> {
        if depth > MAX_DEPTH {
            return Err(Error::TooDeep);
        }
        let depth = depth + 1;

        match shape {
            Shape::Nat => Ok(Value::Nat(reader.read_nat()?)),
            Shape::Primitive(primitive) => read_primitive(reader, *primitive),
            Shape::Vector(elem) => {
                reader.expect_number(VECTOR_NUMBER)?;
                self.read_elems(reader, elem, depth)
            }
            Shape::Boxed(type_id) => {
                let number = reader.read_number()?;
                let id = (self.schema.combinator_by_number(number))
                    .ok_or(ReadError::UnknownDiscriminant { number })?;
                self.check_constructor(id, *type_id)?;
                self.read_fields(reader, id, depth)
            }
            Shape::Bare(id) => self.read_fields(reader, *id, depth),
            Shape::Any => match reader.read_number()? {
                // Without a static element type, each element carries its own number
                VECTOR_NUMBER => self.read_elems(reader, &Shape::Any, depth),
                number => {
                    let id = (self.schema.combinator_by_number(number))
                        .ok_or(ReadError::UnknownDiscriminant { number })?;
                    match self.schema.builtin(self.schema.combinator(id)) {
                        Some(builtin) => read_primitive(reader, builtin.primitive),
                        None => self.read_fields(reader, id, depth),
                    }
                }
            },
        }
    }

    /// Boxed types are made up of their constructors. Functions returning the
    /// type are not values of it.
    fn check_constructor(&self, id: CombinatorId, type_id: TypeId) -> Result<(), Error> {
        let combinator = self.schema.combinator(id);
        if combinator.kind != CombinatorKind::Constructor || combinator.result_type != type_id {
            return Err(Error::UnexpectedCombinator {
                number: combinator.number,
                expected: self.schema.type_name(type_id),
            });
        }
        Ok(())
    }

    fn read_elems(
        &self,
        reader: &mut Reader<'_>,
        elem: &Shape,
        depth: usize,
    ) -> Result<Value, Error> {
        let count = reader.read_nat()?;
        let elems = (0..count)
            .map(|_| self.read_shape(reader, elem, depth))
            .collect::<Result<_, _>>()?;
        Ok(Value::Vector(elems))
    }

    fn read_fields(
        &self,
        reader: &mut Reader<'_>,
        id: CombinatorId,
        depth: usize,
    ) -> Result<Value, Error> {
        let combinator = self.schema.combinator(id);
        let mut fields = Vec::with_capacity(combinator.params.len());
        let mut count = None;

        for param in combinator.fields() {
            let value = match param.kind {
                ParameterKind::OptionalArg => continue,
                ParameterKind::ArgNat => Value::Nat(reader.read_nat()?),
                ParameterKind::Arg => {
                    let shape = self.schema.shape_of(param.arg_type)?;
                    self.read_shape(reader, &shape, depth)?
                }
                ParameterKind::Mult => {
                    let count = count.ok_or_else(|| Error::MissingCount {
                        combinator: combinator.identifier.to_string(),
                        field: param.identifier.ident,
                    })?;
                    let shape = self.schema.shape_of(param.arg_type)?;
                    let elems = (0..count)
                        .map(|_| self.read_shape(reader, &shape, depth))
                        .collect::<Result<_, _>>()?;
                    Value::Vector(elems)
                }
            };
            if let Value::Nat(nat) = value {
                count = Some(nat);
            }
            fields.push((param.identifier.ident, value));
        }

        Ok(Value::Object {
            number: combinator.number,
            fields,
        })
    }

    pub fn serialize_shape(
        &self,
        writer: &mut Writer,
        shape: &Shape,
        value: &Value,
    ) -> Result<(), Error> {
        match (shape, value) {
            (Shape::Nat, Value::Nat(nat)) => writer.write_nat(*nat),
            (Shape::Primitive(primitive), value) => write_primitive(writer, *primitive, value)?,
            (Shape::Vector(elem), Value::Vector(elems)) => {
                writer.write_number(VECTOR_NUMBER);
                writer.write_count(elems.len())?;
                for elem_value in elems {
                    self.serialize_shape(writer, elem, elem_value)?;
                }
            }
            (Shape::Boxed(type_id), Value::Object { number, fields }) => {
                let id = self.lookup_number(*number)?;
                self.check_constructor(id, *type_id)?;
                writer.write_number(*number);
                self.write_fields(writer, id, fields)?;
            }
            (Shape::Bare(id), Value::Object { number, fields }) => {
                if self.schema.combinator(*id).number != *number {
                    return Err(Error::UnexpectedCombinator {
                        number: *number,
                        expected: self.schema.combinator(*id).identifier.to_string(),
                    });
                }
                self.write_fields(writer, *id, fields)?;
            }
            (Shape::Any, Value::Object { number, fields }) => {
                let id = self.lookup_number(*number)?;
                writer.write_number(*number);
                self.write_fields(writer, id, fields)?;
            }
            (Shape::Any, Value::Vector(_)) => {
                self.serialize_shape(writer, &Shape::Vector(Box::new(Shape::Any)), value)?;
            }
            (Shape::Any, Value::Nat(_)) => return Err(self.mismatch(shape, value)),
            (Shape::Any, value) => {
                let primitive = match value {
                    Value::Int(_) => Primitive::Int,
                    Value::Long(_) => Primitive::Long,
                    Value::Double(_) => Primitive::Double,
                    Value::String(_) => Primitive::String,
                    _ => Primitive::Bytes,
                };
                writer.write_number(builtin_number(primitive));
                write_primitive(writer, primitive, value)?;
            }
            (shape, value) => return Err(self.mismatch(shape, value)),
        }
        Ok(())
    }

    fn write_fields(
        &self,
        writer: &mut Writer,
        id: CombinatorId,
        fields: &[(Symbol, Value)],
    ) -> Result<(), Error> {
        let combinator = self.schema.combinator(id);
        let mismatched_field = |expected: Option<Symbol>, found: Option<Symbol>| Error::MismatchedField {
            combinator: combinator.identifier.to_string(),
            expected,
            found,
        };
        let mut fields = fields.iter();
        let mut count = None;

        for param in combinator.fields() {
            let expected = param.identifier.ident;
            let value = match fields.next() {
                Some((name, value)) if *name == expected => value,
                Some((name, _)) => return Err(mismatched_field(Some(expected), Some(*name))),
                None => return Err(mismatched_field(Some(expected), None)),
            };

            match param.kind {
                ParameterKind::OptionalArg => {}
                ParameterKind::ArgNat => self.serialize_shape(writer, &Shape::Nat, value)?,
                ParameterKind::Arg => {
                    let shape = self.schema.shape_of(param.arg_type)?;
                    self.serialize_shape(writer, &shape, value)?;
                }
                ParameterKind::Mult => {
                    let count = count.ok_or_else(|| Error::MissingCount {
                        combinator: combinator.identifier.to_string(),
                        field: expected,
                    })?;
                    let shape = self.schema.shape_of(param.arg_type)?;
                    let elems = match value {
                        Value::Vector(elems) => elems,
                        value => return Err(self.mismatch(&Shape::Vector(Box::new(shape)), value)),
                    };
                    if usize::try_from(count).ok() != Some(elems.len()) {
                        return Err(Error::Write(WriteError::CountMismatch {
                            expected: count,
                            found: elems.len(),
                        }));
                    }
                    for elem in elems {
                        self.serialize_shape(writer, &shape, elem)?;
                    }
                }
            }
            if let Value::Nat(nat) = value {
                count = Some(*nat);
            }
        }

        match fields.next() {
            Some((name, _)) => Err(mismatched_field(None, Some(*name))),
            None => Ok(()),
        }
    }

    fn lookup_number(&self, number: u32) -> Result<CombinatorId, Error> {
        match self.schema.combinator_by_number(number) {
            Some(id) if !self.schema.is_builtin(number) => Ok(id),
            Some(_) | None => Err(Error::UnknownCombinator { number }),
        }
    }

    fn mismatch(&self, shape: &Shape, value: &Value) -> Error {
        Error::MismatchedValue {
            expected: self.shape_name(shape),
            found: value.description(),
        }
    }

    pub fn shape_name(&self, shape: &Shape) -> String {
        match shape {
            Shape::Nat => "#".to_owned(),
            Shape::Primitive(primitive) => primitive.name().to_owned(),
            Shape::Vector(elem) => format!("Vector<{}>", self.shape_name(elem)),
            Shape::Boxed(id) => self.schema.type_name(*id),
            Shape::Bare(id) => self.schema.combinator(*id).identifier.to_string(),
            Shape::Any => "!Object".to_owned(),
        }
    }
}

fn read_primitive(reader: &mut Reader<'_>, primitive: Primitive) -> Result<Value, Error> {
    Ok(match primitive {
        Primitive::Int => Value::Int(reader.read_int()?),
        Primitive::Long => Value::Long(reader.read_long()?),
        Primitive::Double => Value::Double(reader.read_double()?),
        Primitive::String => Value::String(reader.read_string()?),
        Primitive::Bytes => Value::Bytes(reader.read_bytes()?.to_vec()),
    })
}

fn write_primitive(writer: &mut Writer, primitive: Primitive, value: &Value) -> Result<(), Error> {
    match (primitive, value) {
        (Primitive::Int, Value::Int(value)) => writer.write_int(*value),
        (Primitive::Long, Value::Long(value)) => writer.write_long(*value),
        (Primitive::Double, Value::Double(value)) => writer.write_double(*value),
        (Primitive::String, Value::String(value)) => writer.write_string(value)?,
        (Primitive::Bytes, Value::Bytes(value)) => writer.write_bytes(value)?,
        (primitive, value) => {
            return Err(Error::MismatchedValue {
                expected: primitive.name().to_owned(),
                found: value.description(),
            })
        }
    }
    Ok(())
}
