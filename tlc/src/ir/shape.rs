//! How values of a type are laid out on the wire.

use std::fmt;

use crate::ir::{
    split_namespace, CombinatorId, CombinatorKind, Identifier, IdentifierKind, Schema, TypeId,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Primitive {
    Int,
    Long,
    Double,
    String,
    Bytes,
}

impl Primitive {
    /// Primitives may be named by their type (`Int`) or their combinator (`int`).
    pub fn from_name(name: &str) -> Option<Primitive> {
        match name {
            "int" | "Int" => Some(Primitive::Int),
            "long" | "Long" => Some(Primitive::Long),
            "double" | "Double" => Some(Primitive::Double),
            "string" | "String" => Some(Primitive::String),
            "bytes" | "Bytes" => Some(Primitive::Bytes),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Double => "double",
            Primitive::String => "string",
            Primitive::Bytes => "bytes",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Shape {
    /// A raw 32-bit unsigned integer.
    Nat,
    /// A primitive payload, written without a combinator number.
    Primitive(Primitive),
    /// The vector number, an element count, then the elements.
    Vector(Box<Shape>),
    /// A combinator number from the type's constructors, then its fields.
    Boxed(TypeId),
    /// The fields of a single statically known constructor.
    Bare(CombinatorId),
    /// A combinator number from the whole schema, then its fields.
    Any,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShapeError {
    Unresolved { name: String },
    Conditional { name: String },
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeError::Unresolved { name } => write!(f, "cannot resolve type `{name}`"),
            ShapeError::Conditional { name } => {
                write!(f, "conditional field type `{name}` is not supported")
            }
        }
    }
}

impl std::error::Error for ShapeError {}

fn vector_element(name: &str) -> Option<&str> {
    let rest = (name.strip_prefix("Vector")).or_else(|| name.strip_prefix("vector"))?;
    match rest.strip_prefix('<') {
        Some(rest) => rest.strip_suffix('>'),
        None => rest.strip_prefix(' '),
    }
}

impl Schema {
    pub fn shape_of(&self, id: TypeId) -> Result<Shape, ShapeError> {
        let identifier = self.get_type(id).identifier();
        match identifier.kind {
            IdentifierKind::Template => Ok(Shape::Any),
            _ if identifier.is_nat() => Ok(Shape::Nat),
            _ => self.shape_of_name(&identifier.to_string()),
        }
    }

    /// Resolve a textual type reference, as written in a schema.
    pub fn shape_of_name(&self, name: &str) -> Result<Shape, ShapeError> {
        let name = name.trim();
        let unresolved = || ShapeError::Unresolved {
            name: name.to_owned(),
        };

        if Identifier::of_type(None, name).is_nat() {
            return Ok(Shape::Nat);
        }
        if name.contains('?') {
            return Err(ShapeError::Conditional {
                name: name.to_owned(),
            });
        }
        if name.starts_with('!') {
            return Ok(Shape::Any);
        }
        if let Some(elem) = vector_element(name) {
            return Ok(Shape::Vector(Box::new(self.shape_of_name(elem)?)));
        }
        if let Some(rest) = name.strip_prefix('%') {
            let (namespace, ident) = split_namespace(rest);
            let id = self
                .lookup_type(&Identifier::of_type(namespace, ident))
                .ok_or_else(unresolved)?;
            let mut constructors = self.type_constructors(id);
            return match (constructors.next(), constructors.next()) {
                (Some((id, _)), None) => Ok(Shape::Bare(id)),
                (_, _) => Err(unresolved()),
            };
        }
        if let Some(primitive) = Primitive::from_name(name) {
            return Ok(Shape::Primitive(primitive));
        }
        if self.lookup_type(&Identifier::template(name)).is_some() {
            return Ok(Shape::Any);
        }

        let (namespace, ident) = split_namespace(name);
        let identifier = Identifier::of_type(namespace, ident);
        if identifier.is_bare() {
            let id = self
                .combinator_by_identifier(&Identifier::combinator(namespace, ident))
                .ok_or_else(unresolved)?;
            return match self.combinator(id).kind {
                CombinatorKind::Constructor => Ok(Shape::Bare(id)),
                CombinatorKind::Function => Err(unresolved()),
            };
        }

        let id = self.lookup_type(&identifier).ok_or_else(unresolved)?;
        Ok(Shape::Boxed(id))
    }
}
