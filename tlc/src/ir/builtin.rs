//! Primitive combinators that every schema can refer to.

use crate::ir::shape::Primitive;

pub struct Builtin {
    /// The bare combinator identifier, eg. `int`.
    pub name: &'static str,
    /// The boxed result type, eg. `Int`.
    pub type_name: &'static str,
    pub primitive: Primitive,
}

impl Builtin {
    /// The declaration the combinator number is derived from.
    pub fn declaration(&self) -> String {
        format!("{} ? = {}", self.name, self.type_name)
    }

    /// The CRC-32 of the declaration.
    pub fn number(&self) -> u32 {
        crc32fast::hash(self.declaration().as_bytes())
    }
}

pub static BUILTINS: [Builtin; 5] = [
    Builtin {
        name: "int",
        type_name: "Int",
        primitive: Primitive::Int,
    },
    Builtin {
        name: "long",
        type_name: "Long",
        primitive: Primitive::Long,
    },
    Builtin {
        name: "double",
        type_name: "Double",
        primitive: Primitive::Double,
    },
    Builtin {
        name: "string",
        type_name: "String",
        primitive: Primitive::String,
    },
    Builtin {
        name: "bytes",
        type_name: "Bytes",
        primitive: Primitive::Bytes,
    },
];
