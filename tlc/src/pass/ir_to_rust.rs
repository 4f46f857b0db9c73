//! Generate Rust bindings for a schema, using the `tlc-runtime` traits.
//!
//! Compilation first assigns Rust names to every combinator and type, then
//! plans the items of the output module. Emitting the planned module cannot
//! fail on account of the schema.

use std::borrow::Cow;
use std::fmt;
use std::io::{self, Write};

use fxhash::{FxHashMap, FxHashSet};
use itertools::Itertools;

use crate::ir::shape::{Primitive, Shape, ShapeError};
use crate::ir::{CombinatorId, CombinatorKind, ParameterKind, Schema, TypeId};
use crate::symbol::Symbol;

const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate",
    "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "self", "Self", "static", "struct", "super", "trait", "true", "try", "type",
    "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Names that cannot be given to generated items, as they would shadow the
/// runtime imports.
const RESERVED_ITEMS: &[&str] = &[
    "Bare", "Box", "Bytes", "Deserialize", "Entry", "Function", "Object", "Option", "ReadError",
    "Reader", "Result", "Serialize", "String", "Vec", "WriteError", "Writer",
];

/// Locals used by the generated method bodies.
const RESERVED_FIELDS: &[&str] = &["count", "elem", "reader", "writer"];

struct Namespace {
    used: FxHashSet<String>,
}

impl Namespace {
    fn new(reserved: &[&str]) -> Namespace {
        Namespace {
            used: reserved.iter().map(|name| (*name).to_owned()).collect(),
        }
    }

    fn fresh(&mut self, base: String) -> String {
        let name = match self.used.contains(&base) {
            false => base,
            true => (1..)
                .map(|index| format!("{base}{index}"))
                .find(|name| !self.used.contains(name))
                .unwrap_or_default(),
        };
        self.used.insert(name.clone());
        escape_keyword(name)
    }

    fn fresh_upper_camel_case<'src>(&mut self, src: impl Into<Cow<'src, str>>) -> String {
        let name = words(&src.into())
            .iter()
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => {
                        first.to_ascii_uppercase().to_string()
                            + &chars.as_str().to_ascii_lowercase()
                    }
                    None => String::new(),
                }
            })
            .collect::<String>();
        self.fresh(if name.is_empty() { "Item".to_owned() } else { name })
    }

    fn fresh_lower_snake_case<'src>(&mut self, src: impl Into<Cow<'src, str>>) -> String {
        let name = (words(&src.into()).iter())
            .map(|word| word.to_ascii_lowercase())
            .join("_");
        self.fresh(if name.is_empty() { "field".to_owned() } else { name })
    }
}

/// Split an identifier into words at separators and case changes.
fn words(src: &str) -> Vec<String> {
    let chars = src.chars().collect::<Vec<_>>();
    let mut words = Vec::new();
    let mut current = String::new();

    for (index, &ch) in chars.iter().enumerate() {
        if !ch.is_ascii_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if ch.is_ascii_uppercase() && !current.is_empty() {
            let prev = chars[index - 1];
            let next_is_lower = chars.get(index + 1).map_or(false, char::is_ascii_lowercase);
            let is_boundary = prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower);
            if is_boundary {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn escape_keyword(name: String) -> String {
    match name.as_str() {
        "self" | "Self" | "super" | "crate" => name + "_",
        _ if KEYWORDS.contains(&name.as_str()) => format!("r#{name}"),
        _ => name,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reason {
    Shape(ShapeError),
    /// A multiplicity without a preceding `#` field.
    MissingCount,
    /// A function result that has no boxed encoding.
    UnsupportedResult,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Shape(error) => error.fmt(f),
            Reason::MissingCount => write!(f, "multiplicity has no preceding `#` count"),
            Reason::UnsupportedResult => write!(f, "result type has no boxed encoding"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Error {
    pub combinator: CombinatorId,
    /// The parameter being compiled, or `None` for the result type.
    pub param: Option<Symbol>,
    pub reason: Reason,
}

/// The Rust representation of a field.
#[derive(Clone, Debug)]
enum Repr {
    Nat,
    Primitive(Primitive),
    Vector(Box<Repr>),
    /// A type enum in the `types` module.
    Boxed(String),
    /// A constructor struct, without its number.
    Bare(String),
    /// Any combinator of the schema.
    Object,
}

impl Repr {
    fn rust_type(&self) -> String {
        match self {
            Repr::Boxed(path) | Repr::Bare(path) => format!("Box<{path}>"),
            Repr::Object => "Box<Object>".to_owned(),
            repr => repr.elem_type(),
        }
    }

    /// The type of the repr when stored in a vector.
    fn elem_type(&self) -> String {
        match self {
            Repr::Nat => "u32".to_owned(),
            Repr::Primitive(Primitive::Int) => "i32".to_owned(),
            Repr::Primitive(Primitive::Long) => "i64".to_owned(),
            Repr::Primitive(Primitive::Double) => "f64".to_owned(),
            Repr::Primitive(Primitive::String) => "String".to_owned(),
            Repr::Primitive(Primitive::Bytes) => "Bytes".to_owned(),
            Repr::Vector(elem) => format!("Vec<{}>", elem.elem_type()),
            Repr::Boxed(path) | Repr::Bare(path) => path.clone(),
            Repr::Object => "Object".to_owned(),
        }
    }

    /// Whether the `Serialize` and `Deserialize` impls give the encoding.
    fn is_boxed(&self) -> bool {
        match self {
            Repr::Vector(elem) => elem.is_boxed(),
            Repr::Bare(_) => false,
            _ => true,
        }
    }

    /// An expression that writes `expr`, evaluating to a `Result`.
    fn write_expr(&self, expr: &str) -> String {
        match self {
            Repr::Bare(_) => format!("{expr}.serialize_bare(writer)"),
            Repr::Vector(elem) if !elem.is_boxed() => format!(
                "write_vector(writer, {expr}.as_slice(), |elem, writer| {})",
                elem.write_expr("elem"),
            ),
            _ => format!("{expr}.serialize(writer)"),
        }
    }

    /// An expression that reads a value, evaluating to the value.
    fn read_expr(&self) -> String {
        match self {
            Repr::Bare(_) => "Bare::deserialize_bare(reader)?".to_owned(),
            Repr::Vector(elem) if !elem.is_boxed() => {
                format!("read_vector(reader, {})?", elem.read_fn())
            }
            _ => "Deserialize::deserialize(reader)?".to_owned(),
        }
    }

    /// A function from a reader to a `Result`.
    fn read_fn(&self) -> String {
        match self {
            Repr::Bare(_) => "Bare::deserialize_bare".to_owned(),
            Repr::Vector(elem) if !elem.is_boxed() => {
                format!("|reader| read_vector(reader, {})", elem.read_fn())
            }
            _ => "Deserialize::deserialize".to_owned(),
        }
    }
}

struct Field {
    name: String,
    repr: Repr,
    /// The field holding the element count of a multiplicity.
    count: Option<String>,
}

impl Field {
    fn rust_type(&self) -> String {
        match self.count {
            Some(_) => format!("Vec<{}>", self.repr.elem_type()),
            None => self.repr.rust_type(),
        }
    }
}

struct StructItem {
    name: String,
    number: u32,
    declaration: String,
    fields: Vec<Field>,
    /// The result of a function.
    returns: Option<String>,
}

struct Variant {
    name: String,
    number: u32,
    /// The TL identifier of the combinator.
    label: String,
    path: String,
}

struct EnumItem {
    name: String,
    type_name: String,
    variants: Vec<Variant>,
}

pub struct Module {
    constructors: Vec<StructItem>,
    functions: Vec<StructItem>,
    types: Vec<EnumItem>,
    /// Every combinator, sorted by number.
    objects: Vec<Variant>,
}

pub struct Context<'schema> {
    schema: &'schema Schema,
    combinator_paths: FxHashMap<CombinatorId, (String, String)>,
    type_names: FxHashMap<TypeId, String>,
}

impl<'schema> Context<'schema> {
    pub fn new(schema: &'schema Schema) -> Context<'schema> {
        Context {
            schema,
            combinator_paths: FxHashMap::default(),
            type_names: FxHashMap::default(),
        }
    }

    pub fn compile(mut self) -> Result<Module, Error> {
        let schema = self.schema;
        let user_combinators = move || {
            (schema.combinators())
                .filter(move |(_, combinator)| schema.builtin(combinator).is_none())
        };

        let mut constructor_namespace = Namespace::new(RESERVED_ITEMS);
        let mut function_namespace = Namespace::new(RESERVED_ITEMS);
        for (id, combinator) in user_combinators() {
            let ident = combinator.identifier.to_string();
            let (module, namespace) = match combinator.kind {
                CombinatorKind::Constructor => ("constructors", &mut constructor_namespace),
                CombinatorKind::Function => ("functions", &mut function_namespace),
            };
            let name = namespace.fresh_upper_camel_case(ident);
            self.combinator_paths.insert(id, (module.to_owned(), name));
        }

        let mut type_namespace = Namespace::new(RESERVED_ITEMS);
        let mut types = Vec::new();
        for (type_id, r#type) in schema.types() {
            let mut variant_namespace = Namespace::new(&[]);
            let variants = (schema.type_constructors(type_id))
                .filter(|(id, _)| self.combinator_paths.contains_key(id))
                .map(|(id, combinator)| Variant {
                    name: (variant_namespace)
                        .fresh_upper_camel_case(combinator.identifier.ident.resolve()),
                    number: combinator.number,
                    label: combinator.identifier.to_string(),
                    path: self.path(id),
                })
                .collect::<Vec<_>>();
            if variants.is_empty() {
                continue;
            }
            let name = type_namespace.fresh_upper_camel_case(r#type.identifier().to_string());
            self.type_names.insert(type_id, name.clone());
            types.push(EnumItem {
                name,
                type_name: r#type.identifier().to_string(),
                variants,
            });
        }

        let mut constructors = Vec::new();
        let mut functions = Vec::new();
        for (id, combinator) in user_combinators() {
            let item = self.compile_combinator(id)?;
            match combinator.kind {
                CombinatorKind::Constructor => constructors.push(item),
                CombinatorKind::Function => functions.push(item),
            }
        }

        let mut object_namespace = Namespace::new(&[]);
        let mut objects = user_combinators()
            .map(|(id, combinator)| Variant {
                name: object_namespace.fresh_upper_camel_case(combinator.identifier.to_string()),
                number: combinator.number,
                label: combinator.identifier.to_string(),
                path: self.path(id),
            })
            .collect::<Vec<_>>();
        objects.sort_by_key(|object| object.number);

        Ok(Module {
            constructors,
            functions,
            types,
            objects,
        })
    }

    fn path(&self, id: CombinatorId) -> String {
        match self.combinator_paths.get(&id) {
            Some((module, name)) => format!("{module}::{name}"),
            None => "Object".to_owned(),
        }
    }

    fn compile_combinator(&self, id: CombinatorId) -> Result<StructItem, Error> {
        let combinator = self.schema.combinator(id);
        let error = |param, reason| Error {
            combinator: id,
            param,
            reason,
        };

        let mut namespace = Namespace::new(RESERVED_FIELDS);
        let mut fields = Vec::new();
        let mut last_nat = None;

        for param in combinator.fields() {
            let ident = param.identifier.ident;
            let shape = (self.schema.shape_of(param.arg_type))
                .map_err(|e| error(Some(ident), Reason::Shape(e)))?;
            let repr = self.repr(&shape).map_err(|e| error(Some(ident), Reason::Shape(e)))?;
            let name = match param.kind {
                ParameterKind::ArgNat => namespace.fresh_lower_snake_case("nat"),
                _ => namespace.fresh_lower_snake_case(ident.resolve()),
            };
            let count = match param.kind {
                ParameterKind::Mult => Some(
                    (last_nat.clone()).ok_or_else(|| error(Some(ident), Reason::MissingCount))?,
                ),
                _ => None,
            };
            if count.is_none() && matches!(repr, Repr::Nat) {
                last_nat = Some(name.clone());
            }
            fields.push(Field { name, repr, count });
        }

        let returns = match combinator.kind {
            CombinatorKind::Constructor => None,
            CombinatorKind::Function => {
                let shape = (self.schema.shape_of(combinator.result_type))
                    .map_err(|e| error(None, Reason::Shape(e)))?;
                let repr = self.repr(&shape).map_err(|e| error(None, Reason::Shape(e)))?;
                if !repr.is_boxed() {
                    return Err(error(None, Reason::UnsupportedResult));
                }
                Some(repr.elem_type())
            }
        };

        let (_, name) = &self.combinator_paths[&id];
        Ok(StructItem {
            name: name.clone(),
            number: combinator.number,
            declaration: combinator.declaration(self.schema),
            fields,
            returns,
        })
    }

    fn repr(&self, shape: &Shape) -> Result<Repr, ShapeError> {
        match shape {
            Shape::Nat => Ok(Repr::Nat),
            Shape::Primitive(primitive) => Ok(Repr::Primitive(*primitive)),
            Shape::Vector(elem) => Ok(Repr::Vector(Box::new(self.repr(elem)?))),
            Shape::Boxed(id) => match self.type_names.get(id) {
                Some(name) => Ok(Repr::Boxed(format!("types::{name}"))),
                None => Ok(Repr::Object),
            },
            Shape::Bare(id) => match self.combinator_paths.contains_key(id) {
                true => Ok(Repr::Bare(self.path(*id))),
                false => Err(ShapeError::Unresolved {
                    name: self.schema.combinator(*id).identifier.to_string(),
                }),
            },
            Shape::Any => Ok(Repr::Object),
        }
    }
}

impl Module {
    pub fn emit(&self, writer: &mut impl Write) -> io::Result<()> {
        writeln!(writer, "// Generated by tlc {}. Do not edit.", env!("CARGO_PKG_VERSION"))?;
        writeln!(writer)?;
        writeln!(writer, "#[allow(unused_imports)]")?;
        writeln!(
            writer,
            "use tlc_runtime::{{dispatch, read_elems, read_vector, write_mult, write_vector, Bare, \
             Bytes, Deserialize, Entry, Function, ReadError, Reader, Serialize, WriteError, Writer}};",
        )?;

        emit_module(writer, "constructors", &self.constructors, |writer, item| {
            emit_struct(writer, item)
        })?;
        emit_module(writer, "functions", &self.functions, |writer, item| {
            emit_struct(writer, item)
        })?;
        emit_module(writer, "types", &self.types, |writer, item| emit_enum(writer, item))?;

        self.emit_object(writer)
    }

    fn emit_object(&self, writer: &mut impl Write) -> io::Result<()> {
        writeln!(writer)?;
        writeln!(writer, "/// Any combinator of the schema.")?;
        writeln!(writer, "#[derive(Clone, Debug, PartialEq)]")?;
        writeln!(writer, "pub enum Object {{")?;
        for object in &self.objects {
            writeln!(writer, "    {}({}),", object.name, object.path)?;
        }
        writeln!(writer, "}}")?;
        writeln!(writer)?;

        writeln!(writer, "impl Object {{")?;
        writeln!(writer, "    pub fn number(&self) -> u32 {{")?;
        if self.objects.is_empty() {
            writeln!(writer, "        match *self {{}}")?;
        } else {
            writeln!(writer, "        match self {{")?;
            for object in &self.objects {
                writeln!(writer, "            Object::{}(_) => {}::NUMBER,", object.name, object.path)?;
            }
            writeln!(writer, "        }}")?;
        }
        writeln!(writer, "    }}")?;
        writeln!(writer, "}}")?;
        writeln!(writer)?;

        writeln!(writer, "impl Serialize for Object {{")?;
        if self.objects.is_empty() {
            writeln!(writer, "    fn serialize(&self, _: &mut Writer) -> Result<(), WriteError> {{")?;
            writeln!(writer, "        match *self {{}}")?;
        } else {
            writeln!(writer, "    fn serialize(&self, writer: &mut Writer) -> Result<(), WriteError> {{")?;
            writeln!(writer, "        match self {{")?;
            for object in &self.objects {
                writeln!(writer, "            Object::{}(value) => value.serialize(writer),", object.name)?;
            }
            writeln!(writer, "        }}")?;
        }
        writeln!(writer, "    }}")?;
        writeln!(writer, "}}")?;
        writeln!(writer)?;

        writeln!(writer, "impl Deserialize for Object {{")?;
        writeln!(writer, "    fn deserialize(reader: &mut Reader<'_>) -> Result<Self, ReadError> {{")?;
        writeln!(writer, "        dispatch(COMBINATORS, reader)")?;
        writeln!(writer, "    }}")?;
        writeln!(writer, "}}")?;
        writeln!(writer)?;

        writeln!(writer, "/// The combinators of the schema, sorted by number.")?;
        writeln!(writer, "pub static COMBINATORS: &[Entry<Object>] = &[")?;
        for object in &self.objects {
            writeln!(writer, "    Entry {{")?;
            writeln!(writer, "        number: {:#010x},", object.number)?;
            writeln!(writer, "        name: {:?},", object.label)?;
            writeln!(
                writer,
                "        read: |reader| Ok(Object::{}(Bare::deserialize_bare(reader)?)),",
                object.name,
            )?;
            writeln!(writer, "    }},")?;
        }
        writeln!(writer, "];")?;
        writeln!(writer)?;

        writeln!(writer, "pub fn serialize(object: &Object) -> Result<Vec<u8>, WriteError> {{")?;
        writeln!(writer, "    tlc_runtime::to_bytes(object)")?;
        writeln!(writer, "}}")?;
        writeln!(writer)?;
        writeln!(writer, "pub fn deserialize(data: &[u8]) -> Result<Object, ReadError> {{")?;
        writeln!(writer, "    tlc_runtime::from_bytes(data)")?;
        writeln!(writer, "}}")
    }
}

fn emit_module<W: Write, T>(
    writer: &mut W,
    name: &str,
    items: &[T],
    mut emit_item: impl FnMut(&mut W, &T) -> io::Result<()>,
) -> io::Result<()> {
    writeln!(writer)?;
    writeln!(writer, "pub mod {name} {{")?;
    writeln!(writer, "    #[allow(unused_imports)]")?;
    writeln!(writer, "    use super::*;")?;
    for item in items {
        writeln!(writer)?;
        emit_item(writer, item)?;
    }
    writeln!(writer, "}}")
}

fn emit_struct(writer: &mut impl Write, item: &StructItem) -> io::Result<()> {
    let name = &item.name;

    writeln!(writer, "    /// `{}`", item.declaration)?;
    writeln!(writer, "    #[derive(Clone, Debug, PartialEq)]")?;
    writeln!(writer, "    pub struct {name} {{")?;
    for field in &item.fields {
        writeln!(writer, "        pub {}: {},", field.name, field.rust_type())?;
    }
    writeln!(writer, "    }}")?;
    writeln!(writer)?;

    writeln!(writer, "    impl {name} {{")?;
    writeln!(writer, "        pub const NUMBER: u32 = {:#010x};", item.number)?;
    writeln!(writer, "    }}")?;
    writeln!(writer)?;

    let (writer_param, reader_param) = match item.fields.is_empty() {
        true => ("_", "_"),
        false => ("writer", "reader"),
    };
    writeln!(writer, "    impl Bare for {name} {{")?;
    writeln!(
        writer,
        "        fn serialize_bare(&self, {writer_param}: &mut Writer) -> Result<(), WriteError> {{",
    )?;
    for field in &item.fields {
        let expr = format!("self.{}", field.name);
        match &field.count {
            None => writeln!(writer, "            {}?;", field.repr.write_expr(&expr))?,
            Some(count) => writeln!(
                writer,
                "            write_mult(writer, self.{count}, &{expr}, |elem, writer| {})?;",
                field.repr.write_expr("elem"),
            )?,
        }
    }
    writeln!(writer, "            Ok(())")?;
    writeln!(writer, "        }}")?;
    writeln!(writer)?;
    writeln!(
        writer,
        "        fn deserialize_bare({reader_param}: &mut Reader<'_>) -> Result<Self, ReadError> {{",
    )?;
    for field in &item.fields {
        let read = match &field.count {
            None => field.repr.read_expr(),
            Some(count) => format!("read_elems(reader, {count}, {})?", field.repr.read_fn()),
        };
        writeln!(writer, "            let {}: {} = {read};", field.name, field.rust_type())?;
    }
    let field_names = item.fields.iter().map(|field| &field.name).format(", ");
    match item.fields.is_empty() {
        true => writeln!(writer, "            Ok({name} {{}})")?,
        false => writeln!(writer, "            Ok({name} {{ {field_names} }})")?,
    }
    writeln!(writer, "        }}")?;
    writeln!(writer, "    }}")?;
    writeln!(writer)?;

    writeln!(writer, "    impl Serialize for {name} {{")?;
    writeln!(writer, "        fn serialize(&self, writer: &mut Writer) -> Result<(), WriteError> {{")?;
    writeln!(writer, "            writer.write_number(Self::NUMBER);")?;
    writeln!(writer, "            self.serialize_bare(writer)")?;
    writeln!(writer, "        }}")?;
    writeln!(writer, "    }}")?;
    writeln!(writer)?;

    writeln!(writer, "    impl Deserialize for {name} {{")?;
    writeln!(writer, "        fn deserialize(reader: &mut Reader<'_>) -> Result<Self, ReadError> {{")?;
    writeln!(writer, "            reader.expect_number(Self::NUMBER)?;")?;
    writeln!(writer, "            Self::deserialize_bare(reader)")?;
    writeln!(writer, "        }}")?;
    writeln!(writer, "    }}")?;

    if let Some(returns) = &item.returns {
        writeln!(writer)?;
        writeln!(writer, "    impl Function for {name} {{")?;
        writeln!(writer, "        type Return = {returns};")?;
        writeln!(writer, "    }}")?;
    }
    Ok(())
}

fn emit_enum(writer: &mut impl Write, item: &EnumItem) -> io::Result<()> {
    let name = &item.name;

    writeln!(writer, "    /// `{}`", item.type_name)?;
    writeln!(writer, "    #[derive(Clone, Debug, PartialEq)]")?;
    writeln!(writer, "    pub enum {name} {{")?;
    for variant in &item.variants {
        writeln!(writer, "        /// `{}`", variant.label)?;
        writeln!(writer, "        {}({}),", variant.name, variant.path)?;
    }
    writeln!(writer, "    }}")?;
    writeln!(writer)?;

    writeln!(writer, "    impl Serialize for {name} {{")?;
    writeln!(writer, "        fn serialize(&self, writer: &mut Writer) -> Result<(), WriteError> {{")?;
    writeln!(writer, "            match self {{")?;
    for variant in &item.variants {
        writeln!(writer, "                {name}::{}(value) => value.serialize(writer),", variant.name)?;
    }
    writeln!(writer, "            }}")?;
    writeln!(writer, "        }}")?;
    writeln!(writer, "    }}")?;
    writeln!(writer)?;

    writeln!(writer, "    impl Deserialize for {name} {{")?;
    writeln!(writer, "        fn deserialize(reader: &mut Reader<'_>) -> Result<Self, ReadError> {{")?;
    writeln!(writer, "            match reader.read_number()? {{")?;
    for variant in &item.variants {
        writeln!(
            writer,
            "                {:#010x} => Ok({name}::{}(Bare::deserialize_bare(reader)?)),",
            variant.number, variant.name,
        )?;
    }
    writeln!(writer, "                number => Err(ReadError::UnknownDiscriminant {{ number }}),")?;
    writeln!(writer, "            }}")?;
    writeln!(writer, "        }}")?;
    writeln!(writer, "    }}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(source: &str) -> Result<String, Error> {
        let schema = Schema::parse(0, source, &mut |_| {}).unwrap();
        let module = Context::new(&schema).compile()?;
        let mut output = Vec::new();
        module.emit(&mut output).unwrap();
        Ok(String::from_utf8(output).unwrap())
    }

    #[test]
    fn naming() {
        let mut namespace = Namespace::new(RESERVED_ITEMS);
        assert_eq!(namespace.fresh_upper_camel_case("auth.sentCode"), "AuthSentCode");
        assert_eq!(namespace.fresh_upper_camel_case("getDHConfig"), "GetDhConfig");
        assert_eq!(namespace.fresh_upper_camel_case("authSentCode"), "AuthSentCode1");
        assert_eq!(namespace.fresh_upper_camel_case("object"), "Object1");
        assert_eq!(namespace.fresh_upper_camel_case("Vector t"), "VectorT");

        let mut namespace = Namespace::new(RESERVED_FIELDS);
        assert_eq!(namespace.fresh_lower_snake_case("first_name"), "first_name");
        assert_eq!(namespace.fresh_lower_snake_case("fromId"), "from_id");
        assert_eq!(namespace.fresh_lower_snake_case("type"), "r#type");
        assert_eq!(namespace.fresh_lower_snake_case("self"), "self_");
        assert_eq!(namespace.fresh_lower_snake_case("reader"), "reader1");
    }

    #[test]
    fn constructor_structs() {
        let output = compile(
            "userEmpty#200250ba id:int = User;\n\
             user#d23c81a3 id:int first_name:string photo:UserProfilePhoto = User;",
        )
        .unwrap();

        assert!(output.contains("    pub struct User {\n        pub id: i32,\n        pub first_name: String,\n        pub photo: Box<Object>,\n    }\n"));
        assert!(output.contains("        pub const NUMBER: u32 = 0xd23c81a3;\n"));
        assert!(output.contains("            self.first_name.serialize(writer)?;\n"));
        assert!(output.contains("            let id: i32 = Deserialize::deserialize(reader)?;\n"));
        assert!(output.contains("            Ok(User { id, first_name, photo })\n"));
        assert!(output.contains("    /// `user#d23c81a3 id:int first_name:string photo:UserProfilePhoto = User`\n"));
    }

    #[test]
    fn type_enums() {
        let output = compile(
            "userEmpty#200250ba id:int = User;\n\
             user#d23c81a3 id:int = User;\n\
             ---functions---\n\
             users.getUser#0d91a548 id:int = User;",
        )
        .unwrap();

        assert!(output.contains("    pub enum User {\n        /// `userEmpty`\n        UserEmpty(constructors::UserEmpty),\n        /// `user`\n        User(constructors::User),\n    }\n"));
        assert!(output.contains("                0x200250ba => Ok(User::UserEmpty(Bare::deserialize_bare(reader)?)),\n"));
        assert!(output.contains("    impl Function for UsersGetUser {\n        type Return = types::User;\n    }\n"));
    }

    #[test]
    fn objects_are_sorted() {
        let output = compile("b#00000002 = B;\na#00000001 = A;\nc#00000003 = A;").unwrap();
        let a = output.find("        number: 0x00000001,").unwrap();
        let b = output.find("        number: 0x00000002,").unwrap();
        let c = output.find("        number: 0x00000003,").unwrap();
        assert!(a < b && b < c);
        assert!(output.contains("        read: |reader| Ok(Object::A(Bare::deserialize_bare(reader)?)),\n"));
        assert!(output.contains("    pub struct B {\n    }\n"));
        assert!(output.contains("        fn serialize_bare(&self, _: &mut Writer)"));
    }

    #[test]
    fn empty_schema() {
        let output = compile("").unwrap();
        assert!(output.contains("pub enum Object {\n}\n"));
        assert!(output.contains("        match *self {}\n"));
        assert!(output.contains("pub static COMBINATORS: &[Entry<Object>] = &[\n];\n"));
    }

    #[test]
    fn vectors() {
        let output = compile(
            "message#44f9b43d id:int = Message;\n\
             messages#8c718e87 ids:Vector<int> messages:Vector<Message> bare:Vector<%Message> = Messages;",
        )
        .unwrap();

        assert!(output.contains("        pub ids: Vec<i32>,\n"));
        assert!(output.contains("        pub messages: Vec<types::Message>,\n"));
        assert!(output.contains("        pub bare: Vec<constructors::Message>,\n"));
        assert!(output.contains("            self.messages.serialize(writer)?;\n"));
        assert!(output.contains(
            "            write_vector(writer, self.bare.as_slice(), |elem, writer| \
             elem.serialize_bare(writer))?;\n"
        ));
        assert!(output.contains(
            "            let bare: Vec<constructors::Message> = \
             read_vector(reader, Bare::deserialize_bare)?;\n"
        ));
    }

    #[test]
    fn multiplicities() {
        let output = compile("points#0f0e0d0c n:# [ int ] = Points;\nflags#01020304 # = Flags;").unwrap();
        assert!(output.contains("        pub n: u32,\n        pub int: Vec<i32>,\n"));
        assert!(output.contains("            write_mult(writer, self.n, &self.int, |elem, writer| elem.serialize(writer))?;\n"));
        assert!(output.contains("            let int: Vec<i32> = read_elems(reader, n, Deserialize::deserialize)?;\n"));
        assert!(output.contains("        pub nat: u32,\n"));
    }

    #[test]
    fn templates_are_objects() {
        let output = compile(
            "---functions---\n\
             invokeWithLayer#da9b0d0d {X:Type} layer:int query:!X = X;",
        )
        .unwrap();
        assert!(output.contains("        pub query: Box<Object>,\n"));
        assert!(output.contains("        type Return = Object;\n"));
    }

    #[test]
    fn builtins_are_skipped() {
        let output = compile("int#a8509bda ? = Int;\nuser#d23c81a3 id:int = User;").unwrap();
        assert!(!output.contains("struct Int"));
        assert!(!output.contains("0xa8509bda"));
    }

    #[test]
    fn missing_count() {
        let error = compile("points#0f0e0d0c [ int ] = Points;").unwrap_err();
        assert_eq!(error.reason, Reason::MissingCount);
        assert_eq!(error.param, Some(Symbol::intern("int")));
    }

    #[test]
    fn conditional_fields() {
        let error = compile("user#d23c81a3 flags:# bot:flags.14?true = User;").unwrap_err();
        assert!(matches!(error.reason, Reason::Shape(ShapeError::Conditional { .. })));
    }
}
