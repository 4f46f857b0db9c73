//! The intermediate representation of a TL schema.
//!
//! A [`Schema`] owns every [`Type`] and [`Combinator`] it declares. Other
//! values refer to them through [`TypeId`] and [`CombinatorId`] handles, which
//! stay valid for the lifetime of the schema because nothing is ever removed.

use std::fmt;

use fxhash::{FxBuildHasher, FxHashMap};
use indexmap::IndexMap;

use crate::source::ByteRange;
use crate::symbol::Symbol;

pub mod builtin;
pub mod shape;

use self::builtin::{Builtin, BUILTINS};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IdentifierKind {
    Parameter,
    Combinator,
    Type,
    /// A type variable, bound by a `{X:Type}` parameter.
    Template,
}

/// A possibly namespaced name.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub kind: IdentifierKind,
    pub namespace: Option<Symbol>,
    pub ident: Symbol,
}

impl Identifier {
    pub fn new(kind: IdentifierKind, namespace: Option<&str>, ident: &str) -> Identifier {
        Identifier {
            kind,
            namespace: namespace.map(Symbol::intern),
            ident: Symbol::intern(ident),
        }
    }

    pub fn parameter(ident: &str) -> Identifier {
        Identifier::new(IdentifierKind::Parameter, None, ident)
    }

    pub fn combinator(namespace: Option<&str>, ident: &str) -> Identifier {
        Identifier::new(IdentifierKind::Combinator, namespace, ident)
    }

    pub fn of_type(namespace: Option<&str>, ident: &str) -> Identifier {
        Identifier::new(IdentifierKind::Type, namespace, ident)
    }

    pub fn template(ident: &str) -> Identifier {
        Identifier::new(IdentifierKind::Template, None, ident)
    }

    /// Values of boxed types carry their combinator number on the wire.
    pub fn is_boxed(&self) -> bool {
        match self.kind {
            IdentifierKind::Type => {
                let ident = self.ident.resolve();
                ident != "#" && !ident.starts_with(|c: char| c.is_ascii_lowercase())
            }
            IdentifierKind::Template => true,
            IdentifierKind::Parameter | IdentifierKind::Combinator => false,
        }
    }

    /// Values of bare types are written without a combinator number.
    pub fn is_bare(&self) -> bool {
        self.kind == IdentifierKind::Type && !self.is_boxed()
    }

    /// The raw 32-bit `#` type.
    pub fn is_nat(&self) -> bool {
        self.kind == IdentifierKind::Type && self.ident.resolve() == "#"
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.namespace {
            Some(namespace) => write!(f, "{}.{}", namespace, self.ident),
            None => write!(f, "{}", self.ident),
        }
    }
}

/// Split a reference of the form `(namespace.)?rest`.
///
/// The namespace must be a lowercase identifier, and `rest` must start with a
/// letter, so that conditional types like `flags.0?true` are left whole.
pub fn split_namespace(text: &str) -> (Option<&str>, &str) {
    if let Some((namespace, rest)) = text.split_once('.') {
        let is_namespace = namespace.starts_with(|c: char| c.is_ascii_lowercase())
            && namespace.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if is_namespace && rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return (Some(namespace), rest);
        }
    }
    (None, text)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(usize);

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CombinatorId(usize);

#[derive(Clone, Debug)]
pub struct Type {
    identifier: Identifier,
    constructors: Vec<CombinatorId>,
}

impl Type {
    fn new(identifier: Identifier) -> Type {
        Type {
            identifier,
            constructors: Vec::new(),
        }
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Every combinator with this result type, in declaration order.
    pub fn constructors(&self) -> &[CombinatorId] {
        &self.constructors
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParameterKind {
    /// `{name:Type}`, not present on the wire.
    OptionalArg,
    /// `name:Type`
    Arg,
    /// `#`, a raw 32-bit flags word.
    ArgNat,
    /// `[ t ]`, a run of elements counted by the latest nat field.
    Mult,
}

#[derive(Clone, Debug)]
pub struct Parameter {
    pub kind: ParameterKind,
    pub identifier: Identifier,
    pub arg_type: TypeId,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CombinatorKind {
    Constructor,
    Function,
}

#[derive(Clone, Debug)]
pub struct Combinator {
    pub kind: CombinatorKind,
    pub identifier: Identifier,
    pub number: u32,
    pub params: Vec<Parameter>,
    pub result_type: TypeId,
    /// The declaration in the source schema. Built-ins not restated in the
    /// schema have none.
    pub range: Option<ByteRange>,
}

impl Combinator {
    /// The canonical declaration text, eg. `user#d23c81a3 id:int = User`.
    pub fn declaration(&self, schema: &Schema) -> String {
        let mut declaration = format!("{}#{:08x}", self.identifier, self.number);
        if schema.builtin(self).is_some() {
            declaration.push_str(" ?");
        }
        for param in &self.params {
            declaration.push(' ');
            declaration.push_str(&schema.param_text(param));
        }
        declaration.push_str(" = ");
        declaration.push_str(&schema.type_name(self.result_type));
        declaration
    }

    /// Iterate over the parameters that appear on the wire.
    pub fn fields(&self) -> impl Iterator<Item = &Parameter> {
        self.params
            .iter()
            .filter(|param| param.kind != ParameterKind::OptionalArg)
    }
}

/// The existing combinator that prevents a new one from being added.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Conflict {
    Number(CombinatorId),
    Identifier(CombinatorId),
}

/// The root of the intermediate representation.
#[derive(Clone, Debug)]
pub struct Schema {
    types: IndexMap<Identifier, Type, FxBuildHasher>,
    combinators: IndexMap<u32, Combinator, FxBuildHasher>,
    identifiers: FxHashMap<Identifier, CombinatorId>,
}

impl Schema {
    /// Construct a schema holding only the built-in primitives.
    pub fn new() -> Schema {
        let mut schema = Schema {
            types: IndexMap::default(),
            combinators: IndexMap::default(),
            identifiers: FxHashMap::default(),
        };

        for builtin in &BUILTINS {
            let result_type = schema.resolve_type(None, builtin.type_name);
            schema.insert_combinator(Combinator {
                kind: CombinatorKind::Constructor,
                identifier: Identifier::combinator(None, builtin.name),
                number: builtin.number(),
                params: Vec::new(),
                result_type,
                range: None,
            });
        }

        schema
    }

    fn intern_type(&mut self, identifier: Identifier) -> TypeId {
        match self.types.get_index_of(&identifier) {
            Some(index) => TypeId(index),
            None => TypeId(self.types.insert_full(identifier, Type::new(identifier)).0),
        }
    }

    /// Look up a type, creating it on first reference.
    pub fn resolve_type(&mut self, namespace: Option<&str>, ident: &str) -> TypeId {
        self.intern_type(Identifier::of_type(namespace, ident))
    }

    /// Look up a type variable, creating it on first reference.
    pub fn resolve_template(&mut self, ident: &str) -> TypeId {
        self.intern_type(Identifier::template(ident))
    }

    pub fn lookup_type(&self, identifier: &Identifier) -> Option<TypeId> {
        self.types.get_index_of(identifier).map(TypeId)
    }

    pub fn get_type(&self, id: TypeId) -> &Type {
        &self.types[id.0]
    }

    pub fn type_name(&self, id: TypeId) -> String {
        self.get_type(id).identifier.to_string()
    }

    pub fn combinator(&self, id: CombinatorId) -> &Combinator {
        &self.combinators[id.0]
    }

    pub fn combinator_by_number(&self, number: u32) -> Option<CombinatorId> {
        self.combinators.get_index_of(&number).map(CombinatorId)
    }

    pub fn combinator_by_identifier(&self, identifier: &Identifier) -> Option<CombinatorId> {
        self.identifiers.get(identifier).copied()
    }

    /// Find the combinator that would clash with a new declaration.
    pub fn conflict(&self, number: u32, identifier: &Identifier) -> Option<Conflict> {
        if let Some(id) = self.combinator_by_number(number) {
            return Some(Conflict::Number(id));
        }
        self.combinator_by_identifier(identifier)
            .map(Conflict::Identifier)
    }

    /// Register a combinator and append it to its result type's constructors.
    ///
    /// The schema is left unchanged if the number or identifier is taken.
    pub fn add_combinator(&mut self, combinator: Combinator) -> Result<CombinatorId, Conflict> {
        match self.conflict(combinator.number, &combinator.identifier) {
            Some(conflict) => Err(conflict),
            None => Ok(self.insert_combinator(combinator)),
        }
    }

    fn insert_combinator(&mut self, combinator: Combinator) -> CombinatorId {
        let result_type = combinator.result_type;
        let identifier = combinator.identifier;
        let id = CombinatorId(self.combinators.insert_full(combinator.number, combinator).0);
        self.identifiers.insert(identifier, id);
        self.types[result_type.0].constructors.push(id);
        id
    }

    /// Record that a built-in was restated in the schema source.
    pub(crate) fn restate_builtin(&mut self, id: CombinatorId, range: ByteRange) {
        self.combinators[id.0].range = Some(range);
    }

    pub fn types(&self) -> impl Iterator<Item = (TypeId, &Type)> {
        self.types.values().enumerate().map(|(index, r#type)| (TypeId(index), r#type))
    }

    pub fn combinators(&self) -> impl Iterator<Item = (CombinatorId, &Combinator)> {
        (self.combinators.values().enumerate())
            .map(|(index, combinator)| (CombinatorId(index), combinator))
    }

    pub fn constructors(&self) -> impl Iterator<Item = (CombinatorId, &Combinator)> {
        (self.combinators()).filter(|(_, combinator)| combinator.kind == CombinatorKind::Constructor)
    }

    pub fn functions(&self) -> impl Iterator<Item = (CombinatorId, &Combinator)> {
        (self.combinators()).filter(|(_, combinator)| combinator.kind == CombinatorKind::Function)
    }

    /// The built-ins are always the first combinators registered.
    pub fn is_builtin(&self, number: u32) -> bool {
        self.combinator_by_number(number)
            .map_or(false, |id| id.0 < BUILTINS.len())
    }

    pub fn builtin(&self, combinator: &Combinator) -> Option<&'static Builtin> {
        let id = self.combinator_by_number(combinator.number)?;
        BUILTINS.get(id.0)
    }

    /// The combinators of a type, without functions that return it.
    pub fn type_constructors(&self, id: TypeId) -> impl Iterator<Item = (CombinatorId, &Combinator)> {
        (self.get_type(id).constructors.iter())
            .map(move |id| (*id, self.combinator(*id)))
            .filter(|(_, combinator)| combinator.kind == CombinatorKind::Constructor)
    }

    pub(crate) fn param_text(&self, param: &Parameter) -> String {
        let r#type = self.get_type(param.arg_type);
        let type_name = match r#type.identifier.kind {
            IdentifierKind::Template => format!("!{}", r#type.identifier),
            _ => r#type.identifier.to_string(),
        };
        match param.kind {
            ParameterKind::OptionalArg => format!("{{{}:{}}}", param.identifier, type_name),
            ParameterKind::Arg => format!("{}:{}", param.identifier, type_name),
            ParameterKind::ArgNat => "#".to_owned(),
            ParameterKind::Mult => format!("[ {} ]", r#type.identifier),
        }
    }
}

impl Default for Schema {
    fn default() -> Schema {
        Schema::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combinator(schema: &mut Schema, name: &str, number: u32, result: &str) -> Combinator {
        Combinator {
            kind: CombinatorKind::Constructor,
            identifier: Identifier::combinator(None, name),
            number,
            params: Vec::new(),
            result_type: schema.resolve_type(None, result),
            range: None,
        }
    }

    #[test]
    fn boxed_and_bare() {
        assert!(Identifier::of_type(None, "User").is_boxed());
        assert!(Identifier::of_type(Some("auth"), "SentCode").is_boxed());
        assert!(Identifier::of_type(None, "int").is_bare());
        assert!(Identifier::of_type(None, "#").is_bare());
        assert!(Identifier::of_type(None, "#").is_nat());
        assert!(!Identifier::parameter("User").is_boxed());
    }

    #[test]
    fn identifier_equality_includes_kind() {
        assert_ne!(Identifier::of_type(None, "X"), Identifier::template("X"));
        assert_ne!(
            Identifier::of_type(Some("a"), "X"),
            Identifier::of_type(Some("b"), "X")
        );
    }

    #[test]
    fn namespace_splitting() {
        assert_eq!(split_namespace("auth.SentCode"), (Some("auth"), "SentCode"));
        assert_eq!(split_namespace("User"), (None, "User"));
        assert_eq!(split_namespace("flags.0?true"), (None, "flags.0?true"));
        assert_eq!(split_namespace("Auth.SentCode"), (None, "Auth.SentCode"));
    }

    #[test]
    fn types_are_interned() {
        let mut schema = Schema::new();
        let first = schema.resolve_type(Some("storage"), "FileType");
        let second = schema.resolve_type(Some("storage"), "FileType");
        let other = schema.resolve_type(None, "FileType");
        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(schema.type_name(first), "storage.FileType");
    }

    #[test]
    fn builtins_are_registered() {
        let schema = Schema::new();
        let id = schema.combinator_by_number(0xa8509bda).unwrap();
        let int = schema.combinator(id);
        assert_eq!(int.identifier.to_string(), "int");
        assert_eq!(schema.type_name(int.result_type), "Int");
        assert!(schema.is_builtin(0xa8509bda));
        assert_eq!(int.declaration(&schema), "int#a8509bda ? = Int");
        assert_eq!(schema.combinators().count(), BUILTINS.len());
    }

    #[test]
    fn adding_appends_to_result_type() {
        let mut schema = Schema::new();
        let empty = combinator(&mut schema, "userEmpty", 0x200250ba, "User");
        let full = combinator(&mut schema, "user", 0xd23c81a3, "User");
        let empty = schema.add_combinator(empty).unwrap();
        let full = schema.add_combinator(full).unwrap();

        let user = schema.lookup_type(&Identifier::of_type(None, "User")).unwrap();
        assert_eq!(schema.get_type(user).constructors(), &[empty, full]);
        assert!(!schema.is_builtin(0xd23c81a3));
    }

    #[test]
    fn duplicate_number_leaves_schema_unchanged() {
        let mut schema = Schema::new();
        let first = combinator(&mut schema, "first", 0xaabbccdd, "A");
        let second = combinator(&mut schema, "second", 0xaabbccdd, "B");
        let first = schema.add_combinator(first).unwrap();
        let count = schema.combinators().count();

        assert_eq!(schema.add_combinator(second), Err(Conflict::Number(first)));
        assert_eq!(schema.combinators().count(), count);
        let b = schema.lookup_type(&Identifier::of_type(None, "B")).unwrap();
        assert!(schema.get_type(b).constructors().is_empty());
        assert_eq!(
            schema.combinator_by_identifier(&Identifier::combinator(None, "second")),
            None
        );
    }

    #[test]
    fn duplicate_identifier() {
        let mut schema = Schema::new();
        let first = combinator(&mut schema, "user", 1, "User");
        let second = combinator(&mut schema, "user", 2, "User");
        let first = schema.add_combinator(first).unwrap();
        assert_eq!(schema.add_combinator(second), Err(Conflict::Identifier(first)));
        assert_eq!(schema.combinator_by_number(2), None);
    }

    #[test]
    fn declaration_text() {
        let mut schema = Schema::new();
        let int = schema.resolve_type(None, "int");
        let nat = schema.resolve_type(None, "#");
        let kind = schema.resolve_type(None, "Type");
        let x = schema.resolve_template("X");
        let combinator = Combinator {
            kind: CombinatorKind::Function,
            identifier: Identifier::combinator(None, "invokeWithLayer"),
            number: 0xda9b0d0d,
            params: vec![
                Parameter {
                    kind: ParameterKind::OptionalArg,
                    identifier: Identifier::parameter("X"),
                    arg_type: kind,
                },
                Parameter {
                    kind: ParameterKind::Arg,
                    identifier: Identifier::parameter("layer"),
                    arg_type: int,
                },
                Parameter {
                    kind: ParameterKind::Arg,
                    identifier: Identifier::parameter("flags"),
                    arg_type: nat,
                },
                Parameter {
                    kind: ParameterKind::Arg,
                    identifier: Identifier::parameter("query"),
                    arg_type: x,
                },
            ],
            result_type: x,
            range: None,
        };
        assert_eq!(
            combinator.declaration(&schema),
            "invokeWithLayer#da9b0d0d {X:Type} layer:int flags:# query:!X = X"
        );
        assert_eq!(combinator.fields().count(), 3);
    }
}
