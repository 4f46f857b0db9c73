//! A state machine that builds a [`Schema`] from a stream of tokens.

use itertools::Itertools;

use crate::ir::{
    split_namespace, Combinator, CombinatorId, CombinatorKind, Conflict, Identifier, Parameter,
    ParameterKind, Schema, TypeId,
};
use crate::reporting::{Message, Problem};
use crate::source::{BytePos, ByteRange, FileId};
use crate::syntax::lexer::{self, Token};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    Combinators,
    OptionalParams,
    Params,
    ResultType,
    End,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Section {
    Constructors,
    Functions,
}

const EXPECTED_COMBINATOR: &[&str] = &["combinator"];
const EXPECTED_PARAM: &[&str] = &["parameter", "result type"];
const EXPECTED_END: &[&str] = &["`;`"];

/// A declaration that has not reached its `;` yet.
struct Pending {
    kind: CombinatorKind,
    identifier: Identifier,
    number: u32,
    params: Vec<Parameter>,
    result_type: Option<TypeId>,
    range: ByteRange,
    /// The built-in restated by this declaration.
    builtin: Option<CombinatorId>,
    builtin_marker: bool,
}

struct Builder<'a> {
    file_id: FileId,
    schema: Schema,
    section: Section,
    pending: Option<Pending>,
    on_message: &'a mut dyn FnMut(Message),
}

impl Schema {
    /// Build a schema from TL source text.
    ///
    /// Warnings are passed to `on_message`. The first error ends the build.
    pub fn parse(
        file_id: FileId,
        source: &str,
        on_message: &mut dyn FnMut(Message),
    ) -> Result<Schema, Message> {
        let mut builder = Builder {
            file_id,
            schema: Schema::new(),
            section: Section::Constructors,
            pending: None,
            on_message,
        };

        let mut state = State::Combinators;
        for token in lexer::tokens(source) {
            state = match token {
                Ok((start, token, end)) => builder.step(state, token, ByteRange::new(start, end))?,
                Err(error) => {
                    return Err(builder.malformed(error.range(), Problem::InvalidSyntax));
                }
            };
        }

        match state {
            State::Combinators => Ok(builder.schema),
            State::OptionalParams | State::Params | State::ResultType => {
                Err(builder.eof(source, EXPECTED_PARAM))
            }
            State::End => Err(builder.eof(source, EXPECTED_END)),
        }
    }
}

impl<'a> Builder<'a> {
    fn step(&mut self, state: State, token: Token<'_>, range: ByteRange) -> Result<State, Message> {
        match (state, token) {
            (State::Combinators, Token::StartFunctions) if self.section == Section::Constructors => {
                self.section = Section::Functions;
                Ok(State::Combinators)
            }
            (State::Combinators, Token::StartTypes) => {
                (self.on_message)(Message::TypesSectionMarker {
                    file_id: self.file_id,
                    range,
                });
                Ok(State::Combinators)
            }
            (State::Combinators, Token::Combinator(text)) => {
                self.begin(text, range)?;
                Ok(State::OptionalParams)
            }
            (State::Combinators, token) => Err(self.unexpected(&token, range, EXPECTED_COMBINATOR)),

            (State::OptionalParams, Token::OptionalParameter(text)) => {
                let (name, type_text) = split_param(text);
                let (namespace, ident) = split_namespace(type_text);
                let arg_type = self.schema.resolve_type(namespace, ident);
                self.push_param(ParameterKind::OptionalArg, name, arg_type, range)?;
                Ok(State::OptionalParams)
            }
            (State::OptionalParams, token) => self.step(State::Params, token, range),

            (State::Params, Token::Parameter(text)) => {
                let (name, type_text) = split_param(text);
                let arg_type = self.resolve_reference(type_text);
                self.push_param(ParameterKind::Arg, name, arg_type, range)?;
                Ok(State::Params)
            }
            (State::Params, Token::NatParameter) => {
                let arg_type = self.schema.resolve_type(None, "#");
                self.push_param(ParameterKind::ArgNat, "#", arg_type, range)?;
                Ok(State::Params)
            }
            (State::Params, Token::Multiplicity(text)) => {
                let arg_type = self.resolve_reference(text);
                self.push_param(ParameterKind::Mult, text, arg_type, range)?;
                Ok(State::Params)
            }
            (State::Params, Token::BuiltinMarker) => {
                self.builtin_marker(range)?;
                Ok(State::Params)
            }
            (State::Params, token) => self.step(State::ResultType, token, range),

            (State::ResultType, Token::ResultClause(text)) => {
                self.result_type(text, range)?;
                Ok(State::End)
            }
            (State::ResultType, token) => Err(self.unexpected(&token, range, EXPECTED_PARAM)),

            (State::End, Token::CombinatorEnd) => {
                self.finish(range)?;
                Ok(State::Combinators)
            }
            (State::End, token) => Err(self.unexpected(&token, range, EXPECTED_END)),
        }
    }

    fn begin(&mut self, text: &str, range: ByteRange) -> Result<(), Message> {
        let (head, number) = text.rsplit_once('#').unwrap_or((text, ""));
        let number = match number.len() {
            1..=8 => u32::from_str_radix(number, 16).ok(),
            _ => None,
        };
        let number = number.ok_or_else(|| self.malformed(range, Problem::InvalidNumber))?;

        let (namespace, ident) = split_namespace(head);
        let identifier = Identifier::combinator(namespace, ident);
        let kind = match self.section {
            Section::Constructors => CombinatorKind::Constructor,
            Section::Functions => CombinatorKind::Function,
        };

        let builtin = match self.schema.conflict(number, &identifier) {
            None => None,
            Some(Conflict::Number(id)) => {
                let existing = self.schema.combinator(id);
                let restates_builtin = self.schema.builtin(existing).is_some()
                    && existing.identifier == identifier
                    && existing.range.is_none();
                if !restates_builtin {
                    return Err(self.duplicate(Conflict::Number(id), number, &identifier, range));
                }
                Some(id)
            }
            Some(conflict) => return Err(self.duplicate(conflict, number, &identifier, range)),
        };

        self.pending = Some(Pending {
            kind,
            identifier,
            number,
            params: Vec::new(),
            result_type: None,
            range,
            builtin,
            builtin_marker: false,
        });
        Ok(())
    }

    /// Resolve the type of an ordinary or multiplicity parameter, or a result.
    ///
    /// `!X`, and names bound by an optional parameter, refer to type variables.
    fn resolve_reference(&mut self, text: &str) -> TypeId {
        if let Some(ident) = text.strip_prefix('!') {
            return self.schema.resolve_template(ident);
        }
        let is_bound = self.pending.iter().flat_map(|pending| &pending.params).any(|param| {
            param.kind == ParameterKind::OptionalArg && param.identifier.ident.resolve() == text
        });
        if is_bound {
            return self.schema.resolve_template(text);
        }
        let (namespace, ident) = split_namespace(text);
        self.schema.resolve_type(namespace, ident)
    }

    fn push_param(
        &mut self,
        kind: ParameterKind,
        name: &str,
        arg_type: TypeId,
        range: ByteRange,
    ) -> Result<(), Message> {
        if self.pending_mut().builtin.is_some() {
            return Err(self.builtin_mismatch(range));
        }
        let pending = self.pending_mut();
        pending.params.push(Parameter {
            kind,
            identifier: Identifier::parameter(name),
            arg_type,
        });
        pending.range = pending.range.merge(range);
        Ok(())
    }

    fn builtin_marker(&mut self, range: ByteRange) -> Result<(), Message> {
        let pending = self.pending_mut();
        if pending.builtin.is_none() || pending.builtin_marker || !pending.params.is_empty() {
            return Err(self.malformed(range, Problem::MisplacedBuiltinMarker));
        }
        pending.builtin_marker = true;
        pending.range = pending.range.merge(range);
        Ok(())
    }

    fn result_type(&mut self, text: &str, range: ByteRange) -> Result<(), Message> {
        // The clause may wrap onto following lines
        let text = text.split_whitespace().join(" ");
        if text.is_empty() {
            return Err(self.malformed(range, Problem::EmptyResultType));
        }

        let result_type = self.resolve_reference(&text);
        if let Some(id) = self.pending_mut().builtin {
            if self.schema.combinator(id).result_type != result_type {
                return Err(self.builtin_mismatch(range));
            }
        }

        let pending = self.pending_mut();
        pending.result_type = Some(result_type);
        pending.range = pending.range.merge(range);
        Ok(())
    }

    fn finish(&mut self, range: ByteRange) -> Result<(), Message> {
        if let Some(Pending {
            kind: CombinatorKind::Function,
            builtin: Some(_),
            ..
        }) = self.pending
        {
            return Err(self.builtin_mismatch(range));
        }
        let pending = match self.pending.take() {
            Some(pending) => pending,
            None => return Ok(()),
        };
        let range = pending.range.merge(range);
        let result_type = match pending.result_type {
            Some(result_type) => result_type,
            None => return Err(self.malformed(range, Problem::EmptyResultType)),
        };

        if let Some(id) = pending.builtin {
            self.schema.restate_builtin(id, range);
            return Ok(());
        }

        let combinator = Combinator {
            kind: pending.kind,
            identifier: pending.identifier,
            number: pending.number,
            params: pending.params,
            result_type,
            range: Some(range),
        };
        match self.schema.add_combinator(combinator) {
            Ok(_) => Ok(()),
            Err(conflict) => {
                Err(self.duplicate(conflict, pending.number, &pending.identifier, range))
            }
        }
    }

    fn duplicate(
        &self,
        conflict: Conflict,
        number: u32,
        identifier: &Identifier,
        range: ByteRange,
    ) -> Message {
        match conflict {
            Conflict::Number(id) => {
                let existing = self.schema.combinator(id);
                Message::DuplicateCombinatorNumber {
                    file_id: self.file_id,
                    range,
                    number,
                    previous: existing.range,
                    previous_declaration: existing.declaration(&self.schema),
                }
            }
            Conflict::Identifier(id) => {
                let existing = self.schema.combinator(id);
                Message::DuplicateCombinatorIdentifier {
                    file_id: self.file_id,
                    range,
                    identifier: identifier.to_string(),
                    previous: existing.range,
                    previous_declaration: existing.declaration(&self.schema),
                }
            }
        }
    }

    fn pending_mut(&mut self) -> &mut Pending {
        // Parameter and result states are only reachable after a head
        match &mut self.pending {
            Some(pending) => pending,
            None => unreachable!("no pending declaration"),
        }
    }

    /// Render the declaration parsed so far.
    fn context(&self) -> Option<String> {
        let pending = self.pending.as_ref()?;
        let mut context = format!("{}#{:08x}", pending.identifier, pending.number);
        if pending.builtin_marker {
            context.push_str(" ?");
        }
        for param in &pending.params {
            context.push(' ');
            context.push_str(&self.schema.param_text(param));
        }
        if let Some(result_type) = pending.result_type {
            context.push_str(" = ");
            context.push_str(&self.schema.type_name(result_type));
        }
        Some(context)
    }

    fn malformed(&self, range: ByteRange, problem: Problem) -> Message {
        Message::MalformedDeclaration {
            file_id: self.file_id,
            range,
            problem,
            context: self.context(),
        }
    }

    fn builtin_mismatch(&self, range: ByteRange) -> Message {
        let builtin = self.pending.as_ref().and_then(|pending| pending.builtin);
        let builtin = match builtin {
            Some(id) => self.schema.combinator(id).declaration(&self.schema),
            None => String::new(),
        };
        self.malformed(range, Problem::BuiltinMismatch { builtin })
    }

    fn unexpected(
        &self,
        token: &Token<'_>,
        range: ByteRange,
        expected: &'static [&'static str],
    ) -> Message {
        let found = token.description();
        self.malformed(range, Problem::UnexpectedToken { found, expected })
    }

    fn eof(&self, source: &str, expected: &'static [&'static str]) -> Message {
        let eof = source.len() as BytePos;
        self.malformed(ByteRange::new(eof, eof), Problem::UnexpectedEof { expected })
    }
}

fn split_param(text: &str) -> (&str, &str) {
    text.split_once(':').unwrap_or((text, ""))
}
