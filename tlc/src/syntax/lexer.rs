use logos::Logos;

use crate::source::{BytePos, ByteRange};

#[derive(Clone, Debug, PartialEq, Eq, Logos)]
pub enum Token<'source> {
    #[regex(r"([a-z][a-zA-Z0-9_]*\.)?[a-zA-Z_][a-zA-Z0-9_]*#[0-9a-fA-F]+")]
    Combinator(&'source str),
    #[regex(r"\{[a-zA-Z_][a-zA-Z0-9_]*:[^ \t\r\n\f{}]+\}", |lex| {
        let slice = lex.slice();
        &slice[1..(slice.len() - 1)]
    })]
    OptionalParameter(&'source str),
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*:[^ \t\r\n\f;{}\[\]=]+")]
    Parameter(&'source str),
    #[token("#")]
    NatParameter,
    #[regex(r"\[[ \t\r\n\f]*[^ \t\r\n\f\[\]]+[ \t\r\n\f]*\]", |lex| {
        let slice = lex.slice();
        slice[1..(slice.len() - 1)].trim()
    })]
    Multiplicity(&'source str),
    #[token("?")]
    BuiltinMarker,
    #[regex(r"=[^;=]*", |lex| &lex.slice()[1..])]
    ResultClause(&'source str),
    #[token(";")]
    CombinatorEnd,
    #[token("---functions---")]
    StartFunctions,
    #[token("---types---")]
    StartTypes,

    #[error]
    #[regex(r"[ \t\r\n\f]+", logos::skip)]
    #[regex(r"//[^\n]*", logos::skip)]
    Error,
}

pub type Spanned<Tok, Loc> = (Loc, Tok, Loc);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// A run of text that matches no production.
    InvalidSyntax { range: ByteRange },
}

impl Error {
    pub fn range(&self) -> ByteRange {
        match self {
            Error::InvalidSyntax { range } => *range,
        }
    }
}

pub fn tokens(
    source: &str,
) -> impl Iterator<Item = Result<Spanned<Token<'_>, BytePos>, Error>> {
    assert!(
        source.len() <= crate::source::MAX_SOURCE_LEN,
        "`source` must be less than 4GiB in length"
    );

    Token::lexer(source)
        .spanned()
        .map(move |(token, range)| {
            let start = range.start as BytePos;
            let end = range.end as BytePos;
            match token {
                Token::Error => {
                    // Report the whole non-whitespace run
                    let rest = source.get(range.start..).unwrap_or("");
                    let len = rest.find(char::is_whitespace).unwrap_or(rest.len());
                    let end = BytePos::max(end, start + len as BytePos);
                    Err(Error::InvalidSyntax {
                        range: ByteRange::new(start, end),
                    })
                }
                token => Ok((start, token, end)),
            }
        })
}

impl<'source> Token<'source> {
    pub fn description(&self) -> &'static str {
        match self {
            Token::Combinator(_) => "combinator",
            Token::OptionalParameter(_) => "optional parameter",
            Token::Parameter(_) => "parameter",
            Token::NatParameter => "#",
            Token::Multiplicity(_) => "multiplicity",
            Token::BuiltinMarker => "?",
            Token::ResultClause(_) => "result type",
            Token::CombinatorEnd => ";",
            Token::StartFunctions => "---functions---",
            Token::StartTypes => "---types---",
            Token::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Result<Token<'_>, Error>> {
        tokens(source)
            .map(|result| result.map(|(_, token, _)| token))
            .collect()
    }

    #[test]
    fn declaration() {
        assert_eq!(
            lex("user#d23c81a3 id:int first_name:string = User;"),
            vec![
                Ok(Token::Combinator("user#d23c81a3")),
                Ok(Token::Parameter("id:int")),
                Ok(Token::Parameter("first_name:string")),
                Ok(Token::ResultClause(" User")),
                Ok(Token::CombinatorEnd),
            ]
        );
    }

    #[test]
    fn parameter_forms() {
        assert_eq!(
            lex("vector#1cb5c415 {t:Type} # [ t ] = Vector t;"),
            vec![
                Ok(Token::Combinator("vector#1cb5c415")),
                Ok(Token::OptionalParameter("t:Type")),
                Ok(Token::NatParameter),
                Ok(Token::Multiplicity("t")),
                Ok(Token::ResultClause(" Vector t")),
                Ok(Token::CombinatorEnd),
            ]
        );
    }

    #[test]
    fn namespaced_combinator() {
        assert_eq!(
            lex("auth.sentCode#efed51d9 phone_registered:Bool = auth.SentCode;")[..2],
            [
                Ok(Token::Combinator("auth.sentCode#efed51d9")),
                Ok(Token::Parameter("phone_registered:Bool")),
            ]
        );
    }

    #[test]
    fn builtin_marker() {
        assert_eq!(
            lex("int#a8509bda ? = Int;"),
            vec![
                Ok(Token::Combinator("int#a8509bda")),
                Ok(Token::BuiltinMarker),
                Ok(Token::ResultClause(" Int")),
                Ok(Token::CombinatorEnd),
            ]
        );
    }

    #[test]
    fn section_markers_and_comments() {
        assert_eq!(
            lex("// constructors\n---functions---\n---types---"),
            vec![Ok(Token::StartFunctions), Ok(Token::StartTypes)]
        );
    }

    #[test]
    fn invalid_syntax_covers_run() {
        let source = "user#d23c81a3 $$$bad = User;";
        let error = tokens(source).find_map(Result::err).unwrap();
        assert_eq!(error.range(), ByteRange::new(14, 20));
    }
}
