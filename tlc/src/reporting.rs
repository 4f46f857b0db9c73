//! Diagnostic messages produced while building a schema.
//!
//! These can be converted to [`Diagnostic`]s in order to present them to the user.

use codespan_reporting::diagnostic::{Diagnostic, Label};

use crate::source::{ByteRange, FileId};

/// Schema diagnostic messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    DuplicateCombinatorNumber {
        file_id: FileId,
        range: ByteRange,
        number: u32,
        /// The earlier declaration, or `None` if it is built in.
        previous: Option<ByteRange>,
        previous_declaration: String,
    },
    DuplicateCombinatorIdentifier {
        file_id: FileId,
        range: ByteRange,
        identifier: String,
        previous: Option<ByteRange>,
        previous_declaration: String,
    },
    MalformedDeclaration {
        file_id: FileId,
        range: ByteRange,
        problem: Problem,
        /// The declaration parsed so far.
        context: Option<String>,
    },
    TypesSectionMarker {
        file_id: FileId,
        range: ByteRange,
    },
    /// A declaration that parses, but that a target cannot generate code for.
    UnsupportedDeclaration {
        file_id: FileId,
        range: Option<ByteRange>,
        declaration: String,
        /// The offending parameter, or `None` for the result type.
        param: Option<String>,
        reason: String,
    },
    UnknownTarget {
        name: String,
        suggestion: Option<&'static str>,
    },
}

/// Ways in which a declaration can fail to follow the grammar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Problem {
    InvalidSyntax,
    UnexpectedToken {
        found: &'static str,
        expected: &'static [&'static str],
    },
    UnexpectedEof {
        expected: &'static [&'static str],
    },
    InvalidNumber,
    EmptyResultType,
    MisplacedBuiltinMarker,
    BuiltinMismatch {
        builtin: String,
    },
}

impl Problem {
    fn message(&self) -> String {
        match self {
            Problem::InvalidSyntax => "invalid syntax".to_owned(),
            Problem::UnexpectedToken { found, .. } => format!("unexpected {found}"),
            Problem::UnexpectedEof { .. } => "unexpected end of file".to_owned(),
            Problem::InvalidNumber => "invalid combinator number".to_owned(),
            Problem::EmptyResultType => "missing result type".to_owned(),
            Problem::MisplacedBuiltinMarker => "unexpected `?`".to_owned(),
            Problem::BuiltinMismatch { .. } => "mismatched built-in declaration".to_owned(),
        }
    }

    fn notes(&self) -> Vec<String> {
        match self {
            Problem::UnexpectedToken { expected, .. } | Problem::UnexpectedEof { expected } => {
                format_expected(expected).into_iter().collect()
            }
            Problem::InvalidNumber => {
                vec!["combinator numbers are 1 to 8 hexadecimal digits".to_owned()]
            }
            Problem::MisplacedBuiltinMarker => {
                vec!["`?` may only follow the head of a built-in combinator".to_owned()]
            }
            Problem::BuiltinMismatch { builtin } => vec![format!("expected `{builtin}`")],
            Problem::InvalidSyntax | Problem::EmptyResultType => Vec::new(),
        }
    }
}

impl Message {
    pub fn to_diagnostic(&self) -> Diagnostic<FileId> {
        match self {
            Message::DuplicateCombinatorNumber {
                file_id,
                range,
                number,
                previous,
                previous_declaration,
            } => Diagnostic::error()
                .with_message(format!("duplicate combinator number `#{number:08x}`"))
                .with_labels(duplicate_labels(*file_id, *range, *previous))
                .with_notes(vec![previous_note(*previous, previous_declaration)]),
            Message::DuplicateCombinatorIdentifier {
                file_id,
                range,
                identifier,
                previous,
                previous_declaration,
            } => Diagnostic::error()
                .with_message(format!("duplicate combinator identifier `{identifier}`"))
                .with_labels(duplicate_labels(*file_id, *range, *previous))
                .with_notes(vec![previous_note(*previous, previous_declaration)]),
            Message::MalformedDeclaration {
                file_id,
                range,
                problem,
                context,
            } => {
                let mut notes = problem.notes();
                if let Some(context) = context {
                    notes.push(format!("while parsing `{context}`"));
                }
                Diagnostic::error()
                    .with_message(format!("malformed declaration: {}", problem.message()))
                    .with_labels(vec![Label::primary(*file_id, *range)])
                    .with_notes(notes)
            }
            Message::TypesSectionMarker { file_id, range } => Diagnostic::warning()
                .with_message("the `---types---` section is not supported")
                .with_labels(vec![
                    Label::primary(*file_id, *range).with_message("section marker ignored")
                ])
                .with_notes(vec![
                    "the declarations that follow stay in the current section".to_owned(),
                ]),
            Message::UnsupportedDeclaration {
                file_id,
                range,
                declaration,
                param,
                reason,
            } => {
                let label = match param {
                    Some(param) => format!("in parameter `{param}`"),
                    None => "in the result type".to_owned(),
                };
                Diagnostic::error()
                    .with_message(format!("unsupported declaration: {reason}"))
                    .with_labels(
                        (range.iter())
                            .map(|range| Label::primary(*file_id, *range).with_message(&label))
                            .collect(),
                    )
                    .with_notes(vec![format!("while compiling `{declaration}`")])
            }
            Message::UnknownTarget { name, suggestion } => {
                let mut notes = Vec::new();
                if let Some(suggestion) = suggestion {
                    notes.push(format!("help: did you mean `{suggestion}`?"));
                }
                notes.push("help: run `tlc targets` to list the available targets".to_owned());
                Diagnostic::error()
                    .with_message(format!("unknown target `{name}`"))
                    .with_notes(notes)
            }
        }
    }
}

fn duplicate_labels(
    file_id: FileId,
    range: ByteRange,
    previous: Option<ByteRange>,
) -> Vec<Label<FileId>> {
    let mut labels = vec![Label::primary(file_id, range).with_message("redeclared here")];
    if let Some(previous) = previous {
        labels.push(Label::secondary(file_id, previous).with_message("first declared here"));
    }
    labels
}

fn previous_note(previous: Option<ByteRange>, declaration: &str) -> String {
    match previous {
        Some(_) => format!("previous declaration: `{declaration}`"),
        None => format!("`{declaration}` is built in"),
    }
}

fn format_expected(expected: &[impl std::fmt::Display]) -> Option<String> {
    use itertools::Itertools;

    expected.split_last().map(|items| match items {
        (last, []) => format!("expected {last}"),
        (last, expected) => format!("expected {} or {last}", expected.iter().format(", ")),
    })
}

#[cfg(test)]
mod tests {
    use codespan_reporting::diagnostic::{LabelStyle, Severity};

    use super::*;

    #[test]
    fn duplicate_points_at_both_declarations() {
        let message = Message::DuplicateCombinatorNumber {
            file_id: 0,
            range: ByteRange::new(20, 40),
            number: 0xaabbccdd,
            previous: Some(ByteRange::new(0, 19)),
            previous_declaration: "a#aabbccdd = A".to_owned(),
        };
        let diagnostic = message.to_diagnostic();
        assert_eq!(diagnostic.severity, Severity::Error);
        assert_eq!(diagnostic.message, "duplicate combinator number `#aabbccdd`");
        assert_eq!(diagnostic.labels.len(), 2);
        assert_eq!(diagnostic.labels[1].style, LabelStyle::Secondary);
        assert_eq!(diagnostic.labels[1].range, 0..19);
    }

    #[test]
    fn builtin_duplicate_has_note() {
        let message = Message::DuplicateCombinatorIdentifier {
            file_id: 0,
            range: ByteRange::new(0, 12),
            identifier: "int".to_owned(),
            previous: None,
            previous_declaration: "int#a8509bda ? = Int".to_owned(),
        };
        let diagnostic = message.to_diagnostic();
        assert_eq!(diagnostic.labels.len(), 1);
        assert_eq!(diagnostic.notes, ["`int#a8509bda ? = Int` is built in"]);
    }

    #[test]
    fn expected_tokens() {
        assert_eq!(format_expected(&["`;`"]).as_deref(), Some("expected `;`"));
        assert_eq!(
            format_expected(&["parameter", "`#`", "result type"]).as_deref(),
            Some("expected parameter, `#` or result type")
        );
    }

    #[test]
    fn unsupported_declaration_without_source() {
        let message = Message::UnsupportedDeclaration {
            file_id: 0,
            range: None,
            declaration: "points#0f0e0d0c [ int ] = Points".to_owned(),
            param: Some("int".to_owned()),
            reason: "multiplicity has no preceding `#` count".to_owned(),
        };
        let diagnostic = message.to_diagnostic();
        assert!(diagnostic.labels.is_empty());
        assert_eq!(
            diagnostic.message,
            "unsupported declaration: multiplicity has no preceding `#` count"
        );
    }

    #[test]
    fn types_marker_is_a_warning() {
        let message = Message::TypesSectionMarker {
            file_id: 0,
            range: ByteRange::new(0, 11),
        };
        assert_eq!(message.to_diagnostic().severity, Severity::Warning);
    }
}
