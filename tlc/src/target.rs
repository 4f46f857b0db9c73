//! Code generators that can be selected from the command line.

use std::fmt;
use std::io::{self, Write};

use crate::ir::Schema;
use crate::pass::{ir_to_pretty, ir_to_rust};
use crate::reporting::Message;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Target {
    Rust,
    Tl,
}

#[derive(Debug)]
pub enum Error {
    Compile(ir_to_rust::Error),
    Io(io::Error),
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Error {
        Error::Io(error)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Compile(error) => error.reason.fmt(f),
            Error::Io(error) => write!(f, "couldn't write output: {error}"),
        }
    }
}

impl std::error::Error for Error {}

/// Names further than this from every target get no suggestion.
const MAX_SUGGESTION_DISTANCE: usize = 2;

impl Target {
    pub const ALL: [Target; 2] = [Target::Rust, Target::Tl];

    pub fn name(self) -> &'static str {
        match self {
            Target::Rust => "rust",
            Target::Tl => "tl",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Target::Rust => "Rust bindings for the `tlc-runtime` crate",
            Target::Tl => "the schema in canonical TL syntax",
        }
    }

    pub fn from_name(name: &str) -> Result<Target, Message> {
        if let Some(target) = Target::ALL.into_iter().find(|target| target.name() == name) {
            return Ok(target);
        }

        let suggestion = (Target::ALL.into_iter())
            .map(|target| (levenshtein::levenshtein(name, target.name()), target.name()))
            .filter(|(distance, _)| *distance <= MAX_SUGGESTION_DISTANCE)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, name)| name);

        Err(Message::UnknownTarget {
            name: name.to_owned(),
            suggestion,
        })
    }

    /// Write the output of the target for a built schema.
    ///
    /// `width` is the preferred line width of pretty printed output.
    pub fn emit(self, schema: &Schema, width: usize, writer: &mut impl Write) -> Result<(), Error> {
        match self {
            Target::Rust => {
                let module = ir_to_rust::Context::new(schema).compile().map_err(Error::Compile)?;
                module.emit(writer)?;
            }
            Target::Tl => {
                let arena = pretty::Arena::new();
                let doc = ir_to_pretty::from_schema(&arena, schema).into_doc();
                write!(writer, "{}", doc.pretty(width))?;
            }
        }
        Ok(())
    }
}
