//! The textual TL schema language.
//!
//! Source text is split into [`lexer::Token`]s, which drive the state machine
//! in `parser` to build an [`ir::Schema`](crate::ir::Schema).

pub mod lexer;
mod parser;
