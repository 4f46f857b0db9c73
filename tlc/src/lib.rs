//! A compiler for TL binary schemas.

pub mod binary;
pub mod driver;
pub mod ir;
pub mod pass;
pub mod reporting;
pub mod source;
pub mod symbol;
pub mod syntax;
pub mod target;

// Public exports
pub use driver::{Driver, Status};
