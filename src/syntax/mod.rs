//! Syntax layer: grammar, parser, and canonical printer for the script
//! dialect. This is the parser/printer seam the normalizer and the pass
//! pipeline are built on.

pub mod parser;
pub mod printer;

pub use parser::parse;
pub use printer::{PrintOptions, Printer};
