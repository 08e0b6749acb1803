#![deny(rust_2018_idioms)]

pub use ast::ast;
pub use compile::{run_compiler, run_compiler_interactive, CompileError, Output};
pub use context::{Config, Context, PassStep};
pub use lex::lex;
pub use parse::parse;

pub mod ast;
pub mod compile;
pub mod context;
pub mod diag;
pub mod lex;
pub mod parse;
pub mod source;
pub mod symbols;
pub mod tree;

#[cfg(test)]
mod tests;
