//! BabyDuck compiler middle-end and virtual machine.
//!
//! `lexer`/`parser` turn `.baby` source into the `ast` contract; `codegen`
//! (consulting `cube`, `memory`, `symtab`) lowers that AST into a flat
//! `quad` list; `bundle` serialises the result to disk and back; `vm` runs
//! the bundle. See SPEC_FULL.md for the full component breakdown.

pub mod ast;
pub mod bundle;
pub mod codegen;
pub mod cube;
pub mod error;
pub mod lexer;
pub mod memory;
pub mod parser;
pub mod quad;
pub mod symtab;
pub mod vm;

use std::time::{SystemTime, UNIX_EPOCH};

use error::CompileError;

/// Runs the full front end + middle end over `source`, naming the resulting
/// bundle's header after `filename`. The one entry point both CLI binaries
/// and integration tests drive the pipeline through.
pub fn compile(source: &str, filename: &str) -> Result<bundle::ObjectBundle, CompileError> {
    let program = parser::parse(source)?;
    let generated = codegen::generate(&program)?;
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string());
    Ok(bundle::ObjectBundle::from_generated(filename, &timestamp, &generated))
}
