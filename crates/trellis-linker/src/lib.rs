//! Trellis Linker — scope merging, cross-file reference linking, and
//! flattening an entry machine's import closure into one merged output

pub mod export;
pub mod linker;
pub mod merge;
pub mod scope;

#[cfg(test)]
pub mod tests;

pub use linker::Linker;
pub use merge::{merge_machines, MergedMachine, Provenance};
pub use scope::{visible_symbols, DefinitionRef, ScopeTable, SymbolEntry};
