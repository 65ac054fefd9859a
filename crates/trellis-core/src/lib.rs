//! Trellis Core — module identifiers, definition model, dependency graph,
//! diagnostics, and the shared error taxonomy

pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod model;


#[cfg(test)]
pub mod test_utils;

pub use diagnostics::{Diagnostic, DiagnosticNode, Diagnostics, Severity};
pub use error::{LinkError, LinkResult};
pub use graph::{cycle_chain, CircularDependency, DependencyGraph};
pub use model::{
    last_segment, normalize_path, Definition, DefinitionKind, DefinitionPath, DocumentAst,
    ImportStatement, ImportedSymbol, Module, ModuleId, ResolvedModule, VIRTUAL_SCHEME,
};
