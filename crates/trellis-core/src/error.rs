//! Typed failure reasons shared by every layer of the linking engine

use thiserror::Error;

use crate::graph::cycle_chain;
use crate::model::ModuleId;

pub type LinkResult<T> = Result<T, LinkError>;

/// The error taxonomy exposed at the engine boundary. Each variant carries
/// the offending import path and the originating module when known.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinkError {
    /// No resolver located the import target.
    #[error("module not found: {import_path}")]
    ModuleNotFound {
        import_path: String,
        from: Option<ModuleId>,
    },

    /// A reachable cycle exists; carries the full cycle path.
    #[error("circular dependency: {}", cycle_chain(.cycle))]
    CircularDependency { cycle: Vec<ModuleId> },

    /// The module resolved but the requested symbol is absent.
    #[error("symbol `{symbol}` not found in {module}")]
    SymbolNotFound { symbol: String, module: ModuleId },

    /// Two imports (or an import and a local definition) share an
    /// effective alias.
    #[error("alias `{alias}` is already bound in {module}")]
    SymbolCollision { alias: String, module: ModuleId },

    /// Resolved content failed to parse.
    #[error("failed to parse {module}: {message}")]
    ModuleParse { module: ModuleId, message: String },

    /// A network fetch failed; carries the HTTP status when available.
    #[error("URL import failed for {url}: {message}")]
    UrlImport {
        url: String,
        status: Option<u16>,
        message: String,
    },
}
