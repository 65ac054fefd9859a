//! Module resolution backends
//!
//! Pluggable strategies turning an import path plus the importing module's
//! location into resolved content. Resolution is asynchronous for every
//! backend, even where a backend could answer synchronously, so the contract
//! stays uniform. Resolvers never propagate failures across this boundary:
//! ordinary not-found and transport errors collapse to `None`, with the
//! reason recorded on the shared diagnostics sink.

pub mod composite;
pub mod filesystem;
pub mod url;
pub mod virtual_fs;


use async_trait::async_trait;
use trellis_core::{ModuleId, ResolvedModule};

pub use composite::CompositeResolver;
pub use filesystem::FileSystemResolver;
pub use url::{UrlCache, UrlResolver};
pub use virtual_fs::VirtualResolver;

/// Default extension trial list for extensionless import paths.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".fsm"];

/// A resolution strategy for one family of import paths.
#[async_trait]
pub trait ModuleResolver: Send + Sync {
    /// Cheap predicate: could this backend handle the import path at all?
    fn can_resolve(&self, import_path: &str) -> bool;

    /// Resolve an import path relative to the importing module's location.
    /// Returns `None` for anything the backend cannot produce, recording the
    /// reason as a diagnostic.
    async fn resolve(&self, import_path: &str, from: &ModuleId) -> Option<ResolvedModule>;
}

/// Whether the final path segment already carries a file extension.
pub(crate) fn has_extension(path: &str) -> bool {
    let segment = path.rsplit('/').next().unwrap_or(path);
    segment.contains('.')
}
