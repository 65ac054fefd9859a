//! Ordered trial list over resolution backends

use std::sync::Arc;

use async_trait::async_trait;
use trellis_core::{Diagnostics, ModuleId, ResolvedModule, Severity};

use crate::ModuleResolver;

/// Tries configured resolvers in order; the first whose `can_resolve`
/// accepts the path is used, and its answer is final.
pub struct CompositeResolver {
    resolvers: Vec<Arc<dyn ModuleResolver>>,
    diagnostics: Arc<Diagnostics>,
}

impl CompositeResolver {
    pub fn new(diagnostics: Arc<Diagnostics>) -> Self {
        CompositeResolver {
            resolvers: Vec::new(),
            diagnostics,
        }
    }

    pub fn push(mut self, resolver: Arc<dyn ModuleResolver>) -> Self {
        self.resolvers.push(resolver);
        self
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

#[async_trait]
impl ModuleResolver for CompositeResolver {
    fn can_resolve(&self, import_path: &str) -> bool {
        self.resolvers.iter().any(|r| r.can_resolve(import_path))
    }

    async fn resolve(&self, import_path: &str, from: &ModuleId) -> Option<ResolvedModule> {
        let Some(resolver) = self.resolvers.iter().find(|r| r.can_resolve(import_path)) else {
            self.diagnostics.accept(
                Severity::Error,
                format!("no resolver recognizes import path `{import_path}`"),
                None,
                Some("path"),
            );
            return None;
        };
        resolver.resolve(import_path, from).await
    }
}
