//! The workspace manager owning the module set and dependency graph

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use trellis_core::{
    CircularDependency, DependencyGraph, DiagnosticNode, Diagnostics, DocumentAst, LinkError,
    LinkResult, Module, ModuleId, ResolvedModule, Severity,
};
use trellis_resolver::ModuleResolver;

/// Parses resolved content into a document AST. Implemented by the external
/// DSL grammar; `OutlineParser` is the structural stand-in shipped here.
pub trait DocumentParser: Send + Sync {
    fn parse(&self, id: &ModuleId, content: &str) -> LinkResult<DocumentAst>;
}

/// A loaded module plus its concrete resolved dependency list.
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    pub module: Module,
    /// Resolved dependency ids, in import-statement order.
    pub dependencies: Vec<ModuleId>,
    /// Import path → resolved module id, for cross-file lookups.
    pub resolved_imports: HashMap<String, ModuleId>,
}

/// Sole owner of the authoritative module map and the dependency graph.
/// All structural change goes through add/update/remove; callers serialize
/// mutations.
pub struct WorkspaceManager {
    modules: HashMap<ModuleId, ModuleInfo>,
    graph: DependencyGraph,
    resolver: Arc<dyn ModuleResolver>,
    diagnostics: Arc<Diagnostics>,
}

impl WorkspaceManager {
    pub fn new(resolver: Arc<dyn ModuleResolver>, diagnostics: Arc<Diagnostics>) -> Self {
        WorkspaceManager {
            modules: HashMap::new(),
            graph: DependencyGraph::new(),
            resolver,
            diagnostics,
        }
    }

    pub fn diagnostics(&self) -> Arc<Diagnostics> {
        Arc::clone(&self.diagnostics)
    }

    pub fn module(&self, id: &ModuleId) -> Option<&ModuleInfo> {
        self.modules.get(id)
    }

    pub fn modules(&self) -> impl Iterator<Item = &ModuleInfo> {
        self.modules.values()
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.modules.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Register a document: validate its imports, resolve each into a
    /// dependency edge, and take ownership of the module. Re-adding an
    /// already-loaded id replaces it wholesale.
    pub async fn add_document(&mut self, module: Module) -> ModuleId {
        self.register_document(module).await.0
    }

    /// Replace a document. Remove-then-add keeps the graph invariants
    /// simpler than in-place patching would.
    pub async fn update_document(&mut self, module: Module) -> ModuleId {
        self.remove_document(&module.id);
        self.add_document(module).await
    }

    /// Delete a module and every edge referencing it in either direction.
    pub fn remove_document(&mut self, id: &ModuleId) -> bool {
        let removed = self.modules.remove(id).is_some();
        if removed {
            self.graph.remove_module(id);
            tracing::debug!("removed document {id}");
        }
        removed
    }

    /// Dependency-safe processing order over the loaded modules. `None`
    /// means the workspace is unresolved: do not link or merge, surface the
    /// cycle diagnostics instead.
    pub fn documents_in_order(&self) -> Option<Vec<ModuleId>> {
        match self.graph.topological_sort() {
            Some(order) => Some(
                order
                    .into_iter()
                    .filter(|id| self.modules.contains_key(id))
                    .collect(),
            ),
            None => {
                for cycle in self.graph.detect_cycles() {
                    self.diagnostics.accept(
                        Severity::Error,
                        format!("circular dependency: {}", cycle.chain()),
                        None,
                        None,
                    );
                }
                None
            }
        }
    }

    pub fn detect_cycles(&self) -> Vec<CircularDependency> {
        self.graph.detect_cycles()
    }

    pub fn has_path(&self, from: &ModuleId, to: &ModuleId) -> bool {
        self.graph.has_path(from, to)
    }

    /// Recursively resolve and load the transitive import closure of one
    /// entry path. A visited-id set keeps loading-time reference cycles
    /// finite — deliberately more permissive than the linking-time cycle
    /// prohibition, so a workspace can be fully loaded yet unlinkable.
    /// Already-loaded modules are kept as-is; use `update_document` to
    /// refresh an edited file.
    pub async fn load_document_with_dependencies(
        &mut self,
        entry: &str,
        from: &ModuleId,
        parser: &dyn DocumentParser,
    ) -> LinkResult<ModuleId> {
        let entry_resolved = self.resolver.resolve(entry, from).await.ok_or_else(|| {
            LinkError::ModuleNotFound {
                import_path: entry.to_string(),
                from: Some(from.clone()),
            }
        })?;
        let entry_id = entry_resolved.id.clone();

        let mut visited: HashSet<ModuleId> = HashSet::new();
        let mut pending: Vec<ResolvedModule> = vec![entry_resolved];

        while let Some(resolved) = pending.pop() {
            if !visited.insert(resolved.id.clone()) {
                continue;
            }
            if self.modules.contains_key(&resolved.id) {
                continue;
            }

            let content = resolved.content.clone().unwrap_or_default();
            let ast = match parser.parse(&resolved.id, &content) {
                Ok(ast) => ast,
                Err(err) if resolved.id == entry_id => return Err(err),
                Err(err) => {
                    self.diagnostics.accept(
                        Severity::Error,
                        err.to_string(),
                        Some(DiagnosticNode::Module(resolved.id.clone())),
                        None,
                    );
                    continue;
                }
            };

            let module = Module::new(resolved.id.clone(), ast, content);
            let (_, resolved_deps) = self.register_document(module).await;
            pending.extend(resolved_deps);
        }

        Ok(entry_id)
    }

    /// Core registration: one resolver pass over the module's imports.
    /// Returns the resolved imports so the loader can continue the closure
    /// without resolving anything twice.
    async fn register_document(&mut self, module: Module) -> (ModuleId, Vec<ResolvedModule>) {
        let id = module.id.clone();
        if self.modules.contains_key(&id) {
            self.remove_document(&id);
        }
        self.validate_imports(&module);

        self.graph.add_module(&id);
        let mut dependencies = Vec::new();
        let mut resolved_imports = HashMap::new();
        let mut resolved_modules = Vec::new();

        for statement in &module.imports {
            if statement.path.is_empty() {
                continue;
            }
            match self.resolver.resolve(&statement.path, &id).await {
                Some(resolved) => {
                    self.graph.add_dependency(&id, &resolved.id);
                    dependencies.push(resolved.id.clone());
                    resolved_imports.insert(statement.path.clone(), resolved.id.clone());
                    resolved_modules.push(resolved);
                }
                None => {
                    // the resolver already recorded the not-found diagnostic
                    tracing::warn!("unresolved import `{}` in {id}", statement.path);
                }
            }
        }

        // re-link dependents that already resolved their imports to this id,
        // so update (remove + add) restores incoming edges
        let dependents: Vec<ModuleId> = self
            .modules
            .iter()
            .filter(|(_, info)| info.resolved_imports.values().any(|target| *target == id))
            .map(|(dependent, _)| dependent.clone())
            .collect();
        for dependent in dependents {
            self.graph.add_dependency(&dependent, &id);
        }

        tracing::debug!(
            "added document {id} with {} resolved dependencies",
            dependencies.len()
        );
        self.modules.insert(
            id.clone(),
            ModuleInfo {
                module,
                dependencies,
                resolved_imports,
            },
        );
        (id, resolved_modules)
    }

    /// Structural import validation: empty paths, empty symbol lists, and
    /// empty or duplicate aliases are all reported, none of them fatal here.
    fn validate_imports(&self, module: &Module) {
        let mut seen_aliases: HashSet<String> = HashSet::new();
        for (index, statement) in module.imports.iter().enumerate() {
            let node = DiagnosticNode::Import {
                module: module.id.clone(),
                index,
            };
            if statement.path.is_empty() {
                self.diagnostics.accept(
                    Severity::Error,
                    "import path must not be empty",
                    Some(node.clone()),
                    Some("path"),
                );
            }
            if statement.symbols.is_empty() {
                self.diagnostics.accept(
                    Severity::Error,
                    format!("import from `{}` names no symbols", statement.path),
                    Some(node.clone()),
                    Some("symbols"),
                );
            }
            for symbol in &statement.symbols {
                if matches!(symbol.alias.as_deref(), Some("")) {
                    self.diagnostics.accept(
                        Severity::Error,
                        format!("empty alias for imported symbol `{}`", symbol.name),
                        Some(node.clone()),
                        Some("alias"),
                    );
                    continue;
                }
                let effective = symbol.effective_name().to_string();
                if !seen_aliases.insert(effective.clone()) {
                    self.diagnostics.accept(
                        Severity::Error,
                        format!("duplicate import alias `{effective}`"),
                        Some(node.clone()),
                        Some("alias"),
                    );
                }
            }
        }
    }
}
