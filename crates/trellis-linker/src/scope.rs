//! Per-module visible-symbol computation

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use trellis_core::{
    DefinitionPath, DiagnosticNode, Diagnostics, DocumentAst, ImportedSymbol, LinkError,
    LinkResult, ModuleId, Severity,
};
use trellis_workspace::WorkspaceManager;

/// Non-owning reference to a definition: origin module plus index path.
/// Cloning a ref never drags in the enclosing document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionRef {
    pub module: ModuleId,
    pub path: DefinitionPath,
}

/// One visible symbol: the local name it answers to, where it came from,
/// and what it was called there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub effective_name: String,
    pub origin: ModuleId,
    /// The imported name, `None` for local definitions.
    pub original_name: Option<String>,
    pub node: DefinitionRef,
}

/// Effective-name → symbol table. Thread-safe for concurrent readers;
/// registration keeps the first entry on collision.
#[derive(Debug, Default)]
pub struct ScopeTable {
    entries: DashMap<String, SymbolEntry>,
}

impl ScopeTable {
    pub fn new() -> Self {
        ScopeTable {
            entries: DashMap::new(),
        }
    }

    /// Register a symbol. Returns the already-present entry on collision,
    /// leaving it in place — first registration wins.
    pub fn register(&self, entry: SymbolEntry) -> Option<SymbolEntry> {
        match self.entries.entry(entry.effective_name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(existing) => Some(existing.get().clone()),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(entry);
                None
            }
        }
    }

    pub fn lookup(&self, effective_name: &str) -> Option<SymbolEntry> {
        self.entries
            .get(effective_name)
            .map(|entry| entry.value().clone())
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Locate the definition an imported symbol names inside the origin
/// document: exact name match first, then last-segment match for dotted
/// names. When the short name matches several nested definitions, the first
/// in declaration order wins and an ambiguity warning is emitted.
pub(crate) fn locate_definition(
    ast: &DocumentAst,
    origin: &ModuleId,
    name: &str,
    diagnostics: &Diagnostics,
) -> Option<DefinitionPath> {
    if let Some(path) = ast.find_exact(name) {
        return Some(path);
    }
    if !name.contains('.') {
        return None;
    }
    let short = trellis_core::last_segment(name);
    let matches = ast.find_short(short);
    if matches.len() > 1 {
        diagnostics.accept(
            Severity::Warning,
            format!(
                "`{name}` matches {} definitions named `{short}` in {origin}; using the first declared",
                matches.len()
            ),
            Some(DiagnosticNode::Module(origin.clone())),
            None,
        );
    }
    matches.into_iter().next()
}

/// Compute the symbols visible inside module `id`: its own top-level
/// definitions plus everything its imports bring in, under their effective
/// aliases. Local symbols always take priority — imports fill gaps, never
/// shadow locals. Every collision is reported; processing always continues.
pub fn visible_symbols(
    workspace: &WorkspaceManager,
    id: &ModuleId,
    diagnostics: &Diagnostics,
) -> LinkResult<ScopeTable> {
    let info = workspace
        .module(id)
        .ok_or_else(|| LinkError::ModuleNotFound {
            import_path: id.to_string(),
            from: None,
        })?;
    let scope = ScopeTable::new();

    // locals first, so imports can never shadow them
    for (index, definition) in info.module.ast.definitions.iter().enumerate() {
        scope.register(SymbolEntry {
            effective_name: definition.name.clone(),
            origin: id.clone(),
            original_name: None,
            node: DefinitionRef {
                module: id.clone(),
                path: vec![index],
            },
        });
    }

    for (import_index, statement) in info.module.imports.iter().enumerate() {
        let node = DiagnosticNode::Import {
            module: id.clone(),
            index: import_index,
        };
        let Some(origin) = info.resolved_imports.get(&statement.path) else {
            // unresolved imports were already diagnosed at add time
            continue;
        };
        let Some(origin_info) = workspace.module(origin) else {
            diagnostics.accept(
                Severity::Error,
                format!("imported module {origin} is not loaded"),
                Some(node.clone()),
                Some("path"),
            );
            continue;
        };

        for symbol in &statement.symbols {
            register_import(
                &scope,
                id,
                origin,
                &origin_info.module.ast,
                symbol,
                &node,
                diagnostics,
            );
        }
    }

    Ok(scope)
}

fn register_import(
    scope: &ScopeTable,
    importer: &ModuleId,
    origin: &ModuleId,
    origin_ast: &DocumentAst,
    symbol: &ImportedSymbol,
    node: &DiagnosticNode,
    diagnostics: &Diagnostics,
) {
    let Some(path) = locate_definition(origin_ast, origin, &symbol.name, diagnostics) else {
        diagnostics.accept(
            Severity::Error,
            format!("symbol `{}` not found in {origin}", symbol.name),
            Some(node.clone()),
            Some("symbols"),
        );
        return;
    };

    let entry = SymbolEntry {
        effective_name: symbol.effective_name().to_string(),
        origin: origin.clone(),
        original_name: Some(symbol.name.clone()),
        node: DefinitionRef {
            module: origin.clone(),
            path,
        },
    };

    if let Some(existing) = scope.register(entry.clone()) {
        if existing.origin == *importer && existing.original_name.is_none() {
            diagnostics.accept(
                Severity::Error,
                format!(
                    "imported `{}` collides with the local definition `{}`; the local wins",
                    entry.effective_name, existing.effective_name
                ),
                Some(node.clone()),
                Some("alias"),
            );
        } else if existing.origin == entry.origin && existing.original_name == entry.original_name
        {
            // the same symbol arriving twice (diamond import) is harmless
        } else {
            diagnostics.accept(
                Severity::Error,
                format!(
                    "alias `{}` is already bound to `{}` from {}",
                    entry.effective_name,
                    existing.original_name.as_deref().unwrap_or(&existing.effective_name),
                    existing.origin
                ),
                Some(node.clone()),
                Some("alias"),
            );
        }
    }
}
