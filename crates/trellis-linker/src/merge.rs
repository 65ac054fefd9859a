//! Module merging / flattening

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use trellis_core::{
    Definition, DiagnosticNode, Diagnostics, LinkError, LinkResult, ModuleId, Severity,
};
use trellis_workspace::{ModuleInfo, WorkspaceManager};

use crate::scope::locate_definition;

/// Which source file a merged symbol came from, and what it was called
/// there. `original_name` is `None` for the entry module's own definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub source_file: ModuleId,
    pub original_name: Option<String>,
}

/// One consolidated machine: the entry module's definitions plus every
/// transitively imported symbol, deep-cloned and renamed to its effective
/// alias, with per-symbol provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedMachine {
    pub entry: ModuleId,
    pub title: Option<String>,
    pub definitions: Vec<Definition>,
    pub source_map: HashMap<String, Provenance>,
    /// Contributing files, dependencies before dependents.
    pub source_files: Vec<ModuleId>,
}

/// Flatten `entry` and its transitive import closure into one machine.
///
/// Fails when the entry is not loaded or the workspace is cyclic — there is
/// no partial merge. Imported definitions are deep-cloned, never aliased to
/// the loaded originals; a visited-module set keyed by ModuleId makes
/// diamond-shaped import graphs contribute each symbol exactly once.
pub fn merge_machines(workspace: &WorkspaceManager, entry: &ModuleId) -> LinkResult<MergedMachine> {
    let info = workspace
        .module(entry)
        .ok_or_else(|| LinkError::ModuleNotFound {
            import_path: entry.to_string(),
            from: None,
        })?;

    if workspace.documents_in_order().is_none() {
        let cycle = workspace
            .detect_cycles()
            .into_iter()
            .next()
            .map(|c| c.cycle)
            .unwrap_or_default();
        return Err(LinkError::CircularDependency { cycle });
    }

    let mut merger = Merger {
        workspace,
        diagnostics: workspace.diagnostics(),
        entry: entry.clone(),
        visited: HashSet::new(),
        definitions: Vec::new(),
        source_map: HashMap::new(),
        source_files: Vec::new(),
    };

    // the entry module's own definitions come first, so locals always win
    for definition in &info.module.ast.definitions {
        merger.register(
            definition.clone(),
            Provenance {
                source_file: entry.clone(),
                original_name: None,
            },
        );
    }
    merger.visit(entry)?;

    tracing::debug!(
        "merged {} into {} symbols from {} files",
        entry,
        merger.definitions.len(),
        merger.source_files.len()
    );
    Ok(MergedMachine {
        entry: entry.clone(),
        title: info.module.ast.title.clone(),
        definitions: merger.definitions,
        source_map: merger.source_map,
        source_files: merger.source_files,
    })
}

struct Merger<'w> {
    workspace: &'w WorkspaceManager,
    diagnostics: Arc<Diagnostics>,
    entry: ModuleId,
    visited: HashSet<ModuleId>,
    definitions: Vec<Definition>,
    source_map: HashMap<String, Provenance>,
    source_files: Vec<ModuleId>,
}

impl Merger<'_> {
    /// Walk one module's imports, dependencies before the module itself.
    fn visit(&mut self, id: &ModuleId) -> LinkResult<()> {
        if !self.visited.insert(id.clone()) {
            return Ok(());
        }
        let workspace = self.workspace;
        let info = workspace
            .module(id)
            .ok_or_else(|| LinkError::ModuleNotFound {
                import_path: id.to_string(),
                from: None,
            })?;

        for (index, statement) in info.module.imports.iter().enumerate() {
            let Some(origin) = info.resolved_imports.get(&statement.path).cloned() else {
                return Err(LinkError::ModuleNotFound {
                    import_path: statement.path.clone(),
                    from: Some(id.clone()),
                });
            };
            self.visit(&origin)?;
            self.merge_statement(info, index, &origin)?;
        }

        self.source_files.push(id.clone());
        Ok(())
    }

    fn merge_statement(
        &mut self,
        info: &ModuleInfo,
        index: usize,
        origin: &ModuleId,
    ) -> LinkResult<()> {
        let workspace = self.workspace;
        let origin_info = workspace
            .module(origin)
            .ok_or_else(|| LinkError::ModuleNotFound {
                import_path: origin.to_string(),
                from: Some(info.module.id.clone()),
            })?;
        let statement = &info.module.imports[index];

        for symbol in &statement.symbols {
            let diagnostics = self.diagnostics.clone();
            let path = locate_definition(
                &origin_info.module.ast,
                origin,
                &symbol.name,
                &diagnostics,
            )
            .ok_or_else(|| LinkError::SymbolNotFound {
                symbol: symbol.name.clone(),
                module: origin.clone(),
            })?;

            // deep clone: the merged output owns its nodes outright
            let Some(found) = origin_info.module.ast.definition(&path) else {
                return Err(LinkError::SymbolNotFound {
                    symbol: symbol.name.clone(),
                    module: origin.clone(),
                });
            };
            let mut cloned = found.clone();
            cloned.name = symbol.effective_name().to_string();

            self.register(
                cloned,
                Provenance {
                    source_file: origin.clone(),
                    original_name: Some(symbol.name.clone()),
                },
            );
        }
        Ok(())
    }

    /// Add one definition under its merged name. First registration wins;
    /// the diamond case (same origin, same original name) is deduplicated
    /// silently, anything else is a collision diagnostic.
    fn register(&mut self, definition: Definition, provenance: Provenance) {
        if let Some(existing) = self.source_map.get(&definition.name) {
            if *existing == provenance {
                return;
            }
            let kept = if existing.original_name.is_none() {
                "the local definition wins"
            } else {
                "the first import wins"
            };
            self.diagnostics.accept(
                Severity::Error,
                format!(
                    "merged symbol `{}` from {} collides with the one from {}; {kept}",
                    definition.name, provenance.source_file, existing.source_file
                ),
                Some(DiagnosticNode::Module(self.entry.clone())),
                Some("alias"),
            );
            return;
        }
        self.source_map.insert(definition.name.clone(), provenance);
        self.definitions.push(definition);
    }
}
