//! Cross-file reference resolution

use trellis_core::{Diagnostics, LinkError, LinkResult, ModuleId};
use trellis_workspace::WorkspaceManager;

use crate::scope::{locate_definition, DefinitionRef};

/// Wraps single-file reference resolution: local definitions first, then
/// the module's imports. This layer never invents success — when no import
/// claims an unresolved name, the original local failure passes through
/// unchanged.
pub struct Linker<'w> {
    workspace: &'w WorkspaceManager,
    diagnostics: std::sync::Arc<Diagnostics>,
}

impl<'w> Linker<'w> {
    pub fn new(workspace: &'w WorkspaceManager) -> Self {
        let diagnostics = workspace.diagnostics();
        Linker {
            workspace,
            diagnostics,
        }
    }

    /// Resolve `name` as seen from inside `from`.
    pub fn resolve_reference(&self, from: &ModuleId, name: &str) -> LinkResult<DefinitionRef> {
        let info = self
            .workspace
            .module(from)
            .ok_or_else(|| LinkError::ModuleNotFound {
                import_path: from.to_string(),
                from: None,
            })?;

        // local resolution first
        if let Some(path) = info.module.ast.find_exact(name) {
            return Ok(DefinitionRef {
                module: from.clone(),
                path,
            });
        }

        // an import claiming the name as its effective alias
        for statement in &info.module.imports {
            for symbol in &statement.symbols {
                if symbol.effective_name() != name {
                    continue;
                }
                let origin = info.resolved_imports.get(&statement.path).ok_or_else(|| {
                    LinkError::ModuleNotFound {
                        import_path: statement.path.clone(),
                        from: Some(from.clone()),
                    }
                })?;
                // already loaded, by the topological ordering guarantee
                let origin_info =
                    self.workspace
                        .module(origin)
                        .ok_or_else(|| LinkError::ModuleNotFound {
                            import_path: statement.path.clone(),
                            from: Some(from.clone()),
                        })?;
                let path = locate_definition(
                    &origin_info.module.ast,
                    origin,
                    &symbol.name,
                    &self.diagnostics,
                )
                .ok_or_else(|| LinkError::SymbolNotFound {
                    symbol: symbol.name.clone(),
                    module: origin.clone(),
                })?;
                return Ok(DefinitionRef {
                    module: origin.clone(),
                    path,
                });
            }
        }

        // no import claims the name: the local failure passes through
        Err(LinkError::SymbolNotFound {
            symbol: name.to_string(),
            module: from.clone(),
        })
    }
}
