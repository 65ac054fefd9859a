//! Fixture builders for core tests

use crate::model::*;

/// Build a state definition with no children.
pub fn state(name: &str) -> Definition {
    Definition::new(name, DefinitionKind::State)
}

/// Build a state definition with nested children.
pub fn state_with(name: &str, children: Vec<Definition>) -> Definition {
    Definition::new(name, DefinitionKind::State).with_children(children)
}

/// Build a task definition.
pub fn task(name: &str) -> Definition {
    Definition::new(name, DefinitionKind::Task)
}

/// Build an import statement from `"Name"` / `"Name as Alias"` specs.
pub fn import(path: &str, symbols: &[&str]) -> ImportStatement {
    let symbols = symbols
        .iter()
        .map(|spec| match spec.split_once(" as ") {
            Some((name, alias)) => ImportedSymbol::aliased(name.trim(), alias.trim()),
            None => ImportedSymbol::new(spec.trim()),
        })
        .collect();
    ImportStatement::new(path, symbols)
}

/// Build a document AST.
pub fn doc(
    title: Option<&str>,
    imports: Vec<ImportStatement>,
    definitions: Vec<Definition>,
) -> DocumentAst {
    DocumentAst::new(title.map(str::to_string), imports, definitions)
}

/// Build a virtual module with empty raw content.
pub fn module(path: &str, ast: DocumentAst) -> Module {
    Module::new(ModuleId::from_virtual(path), ast, "")
}
