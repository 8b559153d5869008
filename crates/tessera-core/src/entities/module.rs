use std::path::PathBuf;

use crate::{ItemId, ModuleId, ScopeId};

/// A compilation unit.
#[derive(Debug, Clone)]
pub struct Module {
    pub id: ModuleId,
    pub name: String,
    pub path: PathBuf,
    /// Modules sharing a package see each other's `package` items.
    pub package: String,
    /// Everything declared at the top level of the module.
    pub scope: ScopeId,
    /// Aliases to the items the module exposes to importers.
    pub exports: ScopeId,
    pub dependencies: Vec<ModuleId>,
    pub dependents: Vec<ModuleId>,
    /// Modules whose generics this module instantiated.
    pub generic_dependencies: Vec<ModuleId>,
    /// Synthetic items emitted with the module.
    pub hoisted_items: Vec<ItemId>,
    /// Items declared directly at the root, before any hoisting.
    pub root_item_count: usize,
}

impl Module {
    pub fn new(id: ModuleId, name: impl Into<String>, path: PathBuf, scope: ScopeId, exports: ScopeId) -> Self {
        Self {
            id,
            name: name.into(),
            path,
            package: String::new(),
            scope,
            exports,
            dependencies: Vec::new(),
            dependents: Vec::new(),
            generic_dependencies: Vec::new(),
            hoisted_items: Vec::new(),
            root_item_count: 0,
        }
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    /// Record a dependency edge once.
    pub fn add_dependency(&mut self, module: ModuleId) {
        if !self.dependencies.contains(&module) {
            self.dependencies.push(module);
        }
    }

    /// Record a dependent edge once.
    pub fn add_dependent(&mut self, module: ModuleId) {
        if !self.dependents.contains(&module) {
            self.dependents.push(module);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_edges_are_deduplicated() {
        let mut module = Module::new(
            ModuleId::new(0),
            "main",
            PathBuf::from("main.ts"),
            ScopeId::new(0),
            ScopeId::new(1),
        );
        module.add_dependency(ModuleId::new(1));
        module.add_dependency(ModuleId::new(1));
        module.add_dependent(ModuleId::new(2));
        assert_eq!(module.dependencies, vec![ModuleId::new(1)]);
        assert_eq!(module.dependents, vec![ModuleId::new(2)]);
    }
}
