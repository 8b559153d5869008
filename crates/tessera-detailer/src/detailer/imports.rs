//! Imports and exports between modules.
//!
//! Each module has an exports scope holding public aliases to the items it
//! exports. Importing binds private aliases in the importing scope to the
//! aliased targets: selectively, under a namespace, or all at once.

use tracing::debug;

use tessera_core::{
    Alias, DetailingError, ItemHeader, ItemId, ItemKind, ItemKindSet, ModuleId, Namespace, Position,
    ScopeId, ScopeOwner, Visibility,
};
use tessera_syntax::{ExportStmt, ImportItem, ImportStmt};

use super::{Detailer, Frame, Result};
use crate::handles::{DetailHandle, ImportHandle};

impl<'ast> Detailer<'ast> {
    pub(crate) fn detail_import(&mut self, frame: Frame, import: &'ast ImportStmt<'ast>, scope: ScopeId) -> Result<()> {
        let module = self.open_dependency(frame, import.request, import.position)?;
        let exports = self.graph.module(module).exports;

        let bound = match (import.items, import.namespace) {
            (Some(items), _) => self.import_items(frame.module, items, exports, scope, Visibility::Private)?,
            (None, Some(namespace)) => {
                let inner = self.graph.new_scope(scope, ScopeOwner::Block);
                let header = ItemHeader::new(namespace.name, scope, frame.module)
                    .with_visibility(Visibility::Private)
                    .with_position(namespace.position);
                self.check_redeclaration(namespace.name, scope, namespace.position)?;
                let item = self.graph.add_item(header, ItemKind::Namespace(Namespace::new(inner)));
                self.graph.set_scope_owner(inner, ScopeOwner::Namespace(item));
                self.import_all(frame.module, exports, inner, Visibility::Public, import.position)?;
                vec![item]
            }
            (None, None) => self.import_all(frame.module, exports, scope, Visibility::Private, import.position)?,
        };

        debug!(request = import.request, bound = bound.len(), "imported module");
        let handle = ImportHandle { module, bound };
        self.store(frame, import.id, DetailHandle::Import(handle), import.position)
    }

    /// Load the module `request` names and record the dependency edges.
    fn open_dependency(&mut self, frame: Frame, request: &str, position: Position) -> Result<ModuleId> {
        let path = self.resolve_request(request, frame.module, position)?;
        let module = self.load_module(&path, request, position)?;
        self.graph.module_mut(frame.module).add_dependency(module);
        self.graph.module_mut(module).add_dependent(frame.module);
        Ok(module)
    }

    fn import_items(
        &mut self,
        module: ModuleId,
        items: &'ast [ImportItem<'ast>],
        exports: ScopeId,
        scope: ScopeId,
        visibility: Visibility,
    ) -> Result<Vec<ItemId>> {
        let mut bound = Vec::new();
        for item in items {
            let targets = self.graph.find_local(item.name.name, exports, ItemKindSet::empty(), None);
            if targets.is_empty() {
                return Err(DetailingError::NoTargetFound {
                    name: item.name.name.to_string(),
                    position: item.name.position,
                });
            }
            for target in targets {
                bound.push(self.bind_alias(module, scope, item.local_name(), target, visibility, item.name.position)?);
            }
        }
        Ok(bound)
    }

    fn import_all(
        &mut self,
        module: ModuleId,
        exports: ScopeId,
        scope: ScopeId,
        visibility: Visibility,
        position: Position,
    ) -> Result<Vec<ItemId>> {
        let exported: Vec<(String, ItemId)> = self
            .graph
            .scope(exports)
            .items
            .iter()
            .filter_map(|&alias| {
                let target = self.graph.resolve_alias(alias).ok()?;
                Some((self.graph.item(alias).name().to_string(), target))
            })
            .collect();
        let mut bound = Vec::with_capacity(exported.len());
        for (name, target) in exported {
            bound.push(self.bind_alias(module, scope, &name, target, visibility, position)?);
        }
        Ok(bound)
    }

    /// Bind `name` in `scope` to `target`. Several functions may share a
    /// name; anything else clashing with an existing item is a duplicate.
    fn bind_alias(
        &mut self,
        module: ModuleId,
        scope: ScopeId,
        name: &str,
        target: ItemId,
        visibility: Visibility,
        position: Position,
    ) -> Result<ItemId> {
        let existing = self.graph.find_local(name, scope, ItemKindSet::empty(), None);
        if existing.contains(&target) {
            return Ok(target);
        }
        let is_function = |id: ItemId| matches!(self.graph.item(id).kind, ItemKind::Function(_));
        if !existing.is_empty() && !(is_function(target) && existing.iter().all(|&id| is_function(id))) {
            return Err(DetailingError::DuplicateDefinition {
                name: name.to_string(),
                position,
            });
        }
        let header = ItemHeader::new(name, scope, module)
            .with_visibility(visibility)
            .with_position(position);
        Ok(self.graph.add_item(header, ItemKind::Alias(Alias::new(target))))
    }

    /// Add `target` to `module`'s exports under `name`.
    pub(crate) fn export_item(&mut self, module: ModuleId, name: &str, target: ItemId, position: Position) -> Result<ItemId> {
        let exports = self.graph.module(module).exports;
        self.bind_alias(module, exports, name, target, Visibility::Public, position)
    }

    /// `export { a, b as c }`, `export { a } from "m"` and
    /// `export * from "m"`.
    pub(crate) fn detail_export(&mut self, frame: Frame, export: &'ast ExportStmt<'ast>, scope: ScopeId) -> Result<()> {
        let mut aliases = Vec::new();
        match export.from {
            Some(request) => {
                let source = self.open_dependency(frame, request, export.position)?;
                let source_exports = self.graph.module(source).exports;
                let own_exports = self.graph.module(frame.module).exports;
                if export.wildcard {
                    aliases = self.import_all(frame.module, source_exports, own_exports, Visibility::Public, export.position)?;
                } else {
                    aliases =
                        self.import_items(frame.module, export.items, source_exports, own_exports, Visibility::Public)?;
                }
            }
            None => {
                for item in export.items {
                    let targets = self.graph.find_local(item.name.name, scope, ItemKindSet::empty(), Some(scope));
                    if targets.is_empty() {
                        return Err(self.missing_name(item.name.name, scope, ItemKindSet::empty(), item.name.position));
                    }
                    for target in targets {
                        aliases.push(self.export_item(frame.module, item.local_name(), target, item.name.position)?);
                    }
                }
            }
        }
        self.store(frame, export.id, DetailHandle::Export { aliases }, export.position)
    }
}
