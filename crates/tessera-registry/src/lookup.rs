//! Name lookup, visibility and alias resolution.
//!
//! [`EntityGraph::find_all`] walks outward from a scope. In each scope it
//! collects the items with the requested name; the first scope with a match
//! ends the walk, so inner declarations shadow outer ones. A class scope also
//! searches the scopes of its ancestors before the walk leaves the class, and
//! when the class itself only declares functions of that name the inherited
//! overloads join the set.
//!
//! Results are alias-resolved and deduplicated. Visibility is judged on the
//! name as found (an alias carries the visibility of its declaration site).

use rustc_hash::FxHashSet;
use tracing::{trace, warn};

use tessera_core::{ItemId, ItemKind, ItemKindSet, ScopeId, ScopeOwner, Visibility};

use crate::{EntityGraph, RegistryError};

impl EntityGraph {
    /// All visible items named `name`, searching outward from `scope`.
    ///
    /// Items whose resolved kind is in `exclude` are skipped. When `origin` is
    /// given, items the origin scope may not see are skipped.
    pub fn find_all(
        &self,
        name: &str,
        scope: ScopeId,
        exclude: ItemKindSet,
        origin: Option<ScopeId>,
    ) -> Vec<ItemId> {
        for current in self.scope_chain(scope) {
            let found = match self.scope(current).owner {
                ScopeOwner::Class(class) => self.find_in_class(class, name, exclude, origin),
                _ => self.find_local(name, current, exclude, origin),
            };
            if !found.is_empty() {
                trace!(name, scope = %current, count = found.len(), "lookup hit");
                return found;
            }
        }
        trace!(name, %scope, "lookup miss");
        Vec::new()
    }

    /// Items named `name` declared directly in `scope`.
    pub fn find_local(
        &self,
        name: &str,
        scope: ScopeId,
        exclude: ItemKindSet,
        origin: Option<ScopeId>,
    ) -> Vec<ItemId> {
        let mut found = Vec::new();
        for &id in &self.scope(scope).items {
            let item = self.item(id);
            if item.name() != name {
                continue;
            }
            if let Some(origin) = origin
                && !self.can_see(id, origin)
            {
                continue;
            }
            let Ok(resolved) = self.resolve_alias(id) else {
                continue;
            };
            if exclude.intersects(self.item(resolved).kind.kind_set()) {
                continue;
            }
            if !found.contains(&resolved) {
                found.push(resolved);
            }
        }
        found
    }

    /// Members named `name` of `class` or, failing that, of its ancestors.
    ///
    /// Function overloads accumulate along the hierarchy, nearest class first.
    pub fn find_in_class(
        &self,
        class: ItemId,
        name: &str,
        exclude: ItemKindSet,
        origin: Option<ScopeId>,
    ) -> Vec<ItemId> {
        let mut found: Vec<ItemId> = Vec::new();
        for current in self.class_and_ancestors(class) {
            let Some(entity) = self.class(current) else {
                continue;
            };
            let local = self.find_local(name, entity.scope, exclude, origin);
            if local.is_empty() {
                continue;
            }
            let only_functions = local
                .iter()
                .all(|&id| matches!(self.item(id).kind, ItemKind::Function(_)));
            let had_functions_only = found
                .iter()
                .all(|&id| matches!(self.item(id).kind, ItemKind::Function(_)));
            if found.is_empty() || (only_functions && had_functions_only) {
                for id in local {
                    if !found.contains(&id) {
                        found.push(id);
                    }
                }
                if !only_functions {
                    break;
                }
            }
        }
        found
    }

    /// Whether code in `origin` may refer to `item`.
    pub fn can_see(&self, item: ItemId, origin: ScopeId) -> bool {
        let header = &self.item(item).header;
        match header.visibility {
            Visibility::Public => true,
            Visibility::Private => self.is_within(origin, header.parent_scope),
            Visibility::Protected => {
                if self.is_within(origin, header.parent_scope) {
                    return true;
                }
                let Some(declaring) = self.scope(header.parent_scope).class_owner() else {
                    return false;
                };
                self.scope_chain(origin)
                    .filter_map(|s| self.scope(s).class_owner())
                    .any(|class| class == declaring || self.has_parent(class, declaring))
            }
            Visibility::Module => self.scope(origin).module == header.module,
            Visibility::Package => {
                let from = self.module(self.scope(origin).module);
                let owner = self.module(header.module);
                from.id == owner.id || (!owner.package.is_empty() && from.package == owner.package)
            }
        }
    }

    /// Follow an alias chain to the item it names.
    ///
    /// Non-alias items resolve to themselves.
    pub fn resolve_alias(&self, item: ItemId) -> Result<ItemId, RegistryError> {
        let mut current = item;
        let mut seen = FxHashSet::default();
        while let ItemKind::Alias(alias) = &self.item(current).kind {
            if !seen.insert(current) {
                warn!(name = %self.item(item).name(), "alias cycle");
                return Err(RegistryError::AliasCycle {
                    name: self.item(item).name().to_string(),
                    item,
                });
            }
            current = alias.target;
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use tessera_core::{
        Alias, Class, Function, ItemHeader, ModuleId, Type, Variable,
    };

    use super::*;

    struct Fixture {
        graph: EntityGraph,
        module: ModuleId,
        root: ScopeId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut graph = EntityGraph::new();
            let module = graph.new_module("main", "main.tsr", "app");
            let root = graph.module(module).scope;
            Self { graph, module, root }
        }

        fn variable(&mut self, name: &str, scope: ScopeId) -> ItemId {
            self.graph.add_item(
                ItemHeader::new(name, scope, self.module),
                ItemKind::Variable(Variable::new(Type::int())),
            )
        }

        fn function(&mut self, name: &str, scope: ScopeId) -> ItemId {
            let own = self.graph.new_scope(scope, ScopeOwner::Block);
            let id = self.graph.add_item(
                ItemHeader::new(name, scope, self.module),
                ItemKind::Function(Function::new(own, Type::void())),
            );
            self.graph.set_scope_owner(own, ScopeOwner::Function(id));
            id
        }

        fn class(&mut self, name: &str, parents: &[ItemId]) -> (ItemId, ScopeId) {
            let scope = self.graph.new_scope(self.root, ScopeOwner::Block);
            let mut entity = Class::new(scope);
            entity.parents = parents.to_vec();
            let id = self.graph.add_item(
                ItemHeader::new(name, self.root, self.module),
                ItemKind::Class(entity),
            );
            self.graph.set_scope_owner(scope, ScopeOwner::Class(id));
            (id, scope)
        }
    }

    #[test]
    fn inner_block_shadows_outer() {
        let mut fx = Fixture::new();
        let outer = fx.variable("x", fx.root);
        let block = fx.graph.new_scope(fx.root, ScopeOwner::Block);
        let inner = fx.variable("x", block);

        assert_eq!(fx.graph.find_all("x", block, ItemKindSet::empty(), None), vec![inner]);
        assert_eq!(fx.graph.find_all("x", fx.root, ItemKindSet::empty(), None), vec![outer]);
    }

    #[test]
    fn excluded_kinds_are_skipped() {
        let mut fx = Fixture::new();
        let block = fx.graph.new_scope(fx.root, ScopeOwner::Block);
        let (class, _) = fx.class("T", &[]);
        fx.variable("T", block);
        assert_eq!(
            fx.graph.find_all("T", block, ItemKindSet::VALUES, None),
            vec![class]
        );
    }

    #[test]
    fn overloads_share_a_scope() {
        let mut fx = Fixture::new();
        let a = fx.function("f", fx.root);
        let b = fx.function("f", fx.root);
        assert_eq!(fx.graph.find_all("f", fx.root, ItemKindSet::empty(), None), vec![a, b]);
    }

    #[test]
    fn aliases_resolve_to_target() {
        let mut fx = Fixture::new();
        let target = fx.variable("value", fx.root);
        let block = fx.graph.new_scope(fx.root, ScopeOwner::Block);
        fx.graph.add_item(
            ItemHeader::new("v", block, fx.module),
            ItemKind::Alias(Alias::new(target)),
        );
        assert_eq!(fx.graph.find_all("v", block, ItemKindSet::empty(), None), vec![target]);
    }

    #[test]
    fn alias_cycle_is_an_error() {
        let mut fx = Fixture::new();
        let a = fx.graph.add_item(
            ItemHeader::new("a", fx.root, fx.module),
            ItemKind::Alias(Alias::new(ItemId::new(1))),
        );
        let b = fx.graph.add_item(
            ItemHeader::new("b", fx.root, fx.module),
            ItemKind::Alias(Alias::new(a)),
        );
        assert_eq!(b, ItemId::new(1));
        assert!(matches!(
            fx.graph.resolve_alias(a),
            Err(RegistryError::AliasCycle { .. })
        ));
        assert!(fx.graph.find_all("a", fx.root, ItemKindSet::empty(), None).is_empty());
    }

    #[test]
    fn class_members_are_inherited() {
        let mut fx = Fixture::new();
        let (base, base_scope) = fx.class("Base", &[]);
        let speak = fx.function("speak", base_scope);
        let (_, derived_scope) = fx.class("Derived", &[base]);
        let own = fx.function("speak", derived_scope);
        let method_scope = fx.graph.new_scope(derived_scope, ScopeOwner::Block);

        assert_eq!(
            fx.graph.find_all("speak", method_scope, ItemKindSet::empty(), None),
            vec![own, speak]
        );
    }

    #[test]
    fn private_members_stay_in_their_class() {
        let mut fx = Fixture::new();
        let (base, base_scope) = fx.class("Base", &[]);
        let secret = fx.variable("secret", base_scope);
        fx.graph.item_mut(secret).header.visibility = Visibility::Private;
        let shared = fx.variable("shared", base_scope);
        fx.graph.item_mut(shared).header.visibility = Visibility::Protected;
        let (_, derived_scope) = fx.class("Derived", &[base]);

        assert!(fx.graph.can_see(secret, base_scope));
        assert!(!fx.graph.can_see(secret, derived_scope));
        assert!(fx.graph.can_see(shared, derived_scope));
        assert!(!fx.graph.can_see(shared, fx.root));
    }

    #[test]
    fn module_and_package_visibility() {
        let mut fx = Fixture::new();
        let local = fx.variable("local", fx.root);
        fx.graph.item_mut(local).header.visibility = Visibility::Module;
        let packaged = fx.variable("packaged", fx.root);
        fx.graph.item_mut(packaged).header.visibility = Visibility::Package;

        let sibling = fx.graph.new_module("other", "other.tsr", "app");
        let stranger = fx.graph.new_module("far", "far.tsr", "lib");
        let sibling_scope = fx.graph.module(sibling).scope;
        let stranger_scope = fx.graph.module(stranger).scope;

        assert!(fx.graph.can_see(local, fx.root));
        assert!(!fx.graph.can_see(local, sibling_scope));
        assert!(fx.graph.can_see(packaged, sibling_scope));
        assert!(!fx.graph.can_see(packaged, stranger_scope));
    }
}
