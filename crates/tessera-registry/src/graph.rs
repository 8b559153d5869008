//! The entity arena.
//!
//! [`EntityGraph`] owns every item, scope and module created while detailing a
//! program. Containers own their children by arena membership only: a scope
//! lists the ids of its items, a class names its scope by id, and every back
//! reference is a plain id.

use std::path::PathBuf;

use tracing::debug;

use tessera_core::{
    Class, DeferredAction, Function, FunctionSignature, Item, ItemHeader, ItemId, ItemKind, Module,
    ModuleId, NameResolver, Scope, ScopeId, ScopeOwner, Type, Variable,
};

/// Arena of items, scopes and modules.
#[derive(Debug, Default)]
pub struct EntityGraph {
    items: Vec<Item>,
    scopes: Vec<Scope>,
    modules: Vec<Module>,
}

impl EntityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================================================
    // Construction
    // ==========================================================================

    /// Create a module with an empty root scope and an empty exports scope.
    pub fn new_module(
        &mut self,
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        package: impl Into<String>,
    ) -> ModuleId {
        let id = ModuleId::new(self.modules.len() as u32);
        let scope = self.push_scope(None, ScopeOwner::Module(id), id);
        let exports = self.push_scope(None, ScopeOwner::Module(id), id);
        let module = Module::new(id, name, path.into(), scope, exports).with_package(package);
        debug!(module = %id, name = %module.name, "created module");
        self.modules.push(module);
        id
    }

    /// Create a child scope of `parent`.
    pub fn new_scope(&mut self, parent: ScopeId, owner: ScopeOwner) -> ScopeId {
        let module = self.scopes[parent.index()].module;
        let relative_id = {
            let parent = &mut self.scopes[parent.index()];
            let next = parent.next_child_id;
            parent.next_child_id += 1;
            next
        };
        let id = self.push_scope(Some(parent), owner, module);
        self.scopes[id.index()].relative_id = relative_id;
        id
    }

    fn push_scope(&mut self, parent: Option<ScopeId>, owner: ScopeOwner, module: ModuleId) -> ScopeId {
        let id = ScopeId::new(self.scopes.len() as u32);
        self.scopes.push(Scope::new(id, parent, owner, module));
        id
    }

    /// Insert an item and list it in its parent scope.
    pub fn add_item(&mut self, mut header: ItemHeader, kind: ItemKind) -> ItemId {
        let id = ItemId::new(self.items.len() as u32);
        header.id = id;
        let scope = header.parent_scope;
        debug!(item = %id, name = %header.name, kind = kind.describe(), %scope, "added item");
        self.items.push(Item::new(header, kind));
        self.scopes[scope.index()].items.push(id);
        id
    }

    /// Re-point a scope's owner once the owning item exists.
    ///
    /// Containers create their scope before the item so the scope id can be
    /// stored in the entity; the owner is patched afterwards.
    pub fn set_scope_owner(&mut self, scope: ScopeId, owner: ScopeOwner) {
        self.scopes[scope.index()].owner = owner;
    }

    // ==========================================================================
    // Access
    // ==========================================================================

    pub fn item(&self, id: ItemId) -> &Item {
        &self.items[id.index()]
    }

    pub fn item_mut(&mut self, id: ItemId) -> &mut Item {
        &mut self.items[id.index()]
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }

    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.index()]
    }

    pub fn module_mut(&mut self, id: ModuleId) -> &mut Module {
        &mut self.modules[id.index()]
    }

    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    pub fn function(&self, id: ItemId) -> Option<&Function> {
        self.item(id).as_function()
    }

    pub fn function_mut(&mut self, id: ItemId) -> Option<&mut Function> {
        self.item_mut(id).as_function_mut()
    }

    pub fn class(&self, id: ItemId) -> Option<&Class> {
        self.item(id).as_class()
    }

    pub fn class_mut(&mut self, id: ItemId) -> Option<&mut Class> {
        self.item_mut(id).as_class_mut()
    }

    pub fn variable(&self, id: ItemId) -> Option<&Variable> {
        self.item(id).as_variable()
    }

    // ==========================================================================
    // Scope structure
    // ==========================================================================

    /// `scope` and its lexical ancestors, innermost first.
    pub fn scope_chain(&self, scope: ScopeId) -> ScopeChain<'_> {
        ScopeChain {
            graph: self,
            next: Some(scope),
        }
    }

    /// Whether `scope` is `ancestor` or nested inside it.
    pub fn is_within(&self, scope: ScopeId, ancestor: ScopeId) -> bool {
        self.scope_chain(scope).any(|s| s == ancestor)
    }

    /// The nearest function whose scope encloses `scope`.
    pub fn enclosing_function(&self, scope: ScopeId) -> Option<ItemId> {
        self.scope_chain(scope)
            .find_map(|s| self.scope(s).function_owner())
    }

    /// The nearest class whose scope encloses `scope`.
    pub fn enclosing_class(&self, scope: ScopeId) -> Option<ItemId> {
        self.scope_chain(scope).find_map(|s| self.scope(s).class_owner())
    }

    // ==========================================================================
    // Throw propagation
    // ==========================================================================

    /// Record that `ty` may be thrown from `scope`.
    ///
    /// The error is added to each enclosing scope up to the first `try` body
    /// or function scope. Reaching a function marks it throwing; the actions
    /// waiting for that are returned.
    pub fn add_possible_error(&mut self, scope: ScopeId, ty: &Type) -> Vec<DeferredAction> {
        let chain: Vec<ScopeId> = self.scope_chain(scope).collect();
        for id in chain {
            let scope = &mut self.scopes[id.index()];
            scope.add_possible_error(ty.clone());
            if scope.is_try {
                return Vec::new();
            }
            if let Some(function) = scope.function_owner() {
                return match self.function_mut(function) {
                    Some(function) => function.begin_throwing(),
                    None => Vec::new(),
                };
            }
        }
        Vec::new()
    }

    // ==========================================================================
    // Rendering
    // ==========================================================================

    /// Render a type the way it is written in source.
    pub fn type_name(&self, ty: &Type) -> String {
        ty.display(self).to_string()
    }

    /// Render a signature as `(name: Type, ...) => Return`.
    pub fn signature_text(&self, signature: &FunctionSignature) -> String {
        Type::function(signature.clone()).display(self).to_string()
    }
}

impl NameResolver for EntityGraph {
    fn item_name(&self, id: ItemId) -> String {
        match self.items.get(id.index()) {
            Some(item) => item.header.name.clone(),
            None => id.to_string(),
        }
    }
}

/// Iterator over a scope and its lexical ancestors.
pub struct ScopeChain<'g> {
    graph: &'g EntityGraph,
    next: Option<ScopeId>,
}

impl Iterator for ScopeChain<'_> {
    type Item = ScopeId;

    fn next(&mut self) -> Option<ScopeId> {
        let current = self.next?;
        self.next = self.graph.scope(current).parent;
        Some(current)
    }
}
