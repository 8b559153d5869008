use crate::{ItemId, ModuleId, ScopeId, Type};

/// The structural container a scope belongs to.
///
/// Every scope has exactly one owner; blocks nest inside another scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeOwner {
    Module(ModuleId),
    Function(ItemId),
    Namespace(ItemId),
    Class(ItemId),
    Block,
}

/// A lexical scope: an ordered list of items and a link to its parent.
#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub parent: Option<ScopeId>,
    pub owner: ScopeOwner,
    pub module: ModuleId,
    /// Items declared here, in declaration order.
    pub items: Vec<ItemId>,
    /// Index of this scope among its parent's children.
    pub relative_id: u32,
    pub next_child_id: u32,
    /// Error types that may propagate out of this scope.
    pub possible_errors: Vec<Type>,
    /// The body of a `try`: errors stop here until catch clauses are matched.
    pub is_try: bool,
}

impl Scope {
    pub fn new(id: ScopeId, parent: Option<ScopeId>, owner: ScopeOwner, module: ModuleId) -> Self {
        Self {
            id,
            parent,
            owner,
            module,
            items: Vec::new(),
            relative_id: 0,
            next_child_id: 0,
            possible_errors: Vec::new(),
            is_try: false,
        }
    }

    /// Add an error type unless an identical one is already recorded.
    /// Returns whether it was new.
    pub fn add_possible_error(&mut self, ty: Type) -> bool {
        if self.possible_errors.contains(&ty) {
            return false;
        }
        self.possible_errors.push(ty);
        true
    }

    pub fn class_owner(&self) -> Option<ItemId> {
        match self.owner {
            ScopeOwner::Class(id) => Some(id),
            _ => None,
        }
    }

    pub fn function_owner(&self) -> Option<ItemId> {
        match self.owner {
            ScopeOwner::Function(id) => Some(id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn possible_errors_are_a_set() {
        let mut scope = Scope::new(ScopeId::new(0), None, ScopeOwner::Block, ModuleId::new(0));
        assert!(scope.add_possible_error(Type::int()));
        assert!(!scope.add_possible_error(Type::int()));
        assert!(scope.add_possible_error(Type::bool()));
        assert_eq!(scope.possible_errors.len(), 2);
    }

    #[test]
    fn owner_accessors() {
        let scope = Scope::new(
            ScopeId::new(1),
            Some(ScopeId::new(0)),
            ScopeOwner::Class(ItemId::new(5)),
            ModuleId::new(0),
        );
        assert_eq!(scope.class_owner(), Some(ItemId::new(5)));
        assert_eq!(scope.function_owner(), None);
    }
}
