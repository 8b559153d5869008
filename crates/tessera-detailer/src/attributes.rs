//! Attribute registry.
//!
//! Hosts register a callback per attribute path (`@inline`, `@ffi.link`). When
//! the detailer meets an attribute on a declaration it evaluates the
//! arguments, finds the registration for the path and target kind, and calls
//! it with the detailed entity. Registrations may be limited to one module.
//! Attributes nobody registered are logged and skipped.

use std::fmt;

use bitflags::bitflags;
use rustc_hash::FxHashMap;

use tessera_core::{ItemId, ModuleId, NodeId, Position, Type};
use tessera_registry::EntityGraph;

bitflags! {
    /// Declaration kinds an attribute may be written on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AttributeTargets: u8 {
        const VARIABLE = 1 << 0;
        const FUNCTION = 1 << 1;
        const CLASS = 1 << 2;
        const FIELD = 1 << 3;

        const ALL = Self::VARIABLE.bits() | Self::FUNCTION.bits() | Self::CLASS.bits() | Self::FIELD.bits();
    }
}

/// The detailed entity an attribute is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeSubject {
    Variable(ItemId),
    Function(ItemId),
    Class(ItemId),
    Field(ItemId),
}

impl AttributeSubject {
    pub fn target(self) -> AttributeTargets {
        match self {
            AttributeSubject::Variable(_) => AttributeTargets::VARIABLE,
            AttributeSubject::Function(_) => AttributeTargets::FUNCTION,
            AttributeSubject::Class(_) => AttributeTargets::CLASS,
            AttributeSubject::Field(_) => AttributeTargets::FIELD,
        }
    }

    pub fn item(self) -> ItemId {
        match self {
            AttributeSubject::Variable(id)
            | AttributeSubject::Function(id)
            | AttributeSubject::Class(id)
            | AttributeSubject::Field(id) => id,
        }
    }
}

/// An evaluated attribute argument.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Null,
    Type(Type),
    /// A name that resolved to an item.
    Item(ItemId),
}

/// What a callback receives besides the graph.
#[derive(Debug, Clone, Copy)]
pub struct AttributeInvocation<'a> {
    pub subject: AttributeSubject,
    /// The declaration node carrying the attribute.
    pub node: NodeId,
    pub position: Position,
    pub arguments: &'a [AttributeValue],
}

/// Callback run for each use of an attribute. An `Err` message becomes a
/// detailing error at the attribute.
pub type AttributeCallback =
    Box<dyn Fn(&mut EntityGraph, &AttributeInvocation<'_>) -> Result<(), String>>;

pub struct RegisteredAttribute {
    pub path: String,
    pub targets: AttributeTargets,
    /// Only applies inside this module when set.
    pub module: Option<ModuleId>,
    callback: AttributeCallback,
}

impl RegisteredAttribute {
    pub fn invoke(&self, graph: &mut EntityGraph, invocation: &AttributeInvocation<'_>) -> Result<(), String> {
        (self.callback)(graph, invocation)
    }
}

impl fmt::Debug for RegisteredAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredAttribute")
            .field("path", &self.path)
            .field("targets", &self.targets)
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

/// Attribute registrations of one detailing session.
#[derive(Debug, Default)]
pub struct AttributeRegistry {
    entries: FxHashMap<String, Vec<RegisteredAttribute>>,
}

impl AttributeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an attribute everywhere.
    pub fn register(
        &mut self,
        path: impl Into<String>,
        targets: AttributeTargets,
        callback: impl Fn(&mut EntityGraph, &AttributeInvocation<'_>) -> Result<(), String> + 'static,
    ) -> &mut Self {
        self.insert(path.into(), targets, None, Box::new(callback))
    }

    /// Register an attribute that only applies inside `module`. It takes
    /// precedence over a global registration of the same path.
    pub fn register_in_module(
        &mut self,
        module: ModuleId,
        path: impl Into<String>,
        targets: AttributeTargets,
        callback: impl Fn(&mut EntityGraph, &AttributeInvocation<'_>) -> Result<(), String> + 'static,
    ) -> &mut Self {
        self.insert(path.into(), targets, Some(module), Box::new(callback))
    }

    fn insert(
        &mut self,
        path: String,
        targets: AttributeTargets,
        module: Option<ModuleId>,
        callback: AttributeCallback,
    ) -> &mut Self {
        self.entries.entry(path.clone()).or_default().push(RegisteredAttribute {
            path,
            targets,
            module,
            callback,
        });
        self
    }

    /// The registration for `path` on a `target` declaration in `module`.
    pub fn find_attribute(
        &self,
        path: &str,
        target: AttributeTargets,
        module: ModuleId,
    ) -> Option<&RegisteredAttribute> {
        let entries = self.entries.get(path)?;
        let applies = |entry: &&RegisteredAttribute| entry.targets.intersects(target);
        entries
            .iter()
            .filter(applies)
            .find(|entry| entry.module == Some(module))
            .or_else(|| entries.iter().filter(applies).find(|entry| entry.module.is_none()))
    }

    /// Whether `path` is registered at all, for any target.
    pub fn is_known(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use tessera_core::{Class, ItemHeader, ItemKind, ScopeOwner};

    use super::*;

    #[test]
    fn finds_by_path_and_target() {
        let mut registry = AttributeRegistry::new();
        registry.register("inline", AttributeTargets::FUNCTION, |_, _| Ok(()));
        let module = ModuleId::new(0);

        assert!(registry.find_attribute("inline", AttributeTargets::FUNCTION, module).is_some());
        assert!(registry.find_attribute("inline", AttributeTargets::CLASS, module).is_none());
        assert!(registry.find_attribute("unknown", AttributeTargets::ALL, module).is_none());
        assert!(registry.is_known("inline"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn module_registration_shadows_global() {
        let mut registry = AttributeRegistry::new();
        let module = ModuleId::new(2);
        registry
            .register("tag", AttributeTargets::ALL, |_, _| Err("global".to_string()))
            .register_in_module(module, "tag", AttributeTargets::ALL, |_, _| Ok(()));

        let mut graph = EntityGraph::new();
        let invocation = AttributeInvocation {
            subject: AttributeSubject::Variable(ItemId::new(0)),
            node: NodeId::fresh(),
            position: Position::new(1, 1),
            arguments: &[],
        };
        let local = registry.find_attribute("tag", AttributeTargets::VARIABLE, module);
        assert_eq!(local.map(|a| a.invoke(&mut graph, &invocation)), Some(Ok(())));

        let elsewhere = registry.find_attribute("tag", AttributeTargets::VARIABLE, ModuleId::new(5));
        assert_eq!(
            elsewhere.map(|a| a.invoke(&mut graph, &invocation)),
            Some(Err("global".to_string()))
        );
    }

    #[test]
    fn callbacks_can_edit_the_graph() {
        let mut graph = EntityGraph::new();
        let module = graph.new_module("main", "main.tsr", "");
        let root = graph.module(module).scope;
        let scope = graph.new_scope(root, ScopeOwner::Block);
        let class = graph.add_item(ItemHeader::new("Point", root, module), ItemKind::Class(Class::new(scope)));

        let mut registry = AttributeRegistry::new();
        registry.register("packed", AttributeTargets::CLASS, |graph, invocation| {
            let class = graph
                .class_mut(invocation.subject.item())
                .ok_or_else(|| "not a class".to_string())?;
            class.needs_cleanup = matches!(invocation.arguments, [AttributeValue::Bool(true)]);
            Ok(())
        });

        let arguments = [AttributeValue::Bool(true)];
        let invocation = AttributeInvocation {
            subject: AttributeSubject::Class(class),
            node: NodeId::fresh(),
            position: Position::new(1, 1),
            arguments: &arguments,
        };
        let result = registry
            .find_attribute("packed", AttributeTargets::CLASS, module)
            .map(|a| a.invoke(&mut graph, &invocation));
        assert_eq!(result, Some(Ok(())));
        assert!(graph.class(class).is_some_and(|c| c.needs_cleanup));
    }
}
