//! Entities of the detailed entity tree.
//!
//! Every named entity is an [`Item`]: a common [`ItemHeader`] (name,
//! visibility, owning scope, module, hoisted helpers) plus an [`ItemKind`]
//! payload. Items, scopes and modules live in the registry's arena and refer
//! to each other by id.

mod alias;
mod class;
mod function;
mod module;
mod namespace;
mod scope;
mod variable;
mod visibility;

pub use alias::{Alias, TypeItem};
pub use class::{Class, ClassFlags};
pub use function::{AccessorKind, Function, FunctionFlags};
pub use module::Module;
pub use namespace::Namespace;
pub use scope::{Scope, ScopeOwner};
pub use variable::Variable;
pub use visibility::Visibility;

use bitflags::bitflags;

use crate::{ItemId, ModuleId, Position, ScopeId};

/// Fields shared by every named entity.
#[derive(Debug, Clone)]
pub struct ItemHeader {
    pub name: String,
    pub visibility: Visibility,
    /// The scope that owns this item. Aliases elsewhere never re-parent it.
    pub parent_scope: ScopeId,
    /// Number of generic parameters declared (zero for non-generics and for
    /// concrete instantiations).
    pub generic_parameter_count: usize,
    pub module: ModuleId,
    pub id: ItemId,
    /// Synthetic helpers emitted with this item but private to it.
    pub private_hoisted: Vec<ItemId>,
    /// Synthetic helpers emitted with this item and visible to its users.
    pub public_hoisted: Vec<ItemId>,
    pub position: Position,
}

impl ItemHeader {
    pub fn new(name: impl Into<String>, parent_scope: ScopeId, module: ModuleId) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::default(),
            parent_scope,
            generic_parameter_count: 0,
            module,
            id: ItemId::new(0),
            private_hoisted: Vec::new(),
            public_hoisted: Vec::new(),
            position: Position::default(),
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn with_generic_parameters(mut self, count: usize) -> Self {
        self.generic_parameter_count = count;
        self
    }

    pub fn is_generic(&self) -> bool {
        self.generic_parameter_count > 0
    }
}

/// The entity-specific part of an item.
#[derive(Debug, Clone)]
pub enum ItemKind {
    Variable(Variable),
    Function(Function),
    Class(Class),
    Namespace(Namespace),
    Alias(Alias),
    Type(TypeItem),
}

impl ItemKind {
    /// The single-bit set naming this kind.
    pub fn kind_set(&self) -> ItemKindSet {
        match self {
            ItemKind::Variable(_) => ItemKindSet::VARIABLE,
            ItemKind::Function(_) => ItemKindSet::FUNCTION,
            ItemKind::Class(_) => ItemKindSet::CLASS,
            ItemKind::Namespace(_) => ItemKindSet::NAMESPACE,
            ItemKind::Alias(_) => ItemKindSet::ALIAS,
            ItemKind::Type(_) => ItemKindSet::TYPE,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            ItemKind::Variable(_) => "variable",
            ItemKind::Function(_) => "function",
            ItemKind::Class(_) => "class",
            ItemKind::Namespace(_) => "namespace",
            ItemKind::Alias(_) => "alias",
            ItemKind::Type(_) => "type",
        }
    }
}

bitflags! {
    /// A set of item kinds, used to exclude kinds from lookups.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ItemKindSet: u8 {
        const VARIABLE = 1 << 0;
        const FUNCTION = 1 << 1;
        const CLASS = 1 << 2;
        const NAMESPACE = 1 << 3;
        const ALIAS = 1 << 4;
        const TYPE = 1 << 5;

        /// Kinds that name a type.
        const TYPES = Self::CLASS.bits() | Self::TYPE.bits();
        /// Kinds that produce a value when fetched.
        const VALUES = Self::VARIABLE.bits() | Self::FUNCTION.bits();
    }
}

/// A named entity.
#[derive(Debug, Clone)]
pub struct Item {
    pub header: ItemHeader,
    pub kind: ItemKind,
}

impl Item {
    pub fn new(header: ItemHeader, kind: ItemKind) -> Self {
        Self { header, kind }
    }

    pub fn id(&self) -> ItemId {
        self.header.id
    }

    pub fn name(&self) -> &str {
        &self.header.name
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match &self.kind {
            ItemKind::Variable(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_variable_mut(&mut self) -> Option<&mut Variable> {
        match &mut self.kind {
            ItemKind::Variable(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match &self.kind {
            ItemKind::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_function_mut(&mut self) -> Option<&mut Function> {
        match &mut self.kind {
            ItemKind::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&Class> {
        match &self.kind {
            ItemKind::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_class_mut(&mut self) -> Option<&mut Class> {
        match &mut self.kind {
            ItemKind::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_namespace(&self) -> Option<&Namespace> {
        match &self.kind {
            ItemKind::Namespace(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_alias(&self) -> Option<&Alias> {
        match &self.kind {
            ItemKind::Alias(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_type_item(&self) -> Option<&TypeItem> {
        match &self.kind {
            ItemKind::Type(t) => Some(t),
            _ => None,
        }
    }

    /// The scope this item owns, if it owns one.
    pub fn own_scope(&self) -> Option<ScopeId> {
        match &self.kind {
            ItemKind::Function(f) => Some(f.scope),
            ItemKind::Class(c) => Some(c.scope),
            ItemKind::Namespace(n) => Some(n.scope),
            _ => None,
        }
    }
}
