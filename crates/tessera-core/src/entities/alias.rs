use crate::{ItemId, Type};

/// A transparent forwarding name for another item.
///
/// Created by `using`, by imports and re-exports, and to bind generic
/// parameters inside an instantiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub target: ItemId,
}

impl Alias {
    pub fn new(target: ItemId) -> Self {
        Self { target }
    }
}

/// A named type that is not a class: the concrete type bound to a generic
/// parameter, or a type alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeItem {
    pub ty: Type,
}

impl TypeItem {
    pub fn new(ty: Type) -> Self {
        Self { ty }
    }
}
