use crate::{ItemId, Type};

/// A variable, parameter, member field or bitfield entry.
#[derive(Debug, Clone)]
pub struct Variable {
    pub ty: Type,
    /// Bound to a compile-time literal (`const x = 3` at module level).
    pub is_literal: bool,
    pub is_export: bool,
    pub is_bitfield_entry: bool,
    pub bitfield_bits: u32,
    /// Declared as a function parameter.
    pub is_parameter: bool,
    /// A field of a class.
    pub is_member: bool,
    /// The function whose frame holds this variable, for capture analysis.
    pub owner_function: Option<ItemId>,
}

impl Variable {
    pub fn new(ty: Type) -> Self {
        Self {
            ty,
            is_literal: false,
            is_export: false,
            is_bitfield_entry: false,
            bitfield_bits: 0,
            is_parameter: false,
            is_member: false,
            owner_function: None,
        }
    }

    pub fn parameter(ty: Type, function: ItemId) -> Self {
        Self {
            is_parameter: true,
            owner_function: Some(function),
            ..Self::new(ty)
        }
    }

    pub fn member(ty: Type) -> Self {
        Self {
            is_member: true,
            ..Self::new(ty)
        }
    }

    pub fn bitfield_entry(ty: Type, bits: u32) -> Self {
        Self {
            is_member: true,
            is_bitfield_entry: true,
            bitfield_bits: bits,
            ..Self::new(ty)
        }
    }

    pub fn owned_by(mut self, function: Option<ItemId>) -> Self {
        self.owner_function = function;
        self
    }
}
