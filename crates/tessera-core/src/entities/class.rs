use bitflags::bitflags;

use crate::{ItemId, ScopeId, Type};

bitflags! {
    /// Declaration flags of a [`Class`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClassFlags: u8 {
        /// Plain data: no implicit `this`, no methods.
        const STRUCTURE = 1 << 0;
        /// Implemented outside the language.
        const EXTERNAL = 1 << 1;
        /// Carries runtime type information.
        const TYPED = 1 << 2;
        /// Constructible from a literal.
        const LITERAL = 1 << 3;
        const EXPORT = 1 << 4;
        /// Members are packed bit ranges of an underlying native.
        const BITFIELD = 1 << 5;
    }
}

/// A class, structure or bitfield.
#[derive(Debug, Clone)]
pub struct Class {
    pub flags: ClassFlags,
    /// The class scope. Holds members, methods and the implicit `this`.
    pub scope: ScopeId,
    pub this_variable: Option<ItemId>,

    // === Special functions ===
    pub default_constructor: Option<ItemId>,
    pub constructors: Vec<ItemId>,
    pub destructor: Option<ItemId>,
    pub copy_constructor: Option<ItemId>,

    // === Structure ===
    /// Direct parents, in declaration order.
    pub parents: Vec<ItemId>,
    pub members: Vec<ItemId>,
    pub from_casts: Vec<ItemId>,
    pub to_casts: Vec<ItemId>,
    pub operators: Vec<ItemId>,
    pub methods: Vec<ItemId>,

    // === Generics ===
    pub generic_arguments: Vec<Type>,
    /// The generic declaration this class was instantiated from.
    pub generic_origin: Option<ItemId>,

    pub underlying_bitfield_type: Option<Type>,
    /// Instances need a destructor call when they go away.
    pub needs_cleanup: bool,
    /// Both detailing passes have completed.
    pub is_detailed: bool,
}

impl Class {
    pub fn new(scope: ScopeId) -> Self {
        Self {
            flags: ClassFlags::empty(),
            scope,
            this_variable: None,
            default_constructor: None,
            constructors: Vec::new(),
            destructor: None,
            copy_constructor: None,
            parents: Vec::new(),
            members: Vec::new(),
            from_casts: Vec::new(),
            to_casts: Vec::new(),
            operators: Vec::new(),
            methods: Vec::new(),
            generic_arguments: Vec::new(),
            generic_origin: None,
            underlying_bitfield_type: None,
            needs_cleanup: false,
            is_detailed: false,
        }
    }

    pub fn with_flags(mut self, flags: ClassFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn is_structure(&self) -> bool {
        self.flags.contains(ClassFlags::STRUCTURE)
    }

    pub fn is_bitfield(&self) -> bool {
        self.flags.contains(ClassFlags::BITFIELD)
    }

    pub fn is_external(&self) -> bool {
        self.flags.contains(ClassFlags::EXTERNAL)
    }

    /// Whether some constructor takes no arguments.
    pub fn has_default_constructor(&self) -> bool {
        self.default_constructor.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags() {
        let class = Class::new(ScopeId::new(2)).with_flags(ClassFlags::STRUCTURE | ClassFlags::EXPORT);
        assert!(class.is_structure());
        assert!(!class.is_bitfield());
        assert!(!class.has_default_constructor());
    }
}
