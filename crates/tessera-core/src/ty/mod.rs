//! The `Type` value model.
//!
//! A [`Type`] is a discriminant ([`TypeKind`]) plus a stack of [`Modifier`]
//! layers. Types are plain values: every algebraic operation returns a new
//! type and equality is structural. Class identity is carried by [`ItemId`], so
//! two instantiations of the same generic are distinct types even when they
//! print the same.
//!
//! See [`modifier`] for the layer convention.

mod display;
pub mod modifier;
mod native;
mod signature;

pub use display::{IdNames, NameResolver, TypeDisplay};
pub use modifier::Modifier;
pub use native::NativeType;
pub use signature::{FunctionSignature, SignatureParameter};

use smallvec::SmallVec;
use xxhash_rust::xxh64::xxh64;

use crate::ItemId;

/// Modifier stack storage. Two layers cover almost every real type.
pub type Modifiers = SmallVec<[Modifier; 2]>;

/// What a type is, independent of indirection and qualifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Unconstrained. Compatible with everything when it has no modifiers.
    Any,
    Native(NativeType),
    /// A class, identified by its item.
    Class(ItemId),
    Function(Box<FunctionSignature>),
    /// Any one of the member types.
    Union(Vec<Type>),
    /// The wrapped type or nothing.
    Optional(Box<Type>),
}

/// A fully resolved type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Type {
    kind: TypeKind,
    modifiers: Modifiers,
}

impl Type {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Build a type, dropping empty modifier layers.
    pub fn new(kind: TypeKind, modifiers: impl IntoIterator<Item = Modifier>) -> Self {
        Self {
            kind,
            modifiers: modifiers.into_iter().filter(|m| !m.is_empty()).collect(),
        }
    }

    fn bare(kind: TypeKind) -> Self {
        Self {
            kind,
            modifiers: Modifiers::new(),
        }
    }

    /// The unconstrained wildcard.
    pub fn any() -> Self {
        Self::bare(TypeKind::Any)
    }

    /// The type of the `null` literal: a pointer to anything.
    pub fn null() -> Self {
        Self::new(TypeKind::Any, [Modifier::POINTER])
    }

    pub fn native(native: NativeType) -> Self {
        Self::bare(TypeKind::Native(native))
    }

    pub fn void() -> Self {
        Self::native(NativeType::Void)
    }

    pub fn bool() -> Self {
        Self::native(NativeType::Bool)
    }

    pub fn int() -> Self {
        Self::native(NativeType::Integer)
    }

    pub fn class(id: ItemId) -> Self {
        Self::bare(TypeKind::Class(id))
    }

    pub fn function(signature: FunctionSignature) -> Self {
        Self::bare(TypeKind::Function(Box::new(signature)))
    }

    /// A union of the given members. Nested unions are flattened and exact
    /// duplicates removed; a single remaining member is returned as itself.
    pub fn union(members: impl IntoIterator<Item = Type>) -> Self {
        let mut flat: Vec<Type> = Vec::new();
        for member in members {
            let nested = if member.modifiers.is_empty() && member.union_members().is_some() {
                match member.kind {
                    TypeKind::Union(inner) => inner,
                    other => vec![Self::bare(other)],
                }
            } else {
                vec![member]
            };
            for ty in nested {
                if !flat.contains(&ty) {
                    flat.push(ty);
                }
            }
        }
        if flat.len() == 1 {
            return flat.remove(0);
        }
        Self::bare(TypeKind::Union(flat))
    }

    pub fn optional(inner: Type) -> Self {
        Self::bare(TypeKind::Optional(Box::new(inner)))
    }

    /// Push one modifier layer onto the outside of this type.
    pub fn with_layer(mut self, layer: Modifier) -> Self {
        if !layer.is_empty() {
            self.modifiers.push(layer);
        }
        self
    }

    /// Apply the layers written around a type name to the type it names.
    ///
    /// A leading qualifier layer (`const`, sign, width) merges into the
    /// outermost level of `self`; indirection layers stack on top. This is how
    /// `const T*` behaves when `T` is bound to `int*`.
    pub fn qualified(mut self, layers: &[Modifier]) -> Self {
        let mut rest = layers;
        if let Some((first, tail)) = layers.split_first() {
            if !first.is_indirection() {
                match self.modifiers.last_mut() {
                    Some(outer) => *outer |= *first,
                    None if !first.is_empty() => self.modifiers.push(*first),
                    None => {}
                }
                rest = tail;
            }
        }
        for layer in rest {
            self = self.with_layer(*layer);
        }
        self
    }

    // ========================================================================
    // Discriminant queries
    // ========================================================================

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    pub fn is_any(&self) -> bool {
        matches!(self.kind, TypeKind::Any)
    }

    /// `any` with no modifiers: matches everything.
    pub fn is_wildcard(&self) -> bool {
        self.is_any() && self.modifiers.is_empty()
    }

    /// The `null` literal type.
    pub fn is_null(&self) -> bool {
        self.is_any() && self.modifiers.as_slice() == [Modifier::POINTER]
    }

    pub fn as_native(&self) -> Option<NativeType> {
        match self.kind {
            TypeKind::Native(native) => Some(native),
            _ => None,
        }
    }

    pub fn class_id(&self) -> Option<ItemId> {
        match self.kind {
            TypeKind::Class(id) => Some(id),
            _ => None,
        }
    }

    pub fn signature(&self) -> Option<&FunctionSignature> {
        match &self.kind {
            TypeKind::Function(signature) => Some(signature),
            _ => None,
        }
    }

    pub fn union_members(&self) -> Option<&[Type]> {
        match &self.kind {
            TypeKind::Union(members) => Some(members),
            _ => None,
        }
    }

    pub fn optional_inner(&self) -> Option<&Type> {
        match &self.kind {
            TypeKind::Optional(inner) => Some(inner),
            _ => None,
        }
    }

    /// `void` at indirection level 0.
    pub fn is_void(&self) -> bool {
        self.as_native() == Some(NativeType::Void) && self.indirection_level() == 0
    }

    /// A native other than `void`, at indirection level 0.
    pub fn is_arithmetic(&self) -> bool {
        self.indirection_level() == 0 && self.as_native().is_some_and(NativeType::is_arithmetic)
    }

    // ========================================================================
    // Modifier queries
    // ========================================================================

    /// The leading qualifier layer, or empty when the first layer is an
    /// indirection.
    pub fn base_layer(&self) -> Modifier {
        match self.modifiers.first() {
            Some(first) if !first.is_indirection() => *first,
            _ => Modifier::empty(),
        }
    }

    /// Sign and width qualifiers of a native base.
    pub fn native_qualifiers(&self) -> Modifier {
        self.base_layer().native_bits()
    }

    /// The outermost layer, or empty for an unmodified type.
    pub fn outermost(&self) -> Modifier {
        self.modifiers.last().copied().unwrap_or_default()
    }

    pub fn indirection_level(&self) -> usize {
        self.modifiers.iter().filter(|m| m.is_indirection()).count()
    }

    pub fn reference_level(&self) -> usize {
        self.modifiers
            .iter()
            .filter(|m| m.contains(Modifier::REFERENCE))
            .count()
    }

    pub fn pointer_level(&self) -> usize {
        self.modifiers
            .iter()
            .filter(|m| m.contains(Modifier::POINTER))
            .count()
    }

    /// Whether the outermost level is constant.
    pub fn is_constant(&self) -> bool {
        self.outermost().contains(Modifier::CONSTANT)
    }

    /// Whether the value reached after reading through outer references is
    /// constant.
    pub fn is_constant_value(&self) -> bool {
        self.without_outer_references().is_constant()
    }

    pub fn is_reference(&self) -> bool {
        self.outermost().contains(Modifier::REFERENCE)
    }

    pub fn is_pointer(&self) -> bool {
        self.outermost().contains(Modifier::POINTER)
    }

    /// Constant flags of each level from the base outward. Index 0 is the
    /// base value; index `n` is the value behind the `n`th indirection.
    pub fn constness_by_level(&self) -> SmallVec<[bool; 3]> {
        let mut levels: SmallVec<[bool; 3]> = SmallVec::new();
        levels.push(self.base_layer().contains(Modifier::CONSTANT));
        for layer in self.modifiers.iter().filter(|m| m.is_indirection()) {
            levels.push(layer.contains(Modifier::CONSTANT));
        }
        levels
    }

    // ========================================================================
    // Algebra
    // ========================================================================

    /// Strip `CONSTANT` from the outermost layer.
    pub fn deconstify(&self) -> Type {
        let mut modifiers = self.modifiers.clone();
        if let Some(outer) = modifiers.last_mut() {
            outer.remove(Modifier::CONSTANT);
        }
        Self::new(self.kind.clone(), modifiers)
    }

    /// Make the outermost level constant.
    pub fn constify(&self) -> Type {
        let mut modifiers = self.modifiers.clone();
        match modifiers.last_mut() {
            Some(outer) => outer.insert(Modifier::CONSTANT),
            None => modifiers.push(Modifier::CONSTANT),
        }
        Self::new(self.kind.clone(), modifiers)
    }

    /// A reference to this type.
    pub fn reference(&self) -> Type {
        self.clone().with_layer(Modifier::REFERENCE)
    }

    /// Drop one outer reference layer, if the outermost layer is a reference.
    pub fn dereference(&self) -> Option<Type> {
        self.is_reference().then(|| self.pop_layer())
    }

    /// A pointer to this type.
    pub fn point(&self) -> Type {
        self.clone().with_layer(Modifier::POINTER)
    }

    /// Drop one outer pointer layer, if the outermost layer is a pointer.
    pub fn follow(&self) -> Option<Type> {
        self.is_pointer().then(|| self.pop_layer())
    }

    /// Drop the outermost indirection layer whatever it is. Types without
    /// indirection come back unchanged.
    pub fn follow_blindly(&self) -> Type {
        if self.outermost().is_indirection() {
            self.pop_layer()
        } else {
            self.clone()
        }
    }

    /// Remove every reference level.
    pub fn destroy_references(&self) -> Type {
        let modifiers = self.modifiers.iter().filter_map(|layer| {
            if layer.contains(Modifier::REFERENCE) && !layer.contains(Modifier::POINTER) {
                None
            } else {
                Some(layer.difference(Modifier::REFERENCE))
            }
        });
        Self::new(self.kind.clone(), modifiers.collect::<Modifiers>())
    }

    /// Remove reference layers from the outside until a non-reference
    /// layer is reached: the type of the value read through them.
    pub fn without_outer_references(&self) -> Type {
        let mut ty = self.clone();
        while ty.is_reference() {
            ty = ty.pop_layer();
        }
        ty
    }

    fn pop_layer(&self) -> Type {
        let mut modifiers = self.modifiers.clone();
        modifiers.pop();
        Self::new(self.kind.clone(), modifiers)
    }

    /// Identical discriminant, class identity and modifier stack.
    pub fn is_exactly_compatible_with(&self, other: &Type) -> bool {
        self == other
    }

    /// A stable 64-bit digest of this type, used to bucket cache keys.
    pub fn fingerprint(&self) -> u64 {
        let mut bytes = Vec::with_capacity(16);
        self.encode(&mut bytes);
        xxh64(&bytes, 0)
    }

    fn encode(&self, out: &mut Vec<u8>) {
        match &self.kind {
            TypeKind::Any => out.push(0),
            TypeKind::Native(native) => {
                out.push(1);
                out.push((*native).into());
            }
            TypeKind::Class(id) => {
                out.push(2);
                out.extend_from_slice(&id.raw().to_le_bytes());
            }
            TypeKind::Function(signature) => {
                out.push(3);
                signature.return_type.encode(out);
                for parameter in &signature.parameters {
                    out.push(parameter.is_variadic as u8);
                    parameter.ty.encode(out);
                }
                out.push(0xFF);
            }
            TypeKind::Union(members) => {
                out.push(4);
                for member in members {
                    member.encode(out);
                }
                out.push(0xFF);
            }
            TypeKind::Optional(inner) => {
                out.push(5);
                inner.encode(out);
            }
        }
        out.push(self.modifiers.len() as u8);
        out.extend(self.modifiers.iter().map(|m| m.bits()));
    }

    /// Render with class names supplied by `names`.
    pub fn display<'a, N: NameResolver + ?Sized>(&'a self, names: &'a N) -> TypeDisplay<'a, N> {
        TypeDisplay::new(self, names)
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display(&IdNames))
    }
}

impl From<NativeType> for Type {
    fn from(native: NativeType) -> Self {
        Type::native(native)
    }
}
