//! Source-like rendering of types for diagnostics.

use std::fmt;

use super::{FunctionSignature, Modifier, Type, TypeKind};
use crate::ItemId;

/// Supplies display names for class items.
pub trait NameResolver {
    fn item_name(&self, id: ItemId) -> String;
}

/// Renders classes by their raw id. Used by `Display for Type`.
pub struct IdNames;

impl NameResolver for IdNames {
    fn item_name(&self, id: ItemId) -> String {
        id.to_string()
    }
}

/// Adapter returned by [`Type::display`].
pub struct TypeDisplay<'a, N: NameResolver + ?Sized> {
    ty: &'a Type,
    names: &'a N,
}

impl<'a, N: NameResolver + ?Sized> TypeDisplay<'a, N> {
    pub(super) fn new(ty: &'a Type, names: &'a N) -> Self {
        Self { ty, names }
    }
}

impl<N: NameResolver + ?Sized> fmt::Display for TypeDisplay<'_, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_type(f, self.ty, self.names)
    }
}

fn write_type<N: NameResolver + ?Sized>(
    f: &mut fmt::Formatter<'_>,
    ty: &Type,
    names: &N,
) -> fmt::Result {
    if ty.is_null() {
        return f.write_str("null");
    }

    let base = ty.base_layer();
    if base.contains(Modifier::CONSTANT) {
        f.write_str("const ")?;
    }
    for (bit, word) in [
        (Modifier::SIGNED, "signed "),
        (Modifier::UNSIGNED, "unsigned "),
        (Modifier::SHORT, "short "),
        (Modifier::LONG, "long "),
    ] {
        if base.contains(bit) {
            f.write_str(word)?;
        }
    }

    let wrap = !ty.modifiers().is_empty()
        && matches!(ty.kind(), TypeKind::Union(_) | TypeKind::Function(_));
    if wrap {
        f.write_str("(")?;
    }
    write_kind(f, ty.kind(), names)?;
    if wrap {
        f.write_str(")")?;
    }

    for layer in ty.modifiers().iter().filter(|m| m.is_indirection()) {
        f.write_str(if layer.contains(Modifier::POINTER) { "*" } else { "&" })?;
        if layer.contains(Modifier::CONSTANT) {
            f.write_str(" const")?;
        }
    }
    Ok(())
}

fn write_kind<N: NameResolver + ?Sized>(
    f: &mut fmt::Formatter<'_>,
    kind: &TypeKind,
    names: &N,
) -> fmt::Result {
    match kind {
        TypeKind::Any => f.write_str("any"),
        TypeKind::Native(native) => write!(f, "{native}"),
        TypeKind::Class(id) => f.write_str(&names.item_name(*id)),
        TypeKind::Function(signature) => write_signature(f, signature, names),
        TypeKind::Union(members) => {
            for (i, member) in members.iter().enumerate() {
                if i > 0 {
                    f.write_str(" | ")?;
                }
                write_type(f, member, names)?;
            }
            Ok(())
        }
        TypeKind::Optional(inner) => {
            let wrap = inner.union_members().is_some() || inner.signature().is_some();
            if wrap {
                f.write_str("(")?;
            }
            write_type(f, inner, names)?;
            if wrap {
                f.write_str(")")?;
            }
            f.write_str("?")
        }
    }
}

/// `(name: Type, ...rest: Type) => Return`
fn write_signature<N: NameResolver + ?Sized>(
    f: &mut fmt::Formatter<'_>,
    signature: &FunctionSignature,
    names: &N,
) -> fmt::Result {
    f.write_str("(")?;
    for (i, parameter) in signature.parameters.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        if parameter.is_variadic {
            f.write_str("...")?;
        }
        write!(f, "{}: ", parameter.name)?;
        write_type(f, &parameter.ty, names)?;
    }
    f.write_str(") => ")?;
    write_type(f, &signature.return_type, names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::{NativeType, SignatureParameter};

    struct Names;

    impl NameResolver for Names {
        fn item_name(&self, id: ItemId) -> String {
            format!("C{}", id.raw())
        }
    }

    fn render(ty: &Type) -> String {
        ty.display(&Names).to_string()
    }

    #[test]
    fn natives_and_qualifiers() {
        assert_eq!(render(&Type::int()), "int");
        assert_eq!(render(&Type::int().constify()), "const int");
        let ulong = Type::int().with_layer(Modifier::UNSIGNED | Modifier::LONG);
        assert_eq!(render(&ulong), "unsigned long int");
    }

    #[test]
    fn indirection_layers() {
        assert_eq!(render(&Type::int().constify().point()), "const int*");
        assert_eq!(render(&Type::int().point().constify()), "int* const");
        assert_eq!(render(&Type::class(ItemId::new(4)).reference()), "C4&");
        assert_eq!(render(&Type::null()), "null");
        assert_eq!(render(&Type::any()), "any");
    }

    #[test]
    fn compound_types() {
        let union = Type::union([Type::int(), Type::native(NativeType::Float)]);
        assert_eq!(render(&union), "int | float");
        assert_eq!(render(&union.point()), "(int | float)*");
        assert_eq!(render(&Type::optional(union)), "(int | float)?");
        assert_eq!(render(&Type::optional(Type::int())), "int?");
    }

    #[test]
    fn function_signature() {
        let sig = FunctionSignature::new(
            vec![
                SignatureParameter::new("a", Type::int()),
                SignatureParameter::variadic("rest", Type::class(ItemId::new(1))),
            ],
            Type::bool(),
        );
        assert_eq!(render(&Type::function(sig)), "(a: int, ...rest: C1) => bool");
    }

    #[test]
    fn plain_display_uses_ids() {
        assert_eq!(Type::class(ItemId::new(7)).to_string(), "item_7");
    }
}
