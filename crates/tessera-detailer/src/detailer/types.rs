//! Type expression resolution.
//!
//! Turns syntactic [`TypeExpr`]s into [`Type`] values: native keywords map
//! directly, named types are looked up from the current scope (instantiating
//! generic classes on the way), and the written modifier layers are applied
//! on top.

use tessera_core::{
    DetailingError, FunctionSignature, ItemId, ItemKind, ItemKindSet, Modifier, NativeType,
    Position, ScopeId, SignatureParameter, Type, TypeKind,
};
use tessera_syntax::{Ident, TypeExpr, TypeExprKind, join_path};

use super::{Detailer, Frame, Result};

impl<'ast> Detailer<'ast> {
    /// Resolve a written type in `scope`.
    pub(crate) fn resolve_type(&mut self, frame: Frame, ty: &TypeExpr<'ast>, scope: ScopeId) -> Result<Type> {
        let base = match ty.kind {
            TypeExprKind::Native(native) => Type::native(native),
            TypeExprKind::Any => Type::any(),
            TypeExprKind::SelfType => match self.graph.enclosing_class(scope) {
                Some(class) => Type::class(class),
                None => {
                    return Err(DetailingError::InvalidContext {
                        construct: "Self".to_string(),
                        requirement: "inside a class".to_string(),
                        position: ty.position,
                    });
                }
            },
            TypeExprKind::Optional(inner) => Type::optional(self.resolve_type(frame, inner, scope)?),
            TypeExprKind::Union(members) => {
                let members = members
                    .iter()
                    .map(|member| self.resolve_type(frame, member, scope))
                    .collect::<Result<Vec<_>>>()?;
                Type::union(members)
            }
            TypeExprKind::Function {
                parameters,
                return_type,
            } => {
                let mut resolved = Vec::with_capacity(parameters.len());
                for (index, parameter) in parameters.iter().enumerate() {
                    let name = parameter
                        .name
                        .map(|n| n.name.to_string())
                        .unwrap_or_else(|| format!("arg{index}"));
                    let param_ty = self.resolve_type(frame, parameter.ty, scope)?;
                    let param = if parameter.is_variadic {
                        SignatureParameter::variadic(name, param_ty)
                    } else {
                        SignatureParameter::new(name, param_ty)
                    };
                    resolved.push(param.with_id(index as u32));
                }
                let ret = self.resolve_type(frame, return_type, scope)?;
                Type::function(FunctionSignature::new(resolved, ret))
            }
            TypeExprKind::Named { path, generic_args } => {
                self.resolve_named_type(frame, path, generic_args, scope, ty.position)?
            }
        };
        Ok(base.qualified(ty.modifiers))
    }

    fn resolve_named_type(
        &mut self,
        frame: Frame,
        path: &'ast [Ident<'ast>],
        generic_args: &'ast [TypeExpr<'ast>],
        scope: ScopeId,
        position: Position,
    ) -> Result<Type> {
        if let [single] = path
            && generic_args.is_empty()
            && let Some(native) = NativeType::from_keyword(single.name)
        {
            return Ok(Type::native(native));
        }

        let item = self.resolve_path(path, scope, ItemKindSet::VALUES, position)?;
        match &self.graph.item(item).kind {
            ItemKind::Class(_) => {
                let header = &self.graph.item(item).header;
                let expected = header.generic_parameter_count;
                if expected != generic_args.len() {
                    return Err(DetailingError::GenericArity {
                        name: join_path(path),
                        expected,
                        got: generic_args.len(),
                        position,
                    });
                }
                if expected == 0 {
                    return Ok(Type::class(item));
                }
                let arguments = self.resolve_type_arguments(frame, generic_args, scope)?;
                let instance = self.instantiate_generic_class(item, arguments, position)?;
                Ok(Type::class(instance))
            }
            ItemKind::Type(bound) if generic_args.is_empty() => Ok(bound.ty.clone()),
            ItemKind::Type(_) => Err(DetailingError::GenericArity {
                name: join_path(path),
                expected: 0,
                got: generic_args.len(),
                position,
            }),
            other => Err(DetailingError::other(
                position,
                format!("'{}' is a {}, not a type", join_path(path), other.describe()),
            )),
        }
    }

    pub(crate) fn resolve_type_arguments(
        &mut self,
        frame: Frame,
        arguments: &'ast [TypeExpr<'ast>],
        scope: ScopeId,
    ) -> Result<Vec<Type>> {
        arguments
            .iter()
            .map(|argument| self.resolve_type(frame, argument, scope))
            .collect()
    }

    /// Resolve a dotted path to one item. Intermediate segments must be
    /// namespaces or classes.
    pub(crate) fn resolve_path(
        &self,
        path: &[Ident<'_>],
        scope: ScopeId,
        exclude: ItemKindSet,
        position: Position,
    ) -> Result<ItemId> {
        let Some((first, rest)) = path.split_first() else {
            return Err(DetailingError::other(position, "empty name path"));
        };
        let found = self.graph.find_all(first.name, scope, exclude, Some(scope));
        let Some(&head) = found.first() else {
            return Err(self.missing_name(first.name, scope, exclude, position));
        };

        let mut current = head;
        for (index, segment) in rest.iter().enumerate() {
            let found = match &self.graph.item(current).kind {
                ItemKind::Namespace(namespace) => {
                    self.graph
                        .find_local(segment.name, namespace.scope, exclude, Some(scope))
                }
                ItemKind::Class(_) => self.graph.find_in_class(current, segment.name, exclude, Some(scope)),
                _ => Vec::new(),
            };
            current = match found.first() {
                Some(&next) => next,
                None => {
                    return Err(DetailingError::NoTargetFound {
                        name: join_path(&path[..index + 2]),
                        position,
                    });
                }
            };
        }
        Ok(current)
    }

    /// The error for a name lookup that found nothing visible: `NotVisible`
    /// when the name exists but is hidden from `scope`.
    pub(crate) fn missing_name(
        &self,
        name: &str,
        scope: ScopeId,
        exclude: ItemKindSet,
        position: Position,
    ) -> DetailingError {
        if self.graph.find_all(name, scope, exclude, None).is_empty() {
            DetailingError::NoTargetFound {
                name: name.to_string(),
                position,
            }
        } else {
            DetailingError::NotVisible {
                name: name.to_string(),
                position,
            }
        }
    }
}

/// `unsigned long int`, the type of `sizeof`.
pub(crate) fn size_type() -> Type {
    Type::new(
        TypeKind::Native(NativeType::Integer),
        [Modifier::UNSIGNED | Modifier::LONG],
    )
}

/// `const byte*`, the type of string literals.
pub(crate) fn string_type() -> Type {
    Type::new(
        TypeKind::Native(NativeType::Byte),
        [Modifier::CONSTANT, Modifier::POINTER],
    )
}
