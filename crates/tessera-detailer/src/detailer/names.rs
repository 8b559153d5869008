//! Name lookup in expressions: plain names, member access, `this` and
//! `super`.
//!
//! A name may stand for a value, an overload set, an accessor property, a
//! type or a namespace. The [`NameMeaning`] recorded on the handle tells the
//! enclosing expression which one it got.

use tracing::trace;

use tessera_core::{
    AccessorKind, DetailingError, ItemId, ItemKind, ItemKindSet, NativeType, Position, ScopeId, Type,
};
use tessera_syntax::{AccessorExpr, Expr, FetchExpr, MarkerExpr, TypeExpr};

use super::{Detailer, Frame, Result};
use crate::handles::{DetailHandle, ExpressionInfo, NameHandle, NameMeaning};

/// How an expression's value is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    Read,
    Write,
    ReadWrite,
}

impl<'ast> Detailer<'ast> {
    pub(crate) fn detail_fetch(
        &mut self,
        frame: Frame,
        fetch: &'ast FetchExpr<'ast>,
        scope: ScopeId,
        access: Access,
    ) -> Result<ExpressionInfo> {
        let name = fetch.name.name;
        let found = self.graph.find_all(name, scope, ItemKindSet::empty(), Some(scope));
        let handle = if found.is_empty() {
            match NativeType::from_keyword(name) {
                Some(native) if fetch.generic_args.is_empty() => {
                    let ty = Type::native(native);
                    NameHandle {
                        info: ExpressionInfo::rvalue(ty.clone()),
                        candidates: Vec::new(),
                        target: None,
                        meaning: NameMeaning::Type(ty),
                        through_this: false,
                    }
                }
                _ => return Err(self.missing_name(name, scope, ItemKindSet::empty(), fetch.position)),
            }
        } else {
            self.name_handle(frame, &found, fetch.generic_args, scope, access, name, fetch.position)?
        };
        let info = handle.info.clone();
        self.store(frame, fetch.id, DetailHandle::Fetch(handle), fetch.position)?;
        Ok(info)
    }

    /// `object.member`, where `object` is a value, a class or a namespace.
    pub(crate) fn detail_accessor(
        &mut self,
        frame: Frame,
        accessor: &'ast AccessorExpr<'ast>,
        scope: ScopeId,
        access: Access,
    ) -> Result<ExpressionInfo> {
        let object = self.detail_expr(frame, accessor.object, scope)?;
        let member = accessor.member.name;
        let mut constant_object = false;

        let found = match self.meaning_of(frame, accessor.object) {
            Some(NameMeaning::Namespace(namespace)) => match self.graph.item(namespace).own_scope() {
                Some(namespace_scope) => {
                    self.graph
                        .find_local(member, namespace_scope, ItemKindSet::empty(), Some(scope))
                }
                None => Vec::new(),
            },
            Some(NameMeaning::Type(ty)) => match ty.class_id().filter(|_| ty.indirection_level() == 0) {
                Some(class) => {
                    self.class_signatures(class)?;
                    self.graph.find_in_class(class, member, ItemKindSet::empty(), Some(scope))
                }
                None => Vec::new(),
            },
            _ => {
                let mut ty = object.ty.without_outer_references();
                if let Some(pointee) = ty.follow() {
                    ty = pointee.without_outer_references();
                }
                if ty.is_wildcard() {
                    let info = ExpressionInfo::lvalue(Type::any());
                    let handle = NameHandle {
                        info: info.clone(),
                        candidates: Vec::new(),
                        target: None,
                        meaning: NameMeaning::Value,
                        through_this: false,
                    };
                    self.store(frame, accessor.id, DetailHandle::Accessor(handle), accessor.position)?;
                    return Ok(info);
                }
                let Some(class) = ty.class_id().filter(|_| ty.indirection_level() == 0) else {
                    return Err(DetailingError::other(
                        accessor.position,
                        format!("'{}' has no members", self.type_name(&object.ty)),
                    ));
                };
                constant_object = ty.is_constant();
                self.class_signatures(class)?;
                let found = self.graph.find_in_class(class, member, ItemKindSet::empty(), Some(scope));
                if found.is_empty() && !self.graph.find_in_class(class, member, ItemKindSet::empty(), None).is_empty() {
                    return Err(DetailingError::NotVisible {
                        name: member.to_string(),
                        position: accessor.position,
                    });
                }
                found
            }
        };
        if found.is_empty() {
            return Err(DetailingError::NoTargetFound {
                name: member.to_string(),
                position: accessor.position,
            });
        }

        let mut handle = self.name_handle(
            frame,
            &found,
            accessor.generic_args,
            scope,
            access,
            member,
            accessor.position,
        )?;
        handle.through_this = false;
        if constant_object
            && handle.meaning == NameMeaning::Value
            && handle.target.is_some_and(|t| self.graph.variable(t).is_some())
        {
            handle.info.ty = handle.info.ty.constify();
        }
        let info = handle.info.clone();
        self.store(frame, accessor.id, DetailHandle::Accessor(handle), accessor.position)?;
        Ok(info)
    }

    /// Build the handle for a successful lookup. `found` is non-empty.
    #[allow(clippy::too_many_arguments)]
    fn name_handle(
        &mut self,
        frame: Frame,
        found: &[ItemId],
        generic_args: &'ast [TypeExpr<'ast>],
        scope: ScopeId,
        access: Access,
        name: &str,
        position: Position,
    ) -> Result<NameHandle> {
        let first = found[0];
        let handle = match &self.graph.item(first).kind {
            ItemKind::Variable(variable) => {
                let ty = variable.ty.clone();
                let through_this = variable.is_member;
                self.note_capture(first, scope);
                NameHandle {
                    info: ExpressionInfo::lvalue(ty),
                    candidates: found.to_vec(),
                    target: Some(first),
                    meaning: NameMeaning::Value,
                    through_this,
                }
            }
            ItemKind::Function(_) => {
                return self.function_name_handle(frame, found, generic_args, scope, access, name, position);
            }
            ItemKind::Class(_) => {
                let expected = self.graph.item(first).header.generic_parameter_count;
                if expected != generic_args.len() {
                    return Err(DetailingError::GenericArity {
                        name: name.to_string(),
                        expected,
                        got: generic_args.len(),
                        position,
                    });
                }
                let class = if expected == 0 {
                    first
                } else {
                    let arguments = self.resolve_type_arguments(frame, generic_args, scope)?;
                    self.instantiate_generic_class(first, arguments, position)?
                };
                let ty = Type::class(class);
                type_handle(ty, Some(class))
            }
            ItemKind::Type(bound) => type_handle(bound.ty.clone(), Some(first)),
            ItemKind::Namespace(_) => NameHandle {
                info: ExpressionInfo::rvalue(Type::any()),
                candidates: vec![first],
                target: Some(first),
                meaning: NameMeaning::Namespace(first),
                through_this: false,
            },
            ItemKind::Alias(_) => return Err(DetailingError::internal("lookup returned an unresolved alias")),
        };
        Ok(handle)
    }

    #[allow(clippy::too_many_arguments)]
    fn function_name_handle(
        &mut self,
        frame: Frame,
        found: &[ItemId],
        generic_args: &'ast [TypeExpr<'ast>],
        scope: ScopeId,
        access: Access,
        name: &str,
        position: Position,
    ) -> Result<NameHandle> {
        let functions: Vec<ItemId> = found
            .iter()
            .copied()
            .filter(|&f| self.graph.function(f).is_some())
            .collect();
        let is_method = functions
            .iter()
            .any(|&f| self.graph.function(f).is_some_and(|f| f.is_method()));

        let accessor_of = |kind: AccessorKind| {
            functions
                .iter()
                .copied()
                .find(|&f| self.graph.function(f).is_some_and(|f| f.accessor == Some(kind)))
        };
        let getter = accessor_of(AccessorKind::Get);
        let setter = accessor_of(AccessorKind::Set);
        if getter.is_some() || setter.is_some() {
            let missing = match access {
                Access::Read if getter.is_none() => Some("getter"),
                Access::Write if setter.is_none() => Some("setter"),
                Access::ReadWrite if getter.is_none() => Some("getter"),
                Access::ReadWrite if setter.is_none() => Some("setter"),
                _ => None,
            };
            if let Some(missing) = missing {
                return Err(DetailingError::other(
                    position,
                    format!("property '{name}' has no {missing}"),
                ));
            }
            let ty = match (getter, setter) {
                (Some(get), _) => self.graph.function(get).map(|f| f.return_type.clone()),
                (None, Some(set)) => self
                    .graph
                    .function(set)
                    .and_then(|f| f.parameters.first().map(|p| p.ty.clone())),
                (None, None) => None,
            }
            .unwrap_or_else(Type::any);
            trace!(name, "property access");
            return Ok(NameHandle {
                info: ExpressionInfo {
                    ty: ty.without_outer_references(),
                    is_lvalue: setter.is_some(),
                    implicit_cast: None,
                },
                candidates: functions,
                target: getter.or(setter),
                meaning: NameMeaning::Property { getter, setter },
                through_this: is_method,
            });
        }

        if !generic_args.is_empty() {
            let template = functions
                .iter()
                .copied()
                .find(|&f| self.graph.item(f).header.generic_parameter_count == generic_args.len());
            let Some(template) = template else {
                let expected = functions
                    .first()
                    .map(|&f| self.graph.item(f).header.generic_parameter_count)
                    .unwrap_or(0);
                return Err(DetailingError::GenericArity {
                    name: name.to_string(),
                    expected,
                    got: generic_args.len(),
                    position,
                });
            };
            let arguments = self.resolve_type_arguments(frame, generic_args, scope)?;
            let instance = self.instantiate_generic_function(template, arguments, position)?;
            let mut candidates = vec![instance];
            if let Some(function) = self.graph.function(instance) {
                candidates.extend(function.optional_variants.iter().copied());
            }
            let ty = self.graph.function(instance).map(|f| f.ty()).unwrap_or_else(Type::any);
            return Ok(NameHandle {
                info: ExpressionInfo::rvalue(ty),
                candidates,
                target: Some(instance),
                meaning: NameMeaning::Value,
                through_this: is_method,
            });
        }

        let concrete: Vec<ItemId> = functions
            .iter()
            .copied()
            .filter(|&f| !self.graph.item(f).header.is_generic())
            .collect();
        let target = match (functions.len(), concrete.as_slice()) {
            (1, [only]) => Some(*only),
            _ => None,
        };
        let ty = target
            .and_then(|t| self.graph.function(t))
            .map(|f| f.ty())
            .unwrap_or_else(Type::any);
        Ok(NameHandle {
            info: ExpressionInfo::rvalue(ty),
            candidates: functions,
            target,
            meaning: NameMeaning::Value,
            through_this: is_method,
        })
    }

    pub(crate) fn detail_this(&mut self, frame: Frame, marker: &'ast MarkerExpr, scope: ScopeId) -> Result<ExpressionInfo> {
        let class = self.method_class(scope, "this", marker.position)?;
        let info = ExpressionInfo::lvalue(Type::class(class));
        self.store(frame, marker.id, DetailHandle::This(info.clone()), marker.position)?;
        Ok(info)
    }

    /// `super` as a value: the current object viewed as its first parent.
    pub(crate) fn detail_super(&mut self, frame: Frame, marker: &'ast MarkerExpr, scope: ScopeId) -> Result<ExpressionInfo> {
        let class = self.method_class(scope, "super", marker.position)?;
        let parent = self.first_parent(class, "super", marker.position)?;
        let info = ExpressionInfo::lvalue(Type::class(parent));
        self.store(frame, marker.id, DetailHandle::Super(info.clone()), marker.position)?;
        Ok(info)
    }

    /// The class whose method encloses `scope`.
    pub(crate) fn method_class(&self, scope: ScopeId, construct: &str, position: Position) -> Result<ItemId> {
        let in_method = self
            .graph
            .enclosing_function(scope)
            .and_then(|f| self.graph.function(f))
            .is_some_and(|f| f.is_method() || f.is_lambda());
        match self.graph.enclosing_class(scope) {
            Some(class) if in_method => Ok(class),
            _ => Err(DetailingError::InvalidContext {
                construct: construct.to_string(),
                requirement: "inside a class method".to_string(),
                position,
            }),
        }
    }

    pub(crate) fn first_parent(&self, class: ItemId, construct: &str, position: Position) -> Result<ItemId> {
        self.graph
            .class(class)
            .and_then(|c| c.parents.first().copied())
            .ok_or_else(|| DetailingError::InvalidContext {
                construct: construct.to_string(),
                requirement: "in a class with a parent".to_string(),
                position,
            })
    }

    /// What a detailed name expression stands for.
    pub(crate) fn meaning_of(&self, frame: Frame, expr: &Expr<'_>) -> Option<NameMeaning> {
        self.handles
            .get(frame.id, expr.id())
            .and_then(DetailHandle::as_name)
            .map(|handle| handle.meaning.clone())
    }

    /// Record a use of `variable` from `scope` on every lambda between the
    /// use and the function that owns the variable.
    pub(crate) fn note_capture(&mut self, variable: ItemId, scope: ScopeId) {
        let Some(owner) = self.graph.variable(variable).and_then(|v| v.owner_function) else {
            return;
        };
        let chain: Vec<ScopeId> = self.graph.scope_chain(scope).collect();
        for current in chain {
            let Some(function) = self.graph.scope(current).function_owner() else {
                continue;
            };
            if function == owner {
                return;
            }
            match self.graph.function_mut(function) {
                Some(lambda) if lambda.is_lambda() => {
                    if !lambda.referenced_variables.contains(&variable) {
                        trace!(%variable, lambda = %function, "captured");
                        lambda.referenced_variables.push(variable);
                    }
                }
                _ => return,
            }
        }
    }
}

fn type_handle(ty: Type, item: Option<ItemId>) -> NameHandle {
    NameHandle {
        info: ExpressionInfo::rvalue(ty.clone()),
        candidates: item.into_iter().collect(),
        target: item,
        meaning: NameMeaning::Type(ty),
        through_this: false,
    }
}
