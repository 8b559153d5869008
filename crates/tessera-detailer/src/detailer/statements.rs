//! Statement detailing.

use tracing::trace;

use tessera_core::{
    DetailingError, ItemHeader, ItemId, ItemKind, ItemKindSet, Position, ScopeId, ScopeOwner, Type,
    Variable, Visibility,
};
use tessera_syntax::{Block, DeleteStmt, ExportStmt, ForStmt, IfStmt, RangedForStmt, ReturnStmt, Stmt, WhileStmt};

use super::{Detailer, Frame, Result};
use crate::compatibility::is_compatible_with;
use crate::generics::inferred_type;
use crate::handles::{DetailHandle, RangedForHandle};

impl<'ast> Detailer<'ast> {
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(crate) fn detail_stmt(&mut self, frame: Frame, stmt: &'ast Stmt<'ast>, scope: ScopeId) -> Result<()> {
        trace!(kind = stmt.describe(), "detail statement");
        match *stmt {
            Stmt::Expression(s) => {
                self.detail_expr(frame, s.expr, scope)?;
                self.store(frame, s.id, DetailHandle::Statement { scope }, s.position)
            }
            Stmt::VariableDeclaration(decl) => self.detail_variable(frame, decl, scope),
            Stmt::Block(block) => {
                let inner = self.graph.new_scope(scope, ScopeOwner::Block);
                self.detail_block(frame, block, inner)
            }
            Stmt::Return(ret) => self.detail_return(frame, ret, scope),
            Stmt::If(s) => self.detail_if(frame, s, scope),
            Stmt::While(s) => self.detail_while(frame, s, scope),
            Stmt::For(s) => self.detail_for(frame, s, scope),
            Stmt::RangedFor(s) => self.detail_ranged_for(frame, s, scope),
            Stmt::Break(jump) | Stmt::Continue(jump) => {
                self.store(frame, jump.id, DetailHandle::Statement { scope }, jump.position)
            }
            Stmt::Throw(s) => self.detail_throw(frame, s, scope),
            Stmt::TryCatch(s) => self.detail_try_catch(frame, s, scope),
            Stmt::Delete(s) => self.detail_delete(frame, s, scope),
            Stmt::Function(def) => self.detail_local_function(frame, def, scope),
            Stmt::Class(def) => self.detail_local_class(frame, def, scope),
            Stmt::Namespace(ns) => Err(misplaced("namespace", "at module or namespace level", ns.position)),
            Stmt::Import(import) => Err(misplaced("import", "at module level", import.position)),
            Stmt::Export(export) => self.detail_export_stmt(frame, export, scope),
            Stmt::Using(using) => {
                if self.declared_item(frame, using.id).is_some() {
                    Ok(())
                } else {
                    self.bind_using(frame, using, scope)
                }
            }
        }
    }

    /// Detail a block's statements in `scope`, which the caller created.
    pub(crate) fn detail_block(&mut self, frame: Frame, block: &'ast Block<'ast>, scope: ScopeId) -> Result<()> {
        for stmt in block.statements {
            self.detail_stmt(frame, stmt, scope)?;
        }
        self.store(frame, block.id, DetailHandle::Block { scope }, block.position)
    }

    /// Detail a branch or loop body in a fresh child scope.
    fn detail_branch(&mut self, frame: Frame, body: &'ast Stmt<'ast>, scope: ScopeId) -> Result<ScopeId> {
        let inner = self.graph.new_scope(scope, ScopeOwner::Block);
        match *body {
            Stmt::Block(block) => self.detail_block(frame, block, inner)?,
            _ => self.detail_stmt(frame, body, inner)?,
        }
        Ok(inner)
    }

    fn detail_if(&mut self, frame: Frame, stmt: &'ast IfStmt<'ast>, scope: ScopeId) -> Result<()> {
        self.detail_expr(frame, stmt.condition, scope)?;
        let then_scope = self.detail_branch(frame, stmt.then_branch, scope)?;
        let else_scope = match stmt.else_branch {
            Some(branch) => Some(self.detail_branch(frame, branch, scope)?),
            None => None,
        };
        self.store(frame, stmt.id, DetailHandle::If { then_scope, else_scope }, stmt.position)
    }

    fn detail_while(&mut self, frame: Frame, stmt: &'ast WhileStmt<'ast>, scope: ScopeId) -> Result<()> {
        let body_scope = if stmt.is_do_while {
            let body_scope = self.detail_branch(frame, stmt.body, scope)?;
            self.detail_expr(frame, stmt.condition, scope)?;
            body_scope
        } else {
            self.detail_expr(frame, stmt.condition, scope)?;
            self.detail_branch(frame, stmt.body, scope)?
        };
        self.store(frame, stmt.id, DetailHandle::Loop { scope: body_scope }, stmt.position)
    }

    fn detail_for(&mut self, frame: Frame, stmt: &'ast ForStmt<'ast>, scope: ScopeId) -> Result<()> {
        let loop_scope = self.graph.new_scope(scope, ScopeOwner::Block);
        if let Some(init) = stmt.init {
            self.detail_stmt(frame, init, loop_scope)?;
        }
        if let Some(condition) = stmt.condition {
            self.detail_expr(frame, condition, loop_scope)?;
        }
        if let Some(update) = stmt.update {
            self.detail_expr(frame, update, loop_scope)?;
        }
        self.detail_branch(frame, stmt.body, loop_scope)?;
        self.store(frame, stmt.id, DetailHandle::Loop { scope: loop_scope }, stmt.position)
    }

    /// `for (x in items)`: the iterable's class must have a parameterless
    /// `next()` returning an optional; the loop variable gets its inner type.
    fn detail_ranged_for(&mut self, frame: Frame, stmt: &'ast RangedForStmt<'ast>, scope: ScopeId) -> Result<()> {
        let iterable = self.detail_expr(frame, stmt.iterable, scope)?;
        let mut ty = iterable.ty.without_outer_references();
        if let Some(pointee) = ty.follow() {
            ty = pointee.without_outer_references();
        }
        let missing = |this: &Self| DetailingError::MissingIterator {
            ty: this.type_name(&iterable.ty),
            position: stmt.position,
        };
        let Some(class) = ty.class_id().filter(|_| ty.indirection_level() == 0) else {
            return Err(missing(self));
        };
        self.class_signatures(class)?;

        let next = self
            .graph
            .find_in_class(class, "next", ItemKindSet::empty(), Some(scope))
            .into_iter()
            .find_map(|candidate| {
                let function = self.graph.function(candidate)?;
                let element = function.return_type.without_outer_references().optional_inner()?.clone();
                function.parameters.is_empty().then_some((candidate, element))
            });
        let Some((next, element)) = next else {
            return Err(missing(self));
        };

        let loop_scope = self.graph.new_scope(scope, ScopeOwner::Block);
        let variable_ty = match &stmt.ty {
            Some(written) => {
                let declared = self.resolve_type(frame, written, scope)?;
                if !is_compatible_with(&element, &declared, &self.graph, &self.options) {
                    return Err(DetailingError::TypeMismatch {
                        expected: self.type_name(&declared),
                        found: self.type_name(&element),
                        position: stmt.variable.position,
                    });
                }
                declared
            }
            None => element.clone(),
        };
        let owner = self.graph.enclosing_function(scope);
        let variable = self.add_local(
            frame,
            stmt.variable.name,
            variable_ty,
            owner,
            loop_scope,
            stmt.variable.position,
        );
        self.link_throws(next, scope);
        self.detail_branch(frame, stmt.body, loop_scope)?;

        let handle = RangedForHandle {
            scope: loop_scope,
            variable,
            next,
            element,
        };
        self.store(frame, stmt.id, DetailHandle::RangedFor(handle), stmt.position)
    }

    fn detail_return(&mut self, frame: Frame, stmt: &'ast ReturnStmt<'ast>, scope: ScopeId) -> Result<()> {
        let Some(function) = self.graph.enclosing_function(scope) else {
            return Err(misplaced("return", "inside a function", stmt.position));
        };
        let value = match stmt.value {
            Some(value) => Some((value, self.detail_expr(frame, value, scope)?.ty)),
            None => None,
        };

        if self.inferring_returns.remove(&function) {
            let inferred = value
                .as_ref()
                .map(|(_, ty)| inferred_type(ty))
                .unwrap_or_else(Type::void);
            trace!(function = %function, ty = %self.type_name(&inferred), "inferred lambda return type");
            if let Some(entity) = self.graph.function_mut(function) {
                entity.return_type = inferred;
            }
        }

        let expected = match self.graph.function(function) {
            Some(entity) if entity.is_generator() => Type::void(),
            Some(entity) => entity.return_type.clone(),
            None => return Err(DetailingError::internal("return owner is not a function")),
        };
        match (&value, expected.is_void()) {
            (Some((node, ty)), false) => self.check_assignable(frame, node, ty, &expected, stmt.position)?,
            (Some((_, ty)), true) if !ty.is_void() => {
                return Err(DetailingError::TypeMismatch {
                    expected: "void".to_string(),
                    found: self.type_name(ty),
                    position: stmt.position,
                });
            }
            (None, false) => {
                return Err(DetailingError::TypeMismatch {
                    expected: self.type_name(&expected),
                    found: "void".to_string(),
                    position: stmt.position,
                });
            }
            _ => {}
        }
        self.store(frame, stmt.id, DetailHandle::Return { function, expected }, stmt.position)
    }

    fn detail_delete(&mut self, frame: Frame, stmt: &'ast DeleteStmt<'ast>, scope: ScopeId) -> Result<()> {
        let info = self.detail_expr(frame, stmt.value, scope)?;
        let value = info.ty.without_outer_references();
        let destroyed = if stmt.persistent {
            value.follow().map(|pointee| pointee.without_outer_references())
        } else {
            Some(value)
        };
        let class = destroyed.and_then(|ty| ty.class_id().filter(|_| ty.indirection_level() == 0));
        let destructor = match class {
            Some(class) => {
                self.ensure_synthesized(class)?;
                self.graph.class(class).and_then(|c| c.destructor)
            }
            None => None,
        };
        let handle = DetailHandle::Delete {
            ty: info.ty,
            destructor,
        };
        self.store(frame, stmt.id, handle, stmt.position)
    }

    fn detail_export_stmt(&mut self, frame: Frame, stmt: &'ast ExportStmt<'ast>, scope: ScopeId) -> Result<()> {
        if self.graph.module(frame.module).scope != scope {
            return Err(misplaced("export", "at module level", stmt.position));
        }
        self.detail_export(frame, stmt, scope)
    }

    /// A private local variable without a declaration node: loop and catch
    /// variables.
    pub(crate) fn add_local(
        &mut self,
        frame: Frame,
        name: &str,
        ty: Type,
        owner: Option<ItemId>,
        scope: ScopeId,
        position: Position,
    ) -> ItemId {
        let header = ItemHeader::new(name, scope, frame.module)
            .with_visibility(Visibility::Private)
            .with_position(position);
        self.graph
            .add_item(header, ItemKind::Variable(Variable::new(ty).owned_by(owner)))
    }
}

fn misplaced(construct: &str, requirement: &str, position: Position) -> DetailingError {
    DetailingError::InvalidContext {
        construct: construct.to_string(),
        requirement: requirement.to_string(),
        position,
    }
}
