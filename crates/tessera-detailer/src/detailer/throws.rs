//! Throw propagation.
//!
//! A thrown type is recorded on every scope from the throw outward until a
//! `try` body that catches it or a function scope. Reaching a function marks
//! it throwing, which in turn raises its errors at every recorded call site.
//! Call sites that appear after a function began throwing are linked
//! directly; earlier ones wait on the function's `began_throwing` event.

use tracing::{debug, trace};

use tessera_core::{DeferredAction, ItemId, ScopeId, ScopeOwner, Type};
use tessera_registry::EntityGraph;
use tessera_syntax::{ThrowStmt, TryCatchStmt};

use super::{Detailer, Frame, Result, TryRecord};
use crate::generics::inferred_type;
use crate::handles::{CatchHandle, DetailHandle, TryCatchHandle};

impl TryRecord {
    /// Whether some clause accepts a thrown `ty`. A clause without a type
    /// catches everything.
    pub(super) fn handles(&self, ty: &Type, graph: &EntityGraph) -> bool {
        self.catches.iter().any(|clause| match clause {
            None => true,
            Some(caught) => catches(ty, caught, graph),
        })
    }
}

/// Catch clauses match by type identity or class upcast, never through
/// conversions. `const` and references are ignored on both sides.
fn catches(thrown: &Type, caught: &Type, graph: &EntityGraph) -> bool {
    let thrown = thrown.without_outer_references().deconstify();
    let caught = caught.without_outer_references().deconstify();
    if caught.is_wildcard() || thrown == caught {
        return true;
    }
    match (thrown.class_id(), caught.class_id()) {
        (Some(derived), Some(base)) => {
            thrown.indirection_level() == caught.indirection_level() && graph.has_parent(derived, base)
        }
        _ => false,
    }
}

impl<'ast> Detailer<'ast> {
    /// Record that `ty` may be thrown from `scope`.
    pub(crate) fn raise(&mut self, scope: ScopeId, ty: Type) {
        let mut work = vec![(scope, ty)];
        while let Some((start, ty)) = work.pop() {
            let chain: Vec<ScopeId> = self.graph.scope_chain(start).collect();
            for current in chain {
                if !self.graph.scope_mut(current).add_possible_error(ty.clone()) {
                    break;
                }
                if self.graph.scope(current).is_try {
                    let caught = self
                        .try_blocks
                        .get(&current)
                        .is_some_and(|record| record.handles(&ty, &self.graph));
                    if caught {
                        trace!(scope = %current, "error caught");
                        break;
                    }
                    continue;
                }
                let Some(function) = self.graph.scope(current).function_owner() else {
                    continue;
                };
                let Some(entity) = self.graph.function_mut(function) else {
                    break;
                };
                if entity.throws {
                    for &site in self.call_sites.get(&function).into_iter().flatten() {
                        work.push((site, ty.clone()));
                    }
                } else {
                    let actions = entity.begin_throwing();
                    debug!(function = %self.item_name(function), "function began throwing");
                    self.run_actions(actions);
                }
                break;
            }
        }
    }

    /// Make errors thrown by `callee` surface at `call_scope`.
    pub(crate) fn link_throws(&mut self, callee: ItemId, call_scope: ScopeId) {
        let callee = self
            .graph
            .function(callee)
            .and_then(|f| f.optional_variant_parent)
            .unwrap_or(callee);
        let sites = self.call_sites.entry(callee).or_default();
        if !sites.contains(&call_scope) {
            sites.push(call_scope);
        }

        let Some(function) = self.graph.function_mut(callee) else {
            return;
        };
        if function.throws {
            let scope = function.scope;
            let errors = self.graph.scope(scope).possible_errors.clone();
            for error in errors {
                self.raise(call_scope, error);
            }
        } else if let Some(ready) = function
            .began_throwing
            .subscribe(DeferredAction::PropagateThrows { callee, call_scope })
        {
            self.run_actions(vec![ready]);
        }
    }

    pub(crate) fn run_actions(&mut self, actions: Vec<DeferredAction>) {
        for action in actions {
            match action {
                DeferredAction::PropagateThrows { callee, call_scope } => {
                    let errors = match self.graph.function(callee) {
                        Some(function) => self.graph.scope(function.scope).possible_errors.clone(),
                        None => continue,
                    };
                    for error in errors {
                        self.raise(call_scope, error);
                    }
                }
                DeferredAction::FinalizeCaptures { lambda } => self.finalize_captures(lambda),
            }
        }
    }

    pub(crate) fn detail_throw(&mut self, frame: Frame, stmt: &'ast ThrowStmt<'ast>, scope: ScopeId) -> Result<()> {
        let info = self.detail_expr(frame, stmt.value, scope)?;
        let ty = inferred_type(&info.ty);
        self.raise(scope, ty.clone());
        self.store(frame, stmt.id, DetailHandle::Throw { ty }, stmt.position)
    }

    /// Detail a `try` body and its catch clauses.
    ///
    /// Clause types are resolved first so throws inside the body can be
    /// matched against them as they are raised.
    pub(crate) fn detail_try_catch(
        &mut self,
        frame: Frame,
        stmt: &'ast TryCatchStmt<'ast>,
        scope: ScopeId,
    ) -> Result<()> {
        let try_scope = self.graph.new_scope(scope, ScopeOwner::Block);
        self.graph.scope_mut(try_scope).is_try = true;

        let mut clause_types = Vec::with_capacity(stmt.catches.len());
        for clause in stmt.catches {
            let ty = match &clause.ty {
                Some(written) => Some(self.resolve_type(frame, written, scope)?),
                None => None,
            };
            clause_types.push(ty);
        }
        let record = TryRecord {
            catches: clause_types.clone(),
        };
        self.try_blocks.insert(try_scope, record.clone());

        for inner in stmt.body.statements {
            self.detail_stmt(frame, inner, try_scope)?;
        }
        self.store(frame, stmt.body.id, DetailHandle::Block { scope: try_scope }, stmt.body.position)?;

        let owner = self.graph.enclosing_function(scope);
        let mut catches = Vec::with_capacity(stmt.catches.len());
        for (clause, ty) in stmt.catches.iter().zip(clause_types) {
            let catch_scope = self.graph.new_scope(scope, ScopeOwner::Block);
            let variable = match clause.variable {
                Some(name) => {
                    let caught = ty.clone().unwrap_or_else(Type::any);
                    Some(self.add_local(frame, name.name, caught, owner, catch_scope, name.position))
                }
                None => None,
            };
            for inner in clause.body.statements {
                self.detail_stmt(frame, inner, catch_scope)?;
            }
            self.store(frame, clause.body.id, DetailHandle::Block { scope: catch_scope }, clause.body.position)?;
            catches.push(CatchHandle {
                scope: catch_scope,
                variable,
                ty,
            });
        }

        let uncaught: Vec<Type> = self
            .graph
            .scope(try_scope)
            .possible_errors
            .iter()
            .filter(|error| !record.handles(error, &self.graph))
            .cloned()
            .collect();
        for error in &uncaught {
            self.raise(scope, error.clone());
        }

        let handle = TryCatchHandle {
            try_scope,
            catches,
            uncaught,
        };
        self.store(frame, stmt.id, DetailHandle::TryCatch(handle), stmt.position)
    }
}
