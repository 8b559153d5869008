//! Post-detailing validation.
//!
//! [`Validator`] re-walks a detailed tree together with its handles and
//! checks the structural rules detailing assumed: every node has a handle,
//! non-void functions return on every path, conditions are boolean,
//! assignments write compatible values to assignable targets, and a few
//! placement rules. It never changes the tree or the graph.
//!
//! Generic declarations are validated once per instance, under the frame
//! that instance's handles were stored in.
//!
//! # Example
//!
//! ```ignore
//! let output = detailer.into_parts();
//! let mut validator = Validator::from_output(&output);
//! for root in &output.roots {
//!     validator.validate_module(root)?;
//! }
//! ```

use rustc_hash::FxHashMap;
use tracing::debug;

use tessera_core::{NodeId, Position, ValidationError, ValidationErrorKind};
use tessera_registry::EntityGraph;
use tessera_syntax::{
    Block, ClassDefinition, ClassMember, Expr, FunctionDefinition, FunctionRole, Parameter, Stmt,
};

use crate::detailer::{DetailedRoot, DetailerOutput, is_truthy};
use crate::handles::{DetailHandle, FrameId, HandleTable};

type Result<T> = std::result::Result<T, ValidationError>;

/// Checks detailed trees. One validator may check every module of a
/// session.
pub struct Validator<'a> {
    graph: &'a EntityGraph,
    handles: &'a HandleTable,
    instance_frames: &'a FxHashMap<NodeId, Vec<FrameId>>,
    /// Enclosing nodes, for error context.
    stack: Vec<String>,
    /// Loops enclosing the current statement within its function.
    loops: u32,
}

impl<'a> Validator<'a> {
    pub fn new(
        graph: &'a EntityGraph,
        handles: &'a HandleTable,
        instance_frames: &'a FxHashMap<NodeId, Vec<FrameId>>,
    ) -> Self {
        Self {
            graph,
            handles,
            instance_frames,
            stack: Vec::new(),
            loops: 0,
        }
    }

    pub fn from_output(output: &'a DetailerOutput<'_>) -> Self {
        Self::new(&output.graph, &output.handles, &output.instance_frames)
    }

    /// Validate one detailed module. Stops at the first violation.
    #[tracing::instrument(level = "debug", skip_all, fields(module = %root.module))]
    pub fn validate_module(&mut self, root: &DetailedRoot<'_>) -> Result<()> {
        self.stack.clear();
        self.loops = 0;
        self.statements(root.frame, root.root.statements)?;
        debug!(module = %self.graph.module(root.module).name, "module validated");
        Ok(())
    }

    fn error(&self, kind: ValidationErrorKind, position: Position, message: impl Into<String>) -> ValidationError {
        ValidationError::new(kind, position, message).with_context(self.stack.clone())
    }

    fn handle(&self, frame: FrameId, node: NodeId, position: Position, what: &str) -> Result<&'a DetailHandle> {
        self.handles
            .get(frame, node)
            .ok_or_else(|| self.error(ValidationErrorKind::MissingNode, position, format!("{what} was not detailed")))
    }

    fn within<T>(&mut self, label: String, check: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.stack.push(label);
        let result = check(self);
        self.stack.pop();
        result
    }

    // ==========================================================================
    // Statements
    // ==========================================================================

    fn statements(&mut self, frame: FrameId, statements: &[Stmt<'_>]) -> Result<()> {
        for stmt in statements {
            self.stmt(frame, stmt)?;
        }
        Ok(())
    }

    fn block(&mut self, frame: FrameId, block: &Block<'_>) -> Result<()> {
        self.handle(frame, block.id, block.position, "block")?;
        self.statements(frame, block.statements)
    }

    fn stmt(&mut self, frame: FrameId, stmt: &Stmt<'_>) -> Result<()> {
        match *stmt {
            Stmt::Function(def) => return self.function(frame, def),
            Stmt::Class(def) => return self.class(frame, def),
            Stmt::Block(block) => return self.block(frame, block),
            _ => {}
        }
        let handle = self.handle(frame, stmt.id(), stmt.position(), stmt.describe())?;
        match *stmt {
            Stmt::Expression(s) => self.expr(frame, s.expr),
            Stmt::VariableDeclaration(decl) => match decl.initializer {
                Some(initializer) => self.expr(frame, initializer),
                None => Ok(()),
            },
            Stmt::Return(ret) => match ret.value {
                Some(value) => self.expr(frame, value),
                None => Ok(()),
            },
            Stmt::If(s) => {
                self.condition(frame, s.condition)?;
                self.stmt(frame, s.then_branch)?;
                match s.else_branch {
                    Some(branch) => self.stmt(frame, branch),
                    None => Ok(()),
                }
            }
            Stmt::While(s) => {
                self.condition(frame, s.condition)?;
                self.loop_body(frame, s.body)
            }
            Stmt::For(s) => {
                if let Some(init) = s.init {
                    self.stmt(frame, init)?;
                }
                if let Some(condition) = s.condition {
                    self.condition(frame, condition)?;
                }
                if let Some(update) = s.update {
                    self.expr(frame, update)?;
                }
                self.loop_body(frame, s.body)
            }
            Stmt::RangedFor(s) => {
                self.expr(frame, s.iterable)?;
                self.loop_body(frame, s.body)
            }
            Stmt::Break(jump) | Stmt::Continue(jump) => {
                if self.loops == 0 {
                    return Err(self.error(
                        ValidationErrorKind::OutsideLoop,
                        jump.position,
                        format!("'{}' outside a loop", stmt.describe()),
                    ));
                }
                Ok(())
            }
            Stmt::Throw(s) => self.expr(frame, s.value),
            Stmt::TryCatch(s) => {
                if s.catches.is_empty() {
                    return Err(self.error(
                        ValidationErrorKind::EmptyTryCatch,
                        s.position,
                        "try block has no catch clause",
                    ));
                }
                self.block(frame, s.body)?;
                for clause in s.catches {
                    self.block(frame, clause.body)?;
                }
                Ok(())
            }
            Stmt::Delete(s) => {
                self.expr(frame, s.value)?;
                if let DetailHandle::Delete { ty, .. } = handle
                    && s.persistent
                    && !ty.without_outer_references().is_pointer()
                {
                    return Err(self.error(
                        ValidationErrorKind::PersistentDelete,
                        s.position,
                        format!("'delete persistent' needs a pointer, found '{}'", self.graph.type_name(ty)),
                    ));
                }
                Ok(())
            }
            Stmt::Namespace(ns) => {
                self.within(format!("namespace {}", ns.name.name), |this| this.statements(frame, ns.statements))
            }
            Stmt::Import(_) | Stmt::Export(_) | Stmt::Using(_) => Ok(()),
            Stmt::Function(_) | Stmt::Class(_) | Stmt::Block(_) => Ok(()),
        }
    }

    fn loop_body(&mut self, frame: FrameId, body: &Stmt<'_>) -> Result<()> {
        self.loops += 1;
        let result = self.stmt(frame, body);
        self.loops -= 1;
        result
    }

    fn condition(&mut self, frame: FrameId, condition: &Expr<'_>) -> Result<()> {
        self.expr(frame, condition)?;
        let Some(info) = self.handles.info(frame, condition.id()) else {
            return Err(self.error(ValidationErrorKind::MissingNode, condition.position(), "condition has no type"));
        };
        let ty = info.effective_type();
        if is_truthy(ty) {
            Ok(())
        } else {
            Err(self.error(
                ValidationErrorKind::ConditionNotBool,
                condition.position(),
                format!("condition of type '{}' is not convertible to 'bool'", self.graph.type_name(ty)),
            ))
        }
    }

    // ==========================================================================
    // Declarations
    // ==========================================================================

    fn function(&mut self, frame: FrameId, def: &FunctionDefinition<'_>) -> Result<()> {
        let handle = self.handle(frame, def.id, def.position, "function")?;
        let Some(handle) = handle.as_function() else {
            return Err(self.error(ValidationErrorKind::MissingNode, def.position, "function has no function handle"));
        };
        if handle.is_template {
            return self.instances(def.id, |this, instance| this.function(instance, def));
        }
        let function = handle.function;
        self.within(format!("function {}", def.name.name), |this| {
            this.parameters(def.parameters)?;
            for parameter in def.parameters {
                if let Some(default) = parameter.default {
                    this.expr(frame, default)?;
                }
            }
            let Some(body) = def.body else {
                return Ok(());
            };
            let loops = std::mem::take(&mut this.loops);
            let result = this.block(frame, body);
            this.loops = loops;
            result?;

            let returns_value = this.graph.function(function).is_some_and(|f| {
                !f.return_type.is_void() && !f.is_constructor() && !f.is_generator()
            });
            if returns_value
                && !matches!(def.role, FunctionRole::Constructor | FunctionRole::Destructor)
                && !always_exits(body.statements)
            {
                return Err(this.error(
                    ValidationErrorKind::MissingReturn,
                    def.position,
                    format!("not all paths of '{}' return a value", def.name.name),
                ));
            }
            Ok(())
        })
    }

    fn parameters(&self, parameters: &[Parameter<'_>]) -> Result<()> {
        let last = parameters.len().saturating_sub(1);
        match parameters.iter().enumerate().find(|(index, p)| p.is_variadic && *index != last) {
            Some((_, parameter)) => Err(self.error(
                ValidationErrorKind::VariadicPosition,
                parameter.position,
                format!("variadic parameter '{}' must be last", parameter.name.name),
            )),
            None => Ok(()),
        }
    }

    fn class(&mut self, frame: FrameId, def: &ClassDefinition<'_>) -> Result<()> {
        let handle = self.handle(frame, def.id, def.position, "class")?;
        let Some(handle) = handle.as_class() else {
            return Err(self.error(ValidationErrorKind::MissingNode, def.position, "class has no class handle"));
        };
        if handle.is_template {
            return self.instances(def.id, |this, instance| this.class(instance, def));
        }
        self.within(format!("class {}", def.name.name), |this| {
            for member in def.members {
                match *member {
                    ClassMember::Field(field) => {
                        this.handle(frame, field.id, field.position, "field")?;
                        if let Some(initializer) = field.initializer {
                            this.expr(frame, initializer)?;
                        }
                    }
                    ClassMember::Function(function) => this.function(frame, function)?,
                }
            }
            Ok(())
        })
    }

    /// Run `check` under the frame of every instance of a generic
    /// declaration.
    fn instances(&mut self, node: NodeId, mut check: impl FnMut(&mut Self, FrameId) -> Result<()>) -> Result<()> {
        let frames = self.instance_frames.get(&node).map(Vec::as_slice).unwrap_or_default();
        for &frame in frames {
            check(self, frame)?;
        }
        Ok(())
    }

    // ==========================================================================
    // Expressions
    // ==========================================================================

    fn expr(&mut self, frame: FrameId, expr: &Expr<'_>) -> Result<()> {
        let handle = self.handle(frame, expr.id(), expr.position(), expr.describe())?;
        match *expr {
            Expr::Literal(_) | Expr::Fetch(_) | Expr::This(_) | Expr::Super(_) | Expr::SizeOf(_) => Ok(()),
            Expr::Accessor(e) => self.expr(frame, e.object),
            Expr::Call(e) => {
                self.expr(frame, e.callee)?;
                for arg in e.args {
                    self.expr(frame, arg.value)?;
                }
                Ok(())
            }
            Expr::New(e) => {
                for arg in e.args {
                    self.expr(frame, arg.value)?;
                }
                Ok(())
            }
            Expr::Binary(e) => {
                self.expr(frame, e.left)?;
                self.expr(frame, e.right)
            }
            Expr::Unary(e) => self.expr(frame, e.operand),
            Expr::Assignment(e) => {
                self.expr(frame, e.target)?;
                self.expr(frame, e.value)?;
                let DetailHandle::Assignment(assignment) = handle else {
                    return Err(self.error(ValidationErrorKind::MissingNode, e.position, "assignment has no handle"));
                };
                if assignment.setter.is_none() {
                    let assignable = self
                        .handles
                        .info(frame, e.target.id())
                        .is_some_and(|info| info.is_lvalue && !info.ty.without_outer_references().is_constant());
                    if !assignable {
                        return Err(self.error(
                            ValidationErrorKind::NotAssignable,
                            e.target.position(),
                            "assignment target is not a mutable lvalue",
                        ));
                    }
                }
                if !assignment.compatible {
                    return Err(self.error(
                        ValidationErrorKind::TypeMismatch,
                        e.value.position(),
                        format!(
                            "cannot assign '{}' to '{}'",
                            self.graph.type_name(&assignment.value_type),
                            self.graph.type_name(&assignment.info.ty)
                        ),
                    ));
                }
                Ok(())
            }
            Expr::Conditional(e) => {
                self.condition(frame, e.condition)?;
                self.expr(frame, e.then_expr)?;
                self.expr(frame, e.else_expr)
            }
            Expr::Cast(e) => self.expr(frame, e.value),
            Expr::Index(e) => {
                self.expr(frame, e.object)?;
                self.expr(frame, e.index)
            }
            Expr::Lambda(e) => {
                let DetailHandle::Lambda(lambda) = handle else {
                    return Err(self.error(ValidationErrorKind::MissingNode, e.position, "lambda has no handle"));
                };
                let function = lambda.function;
                self.within("lambda".to_string(), |this| {
                    this.parameters(e.parameters)?;
                    let loops = std::mem::take(&mut this.loops);
                    let result = this.block(frame, e.body);
                    this.loops = loops;
                    result?;
                    let returns_value = this.graph.function(function).is_some_and(|f| !f.return_type.is_void());
                    if returns_value && !always_exits(e.body.statements) {
                        return Err(this.error(
                            ValidationErrorKind::MissingReturn,
                            e.position,
                            "not all paths of the lambda return a value",
                        ));
                    }
                    Ok(())
                })
            }
            Expr::Await(e) => self.expr(frame, e.value),
            Expr::Yield(e) => match e.value {
                Some(value) => self.expr(frame, value),
                None => Ok(()),
            },
        }
    }
}

/// Whether control never falls off the end of `statements`.
fn always_exits(statements: &[Stmt<'_>]) -> bool {
    statements.iter().any(stmt_exits)
}

fn stmt_exits(stmt: &Stmt<'_>) -> bool {
    match *stmt {
        Stmt::Return(_) | Stmt::Throw(_) => true,
        Stmt::Block(block) => always_exits(block.statements),
        Stmt::If(s) => s.else_branch.is_some_and(stmt_exits) && stmt_exits(s.then_branch),
        Stmt::While(s) => s.is_do_while && stmt_exits(s.body),
        Stmt::TryCatch(s) => always_exits(s.body.statements) && s.catches.iter().all(|c| always_exits(c.body.statements)),
        _ => false,
    }
}
