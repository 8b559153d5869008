//! Detail handles: what detailing learned about each AST node.
//!
//! Handles live in a [`HandleTable`] keyed by frame and node. Every module
//! and every generic instantiation gets its own [`FrameId`], so a generic
//! body detailed once per set of type arguments keeps one handle per
//! instantiation.

use std::fmt;

use rustc_hash::FxHashMap;

use tessera_core::{DetailingError, ItemId, ModuleId, NodeId, Position, ScopeId, Type};

use crate::overload::CallResolution;

/// One detailing context: a module body or a generic instantiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(u32);

impl FrameId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame_{}", self.0)
    }
}

/// Where a handle is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleKey {
    pub frame: FrameId,
    pub node: NodeId,
}

impl HandleKey {
    pub fn new(frame: FrameId, node: NodeId) -> Self {
        Self { frame, node }
    }
}

// ============================================================================
// Expression handles
// ============================================================================

/// A user cast applied to a value so it fits where it is used.
#[derive(Debug, Clone, PartialEq)]
pub struct ImplicitCast {
    /// The `from` or `to` cast function.
    pub function: ItemId,
    /// The type the value has after the cast.
    pub to: Type,
}

/// Facts shared by every expression handle.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionInfo {
    pub ty: Type,
    /// The expression names storage that can be assigned.
    pub is_lvalue: bool,
    pub implicit_cast: Option<ImplicitCast>,
}

impl ExpressionInfo {
    pub fn rvalue(ty: Type) -> Self {
        Self {
            ty,
            is_lvalue: false,
            implicit_cast: None,
        }
    }

    pub fn lvalue(ty: Type) -> Self {
        Self {
            ty,
            is_lvalue: true,
            implicit_cast: None,
        }
    }

    /// The type the consumer of the expression sees.
    pub fn effective_type(&self) -> &Type {
        match &self.implicit_cast {
            Some(cast) => &cast.to,
            None => &self.ty,
        }
    }
}

/// What a name or member access refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum NameMeaning {
    /// A variable or function value.
    Value,
    /// A class or bound type, usable as a constructor callee.
    Type(Type),
    Namespace(ItemId),
    /// A property backed by accessor functions.
    Property {
        getter: Option<ItemId>,
        setter: Option<ItemId>,
    },
}

/// Handle of a `Fetch` or `Accessor` node.
#[derive(Debug, Clone, PartialEq)]
pub struct NameHandle {
    pub info: ExpressionInfo,
    /// Everything the lookup found, nearest first.
    pub candidates: Vec<ItemId>,
    /// The item the node was narrowed to.
    pub target: Option<ItemId>,
    pub meaning: NameMeaning,
    /// Reached through the implicit `this` of a method.
    pub through_this: bool,
}

/// How a call expression was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Function,
    Method,
    Constructor { class: ItemId },
    SuperConstructor { class: ItemId },
    /// A class value called through its `operator()`.
    CallOperator,
    /// A native type name applied to one value.
    Conversion,
    /// The callee is `any`; nothing to check.
    Dynamic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallHandle {
    pub info: ExpressionInfo,
    pub kind: CallKind,
    pub callee: Option<ItemId>,
    pub resolution: Option<CallResolution>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewHandle {
    pub info: ExpressionInfo,
    pub class: Option<ItemId>,
    pub constructor: Option<ItemId>,
    pub resolution: Option<CallResolution>,
    pub persistent: bool,
}

/// Binary, unary and index expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorHandle {
    pub info: ExpressionInfo,
    /// The operator function, when a class operand overloads it.
    pub overload: Option<ItemId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentHandle {
    pub info: ExpressionInfo,
    pub overload: Option<ItemId>,
    /// Set accessor used to write a property.
    pub setter: Option<ItemId>,
    /// Type of the value after any compound operator.
    pub value_type: Type,
    /// The value fits the target.
    pub compatible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    /// The value already fits the target.
    Implicit,
    Native,
    /// Pointer to a different pointer type.
    Reinterpret,
    /// Base class to derived class through indirection.
    Downcast,
    User,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CastHandle {
    pub info: ExpressionInfo,
    pub kind: CastKind,
    pub via: Option<ItemId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LambdaHandle {
    pub info: ExpressionInfo,
    pub function: ItemId,
}

/// `await` and `yield`.
#[derive(Debug, Clone, PartialEq)]
pub struct SuspendHandle {
    pub info: ExpressionInfo,
    pub function: ItemId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SizeOfHandle {
    pub info: ExpressionInfo,
    pub measured: Type,
}

// ============================================================================
// Statement and declaration handles
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct VariableHandle {
    pub variable: ItemId,
    /// Default constructor run for a class value declared without initializer.
    pub constructor: Option<ItemId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangedForHandle {
    pub scope: ScopeId,
    pub variable: ItemId,
    pub next: ItemId,
    pub element: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchHandle {
    pub scope: ScopeId,
    pub variable: Option<ItemId>,
    /// `None` catches everything.
    pub ty: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TryCatchHandle {
    pub try_scope: ScopeId,
    pub catches: Vec<CatchHandle>,
    /// Errors no clause catches, passed on to the enclosing scope.
    pub uncaught: Vec<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionHandle {
    pub function: ItemId,
    pub variants: Vec<ItemId>,
    /// Parent default constructors run before a constructor body that does
    /// not call `super(...)` itself.
    pub implicit_super: Vec<ItemId>,
    pub is_template: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassHandle {
    pub class: ItemId,
    /// Constructors and destructor created by detailing.
    pub synthesized: Vec<ItemId>,
    pub is_template: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportHandle {
    pub module: ModuleId,
    /// Items created in the importing scope.
    pub bound: Vec<ItemId>,
}

/// Everything detailing recorded for one node.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailHandle {
    // === Expressions ===
    Literal(ExpressionInfo),
    Fetch(NameHandle),
    Accessor(NameHandle),
    Call(CallHandle),
    New(NewHandle),
    Operator(OperatorHandle),
    Assignment(AssignmentHandle),
    Conditional(ExpressionInfo),
    Cast(CastHandle),
    Lambda(LambdaHandle),
    This(ExpressionInfo),
    Super(ExpressionInfo),
    Await(SuspendHandle),
    Yield(SuspendHandle),
    SizeOf(SizeOfHandle),

    // === Statements ===
    /// Expression statements, `break` and `continue`.
    Statement { scope: ScopeId },
    Variable(VariableHandle),
    Block { scope: ScopeId },
    If { then_scope: ScopeId, else_scope: Option<ScopeId> },
    Loop { scope: ScopeId },
    RangedFor(RangedForHandle),
    Return { function: ItemId, expected: Type },
    Throw { ty: Type },
    TryCatch(TryCatchHandle),
    Delete { ty: Type, destructor: Option<ItemId> },

    // === Declarations ===
    Function(FunctionHandle),
    Class(ClassHandle),
    Field { variable: ItemId },
    Namespace { item: ItemId },
    Import(ImportHandle),
    Export { aliases: Vec<ItemId> },
    Using { alias: ItemId },
}

impl DetailHandle {
    /// The expression facts, for expression handles.
    pub fn info(&self) -> Option<&ExpressionInfo> {
        match self {
            DetailHandle::Literal(info)
            | DetailHandle::Conditional(info)
            | DetailHandle::This(info)
            | DetailHandle::Super(info) => Some(info),
            DetailHandle::Fetch(h) | DetailHandle::Accessor(h) => Some(&h.info),
            DetailHandle::Call(h) => Some(&h.info),
            DetailHandle::New(h) => Some(&h.info),
            DetailHandle::Operator(h) => Some(&h.info),
            DetailHandle::Assignment(h) => Some(&h.info),
            DetailHandle::Cast(h) => Some(&h.info),
            DetailHandle::Lambda(h) => Some(&h.info),
            DetailHandle::Await(h) | DetailHandle::Yield(h) => Some(&h.info),
            DetailHandle::SizeOf(h) => Some(&h.info),
            _ => None,
        }
    }

    pub fn info_mut(&mut self) -> Option<&mut ExpressionInfo> {
        match self {
            DetailHandle::Literal(info)
            | DetailHandle::Conditional(info)
            | DetailHandle::This(info)
            | DetailHandle::Super(info) => Some(info),
            DetailHandle::Fetch(h) | DetailHandle::Accessor(h) => Some(&mut h.info),
            DetailHandle::Call(h) => Some(&mut h.info),
            DetailHandle::New(h) => Some(&mut h.info),
            DetailHandle::Operator(h) => Some(&mut h.info),
            DetailHandle::Assignment(h) => Some(&mut h.info),
            DetailHandle::Cast(h) => Some(&mut h.info),
            DetailHandle::Lambda(h) => Some(&mut h.info),
            DetailHandle::Await(h) | DetailHandle::Yield(h) => Some(&mut h.info),
            DetailHandle::SizeOf(h) => Some(&mut h.info),
            _ => None,
        }
    }

    /// The name handle of a `Fetch` or `Accessor`.
    pub fn as_name(&self) -> Option<&NameHandle> {
        match self {
            DetailHandle::Fetch(h) | DetailHandle::Accessor(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_call(&self) -> Option<&CallHandle> {
        match self {
            DetailHandle::Call(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionHandle> {
        match self {
            DetailHandle::Function(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassHandle> {
        match self {
            DetailHandle::Class(h) => Some(h),
            _ => None,
        }
    }
}

/// Storage for every handle of a detailing session.
#[derive(Debug, Default)]
pub struct HandleTable {
    handles: FxHashMap<HandleKey, DetailHandle>,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the handle of a node. Each node is detailed once per frame.
    pub fn insert(
        &mut self,
        key: HandleKey,
        handle: DetailHandle,
        position: Position,
    ) -> Result<(), DetailingError> {
        if self.handles.contains_key(&key) {
            return Err(DetailingError::AlreadyDetailed { position });
        }
        self.handles.insert(key, handle);
        Ok(())
    }

    pub fn get(&self, frame: FrameId, node: NodeId) -> Option<&DetailHandle> {
        self.handles.get(&HandleKey::new(frame, node))
    }

    pub fn get_mut(&mut self, frame: FrameId, node: NodeId) -> Option<&mut DetailHandle> {
        self.handles.get_mut(&HandleKey::new(frame, node))
    }

    pub fn contains(&self, frame: FrameId, node: NodeId) -> bool {
        self.handles.contains_key(&HandleKey::new(frame, node))
    }

    /// The expression facts of a node, if it is a detailed expression.
    pub fn info(&self, frame: FrameId, node: NodeId) -> Option<&ExpressionInfo> {
        self.get(frame, node).and_then(DetailHandle::info)
    }

    /// Commit a `Fetch` or `Accessor` to one of its candidates.
    ///
    /// Returns false when the node is not a name handle.
    pub fn narrow(&mut self, frame: FrameId, node: NodeId, item: ItemId, ty: Type) -> bool {
        match self.get_mut(frame, node) {
            Some(DetailHandle::Fetch(h) | DetailHandle::Accessor(h)) => {
                h.target = Some(item);
                h.info.ty = ty;
                true
            }
            _ => false,
        }
    }

    /// Record a user cast on an expression node.
    pub fn set_implicit_cast(&mut self, frame: FrameId, node: NodeId, cast: ImplicitCast) -> bool {
        match self.get_mut(frame, node).and_then(DetailHandle::info_mut) {
            Some(info) => {
                info.implicit_cast = Some(cast);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HandleKey, &DetailHandle)> {
        self.handles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetch(ty: Type) -> DetailHandle {
        DetailHandle::Fetch(NameHandle {
            info: ExpressionInfo::lvalue(ty),
            candidates: vec![ItemId::new(1), ItemId::new(2)],
            target: None,
            meaning: NameMeaning::Value,
            through_this: false,
        })
    }

    #[test]
    fn double_insert_is_rejected() {
        let mut table = HandleTable::new();
        let key = HandleKey::new(FrameId::new(0), NodeId::fresh());
        let position = Position::new(3, 7);
        table
            .insert(key, DetailHandle::Literal(ExpressionInfo::rvalue(Type::int())), position)
            .unwrap();
        let err = table
            .insert(key, DetailHandle::Literal(ExpressionInfo::rvalue(Type::int())), position)
            .unwrap_err();
        assert_eq!(err, DetailingError::AlreadyDetailed { position });
    }

    #[test]
    fn frames_separate_handles() {
        let mut table = HandleTable::new();
        let node = NodeId::fresh();
        let position = Position::default();
        table
            .insert(HandleKey::new(FrameId::new(0), node), fetch(Type::int()), position)
            .unwrap();
        table
            .insert(HandleKey::new(FrameId::new(1), node), fetch(Type::bool()), position)
            .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.info(FrameId::new(1), node).map(|i| &i.ty), Some(&Type::bool()));
    }

    #[test]
    fn narrowing_commits_a_candidate() {
        let mut table = HandleTable::new();
        let frame = FrameId::new(0);
        let node = NodeId::fresh();
        table
            .insert(HandleKey::new(frame, node), fetch(Type::any()), Position::default())
            .unwrap();
        assert!(table.narrow(frame, node, ItemId::new(2), Type::int()));
        let name = table.get(frame, node).and_then(DetailHandle::as_name).unwrap();
        assert_eq!(name.target, Some(ItemId::new(2)));
        assert_eq!(name.info.ty, Type::int());
    }

    #[test]
    fn implicit_cast_changes_effective_type() {
        let mut table = HandleTable::new();
        let frame = FrameId::new(0);
        let node = NodeId::fresh();
        table
            .insert(
                HandleKey::new(frame, node),
                DetailHandle::Literal(ExpressionInfo::rvalue(Type::int())),
                Position::default(),
            )
            .unwrap();
        let cast = ImplicitCast {
            function: ItemId::new(9),
            to: Type::bool(),
        };
        assert!(table.set_implicit_cast(frame, node, cast));
        let info = table.info(frame, node).unwrap();
        assert_eq!(info.ty, Type::int());
        assert_eq!(info.effective_type(), &Type::bool());
    }
}
