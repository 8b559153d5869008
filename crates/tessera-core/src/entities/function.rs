use bitflags::bitflags;

use crate::events::OneShot;
use crate::{
    FunctionSignature, ItemId, NodeId, Operator, Orientation, ScopeId, SignatureParameter, Type,
};

bitflags! {
    /// Role flags of a [`Function`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FunctionFlags: u16 {
        const METHOD = 1 << 0;
        const ACCESSOR = 1 << 1;
        const CONSTRUCTOR = 1 << 2;
        const DESTRUCTOR = 1 << 3;
        const COPY_CONSTRUCTOR = 1 << 4;
        const LAMBDA = 1 << 5;
        const OPERATOR = 1 << 6;
        const GENERATOR = 1 << 7;
        const ASYNC = 1 << 8;
        const VIRTUAL = 1 << 9;
        const CAST = 1 << 10;
        /// Declared without a body; implemented outside the language.
        const EXTERNAL = 1 << 11;
        /// Produced by the detailer rather than written in source.
        const SYNTHESIZED = 1 << 12;
    }
}

/// Getter or setter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorKind {
    Get,
    Set,
}

/// A function, method, constructor, operator, cast, accessor or lambda.
#[derive(Debug, Clone)]
pub struct Function {
    pub parameters: Vec<SignatureParameter>,
    /// Variables for each parameter, in order, living in `scope`.
    pub parameter_variables: Vec<ItemId>,
    pub return_type: Type,
    /// The function's own scope. Parameters are declared here before the body.
    pub scope: ScopeId,
    pub flags: FunctionFlags,
    pub accessor: Option<AccessorKind>,
    pub operator: Option<Operator>,
    pub orientation: Orientation,

    // === Generators and coroutines ===
    /// Type accepted by each resumption of a generator.
    pub generator_parameter_type: Option<Type>,
    /// Type produced by each `yield`.
    pub generator_return_type: Option<Type>,
    /// Value type eventually produced by an async function.
    pub coroutine_return_type: Option<Type>,

    // === Optional variants ===
    /// The canonical function this variant was generated from.
    pub optional_variant_parent: Option<ItemId>,
    /// Variants generated from this function, shortest first.
    pub optional_variants: Vec<ItemId>,
    /// Default expressions a variant supplies, by parameter index of the parent.
    pub supplied_defaults: Vec<(usize, NodeId)>,

    // === Lambdas ===
    /// Outer variables referenced from a lambda body.
    pub referenced_variables: Vec<ItemId>,
    /// Captured variables, fixed once the enclosing function is done.
    pub copied_variables: Vec<ItemId>,
    /// Hoisted item holding the captured variables.
    pub capture_holder: Option<ItemId>,

    // === Throwing ===
    pub throws: bool,
    pub began_throwing: OneShot,
    pub done_detailing: OneShot,

    // === Membership and generics ===
    /// The class type of `this` for methods.
    pub parent_class_type: Option<Type>,
    pub generic_arguments: Vec<Type>,
    /// The generic declaration this function was instantiated from.
    pub generic_origin: Option<ItemId>,
    /// Body has been detailed (or there is no body to detail).
    pub is_detailed: bool,
}

impl Function {
    pub fn new(scope: ScopeId, return_type: Type) -> Self {
        Self {
            parameters: Vec::new(),
            parameter_variables: Vec::new(),
            return_type,
            scope,
            flags: FunctionFlags::empty(),
            accessor: None,
            operator: None,
            orientation: Orientation::Left,
            generator_parameter_type: None,
            generator_return_type: None,
            coroutine_return_type: None,
            optional_variant_parent: None,
            optional_variants: Vec::new(),
            supplied_defaults: Vec::new(),
            referenced_variables: Vec::new(),
            copied_variables: Vec::new(),
            capture_holder: None,
            throws: false,
            began_throwing: OneShot::new(),
            done_detailing: OneShot::new(),
            parent_class_type: None,
            generic_arguments: Vec::new(),
            generic_origin: None,
            is_detailed: false,
        }
    }

    pub fn with_flags(mut self, flags: FunctionFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<SignatureParameter>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn is(&self, flags: FunctionFlags) -> bool {
        self.flags.contains(flags)
    }

    pub fn is_method(&self) -> bool {
        self.is(FunctionFlags::METHOD)
    }

    pub fn is_constructor(&self) -> bool {
        self.is(FunctionFlags::CONSTRUCTOR)
    }

    pub fn is_lambda(&self) -> bool {
        self.is(FunctionFlags::LAMBDA)
    }

    pub fn is_generator(&self) -> bool {
        self.is(FunctionFlags::GENERATOR)
    }

    pub fn is_async(&self) -> bool {
        self.is(FunctionFlags::ASYNC)
    }

    pub fn signature(&self) -> FunctionSignature {
        FunctionSignature::new(self.parameters.clone(), self.return_type.clone())
    }

    /// The function's type as a value.
    pub fn ty(&self) -> Type {
        Type::function(self.signature())
    }

    /// Mark the function as throwing. Returns the actions waiting on that,
    /// which are empty on every call after the first.
    pub fn begin_throwing(&mut self) -> Vec<crate::events::DeferredAction> {
        self.throws = true;
        self.began_throwing.fire()
    }
}
