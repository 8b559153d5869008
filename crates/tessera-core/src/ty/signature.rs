//! Function signatures used as type discriminants.

use std::hash::{Hash, Hasher};

use super::Type;

/// One parameter of a [`FunctionSignature`].
///
/// Equality and hashing look only at the type and the variadic flag; names and
/// ids are labels and do not make two signatures distinct types.
#[derive(Debug, Clone)]
pub struct SignatureParameter {
    pub name: String,
    pub ty: Type,
    pub is_variadic: bool,
    /// Position-independent id assigned when the owning function is declared.
    pub id: u32,
}

impl SignatureParameter {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            is_variadic: false,
            id: 0,
        }
    }

    pub fn variadic(name: impl Into<String>, ty: Type) -> Self {
        Self {
            is_variadic: true,
            ..Self::new(name, ty)
        }
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.id = id;
        self
    }
}

impl PartialEq for SignatureParameter {
    fn eq(&self, other: &Self) -> bool {
        self.is_variadic == other.is_variadic && self.ty == other.ty
    }
}

impl Eq for SignatureParameter {}

impl Hash for SignatureParameter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ty.hash(state);
        self.is_variadic.hash(state);
    }
}

/// A callable type: ordered parameters and a return type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionSignature {
    pub parameters: Vec<SignatureParameter>,
    pub return_type: Type,
}

impl FunctionSignature {
    pub fn new(parameters: Vec<SignatureParameter>, return_type: Type) -> Self {
        Self {
            parameters,
            return_type,
        }
    }

    /// Whether the last parameter packs any number of trailing arguments.
    pub fn is_variadic(&self) -> bool {
        self.parameters.last().is_some_and(|p| p.is_variadic)
    }

    /// Number of parameters that must be supplied.
    pub fn fixed_arity(&self) -> usize {
        if self.is_variadic() {
            self.parameters.len() - 1
        } else {
            self.parameters.len()
        }
    }

    /// Whether a call with `count` arguments can bind to this signature.
    pub fn accepts_count(&self, count: usize) -> bool {
        if self.is_variadic() {
            count >= self.fixed_arity()
        } else {
            count == self.parameters.len()
        }
    }

    /// Index of the parameter with the given name.
    pub fn parameter_index(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NativeType;

    fn int() -> Type {
        Type::native(NativeType::Integer)
    }

    #[test]
    fn parameter_names_do_not_affect_equality() {
        let a = FunctionSignature::new(vec![SignatureParameter::new("x", int())], int());
        let b = FunctionSignature::new(vec![SignatureParameter::new("y", int()).with_id(3)], int());
        assert_eq!(a, b);
    }

    #[test]
    fn variadic_arity() {
        let sig = FunctionSignature::new(
            vec![
                SignatureParameter::new("fmt", int()),
                SignatureParameter::variadic("rest", int()),
            ],
            Type::void(),
        );
        assert!(sig.is_variadic());
        assert_eq!(sig.fixed_arity(), 1);
        assert!(sig.accepts_count(1));
        assert!(sig.accepts_count(4));
        assert!(!sig.accepts_count(0));
    }

    #[test]
    fn fixed_arity_requires_exact_count() {
        let sig = FunctionSignature::new(
            vec![SignatureParameter::new("a", int()), SignatureParameter::new("b", int())],
            int(),
        );
        assert!(sig.accepts_count(2));
        assert!(!sig.accepts_count(1));
        assert!(!sig.accepts_count(3));
        assert_eq!(sig.parameter_index("b"), Some(1));
        assert_eq!(sig.parameter_index("c"), None);
    }
}
