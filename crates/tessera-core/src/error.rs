//! Error types for every phase of the front end.
//!
//! ## Error Hierarchy
//!
//! ```text
//! TesseraError (top-level wrapper)
//! ├── LexError        - tokenization errors (produced upstream)
//! ├── ParseError      - syntax errors (produced upstream)
//! ├── DetailingError  - name resolution, typing, overloads, generics
//! └── ValidationError - post-detailing structural checks
//! ```
//!
//! Every error carries the [`Position`] of the offending node and renders as
//! `at {position}: ...` so that drivers can print them unchanged.

use std::fmt;

use thiserror::Error;

use crate::Position;

// ============================================================================
// Lexer Errors
// ============================================================================

/// Errors raised while turning source text into tokens.
///
/// The lexer lives outside this workspace; the type exists so that drivers can
/// funnel every phase into [`TesseraError`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("at {position}: unexpected character '{ch}'")]
    UnexpectedChar { ch: char, position: Position },

    #[error("at {position}: unterminated string")]
    UnterminatedString { position: Position },

    #[error("at {position}: invalid number: {detail}")]
    InvalidNumber { detail: String, position: Position },
}

impl LexError {
    /// Get the position where this error occurred.
    pub fn position(&self) -> Position {
        match self {
            LexError::UnexpectedChar { position, .. }
            | LexError::UnterminatedString { position }
            | LexError::InvalidNumber { position, .. } => *position,
        }
    }
}

// ============================================================================
// Parse Errors
// ============================================================================

/// A syntax error reported by the upstream parser.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("at {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: Position,
}

impl ParseError {
    pub fn new(position: Position, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }
}

// ============================================================================
// Detailing Errors
// ============================================================================

/// Errors raised while resolving names, types and calls.
///
/// Detailing is fail-fast: the first error aborts the module being detailed
/// unless the caller asked for error collection.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetailingError {
    /// A name did not resolve to anything visible from the lookup scope.
    #[error("at {position}: no target found for '{name}'")]
    NoTargetFound { name: String, position: Position },

    /// A name resolved, but to something the origin scope may not see.
    #[error("at {position}: '{name}' is not visible from here")]
    NotVisible { name: String, position: Position },

    /// No candidate accepted the supplied arguments.
    ///
    /// `arguments` lists each argument's candidate types joined by `" | "`;
    /// `candidates` lists every visible signature, one per line, or
    /// `**none**` when nothing was visible.
    #[error(
        "at {position}: no matching call to '{name}' for arguments ({arguments})\ncandidates:\n{candidates}"
    )]
    NoMatchingCall {
        name: String,
        arguments: String,
        candidates: String,
        position: Position,
    },

    /// More than one candidate matched and none dominated the others.
    #[error("at {position}: ambiguous call to '{name}' for arguments ({arguments})\ncandidates:\n{candidates}")]
    AmbiguousCall {
        name: String,
        arguments: String,
        candidates: String,
        position: Position,
    },

    /// A value was used where an incompatible type was required.
    #[error("at {position}: expected '{expected}', found '{found}'")]
    TypeMismatch {
        expected: String,
        found: String,
        position: Position,
    },

    /// An explicit cast between types with no conversion path.
    #[error("at {position}: cannot cast '{from}' to '{to}'")]
    InvalidCast {
        from: String,
        to: String,
        position: Position,
    },

    /// An operator has no native meaning and no overload for its operands.
    #[error("at {position}: no operator '{operator}' for {operands}")]
    NoOperator {
        operator: String,
        operands: String,
        position: Position,
    },

    /// A generic was given the wrong number of type arguments.
    #[error("at {position}: '{name}' expects {expected} type argument(s), got {got}")]
    GenericArity {
        name: String,
        expected: usize,
        got: usize,
        position: Position,
    },

    /// Generic arguments could not be inferred from a call.
    #[error("at {position}: cannot infer type argument '{parameter}' of '{name}'")]
    CannotInfer {
        name: String,
        parameter: String,
        position: Position,
    },

    /// A default constructor was required but cannot be synthesised.
    #[error("at {position}: class '{class}' has no default constructor: {reason}")]
    NoDefaultConstructor {
        class: String,
        reason: String,
        position: Position,
    },

    /// A ranged-for target lacks a usable `next()` method.
    #[error("at {position}: '{ty}' is not iterable: no 'next()' returning an optional")]
    MissingIterator { ty: String, position: Position },

    /// A construct appeared outside the context it requires.
    #[error("at {position}: '{construct}' is only valid {requirement}")]
    InvalidContext {
        construct: String,
        requirement: String,
        position: Position,
    },

    /// A name was declared twice where redeclaration is not allowed.
    #[error("at {position}: duplicate definition '{name}'")]
    DuplicateDefinition { name: String, position: Position },

    /// Bitfield members do not fit in the underlying type.
    #[error("at {position}: bitfield '{class}' needs {bits} bits but '{underlying}' holds {capacity}")]
    BitfieldOverflow {
        class: String,
        underlying: String,
        bits: u32,
        capacity: u32,
        position: Position,
    },

    /// A module imports itself, directly or transitively.
    #[error("at {position}: circular import of '{path}'")]
    CircularImport { path: String, position: Position },

    /// The module resolver could not satisfy an import.
    #[error("at {position}: cannot resolve module '{request}': {reason}")]
    ModuleNotFound {
        request: String,
        reason: String,
        position: Position,
    },

    /// A node was detailed twice within the same frame.
    #[error("at {position}: node already detailed")]
    AlreadyDetailed { position: Position },

    /// An attribute callback rejected its node.
    #[error("at {position}: attribute '{name}': {message}")]
    Attribute {
        name: String,
        message: String,
        position: Position,
    },

    /// Any other semantic error.
    #[error("at {position}: {message}")]
    Other { message: String, position: Position },

    /// An engine invariant was broken.
    #[error("internal detailing error: {message}")]
    Internal { message: String },
}

impl DetailingError {
    /// Get the position where this error occurred.
    pub fn position(&self) -> Position {
        match self {
            DetailingError::NoTargetFound { position, .. }
            | DetailingError::NotVisible { position, .. }
            | DetailingError::NoMatchingCall { position, .. }
            | DetailingError::AmbiguousCall { position, .. }
            | DetailingError::TypeMismatch { position, .. }
            | DetailingError::InvalidCast { position, .. }
            | DetailingError::NoOperator { position, .. }
            | DetailingError::GenericArity { position, .. }
            | DetailingError::CannotInfer { position, .. }
            | DetailingError::NoDefaultConstructor { position, .. }
            | DetailingError::MissingIterator { position, .. }
            | DetailingError::InvalidContext { position, .. }
            | DetailingError::DuplicateDefinition { position, .. }
            | DetailingError::BitfieldOverflow { position, .. }
            | DetailingError::CircularImport { position, .. }
            | DetailingError::ModuleNotFound { position, .. }
            | DetailingError::AlreadyDetailed { position }
            | DetailingError::Attribute { position, .. }
            | DetailingError::Other { position, .. } => *position,
            DetailingError::Internal { .. } => Position::default(),
        }
    }

    /// Shorthand for [`DetailingError::Other`].
    pub fn other(position: Position, message: impl Into<String>) -> Self {
        DetailingError::Other {
            message: message.into(),
            position,
        }
    }

    /// Shorthand for [`DetailingError::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        DetailingError::Internal {
            message: message.into(),
        }
    }
}

// ============================================================================
// Validation Errors
// ============================================================================

/// Categories of validation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorKind {
    MissingNode,
    MissingReturn,
    ConditionNotBool,
    NotAssignable,
    TypeMismatch,
    EmptyTryCatch,
    OutsideLoop,
    PersistentDelete,
    VariadicPosition,
}

impl ValidationErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationErrorKind::MissingNode => "missing node",
            ValidationErrorKind::MissingReturn => "missing return",
            ValidationErrorKind::ConditionNotBool => "non-boolean condition",
            ValidationErrorKind::NotAssignable => "not assignable",
            ValidationErrorKind::TypeMismatch => "type mismatch",
            ValidationErrorKind::EmptyTryCatch => "try without catch",
            ValidationErrorKind::OutsideLoop => "outside loop",
            ValidationErrorKind::PersistentDelete => "invalid persistent delete",
            ValidationErrorKind::VariadicPosition => "misplaced variadic parameter",
        }
    }
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structural invariant violated by an already-detailed tree.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} at {position}: {message}{}", context_suffix(.context))]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub message: String,
    pub position: Position,
    /// Enclosing nodes, outermost first, at the time of the failure.
    pub context: Vec<String>,
}

fn context_suffix(context: &[String]) -> String {
    if context.is_empty() {
        String::new()
    } else {
        format!(" (in {})", context.join(" > "))
    }
}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, position: Position, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            position,
            context: Vec::new(),
        }
    }

    /// Attach the enclosing-node trail.
    pub fn with_context(mut self, context: Vec<String>) -> Self {
        self.context = context;
        self
    }

    pub fn position(&self) -> Position {
        self.position
    }
}

// ============================================================================
// Unified Error
// ============================================================================

/// The unified error type for the whole front end.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TesseraError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Detailing(#[from] DetailingError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl TesseraError {
    /// Get the position where this error occurred.
    pub fn position(&self) -> Position {
        match self {
            TesseraError::Lex(e) => e.position(),
            TesseraError::Parse(e) => e.position(),
            TesseraError::Detailing(e) => e.position(),
            TesseraError::Validation(e) => e.position(),
        }
    }

    pub fn is_detailing(&self) -> bool {
        matches!(self, TesseraError::Detailing(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, TesseraError::Validation(_))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_target_display() {
        let err = DetailingError::NoTargetFound {
            name: "foo".to_string(),
            position: Position::new(3, 7),
        };
        assert_eq!(format!("{err}"), "at 3:7: no target found for 'foo'");
        assert_eq!(err.position(), Position::new(3, 7));
    }

    #[test]
    fn no_matching_call_lists_candidates() {
        let err = DetailingError::NoMatchingCall {
            name: "f".to_string(),
            arguments: "int | float".to_string(),
            candidates: "**none**".to_string(),
            position: Position::new(1, 1),
        };
        let text = format!("{err}");
        assert!(text.contains("(int | float)"));
        assert!(text.ends_with("candidates:\n**none**"));
    }

    #[test]
    fn internal_error_has_default_position() {
        let err = DetailingError::internal("handle missing");
        assert!(err.position().is_synthetic());
    }

    #[test]
    fn validation_error_context() {
        let err = ValidationError::new(
            ValidationErrorKind::EmptyTryCatch,
            Position::new(4, 2),
            "try block needs a catch clause",
        )
        .with_context(vec!["function main".to_string(), "try".to_string()]);
        assert_eq!(
            format!("{err}"),
            "try without catch at 4:2: try block needs a catch clause (in function main > try)"
        );
    }

    #[test]
    fn unified_error_conversion() {
        let err: TesseraError = DetailingError::other(Position::new(2, 2), "bad").into();
        assert!(err.is_detailing());
        assert!(!err.is_validation());
        assert_eq!(err.position(), Position::new(2, 2));
    }
}
