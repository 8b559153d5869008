//! Core types for the Tessera front end.
//!
//! This crate holds the vocabulary every other crate shares:
//!
//! - [`Position`] and the arena id newtypes ([`ItemId`], [`ScopeId`],
//!   [`ModuleId`], [`NodeId`])
//! - the error hierarchy ([`TesseraError`] and its phase errors)
//! - the [`Type`] value model and its modifier algebra
//! - the entity structs of the detailed entity tree ([`entities`])
//! - operators and one-shot deferred action lists

pub mod entities;
mod error;
pub mod events;
mod ids;
mod operator;
mod position;
pub mod ty;

pub use entities::{
    AccessorKind, Alias, Class, ClassFlags, Function, FunctionFlags, Item, ItemHeader, ItemKind,
    ItemKindSet, Module, Namespace, Scope, ScopeOwner, TypeItem, Variable, Visibility,
};
pub use error::{
    DetailingError, LexError, ParseError, TesseraError, ValidationError, ValidationErrorKind,
};
pub use events::{DeferredAction, OneShot};
pub use ids::{ItemId, ModuleId, NodeId, ScopeId};
pub use operator::{BinaryOperator, Operator, Orientation, UnaryOperator};
pub use position::{FileId, Position};
pub use ty::{
    FunctionSignature, Modifier, Modifiers, NameResolver, NativeType, SignatureParameter, Type,
    TypeKind,
};
