//! Tessera
//!
//! The semantic core of the Tessera compiler: it takes syntax trees built by
//! a parser (or by hand through [`AstBuilder`]), resolves every name, type,
//! call and operator, synthesises implicit class members, instantiates
//! generics and checks the result.
//!
//! ## Crates
//!
//! - [`core`]: positions, ids, errors, the type model and entities
//! - [`syntax`]: the arena-allocated syntax tree and its builder
//! - [`registry`]: the entity graph and name lookup
//! - [`detailer`]: detailing, overload resolution and validation
//!
//! [`Session`] ties them together for one program.

mod session;

pub use tessera_core as core;
pub use tessera_detailer as detailer;
pub use tessera_registry as registry;
pub use tessera_syntax as syntax;

pub use session::{DetailedProgram, ROOT_MODULE, ROOT_PATH, Session};

pub use tessera_core::{DetailingError, TesseraError, ValidationError, ValidationErrorKind};
pub use tessera_detailer::{AmbiguityPolicy, DetailOptions, MemoryResolver, ModuleResolver};
pub use tessera_syntax::AstBuilder;

pub mod prelude {
    pub use crate::session::*;
    pub use tessera_core::{ItemId, ItemKind, ModuleId, Position, Type};
    pub use tessera_detailer::handles::*;
    pub use tessera_detailer::{AmbiguityPolicy, DetailOptions, MemoryResolver, ModuleResolver};
    pub use tessera_syntax::AstBuilder;
}
