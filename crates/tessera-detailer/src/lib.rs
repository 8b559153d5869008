//! Tessera Detailer
//!
//! Semantic analysis for Tessera syntax trees: name resolution, typing,
//! overload resolution, class synthesis and generic instantiation.
//!
//! ## Architecture
//!
//! - **Detailing**: the [`Detailer`] walks each module in three passes
//!   (types, signatures, bodies), fills the [`EntityGraph`] and stores a
//!   [`DetailHandle`] for every node it visits
//! - **Validation**: the [`Validator`] re-walks the detailed tree with its
//!   handles and checks structural rules
//!
//! ## Modules
//!
//! - [`attributes`]: Attribute callbacks run on declarations
//! - [`compatibility`]: Compatibility scoring between types and cast lookup
//! - [`generics`]: Generic instance cache and argument inference
//! - [`handles`]: Per-node detail handles, keyed by frame and node
//! - [`modules`]: Module resolution and the module cache
//! - [`overload`]: Overload resolution for calls and operators
//! - [`validate`]: The post-detailing validation pass
//!
//! [`EntityGraph`]: tessera_registry::EntityGraph
//! [`DetailHandle`]: handles::DetailHandle

pub mod attributes;
pub mod compatibility;
mod detailer;
pub mod generics;
pub mod handles;
pub mod modules;
mod options;
pub mod overload;
pub mod validate;

pub use attributes::AttributeRegistry;
pub use compatibility::{compatibility, find_from_cast, find_to_cast, is_compatible_with};
pub use detailer::{DetailedRoot, Detailer, DetailerOutput, Frame, native_binary_type};
pub use generics::{GenericInstance, InstanceCache};
pub use handles::{DetailHandle, ExpressionInfo, FrameId, HandleTable};
pub use modules::{MemoryResolver, ModuleResolver, ParsedModule, ResolveError};
pub use options::{AmbiguityPolicy, DetailOptions};
pub use overload::{CallArgument, CallCandidate, CallResolution, find_compatible_call, find_operator};
pub use validate::Validator;

// Re-export the error types callers match on
pub use tessera_core::{DetailingError, ValidationError};
