//! The detailer: semantic analysis of syntax trees.
//!
//! The [`Detailer`] walks a module's tree, builds the entity graph and stores
//! one [`DetailHandle`] per node. It handles:
//! - Declaration hoisting, so a module's classes and functions can be used
//!   before they appear
//! - Name resolution with shadowing and visibility
//! - Overload resolution for calls, constructors and operators
//! - Class synthesis (default and copy constructors, destructors)
//! - Generic instantiation with a per-instance frame
//! - Throw propagation, lambda captures and imports
//!
//! # Phases
//!
//! A module body (and each namespace body inside it) is detailed in three
//! passes:
//!
//! 1. **Types**: imports are bound, then classes and namespaces are declared.
//!    `using` aliases that already resolve are bound.
//! 2. **Signatures**: class members, function signatures with their optional
//!    variants, and typed global variables. Remaining `using` aliases bind.
//! 3. **Bodies**: every statement in source order.
//!
//! Declarations inside function bodies are detailed where they appear.
//!
//! # Example
//!
//! ```ignore
//! let mut detailer = Detailer::new(&arena, DetailOptions::default());
//! let module = detailer.detail_root(root, "main", "main.tsr", "app")?;
//! let output = detailer.into_parts();
//! ```

mod calls;
mod classes;
mod declarations;
mod expressions;
mod imports;
mod instantiate;
mod lambdas;
mod names;
mod operators;
mod statements;
mod throws;
mod types;

use std::path::{Path, PathBuf};

use bumpalo::Bump;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use tessera_core::{DetailingError, ItemId, ModuleId, NodeId, Position, ScopeId, Type};
use tessera_registry::EntityGraph;
use tessera_syntax::{AstBuilder, ClassDefinition, FunctionDefinition, RootNode};

use crate::attributes::AttributeRegistry;
use crate::generics::InstanceCache;
use crate::handles::{DetailHandle, FrameId, HandleKey, HandleTable};
use crate::modules::{ModuleCache, ModuleResolver};
use crate::DetailOptions;

pub(crate) use names::Access;
pub(crate) use operators::is_truthy;
pub use operators::native_binary_type;

type Result<T> = std::result::Result<T, DetailingError>;

/// Where a node is being detailed: the frame its handles go to and the
/// module its new items belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub id: FrameId,
    pub module: ModuleId,
}

/// A generic declaration kept for instantiation.
#[derive(Debug, Clone, Copy)]
enum Template<'ast> {
    Class {
        def: &'ast ClassDefinition<'ast>,
        scope: ScopeId,
        module: ModuleId,
    },
    Function {
        def: &'ast FunctionDefinition<'ast>,
        scope: ScopeId,
        module: ModuleId,
        class: Option<ItemId>,
    },
}

/// How far a class has been detailed. Later stages run the earlier ones
/// on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ClassProgress {
    Declared,
    Signatures,
    Synthesizing,
    Synthesized,
    Bodies,
}

#[derive(Debug, Clone, Copy)]
struct ClassSource<'ast> {
    def: &'ast ClassDefinition<'ast>,
    frame: Frame,
    progress: ClassProgress,
}

/// Catch clauses of a detailed `try`, by the type each one accepts.
#[derive(Debug, Clone, Default)]
struct TryRecord {
    catches: Vec<Option<Type>>,
}

/// A detailed module tree and the frame holding its handles.
#[derive(Debug, Clone, Copy)]
pub struct DetailedRoot<'ast> {
    pub module: ModuleId,
    pub frame: FrameId,
    pub root: &'ast RootNode<'ast>,
}

/// Everything a detailing session produced.
#[derive(Debug)]
pub struct DetailerOutput<'ast> {
    pub graph: EntityGraph,
    pub handles: HandleTable,
    pub roots: Vec<DetailedRoot<'ast>>,
    /// Frames of each generic declaration's instances, by declaration node.
    pub instance_frames: FxHashMap<NodeId, Vec<FrameId>>,
    /// Errors kept when `collect_errors` is set.
    pub errors: Vec<DetailingError>,
}

/// Semantic analyser for one detailing session.
///
/// A session may detail several modules; they share one entity graph,
/// handle table and generic instance cache.
pub struct Detailer<'ast> {
    graph: EntityGraph,
    handles: HandleTable,
    options: DetailOptions,
    /// Builds the trees of synthesised members.
    builder: AstBuilder<'ast>,
    attributes: AttributeRegistry,
    resolver: Option<Box<dyn ModuleResolver<'ast> + 'ast>>,
    modules: ModuleCache,
    module_stack: Vec<ModuleId>,

    instances: InstanceCache,
    templates: FxHashMap<ItemId, Template<'ast>>,
    instance_frames: FxHashMap<NodeId, Vec<FrameId>>,
    pending_classes: Vec<ItemId>,
    pending_functions: Vec<(Frame, &'ast FunctionDefinition<'ast>, ItemId)>,

    /// Items created for declaration nodes, per frame.
    declared: FxHashMap<HandleKey, ItemId>,
    classes: FxHashMap<ItemId, ClassSource<'ast>>,
    synthesized: FxHashMap<ItemId, Vec<&'ast FunctionDefinition<'ast>>>,

    try_blocks: FxHashMap<ScopeId, TryRecord>,
    call_sites: FxHashMap<ItemId, Vec<ScopeId>>,
    super_called: FxHashSet<ItemId>,
    /// Lambdas whose return type is taken from their first `return`.
    inferring_returns: FxHashSet<ItemId>,
    lambda_count: u32,

    next_frame: u32,
    roots: Vec<DetailedRoot<'ast>>,
    errors: Vec<DetailingError>,
}

impl<'ast> Detailer<'ast> {
    /// Create a detailer. Synthesised members are allocated in `arena`.
    pub fn new(arena: &'ast Bump, options: DetailOptions) -> Self {
        Self {
            graph: EntityGraph::new(),
            handles: HandleTable::new(),
            options,
            builder: AstBuilder::new(arena),
            attributes: AttributeRegistry::new(),
            resolver: None,
            modules: ModuleCache::new(),
            module_stack: Vec::new(),
            instances: InstanceCache::new(),
            templates: FxHashMap::default(),
            instance_frames: FxHashMap::default(),
            pending_classes: Vec::new(),
            pending_functions: Vec::new(),
            declared: FxHashMap::default(),
            classes: FxHashMap::default(),
            synthesized: FxHashMap::default(),
            try_blocks: FxHashMap::default(),
            call_sites: FxHashMap::default(),
            super_called: FxHashSet::default(),
            inferring_returns: FxHashSet::default(),
            lambda_count: 0,
            next_frame: 0,
            roots: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Use `resolver` for `import` statements.
    pub fn with_resolver(mut self, resolver: impl ModuleResolver<'ast> + 'ast) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    pub fn with_attributes(mut self, attributes: AttributeRegistry) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn attributes_mut(&mut self) -> &mut AttributeRegistry {
        &mut self.attributes
    }

    pub fn options(&self) -> &DetailOptions {
        &self.options
    }

    pub fn graph(&self) -> &EntityGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut EntityGraph {
        &mut self.graph
    }

    pub fn handles(&self) -> &HandleTable {
        &self.handles
    }

    pub fn instances(&self) -> &InstanceCache {
        &self.instances
    }

    pub fn roots(&self) -> &[DetailedRoot<'ast>] {
        &self.roots
    }

    /// Errors collected so far (only with `collect_errors`).
    pub fn errors(&self) -> &[DetailingError] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<DetailingError> {
        std::mem::take(&mut self.errors)
    }

    pub fn into_parts(self) -> DetailerOutput<'ast> {
        DetailerOutput {
            graph: self.graph,
            handles: self.handles,
            roots: self.roots,
            instance_frames: self.instance_frames,
            errors: self.errors,
        }
    }

    // ==========================================================================
    // Modules
    // ==========================================================================

    /// Create a module for `root` and detail it.
    #[tracing::instrument(level = "debug", skip(self, root, path), fields(path = %path.as_ref().display()))]
    pub fn detail_root(
        &mut self,
        root: &'ast RootNode<'ast>,
        name: &str,
        path: impl AsRef<Path>,
        package: &str,
    ) -> Result<ModuleId> {
        let path = path.as_ref();
        if let Some(module) = self.modules.begin(path, root.position)? {
            return Ok(module);
        }
        let module = self.graph.new_module(name, path, package);
        match self.detail_module(root, module) {
            Ok(_) => {
                self.modules.finish(path, module);
                Ok(module)
            }
            Err(err) => {
                self.modules.abandon(path);
                Err(err)
            }
        }
    }

    /// Parse the module at `path` with the resolver and detail it.
    pub fn detail_path(&mut self, path: impl AsRef<Path>) -> Result<ModuleId> {
        let path = path.as_ref();
        self.load_module(path, path.display().to_string().as_str(), Position::default())
    }

    /// Detail `root` as the body of an existing module.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn detail_module(&mut self, root: &'ast RootNode<'ast>, module: ModuleId) -> Result<FrameId> {
        let frame = self.open_frame(module);
        debug!(%module, frame = %frame.id, "detailing module");
        self.module_stack.push(module);
        let result = self.detail_module_body(frame, root);
        self.module_stack.pop();
        result?;

        let scope = self.graph.module(module).scope;
        let count = self.graph.scope(scope).items.len();
        self.graph.module_mut(module).root_item_count = count;
        self.roots.push(DetailedRoot {
            module,
            frame: frame.id,
            root,
        });
        Ok(frame.id)
    }

    fn detail_module_body(&mut self, frame: Frame, root: &'ast RootNode<'ast>) -> Result<()> {
        let scope = self.graph.module(frame.module).scope;
        self.detail_hoisted(frame, root.statements, scope)?;
        self.drain_pending()
    }

    /// Resolve, parse and detail an imported module, reusing it when the
    /// path was detailed before.
    pub(crate) fn load_module(&mut self, path: &Path, request: &str, position: Position) -> Result<ModuleId> {
        if let Some(module) = self.modules.begin(path, position)? {
            return Ok(module);
        }
        let parsed = match self.resolver.as_mut() {
            Some(resolver) => resolver.parse_module(path),
            None => {
                self.modules.abandon(path);
                return Err(DetailingError::ModuleNotFound {
                    request: request.to_string(),
                    reason: "no module resolver configured".to_string(),
                    position,
                });
            }
        };
        let parsed = match parsed {
            Ok(parsed) => parsed,
            Err(err) => {
                self.modules.abandon(path);
                return Err(err.at(request, position));
            }
        };

        let module = self.graph.new_module(parsed.name, path, parsed.package);
        match self.detail_module(parsed.root, module) {
            Ok(_) => {
                self.modules.finish(path, module);
                Ok(module)
            }
            Err(err) => {
                self.modules.abandon(path);
                Err(err)
            }
        }
    }

    pub(crate) fn resolve_request(&mut self, request: &str, module: ModuleId, position: Position) -> Result<PathBuf> {
        let relative_to = self.graph.module(module).path.clone();
        match self.resolver.as_mut() {
            Some(resolver) => resolver
                .resolve(request, &relative_to)
                .map_err(|err| err.at(request, position)),
            None => Err(DetailingError::ModuleNotFound {
                request: request.to_string(),
                reason: "no module resolver configured".to_string(),
                position,
            }),
        }
    }

    /// The module whose code is being detailed.
    pub(crate) fn current_module(&self) -> Option<ModuleId> {
        self.module_stack.last().copied()
    }

    // ==========================================================================
    // Frames, handles and errors
    // ==========================================================================

    pub(crate) fn open_frame(&mut self, module: ModuleId) -> Frame {
        let id = FrameId::new(self.next_frame);
        self.next_frame += 1;
        Frame { id, module }
    }

    pub(crate) fn store(&mut self, frame: Frame, node: NodeId, handle: DetailHandle, position: Position) -> Result<()> {
        self.handles.insert(HandleKey::new(frame.id, node), handle, position)
    }

    pub(crate) fn declared_item(&self, frame: Frame, node: NodeId) -> Option<ItemId> {
        self.declared.get(&HandleKey::new(frame.id, node)).copied()
    }

    pub(crate) fn record_declared(&mut self, frame: Frame, node: NodeId, item: ItemId) {
        self.declared.insert(HandleKey::new(frame.id, node), item);
    }

    /// Keep going after `result` failed when errors are collected.
    pub(crate) fn recover<T>(&mut self, result: Result<T>) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) if self.options.collect_errors => {
                warn!(error = %err, "detailing error collected");
                self.errors.push(err);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Detail generic instance bodies queued during instantiation.
    pub(crate) fn drain_pending(&mut self) -> Result<()> {
        loop {
            if let Some(class) = self.pending_classes.pop() {
                let result = self.detail_class_bodies(class);
                self.recover(result)?;
            } else if let Some((frame, def, function)) = self.pending_functions.pop() {
                let result = self.detail_function_body(frame, def, function);
                self.recover(result)?;
            } else {
                return Ok(());
            }
        }
    }

    pub(crate) fn type_name(&self, ty: &Type) -> String {
        self.graph.type_name(ty)
    }

    pub(crate) fn item_name(&self, item: ItemId) -> String {
        self.graph.item(item).name().to_string()
    }
}

#[cfg(test)]
mod tests;
