//! The detailing driver.
//!
//! A [`Session`] details one program: a root module and everything it
//! imports, through a single [`Detailer`]. The result is a
//! [`DetailedProgram`] that can then be validated.

use std::path::Path;

use bumpalo::Bump;
use rustc_hash::FxHashMap;
use tracing::info;

use tessera_core::{DetailingError, ModuleId, NodeId, TesseraError, ValidationError};
use tessera_registry::EntityGraph;
use tessera_syntax::RootNode;
use tessera_detailer::{
    AttributeRegistry, DetailOptions, DetailedRoot, Detailer, FrameId, HandleTable, ModuleResolver, Validator,
};

/// Module name and path given to a root detailed with
/// [`Session::detail_root`].
pub const ROOT_MODULE: &str = "main";
pub const ROOT_PATH: &str = "main.tsr";

/// Drives detailing of one program.
///
/// ```
/// use bumpalo::Bump;
/// use tessera::{AstBuilder, Session};
///
/// let arena = Bump::new();
/// let b = AstBuilder::new(&arena);
/// let root = b.root(&[b.var("x", Some(b.ty_int()), Some(b.int(1)))]);
///
/// let program = Session::new(&arena).detail_root(root).unwrap();
/// Session::validate(&program).unwrap();
/// assert_eq!(program.modules.len(), 1);
/// ```
pub struct Session<'ast> {
    detailer: Detailer<'ast>,
    package: String,
}

impl<'ast> Session<'ast> {
    pub fn new(arena: &'ast Bump) -> Self {
        Self::with_options(arena, DetailOptions::default())
    }

    pub fn with_options(arena: &'ast Bump, options: DetailOptions) -> Self {
        Self {
            detailer: Detailer::new(arena, options),
            package: String::new(),
        }
    }

    /// Resolve and parse imported modules with `resolver`.
    pub fn with_resolver(mut self, resolver: impl ModuleResolver<'ast> + 'ast) -> Self {
        self.detailer = self.detailer.with_resolver(resolver);
        self
    }

    pub fn with_attributes(mut self, attributes: AttributeRegistry) -> Self {
        self.detailer = self.detailer.with_attributes(attributes);
        self
    }

    /// Package name recorded on a root given by [`Session::detail_root`].
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    pub fn attributes_mut(&mut self) -> &mut AttributeRegistry {
        self.detailer.attributes_mut()
    }

    pub fn options(&self) -> &DetailOptions {
        self.detailer.options()
    }

    /// Parse the module at `root_path` with the resolver and detail it with
    /// its imports.
    #[tracing::instrument(level = "debug", skip_all, fields(path = %root_path.as_ref().display()))]
    pub fn detail(mut self, root_path: impl AsRef<Path>) -> Result<DetailedProgram<'ast>, TesseraError> {
        let root = self.detailer.detail_path(root_path)?;
        Ok(self.finish(root))
    }

    /// Detail an already-built root tree as the program's root module.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn detail_root(mut self, root: &'ast RootNode<'ast>) -> Result<DetailedProgram<'ast>, TesseraError> {
        let package = std::mem::take(&mut self.package);
        let root = self.detailer.detail_root(root, ROOT_MODULE, ROOT_PATH, &package)?;
        Ok(self.finish(root))
    }

    fn finish(self, root: ModuleId) -> DetailedProgram<'ast> {
        let output = self.detailer.into_parts();
        let modules = output.roots.iter().map(|r| r.module).collect();
        info!(
            modules = output.roots.len(),
            items = output.graph.item_count(),
            errors = output.errors.len(),
            "program detailed"
        );
        DetailedProgram {
            root,
            modules,
            graph: output.graph,
            handles: output.handles,
            roots: output.roots,
            instance_frames: output.instance_frames,
            errors: output.errors,
        }
    }

    /// Validate every module of a detailed program. Stops at the first
    /// violation.
    pub fn validate(program: &DetailedProgram<'_>) -> Result<(), ValidationError> {
        let mut validator = Validator::new(&program.graph, &program.handles, &program.instance_frames);
        for root in &program.roots {
            validator.validate_module(root)?;
        }
        Ok(())
    }

    /// Detail `root_path`, then validate the result.
    pub fn check(self, root_path: impl AsRef<Path>) -> Result<DetailedProgram<'ast>, TesseraError> {
        let program = self.detail(root_path)?;
        if let Some(error) = program.errors.first() {
            return Err(error.clone().into());
        }
        Self::validate(&program)?;
        Ok(program)
    }
}

/// Everything detailing a program produced.
#[derive(Debug)]
pub struct DetailedProgram<'ast> {
    /// The root module.
    pub root: ModuleId,
    /// Every detailed module, dependencies before their dependents.
    pub modules: Vec<ModuleId>,
    pub graph: EntityGraph,
    pub handles: HandleTable,
    pub roots: Vec<DetailedRoot<'ast>>,
    pub instance_frames: FxHashMap<NodeId, Vec<FrameId>>,
    /// Errors kept when `collect_errors` is set.
    pub errors: Vec<DetailingError>,
}

impl<'ast> DetailedProgram<'ast> {
    /// The handle frame of `module`'s tree.
    pub fn frame_of(&self, module: ModuleId) -> Option<FrameId> {
        self.roots.iter().find(|r| r.module == module).map(|r| r.frame)
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
