//! Module resolution and the module cache.
//!
//! Imports name modules by request strings. A [`ModuleResolver`] turns a
//! request into a path and a path into a parsed tree; the [`ModuleCache`]
//! makes sure each path is detailed once and catches import cycles.

use std::path::{Component, Path, PathBuf};

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use thiserror::Error;
use tracing::debug;
use xxhash_rust::xxh64::xxh64;

use tessera_core::{DetailingError, ModuleId, Position};
use tessera_syntax::RootNode;

/// Default source file extension appended to extensionless requests.
pub const SOURCE_EXTENSION: &str = "tsr";

/// Why a request could not be satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no module at '{0}'")]
    NotFound(String),

    #[error("{0}")]
    Invalid(String),
}

impl ResolveError {
    pub fn at(self, request: &str, position: Position) -> DetailingError {
        DetailingError::ModuleNotFound {
            request: request.to_string(),
            reason: self.to_string(),
            position,
        }
    }
}

/// A module's tree with the names it is registered under.
#[derive(Debug, Clone, Copy)]
pub struct ParsedModule<'ast> {
    pub root: &'ast RootNode<'ast>,
    pub name: &'ast str,
    pub package: &'ast str,
}

/// Host hook that locates and parses imported modules.
pub trait ModuleResolver<'ast> {
    /// The path an import `request` made from `relative_to` refers to.
    fn resolve(&mut self, request: &str, relative_to: &Path) -> Result<PathBuf, ResolveError>;

    /// Parse the module at a path returned by [`ModuleResolver::resolve`].
    fn parse_module(&mut self, path: &Path) -> Result<ParsedModule<'ast>, ResolveError>;
}

/// Resolver over trees that are already in memory, keyed by path.
///
/// Requests resolve relative to the importing module's directory; `.` and
/// `..` segments are folded lexically and a missing extension defaults to
/// [`SOURCE_EXTENSION`].
#[derive(Debug, Default)]
pub struct MemoryResolver<'ast> {
    modules: FxHashMap<PathBuf, ParsedModule<'ast>>,
}

impl<'ast> MemoryResolver<'ast> {
    pub fn new() -> Self {
        Self {
            modules: FxHashMap::default(),
        }
    }

    pub fn add(
        &mut self,
        path: impl AsRef<Path>,
        name: &'ast str,
        package: &'ast str,
        root: &'ast RootNode<'ast>,
    ) -> &mut Self {
        self.modules.insert(
            normalize(path.as_ref()),
            ParsedModule { root, name, package },
        );
        self
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.modules.contains_key(&normalize(path))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl<'ast> ModuleResolver<'ast> for MemoryResolver<'ast> {
    fn resolve(&mut self, request: &str, relative_to: &Path) -> Result<PathBuf, ResolveError> {
        if request.is_empty() {
            return Err(ResolveError::Invalid("empty module request".to_string()));
        }
        let base = relative_to.parent().unwrap_or(Path::new(""));
        let mut path = normalize(&base.join(request));
        if path.extension().is_none() {
            path.set_extension(SOURCE_EXTENSION);
        }
        if self.modules.contains_key(&path) {
            Ok(path)
        } else {
            Err(ResolveError::NotFound(path.display().to_string()))
        }
    }

    fn parse_module(&mut self, path: &Path) -> Result<ParsedModule<'ast>, ResolveError> {
        self.modules
            .get(&normalize(path))
            .copied()
            .ok_or_else(|| ResolveError::NotFound(path.display().to_string()))
    }
}

/// Fold `.` and `..` segments without touching the file system.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Detailing state of a module path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    Loading,
    Done(ModuleId),
}

/// Memo of module paths, hashed with xxh64.
#[derive(Debug, Default)]
pub struct ModuleCache {
    entries: FxHashMap<u64, SmallVec<[(PathBuf, ModuleState); 1]>>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(path: &Path) -> u64 {
        xxh64(path.to_string_lossy().as_bytes(), 0)
    }

    pub fn state(&self, path: &Path) -> Option<ModuleState> {
        self.entries
            .get(&Self::key(path))?
            .iter()
            .find(|(cached, _)| cached == path)
            .map(|(_, state)| *state)
    }

    /// Claim `path` for loading.
    ///
    /// Returns the module when it is already done, `None` when the caller
    /// should load it now, and `CircularImport` when it is still loading.
    pub fn begin(&mut self, path: &Path, position: Position) -> Result<Option<ModuleId>, DetailingError> {
        match self.state(path) {
            Some(ModuleState::Done(module)) => {
                debug!(path = %path.display(), %module, "module cache hit");
                Ok(Some(module))
            }
            Some(ModuleState::Loading) => Err(DetailingError::CircularImport {
                path: path.display().to_string(),
                position,
            }),
            None => {
                self.set(path, ModuleState::Loading);
                Ok(None)
            }
        }
    }

    pub fn finish(&mut self, path: &Path, module: ModuleId) {
        self.set(path, ModuleState::Done(module));
    }

    /// Forget a path whose load failed.
    pub fn abandon(&mut self, path: &Path) {
        if let Some(bucket) = self.entries.get_mut(&Self::key(path)) {
            bucket.retain(|(cached, _)| cached != path);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(|bucket| bucket.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn set(&mut self, path: &Path, state: ModuleState) {
        let bucket = self.entries.entry(Self::key(path)).or_default();
        match bucket.iter_mut().find(|(cached, _)| cached == path) {
            Some((_, current)) => *current = state,
            None => bucket.push((path.to_path_buf(), state)),
        }
    }
}

#[cfg(test)]
mod tests {
    use bumpalo::Bump;
    use tessera_syntax::AstBuilder;

    use super::*;

    #[test]
    fn requests_resolve_relative_to_importer() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut resolver = MemoryResolver::new();
        resolver.add("lib/math.tsr", "math", "app", b.root(&[]));

        let path = resolver.resolve("./math", Path::new("lib/main.tsr"));
        assert_eq!(path, Ok(PathBuf::from("lib/math.tsr")));
        let path = resolver.resolve("../math.tsr", Path::new("lib/sub/x.tsr"));
        assert_eq!(path, Ok(PathBuf::from("lib/math.tsr")));
        assert!(matches!(
            resolver.resolve("missing", Path::new("lib/main.tsr")),
            Err(ResolveError::NotFound(_))
        ));
    }

    #[test]
    fn parse_returns_registered_tree() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let root = b.root(&[b.expr_stmt(b.int(1))]);
        let mut resolver = MemoryResolver::new();
        resolver.add("a.tsr", "a", "", root);

        let parsed = resolver.parse_module(Path::new("./a.tsr"));
        assert!(parsed.is_ok_and(|m| m.name == "a" && m.root.statements.len() == 1));
    }

    #[test]
    fn cache_detects_cycles() {
        let mut cache = ModuleCache::new();
        let path = Path::new("a.tsr");
        assert_eq!(cache.begin(path, Position::new(1, 1)), Ok(None));
        assert!(matches!(
            cache.begin(path, Position::new(3, 1)),
            Err(DetailingError::CircularImport { .. })
        ));

        cache.finish(path, ModuleId::new(4));
        assert_eq!(cache.begin(path, Position::new(5, 1)), Ok(Some(ModuleId::new(4))));
        assert_eq!(cache.state(path), Some(ModuleState::Done(ModuleId::new(4))));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn abandoned_paths_can_be_retried() {
        let mut cache = ModuleCache::new();
        let path = Path::new("b.tsr");
        assert_eq!(cache.begin(path, Position::new(1, 1)), Ok(None));
        cache.abandon(path);
        assert!(cache.is_empty());
        assert_eq!(cache.begin(path, Position::new(1, 1)), Ok(None));
    }
}
