use crate::ScopeId;

/// A named container of items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub scope: ScopeId,
}

impl Namespace {
    pub fn new(scope: ScopeId) -> Self {
        Self { scope }
    }
}
