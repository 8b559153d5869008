//! Detailing configuration.

/// What to do when overload ranking finds no single best candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AmbiguityPolicy {
    /// Report an ambiguous call.
    #[default]
    Error,
    /// Take the first undominated candidate in declaration order.
    FirstDeclared,
}

/// Options for one detailing session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailOptions {
    /// How deep compatibility search may recurse through casts and wrappers.
    pub max_compatibility_depth: usize,
    pub ambiguity: AmbiguityPolicy,
    /// Keep detailing independent top-level statements after an error.
    pub collect_errors: bool,
    /// Give classes without one a member-wise copy constructor.
    pub synthesize_copy_constructors: bool,
}

impl Default for DetailOptions {
    fn default() -> Self {
        Self {
            max_compatibility_depth: 16,
            ambiguity: AmbiguityPolicy::Error,
            collect_errors: false,
            synthesize_copy_constructors: true,
        }
    }
}

impl DetailOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_compatibility_depth(mut self, depth: usize) -> Self {
        self.max_compatibility_depth = depth;
        self
    }

    pub fn with_ambiguity(mut self, policy: AmbiguityPolicy) -> Self {
        self.ambiguity = policy;
        self
    }

    pub fn with_collect_errors(mut self, collect: bool) -> Self {
        self.collect_errors = collect;
        self
    }

    pub fn with_copy_constructors(mut self, synthesize: bool) -> Self {
        self.synthesize_copy_constructors = synthesize;
        self
    }
}
