use std::fmt;

/// Who may refer to an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    /// Only code inside the declaring container.
    Private,
    /// The declaring class and classes derived from it.
    Protected,
    /// Everyone.
    #[default]
    Public,
    /// Code in the same module.
    Module,
    /// Code in any module of the same package.
    Package,
}

impl Visibility {
    pub fn keyword(self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Protected => "protected",
            Visibility::Public => "public",
            Visibility::Module => "module",
            Visibility::Package => "package",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}
