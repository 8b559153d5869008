//! Native primitive types.

use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use super::Modifier;

/// The built-in primitive types of the language.
///
/// Sign and width are not part of the discriminant; they live in the base
/// modifier layer (`unsigned long int` is `Integer` with `[UNSIGNED | LONG]`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive,
)]
#[repr(u8)]
pub enum NativeType {
    Integer = 0,
    Byte = 1,
    Bool = 2,
    Void = 3,
    Float = 4,
    Double = 5,
}

impl NativeType {
    /// The source keyword for this native.
    pub fn keyword(self) -> &'static str {
        match self {
            NativeType::Integer => "int",
            NativeType::Byte => "byte",
            NativeType::Bool => "bool",
            NativeType::Void => "void",
            NativeType::Float => "float",
            NativeType::Double => "double",
        }
    }

    /// Look up a native by its keyword.
    pub fn from_keyword(keyword: &str) -> Option<NativeType> {
        Some(match keyword {
            "int" => NativeType::Integer,
            "byte" => NativeType::Byte,
            "bool" => NativeType::Bool,
            "void" => NativeType::Void,
            "float" => NativeType::Float,
            "double" => NativeType::Double,
            _ => return None,
        })
    }

    /// Whether this is `float` or `double`.
    #[inline]
    pub fn is_floating(self) -> bool {
        matches!(self, NativeType::Float | NativeType::Double)
    }

    /// Whether this is an integral type (`int`, `byte`).
    #[inline]
    pub fn is_integral(self) -> bool {
        matches!(self, NativeType::Integer | NativeType::Byte)
    }

    /// Whether values of this type can take part in arithmetic.
    #[inline]
    pub fn is_arithmetic(self) -> bool {
        !matches!(self, NativeType::Void)
    }

    /// Width rank used to pick the result of mixed arithmetic.
    ///
    /// `bool < byte < short int < int < long int < float < double`.
    pub fn rank(self, base: Modifier) -> u8 {
        match self {
            NativeType::Void => 0,
            NativeType::Bool => 1,
            NativeType::Byte => 2,
            NativeType::Integer if base.contains(Modifier::SHORT) => 3,
            NativeType::Integer if base.contains(Modifier::LONG) => 5,
            NativeType::Integer => 4,
            NativeType::Float => 6,
            NativeType::Double => 7,
        }
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_round_trip() {
        for native in [
            NativeType::Integer,
            NativeType::Byte,
            NativeType::Bool,
            NativeType::Void,
            NativeType::Float,
            NativeType::Double,
        ] {
            assert_eq!(NativeType::from_keyword(native.keyword()), Some(native));
        }
        assert_eq!(NativeType::from_keyword("string"), None);
    }

    #[test]
    fn primitive_conversion() {
        let raw: u8 = NativeType::Double.into();
        assert_eq!(raw, 5);
        assert_eq!(NativeType::try_from(4u8).ok(), Some(NativeType::Float));
        assert!(NativeType::try_from(99u8).is_err());
    }

    #[test]
    fn rank_orders_widths() {
        let plain = Modifier::empty();
        assert!(NativeType::Byte.rank(plain) < NativeType::Integer.rank(Modifier::SHORT));
        assert!(NativeType::Integer.rank(Modifier::SHORT) < NativeType::Integer.rank(plain));
        assert!(NativeType::Integer.rank(plain) < NativeType::Integer.rank(Modifier::LONG));
        assert!(NativeType::Integer.rank(Modifier::LONG) < NativeType::Float.rank(plain));
        assert!(NativeType::Float.rank(plain) < NativeType::Double.rank(plain));
    }
}
