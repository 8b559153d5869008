//! Modifier layers for [`Type`](super::Type).
//!
//! A type's modifier stack is a list of [`Modifier`] layers read from the base
//! type outward. A layer carrying `POINTER` or `REFERENCE` is one level of
//! indirection wrapping everything before it; its `CONSTANT` bit makes the value
//! at that level constant. A leading layer without an indirection bit qualifies
//! the base value itself.
//!
//! ```text
//! const int              [CONSTANT]
//! int*                   [POINTER]
//! const int*             [CONSTANT, POINTER]
//! int* const             [POINTER | CONSTANT]
//! int* const*            [POINTER | CONSTANT, POINTER]
//! unsigned long int&     [UNSIGNED | LONG, REFERENCE]
//! ```

use bitflags::bitflags;

bitflags! {
    /// One layer of a type's modifier stack.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
    pub struct Modifier: u8 {
        /// This level is a pointer to the previous level.
        const POINTER = 1 << 0;
        /// This level is a reference to the previous level.
        const REFERENCE = 1 << 1;
        /// The value at this level cannot be modified.
        const CONSTANT = 1 << 2;
        /// Native only: explicitly signed.
        const SIGNED = 1 << 3;
        /// Native only: unsigned.
        const UNSIGNED = 1 << 4;
        /// Native only: narrower than the default width.
        const SHORT = 1 << 5;
        /// Native only: wider than the default width.
        const LONG = 1 << 6;

        /// Bits that make a layer an indirection.
        const INDIRECTION = Self::POINTER.bits() | Self::REFERENCE.bits();
        /// Bits only meaningful on the base layer of a native type.
        const NATIVE = Self::SIGNED.bits() | Self::UNSIGNED.bits() | Self::SHORT.bits() | Self::LONG.bits();
    }
}

impl Modifier {
    /// Whether this layer is a pointer or reference level.
    #[inline]
    pub fn is_indirection(self) -> bool {
        self.intersects(Modifier::INDIRECTION)
    }

    /// The native sign/size bits of this layer.
    #[inline]
    pub fn native_bits(self) -> Modifier {
        self & Modifier::NATIVE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indirection_bits() {
        assert!(Modifier::POINTER.is_indirection());
        assert!(Modifier::REFERENCE.is_indirection());
        assert!((Modifier::POINTER | Modifier::CONSTANT).is_indirection());
        assert!(!Modifier::CONSTANT.is_indirection());
        assert!(!Modifier::UNSIGNED.is_indirection());
    }

    #[test]
    fn native_bits_strip_indirection_and_const() {
        let layer = Modifier::UNSIGNED | Modifier::LONG | Modifier::CONSTANT;
        assert_eq!(layer.native_bits(), Modifier::UNSIGNED | Modifier::LONG);
    }
}
