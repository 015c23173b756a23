//! Strongly typed counting units.
//!
//! Lines, bytes and characters are all "just integers", and mixing them up is
//! the classic off-by-a-unit bug in display code. Each unit gets its own
//! newtype; arithmetic is only defined within a unit (plus a raw `i64` for
//! literals). There is deliberately no conversion between units: going from
//! bytes to characters always requires looking at actual text.
//!
//! Values are signed so that sentinel coordinates (one-before-the-buffer when
//! resolving regions, the empty-range sentinel of a display line) stay
//! representable.

macro_rules! strongly_typed_unit {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(pub i64);

        impl $name {
            pub const MAX: $name = $name(i64::MAX);
            pub const MIN: $name = $name(i64::MIN);

            /// Raw value as an index. Callers guarantee non-negativity.
            #[inline]
            pub fn as_usize(self) -> usize {
                debug_assert!(self.0 >= 0, "negative unit used as an index");
                self.0 as usize
            }
        }

        impl From<usize> for $name {
            #[inline]
            fn from(v: usize) -> Self {
                $name(v as i64)
            }
        }

        impl std::ops::Add for $name {
            type Output = $name;
            #[inline]
            fn add(self, rhs: $name) -> $name {
                $name(self.0 + rhs.0)
            }
        }

        impl std::ops::Add<i64> for $name {
            type Output = $name;
            #[inline]
            fn add(self, rhs: i64) -> $name {
                $name(self.0 + rhs)
            }
        }

        impl std::ops::Sub for $name {
            type Output = $name;
            #[inline]
            fn sub(self, rhs: $name) -> $name {
                $name(self.0 - rhs.0)
            }
        }

        impl std::ops::Sub<i64> for $name {
            type Output = $name;
            #[inline]
            fn sub(self, rhs: i64) -> $name {
                $name(self.0 - rhs)
            }
        }

        impl std::ops::AddAssign for $name {
            #[inline]
            fn add_assign(&mut self, rhs: $name) {
                self.0 += rhs.0;
            }
        }

        impl std::ops::AddAssign<i64> for $name {
            #[inline]
            fn add_assign(&mut self, rhs: i64) {
                self.0 += rhs;
            }
        }

        impl std::ops::SubAssign for $name {
            #[inline]
            fn sub_assign(&mut self, rhs: $name) {
                self.0 -= rhs.0;
            }
        }

        impl std::ops::SubAssign<i64> for $name {
            #[inline]
            fn sub_assign(&mut self, rhs: i64) {
                self.0 -= rhs;
            }
        }

        impl std::ops::Neg for $name {
            type Output = $name;
            #[inline]
            fn neg(self) -> $name {
                $name(-self.0)
            }
        }

        impl PartialEq<i64> for $name {
            #[inline]
            fn eq(&self, rhs: &i64) -> bool {
                self.0 == *rhs
            }
        }

        impl PartialOrd<i64> for $name {
            #[inline]
            fn partial_cmp(&self, rhs: &i64) -> Option<std::cmp::Ordering> {
                self.0.partial_cmp(rhs)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

strongly_typed_unit!(
    /// A count of (or index into) buffer lines.
    LineCount
);
strongly_typed_unit!(
    /// A count of (or offset in) UTF-8 bytes.
    ByteCount
);
strongly_typed_unit!(
    /// A count of Unicode codepoints.
    CharCount
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_stays_in_unit() {
        let a = LineCount(3);
        assert_eq!(a + LineCount(2), LineCount(5));
        assert_eq!(a + 2, LineCount(5));
        assert_eq!(a - 4, LineCount(-1));
        let mut b = ByteCount(1);
        b += 3;
        b -= ByteCount(2);
        assert_eq!(b, ByteCount(2));
    }

    #[test]
    fn comparisons_against_raw_integers() {
        assert!(LineCount(4) > 3);
        assert!(ByteCount(0) == 0);
        assert!(CharCount(-1) < 0);
    }
}
