#![forbid(unsafe_code)]

//! One-level equality used to decide whether a selected slice changed.
//!
//! Two traits split the comparison:
//!
//! - [`IdentityEq`]: "is this the same value/reference". Plain data compares by
//!   value (floats by bit pattern, so `NaN` equals itself and `0.0` differs
//!   from `-0.0`), shared pointers compare by address.
//! - [`ShallowEq`]: one level of field/element comparison with a
//!   reference-equal fast path. Containers compare their elements with
//!   [`IdentityEq`], never recursively.
//!
//! A selector that returns a freshly built `Vec<Rc<Item>>` each time is
//! therefore "unchanged" as long as it holds the same `Rc`s in the same order,
//! which is what keeps derived collections from forcing renders.
//!
//! # Invariants
//!
//! 1. `a.shallow_eq(&a)` holds for every value, including float `NaN`.
//! 2. Both relations are symmetric.
//! 3. [`ShallowEq`] never descends more than one level.

use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};
use std::rc::Rc;
use std::sync::Arc;

/// Identity comparison: value for plain data, address for shared pointers.
pub trait IdentityEq {
    /// Whether `self` and `other` are the same value or reference.
    fn identity_eq(&self, other: &Self) -> bool;
}

/// One level of field/element comparison.
pub trait ShallowEq {
    /// Whether `self` and `other` agree one level deep.
    fn shallow_eq(&self, other: &Self) -> bool;
}

/// Compare two values with [`ShallowEq`].
#[inline]
#[must_use]
pub fn shallow_equal<T: ShallowEq + ?Sized>(a: &T, b: &T) -> bool {
    a.shallow_eq(b)
}

// ---------------------------------------------------------------------------
// Plain data
// ---------------------------------------------------------------------------

macro_rules! by_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IdentityEq for $ty {
                #[inline]
                fn identity_eq(&self, other: &Self) -> bool {
                    self == other
                }
            }

            impl ShallowEq for $ty {
                #[inline]
                fn shallow_eq(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

by_value!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, bool, char, (), str, String
);

macro_rules! by_bits {
    ($($ty:ty),*) => {
        $(
            impl IdentityEq for $ty {
                #[inline]
                fn identity_eq(&self, other: &Self) -> bool {
                    self.to_bits() == other.to_bits()
                }
            }

            impl ShallowEq for $ty {
                #[inline]
                fn shallow_eq(&self, other: &Self) -> bool {
                    self.to_bits() == other.to_bits()
                }
            }
        )*
    };
}

by_bits!(f32, f64);

// ---------------------------------------------------------------------------
// Pointers and wrappers
// ---------------------------------------------------------------------------

impl<T: IdentityEq + ?Sized> IdentityEq for &T {
    #[inline]
    fn identity_eq(&self, other: &Self) -> bool {
        (**self).identity_eq(*other)
    }
}

impl<T: ShallowEq + ?Sized> ShallowEq for &T {
    #[inline]
    fn shallow_eq(&self, other: &Self) -> bool {
        (**self).shallow_eq(*other)
    }
}

impl<T: ?Sized> IdentityEq for Rc<T> {
    #[inline]
    fn identity_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: ShallowEq + ?Sized> ShallowEq for Rc<T> {
    #[inline]
    fn shallow_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other) || (**self).shallow_eq(&**other)
    }
}

impl<T: ?Sized> IdentityEq for Arc<T> {
    #[inline]
    fn identity_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: ShallowEq + ?Sized> ShallowEq for Arc<T> {
    #[inline]
    fn shallow_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other) || (**self).shallow_eq(&**other)
    }
}

impl<T: IdentityEq> IdentityEq for Option<T> {
    #[inline]
    fn identity_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.identity_eq(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: ShallowEq> ShallowEq for Option<T> {
    #[inline]
    fn shallow_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.shallow_eq(b),
            (None, None) => true,
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

impl<T: IdentityEq> ShallowEq for [T] {
    fn shallow_eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
            || (self.len() == other.len()
                && self.iter().zip(other).all(|(a, b)| a.identity_eq(b)))
    }
}

impl<T: IdentityEq, const N: usize> ShallowEq for [T; N] {
    #[inline]
    fn shallow_eq(&self, other: &Self) -> bool {
        self.as_slice().shallow_eq(other.as_slice())
    }
}

impl<T: IdentityEq> ShallowEq for Vec<T> {
    #[inline]
    fn shallow_eq(&self, other: &Self) -> bool {
        self.as_slice().shallow_eq(other.as_slice())
    }
}

impl<K: Ord, V: IdentityEq> ShallowEq for BTreeMap<K, V> {
    fn shallow_eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
            || (self.len() == other.len()
                && self
                    .iter()
                    .all(|(k, v)| other.get(k).is_some_and(|o| v.identity_eq(o))))
    }
}

impl<K: Eq + Hash, V: IdentityEq, H: BuildHasher> ShallowEq for HashMap<K, V, H> {
    fn shallow_eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
            || (self.len() == other.len()
                && self
                    .iter()
                    .all(|(k, v)| other.get(k).is_some_and(|o| v.identity_eq(o))))
    }
}

macro_rules! tuple_shallow {
    ($(($($name:ident : $idx:tt),+)),* $(,)?) => {
        $(
            impl<$($name: IdentityEq),+> ShallowEq for ($($name,)+) {
                #[inline]
                fn shallow_eq(&self, other: &Self) -> bool {
                    $(self.$idx.identity_eq(&other.$idx))&&+
                }
            }
        )*
    };
}

tuple_shallow!(
    (A: 0),
    (A: 0, B: 1),
    (A: 0, B: 1, C: 2),
    (A: 0, B: 1, C: 2, D: 3),
    (A: 0, B: 1, C: 2, D: 3, E: 4),
    (A: 0, B: 1, C: 2, D: 3, E: 4, F: 5),
);

/// Implement [`ShallowEq`] for a struct by comparing the listed fields with
/// [`IdentityEq`].
///
/// # Examples
///
/// ```
/// use std::rc::Rc;
/// use tearless_core::{impl_shallow_eq, shallow_equal};
///
/// struct Row {
///     label: String,
///     tags: Rc<Vec<String>>,
/// }
///
/// impl_shallow_eq!(Row { label, tags });
///
/// let tags = Rc::new(vec!["a".to_string()]);
/// let a = Row { label: "x".into(), tags: Rc::clone(&tags) };
/// let b = Row { label: "x".into(), tags };
/// assert!(shallow_equal(&a, &b));
/// ```
#[macro_export]
macro_rules! impl_shallow_eq {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl $crate::equality::ShallowEq for $ty {
            fn shallow_eq(&self, other: &Self) -> bool {
                $($crate::equality::IdentityEq::identity_eq(&self.$field, &other.$field))&&+
            }
        }
    };
}
