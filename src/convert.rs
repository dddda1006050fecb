//! Pure value predicates and conversions used by `filter_empty` and `flip`.
//!
//! Both are plain traits so callers can implement them for their own types;
//! the map also takes closures (`filter_empty_by`, `flip_with`) when a
//! trait impl does not fit.

use core::hash::BuildHasher;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Whether a value counts as "empty" (zero, false, blank, none).
pub trait IsEmpty {
    fn is_empty_value(&self) -> bool;
}

macro_rules! zero_is_empty {
    ($($t:ty),* $(,)?) => {
        $(
            impl IsEmpty for $t {
                #[inline]
                fn is_empty_value(&self) -> bool {
                    *self == 0
                }
            }
        )*
    };
}

zero_is_empty!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl IsEmpty for f32 {
    fn is_empty_value(&self) -> bool {
        *self == 0.0
    }
}

impl IsEmpty for f64 {
    fn is_empty_value(&self) -> bool {
        *self == 0.0
    }
}

impl IsEmpty for bool {
    fn is_empty_value(&self) -> bool {
        !*self
    }
}

impl IsEmpty for char {
    fn is_empty_value(&self) -> bool {
        *self == '\0'
    }
}

impl IsEmpty for () {
    fn is_empty_value(&self) -> bool {
        true
    }
}

impl IsEmpty for str {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl IsEmpty for String {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T> IsEmpty for [T] {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T> IsEmpty for Vec<T> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T> IsEmpty for Option<T> {
    fn is_empty_value(&self) -> bool {
        self.is_none()
    }
}

impl<T, S> IsEmpty for HashSet<T, S> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T> IsEmpty for BTreeSet<T> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V, S> IsEmpty for std::collections::HashMap<K, V, S> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V, S: BuildHasher> IsEmpty for hashbrown::HashMap<K, V, S> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V> IsEmpty for BTreeMap<K, V> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T: IsEmpty + ?Sized> IsEmpty for &T {
    fn is_empty_value(&self) -> bool {
        (**self).is_empty_value()
    }
}

impl<T: IsEmpty + ?Sized> IsEmpty for Box<T> {
    fn is_empty_value(&self) -> bool {
        (**self).is_empty_value()
    }
}

/// Infallible conversion between key and value representations.
///
/// A conversion that cannot succeed yields the target's default instead of
/// failing, so a single bad value never aborts a whole-map transform.
pub trait Convert<T> {
    fn convert(&self) -> T;
}

impl<T: Clone> Convert<T> for T {
    #[inline]
    fn convert(&self) -> T {
        self.clone()
    }
}

macro_rules! scalar_string_convert {
    (int: $($t:ty),* $(,)?) => {
        $(
            impl Convert<String> for $t {
                fn convert(&self) -> String {
                    self.to_string()
                }
            }

            impl Convert<$t> for String {
                fn convert(&self) -> $t {
                    parse_int(self)
                }
            }
        )*
    };
    (float: $($t:ty),* $(,)?) => {
        $(
            impl Convert<String> for $t {
                fn convert(&self) -> String {
                    self.to_string()
                }
            }

            impl Convert<$t> for String {
                fn convert(&self) -> $t {
                    self.trim().parse().unwrap_or_default()
                }
            }
        )*
    };
}

scalar_string_convert!(int: i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
scalar_string_convert!(float: f32, f64);

impl Convert<String> for bool {
    fn convert(&self) -> String {
        self.to_string()
    }
}

impl Convert<bool> for String {
    fn convert(&self) -> bool {
        !matches!(
            self.trim().to_ascii_lowercase().as_str(),
            "" | "0" | "false" | "off" | "no"
        )
    }
}

// Integer text first, then decimal text truncated toward zero; anything
// unparsable or out of range is zero.
fn parse_int<T>(s: &str) -> T
where
    T: core::str::FromStr + Default + TryFrom<i128>,
{
    let s = s.trim();
    if let Ok(v) = s.parse::<T>() {
        return v;
    }
    // 2^127: the first float past i128::MAX. `as` would saturate.
    const I128_BOUND: f64 = 170_141_183_460_469_231_731_687_303_715_884_105_728.0;
    match s.parse::<f64>() {
        Ok(f) if (-I128_BOUND..I128_BOUND).contains(&f) => {
            T::try_from(f as i128).unwrap_or_default()
        }
        _ => T::default(),
    }
}
