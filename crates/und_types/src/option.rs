//! The presence primitive.
//!
//! [`Option<T>`] already is the two-state tagged union this crate builds on:
//! its serde impls write `null` for `None` and read `null` back as `None`.
//! [`OptionExt`] adds the accessors the richer types project through.

use alloc::boxed::Box;
use alloc::vec::Vec;

/// A sequence of independently present values, the payload of
/// [`Elastic`](crate::Elastic).
pub type Options<T> = Vec<Option<T>>;

// -----------------------------------------------------------------------------
// OptionExt

/// Accessors shared by every presence-typed value.
///
/// # Examples
///
/// ```
/// use und_types::OptionExt;
///
/// let some = Some(5);
/// let none = None::<i32>;
///
/// assert_eq!(some.value(), 5);
/// assert_eq!(none.value(), 0);
/// assert_eq!(some.pointer().as_deref(), Some(&5));
/// assert!(none.pointer().is_none());
/// assert!(none.equal(&None));
/// ```
pub trait OptionExt<T> {
    /// Returns the held value, or `T::default()` when absent.
    ///
    /// Absence is coerced silently; use [`Option::as_ref`] to tell the
    /// two apart.
    fn value(&self) -> T
    where
        T: Clone + Default;

    /// Returns a private heap copy of the held value.
    ///
    /// The box never aliases `self`, so mutating it leaves `self` intact.
    fn pointer(&self) -> Option<Box<T>>
    where
        T: Clone;

    /// Compares two presence values.
    ///
    /// Two `None`s are equal, `None` never equals `Some`, and two `Some`s
    /// compare through `T`'s own [`PartialEq`]. A hand-written `PartialEq`
    /// therefore always wins over field-by-field comparison.
    fn equal(&self, other: &Self) -> bool
    where
        T: PartialEq;
}

impl<T> OptionExt<T> for Option<T> {
    #[inline]
    fn value(&self) -> T
    where
        T: Clone + Default,
    {
        match self {
            Some(v) => v.clone(),
            None => T::default(),
        }
    }

    #[inline]
    fn pointer(&self) -> Option<Box<T>>
    where
        T: Clone,
    {
        self.as_ref().map(|v| Box::new(v.clone()))
    }

    #[inline]
    fn equal(&self, other: &Self) -> bool
    where
        T: PartialEq,
    {
        match (self, other) {
            (None, None) => true,
            (Some(l), Some(r)) => l == r,
            _ => false,
        }
    }
}

// -----------------------------------------------------------------------------
// Free helpers

/// Collapses a nested presence: `Some(None)` and `None` both become `None`.
///
/// ```
/// use und_types::option::flatten_option;
///
/// assert_eq!(flatten_option(Some(Some(1))), Some(1));
/// assert_eq!(flatten_option(Some(None::<i32>)), None);
/// assert_eq!(flatten_option(None::<Option<i32>>), None);
/// ```
#[inline]
pub fn flatten_option<T>(o: Option<Option<T>>) -> Option<T> {
    o.flatten()
}

/// Maps the held value into another type, leaving `None` as `None`.
#[inline]
pub fn map_option<T, U>(o: Option<T>, f: impl FnOnce(T) -> U) -> Option<U> {
    o.map(f)
}

/// Converts a borrowed optional value into an owned one.
///
/// This is the inverse of [`OptionExt::pointer`] and the constructor
/// used by the `from_pointer` helpers of the richer types.
#[inline]
pub fn from_pointer<T: Clone>(p: Option<&T>) -> Option<T> {
    p.cloned()
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{OptionExt, from_pointer};
    use alloc::string::String;
    use alloc::vec;
    use alloc::vec::Vec;

    /// Equal when the two values agree modulo 30.
    #[derive(Debug, Clone, Default)]
    struct Ring(Box<i32>);

    impl PartialEq for Ring {
        fn eq(&self, other: &Self) -> bool {
            *self.0 % 30 == *other.0 % 30
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Words(Vec<String>);

    #[test]
    fn equality_order() {
        assert!(None::<i32>.equal(&None));
        assert!(!Some(1).equal(&None));
        assert!(!None.equal(&Some(1)));
        assert!(Some(123).equal(&Some(123)));
        assert!(!Some(123).equal(&Some(224)));
    }

    #[test]
    fn custom_equality_wins() {
        let l = Some(Ring(Box::new(1)));
        let r = Some(Ring(Box::new(31)));
        assert!(l.equal(&r));
        assert!(!l.equal(&Some(Ring(Box::new(2)))));

        let words = Some(Words(vec![String::from("foo")]));
        assert!(words.equal(&Some(Words(vec![String::from("foo")]))));
        assert!(!words.equal(&Some(Words(vec![String::from("bar")]))));
    }

    #[test]
    fn pointer_is_a_copy() {
        let held = Some(5);
        let mut copy = held.pointer().unwrap();
        assert_eq!(*copy, 5);

        let inner: *const i32 = held.as_ref().unwrap();
        assert!(!core::ptr::eq(inner, &*copy));

        *copy = 6;
        assert_eq!(held, Some(5));
        assert!(None::<i32>.pointer().is_none());
    }

    #[test]
    fn value_defaults() {
        assert_eq!(Some(String::from("x")).value(), "x");
        assert_eq!(None::<String>.value(), "");
        assert_eq!(from_pointer(Some(&3)), Some(3));
        assert_eq!(from_pointer::<i32>(None), None);
    }

    #[test]
    fn combinators() {
        let some = Some(2);
        let none = None::<i32>;

        assert_eq!(some.and(Some(3)), Some(3));
        assert_eq!(none.and(Some(3)), None);
        assert_eq!(some.and_then(|v| Some(v * 10)), Some(20));
        assert_eq!(none.or(Some(9)), Some(9));
        assert_eq!(none.or_else(|| Some(8)), Some(8));
        assert_eq!(some.xor(none), Some(2));
        assert_eq!(some.xor(Some(1)), None);
        assert_eq!(some.filter(|v| *v > 5), None);
        assert_eq!(some.map_or(0, |v| v + 1), 3);
        assert_eq!(none.map_or_else(|| -1, |v| v + 1), -1);
    }

    #[test]
    fn json_codec() {
        assert_eq!(serde_json::to_string(&None::<i32>).unwrap(), "null");
        assert_eq!(serde_json::to_string(&Some(1)).unwrap(), "1");
        assert_eq!(serde_json::from_str::<Option<i32>>("null").unwrap(), None);
        assert_eq!(serde_json::from_str::<Option<i32>>("7").unwrap(), Some(7));
        assert!(serde_json::from_str::<Option<i32>>("\"x\"").is_err());
    }
}
