use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use serde_core::de::{Deserialize, DeserializeOwned, Deserializer, Error};
use serde_core::ser::{Serialize, Serializer};
use serde_json::Value;

use crate::{OptionExt, Options, State, Und};

// -----------------------------------------------------------------------------
// Elastic

/// Absent, null, a single value or an array of nullable values.
///
/// `Elastic<T>` is an [`Und`] over [`Options<T>`]. Real-world schemas
/// often accept either `"a"` or `["a", null, "b"]` for the same field;
/// `Elastic` reads both and always writes the array form.
///
/// The first element is the scalar projection used by [`value`],
/// [`pointer`] and [`first`].
///
/// The backing sequence is owned exclusively by this value. Views handed
/// out by [`as_options`] are shared borrows, so any mutation goes through
/// `&mut self` or a [`Clone`] first.
///
/// [`value`]: Elastic::value
/// [`pointer`]: Elastic::pointer
/// [`first`]: Elastic::first
/// [`as_options`]: Elastic::as_options
///
/// # Decoding
///
/// - `null` yields [`Elastic::null`].
/// - An array is read as `Options<T>`. If that fails the whole array is
///   read once more as a single `Option<T>`; this is the path taken when
///   `T` is array-shaped itself. When both fail the second error is
///   returned.
/// - Anything else is read as a single `Option<T>`.
///
/// The input is buffered into a [`serde_json::Value`] first, so only
/// self-describing formats can decode an `Elastic`. Integers outside the
/// `i64`/`u64` range become floats in that buffer, so `Elastic<u128>` and
/// `Elastic<i128>` only accept values that fit 64 bits.
///
/// ```
/// use und_types::Elastic;
///
/// let one: Elastic<i32> = serde_json::from_str("1").unwrap();
/// assert_eq!(one, Elastic::from_value(1));
///
/// let many: Elastic<i32> = serde_json::from_str("[1,null,3]").unwrap();
/// assert_eq!(many.len(), 3);
/// assert_eq!(serde_json::to_string(&many).unwrap(), "[1,null,3]");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Elastic<T>(Und<Options<T>>);

impl<T> Default for Elastic<T> {
    #[inline]
    fn default() -> Self {
        Self::undefined()
    }
}

impl<T> Elastic<T> {
    #[inline]
    pub const fn undefined() -> Self {
        Self(Und::Undefined)
    }

    #[inline]
    pub const fn null() -> Self {
        Self(Und::Null)
    }

    /// A one-element `Defined` sequence.
    #[inline]
    pub fn from_value(value: T) -> Self {
        Self(Und::Defined(vec![Some(value)]))
    }

    #[inline]
    pub fn from_values(values: impl IntoIterator<Item = T>) -> Self {
        Self(Und::Defined(values.into_iter().map(Some).collect()))
    }

    #[inline]
    pub fn from_options(options: impl IntoIterator<Item = Option<T>>) -> Self {
        Self(Und::Defined(options.into_iter().collect()))
    }

    /// `None` is undefined, anything else a one-element copy.
    #[inline]
    pub fn from_pointer(p: Option<&T>) -> Self
    where
        T: Clone,
    {
        match p {
            None => Self::undefined(),
            Some(v) => Self::from_value(v.clone()),
        }
    }

    /// Copies every pointee; `None` entries stay `None`.
    #[inline]
    pub fn from_pointers<'a>(ps: impl IntoIterator<Item = Option<&'a T>>) -> Self
    where
        T: Clone + 'a,
    {
        Self::from_options(ps.into_iter().map(|p| p.cloned()))
    }

    #[inline]
    pub const fn from_und(und: Und<Options<T>>) -> Self {
        Self(und)
    }

    #[inline]
    pub fn into_und(self) -> Und<Options<T>> {
        self.0
    }

    #[inline]
    pub const fn as_und(&self) -> &Und<Options<T>> {
        &self.0
    }

    #[inline]
    pub const fn is_defined(&self) -> bool {
        self.0.is_defined()
    }

    #[inline]
    pub const fn is_null(&self) -> bool {
        self.0.is_null()
    }

    #[inline]
    pub const fn is_undefined(&self) -> bool {
        self.0.is_undefined()
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0.is_undefined()
    }

    #[inline]
    pub const fn state(&self) -> State {
        self.0.state()
    }

    /// Number of elements, `0` unless `Defined`.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.get().map_or(0, Vec::len)
    }

    /// `true` when [`len`](Elastic::len) is `0`, whatever the state.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The held value of the first element.
    #[inline]
    pub fn first(&self) -> Option<&T> {
        self.0.get().and_then(|v| v.first()).and_then(Option::as_ref)
    }

    /// First element, or `T::default()`.
    #[inline]
    pub fn value(&self) -> T
    where
        T: Clone + Default,
    {
        self.first().cloned().unwrap_or_default()
    }

    /// A private copy of the first element.
    #[inline]
    pub fn pointer(&self) -> Option<Box<T>>
    where
        T: Clone,
    {
        self.first().map(|v| Box::new(v.clone()))
    }

    /// Every element, `None` entries replaced by `T::default()`.
    ///
    /// Returns `None` unless `Defined`.
    pub fn values(&self) -> Option<Vec<T>>
    where
        T: Clone + Default,
    {
        self.0
            .get()
            .map(|options| options.iter().map(OptionExt::value).collect())
    }

    /// Private copies of every element. Returns `None` unless `Defined`.
    pub fn pointers(&self) -> Option<Vec<Option<Box<T>>>>
    where
        T: Clone,
    {
        self.0
            .get()
            .map(|options| options.iter().map(OptionExt::pointer).collect())
    }

    /// Read-only view of the backing sequence.
    #[inline]
    pub fn as_options(&self) -> Option<&[Option<T>]> {
        self.0.get().map(Vec::as_slice)
    }

    /// Iterates the elements; empty unless `Defined`.
    pub fn iter(&self) -> impl Iterator<Item = Option<&T>> {
        self.as_options()
            .unwrap_or_default()
            .iter()
            .map(Option::as_ref)
    }

    /// Appends one element.
    ///
    /// `Undefined` becomes a one-element sequence and `Null` keeps its
    /// place as a leading `None`.
    pub fn push(&mut self, item: Option<T>) {
        if let Und::Defined(options) = &mut self.0 {
            options.push(item);
        } else if self.0.is_null() {
            self.0 = Und::Defined(vec![None, item]);
        } else {
            self.0 = Und::Defined(vec![item]);
        }
    }

    /// [`push`](Elastic::push) for each item.
    pub fn extend_options(&mut self, items: impl IntoIterator<Item = Option<T>>) {
        for item in items {
            self.push(item);
        }
    }

    /// Applies `f` to the underlying [`Und`].
    #[inline]
    pub fn map_und(self, f: impl FnOnce(Und<Options<T>>) -> Und<Options<T>>) -> Self {
        Self(f(self.0))
    }

    /// Maps every held value; `None` elements pass through untouched.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Elastic<U> {
        Elastic(
            self.0
                .map_value(|options| options.into_iter().map(|o| o.map(&mut f)).collect()),
        )
    }

    /// Element-wise [`OptionExt::equal`].
    pub fn equal(&self, other: &Self) -> bool
    where
        T: PartialEq,
    {
        match (self.as_options(), other.as_options()) {
            (Some(l), Some(r)) => l.len() == r.len() && l.iter().zip(r).all(|(l, r)| l.equal(r)),
            _ => self.state() == other.state(),
        }
    }
}

impl<T> From<Und<Options<T>>> for Elastic<T> {
    #[inline]
    fn from(value: Und<Options<T>>) -> Self {
        Self(value)
    }
}

impl<T> From<Elastic<T>> for Und<Options<T>> {
    #[inline]
    fn from(value: Elastic<T>) -> Self {
        value.0
    }
}

// -----------------------------------------------------------------------------
// serde

impl<T: Serialize> Serialize for Elastic<T> {
    #[inline]
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Elastic<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_json_value(&value).map_err(D::Error::custom)
    }
}

impl<T: DeserializeOwned> Elastic<T> {
    /// Decodes an already parsed JSON value, see the type docs.
    pub fn from_json_value(value: &Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::Null => Ok(Self::null()),
            Value::Array(_) => match Options::<T>::deserialize(value) {
                Ok(options) => Ok(Self::from_options(options)),
                Err(err) => {
                    log::trace!("elastic array decode failed, retrying as one value: {err}");
                    Option::<T>::deserialize(value).map(|o| Self::from_options([o]))
                }
            },
            other => Option::<T>::deserialize(other).map(|o| Self::from_options([o])),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::Elastic;
    use crate::{State, Und};
    use alloc::string::String;
    use alloc::vec;
    use alloc::vec::Vec;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone)]
    struct Ring(i32);

    impl PartialEq for Ring {
        fn eq(&self, other: &Self) -> bool {
            self.0 % 30 == other.0 % 30
        }
    }

    #[derive(Serialize, Deserialize, Default, Debug, PartialEq)]
    struct Holder {
        #[serde(default, skip_serializing_if = "Elastic::is_undefined")]
        foo: Elastic<i32>,
    }

    #[test]
    fn constructors() {
        assert!(Elastic::<i32>::default().is_undefined());
        assert!(Elastic::<i32>::null().is_null());
        assert_eq!(Elastic::from_value(1).as_options(), Some(&[Some(1)][..]));
        assert_eq!(Elastic::from_values([1, 2]).len(), 2);
        assert_eq!(
            Elastic::from_options([None, Some(2)]).as_options(),
            Some(&[None, Some(2)][..])
        );
        assert!(Elastic::<i32>::from_pointer(None).is_undefined());
        assert_eq!(Elastic::from_pointer(Some(&4)), Elastic::from_value(4));
        assert_eq!(
            Elastic::from_pointers([Some(&1), None]),
            Elastic::from_options([Some(1), None])
        );
        assert_eq!(Elastic::from_values(Vec::<i32>::new()).state(), State::Defined);
    }

    #[test]
    fn accessors() {
        let elastic = Elastic::from_options([None, Some(2), Some(3)]);
        assert_eq!(elastic.first(), None);
        assert_eq!(elastic.value(), 0);
        assert_eq!(elastic.pointer(), None);
        assert_eq!(elastic.values(), Some(vec![0, 2, 3]));
        assert_eq!(
            elastic.pointers(),
            Some(vec![None, Some(Box::new(2)), Some(Box::new(3))])
        );
        assert_eq!(elastic.iter().collect::<Vec<_>>(), [None, Some(&2), Some(&3)]);

        let elastic = Elastic::from_values([5, 6]);
        assert_eq!(elastic.value(), 5);
        assert_eq!(elastic.pointer(), Some(Box::new(5)));

        for empty in [Elastic::<i32>::undefined(), Elastic::null()] {
            assert_eq!(empty.len(), 0);
            assert!(empty.is_empty());
            assert_eq!(empty.values(), None);
            assert_eq!(empty.pointers(), None);
            assert_eq!(empty.iter().count(), 0);
        }
    }

    #[test]
    fn push_keeps_null_position() {
        let mut elastic = Elastic::undefined();
        elastic.push(Some(1));
        assert_eq!(elastic, Elastic::from_value(1));

        let mut elastic = Elastic::null();
        elastic.extend_options([Some(1), None]);
        assert_eq!(elastic, Elastic::from_options([None, Some(1), None]));
    }

    #[test]
    fn map_skips_absent_elements() {
        let mapped = Elastic::from_options([Some(1), None, Some(3)]).map(|v| v * 10);
        assert_eq!(mapped, Elastic::from_options([Some(10), None, Some(30)]));
        assert!(Elastic::<i32>::null().map(|v| v + 1).is_null());

        let nulled = Elastic::from_value(1).map_und(|_| Und::Null);
        assert!(nulled.is_null());
    }

    #[test]
    fn equality() {
        let l = Elastic::from_values([Ring(1), Ring(2)]);
        let r = Elastic::from_values([Ring(31), Ring(62)]);
        assert!(l.equal(&r));
        assert_eq!(l, r);
        assert!(!l.equal(&Elastic::from_values([Ring(1)])));
        assert!(!l.equal(&Elastic::from_options([Some(Ring(1)), None])));
        assert!(Elastic::<Ring>::null().equal(&Elastic::null()));
        assert!(!Elastic::<Ring>::null().equal(&Elastic::undefined()));
    }

    #[test]
    fn clone_is_deep() {
        let original = Elastic::from_values([String::from("a")]);
        let mut copy = original.clone();
        copy.push(Some(String::from("b")));
        assert_eq!(original.len(), 1);
        assert_eq!(copy.len(), 2);
    }

    #[test]
    fn decode_scalar_or_array() {
        let e: Elastic<i32> = serde_json::from_str("5").unwrap();
        assert_eq!(e, Elastic::from_value(5));

        let e: Elastic<i32> = serde_json::from_str("[1,2,3]").unwrap();
        assert_eq!(e, Elastic::from_values([1, 2, 3]));

        let e: Elastic<i32> = serde_json::from_str("[]").unwrap();
        assert!(e.is_defined());
        assert!(e.is_empty());

        let e: Elastic<i32> = serde_json::from_str("null").unwrap();
        assert!(e.is_null());

        let h: Holder = serde_json::from_str("{}").unwrap();
        assert!(h.foo.is_undefined());
        assert_eq!(h.foo.len(), 0);
    }

    #[test]
    fn decode_nested_array_falls_back() {
        let e: Elastic<Vec<i32>> = serde_json::from_str("[[1,2],[3]]").unwrap();
        assert_eq!(e, Elastic::from_values([vec![1, 2], vec![3]]));

        let e: Elastic<Vec<i32>> = serde_json::from_str("[1,2]").unwrap();
        assert_eq!(e, Elastic::from_value(vec![1, 2]));
    }

    #[test]
    fn decode_errors_propagate() {
        assert!(serde_json::from_str::<Elastic<i32>>("\"x\"").is_err());
        assert!(serde_json::from_str::<Elastic<i32>>("[\"x\"]").is_err());
        assert!(serde_json::from_str::<Holder>(r#"{"foo":{}}"#).is_err());
    }

    #[test]
    fn wide_integers_limited_to_64_bits() {
        let max: Elastic<u128> = serde_json::from_str("18446744073709551615").unwrap();
        assert_eq!(max.value(), u128::from(u64::MAX));

        assert!(serde_json::from_str::<Elastic<u128>>("18446744073709551616").is_err());
        assert!(serde_json::from_str::<Und<u128>>("18446744073709551616").is_ok());
    }

    #[test]
    fn encode_always_array() {
        assert_eq!(serde_json::to_string(&Elastic::from_value(1)).unwrap(), "[1]");
        assert_eq!(
            serde_json::to_string(&Elastic::from_options([Some(1), None])).unwrap(),
            "[1,null]"
        );
        assert_eq!(serde_json::to_string(&Elastic::<i32>::null()).unwrap(), "null");

        let h = Holder::default();
        assert_eq!(serde_json::to_string(&h).unwrap(), "{}");
        let h = Holder { foo: Elastic::null() };
        assert_eq!(serde_json::to_string(&h).unwrap(), r#"{"foo":null}"#);
    }

    mod props {
        use super::super::Elastic;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn prop_roundtrip(items in proptest::collection::vec(proptest::option::of(any::<i32>()), 0..8)) {
                let elastic = Elastic::from_options(items.clone());
                let text = serde_json::to_string(&elastic).unwrap();
                let back: Elastic<i32> = serde_json::from_str(&text).unwrap();
                prop_assert_eq!(back.len(), items.len());
                prop_assert_eq!(back, elastic);
            }
        }
    }
}
