use alloc::boxed::Box;
use core::fmt;
use core::marker::PhantomData;

use serde_core::de::{Deserialize, Deserializer, Error, Visitor};
use serde_core::ser::{Serialize, Serializer};

use crate::{OptionExt, State};

// -----------------------------------------------------------------------------
// Und

/// A value that is absent, explicitly `null`, or defined.
///
/// `Und<T>` carries exactly the three reachable states of an
/// `Option<Option<T>>`; the fourth combination cannot be built.
/// The default value is [`Und::Undefined`].
///
/// On the wire both `Undefined` and `Null` serialize as `null`. Decoding
/// never yields `Undefined`: a decoder only reaches a field that is
/// textually present. Keep a field `Undefined` by omitting it:
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use und_types::Und;
///
/// #[derive(Serialize, Deserialize, Default, Debug, PartialEq)]
/// struct User {
///     #[serde(default, skip_serializing_if = "Und::is_undefined")]
///     nickname: Und<String>,
/// }
///
/// let absent: User = serde_json::from_str("{}").unwrap();
/// assert!(absent.nickname.is_undefined());
///
/// let null: User = serde_json::from_str(r#"{"nickname":null}"#).unwrap();
/// assert!(null.nickname.is_null());
///
/// assert_eq!(serde_json::to_string(&absent).unwrap(), "{}");
/// assert_eq!(serde_json::to_string(&null).unwrap(), r#"{"nickname":null}"#);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Und<T> {
    /// Absent.
    #[default]
    Undefined,
    /// Present, explicitly empty.
    Null,
    /// Present with a value.
    Defined(T),
}

impl<T> Und<T> {
    #[inline]
    pub const fn defined(value: T) -> Self {
        Und::Defined(value)
    }

    #[inline]
    pub const fn null() -> Self {
        Und::Null
    }

    #[inline]
    pub const fn undefined() -> Self {
        Und::Undefined
    }

    /// Builds from the nested-option form.
    ///
    /// `None` is undefined, `Some(None)` is null, `Some(Some(v))` is defined.
    #[inline]
    pub fn from_option(opt: Option<Option<T>>) -> Self {
        match opt {
            None => Und::Undefined,
            Some(None) => Und::Null,
            Some(Some(v)) => Und::Defined(v),
        }
    }

    /// Returns the nested-option form, see [`Und::from_option`].
    #[inline]
    pub fn into_option(self) -> Option<Option<T>> {
        match self {
            Und::Undefined => None,
            Und::Null => Some(None),
            Und::Defined(v) => Some(Some(v)),
        }
    }

    /// `None` becomes undefined, anything else a defined copy.
    #[inline]
    pub fn from_pointer(p: Option<&T>) -> Self
    where
        T: Clone,
    {
        match p {
            None => Und::Undefined,
            Some(v) => Und::Defined(v.clone()),
        }
    }

    #[inline]
    pub const fn is_defined(&self) -> bool {
        matches!(self, Und::Defined(_))
    }

    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Und::Null)
    }

    #[inline]
    pub const fn is_undefined(&self) -> bool {
        matches!(self, Und::Undefined)
    }

    /// Alias of [`Und::is_undefined`], the hook used for field omission.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.is_undefined()
    }

    #[inline]
    pub const fn state(&self) -> State {
        match self {
            Und::Undefined => State::Undefined,
            Und::Null => State::Null,
            Und::Defined(_) => State::Defined,
        }
    }

    #[inline]
    pub const fn get(&self) -> Option<&T> {
        match self {
            Und::Defined(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self {
            Und::Defined(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub const fn as_ref(&self) -> Und<&T> {
        match self {
            Und::Undefined => Und::Undefined,
            Und::Null => Und::Null,
            Und::Defined(v) => Und::Defined(v),
        }
    }

    /// Returns the defined value, or `T::default()` otherwise.
    #[inline]
    pub fn value(&self) -> T
    where
        T: Clone + Default,
    {
        self.get().cloned().unwrap_or_default()
    }

    /// Returns a private copy of the defined value.
    #[inline]
    pub fn pointer(&self) -> Option<Box<T>>
    where
        T: Clone,
    {
        self.get().cloned().pointer()
    }

    /// Pointer-shaped view that keeps all three states apart.
    ///
    /// - `Undefined` => `None`
    /// - `Null` => `Some(None)`
    /// - `Defined(v)` => `Some(Some(copy of v))`
    ///
    /// ```
    /// use und_types::Und;
    ///
    /// assert_eq!(Und::<i32>::Undefined.double_pointer(), None);
    /// assert_eq!(Und::<i32>::Null.double_pointer(), Some(None));
    /// assert_eq!(Und::Defined(3).double_pointer(), Some(Some(Box::new(3))));
    /// ```
    #[inline]
    pub fn double_pointer(&self) -> Option<Option<Box<T>>>
    where
        T: Clone,
    {
        match self {
            Und::Undefined => None,
            Und::Null => Some(None),
            Und::Defined(v) => Some(Some(Box::new(v.clone()))),
        }
    }

    /// Applies `f` to the nested-option form.
    ///
    /// The state is kept unless `f` changes the shape on purpose.
    #[inline]
    pub fn map(self, f: impl FnOnce(Option<Option<T>>) -> Option<Option<T>>) -> Self {
        Self::from_option(f(self.into_option()))
    }

    /// Maps a defined value, keeping `Undefined` and `Null` as they are.
    #[inline]
    pub fn map_value<U>(self, f: impl FnOnce(T) -> U) -> Und<U> {
        match self {
            Und::Undefined => Und::Undefined,
            Und::Null => Und::Null,
            Und::Defined(v) => Und::Defined(f(v)),
        }
    }

    /// See [`OptionExt::equal`]; the same resolution order applies.
    #[inline]
    pub fn equal(&self, other: &Self) -> bool
    where
        T: PartialEq,
    {
        match (self, other) {
            (Und::Defined(l), Und::Defined(r)) => l == r,
            (l, r) => l.state() == r.state(),
        }
    }
}

impl<T> From<Option<Option<T>>> for Und<T> {
    #[inline]
    fn from(value: Option<Option<T>>) -> Self {
        Self::from_option(value)
    }
}

impl<T> From<Und<T>> for Option<Option<T>> {
    #[inline]
    fn from(value: Und<T>) -> Self {
        value.into_option()
    }
}

// -----------------------------------------------------------------------------
// serde

impl<T: Serialize> Serialize for Und<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Und::Defined(v) => serializer.serialize_some(v),
            Und::Null | Und::Undefined => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Und<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_option(UndVisitor(PhantomData))
    }
}

struct UndVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for UndVisitor<T> {
    type Value = Und<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("null or a value")
    }

    fn visit_none<E: Error>(self) -> Result<Self::Value, E> {
        Ok(Und::Null)
    }

    fn visit_unit<E: Error>(self) -> Result<Self::Value, E> {
        Ok(Und::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Und::Defined)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::Und;
    use crate::State;
    use alloc::string::String;
    use alloc::vec;
    use alloc::vec::Vec;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone)]
    struct Ring(Box<i32>);

    impl PartialEq for Ring {
        fn eq(&self, other: &Self) -> bool {
            *self.0 % 30 == *other.0 % 30
        }
    }

    #[derive(Serialize, Deserialize, Default, Debug, PartialEq)]
    struct Sample {
        #[serde(default, skip_serializing_if = "Und::is_undefined")]
        foo: Und<i32>,
        #[serde(default, skip_serializing_if = "Und::is_undefined")]
        bar: Und<Vec<String>>,
    }

    #[test]
    fn states() {
        let cases = [Und::Undefined, Und::Null, Und::Defined(1)];
        for und in cases {
            let flags = [und.is_undefined(), und.is_null(), und.is_defined()];
            assert_eq!(flags.iter().filter(|f| **f).count(), 1);
            assert_eq!(und.is_zero(), und.is_undefined());
        }
        assert_eq!(Und::<u8>::default(), Und::Undefined);
        assert_eq!(Und::Defined(1).state(), State::Defined);
        assert_eq!(Und::<u8>::Null.state().as_str(), "null");
    }

    #[test]
    fn accessors() {
        assert_eq!(Und::Defined(7).value(), 7);
        assert_eq!(Und::<i32>::Null.value(), 0);
        assert_eq!(Und::<i32>::Undefined.value(), 0);

        assert_eq!(Und::Defined(7).pointer(), Some(Box::new(7)));
        assert_eq!(Und::<i32>::Null.pointer(), None);

        assert_eq!(Und::from_pointer(Some(&2)), Und::Defined(2));
        assert_eq!(Und::<i32>::from_pointer(None), Und::Undefined);

        let mut und = Und::Defined(String::from("a"));
        und.get_mut().unwrap().push('b');
        assert_eq!(und.get().map(String::as_str), Some("ab"));
        assert_eq!(und.as_ref(), Und::Defined(&String::from("ab")));
    }

    #[test]
    fn nested_option_form() {
        assert_eq!(Und::<i32>::from_option(None), Und::Undefined);
        assert_eq!(Und::<i32>::from_option(Some(None)), Und::Null);
        assert_eq!(Und::from_option(Some(Some(3))), Und::Defined(3));
        assert_eq!(Und::Defined(3).into_option(), Some(Some(3)));

        let nulled = Und::Defined(3).map(|o| o.map(|_| None));
        assert!(nulled.is_null());
        let kept = Und::<i32>::Null.map(|o| o);
        assert!(kept.is_null());

        assert_eq!(Und::Defined(2).map_value(|v| v * 2), Und::Defined(4));
        assert_eq!(Und::<i32>::Null.map_value(|v| v * 2), Und::Null);
    }

    #[test]
    fn equality() {
        assert!(Und::<i32>::Undefined.equal(&Und::Undefined));
        assert!(!Und::<i32>::Undefined.equal(&Und::Null));
        assert!(!Und::Defined(1).equal(&Und::Undefined));
        assert!(!Und::Null.equal(&Und::Defined(1)));
        assert!(Und::Defined(Ring(Box::new(1))).equal(&Und::Defined(Ring(Box::new(31)))));
        assert!(!Und::Defined(Ring(Box::new(1))).equal(&Und::Defined(Ring(Box::new(2)))));
        assert_eq!(
            Und::Defined(vec![String::from("foo")]),
            Und::Defined(vec![String::from("foo")])
        );
    }

    #[test]
    fn json_codec() {
        assert_eq!(serde_json::to_string(&Und::<i32>::Undefined).unwrap(), "null");
        assert_eq!(serde_json::to_string(&Und::<i32>::Null).unwrap(), "null");
        assert_eq!(serde_json::to_string(&Und::Defined(5)).unwrap(), "5");

        assert_eq!(serde_json::from_str::<Und<i32>>("null").unwrap(), Und::Null);
        assert_eq!(serde_json::from_str::<Und<i32>>("5").unwrap(), Und::Defined(5));
        assert!(serde_json::from_str::<Und<i32>>("\"five\"").is_err());
    }

    #[test]
    fn field_omission() {
        let sample: Sample = serde_json::from_str("{}").unwrap();
        assert_eq!(sample, Sample::default());
        assert_eq!(serde_json::to_string(&sample).unwrap(), "{}");

        let sample: Sample = serde_json::from_str(r#"{"foo":null,"bar":["x"]}"#).unwrap();
        assert!(sample.foo.is_null());
        assert_eq!(sample.bar, Und::Defined(vec![String::from("x")]));
        assert_eq!(
            serde_json::to_string(&sample).unwrap(),
            r#"{"foo":null,"bar":["x"]}"#
        );
    }

    #[test]
    fn ron_codec() {
        let text = ron::to_string(&Und::Defined(5)).unwrap();
        assert_eq!(ron::from_str::<Und<i32>>(&text).unwrap(), Und::Defined(5));

        let text = ron::to_string(&Und::<i32>::Null).unwrap();
        assert_eq!(ron::from_str::<Und<i32>>(&text).unwrap(), Und::Null);
    }

    mod props {
        use super::super::Und;
        use proptest::prelude::*;

        fn und_strategy() -> impl Strategy<Value = Und<i64>> {
            prop_oneof![
                Just(Und::Undefined),
                Just(Und::Null),
                any::<i64>().prop_map(Und::Defined),
            ]
        }

        proptest! {
            #[test]
            fn prop_exactly_one_state(und in und_strategy()) {
                let count = [und.is_undefined(), und.is_null(), und.is_defined()]
                    .into_iter()
                    .filter(|f| *f)
                    .count();
                prop_assert_eq!(count, 1);
            }

            #[test]
            fn prop_json_roundtrip(v in any::<i64>()) {
                let text = serde_json::to_string(&Und::Defined(v)).unwrap();
                prop_assert_eq!(serde_json::from_str::<Und<i64>>(&text).unwrap(), Und::Defined(v));
            }

            #[test]
            fn prop_decode_never_undefined(und in und_strategy()) {
                let text = serde_json::to_string(&und).unwrap();
                let back: Und<i64> = serde_json::from_str(&text).unwrap();
                prop_assert!(!back.is_undefined());
            }
        }
    }
}
