//! JSON encoding of [`UndStruct`] values.
//!
//! Fields whose value is undefined are left out of the object; fields
//! missing from the input keep their default, which for `Und` and
//! `Elastic` is undefined. Unknown keys are ignored.
//!
//! Input is parsed into a [`serde_json::Value`] before fields are decoded,
//! so integer fields wider than 64 bits only accept values that fit in a
//! `u64` or `i64`.
//!
//! The free functions use [`MetaRegistry::global`]; the `*_in` variants
//! take a registry explicitly.

use alloc::borrow::ToOwned;
use alloc::boxed::Box;
use alloc::string::String;
use core::any::type_name;

use serde_json::{Map, Value};

use crate::error::{CodecError, json_kind};
use crate::info::FieldInfo;
use crate::registry::{MetaRegistry, UndStruct};

// -----------------------------------------------------------------------------
// Drivers

/// Encodes `value` as a JSON object.
pub fn encode_struct<S: UndStruct>(value: &S, registry: &MetaRegistry) -> Result<Value, CodecError> {
    let info = registry.get_or_build::<S>()?;
    let mut object = Map::new();
    for field in info.iter() {
        let codec = field.get(value);
        if codec.is_zero() {
            continue;
        }
        let encoded = codec
            .encode_json(field.hint(), registry)
            .map_err(|err| field_error::<S>(field, None, err))?;
        object.insert(field.wire_name().to_owned(), encoded);
    }
    Ok(Value::Object(object))
}

/// Decodes the JSON object `value` into the fields of `target`.
///
/// Fields absent from `value` are left untouched.
pub fn decode_into<S: UndStruct>(
    target: &mut S,
    value: &Value,
    registry: &MetaRegistry,
) -> Result<(), CodecError> {
    let info = registry.get_or_build::<S>()?;
    let Value::Object(object) = value else {
        return Err(CodecError::ExpectedObject {
            type_path: type_name::<S>(),
            found: json_kind(value),
        });
    };
    for (key, item) in object {
        let Some(field) = info.field(key) else {
            log::trace!("`{}`: ignoring unknown key `{key}`", info.type_path());
            continue;
        };
        field
            .get_mut(target)
            .decode_json(item, field.hint(), registry)
            .map_err(|err| field_error::<S>(field, Some(item), err))?;
    }
    Ok(())
}

fn field_error<S>(field: &FieldInfo<S>, value: Option<&Value>, err: CodecError) -> CodecError {
    CodecError::Field {
        type_path: type_name::<S>(),
        field: field.wire_name(),
        snippet: crate::cfg::debug! {
            if { value.map(snippet) } else { { let _ = value; None } }
        },
        source: Box::new(err),
    }
}

#[cfg_attr(
    not(all(debug_assertions, feature = "debug")),
    expect(dead_code, reason = "only used by debug builds")
)]
fn snippet(value: &Value) -> String {
    const LIMIT: usize = 32;
    let text = value.to_string();
    match text.char_indices().nth(LIMIT) {
        Some((end, _)) => alloc::format!("{}...", &text[..end]),
        None => text,
    }
}

// -----------------------------------------------------------------------------
// Entry points

pub fn to_value<S: UndStruct>(value: &S) -> Result<Value, CodecError> {
    encode_struct(value, MetaRegistry::global())
}

pub fn to_string<S: UndStruct>(value: &S) -> Result<String, CodecError> {
    to_string_in(value, MetaRegistry::global())
}

pub fn to_string_in<S: UndStruct>(value: &S, registry: &MetaRegistry) -> Result<String, CodecError> {
    registry.encode_json(value)
}

pub fn from_value<S: UndStruct + Default>(value: &Value) -> Result<S, CodecError> {
    from_value_in(value, MetaRegistry::global())
}

pub fn from_value_in<S: UndStruct + Default>(
    value: &Value,
    registry: &MetaRegistry,
) -> Result<S, CodecError> {
    let mut target = S::default();
    decode_into(&mut target, value, registry)?;
    Ok(target)
}

pub fn from_str<S: UndStruct + Default>(text: &str) -> Result<S, CodecError> {
    from_str_in(text, MetaRegistry::global())
}

pub fn from_str_in<S: UndStruct + Default>(
    text: &str,
    registry: &MetaRegistry,
) -> Result<S, CodecError> {
    registry.decode_json(text)
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{decode_into, from_str_in, from_value_in, to_string_in};
    use crate::info::{CodecHint, FieldInfo, StructInfo};
    use crate::{CodecError, MetaError, MetaRegistry, UndStruct};
    use serde_json::json;
    use und_types::{Elastic, Und};

    #[derive(Debug, Default, PartialEq)]
    struct Profile {
        id: u32,
        name: Und<String>,
        emails: Elastic<String>,
        age: Und<u8>,
        note: Option<String>,
    }

    impl UndStruct for Profile {
        fn build_info(registry: &MetaRegistry) -> Result<StructInfo<Self>, MetaError> {
            StructInfo::builder(registry, "profile")
                .field(FieldInfo::new("id", |p: &Profile| &p.id, |p| &mut p.id))
                .field(FieldInfo::new("name", |p: &Profile| &p.name, |p| &mut p.name))
                .field(FieldInfo::new("emails", |p: &Profile| &p.emails, |p| &mut p.emails))
                .field(
                    FieldInfo::new("age", |p: &Profile| &p.age, |p| &mut p.age)
                        .with_hint(CodecHint::String),
                )
                .field(FieldInfo::new("note", |p: &Profile| &p.note, |p| &mut p.note))
                .build()
        }
    }

    #[test]
    fn undefined_fields_are_omitted() {
        let registry = MetaRegistry::new();
        let text = to_string_in(&Profile::default(), &registry).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({ "id": 0, "note": null }));

        let profile = Profile {
            id: 7,
            name: Und::Null,
            emails: Elastic::from_value(String::from("a@b")),
            age: Und::Defined(30),
            note: Some(String::from("hi")),
        };
        let value = super::encode_struct(&profile, &registry).unwrap();
        assert_eq!(
            value,
            json!({
                "id": 7,
                "name": null,
                "emails": ["a@b"],
                "age": "30",
                "note": "hi",
            })
        );
        assert_eq!(from_value_in::<Profile>(&value, &registry).unwrap(), profile);
    }

    #[test]
    fn missing_fields_stay_undefined() {
        let registry = MetaRegistry::new();
        let profile: Profile =
            from_str_in(r#"{"emails":"x","unknown":[1,2]}"#, &registry).unwrap();
        assert!(profile.name.is_undefined());
        assert!(profile.age.is_undefined());
        assert_eq!(profile.emails.len(), 1);

        let profile: Profile = from_str_in(r#"{"emails":null,"age":null}"#, &registry).unwrap();
        assert!(profile.emails.is_null());
        assert!(profile.age.is_null());
    }

    #[test]
    fn errors_name_the_field() {
        let registry = MetaRegistry::new();
        let err = from_str_in::<Profile>(r#"{"age":30}"#, &registry).unwrap_err();
        assert_eq!(err.field_path(), ["age"]);
        assert!(matches!(err.root(), CodecError::HintMismatch { found: "a number" }));

        let err = from_str_in::<Profile>(r#"{"id":"seven"}"#, &registry).unwrap_err();
        assert!(matches!(err.root(), CodecError::Json(_)));
        assert!(err.to_string().contains("`id`"));

        let mut profile = Profile::default();
        let err = decode_into(&mut profile, &json!([1]), &registry).unwrap_err();
        assert!(matches!(err, CodecError::ExpectedObject { found: "an array", .. }));
    }

    #[test]
    fn string_values_roundtrip() {
        let registry = MetaRegistry::new();
        let profile: Profile = from_str_in(r#"{"age":"42","name":"n"}"#, &registry).unwrap();
        assert_eq!(profile.age, Und::Defined(42));
        assert_eq!(profile.name.get().map(String::as_str), Some("n"));
    }
}
