//! The per-field codec protocol.

use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec::Vec;

use roxmltree::Node;
use serde_core::de::{Deserialize, DeserializeOwned};
use serde_core::ser::Serialize;
use serde_json::Value;
use und_types::xml::{self, XmlValue, XmlWriter};
use und_types::{Elastic, Und};

use crate::error::CodecError;
use crate::info::{CodecHint, FieldKind};
use crate::registry::MetaRegistry;

// -----------------------------------------------------------------------------
// Traits

/// Encodes and decodes one struct field.
///
/// Object safe: the struct drivers reach every field as
/// `&dyn FieldCodec` through its [`FieldInfo`](crate::info::FieldInfo).
pub trait FieldCodec {
    /// Whether the field is left out of the output entirely.
    fn is_zero(&self) -> bool {
        false
    }

    fn encode_json(&self, hint: CodecHint, registry: &MetaRegistry) -> Result<Value, CodecError>;

    fn decode_json(
        &mut self,
        value: &Value,
        hint: CodecHint,
        registry: &MetaRegistry,
    ) -> Result<(), CodecError>;

    /// Writes zero or more `<name>` elements.
    fn encode_xml(
        &self,
        name: &str,
        w: &mut XmlWriter,
        registry: &MetaRegistry,
    ) -> Result<(), CodecError>;

    /// Reads one `<name>` element. Called once per matching element.
    fn decode_xml(&mut self, node: Node<'_, '_>, registry: &MetaRegistry)
    -> Result<(), CodecError>;
}

/// Static facts about a [`FieldCodec`] type.
pub trait Codec: FieldCodec + 'static {
    const KIND: FieldKind;
    /// Whether `#[und(string)]` is accepted.
    const STRING_HINT: bool = false;
}

// -----------------------------------------------------------------------------
// Helpers

fn encode_value<T: Serialize + ?Sized>(value: &T, hint: CodecHint) -> Result<Value, CodecError> {
    hint.apply(serde_json::to_value(value)?)
}

fn decode_value<T: DeserializeOwned>(value: &Value, hint: CodecHint) -> Result<T, CodecError> {
    let value = hint.undo(value)?;
    Ok(T::deserialize(&*value)?)
}

// -----------------------------------------------------------------------------
// Scalars

macro_rules! impl_scalar_codec {
    ($($ty:ty),* $(,)?) => {$(
        impl FieldCodec for $ty {
            fn encode_json(&self, hint: CodecHint, _: &MetaRegistry) -> Result<Value, CodecError> {
                encode_value(self, hint)
            }

            fn decode_json(
                &mut self,
                value: &Value,
                hint: CodecHint,
                _: &MetaRegistry,
            ) -> Result<(), CodecError> {
                *self = decode_value(value, hint)?;
                Ok(())
            }

            fn encode_xml(
                &self,
                name: &str,
                w: &mut XmlWriter,
                _: &MetaRegistry,
            ) -> Result<(), CodecError> {
                w.element(name, &xml::scalar_text(self)?);
                Ok(())
            }

            fn decode_xml(&mut self, node: Node<'_, '_>, _: &MetaRegistry) -> Result<(), CodecError> {
                *self = xml::read_text(node)?;
                Ok(())
            }
        }

        impl Codec for $ty {
            const KIND: FieldKind = FieldKind::Plain;
            const STRING_HINT: bool = true;
        }
    )*};
}

impl_scalar_codec!(
    bool, char, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, String,
);

/// Lists of scalars; repeated XML elements accumulate.
impl<T: Serialize + DeserializeOwned + 'static> FieldCodec for Vec<T> {
    fn encode_json(&self, _: CodecHint, _: &MetaRegistry) -> Result<Value, CodecError> {
        Ok(serde_json::to_value(self)?)
    }

    fn decode_json(&mut self, value: &Value, _: CodecHint, _: &MetaRegistry) -> Result<(), CodecError> {
        *self = Vec::<T>::deserialize(value)?;
        Ok(())
    }

    fn encode_xml(&self, name: &str, w: &mut XmlWriter, _: &MetaRegistry) -> Result<(), CodecError> {
        for item in self {
            w.element(name, &xml::scalar_text(item)?);
        }
        Ok(())
    }

    fn decode_xml(&mut self, node: Node<'_, '_>, _: &MetaRegistry) -> Result<(), CodecError> {
        self.push(xml::read_text(node)?);
        Ok(())
    }
}

impl<T: Serialize + DeserializeOwned + 'static> Codec for Vec<T> {
    const KIND: FieldKind = FieldKind::Plain;
}

// -----------------------------------------------------------------------------
// Presence types

impl<T: Serialize + DeserializeOwned + 'static> FieldCodec for Option<T> {
    fn encode_json(&self, hint: CodecHint, _: &MetaRegistry) -> Result<Value, CodecError> {
        match self {
            Some(v) => encode_value(v, hint),
            None => Ok(Value::Null),
        }
    }

    fn decode_json(&mut self, value: &Value, hint: CodecHint, _: &MetaRegistry) -> Result<(), CodecError> {
        *self = match value {
            Value::Null => None,
            value => Some(decode_value(value, hint)?),
        };
        Ok(())
    }

    fn encode_xml(&self, name: &str, w: &mut XmlWriter, _: &MetaRegistry) -> Result<(), CodecError> {
        Ok(self.write_xml(name, w)?)
    }

    fn decode_xml(&mut self, node: Node<'_, '_>, _: &MetaRegistry) -> Result<(), CodecError> {
        Ok(self.read_xml(node)?)
    }
}

impl<T: Serialize + DeserializeOwned + 'static> Codec for Option<T> {
    const KIND: FieldKind = FieldKind::Presence;
    const STRING_HINT: bool = true;
}

impl<T: Serialize + DeserializeOwned + 'static> FieldCodec for Und<T> {
    #[inline]
    fn is_zero(&self) -> bool {
        self.is_undefined()
    }

    fn encode_json(&self, hint: CodecHint, _: &MetaRegistry) -> Result<Value, CodecError> {
        match self {
            Und::Defined(v) => encode_value(v, hint),
            Und::Null | Und::Undefined => Ok(Value::Null),
        }
    }

    fn decode_json(&mut self, value: &Value, hint: CodecHint, _: &MetaRegistry) -> Result<(), CodecError> {
        *self = match value {
            Value::Null => Und::Null,
            value => Und::Defined(decode_value(value, hint)?),
        };
        Ok(())
    }

    fn encode_xml(&self, name: &str, w: &mut XmlWriter, _: &MetaRegistry) -> Result<(), CodecError> {
        Ok(self.write_xml(name, w)?)
    }

    fn decode_xml(&mut self, node: Node<'_, '_>, _: &MetaRegistry) -> Result<(), CodecError> {
        Ok(self.read_xml(node)?)
    }
}

impl<T: Serialize + DeserializeOwned + 'static> Codec for Und<T> {
    const KIND: FieldKind = FieldKind::TriState;
    const STRING_HINT: bool = true;
}

impl<T: Serialize + DeserializeOwned + 'static> FieldCodec for Elastic<T> {
    #[inline]
    fn is_zero(&self) -> bool {
        self.is_undefined()
    }

    fn encode_json(&self, hint: CodecHint, _: &MetaRegistry) -> Result<Value, CodecError> {
        let Some(items) = self.as_options() else {
            return Ok(Value::Null);
        };
        items
            .iter()
            .map(|item| match item {
                Some(v) => encode_value(v, hint),
                None => Ok(Value::Null),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    fn decode_json(&mut self, value: &Value, hint: CodecHint, _: &MetaRegistry) -> Result<(), CodecError> {
        let value = match (hint, value) {
            (CodecHint::None, value) => Cow::Borrowed(value),
            (hint, Value::Array(items)) => Cow::Owned(Value::Array(
                items
                    .iter()
                    .map(|item| hint.undo(item).map(Cow::into_owned))
                    .collect::<Result<_, _>>()?,
            )),
            (hint, value) => hint.undo(value)?,
        };
        *self = Elastic::from_json_value(&value)?;
        Ok(())
    }

    fn encode_xml(&self, name: &str, w: &mut XmlWriter, _: &MetaRegistry) -> Result<(), CodecError> {
        Ok(self.write_xml(name, w)?)
    }

    fn decode_xml(&mut self, node: Node<'_, '_>, _: &MetaRegistry) -> Result<(), CodecError> {
        Ok(self.read_xml(node)?)
    }
}

impl<T: Serialize + DeserializeOwned + 'static> Codec for Elastic<T> {
    const KIND: FieldKind = FieldKind::Elastic;
    const STRING_HINT: bool = true;
}

// -----------------------------------------------------------------------------
// Tests
