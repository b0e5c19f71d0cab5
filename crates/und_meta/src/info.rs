//! Field tables describing presence-typed structs.

use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::type_name;
use core::fmt;
use core::marker::PhantomData;

use serde_json::Value;
use und_utils::hash::HashMap;

use crate::codec::{Codec, FieldCodec};
use crate::error::{CodecError, MetaError, json_kind};
use crate::registry::{MetaRegistry, UndStruct};

// -----------------------------------------------------------------------------
// FieldKind / CodecHint

/// How a field takes part in presence-state encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// An ordinary value, always written.
    Plain,
    /// `Option<T>`: `None` is written as `null`.
    Presence,
    /// `Und<T>`: omitted while undefined.
    TriState,
    /// `Elastic<T>`: omitted while undefined.
    Elastic,
    /// Another [`UndStruct`], written as a nested object.
    Nested,
}

impl FieldKind {
    /// Whether an undefined value drops the field from the output.
    #[inline]
    pub const fn omits_undefined(self) -> bool {
        matches!(self, FieldKind::TriState | FieldKind::Elastic)
    }
}

/// Per-field codec option, set with `#[und(string)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CodecHint {
    #[default]
    None,
    /// Scalars travel as JSON strings: `5` is written `"5"`.
    String,
}

impl CodecHint {
    /// Applies the hint to an encoded scalar.
    pub fn apply(self, value: Value) -> Result<Value, CodecError> {
        match (self, value) {
            (CodecHint::None, value) | (CodecHint::String, value @ Value::Null) => Ok(value),
            (CodecHint::String, Value::Number(n)) => Ok(Value::String(n.to_string())),
            (CodecHint::String, Value::Bool(b)) => Ok(Value::String(b.to_string())),
            (CodecHint::String, value @ Value::String(_)) => {
                Ok(Value::String(serde_json::to_string(&value)?))
            }
            (CodecHint::String, value) => Err(CodecError::HintMismatch {
                found: json_kind(&value),
            }),
        }
    }

    /// Undoes [`apply`](CodecHint::apply) before decoding.
    pub fn undo(self, value: &Value) -> Result<Cow<'_, Value>, CodecError> {
        match (self, value) {
            (CodecHint::None, _) | (CodecHint::String, Value::Null) => Ok(Cow::Borrowed(value)),
            (CodecHint::String, Value::String(s)) => Ok(Cow::Owned(serde_json::from_str(s)?)),
            (CodecHint::String, other) => Err(CodecError::HintMismatch {
                found: json_kind(other),
            }),
        }
    }
}

// -----------------------------------------------------------------------------
// Access

/// Projects a struct onto one of its fields.
pub trait Access<S>: Send + Sync {
    fn get<'a>(&self, target: &'a S) -> &'a dyn FieldCodec;
    fn get_mut<'a>(&self, target: &'a mut S) -> &'a mut dyn FieldCodec;
}

struct Direct<S, F> {
    get: fn(&S) -> &F,
    get_mut: fn(&mut S) -> &mut F,
}

impl<S, F: Codec> Access<S> for Direct<S, F> {
    #[inline]
    fn get<'a>(&self, target: &'a S) -> &'a dyn FieldCodec {
        (self.get)(target)
    }

    #[inline]
    fn get_mut<'a>(&self, target: &'a mut S) -> &'a mut dyn FieldCodec {
        (self.get_mut)(target)
    }
}

// A field reached through a flattened struct.
struct Flattened<S, I> {
    get: fn(&S) -> &I,
    get_mut: fn(&mut S) -> &mut I,
    inner: Arc<dyn Access<I>>,
}

impl<S, I: 'static> Access<S> for Flattened<S, I> {
    #[inline]
    fn get<'a>(&self, target: &'a S) -> &'a dyn FieldCodec {
        self.inner.get((self.get)(target))
    }

    #[inline]
    fn get_mut<'a>(&self, target: &'a mut S) -> &'a mut dyn FieldCodec {
        self.inner.get_mut((self.get_mut)(target))
    }
}

// -----------------------------------------------------------------------------
// FieldInfo

/// One encodable field of `S`.
///
/// ```
/// use und_meta::info::{CodecHint, FieldInfo, FieldKind};
/// use und_types::Und;
///
/// struct Patch {
///     count: Und<u32>,
/// }
///
/// let field = FieldInfo::<Patch>::new("count", |p| &p.count, |p| &mut p.count)
///     .with_wire_name("Count")
///     .with_hint(CodecHint::String);
///
/// assert_eq!(field.wire_name(), "Count");
/// assert_eq!(field.kind(), FieldKind::TriState);
/// ```
pub struct FieldInfo<S> {
    name: &'static str,
    wire_name: &'static str,
    hint: CodecHint,
    kind: FieldKind,
    string_hint: bool,
    access: Arc<dyn Access<S>>,
}

impl<S: 'static> FieldInfo<S> {
    /// A field named `name` on the wire as well as in Rust.
    pub fn new<F: Codec>(
        name: &'static str,
        get: fn(&S) -> &F,
        get_mut: fn(&mut S) -> &mut F,
    ) -> Self {
        Self {
            name,
            wire_name: name,
            hint: CodecHint::None,
            kind: F::KIND,
            string_hint: F::STRING_HINT,
            access: Arc::new(Direct { get, get_mut }),
        }
    }
}

impl<S> FieldInfo<S> {
    #[inline]
    pub fn with_wire_name(mut self, wire_name: &'static str) -> Self {
        self.wire_name = wire_name;
        self
    }

    #[inline]
    pub fn with_hint(mut self, hint: CodecHint) -> Self {
        self.hint = hint;
        self
    }

    /// The Rust field name.
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub const fn wire_name(&self) -> &'static str {
        self.wire_name
    }

    #[inline]
    pub const fn hint(&self) -> CodecHint {
        self.hint
    }

    #[inline]
    pub const fn kind(&self) -> FieldKind {
        self.kind
    }

    #[inline]
    pub fn get<'a>(&self, target: &'a S) -> &'a dyn FieldCodec {
        self.access.get(target)
    }

    #[inline]
    pub fn get_mut<'a>(&self, target: &'a mut S) -> &'a mut dyn FieldCodec {
        self.access.get_mut(target)
    }
}

impl<S> Clone for FieldInfo<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            wire_name: self.wire_name,
            hint: self.hint,
            kind: self.kind,
            string_hint: self.string_hint,
            access: Arc::clone(&self.access),
        }
    }
}

impl<S> fmt::Debug for FieldInfo<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldInfo")
            .field("name", &self.name)
            .field("wire_name", &self.wire_name)
            .field("hint", &self.hint)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// StructInfo

/// The immutable field table of `S`, in declaration order.
///
/// Built once per registry by [`UndStruct::build_info`] and shared behind
/// an `Arc` afterwards.
pub struct StructInfo<S> {
    type_path: &'static str,
    xml_name: &'static str,
    fields: Box<[FieldInfo<S>]>,
    by_wire_name: HashMap<&'static str, usize>,
    _marker: PhantomData<fn() -> S>,
}

impl<S: 'static> StructInfo<S> {
    /// Starts a table whose XML root element is `xml_name`.
    #[inline]
    pub fn builder<'r>(
        registry: &'r MetaRegistry,
        xml_name: &'static str,
    ) -> StructInfoBuilder<'r, S> {
        StructInfoBuilder {
            registry,
            xml_name,
            fields: Vec::new(),
            error: None,
        }
    }
}

impl<S> StructInfo<S> {
    #[inline]
    pub const fn type_path(&self) -> &'static str {
        self.type_path
    }

    #[inline]
    pub const fn xml_name(&self) -> &'static str {
        self.xml_name
    }

    #[inline]
    pub fn fields(&self) -> &[FieldInfo<S>] {
        &self.fields
    }

    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &FieldInfo<S>> {
        self.fields.iter()
    }

    /// Looks a field up by wire name.
    pub fn field(&self, wire_name: &str) -> Option<&FieldInfo<S>> {
        self.by_wire_name
            .get(wire_name)
            .and_then(|&index| self.fields.get(index))
    }

    #[inline]
    pub fn index_of(&self, wire_name: &str) -> Option<usize> {
        self.by_wire_name.get(wire_name).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<S> fmt::Debug for StructInfo<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructInfo")
            .field("type_path", &self.type_path)
            .field("xml_name", &self.xml_name)
            .field("fields", &self.fields)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// StructInfoBuilder

/// Collects fields and validates them in [`build`](StructInfoBuilder::build).
pub struct StructInfoBuilder<'r, S> {
    registry: &'r MetaRegistry,
    xml_name: &'static str,
    fields: Vec<FieldInfo<S>>,
    error: Option<MetaError>,
}

impl<S: 'static> StructInfoBuilder<'_, S> {
    #[inline]
    pub fn field(mut self, field: FieldInfo<S>) -> Self {
        self.fields.push(field);
        self
    }

    /// Inlines every field of `I`, reached through `get`/`get_mut`.
    ///
    /// The table of `I` comes from the same registry. If it cannot be
    /// built, [`build`](StructInfoBuilder::build) reports
    /// [`MetaError::Flatten`].
    pub fn flatten<I: UndStruct>(
        mut self,
        name: &'static str,
        get: fn(&S) -> &I,
        get_mut: fn(&mut S) -> &mut I,
    ) -> Self {
        if self.error.is_some() {
            return self;
        }
        match self.registry.get_or_build::<I>() {
            Ok(inner) => {
                self.fields.extend(inner.iter().map(|f| FieldInfo {
                    name: f.name,
                    wire_name: f.wire_name,
                    hint: f.hint,
                    kind: f.kind,
                    string_hint: f.string_hint,
                    access: Arc::new(Flattened {
                        get,
                        get_mut,
                        inner: Arc::clone(&f.access),
                    }),
                }));
            }
            Err(err) => {
                self.error = Some(MetaError::Flatten {
                    type_path: type_name::<S>(),
                    field: name,
                    source: Box::new(err),
                });
            }
        }
        self
    }

    /// Validates the collected fields.
    pub fn build(self) -> Result<StructInfo<S>, MetaError> {
        let type_path = type_name::<S>();
        if let Some(err) = self.error {
            return Err(err);
        }

        let mut by_wire_name = HashMap::default();
        for (index, field) in self.fields.iter().enumerate() {
            if field.wire_name.is_empty() {
                return Err(MetaError::EmptyWireName {
                    type_path,
                    field: field.name,
                });
            }
            if field.hint == CodecHint::String && !field.string_hint {
                return Err(MetaError::UnsupportedHint {
                    type_path,
                    field: field.name,
                });
            }
            if by_wire_name.insert(field.wire_name, index).is_some() {
                return Err(MetaError::DuplicateWireName {
                    type_path,
                    wire_name: field.wire_name,
                });
            }
        }

        Ok(StructInfo {
            type_path,
            xml_name: self.xml_name,
            fields: self.fields.into_boxed_slice(),
            by_wire_name,
            _marker: PhantomData,
        })
    }
}

// -----------------------------------------------------------------------------
// Tests
