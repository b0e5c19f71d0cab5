//! XML codecs for the presence types.
//!
//! Element text carries scalars only. Absence is spelled with a `nil`
//! attribute:
//!
//! | value | written as |
//! |---|---|
//! | `None`, `Und::Null`, `Elastic::null()` | `<name nil="true"/>` |
//! | `Und::Undefined`, `Elastic::undefined()` | nothing |
//! | `Some(v)`, `Und::Defined(v)` | `<name>v</name>` |
//! | `Elastic` with `n` elements | `n` sibling `<name>` elements |
//!
//! Reading an [`Elastic`] merges: every element appends to what the value
//! already holds, so the siblings of a repeated tag accumulate.
//!
//! ```
//! use und_types::Elastic;
//! use und_types::xml::{self, XmlWriter};
//!
//! let tags = Elastic::from_options([Some(String::from("a")), None]);
//! let mut w = XmlWriter::new();
//! w.start("doc");
//! xml::write_value(&tags, "tag", &mut w).unwrap();
//! w.end("doc");
//! assert_eq!(w.as_str(), r#"<doc><tag>a</tag><tag nil="true"/></doc>"#);
//!
//! let back: Elastic<String> = xml::from_str_repeated(w.as_str(), "tag").unwrap();
//! assert_eq!(back.len(), 2);
//! ```

use alloc::borrow::ToOwned;
use alloc::string::{String, ToString};

use roxmltree::{Document, Node};
use serde_core::de::DeserializeOwned;
use serde_core::ser::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::{Elastic, Und};

// -----------------------------------------------------------------------------
// XmlError

/// Errors produced while reading or writing XML.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum XmlError {
    /// The document is not well-formed.
    #[error("malformed xml: {0}")]
    Syntax(#[from] roxmltree::Error),
    /// The value has no text form.
    #[error("an {0} cannot be written as element text")]
    NotScalar(&'static str),
    /// Element text could not be read as the target type.
    #[error("invalid text in <{element}>: {source}")]
    Text {
        element: String,
        #[source]
        source: serde_json::Error,
    },
    /// The root element does not carry the expected name.
    #[error("expected root element <{expected}>, found <{found}>")]
    UnexpectedRoot { expected: String, found: String },
    /// The value could not be converted into JSON before being written.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

// -----------------------------------------------------------------------------
// XmlWriter

/// A minimal, escaping XML text builder.
#[derive(Debug, Default, Clone)]
pub struct XmlWriter {
    buf: String,
}

impl XmlWriter {
    #[inline]
    pub const fn new() -> Self {
        Self { buf: String::new() }
    }

    pub fn start(&mut self, name: &str) {
        self.buf.push('<');
        self.buf.push_str(name);
        self.buf.push('>');
    }

    pub fn end(&mut self, name: &str) {
        self.buf.push_str("</");
        self.buf.push_str(name);
        self.buf.push('>');
    }

    pub fn text(&mut self, text: &str) {
        for c in text.chars() {
            match c {
                '<' => self.buf.push_str("&lt;"),
                '>' => self.buf.push_str("&gt;"),
                '&' => self.buf.push_str("&amp;"),
                '"' => self.buf.push_str("&quot;"),
                '\'' => self.buf.push_str("&apos;"),
                c => self.buf.push(c),
            }
        }
    }

    /// `<name>text</name>`, or `<name/>` for empty text.
    pub fn element(&mut self, name: &str, text: &str) {
        if text.is_empty() {
            self.buf.push('<');
            self.buf.push_str(name);
            self.buf.push_str("/>");
        } else {
            self.start(name);
            self.text(text);
            self.end(name);
        }
    }

    /// `<name nil="true"/>`
    pub fn nil(&mut self, name: &str) {
        self.buf.push('<');
        self.buf.push_str(name);
        self.buf.push_str(r#" nil="true"/>"#);
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    #[inline]
    pub fn into_string(self) -> String {
        self.buf
    }
}

// -----------------------------------------------------------------------------
// Scalars

/// Renders a scalar as element text.
///
/// Strings are written as they are, numbers and booleans as their JSON
/// literal. A unit value renders as empty text.
pub fn scalar_text<T: Serialize + ?Sized>(value: &T) -> Result<String, XmlError> {
    match serde_json::to_value(value)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        Value::Array(_) => Err(XmlError::NotScalar("array")),
        Value::Object(_) => Err(XmlError::NotScalar("object")),
    }
}

/// Reads element text as `T`.
///
/// The text is offered as a string first and as a JSON literal second, so
/// `String` keeps `"5"` verbatim while `i32` reads it as a number. On
/// failure the first error is reported.
pub fn parse_scalar<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    match serde_json::from_value(Value::String(text.to_owned())) {
        Ok(v) => Ok(v),
        Err(err) => serde_json::from_str(text.trim()).map_err(|_| err),
    }
}

/// `true` for elements carrying `nil="true"`, in any namespace.
pub fn is_nil(node: Node<'_, '_>) -> bool {
    node.attributes()
        .any(|a| a.name() == "nil" && a.value() == "true")
}

/// Reads the text of `node` as `T`, see [`parse_scalar`].
pub fn read_text<T: DeserializeOwned>(node: Node<'_, '_>) -> Result<T, XmlError> {
    parse_scalar(node.text().unwrap_or_default()).map_err(|source| XmlError::Text {
        element: node.tag_name().name().to_owned(),
        source,
    })
}

fn read_item<T: DeserializeOwned>(node: Node<'_, '_>) -> Result<Option<T>, XmlError> {
    if is_nil(node) {
        Ok(None)
    } else {
        read_text(node).map(Some)
    }
}

// -----------------------------------------------------------------------------
// XmlValue

/// A value that reads and writes itself as XML elements.
pub trait XmlValue {
    /// Writes zero or more `<name>` elements.
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> Result<(), XmlError>;

    /// Reads one element into `self`, merging where the type supports it.
    fn read_xml(&mut self, node: Node<'_, '_>) -> Result<(), XmlError>;
}

impl<T: Serialize + DeserializeOwned> XmlValue for Option<T> {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> Result<(), XmlError> {
        match self {
            Some(v) => w.element(name, &scalar_text(v)?),
            None => w.nil(name),
        }
        Ok(())
    }

    fn read_xml(&mut self, node: Node<'_, '_>) -> Result<(), XmlError> {
        *self = read_item(node)?;
        Ok(())
    }
}

impl<T: Serialize + DeserializeOwned> XmlValue for Und<T> {
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> Result<(), XmlError> {
        match self {
            Und::Undefined => {}
            Und::Null => w.nil(name),
            Und::Defined(v) => w.element(name, &scalar_text(v)?),
        }
        Ok(())
    }

    fn read_xml(&mut self, node: Node<'_, '_>) -> Result<(), XmlError> {
        *self = match read_item(node)? {
            None => Und::Null,
            Some(v) => Und::Defined(v),
        };
        Ok(())
    }
}

impl<T: Serialize + DeserializeOwned> XmlValue for Elastic<T> {
    /// A `Defined` but empty sequence writes nothing.
    fn write_xml(&self, name: &str, w: &mut XmlWriter) -> Result<(), XmlError> {
        if self.is_null() {
            w.nil(name);
            return Ok(());
        }
        for item in self.iter() {
            match item {
                Some(v) => w.element(name, &scalar_text(v)?),
                None => w.nil(name),
            }
        }
        Ok(())
    }

    fn read_xml(&mut self, node: Node<'_, '_>) -> Result<(), XmlError> {
        let item = read_item(node)?;
        if self.is_null() || !self.is_empty() {
            self.push(item);
        } else {
            *self = match item {
                None => Elastic::null(),
                Some(v) => Elastic::from_value(v),
            };
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Documents

/// Writes `value` as a fragment of `<name>` elements.
pub fn write_value<V: XmlValue + ?Sized>(
    value: &V,
    name: &str,
    w: &mut XmlWriter,
) -> Result<(), XmlError> {
    value.write_xml(name, w)
}

/// Writes `value` as a fragment and returns the text.
pub fn to_string<V: XmlValue + ?Sized>(value: &V, name: &str) -> Result<String, XmlError> {
    let mut w = XmlWriter::new();
    value.write_xml(name, &mut w)?;
    Ok(w.into_string())
}

/// Reads the root element of `text` into a fresh value.
pub fn from_str<V: XmlValue + Default>(text: &str) -> Result<V, XmlError> {
    let doc = Document::parse(text)?;
    let mut value = V::default();
    value.read_xml(doc.root_element())?;
    Ok(value)
}

/// Merges every child of the root element named `name` into a fresh value.
pub fn from_str_repeated<V: XmlValue + Default>(text: &str, name: &str) -> Result<V, XmlError> {
    let doc = Document::parse(text)?;
    let mut value = V::default();
    read_children(doc.root_element(), name, &mut value)?;
    Ok(value)
}

/// Merges every element child of `parent` named `name` into `value`.
pub fn read_children<V: XmlValue + ?Sized>(
    parent: Node<'_, '_>,
    name: &str,
    value: &mut V,
) -> Result<(), XmlError> {
    parent
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == name)
        .try_for_each(|n| value.read_xml(n))
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{XmlError, XmlValue, XmlWriter, from_str, from_str_repeated, to_string};
    use crate::{Elastic, Und};
    use alloc::string::String;
    use alloc::vec;

    #[test]
    fn writer_escapes() {
        let mut w = XmlWriter::new();
        w.element("a", "<b> & \"c\"");
        w.element("e", "");
        assert_eq!(w.as_str(), "<a>&lt;b&gt; &amp; &quot;c&quot;</a><e/>");
    }

    #[test]
    fn option_roundtrip() {
        assert_eq!(to_string(&Some(5), "v").unwrap(), "<v>5</v>");
        assert_eq!(to_string(&None::<i32>, "v").unwrap(), r#"<v nil="true"/>"#);

        assert_eq!(from_str::<Option<i32>>("<v>5</v>").unwrap(), Some(5));
        assert_eq!(from_str::<Option<i32>>(r#"<v nil="true"/>"#).unwrap(), None);
        assert_eq!(
            from_str::<Option<String>>("<v>5</v>").unwrap(),
            Some(String::from("5"))
        );
        assert_eq!(
            from_str::<Option<String>>("<v>a &amp; b</v>").unwrap(),
            Some(String::from("a & b"))
        );
    }

    #[test]
    fn und_states() {
        assert_eq!(to_string(&Und::<i32>::Undefined, "v").unwrap(), "");
        assert_eq!(to_string(&Und::<i32>::Null, "v").unwrap(), r#"<v nil="true"/>"#);
        assert_eq!(to_string(&Und::Defined(true), "v").unwrap(), "<v>true</v>");

        assert_eq!(from_str::<Und<bool>>("<v>true</v>").unwrap(), Und::Defined(true));
        assert_eq!(from_str::<Und<bool>>(r#"<v nil="true"/>"#).unwrap(), Und::Null);
    }

    #[test]
    fn elastic_repeated_tags_merge() {
        let doc = r#"<r><v>1</v><other>x</other><v nil="true"/><v>3</v></r>"#;
        let e: Elastic<i32> = from_str_repeated(doc, "v").unwrap();
        assert_eq!(e, Elastic::from_options([Some(1), None, Some(3)]));

        let lone_nil: Elastic<i32> = from_str_repeated(r#"<r><v nil="true"/></r>"#, "v").unwrap();
        assert!(lone_nil.is_null());

        let promoted: Elastic<i32> =
            from_str_repeated(r#"<r><v nil="true"/><v>2</v></r>"#, "v").unwrap();
        assert_eq!(promoted, Elastic::from_options([None, Some(2)]));

        let none: Elastic<i32> = from_str_repeated("<r/>", "v").unwrap();
        assert!(none.is_undefined());
    }

    #[test]
    fn elastic_appends_to_existing() {
        let doc = roxmltree::Document::parse("<v>9</v>").unwrap();
        let mut e = Elastic::from_values([1, 2]);
        e.read_xml(doc.root_element()).unwrap();
        assert_eq!(e.values(), Some(vec![1, 2, 9]));
    }

    #[test]
    fn elastic_write() {
        let e = Elastic::from_options([Some(String::from("a")), None]);
        assert_eq!(to_string(&e, "t").unwrap(), r#"<t>a</t><t nil="true"/>"#);
        assert_eq!(to_string(&Elastic::<i32>::null(), "t").unwrap(), r#"<t nil="true"/>"#);
        assert_eq!(to_string(&Elastic::<i32>::undefined(), "t").unwrap(), "");
    }

    #[test]
    fn errors() {
        assert!(matches!(
            to_string(&Some(vec![1, 2]), "v"),
            Err(XmlError::NotScalar("array"))
        ));
        assert!(matches!(
            from_str::<Option<i32>>("<v>five</v>"),
            Err(XmlError::Text { ref element, .. }) if element == "v"
        ));
        assert!(matches!(
            from_str::<Option<i32>>("<v>"),
            Err(XmlError::Syntax(_))
        ));
    }
}
