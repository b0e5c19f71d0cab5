//! XML encoding of [`UndStruct`] values.
//!
//! A struct is one element named after its table's
//! [`xml_name`](crate::info::StructInfo::xml_name), each field a child
//! element named after its wire name. Undefined fields write nothing.
//! Children repeating a wire name are merged into the same field, which
//! is how `Elastic` and `Vec` fields collect several values.

use alloc::borrow::ToOwned;
use alloc::boxed::Box;
use alloc::string::String;
use core::any::type_name;

use roxmltree::{Document, Node};
use und_types::{XmlError, XmlWriter};

use crate::error::CodecError;
use crate::registry::{MetaRegistry, UndStruct};

// -----------------------------------------------------------------------------
// Drivers

/// Writes `value` as a `<name>` element.
pub fn encode_struct<S: UndStruct>(
    value: &S,
    name: &str,
    w: &mut XmlWriter,
    registry: &MetaRegistry,
) -> Result<(), CodecError> {
    let info = registry.get_or_build::<S>()?;
    w.start(name);
    for field in info.iter() {
        field
            .get(value)
            .encode_xml(field.wire_name(), w, registry)
            .map_err(|err| CodecError::Field {
                type_path: type_name::<S>(),
                field: field.wire_name(),
                snippet: None,
                source: Box::new(err),
            })?;
    }
    w.end(name);
    Ok(())
}

/// Reads the children of `node` into the fields of `target`.
pub fn decode_into<S: UndStruct>(
    target: &mut S,
    node: Node<'_, '_>,
    registry: &MetaRegistry,
) -> Result<(), CodecError> {
    let info = registry.get_or_build::<S>()?;
    for child in node.children().filter(Node::is_element) {
        let Some(field) = info.field(child.tag_name().name()) else {
            continue;
        };
        field
            .get_mut(target)
            .decode_xml(child, registry)
            .map_err(|err| CodecError::Field {
                type_path: type_name::<S>(),
                field: field.wire_name(),
                snippet: crate::cfg::debug! {
                    if { child.text().map(ToOwned::to_owned) } else { None }
                },
                source: Box::new(err),
            })?;
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// Entry points

pub fn to_string<S: UndStruct>(value: &S) -> Result<String, CodecError> {
    to_string_in(value, MetaRegistry::global())
}

pub fn to_string_in<S: UndStruct>(value: &S, registry: &MetaRegistry) -> Result<String, CodecError> {
    let info = registry.get_or_build::<S>()?;
    let mut w = XmlWriter::new();
    encode_struct(value, info.xml_name(), &mut w, registry)?;
    Ok(w.into_string())
}

pub fn from_str<S: UndStruct + Default>(text: &str) -> Result<S, CodecError> {
    from_str_in(text, MetaRegistry::global())
}

/// Parses `text`, whose root element must carry the table's XML name.
pub fn from_str_in<S: UndStruct + Default>(
    text: &str,
    registry: &MetaRegistry,
) -> Result<S, CodecError> {
    let info = registry.get_or_build::<S>()?;
    let doc = Document::parse(text).map_err(XmlError::from)?;
    let root = doc.root_element();
    if root.tag_name().name() != info.xml_name() {
        return Err(XmlError::UnexpectedRoot {
            expected: info.xml_name().to_owned(),
            found: root.tag_name().name().to_owned(),
        }
        .into());
    }
    let mut target = S::default();
    decode_into(&mut target, root, registry)?;
    Ok(target)
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::{from_str_in, to_string_in};
    use crate::info::{FieldInfo, StructInfo};
    use crate::{CodecError, MetaError, MetaRegistry, UndStruct};
    use und_types::{Elastic, Und, XmlError};

    #[derive(Debug, Default, PartialEq)]
    struct Item {
        sku: String,
        price: Und<f64>,
        tags: Elastic<String>,
        codes: Vec<u16>,
    }

    impl UndStruct for Item {
        fn build_info(registry: &MetaRegistry) -> Result<StructInfo<Self>, MetaError> {
            StructInfo::builder(registry, "item")
                .field(FieldInfo::new("sku", |i: &Item| &i.sku, |i| &mut i.sku))
                .field(FieldInfo::new("price", |i: &Item| &i.price, |i| &mut i.price))
                .field(FieldInfo::new("tags", |i: &Item| &i.tags, |i| &mut i.tags).with_wire_name("tag"))
                .field(FieldInfo::new("codes", |i: &Item| &i.codes, |i| &mut i.codes).with_wire_name("code"))
                .build()
        }
    }

    #[test]
    fn writes_elements() {
        let registry = MetaRegistry::new();
        let item = Item {
            sku: String::from("a<1>"),
            price: Und::Null,
            tags: Elastic::from_options([Some(String::from("x")), None]),
            codes: vec![3, 4],
        };
        assert_eq!(
            to_string_in(&item, &registry).unwrap(),
            r#"<item><sku>a&lt;1&gt;</sku><price nil="true"/><tag>x</tag><tag nil="true"/><code>3</code><code>4</code></item>"#
        );

        let empty = to_string_in(&Item::default(), &registry).unwrap();
        assert_eq!(empty, "<item><sku/></item>");
    }

    #[test]
    fn repeated_tags_merge() {
        let registry = MetaRegistry::new();
        let doc = r#"<item>
            <tag>a</tag>
            <sku>s</sku>
            <tag nil="true"/>
            <other/>
            <tag>b</tag>
            <price>2.5</price>
            <code>1</code><code>2</code>
        </item>"#;
        let item: Item = from_str_in(doc, &registry).unwrap();
        assert_eq!(item.sku, "s");
        assert_eq!(item.price, Und::Defined(2.5));
        assert_eq!(
            item.tags,
            Elastic::from_options([Some(String::from("a")), None, Some(String::from("b"))])
        );
        assert_eq!(item.codes, [1, 2]);
    }

    #[test]
    fn roundtrip() {
        let registry = MetaRegistry::new();
        let item = Item {
            sku: String::from("k"),
            price: Und::Defined(1.25),
            tags: Elastic::from_values([String::from("p"), String::from("q")]),
            codes: vec![9],
        };
        let text = to_string_in(&item, &registry).unwrap();
        assert_eq!(from_str_in::<Item>(&text, &registry).unwrap(), item);
    }

    #[test]
    fn errors() {
        let registry = MetaRegistry::new();
        let err = from_str_in::<Item>("<thing/>", &registry).unwrap_err();
        assert!(matches!(err, CodecError::Xml(XmlError::UnexpectedRoot { .. })));

        let err = from_str_in::<Item>("<item><price>cheap</price></item>", &registry).unwrap_err();
        assert_eq!(err.field_path(), ["price"]);
        assert!(matches!(err.root(), CodecError::Xml(XmlError::Text { .. })));

        let err = from_str_in::<Item>("<item>", &registry).unwrap_err();
        assert!(matches!(err, CodecError::Xml(XmlError::Syntax(_))));
    }
}
