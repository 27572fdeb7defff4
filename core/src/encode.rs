//! Request body serialization.
//!
//! Two XML dialects are written: the legacy `<request>` envelope, where
//! values are bare element text and lists repeat the element, and the REST
//! resource form, where scalars carry `type` attributes and lists are
//! `type="array"` containers.

use std::fmt;

use indexmap::IndexMap;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::config::WireFormat;
use crate::error::{Error, Result};
use crate::path::{dashify, singularize, Params};
use crate::typecast::Value;

/// Serialize legacy request parameters in the given wire format.
pub fn encode_params(params: &Params, format: WireFormat) -> Result<Vec<u8>> {
    match format {
        WireFormat::Xml => legacy_xml(params),
        WireFormat::Yaml => serde_yaml::to_string(params)
            .map(String::into_bytes)
            .map_err(encode_err),
    }
}

fn legacy_xml(params: &Params) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Start(BytesStart::new("request")))
        .map_err(encode_err)?;
    for (key, value) in params {
        write_legacy(&mut writer, key, value)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("request")))
        .map_err(encode_err)?;
    Ok(writer.into_inner())
}

fn write_legacy(writer: &mut Writer<Vec<u8>>, name: &str, value: &Value) -> Result<()> {
    match value {
        Value::List(items) => {
            for item in items {
                write_legacy(writer, name, item)?;
            }
        }
        Value::Map(map) => {
            writer
                .write_event(Event::Start(BytesStart::new(name)))
                .map_err(encode_err)?;
            for (key, value) in map {
                write_legacy(writer, key, value)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(encode_err)?;
        }
        Value::Nil => {
            writer
                .write_event(Event::Empty(BytesStart::new(name)))
                .map_err(encode_err)?;
        }
        scalar => write_text(writer, BytesStart::new(name), name, &scalar.to_wire_string())?,
    }
    Ok(())
}

/// Serialize a REST resource as `<root>..</root>` with hyphenated keys.
pub fn encode_resource(root: &str, attributes: &IndexMap<String, Value>) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    write_typed(&mut writer, &dashify(root), &Value::Map(attributes.clone()))?;
    Ok(writer.into_inner())
}

fn write_typed(writer: &mut Writer<Vec<u8>>, name: &str, value: &Value) -> Result<()> {
    let mut start = BytesStart::new(name);
    if let Some(hint) = value.type_hint() {
        start.push_attribute(("type", hint));
    }

    match value {
        Value::Nil => {
            start.push_attribute(("nil", "true"));
            writer.write_event(Event::Empty(start)).map_err(encode_err)?;
        }
        Value::Map(map) => {
            writer.write_event(Event::Start(start)).map_err(encode_err)?;
            for (key, value) in map {
                write_typed(writer, &dashify(key), value)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(encode_err)?;
        }
        Value::List(items) => {
            writer.write_event(Event::Start(start)).map_err(encode_err)?;
            let child = singularize(name);
            for item in items {
                write_typed(writer, &child, item)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(encode_err)?;
        }
        scalar => write_text(writer, start, name, &scalar.to_wire_string())?,
    }
    Ok(())
}

fn write_text(writer: &mut Writer<Vec<u8>>, start: BytesStart<'_>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(start)).map_err(encode_err)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(encode_err)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(encode_err)?;
    Ok(())
}

fn encode_err(e: impl fmt::Display) -> Error {
    Error::Encode(e.to_string())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn params(entries: Vec<(&str, Value)>) -> Params {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn legacy_xml_wraps_params_in_request() {
        let body = encode_params(&params(vec![("find", Value::from("late"))]), WireFormat::Xml).unwrap();
        let body = text(body);
        assert!(body.starts_with("<request>"));
        assert!(body.contains("<find>late</find>"));
        assert!(body.trim_end().ends_with("</request>"));
    }

    #[test]
    fn legacy_xml_repeats_list_elements() {
        let milestone = |title: &str| {
            Value::Map(params(vec![("title", Value::from(title)), ("notify", Value::from(false))]))
        };
        let body = encode_params(
            &params(vec![("milestone", Value::List(vec![milestone("A & B"), milestone("C")]))]),
            WireFormat::Xml,
        )
        .unwrap();
        let body = text(body);
        assert_eq!(body.matches("<milestone>").count(), 2);
        assert!(body.contains("<title>A &amp; B</title>"));
        assert!(body.contains("<notify>false</notify>"));
    }

    #[test]
    fn yaml_params() {
        let body = encode_params(
            &params(vec![("find", Value::from("all")), ("page", Value::Integer(2))]),
            WireFormat::Yaml,
        )
        .unwrap();
        assert_eq!(text(body), "find: all\npage: 2\n");
    }

    #[test]
    fn resource_xml_types_scalars() {
        let attrs = params(vec![
            ("content", Value::from("Do it")),
            ("todo_list_id", Value::Integer(3)),
            ("completed", Value::from(false)),
            ("due_at", Value::Date(NaiveDate::from_ymd_opt(2010, 10, 5).unwrap())),
            ("responsible_party", Value::Nil),
        ]);
        let body = text(encode_resource("todo_item", &attrs).unwrap());
        assert_eq!(
            body,
            concat!(
                "<todo-item>",
                "<content>Do it</content>",
                r#"<todo-list-id type="integer">3</todo-list-id>"#,
                r#"<completed type="boolean">false</completed>"#,
                r#"<due-at type="date">2010-10-05</due-at>"#,
                r#"<responsible-party nil="true"/>"#,
                "</todo-item>"
            )
        );
    }

    #[test]
    fn resource_xml_lists_use_singular_children() {
        let file = Value::Map(params(vec![("file", Value::from("abc"))]));
        let attrs = params(vec![("attachments", Value::List(vec![file]))]);
        let body = text(encode_resource("post", &attrs).unwrap());
        assert_eq!(
            body,
            r#"<post><attachments type="array"><attachment><file>abc</file></attachment></attachments></post>"#
        );
    }
}
