//! Minimal SOAP 1.1 codec.
//!
//! Requests are written from a small parameter tree. Responses are read into a loosely typed
//! `serde_json::Value` the same way a dynamic SOAP client would present them: an element with
//! children becomes an object keyed by local name, an element with text becomes a string,
//! `xsi:nil` or empty elements become `null`, and repeated sibling elements collapse into an
//! array. The last rule is where the vendor's single-or-list ambiguity comes from; it is
//! resolved by `OneOrMany` when the tree is deserialized into response shapes.

use super::error::Error;
use super::operation::{self, Operation};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Value};

const ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

#[derive(Debug, Clone)]
pub enum Param {
    Text(String),
    Group(Vec<(&'static str, Param)>),
}

#[derive(Debug, Clone)]
pub struct Request {
    operation: &'static Operation,
    params: Vec<(&'static str, Param)>,
}

impl Request {
    pub fn new(operation: &'static Operation) -> Self {
        Request {
            operation,
            params: Vec::new(),
        }
    }

    pub fn param<T: ToString>(mut self, name: &'static str, value: T) -> Self {
        self.params.push((name, Param::Text(value.to_string())));
        self
    }

    /// Appends a complex parameter. Repeating `name` produces repeated elements.
    pub fn group(mut self, name: &'static str, fields: Vec<(&'static str, Param)>) -> Self {
        self.params.push((name, Param::Group(fields)));
        self
    }

    pub fn operation(&self) -> &'static Operation {
        self.operation
    }

    pub fn action(&self) -> String {
        operation::soap_action(self.operation)
    }

    pub fn to_xml(&self) -> Result<String, Error> {
        let mut writer = Writer::new(Vec::new());
        write_envelope(&mut writer, self).map_err(|e| Error::InternalError(e.to_string()))?;
        String::from_utf8(writer.into_inner()).map_err(|e| Error::InternalError(e.to_string()))
    }
}

fn write_envelope(writer: &mut Writer<Vec<u8>>, request: &Request) -> quick_xml::Result<()> {
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut envelope = BytesStart::new("s:Envelope");
    envelope.push_attribute(("xmlns:s", ENVELOPE_NS));
    writer.write_event(Event::Start(envelope))?;
    writer.write_event(Event::Start(BytesStart::new("s:Body")))?;

    let mut body = BytesStart::new(request.operation);
    body.push_attribute(("xmlns", operation::SERVICE_NS));
    writer.write_event(Event::Start(body))?;
    write_params(writer, &request.params)?;
    writer.write_event(Event::End(BytesEnd::new(request.operation)))?;

    writer.write_event(Event::End(BytesEnd::new("s:Body")))?;
    writer.write_event(Event::End(BytesEnd::new("s:Envelope")))?;
    Ok(())
}

fn write_params(
    writer: &mut Writer<Vec<u8>>,
    params: &[(&'static str, Param)],
) -> quick_xml::Result<()> {
    for (name, param) in params {
        writer.write_event(Event::Start(BytesStart::new(*name)))?;
        match param {
            Param::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
            Param::Group(fields) => write_params(writer, fields)?,
        }
        writer.write_event(Event::End(BytesEnd::new(*name)))?;
    }
    Ok(())
}

struct Element {
    name: String,
    nil: bool,
    text: String,
    children: Vec<(String, Value)>,
}

impl Element {
    fn open(start: &BytesStart) -> Self {
        let nil = start.attributes().flatten().any(|attr| {
            attr.key.local_name().as_ref() == b"nil" && attr.value.as_ref() == b"true"
        });
        Element {
            name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
            nil,
            text: String::new(),
            children: Vec::new(),
        }
    }

    fn close(self) -> (String, Value) {
        if self.nil {
            return (self.name, Value::Null);
        }
        if self.children.is_empty() {
            let value = if self.text.is_empty() {
                Value::Null
            } else {
                Value::String(self.text)
            };
            return (self.name, value);
        }

        let mut map = Map::new();
        for (key, value) in self.children {
            match map.get_mut(&key) {
                None => {
                    map.insert(key, value);
                }
                /* element values are never arrays, so an array here means a repeated sibling */
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
            }
        }
        (self.name, Value::Object(map))
    }
}

/// Parse an XML document into a tree of the root element's content.
pub fn parse(xml: &str) -> Result<Value, Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Value> = None;

    let mut attach = |stack: &mut Vec<Element>, (name, value): (String, Value)| match stack
        .last_mut()
    {
        Some(parent) => parent.children.push((name, value)),
        None => root = Some(value),
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => stack.push(Element::open(&start)),
            Ok(Event::Empty(start)) => {
                let element = Element::open(&start);
                attach(&mut stack, element.close());
            }
            Ok(Event::Text(text)) => {
                let text = text
                    .unescape()
                    .map_err(|e| Error::SchemaError(format!("Invalid XML text: {}", e)))?;
                if let Some(element) = stack.last_mut() {
                    element.text.push_str(&text);
                }
            }
            Ok(Event::CData(data)) => {
                if let Some(element) = stack.last_mut() {
                    element.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::SchemaError("Unbalanced XML document".to_string()))?;
                attach(&mut stack, element.close());
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(Error::SchemaError(format!(
                    "Invalid XML at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }

    if !stack.is_empty() {
        return Err(Error::SchemaError("Truncated XML document".to_string()));
    }
    root.ok_or_else(|| Error::SchemaError("Empty XML document".to_string()))
}

/// SOAP 1.1 fault carried in `Envelope/Body/Fault`.
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    pub code: String,
    pub message: String,
}

pub fn fault(envelope: &Value) -> Option<Fault> {
    let fault = envelope.pointer("/Body/Fault")?;
    let text = |key: &str| {
        fault
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    Some(Fault {
        code: text("faultcode"),
        message: text("faultstring"),
    })
}

/// Take `Envelope/Body/{op}Response/{op}Result` out of a parsed envelope.
pub fn result(mut envelope: Value, operation: &Operation) -> Result<Value, Error> {
    let path = format!("/Body/{op}Response/{op}Result", op = operation);
    envelope
        .pointer_mut(&path)
        .map(Value::take)
        .ok_or_else(|| Error::SchemaError(format!("Missing {} in {}", path, envelope)))
}
