//! Minimal namespace-aware XML element tree.
//!
//! Documents are parsed with `quick-xml` into [`Element`] trees carrying
//! resolved namespace URIs. Text is trimmed of XML whitespace and
//! whitespace-only text is dropped, so two documents that differ only in
//! indentation or prefix choice compare equal.
//!
//! The same tree type is used to build documents for output; see
//! [`Element::to_xml_string`].

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::qname::QName;

/// Namespace bound to the reserved `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Errors from parsing or serializing XML.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("XML syntax error: {message}")]
    Syntax { message: String },
    #[error("undeclared namespace prefix '{prefix}'")]
    UndeclaredPrefix { prefix: String },
    #[error("document has no root element")]
    Empty,
    #[error("document ended inside element '{name}'")]
    Unclosed { name: String },
    #[error("unexpected text outside the root element")]
    StrayText,
    #[error("XML write error: {message}")]
    Write { message: String },
}

fn syntax(e: impl fmt::Display) -> XmlError {
    XmlError::Syntax {
        message: e.to_string(),
    }
}

fn write_err(e: impl fmt::Display) -> XmlError {
    XmlError::Write {
        message: e.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tree model
// ---------------------------------------------------------------------------

/// A child of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An XML element with its namespace resolved.
///
/// Equality is structural: namespace URI, local name, the attribute set
/// (order-insensitive) and children. Prefixes and namespace declarations are
/// presentation details and are ignored.
#[derive(Debug, Clone, Default)]
pub struct Element {
    namespace: Option<String>,
    prefix: Option<String>,
    local_name: String,
    attributes: Vec<(String, String)>,
    declarations: Vec<(String, String)>,
    /// In-scope prefix bindings; the default namespace is keyed by `""`.
    scope: BTreeMap<String, String>,
    children: Vec<Node>,
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace
            && self.local_name == other.local_name
            && sorted(&self.attributes) == sorted(&other.attributes)
            && self.children == other.children
    }
}

fn sorted(attrs: &[(String, String)]) -> Vec<&(String, String)> {
    let mut v: Vec<_> = attrs.iter().collect();
    v.sort();
    v
}

impl Element {
    /// Creates an element with no namespace.
    pub fn new(local_name: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
            ..Self::default()
        }
    }

    /// Creates an element in `namespace`, written with `prefix` (`None` for
    /// the default namespace).
    pub fn qualified(prefix: Option<&str>, namespace: &str, local_name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.to_string()),
            prefix: prefix.map(str::to_string),
            local_name: local_name.into(),
            ..Self::default()
        }
    }

    /// Adds a namespace declaration (`""` declares the default namespace).
    #[must_use]
    pub fn declare(mut self, prefix: &str, uri: &str) -> Self {
        self.declarations.push((prefix.to_string(), uri.to_string()));
        self.scope.insert(prefix.to_string(), uri.to_string());
        self
    }

    /// Sets an attribute, replacing an existing value.
    #[must_use]
    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    /// Appends a child element.
    pub fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Builder form of [`push`](Self::push).
    #[must_use]
    pub fn child(mut self, child: Element) -> Self {
        self.push(child);
        self
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(Node::Text(text.into()));
    }

    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Returns `true` if this element is `{namespace}local_name`.
    #[must_use]
    pub fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.namespace.as_deref() == Some(namespace) && self.local_name == local_name
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Child elements, skipping text.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// Child elements named `{namespace}local_name`.
    pub fn elements_named<'a, 'n>(
        &'a self,
        namespace: &'n str,
        local_name: &'n str,
    ) -> impl Iterator<Item = &'a Element> + 'n
    where
        'a: 'n,
    {
        self.elements().filter(move |e| e.is(namespace, local_name))
    }

    /// First child element named `{namespace}local_name`.
    #[must_use]
    pub fn first_element(&self, namespace: &str, local_name: &str) -> Option<&Element> {
        self.elements().find(|e| e.is(namespace, local_name))
    }

    /// Concatenated text content of direct text children.
    #[must_use]
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// Resolves a prefixed name such as `tns:sayHello` against the
    /// namespace bindings in scope at this element.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::UndeclaredPrefix`] if the prefix is not bound.
    pub fn resolve_qname(&self, value: &str) -> Result<QName, XmlError> {
        let value = value.trim();
        let (prefix, local) = split_prefixed(value);
        let namespace = self.lookup_namespace(prefix.unwrap_or(""));
        match (prefix, namespace) {
            (_, Some(ns)) => Ok(QName::new(ns, local)),
            (None, None) => Ok(QName::local(local)),
            (Some(p), None) => Err(XmlError::UndeclaredPrefix {
                prefix: p.to_string(),
            }),
        }
    }

    fn lookup_namespace(&self, prefix: &str) -> Option<String> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE.to_string());
        }
        self.scope.get(prefix).filter(|uri| !uri.is_empty()).cloned()
    }

    fn qualified_name(&self) -> Cow<'_, str> {
        match &self.prefix {
            Some(p) => Cow::Owned(format!("{p}:{}", self.local_name)),
            None => Cow::Borrowed(&self.local_name),
        }
    }

    // -----------------------------------------------------------------------
    // Output
    // -----------------------------------------------------------------------

    /// Serializes the element as an indented, standalone XML document.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::Write`] if the underlying writer fails.
    pub fn write_document<W: Write>(&self, out: W) -> Result<(), XmlError> {
        let mut writer = Writer::new_with_indent(out, b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
            .map_err(write_err)?;
        self.write_element(&mut writer)?;
        writer.into_inner().flush().map_err(write_err)
    }

    /// Serializes the element into a string.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::Write`] if serialization fails.
    pub fn to_xml_string(&self) -> Result<String, XmlError> {
        let mut buf = Vec::new();
        self.write_document(&mut buf)?;
        String::from_utf8(buf).map_err(write_err)
    }

    fn write_element<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), XmlError> {
        let name = self.qualified_name();
        let mut start = BytesStart::new(name.as_ref());
        for (prefix, uri) in &self.declarations {
            let key = if prefix.is_empty() {
                "xmlns".to_string()
            } else {
                format!("xmlns:{prefix}")
            };
            start.push_attribute((key.as_str(), uri.as_str()));
        }
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() {
            return writer.write_event(Event::Empty(start)).map_err(write_err);
        }

        writer.write_event(Event::Start(start)).map_err(write_err)?;
        for child in &self.children {
            match child {
                Node::Element(e) => e.write_element(writer)?,
                Node::Text(t) => writer
                    .write_event(Event::Text(BytesText::new(t)))
                    .map_err(write_err)?,
            }
        }
        writer
            .write_event(Event::End(BytesEnd::new(name.as_ref())))
            .map_err(write_err)
    }
}

fn split_prefixed(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Element under construction plus the text collected since the last tag.
struct Frame {
    element: Element,
    text: String,
}

impl Frame {
    fn flush_text(&mut self) {
        let trimmed = self.text.trim_matches(is_xml_whitespace);
        if !trimmed.is_empty() {
            self.element.push_text(trimmed);
        }
        self.text.clear();
    }
}

fn is_xml_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Parses a document and returns its root element.
///
/// # Errors
///
/// Returns an [`XmlError`] for malformed markup, undeclared prefixes, or a
/// document without a root element.
pub fn parse(text: &str) -> Result<Element, XmlError> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event().map_err(syntax)? {
            Event::Start(start) => {
                let element = open_element(&start, stack.last().map(|f| &f.element.scope))?;
                if let Some(parent) = stack.last_mut() {
                    parent.flush_text();
                }
                stack.push(Frame {
                    element,
                    text: String::new(),
                });
            }
            Event::Empty(start) => {
                let element = open_element(&start, stack.last().map(|f| &f.element.scope))?;
                close_element(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let mut frame = stack.pop().ok_or_else(|| syntax("unmatched end tag"))?;
                frame.flush_text();
                close_element(&mut stack, &mut root, frame.element)?;
            }
            Event::Text(t) => {
                let content = t.unescape().map_err(syntax)?;
                append_text(&mut stack, &content)?;
            }
            Event::CData(c) => {
                let content = std::str::from_utf8(&c).map_err(syntax)?;
                append_text(&mut stack, content)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(frame) = stack.pop() {
        return Err(XmlError::Unclosed {
            name: frame.element.qualified_name().into_owned(),
        });
    }
    root.ok_or(XmlError::Empty)
}

fn append_text(stack: &mut [Frame], content: &str) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(frame) => {
            frame.text.push_str(content);
            Ok(())
        }
        None if content.trim_matches(is_xml_whitespace).is_empty() => Ok(()),
        None => Err(XmlError::StrayText),
    }
}

fn close_element(
    stack: &mut [Frame],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.flush_text();
            parent.element.push(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(syntax("multiple root elements")),
    }
}

fn open_element(
    start: &BytesStart<'_>,
    parent_scope: Option<&BTreeMap<String, String>>,
) -> Result<Element, XmlError> {
    let mut element = Element {
        scope: parent_scope.cloned().unwrap_or_default(),
        ..Element::default()
    };

    for attr in start.attributes() {
        let attr = attr.map_err(syntax)?;
        let key = std::str::from_utf8(attr.key.as_ref()).map_err(syntax)?;
        let value = attr.unescape_value().map_err(syntax)?.into_owned();
        if key == "xmlns" {
            element.declarations.push((String::new(), value.clone()));
            element.scope.insert(String::new(), value);
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            element.declarations.push((prefix.to_string(), value.clone()));
            element.scope.insert(prefix.to_string(), value);
        } else {
            element.attributes.push((key.to_string(), value));
        }
    }

    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(syntax)?
        .to_string();
    let (prefix, local) = split_prefixed(&name);
    element.namespace = element.lookup_namespace(prefix.unwrap_or(""));
    if let (Some(p), None) = (prefix, &element.namespace) {
        return Err(XmlError::UndeclaredPrefix {
            prefix: p.to_string(),
        });
    }
    element.prefix = prefix.map(str::to_string);
    element.local_name = local.to_string();
    Ok(element)
}
