//! DOM helpers over `kuchikikiki` and the XHTML serializer.
//!
//! The HTML5 parser hands back a mutable tree of `NodeRef`s. Everything that
//! changes the tree goes through the small helpers here so the node/attribute
//! plumbing stays in one place.

use crate::error::Result;
use kuchikikiki::NodeRef;
use kuchikikiki::traits::*;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Write;

pub const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";
pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
pub const MATHML_NS: &str = "http://www.w3.org/1998/Math/MathML";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

pub fn parse_html(html: &str) -> NodeRef {
    kuchikikiki::parse_html().one(html)
}

/// All nodes matching `selector`, collected so the tree can be mutated afterwards.
pub fn select_all(root: &NodeRef, selector: &str) -> Vec<NodeRef> {
    match root.select(selector) {
        Ok(matches) => matches.map(|m| m.as_node().clone()).collect(),
        Err(()) => Vec::new(),
    }
}

pub fn select_first(root: &NodeRef, selector: &str) -> Option<NodeRef> {
    root.select_first(selector).ok().map(|m| m.as_node().clone())
}

pub fn tag_name(node: &NodeRef) -> Option<String> {
    node.as_element().map(|e| e.name.local.to_string())
}

pub fn attr(node: &NodeRef, name: &str) -> Option<String> {
    let element = node.as_element()?;
    let attrs = element.attributes.borrow();
    attrs.get(name).map(|v| v.to_string())
}

pub fn set_attr(node: &NodeRef, name: &str, value: &str) {
    if let Some(element) = node.as_element() {
        element
            .attributes
            .borrow_mut()
            .insert(name, value.to_string());
    }
}

pub fn remove_attr(node: &NodeRef, name: &str) {
    if let Some(element) = node.as_element() {
        element.attributes.borrow_mut().remove(name);
    }
}

pub fn has_class(node: &NodeRef, class: &str) -> bool {
    attr(node, "class").is_some_and(|c| c.split_whitespace().any(|c| c == class))
}

/// Create a detached HTML element.
pub fn new_element(name: &str) -> Option<NodeRef> {
    let doc = parse_html(&format!("<{name}></{name}>"));
    let node = select_first(&doc, name)?;
    node.detach();
    Some(node)
}

pub fn new_element_with(name: &str, attrs: &[(&str, &str)]) -> Option<NodeRef> {
    let node = new_element(name)?;
    for (key, value) in attrs {
        set_attr(&node, key, value);
    }
    Some(node)
}

/// Replace `node` in the tree by an element called `name`, keeping attributes and children.
pub fn rename_element(node: &NodeRef, name: &str) -> Option<NodeRef> {
    let old = node.as_element()?;
    let renamed = new_element(name)?;
    if let Some(new) = renamed.as_element() {
        new.attributes.borrow_mut().map = old.attributes.borrow().map.clone();
    }
    for child in node.children().collect::<Vec<_>>() {
        renamed.append(child);
    }
    if node.parent().is_some() {
        node.insert_before(renamed.clone());
        node.detach();
    }
    Some(renamed)
}

/// Deep copy of a subtree, detached from any document.
pub fn deep_clone(node: &NodeRef) -> NodeRef {
    let copy = match node.as_element() {
        Some(element) => {
            let copy = NodeRef::new_element(element.name.clone(), None);
            if let Some(data) = copy.as_element() {
                data.attributes.borrow_mut().map = element.attributes.borrow().map.clone();
            }
            copy
        }
        None => match node.as_text() {
            Some(text) => NodeRef::new_text(text.borrow().clone()),
            None => NodeRef::new_text(""),
        },
    };
    for child in node.children() {
        if child.as_element().is_some() || child.as_text().is_some() {
            copy.append(deep_clone(&child));
        }
    }
    copy
}

/// Manifest properties implied by the content of a document.
pub fn content_properties(root: &NodeRef) -> Vec<&'static str> {
    let mut properties = Vec::new();
    let scripting = select_all(root, "script").iter().any(|script| {
        matches!(
            attr(script, "type").as_deref(),
            None | Some("application/javascript") | Some("text/javascript")
        )
    });
    if scripting || select_first(root, "form").is_some() {
        properties.push("scripted");
    }
    if select_first(root, "svg").is_some() {
        properties.push("svg");
    }
    if select_first(root, "math").is_some() {
        properties.push("mathml");
    }
    properties
}

/// Serialize a whole parsed document as a standalone XHTML file.
pub fn to_xhtml(document: &NodeRef) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.get_mut().push(b'\n');
    writer.write_event(Event::DocType(BytesText::from_escaped("html")))?;
    writer.get_mut().push(b'\n');
    for child in document.children() {
        write_node(&mut writer, &child)?;
    }
    Ok(writer.into_inner())
}

/// Serialize one node (and its subtree) as XML events.
pub fn write_node<W: Write>(writer: &mut Writer<W>, node: &NodeRef) -> Result<()> {
    if let Some(text) = node.as_text() {
        writer.write_event(Event::Text(BytesText::new(&text.borrow())))?;
        return Ok(());
    }
    let Some(element) = node.as_element() else {
        // Comments, processing instructions and doctypes are dropped.
        return Ok(());
    };

    let local = element.name.local.to_string();
    let ns: &str = &element.name.ns;
    let parent_ns = node
        .parent()
        .and_then(|p| p.as_element().map(|e| e.name.ns.to_string()));

    let mut attributes = Vec::new();
    for (name, attribute) in element.attributes.borrow().map.iter() {
        let qualified = match &attribute.prefix {
            Some(prefix) => format!("{}:{}", prefix, name.local),
            None => name.local.to_string(),
        };
        if is_xml_name(&qualified) {
            attributes.push((qualified, attribute.value.clone()));
        }
    }

    let mut start = BytesStart::new(local.as_str());
    let has = |key: &str| attributes.iter().any(|(k, _)| k == key);
    // Declared wherever the namespace changes, including XHTML under SVG `foreignObject`.
    let enters_namespace = match parent_ns.as_deref() {
        Some(parent) => parent != ns,
        None => ns != XHTML_NS,
    };
    if !has("xmlns") && (local == "html" || enters_namespace) {
        match ns {
            XHTML_NS => start.push_attribute(("xmlns", XHTML_NS)),
            SVG_NS => start.push_attribute(("xmlns", SVG_NS)),
            MATHML_NS => start.push_attribute(("xmlns", MATHML_NS)),
            _ => {}
        }
    }
    if ns == SVG_NS && enters_namespace && !has("xmlns:xlink") {
        start.push_attribute(("xmlns:xlink", XLINK_NS));
    }
    for (key, value) in &attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    let children: Vec<NodeRef> = match &element.template_contents {
        Some(contents) => contents.children().collect(),
        None => node.children().collect(),
    };
    let is_void = ns == XHTML_NS && VOID_ELEMENTS.contains(&local.as_str());
    if is_void || (ns != XHTML_NS && children.is_empty()) {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &children {
        write_node(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(local.as_str())))?;
    Ok(())
}

/// Serialize a list of nodes as an XML fragment string.
pub fn fragment_to_xhtml(nodes: &[NodeRef]) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    for node in nodes {
        write_node(&mut writer, node)?;
    }
    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
}
