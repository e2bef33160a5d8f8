//! Hierarchical XML configuration with conditional directives.
//!
//! ```xml
//! <lockss-config>
//!   <property name="fleet.ui">
//!     <property name="port" value="8081"/>
//!     <if group="beta">
//!       <then><property name="debug" value="true"/></then>
//!       <else><property name="debug" value="false"/></else>
//!     </if>
//!   </property>
//!   <property name="fleet.hosts">
//!     <list><value>a</value><value>b</value></list>
//!   </property>
//! </lockss-config>
//! ```
//!
//! The document is first read into a small element tree and then walked,
//! so conditions can be evaluated with the whole `<if>` element in hand.

use quick_xml::{Reader, events::Event};

use super::conditions::Conditionals;
use crate::tree::{ValueTree, key_ops::join_key, typed::join_list};

const ROOTS: [&str; 3] = ["lockss-config", "fleet-config", "config"];

#[derive(Debug)]
enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) => Some(text.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }
}

/// Parses an XML document, evaluating conditionals against `cond`.
///
/// # Errors
/// Returns a message for malformed XML, unknown elements or attributes,
/// and unknown conditional tests.
pub fn parse_xml(text: &str, cond: &Conditionals) -> Result<ValueTree, String> {
    let root = read_document(text)?;

    if !ROOTS.contains(&root.name.as_str()) {
        return Err(format!("unexpected root element <{}>", root.name));
    }

    let mut walker = Walker {
        cond,
        tree: ValueTree::new(),
    };

    let mut stray = Vec::new();
    walker.body(&root.children, "", &mut stray)?;
    if !stray.is_empty() {
        return Err("value outside of a <property>".to_string());
    }

    Ok(walker.tree)
}

fn read_document(text: &str) -> Result<Element, String> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event().map_err(|e| format!("XML error: {e}"))?;

        match event {
            Event::Start(start) => {
                stack.push(element_from(&start)?);
            }
            Event::Empty(start) => {
                let element = element_from(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| "unbalanced closing tag".to_string())?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| format!("XML error: {e}"))?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::Text(text.into_owned()));
                }
            }
            Event::CData(data) => {
                let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::Text(text));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err("unexpected end of document".to_string());
    }

    root.ok_or_else(|| "empty document".to_string())
}

fn element_from(start: &quick_xml::events::BytesStart<'_>) -> Result<Element, String> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();

    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| format!("bad attribute on <{name}>: {e}"))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| format!("bad attribute on <{name}>: {e}"))?
            .into_owned();
        attrs.push((key, value));
    }

    Ok(Element {
        name,
        attrs,
        children: Vec::new(),
    })
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<(), String> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => return Err("multiple root elements".to_string()),
    }
    Ok(())
}

struct Walker<'a> {
    cond: &'a Conditionals,
    tree: ValueTree,
}

impl Walker<'_> {
    /// Walks the children of a container. Values found directly in the
    /// body (text, `<value>`, `<list>`) are collected into `values` for the
    /// enclosing property.
    fn body(&mut self, children: &[Node], prefix: &str, values: &mut Vec<String>) -> Result<(), String> {
        for node in children {
            match node {
                Node::Text(text) => {
                    let text = text.trim();
                    if !text.is_empty() {
                        values.push(text.to_string());
                    }
                }
                Node::Element(el) => self.element(el, prefix, values)?,
            }
        }
        Ok(())
    }

    fn element(&mut self, el: &Element, prefix: &str, values: &mut Vec<String>) -> Result<(), String> {
        match el.name.as_str() {
            "property" => self.property(el, prefix),
            "value" => {
                values.push(el.text().trim().to_string());
                Ok(())
            }
            "list" => {
                for item in el.elements() {
                    if item.name != "value" {
                        return Err(format!("unexpected <{}> inside <list>", item.name));
                    }
                    values.push(item.text().trim().to_string());
                }
                Ok(())
            }
            "if" => self.conditional(el, prefix, values),
            other => Err(format!("unknown element <{other}>")),
        }
    }

    fn property(&mut self, el: &Element, prefix: &str) -> Result<(), String> {
        let mut name = None;
        let mut values = Vec::new();

        for (attr, value) in &el.attrs {
            match attr.as_str() {
                "name" => name = Some(value.as_str()),
                "value" => values.push(value.clone()),
                other => return Err(format!("unknown attribute '{other}' on <property>")),
            }
        }

        let name = name.ok_or_else(|| "<property> without a name".to_string())?;
        let key = join_key(prefix, name);

        self.body(&el.children, &key, &mut values)?;

        if !values.is_empty() {
            self.tree
                .put(key, join_list(&values))
                .map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    fn conditional(&mut self, el: &Element, prefix: &str, values: &mut Vec<String>) -> Result<(), String> {
        let mut holds = self.attributes_hold(el)?;

        let mut then_branch = None;
        let mut else_branch = None;
        let mut implicit = Vec::new();

        for child in &el.children {
            match child {
                Node::Element(c) if c.name == "then" => then_branch = Some(c),
                Node::Element(c) if c.name == "else" => else_branch = Some(c),
                Node::Element(c) if is_condition(&c.name) => {
                    holds = self.condition(c)? && holds;
                }
                other => implicit.push(other),
            }
        }

        let branch: Vec<&Node> = match (holds, then_branch, else_branch) {
            (true, Some(then), _) => then.children.iter().collect(),
            (false, _, Some(otherwise)) => otherwise.children.iter().collect(),
            (true, None, _) => implicit,
            (false, _, None) => Vec::new(),
        };

        for node in branch {
            match node {
                Node::Element(child) => self.element(child, prefix, values)?,
                Node::Text(text) if !text.trim().is_empty() => values.push(text.trim().to_string()),
                Node::Text(_) => {}
            }
        }
        Ok(())
    }

    fn attributes_hold(&self, el: &Element) -> Result<bool, String> {
        let mut holds = true;
        for (attr, value) in &el.attrs {
            holds = self.cond.test(attr, value)? && holds;
        }
        Ok(holds)
    }

    fn condition(&self, el: &Element) -> Result<bool, String> {
        let mut results = Vec::new();
        for child in el.elements() {
            if !is_condition(&child.name) {
                return Err(format!("unexpected <{}> inside <{}>", child.name, el.name));
            }
            results.push(self.condition(child)?);
        }

        match el.name.as_str() {
            "test" => self.attributes_hold(el),
            "and" => Ok(results.iter().all(|r| *r)),
            "or" => Ok(results.iter().any(|r| *r)),
            "not" => Ok(!results.iter().all(|r| *r)),
            other => Err(format!("unknown condition <{other}>")),
        }
    }
}

fn is_condition(name: &str) -> bool {
    matches!(name, "and" | "or" | "not" | "test")
}
