use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Context;
use lol_html::{doc_text, element, EndTagHandler, HtmlRewriter, Settings};

use crate::textutil::{decode_entities, normalize_text};

/// Elements whose content never carries page text.
const EXCLUDED: &[&str] = &["head", "script", "style"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Child {
    /// A whole text node, raw as it appears in the source.
    Text(String),
    Element(usize),
}

/// One element, numbered by the order of its start tag.
#[derive(Clone, Debug, Default)]
pub struct Node {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Child>,
    /// The end tag was seen. Void and unclosed elements stay `false`.
    pub closed: bool,
    /// Inside `<head>`, `<script>` or `<style>`.
    pub excluded: bool,
}

impl Node {
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }
}

/// The element structure of a page, read without changing it. Comments are skipped by
/// the parser, so nothing inside them shows up here.
#[derive(Clone, Debug, Default)]
pub struct Outline {
    nodes: Vec<Node>,
}

#[derive(Default)]
struct Collector {
    nodes: Vec<Node>,
    stack: Vec<usize>,
    /// The last text chunk did not end its text node.
    open_text: bool,
}

impl Collector {
    fn close(&mut self, idx: usize) {
        if let Some(depth) = self.stack.iter().rposition(|&n| n == idx) {
            self.stack.truncate(depth);
        }
        self.nodes[idx].closed = true;
        self.open_text = false;
    }
}

impl Outline {
    pub fn parse(src: &str) -> anyhow::Result<Self> {
        let state = Rc::new(RefCell::new(Collector::default()));
        let on_element = Rc::clone(&state);
        let on_text = Rc::clone(&state);

        let mut rewriter = HtmlRewriter::new(
            Settings {
                element_content_handlers: vec![element!("*", move |el| {
                    let name = el.tag_name();
                    let attrs = el
                        .attributes()
                        .iter()
                        .map(|a| (a.name(), a.value()))
                        .collect();
                    let idx = {
                        let mut c = on_element.borrow_mut();
                        let parent = c.stack.last().copied();
                        let excluded = EXCLUDED.contains(&name.as_str())
                            || parent.is_some_and(|p| c.nodes[p].excluded);
                        let idx = c.nodes.len();
                        c.nodes.push(Node {
                            name,
                            attrs,
                            excluded,
                            ..Node::default()
                        });
                        if let Some(p) = parent {
                            c.nodes[p].children.push(Child::Element(idx));
                        }
                        c.open_text = false;
                        idx
                    };
                    if let Some(handlers) = el.end_tag_handlers() {
                        on_element.borrow_mut().stack.push(idx);
                        let state = Rc::clone(&on_element);
                        let handler: EndTagHandler<'static> = Box::new(move |_| {
                            state.borrow_mut().close(idx);
                            Ok(())
                        });
                        handlers.push(handler);
                    }
                    Ok(())
                })],
                document_content_handlers: vec![doc_text!(move |chunk| {
                    let mut c = on_text.borrow_mut();
                    let continues = c.open_text;
                    c.open_text = !chunk.last_in_text_node();
                    let Some(&top) = c.stack.last() else {
                        return Ok(());
                    };
                    let children = &mut c.nodes[top].children;
                    match children.last_mut() {
                        Some(Child::Text(text)) if continues => text.push_str(chunk.as_str()),
                        _ => children.push(Child::Text(chunk.as_str().to_string())),
                    }
                    Ok(())
                })],
                ..Settings::default()
            },
            |_: &[u8]| {},
        );
        rewriter
            .write(src.as_bytes())
            .context("parse html")?;
        rewriter.end().context("parse html")?;

        let nodes = std::mem::take(&mut state.borrow_mut().nodes);
        Ok(Self { nodes })
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn node(&self, idx: usize) -> &Node {
        &self.nodes[idx]
    }

    /// True when any element below `idx` carries `attr`.
    #[must_use]
    pub fn descendant_has_attr(&self, idx: usize, attr: &str) -> bool {
        self.nodes[idx].children.iter().any(|child| match child {
            Child::Element(c) => self.nodes[*c].has_attr(attr) || self.descendant_has_attr(*c, attr),
            Child::Text(_) => false,
        })
    }

    /// Visible text of an element: entities decoded, whitespace collapsed, `<br>` read as
    /// a space, tags dropped. Empty for elements with no end tag.
    #[must_use]
    pub fn visible_text(&self, idx: usize) -> String {
        if !self.nodes[idx].closed {
            return String::new();
        }
        let mut raw = String::new();
        self.push_text(idx, &mut raw);
        normalize_text(&raw)
    }

    fn push_text(&self, idx: usize, out: &mut String) {
        for child in &self.nodes[idx].children {
            match child {
                Child::Text(text) => out.push_str(&decode_entities(text)),
                Child::Element(c) if self.nodes[*c].name == "br" => out.push(' '),
                Child::Element(c) => self.push_text(*c, out),
            }
        }
    }
}
