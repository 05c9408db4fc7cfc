use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use anyhow::Context;
use lol_html::html_content::ContentType;
use lol_html::{doc_text, element, EndTagHandler, HtmlRewriter, Settings};

use crate::classify::Classifier;
use crate::keys::{derive_key, KeyRegistry, KeyRules};

use super::outline::{Child, Outline};

pub const DEFAULT_MARKER_ATTR: &str = "data-i18n";

pub const DEFAULT_LEAF_TAGS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "span", "button", "label", "th", "td", "li", "dt",
    "dd", "figcaption", "strong", "em", "summary",
];

pub const DEFAULT_HOTLINE_CLASSES: &[&str] = &["hotline-item"];

#[derive(Clone, Debug)]
pub struct ScanSettings {
    pub marker_attr: String,
    pub leaf_tags: HashSet<String>,
    pub hotline_classes: Vec<String>,
    pub key_rules: KeyRules,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            marker_attr: DEFAULT_MARKER_ATTR.to_string(),
            leaf_tags: DEFAULT_LEAF_TAGS.iter().map(|s| s.to_string()).collect(),
            hotline_classes: DEFAULT_HOTLINE_CLASSES.iter().map(|s| s.to_string()).collect(),
            key_rules: KeyRules::default(),
        }
    }
}

/// A key minted during a scan, with the English text it is bound to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveredRow {
    pub key: String,
    pub en: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SkipTally {
    pub already_marked: usize,
    pub not_leaf: usize,
    pub not_translatable: usize,
    pub unkeyable: usize,
}

#[derive(Clone, Debug, Default)]
pub struct ScanOutcome {
    pub html: String,
    pub annotated: usize,
    pub rows: Vec<DiscoveredRow>,
    pub skipped: SkipTally,
}

impl ScanOutcome {
    #[must_use]
    pub fn changed(&self) -> bool {
        self.annotated > 0
    }
}

/// The content of a leaf. Text indices count the element's own text nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Shape {
    Plain,
    IconText { first: usize, last: usize },
}

enum Verdict {
    Annotate { shape: Shape, text: String },
    AlreadyMarked,
    NotLeaf,
    NotTranslatable,
}

/// What the rewrite pass does to the element with a given start-tag number.
#[derive(Clone, Debug)]
enum Edit {
    Mark(String),
    Wrap {
        key: String,
        first: usize,
        last: usize,
    },
}

pub struct Scanner<'a> {
    classifier: &'a Classifier,
    settings: &'a ScanSettings,
}

impl<'a> Scanner<'a> {
    pub fn new(classifier: &'a Classifier, settings: &'a ScanSettings) -> Self {
        Self {
            classifier,
            settings,
        }
    }

    /// Marks every eligible text element of `src` that lacks a marker, minting keys through
    /// `registry`. Rows are reported only for keys the registry did not know yet.
    pub fn scan_and_annotate(
        &self,
        src: &str,
        page_prefix: &str,
        registry: &mut KeyRegistry,
    ) -> anyhow::Result<ScanOutcome> {
        let outline = Outline::parse(src)?;
        let mut out = ScanOutcome::default();
        let mut plan: HashMap<usize, Edit> = HashMap::new();

        for (idx, node) in outline.nodes().iter().enumerate() {
            let is_anchor = node.name == "a";
            if !is_anchor && !self.settings.leaf_tags.contains(&node.name) {
                continue;
            }
            if !node.closed || node.excluded {
                continue;
            }

            let (shape, text) = match self.judge(&outline, idx, is_anchor) {
                Verdict::Annotate { shape, text } => (shape, text),
                Verdict::AlreadyMarked => {
                    out.skipped.already_marked += 1;
                    continue;
                }
                Verdict::NotLeaf => {
                    out.skipped.not_leaf += 1;
                    continue;
                }
                Verdict::NotTranslatable => {
                    out.skipped.not_translatable += 1;
                    continue;
                }
            };

            let Some(base) = derive_key(&text, page_prefix, &self.settings.key_rules) else {
                out.skipped.unkeyable += 1;
                continue;
            };
            let assigned = registry.assign(&base, &text);
            let edit = match shape {
                Shape::Plain => Edit::Mark(assigned.key.clone()),
                Shape::IconText { first, last } => Edit::Wrap {
                    key: assigned.key.clone(),
                    first,
                    last,
                },
            };
            plan.insert(idx, edit);
            out.annotated += 1;
            if assigned.is_new {
                out.rows.push(DiscoveredRow {
                    key: assigned.key,
                    en: text,
                });
            }
        }

        out.html = if plan.is_empty() {
            src.to_string()
        } else {
            annotate(src, &plan, &self.settings.marker_attr)?
        };
        Ok(out)
    }

    fn judge(&self, outline: &Outline, idx: usize, is_anchor: bool) -> Verdict {
        let node = outline.node(idx);
        let marker = self.settings.marker_attr.as_str();
        if node.has_attr(marker) || outline.descendant_has_attr(idx, marker) {
            return Verdict::AlreadyMarked;
        }
        let class_attr = node.attr("class").unwrap_or("");
        if self.classifier.should_skip_by_class(class_attr) {
            return Verdict::NotTranslatable;
        }
        let Some(shape) = leaf_shape(outline, idx) else {
            return Verdict::NotLeaf;
        };

        let text = outline.visible_text(idx);
        if text.is_empty() || self.classifier.should_skip(&text) {
            return Verdict::NotTranslatable;
        }
        if node.has_attr("onclick") {
            return Verdict::NotTranslatable;
        }
        if self
            .settings
            .hotline_classes
            .iter()
            .any(|h| class_attr.contains(h.as_str()))
        {
            return Verdict::NotTranslatable;
        }
        if node.has_attr("aria-current") {
            return Verdict::NotTranslatable;
        }
        if is_anchor && (text.starts_with("http") || text.starts_with("www.")) {
            return Verdict::NotTranslatable;
        }
        Verdict::Annotate { shape, text }
    }
}

/// Classifies element content made only of text, `<br>` and empty `<i>` glyphs. Returns
/// `None` for anything else, and for icons sitting between two pieces of text. The text
/// region runs from the first to the last non-blank text node, so a trailing `<br>` stays
/// outside it.
fn leaf_shape(outline: &Outline, idx: usize) -> Option<Shape> {
    // (position among children, index among text nodes)
    let mut first: Option<(usize, usize)> = None;
    let mut last: Option<(usize, usize)> = None;
    let mut icons: Vec<usize> = Vec::new();
    let mut text_nodes = 0;

    for (pos, child) in outline.node(idx).children.iter().enumerate() {
        match child {
            Child::Text(raw) => {
                if !raw.trim().is_empty() {
                    first.get_or_insert((pos, text_nodes));
                    last = Some((pos, text_nodes));
                }
                text_nodes += 1;
            }
            Child::Element(c) => {
                let el = outline.node(*c);
                match el.name.as_str() {
                    "br" => {}
                    "i" if is_empty_icon(outline, *c) => icons.push(pos),
                    _ => return None,
                }
            }
        }
    }

    let (Some((first_pos, first)), Some((last_pos, last))) = (first, last) else {
        return Some(Shape::Plain);
    };
    if icons.is_empty() {
        return Some(Shape::Plain);
    }
    if icons.iter().any(|&p| p > first_pos && p < last_pos) {
        return None;
    }
    Some(Shape::IconText { first, last })
}

fn is_empty_icon(outline: &Outline, idx: usize) -> bool {
    let node = outline.node(idx);
    node.closed
        && node.children.iter().all(|child| match child {
            Child::Text(raw) => raw.trim().is_empty(),
            Child::Element(_) => false,
        })
}

#[derive(Default)]
struct Annotator {
    next: usize,
    /// (element number, text nodes seen so far) for every open element.
    stack: Vec<(usize, usize)>,
    /// Element number and text-node index of a text node still being delivered.
    current: Option<(usize, usize)>,
    open_text: bool,
    buffered: String,
}

impl Annotator {
    fn close(&mut self, idx: usize) {
        if let Some(depth) = self.stack.iter().rposition(|&(n, _)| n == idx) {
            self.stack.truncate(depth);
        }
        self.open_text = false;
    }
}

/// Rewrites `src`, applying `plan` to elements by start-tag number. Elements are numbered
/// the same way `Outline::parse` numbers them.
fn annotate(src: &str, plan: &HashMap<usize, Edit>, marker: &str) -> anyhow::Result<String> {
    let state = Rc::new(RefCell::new(Annotator::default()));
    let on_element = Rc::clone(&state);
    let on_text = Rc::clone(&state);
    let mut html: Vec<u8> = Vec::with_capacity(src.len() + plan.len() * 32);

    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![element!("*", move |el| {
                let idx = {
                    let mut a = on_element.borrow_mut();
                    let idx = a.next;
                    a.next += 1;
                    a.open_text = false;
                    idx
                };
                if let Some(Edit::Mark(key)) = plan.get(&idx) {
                    el.set_attribute(marker, key)?;
                }
                if let Some(handlers) = el.end_tag_handlers() {
                    on_element.borrow_mut().stack.push((idx, 0));
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
                let mut a = on_text.borrow_mut();
                if !a.open_text {
                    a.current = a.stack.last_mut().map(|(idx, seen)| {
                        *seen += 1;
                        (*idx, *seen - 1)
                    });
                }
                a.open_text = !chunk.last_in_text_node();
                let Some((idx, nth)) = a.current else {
                    return Ok(());
                };
                let Some(Edit::Wrap { key, first, last }) = plan.get(&idx) else {
                    return Ok(());
                };
                if nth < *first || nth > *last {
                    return Ok(());
                }
                a.buffered.push_str(chunk.as_str());
                if a.open_text {
                    chunk.remove();
                    return Ok(());
                }
                let raw = std::mem::take(&mut a.buffered);
                let open = (nth == *first).then(|| format!("<span {marker}=\"{key}\">"));
                let close = (nth == *last).then_some("</span>");
                chunk.replace(&wrap_trimmed(&raw, open.as_deref(), close), ContentType::Html);
                Ok(())
            })],
            ..Settings::default()
        },
        |c: &[u8]| html.extend_from_slice(c),
    );
    rewriter.write(src.as_bytes()).context("annotate html")?;
    rewriter.end().context("annotate html")?;
    String::from_utf8(html).context("annotated html is not utf-8")
}

/// Places `open` before the first and `close` after the last non-blank character.
fn wrap_trimmed(raw: &str, open: Option<&str>, close: Option<&str>) -> String {
    let body = raw.trim();
    let lead = &raw[..raw.len() - raw.trim_start().len()];
    let tail = &raw[lead.len() + body.len()..];
    let mut out = String::with_capacity(raw.len() + 64);
    out.push_str(lead);
    out.push_str(open.unwrap_or(""));
    out.push_str(body);
    out.push_str(close.unwrap_or(""));
    out.push_str(tail);
    out
}
