use std::collections::HashMap;
use std::fmt::Write as _;
use std::ops::Range;

use super::parse::{LangBlock, TableDocument};
use super::{Lang, TranslationTable};

pub const AUTO_GENERATED_MARKER: &str = "// === Auto-generated i18n keys ===";
const DEFAULT_ENTRY_INDENT: &str = "        ";
const DEFAULT_BLOCK_INDENT: &str = "    ";

/// Double-quoted JavaScript string literal for `value`.
pub fn encode_js_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

impl TableDocument {
    /// Writes `table` back into the parsed source: changed values are replaced in place and
    /// keys the source does not have are appended to the end of their block. With no
    /// differences the source comes back byte for byte.
    #[must_use]
    pub fn serialize(&self, table: &TranslationTable) -> String {
        self.serialize_with_marker(table, AUTO_GENERATED_MARKER)
    }

    /// Same as [`TableDocument::serialize`] with a custom comment line above appended rows.
    #[must_use]
    pub fn serialize_with_marker(&self, table: &TranslationTable, marker: &str) -> String {
        let mut edits: Vec<(Range<usize>, String)> = Vec::new();
        for lang in Lang::ALL {
            let Some(block) = self.block(lang) else {
                continue;
            };
            let column = table.column(lang);

            let last_index: HashMap<&str, usize> = block
                .entries
                .iter()
                .enumerate()
                .map(|(i, e)| (e.key.as_str(), i))
                .collect();
            for (i, entry) in block.entries.iter().enumerate() {
                if last_index.get(entry.key.as_str()) != Some(&i) {
                    continue;
                }
                if let Some(value) = column.get(&entry.key) {
                    if *value != entry.value {
                        edits.push((entry.value_span.clone(), encode_js_string(value)));
                    }
                }
            }

            let new_rows: Vec<(&String, &String)> = column
                .iter()
                .filter(|(k, _)| !last_index.contains_key(k.as_str()))
                .collect();
            if !new_rows.is_empty() {
                edits.extend(append_edits(&self.source, block, &new_rows, marker));
            }
        }
        apply_edits(&self.source, edits)
    }
}

fn append_edits(
    source: &str,
    block: &LangBlock,
    new_rows: &[(&String, &String)],
    marker: &str,
) -> Vec<(Range<usize>, String)> {
    let mut edits = Vec::new();
    let indent = block.entry_indent.as_deref().unwrap_or(DEFAULT_ENTRY_INDENT);

    if let Some(last) = block.entries.last() {
        if !block.trailing_comma {
            let at = last.value_span.end;
            edits.push((at..at, ",".to_string()));
        }
    }

    let close = block.close_brace;
    let line_start = source[..close].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let at_line_start = source[line_start..close].trim().is_empty();
    let at = if at_line_start { line_start } else { close };
    let has_marker = source[block.open_brace..close].contains(marker);

    let mut text = String::new();
    if !at_line_start {
        text.push('\n');
    }
    if !has_marker {
        if !block.entries.is_empty() {
            text.push('\n');
        }
        text.push_str(indent);
        text.push_str(marker);
        text.push('\n');
    }
    for (i, (key, value)) in new_rows.iter().enumerate() {
        let is_last = i + 1 == new_rows.len();
        let comma = if !is_last || block.trailing_comma { "," } else { "" };
        let _ = writeln!(
            text,
            "{indent}{}: {}{comma}",
            encode_js_string(key),
            encode_js_string(value)
        );
    }
    if !at_line_start {
        text.push_str(&block.header_indent);
    }
    edits.push((at..at, text));
    edits
}

fn apply_edits(source: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    if edits.is_empty() {
        return source.to_string();
    }
    edits.sort_by(|a, b| b.0.start.cmp(&a.0.start).then(b.0.end.cmp(&a.0.end)));
    let mut out = source.to_string();
    for (range, text) in edits {
        out.replace_range(range, &text);
    }
    out
}

/// Canonical source for a table that has no file yet.
#[must_use]
pub fn render_fresh(table: &TranslationTable) -> String {
    let mut out = String::from("const translations = {\n");
    for (li, lang) in Lang::ALL.into_iter().enumerate() {
        let _ = writeln!(out, "{DEFAULT_BLOCK_INDENT}{}: {{", lang.code());
        let column = table.column(lang);
        for (i, (key, value)) in column.iter().enumerate() {
            let comma = if i + 1 < column.len() { "," } else { "" };
            let _ = writeln!(
                out,
                "{DEFAULT_ENTRY_INDENT}{}: {}{comma}",
                encode_js_string(key),
                encode_js_string(value)
            );
        }
        let comma = if li + 1 < Lang::ALL.len() { "," } else { "" };
        let _ = writeln!(out, "{DEFAULT_BLOCK_INDENT}}}{comma}");
    }
    out.push_str("};\n");
    out
}
