use std::ops::Range;

use anyhow::{anyhow, Context};
use indexmap::IndexMap;
use regex::Regex;

use super::{Lang, TranslationTable};

/// A `"key": "value"` pair as written in a language block.
#[derive(Clone, Debug)]
pub(crate) struct EntrySpan {
    pub key: String,
    pub value: String,
    /// Quoted value literal, quotes included.
    pub value_span: Range<usize>,
}

#[derive(Clone, Debug)]
pub(crate) struct LangBlock {
    pub lang: Lang,
    /// Indentation of the line holding `lang: {`.
    pub header_indent: String,
    pub open_brace: usize,
    pub close_brace: usize,
    pub entries: Vec<EntrySpan>,
    /// Whether the last entry is followed by a comma.
    pub trailing_comma: bool,
    /// Indentation of the first entry line, if any.
    pub entry_indent: Option<String>,
}

/// A parsed translation table source. Keeps the text so that writing back touches only the
/// values that changed and the rows that were added.
#[derive(Clone, Debug)]
pub struct TableDocument {
    pub(crate) source: String,
    pub(crate) blocks: Vec<LangBlock>,
    table: TranslationTable,
}

impl TableDocument {
    #[must_use]
    pub fn table(&self) -> &TranslationTable {
        &self.table
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn block(&self, lang: Lang) -> Option<&LangBlock> {
        self.blocks.iter().find(|b| b.lang == lang)
    }
}

/// Parses the three language blocks of a table source. Any structural problem is an error
/// naming the block it was found in.
pub fn load(source: &str) -> anyhow::Result<TableDocument> {
    let mut blocks = Vec::with_capacity(Lang::ALL.len());
    let mut columns: [IndexMap<String, String>; 3] = Default::default();

    for (i, lang) in Lang::ALL.into_iter().enumerate() {
        let block = read_block(source, lang).with_context(|| format!("`{lang}` block"))?;
        for entry in &block.entries {
            columns[i].insert(entry.key.clone(), entry.value.clone());
        }
        blocks.push(block);
    }

    Ok(TableDocument {
        source: source.to_string(),
        blocks,
        table: TranslationTable::from_columns(columns),
    })
}

fn find_header(source: &str, lang: Lang) -> anyhow::Result<(usize, String)> {
    let re = Regex::new(&format!(
        r#"(?m)^([ \t]*)["']?{}["']?[ \t]*:[ \t]*\{{"#,
        regex::escape(lang.code())
    ))
    .context("compile block header pattern")?;
    let caps = re
        .captures(source)
        .ok_or_else(|| anyhow!("language block `{lang}: {{` not found"))?;
    let whole = caps.get(0).ok_or_else(|| anyhow!("empty header match"))?;
    let indent = caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default();
    // position of the `{`
    Ok((whole.end() - 1, indent))
}

#[derive(Debug)]
enum Tok {
    Str { value: String, span: Range<usize> },
    Ident { value: String },
    Colon,
    Comma,
    Close(usize),
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn next(&mut self) -> anyhow::Result<Tok> {
        let src = self.src;
        let bytes = src.as_bytes();
        loop {
            while self.pos < bytes.len() && bytes[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }
            let rest = &src[self.pos..];
            if rest.starts_with("//") {
                self.pos += rest.find('\n').unwrap_or(rest.len());
                continue;
            }
            if rest.starts_with("/*") {
                let end = rest[2..]
                    .find("*/")
                    .ok_or_else(|| self.error("unterminated comment"))?;
                self.pos += end + 4;
                continue;
            }
            break;
        }

        let start = self.pos;
        let Some(ch) = self.src[start..].chars().next() else {
            return Err(self.error("unexpected end of input, missing `}`"));
        };
        match ch {
            '"' | '\'' => {
                let end = self.string_end(start, ch)?;
                self.pos = end;
                let value = decode_js_string(&self.src[start + 1..end - 1]);
                Ok(Tok::Str {
                    value,
                    span: start..end,
                })
            }
            ':' => {
                self.pos += 1;
                Ok(Tok::Colon)
            }
            ',' => {
                self.pos += 1;
                Ok(Tok::Comma)
            }
            '}' => {
                self.pos += 1;
                Ok(Tok::Close(start))
            }
            c if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
                let len = self.src[start..]
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'))
                    .unwrap_or(self.src.len() - start);
                self.pos += len;
                Ok(Tok::Ident {
                    value: self.src[start..start + len].to_string(),
                })
            }
            other => Err(self.error(&format!("unexpected character `{other}`"))),
        }
    }

    fn string_end(&self, start: usize, quote: char) -> anyhow::Result<usize> {
        let mut escaped = false;
        for (i, c) in self.src[start + 1..].char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            match c {
                '\\' => escaped = true,
                '\n' => break,
                c if c == quote => return Ok(start + 1 + i + 1),
                _ => {}
            }
        }
        Err(anyhow!("unterminated string literal at line {}", line_of(self.src, start)))
    }

    fn error(&self, msg: &str) -> anyhow::Error {
        anyhow!("{msg} at line {}", line_of(self.src, self.pos))
    }
}

fn line_of(src: &str, pos: usize) -> usize {
    src[..pos.min(src.len())].bytes().filter(|&b| b == b'\n').count() + 1
}

fn read_block(source: &str, lang: Lang) -> anyhow::Result<LangBlock> {
    let (open_brace, header_indent) = find_header(source, lang)?;
    let mut lx = Lexer {
        src: source,
        pos: open_brace + 1,
    };
    let mut entries: Vec<EntrySpan> = Vec::new();
    let mut trailing_comma = false;

    let close_brace = loop {
        let key_tok = lx.next()?;
        let key = match key_tok {
            Tok::Close(at) => break at,
            Tok::Str { value, .. } | Tok::Ident { value, .. } => value,
            other => return Err(lx.error(&format!("expected a key, found {other:?}"))),
        };
        match lx.next()? {
            Tok::Colon => {}
            other => return Err(lx.error(&format!("expected `:` after key `{key}`, found {other:?}"))),
        }
        let (value, value_span) = match lx.next()? {
            Tok::Str { value, span } => (value, span),
            other => {
                return Err(lx.error(&format!(
                    "expected a string value for key `{key}`, found {other:?}"
                )))
            }
        };
        entries.push(EntrySpan {
            key,
            value,
            value_span,
        });
        match lx.next()? {
            Tok::Comma => trailing_comma = true,
            Tok::Close(at) => {
                trailing_comma = false;
                break at;
            }
            other => return Err(lx.error(&format!("expected `,` or `}}`, found {other:?}"))),
        }
    };

    let entry_indent = entries.first().map(|e| {
        let line_start = source[..e.value_span.start].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let line = &source[line_start..e.value_span.start];
        line.chars().take_while(|c| *c == ' ' || *c == '\t').collect()
    });

    Ok(LangBlock {
        lang,
        header_indent,
        open_brace,
        close_brace,
        entries,
        trailing_comma,
        entry_indent,
    })
}

/// Decodes the body of a JavaScript string literal (without its quotes).
pub fn decode_js_string(body: &str) -> String {
    if !body.contains('\\') {
        return body.to_string();
    }
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000C}'),
            Some('0') => out.push('\0'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(ch) => out.push(ch),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some('\n') => {}
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
