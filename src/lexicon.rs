use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{anyhow, Context};
use regex::{Captures, Regex};
use serde::Deserialize;

use crate::table::Lang;

pub const EMBEDDED_LEXICON_TOML: &str = include_str!("../data/lexicon.toml");
const LEXICON_VERSION: u32 = 1;

#[derive(Clone, Debug, Deserialize)]
struct LexiconFile {
    version: u32,
    #[serde(default)]
    keep_as_is: Vec<String>,
    #[serde(default)]
    keep_patterns: Vec<String>,
    #[serde(default)]
    fil: DictionarySection,
    #[serde(default)]
    ilo: DictionarySection,
    #[serde(default)]
    fil_to_ilo: HashMap<String, String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct DictionarySection {
    #[serde(default)]
    per: Option<String>,
    #[serde(default)]
    sentences: HashMap<String, String>,
    #[serde(default)]
    phrases: HashMap<String, String>,
    #[serde(default)]
    words: HashMap<String, String>,
}

/// Lookup tables for one target language.
#[derive(Clone, Debug, Default)]
pub struct Dictionary {
    per: String,
    sentences: HashMap<String, String>,
    phrases: HashMap<String, String>,
    /// Keyed by lowercase English word.
    words: HashMap<String, String>,
}

impl Dictionary {
    fn from_section(section: DictionarySection) -> Self {
        let per = section
            .per
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "per".to_string());
        let words = section
            .words
            .into_iter()
            .map(|(k, v)| (k.trim().to_lowercase(), v))
            .filter(|(k, _)| !k.is_empty())
            .collect();
        Self {
            per,
            sentences: section.sentences,
            phrases: section.phrases,
            words,
        }
    }

    /// Connector used for `X per Y` texts.
    #[must_use]
    pub fn per(&self) -> &str {
        &self.per
    }

    #[must_use]
    pub fn sentence(&self, text: &str) -> Option<&str> {
        self.sentences.get(text).map(String::as_str)
    }

    #[must_use]
    pub fn phrase(&self, text: &str) -> Option<&str> {
        self.phrases.get(text).map(String::as_str)
    }

    #[must_use]
    pub fn word(&self, lowercase_word: &str) -> Option<&str> {
        self.words.get(lowercase_word).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sentences.len() + self.phrases.len() + self.words.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug)]
struct Substitution {
    re: Regex,
    map: HashMap<String, String>,
}

/// Dictionary data loaded once per run. Immutable after construction.
#[derive(Clone, Debug)]
pub struct Lexicon {
    keep_as_is: HashSet<String>,
    keep_patterns: Vec<Regex>,
    fil: Dictionary,
    ilo: Dictionary,
    fil_to_ilo: Option<Substitution>,
    source_text: String,
}

impl Lexicon {
    pub fn embedded() -> anyhow::Result<Self> {
        Self::from_toml_str(EMBEDDED_LEXICON_TOML).context("embedded lexicon")
    }

    pub fn from_toml_path(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read lexicon: {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("load lexicon: {}", path.display()))
    }

    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let file: LexiconFile = toml::from_str(text).context("parse lexicon (toml)")?;
        if file.version != LEXICON_VERSION {
            return Err(anyhow!(
                "unsupported lexicon version: {} (expected {LEXICON_VERSION})",
                file.version
            ));
        }

        let keep_patterns = file
            .keep_patterns
            .iter()
            .map(|p| {
                Regex::new(&format!("(?i){p}")).with_context(|| format!("compile keep pattern: {p}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let fil_to_ilo = substitution(file.fil_to_ilo)?;

        Ok(Self {
            keep_as_is: file
                .keep_as_is
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            keep_patterns,
            fil: Dictionary::from_section(file.fil),
            ilo: Dictionary::from_section(file.ilo),
            fil_to_ilo,
            source_text: text.to_string(),
        })
    }

    /// True for text that stays as written in every language.
    #[must_use]
    pub fn keeps(&self, text: &str) -> bool {
        let text = text.trim();
        self.keep_as_is.contains(text) || self.keep_patterns.iter().any(|re| re.is_match(text))
    }

    /// English has no dictionary.
    #[must_use]
    pub fn dictionary(&self, lang: Lang) -> Option<&Dictionary> {
        match lang {
            Lang::En => None,
            Lang::Fil => Some(&self.fil),
            Lang::Ilo => Some(&self.ilo),
        }
    }

    /// Rewrites a Filipino translation into Ilocano word by word, longest entry first.
    /// Words without an entry are kept.
    #[must_use]
    pub fn derive_ilo_from_fil(&self, fil: &str) -> String {
        let Some(sub) = self.fil_to_ilo.as_ref() else {
            return fil.to_string();
        };
        sub.re
            .replace_all(fil, |caps: &Captures| {
                sub.map
                    .get(&caps[0])
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    /// The TOML text this lexicon was built from.
    #[must_use]
    pub fn source_text(&self) -> &str {
        &self.source_text
    }
}

fn substitution(map: HashMap<String, String>) -> anyhow::Result<Option<Substitution>> {
    let map: HashMap<String, String> = map
        .into_iter()
        .filter(|(k, _)| !k.trim().is_empty())
        .collect();
    if map.is_empty() {
        return Ok(None);
    }
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then_with(|| a.cmp(b)));
    let alternation = keys
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    let re = Regex::new(&format!(r"\b(?:{alternation})\b")).context("compile fil_to_ilo table")?;
    Ok(Some(Substitution { re, map }))
}
