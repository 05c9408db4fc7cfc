mod parse;
mod write;

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use indexmap::IndexMap;

pub use parse::{decode_js_string, load, TableDocument};
pub use write::{encode_js_string, render_fresh, AUTO_GENERATED_MARKER};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Lang {
    En,
    Fil,
    Ilo,
}

impl Lang {
    pub const ALL: [Lang; 3] = [Lang::En, Lang::Fil, Lang::Ilo];

    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Fil => "fil",
            Lang::Ilo => "ilo",
        }
    }

    fn index(self) -> usize {
        match self {
            Lang::En => 0,
            Lang::Fil => 1,
            Lang::Ilo => 2,
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Lang {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Lang::En),
            "fil" | "tl" => Ok(Lang::Fil),
            "ilo" => Ok(Lang::Ilo),
            other => Err(anyhow!("unknown language code: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslationRow {
    pub key: String,
    pub en: String,
    pub fil: String,
    pub ilo: String,
}

impl TranslationRow {
    /// A row whose translations are still the English text.
    pub fn placeholder(key: impl Into<String>, en: impl Into<String>) -> Self {
        let en = en.into();
        Self {
            key: key.into(),
            fil: en.clone(),
            ilo: en.clone(),
            en,
        }
    }

    #[must_use]
    pub fn get(&self, lang: Lang) -> &str {
        match lang {
            Lang::En => &self.en,
            Lang::Fil => &self.fil,
            Lang::Ilo => &self.ilo,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub inserted: usize,
    pub already_present: usize,
}

/// Three insertion-ordered key → string columns that are expected to share one key set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TranslationTable {
    columns: [IndexMap<String, String>; 3],
}

impl TranslationTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_columns(columns: [IndexMap<String, String>; 3]) -> Self {
        Self { columns }
    }

    #[must_use]
    pub fn column(&self, lang: Lang) -> &IndexMap<String, String> {
        &self.columns[lang.index()]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.column(Lang::En).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.iter().all(|c| c.is_empty())
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.column(Lang::En).contains_key(key)
    }

    #[must_use]
    pub fn get(&self, lang: Lang, key: &str) -> Option<&str> {
        self.column(lang).get(key).map(String::as_str)
    }

    /// Replaces the value of an existing cell. Returns whether anything changed; absent keys
    /// are left absent.
    pub fn update(&mut self, lang: Lang, key: &str, value: &str) -> bool {
        match self.columns[lang.index()].get_mut(key) {
            Some(cur) if cur.as_str() != value => {
                *cur = value.to_string();
                true
            }
            _ => false,
        }
    }

    /// Appends rows whose key is absent; present cells are never overwritten.
    pub fn merge_insert(&mut self, rows: impl IntoIterator<Item = TranslationRow>) -> MergeStats {
        let mut stats = MergeStats::default();
        for row in rows {
            if self.contains_key(&row.key) {
                stats.already_present += 1;
            } else {
                stats.inserted += 1;
            }
            for lang in Lang::ALL {
                self.columns[lang.index()]
                    .entry(row.key.clone())
                    .or_insert_with(|| row.get(lang).to_string());
            }
        }
        stats
    }

    /// Rows in English column order. Missing cells read as the English value.
    pub fn rows(&self) -> impl Iterator<Item = TranslationRow> + '_ {
        self.column(Lang::En).iter().map(|(key, en)| TranslationRow {
            key: key.clone(),
            en: en.clone(),
            fil: self.get(Lang::Fil, key).unwrap_or(en.as_str()).to_string(),
            ilo: self.get(Lang::Ilo, key).unwrap_or(en.as_str()).to_string(),
        })
    }

    /// Keys missing from some column, grouped per language.
    #[must_use]
    pub fn parity_gaps(&self) -> Vec<(Lang, String)> {
        let mut all: IndexMap<&str, ()> = IndexMap::new();
        for col in &self.columns {
            for key in col.keys() {
                all.insert(key.as_str(), ());
            }
        }
        let mut gaps = Vec::new();
        for lang in Lang::ALL {
            let col = self.column(lang);
            for key in all.keys() {
                if !col.contains_key(*key) {
                    gaps.push((lang, key.to_string()));
                }
            }
        }
        gaps
    }

    pub fn verify_parity(&self) -> anyhow::Result<()> {
        let gaps = self.parity_gaps();
        if gaps.is_empty() {
            return Ok(());
        }
        let listed = gaps
            .iter()
            .take(20)
            .map(|(lang, key)| format!("{lang}:{key}"))
            .collect::<Vec<_>>()
            .join(", ");
        let more = gaps.len().saturating_sub(20);
        let suffix = if more > 0 {
            format!(" (+{more} more)")
        } else {
            String::new()
        };
        Err(anyhow!(
            "key-set parity violated: {} missing cell(s): {listed}{suffix}",
            gaps.len()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_insert_never_overwrites() {
        let mut table = TranslationTable::new();
        let first = table.merge_insert([TranslationRow {
            key: "home-services".into(),
            en: "Services".into(),
            fil: "Mga Serbisyo".into(),
            ilo: "Dagiti Serbisio".into(),
        }]);
        assert_eq!(first, MergeStats { inserted: 1, already_present: 0 });

        let second = table.merge_insert([TranslationRow::placeholder("home-services", "Services")]);
        assert_eq!(second, MergeStats { inserted: 0, already_present: 1 });
        assert_eq!(table.get(Lang::Fil, "home-services"), Some("Mga Serbisyo"));
    }

    #[test]
    fn merge_insert_keeps_insertion_order() {
        let mut table = TranslationTable::new();
        table.merge_insert([
            TranslationRow::placeholder("b", "B"),
            TranslationRow::placeholder("a", "A"),
        ]);
        let keys: Vec<&String> = table.column(Lang::Ilo).keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn parity_gaps_are_reported_per_key() {
        let mut en = IndexMap::new();
        en.insert("a".to_string(), "A".to_string());
        en.insert("b".to_string(), "B".to_string());
        let mut fil = IndexMap::new();
        fil.insert("a".to_string(), "A".to_string());
        let ilo = en.clone();
        let table = TranslationTable::from_columns([en, fil, ilo]);

        assert_eq!(table.parity_gaps(), vec![(Lang::Fil, "b".to_string())]);
        let err = table.verify_parity().unwrap_err().to_string();
        assert!(err.contains("fil:b"), "{err}");
    }

    #[test]
    fn update_touches_existing_cells_only() {
        let mut table = TranslationTable::new();
        table.merge_insert([TranslationRow::placeholder("k", "Home")]);
        assert!(table.update(Lang::Fil, "k", "Tahanan"));
        assert!(!table.update(Lang::Fil, "k", "Tahanan"));
        assert!(!table.update(Lang::Fil, "missing", "x"));
        assert!(table.verify_parity().is_ok());
    }

    #[test]
    fn lang_codes_parse() {
        assert_eq!("FIL".parse::<Lang>().unwrap(), Lang::Fil);
        assert!("xx".parse::<Lang>().is_err());
    }
}
