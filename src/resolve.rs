use once_cell::sync::Lazy;
use regex::Regex;

use crate::lexicon::{Dictionary, Lexicon};
use crate::table::Lang;
use crate::textutil::capitalize_first;

static PROPER_NOUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][a-z]+(\s+[A-Z][a-z]+)?$").expect("proper noun regex"));
static NUMERIC_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([\d\-+.,\s₱%]+)\s*(.+)$").expect("numeric prefix regex"));
static PER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(.+)\s+per\s+(.+)$").expect("per regex"));
static PAREN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)\s*\((.+)\)\s*$").expect("parenthetical regex"));
static LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?):\s*(.+)$").expect("label regex"));
static DATA_VALUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\d₱$.,\-+%\s]+$").expect("data value regex"));

const TRAILING_PUNCT: &[char] = &['.', ',', ';', ':', '!', '?'];
const MIN_LIST_ITEMS: usize = 3;

/// Best-effort dictionary translation. Pure: the same text and language always give the
/// same answer, and text that cannot be translated comes back unchanged.
#[derive(Clone, Copy, Debug)]
pub struct Resolver<'a> {
    lexicon: &'a Lexicon,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub fn new(lexicon: &'a Lexicon) -> Self {
        Self { lexicon }
    }

    #[must_use]
    pub fn lexicon(&self) -> &'a Lexicon {
        self.lexicon
    }

    /// Translates `text` into `lang`. English and unknown text resolve to themselves; the
    /// result is never empty unless the input is.
    #[must_use]
    pub fn resolve(&self, text: &str, lang: Lang) -> String {
        let Some(dict) = self.lexicon.dictionary(lang) else {
            return text.to_string();
        };
        let out = self.translate(text, dict);
        if out.trim().is_empty() {
            text.to_string()
        } else {
            out
        }
    }

    /// Ilocano text for an English source, falling back to rewriting the Filipino
    /// translation when the dictionaries have nothing better.
    #[must_use]
    pub fn resolve_ilo_via_fil(&self, english: &str, fil: &str) -> String {
        let ilo = self.resolve(english, Lang::Ilo);
        if ilo == english && fil != english {
            self.lexicon.derive_ilo_from_fil(fil)
        } else {
            ilo
        }
    }

    fn translate(&self, text: &str, dict: &Dictionary) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }
        if self.lexicon.keeps(text) {
            return text.to_string();
        }
        if let Some(hit) = dict.sentence(text) {
            return hit.to_string();
        }
        if let Some(hit) = dict.phrase(text) {
            return hit.to_string();
        }
        if PROPER_NOUN_RE.is_match(text) && dict.word(&text.to_lowercase()).is_none() {
            return text.to_string();
        }

        if let Some(caps) = NUMERIC_PREFIX_RE.captures(text) {
            let number = caps[1].trim();
            let rest = caps[2].trim();
            let translated = self.translate(rest, dict);
            if translated != rest {
                return format!("{number} {translated}");
            }
        }

        if let Some(caps) = PER_RE.captures(text) {
            let left = self.translate(&caps[1], dict);
            let right = self.translate(&caps[2], dict);
            return format!("{left} {} {right}", dict.per());
        }

        if let Some(caps) = PAREN_RE.captures(text) {
            let main = self.translate(&caps[1], dict);
            let detail = self.translate(&caps[2], dict);
            return format!("{main} ({detail})");
        }

        if !text.starts_with("http") {
            if let Some(caps) = LABEL_RE.captures(text) {
                let label = self.translate(&caps[1], dict);
                let value = caps[2].trim();
                let value = if DATA_VALUE_RE.is_match(value) || value.contains('@') {
                    value.to_string()
                } else {
                    self.translate(value, dict)
                };
                return format!("{label}: {value}");
            }
        }

        if text.contains(" / ") {
            return text
                .split(" / ")
                .map(|part| self.translate(part.trim(), dict))
                .collect::<Vec<_>>()
                .join(" / ");
        }

        if text.split(", ").count() >= MIN_LIST_ITEMS {
            return text
                .split(", ")
                .map(|part| self.translate(part.trim(), dict))
                .collect::<Vec<_>>()
                .join(", ");
        }

        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() >= 2 {
            if let Some(out) = substitute_tokens(&words, dict) {
                return out;
            }
        } else if let [word] = words.as_slice() {
            if let Some(out) = translate_word(word, dict) {
                return out;
            }
        }

        text.to_string()
    }
}

/// Greedy left-to-right substitution: 3- and 2-word dictionary entries first, then single
/// words. `None` when nothing matched.
fn substitute_tokens(words: &[&str], dict: &Dictionary) -> Option<String> {
    let mut out: Vec<String> = Vec::with_capacity(words.len());
    let mut changed = false;
    let mut i = 0;
    'outer: while i < words.len() {
        for span in [3usize, 2] {
            if i + span > words.len() {
                continue;
            }
            let joined = words[i..i + span].join(" ");
            if let Some(hit) = dict.phrase(&joined).or_else(|| dict.sentence(&joined)) {
                out.push(hit.to_string());
                changed = true;
                i += span;
                continue 'outer;
            }
        }
        match translate_word(words[i], dict) {
            Some(t) => {
                out.push(t);
                changed = true;
            }
            None => out.push(words[i].to_string()),
        }
        i += 1;
    }
    changed.then(|| out.join(" "))
}

/// Word-map lookup keeping one trailing punctuation mark, a leading capital and all-caps.
fn translate_word(word: &str, dict: &Dictionary) -> Option<String> {
    let (clean, punct) = match word.char_indices().last() {
        Some((at, c)) if TRAILING_PUNCT.contains(&c) => (&word[..at], &word[at..]),
        _ => (word, ""),
    };
    if clean.is_empty() {
        return None;
    }
    let hit = dict.word(&clean.to_lowercase())?;
    if hit.is_empty() {
        return None;
    }

    let starts_upper = clean.chars().next().is_some_and(char::is_uppercase);
    let hit_starts_lower = hit.chars().next().is_some_and(char::is_lowercase);
    let mut translated = if starts_upper && hit_starts_lower {
        capitalize_first(hit)
    } else {
        hit.to_string()
    };
    if clean.chars().count() > 1 && is_all_caps(clean) {
        translated = translated.to_uppercase();
    }
    translated.push_str(punct);
    Some(translated)
}

fn is_all_caps(word: &str) -> bool {
    word.chars().any(char::is_alphabetic) && !word.chars().any(char::is_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexicon() -> Lexicon {
        Lexicon::embedded().unwrap()
    }

    #[test]
    fn pass_through_names_are_untouched() {
        let lex = lexicon();
        let r = Resolver::new(&lex);
        assert_eq!(r.resolve("Solano Quiz", Lang::Fil), "Solano Quiz");
        assert_eq!(r.resolve("Solano Quiz", Lang::Ilo), "Solano Quiz");
        assert_eq!(r.resolve("8AM - 5PM", Lang::Fil), "8AM - 5PM");
        assert_eq!(r.resolve("Bayombong", Lang::Ilo), "Bayombong");
    }

    #[test]
    fn english_resolves_to_itself() {
        let lex = lexicon();
        assert_eq!(Resolver::new(&lex).resolve("Services", Lang::En), "Services");
    }

    #[test]
    fn dictionary_entries_win() {
        let lex = lexicon();
        let r = Resolver::new(&lex);
        assert_eq!(r.resolve("Services", Lang::Fil), "Mga Serbisyo");
        assert_eq!(r.resolve("Services", Lang::Ilo), "Dagiti Serbisio");
        assert_eq!(r.resolve("Frequently Asked Questions", Lang::Ilo), "Dagiti Masansan a Maisaludsod");
    }

    #[test]
    fn unknown_capitalized_words_are_proper_nouns() {
        let lex = lexicon();
        let r = Resolver::new(&lex);
        assert_eq!(r.resolve("Quirino", Lang::Fil), "Quirino");
        assert_eq!(r.resolve("Roxas Street", Lang::Fil), "Roxas Street");
        // a known word is not a proper noun
        assert_eq!(r.resolve("Office", Lang::Fil), "Opisina");
    }

    #[test]
    fn label_value_falls_back_to_decomposition() {
        let lex = lexicon();
        let r = Resolver::new(&lex);
        assert_eq!(
            r.resolve("Total processing time: 20 minutes", Lang::Fil),
            "Kabuuang oras ng pagproseso: 20 minuto"
        );
        assert_eq!(r.resolve("Fee: ₱150.00", Lang::Fil), "Bayad: ₱150.00");
        assert_eq!(r.resolve("Email: info@solano.gov.ph", Lang::Ilo), "Email: info@solano.gov.ph");
    }

    #[test]
    fn sentence_entry_beats_decomposition() {
        let lex = Lexicon::from_toml_str(
            "version = 1\n[fil.sentences]\n\"Total processing time: 20 minutes\" = \"Kabuuang oras: 20 minuto\"\n[fil.words]\nminutes = \"minuto\"\n",
        )
        .unwrap();
        assert_eq!(
            Resolver::new(&lex).resolve("Total processing time: 20 minutes", Lang::Fil),
            "Kabuuang oras: 20 minuto"
        );
    }

    #[test]
    fn structural_shapes_are_split() {
        let lex = lexicon();
        let r = Resolver::new(&lex);
        assert_eq!(r.resolve("3-5 Working Days", Lang::Fil), "3-5 Araw ng Trabaho");
        assert_eq!(r.resolve("Fee per document", Lang::Fil), "Bayad bawat dokumento");
        assert_eq!(r.resolve("Fee per document", Lang::Ilo), "Bayad tunggal dokumento");
        assert_eq!(r.resolve("Payment (Online)", Lang::Fil), "Pagbabayad (Online)");
        assert_eq!(r.resolve("Walk-in / Online", Lang::Ilo), "Walk-in / Online");
        assert_eq!(
            r.resolve("Payment, Release, Review", Lang::Fil),
            "Pagbabayad, Paglabas, Pagsusuri"
        );
    }

    #[test]
    fn token_substitution_keeps_case_and_punctuation() {
        let lex = lexicon();
        let r = Resolver::new(&lex);
        assert_eq!(r.resolve("Submit your documents.", Lang::Fil), "Isumite iyong mga dokumento.");
        assert_eq!(r.resolve("PAY FEES", Lang::Fil), "MAGBAYAD MGA BAYARIN");
        assert_eq!(r.resolve("View Business Permit", Lang::Fil), "Tingnan Permiso sa Negosyo");
    }

    #[test]
    fn untranslatable_text_is_identity() {
        let lex = lexicon();
        let r = Resolver::new(&lex);
        assert_eq!(r.resolve("zxq wvv", Lang::Fil), "zxq wvv");
        assert_eq!(r.resolve("...", Lang::Fil), "...");
        assert_eq!(r.resolve("   ", Lang::Fil), "   ");
    }

    #[test]
    fn ilocano_falls_back_to_filipino_rewrite() {
        let lex = Lexicon::from_toml_str(
            "version = 1\n[fil.phrases]\n\"Our Services\" = \"Ang mga Serbisyo\"\n[fil_to_ilo]\n\"Ang\" = \"Ti\"\n\"mga\" = \"dagiti\"\n\"Serbisyo\" = \"Serbisio\"\n",
        )
        .unwrap();
        let r = Resolver::new(&lex);
        let fil = r.resolve("Our Services", Lang::Fil);
        assert_eq!(fil, "Ang mga Serbisyo");
        assert_eq!(r.resolve_ilo_via_fil("Our Services", &fil), "Ti dagiti Serbisio");
        assert_eq!(r.resolve_ilo_via_fil("Nothing here", "Nothing here"), "Nothing here");
    }
}
