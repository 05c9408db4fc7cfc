use anyhow::Context;
use regex::Regex;

use crate::textutil::normalize_text;

/// Content shapes that never get a translation key. Order matters only for readability;
/// any match skips the text.
pub const DEFAULT_SKIP_PATTERNS: &[&str] = &[
    // numbers, amounts, phone-ish punctuation runs
    r"^[\d.,%₱\s\-()+/:;#&]+$",
    r"^(?:AM|PM|hrs?|min|sec|km²?|PHT)$",
    r"^Ver\.\s",
    r"^\d{4}$",
    r"^©",
    r"^https?://",
    r"^₱[\d,.]+",
    r"^\d+°[CF]$",
    r"^--",
    r"^[\d.,]+\s*(?:sq\.?\s*km|hectares?|ha)$",
    // hotline labels followed by a number
    r"^(?:Police|MSWDO|Fire|DILG|MDRRMO|R2TMC):\s*\d",
    r"^0\d{3}\s",
    // clock times and office hours
    r"^\d{1,2}:\d{2}",
    r"(?i)^\d{1,2}(?::\d{2})?\s*(?:AM|PM)\b",
    r"^(?:Mon|Tues?|Wed(?:nes)?|Thu(?:rs)?|Fri|Sat(?:ur)?|Sun)(?:day)?\b",
    r"^(?:Lunes|Martes|Miyerkules|Huwebes|Biyernes)\b",
    r"^[A-Z]{2,5}$",
    r"^(?:CTC|RSBSA|PSA|LGU|DPWH|MSWDO|SEEDO|MDRRMO|DILG|BIR|DTI|SEC|NBI|PNP)$",
    // attribute look-alikes
    r"^(?:img|src|href|class|id|style)\s*=",
    r"^data-[\w-]+$",
    r"^(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*\.?\s+\d{1,2},\s*\d{4}$",
    r"^\d+(?:\.\d+)?\s*(?:x|:)\s*\d+(?:\.\d+)?$",
];

/// Class substrings marking widgets that render dynamic, non-prose content.
pub const DEFAULT_SKIP_CLASSES: &[&str] = &[
    "footer-version",
    "footer-social",
    "footer-partner",
    "lang-btn",
    "lang-selector",
    "header-actions",
    "rate-display",
    "weather-temp",
    "date-value",
    "time-value",
    "time-label",
    "rate-rotator",
    "weather-location",
];

const MIN_TEXT_CHARS: usize = 2;

#[derive(Clone, Debug)]
pub struct Classifier {
    patterns: Vec<Regex>,
    skip_classes: Vec<String>,
}

impl Classifier {
    pub fn new<P, C>(patterns: &[P], skip_classes: &[C]) -> anyhow::Result<Self>
    where
        P: AsRef<str>,
        C: AsRef<str>,
    {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).with_context(|| format!("compile skip pattern: {}", p.as_ref()))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        let skip_classes = skip_classes
            .iter()
            .map(|c| c.as_ref().trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        Ok(Self {
            patterns,
            skip_classes,
        })
    }

    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_SKIP_PATTERNS, DEFAULT_SKIP_CLASSES).expect("default skip patterns")
    }

    /// True when the text is not worth a translation key.
    #[must_use]
    pub fn should_skip(&self, text: &str) -> bool {
        let text = normalize_text(text);
        if text.chars().count() < MIN_TEXT_CHARS {
            return true;
        }
        self.patterns.iter().any(|re| re.is_match(&text))
    }

    #[must_use]
    pub fn should_skip_by_class(&self, class_attr: &str) -> bool {
        if class_attr.is_empty() {
            return false;
        }
        self.skip_classes
            .iter()
            .any(|skip| class_attr.contains(skip.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::with_defaults()
    }

    #[test]
    fn office_hours_are_skipped() {
        let c = classifier();
        assert!(c.should_skip("8AM - 5PM"));
        assert!(c.should_skip("8:00 AM - 5:00 PM"));
        assert!(c.should_skip("Mon-Fri"));
        assert!(c.should_skip("Monday"));
        assert!(c.should_skip("Lunes - Biyernes"));
    }

    #[test]
    fn data_shapes_are_skipped() {
        let c = classifier();
        for text in [
            "",
            "x",
            "2026",
            "₱1,250.00",
            "(078) 326-5123",
            "0917 123 4567",
            "© 2026 BetterSolano.org",
            "https://solano.gov.ph",
            "28°C",
            "139.8 sq km",
            "Police: 0917",
            "MSWDO",
            "MDRRMO",
            "Ver. 2.1",
            "data-i18n",
            "January 5, 2026",
            "1x1",
        ] {
            assert!(c.should_skip(text), "expected skip: {text:?}");
        }
    }

    #[test]
    fn prose_is_kept() {
        let c = classifier();
        for text in [
            "Services",
            "Business Permits",
            "Monitoring and Evaluation",
            "Satisfaction Survey",
            "Go to the Municipal Hall",
            "Solano Quiz",
            "Identification Card",
            "Class Schedule",
        ] {
            assert!(!c.should_skip(text), "expected keep: {text:?}");
        }
    }

    #[test]
    fn whitespace_is_normalized_before_matching() {
        let c = classifier();
        assert!(c.should_skip("  2026 \n"));
        assert_eq!(c.should_skip("Services"), c.should_skip(" Services\n"));
    }

    #[test]
    fn class_denylist_matches_substrings() {
        let c = classifier();
        assert!(c.should_skip_by_class("footer-version small"));
        assert!(c.should_skip_by_class("widget weather-temp-large"));
        assert!(!c.should_skip_by_class("section-title"));
        assert!(!c.should_skip_by_class(""));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = Classifier::new(&["(unclosed"], &[] as &[&str]).unwrap_err();
        assert!(format!("{err:#}").contains("(unclosed"));
    }
}
