use std::collections::BTreeSet;
use std::fmt;

use anyhow::{anyhow, Context};

use crate::html::collect_markers;
use crate::table::Lang;

use super::Pipeline;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LangCoverage {
    pub lang: Option<Lang>,
    /// Cells that differ from the English text.
    pub translated: usize,
    /// Cells equal to the English text that the lexicon passes through on purpose.
    pub pass_through: usize,
    pub untranslated: usize,
    pub bad: usize,
}

impl LangCoverage {
    #[must_use]
    pub fn percent(&self, rows: usize) -> f64 {
        if rows == 0 {
            return 100.0;
        }
        (self.translated + self.pass_through) as f64 * 100.0 / rows as f64
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VerifyReport {
    pub rows: usize,
    pub parity_gaps: Vec<(Lang, String)>,
    pub round_trip_ok: bool,
    pub fil: LangCoverage,
    pub ilo: LangCoverage,
    pub files_scanned: usize,
    /// Marker keys used in pages that have no row.
    pub unknown_markers: Vec<String>,
}

impl VerifyReport {
    /// Fails when any key is missing from a column or the table does not survive a write.
    pub fn check(&self) -> anyhow::Result<()> {
        if !self.parity_gaps.is_empty() {
            let listed = self
                .parity_gaps
                .iter()
                .take(20)
                .map(|(lang, key)| format!("{lang}:{key}"))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(anyhow!(
                "key-set parity violated: {} missing cell(s): {listed}",
                self.parity_gaps.len()
            ));
        }
        if !self.round_trip_ok {
            return Err(anyhow!("table does not round-trip through load and serialize"));
        }
        Ok(())
    }
}

impl fmt::Display for VerifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "verify")?;
        writeln!(f, "  rows: {}", self.rows)?;
        let parity = if self.parity_gaps.is_empty() {
            "ok".to_string()
        } else {
            format!("{} missing cell(s)", self.parity_gaps.len())
        };
        writeln!(f, "  parity: {parity}")?;
        writeln!(
            f,
            "  round trip: {}",
            if self.round_trip_ok { "ok" } else { "FAILED" }
        )?;
        for cov in [&self.fil, &self.ilo] {
            let code = cov.lang.map(Lang::code).unwrap_or("?");
            writeln!(
                f,
                "  {code}: {:.1}% covered ({} translated, {} pass-through, {} untranslated, {} bad)",
                cov.percent(self.rows),
                cov.translated,
                cov.pass_through,
                cov.untranslated,
                cov.bad
            )?;
        }
        write!(
            f,
            "  pages: {}, unknown marker keys: {}",
            self.files_scanned,
            self.unknown_markers.len()
        )
    }
}

impl Pipeline {
    /// Read-only health report on the table and the markers in the pages.
    pub fn verify(&self) -> anyhow::Result<VerifyReport> {
        let doc = self.load_table()?;
        let table = doc.table();
        let detector = self.cfg.detector;
        let mut report = VerifyReport {
            rows: table.len(),
            parity_gaps: table.parity_gaps(),
            round_trip_ok: doc.serialize(table) == doc.source(),
            fil: LangCoverage {
                lang: Some(Lang::Fil),
                ..LangCoverage::default()
            },
            ilo: LangCoverage {
                lang: Some(Lang::Ilo),
                ..LangCoverage::default()
            },
            ..VerifyReport::default()
        };

        for row in table.rows() {
            let kept = self.lexicon.keeps(&row.en);
            for (cov, value) in [(&mut report.fil, &row.fil), (&mut report.ilo, &row.ilo)] {
                if *value != row.en {
                    cov.translated += 1;
                } else if kept {
                    cov.pass_through += 1;
                } else {
                    cov.untranslated += 1;
                }
                if detector.is_bad(&row.en, value) {
                    cov.bad += 1;
                }
            }
        }

        let mut unknown = BTreeSet::new();
        for path in self.html_files()? {
            let src = std::fs::read_to_string(&path)
                .with_context(|| format!("read page: {}", path.display()))?;
            report.files_scanned += 1;
            let markers = collect_markers(&src, &self.cfg.scan.marker_attr)
                .with_context(|| format!("read markers: {}", path.display()))?;
            for marked in markers {
                if !table.contains_key(&marked.key) {
                    unknown.insert(marked.key);
                }
            }
        }
        report.unknown_markers = unknown.into_iter().collect();
        if !report.unknown_markers.is_empty() {
            self.progress.warn(format!(
                "{} marker key(s) without a row; run sync-missing",
                report.unknown_markers.len()
            ));
        }
        Ok(report)
    }
}
