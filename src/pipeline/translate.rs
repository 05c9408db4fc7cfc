use std::fmt;

use crate::changelog::PassRecord;
use crate::table::Lang;

use super::Pipeline;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TranslateReport {
    pub rows: usize,
    /// Cells that still held the English text before the pass.
    pub pending_before: usize,
    pub pending_after: usize,
    pub fil_filled: usize,
    pub ilo_filled: usize,
    /// Ilocano cells rewritten from the Filipino text rather than resolved directly.
    pub ilo_derived: usize,
    /// Pending cells whose English is pass-through text.
    pub kept: usize,
    pub table_written: bool,
}

impl fmt::Display for TranslateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "translate")?;
        writeln!(f, "  rows: {}", self.rows)?;
        writeln!(
            f,
            "  untranslated cells: {} -> {}",
            self.pending_before, self.pending_after
        )?;
        writeln!(
            f,
            "  filled: {} fil, {} ilo ({} via fil)",
            self.fil_filled, self.ilo_filled, self.ilo_derived
        )?;
        writeln!(f, "  pass-through: {}", self.kept)?;
        write!(f, "  table written: {}", if self.table_written { "yes" } else { "no" })
    }
}

impl Pipeline {
    /// Resolves every fil/ilo cell that is still the English text. Cells that already hold
    /// a translation are left alone.
    pub fn translate(&self) -> anyhow::Result<TranslateReport> {
        let doc = self.load_table()?;
        let mut table = doc.table().clone();
        let resolver = self.resolver();
        let mut report = TranslateReport {
            rows: table.len(),
            ..TranslateReport::default()
        };

        let rows: Vec<_> = table.rows().collect();
        for (i, row) in rows.iter().enumerate() {
            self.progress.progress("translate", i + 1, rows.len());
            let kept = self.lexicon.keeps(&row.en);

            let mut fil = row.fil.clone();
            if row.fil == row.en {
                report.pending_before += 1;
                let candidate = resolver.resolve(&row.en, Lang::Fil);
                if candidate != row.en && table.update(Lang::Fil, &row.key, &candidate) {
                    report.fil_filled += 1;
                    fil = candidate;
                } else if kept {
                    report.kept += 1;
                } else {
                    report.pending_after += 1;
                }
            }

            if row.ilo == row.en {
                report.pending_before += 1;
                let mut candidate = resolver.resolve(&row.en, Lang::Ilo);
                if candidate == row.en && self.cfg.derive_ilo_from_fil && fil != row.en {
                    candidate = self.lexicon.derive_ilo_from_fil(&fil);
                    if candidate != row.en {
                        report.ilo_derived += 1;
                    }
                }
                if candidate != row.en && table.update(Lang::Ilo, &row.key, &candidate) {
                    report.ilo_filled += 1;
                } else if kept {
                    report.kept += 1;
                } else {
                    report.pending_after += 1;
                }
            }
        }

        let rendered = self.render_table(&doc, &table)?;
        report.table_written = self.write_table(&rendered)?;
        if report.table_written {
            self.record(
                PassRecord::new("translate", &self.fingerprint)
                    .with("pending_before", report.pending_before)
                    .with("pending_after", report.pending_after)
                    .with("fil_filled", report.fil_filled)
                    .with("ilo_filled", report.ilo_filled)
                    .with("ilo_derived", report.ilo_derived),
            )?;
        }
        Ok(report)
    }
}
