use std::fmt;

use crate::changelog::PassRecord;
use crate::table::Lang;

use super::Pipeline;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub rows: usize,
    pub bad_fil_before: usize,
    pub bad_ilo_before: usize,
    pub bad_fil_after: usize,
    pub bad_ilo_after: usize,
    pub fil_fixed: usize,
    pub ilo_fixed: usize,
    pub table_written: bool,
}

impl fmt::Display for RepairReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "repair")?;
        writeln!(f, "  rows: {}", self.rows)?;
        writeln!(
            f,
            "  bad fil: {} -> {} ({} fixed)",
            self.bad_fil_before, self.bad_fil_after, self.fil_fixed
        )?;
        writeln!(
            f,
            "  bad ilo: {} -> {} ({} fixed)",
            self.bad_ilo_before, self.bad_ilo_after, self.ilo_fixed
        )?;
        write!(f, "  table written: {}", if self.table_written { "yes" } else { "no" })
    }
}

impl Pipeline {
    /// Re-resolves only the cells the detector flags as mostly English. A replacement is
    /// committed when it is accepted and shares strictly fewer English words than the cell
    /// it replaces; unflagged cells are never touched. Placeholders are left to `translate`.
    pub fn repair(&self) -> anyhow::Result<RepairReport> {
        let doc = self.load_table()?;
        let mut table = doc.table().clone();
        let resolver = self.resolver();
        let detector = self.cfg.detector;
        let mut report = RepairReport {
            rows: table.len(),
            ..RepairReport::default()
        };

        let rows: Vec<_> = table.rows().collect();
        for row in &rows {
            let mut fil = row.fil.clone();
            if detector.is_bad(&row.en, &row.fil) {
                report.bad_fil_before += 1;
                let candidate = resolver.resolve(&row.en, Lang::Fil);
                if detector.improves(&row.en, &row.fil, &candidate)
                    && table.update(Lang::Fil, &row.key, &candidate)
                {
                    report.fil_fixed += 1;
                    fil = candidate;
                }
            }

            if !detector.is_bad(&row.en, &row.ilo) {
                continue;
            }
            report.bad_ilo_before += 1;
            let mut candidate = resolver.resolve(&row.en, Lang::Ilo);
            if !detector.improves(&row.en, &row.ilo, &candidate)
                && self.cfg.derive_ilo_from_fil
                && fil != row.en
            {
                candidate = self.lexicon.derive_ilo_from_fil(&fil);
            }
            if detector.improves(&row.en, &row.ilo, &candidate)
                && table.update(Lang::Ilo, &row.key, &candidate)
            {
                report.ilo_fixed += 1;
            }
        }

        for row in table.rows() {
            if detector.is_bad(&row.en, &row.fil) {
                report.bad_fil_after += 1;
            }
            if detector.is_bad(&row.en, &row.ilo) {
                report.bad_ilo_after += 1;
            }
        }

        let rendered = self.render_table(&doc, &table)?;
        report.table_written = self.write_table(&rendered)?;
        if report.table_written {
            self.record(
                PassRecord::new("repair", &self.fingerprint)
                    .with("bad_fil_before", report.bad_fil_before)
                    .with("bad_fil_after", report.bad_fil_after)
                    .with("bad_ilo_before", report.bad_ilo_before)
                    .with("bad_ilo_after", report.bad_ilo_after)
                    .with("fil_fixed", report.fil_fixed)
                    .with("ilo_fixed", report.ilo_fixed),
            )?;
        }
        Ok(report)
    }
}
