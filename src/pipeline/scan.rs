use std::fmt;
use std::path::PathBuf;

use anyhow::Context;

use crate::changelog::PassRecord;
use crate::html::scan::SkipTally;
use crate::html::Scanner;
use crate::keys::KeyRegistry;
use crate::table::{Lang, TranslationRow};

use super::{relative_slash_path, Pipeline};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanOptions {
    /// Report only; no file is written.
    pub dry_run: bool,
    /// Resolve fil/ilo for new rows. Off: new rows are English placeholders.
    pub translate: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            translate: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub dry_run: bool,
    pub files_scanned: usize,
    pub files_changed: usize,
    pub annotated: usize,
    pub skipped: SkipTally,
    pub rows_before: usize,
    pub rows_after: usize,
    pub inserted: usize,
    /// New rows whose fil or ilo is still the English text.
    pub untranslated: usize,
    pub table_written: bool,
}

impl ScanReport {
    #[must_use]
    pub fn changed(&self) -> bool {
        self.files_changed > 0 || self.inserted > 0
    }
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.dry_run { " (dry run)" } else { "" };
        writeln!(f, "scan{mode}")?;
        writeln!(
            f,
            "  files: {} scanned, {} changed",
            self.files_scanned, self.files_changed
        )?;
        writeln!(f, "  elements annotated: {}", self.annotated)?;
        writeln!(
            f,
            "  skipped: {} already marked, {} not leaf, {} not translatable, {} unkeyable",
            self.skipped.already_marked,
            self.skipped.not_leaf,
            self.skipped.not_translatable,
            self.skipped.unkeyable
        )?;
        writeln!(
            f,
            "  rows: {} -> {} (+{}, {} untranslated)",
            self.rows_before, self.rows_after, self.inserted, self.untranslated
        )?;
        write!(f, "  table written: {}", if self.table_written { "yes" } else { "no" })
    }
}

impl Pipeline {
    /// Marks untagged text elements across the site, adds rows for the new keys and writes
    /// both back. Pages are written only after the new table has passed parity and the
    /// round-trip check.
    pub fn scan(&self, opts: ScanOptions) -> anyhow::Result<ScanReport> {
        let doc = self.load_table()?;
        let mut table = doc.table().clone();
        let mut report = ScanReport {
            dry_run: opts.dry_run,
            rows_before: table.len(),
            ..ScanReport::default()
        };

        let mut registry = KeyRegistry::from_bindings(table.column(Lang::En).iter());
        let scanner = Scanner::new(&self.classifier, &self.cfg.scan);
        let files = self.html_files()?;
        self.progress
            .info(format!("Scanning {} HTML file(s)", files.len()));

        let mut pending: Vec<(PathBuf, String)> = Vec::new();
        let mut new_rows = Vec::new();
        for (i, path) in files.iter().enumerate() {
            self.progress.progress("scan", i + 1, files.len());
            let src = std::fs::read_to_string(path)
                .with_context(|| format!("read page: {}", path.display()))?;
            let rel = relative_slash_path(&self.cfg.root, path);
            let prefix = self.prefixes.prefix_for(&rel);
            let outcome = scanner
                .scan_and_annotate(&src, &prefix, &mut registry)
                .with_context(|| format!("scan page: {}", path.display()))?;

            report.files_scanned += 1;
            report.annotated += outcome.annotated;
            add_skips(&mut report.skipped, &outcome.skipped);
            if !outcome.rows.is_empty() {
                self.progress.info(format!(
                    "{}: {} new key(s) under `{prefix}`",
                    rel.display(),
                    outcome.rows.len()
                ));
            }
            let changed = outcome.changed();
            new_rows.extend(outcome.rows);
            if changed {
                report.files_changed += 1;
                pending.push((path.clone(), outcome.html));
            }
        }

        let rows: Vec<TranslationRow> = new_rows
            .into_iter()
            .map(|row| {
                if opts.translate {
                    let (fil, ilo) = self.resolve_row(&row.en);
                    TranslationRow {
                        key: row.key,
                        en: row.en,
                        fil,
                        ilo,
                    }
                } else {
                    TranslationRow::placeholder(row.key, row.en)
                }
            })
            .collect();
        report.untranslated = rows
            .iter()
            .filter(|r| r.fil == r.en || r.ilo == r.en)
            .count();
        let stats = table.merge_insert(rows);
        report.inserted = stats.inserted;
        report.rows_after = table.len();

        let rendered = self.render_table(&doc, &table)?;
        if opts.dry_run {
            return Ok(report);
        }

        report.table_written = self.write_table(&rendered)?;
        for (path, html) in &pending {
            super::write_if_changed(path, html)?;
        }
        if report.changed() || report.table_written {
            self.record(
                PassRecord::new("scan", &self.fingerprint)
                    .with("files_scanned", report.files_scanned)
                    .with("files_changed", report.files_changed)
                    .with("annotated", report.annotated)
                    .with("inserted", report.inserted)
                    .with("untranslated", report.untranslated),
            )?;
        }
        Ok(report)
    }
}

fn add_skips(total: &mut SkipTally, more: &SkipTally) {
    total.already_marked += more.already_marked;
    total.not_leaf += more.not_leaf;
    total.not_translatable += more.not_translatable;
    total.unkeyable += more.unkeyable;
}
