use std::collections::BTreeSet;
use std::fmt;

use anyhow::Context;
use indexmap::IndexMap;

use crate::changelog::PassRecord;
use crate::html::collect_markers;
use crate::table::TranslationRow;
use crate::textutil::normalize_text;

use super::{relative_slash_path, Pipeline};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub dry_run: bool,
    pub files_scanned: usize,
    pub markers_seen: usize,
    /// Distinct marker keys that the table does not have.
    pub missing: usize,
    pub inserted: usize,
    /// Missing keys whose elements carry no text; reported, not added.
    pub without_text: Vec<String>,
    pub rows_before: usize,
    pub rows_after: usize,
    pub table_written: bool,
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.dry_run { " (dry run)" } else { "" };
        writeln!(f, "sync-missing{mode}")?;
        writeln!(
            f,
            "  files: {}, markers: {}, missing keys: {}",
            self.files_scanned, self.markers_seen, self.missing
        )?;
        writeln!(
            f,
            "  rows: {} -> {} (+{})",
            self.rows_before, self.rows_after, self.inserted
        )?;
        if !self.without_text.is_empty() {
            writeln!(f, "  no element text: {}", self.without_text.join(", "))?;
        }
        write!(f, "  table written: {}", if self.table_written { "yes" } else { "no" })
    }
}

impl Pipeline {
    /// Adds rows for marker keys that appear in pages but not in the table, taking the
    /// element text as the English value. The first page (in path order) to carry a key
    /// supplies its text.
    pub fn sync_missing(&self, dry_run: bool) -> anyhow::Result<SyncReport> {
        let doc = self.load_table()?;
        let mut table = doc.table().clone();
        let mut report = SyncReport {
            dry_run,
            rows_before: table.len(),
            ..SyncReport::default()
        };

        let files = self.html_files()?;
        let mut found: IndexMap<String, String> = IndexMap::new();
        let mut textless: BTreeSet<String> = BTreeSet::new();
        for (i, path) in files.iter().enumerate() {
            self.progress.progress("sync", i + 1, files.len());
            let src = std::fs::read_to_string(path)
                .with_context(|| format!("read page: {}", path.display()))?;
            report.files_scanned += 1;
            let markers = collect_markers(&src, &self.cfg.scan.marker_attr)
                .with_context(|| format!("read markers: {}", path.display()))?;
            for marked in markers {
                report.markers_seen += 1;
                if table.contains_key(&marked.key) || found.contains_key(&marked.key) {
                    continue;
                }
                let text = normalize_text(&marked.text);
                if text.is_empty() {
                    textless.insert(marked.key);
                    continue;
                }
                self.progress.info(format!(
                    "{}: missing key `{}`",
                    relative_slash_path(&self.cfg.root, path).display(),
                    marked.key
                ));
                textless.remove(&marked.key);
                found.insert(marked.key, text);
            }
        }
        report.missing = found.len() + textless.len();
        for key in &textless {
            self.progress
                .warn(format!("marker `{key}` has no element text; not added"));
        }
        report.without_text = textless.into_iter().collect();

        let rows: Vec<TranslationRow> = found
            .into_iter()
            .map(|(key, en)| {
                let (fil, ilo) = self.resolve_row(&en);
                TranslationRow { key, en, fil, ilo }
            })
            .collect();
        report.inserted = table.merge_insert(rows).inserted;
        report.rows_after = table.len();

        let rendered = self.render_table(&doc, &table)?;
        if dry_run {
            return Ok(report);
        }
        report.table_written = self.write_table(&rendered)?;
        if report.table_written {
            self.record(
                PassRecord::new("sync-missing", &self.fingerprint)
                    .with("missing", report.missing)
                    .with("inserted", report.inserted)
                    .with("without_text", report.without_text.len()),
            )?;
        }
        Ok(report)
    }
}
