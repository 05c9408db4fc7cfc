mod config;
mod files;
mod repair;
mod scan;
mod sync;
mod translate;
mod verify;

use std::path::PathBuf;

use anyhow::{anyhow, Context};

use crate::changelog::{rules_fingerprint, Changelog, PassRecord};
use crate::classify::Classifier;
use crate::keys::PrefixMap;
use crate::lexicon::Lexicon;
use crate::progress::ConsoleProgress;
use crate::resolve::Resolver;
use crate::table::{self, Lang, TableDocument, TranslationTable};

pub use config::{
    init_default_config, PipelineConfig, DEFAULT_CHANGELOG_PATH, DEFAULT_TABLE_PATH,
    LEXICON_FILENAME,
};
pub use files::{
    discover_html, relative_slash_path, write_if_changed, DEFAULT_BACKUP_SUFFIX,
    DEFAULT_EXCLUDE_DIRS,
};
pub use repair::RepairReport;
pub use scan::{ScanOptions, ScanReport};
pub use sync::SyncReport;
pub use translate::TranslateReport;
pub use verify::{LangCoverage, VerifyReport};

/// Runs the maintenance passes over one site with one set of rules.
pub struct Pipeline {
    cfg: PipelineConfig,
    progress: ConsoleProgress,
    lexicon: Lexicon,
    classifier: Classifier,
    prefixes: PrefixMap,
    changelog: Changelog,
    fingerprint: String,
}

impl Pipeline {
    pub fn new(cfg: PipelineConfig, progress: ConsoleProgress) -> anyhow::Result<Self> {
        let lexicon = cfg.load_lexicon()?;
        let classifier = cfg.classifier()?;
        let prefixes = cfg.prefix_map();
        let changelog = Changelog::new(cfg.changelog_path.clone());
        let fingerprint = rules_fingerprint(&cfg.config_text, lexicon.source_text());
        match cfg.config_path.as_deref() {
            Some(p) => progress.info(format!("Config: {}", p.display())),
            None => progress.info("Config: built-in defaults"),
        }
        progress.info(format!("Site root: {}", cfg.root.display()));
        for lang in [Lang::Fil, Lang::Ilo] {
            if let Some(dict) = lexicon.dictionary(lang).filter(|d| !d.is_empty()) {
                progress.info(format!("Lexicon {lang}: {} entries", dict.len()));
            }
        }
        Ok(Self {
            cfg,
            progress,
            lexicon,
            classifier,
            prefixes,
            changelog,
            fingerprint,
        })
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    #[must_use]
    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    #[must_use]
    pub fn rules_fingerprint(&self) -> &str {
        &self.fingerprint
    }

    #[must_use]
    pub fn changelog(&self) -> &Changelog {
        &self.changelog
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.lexicon)
    }

    /// Fil and ilo for a new English string.
    fn resolve_row(&self, en: &str) -> (String, String) {
        let resolver = self.resolver();
        let fil = resolver.resolve(en, Lang::Fil);
        let ilo = if self.cfg.derive_ilo_from_fil {
            resolver.resolve_ilo_via_fil(en, &fil)
        } else {
            resolver.resolve(en, Lang::Ilo)
        };
        (fil, ilo)
    }

    fn html_files(&self) -> anyhow::Result<Vec<PathBuf>> {
        discover_html(&self.cfg.root, &self.cfg.exclude_dirs, &self.cfg.backup_suffix)
    }

    /// Parses the table file. A missing file starts an empty table.
    fn load_table(&self) -> anyhow::Result<TableDocument> {
        let path = &self.cfg.table_path;
        if !path.exists() {
            self.progress.info(format!(
                "Table not found, starting a new one: {}",
                path.display()
            ));
            return table::load(&table::render_fresh(&TranslationTable::new()))
                .context("build empty table");
        }
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("read table: {}", path.display()))?;
        let doc = table::load(&source).with_context(|| format!("table: {}", path.display()))?;
        self.progress
            .info(format!("Loaded {} rows from {}", doc.table().len(), path.display()));
        Ok(doc)
    }

    /// Renders `table` into the document and checks parity and the round trip. Nothing is
    /// written here.
    fn render_table(&self, doc: &TableDocument, table: &TranslationTable) -> anyhow::Result<String> {
        table.verify_parity()?;
        let out = doc.serialize_with_marker(table, &self.cfg.group_marker);
        let reloaded = table::load(&out).context("reload rendered table")?;
        if reloaded.table() != table {
            return Err(anyhow!(
                "rendered table does not read back as written: {}",
                self.cfg.table_path.display()
            ));
        }
        Ok(out)
    }

    fn write_table(&self, rendered: &str) -> anyhow::Result<bool> {
        let wrote = write_if_changed(&self.cfg.table_path, rendered)?;
        if wrote {
            self.progress
                .info(format!("Wrote table: {}", self.cfg.table_path.display()));
        }
        Ok(wrote)
    }

    fn record(&self, record: PassRecord) -> anyhow::Result<()> {
        self.changelog
            .append(&record)
            .with_context(|| format!("record pass `{}`", record.pass))
    }
}
