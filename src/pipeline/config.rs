use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};

use crate::classify::{Classifier, DEFAULT_SKIP_CLASSES, DEFAULT_SKIP_PATTERNS};
use crate::config::{
    find_default_config, load_config, AppConfig, CONFIG_ENV_VAR, CONFIG_FILENAME,
};
use crate::html::scan::{DEFAULT_HOTLINE_CLASSES, DEFAULT_LEAF_TAGS, DEFAULT_MARKER_ATTR};
use crate::html::ScanSettings;
use crate::keys::{
    KeyRules, PrefixMap, DEFAULT_MAX_SLUG_LEN, DEFAULT_MIN_SLUG_LEN, DEFAULT_PREFIX_LEN,
};
use crate::lexicon::{Lexicon, EMBEDDED_LEXICON_TOML};
use crate::quality::{Detector, DEFAULT_MIN_WORDS, DEFAULT_OVERLAP_THRESHOLD};
use crate::table::AUTO_GENERATED_MARKER;

use super::files::{DEFAULT_BACKUP_SUFFIX, DEFAULT_EXCLUDE_DIRS};

pub const DEFAULT_TABLE_PATH: &str = "assets/js/translations.js";
pub const DEFAULT_CHANGELOG_PATH: &str = ".civic-i18n/changelog.jsonl";
pub const LEXICON_FILENAME: &str = "lexicon.toml";

/// Effective settings for one run, with every default applied.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub root: PathBuf,
    pub config_path: Option<PathBuf>,
    /// Raw config text (empty without a file); part of the rules fingerprint.
    pub config_text: String,

    pub table_path: PathBuf,
    /// `None`: built-in lexicon.
    pub lexicon_path: Option<PathBuf>,
    pub changelog_path: PathBuf,

    pub exclude_dirs: Vec<String>,
    pub backup_suffix: String,
    pub group_marker: String,
    pub scan: ScanSettings,

    pub skip_patterns: Vec<String>,
    pub skip_classes: Vec<String>,

    pub prefix_len: usize,
    pub prefixes: BTreeMap<String, String>,

    pub detector: Detector,
    pub derive_ilo_from_fil: bool,
}

impl PipelineConfig {
    /// Locates the config file (`--config`, then the environment variable, then an upward
    /// search) and resolves it against the site root.
    pub fn from_args(config_path: Option<PathBuf>, root: Option<PathBuf>) -> anyhow::Result<Self> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let search_from = root.clone().unwrap_or_else(|| cwd.clone());

        let explicit = config_path.is_some();
        let cfg_file = config_path
            .or_else(|| std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from))
            .or_else(|| find_default_config(&search_from, CONFIG_FILENAME));

        let mut file_cfg = AppConfig::default();
        let mut config_text = String::new();
        let mut used_path = None;
        if let Some(p) = cfg_file {
            if p.exists() {
                let (cfg, text) = load_config(&p)?;
                file_cfg = cfg;
                config_text = text;
                used_path = Some(p);
            } else if explicit {
                return Err(anyhow!("config not found: {}", p.display()));
            }
        }

        Self::from_app_config(file_cfg, config_text, used_path, root)
    }

    pub fn from_app_config(
        file_cfg: AppConfig,
        config_text: String,
        config_path: Option<PathBuf>,
        root_override: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let config_dir = config_path
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.clone());

        let root = match root_override {
            Some(r) => r,
            None => match file_cfg.paths.root.clone() {
                Some(r) if r.is_relative() => config_dir.join(r),
                Some(r) => r,
                None if config_path.is_some() => config_dir.clone(),
                None => cwd,
            },
        };
        let root = root.canonicalize().unwrap_or(root);

        let table_path = under(
            &root,
            file_cfg
                .paths
                .table
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TABLE_PATH)),
        );
        let changelog_path = under(
            &root,
            file_cfg
                .paths
                .changelog
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CHANGELOG_PATH)),
        );
        let lexicon_path = file_cfg
            .paths
            .lexicon
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| under(&config_dir, p));

        let scan_sec = &file_cfg.scan;
        let marker_attr = non_empty(scan_sec.marker_attr.clone())
            .unwrap_or_else(|| DEFAULT_MARKER_ATTR.to_string());
        let leaf_tags: HashSet<String> = scan_sec
            .leaf_tags
            .clone()
            .unwrap_or_else(|| owned(DEFAULT_LEAF_TAGS))
            .into_iter()
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        let hotline_classes = scan_sec
            .hotline_classes
            .clone()
            .unwrap_or_else(|| owned(DEFAULT_HOTLINE_CLASSES));
        let exclude_dirs = scan_sec
            .exclude_dirs
            .clone()
            .unwrap_or_else(|| owned(DEFAULT_EXCLUDE_DIRS));
        let backup_suffix = scan_sec
            .backup_suffix
            .clone()
            .unwrap_or_else(|| DEFAULT_BACKUP_SUFFIX.to_string());
        let group_marker = non_empty(scan_sec.group_marker.clone())
            .unwrap_or_else(|| AUTO_GENERATED_MARKER.to_string());
        if !group_marker.trim_start().starts_with("//") {
            return Err(anyhow!(
                "scan.group_marker must be a `//` comment line: {group_marker}"
            ));
        }

        let key_rules = KeyRules {
            max_slug_len: file_cfg.keys.max_slug_len.unwrap_or(DEFAULT_MAX_SLUG_LEN),
            min_slug_len: file_cfg.keys.min_slug_len.unwrap_or(DEFAULT_MIN_SLUG_LEN),
        };
        if key_rules.min_slug_len == 0 || key_rules.max_slug_len < key_rules.min_slug_len {
            return Err(anyhow!(
                "invalid key lengths: min_slug_len={} max_slug_len={}",
                key_rules.min_slug_len,
                key_rules.max_slug_len
            ));
        }
        let prefix_len = file_cfg.keys.prefix_len.unwrap_or(DEFAULT_PREFIX_LEN).max(1);

        let threshold = file_cfg.detector.threshold.unwrap_or(DEFAULT_OVERLAP_THRESHOLD);
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(anyhow!("detector.threshold must be in (0, 1]: {threshold}"));
        }
        let min_words = file_cfg.detector.min_words.unwrap_or(DEFAULT_MIN_WORDS);

        Ok(Self {
            root,
            config_path,
            config_text,
            table_path,
            lexicon_path,
            changelog_path,
            exclude_dirs,
            backup_suffix,
            group_marker,
            scan: ScanSettings {
                marker_attr,
                leaf_tags,
                hotline_classes,
                key_rules,
            },
            skip_patterns: file_cfg
                .classifier
                .skip_patterns
                .clone()
                .unwrap_or_else(|| owned(DEFAULT_SKIP_PATTERNS)),
            skip_classes: file_cfg
                .classifier
                .skip_classes
                .clone()
                .unwrap_or_else(|| owned(DEFAULT_SKIP_CLASSES)),
            prefix_len,
            prefixes: file_cfg.prefixes,
            detector: Detector::new(threshold, min_words),
            derive_ilo_from_fil: file_cfg.translate.derive_ilo_from_fil.unwrap_or(true),
        })
    }

    /// Defaults for a site rooted at `root`, as if no config file existed.
    pub fn for_root(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        Self::from_app_config(AppConfig::default(), String::new(), None, Some(root.into()))
    }

    pub fn classifier(&self) -> anyhow::Result<Classifier> {
        Classifier::new(self.skip_patterns.as_slice(), self.skip_classes.as_slice())
            .context("build classifier")
    }

    #[must_use]
    pub fn prefix_map(&self) -> PrefixMap {
        PrefixMap::new(self.prefixes.clone(), self.prefix_len)
    }

    pub fn load_lexicon(&self) -> anyhow::Result<Lexicon> {
        match self.lexicon_path.as_deref() {
            Some(p) => Lexicon::from_toml_path(p),
            None => Lexicon::embedded(),
        }
    }
}

fn under(base: &Path, p: PathBuf) -> PathBuf {
    if p.is_relative() {
        base.join(p)
    } else {
        p
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Writes `civic-i18n.toml` and the default lexicon into `dir`. Existing files are kept
/// unless `force` is set.
pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create config dir: {}", dir.display()))?;
    let cfg_path = dir.join(CONFIG_FILENAME);

    let lexicon_path = dir.join(LEXICON_FILENAME);
    if !lexicon_path.exists() || force {
        std::fs::write(&lexicon_path, EMBEDDED_LEXICON_TOML)
            .with_context(|| format!("write lexicon: {}", lexicon_path.display()))?;
    }

    if cfg_path.exists() && !force {
        return Ok(cfg_path);
    }
    std::fs::write(&cfg_path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("write config: {}", cfg_path.display()))?;
    Ok(cfg_path)
}

const DEFAULT_CONFIG_TOML: &str = r#"[paths]
# Site root; relative to this file. Defaults to this file's directory.
# root = "."
table = "assets/js/translations.js"
lexicon = "lexicon.toml"
changelog = ".civic-i18n/changelog.jsonl"

[scan]
marker_attr = "data-i18n"
exclude_dirs = ["dist", "node_modules", "react-app", ".git", ".github", ".vscode", ".next"]
backup_suffix = ".backup"
hotline_classes = ["hotline-item"]
group_marker = "// === Auto-generated i18n keys ==="
# leaf_tags = ["h1", "h2", "h3", "h4", "h5", "h6", "p", "span", "button", "label",
#              "th", "td", "li", "dt", "dd", "figcaption", "strong", "em", "summary"]

[classifier]
# Replaces the built-in list when set.
# skip_patterns = ['^[\d.,%₱\s\-()+/:;#&]+$']
# skip_classes = ["footer-version", "lang-btn"]

[keys]
max_slug_len = 50
min_slug_len = 3
prefix_len = 8

[detector]
# A translation is flagged when more than this share of the English content words
# survive in it. Replacements must come in below it.
threshold = 0.55
min_words = 4

[translate]
derive_ilo_from_fil = true

# Page path (relative to the site root) -> key prefix. Pages not listed use their file
# stem (or directory name for index pages) with hyphens removed, cut to prefix_len.
[prefixes]
"index.html" = "home"
"403.html" = "err403"
"404.html" = "err404"
"500.html" = "err500"
"offline.html" = "offline"
"accessibility/index.html" = "a11y"
"budget/index.html" = "budget"
"contact/index.html" = "contact"
"faq/index.html" = "faq"
"government/index.html" = "gov"
"government/officials.html" = "officials"
"legislative/index.html" = "leg"
"legislative/ordinance-framework.html" = "ord"
"legislative/resolution-framework.html" = "reso"
"news/index.html" = "news"
"privacy/index.html" = "privacy"
"terms/index.html" = "terms"
"sitemap/index.html" = "sitemap"
"statistics/index.html" = "stats"
"services/index.html" = "svc"
"services/certificates.html" = "cert"
"services/business.html" = "biz"
"services/tax-payments.html" = "tax"
"services/social-services.html" = "social"
"services/health.html" = "health"
"services/agriculture.html" = "agri"
"services/infrastructure.html" = "infra"
"services/education.html" = "edu"
"services/public-safety.html" = "safety"
"services/environment.html" = "env"
"service-details/birth-certificate.html" = "bc"
"service-details/death-certificate.html" = "dc"
"service-details/marriage-certificate.html" = "mc"
"service-details/business-permits-licensing.html" = "bpl"
"service-details/civil-registrar.html" = "cr"
"service-details/municipal-treasurer.html" = "treas"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use tempfile::TempDir;

    #[test]
    fn defaults_apply_without_a_file() {
        let temp = TempDir::new().unwrap();
        let cfg = PipelineConfig::for_root(temp.path()).unwrap();
        assert!(cfg.table_path.ends_with(DEFAULT_TABLE_PATH));
        assert!(cfg.lexicon_path.is_none());
        assert_eq!(cfg.scan.marker_attr, "data-i18n");
        assert!(cfg.scan.leaf_tags.contains("figcaption"));
        assert!(cfg.exclude_dirs.iter().any(|d| d == "node_modules"));
        assert_eq!(cfg.detector, Detector::default());
        assert!(cfg.derive_ilo_from_fil);
        assert_eq!(cfg.group_marker, AUTO_GENERATED_MARKER);
    }

    #[test]
    fn relative_paths_follow_root_and_config_dir() {
        let temp = TempDir::new().unwrap();
        let site = temp.path().join("site");
        std::fs::create_dir_all(&site).unwrap();
        let file_cfg = parse_config(
            "[paths]\nroot = \"site\"\ntable = \"js/t.js\"\nlexicon = \"words.toml\"\n",
        )
        .unwrap();
        let cfg = PipelineConfig::from_app_config(
            file_cfg,
            String::new(),
            Some(temp.path().join(CONFIG_FILENAME)),
            None,
        )
        .unwrap();
        let site = site.canonicalize().unwrap();
        assert_eq!(cfg.root, site);
        assert_eq!(cfg.table_path, site.join("js/t.js"));
        assert_eq!(cfg.lexicon_path, Some(temp.path().join("words.toml")));
    }

    #[test]
    fn bad_values_are_rejected() {
        let temp = TempDir::new().unwrap();
        for text in [
            "[detector]\nthreshold = 1.5\n",
            "[keys]\nmin_slug_len = 0\n",
            "[scan]\ngroup_marker = \"# nope\"\n",
        ] {
            let file_cfg = parse_config(text).unwrap();
            let res = PipelineConfig::from_app_config(
                file_cfg,
                text.to_string(),
                None,
                Some(temp.path().to_path_buf()),
            );
            assert!(res.is_err(), "{text}");
        }
    }

    #[test]
    fn init_writes_config_and_lexicon_once() {
        let temp = TempDir::new().unwrap();
        let cfg_path = init_default_config(temp.path(), false).unwrap();
        assert!(cfg_path.exists());
        let lexicon = temp.path().join(LEXICON_FILENAME);
        assert!(Lexicon::from_toml_path(&lexicon).is_ok());

        std::fs::write(&cfg_path, "# edited\n").unwrap();
        init_default_config(temp.path(), false).unwrap();
        assert_eq!(std::fs::read_to_string(&cfg_path).unwrap(), "# edited\n");
        init_default_config(temp.path(), true).unwrap();
        assert_ne!(std::fs::read_to_string(&cfg_path).unwrap(), "# edited\n");
    }

    #[test]
    fn written_config_resolves() {
        let temp = TempDir::new().unwrap();
        let cfg_path = init_default_config(temp.path(), false).unwrap();
        let cfg = PipelineConfig::from_args(Some(cfg_path), None).unwrap();
        assert_eq!(cfg.prefix_map().prefix_for(Path::new("services/business.html")), "biz");
        assert!(cfg.load_lexicon().is_ok());
        assert!(cfg.classifier().is_ok());
        assert!(!cfg.config_text.is_empty());
    }
}
