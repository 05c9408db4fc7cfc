use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

pub const CONFIG_FILENAME: &str = "civic-i18n.toml";
pub const CONFIG_ENV_VAR: &str = "CIVIC_I18N_CONFIG";

/// `civic-i18n.toml` as written on disk. Every field is optional; defaults are applied when
/// the pipeline config is resolved.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub paths: PathsSection,
    #[serde(default)]
    pub scan: ScanSection,
    #[serde(default)]
    pub classifier: ClassifierSection,
    #[serde(default)]
    pub keys: KeysSection,
    #[serde(default)]
    pub detector: DetectorSection,
    #[serde(default)]
    pub translate: TranslateSection,
    /// Page path (relative to the site root) -> key prefix.
    #[serde(default)]
    pub prefixes: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct PathsSection {
    /// Site root. Relative paths are resolved against the config file directory.
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Translation table source, relative to the site root.
    #[serde(default)]
    pub table: Option<PathBuf>,
    /// Lexicon TOML, relative to the config file directory. Unset: built-in lexicon.
    #[serde(default)]
    pub lexicon: Option<PathBuf>,
    /// Pass changelog (JSON lines), relative to the site root.
    #[serde(default)]
    pub changelog: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ScanSection {
    #[serde(default)]
    pub marker_attr: Option<String>,
    #[serde(default)]
    pub exclude_dirs: Option<Vec<String>>,
    #[serde(default)]
    pub backup_suffix: Option<String>,
    #[serde(default)]
    pub leaf_tags: Option<Vec<String>>,
    #[serde(default)]
    pub hotline_classes: Option<Vec<String>>,
    /// Comment line written above rows appended to a language block.
    #[serde(default)]
    pub group_marker: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ClassifierSection {
    #[serde(default)]
    pub skip_patterns: Option<Vec<String>>,
    #[serde(default)]
    pub skip_classes: Option<Vec<String>>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct KeysSection {
    #[serde(default)]
    pub max_slug_len: Option<usize>,
    #[serde(default)]
    pub min_slug_len: Option<usize>,
    #[serde(default)]
    pub prefix_len: Option<usize>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct DetectorSection {
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub min_words: Option<usize>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct TranslateSection {
    #[serde(default)]
    pub derive_ilo_from_fil: Option<bool>,
}

/// `filename` in `start_dir` or one of its first `max_levels` ancestors.
pub fn find_file_upwards(start_dir: &Path, filename: &str, max_levels: usize) -> Option<PathBuf> {
    start_dir
        .ancestors()
        .take(max_levels + 1)
        .map(|dir| dir.join(filename))
        .find(|candidate| candidate.is_file())
}

/// Searches upward from the working directory, then from `site_dir`, then from the
/// executable's directory.
pub fn find_default_config(site_dir: &Path, filename: &str) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok();
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    [(cwd, 8), (Some(site_dir.to_path_buf()), 8), (exe_dir, 10)]
        .into_iter()
        .filter_map(|(dir, levels)| dir.map(|d| (d, levels)))
        .find_map(|(dir, levels)| find_file_upwards(&dir, filename, levels))
}

pub fn parse_config(text: &str) -> anyhow::Result<AppConfig> {
    toml::from_str(text).context("parse config toml")
}

/// Reads and parses a config file, returning the raw text alongside.
pub fn load_config(path: &Path) -> anyhow::Result<(AppConfig, String)> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg = parse_config(&text).with_context(|| format!("config: {}", path.display()))?;
    Ok((cfg, text))
}
