use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One line of the pass changelog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassRecord {
    pub pass: String,
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
    pub rules_fingerprint: String,
    #[serde(default)]
    pub counters: BTreeMap<String, usize>,
}

impl PassRecord {
    pub fn new(pass: impl Into<String>, rules_fingerprint: impl Into<String>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self {
            pass: pass.into(),
            timestamp,
            rules_fingerprint: rules_fingerprint.into(),
            counters: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, name: &str, value: usize) -> Self {
        self.counters.insert(name.to_string(), value);
        self
    }
}

/// SHA-256 over the effective config and the lexicon text, hex encoded.
#[must_use]
pub fn rules_fingerprint(config_text: &str, lexicon_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"config\0");
    hasher.update(config_text.as_bytes());
    hasher.update(b"\0lexicon\0");
    hasher.update(lexicon_text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Append-only JSON-lines file of pass records.
#[derive(Clone, Debug)]
pub struct Changelog {
    path: PathBuf,
}

impl Changelog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &PassRecord) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create changelog dir: {}", parent.display()))?;
        }
        let mut line = serde_json::to_string(record).context("serialize pass record")?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open changelog: {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("append changelog: {}", self.path.display()))?;
        Ok(())
    }

    /// All records so far; a missing file reads as empty.
    pub fn read_all(&self) -> anyhow::Result<Vec<PassRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read changelog: {}", self.path.display()))?;
        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line).with_context(|| {
                    format!("parse changelog line {}: {}", i + 1, self.path.display())
                })
            })
            .collect()
    }
}
