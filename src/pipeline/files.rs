use std::path::{Path, PathBuf};

use anyhow::Context;
use ignore::WalkBuilder;

pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    "dist",
    "node_modules",
    "react-app",
    ".git",
    ".github",
    ".vscode",
    ".next",
];
pub const DEFAULT_BACKUP_SUFFIX: &str = ".backup";

/// Every `.html` file under `root` outside the excluded directories, sorted by path.
pub fn discover_html(
    root: &Path,
    exclude_dirs: &[String],
    backup_suffix: &str,
) -> anyhow::Result<Vec<PathBuf>> {
    if !root.is_dir() {
        anyhow::bail!("site root is not a directory: {}", root.display());
    }
    let excluded: Vec<String> = exclude_dirs.to_vec();
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            !(is_dir
                && entry.depth() > 0
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| excluded.iter().any(|ex| ex == name)))
        })
        .build();

    let mut out = Vec::new();
    for entry in walker {
        let entry = entry.with_context(|| format!("walk site root: {}", root.display()))?;
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.to_ascii_lowercase().ends_with(".html") {
            continue;
        }
        if !backup_suffix.is_empty() && name.contains(backup_suffix) {
            continue;
        }
        out.push(path.to_path_buf());
    }
    out.sort();
    Ok(out)
}

/// Path of `path` relative to `root` with `/` separators.
pub fn relative_slash_path(root: &Path, path: &Path) -> PathBuf {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let joined = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    PathBuf::from(joined)
}

/// Writes `content` through a sibling temp file and a rename. Returns `false` without
/// touching the file when it already holds `content`.
pub fn write_if_changed(path: &Path, content: &str) -> anyhow::Result<bool> {
    if let Ok(current) = std::fs::read_to_string(path) {
        if current == content {
            return Ok(false);
        }
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create dir: {}", parent.display()))?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{file_name}.part"));
    std::fs::write(&tmp, content).with_context(|| format!("write: {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("finalize: {}", path.display()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn defaults() -> Vec<String> {
        DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn discovery_skips_excluded_dirs_and_backups() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("services")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("index.html"), "").unwrap();
        fs::write(root.join("services/business.html"), "").unwrap();
        fs::write(root.join("services/business.html.backup"), "").unwrap();
        fs::write(root.join("services/old.backup.html"), "").unwrap();
        fs::write(root.join("node_modules/pkg/readme.html"), "").unwrap();
        fs::write(root.join(".git/description.html"), "").unwrap();
        fs::write(root.join("notes.txt"), "").unwrap();

        let found: Vec<PathBuf> = discover_html(root, &defaults(), DEFAULT_BACKUP_SUFFIX)
            .unwrap()
            .iter()
            .map(|p| relative_slash_path(root, p))
            .collect();
        assert_eq!(
            found,
            vec![PathBuf::from("index.html"), PathBuf::from("services/business.html")]
        );
    }

    #[test]
    fn missing_root_is_an_error() {
        let temp = TempDir::new().unwrap();
        assert!(discover_html(&temp.path().join("nope"), &defaults(), "").is_err());
    }

    #[test]
    fn unchanged_content_is_not_rewritten() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a").join("page.html");
        assert!(write_if_changed(&path, "<p>x</p>").unwrap());
        assert!(!write_if_changed(&path, "<p>x</p>").unwrap());
        assert!(write_if_changed(&path, "<p>y</p>").unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "<p>y</p>");
        assert!(!temp.path().join("a").join(".page.html.part").exists());
    }
}
