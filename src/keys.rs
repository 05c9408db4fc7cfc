use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::textutil::normalize_text;

static NON_SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s]").expect("non slug"));
static SLUG_WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("slug ws"));

pub const DEFAULT_MAX_SLUG_LEN: usize = 50;
pub const DEFAULT_MIN_SLUG_LEN: usize = 3;
pub const DEFAULT_PREFIX_LEN: usize = 8;

#[derive(Clone, Copy, Debug)]
pub struct KeyRules {
    pub max_slug_len: usize,
    pub min_slug_len: usize,
}

impl Default for KeyRules {
    fn default() -> Self {
        Self {
            max_slug_len: DEFAULT_MAX_SLUG_LEN,
            min_slug_len: DEFAULT_MIN_SLUG_LEN,
        }
    }
}

/// Lowercased, ASCII-only, hyphen-joined form of `text`, cut at the last hyphen that
/// fits in `max_len`.
pub fn slugify(text: &str, max_len: usize) -> String {
    let lower = normalize_text(text).to_lowercase();
    let clean = NON_SLUG_RE.replace_all(&lower, "");
    let slug = SLUG_WS_RE.replace_all(clean.trim(), "-").into_owned();
    if slug.len() <= max_len {
        return slug;
    }
    // only ASCII survives NON_SLUG_RE, so byte slicing is safe
    let head = &slug[..max_len];
    match head.rfind('-') {
        Some(pos) => head[..pos].to_string(),
        None => head.to_string(),
    }
}

/// Derives the un-disambiguated key for `text` on a page, or `None` when the text has no
/// usable slug.
pub fn derive_key(text: &str, page_prefix: &str, rules: &KeyRules) -> Option<String> {
    let slug = slugify(text, rules.max_slug_len);
    if slug.len() < rules.min_slug_len {
        return None;
    }
    if page_prefix.is_empty() {
        Some(slug)
    } else {
        Some(format!("{page_prefix}-{slug}"))
    }
}

/// Routing table from a page's path (relative to the site root, `/`-separated) to its key
/// namespace.
#[derive(Clone, Debug, Default)]
pub struct PrefixMap {
    routes: BTreeMap<String, String>,
    fallback_len: usize,
}

impl PrefixMap {
    pub fn new(routes: BTreeMap<String, String>, fallback_len: usize) -> Self {
        let routes = routes
            .into_iter()
            .map(|(path, prefix)| (normalize_route(&path), prefix.trim().to_string()))
            .collect();
        Self {
            routes,
            fallback_len: fallback_len.max(1),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn prefix_for(&self, rel_path: &Path) -> String {
        let route = normalize_route(&rel_path.to_string_lossy());
        if let Some(prefix) = self.routes.get(&route) {
            return prefix.clone();
        }
        fallback_prefix(&route, self.fallback_len)
    }
}

fn normalize_route(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut rest = path.as_str();
    loop {
        if let Some(r) = rest.strip_prefix("./") {
            rest = r;
        } else if let Some(r) = rest.strip_prefix('/') {
            rest = r;
        } else {
            break;
        }
    }
    rest.to_string()
}

/// File stem (or the parent directory name for `index` pages), hyphens dropped, first
/// `max_len` characters.
fn fallback_prefix(route: &str, max_len: usize) -> String {
    let path = Path::new(route);
    let mut base = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    if base == "index" {
        base = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
    }
    base.replace('-', "").chars().take(max_len).collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyAssignment {
    pub key: String,
    pub is_new: bool,
}

/// Global key → English binding used to keep one key bound to one English value.
#[derive(Clone, Debug, Default)]
pub struct KeyRegistry {
    bindings: HashMap<String, String>,
}

impl KeyRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bindings<'a>(pairs: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        let bindings = pairs
            .into_iter()
            .map(|(k, v)| (k.clone(), normalize_text(v)))
            .collect();
        Self { bindings }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.bindings.contains_key(key)
    }

    /// Reuses `base` (or a `-N` variant) already bound to `text`, otherwise mints the first
    /// free variant and binds it.
    pub fn assign(&mut self, base: &str, text: &str) -> KeyAssignment {
        let text = normalize_text(text);
        let mut candidate = base.to_string();
        let mut suffix = 2usize;
        loop {
            match self.bindings.get(&candidate) {
                None => {
                    self.bindings.insert(candidate.clone(), text);
                    return KeyAssignment {
                        key: candidate,
                        is_new: true,
                    };
                }
                Some(bound) if *bound == text => {
                    return KeyAssignment {
                        key: candidate,
                        is_new: false,
                    };
                }
                Some(_) => {
                    candidate = format!("{base}-{suffix}");
                    suffix += 1;
                }
            }
        }
    }
}
