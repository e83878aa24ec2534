use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

static DECORATION: Lazy<Regex> = Lazy::new(|| Regex::new(r#"['"\[\]]"#).unwrap());

/// Splits a task's raw `file_name` into bare file names.
///
/// Accepts a plain name, a quoted name, or a list written as JSON with
/// either quote style (`"['a.pdf', 'b.png']"`). Strict JSON is tried
/// first so apostrophes inside names survive.
pub fn decode_file_names(raw: &str) -> Vec<String> {
    let raw = raw.trim();

    if raw.starts_with('[') && raw.ends_with(']') {
        let decoded = serde_json::from_str::<Vec<String>>(raw)
            .or_else(|_| serde_json::from_str::<Vec<String>>(&raw.replace('\'', "\"")));
        if let Ok(names) = decoded {
            return clean_names(names);
        }
        return clean_names(
            DECORATION
                .replace_all(raw, "")
                .split(',')
                .map(String::from)
                .collect(),
        );
    }

    clean_names(vec![raw.trim_matches(|c| c == '\'' || c == '"').to_string()])
}

fn clean_names(names: Vec<String>) -> Vec<String> {
    names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPath {
    pub path: PathBuf,
    pub exists: bool,
}

/// The two directories a task's file may live under, probed in order.
#[derive(Debug, Clone)]
pub struct SearchRoots {
    primary: PathBuf,
    secondary: PathBuf,
}

impl SearchRoots {
    pub fn new(primary: impl Into<PathBuf>, secondary: impl Into<PathBuf>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }

    pub fn primary(&self) -> &Path {
        &self.primary
    }

    /// Probes one bare name. A miss under both roots returns the
    /// primary-joined path with `exists == false`.
    pub fn locate(&self, name: &str) -> ResolvedPath {
        let primary = self.primary.join(name);
        if primary.exists() {
            return ResolvedPath {
                path: primary,
                exists: true,
            };
        }

        let secondary = self.secondary.join(name);
        if secondary.exists() {
            return ResolvedPath {
                path: secondary,
                exists: true,
            };
        }

        debug!("File {} not found under {:?} or {:?}", name, self.primary, self.secondary);
        ResolvedPath {
            path: primary,
            exists: false,
        }
    }

    /// Resolves the first file named by `raw`; `None` when it names nothing.
    pub fn resolve(&self, raw: &str) -> Option<ResolvedPath> {
        decode_file_names(raw)
            .first()
            .map(|name| self.locate(name))
    }

    pub fn resolve_all(&self, raw: &str) -> Vec<ResolvedPath> {
        decode_file_names(raw)
            .iter()
            .map(|name| self.locate(name))
            .collect()
    }
}
