//! Config file locator.
//!
//! Walks a project root to a bounded depth and reports every file whose
//! root-relative path matches a catalog pattern. Symlinks are followed,
//! but each canonical directory is entered at most once so link cycles
//! terminate. Precedence between matches is left to the merger.

mod exclude;

pub use exclude::{ExcludeError, ExcludeRules, DEFAULT_EXCLUDES};

use std::collections::{BTreeMap, HashSet};
use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::debug;
use walkdir::WalkDir;

use crate::catalog::{ConfigCatalogEntry, CATALOG};

/// Default walk depth below the root.
pub const DEFAULT_MAX_DEPTH: usize = 3;

/// Locator errors
#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    #[error("invalid workspace '{path}': {reason}")]
    InvalidWorkspace { path: String, reason: String },

    #[error(transparent)]
    Exclude(#[from] ExcludeError),

    #[error("catalog pattern '{pattern}' is invalid: {source}")]
    CatalogPattern {
        pattern: &'static str,
        source: globset::Error,
    },
}

/// Walk limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocateOptions {
    pub max_depth: usize,
    /// Directory globs pruned in addition to [`DEFAULT_EXCLUDES`].
    pub extra_excludes: Vec<String>,
}

impl Default for LocateOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            extra_excludes: Vec::new(),
        }
    }
}

/// A file on disk matched to its catalog entry.
#[derive(Debug, Clone)]
pub struct LocatedFile {
    /// Absolute path.
    pub path: PathBuf,
    /// Root-relative, `/`-separated.
    pub relative_path: String,
    pub entry: &'static ConfigCatalogEntry,
}

/// Compiled catalog matcher plus exclusion rules.
#[derive(Debug, Clone)]
pub struct Locator {
    max_depth: usize,
    excludes: ExcludeRules,
    matcher: GlobSet,
}

impl Locator {
    pub fn new(options: &LocateOptions) -> Result<Self, LocateError> {
        let mut builder = GlobSetBuilder::new();
        for entry in CATALOG {
            let glob = GlobBuilder::new(entry.pattern)
                .literal_separator(true)
                .build()
                .map_err(|source| LocateError::CatalogPattern {
                    pattern: entry.pattern,
                    source,
                })?;
            builder.add(glob);
        }
        let matcher = builder.build().map_err(|source| LocateError::CatalogPattern {
            pattern: "*",
            source,
        })?;

        Ok(Self {
            max_depth: options.max_depth,
            excludes: ExcludeRules::with_patterns(&options.extra_excludes)?,
            matcher,
        })
    }

    /// Find every catalog file under `root`, sorted by relative path.
    pub fn locate(&self, root: &Path) -> Result<Vec<LocatedFile>, LocateError> {
        let root = validate_root(root)?;
        let mut visited: HashSet<PathBuf> = HashSet::new();
        visited.insert(root.clone());

        let mut found = Vec::new();
        let mut walker = WalkDir::new(&root)
            .follow_links(true)
            .max_depth(self.max_depth)
            .sort_by_file_name()
            .into_iter();

        while let Some(next) = walker.next() {
            let entry = match next {
                Ok(entry) => entry,
                Err(e) => {
                    if let Some(ancestor) = e.loop_ancestor() {
                        debug!(ancestor = %ancestor.display(), "skipping symlink cycle");
                    } else {
                        debug!(error = %e, "skipping unreadable entry");
                    }
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&root) else {
                continue;
            };

            if entry.file_type().is_dir() {
                if self.excludes.is_excluded(relative) {
                    debug!(dir = %relative.display(), "pruned");
                    walker.skip_current_dir();
                    continue;
                }
                let canonical = entry
                    .path()
                    .canonicalize()
                    .unwrap_or_else(|_| entry.path().to_path_buf());
                if !visited.insert(canonical) {
                    debug!(dir = %relative.display(), "directory already visited via another link");
                    walker.skip_current_dir();
                }
                continue;
            }

            let relative_path = to_slash(relative);
            for index in self.matcher.matches(&relative_path) {
                found.push(LocatedFile {
                    path: entry.path().to_path_buf(),
                    relative_path: relative_path.clone(),
                    entry: &CATALOG[index],
                });
            }
        }

        found.sort_by(|a, b| {
            a.relative_path
                .cmp(&b.relative_path)
                .then_with(|| a.entry.pattern.cmp(b.entry.pattern))
        });
        debug!(root = %root.display(), count = found.len(), "located config files");
        Ok(found)
    }

    /// Presence of every catalog pattern under `root`.
    pub fn check(&self, root: &Path) -> Result<BTreeMap<&'static str, bool>, LocateError> {
        let mut presence: BTreeMap<&'static str, bool> =
            CATALOG.iter().map(|e| (e.pattern, false)).collect();
        for file in self.locate(root)? {
            presence.insert(file.entry.pattern, true);
        }
        Ok(presence)
    }
}

/// Resolve `root` to a canonical directory path.
pub fn validate_root(root: &Path) -> Result<PathBuf, LocateError> {
    let invalid = |reason: &str| LocateError::InvalidWorkspace {
        path: root.display().to_string(),
        reason: reason.to_string(),
    };
    if !root.exists() {
        return Err(invalid("does not exist"));
    }
    if !root.is_dir() {
        return Err(invalid("not a directory"));
    }
    if std::fs::read_dir(root).is_err() {
        return Err(invalid("not readable"));
    }
    root.canonicalize().map_err(|e| invalid(&e.to_string()))
}

fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "x = 1\n").unwrap();
    }

    fn relative_paths(files: &[LocatedFile]) -> Vec<&str> {
        files.iter().map(|f| f.relative_path.as_str()).collect()
    }

    #[test]
    fn test_locates_root_files_sorted() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "setup.cfg");
        touch(dir.path(), "pyproject.toml");
        touch(dir.path(), ".flake8");
        touch(dir.path(), "main.py");

        let locator = Locator::new(&LocateOptions::default()).unwrap();
        let files = locator.locate(dir.path()).unwrap();
        assert_eq!(relative_paths(&files), vec![".flake8", "pyproject.toml", "setup.cfg"]);
        assert!(files.iter().all(|f| f.path.is_absolute()));
    }

    #[test]
    fn test_nested_patterns_and_root_anchoring() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), ".github/workflows/ci.yml");
        touch(dir.path(), ".vscode/settings.json");
        // Not at the root, so not a project manifest
        touch(dir.path(), "pkg/pyproject.toml");

        let locator = Locator::new(&LocateOptions::default()).unwrap();
        let files = locator.locate(dir.path()).unwrap();
        assert_eq!(
            relative_paths(&files),
            vec![".github/workflows/ci.yml", ".vscode/settings.json"]
        );
        assert_eq!(files[0].entry.pattern, ".github/workflows/*.yml");
    }

    #[test]
    fn test_ignored_directories_pruned() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), ".venv/lib/requirements.txt");
        touch(dir.path(), "requirements/dev.txt");
        touch(dir.path(), "vendor/requirements/x.txt");

        let options = LocateOptions {
            extra_excludes: vec!["vendor".to_string()],
            ..LocateOptions::default()
        };
        let files = Locator::new(&options).unwrap().locate(dir.path()).unwrap();
        assert_eq!(relative_paths(&files), vec!["requirements/dev.txt"]);
    }

    #[test]
    fn test_depth_bound() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), ".github/workflows/ci.yml");

        let options = LocateOptions {
            max_depth: 2,
            ..LocateOptions::default()
        };
        let files = Locator::new(&options).unwrap().locate(dir.path()).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_invalid_workspace() {
        let dir = TempDir::new().unwrap();
        let locator = Locator::new(&LocateOptions::default()).unwrap();

        let err = locator.locate(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, LocateError::InvalidWorkspace { .. }));

        touch(dir.path(), "file.txt");
        let err = locator.locate(&dir.path().join("file.txt")).unwrap_err();
        match err {
            LocateError::InvalidWorkspace { reason, .. } => assert_eq!(reason, "not a directory"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_workspace() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let locked = dir.path().join("locked");
        touch(&locked, "setup.cfg");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        // root reads through mode 000
        let readable = fs::read_dir(&locked).is_ok();

        let result = Locator::new(&LocateOptions::default()).unwrap().locate(&locked);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        if readable {
            return;
        }
        match result.unwrap_err() {
            LocateError::InvalidWorkspace { reason, .. } => assert_eq!(reason, "not readable"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_check_reports_every_pattern() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "tox.ini");

        let presence = Locator::new(&LocateOptions::default())
            .unwrap()
            .check(dir.path())
            .unwrap();
        assert_eq!(presence.len(), CATALOG.len());
        assert_eq!(presence["tox.ini"], true);
        assert_eq!(presence["pyproject.toml"], false);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_skipped() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "pyproject.toml");
        fs::create_dir_all(dir.path().join("a")).unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("a/loop")).unwrap();

        let options = LocateOptions {
            max_depth: 10,
            ..LocateOptions::default()
        };
        let files = Locator::new(&options).unwrap().locate(dir.path()).unwrap();
        assert_eq!(relative_paths(&files), vec!["pyproject.toml"]);
    }
}
