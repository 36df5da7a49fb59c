/*!
 * Source document discovery.
 *
 * Walks the content directory, keeps markdown files and drops every path
 * matching an ignore rule. Rules are double-star globs matched against the
 * forward-slash path relative to the content root: `*` stays inside one
 * segment, `**` crosses segments.
 *
 * A non-recursive discovery only looks at the files directly inside the
 * content root.
 */

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use log::debug;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::errors::DiscoveryError;
use crate::file_utils::FileManager;

/// Compiled set of ignore rules
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    patterns: Vec<String>,
    set: GlobSet,
}

impl IgnoreRules {
    /// Compile the given glob patterns
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, DiscoveryError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|err| DiscoveryError::InvalidIgnoreRule {
                    pattern: pattern.to_string(),
                    message: err.to_string(),
                })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|err| DiscoveryError::InvalidIgnoreRule {
            pattern: patterns.iter().map(|p| p.as_ref()).collect::<Vec<_>>().join(", "),
            message: err.to_string(),
        })?;

        Ok(Self {
            patterns: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
            set,
        })
    }

    /// Rules that match nothing
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            set: GlobSet::empty(),
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Check a forward-slash relative path against every rule
    pub fn is_ignored(&self, relative_path: &str) -> bool {
        self.set.is_match(relative_path)
    }
}

/// Enumerates markdown documents under a content root
#[derive(Debug, Clone)]
pub struct Discovery {
    content_dir: PathBuf,
    ignore_rules: IgnoreRules,
    recursive: bool,
}

impl Discovery {
    pub fn new(content_dir: impl Into<PathBuf>, ignore_rules: IgnoreRules) -> Self {
        Self {
            content_dir: content_dir.into(),
            ignore_rules,
            recursive: true,
        }
    }

    /// Descend into subdirectories or stay in the content root
    pub fn with_recursion(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    /// List candidate documents as forward-slash paths relative to the
    /// content root, in lexical traversal order.
    pub fn list_markdown_paths(&self) -> Result<Vec<String>, DiscoveryError> {
        let mut results = Vec::new();

        let mut walker = WalkDir::new(&self.content_dir)
            .follow_links(true)
            .sort_by_file_name();
        if !self.recursive {
            walker = walker.max_depth(1);
        }

        for entry in walker {
            let entry = entry.map_err(|source| DiscoveryError::Walk {
                root: self.content_dir.clone(),
                source,
            })?;

            if !entry.file_type().is_file() || !is_markdown(entry.path()) {
                continue;
            }

            let relative = match entry.path().strip_prefix(&self.content_dir) {
                Ok(relative) => FileManager::to_forward_slash(relative),
                Err(_) => continue,
            };

            if self.ignore_rules.is_ignored(&relative) {
                debug!("Ignoring {} (matches an ignore rule)", relative);
                continue;
            }

            results.push(relative);
        }

        debug!("Discovered {} markdown file(s) under {:?}", results.len(), self.content_dir);
        Ok(results)
    }

    /// Read one discovered document
    pub fn read(&self, relative_path: &str) -> Result<String, DiscoveryError> {
        let path = self.content_dir.join(relative_path);
        std::fs::read_to_string(&path).map_err(|source| DiscoveryError::Read { path, source })
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("md"))
        .unwrap_or(false)
}
